//! Apollo Federation v2 entity resolution
//!
//! A gateway asks a subgraph for entities it does not own by sending
//! representations: `{ "__typename": "Course", "id": "1" }`. Each subgraph
//! implements [`EntityResolver`] for the types it can resolve, and
//! [`resolve_entities`] runs a whole `_entities` batch through it.
//!
//! Failures never abort a batch. Every element maps to an
//! [`EntityResolution`], and [`report_entities`] turns those into the
//! `[_Entity]!` list plus per-element GraphQL errors.

use async_graphql::{Any, Context, ErrorExtensions, Name, PathSegment, SimpleObject, Value};
use async_trait::async_trait;
use futures::future::join_all;
use indexmap::IndexMap;
use thiserror::Error;

use crate::SubgraphError;

/// Reserved field carrying the entity type name
pub const TYPENAME_FIELD: &str = "__typename";

/// Malformed representation errors
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RepresentationError {
    #[error("representation must be an object")]
    NotAnObject,

    #[error("representation is missing a string `__typename`")]
    MissingTypename,

    #[error("`{typename}` representation is missing key field `{field}`")]
    MissingKey { typename: String, field: &'static str },

    #[error("`{typename}` key field `{field}` must be a non-empty string")]
    InvalidKey { typename: String, field: &'static str },
}

/// Key-only entity stub sent by the gateway
#[derive(Debug, Clone, PartialEq)]
pub struct Representation {
    typename: String,
    fields: IndexMap<Name, Value>,
}

impl Representation {
    /// Parse a raw `_Any` value
    pub fn from_value(value: Value) -> Result<Self, RepresentationError> {
        let Value::Object(mut fields) = value else {
            return Err(RepresentationError::NotAnObject);
        };

        let typename = match fields.shift_remove(TYPENAME_FIELD) {
            Some(Value::String(typename)) if !typename.is_empty() => typename,
            _ => return Err(RepresentationError::MissingTypename),
        };

        Ok(Self { typename, fields })
    }

    /// Declared entity type name
    pub fn typename(&self) -> &str {
        &self.typename
    }

    /// Read a string key field
    ///
    /// Keys are not coerced: a number where a string id is expected is an error,
    /// and so is a blank string.
    pub fn key(&self, field: &'static str) -> Result<&str, RepresentationError> {
        match self.fields.get(field) {
            Some(Value::String(value)) if !value.trim().is_empty() => Ok(value.as_str()),
            Some(Value::Null) | None => Err(RepresentationError::MissingKey {
                typename: self.typename.clone(),
                field,
            }),
            Some(_) => Err(RepresentationError::InvalidKey {
                typename: self.typename.clone(),
                field,
            }),
        }
    }
}

impl TryFrom<Any> for Representation {
    type Error = RepresentationError;

    fn try_from(any: Any) -> Result<Self, Self::Error> {
        Self::from_value(any.0)
    }
}

/// Outcome of resolving one representation
#[derive(Debug)]
pub enum EntityResolution<E> {
    /// Entity reconstructed for this subgraph
    Resolved(E),
    /// Owned type, but no entity has this key
    Absent,
    /// Type this subgraph does not resolve
    Unowned(String),
    /// Malformed representation or backing-store failure
    Rejected(SubgraphError),
}

/// Entity resolver for Apollo Federation
#[async_trait]
pub trait EntityResolver: Send + Sync {
    /// Local entity union returned from `_entities`
    type Entity: Send;

    /// Resolve one parsed representation
    async fn resolve_reference(&self, representation: Representation) -> EntityResolution<Self::Entity>;
}

/// Resolve a batch of raw representations
///
/// Elements are resolved concurrently; the output has the same length as the
/// input and `output[i]` belongs to `representations[i]`.
pub async fn resolve_entities<R>(resolver: &R, representations: Vec<Any>) -> Vec<EntityResolution<R::Entity>>
where
    R: EntityResolver + ?Sized,
{
    join_all(representations.into_iter().map(|any| async move {
        match Representation::try_from(any) {
            Ok(representation) => resolver.resolve_reference(representation).await,
            Err(err) => EntityResolution::Rejected(err.into()),
        }
    }))
    .await
}

/// Convert resolutions into the `_entities` result list
///
/// Rejected elements are reported as errors at `[<field>, index]`; unowned
/// types and absent keys are plain nulls.
pub fn report_entities<E>(ctx: &Context<'_>, resolutions: Vec<EntityResolution<E>>) -> Vec<Option<E>> {
    let field = ctx.item.node.response_key().node.to_string();

    resolutions
        .into_iter()
        .enumerate()
        .map(|(index, resolution)| match resolution {
            EntityResolution::Resolved(entity) => Some(entity),
            EntityResolution::Absent => None,
            EntityResolution::Unowned(typename) => {
                tracing::debug!(index, %typename, "representation type not resolvable by this subgraph");
                None
            }
            EntityResolution::Rejected(err) => {
                tracing::warn!(index, error = %err, "rejected entity representation");
                let mut error = err.extend().into_server_error(ctx.item.pos);
                error.path = vec![PathSegment::Field(field.clone()), PathSegment::Index(index)];
                ctx.add_error(error);
                None
            }
        })
        .collect()
}

/// Federation `_Service` type
#[derive(SimpleObject, Debug, Clone)]
#[graphql(name = "_Service")]
pub struct Service {
    /// Subgraph SDL including federation directives
    pub sdl: String,
}

impl Service {
    pub fn new(sdl: impl Into<String>) -> Self {
        Self { sdl: sdl.into() }
    }
}


/// Field signatures per object type in an SDL document
///
/// Fields starting with `_` are federation plumbing and left out.
#[cfg(test)]
pub(crate) fn sdl_fields(
    sdl: &str,
) -> std::collections::BTreeMap<String, std::collections::BTreeSet<String>> {
    let mut types = std::collections::BTreeMap::new();
    let mut current: Option<String> = None;

    for line in sdl.lines().map(str::trim) {
        if let Some(rest) = line.strip_prefix("type ") {
            let name: String = rest.chars().take_while(|c| c.is_alphanumeric() || *c == '_').collect();
            types.entry(name.clone()).or_insert_with(std::collections::BTreeSet::new);
            current = Some(name);
        } else if line == "}" {
            current = None;
        } else if let Some(name) = &current {
            if line.contains(':') && !line.starts_with('_') && !line.starts_with('"') && !line.starts_with('#') {
                let field = line.split_whitespace().collect::<Vec<_>>().join(" ");
                types.entry(name.clone()).or_default().insert(field);
            }
        }
    }

    types
}
