//! Course subgraph
//!
//! Authoritative owner of the `Course` entity: identity plus the display
//! attributes `name` and `category`.

use std::sync::Arc;

use async_graphql::{Any, Context, EmptyMutation, EmptySubscription, ErrorExtensions, Object, Schema, Union, ID};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::federation::{self, EntityResolution, EntityResolver, Representation, Service};
use crate::store::DataSource;
use crate::{Result, SubgraphError};

/// Federation SDL served from `_service`
pub const COURSE_SDL: &str = include_str!("../schema/course.graphql");

/// Course store injected into the schema
pub type CourseSource = Arc<dyn DataSource<OwnedCourse>>;

/// Course subgraph schema
pub type CourseSchema = Schema<CourseQuery, EmptyMutation, EmptySubscription>;

/// Course as owned by this subgraph
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OwnedCourse {
    pub id: String,
    pub name: String,
    pub category: String,
}

#[Object(name = "Course")]
impl OwnedCourse {
    async fn id(&self) -> ID {
        ID(self.id.clone())
    }

    async fn name(&self) -> &str {
        &self.name
    }

    async fn category(&self) -> &str {
        &self.category
    }
}

/// Entity types this subgraph resolves
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CourseEntityType {
    Course,
}

impl CourseEntityType {
    pub fn from_typename(typename: &str) -> Option<Self> {
        match typename {
            "Course" => Some(Self::Course),
            _ => None,
        }
    }
}

/// `_Entity` union
#[derive(Union, Debug, Clone)]
#[graphql(name = "_Entity")]
pub enum CourseEntity {
    Course(OwnedCourse),
}

/// Resolves `Course` representations by store lookup
pub struct CourseEntities {
    store: CourseSource,
}

impl CourseEntities {
    pub fn new(store: CourseSource) -> Self {
        Self { store }
    }
}

#[async_trait]
impl EntityResolver for CourseEntities {
    type Entity = CourseEntity;

    async fn resolve_reference(&self, representation: Representation) -> EntityResolution<CourseEntity> {
        let Some(entity_type) = CourseEntityType::from_typename(representation.typename()) else {
            return EntityResolution::Unowned(representation.typename().to_owned());
        };

        match entity_type {
            CourseEntityType::Course => {
                let id = match representation.key("id") {
                    Ok(id) => id,
                    Err(err) => return EntityResolution::Rejected(err.into()),
                };
                match self.store.lookup(id).await {
                    Ok(Some(course)) => EntityResolution::Resolved(CourseEntity::Course(course)),
                    Ok(None) => EntityResolution::Absent,
                    Err(err) => EntityResolution::Rejected(err.into()),
                }
            }
        }
    }
}

/// Look up a course; an unknown id is `Ok(None)`
pub async fn get_course(store: &dyn DataSource<OwnedCourse>, id: &str) -> Result<Option<OwnedCourse>> {
    if id.trim().is_empty() {
        return Err(SubgraphError::InvalidArgument("course id must not be empty".to_string()));
    }
    Ok(store.lookup(id).await?)
}

/// All courses in store order
pub async fn list_courses(store: &dyn DataSource<OwnedCourse>) -> Result<Vec<OwnedCourse>> {
    Ok(store.list_all().await?)
}

pub struct CourseQuery;

#[Object(name = "Query")]
impl CourseQuery {
    async fn course(&self, ctx: &Context<'_>, id: String) -> async_graphql::Result<Option<OwnedCourse>> {
        let store = ctx.data::<CourseSource>()?;
        get_course(store.as_ref(), &id).await.map_err(|e| e.extend())
    }

    async fn courses(&self, ctx: &Context<'_>) -> async_graphql::Result<Vec<OwnedCourse>> {
        let store = ctx.data::<CourseSource>()?;
        list_courses(store.as_ref()).await.map_err(|e| e.extend())
    }

    #[graphql(name = "_entities")]
    async fn entities(
        &self,
        ctx: &Context<'_>,
        representations: Vec<Any>,
    ) -> async_graphql::Result<Vec<Option<CourseEntity>>> {
        let resolver = CourseEntities::new(ctx.data::<CourseSource>()?.clone());
        let resolutions = federation::resolve_entities(&resolver, representations).await;
        Ok(federation::report_entities(ctx, resolutions))
    }

    #[graphql(name = "_service")]
    async fn service(&self) -> Service {
        Service::new(COURSE_SDL)
    }
}

/// Build the course subgraph schema over a store
pub fn build_schema(store: CourseSource) -> CourseSchema {
    Schema::build(CourseQuery, EmptyMutation, EmptySubscription)
        .data(store)
        .finish()
}
