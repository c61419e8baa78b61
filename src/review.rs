//! Review subgraph
//!
//! Owns `Review` and contributes `Course.reviews`. Courses arrive here only as
//! key-only [`CourseRef`] stubs built from `_entities` representations; no
//! other subgraph's fields are available on them.

use std::sync::Arc;

use async_graphql::{Any, Context, EmptyMutation, EmptySubscription, ErrorExtensions, Object, Schema, Union, ID};
use async_trait::async_trait;
use futures::future::join_all;
use serde::{Deserialize, Serialize};

use crate::federation::{self, EntityResolution, EntityResolver, Representation, Service};
use crate::store::{DataSource, StoreError};

/// Federation SDL served from `_service`
pub const REVIEW_SDL: &str = include_str!("../schema/review.graphql");

/// Reviews grouped by course id, injected into the schema
pub type ReviewSource = Arc<dyn DataSource<Vec<Review>>>;

/// Review subgraph schema
pub type ReviewSchema = Schema<ReviewQuery, EmptyMutation, EmptySubscription>;

/// Review of a course
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Review {
    pub id: String,
    pub course_id: String,
    pub reviewer_name: String,
    pub comment: String,
    pub rating: i32,
}

#[Object]
impl Review {
    async fn id(&self) -> ID {
        ID(self.id.clone())
    }

    async fn reviewer_name(&self) -> &str {
        &self.reviewer_name
    }

    async fn comment(&self) -> &str {
        &self.comment
    }

    async fn rating(&self) -> i32 {
        self.rating
    }
}

/// This subgraph's view of a course: the key and nothing else
///
/// `reviews` is only ever filled by [`preload_reviews`], during field
/// resolution of an `_entities` batch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CourseRef {
    pub id: String,
    reviews: Option<Vec<Review>>,
}

impl CourseRef {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            reviews: None,
        }
    }
}

#[Object(name = "Course")]
impl CourseRef {
    async fn id(&self) -> ID {
        ID(self.id.clone())
    }

    async fn reviews(&self, ctx: &Context<'_>) -> async_graphql::Result<Vec<Review>> {
        if let Some(reviews) = &self.reviews {
            return Ok(reviews.clone());
        }
        let store = ctx.data::<ReviewSource>()?;
        resolve_reviews(store.as_ref(), self)
            .await
            .map_err(|e| crate::SubgraphError::from(e).extend())
    }
}

/// Reviews for a course stub, in stored order; none is an empty list
pub async fn resolve_reviews(store: &dyn DataSource<Vec<Review>>, course: &CourseRef) -> Result<Vec<Review>, StoreError> {
    Ok(store.lookup(&course.id).await?.unwrap_or_default())
}

/// Load `reviews` for every resolved stub of a batch
///
/// `reviews` is non-null, so a store failure for one course rejects that
/// element instead of leaving the field out of an otherwise resolved object.
pub async fn preload_reviews(
    store: &dyn DataSource<Vec<Review>>,
    resolutions: Vec<EntityResolution<ReviewEntity>>,
) -> Vec<EntityResolution<ReviewEntity>> {
    join_all(resolutions.into_iter().map(|resolution| async move {
        match resolution {
            EntityResolution::Resolved(ReviewEntity::Course(mut course)) => match resolve_reviews(store, &course).await {
                Ok(reviews) => {
                    course.reviews = Some(reviews);
                    EntityResolution::Resolved(ReviewEntity::Course(course))
                }
                Err(err) => EntityResolution::Rejected(err.into()),
            },
            other => other,
        }
    }))
    .await
}

/// Entity types this subgraph resolves
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReviewEntityType {
    Course,
}

impl ReviewEntityType {
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
pub enum ReviewEntity {
    Course(CourseRef),
}

/// Turns representations into key-only stubs without touching any store
pub struct ReviewEntities;

#[async_trait]
impl EntityResolver for ReviewEntities {
    type Entity = ReviewEntity;

    async fn resolve_reference(&self, representation: Representation) -> EntityResolution<ReviewEntity> {
        match ReviewEntityType::from_typename(representation.typename()) {
            Some(ReviewEntityType::Course) => match representation.key("id") {
                Ok(id) => EntityResolution::Resolved(ReviewEntity::Course(CourseRef::new(id))),
                Err(err) => EntityResolution::Rejected(err.into()),
            },
            None => EntityResolution::Unowned(representation.typename().to_owned()),
        }
    }
}

pub struct ReviewQuery;

#[Object(name = "Query")]
impl ReviewQuery {
    #[graphql(name = "_entities")]
    async fn entities(
        &self,
        ctx: &Context<'_>,
        representations: Vec<Any>,
    ) -> async_graphql::Result<Vec<Option<ReviewEntity>>> {
        let mut resolutions = federation::resolve_entities(&ReviewEntities, representations).await;
        if ctx.look_ahead().field("reviews").exists() {
            let store = ctx.data::<ReviewSource>()?;
            resolutions = preload_reviews(store.as_ref(), resolutions).await;
        }
        Ok(federation::report_entities(ctx, resolutions))
    }

    #[graphql(name = "_service")]
    async fn service(&self) -> Service {
        Service::new(REVIEW_SDL)
    }
}

/// Build the review subgraph schema over a store
pub fn build_schema(store: ReviewSource) -> ReviewSchema {
    Schema::build(ReviewQuery, EmptyMutation, EmptySubscription)
        .data(store)
        .finish()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixtures::Fixtures;
    use crate::store::InMemoryStore;
    use async_graphql::{PathSegment, Value};
    use std::sync::atomic::{AtomicUsize, Ordering};
    use serde_json::json;

    fn schema() -> ReviewSchema {
        build_schema(Arc::new(Fixtures::builtin().review_store()))
    }

    fn any(value: serde_json::Value) -> Any {
        Any(Value::from_json(value).unwrap())
    }

    /// Fails lookups for course "2" and counts every lookup
    struct FlakyReviews {
        inner: InMemoryStore<Vec<Review>>,
        lookups: AtomicUsize,
    }

    impl FlakyReviews {
        fn new() -> Self {
            Self {
                inner: Fixtures::builtin().review_store(),
                lookups: AtomicUsize::new(0),
            }
        }
    }

    #[async_trait]
    impl DataSource<Vec<Review>> for FlakyReviews {
        async fn lookup(&self, id: &str) -> Result<Option<Vec<Review>>, StoreError> {
            self.lookups.fetch_add(1, Ordering::SeqCst);
            if id == "2" {
                return Err(StoreError::Unavailable("review shard offline".to_string()));
            }
            self.inner.lookup(id).await
        }

        async fn list_all(&self) -> Result<Vec<Vec<Review>>, StoreError> {
            self.inner.list_all().await
        }
    }

    #[tokio::test]
    async fn test_course_stub_carries_only_key() {
        let resolutions = federation::resolve_entities(&ReviewEntities, vec![any(json!({"__typename": "Course", "id": "2"}))]).await;
        let stubs: Vec<_> = resolutions.into_iter().map(EntityResolution::entity).collect();

        match stubs.as_slice() {
            [Some(ReviewEntity::Course(course))] => assert_eq!(course, &CourseRef::new("2")),
            other => panic!("unexpected resolution: {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_extra_representation_fields_are_ignored() {
        let resolutions = federation::resolve_entities(
            &ReviewEntities,
            vec![any(json!({"__typename": "Course", "id": "1", "name": "GraphQL"}))],
        )
        .await;
        let entity = resolutions.into_iter().next().and_then(EntityResolution::entity);
        assert!(matches!(entity, Some(ReviewEntity::Course(course)) if course == CourseRef::new("1")));
    }

    #[tokio::test]
    async fn test_resolve_reviews_by_course() {
        let store = Fixtures::builtin().review_store();

        let reviews = resolve_reviews(&store, &CourseRef::new("1")).await.unwrap();
        let ratings: Vec<i32> = reviews.iter().map(|r| r.rating).collect();
        assert_eq!(ratings, vec![2, 3]);

        let reviews = resolve_reviews(&store, &CourseRef::new("2")).await.unwrap();
        assert_eq!(reviews.len(), 1);
        assert_eq!(reviews[0].rating, 3);
    }

    #[tokio::test]
    async fn test_course_without_reviews_yields_empty_list() {
        let store = InMemoryStore::<Vec<Review>>::new();
        let reviews = resolve_reviews(&store, &CourseRef::new("1")).await.unwrap();
        assert!(reviews.is_empty());

        let store = Fixtures::builtin().review_store();
        let reviews = resolve_reviews(&store, &CourseRef::new("99")).await.unwrap();
        assert!(reviews.is_empty());
    }

    #[tokio::test]
    async fn test_entities_then_reviews() {
        let query = r#"{
            _entities(representations: [
                {__typename: "Course", id: "2"},
                {__typename: "Course", id: "1"},
                {__typename: "Course", id: "42"}
            ]) { ... on Course { id reviews { reviewerName comment rating } } }
        }"#;
        let response = schema().execute(query).await;

        assert!(response.errors.is_empty(), "{:?}", response.errors);
        assert_eq!(
            response.data.into_json().unwrap(),
            json!({
                "_entities": [
                    {"id": "2", "reviews": [{"reviewerName": "1030", "comment": "", "rating": 3}]},
                    {"id": "1", "reviews": [
                        {"reviewerName": "1020", "comment": "I recommend ", "rating": 2},
                        {"reviewerName": "1021", "comment": "Got me to the next level!", "rating": 3}
                    ]},
                    {"id": "42", "reviews": []}
                ]
            })
        );
    }

    #[tokio::test]
    async fn test_unknown_type_is_null_without_error() {
        let query = r#"{
            _entities(representations: [
                {__typename: "Product", upc: "top-1"},
                {__typename: "Course", id: "3"}
            ]) { ... on Course { id } }
        }"#;
        let response = schema().execute(query).await;

        assert!(response.errors.is_empty());
        assert_eq!(
            response.data.into_json().unwrap(),
            json!({"_entities": [null, {"id": "3"}]})
        );
    }

    #[tokio::test]
    async fn test_malformed_representations_are_reported_per_element() {
        let query = r#"{
            _entities(representations: [
                {__typename: "Course", id: "1"},
                {__typename: "Course"},
                {__typename: "Course", id: 2},
                {id: "3"}
            ]) { ... on Course { id } }
        }"#;
        let response = schema().execute(query).await;

        assert_eq!(
            response.data.into_json().unwrap(),
            json!({"_entities": [{"id": "1"}, null, null, null]})
        );

        let paths: Vec<_> = response.errors.iter().map(|e| e.path.clone()).collect();
        assert_eq!(
            paths,
            vec![
                vec![PathSegment::Field("_entities".to_string()), PathSegment::Index(1)],
                vec![PathSegment::Field("_entities".to_string()), PathSegment::Index(2)],
                vec![PathSegment::Field("_entities".to_string()), PathSegment::Index(3)],
            ]
        );
        for error in &response.errors {
            let code = error.extensions.as_ref().and_then(|ext| ext.get("code")).cloned();
            assert_eq!(code, Some(Value::from("BAD_USER_INPUT")));
        }
    }

    #[tokio::test]
    async fn test_entities_variables_and_alias() {
        let request = async_graphql::Request::new(
            "query($representations: [_Any!]!) { found: _entities(representations: $representations) { ... on Course { id } } }",
        )
        .variables(async_graphql::Variables::from_json(json!({
            "representations": [{"__typename": "Course", "id": "3"}, {"__typename": "Course"}]
        })));
        let response = schema().execute(request).await;

        assert_eq!(
            response.data.into_json().unwrap(),
            json!({"found": [{"id": "3"}, null]})
        );
        assert_eq!(
            response.errors[0].path,
            vec![PathSegment::Field("found".to_string()), PathSegment::Index(1)]
        );
    }

    #[tokio::test]
    async fn test_review_store_failure_nulls_only_its_element() {
        let schema = build_schema(Arc::new(FlakyReviews::new()));
        let query = r#"{
            _entities(representations: [
                {__typename: "Course", id: "1"},
                {__typename: "Course", id: "2"}
            ]) { ... on Course { id reviews { rating } } }
        }"#;
        let response = schema.execute(query).await;

        assert_eq!(
            response.data.into_json().unwrap(),
            json!({"_entities": [{"id": "1", "reviews": [{"rating": 2}, {"rating": 3}]}, null]})
        );
        assert_eq!(response.errors.len(), 1);
        assert_eq!(
            response.errors[0].path,
            vec![PathSegment::Field("_entities".to_string()), PathSegment::Index(1)]
        );
        let code = response.errors[0]
            .extensions
            .as_ref()
            .and_then(|ext| ext.get("code"))
            .cloned();
        assert_eq!(code, Some(Value::from("INTERNAL_SERVER_ERROR")));
    }

    #[tokio::test]
    async fn test_stubs_skip_store_when_reviews_not_selected() {
        let store = Arc::new(FlakyReviews::new());
        let schema = build_schema(store.clone());
        let response = schema
            .execute(r#"{ _entities(representations: [{__typename: "Course", id: "2"}]) { ... on Course { id } } }"#)
            .await;

        assert!(response.errors.is_empty());
        assert_eq!(response.data.into_json().unwrap(), json!({"_entities": [{"id": "2"}]}));
        assert_eq!(store.lookups.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_reviews_looked_up_once_per_stub() {
        let store = Arc::new(FlakyReviews::new());
        let schema = build_schema(store.clone());
        let response = schema
            .execute(
                r#"{ _entities(representations: [{__typename: "Course", id: "1"}, {__typename: "Course", id: "3"}]) {
                    ... on Course { reviews { id } }
                } }"#,
            )
            .await;

        assert!(response.errors.is_empty());
        assert_eq!(store.lookups.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_blank_key_is_malformed() {
        let response = schema()
            .execute(r#"{ _entities(representations: [{__typename: "Course", id: "   "}]) { ... on Course { id reviews { id } } } }"#)
            .await;

        assert_eq!(response.data.into_json().unwrap(), json!({"_entities": [null]}));
        assert_eq!(response.errors.len(), 1);
        let code = response.errors[0]
            .extensions
            .as_ref()
            .and_then(|ext| ext.get("code"))
            .cloned();
        assert_eq!(code, Some(Value::from("BAD_USER_INPUT")));
    }

    #[test]
    fn test_service_sdl_matches_schema() {
        let declared = federation::sdl_fields(REVIEW_SDL);
        let exported = federation::sdl_fields(&schema().sdl());

        assert_eq!(declared.keys().map(String::as_str).collect::<Vec<_>>(), vec!["Course", "Review"]);
        for (name, fields) in &declared {
            assert_eq!(exported.get(name), Some(fields), "fields of {name}");
        }
    }

    #[tokio::test]
    async fn test_empty_batch() {
        let response = schema().execute("{ _entities(representations: []) { __typename } }").await;
        assert!(response.errors.is_empty());
        assert_eq!(response.data.into_json().unwrap(), json!({"_entities": []}));
    }

    #[tokio::test]
    async fn test_service_sdl_extends_course() {
        let response = schema().execute("{ _service { sdl } }").await;
        let data = response.data.into_json().unwrap();
        let sdl = data["_service"]["sdl"].as_str().unwrap();
        assert!(sdl.contains("reviews: [Review!]!"));
        assert!(!sdl.contains("category"));
    }

    #[test]
    fn test_entity_type_dispatch() {
        assert_eq!(ReviewEntityType::from_typename("Course"), Some(ReviewEntityType::Course));
        assert_eq!(ReviewEntityType::from_typename("Review"), None);
    }
}
