//! # course-federation
//!
//! Two Apollo Federation subgraphs sharing the `Course` entity.
//!
//! ## Subgraphs
//!
//! - **Course** ([`course`]) - owns `Course` identity plus its `name` and `category`
//! - **Review** ([`review`]) - owns `Review` and extends `Course` with `reviews`
//!
//! The review subgraph never looks a course up. A gateway hands it key-only
//! representations through `_entities`, it turns them into [`review::CourseRef`]
//! stubs, and `Course.reviews` is resolved against those stubs.
//!
//! ## Usage
//!
//! ```rust
//! use std::sync::Arc;
//! use course_federation::{fixtures::Fixtures, review};
//!
//! # async fn example() {
//! let fixtures = Fixtures::builtin();
//! let schema = review::build_schema(Arc::new(fixtures.review_store()));
//! let response = schema
//!     .execute(r#"{ _entities(representations: [{__typename: "Course", id: "1"}]) { ... on Course { reviews { rating } } } }"#)
//!     .await;
//! assert!(response.errors.is_empty());
//! # }
//! ```

pub mod config;
pub mod course;
pub mod federation;
pub mod fixtures;
pub mod review;
pub mod server;
pub mod store;
pub mod telemetry;

pub use course::{CourseSchema, OwnedCourse};
pub use federation::{EntityResolution, EntityResolver, Representation, RepresentationError};
pub use fixtures::Fixtures;
pub use review::{CourseRef, Review, ReviewSchema};
pub use store::{DataSource, InMemoryStore, StoreError};

use async_graphql::ErrorExtensions;
use thiserror::Error;

/// Subgraph errors
#[derive(Error, Debug)]
pub enum SubgraphError {
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    #[error("Malformed representation: {0}")]
    Representation(#[from] RepresentationError),

    #[error("Store error: {0}")]
    Store(#[from] StoreError),
}

impl SubgraphError {
    /// GraphQL error code reported in `extensions.code`
    pub fn code(&self) -> &'static str {
        match self {
            SubgraphError::InvalidArgument(_) | SubgraphError::Representation(_) => "BAD_USER_INPUT",
            SubgraphError::Store(_) => "INTERNAL_SERVER_ERROR",
        }
    }
}

impl ErrorExtensions for SubgraphError {
    fn extend(&self) -> async_graphql::Error {
        async_graphql::Error::new(self.to_string()).extend_with(|_, e| e.set("code", self.code()))
    }
}

/// Result type for subgraph operations
pub type Result<T> = std::result::Result<T, SubgraphError>;
