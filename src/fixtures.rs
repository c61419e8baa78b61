//! Fixture data standing in for the subgraphs' backing stores
//!
//! The built-in set is what both binaries serve by default. A JSON file with
//! the same shape can replace it:
//!
//! ```json
//! {
//!   "courses": [{ "id": "1", "name": "GraphQL", "category": "Technology" }],
//!   "reviews": [{ "id": "101", "courseId": "1", "reviewerName": "1020", "comment": "", "rating": 2 }]
//! }
//! ```

use std::collections::HashSet;
use std::path::Path;

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::course::OwnedCourse;
use crate::review::Review;
use crate::store::{InMemoryStore, StoreError};

/// Accepted review ratings
pub const RATING_RANGE: std::ops::RangeInclusive<i32> = 1..=5;

/// Course and review records loaded at start-up
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Fixtures {
    #[serde(default)]
    pub courses: Vec<OwnedCourse>,
    #[serde(default)]
    pub reviews: Vec<Review>,
}

impl Fixtures {
    /// Built-in data set
    pub fn builtin() -> Self {
        let course = |id: &str, name: &str, category: &str| OwnedCourse {
            id: id.to_string(),
            name: name.to_string(),
            category: category.to_string(),
        };
        let review = |id: &str, course_id: &str, reviewer_name: &str, comment: &str, rating: i32| Review {
            id: id.to_string(),
            course_id: course_id.to_string(),
            reviewer_name: reviewer_name.to_string(),
            comment: comment.to_string(),
            rating,
        };

        Self {
            courses: vec![
                course("1", "GraphQL", "Technology"),
                course("2", "Inonasia-Java", "Places"),
                course("3", "Fidelity", "Investments"),
            ],
            reviews: vec![
                review("101", "1", "1020", "I recommend ", 2),
                review("102", "1", "1021", "Got me to the next level!", 3),
                review("201", "2", "1030", "", 3),
                review("301", "3", "1050", "Amazing place to invest! Would use again and again !", 3),
                review("302", "3", "1051", "", 3),
            ],
        }
    }

    /// Parse and validate fixtures from JSON text
    pub fn from_json(json: &str) -> Result<Self, StoreError> {
        let fixtures: Self = serde_json::from_str(json)?;
        fixtures.validate()?;
        Ok(fixtures)
    }

    /// Read, parse and validate a fixture file
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self, StoreError> {
        let path = path.as_ref();
        let json = std::fs::read_to_string(path)?;
        let fixtures = Self::from_json(&json)?;
        tracing::info!(
            path = %path.display(),
            courses = fixtures.courses.len(),
            reviews = fixtures.reviews.len(),
            "loaded fixtures"
        );
        Ok(fixtures)
    }

    /// Check ids, uniqueness and rating range
    pub fn validate(&self) -> Result<(), StoreError> {
        let mut course_ids = HashSet::new();
        for course in &self.courses {
            if course.id.trim().is_empty() {
                return Err(invalid(&course.id, "course id must not be empty"));
            }
            if !course_ids.insert(course.id.as_str()) {
                return Err(invalid(&course.id, "duplicate course id"));
            }
        }

        let mut review_ids = HashSet::new();
        for review in &self.reviews {
            if review.id.trim().is_empty() {
                return Err(invalid(&review.id, "review id must not be empty"));
            }
            if !review_ids.insert(review.id.as_str()) {
                return Err(invalid(&review.id, "duplicate review id"));
            }
            if review.course_id.trim().is_empty() {
                return Err(invalid(&review.id, "courseId must not be empty"));
            }
            if !RATING_RANGE.contains(&review.rating) {
                return Err(invalid(
                    &review.id,
                    &format!("rating {} outside {}..={}", review.rating, RATING_RANGE.start(), RATING_RANGE.end()),
                ));
            }
        }

        Ok(())
    }

    /// Course store keyed by id, in fixture order
    pub fn course_store(&self) -> InMemoryStore<OwnedCourse> {
        InMemoryStore::from_records(self.courses.iter().map(|course| (course.id.clone(), course.clone())))
    }

    /// Review store keyed by course id, each list in fixture order
    pub fn review_store(&self) -> InMemoryStore<Vec<Review>> {
        let mut by_course: IndexMap<String, Vec<Review>> = IndexMap::new();
        for review in &self.reviews {
            by_course.entry(review.course_id.clone()).or_default().push(review.clone());
        }
        InMemoryStore::from_records(by_course)
    }
}

fn invalid(id: &str, reason: &str) -> StoreError {
    StoreError::InvalidRecord {
        id: id.to_string(),
        reason: reason.to_string(),
    }
}
