//! Two-tier vector store for course material.
//!
//! A store owns two logical collections: a *catalog* with one vector per
//! course title (used for fuzzy name resolution) and a *content index* with
//! one vector per chunk, filterable by resolved course title and lesson
//! number.

mod memory;
mod sqlite;

pub use memory::MemoryCourseStore;
pub use sqlite::SqliteCourseStore;

use crate::error::Result;
use crate::models::{Course, CourseChunk};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// Metadata attached to one content-index hit.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ChunkMetadata {
    /// Title of the owning course. Missing metadata renders as "unknown"
    /// downstream, so this stays optional.
    pub course_title: Option<String>,
    /// Lesson the chunk belongs to, if any.
    pub lesson_number: Option<u32>,
    /// Stable ordinal position within the course.
    pub chunk_index: usize,
}

/// Transient value returned by a content-index query.
///
/// `documents`, `metadata`, and `distances` are parallel, index-aligned
/// sequences. If `error` is set the three sequences are empty and callers
/// must short-circuit on it before inspecting results. Distances are
/// non-negative, ascending; lower means more similar.
#[derive(Debug, Clone, Default)]
pub struct SearchResults {
    pub documents: Vec<String>,
    pub metadata: Vec<ChunkMetadata>,
    pub distances: Vec<f32>,
    pub error: Option<String>,
}

impl SearchResults {
    /// Build a successful result set from parallel sequences.
    pub fn hits(documents: Vec<String>, metadata: Vec<ChunkMetadata>, distances: Vec<f32>) -> Self {
        debug_assert_eq!(documents.len(), metadata.len());
        debug_assert_eq!(documents.len(), distances.len());
        Self {
            documents,
            metadata,
            distances,
            error: None,
        }
    }

    /// Build an error result; the sequences stay empty.
    pub fn failure(message: impl Into<String>) -> Self {
        Self {
            error: Some(message.into()),
            ..Default::default()
        }
    }

    /// Whether the result set carries no documents.
    pub fn is_empty(&self) -> bool {
        self.documents.is_empty()
    }
}

/// Error result for a course name that resolved to nothing.
pub(crate) fn no_course_match(name: &str) -> SearchResults {
    SearchResults::failure(format!("No course found matching '{}'", name))
}

/// Trait for course store implementations.
#[async_trait]
pub trait CourseStore: Send + Sync {
    /// Resolve a fuzzy, user-supplied course name against the catalog.
    ///
    /// Returns the single best canonical title above the similarity
    /// threshold, or `None` when the catalog is empty or nothing matches.
    async fn resolve_course_name(&self, name: &str) -> Result<Option<String>>;

    /// Semantic query over the content index, optionally restricted to a
    /// course (resolved via the catalog first) and/or an exact lesson number.
    ///
    /// Failures are reported through `SearchResults::error`, never as `Err`;
    /// a failed course resolution short-circuits without touching the
    /// content index.
    async fn search(
        &self,
        query: &str,
        course_name: Option<&str>,
        lesson_number: Option<u32>,
    ) -> SearchResults;

    /// Point lookup of a lesson link for provenance display. Absence is not
    /// an error.
    async fn get_lesson_link(&self, course_title: &str, lesson_number: u32)
        -> Result<Option<String>>;

    /// Fetch a course's full metadata by exact title.
    async fn get_course(&self, title: &str) -> Result<Option<Course>>;

    /// Idempotent upsert of a course into the catalog, keyed by title.
    async fn add_course_metadata(&self, course: &Course) -> Result<()>;

    /// Idempotent upsert of chunks into the content index, keyed by
    /// `(course_title, chunk_index)`.
    async fn add_course_content(&self, chunks: &[CourseChunk]) -> Result<usize>;

    /// Number of courses in the catalog.
    async fn get_course_count(&self) -> Result<usize>;

    /// Titles of all cataloged courses.
    async fn get_existing_course_titles(&self) -> Result<Vec<String>>;
}

/// Compute cosine similarity between two vectors.
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    if a.len() != b.len() || a.is_empty() {
        return 0.0;
    }

    let dot_product: f32 = a.iter().zip(b.iter()).map(|(x, y)| x * y).sum();
    let norm_a: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let norm_b: f32 = b.iter().map(|x| x * x).sum::<f32>().sqrt();

    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }

    dot_product / (norm_a * norm_b)
}

/// Convert a cosine similarity into the non-negative distance reported in
/// `SearchResults` (lower is closer).
pub(crate) fn similarity_to_distance(score: f32) -> f32 {
    (1.0 - score).max(0.0)
}
