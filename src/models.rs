//! Core data records for courses, lessons, and indexed content chunks.

use serde::{Deserialize, Serialize};

/// A course with its ordered lessons.
///
/// The title is the unique key used everywhere else (catalog identity,
/// chunk foreign keys); records are immutable once ingested.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Course {
    /// Course title (unique, case-sensitive join key).
    pub title: String,
    /// Link to the course page.
    #[serde(default)]
    pub course_link: Option<String>,
    /// Instructor name.
    #[serde(default)]
    pub instructor: Option<String>,
    /// Ordered lessons.
    #[serde(default)]
    pub lessons: Vec<Lesson>,
}

impl Course {
    /// Look up a lesson by number.
    pub fn lesson(&self, lesson_number: u32) -> Option<&Lesson> {
        self.lessons.iter().find(|l| l.lesson_number == lesson_number)
    }
}

/// A single lesson within a course.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Lesson {
    /// Positive lesson number, unique within its course.
    pub lesson_number: u32,
    /// Lesson title.
    pub title: String,
    /// Link to the lesson page.
    #[serde(default)]
    pub lesson_link: Option<String>,
}

/// One indexed span of course content.
///
/// `chunk_index` is the stable ordinal position within the course and forms
/// the upsert key together with `course_title`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CourseChunk {
    /// Text content of this chunk.
    pub content: String,
    /// Title of the owning course.
    pub course_title: String,
    /// Lesson this chunk belongs to, if any.
    #[serde(default)]
    pub lesson_number: Option<u32>,
    /// Ordinal position within the course.
    pub chunk_index: usize,
}

/// A pre-chunked course document as ingested from JSON.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CourseDocument {
    pub course: Course,
    pub chunks: Vec<CourseChunk>,
}
