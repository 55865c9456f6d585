//! In-memory course store implementation.
//!
//! Useful for testing and small corpora.

use super::{
    cosine_similarity, no_course_match, similarity_to_distance, ChunkMetadata, CourseStore,
    SearchResults,
};
use crate::embedding::Embedder;
use crate::error::Result;
use crate::models::{Course, CourseChunk};
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::{Arc, RwLock};

struct CatalogEntry {
    course: Course,
    embedding: Vec<f32>,
}

struct ChunkEntry {
    chunk: CourseChunk,
    embedding: Vec<f32>,
}

/// In-memory course store.
pub struct MemoryCourseStore {
    embedder: Arc<dyn Embedder>,
    max_results: usize,
    course_match_threshold: f32,
    catalog: RwLock<HashMap<String, CatalogEntry>>,
    chunks: RwLock<HashMap<(String, usize), ChunkEntry>>,
}

impl MemoryCourseStore {
    /// Create a new in-memory course store.
    pub fn new(embedder: Arc<dyn Embedder>) -> Self {
        Self {
            embedder,
            max_results: 5,
            course_match_threshold: 0.3,
            catalog: RwLock::new(HashMap::new()),
            chunks: RwLock::new(HashMap::new()),
        }
    }

    /// Set the maximum number of results per content search.
    pub fn with_max_results(mut self, max_results: usize) -> Self {
        self.max_results = max_results;
        self
    }

    /// Set the minimum similarity for fuzzy course-name resolution.
    pub fn with_course_match_threshold(mut self, threshold: f32) -> Self {
        self.course_match_threshold = threshold;
        self
    }
}

#[async_trait]
impl CourseStore for MemoryCourseStore {
    async fn resolve_course_name(&self, name: &str) -> Result<Option<String>> {
        let query = self.embedder.embed(name).await?;
        let catalog = self.catalog.read().unwrap();

        let best = catalog
            .values()
            .map(|entry| {
                (
                    entry.course.title.clone(),
                    cosine_similarity(&query, &entry.embedding),
                )
            })
            .max_by(|a, b| a.1.partial_cmp(&b.1).unwrap_or(std::cmp::Ordering::Equal));

        Ok(best
            .filter(|(_, score)| *score >= self.course_match_threshold)
            .map(|(title, _)| title))
    }

    async fn search(
        &self,
        query: &str,
        course_name: Option<&str>,
        lesson_number: Option<u32>,
    ) -> SearchResults {
        // Resolve the course filter first; a miss never touches the content index.
        let course_filter = match course_name {
            Some(name) => match self.resolve_course_name(name).await {
                Ok(Some(title)) => Some(title),
                Ok(None) => return no_course_match(name),
                Err(e) => return SearchResults::failure(e.to_string()),
            },
            None => None,
        };

        let query_embedding = match self.embedder.embed(query).await {
            Ok(embedding) => embedding,
            Err(e) => return SearchResults::failure(e.to_string()),
        };

        let chunks = self.chunks.read().unwrap();
        let mut scored: Vec<(&ChunkEntry, f32)> = chunks
            .values()
            .filter(|entry| {
                course_filter
                    .as_deref()
                    .map_or(true, |title| entry.chunk.course_title == title)
                    && lesson_number.map_or(true, |n| entry.chunk.lesson_number == Some(n))
            })
            .map(|entry| {
                let distance = similarity_to_distance(cosine_similarity(
                    &query_embedding,
                    &entry.embedding,
                ));
                (entry, distance)
            })
            .collect();

        scored.sort_by(|a, b| a.1.partial_cmp(&b.1).unwrap_or(std::cmp::Ordering::Equal));
        scored.truncate(self.max_results);

        let mut documents = Vec::with_capacity(scored.len());
        let mut metadata = Vec::with_capacity(scored.len());
        let mut distances = Vec::with_capacity(scored.len());
        for (entry, distance) in scored {
            documents.push(entry.chunk.content.clone());
            metadata.push(ChunkMetadata {
                course_title: Some(entry.chunk.course_title.clone()),
                lesson_number: entry.chunk.lesson_number,
                chunk_index: entry.chunk.chunk_index,
            });
            distances.push(distance);
        }

        SearchResults::hits(documents, metadata, distances)
    }

    async fn get_lesson_link(
        &self,
        course_title: &str,
        lesson_number: u32,
    ) -> Result<Option<String>> {
        let catalog = self.catalog.read().unwrap();
        Ok(catalog
            .get(course_title)
            .and_then(|entry| entry.course.lesson(lesson_number))
            .and_then(|lesson| lesson.lesson_link.clone()))
    }

    async fn get_course(&self, title: &str) -> Result<Option<Course>> {
        let catalog = self.catalog.read().unwrap();
        Ok(catalog.get(title).map(|entry| entry.course.clone()))
    }

    async fn add_course_metadata(&self, course: &Course) -> Result<()> {
        let embedding = self.embedder.embed(&course.title).await?;
        let mut catalog = self.catalog.write().unwrap();
        catalog.insert(
            course.title.clone(),
            CatalogEntry {
                course: course.clone(),
                embedding,
            },
        );
        Ok(())
    }

    async fn add_course_content(&self, chunks: &[CourseChunk]) -> Result<usize> {
        if chunks.is_empty() {
            return Ok(0);
        }

        let texts: Vec<String> = chunks.iter().map(|c| c.content.clone()).collect();
        let embeddings = self.embedder.embed_batch(&texts).await?;

        let mut store = self.chunks.write().unwrap();
        for (chunk, embedding) in chunks.iter().zip(embeddings) {
            store.insert(
                (chunk.course_title.clone(), chunk.chunk_index),
                ChunkEntry {
                    chunk: chunk.clone(),
                    embedding,
                },
            );
        }
        Ok(chunks.len())
    }

    async fn get_course_count(&self) -> Result<usize> {
        Ok(self.catalog.read().unwrap().len())
    }

    async fn get_existing_course_titles(&self) -> Result<Vec<String>> {
        let mut titles: Vec<String> = self.catalog.read().unwrap().keys().cloned().collect();
        titles.sort();
        Ok(titles)
    }
}
