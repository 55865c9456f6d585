//! SQLite-based course store implementation.
//!
//! Uses SQLite with cosine similarity computed in Rust for simplicity.
//! For large corpora consider the sqlite-vec extension or a dedicated
//! vector database.

use super::{
    cosine_similarity, no_course_match, similarity_to_distance, ChunkMetadata, CourseStore,
    SearchResults,
};
use crate::embedding::Embedder;
use crate::error::{PensumError, Result};
use crate::models::{Course, CourseChunk, Lesson};
use async_trait::async_trait;
use rusqlite::{params, Connection};
use std::path::Path;
use std::sync::{Arc, Mutex};
use tracing::{debug, info, instrument};

const SCHEMA: &str = r#"
CREATE TABLE IF NOT EXISTS courses (
    title TEXT PRIMARY KEY,
    course_link TEXT,
    instructor TEXT,
    lessons_json TEXT NOT NULL,
    embedding BLOB NOT NULL
);

CREATE TABLE IF NOT EXISTS chunks (
    course_title TEXT NOT NULL,
    chunk_index INTEGER NOT NULL,
    lesson_number INTEGER,
    content TEXT NOT NULL,
    embedding BLOB NOT NULL,
    PRIMARY KEY (course_title, chunk_index)
);

CREATE INDEX IF NOT EXISTS idx_chunks_course_title ON chunks(course_title);
"#;

/// SQLite-based course store.
pub struct SqliteCourseStore {
    conn: Mutex<Connection>,
    embedder: Arc<dyn Embedder>,
    max_results: usize,
    course_match_threshold: f32,
}

impl SqliteCourseStore {
    /// Create a new SQLite course store.
    #[instrument(skip_all)]
    pub fn new(path: &Path, embedder: Arc<dyn Embedder>) -> Result<Self> {
        // Create parent directories if needed
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let conn = Connection::open(path)?;

        // Enable WAL mode for better concurrent performance
        conn.execute_batch("PRAGMA journal_mode=WAL;")?;
        conn.execute_batch(SCHEMA)?;

        info!("Initialized SQLite course store at {:?}", path);

        Ok(Self {
            conn: Mutex::new(conn),
            embedder,
            max_results: 5,
            course_match_threshold: 0.3,
        })
    }

    /// Create an in-memory SQLite course store (useful for testing).
    pub fn in_memory(embedder: Arc<dyn Embedder>) -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        conn.execute_batch(SCHEMA)?;

        Ok(Self {
            conn: Mutex::new(conn),
            embedder,
            max_results: 5,
            course_match_threshold: 0.3,
        })
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

    fn lock_conn(&self) -> Result<std::sync::MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|e| PensumError::VectorStore(format!("Failed to acquire lock: {}", e)))
    }

    /// Serialize embedding to bytes.
    fn embedding_to_bytes(embedding: &[f32]) -> Vec<u8> {
        embedding.iter().flat_map(|f| f.to_le_bytes()).collect()
    }

    /// Deserialize embedding from bytes.
    fn bytes_to_embedding(bytes: &[u8]) -> Vec<f32> {
        bytes
            .chunks_exact(4)
            .map(|chunk| {
                let arr: [u8; 4] = chunk.try_into().unwrap_or_default();
                f32::from_le_bytes(arr)
            })
            .collect()
    }

    fn load_course_row(lessons_json: &str, title: String, link: Option<String>, instructor: Option<String>) -> Result<Course> {
        let lessons: Vec<Lesson> = serde_json::from_str(lessons_json)
            .map_err(|e| PensumError::VectorStore(format!("Failed to decode lessons: {}", e)))?;
        Ok(Course {
            title,
            course_link: link,
            instructor,
            lessons,
        })
    }

    /// Catalog nearest-neighbor lookup; shared by resolution and search.
    fn best_catalog_match(&self, query_embedding: &[f32]) -> Result<Option<String>> {
        let conn = self.lock_conn()?;
        let mut stmt = conn.prepare("SELECT title, embedding FROM courses")?;

        let rows = stmt.query_map([], |row| {
            let title: String = row.get(0)?;
            let bytes: Vec<u8> = row.get(1)?;
            Ok((title, bytes))
        })?;

        let mut best: Option<(String, f32)> = None;
        for row in rows {
            let (title, bytes) = row?;
            let score = cosine_similarity(query_embedding, &Self::bytes_to_embedding(&bytes));
            if best.as_ref().map_or(true, |(_, s)| score > *s) {
                best = Some((title, score));
            }
        }

        Ok(best
            .filter(|(_, score)| *score >= self.course_match_threshold)
            .map(|(title, _)| title))
    }

    fn query_chunks(
        &self,
        query_embedding: &[f32],
        course_title: Option<&str>,
        lesson_number: Option<u32>,
    ) -> Result<SearchResults> {
        let conn = self.lock_conn()?;

        let mut sql =
            String::from("SELECT content, course_title, lesson_number, chunk_index, embedding FROM chunks");
        let mut clauses = Vec::new();
        let mut args: Vec<Box<dyn rusqlite::ToSql>> = Vec::new();
        if let Some(title) = course_title {
            clauses.push("course_title = ?");
            args.push(Box::new(title.to_string()));
        }
        if let Some(lesson) = lesson_number {
            clauses.push("lesson_number = ?");
            args.push(Box::new(lesson));
        }
        if !clauses.is_empty() {
            sql.push_str(" WHERE ");
            sql.push_str(&clauses.join(" AND "));
        }

        let mut stmt = conn.prepare(&sql)?;
        let params_ref: Vec<&dyn rusqlite::ToSql> = args.iter().map(|a| a.as_ref()).collect();

        let rows = stmt.query_map(params_ref.as_slice(), |row| {
            let content: String = row.get(0)?;
            let course_title: String = row.get(1)?;
            let lesson_number: Option<u32> = row.get(2)?;
            let chunk_index: i64 = row.get(3)?;
            let embedding_bytes: Vec<u8> = row.get(4)?;
            Ok((content, course_title, lesson_number, chunk_index, embedding_bytes))
        })?;

        let mut scored = Vec::new();
        for row in rows {
            let (content, course_title, lesson_number, chunk_index, embedding_bytes) = row?;
            let distance = similarity_to_distance(cosine_similarity(
                query_embedding,
                &Self::bytes_to_embedding(&embedding_bytes),
            ));
            scored.push((
                content,
                ChunkMetadata {
                    course_title: Some(course_title),
                    lesson_number,
                    chunk_index: chunk_index as usize,
                },
                distance,
            ));
        }

        scored.sort_by(|a, b| a.2.partial_cmp(&b.2).unwrap_or(std::cmp::Ordering::Equal));
        scored.truncate(self.max_results);

        let mut documents = Vec::with_capacity(scored.len());
        let mut metadata = Vec::with_capacity(scored.len());
        let mut distances = Vec::with_capacity(scored.len());
        for (content, meta, distance) in scored {
            documents.push(content);
            metadata.push(meta);
            distances.push(distance);
        }

        debug!("Found {} matching chunks", documents.len());
        Ok(SearchResults::hits(documents, metadata, distances))
    }
}

#[async_trait]
impl CourseStore for SqliteCourseStore {
    #[instrument(skip(self))]
    async fn resolve_course_name(&self, name: &str) -> Result<Option<String>> {
        let query_embedding = self.embedder.embed(name).await?;
        self.best_catalog_match(&query_embedding)
    }

    #[instrument(skip(self))]
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

        match self.query_chunks(&query_embedding, course_filter.as_deref(), lesson_number) {
            Ok(results) => results,
            Err(e) => SearchResults::failure(e.to_string()),
        }
    }

    async fn get_lesson_link(
        &self,
        course_title: &str,
        lesson_number: u32,
    ) -> Result<Option<String>> {
        let course = self.get_course(course_title).await?;
        Ok(course
            .and_then(|c| c.lesson(lesson_number).cloned())
            .and_then(|lesson| lesson.lesson_link))
    }

    async fn get_course(&self, title: &str) -> Result<Option<Course>> {
        let conn = self.lock_conn()?;

        let row = conn.query_row(
            "SELECT title, course_link, instructor, lessons_json FROM courses WHERE title = ?1",
            params![title],
            |row| {
                let title: String = row.get(0)?;
                let link: Option<String> = row.get(1)?;
                let instructor: Option<String> = row.get(2)?;
                let lessons_json: String = row.get(3)?;
                Ok((title, link, instructor, lessons_json))
            },
        );

        match row {
            Ok((title, link, instructor, lessons_json)) => {
                Ok(Some(Self::load_course_row(&lessons_json, title, link, instructor)?))
            }
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    #[instrument(skip(self, course), fields(title = %course.title))]
    async fn add_course_metadata(&self, course: &Course) -> Result<()> {
        let embedding = self.embedder.embed(&course.title).await?;
        let lessons_json = serde_json::to_string(&course.lessons)?;

        let conn = self.lock_conn()?;
        conn.execute(
            r#"
            INSERT OR REPLACE INTO courses (title, course_link, instructor, lessons_json, embedding)
            VALUES (?1, ?2, ?3, ?4, ?5)
            "#,
            params![
                course.title,
                course.course_link,
                course.instructor,
                lessons_json,
                Self::embedding_to_bytes(&embedding),
            ],
        )?;

        debug!("Upserted course metadata");
        Ok(())
    }

    #[instrument(skip(self, chunks), fields(count = chunks.len()))]
    async fn add_course_content(&self, chunks: &[CourseChunk]) -> Result<usize> {
        if chunks.is_empty() {
            return Ok(0);
        }

        let texts: Vec<String> = chunks.iter().map(|c| c.content.clone()).collect();
        let embeddings = self.embedder.embed_batch(&texts).await?;

        let conn = self.lock_conn()?;
        let tx = conn.unchecked_transaction()?;

        for (chunk, embedding) in chunks.iter().zip(embeddings) {
            tx.execute(
                r#"
                INSERT OR REPLACE INTO chunks
                (course_title, chunk_index, lesson_number, content, embedding)
                VALUES (?1, ?2, ?3, ?4, ?5)
                "#,
                params![
                    chunk.course_title,
                    chunk.chunk_index as i64,
                    chunk.lesson_number,
                    chunk.content,
                    Self::embedding_to_bytes(&embedding),
                ],
            )?;
        }

        tx.commit()?;
        info!("Indexed {} chunks", chunks.len());
        Ok(chunks.len())
    }

    async fn get_course_count(&self) -> Result<usize> {
        let conn = self.lock_conn()?;
        let count: i64 = conn.query_row("SELECT COUNT(*) FROM courses", [], |row| row.get(0))?;
        Ok(count as usize)
    }

    async fn get_existing_course_titles(&self) -> Result<Vec<String>> {
        let conn = self.lock_conn()?;
        let mut stmt = conn.prepare("SELECT title FROM courses ORDER BY title")?;
        let rows = stmt.query_map([], |row| row.get::<_, String>(0))?;

        let mut titles = Vec::new();
        for title in rows {
            titles.push(title?);
        }
        Ok(titles)
    }
}
