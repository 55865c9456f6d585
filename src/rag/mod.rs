//! The RAG system: per-query composition of sessions, the conversation
//! agent, and the retrieval tools.

use crate::agent::{ConversationAgent, LlmClient, OpenAiLlm};
use crate::config::Settings;
use crate::embedding::OpenAIEmbedder;
use crate::error::{PensumError, Result};
use crate::models::{Course, CourseChunk, CourseDocument};
use crate::session::SessionManager;
use crate::tools::{OutlineTool, SearchTool, Source, ToolManager};
use crate::vector_store::{CourseStore, SqliteCourseStore};
use std::sync::Arc;
use tracing::{info, instrument};

/// Answer to one query, with provenance and the session it belongs to.
#[derive(Debug, Clone)]
pub struct QueryResponse {
    pub answer: String,
    pub sources: Vec<Source>,
    pub session_id: String,
}

/// Catalog statistics for the analytics endpoint.
#[derive(Debug, Clone)]
pub struct CourseAnalytics {
    pub total_courses: usize,
    pub course_titles: Vec<String>,
}

/// Outcome of ingesting a batch of course documents.
#[derive(Debug, Clone, Default)]
pub struct IngestReport {
    pub courses_added: usize,
    pub chunks_indexed: usize,
    pub skipped: Vec<String>,
}

/// Retrieval-augmented conversation engine over course transcripts.
pub struct RagSystem {
    store: Arc<dyn CourseStore>,
    tool_manager: ToolManager,
    agent: ConversationAgent,
    pub session_manager: SessionManager,
}

impl RagSystem {
    /// Create a system wired to SQLite storage and the OpenAI APIs.
    pub fn new(settings: &Settings) -> Result<Self> {
        let embedder = Arc::new(OpenAIEmbedder::with_config(
            &settings.embedding.model,
            settings.embedding.dimensions as usize,
        ));

        let store = Arc::new(
            SqliteCourseStore::new(&settings.sqlite_path(), embedder)?
                .with_max_results(settings.search.max_results)
                .with_course_match_threshold(settings.search.course_match_threshold),
        );

        let llm: Arc<dyn LlmClient> =
            Arc::new(OpenAiLlm::new(&settings.llm.model, settings.llm.max_tokens));

        Self::with_components(store, llm, settings)
    }

    /// Create a system from custom components (used by tests and embedders
    /// of the library).
    pub fn with_components(
        store: Arc<dyn CourseStore>,
        llm: Arc<dyn LlmClient>,
        settings: &Settings,
    ) -> Result<Self> {
        let mut tool_manager = ToolManager::new();
        tool_manager.register(Arc::new(SearchTool::new(store.clone())))?;
        tool_manager.register(Arc::new(OutlineTool::new(store.clone())))?;

        let agent =
            ConversationAgent::new(llm).with_max_tool_rounds(settings.llm.max_tool_rounds);

        Ok(Self {
            store,
            tool_manager,
            agent,
            session_manager: SessionManager::new(settings.session.max_history),
        })
    }

    /// Answer one user query within a session.
    ///
    /// Resolves or creates the session, feeds history and the tool registry
    /// to the agent, persists the exchange, and returns the answer with the
    /// sources collected during this query. Agent errors propagate
    /// unmodified.
    #[instrument(skip(self, text), fields(query = %text))]
    pub async fn query(&self, text: &str, session_id: Option<&str>) -> Result<QueryResponse> {
        let session_id = match session_id {
            Some(id) => id.to_string(),
            None => self.session_manager.create_session(),
        };

        let history = self.session_manager.get_conversation_history(&session_id);
        let prompt = format!("Answer this question about course materials: {}", text);

        // A fresh buffer per query; sources cannot leak across queries.
        let mut sources = Vec::new();
        let definitions = self.tool_manager.definitions();

        let answer = self
            .agent
            .generate(
                &prompt,
                history.as_deref(),
                Some(&definitions),
                Some(&self.tool_manager),
                &mut sources,
            )
            .await?;

        self.session_manager.add_exchange(&session_id, text, &answer);

        Ok(QueryResponse {
            answer,
            sources,
            session_id,
        })
    }

    /// Index one course: catalog entry plus its content chunks.
    pub async fn add_course(&self, course: &Course, chunks: &[CourseChunk]) -> Result<usize> {
        if let Some(chunk) = chunks.iter().find(|c| c.course_title != course.title) {
            return Err(PensumError::InvalidInput(format!(
                "Chunk {} belongs to course '{}', not '{}'",
                chunk.chunk_index, chunk.course_title, course.title
            )));
        }

        self.store.add_course_metadata(course).await?;
        let indexed = self.store.add_course_content(chunks).await?;
        info!(course = %course.title, chunks = indexed, "indexed course");
        Ok(indexed)
    }

    /// Ingest a batch of pre-chunked course documents.
    ///
    /// With `skip_existing`, courses already in the catalog are left
    /// untouched and reported in the returned [`IngestReport`].
    pub async fn add_course_documents(
        &self,
        documents: &[CourseDocument],
        skip_existing: bool,
    ) -> Result<IngestReport> {
        let existing = self.store.get_existing_course_titles().await?;
        let mut report = IngestReport::default();

        for document in documents {
            if skip_existing && existing.contains(&document.course.title) {
                report.skipped.push(document.course.title.clone());
                continue;
            }
            report.chunks_indexed += self.add_course(&document.course, &document.chunks).await?;
            report.courses_added += 1;
        }

        Ok(report)
    }

    /// Catalog statistics.
    pub async fn get_course_analytics(&self) -> Result<CourseAnalytics> {
        Ok(CourseAnalytics {
            total_courses: self.store.get_course_count().await?,
            course_titles: self.store.get_existing_course_titles().await?,
        })
    }
}
