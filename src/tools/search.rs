//! Course content search tool.

use super::{Source, Tool, ToolDefinition};
use crate::vector_store::CourseStore;
use async_trait::async_trait;
use serde_json::Value;
use std::sync::Arc;
use tracing::debug;

/// Semantic search over course content with optional course/lesson filters.
///
/// Exposed to the LLM as `search_course_content`.
pub struct SearchTool {
    store: Arc<dyn CourseStore>,
}

impl SearchTool {
    pub fn new(store: Arc<dyn CourseStore>) -> Self {
        Self { store }
    }

    /// Wording for an empty result set depends on which filters were active.
    fn no_results_message(course_name: Option<&str>, lesson_number: Option<u32>) -> String {
        let mut message = String::from("No relevant content found");
        if let Some(name) = course_name {
            message.push_str(&format!(" in course '{}'", name));
        }
        if let Some(lesson) = lesson_number {
            message.push_str(&format!(" in lesson {}", lesson));
        }
        message.push('.');
        message
    }
}

#[async_trait]
impl Tool for SearchTool {
    fn definition(&self) -> ToolDefinition {
        ToolDefinition {
            name: "search_course_content".to_string(),
            description: "Search course materials with smart course name matching and lesson filtering"
                .to_string(),
            parameters: serde_json::json!({
                "type": "object",
                "properties": {
                    "query": {
                        "type": "string",
                        "description": "What to search for in the course content"
                    },
                    "course_name": {
                        "type": "string",
                        "description": "Course title (partial matches work, e.g. 'MCP', 'Introduction')"
                    },
                    "lesson_number": {
                        "type": "integer",
                        "description": "Specific lesson number to search within (e.g. 1, 2, 3)"
                    }
                },
                "required": ["query"]
            }),
        }
    }

    async fn execute(&self, args: &Value, sources: &mut Vec<Source>) -> String {
        let query = match args.get("query").and_then(Value::as_str) {
            Some(q) if !q.trim().is_empty() => q,
            _ => return "Missing required 'query' argument".to_string(),
        };
        let course_name = args.get("course_name").and_then(Value::as_str);
        let lesson_number = args
            .get("lesson_number")
            .and_then(Value::as_u64)
            .map(|n| n as u32);

        debug!(query, ?course_name, ?lesson_number, "executing content search");

        let results = self.store.search(query, course_name, lesson_number).await;

        // Error strings go back to the LLM verbatim.
        if let Some(error) = results.error {
            return error;
        }

        if results.is_empty() {
            return Self::no_results_message(course_name, lesson_number);
        }

        let mut formatted = Vec::with_capacity(results.documents.len());
        for (document, meta) in results.documents.iter().zip(&results.metadata) {
            let course_title = meta.course_title.as_deref().unwrap_or("unknown");
            let header = match meta.lesson_number {
                Some(lesson) => format!("{} - Lesson {}", course_title, lesson),
                None => course_title.to_string(),
            };

            // Only lesson-scoped chunks can carry a provenance link.
            let link = match meta.lesson_number {
                Some(lesson) => self
                    .store
                    .get_lesson_link(course_title, lesson)
                    .await
                    .ok()
                    .flatten(),
                None => None,
            };

            sources.push(Source {
                text: header.clone(),
                link,
            });
            formatted.push(format!("[{}]\n{}", header, document));
        }

        formatted.join("\n\n")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::vector_store::testing::{make_results, sample_course, ScriptedStore};
    use crate::vector_store::{ChunkMetadata, SearchResults};
    use serde_json::json;

    fn tool_with(store: ScriptedStore) -> (SearchTool, Arc<ScriptedStore>) {
        let store = Arc::new(store);
        (SearchTool::new(store.clone()), store)
    }

    #[test]
    fn test_definition_declares_required_query() {
        let (tool, _) = tool_with(ScriptedStore::new());
        let definition = tool.definition();

        assert_eq!(definition.name, "search_course_content");
        assert!(definition.parameters["properties"]["query"].is_object());
        assert_eq!(definition.parameters["required"][0], "query");
    }

    #[tokio::test]
    async fn test_basic_search_formats_header_and_content() {
        let (tool, store) = tool_with(ScriptedStore::new());
        store.push_result(make_results(
            &["Python is a programming language."],
            "Python Fundamentals",
            &[Some(1)],
        ));

        let mut sources = Vec::new();
        let result = tool
            .execute(&json!({"query": "What is Python?"}), &mut sources)
            .await;

        assert!(result.contains("[Python Fundamentals - Lesson 1]"));
        assert!(result.contains("Python is a programming language."));

        let calls = store.search_calls();
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0].query, "What is Python?");
        assert_eq!(calls[0].course_name, None);
        assert_eq!(calls[0].lesson_number, None);
    }

    #[tokio::test]
    async fn test_filters_are_forwarded() {
        let (tool, store) = tool_with(ScriptedStore::new());
        store.push_result(make_results(
            &["Functions encapsulate code."],
            "Python Fundamentals",
            &[Some(4)],
        ));

        let mut sources = Vec::new();
        tool.execute(
            &json!({
                "query": "functions",
                "course_name": "Python Fundamentals",
                "lesson_number": 4
            }),
            &mut sources,
        )
        .await;

        let calls = store.search_calls();
        assert_eq!(calls[0].course_name.as_deref(), Some("Python Fundamentals"));
        assert_eq!(calls[0].lesson_number, Some(4));
    }

    #[tokio::test]
    async fn test_multiple_results_each_get_a_header() {
        let (tool, store) = tool_with(ScriptedStore::new());
        store.push_result(make_results(
            &[
                "Python is easy to learn.",
                "Python has simple syntax.",
                "Python is versatile.",
            ],
            "Python Fundamentals",
            &[Some(1), Some(1), Some(1)],
        ));

        let mut sources = Vec::new();
        let result = tool.execute(&json!({"query": "Python benefits"}), &mut sources).await;

        assert_eq!(result.matches("[Python Fundamentals - Lesson 1]").count(), 3);
        assert!(result.contains("Python is versatile."));
        assert_eq!(sources.len(), 3);
    }

    #[tokio::test]
    async fn test_empty_result_wording_varies_with_filters() {
        let cases: [(Value, &str); 4] = [
            (json!({"query": "x"}), "No relevant content found."),
            (
                json!({"query": "x", "course_name": "Python Fundamentals"}),
                "No relevant content found in course 'Python Fundamentals'.",
            ),
            (
                json!({"query": "x", "lesson_number": 5}),
                "No relevant content found in lesson 5.",
            ),
            (
                json!({"query": "x", "course_name": "Python Fundamentals", "lesson_number": 5}),
                "No relevant content found in course 'Python Fundamentals' in lesson 5.",
            ),
        ];

        for (args, expected) in cases {
            let (tool, store) = tool_with(ScriptedStore::new());
            store.push_result(SearchResults::default());
            let mut sources = Vec::new();
            assert_eq!(tool.execute(&args, &mut sources).await, expected);
            assert!(sources.is_empty());
        }
    }

    #[tokio::test]
    async fn test_store_error_is_returned_verbatim() {
        let (tool, store) = tool_with(ScriptedStore::new());
        store.push_result(SearchResults::failure("Database connection failed"));

        let mut sources = Vec::new();
        let result = tool.execute(&json!({"query": "test query"}), &mut sources).await;
        assert_eq!(result, "Database connection failed");
        assert!(sources.is_empty());
    }

    #[tokio::test]
    async fn test_sources_carry_lesson_links() {
        let store = ScriptedStore::new()
            .with_course(sample_course())
            .with_lesson_link("Python Fundamentals", 2, "https://example.com/lesson2");
        let (tool, store) = tool_with(store);
        store.push_result(make_results(
            &["Variables store data."],
            "Python Fundamentals",
            &[Some(2)],
        ));

        let mut sources = Vec::new();
        tool.execute(&json!({"query": "variables"}), &mut sources).await;

        assert_eq!(
            sources,
            vec![Source {
                text: "Python Fundamentals - Lesson 2".to_string(),
                link: Some("https://example.com/lesson2".to_string()),
            }]
        );
    }

    #[tokio::test]
    async fn test_missing_lesson_number_drops_lesson_from_header() {
        let (tool, store) = tool_with(ScriptedStore::new());
        store.push_result(make_results(
            &["Course overview text."],
            "Python Fundamentals",
            &[None],
        ));

        let mut sources = Vec::new();
        let result = tool.execute(&json!({"query": "overview"}), &mut sources).await;

        assert!(result.contains("[Python Fundamentals]\n"));
        assert!(!result.contains("Lesson"));
        assert_eq!(sources[0].text, "Python Fundamentals");
        assert_eq!(sources[0].link, None);
    }

    #[tokio::test]
    async fn test_missing_course_title_renders_unknown() {
        let (tool, store) = tool_with(ScriptedStore::new());
        store.push_result(SearchResults::hits(
            vec!["Orphaned chunk.".to_string()],
            vec![ChunkMetadata {
                course_title: None,
                lesson_number: None,
                chunk_index: 0,
            }],
            vec![0.1],
        ));

        let mut sources = Vec::new();
        let result = tool.execute(&json!({"query": "orphan"}), &mut sources).await;

        assert!(result.contains("[unknown]"));
        assert_eq!(sources[0].text, "unknown");
    }

    #[tokio::test]
    async fn test_missing_query_is_reported_as_string() {
        let (tool, _) = tool_with(ScriptedStore::new());
        let mut sources = Vec::new();
        let result = tool.execute(&json!({"course_name": "X"}), &mut sources).await;
        assert_eq!(result, "Missing required 'query' argument");
    }
}
