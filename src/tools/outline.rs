//! Course outline tool.

use super::{Source, Tool, ToolDefinition};
use crate::vector_store::CourseStore;
use async_trait::async_trait;
use serde_json::Value;
use std::sync::Arc;

/// Structural lookup of a course's lesson list.
///
/// Exposed to the LLM as `get_course_outline`. No semantic search over
/// content happens here, and no sources are recorded.
pub struct OutlineTool {
    store: Arc<dyn CourseStore>,
}

impl OutlineTool {
    pub fn new(store: Arc<dyn CourseStore>) -> Self {
        Self { store }
    }
}

#[async_trait]
impl Tool for OutlineTool {
    fn definition(&self) -> ToolDefinition {
        ToolDefinition {
            name: "get_course_outline".to_string(),
            description: "Get a course's title, link, and complete lesson list".to_string(),
            parameters: serde_json::json!({
                "type": "object",
                "properties": {
                    "course_name": {
                        "type": "string",
                        "description": "Course title (partial matches work)"
                    }
                },
                "required": ["course_name"]
            }),
        }
    }

    async fn execute(&self, args: &Value, _sources: &mut Vec<Source>) -> String {
        let course_name = match args.get("course_name").and_then(Value::as_str) {
            Some(name) if !name.trim().is_empty() => name,
            _ => return "Missing required 'course_name' argument".to_string(),
        };

        let resolved = match self.store.resolve_course_name(course_name).await {
            Ok(Some(title)) => title,
            Ok(None) => return format!("No course found matching '{}'", course_name),
            Err(e) => return e.to_string(),
        };

        let course = match self.store.get_course(&resolved).await {
            Ok(Some(course)) => course,
            Ok(None) => return format!("No course found matching '{}'", course_name),
            Err(e) => return e.to_string(),
        };

        let mut lines = vec![format!("Course: {}", course.title)];
        if let Some(link) = &course.course_link {
            lines.push(format!("Link: {}", link));
        }
        lines.push("Lessons:".to_string());

        let mut lessons = course.lessons.clone();
        lessons.sort_by_key(|l| l.lesson_number);
        for lesson in &lessons {
            lines.push(format!("Lesson {}: {}", lesson.lesson_number, lesson.title));
        }

        lines.join("\n")
    }
}
