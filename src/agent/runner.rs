//! The bounded tool-use loop.

use super::llm::{ChatMessage, ContentBlock, LlmClient, LlmRequest, StopReason, ToolOutput};
use crate::error::Result;
use crate::tools::{Source, ToolDefinition, ToolManager};
use std::sync::Arc;
use tracing::{debug, info};

/// Static instructions for answering questions about course materials.
const SYSTEM_PROMPT: &str = r#"You are an AI assistant specialized in course materials, with tools for searching and outlining educational content.

Tool usage:
- Use 'search_course_content' for questions about specific course content or detailed lesson material
- Use 'get_course_outline' for questions about a course's structure or lesson list
- One tool round per question maximum; synthesize the results into your answer

Response requirements:
- Answer general knowledge questions directly without tools
- Be brief, concise and focused; no meta-commentary about your search process
- If a search yields no relevant content, say so clearly"#;

/// Drives the LLM through a bounded number of tool rounds to a final answer.
pub struct ConversationAgent {
    client: Arc<dyn LlmClient>,
    system_prompt: String,
    max_tool_rounds: usize,
}

impl ConversationAgent {
    /// Create an agent over the given LLM client.
    pub fn new(client: Arc<dyn LlmClient>) -> Self {
        Self {
            client,
            system_prompt: SYSTEM_PROMPT.to_string(),
            max_tool_rounds: 1,
        }
    }

    /// Set a custom system prompt.
    pub fn with_system_prompt(mut self, prompt: &str) -> Self {
        self.system_prompt = prompt.to_string();
        self
    }

    /// Set how many rounds of tool use are allowed before the final,
    /// tool-less call.
    pub fn with_max_tool_rounds(mut self, max: usize) -> Self {
        self.max_tool_rounds = max;
        self
    }

    /// Answer one user query, executing requested tools via `tool_manager`
    /// and appending provenance to `sources`.
    ///
    /// LLM transport errors propagate unchanged. A tool's own failure is not
    /// an error here: the tool returns a descriptive string and the model
    /// reacts to it.
    pub async fn generate(
        &self,
        query: &str,
        history: Option<&str>,
        tools: Option<&[ToolDefinition]>,
        tool_manager: Option<&ToolManager>,
        sources: &mut Vec<Source>,
    ) -> Result<String> {
        let system = match history {
            Some(history) => format!(
                "{}\n\nPrevious conversation:\n{}",
                self.system_prompt, history
            ),
            None => self.system_prompt.clone(),
        };

        let mut messages = vec![ChatMessage::User(query.to_string())];
        let mut rounds = 0;

        loop {
            // Tools are only on offer while rounds remain; the final call is
            // made without them so the loop always terminates.
            let offered_tools = if rounds < self.max_tool_rounds {
                tools
            } else {
                None
            };

            debug!(rounds, tools = offered_tools.is_some(), "LLM call");
            let response = self
                .client
                .complete(LlmRequest {
                    system: &system,
                    messages: &messages,
                    tools: offered_tools,
                })
                .await?;

            match response.stop_reason {
                StopReason::EndTurn => return Ok(response.text()),
                StopReason::ToolUse => {
                    let Some(manager) = tool_manager else {
                        // Nothing can execute the calls; degrade to whatever
                        // text the response carried.
                        return Ok(response.text());
                    };
                    if offered_tools.is_none() {
                        return Ok(response.text());
                    }

                    let mut outputs = Vec::new();
                    for block in &response.content {
                        if let ContentBlock::ToolUse { id, name, input } = block {
                            info!(tool = %name, "executing tool call");
                            let output = manager.execute_tool(name, input, sources).await;
                            outputs.push(ToolOutput {
                                call_id: id.clone(),
                                output,
                            });
                        }
                    }

                    messages.push(ChatMessage::Assistant(response.content));
                    messages.push(ChatMessage::ToolResults(outputs));
                    rounds += 1;
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::super::llm::testing::ScriptedLlm;
    use super::super::llm::LlmResponse;
    use super::*;
    use crate::error::PensumError;
    use crate::tools::{Tool, ToolDefinition};
    use async_trait::async_trait;
    use serde_json::{json, Value};
    use std::sync::Mutex;

    /// Tool double that records executions and returns a canned result.
    struct RecordingTool {
        name: &'static str,
        executions: Arc<Mutex<Vec<Value>>>,
        result: &'static str,
    }

    #[async_trait]
    impl Tool for RecordingTool {
        fn definition(&self) -> ToolDefinition {
            ToolDefinition {
                name: self.name.to_string(),
                description: "test tool".to_string(),
                parameters: json!({"type": "object", "properties": {}}),
            }
        }

        async fn execute(&self, args: &Value, _sources: &mut Vec<Source>) -> String {
            self.executions.lock().unwrap().push(args.clone());
            self.result.to_string()
        }
    }

    fn manager_with_recorder(
        name: &'static str,
        result: &'static str,
    ) -> (ToolManager, Arc<Mutex<Vec<Value>>>) {
        let executions = Arc::new(Mutex::new(Vec::new()));
        let mut manager = ToolManager::new();
        manager
            .register(Arc::new(RecordingTool {
                name,
                executions: executions.clone(),
                result,
            }))
            .unwrap();
        (manager, executions)
    }

    fn search_definitions() -> Vec<ToolDefinition> {
        vec![ToolDefinition {
            name: "search_course_content".to_string(),
            description: "search".to_string(),
            parameters: json!({"type": "object"}),
        }]
    }

    #[tokio::test]
    async fn test_simple_answer_uses_one_call() {
        let llm = Arc::new(ScriptedLlm::new(vec![ScriptedLlm::answer(
            "This is a simple response.",
        )]));
        let agent = ConversationAgent::new(llm.clone());

        let mut sources = Vec::new();
        let answer = agent
            .generate("What is Python?", None, None, None, &mut sources)
            .await
            .unwrap();

        assert_eq!(answer, "This is a simple response.");
        assert_eq!(llm.call_count(), 1);
        assert!(!llm.recorded()[0].had_tools);
    }

    #[tokio::test]
    async fn test_history_is_rendered_into_system_prompt() {
        let llm = Arc::new(ScriptedLlm::new(vec![ScriptedLlm::answer("ok")]));
        let agent = ConversationAgent::new(llm.clone());

        let mut sources = Vec::new();
        agent
            .generate(
                "Tell me more",
                Some("User: What is Python?\nAssistant: Python is a programming language."),
                None,
                None,
                &mut sources,
            )
            .await
            .unwrap();

        let system = &llm.recorded()[0].system;
        assert!(system.contains("Previous conversation:"));
        assert!(system.contains("What is Python?"));
    }

    #[tokio::test]
    async fn test_no_history_means_no_history_section() {
        let llm = Arc::new(ScriptedLlm::new(vec![ScriptedLlm::answer("ok")]));
        let agent = ConversationAgent::new(llm.clone());

        let mut sources = Vec::new();
        agent
            .generate("hi", None, None, None, &mut sources)
            .await
            .unwrap();

        assert!(!llm.recorded()[0].system.contains("Previous conversation:"));
    }

    #[tokio::test]
    async fn test_tool_round_then_final_answer() {
        let llm = Arc::new(ScriptedLlm::new(vec![
            ScriptedLlm::tool_call(
                "call_1",
                "search_course_content",
                json!({"query": "Python basics"}),
            ),
            ScriptedLlm::answer("Based on the search results, Python is a programming language."),
        ]));
        let agent = ConversationAgent::new(llm.clone());
        let (manager, executions) =
            manager_with_recorder("search_course_content", "Python is a language.");

        let mut sources = Vec::new();
        let answer = agent
            .generate(
                "What is Python?",
                None,
                Some(&search_definitions()),
                Some(&manager),
                &mut sources,
            )
            .await
            .unwrap();

        assert_eq!(
            answer,
            "Based on the search results, Python is a programming language."
        );
        assert_eq!(llm.call_count(), 2);
        assert_eq!(
            executions.lock().unwrap().as_slice(),
            &[json!({"query": "Python basics"})]
        );

        let recorded = llm.recorded();
        assert!(recorded[0].had_tools);
        // Round budget spent: the final call goes out without tools.
        assert!(!recorded[1].had_tools);
        // user + assistant tool-use + tool results
        assert_eq!(recorded[1].message_count, 3);
    }

    #[tokio::test]
    async fn test_multiple_tool_blocks_execute_in_issue_order() {
        let first_turn = LlmResponse {
            stop_reason: StopReason::ToolUse,
            content: vec![
                ContentBlock::ToolUse {
                    id: "call_1".to_string(),
                    name: "search_course_content".to_string(),
                    input: json!({"query": "variables"}),
                },
                ContentBlock::ToolUse {
                    id: "call_2".to_string(),
                    name: "search_course_content".to_string(),
                    input: json!({"query": "functions"}),
                },
            ],
        };
        let llm = Arc::new(ScriptedLlm::new(vec![
            first_turn,
            ScriptedLlm::answer("done"),
        ]));
        let agent = ConversationAgent::new(llm.clone());
        let (manager, executions) = manager_with_recorder("search_course_content", "results");

        let mut sources = Vec::new();
        agent
            .generate(
                "Explain variables and functions",
                None,
                Some(&search_definitions()),
                Some(&manager),
                &mut sources,
            )
            .await
            .unwrap();

        // Both blocks executed, in order, before the second LLM call.
        assert_eq!(
            executions.lock().unwrap().as_slice(),
            &[json!({"query": "variables"}), json!({"query": "functions"})]
        );
        assert_eq!(llm.call_count(), 2);
    }

    #[tokio::test]
    async fn test_tool_use_without_manager_degrades_to_single_call() {
        let llm = Arc::new(ScriptedLlm::new(vec![LlmResponse {
            stop_reason: StopReason::ToolUse,
            content: vec![
                ContentBlock::Text("Let me search for that.".to_string()),
                ContentBlock::ToolUse {
                    id: "call_1".to_string(),
                    name: "search_course_content".to_string(),
                    input: json!({"query": "x"}),
                },
            ],
        }]));
        let agent = ConversationAgent::new(llm.clone());

        let mut sources = Vec::new();
        let answer = agent
            .generate("q", None, Some(&search_definitions()), None, &mut sources)
            .await
            .unwrap();

        assert_eq!(answer, "Let me search for that.");
        assert_eq!(llm.call_count(), 1);
    }

    #[tokio::test]
    async fn test_round_bound_forces_termination() {
        // A model that keeps asking for tools cannot loop forever.
        let llm = Arc::new(ScriptedLlm::new(vec![
            ScriptedLlm::tool_call("call_1", "search_course_content", json!({"query": "a"})),
            LlmResponse {
                stop_reason: StopReason::ToolUse,
                content: vec![
                    ContentBlock::Text("Partial answer.".to_string()),
                    ContentBlock::ToolUse {
                        id: "call_2".to_string(),
                        name: "search_course_content".to_string(),
                        input: json!({"query": "b"}),
                    },
                ],
            },
        ]));
        let agent = ConversationAgent::new(llm.clone());
        let (manager, executions) = manager_with_recorder("search_course_content", "results");

        let mut sources = Vec::new();
        let answer = agent
            .generate(
                "q",
                None,
                Some(&search_definitions()),
                Some(&manager),
                &mut sources,
            )
            .await
            .unwrap();

        assert_eq!(answer, "Partial answer.");
        assert_eq!(llm.call_count(), 2);
        // Only the first round's call executed.
        assert_eq!(executions.lock().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_transport_errors_propagate() {
        let llm = Arc::new(ScriptedLlm::new(Vec::new()));
        let agent = ConversationAgent::new(llm);

        let mut sources = Vec::new();
        let err = agent
            .generate("q", None, None, None, &mut sources)
            .await
            .unwrap_err();
        assert!(matches!(err, PensumError::OpenAI(_)));
    }
}
