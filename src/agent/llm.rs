//! Provider-neutral LLM contract for the conversation agent.
//!
//! The loop in `runner` works against this seam so that providers can be
//! swapped and tests can script exact response sequences.

use crate::error::Result;
use crate::tools::ToolDefinition;
use async_trait::async_trait;

/// Why the model stopped generating.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopReason {
    /// Final answer; no more tool calls.
    EndTurn,
    /// The model requested one or more tool invocations.
    ToolUse,
}

/// One block of model output.
#[derive(Debug, Clone)]
pub enum ContentBlock {
    Text(String),
    ToolUse {
        /// Provider-assigned call identifier; tool results are keyed to it.
        id: String,
        name: String,
        input: serde_json::Value,
    },
}

/// A response from the LLM, tagged with its stop reason.
#[derive(Debug, Clone)]
pub struct LlmResponse {
    pub stop_reason: StopReason,
    pub content: Vec<ContentBlock>,
}

impl LlmResponse {
    /// Concatenated text content, empty when the response carried none.
    pub fn text(&self) -> String {
        self.content
            .iter()
            .filter_map(|block| match block {
                ContentBlock::Text(text) => Some(text.as_str()),
                ContentBlock::ToolUse { .. } => None,
            })
            .collect::<Vec<_>>()
            .join("\n")
    }
}

/// The result of executing one requested tool call.
#[derive(Debug, Clone)]
pub struct ToolOutput {
    pub call_id: String,
    pub output: String,
}

/// A message in the running conversation.
#[derive(Debug, Clone)]
pub enum ChatMessage {
    User(String),
    Assistant(Vec<ContentBlock>),
    /// Tool results answering the assistant's tool-use blocks, in the order
    /// the model issued the calls.
    ToolResults(Vec<ToolOutput>),
}

/// One completion request.
///
/// `tools` being `None` means the request carries no tool definitions and no
/// tool-choice policy at all, as opposed to an empty tool list.
pub struct LlmRequest<'a> {
    pub system: &'a str,
    pub messages: &'a [ChatMessage],
    pub tools: Option<&'a [ToolDefinition]>,
}

/// Trait for LLM providers.
#[async_trait]
pub trait LlmClient: Send + Sync {
    /// Run one completion. Transport and API failures are returned as
    /// errors and propagate to the caller unchanged.
    async fn complete(&self, request: LlmRequest<'_>) -> Result<LlmResponse>;
}

#[cfg(test)]
pub(crate) mod testing {
    use super::*;
    use crate::error::PensumError;
    use std::sync::Mutex;

    /// What one recorded `complete` call looked like.
    #[derive(Debug, Clone)]
    pub struct RecordedRequest {
        pub system: String,
        pub first_user_message: String,
        pub message_count: usize,
        pub had_tools: bool,
    }

    /// LLM double that replays queued responses and records requests.
    pub struct ScriptedLlm {
        responses: Mutex<Vec<LlmResponse>>,
        pub requests: Mutex<Vec<RecordedRequest>>,
    }

    impl ScriptedLlm {
        pub fn new(responses: Vec<LlmResponse>) -> Self {
            Self {
                responses: Mutex::new(responses),
                requests: Mutex::new(Vec::new()),
            }
        }

        pub fn answer(text: &str) -> LlmResponse {
            LlmResponse {
                stop_reason: StopReason::EndTurn,
                content: vec![ContentBlock::Text(text.to_string())],
            }
        }

        pub fn tool_call(id: &str, name: &str, input: serde_json::Value) -> LlmResponse {
            LlmResponse {
                stop_reason: StopReason::ToolUse,
                content: vec![ContentBlock::ToolUse {
                    id: id.to_string(),
                    name: name.to_string(),
                    input,
                }],
            }
        }

        pub fn call_count(&self) -> usize {
            self.requests.lock().unwrap().len()
        }

        pub fn recorded(&self) -> Vec<RecordedRequest> {
            self.requests.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl LlmClient for ScriptedLlm {
        async fn complete(&self, request: LlmRequest<'_>) -> Result<LlmResponse> {
            let first_user_message = request
                .messages
                .iter()
                .find_map(|m| match m {
                    ChatMessage::User(text) => Some(text.clone()),
                    _ => None,
                })
                .unwrap_or_default();

            self.requests.lock().unwrap().push(RecordedRequest {
                system: request.system.to_string(),
                first_user_message,
                message_count: request.messages.len(),
                had_tools: request.tools.is_some(),
            });

            let mut responses = self.responses.lock().unwrap();
            if responses.is_empty() {
                return Err(PensumError::OpenAI("API rate limit exceeded".to_string()));
            }
            Ok(responses.remove(0))
        }
    }
}
