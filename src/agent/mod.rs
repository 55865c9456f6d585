//! Conversation agent: the tool-use loop that drives the LLM through
//! zero-or-more retrieval calls before producing a final answer.

mod llm;
mod openai;
mod runner;

pub use llm::{ChatMessage, ContentBlock, LlmClient, LlmRequest, LlmResponse, StopReason, ToolOutput};
pub use openai::OpenAiLlm;
pub use runner::ConversationAgent;

#[cfg(test)]
pub(crate) use llm::testing;
