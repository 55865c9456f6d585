//! OpenAI chat-completions implementation of [`LlmClient`].

use super::llm::{ChatMessage, ContentBlock, LlmClient, LlmRequest, LlmResponse, StopReason};
use crate::error::{PensumError, Result};
use crate::openai::create_client;
use async_openai::types::{
    ChatCompletionMessageToolCall, ChatCompletionRequestAssistantMessageArgs,
    ChatCompletionRequestMessage, ChatCompletionRequestSystemMessageArgs,
    ChatCompletionRequestToolMessageArgs, ChatCompletionRequestUserMessageArgs,
    ChatCompletionTool, ChatCompletionToolChoiceOption, ChatCompletionToolType,
    CreateChatCompletionRequestArgs, FunctionCall, FunctionObject,
};
use async_trait::async_trait;
use tracing::debug;

/// OpenAI-backed LLM client.
pub struct OpenAiLlm {
    client: async_openai::Client<async_openai::config::OpenAIConfig>,
    model: String,
    max_tokens: u32,
}

impl OpenAiLlm {
    /// Create a client for the given model.
    pub fn new(model: &str, max_tokens: u32) -> Self {
        Self {
            client: create_client(),
            model: model.to_string(),
            max_tokens,
        }
    }

    fn build_messages(
        system: &str,
        messages: &[ChatMessage],
    ) -> Result<Vec<ChatCompletionRequestMessage>> {
        let mut out: Vec<ChatCompletionRequestMessage> = vec![
            ChatCompletionRequestSystemMessageArgs::default()
                .content(system)
                .build()
                .map_err(|e| PensumError::Agent(e.to_string()))?
                .into(),
        ];

        for message in messages {
            match message {
                ChatMessage::User(text) => {
                    out.push(
                        ChatCompletionRequestUserMessageArgs::default()
                            .content(text.as_str())
                            .build()
                            .map_err(|e| PensumError::Agent(e.to_string()))?
                            .into(),
                    );
                }
                ChatMessage::Assistant(blocks) => {
                    let mut builder = ChatCompletionRequestAssistantMessageArgs::default();

                    let text: Vec<&str> = blocks
                        .iter()
                        .filter_map(|b| match b {
                            ContentBlock::Text(t) => Some(t.as_str()),
                            ContentBlock::ToolUse { .. } => None,
                        })
                        .collect();
                    if !text.is_empty() {
                        builder.content(text.join("\n"));
                    }

                    let tool_calls: Vec<ChatCompletionMessageToolCall> = blocks
                        .iter()
                        .filter_map(|b| match b {
                            ContentBlock::ToolUse { id, name, input } => {
                                Some(ChatCompletionMessageToolCall {
                                    id: id.clone(),
                                    r#type: ChatCompletionToolType::Function,
                                    function: FunctionCall {
                                        name: name.clone(),
                                        arguments: input.to_string(),
                                    },
                                })
                            }
                            ContentBlock::Text(_) => None,
                        })
                        .collect();
                    if !tool_calls.is_empty() {
                        builder.tool_calls(tool_calls);
                    }

                    out.push(
                        builder
                            .build()
                            .map_err(|e| PensumError::Agent(e.to_string()))?
                            .into(),
                    );
                }
                ChatMessage::ToolResults(results) => {
                    for result in results {
                        out.push(
                            ChatCompletionRequestToolMessageArgs::default()
                                .tool_call_id(result.call_id.as_str())
                                .content(result.output.as_str())
                                .build()
                                .map_err(|e| PensumError::Agent(e.to_string()))?
                                .into(),
                        );
                    }
                }
            }
        }

        Ok(out)
    }
}

#[async_trait]
impl LlmClient for OpenAiLlm {
    async fn complete(&self, request: LlmRequest<'_>) -> Result<LlmResponse> {
        let messages = Self::build_messages(request.system, request.messages)?;

        let mut builder = CreateChatCompletionRequestArgs::default();
        builder
            .model(&self.model)
            .messages(messages)
            .temperature(0.0)
            .max_completion_tokens(self.max_tokens);

        // Tool keys are omitted entirely when no tools are configured, so the
        // model is never nudged toward tool use.
        if let Some(tools) = request.tools {
            let tools: Vec<ChatCompletionTool> = tools
                .iter()
                .map(|t| ChatCompletionTool {
                    r#type: ChatCompletionToolType::Function,
                    function: FunctionObject {
                        name: t.name.clone(),
                        description: Some(t.description.clone()),
                        parameters: Some(t.parameters.clone()),
                        strict: None,
                    },
                })
                .collect();
            builder.tools(tools);
            builder.tool_choice(ChatCompletionToolChoiceOption::Auto);
        }

        let request = builder
            .build()
            .map_err(|e| PensumError::Agent(e.to_string()))?;

        let response = self
            .client
            .chat()
            .create(request)
            .await
            .map_err(|e| PensumError::OpenAI(format!("Chat API error: {}", e)))?;

        let choice = response
            .choices
            .into_iter()
            .next()
            .ok_or_else(|| PensumError::Agent("No response from model".to_string()))?;

        let mut content = Vec::new();
        if let Some(text) = choice.message.content {
            if !text.is_empty() {
                content.push(ContentBlock::Text(text));
            }
        }

        let stop_reason = match choice.message.tool_calls {
            Some(tool_calls) if !tool_calls.is_empty() => {
                debug!("Model requested {} tool call(s)", tool_calls.len());
                for call in tool_calls {
                    let input = serde_json::from_str(&call.function.arguments)
                        .unwrap_or(serde_json::Value::Null);
                    content.push(ContentBlock::ToolUse {
                        id: call.id,
                        name: call.function.name,
                        input,
                    });
                }
                StopReason::ToolUse
            }
            _ => StopReason::EndTurn,
        };

        Ok(LlmResponse {
            stop_reason,
            content,
        })
    }
}
