//! Tool registry and definitions for the conversation agent.
//!
//! Tools are trait objects dispatched by name. Provenance is collected into a
//! request-scoped buffer threaded through `execute`, so no tool holds sources
//! across queries.

mod outline;
mod search;

pub use outline::OutlineTool;
pub use search::SearchTool;

use crate::error::{PensumError, Result};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// Provenance record for one retrieved chunk, for UI display.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Source {
    /// Display text, e.g. "Python Fundamentals - Lesson 2".
    pub text: String,
    /// Link to the lesson, when one is known.
    pub link: Option<String>,
}

/// JSON-schema definition of a tool, forwarded to the LLM.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolDefinition {
    pub name: String,
    pub description: String,
    /// JSON schema for the tool's arguments.
    pub parameters: serde_json::Value,
}

/// An executable tool exposed to the LLM.
#[async_trait]
pub trait Tool: Send + Sync {
    /// Schema forwarded to the LLM so it can decide when to call the tool.
    fn definition(&self) -> ToolDefinition;

    /// Execute with JSON arguments, appending any provenance to `sources`.
    ///
    /// Failures are reported as descriptive strings; the returned value is
    /// always fed back into the conversation as the tool result.
    async fn execute(&self, args: &serde_json::Value, sources: &mut Vec<Source>) -> String;
}

/// Registry mapping tool names to executable tools.
pub struct ToolManager {
    tools: Vec<Arc<dyn Tool>>,
}

impl ToolManager {
    /// Create an empty tool registry.
    pub fn new() -> Self {
        Self { tools: Vec::new() }
    }

    /// Register a tool under the name from its definition.
    ///
    /// Duplicate names are rejected with a configuration error.
    pub fn register(&mut self, tool: Arc<dyn Tool>) -> Result<()> {
        let name = tool.definition().name;
        if self.tools.iter().any(|t| t.definition().name == name) {
            return Err(PensumError::Config(format!(
                "Tool '{}' is already registered",
                name
            )));
        }
        self.tools.push(tool);
        Ok(())
    }

    /// Tool schemas in registration order.
    pub fn definitions(&self) -> Vec<ToolDefinition> {
        self.tools.iter().map(|t| t.definition()).collect()
    }

    /// Dispatch to the named tool.
    ///
    /// An unknown name fails closed with a returned string, never an error,
    /// because the result must flow back into the LLM conversation.
    pub async fn execute_tool(
        &self,
        name: &str,
        args: &serde_json::Value,
        sources: &mut Vec<Source>,
    ) -> String {
        match self.tools.iter().find(|t| t.definition().name == name) {
            Some(tool) => tool.execute(args, sources).await,
            None => format!("Tool '{}' not found", name),
        }
    }
}

impl Default for ToolManager {
    fn default() -> Self {
        Self::new()
    }
}
