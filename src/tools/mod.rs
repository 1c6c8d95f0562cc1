pub mod registry;
pub mod ui_tools;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::errors::SentinelResult;
use crate::llm::types::{ToolArguments, ToolDef};

pub use registry::ToolRegistry;
pub use ui_tools::UiAutomationToolSet;

/// A named group of tools routed through the [`ToolRegistry`].
#[async_trait]
pub trait ToolSet: Send + Sync {
    fn name(&self) -> &str;

    /// Declarations sent to the model, one per tool this set handles.
    fn declarations(&self) -> Vec<ToolDef>;

    /// Cheap routing predicate, checked before any execution.
    fn is_supported(&self, tool: &str) -> bool;

    /// `Ok` content goes back to the model as a successful result; an error
    /// becomes a failed result carrying its message.
    async fn execute(&self, tool: &str, arguments: &ToolArguments) -> SentinelResult<String>;
}

/// Outcome of one tool call, appended to the conversation as a tool message.
#[derive(Debug, Clone, Serialize)]
pub struct ToolResponse {
    pub tool_call_id: String,
    pub content: String,
    pub success: bool,
    pub timestamp: DateTime<Utc>,
}

impl ToolResponse {
    pub fn ok(tool_call_id: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            tool_call_id: tool_call_id.into(),
            content: content.into(),
            success: true,
            timestamp: Utc::now(),
        }
    }

    pub fn failed(tool_call_id: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            success: false,
            ..Self::ok(tool_call_id, content)
        }
    }
}
