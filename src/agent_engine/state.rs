use serde::Serialize;

use crate::llm::types::ToolCall;
use crate::tools::ToolResponse;

/// Where a turn currently is. Logged on every transition.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum AgentState {
    Idle,
    AwaitingModel { follow_up: bool },
    AwaitingToolResults { pending: usize },
    Done,
    Failed { message: String },
}

/// Result of one Agent Loop turn. Failures never escape as errors.
#[derive(Debug, Clone, Default, Serialize)]
pub struct TurnOutcome {
    /// Final answer, or the error message when `success` is false.
    pub content: String,
    pub success: bool,
    /// Calls executed this turn, in execution order.
    pub tool_calls: Vec<ToolCall>,
    pub tool_results: Vec<ToolResponse>,
    pub output_tokens: u32,
}

impl TurnOutcome {
    pub fn called(&self, tool: &str) -> Option<&ToolCall> {
        self.tool_calls.iter().rev().find(|c| c.name == tool)
    }
}
