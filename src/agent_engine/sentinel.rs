//! Autonomous test loop: repeated agent turns against one goal until the
//! model finishes the test or the iteration budget runs out.

use std::path::PathBuf;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::Serialize;
use tokio::sync::Mutex;

use crate::agent_engine::context::ConversationContext;
use crate::agent_engine::engine::AgentEngine;
use crate::agent_engine::history::SessionHistory;
use crate::agent_engine::loop_control::LoopController;
use crate::llm::types::Message;
use crate::reporter::TestReporter;

pub const FINISH_TEST: &str = "finish_test";

pub const SENTINEL_INSTRUCTIONS: &str = "\
You are Sentinel, an autonomous QA agent testing a running application's user interface.

Rules:
- Start by calling `start_test` with a short name for the test.
- Always call `query_ui` before acting. Only use element paths it returned.
- Perform exactly one UI action (click, type_text, scroll) per turn, then call `query_ui` again to observe the result.
- Use `wait_for_element` or `wait_seconds` for transitions and loading screens; never assume instant updates.
- Use `check_element_state` to verify values, toggles and enabled flags.
- Call `screenshot` at key moments: before and after important actions and when something looks wrong.
- When the goal is verified, or clearly cannot be reached, call `finish_test` with `success` and a summary of what you observed.";

pub const CONTINUE_PROMPT: &str =
    "Continue with the next step. Inspect the UI, take one action, or call finish_test if the goal is verified or unreachable.";

/// Outcome of one autonomous run.
#[derive(Debug, Clone, Serialize)]
pub struct SentinelTestResult {
    pub goal: String,
    pub success: bool,
    pub summary: String,
    pub iterations: u32,
    pub start_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub report_path: Option<PathBuf>,
}

pub struct SentinelLoop {
    engine: AgentEngine,
    reporter: Arc<Mutex<TestReporter>>,
    max_iterations: u32,
    transcript_dir: Option<PathBuf>,
}

impl SentinelLoop {
    pub fn new(engine: AgentEngine, reporter: Arc<Mutex<TestReporter>>, max_iterations: u32) -> Self {
        Self {
            engine,
            reporter,
            max_iterations,
            transcript_dir: None,
        }
    }

    /// Writes a `session_<uuid>.jsonl` transcript per run into `dir`.
    pub fn with_transcript_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.transcript_dir = Some(dir.into());
        self
    }

    pub async fn run(&self, goal: &str) -> SentinelTestResult {
        let start_time = Utc::now();
        let previous_report = self.reporter.lock().await.last_report().map(PathBuf::from);

        let mut ctx = match &self.transcript_dir {
            Some(dir) => ConversationContext::with_transcript(SessionHistory::new(dir)),
            None => ConversationContext::new(),
        };
        if let Some(history) = ctx.transcript() {
            tracing::info!(session = %history.session_id, path = %history.path().display(), "transcript");
        }
        // A fresh context always accepts a user message.
        let _ = ctx.push(Message::user(goal));

        let mut control = LoopController::new(self.max_iterations);
        tracing::info!(goal, max_iterations = control.max_iterations(), "sentinel run started");

        let (success, summary) = loop {
            let iteration = control.begin_iteration();
            let outcome = self.engine.run_turn(&mut ctx).await;
            if outcome.tool_results.iter().any(|r| !r.success) {
                control.record_failure();
            }
            tracing::info!(
                iteration,
                success = outcome.success,
                tool_calls = outcome.tool_calls.len(),
                output_tokens = outcome.output_tokens,
                "turn finished"
            );

            if let Some(call) = outcome.called(FINISH_TEST) {
                let success = call
                    .arguments
                    .get("success")
                    .and_then(|v| v.as_bool())
                    .unwrap_or(false);
                let summary = call
                    .arguments
                    .get("summary")
                    .and_then(|v| v.as_str())
                    .unwrap_or_default()
                    .to_string();
                break (success, summary);
            }
            if control.exhausted() {
                break (
                    false,
                    format!("max iterations reached ({})", control.max_iterations()),
                );
            }
            if !outcome.success {
                break (false, outcome.content);
            }

            let _ = ctx.push(Message::user(CONTINUE_PROMPT));
        };

        let report_path = self.ensure_report(goal, success, &summary, previous_report).await;
        let result = SentinelTestResult {
            goal: goal.to_string(),
            success,
            summary,
            iterations: control.iterations(),
            start_time,
            end_time: Utc::now(),
            report_path,
        };
        tracing::info!(
            success = result.success,
            iterations = result.iterations,
            failed_tool_turns = control.failures(),
            elapsed_ms = control.elapsed().as_millis() as u64,
            summary = %result.summary,
            "sentinel run finished"
        );
        result
    }

    /// Closes a session the model left open, or writes a minimal report when
    /// the run produced none.
    async fn ensure_report(
        &self,
        goal: &str,
        success: bool,
        summary: &str,
        previous: Option<PathBuf>,
    ) -> Option<PathBuf> {
        let mut reporter = self.reporter.lock().await;
        if reporter.has_active_session() {
            tracing::info!("finishing test session left open by the model");
            return reporter.finish_test(success, summary);
        }
        let latest = reporter.last_report().map(PathBuf::from);
        if latest.is_some() && latest != previous {
            return latest;
        }
        reporter.start_test(goal);
        reporter.finish_test(success, summary)
    }
}
