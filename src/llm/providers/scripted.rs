use std::collections::VecDeque;
use std::path::Path;
use std::sync::Mutex;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::errors::{SentinelError, SentinelResult};
use crate::llm::provider::LlmProvider;
use crate::llm::types::{LlmRequest, LlmResponse};

const EXHAUSTED_REPLY: &str = "scripted: no more replies";

/// One canned gateway outcome.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ScriptedReply {
    Respond(LlmResponse),
    /// Transport-level failure, returned as `Err`.
    Fail { message: String },
}

/// Replays a fixed queue of replies. Used for offline dry runs
/// (`adapter = "scripted"`, `api_base` = path to a JSON reply list) and tests.
pub struct ScriptedProvider {
    id: String,
    replies: Mutex<VecDeque<ScriptedReply>>,
    requests: Mutex<Vec<LlmRequest>>,
}

impl ScriptedProvider {
    pub fn new(id: impl Into<String>, replies: Vec<ScriptedReply>) -> Self {
        Self {
            id: id.into(),
            replies: Mutex::new(replies.into()),
            requests: Mutex::new(Vec::new()),
        }
    }

    pub fn from_responses(id: impl Into<String>, responses: Vec<LlmResponse>) -> Self {
        Self::new(id, responses.into_iter().map(ScriptedReply::Respond).collect())
    }

    pub fn from_file(id: impl Into<String>, path: &Path) -> SentinelResult<Self> {
        let content = std::fs::read_to_string(path)?;
        let replies: Vec<ScriptedReply> = serde_json::from_str(&content)?;
        tracing::debug!(path = %path.display(), replies = replies.len(), "scripted replies loaded");
        Ok(Self::new(id, replies))
    }

    /// Requests received so far, in order.
    pub fn requests(&self) -> Vec<LlmRequest> {
        self.requests
            .lock()
            .map(|r| r.clone())
            .unwrap_or_default()
    }

    pub fn remaining(&self) -> usize {
        self.replies.lock().map(|r| r.len()).unwrap_or(0)
    }
}

#[async_trait]
impl LlmProvider for ScriptedProvider {
    fn name(&self) -> &str {
        &self.id
    }

    async fn chat(&self, request: LlmRequest) -> SentinelResult<LlmResponse> {
        if let Ok(mut seen) = self.requests.lock() {
            seen.push(request);
        }
        let next = self
            .replies
            .lock()
            .map_err(|_| SentinelError::LlmProvider("scripted reply queue poisoned".into()))?
            .pop_front();

        match next {
            Some(ScriptedReply::Respond(resp)) => Ok(resp),
            Some(ScriptedReply::Fail { message }) => Err(SentinelError::LlmProvider(message)),
            None => {
                tracing::debug!(provider = %self.id, "scripted replies exhausted");
                Ok(LlmResponse::text(EXHAUSTED_REPLY))
            }
        }
    }
}
