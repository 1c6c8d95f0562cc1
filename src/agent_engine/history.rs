use std::io::Write;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::errors::{SentinelError, SentinelResult};
use crate::llm::types::{Message, ToolCall};

/// One transcript line.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HistoryEntry {
    pub ts: i64,
    pub role: String,
    pub content: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tool_call_id: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tool_calls: Vec<ToolCall>,
}

impl From<&Message> for HistoryEntry {
    fn from(msg: &Message) -> Self {
        Self {
            ts: msg.timestamp.timestamp_millis(),
            role: msg.role.as_str().to_string(),
            content: msg.content.clone(),
            tool_call_id: msg.tool_call_id.clone(),
            tool_calls: msg.tool_calls.clone(),
        }
    }
}

/// Append-only JSONL transcript, `session_<uuid>.jsonl`.
#[derive(Debug, Clone)]
pub struct SessionHistory {
    pub session_id: String,
    file_path: PathBuf,
}

impl SessionHistory {
    pub fn new(dir: &Path) -> Self {
        let session_id = uuid::Uuid::new_v4().to_string();
        let file_path = dir.join(format!("session_{session_id}.jsonl"));
        Self {
            session_id,
            file_path,
        }
    }

    pub fn path(&self) -> &Path {
        &self.file_path
    }

    pub fn append(&self, message: &Message) -> SentinelResult<()> {
        if let Some(dir) = self.file_path.parent() {
            std::fs::create_dir_all(dir)?;
        }
        let line = serde_json::to_string(&HistoryEntry::from(message))?;
        let mut file = std::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.file_path)?;
        writeln!(file, "{line}")?;
        tracing::trace!(path = %self.file_path.display(), role = message.role.as_str(), "history entry flushed");
        Ok(())
    }

    pub fn load(path: &Path) -> SentinelResult<Vec<HistoryEntry>> {
        let content = std::fs::read_to_string(path)?;
        content
            .lines()
            .filter(|l| !l.trim().is_empty())
            .map(|l| serde_json::from_str(l).map_err(SentinelError::from))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn appends_one_line_per_message() {
        let dir = tempfile::tempdir().unwrap();
        let history = SessionHistory::new(dir.path());
        history.append(&Message::user("open settings")).unwrap();
        history.append(&Message::tool("call_1", "Clicked Menu/Settings")).unwrap();

        let file_name = history.path().file_name().unwrap().to_string_lossy().to_string();
        assert_eq!(file_name, format!("session_{}.jsonl", history.session_id));

        let entries = SessionHistory::load(history.path()).unwrap();
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].role, "user");
        assert_eq!(entries[1].tool_call_id.as_deref(), Some("call_1"));
    }
}
