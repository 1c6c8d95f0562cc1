use crate::agent_engine::history::SessionHistory;
use crate::errors::{SentinelError, SentinelResult};
use crate::llm::types::{Message, Role};

/// Ordered, append-only message log for one agent session.
#[derive(Debug, Default)]
pub struct ConversationContext {
    messages: Vec<Message>,
    transcript: Option<SessionHistory>,
}

impl ConversationContext {
    pub fn new() -> Self {
        Self::default()
    }

    /// Mirrors every appended message into `history`.
    pub fn with_transcript(history: SessionHistory) -> Self {
        Self {
            messages: Vec::new(),
            transcript: Some(history),
        }
    }

    pub fn transcript(&self) -> Option<&SessionHistory> {
        self.transcript.as_ref()
    }

    /// Rejects a tool message that does not answer a call of the assistant
    /// message it follows.
    pub fn push(&mut self, message: Message) -> SentinelResult<()> {
        if message.role == Role::Tool {
            self.check_tool_reply(&message)?;
        }
        if let Some(history) = &self.transcript {
            if let Err(e) = history.append(&message) {
                tracing::warn!(error = %e, "transcript write failed");
            }
        }
        self.messages.push(message);
        Ok(())
    }

    pub fn messages(&self) -> &[Message] {
        &self.messages
    }

    pub fn len(&self) -> usize {
        self.messages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    pub fn last(&self) -> Option<&Message> {
        self.messages.last()
    }

    fn check_tool_reply(&self, message: &Message) -> SentinelResult<()> {
        let id = message
            .tool_call_id
            .as_deref()
            .ok_or_else(|| SentinelError::Context("tool message without tool_call_id".into()))?;
        let requested = self
            .messages
            .iter()
            .rev()
            .find(|m| m.role != Role::Tool)
            .filter(|m| m.role == Role::Assistant)
            .map_or(false, |m| m.tool_calls.iter().any(|c| c.id == id));
        if requested {
            Ok(())
        } else {
            Err(SentinelError::Context(format!(
                "tool result '{id}' does not answer a preceding assistant tool call"
            )))
        }
    }
}
