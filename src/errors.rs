use thiserror::Error;

#[derive(Debug, Error)]
pub enum SentinelError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Tool not found: {0}")]
    ToolNotFound(String),

    #[error("Tool '{0}' is disabled")]
    ToolDisabled(String),

    #[error("Tool '{tool}' is already provided by tool set '{existing}'")]
    DuplicateTool { tool: String, existing: String },

    #[error("Invalid arguments for '{tool}': {reason}")]
    InvalidArguments { tool: String, reason: String },

    #[error("Element not found: {path}")]
    ElementNotFound { path: String },

    #[error("Action '{action}' unsupported on '{path}': {reason}")]
    ActionUnsupported {
        action: String,
        path: String,
        reason: String,
    },

    #[error("Gateway failure: {0}")]
    GatewayFailure(String),

    #[error("Timed out after {waited_ms}ms waiting for {what}")]
    Timeout { what: String, waited_ms: u64 },

    #[error("Agent unavailable: {0}")]
    AgentUnavailable(String),

    #[error("LLM provider error: {0}")]
    LlmProvider(String),

    #[error("SSE parsing error: {0}")]
    SseParsing(String),

    #[error("Screenshot error: {0}")]
    Screenshot(String),

    #[error("Conversation error: {0}")]
    Context(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("TOML deserialize error: {0}")]
    TomlDe(#[from] toml::de::Error),

    #[error("TOML serialize error: {0}")]
    TomlSer(#[from] toml::ser::Error),
}

impl SentinelError {
    pub fn element_not_found(path: impl Into<String>) -> Self {
        Self::ElementNotFound { path: path.into() }
    }

    pub fn unsupported(
        action: impl Into<String>,
        path: impl Into<String>,
        reason: impl Into<String>,
    ) -> Self {
        Self::ActionUnsupported {
            action: action.into(),
            path: path.into(),
            reason: reason.into(),
        }
    }

    pub fn invalid_args(tool: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidArguments {
            tool: tool.into(),
            reason: reason.into(),
        }
    }
}

impl serde::Serialize for SentinelError {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::ser::Serializer,
    {
        serializer.serialize_str(self.to_string().as_str())
    }
}

pub type SentinelResult<T> = Result<T, SentinelError>;
