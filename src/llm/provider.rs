use async_trait::async_trait;

use crate::errors::SentinelResult;
use crate::llm::types::{LlmRequest, LlmResponse};

/// Unified gateway trait. Every model backend implements it and is registered
/// in the `ProviderRegistry` under its config.toml key.
#[async_trait]
pub trait LlmProvider: Send + Sync {
    /// Returns the provider's identifier (matches config.toml key).
    fn name(&self) -> &str;

    /// One stateless request/response exchange.
    async fn chat(&self, request: LlmRequest) -> SentinelResult<LlmResponse>;
}
