use std::collections::HashSet;
use std::sync::Arc;

use crate::agent_engine::context::ConversationContext;
use crate::agent_engine::state::{AgentState, TurnOutcome};
use crate::config::{AgentDefinition, AppConfig};
use crate::errors::{SentinelError, SentinelResult};
use crate::llm::registry::{ProviderRegistry, ResolvedAgent};
use crate::llm::types::{LlmRequest, LlmResponse, Message, ToolCall, ToolDef};
use crate::tools::ToolRegistry;

/// Runs tool-calling turns for one configured agent.
pub struct AgentEngine {
    agent_name: String,
    definition: Option<AgentDefinition>,
    fallback_instructions: Option<String>,
    providers: Arc<ProviderRegistry>,
    tools: Arc<ToolRegistry>,
}

impl AgentEngine {
    pub fn new(
        agent_name: impl Into<String>,
        definition: AgentDefinition,
        providers: Arc<ProviderRegistry>,
        tools: Arc<ToolRegistry>,
    ) -> Self {
        Self {
            agent_name: agent_name.into(),
            definition: Some(definition),
            fallback_instructions: None,
            providers,
            tools,
        }
    }

    /// An agent missing from `[agents]` still builds; its turns fail fast.
    pub fn from_config(
        config: &AppConfig,
        agent_name: &str,
        providers: Arc<ProviderRegistry>,
        tools: Arc<ToolRegistry>,
    ) -> Self {
        Self {
            agent_name: agent_name.to_string(),
            definition: config.agents.get(agent_name).cloned(),
            fallback_instructions: None,
            providers,
            tools,
        }
    }

    /// Instructions used when the agent definition carries none.
    pub fn with_fallback_instructions(mut self, instructions: impl Into<String>) -> Self {
        self.fallback_instructions = Some(instructions.into());
        self
    }

    pub fn agent_name(&self) -> &str {
        &self.agent_name
    }

    pub fn tools(&self) -> &ToolRegistry {
        &self.tools
    }

    /// One turn: model call, requested tool calls in order, follow-up answer.
    pub async fn run_turn(&self, ctx: &mut ConversationContext) -> TurnOutcome {
        let mut outcome = TurnOutcome::default();
        match self.try_turn(ctx, &mut outcome).await {
            Ok(content) => {
                self.transition(AgentState::Done);
                outcome.content = content;
                outcome.success = true;
            }
            Err(e) => {
                self.transition(AgentState::Failed {
                    message: e.to_string(),
                });
                outcome.content = e.to_string();
                outcome.success = false;
            }
        }
        outcome
    }

    async fn try_turn(&self, ctx: &mut ConversationContext, outcome: &mut TurnOutcome) -> SentinelResult<String> {
        let (definition, resolved) = self.available_agent()?;

        self.transition(AgentState::AwaitingModel { follow_up: false });
        let request = self.build_request(ctx, definition, &resolved, self.tools.declarations());
        let response = self.call_gateway(&resolved, request).await?;
        outcome.output_tokens += response.output_tokens;

        let mut calls = normalize_call_ids(response.tool_calls);
        if calls.is_empty() {
            ctx.push(Message::assistant(response.content.clone()))?;
            return Ok(response.content);
        }

        let cap = definition.max_tool_calls_per_turn.max(1);
        if calls.len() > cap {
            let dropped: Vec<&str> = calls[cap..].iter().map(|c| c.name.as_str()).collect();
            tracing::debug!(agent = %self.agent_name, cap, ?dropped, "tool calls over the per-turn cap dropped");
            calls.truncate(cap);
        }

        ctx.push(Message::assistant_with_calls(response.content, calls.clone()))?;

        self.transition(AgentState::AwaitingToolResults { pending: calls.len() });
        for call in calls {
            tracing::info!(agent = %self.agent_name, tool = %call.name, id = %call.id, "tool call");
            let result = self.tools.execute_call(&call).await;
            ctx.push(Message::tool(result.tool_call_id.clone(), result.content.clone()))?;
            outcome.tool_calls.push(call);
            outcome.tool_results.push(result);
        }

        self.transition(AgentState::AwaitingModel { follow_up: true });
        let request = self.build_request(ctx, definition, &resolved, Vec::new());
        let follow_up = self.call_gateway(&resolved, request).await?;
        outcome.output_tokens += follow_up.output_tokens;
        if !follow_up.tool_calls.is_empty() {
            tracing::warn!(
                agent = %self.agent_name,
                ignored = follow_up.tool_calls.len(),
                "tool calls in follow-up response ignored"
            );
        }
        ctx.push(Message::assistant(follow_up.content.clone()))?;
        Ok(follow_up.content)
    }

    fn available_agent(&self) -> SentinelResult<(&AgentDefinition, ResolvedAgent)> {
        let definition = self.definition.as_ref().ok_or_else(|| {
            SentinelError::AgentUnavailable(format!("agent '{}' is not configured", self.agent_name))
        })?;
        if !definition.enabled {
            return Err(SentinelError::AgentUnavailable(format!(
                "agent '{}' is disabled",
                self.agent_name
            )));
        }
        let resolved = self.providers.resolve(definition)?;
        if resolved.model.trim().is_empty() {
            return Err(SentinelError::AgentUnavailable(format!(
                "agent '{}' has no model configured",
                self.agent_name
            )));
        }
        Ok((definition, resolved))
    }

    fn build_request(
        &self,
        ctx: &ConversationContext,
        definition: &AgentDefinition,
        resolved: &ResolvedAgent,
        tools: Vec<ToolDef>,
    ) -> LlmRequest {
        let instructions = definition
            .instructions
            .as_deref()
            .or(self.fallback_instructions.as_deref())
            .filter(|s| !s.trim().is_empty());

        let mut messages = Vec::with_capacity(ctx.len() + 1);
        if let Some(text) = instructions {
            messages.push(Message::system(text));
        }
        messages.extend(ctx.messages().iter().cloned());

        LlmRequest {
            messages,
            tools,
            max_tokens: definition.max_tokens,
            temperature: definition.temperature,
            model: resolved.model.clone(),
            provider: resolved.provider_id.clone(),
        }
    }

    async fn call_gateway(&self, resolved: &ResolvedAgent, request: LlmRequest) -> SentinelResult<LlmResponse> {
        tracing::debug!(
            agent = %self.agent_name,
            provider = %resolved.provider_id,
            model = %resolved.model,
            messages = request.messages.len(),
            tools = request.tools.len(),
            "calling model"
        );
        let response = resolved
            .provider
            .chat(request)
            .await
            .map_err(|e| SentinelError::GatewayFailure(e.to_string()))?;
        if !response.success {
            return Err(SentinelError::GatewayFailure(response.content));
        }
        Ok(response)
    }

    fn transition(&self, state: AgentState) {
        tracing::debug!(agent = %self.agent_name, state = ?state, "agent state");
    }
}

/// Gives calls without an id, or repeating an earlier id, a fresh one.
fn normalize_call_ids(calls: Vec<ToolCall>) -> Vec<ToolCall> {
    let mut seen = HashSet::new();
    calls
        .into_iter()
        .map(|mut call| {
            if call.id.trim().is_empty() || !seen.insert(call.id.clone()) {
                let fresh = format!("call_{}", uuid::Uuid::new_v4().simple());
                tracing::debug!(tool = %call.name, old = %call.id, new = %fresh, "tool call id reassigned");
                call.id = fresh.clone();
                seen.insert(fresh);
            }
            call
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::providers::scripted::ScriptedProvider;
    use crate::llm::types::{LlmResponse, Role, ToolArguments};
    use crate::tools::ToolSet;
    use async_trait::async_trait;
    use serde_json::json;

    struct Echo;

    #[async_trait]
    impl ToolSet for Echo {
        fn name(&self) -> &str {
            "echo"
        }

        fn declarations(&self) -> Vec<ToolDef> {
            vec![ToolDef::function("echo", "echo", json!({"type": "object"}))]
        }

        fn is_supported(&self, tool: &str) -> bool {
            tool == "echo"
        }

        async fn execute(&self, _tool: &str, arguments: &ToolArguments) -> SentinelResult<String> {
            Ok(serde_json::Value::Object(arguments.clone()).to_string())
        }
    }

    fn engine(provider: Arc<ScriptedProvider>, definition: AgentDefinition) -> AgentEngine {
        let mut providers = ProviderRegistry::new("mock".into());
        providers.register(provider);
        let mut tools = ToolRegistry::new();
        tools.register(Arc::new(Echo)).unwrap();
        AgentEngine::new("tester", definition, Arc::new(providers), Arc::new(tools))
    }

    fn definition() -> AgentDefinition {
        AgentDefinition {
            model: "mock-model".into(),
            instructions: Some("be brief".into()),
            ..AgentDefinition::default()
        }
    }

    #[test]
    fn duplicate_and_missing_ids_are_replaced() {
        let calls = normalize_call_ids(vec![
            ToolCall::new("a", "echo", json!({})),
            ToolCall::new("a", "echo", json!({})),
            ToolCall::new("", "echo", json!({})),
        ]);
        assert_eq!(calls[0].id, "a");
        assert_ne!(calls[1].id, "a");
        assert!(calls[2].id.starts_with("call_"));
        let unique: HashSet<&str> = calls.iter().map(|c| c.id.as_str()).collect();
        assert_eq!(unique.len(), 3);
    }

    #[tokio::test]
    async fn plain_answer_ends_the_turn() {
        let provider = Arc::new(ScriptedProvider::from_responses("mock", vec![LlmResponse::text("done")]));
        let engine = engine(provider.clone(), definition());
        let mut ctx = ConversationContext::new();
        ctx.push(Message::user("hi")).unwrap();

        let outcome = engine.run_turn(&mut ctx).await;
        assert!(outcome.success);
        assert_eq!(outcome.content, "done");
        assert_eq!(ctx.len(), 2);

        let request = &provider.requests()[0];
        assert_eq!(request.messages[0].role, Role::System);
        assert_eq!(request.messages[0].content, "be brief");
        assert_eq!(request.model, "mock-model");
        assert_eq!(request.tools.len(), 1);
    }

    #[tokio::test]
    async fn calls_over_the_cap_are_dropped() {
        let calls = (0..3)
            .map(|i| ToolCall::new(format!("c{i}"), "echo", json!({ "n": i })))
            .collect();
        let provider = Arc::new(ScriptedProvider::from_responses(
            "mock",
            vec![LlmResponse::with_calls("", calls), LlmResponse::text("ok")],
        ));
        let engine = engine(
            provider.clone(),
            AgentDefinition {
                max_tool_calls_per_turn: 2,
                ..definition()
            },
        );
        let mut ctx = ConversationContext::new();
        ctx.push(Message::user("go")).unwrap();

        let outcome = engine.run_turn(&mut ctx).await;
        assert!(outcome.success);
        let ids: Vec<&str> = outcome.tool_calls.iter().map(|c| c.id.as_str()).collect();
        assert_eq!(ids, vec!["c0", "c1"]);
        assert!(provider.requests()[1].tools.is_empty());
    }

    #[tokio::test]
    async fn disabled_agent_fails_without_calling_the_model() {
        let provider = Arc::new(ScriptedProvider::from_responses("mock", vec![LlmResponse::text("x")]));
        let engine = engine(
            provider.clone(),
            AgentDefinition {
                enabled: false,
                ..definition()
            },
        );
        let outcome = engine.run_turn(&mut ConversationContext::new()).await;
        assert!(!outcome.success);
        assert!(outcome.content.contains("disabled"));
        assert_eq!(provider.remaining(), 1);
    }

    #[tokio::test]
    async fn empty_model_is_malformed() {
        let provider = Arc::new(ScriptedProvider::from_responses("mock", vec![]));
        let engine = engine(provider, AgentDefinition::default());
        let outcome = engine.run_turn(&mut ConversationContext::new()).await;
        assert!(!outcome.success);
        assert!(outcome.content.contains("no model"));
    }

    #[tokio::test]
    async fn unsuccessful_response_is_a_gateway_failure() {
        let provider = Arc::new(ScriptedProvider::from_responses(
            "mock",
            vec![LlmResponse::failure("rate limited")],
        ));
        let engine = engine(provider, definition());
        let mut ctx = ConversationContext::new();
        ctx.push(Message::user("go")).unwrap();
        let outcome = engine.run_turn(&mut ctx).await;
        assert!(!outcome.success);
        assert_eq!(outcome.content, "Gateway failure: rate limited");
        assert_eq!(ctx.len(), 1);
    }
}
