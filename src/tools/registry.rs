use std::collections::HashSet;
use std::sync::Arc;

use crate::config::ToolsConfig;
use crate::errors::{SentinelError, SentinelResult};
use crate::llm::types::{ToolArguments, ToolCall, ToolDef};
use crate::tools::{ToolResponse, ToolSet};

/// Routes tool calls to registered tool sets, first match wins.
#[derive(Default)]
pub struct ToolRegistry {
    sets: Vec<Arc<dyn ToolSet>>,
    disabled: HashSet<String>,
    allow_overlapping: bool,
}

impl ToolRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_config(config: &ToolsConfig) -> Self {
        Self {
            sets: Vec::new(),
            disabled: config.disabled.iter().cloned().collect(),
            allow_overlapping: config.allow_overlapping,
        }
    }

    /// Fails with `DuplicateTool` when another set already handles one of the
    /// new set's tools, unless overlap is allowed.
    pub fn register(&mut self, set: Arc<dyn ToolSet>) -> SentinelResult<()> {
        if self.sets.iter().any(|s| s.name() == set.name()) {
            return Err(SentinelError::Config(format!(
                "tool set '{}' is already registered",
                set.name()
            )));
        }

        for decl in set.declarations() {
            let tool = decl.name();
            if let Some(existing) = self.owner(tool) {
                if !self.allow_overlapping {
                    return Err(SentinelError::DuplicateTool {
                        tool: tool.to_string(),
                        existing: existing.name().to_string(),
                    });
                }
                tracing::warn!(
                    tool,
                    existing = existing.name(),
                    shadowed = set.name(),
                    "overlapping tool registration; first registered set wins"
                );
            }
        }

        tracing::info!(
            set = set.name(),
            tools = set.declarations().len(),
            "tool set registered"
        );
        self.sets.push(set);
        Ok(())
    }

    pub fn unregister(&mut self, set_name: &str) -> bool {
        let before = self.sets.len();
        self.sets.retain(|s| s.name() != set_name);
        let removed = self.sets.len() != before;
        if removed {
            tracing::info!(set = set_name, "tool set unregistered");
        }
        removed
    }

    pub fn set_enabled(&mut self, tool: &str, enabled: bool) {
        if enabled {
            self.disabled.remove(tool);
        } else {
            self.disabled.insert(tool.to_string());
        }
    }

    pub fn is_enabled(&self, tool: &str) -> bool {
        !self.disabled.contains(tool)
    }

    pub fn is_supported(&self, tool: &str) -> bool {
        self.owner(tool).is_some()
    }

    /// Enabled declarations in registration order, one per tool name.
    pub fn declarations(&self) -> Vec<ToolDef> {
        let mut seen = HashSet::new();
        self.sets
            .iter()
            .flat_map(|s| s.declarations())
            .filter(|d| self.is_enabled(d.name()) && seen.insert(d.name().to_string()))
            .collect()
    }

    /// Never fails: every error becomes a failed response.
    pub async fn execute(&self, tool: &str, arguments: &ToolArguments) -> ToolResponse {
        self.dispatch("", tool, arguments).await
    }

    pub async fn execute_call(&self, call: &ToolCall) -> ToolResponse {
        self.dispatch(&call.id, &call.name, &call.arguments).await
    }

    async fn dispatch(&self, call_id: &str, tool: &str, arguments: &ToolArguments) -> ToolResponse {
        let Some(set) = self.owner(tool) else {
            tracing::warn!(tool, "unsupported tool requested");
            return ToolResponse::failed(call_id, SentinelError::ToolNotFound(tool.to_string()).to_string());
        };
        if !self.is_enabled(tool) {
            tracing::warn!(tool, "disabled tool requested");
            return ToolResponse::failed(call_id, SentinelError::ToolDisabled(tool.to_string()).to_string());
        }

        tracing::debug!(tool, set = set.name(), call_id, "executing tool");
        match set.execute(tool, arguments).await {
            Ok(content) => ToolResponse::ok(call_id, content),
            Err(e) => {
                tracing::warn!(tool, error = %e, "tool failed");
                ToolResponse::failed(call_id, e.to_string())
            }
        }
    }

    fn owner(&self, tool: &str) -> Option<&Arc<dyn ToolSet>> {
        self.sets.iter().find(|s| s.is_supported(tool))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;

    struct Fixed {
        name: &'static str,
        tools: &'static [&'static str],
    }

    #[async_trait]
    impl ToolSet for Fixed {
        fn name(&self) -> &str {
            self.name
        }

        fn declarations(&self) -> Vec<ToolDef> {
            self.tools
                .iter()
                .map(|t| ToolDef::function(*t, "test tool", serde_json::json!({"type": "object"})))
                .collect()
        }

        fn is_supported(&self, tool: &str) -> bool {
            self.tools.contains(&tool)
        }

        async fn execute(&self, tool: &str, _arguments: &ToolArguments) -> SentinelResult<String> {
            if tool == "explode" {
                return Err(SentinelError::invalid_args(tool, "boom"));
            }
            Ok(format!("{}:{tool}", self.name))
        }
    }

    fn set(name: &'static str, tools: &'static [&'static str]) -> Arc<dyn ToolSet> {
        Arc::new(Fixed { name, tools })
    }

    #[tokio::test]
    async fn unsupported_tool_is_a_failed_response() {
        let mut registry = ToolRegistry::new();
        registry.register(set("clicker", &["click"])).unwrap();

        assert!(!registry.is_supported("type_text"));
        let response = registry.execute("type_text", &ToolArguments::new()).await;
        assert!(!response.success);
        assert!(response.content.contains("Tool not found: type_text"));
    }

    #[tokio::test]
    async fn tool_errors_become_failed_responses() {
        let mut registry = ToolRegistry::new();
        registry.register(set("a", &["explode"])).unwrap();
        let call = ToolCall::new("call_1", "explode", serde_json::json!({}));
        let response = registry.execute_call(&call).await;
        assert_eq!(response.tool_call_id, "call_1");
        assert!(!response.success);
        assert!(response.content.contains("boom"));
    }

    #[test]
    fn duplicate_tools_are_rejected_by_default() {
        let mut registry = ToolRegistry::new();
        registry.register(set("a", &["click"])).unwrap();
        let err = registry.register(set("b", &["scroll", "click"])).unwrap_err();
        assert!(matches!(
            err,
            SentinelError::DuplicateTool { ref tool, ref existing } if tool == "click" && existing == "a"
        ));
        assert!(!registry.is_supported("scroll"));
    }

    #[tokio::test]
    async fn overlap_routes_to_first_registered() {
        let mut registry = ToolRegistry::from_config(&ToolsConfig {
            disabled: Vec::new(),
            allow_overlapping: true,
        });
        registry.register(set("a", &["click"])).unwrap();
        registry.register(set("b", &["click", "scroll"])).unwrap();

        let response = registry.execute("click", &ToolArguments::new()).await;
        assert_eq!(response.content, "a:click");
        let names: Vec<String> = registry.declarations().iter().map(|d| d.name().to_string()).collect();
        assert_eq!(names, vec!["click", "scroll"]);

        assert!(registry.unregister("a"));
        assert!(!registry.unregister("a"));
        assert_eq!(registry.execute("click", &ToolArguments::new()).await.content, "b:click");
    }

    #[tokio::test]
    async fn disabled_tools_are_hidden_and_refused() {
        let mut registry = ToolRegistry::from_config(&ToolsConfig {
            disabled: vec!["screenshot".into()],
            allow_overlapping: false,
        });
        registry.register(set("ui", &["click", "screenshot"])).unwrap();

        let names: Vec<String> = registry.declarations().iter().map(|d| d.name().to_string()).collect();
        assert_eq!(names, vec!["click"]);
        let response = registry.execute("screenshot", &ToolArguments::new()).await;
        assert!(!response.success);
        assert!(response.content.contains("disabled"));

        registry.set_enabled("screenshot", true);
        assert!(registry.execute("screenshot", &ToolArguments::new()).await.success);
    }
}
