use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;

use crate::config::{AgentDefinition, AppConfig, LlmConfig};
use crate::errors::{SentinelError, SentinelResult};
use crate::llm::provider::LlmProvider;
use crate::llm::providers::openai_compatible::OpenAiCompatibleProvider;
use crate::llm::providers::scripted::ScriptedProvider;

/// Provider and generation parameters resolved for one agent.
#[derive(Clone)]
pub struct ResolvedAgent {
    pub provider: Arc<dyn LlmProvider>,
    pub provider_id: String,
    pub model: String,
}

/// Registry of all available LLM providers, keyed by their config.toml identifier.
pub struct ProviderRegistry {
    providers: HashMap<String, Arc<dyn LlmProvider>>,
    active: String,
    /// Kept for default-model lookups.
    llm_config: LlmConfig,
}

impl ProviderRegistry {
    pub fn new(active: String) -> Self {
        Self {
            providers: HashMap::new(),
            active,
            llm_config: LlmConfig::default(),
        }
    }

    pub fn register(&mut self, provider: Arc<dyn LlmProvider>) {
        self.providers.insert(provider.name().to_string(), provider);
    }

    pub fn get_active(&self) -> SentinelResult<Arc<dyn LlmProvider>> {
        self.providers.get(&self.active).cloned().ok_or_else(|| {
            SentinelError::Config(format!("Active provider '{}' not found in registry", self.active))
        })
    }

    pub fn set_active(&mut self, name: String) -> SentinelResult<()> {
        if self.providers.contains_key(&name) {
            self.active = name;
            Ok(())
        } else {
            Err(SentinelError::Config(format!("Provider '{name}' not registered")))
        }
    }

    pub fn list_names(&self) -> Vec<String> {
        self.providers.keys().cloned().collect()
    }

    /// Resolve the provider and model for an agent definition.
    ///
    /// Resolution order:
    /// 1. `provider` / `model` set on the agent
    /// 2. Fallback: active provider and its default model
    pub fn resolve(&self, agent: &AgentDefinition) -> SentinelResult<ResolvedAgent> {
        let provider_id = if agent.provider.is_empty() {
            self.active.clone()
        } else {
            agent.provider.clone()
        };
        let provider = self.providers.get(&provider_id).cloned().ok_or_else(|| {
            SentinelError::AgentUnavailable(format!("unknown provider '{provider_id}'"))
        })?;

        let model = if agent.model.is_empty() {
            self.llm_config
                .providers
                .get(&provider_id)
                .map(|p| p.model.clone())
                .unwrap_or_default()
        } else {
            agent.model.clone()
        };

        tracing::debug!(provider = %provider_id, model = %model, "resolved agent provider");
        Ok(ResolvedAgent {
            provider,
            provider_id,
            model,
        })
    }

    /// Build a registry from the loaded app config.
    /// API keys are read from environment variables named `SENTINEL_<ID>_API_KEY`.
    pub fn from_config(config: &AppConfig) -> SentinelResult<Self> {
        let mut registry = Self {
            providers: HashMap::new(),
            active: config.llm.active_provider.clone(),
            llm_config: config.llm.clone(),
        };
        for (id, entry) in &config.llm.providers {
            let provider: Arc<dyn LlmProvider> = match entry.adapter.as_deref() {
                None | Some("openai") => {
                    let api_key = std::env::var(format!("SENTINEL_{}_API_KEY", id.to_uppercase()))
                        .unwrap_or_else(|_| entry.api_key.clone().unwrap_or_default());
                    Arc::new(OpenAiCompatibleProvider::new(
                        id.clone(),
                        entry.api_base.clone(),
                        api_key,
                        entry.stream,
                    ))
                }
                Some("scripted") => Arc::new(ScriptedProvider::from_file(
                    id.clone(),
                    Path::new(&entry.api_base),
                )?),
                Some(other) => {
                    return Err(SentinelError::Config(format!(
                        "provider '{id}' uses unknown adapter '{other}'"
                    )))
                }
            };
            registry.register(provider);
        }
        tracing::info!(providers = registry.providers.len(), active = %registry.active, "provider registry built");
        Ok(registry)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ProviderEntry;

    fn registry_with(model: &str) -> ProviderRegistry {
        let mut llm = LlmConfig {
            active_provider: "main".into(),
            providers: HashMap::new(),
        };
        llm.providers.insert(
            "main".into(),
            ProviderEntry {
                display_name: "Main".into(),
                api_base: String::new(),
                model: model.into(),
                temperature: 0.1,
                adapter: Some("scripted".into()),
                api_key: None,
                stream: false,
            },
        );
        let mut registry = ProviderRegistry {
            providers: HashMap::new(),
            active: "main".into(),
            llm_config: llm,
        };
        registry.register(Arc::new(ScriptedProvider::new("main", Vec::new())));
        registry
    }

    #[test]
    fn empty_agent_fields_fall_back_to_active_provider() {
        let registry = registry_with("default-model");
        let resolved = registry.resolve(&AgentDefinition::default()).unwrap();
        assert_eq!(resolved.provider_id, "main");
        assert_eq!(resolved.model, "default-model");
    }

    #[test]
    fn unknown_provider_is_agent_unavailable() {
        let registry = registry_with("m");
        let agent = AgentDefinition {
            provider: "nope".into(),
            ..AgentDefinition::default()
        };
        let err = registry.resolve(&agent).err().unwrap();
        assert!(matches!(err, SentinelError::AgentUnavailable(_)));
    }

    #[test]
    fn set_active_requires_registration() {
        let mut registry = registry_with("m");
        assert!(registry.set_active("other".into()).is_err());
        assert!(registry.set_active("main".into()).is_ok());
        assert_eq!(registry.list_names(), vec!["main".to_string()]);
    }
}
