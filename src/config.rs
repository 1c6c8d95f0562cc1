use std::collections::HashMap;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::errors::{SentinelError, SentinelResult};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    pub llm: LlmConfig,
    #[serde(default = "default_agents")]
    pub agents: HashMap<String, AgentDefinition>,
    #[serde(default)]
    pub sentinel: SentinelConfig,
    #[serde(default)]
    pub ui: UiConfig,
    #[serde(default)]
    pub reporter: ReporterConfig,
    #[serde(default)]
    pub tools: ToolsConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct LlmConfig {
    pub active_provider: String,
    #[serde(default)]
    pub providers: HashMap<String, ProviderEntry>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProviderEntry {
    pub display_name: String,
    pub api_base: String,
    /// Default model for this provider, used when an agent leaves `model` empty.
    pub model: String,
    #[serde(default = "default_temperature")]
    pub temperature: f64,
    /// "openai" (default) or "scripted".
    pub adapter: Option<String>,
    /// Optional API key stored in config.toml (env var SENTINEL_<ID>_API_KEY wins).
    #[serde(default)]
    pub api_key: Option<String>,
    #[serde(default)]
    pub stream: bool,
}

/// One named agent: fixed instructions plus generation parameters.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgentDefinition {
    #[serde(default)]
    pub instructions: Option<String>,
    #[serde(default = "default_true")]
    pub enabled: bool,
    /// Provider id; empty means the active provider.
    #[serde(default)]
    pub provider: String,
    /// Model id; empty means the provider's default model.
    #[serde(default)]
    pub model: String,
    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,
    #[serde(default = "default_temperature")]
    pub temperature: f64,
    #[serde(default = "default_max_tool_calls")]
    pub max_tool_calls_per_turn: usize,
}

impl Default for AgentDefinition {
    fn default() -> Self {
        Self {
            instructions: None,
            enabled: true,
            provider: String::new(),
            model: String::new(),
            max_tokens: default_max_tokens(),
            temperature: default_temperature(),
            max_tool_calls_per_turn: default_max_tool_calls(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SentinelConfig {
    /// Key under `[agents.*]` driving the autonomous test loop.
    #[serde(default = "default_agent_name")]
    pub agent: String,
    #[serde(default = "default_max_iterations")]
    pub max_iterations: u32,
}

impl Default for SentinelConfig {
    fn default() -> Self {
        Self {
            agent: default_agent_name(),
            max_iterations: default_max_iterations(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UiConfig {
    #[serde(default = "default_poll_interval_ms")]
    pub wait_poll_interval_ms: u64,
    /// JSON scene fixture loaded at startup for headless runs.
    #[serde(default)]
    pub scene_file: Option<PathBuf>,
}

impl Default for UiConfig {
    fn default() -> Self {
        Self {
            wait_poll_interval_ms: default_poll_interval_ms(),
            scene_file: None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum CaptureMode {
    Live,
    #[default]
    Headless,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct ReporterConfig {
    #[serde(default)]
    pub output_dir: Option<PathBuf>,
    #[serde(default)]
    pub capture: CaptureMode,
}

impl ReporterConfig {
    /// Configured directory, else `<data_local_dir>/sentinel/reports`, else `./sentinel-reports`.
    pub fn resolved_output_dir(&self) -> PathBuf {
        if let Some(dir) = &self.output_dir {
            return dir.clone();
        }
        dirs::data_local_dir()
            .map(|d| d.join("sentinel").join("reports"))
            .unwrap_or_else(|| PathBuf::from("sentinel-reports"))
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct ToolsConfig {
    #[serde(default)]
    pub disabled: Vec<String>,
    #[serde(default)]
    pub allow_overlapping: bool,
}

fn default_temperature() -> f64 {
    0.1
}

fn default_true() -> bool {
    true
}

fn default_max_tokens() -> u32 {
    2048
}

fn default_max_tool_calls() -> usize {
    4
}

fn default_agent_name() -> String {
    "sentinel".to_string()
}

fn default_max_iterations() -> u32 {
    30
}

fn default_poll_interval_ms() -> u64 {
    100
}

fn default_agents() -> HashMap<String, AgentDefinition> {
    let mut agents = HashMap::new();
    agents.insert(default_agent_name(), AgentDefinition::default());
    agents
}

impl AppConfig {
    pub fn from_toml(content: &str) -> SentinelResult<Self> {
        Ok(toml::from_str(content)?)
    }
}

fn resolve_config_path() -> SentinelResult<PathBuf> {
    if let Ok(explicit) = std::env::var("SENTINEL_CONFIG") {
        let candidate = PathBuf::from(explicit);
        if candidate.exists() {
            tracing::debug!(path = %candidate.display(), "config found via SENTINEL_CONFIG");
            return Ok(candidate);
        }
        return Err(SentinelError::Config(format!(
            "SENTINEL_CONFIG points to missing file {}",
            candidate.display()
        )));
    }

    if let Ok(exe) = std::env::current_exe() {
        if let Some(parent) = exe.parent() {
            let candidate = parent.join("config.toml");
            if candidate.exists() {
                tracing::debug!(path = %candidate.display(), "config found next to executable");
                return Ok(candidate);
            }
        }
    }

    let cwd = std::env::current_dir()?;
    let candidate = cwd.join("config.toml");
    if candidate.exists() {
        tracing::debug!(path = %candidate.display(), "config found in working directory");
        return Ok(candidate);
    }

    Err(SentinelError::Config(
        "config.toml not found via SENTINEL_CONFIG, next to executable or in working directory"
            .into(),
    ))
}

pub fn load_config() -> SentinelResult<AppConfig> {
    let path = resolve_config_path()?;
    load_config_from(&path)
}

pub fn load_config_from(path: &Path) -> SentinelResult<AppConfig> {
    let content = std::fs::read_to_string(path)?;
    let config = AppConfig::from_toml(&content)?;
    tracing::info!(path = %path.display(), provider = %config.llm.active_provider, "config loaded");
    Ok(config)
}

pub fn save_config(config: &AppConfig) -> SentinelResult<()> {
    let path = resolve_config_path()?;
    let content = toml::to_string_pretty(config)?;
    std::fs::write(&path, content)?;
    tracing::info!(path = %path.display(), "config saved");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn minimal_config_fills_defaults() {
        let cfg = AppConfig::from_toml(
            r#"
            [llm]
            active_provider = "local"

            [llm.providers.local]
            display_name = "Local"
            api_base = "http://127.0.0.1:8080/v1/chat/completions"
            model = "qwen"
            "#,
        )
        .unwrap();

        assert_eq!(cfg.sentinel.agent, "sentinel");
        assert_eq!(cfg.sentinel.max_iterations, 30);
        assert_eq!(cfg.ui.wait_poll_interval_ms, 100);
        assert_eq!(cfg.reporter.capture, CaptureMode::Headless);
        let agent = &cfg.agents["sentinel"];
        assert!(agent.enabled);
        assert_eq!(agent.max_tool_calls_per_turn, 4);
        assert!(!cfg.llm.providers["local"].stream);
    }

    #[test]
    fn agent_section_overrides_defaults() {
        let cfg = AppConfig::from_toml(
            r#"
            [llm]
            active_provider = "local"

            [agents.sentinel]
            enabled = false
            model = "gpt-test"
            max_tool_calls_per_turn = 1

            [tools]
            disabled = ["screenshot"]
            "#,
        )
        .unwrap();

        let agent = &cfg.agents["sentinel"];
        assert!(!agent.enabled);
        assert_eq!(agent.model, "gpt-test");
        assert_eq!(agent.max_tool_calls_per_turn, 1);
        assert_eq!(cfg.tools.disabled, vec!["screenshot".to_string()]);
    }

    #[test]
    fn explicit_output_dir_wins() {
        let cfg = ReporterConfig {
            output_dir: Some(PathBuf::from("/tmp/reports")),
            capture: CaptureMode::Live,
        };
        assert_eq!(cfg.resolved_output_dir(), PathBuf::from("/tmp/reports"));
    }
}
