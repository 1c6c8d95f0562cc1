pub mod agent_engine;
pub mod config;
pub mod errors;
pub mod llm;
pub mod reporter;
pub mod telemetry;
pub mod tools;
pub mod ui;

use std::sync::Arc;
use std::time::Duration;

use crate::agent_engine::engine::AgentEngine;
use crate::agent_engine::sentinel::{SentinelLoop, SentinelTestResult, SENTINEL_INSTRUCTIONS};
use crate::config::AppConfig;
use crate::errors::SentinelResult;
use crate::llm::registry::ProviderRegistry;
use crate::reporter::TestReporter;
use crate::tools::{ToolRegistry, UiAutomationToolSet};
use crate::ui::fixture::{LoadedScene, SceneFixture};

/// Scene from `ui.scene_file`, or an empty UI when none is configured.
pub fn load_scene(config: &AppConfig) -> SentinelResult<LoadedScene> {
    match &config.ui.scene_file {
        Some(path) => Ok(SceneFixture::load(path)?.build()),
        None => {
            tracing::warn!("no ui.scene_file configured; the agent will see an empty UI");
            Ok(SceneFixture::default().build())
        }
    }
}

/// Wires gateway registry, tool set and agent into an autonomous test loop
/// over `scene`.
pub fn build_sentinel(config: &AppConfig, scene: &LoadedScene) -> SentinelResult<SentinelLoop> {
    let providers = Arc::new(ProviderRegistry::from_config(config)?);

    let reporter = TestReporter::from_config(&config.reporter);
    let output_dir = reporter.output_dir().to_path_buf();
    let tool_set = UiAutomationToolSet::new(scene.surface(), reporter)?
        .with_poll_interval(Duration::from_millis(config.ui.wait_poll_interval_ms));
    let reporter = tool_set.reporter();

    let mut tools = ToolRegistry::from_config(&config.tools);
    tools.register(Arc::new(tool_set))?;

    let engine = AgentEngine::from_config(config, &config.sentinel.agent, providers, Arc::new(tools))
        .with_fallback_instructions(SENTINEL_INSTRUCTIONS);

    Ok(SentinelLoop::new(engine, reporter, config.sentinel.max_iterations).with_transcript_dir(output_dir))
}

/// Runs one goal end to end against the configured scene.
pub async fn run_goal(config: &AppConfig, goal: &str) -> SentinelResult<SentinelTestResult> {
    let scene = load_scene(config)?;
    let sentinel = build_sentinel(config, &scene)?;
    Ok(sentinel.run(goal).await)
}
