//! UI automation tools: inspection, interaction, waits and test reporting
//! behind one [`ToolSet`].

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde_json::Value;
use tokio::sync::Mutex;

use crate::errors::{SentinelError, SentinelResult};
use crate::llm::tools::load_builtin_tools;
use crate::llm::types::{ToolArguments, ToolDef};
use crate::reporter::TestReporter;
use crate::tools::ToolSet;
use crate::ui::inspector::UiInspector;
use crate::ui::interactor::{seconds_to_duration, UiInteractor};
use crate::ui::UiSurface;

pub const UI_TOOL_SET: &str = "ui_automation";

const DEFAULT_WAIT_TIMEOUT_SECS: f64 = 5.0;
/// Upper bound for model-supplied waits.
const MAX_WAIT_SECS: f64 = 600.0;

pub struct UiAutomationToolSet {
    inspector: UiInspector,
    interactor: UiInteractor,
    reporter: Arc<Mutex<TestReporter>>,
    declarations: Vec<ToolDef>,
}

impl UiAutomationToolSet {
    pub fn new(surface: UiSurface, reporter: TestReporter) -> SentinelResult<Self> {
        Ok(Self {
            inspector: UiInspector::new(surface.clone()),
            interactor: UiInteractor::new(surface),
            reporter: Arc::new(Mutex::new(reporter)),
            declarations: load_builtin_tools()?,
        })
    }

    pub fn with_poll_interval(mut self, interval: Duration) -> Self {
        self.interactor = self.interactor.with_poll_interval(interval);
        self
    }

    /// Shared handle so the test loop can close a session the model left open.
    pub fn reporter(&self) -> Arc<Mutex<TestReporter>> {
        Arc::clone(&self.reporter)
    }

    async fn record<T>(&self, action: String, result: &SentinelResult<T>) {
        let outcome = match result {
            Ok(_) => "OK".to_string(),
            Err(e) => format!("FAILED: {e}"),
        };
        self.reporter.lock().await.log_step(action, outcome);
    }

    async fn click(&self, args: &ToolArguments) -> SentinelResult<String> {
        let path = required_str("click", args, "elementPath")?;
        let result = self.interactor.try_click(path);
        self.record(format!("click {path}"), &result).await;
        result.map(|_| format!("Clicked {path}"))
    }

    async fn type_text(&self, args: &ToolArguments) -> SentinelResult<String> {
        let path = required_str("type_text", args, "elementPath")?;
        let text = required_str("type_text", args, "text")?;
        let result = self.interactor.try_type_text(path, text);
        self.record(format!("type_text {path} \"{text}\""), &result).await;
        result.map(|_| format!("Typed \"{text}\" into {path}"))
    }

    async fn scroll(&self, args: &ToolArguments) -> SentinelResult<String> {
        let path = required_str("scroll", args, "elementPath")?;
        let delta = required_f64("scroll", args, "delta")?;
        let result = self.interactor.try_scroll(path, delta as f32);
        self.record(format!("scroll {path} by {delta}"), &result).await;
        result.map(|_| format!("Scrolled {path} by {delta}px"))
    }

    async fn wait_seconds(&self, args: &ToolArguments) -> SentinelResult<String> {
        let seconds = wait_secs("wait_seconds", "seconds", required_f64("wait_seconds", args, "seconds")?)?;
        self.interactor.wait_seconds(seconds).await;
        self.record(format!("wait {seconds}s"), &Ok::<(), SentinelError>(())).await;
        Ok(format!("Waited {seconds}s"))
    }

    async fn wait_for_element(&self, args: &ToolArguments) -> SentinelResult<String> {
        let path = required_str("wait_for_element", args, "elementPath")?;
        let timeout_secs = optional_f64("wait_for_element", args, "timeout")?
            .unwrap_or(DEFAULT_WAIT_TIMEOUT_SECS);
        let timeout = seconds_to_duration(wait_secs("wait_for_element", "timeout", timeout_secs)?);

        let result = if self.interactor.wait_for_element(path, timeout).await {
            Ok(())
        } else {
            Err(SentinelError::Timeout {
                what: path.to_string(),
                waited_ms: timeout.as_millis() as u64,
            })
        };
        self.record(format!("wait_for_element {path}"), &result).await;
        result.map(|_| format!("{path} is visible"))
    }

    async fn screenshot(&self, args: &ToolArguments) -> SentinelResult<String> {
        let label = required_str("screenshot", args, "label")?;
        let saved = self.reporter.lock().await.capture_screenshot(label);
        saved
            .map(|path| format!("Screenshot saved to {}", path.display()))
            .ok_or_else(|| SentinelError::Screenshot(format!("could not save screenshot '{label}'")))
    }

    async fn start_test(&self, args: &ToolArguments) -> SentinelResult<String> {
        let name = required_str("start_test", args, "testName")?;
        self.reporter.lock().await.start_test(name);
        Ok(format!("Test '{name}' started"))
    }

    async fn finish_test(&self, args: &ToolArguments) -> SentinelResult<String> {
        let success = required_bool("finish_test", args, "success")?;
        let summary = optional_str(args, "summary").unwrap_or_default();
        let report = self.reporter.lock().await.finish_test(success, summary);
        let verdict = if success { "PASSED" } else { "FAILED" };
        Ok(match report {
            Some(path) => format!("Test finished: {verdict}. Report written to {}", path.display()),
            None => format!("Test finished: {verdict}. No report was written"),
        })
    }
}

#[async_trait]
impl ToolSet for UiAutomationToolSet {
    fn name(&self) -> &str {
        UI_TOOL_SET
    }

    fn declarations(&self) -> Vec<ToolDef> {
        self.declarations.clone()
    }

    fn is_supported(&self, tool: &str) -> bool {
        self.declarations.iter().any(|d| d.name() == tool)
    }

    async fn execute(&self, tool: &str, arguments: &ToolArguments) -> SentinelResult<String> {
        match tool {
            "query_ui" => self.inspector.hierarchy_json(),
            "click" => self.click(arguments).await,
            "type_text" => self.type_text(arguments).await,
            "scroll" => self.scroll(arguments).await,
            "wait_seconds" => self.wait_seconds(arguments).await,
            "wait_for_element" => self.wait_for_element(arguments).await,
            "check_element_state" => {
                let path = required_str(tool, arguments, "elementPath")?;
                let state = self.inspector.get_element_state(path)?;
                Ok(serde_json::to_string_pretty(&state)?)
            }
            "screenshot" => self.screenshot(arguments).await,
            "start_test" => self.start_test(arguments).await,
            "finish_test" => self.finish_test(arguments).await,
            other => Err(SentinelError::ToolNotFound(other.to_string())),
        }
    }
}

fn required<'a>(tool: &str, args: &'a ToolArguments, key: &str) -> SentinelResult<&'a Value> {
    args.get(key)
        .filter(|v| !v.is_null())
        .ok_or_else(|| SentinelError::invalid_args(tool, format!("missing '{key}'")))
}

fn required_str<'a>(tool: &str, args: &'a ToolArguments, key: &str) -> SentinelResult<&'a str> {
    required(tool, args, key)?
        .as_str()
        .ok_or_else(|| SentinelError::invalid_args(tool, format!("'{key}' must be a string")))
}

fn required_f64(tool: &str, args: &ToolArguments, key: &str) -> SentinelResult<f64> {
    required(tool, args, key)?
        .as_f64()
        .ok_or_else(|| SentinelError::invalid_args(tool, format!("'{key}' must be a number")))
}

fn required_bool(tool: &str, args: &ToolArguments, key: &str) -> SentinelResult<bool> {
    required(tool, args, key)?
        .as_bool()
        .ok_or_else(|| SentinelError::invalid_args(tool, format!("'{key}' must be a boolean")))
}

fn optional_f64(tool: &str, args: &ToolArguments, key: &str) -> SentinelResult<Option<f64>> {
    match args.get(key) {
        None | Some(Value::Null) => Ok(None),
        Some(v) => v
            .as_f64()
            .map(Some)
            .ok_or_else(|| SentinelError::invalid_args(tool, format!("'{key}' must be a number"))),
    }
}

/// Rejects waits longer than [`MAX_WAIT_SECS`]; negative values wait zero.
fn wait_secs(tool: &str, key: &str, seconds: f64) -> SentinelResult<f64> {
    if !seconds.is_finite() || seconds > MAX_WAIT_SECS {
        return Err(SentinelError::invalid_args(
            tool,
            format!("'{key}' must be at most {MAX_WAIT_SECS} seconds"),
        ));
    }
    Ok(seconds.max(0.0))
}

fn optional_str<'a>(args: &'a ToolArguments, key: &str) -> Option<&'a str> {
    args.get(key).and_then(Value::as_str)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::reporter::capture::HeadlessCapture;
    use crate::tools::ToolRegistry;
    use crate::ui::toolkit::{ToolkitNode, ToolkitTree};
    use serde_json::json;

    fn args(value: Value) -> ToolArguments {
        match value {
            Value::Object(map) => map,
            _ => ToolArguments::new(),
        }
    }

    fn tool_set(surface: UiSurface, dir: &std::path::Path) -> UiAutomationToolSet {
        UiAutomationToolSet::new(surface, TestReporter::new(dir, Box::new(HeadlessCapture))).unwrap()
    }

    #[tokio::test]
    async fn click_on_missing_path_logs_failed_step() {
        let dir = tempfile::tempdir().unwrap();
        let tools = tool_set(UiSurface::empty(), dir.path());

        let err = tools
            .execute("click", &args(json!({"elementPath": "missing/path"})))
            .await
            .unwrap_err();
        assert!(matches!(err, SentinelError::ElementNotFound { .. }));

        let reporter = tools.reporter();
        let reporter = reporter.lock().await;
        let step = &reporter.session().unwrap().steps[0];
        assert_eq!(step.action, "click missing/path");
        assert!(step.result.starts_with("FAILED"));
    }

    #[tokio::test]
    async fn missing_arguments_are_invalid() {
        let dir = tempfile::tempdir().unwrap();
        let tools = tool_set(UiSurface::empty(), dir.path());

        let err = tools.execute("type_text", &args(json!({"elementPath": "A/B"}))).await.unwrap_err();
        assert!(matches!(err, SentinelError::InvalidArguments { .. }));
        let err = tools
            .execute("scroll", &args(json!({"elementPath": "A/B", "delta": "lots"})))
            .await
            .unwrap_err();
        assert!(err.to_string().contains("'delta' must be a number"));
    }

    #[tokio::test(start_paused = true)]
    async fn oversized_waits_are_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let mut registry = ToolRegistry::new();
        registry
            .register(Arc::new(tool_set(UiSurface::empty(), dir.path())))
            .unwrap();

        for (tool, a) in [
            ("wait_seconds", json!({"seconds": 1e30})),
            ("wait_for_element", json!({"elementPath": "X", "timeout": 1e30})),
        ] {
            let response = registry.execute(tool, &args(a)).await;
            assert!(!response.success, "{tool}");
            assert!(response.content.contains("at most 600 seconds"), "{}", response.content);
        }

        let response = registry.execute("wait_seconds", &args(json!({"seconds": -2}))).await;
        assert!(response.success);
    }

    #[tokio::test]
    async fn full_session_through_the_registry() {
        let dir = tempfile::tempdir().unwrap();
        let mut tree = ToolkitTree::new();
        let panel = tree.add_panel("Login");
        tree.add_child(panel, ToolkitNode::text_field("User", ""));
        tree.add_child(panel, ToolkitNode::button("Submit", "Sign in"));
        let surface = UiSurface::from_trees(Some(tree.into_shared()), None);

        let mut registry = ToolRegistry::new();
        registry
            .register(Arc::new(tool_set(surface, dir.path())))
            .unwrap();

        let ui = registry.execute("query_ui", &ToolArguments::new()).await;
        assert!(ui.success);
        assert!(ui.content.contains("Login/Submit"));

        for (tool, a) in [
            ("start_test", json!({"testName": "Sign in"})),
            ("type_text", json!({"elementPath": "Login/User", "text": "ada"})),
            ("click", json!({"elementPath": "Submit"})),
            ("screenshot", json!({"label": "signed in"})),
        ] {
            let response = registry.execute(tool, &args(a)).await;
            assert!(response.success, "{tool}: {}", response.content);
        }

        let state = registry
            .execute("check_element_state", &args(json!({"elementPath": "Login/User"})))
            .await;
        assert!(state.content.contains("\"text\": \"ada\""));

        let finish = registry
            .execute("finish_test", &args(json!({"success": true, "summary": "signed in"})))
            .await;
        assert!(finish.success);
        assert!(finish.content.contains("PASSED"));

        let report = std::fs::read_dir(dir.path())
            .unwrap()
            .next()
            .unwrap()
            .unwrap()
            .path()
            .join("report.md");
        let md = std::fs::read_to_string(report).unwrap();
        assert!(md.contains("| type_text Login/User \"ada\" | OK |"));
        assert!(md.contains("| click Submit | OK |"));
        assert!(md.contains("![signed in](03_signed_in.png)"));
    }
}
