//! Step-by-step test recorder producing a Markdown report per session.

pub mod capture;
pub mod report;

use std::path::{Path, PathBuf};
use std::sync::OnceLock;

use chrono::{DateTime, Local};
use regex::Regex;
use serde::Serialize;

use crate::config::ReporterConfig;
use crate::errors::SentinelResult;
use crate::reporter::capture::ScreenCapture;

pub const UNTITLED_TEST: &str = "Untitled test";
pub const REPORT_FILE: &str = "report.md";

#[derive(Debug, Clone, Serialize)]
pub struct TestStep {
    pub timestamp: DateTime<Local>,
    /// Screenshot label for screenshot steps.
    pub action: String,
    /// Image file name, relative to the report, for screenshot steps.
    pub result: String,
    pub is_screenshot: bool,
}

impl TestStep {
    pub fn new(action: impl Into<String>, result: impl Into<String>) -> Self {
        Self {
            timestamp: Local::now(),
            action: action.into(),
            result: result.into(),
            is_screenshot: false,
        }
    }

    pub fn screenshot(label: impl Into<String>, file_name: impl Into<String>) -> Self {
        Self {
            is_screenshot: true,
            ..Self::new(label, file_name)
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct TestSession {
    pub name: String,
    pub start_time: DateTime<Local>,
    pub steps: Vec<TestStep>,
    /// Claimed on the first artifact write.
    #[serde(skip)]
    artifact_dir: Option<PathBuf>,
}

impl TestSession {
    fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            start_time: Local::now(),
            steps: Vec::new(),
            artifact_dir: None,
        }
    }

    /// `<sanitized-name>_<YYYYmmdd_HHMMSS>`. See [`claim_dir`] for collisions.
    pub fn directory_name(&self) -> String {
        format!(
            "{}_{}",
            sanitize_name(&self.name),
            self.start_time.format("%Y%m%d_%H%M%S")
        )
    }
}

/// File-system safe form of a test or screenshot name.
pub fn sanitize_name(name: &str) -> String {
    static UNSAFE: OnceLock<Regex> = OnceLock::new();
    let re = UNSAFE.get_or_init(|| Regex::new(r"[^A-Za-z0-9_-]+").expect("hardcoded regex"));
    let cleaned = re.replace_all(name.trim(), "_");
    let cleaned: String = cleaned.trim_matches('_').chars().take(64).collect();
    if cleaned.is_empty() {
        "test".to_string()
    } else {
        cleaned
    }
}

/// Creates `<root>/<base>`, or the first free `<base>_<n>` when taken.
fn claim_dir(root: &Path, base: &str) -> SentinelResult<PathBuf> {
    std::fs::create_dir_all(root)?;
    let mut n = 1u32;
    loop {
        let dir = if n == 1 {
            root.join(base)
        } else {
            root.join(format!("{base}_{n}"))
        };
        match std::fs::create_dir(&dir) {
            Ok(()) => return Ok(dir),
            Err(e) if e.kind() == std::io::ErrorKind::AlreadyExists => n += 1,
            Err(e) => return Err(e.into()),
        }
    }
}

pub struct TestReporter {
    output_dir: PathBuf,
    capture: Box<dyn ScreenCapture>,
    session: Option<TestSession>,
    last_report: Option<PathBuf>,
}

impl TestReporter {
    pub fn new(output_dir: impl Into<PathBuf>, capture: Box<dyn ScreenCapture>) -> Self {
        Self {
            output_dir: output_dir.into(),
            capture,
            session: None,
            last_report: None,
        }
    }

    pub fn from_config(config: &ReporterConfig) -> Self {
        Self::new(config.resolved_output_dir(), capture::for_mode(config.capture))
    }

    pub fn output_dir(&self) -> &Path {
        &self.output_dir
    }

    pub fn has_active_session(&self) -> bool {
        self.session.is_some()
    }

    pub fn session(&self) -> Option<&TestSession> {
        self.session.as_ref()
    }

    /// Path of the most recent report written by [`Self::finish_test`].
    pub fn last_report(&self) -> Option<&Path> {
        self.last_report.as_deref()
    }

    pub fn start_test(&mut self, name: &str) {
        if let Some(previous) = self.session.take() {
            tracing::warn!(
                session = %previous.name,
                discarded_steps = previous.steps.len(),
                "starting a new test discards the unfinished session"
            );
        }
        let session = TestSession::new(name);
        tracing::info!(test = %session.name, "test started");
        self.session = Some(session);
    }

    pub fn log_step(&mut self, action: impl Into<String>, result: impl Into<String>) {
        let step = TestStep::new(action, result);
        tracing::debug!(action = %step.action, result = %step.result, "step");
        self.active_session().steps.push(step);
    }

    /// Writes a PNG into the session directory and records it as a step.
    /// Returns `None` only if the file could not be written.
    pub fn capture_screenshot(&mut self, label: &str) -> Option<PathBuf> {
        let index = self.active_session().steps.len() + 1;
        let file_name = format!("{index:02}_{}.png", sanitize_name(label));

        let written = self.artifact_dir().and_then(|dir| {
            let path = dir.join(&file_name);
            capture::write_screenshot(self.capture.as_ref(), &path).map(|_| path)
        });
        let path = match written {
            Ok(path) => path,
            Err(e) => {
                tracing::error!(label, error = %e, "screenshot could not be written");
                self.log_step(format!("screenshot {label}"), format!("FAILED: {e}"));
                return None;
            }
        };

        tracing::info!(label, path = %path.display(), "screenshot captured");
        self.active_session()
            .steps
            .push(TestStep::screenshot(label, file_name));
        Some(path)
    }

    /// Renders and writes `report.md`, closing the session. `None` when there
    /// is nothing to report or the report could not be written.
    pub fn finish_test(&mut self, success: bool, summary: &str) -> Option<PathBuf> {
        if self.session.is_none() {
            tracing::warn!("finish_test called without an active test");
            return None;
        }
        let written = self.write_report(success, summary);
        let session = self.session.take()?;
        match written {
            Ok(path) => {
                tracing::info!(
                    test = %session.name,
                    success,
                    steps = session.steps.len(),
                    path = %path.display(),
                    "test finished"
                );
                self.last_report = Some(path.clone());
                Some(path)
            }
            Err(e) => {
                tracing::error!(test = %session.name, error = %e, "report could not be written");
                None
            }
        }
    }

    fn write_report(&mut self, success: bool, summary: &str) -> SentinelResult<PathBuf> {
        let path = self.artifact_dir()?.join(REPORT_FILE);
        let session = self.active_session();
        std::fs::write(&path, report::render(session, success, summary, Local::now()))?;
        Ok(path)
    }

    /// The active session's artifact directory, claimed on first use.
    fn artifact_dir(&mut self) -> SentinelResult<PathBuf> {
        if let Some(dir) = self.session.as_ref().and_then(|s| s.artifact_dir.clone()) {
            return Ok(dir);
        }
        let base = self.active_session().directory_name();
        let dir = claim_dir(&self.output_dir, &base)?;
        tracing::debug!(dir = %dir.display(), "artifact directory created");
        self.active_session().artifact_dir = Some(dir.clone());
        Ok(dir)
    }

    /// The open session, or a fresh untitled one for steps logged before any test started.
    fn active_session(&mut self) -> &mut TestSession {
        self.session.get_or_insert_with(|| {
            tracing::warn!("step logged without an active test; recording under \"{UNTITLED_TEST}\"");
            TestSession::new(UNTITLED_TEST)
        })
    }
}
