use std::time::Duration;

use tokio::time::Instant;

use crate::errors::{SentinelError, SentinelResult};
use crate::ui::traits::UiControl;
use crate::ui::UiSurface;

pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_millis(100);

/// Write operations and waits against the live UI.
///
/// The `try_*` methods report why an action failed; the plain methods collapse
/// that into a `bool` and log the reason.
#[derive(Clone)]
pub struct UiInteractor {
    surface: UiSurface,
    poll_interval: Duration,
}

impl UiInteractor {
    pub fn new(surface: UiSurface) -> Self {
        Self {
            surface,
            poll_interval: DEFAULT_POLL_INTERVAL,
        }
    }

    pub fn with_poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = interval.max(Duration::from_millis(1));
        self
    }

    pub fn poll_interval(&self) -> Duration {
        self.poll_interval
    }

    fn resolve(&self, path: &str) -> SentinelResult<Box<dyn UiControl>> {
        self.surface
            .resolve(path)
            .ok_or_else(|| SentinelError::element_not_found(path))
    }

    pub fn try_click(&self, path: &str) -> SentinelResult<()> {
        let control = self.resolve(path)?;
        control.invoke_click()?;
        tracing::info!(path = %control.path(), system = ?control.ui_system(), "clicked");
        Ok(())
    }

    pub fn try_type_text(&self, path: &str, text: &str) -> SentinelResult<()> {
        let control = self.resolve(path)?;
        control.set_text(text)?;
        tracing::info!(path = %control.path(), chars = text.chars().count(), "typed");
        Ok(())
    }

    pub fn try_scroll(&self, path: &str, delta: f32) -> SentinelResult<()> {
        if !delta.is_finite() {
            return Err(SentinelError::unsupported("scroll", path, "delta must be finite"));
        }
        let control = self.resolve(path)?;
        control.scroll_by(delta)?;
        tracing::info!(path = %control.path(), delta, "scrolled");
        Ok(())
    }

    pub fn click(&self, path: &str) -> bool {
        log_outcome("click", path, self.try_click(path))
    }

    pub fn type_text(&self, path: &str, text: &str) -> bool {
        log_outcome("type_text", path, self.try_type_text(path, text))
    }

    pub fn scroll(&self, path: &str, delta: f32) -> bool {
        log_outcome("scroll", path, self.try_scroll(path, delta))
    }

    /// Pure suspension. See [`seconds_to_duration`] for out-of-range input.
    pub async fn wait_seconds(&self, seconds: f64) {
        let duration = seconds_to_duration(seconds);
        tracing::debug!(ms = duration.as_millis() as u64, "waiting");
        tokio::time::sleep(duration).await;
    }

    /// Polls with the configured interval. See [`Self::wait_for_element_with`].
    pub async fn wait_for_element(&self, path: &str, timeout: Duration) -> bool {
        self.wait_for_element_with(path, timeout, self.poll_interval).await
    }

    /// Returns `true` once `path` resolves to a visible element strictly before
    /// `timeout` has elapsed, `false` otherwise. A zero timeout never polls.
    pub async fn wait_for_element_with(&self, path: &str, timeout: Duration, interval: Duration) -> bool {
        if timeout.is_zero() {
            return false;
        }
        let interval = interval.max(Duration::from_millis(1));
        let start = Instant::now();
        let mut polls = 0u32;

        loop {
            let elapsed = start.elapsed();
            if elapsed >= timeout {
                tracing::debug!(path, polls, waited_ms = elapsed.as_millis() as u64, "wait_for_element timed out");
                return false;
            }
            polls += 1;
            if self.surface.resolve(path).map_or(false, |c| c.is_visible()) {
                tracing::debug!(path, polls, waited_ms = elapsed.as_millis() as u64, "element appeared");
                return true;
            }
            let remaining = timeout - elapsed;
            tokio::time::sleep(interval.min(remaining)).await;
        }
    }
}

/// Negative or NaN seconds map to zero; values past `Duration::MAX` saturate.
pub fn seconds_to_duration(seconds: f64) -> Duration {
    if seconds.is_nan() || seconds <= 0.0 {
        return Duration::ZERO;
    }
    Duration::try_from_secs_f64(seconds).unwrap_or(Duration::MAX)
}

fn log_outcome(action: &str, path: &str, result: SentinelResult<()>) -> bool {
    match result {
        Ok(()) => true,
        Err(e) => {
            tracing::warn!(action, path, error = %e, "UI action failed");
            false
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ui::legacy::{SceneGraph, SceneObject};
    use crate::ui::toolkit::{ToolkitNode, ToolkitTree};

    #[test]
    fn click_on_empty_ui_is_false() {
        let interactor = UiInteractor::new(UiSurface::empty());
        assert!(!interactor.click("missing/path"));
        assert!(matches!(
            interactor.try_click("missing/path"),
            Err(SentinelError::ElementNotFound { .. })
        ));
    }

    #[test]
    fn falls_back_to_legacy_paradigm() {
        let mut tree = ToolkitTree::new();
        tree.add_panel("Menu");
        let mut scene = SceneGraph::new();
        let canvas = scene.add_canvas("HUD");
        scene.add_child(canvas, SceneObject::input_field("Chat", ""));

        let interactor = UiInteractor::new(UiSurface::from_trees(
            Some(tree.into_shared()),
            Some(scene.into_shared()),
        ));
        assert!(interactor.type_text("HUD/Chat", "gg"));
        assert!(!interactor.scroll("HUD/Chat", 10.0));
        assert!(!interactor.scroll("HUD/Chat", f32::NAN));
    }

    #[tokio::test(start_paused = true)]
    async fn zero_timeout_never_polls() {
        let mut tree = ToolkitTree::new();
        let panel = tree.add_panel("Menu");
        tree.add_child(panel, ToolkitNode::button("Play", "Play"));
        let interactor = UiInteractor::new(UiSurface::from_trees(Some(tree.into_shared()), None));

        assert!(!interactor.wait_for_element("Menu/Play", Duration::ZERO).await);
        assert!(interactor.wait_for_element("Menu/Play", Duration::from_millis(1)).await);
    }

    #[tokio::test(start_paused = true)]
    async fn element_appearing_mid_wait_is_found() {
        let tree = ToolkitTree::new().into_shared();
        let panel = tree.write().unwrap().add_panel("Loading");
        let interactor = UiInteractor::new(UiSurface::from_trees(Some(tree.clone()), None));

        let writer = tree.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(350)).await;
            writer
                .write()
                .unwrap()
                .add_child(panel, ToolkitNode::button("Continue", "Continue"));
        });

        let start = Instant::now();
        assert!(interactor.wait_for_element("Loading/Continue", Duration::from_secs(2)).await);
        let waited = start.elapsed();
        assert!(waited >= Duration::from_millis(350) && waited < Duration::from_millis(500));
    }

    #[tokio::test(start_paused = true)]
    async fn hidden_element_times_out() {
        let mut tree = ToolkitTree::new();
        let panel = tree.add_panel("Menu");
        tree.add_child(panel, ToolkitNode::button("Secret", "?").hidden());
        let interactor = UiInteractor::new(UiSurface::from_trees(Some(tree.into_shared()), None));

        let start = Instant::now();
        assert!(!interactor.wait_for_element("Menu/Secret", Duration::from_millis(300)).await);
        assert_eq!(start.elapsed(), Duration::from_millis(300));
    }

    #[tokio::test(start_paused = true)]
    async fn wait_seconds_clamps_negative() {
        let interactor = UiInteractor::new(UiSurface::empty());
        let start = Instant::now();
        interactor.wait_seconds(-3.0).await;
        assert_eq!(start.elapsed(), Duration::ZERO);
        interactor.wait_seconds(1.5).await;
        assert_eq!(start.elapsed(), Duration::from_millis(1500));
    }

    #[test]
    fn out_of_range_seconds_never_panic() {
        assert_eq!(seconds_to_duration(1e30), Duration::MAX);
        assert_eq!(seconds_to_duration(f64::INFINITY), Duration::MAX);
        assert_eq!(seconds_to_duration(f64::NAN), Duration::ZERO);
        assert_eq!(seconds_to_duration(-1.0), Duration::ZERO);
        assert_eq!(seconds_to_duration(0.25), Duration::from_millis(250));
    }
}
