use std::path::Path;

use image::{Rgba, RgbaImage};

use crate::config::CaptureMode;
use crate::errors::{SentinelError, SentinelResult};

const PLACEHOLDER_WIDTH: u32 = 320;
const PLACEHOLDER_HEIGHT: u32 = 180;

/// Source of screen pixels for report screenshots.
pub trait ScreenCapture: Send + Sync {
    fn name(&self) -> &'static str;

    /// `Ok(None)` when this context has no pixels to offer.
    fn capture(&self) -> SentinelResult<Option<RgbaImage>>;
}

/// Primary monitor via `xcap`.
pub struct LiveCapture;

impl ScreenCapture for LiveCapture {
    fn name(&self) -> &'static str {
        "live"
    }

    fn capture(&self) -> SentinelResult<Option<RgbaImage>> {
        let monitors = xcap::Monitor::all().map_err(|e| SentinelError::Screenshot(e.to_string()))?;
        let monitor = monitors
            .into_iter()
            .find(|m| m.is_primary())
            .ok_or_else(|| SentinelError::Screenshot("no primary monitor".into()))?;
        let image = monitor
            .capture_image()
            .map_err(|e| SentinelError::Screenshot(e.to_string()))?;
        Ok(Some(image))
    }
}

pub struct HeadlessCapture;

impl ScreenCapture for HeadlessCapture {
    fn name(&self) -> &'static str {
        "headless"
    }

    fn capture(&self) -> SentinelResult<Option<RgbaImage>> {
        Ok(None)
    }
}

pub fn for_mode(mode: CaptureMode) -> Box<dyn ScreenCapture> {
    match mode {
        CaptureMode::Live => Box::new(LiveCapture),
        CaptureMode::Headless => Box::new(HeadlessCapture),
    }
}

/// Grey frame with a darker border, so the report still links a real image.
pub fn placeholder() -> RgbaImage {
    RgbaImage::from_fn(PLACEHOLDER_WIDTH, PLACEHOLDER_HEIGHT, |x, y| {
        let border = x < 4 || y < 4 || x >= PLACEHOLDER_WIDTH - 4 || y >= PLACEHOLDER_HEIGHT - 4;
        if border {
            Rgba([96, 96, 96, 255])
        } else {
            Rgba([200, 200, 200, 255])
        }
    })
}

/// Captures through `source` and writes a PNG to `path`, substituting the
/// placeholder when no pixels are available. Only IO failure is an error.
pub fn write_screenshot(source: &dyn ScreenCapture, path: &Path) -> SentinelResult<()> {
    let image = match source.capture() {
        Ok(Some(image)) => image,
        Ok(None) => {
            tracing::warn!(capture = source.name(), "pixel capture unavailable, writing placeholder");
            placeholder()
        }
        Err(e) => {
            tracing::warn!(capture = source.name(), error = %e, "screen capture failed, writing placeholder");
            placeholder()
        }
    };
    image
        .save(path)
        .map_err(|e| SentinelError::Screenshot(format!("{}: {e}", path.display())))
}
