use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use crate::foundation::core::Canvas;
use crate::foundation::error::{SlidecastError, SlidecastResult};
use crate::surface::clock::ClockStats;
use crate::surface::protocol::ControlCall;
use crate::surface::{ContentSource, Surface, SurfaceLauncher};

/// One observed interaction with a [`RecordingSurface`].
#[derive(Clone, Debug, PartialEq)]
pub enum SurfaceCall {
    /// `set_viewport`
    Viewport(Canvas),
    /// `install_preload`
    Preload,
    /// `load`
    Load(ContentSource),
    /// `evaluate` with a free-form script.
    Evaluate(String),
    /// A control-protocol call.
    Control(ControlCall),
    /// `screenshot`, with the segment visible at the time.
    Screenshot {
        /// Written file.
        path: PathBuf,
        /// Visible segment, `None` before any segment was shown.
        segment: Option<usize>,
    },
    /// `close`
    Close,
}

/// In-memory surface for tests and dry runs.
///
/// It simulates a document with a fixed number of segments, answers the control protocol the way
/// the injected script does, and writes one solid-colour PNG per screenshot whose colour encodes
/// the visible segment (see [`segment_color`]).
#[derive(Clone, Debug)]
pub struct RecordingSurface {
    canvas: Canvas,
    segments: usize,
    protocol: bool,
    installed: bool,
    current: Option<usize>,
    fail_screenshot_at: Option<usize>,
    screenshots: usize,
    closed: bool,
    calls: Arc<Mutex<Vec<SurfaceCall>>>,
}

impl RecordingSurface {
    /// Surface presenting `segments` segments.
    pub fn new(segments: usize) -> Self {
        Self {
            canvas: Canvas {
                width: 16,
                height: 16,
            },
            segments,
            protocol: true,
            installed: false,
            current: None,
            fail_screenshot_at: None,
            screenshots: 0,
            closed: false,
            calls: Arc::default(),
        }
    }

    /// Simulate content where the control object never becomes available.
    pub fn without_protocol(mut self) -> Self {
        self.protocol = false;
        self
    }

    /// Fail the `n`th screenshot (0-based).
    pub fn fail_screenshot_at(mut self, n: usize) -> Self {
        self.fail_screenshot_at = Some(n);
        self
    }

    /// Every call observed so far, in order.
    ///
    /// Clones share one log, so a template handed to [`RecordingLauncher`] sees the calls made on
    /// every surface launched from it.
    pub fn calls(&self) -> Vec<SurfaceCall> {
        self.log().clone()
    }

    /// Segment indices passed to `setSlide`, in order.
    pub fn selections(&self) -> Vec<usize> {
        self.log()
            .iter()
            .filter_map(|c| match c {
                SurfaceCall::Control(ControlCall::SetSlide(i)) => Some(*i),
                _ => None,
            })
            .collect()
    }

    /// Number of screenshots written.
    pub fn screenshot_count(&self) -> usize {
        self.screenshots
    }

    /// Return `true` once `close` has been called.
    pub fn is_closed(&self) -> bool {
        self.closed
    }

    fn log(&self) -> std::sync::MutexGuard<'_, Vec<SurfaceCall>> {
        self.calls.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn record(&self, call: SurfaceCall) {
        self.log().push(call);
    }

    fn ensure_open(&self) -> SlidecastResult<()> {
        if self.closed {
            return Err(SlidecastError::surface("surface is closed"));
        }
        Ok(())
    }

    fn answer(&mut self, call: &ControlCall) -> serde_json::Value {
        use serde_json::json;

        match *call {
            ControlCall::Install(_) => {
                if self.protocol && !self.installed {
                    self.installed = true;
                    self.current = (self.segments > 0).then_some(0);
                }
                serde_json::Value::Null
            }
            ControlCall::Suppress(_) => {
                serde_json::to_value(ClockStats::default()).unwrap_or(serde_json::Value::Null)
            }
            _ if !self.installed => serde_json::Value::Null,
            ControlCall::InitSlides => {
                self.current = (self.segments > 0).then_some(0);
                json!(self.segments)
            }
            ControlCall::SetSlide(index) => {
                let found = index < self.segments;
                if found {
                    self.current = Some(index);
                }
                json!({
                    "found": found,
                    "total": self.segments,
                    "current": self.current.unwrap_or(0),
                })
            }
            ControlCall::TotalSlides => json!(self.segments),
            ControlCall::CurrentSlide => json!(self.current.unwrap_or(0)),
        }
    }
}

/// Colour written by [`RecordingSurface`] for a visible segment (`None`: nothing shown).
pub fn segment_color(segment: Option<usize>) -> [u8; 3] {
    match segment {
        None => [0, 0, 0],
        Some(i) => {
            let i = i as u32;
            [
                (40 + (i * 50) % 200) as u8,
                (90 + (i * 80) % 160) as u8,
                (10 + (i * 110) % 240) as u8,
            ]
        }
    }
}

#[async_trait::async_trait]
impl Surface for RecordingSurface {
    async fn set_viewport(&mut self, canvas: Canvas) -> SlidecastResult<()> {
        self.ensure_open()?;
        self.canvas = canvas;
        self.record(SurfaceCall::Viewport(canvas));
        Ok(())
    }

    async fn install_preload(&mut self, _script: &str) -> SlidecastResult<()> {
        self.ensure_open()?;
        self.record(SurfaceCall::Preload);
        Ok(())
    }

    async fn load(&mut self, content: &ContentSource) -> SlidecastResult<()> {
        self.ensure_open()?;
        self.record(SurfaceCall::Load(content.clone()));
        Ok(())
    }

    async fn evaluate(&mut self, script: &str) -> SlidecastResult<serde_json::Value> {
        self.ensure_open()?;
        self.record(SurfaceCall::Evaluate(script.to_string()));
        Ok(serde_json::Value::Null)
    }

    async fn control(&mut self, call: &ControlCall) -> SlidecastResult<serde_json::Value> {
        self.ensure_open()?;
        self.record(SurfaceCall::Control(*call));
        Ok(self.answer(call))
    }

    async fn screenshot(&mut self, path: &Path) -> SlidecastResult<()> {
        self.ensure_open()?;
        let n = self.screenshots;
        if self.fail_screenshot_at == Some(n) {
            return Err(SlidecastError::surface(format!(
                "simulated screenshot failure #{n}"
            )));
        }
        let img = image::RgbImage::from_pixel(
            self.canvas.width,
            self.canvas.height,
            image::Rgb(segment_color(self.current)),
        );
        img.save_with_format(path, image::ImageFormat::Png)
            .map_err(|e| SlidecastError::surface(format!("write '{}': {e}", path.display())))?;
        self.screenshots += 1;
        self.record(SurfaceCall::Screenshot {
            path: path.to_path_buf(),
            segment: self.current,
        });
        Ok(())
    }

    async fn close(&mut self) -> SlidecastResult<()> {
        if !self.closed {
            self.closed = true;
            self.record(SurfaceCall::Close);
        }
        Ok(())
    }
}

/// Launcher handing out clones of a template [`RecordingSurface`].
#[derive(Clone, Debug)]
pub struct RecordingLauncher {
    template: RecordingSurface,
}

impl RecordingLauncher {
    /// Launcher producing copies of `template`.
    pub fn new(template: RecordingSurface) -> Self {
        Self { template }
    }
}

#[async_trait::async_trait]
impl SurfaceLauncher for RecordingLauncher {
    type Surface = RecordingSurface;

    async fn launch(&self, canvas: Canvas) -> SlidecastResult<RecordingSurface> {
        let mut surface = self.template.clone();
        surface.canvas = canvas;
        Ok(surface)
    }
}
