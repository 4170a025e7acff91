//! Rendering surfaces and the in-surface control contract.
//!
//! A [`Surface`] is an opaque capability set (viewport, load, evaluate, screenshot, close). The
//! orchestrator never talks to a concrete engine directly; Chromium is one implementation and
//! [`RecordingSurface`](memory::RecordingSurface) is another.

use std::path::Path;

use crate::foundation::core::Canvas;
use crate::foundation::error::SlidecastResult;
use crate::surface::protocol::ControlCall;

/// Chromium-backed surface (`chromiumoxide`).
pub mod chrome;
/// Deterministic clock: timer/animation-callback suppression.
pub mod clock;
/// In-memory surface for tests and dry runs.
pub mod memory;
/// Segment selection protocol injected into the surface.
pub mod protocol;

/// What the surface should present.
#[derive(Clone, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(tag = "kind", content = "value", rename_all = "snake_case")]
pub enum ContentSource {
    /// Inline markup, loaded as the document body.
    Html(String),
    /// Address to navigate to.
    Url(String),
}

impl ContentSource {
    /// Short label used in logs and the job manifest.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Html(_) => "html",
            Self::Url(_) => "url",
        }
    }
}

/// Driving interface for one rendering surface (one page of one browser instance).
///
/// Calls on a surface are strictly sequential; a surface is owned by exactly one job.
#[async_trait::async_trait]
pub trait Surface: Send {
    /// Resize the capture viewport.
    async fn set_viewport(&mut self, canvas: Canvas) -> SlidecastResult<()>;

    /// Register a script that runs before any script of subsequently loaded content.
    async fn install_preload(&mut self, script: &str) -> SlidecastResult<()>;

    /// Load markup or navigate to an address and wait until it has loaded.
    async fn load(&mut self, content: &ContentSource) -> SlidecastResult<()>;

    /// Evaluate a script expression, awaiting a returned promise, and return its JSON value.
    ///
    /// `undefined` results come back as `Value::Null`.
    async fn evaluate(&mut self, script: &str) -> SlidecastResult<serde_json::Value>;

    /// Run a control-protocol call inside the surface.
    async fn control(&mut self, call: &ControlCall) -> SlidecastResult<serde_json::Value> {
        let script = call.to_script();
        self.evaluate(&script).await
    }

    /// Capture the visible viewport as a PNG at `path`.
    async fn screenshot(&mut self, path: &Path) -> SlidecastResult<()>;

    /// Tear the surface down. Must be safe to call more than once.
    async fn close(&mut self) -> SlidecastResult<()>;
}

/// Factory for surfaces (`launch()` + `newPage()` of the driving interface).
#[async_trait::async_trait]
pub trait SurfaceLauncher: Send + Sync {
    /// Surface type produced by this launcher.
    type Surface: Surface;

    /// Launch a fresh surface sized to `canvas`.
    async fn launch(&self, canvas: Canvas) -> SlidecastResult<Self::Surface>;
}
