use std::path::{Path, PathBuf};
use std::time::Duration;

use chromiumoxide::Page;
use chromiumoxide::browser::{Browser, BrowserConfig};
use chromiumoxide::cdp::browser_protocol::emulation::SetDeviceMetricsOverrideParams;
use chromiumoxide::cdp::browser_protocol::page::{
    AddScriptToEvaluateOnNewDocumentParams, CaptureScreenshotFormat, EventLifecycleEvent,
};
use chromiumoxide::page::ScreenshotParams;
use futures::StreamExt as _;
use tokio::task::JoinHandle;

use crate::foundation::core::Canvas;
use crate::foundation::error::{SlidecastError, SlidecastResult};
use crate::surface::{ContentSource, Surface, SurfaceLauncher};

/// Options for launching Chromium.
#[derive(Clone, Debug)]
pub struct ChromeOpts {
    /// Browser executable; `None` lets `chromiumoxide` search the usual locations.
    pub executable: Option<PathBuf>,
    /// Run without a visible window.
    pub headless: bool,
    /// Keep the Chromium sandbox enabled. Containers usually need it off.
    pub sandbox: bool,
    /// Per-command timeout for the DevTools connection.
    pub request_timeout: Duration,
    /// Extra command-line switches.
    pub extra_args: Vec<String>,
}

impl Default for ChromeOpts {
    fn default() -> Self {
        Self {
            executable: None,
            headless: true,
            sandbox: false,
            request_timeout: Duration::from_secs(120),
            extra_args: vec!["--hide-scrollbars".to_string(), "--mute-audio".to_string()],
        }
    }
}

/// Launches one Chromium instance per job.
#[derive(Clone, Debug, Default)]
pub struct ChromeLauncher {
    opts: ChromeOpts,
}

impl ChromeLauncher {
    /// Create a launcher with the given options.
    pub fn new(opts: ChromeOpts) -> Self {
        Self { opts }
    }
}

#[async_trait::async_trait]
impl SurfaceLauncher for ChromeLauncher {
    type Surface = ChromeSurface;

    async fn launch(&self, canvas: Canvas) -> SlidecastResult<ChromeSurface> {
        let mut builder = BrowserConfig::builder()
            .window_size(canvas.width, canvas.height)
            .request_timeout(self.opts.request_timeout);
        if !self.opts.headless {
            builder = builder.with_head();
        }
        if !self.opts.sandbox {
            builder = builder.no_sandbox();
        }
        if let Some(exe) = &self.opts.executable {
            builder = builder.chrome_executable(exe);
        }
        for arg in &self.opts.extra_args {
            builder = builder.arg(arg.as_str());
        }
        let config = builder
            .build()
            .map_err(|e| SlidecastError::surface(format!("invalid browser config: {e}")))?;

        let (browser, mut handler) = Browser::launch(config)
            .await
            .map_err(|e| SlidecastError::surface(format!("failed to launch chromium: {e}")))?;

        let handler_task = tokio::spawn(async move {
            while let Some(event) = handler.next().await {
                if let Err(e) = event {
                    tracing::debug!(error = %e, "chromium handler error");
                }
            }
        });

        let page = match browser.new_page("about:blank").await {
            Ok(page) => page,
            Err(e) => {
                handler_task.abort();
                return Err(SlidecastError::surface(format!("failed to open page: {e}")));
            }
        };

        tracing::debug!(%canvas, "chromium launched");
        Ok(ChromeSurface {
            browser,
            page,
            handler_task: Some(handler_task),
        })
    }
}

/// One page of a dedicated Chromium instance.
pub struct ChromeSurface {
    browser: Browser,
    page: Page,
    handler_task: Option<JoinHandle<()>>,
}

/// Wait for `networkIdle` of the main frame's latest document.
///
/// Callers bound the wait; the page's own load event has already fired.
async fn wait_for_network_idle(
    page: &Page,
    mut lifecycle: impl futures::Stream<Item = std::sync::Arc<EventLifecycleEvent>> + Unpin,
) -> SlidecastResult<()> {
    let main = page
        .mainframe()
        .await
        .map_err(|e| cdp_err("resolve main frame", e))?;
    let mut loader = None;
    while let Some(event) = lifecycle.next().await {
        if main.as_ref().is_some_and(|frame| *frame != event.frame_id) {
            continue;
        }
        match event.name.as_str() {
            "init" => loader = Some(event.loader_id.clone()),
            "networkIdle" if loader.as_ref().is_none_or(|l| *l == event.loader_id) => {
                return Ok(());
            }
            _ => {}
        }
    }
    Err(SlidecastError::surface("page closed before the network went idle"))
}

fn cdp_err(what: &str, e: impl std::fmt::Display) -> SlidecastError {
    SlidecastError::surface(format!("{what}: {e}"))
}

#[async_trait::async_trait]
impl Surface for ChromeSurface {
    async fn set_viewport(&mut self, canvas: Canvas) -> SlidecastResult<()> {
        let params = SetDeviceMetricsOverrideParams::new(
            i64::from(canvas.width),
            i64::from(canvas.height),
            1.0,
            false,
        );
        self.page
            .execute(params)
            .await
            .map_err(|e| cdp_err("set viewport", e))?;
        Ok(())
    }

    async fn install_preload(&mut self, script: &str) -> SlidecastResult<()> {
        self.page
            .evaluate_on_new_document(AddScriptToEvaluateOnNewDocumentParams::new(script))
            .await
            .map_err(|e| cdp_err("install preload script", e))?;
        Ok(())
    }

    async fn load(&mut self, content: &ContentSource) -> SlidecastResult<()> {
        match content {
            ContentSource::Html(html) => {
                self.page
                    .set_content(html.as_str())
                    .await
                    .map_err(|e| cdp_err("set content", e))?;
            }
            ContentSource::Url(url) => {
                // Subscribed before navigating so the idle event cannot be missed.
                let lifecycle = self
                    .page
                    .event_listener::<EventLifecycleEvent>()
                    .await
                    .map_err(|e| cdp_err("listen for lifecycle events", e))?;
                self.page
                    .goto(url.as_str())
                    .await
                    .map_err(|e| cdp_err(&format!("navigate to '{url}'"), e))?;
                wait_for_network_idle(&self.page, lifecycle).await?;
                tracing::debug!(%url, "network idle");
            }
        }
        Ok(())
    }

    async fn evaluate(&mut self, script: &str) -> SlidecastResult<serde_json::Value> {
        let result = self
            .page
            .evaluate(script)
            .await
            .map_err(|e| cdp_err("evaluate", e))?;
        Ok(result.value().cloned().unwrap_or(serde_json::Value::Null))
    }

    async fn screenshot(&mut self, path: &Path) -> SlidecastResult<()> {
        let params = ScreenshotParams::builder()
            .format(CaptureScreenshotFormat::Png)
            .build();
        self.page
            .save_screenshot(params, path)
            .await
            .map_err(|e| cdp_err(&format!("screenshot '{}'", path.display()), e))?;
        Ok(())
    }

    async fn close(&mut self) -> SlidecastResult<()> {
        let Some(handler_task) = self.handler_task.take() else {
            return Ok(());
        };
        let closed = self.browser.close().await;
        if closed.is_ok() {
            let _ = self.browser.wait().await;
        } else {
            let _ = self.browser.kill().await;
        }
        handler_task.abort();
        closed.map_err(|e| cdp_err("close browser", e))?;
        tracing::debug!("chromium closed");
        Ok(())
    }
}
