use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::Context as _;

use crate::capture::frames::{CaptureOpts, CaptureStats, capture_frames};
use crate::encode::ffmpeg::{EncodeConfig, EncodeEvent, EncodeOpts, EncodedVideo, encode};
use crate::foundation::error::{SlidecastError, SlidecastResult};
use crate::job::request::RenderRequest;
use crate::job::scratch::ScratchRegistry;
use crate::job::workspace::JobWorkspace;
use crate::surface::clock::{self, ClockStats, SuppressionPolicy};
use crate::surface::protocol::{self, SegmentSelector};
use crate::surface::{ContentSource, Surface, SurfaceLauncher};
use crate::timeline::plan::TimelinePlan;

/// Options for one end-to-end render.
#[derive(Clone, Debug)]
pub struct RenderOpts {
    /// Capture loop timing and missing-segment policy.
    pub capture: CaptureOpts,
    /// Timer suppression threshold.
    pub suppression: SuppressionPolicy,
    /// Segment discovery contract.
    pub selector: SegmentSelector,
    /// Encoder codec options.
    pub encode: EncodeOpts,
    /// Upper bound on loading the content.
    pub load_timeout: Duration,
}

impl Default for RenderOpts {
    fn default() -> Self {
        Self {
            capture: CaptureOpts::default(),
            suppression: SuppressionPolicy::default(),
            selector: SegmentSelector::default(),
            encode: EncodeOpts::default(),
            load_timeout: Duration::from_secs(120),
        }
    }
}

/// Result of a successful render.
#[derive(Clone, Debug, serde::Serialize)]
pub struct RenderOutcome {
    /// Job id.
    pub job_id: String,
    /// Job working directory.
    pub job_dir: PathBuf,
    /// Frame plan the video was captured with.
    pub plan: TimelinePlan,
    /// In-surface clock counters after load.
    pub clock: ClockStats,
    /// Capture loop counters.
    pub capture: CaptureStats,
    /// Encoded video inside the job directory.
    pub video: EncodedVideo,
    /// Where the caller should look for the video: the requested output path when one was given,
    /// otherwise the job's own copy.
    pub output: PathBuf,
}

/// Render `request` into a video under a fresh job directory in `jobs_root`.
///
/// The request is validated before anything is created. The surface is always closed once
/// capture ends. The frames directory is tracked in `scratch` while in use, released after a
/// successful encode and retained for inspection on failure, in which case the job directory also
/// gets a failure marker.
#[tracing::instrument(
    skip_all,
    fields(
        content = request.content.kind(),
        segments = request.durations.len(),
        job = tracing::field::Empty
    )
)]
pub async fn render_to_video<L: SurfaceLauncher>(
    request: &RenderRequest,
    jobs_root: &Path,
    launcher: &L,
    opts: &RenderOpts,
    scratch: &mut ScratchRegistry,
    on_event: &mut (dyn FnMut(&EncodeEvent) + Send),
) -> SlidecastResult<RenderOutcome> {
    let plan = request.validate()?;
    let ws = JobWorkspace::create(jobs_root, request, plan.total_frames)?;
    tracing::Span::current().record("job", ws.id());
    tracing::info!(
        job = ws.id(),
        total_frames = plan.total_frames,
        fps = %plan.fps,
        canvas = %request.canvas,
        "job started"
    );

    let frames_dir = ws.frames_dir();
    scratch.track(&frames_dir);

    match run_job(request, &plan, &ws, launcher, opts, on_event).await {
        Ok((clock, capture, video)) => {
            scratch.release(&frames_dir);
            let output = match &request.output {
                Some(dest) => match deliver(&video.path, dest).await {
                    Ok(()) => dest.clone(),
                    Err(e) => {
                        ws.mark_failed(&e.to_string());
                        return Err(e);
                    }
                },
                None => video.path.clone(),
            };
            tracing::info!(job = ws.id(), output = %output.display(), "job completed");
            Ok(RenderOutcome {
                job_id: ws.id().to_string(),
                job_dir: ws.dir().to_path_buf(),
                plan,
                clock,
                capture,
                video,
                output,
            })
        }
        Err(e) => {
            tracing::error!(job = ws.id(), error = %e, "job failed");
            ws.mark_failed(&e.to_string());
            scratch.retain(&frames_dir);
            Err(e)
        }
    }
}

async fn run_job<L: SurfaceLauncher>(
    request: &RenderRequest,
    plan: &TimelinePlan,
    ws: &JobWorkspace,
    launcher: &L,
    opts: &RenderOpts,
    on_event: &mut (dyn FnMut(&EncodeEvent) + Send),
) -> SlidecastResult<(ClockStats, CaptureStats, EncodedVideo)> {
    let frames_dir = ws.frames_dir();

    let mut surface = launcher.launch(request.canvas).await?;
    let captured = drive_surface(&mut surface, request, plan, &frames_dir, opts).await;
    if let Err(e) = surface.close().await {
        tracing::warn!(error = %e, "failed to close surface");
    }
    let (clock, capture) = captured?;

    let cfg = EncodeConfig {
        frames_dir,
        fps: plan.fps,
        total_frames: plan.total_frames,
        out_path: ws.output_path(),
        audio: request.audio.clone(),
        opts: opts.encode.clone(),
    };
    let video = encode(&cfg, on_event).await?;
    Ok((clock, capture, video))
}

async fn drive_surface<S: Surface + ?Sized>(
    surface: &mut S,
    request: &RenderRequest,
    plan: &TimelinePlan,
    frames_dir: &Path,
    opts: &RenderOpts,
) -> SlidecastResult<(ClockStats, CaptureStats)> {
    surface.set_viewport(request.canvas).await?;

    let preload = clock::suppressor_script(opts.suppression);
    let control = protocol::control_script(opts.selector);
    let content = match &request.content {
        ContentSource::Html(html) => ContentSource::Html(protocol::inject_control(
            &protocol::inject_preload(html, &preload),
            &control,
        )),
        ContentSource::Url(url) => {
            surface.install_preload(&preload).await?;
            surface.install_preload(&control).await?;
            ContentSource::Url(url.clone())
        }
    };

    tokio::time::timeout(opts.load_timeout, surface.load(&content))
        .await
        .map_err(|_| {
            SlidecastError::surface(format!(
                "timed out loading {} content after {:?}",
                content.kind(),
                opts.load_timeout
            ))
        })??;
    tracing::debug!(kind = content.kind(), "content loaded");

    // Both scripts are idempotent; re-running them covers pages that replaced the preload.
    protocol::install(surface, opts.selector).await?;
    let clock = clock::suppress(surface, opts.suppression).await?;
    tracing::info!(
        allowed_timeouts = clock.allowed_timeouts,
        suppressed_timeouts = clock.suppressed_timeouts,
        suppressed_intervals = clock.suppressed_intervals,
        suppressed_frames = clock.suppressed_frames,
        paused_media = clock.paused_media,
        "dynamic content suppressed"
    );

    let capture = capture_frames(surface, plan, frames_dir, &opts.capture).await?;
    Ok((clock, capture))
}

async fn deliver(video: &Path, dest: &Path) -> SlidecastResult<()> {
    crate::encode::ffmpeg::ensure_parent_dir(dest)?;
    tokio::fs::copy(video, dest)
        .await
        .with_context(|| format!("failed to copy video to '{}'", dest.display()))?;
    Ok(())
}
