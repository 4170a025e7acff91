use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::Context as _;
use clap::{Args, Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use slidecast::{
    CaptureOpts, ChromeLauncher, ChromeOpts, ContentSource, EncodeEvent, EncodeOpts, Fps,
    MissingSegmentPolicy, Preset, RecordingLauncher, RecordingSurface, RenderOpts, RenderRequest,
    ScratchRegistry, SegmentSelector, SuppressionPolicy, SurfaceLauncher,
};

#[derive(Parser, Debug)]
#[command(name = "slidecast", version, about = "Frame-accurate slide and web page videos")]
struct Cli {
    /// Directory holding one working directory per job.
    #[arg(long, global = true, env = "SLIDECAST_JOBS_DIR")]
    jobs_dir: Option<PathBuf>,

    /// Increase log verbosity (-v debug, -vv trace). `RUST_LOG` takes precedence.
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    verbose: u8,

    #[command(subcommand)]
    cmd: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Render markup or a URL into an MP4 (requires Chromium and `ffmpeg`).
    Render(RenderArgs),
    /// Print the frame plan for a duration list without rendering anything.
    Plan(PlanArgs),
    /// Show the status of one job.
    Status(StatusArgs),
    /// List every job with its status.
    List,
}

#[derive(Args, Debug)]
#[group(required = true, multiple = false)]
struct ContentArgs {
    /// HTML file to render.
    #[arg(long)]
    html: Option<PathBuf>,

    /// Address to render.
    #[arg(long)]
    url: Option<String>,
}

#[derive(Args, Debug)]
struct TimingArgs {
    /// Comma-separated per-segment durations in seconds, e.g. `3,5,2.5`.
    #[arg(long, allow_hyphen_values = true)]
    durations: String,

    /// Frame rate: `30`, `29.97` or `30000/1001`.
    #[arg(long, default_value = "30")]
    fps: Fps,
}

#[derive(Args, Debug)]
struct RenderArgs {
    #[command(flatten)]
    content: ContentArgs,

    #[command(flatten)]
    timing: TimingArgs,

    /// Resolution preset: youtube, instagram, tiktok or custom.
    #[arg(long, default_value = "youtube")]
    preset: Preset,

    /// Output width, overriding the preset.
    #[arg(long)]
    width: Option<u32>,

    /// Output height, overriding the preset.
    #[arg(long)]
    height: Option<u32>,

    /// Audio track to mux; the video stops at the shorter stream.
    #[arg(long)]
    audio: Option<PathBuf>,

    /// Copy the finished video here.
    #[arg(long)]
    out: Option<PathBuf>,

    /// Chromium executable.
    #[arg(long, env = "SLIDECAST_CHROME")]
    chrome: Option<PathBuf>,

    /// Show the browser window.
    #[arg(long, default_value_t = false)]
    headful: bool,

    /// Fall back to `.slide`, `section` and `*slide*` classes when no `data-slide` marker exists.
    #[arg(long, default_value_t = false)]
    legacy_selectors: bool,

    /// Fail the job when a segment cannot be selected instead of warning.
    #[arg(long, default_value_t = false)]
    strict_segments: bool,

    /// Wait after each segment selection, in milliseconds.
    #[arg(long, default_value_t = 800)]
    settle_ms: u64,

    /// Wait after loading, before the first capture, in milliseconds.
    #[arg(long, default_value_t = 1000)]
    stabilize_ms: u64,

    /// One-shot timers at or above this delay never fire during capture, in milliseconds.
    #[arg(long, default_value_t = 1000)]
    short_timer_ms: u64,

    /// Content load timeout in seconds.
    #[arg(long, default_value_t = 120)]
    load_timeout_secs: u64,

    /// x264 constant rate factor.
    #[arg(long, default_value_t = 18)]
    crf: u8,

    /// Capture solid-colour placeholder frames instead of launching Chromium.
    #[arg(long, default_value_t = false)]
    dry_run: bool,
}

#[derive(Args, Debug)]
struct PlanArgs {
    #[command(flatten)]
    timing: TimingArgs,

    /// Print the plan as JSON.
    #[arg(long, default_value_t = false)]
    json: bool,
}

#[derive(Args, Debug)]
struct StatusArgs {
    /// Job id as printed by `render` or `list`.
    id: String,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let jobs_dir = cli
        .jobs_dir
        .unwrap_or_else(|| std::env::temp_dir().join("slidecast-jobs"));
    match cli.cmd {
        Command::Render(args) => cmd_render(args, &jobs_dir).await,
        Command::Plan(args) => cmd_plan(args),
        Command::Status(args) => cmd_status(args, &jobs_dir),
        Command::List => cmd_list(&jobs_dir),
    }
}

fn init_tracing(verbose: u8) {
    let default = match verbose {
        0 => "info",
        1 => "debug",
        _ => "trace",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

async fn cmd_render(args: RenderArgs, jobs_dir: &Path) -> anyhow::Result<()> {
    let content = match (&args.content.html, &args.content.url) {
        (Some(path), _) => ContentSource::Html(
            std::fs::read_to_string(path)
                .with_context(|| format!("read html '{}'", path.display()))?,
        ),
        (None, Some(url)) => ContentSource::Url(url.clone()),
        (None, None) => anyhow::bail!("either --html or --url is required"),
    };

    let request = RenderRequest {
        content,
        durations: slidecast::parse_durations(&args.timing.durations)?,
        fps: args.timing.fps,
        canvas: args.preset.resolve(args.width, args.height),
        audio: args.audio.clone(),
        output: args.out.clone(),
    };
    let opts = RenderOpts {
        capture: CaptureOpts {
            stabilize: Duration::from_millis(args.stabilize_ms),
            transition_settle: Duration::from_millis(args.settle_ms),
            missing_segment: if args.strict_segments {
                MissingSegmentPolicy::Fail
            } else {
                MissingSegmentPolicy::Warn
            },
        },
        suppression: SuppressionPolicy {
            short_delay: Duration::from_millis(args.short_timer_ms),
        },
        selector: if args.legacy_selectors {
            SegmentSelector::Legacy
        } else {
            SegmentSelector::Marker
        },
        encode: EncodeOpts {
            crf: args.crf,
            ..EncodeOpts::default()
        },
        load_timeout: Duration::from_secs(args.load_timeout_secs),
    };

    if args.dry_run {
        let launcher = RecordingLauncher::new(RecordingSurface::new(request.durations.len()));
        run_render(&request, jobs_dir, &launcher, &opts).await
    } else {
        let launcher = ChromeLauncher::new(ChromeOpts {
            executable: args.chrome.clone(),
            headless: !args.headful,
            ..ChromeOpts::default()
        });
        run_render(&request, jobs_dir, &launcher, &opts).await
    }
}

async fn run_render<L: SurfaceLauncher>(
    request: &RenderRequest,
    jobs_dir: &Path,
    launcher: &L,
    opts: &RenderOpts,
) -> anyhow::Result<()> {
    let mut scratch = ScratchRegistry::new();
    let mut last_percent = -1i64;
    let mut on_event = |e: &EncodeEvent| match e {
        EncodeEvent::Started { total_frames } => {
            tracing::info!(total_frames, "encoding");
        }
        EncodeEvent::Progress { percent, .. } => {
            let step = (*percent / 10.0).floor() as i64;
            if step > last_percent {
                last_percent = step;
                tracing::info!("encode {:.0}%", percent);
            }
        }
        EncodeEvent::Completed { .. } | EncodeEvent::Failed { .. } => {}
    };

    let render =
        slidecast::render_to_video(request, jobs_dir, launcher, opts, &mut scratch, &mut on_event);
    let outcome = tokio::select! {
        res = render => Some(res),
        _ = tokio::signal::ctrl_c() => None,
    };
    let removed = scratch.cleanup_all();

    match outcome {
        Some(Ok(outcome)) => {
            println!("job {}", outcome.job_id);
            println!("video {}", outcome.output.display());
            println!(
                "frames {} at {} fps ({:.3}s)",
                outcome.plan.total_frames,
                outcome.plan.fps,
                outcome.plan.duration_secs()
            );
            if slidecast::is_ffprobe_on_path() {
                match slidecast::probe_video(&outcome.output) {
                    Ok(p) => println!(
                        "probe {}x{} {:.3}s audio={}",
                        p.width, p.height, p.duration_secs, p.has_audio
                    ),
                    Err(e) => tracing::warn!(error = %e, "could not probe output"),
                }
            }
            Ok(())
        }
        Some(Err(e)) => Err(anyhow::Error::new(e).context("render failed")),
        None => {
            tracing::warn!(removed, "interrupted, scratch directories cleaned up");
            std::process::exit(130);
        }
    }
}

fn cmd_plan(args: PlanArgs) -> anyhow::Result<()> {
    let durations = slidecast::parse_durations(&args.timing.durations)?;
    let plan = slidecast::plan(&durations, args.timing.fps)?;

    if args.json {
        println!("{}", serde_json::to_string_pretty(&plan)?);
        return Ok(());
    }
    println!("segment  start    end      frames   seconds");
    for s in &plan.segments {
        let end = s
            .end_frame()
            .map(|f| f.0.to_string())
            .unwrap_or_else(|| "-".to_string());
        println!(
            "{:<8} {:<8} {:<8} {:<8} {}",
            s.segment,
            s.start_frame().0,
            end,
            s.frame_count(),
            s.duration_secs
        );
    }
    println!(
        "total {} frames at {} fps ({:.3}s)",
        plan.total_frames,
        plan.fps,
        plan.duration_secs()
    );
    Ok(())
}

fn cmd_status(args: StatusArgs, jobs_dir: &Path) -> anyhow::Result<()> {
    let status = slidecast::JobStatus::probe(jobs_dir, &args.id)?;
    println!("{}: {status}", args.id);
    Ok(())
}

fn cmd_list(jobs_dir: &Path) -> anyhow::Result<()> {
    let jobs = slidecast::list_jobs(jobs_dir)?;
    if jobs.is_empty() {
        println!("no jobs in {}", jobs_dir.display());
    }
    for (id, status) in jobs {
        println!("{id}  {status}");
    }
    Ok(())
}
