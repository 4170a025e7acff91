use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::time::Duration;

use tokio::io::{AsyncBufRead, AsyncBufReadExt as _, AsyncReadExt as _, BufReader, Lines};
use tokio::process::Command;
use tokio::time::Instant;

use crate::foundation::core::{FRAME_FILE_PATTERN, Fps};
use crate::foundation::error::{SlidecastError, SlidecastResult};

/// Progress silence after which a warning is logged.
const STALL_WARN_AFTER: Duration = Duration::from_secs(10);

/// Output codec and quality options.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct EncodeOpts {
    /// Video codec passed to `-c:v`.
    pub video_codec: String,
    /// Output pixel format.
    pub pix_fmt: String,
    /// Constant rate factor.
    pub crf: u8,
    /// Encoder speed preset.
    pub preset: String,
    /// Audio codec used when an audio track is muxed.
    pub audio_codec: String,
    /// Audio bitrate used when an audio track is muxed.
    pub audio_bitrate: String,
    /// Overwrite the output file if it already exists.
    pub overwrite: bool,
}

impl Default for EncodeOpts {
    fn default() -> Self {
        Self {
            video_codec: "libx264".to_string(),
            pix_fmt: "yuv420p".to_string(),
            crf: 18,
            preset: "medium".to_string(),
            audio_codec: "aac".to_string(),
            audio_bitrate: "192k".to_string(),
            overwrite: true,
        }
    }
}

/// One encode job.
#[derive(Clone, Debug)]
pub struct EncodeConfig {
    /// Directory holding `frame_000000.png`, `frame_000001.png`, ...
    pub frames_dir: PathBuf,
    /// Input and output frame rate.
    pub fps: Fps,
    /// Output frame ceiling. Extra frame files beyond it are ignored.
    pub total_frames: u64,
    /// Output video path.
    pub out_path: PathBuf,
    /// Optional audio track; the output stops at the shorter stream.
    pub audio: Option<PathBuf>,
    /// Codec options.
    pub opts: EncodeOpts,
}

/// Encoder lifecycle notifications.
///
/// Only `Completed` and `Failed` correspond to control flow; `Progress` is advisory.
#[derive(Clone, Debug, PartialEq)]
pub enum EncodeEvent {
    /// The encoder process was spawned.
    Started {
        /// Frames the output is bounded to.
        total_frames: u64,
    },
    /// Periodic progress report.
    Progress {
        /// Completion estimate in `[0, 100]`.
        percent: f64,
        /// Frames encoded so far, when reported.
        frame: Option<u64>,
    },
    /// The output file was written.
    Completed {
        /// Output path.
        path: PathBuf,
    },
    /// The encoder failed.
    Failed {
        /// Human-readable cause.
        message: String,
    },
}

/// A successfully encoded video.
#[derive(Clone, Debug, PartialEq, serde::Serialize)]
pub struct EncodedVideo {
    /// Output path.
    pub path: PathBuf,
    /// Frame rate of the output stream.
    pub fps: Fps,
    /// Frame ceiling the encoder ran with.
    pub total_frames: u64,
    /// Whether an audio track was muxed.
    pub has_audio: bool,
}

/// Full `ffmpeg` argument list for `cfg`.
pub fn build_ffmpeg_args(cfg: &EncodeConfig) -> Vec<String> {
    let fps = cfg.fps.ffmpeg_arg();
    let pattern = cfg.frames_dir.join(FRAME_FILE_PATTERN);

    let mut args: Vec<String> = vec![
        if cfg.opts.overwrite { "-y" } else { "-n" }.to_string(),
        "-hide_banner".into(),
        "-loglevel".into(),
        "error".into(),
        "-nostats".into(),
        "-progress".into(),
        "pipe:1".into(),
        "-framerate".into(),
        fps.clone(),
        "-start_number".into(),
        "0".into(),
        "-i".into(),
        pattern.to_string_lossy().into_owned(),
    ];
    if let Some(audio) = &cfg.audio {
        args.push("-i".into());
        args.push(audio.to_string_lossy().into_owned());
    }

    args.extend([
        "-frames:v".into(),
        cfg.total_frames.to_string(),
        "-c:v".into(),
        cfg.opts.video_codec.clone(),
        "-preset".into(),
        cfg.opts.preset.clone(),
        "-crf".into(),
        cfg.opts.crf.to_string(),
        "-pix_fmt".into(),
        cfg.opts.pix_fmt.clone(),
        "-r".into(),
        fps,
    ]);

    if cfg.audio.is_some() {
        args.extend([
            "-map".into(),
            "0:v:0".into(),
            "-map".into(),
            "1:a:0".into(),
            "-c:a".into(),
            cfg.opts.audio_codec.clone(),
            "-b:a".into(),
            cfg.opts.audio_bitrate.clone(),
            "-shortest".into(),
        ]);
    } else {
        args.push("-an".into());
    }

    args.extend(["-movflags".into(), "+faststart".into()]);
    args.push(cfg.out_path.to_string_lossy().into_owned());
    args
}

/// Key/value state accumulated from `-progress` output.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub(crate) struct ProgressState {
    pub(crate) frame: Option<u64>,
    pub(crate) out_time_secs: f64,
    pub(crate) complete: bool,
}

impl ProgressState {
    pub(crate) fn update(&mut self, key: &str, value: &str) {
        match key {
            "frame" => {
                if let Ok(n) = value.trim().parse::<u64>() {
                    self.frame = Some(n);
                }
            }
            // `out_time_ms` is microseconds too, despite the name.
            "out_time_us" | "out_time_ms" => {
                if let Ok(us) = value.trim().parse::<f64>() {
                    self.out_time_secs = us / 1_000_000.0;
                }
            }
            "progress" => self.complete = value.trim() == "end",
            _ => {}
        }
    }

    pub(crate) fn percent(&self, total_frames: u64, fps: Fps) -> f64 {
        if self.complete {
            return 100.0;
        }
        if total_frames == 0 {
            return 0.0;
        }
        let done = match self.frame {
            Some(f) => f as f64,
            None => self.out_time_secs * fps.as_f64(),
        };
        (done / total_frames as f64 * 100.0).clamp(0.0, 100.0)
    }
}

/// Warns when the encoded frame counter stops advancing.
#[derive(Debug)]
pub(crate) struct StallWatch {
    frame: u64,
    since: Instant,
    pub(crate) warnings: u32,
}

impl StallWatch {
    pub(crate) fn new() -> Self {
        Self {
            frame: 0,
            since: Instant::now(),
            warnings: 0,
        }
    }

    /// Record a progress block reporting `frame` encoded frames.
    pub(crate) fn observe(&mut self, frame: u64) {
        if frame > self.frame {
            self.frame = frame;
            self.since = Instant::now();
        } else if self.since.elapsed() >= STALL_WARN_AFTER {
            self.warn();
        }
    }

    fn warn(&mut self) {
        tracing::warn!(frame = self.frame, "no ffmpeg progress for 10s");
        self.warnings += 1;
        self.since = Instant::now();
    }
}

/// Next progress line, warning through `watch` for every stall window with no output at all.
pub(crate) async fn next_progress_line<R: AsyncBufRead + Unpin>(
    lines: &mut Lines<R>,
    watch: &mut StallWatch,
) -> std::io::Result<Option<String>> {
    loop {
        // `next_line` is cancel safe, so a timed-out read loses nothing.
        match tokio::time::timeout(STALL_WARN_AFTER, lines.next_line()).await {
            Ok(line) => return line,
            Err(_) => watch.warn(),
        }
    }
}

/// Run `ffmpeg` for `cfg`, reporting lifecycle events to `on_event`.
///
/// On failure the partial output file is left in place and nothing is retried.
#[tracing::instrument(
    skip_all,
    fields(out = %cfg.out_path.display(), total_frames = cfg.total_frames)
)]
pub async fn encode(
    cfg: &EncodeConfig,
    on_event: &mut (dyn FnMut(&EncodeEvent) + Send),
) -> SlidecastResult<EncodedVideo> {
    match run(cfg, on_event).await {
        Ok(video) => {
            on_event(&EncodeEvent::Completed {
                path: video.path.clone(),
            });
            Ok(video)
        }
        Err(e) => {
            on_event(&EncodeEvent::Failed {
                message: e.to_string(),
            });
            Err(e)
        }
    }
}

async fn run(
    cfg: &EncodeConfig,
    on_event: &mut (dyn FnMut(&EncodeEvent) + Send),
) -> SlidecastResult<EncodedVideo> {
    if cfg.total_frames == 0 {
        return Err(SlidecastError::validation("nothing to encode: zero frames"));
    }
    if let Some(audio) = &cfg.audio
        && !audio.is_file()
    {
        return Err(SlidecastError::validation(format!(
            "audio file '{}' does not exist",
            audio.display()
        )));
    }
    ensure_parent_dir(&cfg.out_path)?;
    if !cfg.opts.overwrite && cfg.out_path.exists() {
        return Err(SlidecastError::validation(format!(
            "output file '{}' already exists",
            cfg.out_path.display()
        )));
    }
    let on_path = tokio::task::spawn_blocking(is_ffmpeg_on_path)
        .await
        .unwrap_or(false);
    if !on_path {
        return Err(SlidecastError::encode(
            "ffmpeg is required for MP4 encoding, but was not found on PATH",
        ));
    }

    let args = build_ffmpeg_args(cfg);
    tracing::debug!(?args, "running ffmpeg");

    let mut child = Command::new("ffmpeg")
        .args(&args)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true)
        .spawn()
        .map_err(|e| {
            SlidecastError::encode(format!(
                "failed to spawn ffmpeg (is it installed and on PATH?): {e}"
            ))
        })?;

    let stdout = child
        .stdout
        .take()
        .ok_or_else(|| SlidecastError::encode("failed to open ffmpeg stdout (unexpected)"))?;
    let mut stderr = child
        .stderr
        .take()
        .ok_or_else(|| SlidecastError::encode("failed to open ffmpeg stderr (unexpected)"))?;
    // Drained concurrently so ffmpeg never blocks on a full stderr pipe.
    let stderr_task = tokio::spawn(async move {
        let mut out = String::new();
        match stderr.read_to_string(&mut out).await {
            Ok(_) => out,
            Err(e) => format!("<failed to read ffmpeg stderr: {e}>"),
        }
    });

    tracing::info!(pid = child.id(), "ffmpeg started");
    on_event(&EncodeEvent::Started {
        total_frames: cfg.total_frames,
    });

    let mut lines = BufReader::new(stdout).lines();
    let mut state = ProgressState::default();
    let mut watch = StallWatch::new();
    while let Some(line) = next_progress_line(&mut lines, &mut watch)
        .await
        .map_err(|e| SlidecastError::encode(format!("failed reading ffmpeg progress: {e}")))?
    {
        let Some((key, value)) = line.trim().split_once('=') else {
            continue;
        };
        state.update(key, value);
        if key != "progress" {
            continue;
        }

        watch.observe(state.frame.unwrap_or(0));
        on_event(&EncodeEvent::Progress {
            percent: state.percent(cfg.total_frames, cfg.fps),
            frame: state.frame,
        });
    }

    let status = child
        .wait()
        .await
        .map_err(|e| SlidecastError::encode(format!("failed to wait for ffmpeg to finish: {e}")))?;
    let stderr = stderr_task
        .await
        .unwrap_or_else(|_| "<ffmpeg stderr reader panicked>".to_string());

    if !status.success() {
        return Err(SlidecastError::encode(format!(
            "ffmpeg exited with status {}: {}",
            status,
            stderr.trim()
        )));
    }
    if !cfg.out_path.is_file() {
        return Err(SlidecastError::encode(format!(
            "ffmpeg reported success but '{}' is missing",
            cfg.out_path.display()
        )));
    }

    tracing::info!("encode finished");
    Ok(EncodedVideo {
        path: cfg.out_path.clone(),
        fps: cfg.fps,
        total_frames: cfg.total_frames,
        has_audio: cfg.audio.is_some(),
    })
}

/// Ensure the parent directory of `path` exists.
pub fn ensure_parent_dir(path: &Path) -> SlidecastResult<()> {
    if let Some(parent) = path.parent() {
        use anyhow::Context as _;
        std::fs::create_dir_all(parent)
            .with_context(|| format!("failed to create output directory '{}'", parent.display()))?;
    }
    Ok(())
}

/// Return `true` when `ffmpeg` can be invoked from `PATH`.
pub fn is_ffmpeg_on_path() -> bool {
    std::process::Command::new("ffmpeg")
        .arg("-version")
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .status()
        .map(|s| s.success())
        .unwrap_or(false)
}

#[cfg(test)]
#[path = "../../tests/unit/encode/ffmpeg.rs"]
mod tests;
