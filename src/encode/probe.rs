use std::path::{Path, PathBuf};

use crate::foundation::core::Fps;
use crate::foundation::error::{SlidecastError, SlidecastResult};

/// Stream facts reported by `ffprobe` for an encoded video.
#[derive(Clone, Debug, PartialEq, serde::Serialize)]
pub struct VideoProbe {
    /// Probed file.
    pub path: PathBuf,
    /// Container duration in seconds.
    pub duration_secs: f64,
    /// Video stream frame rate (`r_frame_rate`).
    pub fps: Option<Fps>,
    /// Video stream frame count, when the container records it.
    pub frames: Option<u64>,
    /// Video width in pixels.
    pub width: u32,
    /// Video height in pixels.
    pub height: u32,
    /// Whether at least one audio stream is present.
    pub has_audio: bool,
}

#[derive(serde::Deserialize)]
struct ProbeStream {
    codec_type: Option<String>,
    width: Option<u32>,
    height: Option<u32>,
    r_frame_rate: Option<String>,
    nb_frames: Option<String>,
}

#[derive(serde::Deserialize)]
struct ProbeFormat {
    duration: Option<String>,
}

#[derive(serde::Deserialize)]
struct ProbeOut {
    #[serde(default)]
    streams: Vec<ProbeStream>,
    format: Option<ProbeFormat>,
}

/// Probe an encoded video through `ffprobe`.
pub fn probe_video(path: &Path) -> SlidecastResult<VideoProbe> {
    let out = std::process::Command::new("ffprobe")
        .args([
            "-v",
            "error",
            "-print_format",
            "json",
            "-show_streams",
            "-show_format",
        ])
        .arg(path)
        .output()
        .map_err(|e| SlidecastError::encode(format!("failed to run ffprobe: {e}")))?;
    if !out.status.success() {
        return Err(SlidecastError::encode(format!(
            "ffprobe failed for '{}': {}",
            path.display(),
            String::from_utf8_lossy(&out.stderr).trim()
        )));
    }
    parse_probe(path, &out.stdout)
}

pub(crate) fn parse_probe(path: &Path, json: &[u8]) -> SlidecastResult<VideoProbe> {
    let parsed: ProbeOut = serde_json::from_slice(json)
        .map_err(|e| SlidecastError::serde(format!("ffprobe json parse failed: {e}")))?;

    let video = parsed
        .streams
        .iter()
        .find(|s| s.codec_type.as_deref() == Some("video"))
        .ok_or_else(|| SlidecastError::encode(format!("no video stream in '{}'", path.display())))?;
    let width = video
        .width
        .ok_or_else(|| SlidecastError::encode("missing video width from ffprobe"))?;
    let height = video
        .height
        .ok_or_else(|| SlidecastError::encode("missing video height from ffprobe"))?;
    let duration_secs = parsed
        .format
        .as_ref()
        .and_then(|f| f.duration.as_deref())
        .and_then(|d| d.parse::<f64>().ok())
        .ok_or_else(|| SlidecastError::encode("missing container duration from ffprobe"))?;

    Ok(VideoProbe {
        path: path.to_path_buf(),
        duration_secs,
        // `0/0` is reported for streams without a fixed rate.
        fps: video.r_frame_rate.as_deref().and_then(|r| r.parse().ok()),
        frames: video.nb_frames.as_deref().and_then(|n| n.parse().ok()),
        width,
        height,
        has_audio: parsed
            .streams
            .iter()
            .any(|s| s.codec_type.as_deref() == Some("audio")),
    })
}

/// Return `true` when `ffprobe` can be invoked from `PATH`.
pub fn is_ffprobe_on_path() -> bool {
    std::process::Command::new("ffprobe")
        .arg("-version")
        .stdout(std::process::Stdio::null())
        .stderr(std::process::Stdio::null())
        .status()
        .map(|s| s.success())
        .unwrap_or(false)
}

#[cfg(test)]
#[path = "../../tests/unit/encode/probe.rs"]
mod tests;
