use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

use crate::foundation::core::{Canvas, Fps, MAX_FRAME_INDEX};
use crate::foundation::error::{SlidecastError, SlidecastResult};
use crate::surface::ContentSource;
use crate::timeline::plan::{TimelinePlan, plan};

/// Ceiling on the sum of all segment durations, in seconds (inclusive).
pub const MAX_TOTAL_DURATION_SECS: f64 = 300.0;

/// Named output resolutions.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Preset {
    /// 1920x1080 landscape.
    #[default]
    Youtube,
    /// 1080x1080 square.
    Instagram,
    /// 1080x1920 portrait.
    Tiktok,
    /// 1920x1080, meant to be overridden by explicit dimensions.
    Custom,
}

impl Preset {
    /// Every preset, in display order.
    pub const ALL: [Preset; 4] = [Self::Youtube, Self::Instagram, Self::Tiktok, Self::Custom];

    /// Canvas for this preset.
    pub fn canvas(self) -> Canvas {
        let (width, height) = match self {
            Self::Youtube | Self::Custom => (1920, 1080),
            Self::Instagram => (1080, 1080),
            Self::Tiktok => (1080, 1920),
        };
        Canvas { width, height }
    }

    /// Preset canvas with optional per-axis overrides.
    pub fn resolve(self, width: Option<u32>, height: Option<u32>) -> Canvas {
        let base = self.canvas();
        Canvas {
            width: width.unwrap_or(base.width),
            height: height.unwrap_or(base.height),
        }
    }

    fn name(self) -> &'static str {
        match self {
            Self::Youtube => "youtube",
            Self::Instagram => "instagram",
            Self::Tiktok => "tiktok",
            Self::Custom => "custom",
        }
    }
}

impl fmt::Display for Preset {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Preset {
    type Err = SlidecastError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        Self::ALL
            .into_iter()
            .find(|p| p.name().eq_ignore_ascii_case(s))
            .ok_or_else(|| {
                SlidecastError::validation(format!(
                    "unknown preset '{s}' (expected youtube, instagram, tiktok or custom)"
                ))
            })
    }
}

/// Everything needed to render one video.
#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct RenderRequest {
    /// Markup or address to present.
    pub content: ContentSource,
    /// Per-segment durations in seconds, in segment order.
    pub durations: Vec<f64>,
    /// Capture and output frame rate.
    pub fps: Fps,
    /// Viewport and output resolution.
    pub canvas: Canvas,
    /// Optional audio track muxed into the output.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub audio: Option<PathBuf>,
    /// Optional location the final video is copied to.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub output: Option<PathBuf>,
}

impl RenderRequest {
    /// Check every request bound and return the frame plan.
    ///
    /// Nothing is created on disk or launched; callers run this before allocating any resource.
    pub fn validate(&self) -> SlidecastResult<TimelinePlan> {
        match &self.content {
            ContentSource::Html(html) if html.trim().is_empty() => {
                return Err(SlidecastError::validation("html content is empty"));
            }
            ContentSource::Url(url) if url.trim().is_empty() => {
                return Err(SlidecastError::validation("url is empty"));
            }
            _ => {}
        }

        if self.durations.is_empty() {
            return Err(SlidecastError::validation(
                "at least one segment duration is required",
            ));
        }
        for (i, &d) in self.durations.iter().enumerate() {
            if !d.is_finite() || d <= 0.0 {
                return Err(SlidecastError::validation(format!(
                    "segment {i} duration must be a positive number of seconds (got {d})"
                )));
            }
        }
        // Whole microseconds, so sums like 1000 x 0.3 land exactly on the ceiling.
        let total_micros: u64 = self
            .durations
            .iter()
            .map(|d| (d * 1e6).round() as u64)
            .sum();
        let total = total_micros as f64 / 1e6;
        if total_micros > (MAX_TOTAL_DURATION_SECS * 1e6) as u64 {
            return Err(SlidecastError::validation(format!(
                "total duration {total}s exceeds the {MAX_TOTAL_DURATION_SECS}s limit"
            )));
        }

        if self.fps.num == 0 || self.fps.den == 0 {
            return Err(SlidecastError::validation("fps must be positive"));
        }
        self.canvas.validate()?;

        if let Some(audio) = &self.audio
            && !audio.is_file()
        {
            return Err(SlidecastError::validation(format!(
                "audio file '{}' does not exist",
                audio.display()
            )));
        }

        let plan = plan(&self.durations, self.fps)?;
        if plan.total_frames == 0 {
            return Err(SlidecastError::validation(format!(
                "durations total {total}s, which is less than one frame at {} fps",
                self.fps
            )));
        }
        if plan.total_frames > MAX_FRAME_INDEX + 1 {
            return Err(SlidecastError::validation(format!(
                "{} frames exceed the per-job limit of {}",
                plan.total_frames,
                MAX_FRAME_INDEX + 1
            )));
        }
        Ok(plan)
    }
}

/// Parse a comma-separated duration list such as `"2, 3.5,1"`.
pub fn parse_durations(s: &str) -> SlidecastResult<Vec<f64>> {
    s.split(',')
        .map(str::trim)
        .filter(|p| !p.is_empty())
        .map(|p| {
            p.parse::<f64>()
                .map_err(|_| SlidecastError::validation(format!("invalid duration '{p}'")))
        })
        .collect()
}

#[cfg(test)]
#[path = "../../tests/unit/job/request.rs"]
mod tests;
