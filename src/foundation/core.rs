use std::{fmt, str::FromStr};

use crate::foundation::error::{SlidecastError, SlidecastResult};

/// Absolute 0-based frame index in the output timeline.
#[derive(
    Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, serde::Serialize, serde::Deserialize,
)]
pub struct FrameIndex(pub u64);

impl FrameIndex {
    /// File name used for this frame inside a frames directory.
    ///
    /// Six digits of zero padding keep lexical order equal to numeric order up to 999,999 frames.
    pub fn file_name(self) -> String {
        format!("frame_{:06}.png", self.0)
    }
}

/// `ffmpeg` image-sequence pattern matching [`FrameIndex::file_name`].
pub const FRAME_FILE_PATTERN: &str = "frame_%06d.png";

/// Largest frame index [`FrameIndex::file_name`] can express without widening the name.
pub const MAX_FRAME_INDEX: u64 = 999_999;

/// Half-open frame range `[start, end)` in timeline space.
#[derive(Clone, Copy, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct FrameRange {
    /// Inclusive range start.
    pub start: FrameIndex,
    /// Exclusive range end.
    pub end: FrameIndex, // exclusive
}

impl FrameRange {
    /// Create a validated range with `start <= end`.
    pub fn new(start: FrameIndex, end: FrameIndex) -> SlidecastResult<Self> {
        if start.0 > end.0 {
            return Err(SlidecastError::validation("FrameRange start must be <= end"));
        }
        Ok(Self { start, end })
    }

    /// Number of frames contained in the range.
    pub fn len_frames(self) -> u64 {
        self.end.0.saturating_sub(self.start.0)
    }

    /// Return `true` when the range has no frames.
    pub fn is_empty(self) -> bool {
        self.start.0 == self.end.0
    }

    /// Return `true` when `f` is inside `[start, end)`.
    pub fn contains(self, f: FrameIndex) -> bool {
        self.start.0 <= f.0 && f.0 < self.end.0
    }

    /// Last frame of the range (inclusive end), or `None` for an empty range.
    pub fn last(self) -> Option<FrameIndex> {
        if self.is_empty() {
            None
        } else {
            Some(FrameIndex(self.end.0 - 1))
        }
    }

    /// Iterate every frame index in the range in increasing order.
    pub fn iter(self) -> impl Iterator<Item = FrameIndex> {
        (self.start.0..self.end.0).map(FrameIndex)
    }
}

/// Frames-per-second represented as a rational `num/den`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct Fps {
    /// Numerator (frames).
    pub num: u32,
    /// Denominator (seconds), must be non-zero.
    pub den: u32, // must be > 0
}

impl Fps {
    /// Create a validated FPS value, reduced to lowest terms.
    pub fn new(num: u32, den: u32) -> SlidecastResult<Self> {
        if den == 0 {
            return Err(SlidecastError::validation("Fps den must be > 0"));
        }
        if num == 0 {
            return Err(SlidecastError::validation("Fps num must be > 0"));
        }
        let g = gcd(u64::from(num), u64::from(den)) as u32;
        Ok(Self {
            num: num / g,
            den: den / g,
        })
    }

    /// Convert to floating-point FPS.
    pub fn as_f64(self) -> f64 {
        f64::from(self.num) / f64::from(self.den)
    }

    /// Duration of one frame in seconds.
    pub fn frame_duration_secs(self) -> f64 {
        f64::from(self.den) / f64::from(self.num)
    }

    /// Convert frame count to seconds.
    pub fn frames_to_secs(self, frames: u64) -> f64 {
        (frames as f64) * self.frame_duration_secs()
    }

    /// Rate in the `num/den` form accepted by `ffmpeg -framerate` and `-r`.
    pub fn ffmpeg_arg(self) -> String {
        format!("{}/{}", self.num, self.den)
    }
}

impl fmt::Display for Fps {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.den == 1 {
            write!(f, "{}", self.num)
        } else {
            write!(f, "{}/{}", self.num, self.den)
        }
    }
}

impl FromStr for Fps {
    type Err = SlidecastError;

    /// Accepts `"30"`, `"30000/1001"` and decimals such as `"2.5"`.
    ///
    /// Decimals are converted exactly (`2.5` becomes `5/2`) so the frame planner never sees a
    /// binary floating-point approximation of the caller's rate.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        let bad = || SlidecastError::validation(format!("invalid fps '{s}'"));

        if let Some((n, d)) = s.split_once('/') {
            let num = n.trim().parse::<u32>().map_err(|_| bad())?;
            let den = d.trim().parse::<u32>().map_err(|_| bad())?;
            return Self::new(num, den);
        }

        let (int_part, frac_part) = s.split_once('.').unwrap_or((s, ""));
        if int_part.is_empty() && frac_part.is_empty() {
            return Err(bad());
        }
        if !int_part.chars().all(|c| c.is_ascii_digit())
            || !frac_part.chars().all(|c| c.is_ascii_digit())
        {
            return Err(bad());
        }
        let frac_part = frac_part.trim_end_matches('0');
        if frac_part.len() > 6 {
            return Err(SlidecastError::validation(format!(
                "fps '{s}' has more than 6 decimal places"
            )));
        }

        let den = 10u64.pow(frac_part.len() as u32);
        let int = if int_part.is_empty() {
            0
        } else {
            int_part.parse::<u64>().map_err(|_| bad())?
        };
        let frac = if frac_part.is_empty() {
            0
        } else {
            frac_part.parse::<u64>().map_err(|_| bad())?
        };
        let num = int
            .checked_mul(den)
            .and_then(|v| v.checked_add(frac))
            .ok_or_else(bad)?;
        let g = gcd(num.max(1), den);
        let num = u32::try_from(num / g).map_err(|_| bad())?;
        let den = u32::try_from(den / g).map_err(|_| bad())?;
        Self::new(num, den)
    }
}

fn gcd(mut a: u64, mut b: u64) -> u64 {
    while b != 0 {
        let t = a % b;
        a = b;
        b = t;
    }
    a.max(1)
}

/// Viewport and output dimensions in pixels.
#[derive(Clone, Copy, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct Canvas {
    /// Width in pixels.
    pub width: u32,
    /// Height in pixels.
    pub height: u32,
}

impl Canvas {
    /// Check the dimensions can be encoded as yuv420p.
    pub fn validate(self) -> SlidecastResult<()> {
        if self.width == 0 || self.height == 0 {
            return Err(SlidecastError::validation(
                "canvas width/height must be non-zero",
            ));
        }
        if !self.width.is_multiple_of(2) || !self.height.is_multiple_of(2) {
            return Err(SlidecastError::validation(
                "canvas width/height must be even (required for yuv420p mp4 output)",
            ));
        }
        Ok(())
    }
}

impl fmt::Display for Canvas {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}x{}", self.width, self.height)
    }
}

#[cfg(test)]
#[path = "../../tests/unit/foundation/core.rs"]
mod tests;
