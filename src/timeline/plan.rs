use crate::foundation::core::{Fps, FrameIndex, FrameRange};
use crate::foundation::error::{SlidecastError, SlidecastResult};

/// Frames assigned to one segment.
#[derive(Clone, Copy, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct SegmentFrames {
    /// Zero-based segment index, equal to the position of its duration in the input.
    pub segment: usize,
    /// Global frames the segment is visible for.
    pub frames: FrameRange,
    /// Requested duration in seconds.
    pub duration_secs: f64,
}

impl SegmentFrames {
    /// First frame of the segment.
    pub fn start_frame(&self) -> FrameIndex {
        self.frames.start
    }

    /// Last frame of the segment (inclusive), `None` when the segment rounds to zero frames.
    pub fn end_frame(&self) -> Option<FrameIndex> {
        self.frames.last()
    }

    /// Number of frames the segment occupies.
    pub fn frame_count(&self) -> u64 {
        self.frames.len_frames()
    }
}

/// Ordered, contiguous frame assignment for every segment of a job.
///
/// This is the single source of timing truth: nothing downstream recomputes it.
#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct TimelinePlan {
    /// Capture and output frame rate.
    pub fps: Fps,
    /// One entry per input duration, in input order.
    pub segments: Vec<SegmentFrames>,
    /// Sum of all segment frame counts.
    pub total_frames: u64,
}

impl TimelinePlan {
    /// Output duration implied by [`TimelinePlan::total_frames`].
    pub fn duration_secs(&self) -> f64 {
        self.fps.frames_to_secs(self.total_frames)
    }

    /// Whole-timeline range `[0, total_frames)`.
    pub fn range(&self) -> FrameRange {
        FrameRange {
            start: FrameIndex(0),
            end: FrameIndex(self.total_frames),
        }
    }

    /// Segment visible at global frame `f`, if any.
    pub fn segment_at(&self, f: FrameIndex) -> Option<&SegmentFrames> {
        if f.0 >= self.total_frames {
            return None;
        }
        // Empty segments share a start with their successor; the partition point skips them.
        let idx = self.segments.partition_point(|s| s.frames.end.0 <= f.0);
        self.segments.get(idx).filter(|s| s.frames.contains(f))
    }
}

/// Number of frames a duration occupies at `fps`.
///
/// Rounds half away from zero (`f64::round`), so a duration landing exactly on a half frame gets
/// the extra frame.
pub fn frame_count(duration_secs: f64, fps: Fps) -> u64 {
    let exact = duration_secs * f64::from(fps.num) / f64::from(fps.den);
    exact.round().max(0.0) as u64
}

/// Map ordered per-segment durations into contiguous frame ranges starting at frame 0.
///
/// Durations may be zero (or round to zero frames); such segments get an empty range and never
/// appear in the output. Negative or non-finite durations are rejected. Request-level bounds
/// (positive durations, total ceiling) are enforced by [`crate::RenderRequest::validate`].
pub fn plan(durations: &[f64], fps: Fps) -> SlidecastResult<TimelinePlan> {
    let mut segments = Vec::with_capacity(durations.len());
    let mut cursor = 0u64;

    for (segment, &duration_secs) in durations.iter().enumerate() {
        if !duration_secs.is_finite() || duration_secs < 0.0 {
            return Err(SlidecastError::validation(format!(
                "segment {segment} duration must be a finite, non-negative number of seconds (got {duration_secs})"
            )));
        }
        let count = frame_count(duration_secs, fps);
        let end = cursor.checked_add(count).ok_or_else(|| {
            SlidecastError::validation("total frame count overflows the frame index")
        })?;
        segments.push(SegmentFrames {
            segment,
            frames: FrameRange::new(FrameIndex(cursor), FrameIndex(end))?,
            duration_secs,
        });
        cursor = end;
    }

    Ok(TimelinePlan {
        fps,
        segments,
        total_frames: cursor,
    })
}

#[cfg(test)]
#[path = "../../tests/unit/timeline/plan.rs"]
mod tests;
