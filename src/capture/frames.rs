use std::path::Path;
use std::time::Duration;

use crate::foundation::core::{FrameIndex, MAX_FRAME_INDEX};
use crate::foundation::error::{SlidecastError, SlidecastResult};
use crate::surface::Surface;
use crate::surface::protocol::{self, SlideSelection};
use crate::timeline::plan::TimelinePlan;

/// What to do when a segment cannot be selected in the surface.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MissingSegmentPolicy {
    /// Log a warning and keep capturing whatever is visible.
    #[default]
    Warn,
    /// Abort the job with a capture error.
    Fail,
}

/// Capture timing and failure options.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct CaptureOpts {
    /// Wait after re-initialising segments, before the first capture.
    pub stabilize: Duration,
    /// Wait after every segment selection, before capturing its frames.
    pub transition_settle: Duration,
    /// Reaction to a segment that cannot be selected.
    pub missing_segment: MissingSegmentPolicy,
}

impl Default for CaptureOpts {
    fn default() -> Self {
        Self {
            stabilize: Duration::from_millis(1000),
            transition_settle: Duration::from_millis(800),
            missing_segment: MissingSegmentPolicy::Warn,
        }
    }
}

/// Counters reported by [`capture_frames`].
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, serde::Serialize)]
pub struct CaptureStats {
    /// Still images written.
    pub frames_captured: u64,
    /// Segments successfully selected.
    pub segments_shown: usize,
    /// Segments that could not be selected.
    pub segments_missing: usize,
    /// Segments skipped because they round to zero frames.
    pub segments_skipped_empty: usize,
}

/// Capture every planned frame into `frames_dir` as `frame_NNNNNN.png`.
///
/// Frames are written strictly in increasing global index order, exactly
/// `plan.total_frames` of them. A screenshot failure aborts the loop immediately; nothing is
/// retried. The surface is left open; tearing it down is the caller's job.
#[tracing::instrument(
    skip_all,
    fields(total_frames = plan.total_frames, segments = plan.segments.len())
)]
pub async fn capture_frames<S: Surface + ?Sized>(
    surface: &mut S,
    plan: &TimelinePlan,
    frames_dir: &Path,
    opts: &CaptureOpts,
) -> SlidecastResult<CaptureStats> {
    if plan.total_frames > MAX_FRAME_INDEX + 1 {
        return Err(SlidecastError::capture(format!(
            "{} frames exceed the frame file numbering limit of {}",
            plan.total_frames,
            MAX_FRAME_INDEX + 1
        )));
    }
    tokio::fs::create_dir_all(frames_dir).await.map_err(|e| {
        SlidecastError::capture(format!(
            "failed to create frames directory '{}': {e}",
            frames_dir.display()
        ))
    })?;

    match protocol::init_slides(surface).await? {
        Some(found) if found < plan.segments.len() => tracing::warn!(
            found,
            planned = plan.segments.len(),
            "surface exposes fewer segments than planned"
        ),
        Some(found) => tracing::debug!(found, "segments initialised"),
        None => tracing::warn!("control protocol not present in surface"),
    }
    tokio::time::sleep(opts.stabilize).await;

    let mut stats = CaptureStats::default();
    let mut expected = FrameIndex(0);

    for seg in &plan.segments {
        if seg.frames.is_empty() {
            stats.segments_skipped_empty += 1;
            tracing::debug!(segment = seg.segment, "segment has no frames, skipping");
            continue;
        }

        match protocol::set_slide(surface, seg.segment).await? {
            SlideSelection::Shown { .. } => stats.segments_shown += 1,
            miss => {
                stats.segments_missing += 1;
                if opts.missing_segment == MissingSegmentPolicy::Fail {
                    return Err(SlidecastError::capture(format!(
                        "segment {} could not be selected ({miss:?})",
                        seg.segment
                    )));
                }
                tracing::warn!(
                    segment = seg.segment,
                    result = ?miss,
                    "segment could not be selected, capturing current view"
                );
            }
        }
        tokio::time::sleep(opts.transition_settle).await;

        for idx in seg.frames.iter() {
            debug_assert_eq!(idx, expected);
            let path = frames_dir.join(idx.file_name());
            surface.screenshot(&path).await.map_err(|e| {
                SlidecastError::capture(format!("frame {} (segment {}): {e}", idx.0, seg.segment))
            })?;
            if !tokio::fs::try_exists(&path).await.unwrap_or(false) {
                return Err(SlidecastError::capture(format!(
                    "frame {} was not written to '{}'",
                    idx.0,
                    path.display()
                )));
            }
            stats.frames_captured += 1;
            expected = FrameIndex(idx.0 + 1);
        }

        tracing::debug!(
            segment = seg.segment,
            frames = seg.frame_count(),
            "segment captured"
        );
    }

    tracing::info!(frames = stats.frames_captured, "capture finished");
    Ok(stats)
}

#[cfg(test)]
#[path = "../../tests/unit/capture/frames.rs"]
mod tests;
