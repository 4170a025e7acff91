//! Slidecast turns slide decks and web pages into frame-accurate videos.
//!
//! Every segment ("slide") is shown for exactly the requested duration, however slowly the
//! renderer produces frames:
//!
//! - Plan per-segment frame ranges with [`plan`]
//! - Drive a [`Surface`] through the injected control protocol and deterministic clock
//! - Capture one still per planned frame with [`capture_frames`]
//! - Reassemble the stills into a constant-frame-rate MP4 with [`encode()`]
//!
//! [`render_to_video`] runs all of it for one [`RenderRequest`].
#![forbid(unsafe_code)]
#![deny(missing_docs)]

mod foundation;

/// Frame capture loop.
pub mod capture;
/// Encoder pipeline (`ffmpeg`, `ffprobe`).
pub mod encode;
/// Job envelope: requests, workspaces, scratch cleanup.
pub mod job;
/// End-to-end render orchestration.
pub mod pipeline;
/// Rendering surfaces, control protocol and dynamic-content suppression.
pub mod surface;
/// Timeline planner.
pub mod timeline;

pub use crate::foundation::core::{
    Canvas, FRAME_FILE_PATTERN, Fps, FrameIndex, FrameRange, MAX_FRAME_INDEX,
};
pub use crate::foundation::error::{SlidecastError, SlidecastResult};

pub use crate::capture::frames::{CaptureOpts, CaptureStats, MissingSegmentPolicy, capture_frames};
pub use crate::encode::ffmpeg::{
    EncodeConfig, EncodeEvent, EncodeOpts, EncodedVideo, build_ffmpeg_args, encode,
    is_ffmpeg_on_path,
};
pub use crate::encode::probe::{VideoProbe, is_ffprobe_on_path, probe_video};
pub use crate::job::request::{MAX_TOTAL_DURATION_SECS, Preset, RenderRequest, parse_durations};
pub use crate::job::scratch::ScratchRegistry;
pub use crate::job::workspace::{JobManifest, JobStatus, JobWorkspace, list_jobs};
pub use crate::pipeline::{RenderOpts, RenderOutcome, render_to_video};
pub use crate::surface::chrome::{ChromeLauncher, ChromeOpts, ChromeSurface};
pub use crate::surface::clock::{ClockStats, SuppressionPolicy};
pub use crate::surface::memory::{RecordingLauncher, RecordingSurface, SurfaceCall};
pub use crate::surface::protocol::{ControlCall, SegmentSelector, SlideSelection};
pub use crate::surface::{ContentSource, Surface, SurfaceLauncher};
pub use crate::timeline::plan::{SegmentFrames, TimelinePlan, plan};
