//! Encoder pipeline.
//!
//! Reassembles a numbered still-image sequence into a constant-frame-rate MP4 with the system
//! `ffmpeg`, optionally muxing an audio track truncated to the shorter stream.

/// `ffmpeg` invocation and progress reporting.
pub mod ffmpeg;
/// `ffprobe`-based verification of encoded output.
pub mod probe;
