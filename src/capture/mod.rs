//! Frame capture loop.
//!
//! Walks a [`TimelinePlan`](crate::timeline::plan::TimelinePlan) over a loaded surface and writes
//! one still image per planned frame.

/// Sequential capture of numbered still images.
pub mod frames;
