//! Timeline planning: per-segment durations to exact frame ranges.

/// Frame-range planner.
pub mod plan;
