//! Job envelope: request validation, per-job working directories and scratch cleanup.

/// Render requests, presets and their validation.
pub mod request;
/// Owned registry of scratch directories for best-effort cleanup.
pub mod scratch;
/// Per-job working directory layout and status probing.
pub mod workspace;
