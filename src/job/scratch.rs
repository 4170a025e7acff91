use std::path::{Path, PathBuf};

/// Explicitly owned set of scratch directories awaiting cleanup.
///
/// The owner decides when to clean up: [`ScratchRegistry::release`] after a successful job,
/// [`ScratchRegistry::retain`] to keep a directory for inspection, and
/// [`ScratchRegistry::cleanup_all`] on exit or interruption. Whatever is still tracked when the
/// registry is dropped is removed then. Removal failures are logged, never returned.
#[derive(Debug, Default)]
pub struct ScratchRegistry {
    dirs: Vec<PathBuf>,
}

impl ScratchRegistry {
    /// Empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Start tracking `dir`. Tracking the same path twice is a no-op.
    pub fn track(&mut self, dir: impl Into<PathBuf>) {
        let dir = dir.into();
        if !self.dirs.contains(&dir) {
            self.dirs.push(dir);
        }
    }

    /// Stop tracking `dir` and delete it now. Returns `true` when it is gone afterwards.
    pub fn release(&mut self, dir: &Path) -> bool {
        self.untrack(dir);
        remove_dir(dir)
    }

    /// Stop tracking `dir` and leave it on disk. Returns `true` if it was tracked.
    pub fn retain(&mut self, dir: &Path) -> bool {
        let tracked = self.untrack(dir);
        if tracked {
            tracing::info!(dir = %dir.display(), "scratch directory retained for inspection");
        }
        tracked
    }

    /// Delete every tracked directory. Returns how many were removed.
    pub fn cleanup_all(&mut self) -> usize {
        let dirs = std::mem::take(&mut self.dirs);
        let total = dirs.len();
        let removed = dirs.iter().filter(|d| remove_dir(d)).count();
        if total > 0 {
            tracing::debug!(removed, total, "scratch cleanup finished");
        }
        removed
    }

    /// Directories currently tracked.
    pub fn tracked(&self) -> &[PathBuf] {
        &self.dirs
    }

    /// Return `true` when nothing is tracked.
    pub fn is_empty(&self) -> bool {
        self.dirs.is_empty()
    }

    fn untrack(&mut self, dir: &Path) -> bool {
        let before = self.dirs.len();
        self.dirs.retain(|d| d != dir);
        self.dirs.len() != before
    }
}

impl Drop for ScratchRegistry {
    fn drop(&mut self) {
        self.cleanup_all();
    }
}

fn remove_dir(dir: &Path) -> bool {
    match std::fs::remove_dir_all(dir) {
        Ok(()) => true,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => true,
        Err(e) => {
            tracing::warn!(dir = %dir.display(), error = %e, "failed to remove scratch directory");
            false
        }
    }
}

#[cfg(test)]
#[path = "../../tests/unit/job/scratch.rs"]
mod tests;
