use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{SystemTime, UNIX_EPOCH};

use anyhow::Context as _;

use crate::foundation::error::{SlidecastError, SlidecastResult};
use crate::job::request::RenderRequest;

const MANIFEST_FILE: &str = "job.json";
const FRAMES_DIR: &str = "frames";
const OUTPUT_FILE: &str = "output.mp4";
const FAILED_MARKER: &str = "failed";

static NEXT_JOB: AtomicU64 = AtomicU64::new(0);

/// Declared inputs of a job, persisted as `job.json`.
#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct JobManifest {
    /// Job id (directory name).
    pub id: String,
    /// Creation time, milliseconds since the Unix epoch.
    pub created_unix_ms: u64,
    /// The request as submitted.
    pub request: RenderRequest,
    /// Planned frame count.
    pub total_frames: u64,
}

/// One job's working directory:
///
/// ```text
/// <root>/<id>/job.json
/// <root>/<id>/frames/frame_000000.png ...
/// <root>/<id>/output.mp4
/// <root>/<id>/failed          (only after a failure)
/// ```
#[derive(Clone, Debug)]
pub struct JobWorkspace {
    id: String,
    dir: PathBuf,
}

impl JobWorkspace {
    /// Allocate a fresh job directory under `root` and write its manifest.
    pub fn create(
        root: &Path,
        request: &RenderRequest,
        total_frames: u64,
    ) -> SlidecastResult<Self> {
        let created_unix_ms = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_millis() as u64)
            .unwrap_or_default();
        let id = format!(
            "{created_unix_ms}-{}-{}",
            std::process::id(),
            NEXT_JOB.fetch_add(1, Ordering::Relaxed)
        );

        std::fs::create_dir_all(root)
            .with_context(|| format!("failed to create jobs root '{}'", root.display()))?;
        let dir = root.join(&id);
        std::fs::create_dir(&dir)
            .with_context(|| format!("failed to create job directory '{}'", dir.display()))?;

        let manifest = JobManifest {
            id: id.clone(),
            created_unix_ms,
            request: request.clone(),
            total_frames,
        };
        let json = serde_json::to_vec_pretty(&manifest)
            .map_err(|e| SlidecastError::serde(format!("job manifest: {e}")))?;
        std::fs::write(dir.join(MANIFEST_FILE), json)
            .with_context(|| format!("failed to write manifest in '{}'", dir.display()))?;

        tracing::debug!(job = %id, dir = %dir.display(), "job workspace created");
        Ok(Self { id, dir })
    }

    /// Job id.
    pub fn id(&self) -> &str {
        &self.id
    }

    /// Job directory.
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Directory the capture loop writes frames into.
    pub fn frames_dir(&self) -> PathBuf {
        self.dir.join(FRAMES_DIR)
    }

    /// Encoded video location.
    pub fn output_path(&self) -> PathBuf {
        self.dir.join(OUTPUT_FILE)
    }

    /// Read back the persisted manifest.
    pub fn manifest(&self) -> SlidecastResult<JobManifest> {
        read_manifest(&self.dir)
    }

    /// Record a failure cause so status probes report it.
    pub fn mark_failed(&self, reason: &str) {
        let path = self.dir.join(FAILED_MARKER);
        if let Err(e) = std::fs::write(&path, reason) {
            tracing::warn!(path = %path.display(), error = %e, "failed to write failure marker");
        }
    }
}

fn read_manifest(dir: &Path) -> SlidecastResult<JobManifest> {
    let path = dir.join(MANIFEST_FILE);
    let bytes =
        std::fs::read(&path).with_context(|| format!("failed to read '{}'", path.display()))?;
    serde_json::from_slice(&bytes)
        .map_err(|e| SlidecastError::serde(format!("'{}': {e}", path.display())))
}

/// Observable state of a job directory.
#[derive(Clone, Debug, PartialEq, Eq, serde::Serialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum JobStatus {
    /// No directory with a manifest exists for the id.
    NotFound,
    /// Manifest written, capture not started.
    Pending,
    /// Frames are being captured or encoded.
    Rendering {
        /// Frame files written so far.
        frames: usize,
        /// Planned frame count, when the manifest is readable.
        total_frames: Option<u64>,
    },
    /// The video was encoded and frames were cleaned up.
    Completed {
        /// Encoded video.
        video: PathBuf,
    },
    /// The job failed.
    Failed {
        /// Recorded cause.
        reason: String,
    },
}

impl JobStatus {
    /// Inspect the job `id` under `root`.
    ///
    /// A failure marker wins over everything else, since failed jobs keep their frames and may
    /// leave a partial video behind.
    pub fn probe(root: &Path, id: &str) -> SlidecastResult<Self> {
        if id.is_empty() || id.contains(['/', '\\']) || id == "." || id == ".." {
            return Err(SlidecastError::validation(format!("invalid job id '{id}'")));
        }
        let dir = root.join(id);
        if !dir.join(MANIFEST_FILE).is_file() {
            return Ok(Self::NotFound);
        }

        let failed = dir.join(FAILED_MARKER);
        if failed.is_file() {
            let reason = std::fs::read_to_string(&failed).unwrap_or_default();
            return Ok(Self::Failed {
                reason: reason.trim().to_string(),
            });
        }

        let frames_dir = dir.join(FRAMES_DIR);
        let output = dir.join(OUTPUT_FILE);
        if frames_dir.is_dir() {
            return Ok(Self::Rendering {
                frames: count_frames(&frames_dir),
                total_frames: read_manifest(&dir).ok().map(|m| m.total_frames),
            });
        }
        if output.is_file() {
            return Ok(Self::Completed { video: output });
        }
        Ok(Self::Pending)
    }

    /// Return `true` for `Completed` and `Failed`.
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Completed { .. } | Self::Failed { .. })
    }
}

impl fmt::Display for JobStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NotFound => f.write_str("not found"),
            Self::Pending => f.write_str("pending"),
            Self::Rendering {
                frames,
                total_frames: Some(total),
            } => write!(f, "rendering ({frames}/{total} frames)"),
            Self::Rendering { frames, .. } => write!(f, "rendering ({frames} frames)"),
            Self::Completed { video } => write!(f, "completed: {}", video.display()),
            Self::Failed { reason } => write!(f, "failed: {reason}"),
        }
    }
}

fn count_frames(dir: &Path) -> usize {
    std::fs::read_dir(dir)
        .map(|entries| {
            entries
                .filter_map(Result::ok)
                .filter(|e| {
                    let name = e.file_name();
                    let name = name.to_string_lossy();
                    name.starts_with("frame_") && name.ends_with(".png")
                })
                .count()
        })
        .unwrap_or(0)
}

/// Every job under `root` with its status, sorted by id (oldest first).
///
/// A missing root yields an empty list.
pub fn list_jobs(root: &Path) -> SlidecastResult<Vec<(String, JobStatus)>> {
    let entries = match std::fs::read_dir(root) {
        Ok(entries) => entries,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
        Err(e) => {
            return Err(anyhow::Error::new(e)
                .context(format!("failed to read jobs root '{}'", root.display()))
                .into());
        }
    };

    let mut ids: Vec<String> = entries
        .filter_map(Result::ok)
        .filter(|e| e.path().join(MANIFEST_FILE).is_file())
        .filter_map(|e| e.file_name().to_str().map(str::to_string))
        .collect();
    ids.sort_by_key(|id| sort_key(id));

    ids.into_iter()
        .map(|id| {
            let status = JobStatus::probe(root, &id)?;
            Ok((id, status))
        })
        .collect()
}

fn sort_key(id: &str) -> (u64, String) {
    let millis = id
        .split('-')
        .next()
        .and_then(|m| m.parse().ok())
        .unwrap_or(u64::MAX);
    (millis, id.to_string())
}

#[cfg(test)]
#[path = "../../tests/unit/job/workspace.rs"]
mod tests;
