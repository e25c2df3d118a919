use crate::file_kind::FileKind;
use crate::project::Project;
use crate::release::LATEST;
use std::path::PathBuf;
use std::time::Duration;

/// Everything one sync invocation needs to know. Resolved once, immutable
/// afterwards.
#[derive(Debug, Clone)]
pub struct SyncConfig {
    /// Sub-corpus to mirror.
    pub project: Project,

    /// Release selector: a concrete version like `v0.4.0`, or `latest`.
    pub release: String,

    /// Root of the local mirror. Defaults to `./helm-data/<project>/<release>`.
    pub output_dir: Option<PathBuf>,

    /// Verbatim storage root, overriding discovery.
    pub storage_url: Option<String>,

    /// Re-fetch files even when the destination already exists.
    pub redownload: bool,

    /// Cap on the number of runs considered, in listing order.
    pub max_runs: Option<usize>,

    /// Plan only; no network fetches, no filesystem writes.
    pub dry_run: bool,

    /// File kinds to download for each run.
    pub files: Vec<FileKind>,

    /// Number of downloads in flight at once.
    pub concurrency: usize,

    /// Retry bounds for transient fetch failures.
    pub retry: RetryPolicy,
}

impl SyncConfig {
    pub fn new(project: Project) -> Self {
        Self {
            project,
            release: LATEST.to_string(),
            output_dir: None,
            storage_url: None,
            redownload: false,
            max_runs: None,
            dry_run: false,
            files: vec![
                FileKind::ScenarioState,
                FileKind::Instances,
                FileKind::DisplayPredictions,
            ],
            concurrency: 4,
            retry: RetryPolicy::default(),
        }
    }

    /// Destination root for the given effective release.
    pub fn output_dir_for(&self, release: &str) -> PathBuf {
        self.output_dir.clone().unwrap_or_else(|| {
            PathBuf::from("helm-data")
                .join(self.project.id())
                .join(release)
        })
    }
}

/// Bounds for retrying transient fetch failures.
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    /// Total attempts per fetch, including the first.
    pub max_attempts: u32,

    /// Delay before the second attempt; doubles per further attempt.
    pub initial_backoff: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            initial_backoff: Duration::from_secs(1),
        }
    }
}

impl RetryPolicy {
    /// Backoff before the attempt following `completed_attempts`.
    pub fn backoff_after(&self, completed_attempts: u32) -> Duration {
        self.initial_backoff * 2u32.saturating_pow(completed_attempts.saturating_sub(1))
    }
}
