use crate::config::SyncConfig;
use crate::error::FetchError;
use crate::file_kind::FileKind;
use crate::logging::progress_bar_style;
use crate::planner::DownloadTask;
use crate::storage_client::{StorageClient, fetch_with_retry};
use futures_util::StreamExt;
use futures_util::stream;
use std::path::{Path, PathBuf};
use tokio_util::sync::CancellationToken;
use tracing::instrument;
use tracing_indicatif::span_ext::IndicatifSpanExt;

/// Result of one download task.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    Success { bytes: u64 },
    /// The remote confirmed the file does not exist for this run.
    Skipped,
    Failed(String),
}

/// Per-task notification emitted by the executor. How progress is displayed
/// is entirely up to the reporter.
pub struct ProgressEvent<'a> {
    pub task: &'a DownloadTask,
    pub outcome: &'a Outcome,
}

pub trait ProgressReporter: Send + Sync {
    fn on_task(&self, event: ProgressEvent<'_>);
}

pub struct NullReporter;

impl ProgressReporter for NullReporter {
    fn on_task(&self, _event: ProgressEvent<'_>) {}
}

/// Identity of a failed task, surfaced for manual retry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FailedTask {
    pub run_id: String,
    pub kind: FileKind,
    pub reason: String,
}

/// Aggregated counts over a whole plan. One failed task never aborts the
/// batch; everything is tallied here instead.
#[derive(Debug, Default)]
pub struct SyncSummary {
    pub succeeded: usize,
    pub skipped: usize,
    /// Tasks reported in dry-run mode instead of being executed.
    pub planned: usize,
    /// Tasks never started because the sync was cancelled.
    pub cancelled: usize,
    pub failed: Vec<FailedTask>,
}

impl SyncSummary {
    pub fn is_clean(&self) -> bool {
        self.failed.is_empty()
    }
}

/// Executes a plan with a bounded number of downloads in flight.
pub struct DownloadExecutor<'a, C> {
    client: &'a C,
    config: &'a SyncConfig,
    cancel: CancellationToken,
    reporter: &'a dyn ProgressReporter,
}

impl<'a, C: StorageClient + Sync> DownloadExecutor<'a, C> {
    pub fn new(
        client: &'a C,
        config: &'a SyncConfig,
        cancel: CancellationToken,
        reporter: &'a dyn ProgressReporter,
    ) -> Self {
        Self {
            client,
            config,
            cancel,
            reporter,
        }
    }

    /// Runs every task in the plan. Cancellation is cooperative at task
    /// boundaries: tasks already in flight finish their write-or-discard
    /// cycle, tasks not yet started are counted as cancelled.
    #[instrument(skip_all)]
    pub async fn execute_plan(&self, tasks: Vec<DownloadTask>) -> SyncSummary {
        let mut summary = SyncSummary::default();

        if self.config.dry_run {
            for task in &tasks {
                tracing::info!("Would download {}", task.url);
                summary.planned += 1;
            }
            return summary;
        }

        let span = tracing::Span::current();
        if let Ok(style) = progress_bar_style() {
            span.pb_set_style(&style);
        }
        span.pb_set_length(tasks.len() as u64);
        span.pb_set_message("Downloading");
        span.pb_set_finish_message("Downloading... Done");

        let outcomes: Vec<(DownloadTask, Option<Outcome>)> = stream::iter(tasks)
            .map(|task| {
                let span = span.clone();
                async move {
                    if self.cancel.is_cancelled() {
                        return (task, None);
                    }
                    let outcome = self.execute(&task).await;
                    span.pb_inc(1);
                    self.reporter.on_task(ProgressEvent {
                        task: &task,
                        outcome: &outcome,
                    });
                    (task, Some(outcome))
                }
            })
            .buffer_unordered(self.config.concurrency.max(1))
            .collect()
            .await;

        for (task, outcome) in outcomes {
            match outcome {
                Some(Outcome::Success { .. }) => summary.succeeded += 1,
                Some(Outcome::Skipped) => summary.skipped += 1,
                Some(Outcome::Failed(reason)) => summary.failed.push(FailedTask {
                    run_id: task.run_id,
                    kind: task.kind,
                    reason,
                }),
                None => summary.cancelled += 1,
            }
        }
        summary
    }

    async fn execute(&self, task: &DownloadTask) -> Outcome {
        match fetch_with_retry(self.client, &task.url, &self.config.retry).await {
            Ok(bytes) => {
                let len = bytes.len() as u64;
                match write_atomic(&task.dest, &bytes).await {
                    Ok(()) => Outcome::Success { bytes: len },
                    Err(e) => {
                        Outcome::Failed(format!("Could not write {}: {e}", task.dest.display()))
                    }
                }
            }
            Err(FetchError::Missing) => {
                tracing::debug!("Run '{}' serves no {}; skipping.", task.run_id, task.kind);
                Outcome::Skipped
            }
            Err(e) => Outcome::Failed(e.to_string()),
        }
    }
}

/// Writes `bytes` to a sibling temp file and renames it into place. A
/// crash mid-write must never leave a half-written file at the final
/// destination, since the next planning pass would count it as complete.
pub async fn write_atomic(dest: &Path, bytes: &[u8]) -> std::io::Result<()> {
    if let Some(parent) = dest.parent() {
        tokio::fs::create_dir_all(parent).await?;
    }

    let mut tmp_name = dest.as_os_str().to_owned();
    tmp_name.push(".part");
    let tmp = PathBuf::from(tmp_name);

    if let Err(e) = tokio::fs::write(&tmp, bytes).await {
        let _ = tokio::fs::remove_file(&tmp).await;
        return Err(e);
    }
    tokio::fs::rename(&tmp, dest).await
}
