use crate::catalog::RemoteCatalog;
use crate::config::SyncConfig;
use crate::error::SyncError;
use crate::executor::{DownloadExecutor, ProgressReporter, SyncSummary};
use crate::planner::SyncPlanner;
use crate::storage_client::StorageClient;
use tokio_util::sync::CancellationToken;

/// Runs one full sync for a project: discovery, planning, execution.
///
/// Discovery errors abort before any download; per-task failures are
/// aggregated into the returned summary instead. Re-running with the same
/// configuration only downloads what is still missing.
pub async fn sync_project<C: StorageClient + Sync>(
    client: &C,
    config: &SyncConfig,
    cancel: CancellationToken,
    reporter: &dyn ProgressReporter,
) -> Result<SyncSummary, SyncError> {
    let catalog = RemoteCatalog::new(client, config.project, config.retry.clone());

    let resolution = catalog
        .resolve(&config.release, config.storage_url.as_deref())
        .await?;

    let runs = catalog.list_runs(&resolution, config.max_runs).await?;
    tracing::info!("Found {} runs online.", runs.len());
    if let Some(cap) = config.max_runs {
        tracing::info!("NOTE: Capped at {cap} runs by --max-runs.");
    }

    let output_dir = config.output_dir_for(&resolution.release);
    let planner = SyncPlanner::new(&resolution.storage_root, &output_dir);
    let plan = planner.plan(&runs, &config.files, config.redownload);

    let requested = runs.len() * config.files.len();
    tracing::info!(
        "{} of {} requested files already present. Downloading {} files to {}.",
        requested.saturating_sub(plan.len()),
        requested,
        plan.len(),
        output_dir.display()
    );
    if config.dry_run {
        tracing::info!("NOTE: Dry run. Not downloading any files.");
    }

    let executor = DownloadExecutor::new(client, config, cancel, reporter);
    Ok(executor.execute_plan(plan).await)
}
