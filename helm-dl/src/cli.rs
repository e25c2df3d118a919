use crate::progress::FailureLogReporter;
use crate::ui;
use anyhow::{Context, Result, bail};
use clap::Parser;
use helm_dl_lib::config::SyncConfig;
use helm_dl_lib::executor::SyncSummary;
use helm_dl_lib::file_kind::FileKind;
use helm_dl_lib::project::Project;
use helm_dl_lib::storage_client::HttpStorageClient;
use helm_dl_lib::sync::sync_project;
use std::path::PathBuf;
use tokio_util::sync::CancellationToken;

#[derive(Parser)]
#[command(name = "helm-dl")]
#[command(about = "Mirror HELM benchmark results onto local disk")]
#[command(version)]
pub struct Cli {
    /// Project to download data from: classic, lite, heim, instruct, or all
    #[arg(short, long, default_value = "classic")]
    pub project: String,

    /// Release version to download data from, e.g. v0.4.0, or 'latest'
    #[arg(short, long, default_value = "latest")]
    pub release: String,

    /// Output directory [default: ./helm-data/<PROJECT>/<RELEASE>]
    #[arg(short, long)]
    pub output_dir: Option<PathBuf>,

    /// Storage URL to download from, overriding discovery. Useful for local
    /// mirrors with a similar folder structure, or when the hosting moved
    /// and this tool has not been updated yet
    #[arg(long)]
    pub storage_url: Option<String>,

    /// Redownload all data, even if present already
    #[arg(long)]
    pub redownload: bool,

    /// Maximum number of runs to download, in listing order
    #[arg(long)]
    pub max_runs: Option<usize>,

    /// Plan only; do not download anything
    #[arg(long)]
    pub dry_run: bool,

    /// Files to download for each run, or 'all'
    #[arg(
        long,
        num_args = 1..,
        default_values = ["scenario_state.json", "instances.json", "display_predictions.json"]
    )]
    pub files: Vec<String>,

    /// Number of downloads in flight at once
    #[arg(long, default_value_t = 4)]
    pub concurrency: usize,
}

impl Cli {
    pub async fn run(self) -> Result<()> {
        let projects: Vec<Project> = if self.project.eq_ignore_ascii_case("all") {
            Project::ALL.to_vec()
        } else {
            vec![self.project.parse()?]
        };
        let files = self.parse_files()?;

        let cancel = CancellationToken::new();
        {
            let cancel = cancel.clone();
            tokio::spawn(async move {
                if tokio::signal::ctrl_c().await.is_ok() {
                    tracing::info!("Interrupt received. Letting in-flight downloads finish...");
                    cancel.cancel();
                }
            });
        }

        let client = HttpStorageClient::new()?;
        let reporter = FailureLogReporter;
        let mut total_failed = 0;

        for project in projects {
            ui::info(&format!(
                "# Downloading data for HELM {} project.",
                project.display_name()
            ));
            let config = self.sync_config(project, files.clone());
            let summary = sync_project(&client, &config, cancel.clone(), &reporter)
                .await
                .with_context(|| format!("Sync failed for project '{project}'"))?;
            report_summary(&summary);
            total_failed += summary.failed.len();

            if cancel.is_cancelled() {
                ui::warning("Sync interrupted. Partial results are safe to resume from.");
                break;
            }
        }

        if total_failed > 0 {
            bail!(
                "{total_failed} downloads failed. Re-running with the same options \
                 retries only the missing files."
            );
        }
        Ok(())
    }

    fn parse_files(&self) -> Result<Vec<FileKind>> {
        if self.files.iter().any(|f| f.eq_ignore_ascii_case("all")) {
            return Ok(FileKind::ALL.to_vec());
        }
        self.files.iter().map(|f| f.parse()).collect()
    }

    fn sync_config(&self, project: Project, files: Vec<FileKind>) -> SyncConfig {
        let mut config = SyncConfig::new(project);
        config.release = self.release.clone();
        config.output_dir = self.output_dir.clone();
        config.storage_url = self.storage_url.clone();
        config.redownload = self.redownload;
        config.max_runs = self.max_runs;
        config.dry_run = self.dry_run;
        config.files = files;
        config.concurrency = self.concurrency;
        config
    }
}

fn report_summary(summary: &SyncSummary) {
    if summary.planned > 0 {
        ui::info(&format!(
            "Dry run: {} files would be downloaded.",
            summary.planned
        ));
        return;
    }

    for failed in &summary.failed {
        ui::warning(&format!(
            "Failed: {} {} ({})",
            failed.run_id, failed.kind, failed.reason
        ));
    }
    ui::success(&format!(
        "{} downloaded, {} skipped, {} failed.",
        summary.succeeded,
        summary.skipped,
        summary.failed.len()
    ));
    if summary.cancelled > 0 {
        ui::warning(&format!("{} downloads cancelled.", summary.cancelled));
    }
    if !summary.is_clean() {
        ui::tip("Re-run with the same options to retry the failed files.");
    }
}

#[cfg(test)]
mod tests {
    use crate::cli::Cli;
    use clap::CommandFactory;

    #[test]
    fn test_cli() {
        Cli::command().debug_assert();
    }
}
