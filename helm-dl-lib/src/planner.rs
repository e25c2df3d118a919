use crate::catalog::Run;
use crate::file_kind::FileKind;
use std::path::{Path, PathBuf};

/// One pending download: a (run, file kind) pair with its resolved source
/// URL and destination path. Consumed exactly once, never persisted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DownloadTask {
    pub run_id: String,
    pub kind: FileKind,
    pub url: String,
    pub dest: PathBuf,
}

/// Presence check against the local mirror. The destination file existing
/// is the sole record of a completed download; there is no separate ledger
/// to drift out of sync after manual deletions.
#[derive(Debug, Default)]
pub struct LocalInventory;

impl LocalInventory {
    pub fn exists(&self, dest: &Path) -> bool {
        dest.is_file()
    }
}

/// Diffs the remote catalog against local state to produce the ordered
/// list of pending downloads.
pub struct SyncPlanner<'a> {
    storage_root: &'a str,
    output_dir: &'a Path,
    inventory: LocalInventory,
}

impl<'a> SyncPlanner<'a> {
    pub fn new(storage_root: &'a str, output_dir: &'a Path) -> Self {
        Self {
            storage_root,
            output_dir,
            inventory: LocalInventory,
        }
    }

    /// Destination path for a (run, kind) pair: a pure function of the
    /// configuration, so the presence check can serve as the completion
    /// record.
    pub fn destination(&self, run: &Run, kind: FileKind) -> PathBuf {
        self.output_dir
            .join(run.path_safe_id())
            .join(kind.file_name())
    }

    fn source_url(&self, run: &Run, kind: FileKind) -> String {
        format!(
            "{}/runs/{}/{}/{}",
            self.storage_root,
            run.suite,
            run.id,
            kind.file_name()
        )
    }

    /// Produces the plan: runs in catalog order, kinds in declared order,
    /// skipping files already on disk unless `redownload` forces them.
    /// Re-running with the same configuration re-derives the remaining
    /// plan, which is what makes interrupted syncs resumable.
    pub fn plan(
        &self,
        runs: &[Run],
        requested: &[FileKind],
        redownload: bool,
    ) -> Vec<DownloadTask> {
        // Deduplicate by walking the enumeration in declared order.
        let kinds: Vec<FileKind> = FileKind::ALL
            .into_iter()
            .filter(|kind| requested.contains(kind))
            .collect();

        let mut tasks = Vec::new();
        for run in runs {
            for &kind in &kinds {
                let dest = self.destination(run, kind);
                if !redownload && self.inventory.exists(&dest) {
                    continue;
                }
                tasks.push(DownloadTask {
                    run_id: run.id.clone(),
                    kind,
                    url: self.source_url(run, kind),
                    dest,
                });
            }
        }
        tasks
    }
}
