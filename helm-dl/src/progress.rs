use crate::ui;
use helm_dl_lib::executor::{Outcome, ProgressEvent, ProgressReporter};

/// Reports per-task failures as they happen; the progress bar itself is
/// driven by the tracing-indicatif layer.
pub struct FailureLogReporter;

impl ProgressReporter for FailureLogReporter {
    fn on_task(&self, event: ProgressEvent<'_>) {
        if let Outcome::Failed(reason) = event.outcome {
            ui::warning(&format!(
                "Failed to download {} for run '{}': {reason}",
                event.task.kind, event.task.run_id
            ));
        }
    }
}
