use anyhow::{Result, bail};
use std::fmt;
use std::str::FromStr;

/// The fixed set of artifact files a run may publish.
///
/// The declared order here is the download order within a run, which keeps
/// plans deterministic across invocations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum FileKind {
    RunSpec,
    Scenario,
    ScenarioState,
    Stats,
    Instances,
    DisplayPredictions,
    DisplayRequests,
}

impl FileKind {
    pub const ALL: [FileKind; 7] = [
        FileKind::RunSpec,
        FileKind::Scenario,
        FileKind::ScenarioState,
        FileKind::Stats,
        FileKind::Instances,
        FileKind::DisplayPredictions,
        FileKind::DisplayRequests,
    ];

    /// File name under a run's directory, both remotely and locally.
    pub fn file_name(&self) -> &'static str {
        match self {
            FileKind::RunSpec => "run_spec.json",
            FileKind::Scenario => "scenario.json",
            FileKind::ScenarioState => "scenario_state.json",
            FileKind::Stats => "stats.json",
            FileKind::Instances => "instances.json",
            FileKind::DisplayPredictions => "display_predictions.json",
            FileKind::DisplayRequests => "display_requests.json",
        }
    }
}

impl fmt::Display for FileKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.file_name())
    }
}

impl FromStr for FileKind {
    type Err = anyhow::Error;

    /// Accepts both the bare kind name (`scenario_state`) and the full file
    /// name (`scenario_state.json`).
    fn from_str(s: &str) -> Result<Self> {
        match s.trim().trim_end_matches(".json") {
            "run_spec" => Ok(FileKind::RunSpec),
            "scenario" => Ok(FileKind::Scenario),
            "scenario_state" => Ok(FileKind::ScenarioState),
            "stats" => Ok(FileKind::Stats),
            "instances" => Ok(FileKind::Instances),
            "display_predictions" => Ok(FileKind::DisplayPredictions),
            "display_requests" => Ok(FileKind::DisplayRequests),
            other => bail!(
                "Unknown file '{other}'. Available: {}.",
                FileKind::ALL.map(|k| k.file_name()).join(", ")
            ),
        }
    }
}
