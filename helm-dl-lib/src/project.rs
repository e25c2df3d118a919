use anyhow::{Result, bail};
use once_cell::sync::Lazy;
use regex::Regex;
use std::fmt;
use std::str::FromStr;

static RELEASE_REGEX: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#"window\.RELEASE = "(.+?)";"#).unwrap());
static SUITE_REGEX: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#"window\.SUITE = "(.+?)";"#).unwrap());

/// A HELM sub-corpus namespace. Each project publishes its own releases
/// under its own storage layout.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Project {
    Classic,
    Lite,
    Heim,
    Instruct,
}

impl Project {
    pub const ALL: [Project; 4] = [
        Project::Classic,
        Project::Lite,
        Project::Heim,
        Project::Instruct,
    ];

    pub fn id(&self) -> &'static str {
        match self {
            Project::Classic => "classic",
            Project::Lite => "lite",
            Project::Heim => "heim",
            Project::Instruct => "instruct",
        }
    }

    pub fn display_name(&self) -> &'static str {
        match self {
            Project::Classic => "Classic",
            Project::Lite => "Lite",
            Project::Heim => "HEIM",
            Project::Instruct => "Instruct",
        }
    }

    /// The frontend config file that names the current release and the
    /// storage root.
    pub fn config_url(&self) -> String {
        format!("https://crfm.stanford.edu/helm/{}/latest/config.js", self.id())
    }

    /// Pattern extracting release candidates from `config.js`. HEIM names
    /// its current release as a suite, the other projects as a release.
    pub fn release_regex(&self) -> &'static Regex {
        match self {
            Project::Heim => &SUITE_REGEX,
            _ => &RELEASE_REGEX,
        }
    }

    /// Storage root used when discovery fails and no override is given.
    pub fn default_storage_url(&self, release: &str) -> String {
        match self {
            Project::Heim => {
                format!("https://nlp.stanford.edu/helm/{release}/benchmark_output")
            }
            _ => "https://storage.googleapis.com/crfm-helm-public/benchmark_output"
                .to_string(),
        }
    }

    /// Location of the release-level listing files (`run_specs.json` and,
    /// for most projects, `runs_to_run_suites.json`).
    pub fn release_url(&self, storage_root: &str, release: &str) -> String {
        match self {
            Project::Heim => format!("{storage_root}/runs/{release}"),
            _ => format!("{storage_root}/releases/{release}"),
        }
    }

    /// Whether the release publishes a run-id to suite mapping. HEIM runs
    /// always live directly under the release itself.
    pub fn maps_run_suites(&self) -> bool {
        !matches!(self, Project::Heim)
    }
}

impl fmt::Display for Project {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.id())
    }
}

impl FromStr for Project {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "classic" => Ok(Project::Classic),
            "lite" => Ok(Project::Lite),
            "heim" => Ok(Project::Heim),
            "instruct" => Ok(Project::Instruct),
            other => bail!(
                "Unknown project '{other}'. Options: classic, lite, heim, instruct, all."
            ),
        }
    }
}
