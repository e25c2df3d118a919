use anyhow::{Context, Result};
use once_cell::sync::Lazy;
use regex::Regex;
use std::cmp::Ordering;
use std::fmt;
use std::str::FromStr;

static VERSION_REGEX: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^v?(\d+(?:\.\d+)*)$").unwrap());

/// Selector value that triggers release discovery instead of naming a
/// concrete release.
pub const LATEST: &str = "latest";

/// A parsed release identifier such as `v0.4.0`.
///
/// Ordering compares dotted segments numerically, so `v0.10.0` sorts above
/// `v0.9.0`. The original spelling is preserved for URL composition.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReleaseVersion {
    segments: Vec<u32>,
    raw: String,
}

impl ReleaseVersion {
    pub fn parse(version_str: &str) -> Result<Self> {
        let caps = VERSION_REGEX
            .captures(version_str.trim())
            .with_context(|| format!("Invalid release version '{version_str}'"))?;

        let segments = caps[1]
            .split('.')
            .map(|s| s.parse::<u32>())
            .collect::<Result<Vec<_>, _>>()
            .with_context(|| format!("Invalid release version '{version_str}'"))?;

        Ok(ReleaseVersion {
            segments,
            raw: version_str.trim().to_string(),
        })
    }

    /// The release identifier as it appeared in the source, e.g. `v0.4.0`.
    pub fn as_str(&self) -> &str {
        &self.raw
    }

    /// Picks the highest version among `candidates`, ignoring entries that
    /// do not parse as versions.
    pub fn highest_of<'a, I>(candidates: I) -> Option<ReleaseVersion>
    where
        I: IntoIterator<Item = &'a str>,
    {
        candidates
            .into_iter()
            .filter_map(|c| ReleaseVersion::parse(c).ok())
            .max()
    }
}

impl Ord for ReleaseVersion {
    fn cmp(&self, other: &Self) -> Ordering {
        let len = self.segments.len().max(other.segments.len());
        for i in 0..len {
            let a = self.segments.get(i).copied().unwrap_or(0);
            let b = other.segments.get(i).copied().unwrap_or(0);
            match a.cmp(&b) {
                Ordering::Equal => continue,
                unequal => return unequal,
            }
        }
        Ordering::Equal
    }
}

impl PartialOrd for ReleaseVersion {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl fmt::Display for ReleaseVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.raw)
    }
}

impl FromStr for ReleaseVersion {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}
