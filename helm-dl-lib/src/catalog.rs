use crate::config::RetryPolicy;
use crate::error::SyncError;
use crate::project::Project;
use crate::release::{LATEST, ReleaseVersion};
use crate::storage_client::{StorageClient, fetch_with_retry};
use once_cell::sync::Lazy;
use regex::Regex;
use serde::Deserialize;
use std::collections::HashMap;

static BASE_URL_REGEX: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#"window\.BENCHMARK_OUTPUT_BASE_URL =\s*"(.*?)";"#).unwrap());

/// Effective release and storage root for one invocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Resolution {
    pub release: String,
    pub storage_root: String,
}

/// One run in the remote catalog. `suite` is the concrete release the run's
/// files actually live under, which can differ from the selected release.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Run {
    pub id: String,
    pub suite: String,
}

impl Run {
    /// Run ids contain `:`, `,` and `=`; percent-encode them before using
    /// them as directory names.
    pub fn path_safe_id(&self) -> String {
        urlencoding::encode(&self.id).into_owned()
    }
}

/// Matches entries of `run_specs.json`.
#[derive(Debug, Deserialize)]
struct RunSpecJson {
    name: String,
}

/// Resolves a release selector to a storage root and lists the runs the
/// remote currently serves.
pub struct RemoteCatalog<'a, C> {
    client: &'a C,
    project: Project,
    retry: RetryPolicy,
}

impl<'a, C: StorageClient> RemoteCatalog<'a, C> {
    pub fn new(client: &'a C, project: Project, retry: RetryPolicy) -> Self {
        Self {
            client,
            project,
            retry,
        }
    }

    /// Resolves the release selector and storage root. An explicit
    /// `storage_url_override` is used verbatim; otherwise both are scraped
    /// from the project's `config.js`.
    pub async fn resolve(
        &self,
        release_selector: &str,
        storage_url_override: Option<&str>,
    ) -> Result<Resolution, SyncError> {
        let release = if release_selector == LATEST {
            self.resolve_latest().await?
        } else {
            release_selector.to_string()
        };

        let storage_root = match storage_url_override {
            Some(url) => {
                tracing::info!("Using manually provided storage URL '{url}'.");
                url.trim_end_matches('/').to_string()
            }
            None => self.discover_storage_root(&release).await,
        };

        Ok(Resolution {
            release,
            storage_root,
        })
    }

    /// Determines the most recent concrete release by scraping the
    /// project's config page and picking the highest version among the
    /// candidates it names.
    async fn resolve_latest(&self) -> Result<String, SyncError> {
        let config_url = self.project.config_url();
        let body = fetch_with_retry(self.client, &config_url, &self.retry)
            .await
            .map_err(|e| {
                SyncError::Discovery(format!(
                    "Could not fetch {config_url}: {e}. \
                     Try setting a release manually with e.g. `--release v0.4.0`."
                ))
            })?;
        let text = String::from_utf8_lossy(&body);

        let candidates: Vec<&str> = self
            .project
            .release_regex()
            .captures_iter(&text)
            .filter_map(|caps| caps.get(1).map(|m| m.as_str()))
            .collect();

        let release = ReleaseVersion::highest_of(candidates.iter().copied())
            .map(|v| v.as_str().to_string())
            .or_else(|| candidates.first().map(|c| c.to_string()))
            .ok_or_else(|| {
                SyncError::Discovery(format!(
                    "No release found in {config_url}. \
                     Try setting it manually with e.g. `--release v0.4.0`."
                ))
            })?;

        tracing::info!("Using latest release, which is found to be '{release}'.");
        Ok(release)
    }

    /// Scrapes the storage root from `config.js`, falling back to the
    /// project's well-known default when the page is unreachable or has
    /// changed shape.
    async fn discover_storage_root(&self, release: &str) -> String {
        let config_url = self.project.config_url();
        let scraped = fetch_with_retry(self.client, &config_url, &self.retry)
            .await
            .ok()
            .and_then(|body| {
                BASE_URL_REGEX
                    .captures(&String::from_utf8_lossy(&body))
                    .map(|caps| caps[1].to_string())
            });

        match scraped {
            Some(url) => {
                tracing::info!("Found storage URL '{url}'.");
                url.trim_end_matches('/').to_string()
            }
            None => {
                let default = self.project.default_storage_url(release);
                tracing::warn!(
                    "Could not find the storage URL automatically. Using default '{default}'. \
                     You can also set it manually with `--storage-url`."
                );
                default.trim_end_matches('/').to_string()
            }
        }
    }

    /// Fetches the run listing for the resolved release, in the order the
    /// remote returns it, truncated to `max_runs` when set.
    pub async fn list_runs(
        &self,
        resolution: &Resolution,
        max_runs: Option<usize>,
    ) -> Result<Vec<Run>, SyncError> {
        let release_url = self
            .project
            .release_url(&resolution.storage_root, &resolution.release);

        let specs_url = format!("{release_url}/run_specs.json");
        tracing::info!("Getting run ids from {specs_url}");
        let run_specs: Vec<RunSpecJson> = self.fetch_json(&specs_url).await?;

        let mut runs = if self.project.maps_run_suites() {
            let suites_url = format!("{release_url}/runs_to_run_suites.json");
            let suites: HashMap<String, String> = self.fetch_json(&suites_url).await?;
            run_specs
                .into_iter()
                .map(|spec| {
                    let suite = suites
                        .get(&spec.name)
                        .cloned()
                        .unwrap_or_else(|| resolution.release.clone());
                    Run {
                        id: spec.name,
                        suite,
                    }
                })
                .collect()
        } else {
            run_specs
                .into_iter()
                .map(|spec| Run {
                    id: spec.name,
                    suite: resolution.release.clone(),
                })
                .collect::<Vec<_>>()
        };

        // Prefix truncation in listing order; never re-sorted.
        if let Some(cap) = max_runs {
            runs.truncate(cap);
        }

        Ok(runs)
    }

    async fn fetch_json<T: serde::de::DeserializeOwned>(
        &self,
        url: &str,
    ) -> Result<T, SyncError> {
        let body = fetch_with_retry(self.client, url, &self.retry)
            .await
            .map_err(|e| SyncError::CatalogUnavailable(format!("{url}: {e}")))?;
        serde_json::from_slice(&body).map_err(|e| {
            SyncError::CatalogUnavailable(format!("Malformed listing at {url}: {e}"))
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_helpers::mock_storage_client::{MockResponse, MockStorageClient};

    fn retry() -> RetryPolicy {
        RetryPolicy {
            max_attempts: 2,
            initial_backoff: std::time::Duration::from_millis(1),
        }
    }

    fn classic_config_js(release: &str) -> Vec<u8> {
        format!(
            "window.BENCHMARK_OUTPUT_BASE_URL = \"https://example.com/output/\";\n\
             window.SUITE = null;\n\
             window.RELEASE = \"{release}\";\n"
        )
        .into_bytes()
    }

    #[tokio::test]
    async fn test_resolve_latest_scrapes_config_js() {
        let client = MockStorageClient::new();
        client.insert(
            "https://crfm.stanford.edu/helm/classic/latest/config.js",
            classic_config_js("v0.4.0"),
        );

        let catalog = RemoteCatalog::new(&client, Project::Classic, retry());
        let resolution = catalog.resolve(LATEST, None).await.unwrap();
        assert_eq!(
            resolution,
            Resolution {
                release: "v0.4.0".to_string(),
                storage_root: "https://example.com/output".to_string(),
            }
        );
    }

    #[tokio::test]
    async fn test_resolve_latest_picks_highest_version() {
        let client = MockStorageClient::new();
        client.insert(
            "https://crfm.stanford.edu/helm/classic/latest/config.js",
            b"window.RELEASE = \"v0.9.0\";\nwindow.RELEASE = \"v0.10.0\";\n".to_vec(),
        );

        let catalog = RemoteCatalog::new(&client, Project::Classic, retry());
        let resolution = catalog.resolve(LATEST, Some("https://mirror.test")).await.unwrap();
        assert_eq!(resolution.release, "v0.10.0");
    }

    #[tokio::test]
    async fn test_resolve_latest_unreachable_is_discovery_error() {
        let client = MockStorageClient::new();

        let catalog = RemoteCatalog::new(&client, Project::Classic, retry());
        let err = catalog.resolve(LATEST, None).await.unwrap_err();
        assert!(matches!(err, SyncError::Discovery(_)));
    }

    #[tokio::test]
    async fn test_explicit_release_with_override_needs_no_discovery() {
        let client = MockStorageClient::new();

        let catalog = RemoteCatalog::new(&client, Project::Classic, retry());
        let resolution = catalog
            .resolve("v0.3.0", Some("https://mirror.test/output/"))
            .await
            .unwrap();
        assert_eq!(resolution.release, "v0.3.0");
        assert_eq!(resolution.storage_root, "https://mirror.test/output");
        assert_eq!(client.total_requests(), 0);
    }

    #[tokio::test]
    async fn test_storage_discovery_falls_back_to_default() {
        let client = MockStorageClient::new();

        let catalog = RemoteCatalog::new(&client, Project::Classic, retry());
        let resolution = catalog.resolve("v0.4.0", None).await.unwrap();
        assert_eq!(
            resolution.storage_root,
            "https://storage.googleapis.com/crfm-helm-public/benchmark_output"
        );
    }

    #[tokio::test]
    async fn test_list_runs_maps_suites_and_preserves_order() {
        let client = MockStorageClient::new();
        client.insert(
            "https://mirror.test/releases/v0.4.0/run_specs.json",
            br#"[{"name": "r2"}, {"name": "r1"}, {"name": "r3"}]"#.to_vec(),
        );
        client.insert(
            "https://mirror.test/releases/v0.4.0/runs_to_run_suites.json",
            br#"{"r1": "v0.3.0", "r2": "v0.4.0"}"#.to_vec(),
        );

        let catalog = RemoteCatalog::new(&client, Project::Classic, retry());
        let resolution = Resolution {
            release: "v0.4.0".to_string(),
            storage_root: "https://mirror.test".to_string(),
        };
        let runs = catalog.list_runs(&resolution, None).await.unwrap();

        // Listing order kept; unmapped runs fall back to the release.
        assert_eq!(
            runs,
            vec![
                Run { id: "r2".to_string(), suite: "v0.4.0".to_string() },
                Run { id: "r1".to_string(), suite: "v0.3.0".to_string() },
                Run { id: "r3".to_string(), suite: "v0.4.0".to_string() },
            ]
        );
    }

    #[tokio::test]
    async fn test_list_runs_heim_uses_release_as_suite() {
        let client = MockStorageClient::new();
        client.insert(
            "https://mirror.test/runs/v1.1.0/run_specs.json",
            br#"[{"name": "r1"}]"#.to_vec(),
        );

        let catalog = RemoteCatalog::new(&client, Project::Heim, retry());
        let resolution = Resolution {
            release: "v1.1.0".to_string(),
            storage_root: "https://mirror.test".to_string(),
        };
        let runs = catalog.list_runs(&resolution, None).await.unwrap();
        assert_eq!(runs[0].suite, "v1.1.0");
        // HEIM has no runs_to_run_suites.json; only one listing fetch.
        assert_eq!(client.total_requests(), 1);
    }

    #[tokio::test]
    async fn test_max_runs_is_prefix_truncation() {
        let client = MockStorageClient::new();
        client.insert(
            "https://mirror.test/runs/v1.1.0/run_specs.json",
            br#"[{"name": "b"}, {"name": "a"}, {"name": "c"}]"#.to_vec(),
        );

        let catalog = RemoteCatalog::new(&client, Project::Heim, retry());
        let resolution = Resolution {
            release: "v1.1.0".to_string(),
            storage_root: "https://mirror.test".to_string(),
        };
        let runs = catalog.list_runs(&resolution, Some(2)).await.unwrap();
        let ids: Vec<_> = runs.iter().map(|r| r.id.as_str()).collect();
        assert_eq!(ids, vec!["b", "a"]);
    }

    #[tokio::test]
    async fn test_malformed_listing_is_catalog_unavailable() {
        let client = MockStorageClient::new();
        client.insert(
            "https://mirror.test/runs/v1.1.0/run_specs.json",
            b"<html>not json</html>".to_vec(),
        );

        let catalog = RemoteCatalog::new(&client, Project::Heim, retry());
        let resolution = Resolution {
            release: "v1.1.0".to_string(),
            storage_root: "https://mirror.test".to_string(),
        };
        let err = catalog.list_runs(&resolution, None).await.unwrap_err();
        assert!(matches!(err, SyncError::CatalogUnavailable(_)));
    }

    #[tokio::test]
    async fn test_unreachable_listing_retries_then_fails() {
        let client = MockStorageClient::new();
        client.insert_response(
            "https://mirror.test/runs/v1.1.0/run_specs.json",
            MockResponse::Transient("HTTP 500".to_string()),
        );

        let catalog = RemoteCatalog::new(&client, Project::Heim, retry());
        let resolution = Resolution {
            release: "v1.1.0".to_string(),
            storage_root: "https://mirror.test".to_string(),
        };
        let err = catalog.list_runs(&resolution, None).await.unwrap_err();
        assert!(matches!(err, SyncError::CatalogUnavailable(_)));
        assert_eq!(
            client.request_count("https://mirror.test/runs/v1.1.0/run_specs.json"),
            2
        );
    }

    #[test]
    fn test_path_safe_id_encodes_reserved_characters() {
        let run = Run {
            id: "babi_qa:task=15,model=AlephAlpha_luminous-base".to_string(),
            suite: "v0.4.0".to_string(),
        };
        assert_eq!(
            run.path_safe_id(),
            "babi_qa%3Atask%3D15%2Cmodel%3DAlephAlpha_luminous-base"
        );
    }
}
