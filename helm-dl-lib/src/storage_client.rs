use crate::config::RetryPolicy;
use crate::error::FetchError;
use reqwest::{Client, StatusCode};
use std::time::Duration;

const REQUEST_TIMEOUT: Duration = Duration::from_secs(60);

/// Transport seam: everything the engine needs from HTTP is
/// "fetch this URL, give me the bytes or a classified error".
pub trait StorageClient {
    fn fetch(&self, url: &str) -> impl Future<Output = Result<Vec<u8>, FetchError>> + Send;
}

/// Production transport over reqwest.
pub struct HttpStorageClient {
    client: Client,
}

impl HttpStorageClient {
    pub fn new() -> Result<Self, FetchError> {
        let client = Client::builder()
            .user_agent(concat!("helm-dl/", env!("CARGO_PKG_VERSION")))
            .timeout(REQUEST_TIMEOUT)
            .build()
            .map_err(|e| FetchError::Fatal(format!("Failed to create HTTP client: {e}")))?;
        Ok(Self { client })
    }
}

impl StorageClient for HttpStorageClient {
    async fn fetch(&self, url: &str) -> Result<Vec<u8>, FetchError> {
        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(classify_transport_error)?;

        let status = response.status();
        if status.is_success() {
            let bytes = response.bytes().await.map_err(classify_transport_error)?;
            return Ok(bytes.to_vec());
        }

        Err(classify_status(status))
    }
}

fn classify_status(status: StatusCode) -> FetchError {
    match status {
        StatusCode::NOT_FOUND | StatusCode::GONE => FetchError::Missing,
        StatusCode::REQUEST_TIMEOUT | StatusCode::TOO_MANY_REQUESTS => {
            FetchError::Transient(format!("HTTP {status}"))
        }
        s if s.is_server_error() => FetchError::Transient(format!("HTTP {status}")),
        s => FetchError::Fatal(format!("Unexpected HTTP status {s}")),
    }
}

fn classify_transport_error(e: reqwest::Error) -> FetchError {
    if e.is_timeout() || e.is_connect() {
        FetchError::Transient(e.to_string())
    } else {
        FetchError::Fatal(e.to_string())
    }
}

/// Fetches `url`, retrying transient failures with exponential backoff
/// within the policy's attempt budget. `Missing` and `Fatal` are returned
/// immediately.
pub async fn fetch_with_retry<C: StorageClient>(
    client: &C,
    url: &str,
    retry: &RetryPolicy,
) -> Result<Vec<u8>, FetchError> {
    let mut attempt = 0;
    loop {
        attempt += 1;
        match client.fetch(url).await {
            Err(FetchError::Transient(reason)) if attempt < retry.max_attempts => {
                let backoff = retry.backoff_after(attempt);
                tracing::debug!(
                    "Transient error fetching {url} (attempt {attempt}/{}): {reason}. \
                     Retrying in {backoff:?}.",
                    retry.max_attempts
                );
                tokio::time::sleep(backoff).await;
            }
            other => return other,
        }
    }
}
