use crate::error::FetchError;
use crate::storage_client::StorageClient;
use std::collections::HashMap;
use std::sync::Mutex;

/// Scripted response for one URL.
#[derive(Clone)]
pub enum MockResponse {
    Ok(Vec<u8>),
    Missing,
    Transient(String),
    Fatal(String),
    /// Fails with a transient error `failures` times, then serves `body`.
    FlakyThenOk { failures: u32, body: Vec<u8> },
}

/// In-memory storage backend for tests. Unrouted URLs behave like a 404.
pub struct MockStorageClient {
    routes: Mutex<HashMap<String, MockResponse>>,
    requests: Mutex<Vec<String>>,
}

impl MockStorageClient {
    pub fn new() -> Self {
        Self {
            routes: Mutex::new(HashMap::new()),
            requests: Mutex::new(Vec::new()),
        }
    }

    pub fn insert(&self, url: &str, body: Vec<u8>) {
        self.insert_response(url, MockResponse::Ok(body));
    }

    pub fn insert_response(&self, url: &str, response: MockResponse) {
        self.routes
            .lock()
            .unwrap()
            .insert(url.to_string(), response);
    }

    pub fn request_count(&self, url: &str) -> usize {
        self.requests
            .lock()
            .unwrap()
            .iter()
            .filter(|r| r.as_str() == url)
            .count()
    }

    pub fn total_requests(&self) -> usize {
        self.requests.lock().unwrap().len()
    }
}

impl Default for MockStorageClient {
    fn default() -> Self {
        Self::new()
    }
}

impl StorageClient for MockStorageClient {
    async fn fetch(&self, url: &str) -> Result<Vec<u8>, FetchError> {
        self.requests.lock().unwrap().push(url.to_string());

        let mut routes = self.routes.lock().unwrap();
        match routes.get_mut(url) {
            None | Some(MockResponse::Missing) => Err(FetchError::Missing),
            Some(MockResponse::Ok(body)) => Ok(body.clone()),
            Some(MockResponse::Transient(reason)) => Err(FetchError::Transient(reason.clone())),
            Some(MockResponse::Fatal(reason)) => Err(FetchError::Fatal(reason.clone())),
            Some(MockResponse::FlakyThenOk { failures, body }) => {
                if *failures > 0 {
                    *failures -= 1;
                    Err(FetchError::Transient("injected failure".to_string()))
                } else {
                    Ok(body.clone())
                }
            }
        }
    }
}
