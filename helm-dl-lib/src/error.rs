use thiserror::Error;

/// Errors that abort a sync before any download is attempted.
#[derive(Error, Debug)]
pub enum SyncError {
    #[error("Could not resolve a release or storage root: {0}")]
    Discovery(String),

    #[error("Could not obtain the run listing: {0}")]
    CatalogUnavailable(String),
}

/// Classification of a single failed fetch.
///
/// `Missing` is non-fatal: some runs legitimately lack some file kinds.
/// `Transient` fetches are retried with backoff before being recorded as
/// failed; `Fatal` fails the task immediately but never the batch.
#[derive(Error, Debug)]
pub enum FetchError {
    #[error("Not found")]
    Missing,

    #[error("Transient error: {0}")]
    Transient(String),

    #[error("{0}")]
    Fatal(String),
}
