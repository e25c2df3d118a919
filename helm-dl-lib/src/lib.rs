pub mod catalog;
pub mod config;
pub mod error;
pub mod executor;
pub mod file_kind;
pub mod logging;
pub mod planner;
pub mod project;
pub mod release;
pub mod storage_client;
pub mod sync;

#[cfg(test)]
pub mod test_helpers;
