use hub_steward_core::StoreError;
use thiserror::Error;

#[cfg(test)]
#[path = "errors_tests.rs"]
mod tests;

/// Errors that can occur in the HubSteward CLI application.
#[derive(Error, Debug)]
pub enum Error {
    /// Authentication with GitHub failed or no usable credentials were configured.
    #[error("Authentication error: {0}")]
    Auth(String),

    /// The configuration file is missing, unreadable or holds invalid values.
    #[error("Configuration error: {0}")]
    Config(String),

    /// Invalid command-line arguments were provided.
    #[error("Invalid arguments: {0}")]
    InvalidArguments(String),

    /// The record store failed.
    #[error("Record store error: {0}")]
    Store(#[from] StoreError),

    /// One or more records did not converge.
    #[error("{0} record(s) failed to reconcile")]
    ReconcileFailed(usize),
}
