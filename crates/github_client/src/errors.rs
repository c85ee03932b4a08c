//! Error types for GitHub client operations.
//!
//! This module defines the error types that can occur when interacting with the GitHub API
//! through the github_client crate. The reconcile engine relies on one distinction above all
//! others: [`Error::NotFound`] means the remote entity is absent, every other variant means the
//! request could not be answered.

#[cfg(test)]
#[path = "errors_tests.rs"]
mod tests;

/// Errors that can occur during GitHub client operations.
///
/// ## Examples
///
/// ```rust,ignore
/// use github_client::Error;
///
/// match client.get_repository("my-org", "my-repo").await {
///     Ok(repo) => println!("Repository found: {}", repo.name),
///     Err(Error::NotFound) => println!("Repository does not exist yet"),
///     Err(err) if err.is_transient() => eprintln!("Retry later: {}", err),
///     Err(err) => eprintln!("Other error: {}", err),
/// }
/// ```
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// GitHub answered with a non-success status that has no more specific variant.
    #[error("GitHub API request failed with status {status}: {message}")]
    Api { status: u16, message: String },

    /// Authentication or GitHub client initialization failure.
    ///
    /// This error occurs when:
    /// - GitHub App credentials are invalid or expired
    /// - The token was rejected by the API (HTTP 401)
    /// - The client could not be built from the supplied credentials
    #[error("Failed to authenticate or initialize GitHub client: {0}")]
    AuthError(String),

    /// Error deserializing the response from GitHub.
    #[error("Failed to deserialize GitHub response: {0}")]
    Deserialization(#[from] serde_json::Error),

    /// The GraphQL endpoint reported errors other than a missing node.
    #[error("GraphQL request failed: {0}")]
    GraphQl(String),

    /// The GitHub API returned a response in an unexpected format.
    ///
    /// This error indicates that the API response structure doesn't match
    /// what the client expects, for example a page that claims a successor
    /// but carries no continuation cursor.
    #[error("Invalid response format: {0}")]
    InvalidResponse(String),

    /// The requested resource was not found.
    ///
    /// Raised for HTTP 404 responses, for GraphQL `NOT_FOUND` errors and for GraphQL
    /// lookups that resolve to a null node.
    #[error("Resource not found")]
    NotFound,

    /// GitHub API rate limit has been exceeded.
    ///
    /// The caller is expected to retry the whole operation later. This client performs
    /// no backoff of its own.
    #[error("Rate limit exceeded")]
    RateLimitExceeded,

    /// The request never produced an HTTP response (connection, TLS or URI failures).
    #[error("Transport failure: {0}")]
    Transport(String),
}

impl Error {
    /// Returns `true` if the error reports that the remote entity does not exist.
    pub fn is_not_found(&self) -> bool {
        matches!(self, Error::NotFound)
    }

    /// Returns `true` if repeating the same request later may succeed.
    pub fn is_transient(&self) -> bool {
        match self {
            Error::RateLimitExceeded | Error::Transport(_) => true,
            Error::Api { status, .. } => *status >= 500,
            _ => false,
        }
    }
}
