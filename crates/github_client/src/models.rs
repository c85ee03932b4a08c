//! # Models
//!
//! Small types shared by several GitHub resources.

use serde::{Deserialize, Serialize};

#[cfg(test)]
#[path = "models_tests.rs"]
mod tests;

/// A reference to a GitHub account (user or organization) embedded in another resource.
///
/// # Examples
///
/// ```rust
/// use github_client::models::AccountRef;
///
/// let owner = AccountRef {
///     id: 12345,
///     login: "octocat".to_string(),
/// };
///
/// assert!(owner.is("OctoCat"));
/// ```
#[derive(Clone, Debug, Default, PartialEq, Eq, Deserialize, Serialize)]
pub struct AccountRef {
    /// The unique numeric ID of the account
    pub id: u64,
    /// The login name of the account
    pub login: String,
}

impl AccountRef {
    /// Compares the login with `login`, ignoring ASCII case as GitHub does.
    pub fn is(&self, login: &str) -> bool {
        self.login.eq_ignore_ascii_case(login)
    }
}

/// A GitHub user account as returned by `GET /users/{login}`.
#[derive(Clone, Debug, Default, Deserialize, Serialize)]
pub struct User {
    /// The unique numeric ID of the user
    pub id: u64,
    /// The login name of the user
    pub login: String,
    /// The node ID for GraphQL operations
    #[serde(default)]
    pub node_id: String,
}

/// A GitHub App as returned by `GET /apps/{app_slug}`.
#[derive(Clone, Debug, Default, Deserialize, Serialize)]
pub struct App {
    pub id: u64,
    pub slug: String,
    /// The node ID for GraphQL operations
    #[serde(default)]
    pub node_id: String,
}
