//! Builds an authenticated GitHub client from the configured credentials.

use std::sync::Arc;

use github_client::{
    authenticate_with_access_token, create_app_client, create_token_client, GitHubClient,
};
use tracing::{debug, info};

use crate::{
    config::{Credentials, GitHubConfig},
    errors::Error,
};

#[cfg(test)]
#[path = "auth_tests.rs"]
mod tests;

/// Authenticates with GitHub using either a token from the environment or GitHub App
/// credentials.
///
/// # Errors
///
/// Returns [`Error::Auth`] if the token variable is unset or empty, the private key cannot be
/// read, or GitHub rejects the credentials.
pub async fn connect(config: &GitHubConfig) -> Result<Arc<GitHubClient>, Error> {
    let api_url = config.api_url.as_deref();

    let octocrab = match config.credentials()? {
        Credentials::Token { env_var } => {
            debug!(env_var, "Authenticating with a token");
            let token = std::env::var(env_var)
                .ok()
                .filter(|token| !token.trim().is_empty())
                .ok_or_else(|| {
                    Error::Auth(format!("Environment variable {} is not set", env_var))
                })?;
            create_token_client(&token, api_url).map_err(|e| Error::Auth(e.to_string()))?
        }
        Credentials::App {
            app_id,
            private_key_path,
            installation_id,
        } => {
            debug!(app_id, installation_id, "Authenticating as a GitHub App");
            let private_key = tokio::fs::read_to_string(private_key_path)
                .await
                .map_err(|e| {
                    Error::Auth(format!(
                        "Failed to read private key {:?}: {}",
                        private_key_path, e
                    ))
                })?;
            let app = create_app_client(app_id, &private_key, api_url)
                .await
                .map_err(|e| Error::Auth(e.to_string()))?;
            authenticate_with_access_token(&app, installation_id)
                .await
                .map_err(|e| Error::Auth(e.to_string()))?
        }
    };

    info!("Authenticated with GitHub");
    Ok(Arc::new(GitHubClient::new(octocrab)))
}
