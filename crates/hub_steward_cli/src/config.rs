//! Configuration management for the HubSteward CLI.
//!
//! The configuration is stored in TOML format and names how to authenticate with GitHub,
//! where the record files live and how passes are bounded.

use std::{
    fs,
    path::{Path, PathBuf},
    time::Duration,
};

use hub_steward_core::ControllerSettings;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::errors::Error;

/// Default configuration file name
pub const DEFAULT_CONFIG_FILENAME: &str = "hub-steward.toml";

/// Default directory holding the record files, relative to the working directory
pub const DEFAULT_RECORDS_DIR: &str = "records";

/// Default environment variable holding a GitHub token
pub const DEFAULT_TOKEN_ENV: &str = "GITHUB_TOKEN";

#[cfg(test)]
#[path = "config_tests.rs"]
mod tests;

/// Main configuration structure for the HubSteward CLI application.
///
/// # Example TOML Configuration
///
/// ```toml
/// [github]
/// app_id = 123456
/// private_key_path = "/etc/hub-steward/app.pem"
/// installation_id = 7890
///
/// [reconciler]
/// records_dir = "/var/lib/hub-steward/records"
/// pass_timeout_secs = 120
/// ```
#[derive(Debug, Default, Serialize, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub github: GitHubConfig,

    #[serde(default)]
    pub reconciler: ReconcilerConfig,
}

impl AppConfig {
    /// Loads and validates configuration from a TOML file.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`] if the file does not exist, cannot be read, is not valid
    /// TOML, or holds values that fail validation.
    ///
    /// # Example
    ///
    /// ```rust,no_run
    /// use std::path::Path;
    /// use hub_steward_cli::config::AppConfig;
    ///
    /// match AppConfig::load(Path::new("./hub-steward.toml")) {
    ///     Ok(config) => println!("Records in {:?}", config.reconciler.records_dir),
    ///     Err(e) => eprintln!("Failed to load config: {}", e),
    /// }
    /// ```
    pub fn load(path: &Path) -> Result<Self, Error> {
        debug!("Loading configuration from {:?}", path);

        if !path.exists() {
            return Err(Error::Config(format!(
                "Configuration file not found: {:?}",
                path
            )));
        }

        let content = fs::read_to_string(path)
            .map_err(|e| Error::Config(format!("Failed to read configuration file: {}", e)))?;

        let config: AppConfig = toml::from_str(&content)
            .map_err(|e| Error::Config(format!("Failed to parse configuration file: {}", e)))?;

        config.validate()?;
        Ok(config)
    }

    /// Saves the configuration to a TOML file, creating parent directories as needed.
    pub fn save(&self, path: &Path) -> Result<(), Error> {
        debug!("Saving configuration to {:?}", path);

        let content = toml::to_string_pretty(self)
            .map_err(|e| Error::Config(format!("Failed to serialize configuration: {}", e)))?;

        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)
                .map_err(|e| Error::Config(format!("Failed to create directory: {}", e)))?;
        }

        fs::write(path, content)
            .map_err(|e| Error::Config(format!("Failed to write configuration file: {}", e)))?;

        info!("Configuration saved to {:?}", path);
        Ok(())
    }

    /// Checks values that parse but cannot work.
    pub fn validate(&self) -> Result<(), Error> {
        self.github.credentials()?;

        let reconciler = &self.reconciler;
        for (name, value) in [
            ("pass_timeout_secs", reconciler.pass_timeout_secs),
            ("retry_delay_secs", reconciler.retry_delay_secs),
            ("resync_interval_secs", reconciler.resync_interval_secs),
        ] {
            if value == 0 {
                return Err(Error::Config(format!("{} must be greater than zero", name)));
            }
        }
        Ok(())
    }
}

/// How to authenticate with GitHub.
///
/// Either `app_id`, `private_key_path` and `installation_id` are all set (GitHub App), or
/// none of them is and a token is read from the `token_env` environment variable.
#[derive(Debug, Default, Serialize, Deserialize)]
pub struct GitHubConfig {
    /// API base URL, for GitHub Enterprise Server
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_url: Option<String>,

    /// Environment variable holding a token; defaults to `GITHUB_TOKEN`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub token_env: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub app_id: Option<u64>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub private_key_path: Option<PathBuf>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub installation_id: Option<u64>,
}

/// The credentials selected by a [`GitHubConfig`].
#[derive(Debug, PartialEq, Eq)]
pub enum Credentials<'a> {
    Token {
        env_var: &'a str,
    },
    App {
        app_id: u64,
        private_key_path: &'a Path,
        installation_id: u64,
    },
}

impl GitHubConfig {
    /// Selects the credentials to authenticate with.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`] when the GitHub App settings are only partly present.
    pub fn credentials(&self) -> Result<Credentials<'_>, Error> {
        match (self.app_id, &self.private_key_path, self.installation_id) {
            (Some(app_id), Some(private_key_path), Some(installation_id)) => Ok(Credentials::App {
                app_id,
                private_key_path,
                installation_id,
            }),
            (None, None, None) => Ok(Credentials::Token {
                env_var: self.token_env.as_deref().unwrap_or(DEFAULT_TOKEN_ENV),
            }),
            _ => Err(Error::Config(
                "app_id, private_key_path and installation_id must be set together".to_string(),
            )),
        }
    }
}

/// Where records live and how passes are bounded.
#[derive(Debug, Serialize, Deserialize)]
pub struct ReconcilerConfig {
    #[serde(default = "ReconcilerConfig::default_records_dir")]
    pub records_dir: PathBuf,

    #[serde(default = "ReconcilerConfig::default_pass_timeout_secs")]
    pub pass_timeout_secs: u64,

    #[serde(default = "ReconcilerConfig::default_retry_delay_secs")]
    pub retry_delay_secs: u64,

    /// Interval between full resyncs in `watch` mode
    #[serde(default = "ReconcilerConfig::default_resync_interval_secs")]
    pub resync_interval_secs: u64,
}

impl ReconcilerConfig {
    fn default_records_dir() -> PathBuf {
        PathBuf::from(DEFAULT_RECORDS_DIR)
    }

    fn default_pass_timeout_secs() -> u64 {
        120
    }

    fn default_retry_delay_secs() -> u64 {
        30
    }

    fn default_resync_interval_secs() -> u64 {
        300
    }

    pub fn controller_settings(&self) -> ControllerSettings {
        ControllerSettings {
            pass_timeout: Duration::from_secs(self.pass_timeout_secs),
            retry_delay: Duration::from_secs(self.retry_delay_secs),
        }
    }

    pub fn resync_interval(&self) -> Duration {
        Duration::from_secs(self.resync_interval_secs)
    }
}

impl Default for ReconcilerConfig {
    fn default() -> Self {
        Self {
            records_dir: Self::default_records_dir(),
            pass_timeout_secs: Self::default_pass_timeout_secs(),
            retry_delay_secs: Self::default_retry_delay_secs(),
            resync_interval_secs: Self::default_resync_interval_secs(),
        }
    }
}

/// Resolves the path to the configuration file.
///
/// Uses `config_path` when given, otherwise `hub-steward.toml` in the current directory.
pub fn get_config_path(config_path: Option<&str>) -> PathBuf {
    if let Some(path) = config_path {
        PathBuf::from(path)
    } else {
        let current_dir = std::env::current_dir().unwrap_or_else(|_| PathBuf::from("."));
        current_dir.join(DEFAULT_CONFIG_FILENAME)
    }
}
