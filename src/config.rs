//! Configuration file handling for duckle.
//!
//! The configuration file is stored at `$DUCKLE_HOME/config.json` and holds the base URL of the
//! statement server and the request timeout.

use crate::error::{ErrorType, IntoResult, Res};
use crate::{utils, Result};
use anyhow::{bail, ensure, Context};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use url::Url;

const APP_NAME: &str = "duckle";
const CONFIG_VERSION: u8 = 1;
const CONFIG_JSON: &str = "config.json";
const DEFAULT_TIMEOUT_SECS: u64 = 30;

/// The address of the statement server when it runs locally with its defaults.
pub const DEFAULT_REMOTE_URL: &str = "http://localhost:5000/api/";

/// The `Config` object represents the configuration of the app. You instantiate it by providing
/// the path to `$DUCKLE_HOME` and from there it loads `$DUCKLE_HOME/config.json`.
#[derive(Debug, Clone)]
pub struct Config {
    root: PathBuf,
    config_path: PathBuf,
    config_file: ConfigFile,
    remote_url: Url,
}

impl Config {
    /// Creates the data directory and an initial `config.json` pointing at `remote_url`.
    ///
    /// # Arguments
    /// - `dir` - The directory that will be the root of data directory, e.g. `$HOME/duckle`
    /// - `remote_url` - The base URL of the statement server, e.g. `http://localhost:5000/api/`
    ///
    /// # Errors
    /// - `ErrorType::Config` if the URL is invalid or any file operation fails.
    pub async fn create(dir: impl Into<PathBuf>, remote_url: &str) -> Result<Self> {
        Self::create_inner(dir.into(), remote_url)
            .await
            .pub_result(ErrorType::Config)
    }

    /// Validates that `duckle_home` and its config file exist and loads them.
    ///
    /// # Errors
    /// - `ErrorType::Config` if the directory or file is missing or invalid.
    pub async fn load(duckle_home: impl Into<PathBuf>) -> Result<Self> {
        Self::load_inner(duckle_home.into())
            .await
            .pub_result(ErrorType::Config)
    }

    async fn create_inner(maybe_relative: PathBuf, remote_url: &str) -> Res<Self> {
        let remote_url = parse_remote_url(remote_url)?;
        utils::make_dir(&maybe_relative)
            .await
            .context("Unable to create the duckle home directory")?;
        let root = utils::canonicalize(&maybe_relative).await?;
        let config_path = root.join(CONFIG_JSON);

        let config_file = ConfigFile {
            app_name: APP_NAME.to_string(),
            config_version: CONFIG_VERSION,
            remote_url: remote_url.to_string(),
            request_timeout_secs: None,
        };
        config_file.save(&config_path).await?;

        Ok(Self {
            root,
            config_path,
            config_file,
            remote_url,
        })
    }

    async fn load_inner(maybe_relative: PathBuf) -> Res<Self> {
        let root = utils::canonicalize(&maybe_relative)
            .await
            .context("Duckle home is missing")?;
        if !root.is_dir() {
            bail!("Duckle home is not a directory '{}'", root.display())
        }

        let config_path = root.join(CONFIG_JSON);
        if !config_path.is_file() {
            bail!("The config file is missing '{}'", config_path.display())
        }
        let config_file = ConfigFile::load(&config_path).await?;
        let remote_url = parse_remote_url(&config_file.remote_url)
            .with_context(|| format!("Invalid remote_url in {}", config_path.display()))?;

        Ok(Self {
            root,
            config_path,
            config_file,
            remote_url,
        })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn config_path(&self) -> &Path {
        &self.config_path
    }

    /// The base URL of the statement server. It always ends with `/`.
    pub fn remote_url(&self) -> &Url {
        &self.remote_url
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(
            self.config_file
                .request_timeout_secs
                .unwrap_or(DEFAULT_TIMEOUT_SECS),
        )
    }
}

/// Parses the base URL of the statement server and makes sure it ends with `/` so that endpoint
/// names can be joined onto it.
fn parse_remote_url(s: &str) -> Res<Url> {
    let mut url = Url::parse(s.trim()).with_context(|| format!("Invalid URL '{s}'"))?;
    ensure!(
        matches!(url.scheme(), "http" | "https"),
        "The remote URL must use http or https, got '{}'",
        url.scheme()
    );
    if !url.path().ends_with('/') {
        let path = format!("{}/", url.path());
        url.set_path(&path);
    }
    Ok(url)
}

/// Represents the serialization and deserialization format of the configuration file.
///
/// Example configuration:
/// ```json
/// {
///   "app_name": "duckle",
///   "config_version": 1,
///   "remote_url": "http://localhost:5000/api/",
///   "request_timeout_secs": 30
/// }
/// ```
#[derive(Debug, Clone, Serialize, Deserialize, Eq, PartialEq)]
struct ConfigFile {
    /// Application name, should always be "duckle"
    app_name: String,

    /// Configuration file version
    config_version: u8,

    /// Base URL of the statement server
    remote_url: String,

    /// Seconds before a request to the statement server is abandoned. Defaults to 30.
    #[serde(skip_serializing_if = "Option::is_none")]
    request_timeout_secs: Option<u64>,
}

impl Default for ConfigFile {
    fn default() -> Self {
        Self {
            app_name: APP_NAME.to_string(),
            config_version: CONFIG_VERSION,
            remote_url: DEFAULT_REMOTE_URL.to_string(),
            request_timeout_secs: None,
        }
    }
}

impl ConfigFile {
    /// Loads a ConfigFile from the specified path.
    ///
    /// # Errors
    /// Returns an error if the file cannot be read or parsed, or if it belongs to another app.
    async fn load(path: impl AsRef<Path>) -> Res<Self> {
        let config: ConfigFile = utils::deserialize(path.as_ref()).await?;
        ensure!(
            config.app_name == APP_NAME,
            "Invalid app_name in config file: expected '{}', got '{}'",
            APP_NAME,
            config.app_name
        );
        Ok(config)
    }

    /// Saves the ConfigFile to the specified path.
    async fn save(&self, path: impl AsRef<Path>) -> Res<()> {
        let data = serde_json::to_string_pretty(self).context("Unable to serialize config")?;
        utils::write(path.as_ref(), data)
            .await
            .context("Unable to write config file")
    }
}
