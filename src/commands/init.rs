use crate::commands::Out;
use crate::{Config, Result};
use std::path::Path;

/// Creates the data directory and an initial `config.json` pointing at `remote_url`.
///
/// # Arguments
/// - `duckle_home` - The directory that will be the root of data directory, e.g. `$HOME/duckle`
/// - `remote_url` - The base URL of the statement server, e.g. `http://localhost:5000/api/`
///
/// # Errors
/// - `ErrorType::Config` if the URL is invalid or any file operation fails.
pub async fn init(duckle_home: &Path, remote_url: &str) -> Result<Out<()>> {
    let config = Config::create(duckle_home, remote_url).await?;
    Ok(format!(
        "Successfully created {} using the statement server at {}",
        config.config_path().display(),
        config.remote_url()
    )
    .into())
}
