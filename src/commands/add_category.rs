use crate::api::Mode;
use crate::commands::{controller, Out};
use crate::{Config, Result};

/// Adds a category that can be assigned to transactions.
///
/// # Errors
/// - `ErrorType::Request` if `name` is blank.
/// - `ErrorType::Remote` if the statement server rejected it, e.g. because it already exists.
pub async fn add_category(config: Config, mode: Mode, name: &str) -> Result<Out<()>> {
    let added = controller(&config, mode)?.add_category(name).await?;
    Ok(format!("Added category '{added}'").into())
}
