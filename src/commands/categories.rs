use crate::api::Mode;
use crate::commands::{controller, Out};
use crate::{Config, Result};

/// Lists the category tokens that can be assigned to transactions.
pub async fn categories(config: Config, mode: Mode) -> Result<Out<Vec<String>>> {
    let categories = controller(&config, mode)?.categories().await?;
    let mut message = format!("{} categories", categories.len());
    for category in &categories {
        message.push_str("\n  ");
        message.push_str(category);
    }
    Ok(Out::new(message, categories))
}
