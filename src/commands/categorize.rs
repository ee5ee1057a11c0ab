use crate::api::Mode;
use crate::commands::{controller, Out};
use crate::model::TransactionId;
use crate::sync::Mutation;
use crate::{Config, Result};

/// Sets the category of the transaction with `id` from a category token such as `Grocery` or
/// `Home -> Home Improvement`.
///
/// # Errors
/// - `ErrorType::NotFound` if no transaction has `id`.
/// - `ErrorType::Remote` if the statement server rejected the change. The local change has been
///   undone by then.
pub async fn categorize(
    config: Config,
    mode: Mode,
    id: TransactionId,
    token: &str,
) -> Result<Out<Mutation>> {
    let controller = controller(&config, mode)?;
    controller.refresh().await?;
    let mutation = controller.select_category(id, token).await?;

    let before = mutation
        .snapshot()
        .token()
        .unwrap_or_else(|| "(none)".to_string());
    let after = mutation.requested().token().unwrap_or_default();
    Ok(Out::new(
        format!("Transaction {id}: {before} => {after}"),
        mutation,
    ))
}
