use crate::api::Mode;
use crate::commands::{controller, Out};
use crate::model::{Amount, SortConfig, SortKey, Transaction};
use crate::{Config, Result};
use serde::{Deserialize, Serialize};

/// The structured output of `duckle list`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Listing {
    pub sort: SortConfig,
    /// The transactions in display order.
    pub transactions: Vec<Transaction>,
}

/// Fetches the transactions and lists them in display order.
///
/// Each entry of `sort` is applied as if the user clicked that column header, so giving the same
/// key twice in a row sorts it descending.
pub async fn list(config: Config, mode: Mode, sort: &[SortKey]) -> Result<Out<Listing>> {
    let controller = controller(&config, mode)?;
    controller.refresh().await?;

    let mut view = controller.view().await;
    for &key in sort {
        view.request_sort(key);
    }
    let transactions: Vec<Transaction> = view.projection().into_iter().cloned().collect();
    let listing = Listing {
        sort: view.sort_config(),
        transactions,
    };
    Ok(Out::new(render(&listing), listing))
}

fn render(listing: &Listing) -> String {
    let mut s = format!(
        "{} transactions sorted by {} {}\n",
        listing.transactions.len(),
        listing.sort.key(),
        listing.sort.direction()
    );
    s.push_str(&format!(
        "{:>6}  {:<10}  {:<10}  {:<20}  {:<32}  {:>12}  {:>12}  Category\n",
        "Id", "Date", "Kind", "Type", "Details", "Amount", "Balance"
    ));
    for t in &listing.transactions {
        s.push_str(&format!(
            "{:>6}  {:<10}  {:<10}  {:<20}  {:<32}  {:>12}  {:>12}  {}\n",
            t.id().to_string(),
            t.date().to_string(),
            t.withdrawal_or_deposit().to_string(),
            t.transaction_type().unwrap_or_default(),
            t.details(),
            currency(t.amount()),
            currency(t.balance()),
            t.category_token().unwrap_or_default()
        ));
    }
    s
}

fn currency(amount: Option<Amount>) -> String {
    amount
        .map(|a| a.to_currency())
        .unwrap_or_else(|| "?".to_string())
}
