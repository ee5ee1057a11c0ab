//! The remote store that holds the source of truth for transactions and categories.
//!
//! `RemoteStore` is the seam between the view-state engine and the statement server. It is
//! implemented over HTTP by `HttpStore` and in memory by `TestStore`.

mod http;
mod test_store;

use crate::error::Res;
use crate::model::{TransactionId, TransactionRecord};
use crate::Config;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

pub(crate) use http::HttpStore;
pub(crate) use test_store::TestStore;
#[cfg(test)]
pub(crate) use test_store::TestStoreState;

/// When this environment variable is set to a non-empty value, the in-memory `TestStore` is used
/// in place of the statement server.
const DUCKLE_IN_TEST_MODE: &str = "DUCKLE_IN_TEST_MODE";

/// The operations the statement server offers.
///
/// Every error carries a human-readable reason. A request that times out is an error like any
/// other.
#[async_trait::async_trait]
pub trait RemoteStore: Send + Sync {
    /// Fetches the full transaction collection.
    async fn fetch_transactions(&self) -> Res<Vec<TransactionRecord>>;

    /// Persists the category fields of one transaction.
    async fn set_category(
        &self,
        id: TransactionId,
        category: &str,
        subcategory: &str,
    ) -> Res<()>;

    /// Fetches the selectable category tokens, e.g. `Grocery` or `Home -> Home Improvement`.
    async fn fetch_categories(&self) -> Res<Vec<String>>;

    /// Adds a selectable category token.
    async fn add_category(&self, name: &str) -> Res<()>;

    /// Sends a bank statement to be parsed and imported.
    async fn upload_statement(&self, file_name: &str, contents: Vec<u8>) -> Res<UploadSummary>;
}

/// What the statement server reports after importing a statement.
#[derive(Debug, Default, Clone, Eq, PartialEq, Serialize, Deserialize)]
pub struct UploadSummary {
    pub message: String,
    /// The number of transactions that were parsed from the statement.
    pub imported: usize,
}

/// Whether to talk to the statement server or to the in-memory test store.
#[derive(Debug, Default, Clone, Copy, Eq, PartialEq)]
pub enum Mode {
    #[default]
    Http,
    Test,
}

impl Mode {
    /// Returns `Mode::Test` when `DUCKLE_IN_TEST_MODE` is set and non-empty.
    pub fn from_env() -> Self {
        match std::env::var(DUCKLE_IN_TEST_MODE) {
            Ok(value) if !value.is_empty() => Mode::Test,
            _ => Mode::Http,
        }
    }
}

/// Creates the remote store for `mode`.
pub(crate) fn remote(config: &Config, mode: Mode) -> Res<Arc<dyn RemoteStore>> {
    Ok(match mode {
        Mode::Http => Arc::new(HttpStore::new(config)?),
        Mode::Test => Arc::new(TestStore::new(config.remote_url().as_str())),
    })
}
