//! Types that represent the core data model, such as `Transaction` and `CategoryLabel`, and the
//! ordering of transactions for display.
mod amount;
pub mod category;
pub mod sort;
pub(crate) mod transaction;

pub use amount::{Amount, AmountError, RawAmount};
pub use category::{Categorization, CategoryLabel};
pub use sort::{sort, SortConfig, SortDirection, SortKey};
pub use transaction::{
    normalize, Transaction, TransactionDate, TransactionId, TransactionRecord,
    WithdrawalOrDeposit,
};
