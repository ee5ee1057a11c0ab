//! Ordering of transactions for display.
//!
//! Sorting never touches the collection it is given; it produces a new sequence of references.
//! The sort is stable, so ties keep their input order and re-sorting unchanged data gives the
//! same result every time.

use crate::model::Transaction;
use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::borrow::Cow;
use std::cmp::Ordering;

/// The transaction field that a projection is ordered by.
#[derive(
    Debug,
    Default,
    Clone,
    Copy,
    Eq,
    PartialEq,
    Ord,
    PartialOrd,
    Hash,
    Serialize,
    Deserialize,
    clap::ValueEnum,
)]
#[serde(rename_all = "snake_case")]
#[value(rename_all = "snake_case")]
pub enum SortKey {
    #[default]
    Date,
    WithdrawalOrDeposit,
    Details,
    Amount,
    Balance,
    Category,
}

serde_plain::derive_display_from_serialize!(SortKey);
serde_plain::derive_fromstr_from_deserialize!(SortKey);

#[derive(
    Debug, Default, Clone, Copy, Eq, PartialEq, Ord, PartialOrd, Hash, Serialize, Deserialize,
)]
#[serde(rename_all = "snake_case")]
pub enum SortDirection {
    #[default]
    Ascending,
    Descending,
}

serde_plain::derive_display_from_serialize!(SortDirection);
serde_plain::derive_fromstr_from_deserialize!(SortDirection);

impl SortDirection {
    pub fn toggled(self) -> Self {
        match self {
            SortDirection::Ascending => SortDirection::Descending,
            SortDirection::Descending => SortDirection::Ascending,
        }
    }

    /// Flips the sign of a comparison for descending order.
    fn apply(self, ordering: Ordering) -> Ordering {
        match self {
            SortDirection::Ascending => ordering,
            SortDirection::Descending => ordering.reverse(),
        }
    }
}

/// Which field a projection is sorted by, and in which direction. Defaults to date ascending.
#[derive(
    Debug, Default, Clone, Copy, Eq, PartialEq, Ord, PartialOrd, Hash, Serialize, Deserialize,
)]
pub struct SortConfig {
    key: SortKey,
    direction: SortDirection,
}

impl SortConfig {
    pub fn new(key: SortKey, direction: SortDirection) -> Self {
        Self { key, direction }
    }

    pub fn key(&self) -> SortKey {
        self.key
    }

    pub fn direction(&self) -> SortDirection {
        self.direction
    }

    /// The config that results from a user asking to sort by `key`: the same key flips the
    /// direction, a different key starts over in ascending order.
    pub fn requested(self, key: SortKey) -> Self {
        if key == self.key {
            Self::new(key, self.direction.toggled())
        } else {
            Self::new(key, SortDirection::Ascending)
        }
    }
}

/// Returns the transactions in the order given by `config`. The input is not modified.
///
/// Amounts and balances compare numerically and dates chronologically. Values that could not be
/// parsed sort after all others regardless of direction. Every other key compares as text, byte
/// by byte.
pub fn sort(transactions: &[Transaction], config: SortConfig) -> Vec<&Transaction> {
    sorted_indices(transactions, config)
        .into_iter()
        .map(|ix| &transactions[ix])
        .collect()
}

/// Returns the positions of `transactions` in sorted order.
pub(crate) fn sorted_indices(transactions: &[Transaction], config: SortConfig) -> Vec<usize> {
    let keys: Vec<SortValue<'_>> = transactions
        .iter()
        .map(|t| SortValue::of(t, config.key))
        .collect();
    let mut indices: Vec<usize> = (0..transactions.len()).collect();
    // `sort_by` is stable.
    indices.sort_by(|&a, &b| keys[a].compare(&keys[b], config.direction));
    indices
}

/// The value of a transaction's sort field, extracted once per sort.
enum SortValue<'a> {
    Number(Option<Decimal>),
    Date(Option<NaiveDate>),
    Text(Cow<'a, str>),
}

impl<'a> SortValue<'a> {
    fn of(transaction: &'a Transaction, key: SortKey) -> Self {
        match key {
            SortKey::Date => SortValue::Date(transaction.date().value()),
            SortKey::Amount => SortValue::Number(transaction.amount().map(|a| a.value())),
            SortKey::Balance => SortValue::Number(transaction.balance().map(|a| a.value())),
            SortKey::WithdrawalOrDeposit => {
                SortValue::Text(Cow::Borrowed(transaction.withdrawal_or_deposit().as_str()))
            }
            SortKey::Details => SortValue::Text(Cow::Borrowed(transaction.details())),
            // Subcategories do not take part, rows in the same category keep their order.
            SortKey::Category => {
                SortValue::Text(Cow::Borrowed(transaction.category().unwrap_or_default()))
            }
        }
    }

    fn compare(&self, other: &Self, direction: SortDirection) -> Ordering {
        match (self, other) {
            (SortValue::Number(a), SortValue::Number(b)) => unparsable_last(a, b, direction),
            (SortValue::Date(a), SortValue::Date(b)) => unparsable_last(a, b, direction),
            (SortValue::Text(a), SortValue::Text(b)) => {
                direction.apply(a.as_bytes().cmp(b.as_bytes()))
            }
            // All values in one sort come from the same key.
            _ => Ordering::Equal,
        }
    }
}

fn unparsable_last<T: Ord>(a: &Option<T>, b: &Option<T>, direction: SortDirection) -> Ordering {
    match (a, b) {
        (Some(a), Some(b)) => direction.apply(a.cmp(b)),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    }
}
