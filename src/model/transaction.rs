use crate::error::Res;
use crate::model::{Amount, Categorization, RawAmount};
use anyhow::bail;
use chrono::{DateTime, NaiveDate};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fmt::{Display, Formatter};

/// The date formats that the statement server has been known to produce, tried in order. The
/// two-digit year must come first since `%Y` would accept `25` as the year 25.
const DATE_FORMATS: &[&str] = &["%Y-%m-%d", "%m/%d/%y", "%m/%d/%Y", "%Y/%m/%d"];

/// The stable key of a transaction, assigned by the statement server.
#[derive(
    Default, Debug, Clone, Copy, Eq, PartialEq, Ord, PartialOrd, Hash, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct TransactionId(u64);

impl TransactionId {
    pub const fn new(id: u64) -> Self {
        Self(id)
    }

    pub fn value(&self) -> u64 {
        self.0
    }
}

impl Display for TransactionId {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        Display::fmt(&self.0, f)
    }
}

impl From<u64> for TransactionId {
    fn from(value: u64) -> Self {
        Self(value)
    }
}

impl std::str::FromStr for TransactionId {
    type Err = std::num::ParseIntError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        s.trim().parse().map(Self)
    }
}

/// Whether money left or entered the account.
#[derive(
    Default, Debug, Clone, Copy, Eq, PartialEq, Ord, PartialOrd, Hash, Serialize, Deserialize,
)]
pub enum WithdrawalOrDeposit {
    #[default]
    #[serde(alias = "withdrawal")]
    Withdrawal,
    #[serde(alias = "deposit")]
    Deposit,
}

serde_plain::derive_display_from_serialize!(WithdrawalOrDeposit);
serde_plain::derive_fromstr_from_deserialize!(WithdrawalOrDeposit);

impl WithdrawalOrDeposit {
    pub fn as_str(&self) -> &'static str {
        match self {
            WithdrawalOrDeposit::Withdrawal => "Withdrawal",
            WithdrawalOrDeposit::Deposit => "Deposit",
        }
    }
}

/// A transaction exactly as the statement server sends it.
///
/// `amount` and `balance` may be numbers or numeric strings; nothing here is validated. Convert
/// it into a `Transaction` to normalize it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TransactionRecord {
    pub id: TransactionId,
    pub date: String,
    pub withdrawal_or_deposit: WithdrawalOrDeposit,
    #[serde(default)]
    pub transaction_type: Option<String>,
    pub details: String,
    #[serde(default)]
    pub amount: Option<RawAmount>,
    #[serde(default)]
    pub balance: Option<RawAmount>,
    #[serde(default)]
    pub category: Option<String>,
    #[serde(default)]
    pub subcategory: Option<String>,
}

/// The date of a transaction: the text as received, along with its calendar date when the text
/// could be parsed.
#[derive(Debug, Clone, Eq, PartialEq, Hash, Serialize, Deserialize)]
pub struct TransactionDate {
    text: String,
    value: Option<NaiveDate>,
}

impl TransactionDate {
    pub fn parse(text: impl Into<String>) -> Self {
        let text = text.into();
        let value = parse_date(&text);
        Self { text, value }
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    /// The calendar date, or `None` if the text is not a recognizable date.
    pub fn value(&self) -> Option<NaiveDate> {
        self.value
    }
}

impl Display for TransactionDate {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self.value {
            Some(date) => write!(f, "{}", date.format("%Y-%m-%d")),
            None => f.write_str(&self.text),
        }
    }
}

fn parse_date(text: &str) -> Option<NaiveDate> {
    let trimmed = text.trim();
    if let Ok(datetime) = DateTime::parse_from_rfc3339(trimmed) {
        return Some(datetime.date_naive());
    }
    // Tolerate a time component after the date, e.g. "2025-01-15 00:00:00".
    let date_part = trimmed.split([' ', 'T']).next().unwrap_or(trimmed);
    DATE_FORMATS
        .iter()
        .find_map(|format| NaiveDate::parse_from_str(date_part, format).ok())
}

/// A transaction with its fields normalized for display and sorting.
#[derive(Debug, Clone, Eq, PartialEq, Hash, Serialize, Deserialize)]
pub struct Transaction {
    id: TransactionId,
    date: TransactionDate,
    withdrawal_or_deposit: WithdrawalOrDeposit,
    transaction_type: Option<String>,
    details: String,
    /// `None` when the server sent a value that is not numeric.
    amount: Option<Amount>,
    /// `None` when the server sent a value that is not numeric.
    balance: Option<Amount>,
    categorization: Categorization,
}

impl Transaction {
    pub fn id(&self) -> TransactionId {
        self.id
    }

    pub fn date(&self) -> &TransactionDate {
        &self.date
    }

    pub fn withdrawal_or_deposit(&self) -> WithdrawalOrDeposit {
        self.withdrawal_or_deposit
    }

    pub fn transaction_type(&self) -> Option<&str> {
        self.transaction_type.as_deref()
    }

    pub fn details(&self) -> &str {
        &self.details
    }

    pub fn amount(&self) -> Option<Amount> {
        self.amount
    }

    pub fn balance(&self) -> Option<Amount> {
        self.balance
    }

    pub fn category(&self) -> Option<&str> {
        self.categorization.category.as_deref()
    }

    pub fn subcategory(&self) -> Option<&str> {
        self.categorization.subcategory.as_deref()
    }

    pub fn categorization(&self) -> &Categorization {
        &self.categorization
    }

    /// The display token of the assigned category, e.g. `Food -> Groceries`.
    pub fn category_token(&self) -> Option<String> {
        self.categorization.token()
    }

    /// Replaces the category fields and returns the previous ones.
    pub(crate) fn set_categorization(&mut self, categorization: Categorization) -> Categorization {
        std::mem::replace(&mut self.categorization, categorization)
    }
}

impl From<TransactionRecord> for Transaction {
    fn from(record: TransactionRecord) -> Self {
        Self {
            id: record.id,
            date: TransactionDate::parse(record.date),
            withdrawal_or_deposit: record.withdrawal_or_deposit,
            transaction_type: record.transaction_type,
            details: record.details,
            amount: record.amount.as_ref().and_then(RawAmount::normalize),
            balance: record.balance.as_ref().and_then(RawAmount::normalize),
            categorization: Categorization {
                category: record.category,
                subcategory: record.subcategory,
            },
        }
    }
}

/// Normalizes `records` into transactions, rejecting the whole set if an id appears twice.
pub fn normalize<I>(records: I) -> Res<Vec<Transaction>>
where
    I: IntoIterator<Item = TransactionRecord>,
{
    let mut seen = HashSet::new();
    let mut transactions = Vec::new();
    for record in records {
        if !seen.insert(record.id) {
            bail!("Transaction id {} appears more than once", record.id);
        }
        transactions.push(Transaction::from(record));
    }
    Ok(transactions)
}

#[cfg(test)]
pub(crate) fn record(id: u64, date: &str, amount: &str) -> TransactionRecord {
    TransactionRecord {
        id: TransactionId::new(id),
        date: date.to_string(),
        withdrawal_or_deposit: if amount.trim_start().starts_with('-') {
            WithdrawalOrDeposit::Withdrawal
        } else {
            WithdrawalOrDeposit::Deposit
        },
        transaction_type: None,
        details: format!("Transaction {id}"),
        amount: Some(RawAmount::from(amount)),
        balance: Some(RawAmount::from("1000.00")),
        category: None,
        subcategory: None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal::Decimal;
    use std::str::FromStr;

    #[test]
    fn test_deserialize_wire_shape() {
        let json = r#"[
            {
                "id": 1,
                "date": "2025-01-15",
                "withdrawal_or_deposit": "Withdrawal",
                "transaction_type": "Debit Card Purchase",
                "details": "KROGER #123",
                "amount": -54.2,
                "balance": "1,200.00",
                "category": "Grocery",
                "subcategory": "Grocery"
            },
            {
                "id": 2,
                "date": "2025-01-16",
                "withdrawal_or_deposit": "Deposit",
                "details": "PAYROLL",
                "amount": "2000",
                "balance": 3200,
                "category": null,
                "subcategory": null
            }
        ]"#;
        let records: Vec<TransactionRecord> = serde_json::from_str(json).unwrap();
        let transactions = normalize(records).unwrap();

        let first = &transactions[0];
        assert_eq!(first.id(), TransactionId::new(1));
        assert_eq!(first.transaction_type(), Some("Debit Card Purchase"));
        assert_eq!(first.amount().unwrap().to_string(), "-54.20");
        assert_eq!(
            first.balance().unwrap().value(),
            Decimal::from_str("1200").unwrap()
        );
        assert_eq!(first.category_token().as_deref(), Some("Grocery"));

        let second = &transactions[1];
        assert_eq!(second.withdrawal_or_deposit(), WithdrawalOrDeposit::Deposit);
        assert_eq!(second.transaction_type(), None);
        assert_eq!(second.balance().unwrap().to_string(), "3200.00");
        assert_eq!(second.category(), None);
        assert_eq!(second.category_token(), None);
    }

    #[test]
    fn test_non_numeric_amount_is_none() {
        let mut r = record(1, "2025-01-01", "12.00");
        r.amount = Some(RawAmount::from("pending"));
        r.balance = None;
        let transaction = Transaction::from(r);
        assert_eq!(transaction.amount(), None);
        assert_eq!(transaction.balance(), None);
    }

    #[test]
    fn test_date_formats() {
        let expected = NaiveDate::from_ymd_opt(2025, 3, 7).unwrap();
        for text in [
            "2025-03-07",
            "03/07/2025",
            "3/7/25",
            "2025-03-07 00:00:00",
            "2025-03-07T10:00:00Z",
        ] {
            assert_eq!(TransactionDate::parse(text).value(), Some(expected), "{text}");
        }
        let bad = TransactionDate::parse("Mar ??");
        assert_eq!(bad.value(), None);
        assert_eq!(bad.to_string(), "Mar ??");
    }

    #[test]
    fn test_duplicate_ids_rejected() {
        let records = vec![
            record(1, "2025-01-01", "1.00"),
            record(1, "2025-01-02", "2.00"),
        ];
        let err = normalize(records).unwrap_err();
        assert!(err.to_string().contains("more than once"));
    }

    #[test]
    fn test_set_categorization_returns_previous() {
        let mut transaction = Transaction::from(record(1, "2025-01-01", "1.00"));
        let previous = transaction.set_categorization(Categorization::new("Food", "Groceries"));
        assert_eq!(previous, Categorization::default());
        assert_eq!(
            transaction.category_token().as_deref(),
            Some("Food -> Groceries")
        );
    }

    #[test]
    fn test_withdrawal_or_deposit_parse() {
        assert_eq!(
            WithdrawalOrDeposit::from_str("Deposit").unwrap(),
            WithdrawalOrDeposit::Deposit
        );
        assert_eq!(
            WithdrawalOrDeposit::from_str("withdrawal").unwrap(),
            WithdrawalOrDeposit::Withdrawal
        );
        assert_eq!(WithdrawalOrDeposit::Deposit.to_string(), "Deposit");
    }
}
