//! Implements the `RemoteStore` trait using in-memory data for testing purposes.
//!
//! Note: this is compiled even in the "production" version of this app so that we can run the whole
//! app, top-to-bottom, without a statement server.

use crate::api::{RemoteStore, UploadSummary};
use crate::error::Res;
use crate::model::{RawAmount, TransactionId, TransactionRecord, WithdrawalOrDeposit};
use anyhow::{bail, Context};
use serde::Deserialize;
use std::collections::HashMap;
use std::io::Cursor;
use std::sync::{LazyLock, Mutex, MutexGuard};
use tracing::trace;

/// The data of every test store, keyed by store name, so that separate `TestStore` objects with
/// the same name share their data the way separate clients of one server would.
static STATES: LazyLock<Mutex<HashMap<String, TestStoreState>>> =
    LazyLock::new(|| Mutex::new(HashMap::new()));

/// Everything a `TestStore` holds.
#[derive(Debug, Clone, Default, PartialEq)]
pub(crate) struct TestStoreState {
    pub(crate) transactions: Vec<TransactionRecord>,
    pub(crate) categories: Vec<String>,
    /// When set, every `set_category` call fails with this reason.
    pub(crate) set_category_failure: Option<String>,
    /// When set, every `fetch_transactions` call fails with this reason.
    pub(crate) fetch_failure: Option<String>,
}

impl TestStoreState {
    /// Loads the seed data from this module.
    fn seeded() -> Res<Self> {
        Ok(Self {
            transactions: parse_statement_csv(TRANSACTION_DATA, 1)?,
            categories: CATEGORY_DATA.lines().map(str::to_string).collect(),
            set_category_failure: None,
            fetch_failure: None,
        })
    }

    fn next_id(&self) -> u64 {
        self.transactions
            .iter()
            .map(|t| t.id.value())
            .max()
            .unwrap_or_default()
            + 1
    }
}

/// An implementation of the `RemoteStore` trait that holds its data in memory and, by default,
/// is seeded with some existing data.
pub(crate) struct TestStore {
    name: String,
}

impl TestStore {
    /// Create a new `TestStore` named `name`. If no store by that name exists yet, it is seeded.
    pub(crate) fn new(name: impl Into<String>) -> Self {
        Self { name: name.into() }
    }

    #[cfg(test)]
    pub(crate) fn get_state(&self) -> TestStoreState {
        self.with_state(|state| Ok(state.clone())).unwrap()
    }

    #[cfg(test)]
    pub(crate) fn set_state(&self, new_state: TestStoreState) {
        self.with_state(|state| {
            *state = new_state;
            Ok(())
        })
        .unwrap()
    }

    fn with_state<T>(&self, f: impl FnOnce(&mut TestStoreState) -> Res<T>) -> Res<T> {
        let mut states = lock()?;
        if !states.contains_key(&self.name) {
            states.insert(self.name.clone(), TestStoreState::seeded()?);
        }
        let state = states
            .get_mut(&self.name)
            .with_context(|| format!("Test store '{}' is missing", self.name))?;
        f(state)
    }
}

fn lock() -> Res<MutexGuard<'static, HashMap<String, TestStoreState>>> {
    STATES
        .lock()
        .map_err(|_| anyhow::anyhow!("The test store lock is poisoned"))
}

#[async_trait::async_trait]
impl RemoteStore for TestStore {
    async fn fetch_transactions(&self) -> Res<Vec<TransactionRecord>> {
        trace!("fetch_transactions from test store '{}'", self.name);
        self.with_state(|state| {
            if let Some(reason) = &state.fetch_failure {
                bail!("{reason}");
            }
            Ok(state.transactions.clone())
        })
    }

    async fn set_category(
        &self,
        id: TransactionId,
        category: &str,
        subcategory: &str,
    ) -> Res<()> {
        trace!("set_category for transaction {id} in test store '{}'", self.name);
        self.with_state(|state| {
            if let Some(reason) = &state.set_category_failure {
                bail!("{reason}");
            }
            let transaction = state
                .transactions
                .iter_mut()
                .find(|t| t.id == id)
                .with_context(|| format!("Transaction {id} does not exist"))?;
            transaction.category = Some(category.to_string());
            transaction.subcategory = Some(subcategory.to_string());
            Ok(())
        })
    }

    async fn fetch_categories(&self) -> Res<Vec<String>> {
        self.with_state(|state| Ok(state.categories.clone()))
    }

    async fn add_category(&self, name: &str) -> Res<()> {
        let name = name.trim();
        self.with_state(|state| {
            if name.is_empty() || state.categories.iter().any(|c| c == name) {
                bail!("Category already exists or is empty");
            }
            state.categories.push(name.to_string());
            Ok(())
        })
    }

    /// The test store cannot read PDFs. It imports statements written as CSV with the columns of
    /// the seed data below, minus the `id` column.
    async fn upload_statement(&self, file_name: &str, contents: Vec<u8>) -> Res<UploadSummary> {
        let text = String::from_utf8(contents)
            .with_context(|| format!("{file_name} is not a text statement"))?;
        self.with_state(|state| {
            let records = parse_statement_csv(&text, state.next_id())?;
            let imported = records.len();
            state.transactions.extend(records);
            Ok(UploadSummary {
                message: format!("Successfully parsed {imported} transactions"),
                imported,
            })
        })
    }
}

/// A row of statement CSV. Ids are optional since uploaded statements do not have them yet.
#[derive(Debug, Deserialize)]
struct StatementRow {
    #[serde(default)]
    id: Option<u64>,
    date: String,
    withdrawal_or_deposit: WithdrawalOrDeposit,
    transaction_type: Option<String>,
    details: String,
    amount: String,
    balance: String,
    category: Option<String>,
    subcategory: Option<String>,
}

/// Parses statement CSV, assigning sequential ids from `first_id` to rows without one.
fn parse_statement_csv(csv_data: &str, first_id: u64) -> Res<Vec<TransactionRecord>> {
    let mut rdr = csv::ReaderBuilder::new()
        .has_headers(true)
        .trim(csv::Trim::All)
        .from_reader(Cursor::new(csv_data.as_bytes()));

    let mut next_id = first_id;
    let mut records = Vec::new();
    for (ix, result) in rdr.deserialize::<StatementRow>().enumerate() {
        let row = result.with_context(|| format!("Invalid statement row {}", ix + 2))?;
        let id = row.id.unwrap_or_else(|| {
            let id = next_id;
            next_id += 1;
            id
        });
        records.push(TransactionRecord {
            id: TransactionId::new(id),
            date: row.date,
            withdrawal_or_deposit: row.withdrawal_or_deposit,
            transaction_type: row.transaction_type,
            details: row.details,
            amount: Some(RawAmount::Text(row.amount)),
            balance: Some(RawAmount::Text(row.balance)),
            category: row.category,
            subcategory: row.subcategory,
        });
    }
    Ok(records)
}

/// Seed transaction data.
const TRANSACTION_DATA: &str = r##"id,date,withdrawal_or_deposit,transaction_type,details,amount,balance,category,subcategory
1,2025-01-02,Deposit,Direct Deposit,PAYROLL ACME CORP,2150.00,3412.18,Income,Income
2,2025-01-03,Withdrawal,Debit Card Purchase,KROGER #781 TOLEDO OH,-84.37,3327.81,Grocery,Grocery
3,2025-01-03,Withdrawal,Recurring Payment,NETFLIX.COM,-15.49,3312.32,Entertainment,Entertainment
4,2025-01-05,Withdrawal,Debit Card Purchase,SPEEDWAY 4412,-12.80,3299.52,Snacks,Snacks
5,2025-01-06,Withdrawal,Debit Card Purchase,TACO BELL #3321,-9.27,3290.25,Entertainment,Meals
6,2025-01-08,Withdrawal,ACH Payment,US BANK HOME MTG,-1245.00,2045.25,,
7,2025-01-09,Withdrawal,Debit Card Purchase,HOME DEPOT 3802,-61.12,1984.13,Home,Home Improvement
8,2025-01-10,Withdrawal,ACH Payment,COLUMBIA GAS OF OHIO,-88.40,1895.73,Utilities,Utilities
9,2025-01-13,Withdrawal,ACH Payment,DISCOVER E-PAYMENT,-200.00,1695.73,Debt,Credit Card
10,2025-01-15,Deposit,Deposit,MOBILE DEPOSIT,125.00,1820.73,,
"##;

/// Seed category data, one token per line.
const CATEGORY_DATA: &str = r##"Grocery
Entertainment
Entertainment -> Meals
Debt -> Credit Card
Insurance
Home -> Home Improvement
Mortgage
Utilities
Gas
Snacks
Income"##;
