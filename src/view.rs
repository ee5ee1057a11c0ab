//! The in-memory view of the transaction collection.
//!
//! `ViewState` owns the canonical collection, which mirrors the remote store, and the current
//! sort configuration. The sorted projection is derived from those two and is cached until
//! either changes.

use crate::error::{Error, ErrorType, Result};
use crate::model::sort::sorted_indices;
use crate::model::{Categorization, SortConfig, SortKey, Transaction, TransactionId};
use std::collections::HashMap;
use std::sync::OnceLock;
use tracing::{debug, trace};

#[derive(Debug, Default)]
pub struct ViewState {
    transactions: Vec<Transaction>,
    positions: HashMap<TransactionId, usize>,
    sort: SortConfig,
    /// Incremented every time the collection is replaced.
    generation: u64,
    /// Positions into `transactions` in projection order.
    order: OnceLock<Vec<usize>>,
}

impl ViewState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replaces the canonical collection. The sort configuration is kept.
    ///
    /// # Errors
    /// - `ErrorType::Request` if two transactions share an id, in which case nothing is replaced.
    pub fn load(&mut self, transactions: Vec<Transaction>) -> Result<()> {
        let mut positions = HashMap::with_capacity(transactions.len());
        for (ix, transaction) in transactions.iter().enumerate() {
            if positions.insert(transaction.id(), ix).is_some() {
                return Err(Error::msg(
                    ErrorType::Request,
                    format!("Transaction id {} appears more than once", transaction.id()),
                ));
            }
        }
        self.transactions = transactions;
        self.positions = positions;
        self.generation += 1;
        self.invalidate();
        debug!(
            "Loaded {} transactions (generation {})",
            self.transactions.len(),
            self.generation
        );
        Ok(())
    }

    /// Handles a user request to sort by `key` and returns the new configuration. Asking for the
    /// current key flips the direction; any other key sorts ascending.
    pub fn request_sort(&mut self, key: SortKey) -> SortConfig {
        self.sort = self.sort.requested(key);
        self.invalidate();
        trace!("Sort is now {} {}", self.sort.key(), self.sort.direction());
        self.sort
    }

    pub fn sort_config(&self) -> SortConfig {
        self.sort
    }

    /// The transactions in display order.
    pub fn projection(&self) -> Vec<&Transaction> {
        self.order
            .get_or_init(|| sorted_indices(&self.transactions, self.sort))
            .iter()
            .map(|&ix| &self.transactions[ix])
            .collect()
    }

    /// Sets the category fields of the transaction with `id` and returns the values they had
    /// before.
    ///
    /// # Errors
    /// - `ErrorType::NotFound` if no transaction has `id`. Nothing is changed.
    pub fn apply_category(
        &mut self,
        id: TransactionId,
        categorization: Categorization,
    ) -> Result<Categorization> {
        let ix = *self.positions.get(&id).ok_or_else(|| {
            Error::msg(ErrorType::NotFound, format!("Transaction {id} was not found"))
        })?;
        let previous = self.transactions[ix].set_categorization(categorization);
        if self.sort.key() == SortKey::Category {
            self.invalidate();
        }
        Ok(previous)
    }

    pub fn get(&self, id: TransactionId) -> Option<&Transaction> {
        self.positions.get(&id).map(|&ix| &self.transactions[ix])
    }

    /// The canonical collection in the order it was loaded.
    pub fn transactions(&self) -> &[Transaction] {
        &self.transactions
    }

    pub fn len(&self) -> usize {
        self.transactions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.transactions.is_empty()
    }

    /// Identifies the currently loaded collection. A mutation that started under one generation
    /// must not roll back into another.
    pub fn generation(&self) -> u64 {
        self.generation
    }

    fn invalidate(&mut self) {
        self.order = OnceLock::new();
    }
}
