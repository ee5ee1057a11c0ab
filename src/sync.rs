//! Optimistic category changes and everything else that talks to the remote store on behalf of
//! the view.
//!
//! A category change is applied to the `ViewState` before the remote store has confirmed it. If
//! the remote store rejects it, the value captured beforehand is put back. The lock on the view is
//! never held while waiting for the remote store, so sorting and rendering stay responsive.

use crate::api::{RemoteStore, UploadSummary};
use crate::error::{Error, ErrorType, IntoResult, Result};
use crate::model::{normalize, Categorization, TransactionId};
use crate::view::ViewState;
use anyhow::Context;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::sync::{Arc, PoisonError};
use tokio::sync::{Mutex, MutexGuard};
use tracing::{debug, info, warn};

/// Where a single category change is in its life.
#[derive(Debug, Default, Clone, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "state")]
pub enum MutationState {
    /// Created, nothing applied yet.
    #[default]
    Idle,
    /// Applied locally, waiting for the remote store.
    Pending,
    /// The remote store accepted the change.
    Committed,
    /// The remote store rejected the change and the snapshot was restored.
    RolledBack { reason: String },
}

impl MutationState {
    pub fn is_terminal(&self) -> bool {
        matches!(self, MutationState::Committed | MutationState::RolledBack { .. })
    }
}

/// One optimistic category change.
#[derive(Debug, Clone, Eq, PartialEq, Serialize, Deserialize)]
pub struct Mutation {
    id: TransactionId,
    requested: Categorization,
    snapshot: Categorization,
    state: MutationState,
}

impl Mutation {
    fn new(id: TransactionId, requested: Categorization) -> Self {
        Self {
            id,
            requested,
            snapshot: Categorization::default(),
            state: MutationState::Idle,
        }
    }

    pub fn id(&self) -> TransactionId {
        self.id
    }

    /// The values that were applied.
    pub fn requested(&self) -> &Categorization {
        &self.requested
    }

    /// The values the transaction had before the change.
    pub fn snapshot(&self) -> &Categorization {
        &self.snapshot
    }

    pub fn state(&self) -> &MutationState {
        &self.state
    }

    fn begin(&mut self, snapshot: Categorization) {
        self.transition(MutationState::Pending);
        self.snapshot = snapshot;
    }

    fn commit(&mut self) {
        self.transition(MutationState::Committed);
    }

    fn roll_back(&mut self, reason: impl Into<String>) {
        self.transition(MutationState::RolledBack {
            reason: reason.into(),
        });
    }

    fn transition(&mut self, next: MutationState) {
        debug!(
            "Category change for transaction {}: {:?} -> {:?}",
            self.id, self.state, next
        );
        self.state = next;
    }
}

type PendingIds = Arc<std::sync::Mutex<HashSet<TransactionId>>>;

/// Marks a transaction id as having a category change in flight until dropped.
struct PendingGuard {
    pending: PendingIds,
    id: TransactionId,
}

impl PendingGuard {
    /// # Errors
    /// - `ErrorType::Busy` if `id` already has a change in flight.
    fn acquire(pending: &PendingIds, id: TransactionId) -> Result<Self> {
        let inserted = pending
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(id);
        if !inserted {
            return Err(Error::msg(
                ErrorType::Busy,
                format!("A category change for transaction {id} is already in progress"),
            ));
        }
        Ok(Self {
            pending: pending.clone(),
            id,
        })
    }
}

impl Drop for PendingGuard {
    fn drop(&mut self) {
        self.pending
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(&self.id);
    }
}

/// Keeps a `ViewState` in step with a `RemoteStore`.
///
/// Clones share the same view, remote store and set of in-flight changes.
#[derive(Clone)]
pub struct SyncController {
    view: Arc<Mutex<ViewState>>,
    remote: Arc<dyn RemoteStore>,
    pending: PendingIds,
}

impl SyncController {
    pub fn new(remote: Arc<dyn RemoteStore>) -> Self {
        Self::with_view(ViewState::new(), remote)
    }

    pub fn with_view(view: ViewState, remote: Arc<dyn RemoteStore>) -> Self {
        Self {
            view: Arc::new(Mutex::new(view)),
            remote,
            pending: Arc::new(std::sync::Mutex::new(HashSet::new())),
        }
    }

    /// Locks the view. Do not hold the guard across a call to another method of this controller.
    pub async fn view(&self) -> MutexGuard<'_, ViewState> {
        self.view.lock().await
    }

    /// Replaces the collection with the one held by the remote store and returns its size.
    ///
    /// # Errors
    /// - `ErrorType::Remote` if the fetch fails. The view is not changed.
    /// - `ErrorType::Request` if the fetched collection has duplicate ids. The view is not changed.
    pub async fn refresh(&self) -> Result<usize> {
        let records = self
            .remote
            .fetch_transactions()
            .await
            .context("Unable to fetch transactions")
            .pub_result(ErrorType::Remote)?;
        let transactions = normalize(records).pub_result(ErrorType::Request)?;
        let mut view = self.view.lock().await;
        view.load(transactions)?;
        Ok(view.len())
    }

    /// Decodes a selected category token and sets it on the transaction with `id`.
    ///
    /// # Errors
    /// - `ErrorType::Request` if the token is blank.
    /// - Otherwise as `set_category`.
    pub async fn select_category(&self, id: TransactionId, token: &str) -> Result<Mutation> {
        if token.trim().is_empty() {
            return Err(Error::msg(
                ErrorType::Request,
                "The category must not be empty",
            ));
        }
        self.set_category(id, Categorization::from_token(token))
            .await
    }

    /// Applies `categorization` to the transaction with `id` right away, then persists it. If the
    /// remote store rejects it, the previous values are restored before this returns.
    ///
    /// A missing subcategory is sent as the category itself.
    ///
    /// # Errors
    /// - `ErrorType::Busy` if a change for `id` is already in flight. Nothing is changed.
    /// - `ErrorType::NotFound` if no transaction has `id`. Nothing is changed.
    /// - `ErrorType::Remote` if the remote store rejected the change. `Error::reason` has the
    ///   reason it gave.
    pub async fn set_category(
        &self,
        id: TransactionId,
        categorization: Categorization,
    ) -> Result<Mutation> {
        let _guard = PendingGuard::acquire(&self.pending, id)?;
        let mut mutation = Mutation::new(id, categorization.clone());

        let generation = {
            let mut view = self.view.lock().await;
            let snapshot = view.apply_category(id, categorization.clone())?;
            mutation.begin(snapshot);
            view.generation()
        };

        let category = categorization.category.unwrap_or_default();
        let subcategory = categorization
            .subcategory
            .unwrap_or_else(|| category.clone());

        match self.remote.set_category(id, &category, &subcategory).await {
            Ok(()) => {
                mutation.commit();
                Ok(mutation)
            }
            Err(e) => {
                let reason = e.root_cause().to_string();
                self.restore(&mutation, generation).await;
                mutation.roll_back(reason.as_str());
                warn!("The category change for transaction {id} was rolled back: {reason}");
                Err(Error::new(
                    ErrorType::Remote,
                    e.context(format!("Unable to set the category of transaction {id}")),
                ))
            }
        }
    }

    /// Puts the snapshot of `mutation` back, unless the collection it was taken from has since
    /// been replaced.
    async fn restore(&self, mutation: &Mutation, generation: u64) {
        let mut view = self.view.lock().await;
        if view.generation() != generation {
            debug!(
                "The collection was reloaded while transaction {} was pending, not restoring",
                mutation.id()
            );
            return;
        }
        if let Err(e) = view.apply_category(mutation.id(), mutation.snapshot().clone()) {
            warn!("Unable to restore transaction {}: {e}", mutation.id());
        }
    }

    /// The selectable category tokens.
    pub async fn categories(&self) -> Result<Vec<String>> {
        self.remote
            .fetch_categories()
            .await
            .context("Unable to fetch categories")
            .pub_result(ErrorType::Remote)
    }

    /// Adds a selectable category and returns the trimmed name that was added.
    ///
    /// # Errors
    /// - `ErrorType::Request` if `name` is blank.
    /// - `ErrorType::Remote` if the remote store rejected it, e.g. because it already exists.
    pub async fn add_category(&self, name: &str) -> Result<String> {
        let name = name.trim();
        if name.is_empty() {
            return Err(Error::msg(
                ErrorType::Request,
                "The category name must not be empty",
            ));
        }
        self.remote
            .add_category(name)
            .await
            .with_context(|| format!("Unable to add the category '{name}'"))
            .pub_result(ErrorType::Remote)?;
        info!("Added category '{name}'");
        Ok(name.to_string())
    }

    /// Sends a statement to the remote store, then refreshes the collection.
    ///
    /// # Errors
    /// - `ErrorType::Remote` if the upload or the refresh fails. A failed upload leaves the view
    ///   unchanged.
    pub async fn upload_statement(
        &self,
        file_name: &str,
        contents: Vec<u8>,
    ) -> Result<UploadSummary> {
        let summary = self
            .remote
            .upload_statement(file_name, contents)
            .await
            .with_context(|| format!("Unable to upload {file_name}"))
            .pub_result(ErrorType::Remote)?;
        debug!("{file_name}: {}", summary.message);
        self.refresh().await?;
        Ok(summary)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::TestStore;
    use crate::error::Res;
    use crate::model::TransactionRecord;
    use tokio::sync::Semaphore;
    use uuid::Uuid;

    /// Holds `set_category` calls for one id until a permit is added.
    struct GatedStore {
        inner: TestStore,
        gated: TransactionId,
        gate: Arc<Semaphore>,
    }

    #[async_trait::async_trait]
    impl RemoteStore for GatedStore {
        async fn fetch_transactions(&self) -> Res<Vec<TransactionRecord>> {
            self.inner.fetch_transactions().await
        }

        async fn set_category(
            &self,
            id: TransactionId,
            category: &str,
            subcategory: &str,
        ) -> Res<()> {
            if id == self.gated {
                self.gate.acquire().await?.forget();
            }
            self.inner.set_category(id, category, subcategory).await
        }

        async fn fetch_categories(&self) -> Res<Vec<String>> {
            self.inner.fetch_categories().await
        }

        async fn add_category(&self, name: &str) -> Res<()> {
            self.inner.add_category(name).await
        }

        async fn upload_statement(
            &self,
            file_name: &str,
            contents: Vec<u8>,
        ) -> Res<UploadSummary> {
            self.inner.upload_statement(file_name, contents).await
        }
    }

    fn unique_name() -> String {
        Uuid::new_v4().to_string()
    }

    async fn controller(name: &str) -> SyncController {
        let controller = SyncController::new(Arc::new(TestStore::new(name)));
        controller.refresh().await.unwrap();
        controller
    }

    async fn gated_controller(name: &str, gated: u64) -> (SyncController, Arc<Semaphore>) {
        let gate = Arc::new(Semaphore::new(0));
        let store = GatedStore {
            inner: TestStore::new(name),
            gated: TransactionId::new(gated),
            gate: gate.clone(),
        };
        let controller = SyncController::new(Arc::new(store));
        controller.refresh().await.unwrap();
        (controller, gate)
    }

    async fn categorization(controller: &SyncController, id: u64) -> Categorization {
        controller
            .view()
            .await
            .get(TransactionId::new(id))
            .unwrap()
            .categorization()
            .clone()
    }

    /// Yields until the change for `id` has been applied locally.
    async fn wait_for(controller: &SyncController, id: u64, expected: &Categorization) {
        while categorization(controller, id).await != *expected {
            tokio::task::yield_now().await;
        }
    }

    #[tokio::test]
    async fn test_refresh_loads_the_remote_collection() {
        let controller = SyncController::new(Arc::new(TestStore::new(unique_name())));
        assert!(controller.view().await.is_empty());
        assert_eq!(controller.refresh().await.unwrap(), 10);
        assert_eq!(controller.view().await.generation(), 1);
    }

    #[tokio::test]
    async fn test_refresh_failure_leaves_view_unchanged() {
        let name = unique_name();
        let controller = controller(&name).await;
        let store = TestStore::new(name.as_str());
        let mut state = store.get_state();
        state.fetch_failure = Some("connection refused".to_string());
        state.transactions.clear();
        store.set_state(state);

        let err = controller.refresh().await.unwrap_err();
        assert_eq!(err.error_type(), ErrorType::Remote);
        assert_eq!(err.reason(), "connection refused");
        assert_eq!(controller.view().await.len(), 10);
        assert_eq!(controller.view().await.generation(), 1);
    }

    #[tokio::test]
    async fn test_set_category_commits() {
        let name = unique_name();
        let controller = controller(&name).await;
        let requested = Categorization::new("Food", "Groceries");
        let mutation = controller
            .set_category(TransactionId::new(2), requested.clone())
            .await
            .unwrap();

        assert_eq!(mutation.state(), &MutationState::Committed);
        assert_eq!(mutation.snapshot(), &Categorization::new("Grocery", "Grocery"));
        assert_eq!(categorization(&controller, 2).await, requested);

        let remote = TestStore::new(name.as_str()).get_state();
        assert_eq!(remote.transactions[1].category.as_deref(), Some("Food"));
        assert_eq!(remote.transactions[1].subcategory.as_deref(), Some("Groceries"));
    }

    #[tokio::test]
    async fn test_select_category_decodes_the_token() {
        let controller = controller(&unique_name()).await;
        let mutation = controller
            .select_category(TransactionId::new(6), "Home -> Home Improvement")
            .await
            .unwrap();
        assert_eq!(
            mutation.requested(),
            &Categorization::new("Home", "Home Improvement")
        );
        let view = controller.view().await;
        assert_eq!(
            view.get(TransactionId::new(6))
                .unwrap()
                .category_token()
                .as_deref(),
            Some("Home -> Home Improvement")
        );
    }

    #[tokio::test]
    async fn test_select_category_rejects_blank_token() {
        let controller = controller(&unique_name()).await;
        let err = controller
            .select_category(TransactionId::new(1), "  ")
            .await
            .unwrap_err();
        assert_eq!(err.error_type(), ErrorType::Request);
    }

    #[tokio::test]
    async fn test_remote_failure_restores_exact_snapshot() {
        let name = unique_name();
        let controller = controller(&name).await;
        let store = TestStore::new(name.as_str());
        let mut state = store.get_state();
        state.set_category_failure = Some("database is locked".to_string());
        store.set_state(state);

        // Transaction 6 has no category at all, the nulls must come back.
        let before = categorization(&controller, 6).await;
        assert_eq!(before, Categorization::default());

        let err = controller
            .set_category(TransactionId::new(6), Categorization::new("Mortgage", "Mortgage"))
            .await
            .unwrap_err();
        assert_eq!(err.error_type(), ErrorType::Remote);
        assert_eq!(err.reason(), "database is locked");
        assert_eq!(categorization(&controller, 6).await, before);
    }

    #[tokio::test]
    async fn test_unknown_id_is_not_found() {
        let controller = controller(&unique_name()).await;
        let err = controller
            .set_category(TransactionId::new(404), Categorization::new("Gas", "Gas"))
            .await
            .unwrap_err();
        assert_eq!(err.error_type(), ErrorType::NotFound);

        // The id is not left marked as pending.
        let err = controller
            .set_category(TransactionId::new(404), Categorization::new("Gas", "Gas"))
            .await
            .unwrap_err();
        assert_eq!(err.error_type(), ErrorType::NotFound);
    }

    #[tokio::test]
    async fn test_same_id_is_busy_while_pending() {
        let (controller, gate) = gated_controller(&unique_name(), 3).await;
        let requested = Categorization::new("Entertainment", "Streaming");

        let first = tokio::spawn({
            let controller = controller.clone();
            let requested = requested.clone();
            async move {
                controller
                    .set_category(TransactionId::new(3), requested)
                    .await
            }
        });
        wait_for(&controller, 3, &requested).await;

        let err = controller
            .set_category(TransactionId::new(3), Categorization::new("Gas", "Gas"))
            .await
            .unwrap_err();
        assert_eq!(err.error_type(), ErrorType::Busy);
        // The rejected request did not touch the optimistic value.
        assert_eq!(categorization(&controller, 3).await, requested);

        gate.add_permits(1);
        let mutation = first.await.unwrap().unwrap();
        assert_eq!(mutation.state(), &MutationState::Committed);

        // Once settled, the id accepts changes again.
        gate.add_permits(1);
        controller
            .set_category(TransactionId::new(3), Categorization::new("Gas", "Gas"))
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_different_ids_are_independent() {
        let (controller, gate) = gated_controller(&unique_name(), 3).await;
        let requested = Categorization::new("Entertainment", "Streaming");

        let first = tokio::spawn({
            let controller = controller.clone();
            let requested = requested.clone();
            async move {
                controller
                    .set_category(TransactionId::new(3), requested)
                    .await
            }
        });
        wait_for(&controller, 3, &requested).await;

        // Transaction 4 completes while 3 is still pending.
        let mutation = controller
            .set_category(TransactionId::new(4), Categorization::new("Gas", "Gas"))
            .await
            .unwrap();
        assert_eq!(mutation.state(), &MutationState::Committed);
        assert!(!first.is_finished());

        gate.add_permits(1);
        first.await.unwrap().unwrap();
        assert_eq!(categorization(&controller, 3).await, requested);
        assert_eq!(
            categorization(&controller, 4).await,
            Categorization::new("Gas", "Gas")
        );
    }

    #[tokio::test]
    async fn test_rollback_skipped_after_reload() {
        let name = unique_name();
        let (controller, gate) = gated_controller(&name, 3).await;
        let requested = Categorization::new("Entertainment", "Streaming");

        let first = tokio::spawn({
            let controller = controller.clone();
            let requested = requested.clone();
            async move {
                controller
                    .set_category(TransactionId::new(3), requested)
                    .await
            }
        });
        wait_for(&controller, 3, &requested).await;

        let store = TestStore::new(name.as_str());
        let mut state = store.get_state();
        state.transactions[2].category = Some("Subscriptions".to_string());
        state.transactions[2].subcategory = Some("Subscriptions".to_string());
        state.set_category_failure = Some("timed out".to_string());
        store.set_state(state);
        controller.refresh().await.unwrap();

        gate.add_permits(1);
        let err = first.await.unwrap().unwrap_err();
        assert_eq!(err.error_type(), ErrorType::Remote);
        // The reloaded value wins over the stale snapshot.
        assert_eq!(
            categorization(&controller, 3).await,
            Categorization::new("Subscriptions", "Subscriptions")
        );
    }

    #[tokio::test]
    async fn test_add_category_trims_and_rejects_blank() {
        let controller = controller(&unique_name()).await;
        assert_eq!(controller.add_category("  Travel ").await.unwrap(), "Travel");
        assert!(controller
            .categories()
            .await
            .unwrap()
            .contains(&"Travel".to_string()));

        let err = controller.add_category("").await.unwrap_err();
        assert_eq!(err.error_type(), ErrorType::Request);

        let err = controller.add_category("Travel").await.unwrap_err();
        assert_eq!(err.error_type(), ErrorType::Remote);
        assert_eq!(err.reason(), "Category already exists or is empty");
    }

    #[tokio::test]
    async fn test_upload_statement_refreshes() {
        let controller = controller(&unique_name()).await;
        let statement = "date,withdrawal_or_deposit,transaction_type,details,amount,balance,category,subcategory\n\
            2025-02-01,Withdrawal,Debit Card Purchase,WALMART 1234,-45.10,1775.63,,\n";
        let summary = controller
            .upload_statement("february.csv", statement.as_bytes().to_vec())
            .await
            .unwrap();
        assert_eq!(summary.imported, 1);
        let view = controller.view().await;
        assert_eq!(view.len(), 11);
        assert_eq!(view.generation(), 2);
    }
}
