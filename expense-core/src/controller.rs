//! View state behind the dashboard screen.
//!
//! Every load and every category selection takes a generation number when it
//! starts. When it finishes, its result is committed only if no newer request
//! of the same kind (or, for selections, a newer load) has started since;
//! otherwise the result is dropped and the call returns `Ok(None)`.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Mutex, MutexGuard, PoisonError};

use serde::Serialize;

use crate::api::{
    DashboardApi, DashboardScope, DashboardSnapshot, Statement, StatementsApi, Transaction,
    TransactionFilter, TransactionsApi, UploadResult,
};
use crate::error::ExplorerError;

/// What the dashboard currently shows.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct DashboardState {
    /// Statement the snapshot was computed for; `None` for all statements.
    pub statement_id: Option<i64>,
    /// Last fully loaded snapshot.
    pub snapshot: Option<DashboardSnapshot>,
    /// Category whose transactions are listed.
    pub selected_category: Option<i64>,
    /// Transactions of the selected category.
    pub category_transactions: Vec<Transaction>,
}

/// Statement list and dashboard after a statement was added or removed.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StatementChange {
    /// The user's statements after the change, newest first.
    pub statements: Vec<Statement>,
    /// Dashboard after the change; `None` when a newer load superseded it.
    pub state: Option<DashboardState>,
}

/// Loads dashboard snapshots and category drill-downs into a
/// [`DashboardState`].
#[derive(Debug)]
pub struct DashboardController {
    statements: StatementsApi,
    dashboard: DashboardApi,
    transactions: TransactionsApi,
    state: Mutex<DashboardState>,
    load_generation: AtomicU64,
    selection_generation: AtomicU64,
}

impl DashboardController {
    pub(crate) fn new(
        statements: StatementsApi,
        dashboard: DashboardApi,
        transactions: TransactionsApi,
    ) -> Self {
        Self {
            statements,
            dashboard,
            transactions,
            state: Mutex::new(DashboardState::default()),
            load_generation: AtomicU64::new(0),
            selection_generation: AtomicU64::new(0),
        }
    }

    fn lock(&self) -> MutexGuard<'_, DashboardState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Copy of the current state.
    #[must_use]
    pub fn state(&self) -> DashboardState {
        self.lock().clone()
    }

    /// Lists the user's statements and loads the dashboard of the newest one,
    /// if there is any.
    ///
    /// # Errors
    ///
    /// Returns the listing error or the load error.
    pub async fn initialize(&self) -> Result<Vec<Statement>, ExplorerError> {
        let statements = self.statements.list().await?;
        match statements.first() {
            Some(first) => {
                self.load(Some(first.id)).await?;
            }
            None => log::debug!("no statements uploaded yet, dashboard stays empty"),
        }
        Ok(statements)
    }

    /// Loads a full snapshot for `statement_id` (all statements when `None`)
    /// and clears the category selection.
    ///
    /// On failure the previous state is kept untouched.
    ///
    /// # Errors
    ///
    /// Returns the aggregation error of a load that was not superseded.
    pub async fn load(
        &self,
        statement_id: Option<i64>,
    ) -> Result<Option<DashboardState>, ExplorerError> {
        let generation = self.load_generation.fetch_add(1, Ordering::SeqCst) + 1;
        self.selection_generation.fetch_add(1, Ordering::SeqCst);

        let scope = DashboardScope {
            statement_id,
            ..DashboardScope::default()
        };
        let result = self.dashboard.load(&scope).await;

        let mut state = self.lock();
        if self.load_generation.load(Ordering::SeqCst) != generation {
            log::debug!("discarding superseded dashboard load #{generation}");
            return Ok(None);
        }
        let snapshot = result?;
        *state = DashboardState {
            statement_id,
            snapshot: Some(snapshot),
            selected_category: None,
            category_transactions: Vec::new(),
        };
        Ok(Some(state.clone()))
    }

    /// Deletes a statement. When it is the one on display, the dashboard moves
    /// to the newest remaining statement, or is cleared if none is left.
    ///
    /// # Errors
    ///
    /// Returns the delete or listing error, or the load error of a reload
    /// that was not superseded. A failed reload keeps the previous state.
    pub async fn delete_statement(&self, id: i64) -> Result<StatementChange, ExplorerError> {
        let generation = self.load_generation.load(Ordering::SeqCst);
        self.statements.delete(id).await?;
        let statements = self.statements.list().await?;

        let shown = self.lock().statement_id == Some(id);
        let superseded = self.load_generation.load(Ordering::SeqCst) != generation;
        let state = match statements.first() {
            _ if !shown => Some(self.state()),
            _ if superseded => {
                log::debug!("dashboard changed while statement {id} was deleted, not reloading");
                None
            }
            Some(next) => self.load(Some(next.id)).await?,
            None => self.reset(generation),
        };
        Ok(StatementChange { statements, state })
    }

    /// Re-lists the statements after an upload and loads the dashboard of the
    /// uploaded one.
    ///
    /// # Errors
    ///
    /// Returns the listing error or the load error of a load that was not
    /// superseded.
    pub async fn show_uploaded(
        &self,
        upload: &UploadResult,
    ) -> Result<StatementChange, ExplorerError> {
        let statements = self.statements.list().await?;
        let state = self.load(Some(upload.statement_id)).await?;
        Ok(StatementChange { statements, state })
    }

    /// Clears the dashboard unless a load started after `generation`.
    fn reset(&self, generation: u64) -> Option<DashboardState> {
        let mut state = self.lock();
        if self
            .load_generation
            .compare_exchange(generation, generation + 1, Ordering::SeqCst, Ordering::SeqCst)
            .is_err()
        {
            return None;
        }
        self.selection_generation.fetch_add(1, Ordering::SeqCst);
        *state = DashboardState::default();
        Some(state.clone())
    }

    /// Selects a category and lists its transactions, restricted to the loaded
    /// statement. `None` clears the selection without a network call.
    ///
    /// # Errors
    ///
    /// Returns [`ExplorerError::InvalidInput`] when no snapshot has been
    /// loaded yet, or the listing error of a selection that was not
    /// superseded.
    pub async fn select_category(
        &self,
        category_id: Option<i64>,
    ) -> Result<Option<DashboardState>, ExplorerError> {
        let statement_id = {
            let state = self.lock();
            if state.snapshot.is_none() {
                return Err(ExplorerError::InvalidInput {
                    error: "no dashboard loaded to select a category from".to_string(),
                });
            }
            state.statement_id
        };
        let load_generation = self.load_generation.load(Ordering::SeqCst);
        let generation = self.selection_generation.fetch_add(1, Ordering::SeqCst) + 1;

        let result = match category_id {
            Some(id) => {
                let filter = TransactionFilter {
                    statement_id,
                    category_id: Some(id),
                    ..TransactionFilter::default()
                };
                self.transactions.list(&filter).await
            }
            None => Ok(Vec::new()),
        };

        let mut state = self.lock();
        if self.selection_generation.load(Ordering::SeqCst) != generation
            || self.load_generation.load(Ordering::SeqCst) != load_generation
        {
            log::debug!("discarding superseded category selection #{generation}");
            return Ok(None);
        }
        state.category_transactions = result?;
        state.selected_category = category_id;
        Ok(Some(state.clone()))
    }
}
