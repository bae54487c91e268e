use std::path::Path;
use std::sync::Arc;

use crate::api::{AuthApi, CategoriesApi, DashboardApi, StatementsApi, TransactionsApi};
use crate::config::ClientConfig;
use crate::controller::DashboardController;
use crate::error::ExplorerError;
use crate::http::RequestPipeline;
use crate::session::AuthSession;
use crate::storage::{FileKeyValueStore, KeyValueStore};
use crate::token::TokenStore;

/// Entry point of the client: one token store, one session and one request
/// pipeline shared by every API group.
///
/// Cloning is cheap and clones share all state.
#[derive(Debug, Clone)]
pub struct ExpenseClient {
    tokens: Arc<TokenStore>,
    session: Arc<AuthSession>,
    pipeline: Arc<RequestPipeline>,
}

impl ExpenseClient {
    /// Builds a client persisting its tokens in `store`.
    ///
    /// The session starts in [`crate::AuthState::Checking`]; call
    /// [`AuthSession::start`] once the host is ready to route.
    #[must_use]
    pub fn new(config: &ClientConfig, store: Arc<dyn KeyValueStore>) -> Self {
        let tokens = Arc::new(TokenStore::new(store));
        let session = Arc::new(AuthSession::new(tokens.clone()));
        let pipeline = Arc::new(
            RequestPipeline::new(config, tokens.clone()).with_observer(session.clone()),
        );
        Self {
            tokens,
            session,
            pipeline,
        }
    }

    /// Builds a client persisting its tokens in the JSON file at `path`.
    ///
    /// # Errors
    ///
    /// Returns an error if the file's directory cannot be created.
    pub fn with_session_file(
        config: &ClientConfig,
        path: impl AsRef<Path>,
    ) -> Result<Self, ExplorerError> {
        let store = FileKeyValueStore::new(path)?;
        Ok(Self::new(config, Arc::new(store)))
    }

    /// Stored credentials.
    #[must_use]
    pub fn tokens(&self) -> &Arc<TokenStore> {
        &self.tokens
    }

    /// Routing state.
    #[must_use]
    pub fn session(&self) -> &Arc<AuthSession> {
        &self.session
    }

    /// The shared request pipeline, for calls not covered by an API group.
    #[must_use]
    pub fn pipeline(&self) -> &Arc<RequestPipeline> {
        &self.pipeline
    }

    /// Registration, login and profile.
    #[must_use]
    pub fn auth(&self) -> AuthApi {
        AuthApi::new(self.pipeline.clone(), self.session.clone())
    }

    /// Statement upload and management.
    #[must_use]
    pub fn statements(&self) -> StatementsApi {
        StatementsApi::new(self.pipeline.clone())
    }

    /// Transaction listing.
    #[must_use]
    pub fn transactions(&self) -> TransactionsApi {
        TransactionsApi::new(self.pipeline.clone())
    }

    /// Category listing.
    #[must_use]
    pub fn categories(&self) -> CategoriesApi {
        CategoriesApi::new(self.pipeline.clone())
    }

    /// Dashboard analytics.
    #[must_use]
    pub fn dashboard(&self) -> DashboardApi {
        DashboardApi::new(self.pipeline.clone())
    }

    /// A fresh dashboard view-state controller.
    #[must_use]
    pub fn dashboard_controller(&self) -> DashboardController {
        DashboardController::new(self.statements(), self.dashboard(), self.transactions())
    }
}
