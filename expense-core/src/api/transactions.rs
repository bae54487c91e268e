use std::sync::Arc;

use super::models::Transaction;
use super::parse_listing;
use crate::error::ExplorerError;
use crate::http::{PendingRequest, RequestPipeline};

/// Optional narrowing of `GET /transactions/`. Dates are `YYYY-MM-DD` and
/// inclusive.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TransactionFilter {
    /// Only lines of this statement.
    pub statement_id: Option<i64>,
    /// Only lines in this category.
    pub category_id: Option<i64>,
    /// Earliest booking date.
    pub start_date: Option<String>,
    /// Latest booking date.
    pub end_date: Option<String>,
}

impl TransactionFilter {
    /// Restricts to one statement.
    #[must_use]
    pub const fn statement(mut self, statement_id: i64) -> Self {
        self.statement_id = Some(statement_id);
        self
    }

    /// Restricts to one category.
    #[must_use]
    pub const fn category(mut self, category_id: i64) -> Self {
        self.category_id = Some(category_id);
        self
    }

    /// Restricts to a date range; either end may be open.
    #[must_use]
    pub fn between(mut self, start_date: Option<String>, end_date: Option<String>) -> Self {
        self.start_date = start_date;
        self.end_date = end_date;
        self
    }

    fn apply(&self, request: PendingRequest) -> PendingRequest {
        request
            .query_opt("statement_id", self.statement_id)
            .query_opt("category_id", self.category_id)
            .query_opt("start_date", self.start_date.as_deref())
            .query_opt("end_date", self.end_date.as_deref())
    }
}

/// Transaction endpoints.
#[derive(Debug, Clone)]
pub struct TransactionsApi {
    pipeline: Arc<RequestPipeline>,
}

impl TransactionsApi {
    pub(crate) const fn new(pipeline: Arc<RequestPipeline>) -> Self {
        Self { pipeline }
    }

    /// Transactions matching `filter`, newest first.
    ///
    /// # Errors
    ///
    /// Returns a network or session error.
    pub async fn list(&self, filter: &TransactionFilter) -> Result<Vec<Transaction>, ExplorerError> {
        let request = filter.apply(PendingRequest::get("/transactions/"));
        let response = self.pipeline.execute_checked(request).await?;
        parse_listing(&response)
    }

    /// One transaction.
    ///
    /// # Errors
    ///
    /// Returns a network or session error.
    pub async fn get(&self, id: i64) -> Result<Transaction, ExplorerError> {
        self.pipeline
            .execute_checked(PendingRequest::get(format!("/transactions/{id}/")))
            .await?
            .json()
    }
}
