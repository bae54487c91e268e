use std::sync::Arc;

use super::models::Category;
use super::parse_listing;
use crate::error::ExplorerError;
use crate::http::{PendingRequest, RequestPipeline};

/// Category endpoints.
#[derive(Debug, Clone)]
pub struct CategoriesApi {
    pipeline: Arc<RequestPipeline>,
}

impl CategoriesApi {
    pub(crate) const fn new(pipeline: Arc<RequestPipeline>) -> Self {
        Self { pipeline }
    }

    /// Every category known to the server.
    ///
    /// # Errors
    ///
    /// Returns a network or session error.
    pub async fn list(&self) -> Result<Vec<Category>, ExplorerError> {
        let response = self
            .pipeline
            .execute_checked(PendingRequest::get("/categories/"))
            .await?;
        parse_listing(&response)
    }
}
