//! Typed wrappers over the Expense Explorer REST endpoints.
//!
//! Every group sends its calls through the shared [`crate::RequestPipeline`],
//! so all of them get bearer authentication and token refresh for free.

use serde::de::DeserializeOwned;
use serde::Deserialize;

use crate::error::ExplorerError;
use crate::http::ApiResponse;

mod auth;
mod categories;
mod dashboard;
mod models;
mod statements;
mod transactions;

pub use auth::AuthApi;
pub use categories::CategoriesApi;
pub use dashboard::{DashboardApi, DashboardScope, DashboardSection, DashboardSnapshot};
pub use models::*;
pub use statements::{check_upload_file_name, StatementFileType, StatementsApi, MAX_UPLOAD_BYTES};
pub use transactions::{TransactionFilter, TransactionsApi};

/// Collection endpoints answer with a bare array, or with a DRF page object
/// when pagination is enabled server-side.
#[derive(Deserialize)]
#[serde(untagged)]
enum Listing<T> {
    Plain(Vec<T>),
    Paged { results: Vec<T> },
}

pub(crate) fn parse_listing<T: DeserializeOwned>(
    response: &ApiResponse,
) -> Result<Vec<T>, ExplorerError> {
    Ok(match response.json::<Listing<T>>()? {
        Listing::Plain(items) | Listing::Paged { results: items } => items,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_listing_accepts_plain_and_paged_bodies() {
        let plain = ApiResponse::new(200, "u".to_string(), b"[1, 2]".to_vec());
        assert_eq!(parse_listing::<i64>(&plain).unwrap(), vec![1, 2]);

        let paged = ApiResponse::new(
            200,
            "u".to_string(),
            br#"{"count": 1, "next": null, "results": [3]}"#.to_vec(),
        );
        assert_eq!(parse_listing::<i64>(&paged).unwrap(), vec![3]);

        let other = ApiResponse::new(200, "u".to_string(), br#"{"items": []}"#.to_vec());
        assert!(parse_listing::<i64>(&other).is_err());
    }
}
