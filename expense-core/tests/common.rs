//! Common test utilities shared across integration tests.
#![allow(dead_code)]

use std::sync::Arc;

use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine};
use expense_core::{ClientConfig, ExpenseClient, InMemoryKeyValueStore, TokenPair};
use mockito::ServerGuard;
use serde_json::json;

/// Mints an unsigned JWT whose `exp` lies `offset_secs` from now. `jti` makes
/// tokens with the same expiry distinguishable.
pub fn jwt(offset_secs: i64, jti: &str) -> String {
    let exp = chrono::Utc::now().timestamp() + offset_secs;
    format!(
        "{}.{}.signature",
        URL_SAFE_NO_PAD.encode(r#"{"alg":"HS256","typ":"JWT"}"#),
        URL_SAFE_NO_PAD.encode(
            json!({"token_type": "access", "exp": exp, "jti": jti, "user_id": 1}).to_string()
        )
    )
}

/// Client against `server` with connection retries disabled.
pub fn client(server: &ServerGuard) -> ExpenseClient {
    let config = ClientConfig::new(&server.url())
        .unwrap()
        .with_connect_retries(0);
    ExpenseClient::new(&config, Arc::new(InMemoryKeyValueStore::new()))
}

/// Client that already holds `pair` and has routed to the signed-in views.
pub fn signed_in_client(server: &ServerGuard, pair: &TokenPair) -> ExpenseClient {
    let client = client(server);
    client.tokens().save(pair).unwrap();
    client.session().start();
    client.session().logged_in().unwrap();
    client
}

pub fn bearer(token: &str) -> String {
    format!("Bearer {token}")
}

pub fn user_json() -> serde_json::Value {
    json!({
        "id": 1,
        "email": "ada@example.com",
        "username": "ada",
        "first_name": "Ada",
        "last_name": "",
        "email_verified": false,
        "created_at": "2025-01-01T09:00:00Z"
    })
}

pub fn login_body(access: &str, refresh: &str) -> String {
    json!({
        "access": access,
        "refresh": refresh,
        "user": user_json(),
        "message": "Login successful."
    })
    .to_string()
}

pub fn categories_body() -> String {
    json!([
        {"id": 1, "name": "FOOD", "display_name": "Food & Dining", "description": ""},
        {"id": 2, "name": "TRAVEL", "display_name": "Travel", "description": ""}
    ])
    .to_string()
}

pub fn statements_body(ids: &[i64]) -> String {
    serde_json::Value::Array(
        ids.iter()
            .map(|id| {
                json!({
                    "id": id,
                    "file_name": format!("statement-{id}.csv"),
                    "file_type": "CSV",
                    "currency": "USD",
                    "uploaded_at": "2025-02-01T10:00:00Z",
                    "processed": true,
                    "transaction_count": 3
                })
            })
            .collect(),
    )
    .to_string()
}

pub fn transactions_body(category_id: i64) -> String {
    json!([
        {
            "id": 10,
            "date": "2025-01-14",
            "description": "CAFE NERO",
            "amount": "-4.20",
            "currency": "USD",
            "category_id": category_id,
            "category_name": "Food & Dining",
            "created_at": "2025-02-01T10:00:00Z"
        }
    ])
    .to_string()
}

/// Response bodies of the six dashboard sections, keyed by path.
pub fn dashboard_bodies(total: f64) -> Vec<(&'static str, String)> {
    vec![
        (
            "/dashboard/summary/",
            json!({"total_spending": total, "category_count": 2, "transaction_count": 3, "currency": "USD"})
                .to_string(),
        ),
        (
            "/dashboard/category-breakdown/",
            json!([{"id": 1, "name": "FOOD", "display_name": "Food & Dining", "total": total, "count": 3}])
                .to_string(),
        ),
        (
            "/dashboard/top-categories/",
            json!({"top_5": [{"name": "Food & Dining", "total": total}], "lowest_5": []}).to_string(),
        ),
        (
            "/dashboard/spending-trend/",
            json!([{"month": "Jan 2025", "total": total}]).to_string(),
        ),
        (
            "/dashboard/spending-by-weekday/",
            json!([{"day": "Monday", "total": total}, {"day": "Tuesday", "total": 0.0}]).to_string(),
        ),
        (
            "/dashboard/recommendations/",
            json!({
                "potential_savings": 12.5,
                "budget_optimization": [{"category": "Food & Dining", "suggestion": "Cook at home twice a week."}],
                "spending_pattern": "Weekday spending dominates.",
                "total_transactions": 3,
                "average_transaction": "41.50"
            })
            .to_string(),
        ),
    ]
}
