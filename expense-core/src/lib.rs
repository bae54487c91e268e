#![deny(clippy::all, clippy::pedantic, clippy::nursery)]
//! Client core for Expense Explorer.
//!
//! Holds the user's access/refresh token pair, sends every API call through a
//! pipeline that attaches the bearer token and transparently refreshes it once
//! on a 401, and wraps the REST endpoints (auth, statements, transactions,
//! categories, dashboard) in typed calls.
//!
//! ```no_run
//! use std::sync::Arc;
//!
//! use expense_core::{ClientConfig, ExpenseClient, InMemoryKeyValueStore};
//!
//! # async fn run() -> Result<(), expense_core::ExplorerError> {
//! let config = ClientConfig::from_env()?;
//! let client = ExpenseClient::new(&config, Arc::new(InMemoryKeyValueStore::new()));
//! client.session().start();
//! client.auth().login("ada@example.com", "correct horse").await?;
//!
//! let dashboard = client.dashboard_controller();
//! dashboard.initialize().await?;
//! # Ok(())
//! # }
//! ```

mod error;
pub use error::*;

mod config;
pub use config::*;

mod client;
pub use client::ExpenseClient;

mod session;
pub use session::{AuthSession, AuthState, SessionObserver};

pub mod api;
pub mod controller;
pub mod http;
pub mod logger;
pub mod storage;
pub mod token;

pub use http::RequestPipeline;
pub use storage::{FileKeyValueStore, InMemoryKeyValueStore, KeyValueStore, StorageError};
pub use token::{TokenPair, TokenStore};

#[cfg(feature = "ffi")]
uniffi::setup_scaffolding!("expense_core");
