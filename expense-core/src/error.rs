use std::collections::BTreeMap;
use std::fmt;

use thiserror::Error;

use crate::api::DashboardSection;
use crate::storage::StorageError;

/// Error outputs from the Expense Explorer client.
#[derive(Debug, Error)]
#[cfg_attr(feature = "ffi", derive(uniffi::Error))]
#[cfg_attr(feature = "ffi", uniffi(flat_error))]
pub enum ExplorerError {
    /// The presented input is not valid for the requested operation
    #[error("invalid_input: {error}")]
    InvalidInput {
        /// Description of what was wrong.
        error: String,
    },
    /// Form-level errors, reported client-side or by the server with a 400
    #[error("validation_error: {0}")]
    Validation(ValidationErrors),
    /// Statement uploads only accept `.csv` and `.pdf` files
    #[error("unsupported_file_type: {file_name} (only CSV and PDF files are supported)")]
    UnsupportedFileType {
        /// Name of the rejected file.
        file_name: String,
    },
    /// A local file could not be read before upload
    #[error("file_read_error: {path}: {error}")]
    FileRead {
        /// Path that was being read.
        path: String,
        /// Underlying error message.
        error: String,
    },
    /// Network connection error or unexpected HTTP status
    #[error("network_error: {url} (status {status:?}): {error}")]
    NetworkError {
        /// Request URL.
        url: String,
        /// HTTP status, when a response was received.
        status: Option<u16>,
        /// Error message or response body.
        error: String,
    },
    /// The request was rejected with 401 again after a successful token refresh
    #[error("unauthorized: {url}")]
    Unauthorized {
        /// Request URL.
        url: String,
    },
    /// The access token could not be refreshed; the stored session was cleared
    #[error("session_expired: {reason}")]
    SessionExpired {
        /// Why the refresh failed.
        reason: String,
    },
    /// Unexpected error serializing or parsing information
    #[error("serialization_error: {error}")]
    SerializationError {
        /// Description of the failure.
        error: String,
    },
    /// Token persistence failure
    #[error(transparent)]
    Storage(#[from] StorageError),
    /// One query of a dashboard aggregation batch failed, failing the batch
    #[error("dashboard aggregation failed at {section}: {source}")]
    Aggregation {
        /// Section whose query failed first.
        section: DashboardSection,
        /// The section's error.
        #[source]
        source: Box<ExplorerError>,
    },
}

impl ExplorerError {
    /// Whether the caller must send the user back to the login view.
    #[must_use]
    pub fn must_reauthenticate(&self) -> bool {
        match self {
            Self::SessionExpired { .. } | Self::Unauthorized { .. } => true,
            Self::Aggregation { source, .. } => source.must_reauthenticate(),
            _ => false,
        }
    }

    pub(crate) fn serialization(context: &str, error: impl fmt::Display) -> Self {
        Self::SerializationError {
            error: format!("{context}: {error}"),
        }
    }
}

/// Field-keyed validation messages.
///
/// Parsed from DRF-style bodies such as
/// `{"email": ["user with this email already exists."]}`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ValidationErrors(BTreeMap<String, Vec<String>>);

impl ValidationErrors {
    /// Builds a set holding a single message for `field`.
    #[must_use]
    pub fn single(field: &str, message: &str) -> Self {
        let mut errors = Self::default();
        errors.push(field, message);
        errors
    }

    /// Appends a message for `field`.
    pub fn push(&mut self, field: &str, message: &str) {
        self.0
            .entry(field.to_string())
            .or_default()
            .push(message.to_string());
    }

    /// Messages recorded for `field`.
    #[must_use]
    pub fn field(&self, field: &str) -> &[String] {
        self.0.get(field).map_or(&[], Vec::as_slice)
    }

    /// Whether no message was recorded.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Interprets a 400 response body. Objects map keys to messages; anything
    /// else is kept verbatim under `detail`.
    #[must_use]
    pub fn from_body(body: &[u8]) -> Self {
        let mut errors = Self::default();
        match serde_json::from_slice::<serde_json::Value>(body) {
            Ok(serde_json::Value::Object(map)) => {
                for (field, value) in map {
                    match value {
                        serde_json::Value::String(s) => errors.push(&field, &s),
                        serde_json::Value::Array(items) => {
                            for item in items {
                                match item {
                                    serde_json::Value::String(s) => errors.push(&field, &s),
                                    other => errors.push(&field, &other.to_string()),
                                }
                            }
                        }
                        other => errors.push(&field, &other.to_string()),
                    }
                }
            }
            _ => {
                let text = String::from_utf8_lossy(body);
                let text = text.trim();
                if !text.is_empty() {
                    errors.push("detail", text);
                }
            }
        }
        errors
    }
}

impl fmt::Display for ValidationErrors {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut first = true;
        for (field, messages) in &self.0 {
            if !first {
                writeln!(f)?;
            }
            first = false;
            write!(f, "{field}: {}", messages.join(", "))?;
        }
        Ok(())
    }
}
