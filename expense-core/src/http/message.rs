//! Replayable request descriptions and fully-read responses.

use reqwest::multipart::{Form, Part};
use reqwest::{Method, RequestBuilder};
use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::error::{ExplorerError, ValidationErrors};

/// Whether the access token is attached to a request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthMode {
    /// Attach the stored access token and recover from a 401 by refreshing it.
    Bearer,
    /// Never attach a token and never refresh (login, registration).
    Anonymous,
}

/// One field of a multipart body.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MultipartField {
    /// Plain text field.
    Text {
        /// Form field name.
        name: String,
        /// Field value.
        value: String,
    },
    /// File upload field.
    File {
        /// Form field name.
        name: String,
        /// File name sent to the server.
        file_name: String,
        /// File contents.
        bytes: Vec<u8>,
    },
}

/// Request payload.
#[derive(Debug, Clone, PartialEq)]
pub enum RequestBody {
    /// No body.
    Empty,
    /// JSON document.
    Json(serde_json::Value),
    /// `multipart/form-data` fields.
    Multipart(Vec<MultipartField>),
}

/// An outbound call that can be re-issued after a token refresh.
///
/// The HTTP request is rebuilt from this description for every attempt.
#[derive(Debug, Clone, PartialEq)]
pub struct PendingRequest {
    method: Method,
    path: String,
    query: Vec<(String, String)>,
    body: RequestBody,
    auth: AuthMode,
    retried: bool,
}

impl PendingRequest {
    /// Describes a request to `path` (relative to the API root).
    #[must_use]
    pub fn new(method: Method, path: impl Into<String>) -> Self {
        Self {
            method,
            path: path.into(),
            query: Vec::new(),
            body: RequestBody::Empty,
            auth: AuthMode::Bearer,
            retried: false,
        }
    }

    /// `GET path`
    #[must_use]
    pub fn get(path: impl Into<String>) -> Self {
        Self::new(Method::GET, path)
    }

    /// `POST path`
    #[must_use]
    pub fn post(path: impl Into<String>) -> Self {
        Self::new(Method::POST, path)
    }

    /// `PATCH path`
    #[must_use]
    pub fn patch(path: impl Into<String>) -> Self {
        Self::new(Method::PATCH, path)
    }

    /// `DELETE path`
    #[must_use]
    pub fn delete(path: impl Into<String>) -> Self {
        Self::new(Method::DELETE, path)
    }

    /// Appends a query parameter.
    #[must_use]
    pub fn query(mut self, key: &str, value: impl ToString) -> Self {
        self.query.push((key.to_string(), value.to_string()));
        self
    }

    /// Appends a query parameter when `value` is set.
    #[must_use]
    pub fn query_opt<V: ToString>(self, key: &str, value: Option<V>) -> Self {
        match value {
            Some(value) => self.query(key, value),
            None => self,
        }
    }

    /// Sets a JSON body.
    ///
    /// # Errors
    ///
    /// Returns an error if `body` cannot be serialized.
    pub fn json<T: Serialize + ?Sized>(mut self, body: &T) -> Result<Self, ExplorerError> {
        let value = serde_json::to_value(body)
            .map_err(|e| ExplorerError::serialization("failed to encode request body", e))?;
        self.body = RequestBody::Json(value);
        Ok(self)
    }

    /// Sets a multipart body.
    #[must_use]
    pub fn multipart(mut self, fields: Vec<MultipartField>) -> Self {
        self.body = RequestBody::Multipart(fields);
        self
    }

    /// Sends the request without credentials and without refresh handling.
    #[must_use]
    pub const fn anonymous(mut self) -> Self {
        self.auth = AuthMode::Anonymous;
        self
    }

    /// HTTP method.
    #[must_use]
    pub const fn method(&self) -> &Method {
        &self.method
    }

    /// Path relative to the API root.
    #[must_use]
    pub fn path(&self) -> &str {
        &self.path
    }

    /// Query parameters in insertion order.
    #[must_use]
    pub fn query_pairs(&self) -> &[(String, String)] {
        &self.query
    }

    /// Request body.
    #[must_use]
    pub const fn body(&self) -> &RequestBody {
        &self.body
    }

    /// Credential handling.
    #[must_use]
    pub const fn auth(&self) -> AuthMode {
        self.auth
    }

    /// Whether this request was already re-issued after a refresh.
    #[must_use]
    pub const fn is_retried(&self) -> bool {
        self.retried
    }

    pub(crate) fn mark_retried(&mut self) {
        self.retried = true;
    }

    /// Applies query, credentials and body to `builder`.
    pub(crate) fn apply(&self, mut builder: RequestBuilder, token: Option<&str>) -> RequestBuilder {
        if !self.query.is_empty() {
            builder = builder.query(&self.query);
        }
        if let Some(token) = token {
            builder = builder.bearer_auth(token);
        }
        match &self.body {
            RequestBody::Empty => builder,
            RequestBody::Json(value) => builder.json(value),
            RequestBody::Multipart(fields) => builder.multipart(build_form(fields)),
        }
    }
}

fn build_form(fields: &[MultipartField]) -> Form {
    fields.iter().fold(Form::new(), |form, field| match field {
        MultipartField::Text { name, value } => form.text(name.clone(), value.clone()),
        MultipartField::File {
            name,
            file_name,
            bytes,
        } => form.part(
            name.clone(),
            Part::bytes(bytes.clone()).file_name(file_name.clone()),
        ),
    })
}

/// A received response with its body already read.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApiResponse {
    status: u16,
    url: String,
    body: Vec<u8>,
}

impl ApiResponse {
    /// Builds a response from its parts.
    #[must_use]
    pub const fn new(status: u16, url: String, body: Vec<u8>) -> Self {
        Self { status, url, body }
    }

    pub(crate) async fn read(response: reqwest::Response) -> Result<Self, ExplorerError> {
        let status = response.status().as_u16();
        let url = response.url().to_string();
        let body = response
            .bytes()
            .await
            .map_err(|e| ExplorerError::NetworkError {
                url: url.clone(),
                status: Some(status),
                error: format!("failed to read response body: {e}"),
            })?
            .to_vec();
        Ok(Self { status, url, body })
    }

    /// HTTP status code.
    #[must_use]
    pub const fn status(&self) -> u16 {
        self.status
    }

    /// Whether the status is 2xx.
    #[must_use]
    pub const fn is_success(&self) -> bool {
        self.status >= 200 && self.status < 300
    }

    /// Final request URL.
    #[must_use]
    pub fn url(&self) -> &str {
        &self.url
    }

    /// Raw body bytes.
    #[must_use]
    pub fn body(&self) -> &[u8] {
        &self.body
    }

    /// Parses the body as JSON.
    ///
    /// # Errors
    ///
    /// Returns an error if the body is not a valid `T`.
    pub fn json<T: DeserializeOwned>(&self) -> Result<T, ExplorerError> {
        serde_json::from_slice(&self.body).map_err(|e| {
            ExplorerError::serialization(&format!("unexpected response from {}", self.url), e)
        })
    }

    /// Server-provided message, from an `error`, `detail` or `message` field or
    /// the raw body.
    #[must_use]
    pub fn message(&self) -> String {
        if let Ok(serde_json::Value::Object(map)) =
            serde_json::from_slice::<serde_json::Value>(&self.body)
        {
            for key in ["error", "detail", "message"] {
                if let Some(serde_json::Value::String(text)) = map.get(key) {
                    return text.clone();
                }
            }
        }
        let text = String::from_utf8_lossy(&self.body).trim().to_string();
        if text.is_empty() {
            format!("request failed with status {}", self.status)
        } else {
            text
        }
    }

    /// Turns non-2xx responses into errors: 400 becomes
    /// [`ExplorerError::Validation`], anything else
    /// [`ExplorerError::NetworkError`].
    ///
    /// # Errors
    ///
    /// Returns the error described above.
    pub fn error_for_status(self) -> Result<Self, ExplorerError> {
        match self.status {
            200..=299 => Ok(self),
            400 => Err(ExplorerError::Validation(ValidationErrors::from_body(
                &self.body,
            ))),
            status => Err(ExplorerError::NetworkError {
                error: self.message(),
                url: self.url,
                status: Some(status),
            }),
        }
    }
}
