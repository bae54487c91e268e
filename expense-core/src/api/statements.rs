use std::path::Path;
use std::sync::Arc;

use strum::{AsRefStr, Display};

use super::models::{Currency, Statement, UploadResult};
use super::parse_listing;
use crate::error::ExplorerError;
use crate::http::{MultipartField, PendingRequest, RequestPipeline};

/// Largest statement file the server accepts.
pub const MAX_UPLOAD_BYTES: u64 = 10 * 1024 * 1024;

/// Statement formats the server can parse.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, AsRefStr)]
#[strum(serialize_all = "UPPERCASE")]
pub enum StatementFileType {
    /// Comma-separated export.
    Csv,
    /// PDF statement.
    Pdf,
}

/// Classifies `file_name` by its extension (case-insensitive).
///
/// # Errors
///
/// Returns [`ExplorerError::UnsupportedFileType`] for anything other than
/// `.csv` or `.pdf`.
pub fn check_upload_file_name(file_name: &str) -> Result<StatementFileType, ExplorerError> {
    let extension = Path::new(file_name)
        .extension()
        .and_then(|ext| ext.to_str())
        .map(str::to_ascii_lowercase);

    match extension.as_deref() {
        Some("csv") => Ok(StatementFileType::Csv),
        Some("pdf") => Ok(StatementFileType::Pdf),
        _ => Err(ExplorerError::UnsupportedFileType {
            file_name: file_name.to_string(),
        }),
    }
}

fn check_size(file_name: &str, size: u64) -> Result<(), ExplorerError> {
    if size > MAX_UPLOAD_BYTES {
        return Err(ExplorerError::InvalidInput {
            error: format!("{file_name} is {size} bytes, the limit is {MAX_UPLOAD_BYTES}"),
        });
    }
    Ok(())
}

/// Statement endpoints.
#[derive(Debug, Clone)]
pub struct StatementsApi {
    pipeline: Arc<RequestPipeline>,
}

impl StatementsApi {
    pub(crate) const fn new(pipeline: Arc<RequestPipeline>) -> Self {
        Self { pipeline }
    }

    /// All statements of the signed-in user, newest first.
    ///
    /// # Errors
    ///
    /// Returns a network or session error.
    pub async fn list(&self) -> Result<Vec<Statement>, ExplorerError> {
        let response = self
            .pipeline
            .execute_checked(PendingRequest::get("/statements/"))
            .await?;
        parse_listing(&response)
    }

    /// One statement.
    ///
    /// # Errors
    ///
    /// Returns a network or session error.
    pub async fn get(&self, id: i64) -> Result<Statement, ExplorerError> {
        self.pipeline
            .execute_checked(PendingRequest::get(format!("/statements/{id}/")))
            .await?
            .json()
    }

    /// Deletes a statement and its transactions.
    ///
    /// # Errors
    ///
    /// Returns a network or session error.
    pub async fn delete(&self, id: i64) -> Result<(), ExplorerError> {
        self.pipeline
            .execute_checked(PendingRequest::delete(format!("/statements/{id}/")))
            .await?;
        Ok(())
    }

    /// Uploads the statement file at `path`.
    ///
    /// The file name is checked before the file is opened.
    ///
    /// # Errors
    ///
    /// Returns [`ExplorerError::UnsupportedFileType`] or
    /// [`ExplorerError::FileRead`] before any network call, or the upload's
    /// network/validation error.
    pub async fn upload(
        &self,
        path: &Path,
        currency: Currency,
    ) -> Result<UploadResult, ExplorerError> {
        let file_name = path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_default();
        check_upload_file_name(&file_name)?;

        let read_error = |e: std::io::Error| ExplorerError::FileRead {
            path: path.display().to_string(),
            error: e.to_string(),
        };
        let size = tokio::fs::metadata(path).await.map_err(read_error)?.len();
        check_size(&file_name, size)?;
        let bytes = tokio::fs::read(path).await.map_err(read_error)?;

        self.upload_bytes(&file_name, bytes, currency).await
    }

    /// Uploads in-memory statement contents under `file_name`.
    ///
    /// # Errors
    ///
    /// See [`Self::upload`].
    pub async fn upload_bytes(
        &self,
        file_name: &str,
        bytes: Vec<u8>,
        currency: Currency,
    ) -> Result<UploadResult, ExplorerError> {
        let file_type = check_upload_file_name(file_name)?;
        check_size(file_name, u64::try_from(bytes.len()).unwrap_or(u64::MAX))?;
        log::debug!("uploading {file_type} statement {file_name} ({} bytes)", bytes.len());

        let request = PendingRequest::post("/statements/upload/").multipart(vec![
            MultipartField::File {
                name: "file".to_string(),
                file_name: file_name.to_string(),
                bytes,
            },
            MultipartField::Text {
                name: "currency".to_string(),
                value: currency.to_string(),
            },
        ]);
        self.pipeline.execute_checked(request).await?.json()
    }
}

#[cfg(test)]
mod tests {
    use test_case::test_case;

    use super::*;

    #[test_case("march.csv", Some(StatementFileType::Csv) ; "csv")]
    #[test_case("March.CSV", Some(StatementFileType::Csv) ; "uppercase csv")]
    #[test_case("scan.Pdf", Some(StatementFileType::Pdf) ; "mixed case pdf")]
    #[test_case("notes.txt", None ; "text file")]
    #[test_case("archive.csv.zip", None ; "csv inside archive")]
    #[test_case("csv", None ; "bare name without extension")]
    #[test_case("", None ; "empty name")]
    fn test_check_upload_file_name(name: &str, expected: Option<StatementFileType>) {
        match (check_upload_file_name(name), expected) {
            (Ok(actual), Some(expected)) => assert_eq!(actual, expected),
            (Err(ExplorerError::UnsupportedFileType { file_name }), None) => {
                assert_eq!(file_name, name);
            }
            (other, expected) => panic!("{name}: got {other:?}, expected {expected:?}"),
        }
    }

    #[test]
    fn test_size_limit() {
        assert!(check_size("a.csv", MAX_UPLOAD_BYTES).is_ok());
        assert!(matches!(
            check_size("a.csv", MAX_UPLOAD_BYTES + 1),
            Err(ExplorerError::InvalidInput { .. })
        ));
    }

    #[test]
    fn test_file_type_labels() {
        assert_eq!(StatementFileType::Csv.as_ref(), "CSV");
        assert_eq!(StatementFileType::Pdf.to_string(), "PDF");
    }
}
