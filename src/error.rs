//! Quota enforcement errors
//!
//! These are the errors the gate surfaces to callers. Store-layer failures
//! keep using the actix error helpers directly.

use actix_web::http::StatusCode;
use actix_web::HttpResponse;
use serde_json::json;
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum QuotaError {
    /// The operation would push the member past the configured ceiling.
    /// Recoverable by freeing space or uploading less.
    #[error("the allowed storage is full")]
    StorageExceeded,

    /// The size path resolved to something that is not an integer, or the
    /// size was required but missing. Not retryable with the same input.
    #[error("the file size is not correctly defined")]
    FileSizeNotFound,
}

impl QuotaError {
    /// Stable machine-readable code carried in the response body.
    pub fn code(&self) -> &'static str {
        match self {
            QuotaError::StorageExceeded => "STORAGE_EXCEEDED",
            QuotaError::FileSizeNotFound => "FILE_SIZE_NOT_FOUND",
        }
    }
}

impl actix_web::ResponseError for QuotaError {
    fn status_code(&self) -> StatusCode {
        match self {
            QuotaError::StorageExceeded => StatusCode::INSUFFICIENT_STORAGE,
            QuotaError::FileSizeNotFound => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn error_response(&self) -> HttpResponse {
        HttpResponse::build(self.status_code()).json(json!({
            "code": self.code(),
            "message": self.to_string(),
        }))
    }
}
