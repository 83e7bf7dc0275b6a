use std::result;

use crate::retry::RetryableError;
use thiserror::Error;

/// Error types for PubMed ingestion
#[derive(Error, Debug)]
pub enum PubMedError {
    /// HTTP request failed (connection, timeout, body read)
    #[error("HTTP request failed: {0}")]
    RequestError(#[from] reqwest::Error),

    /// Response body could not be read as XML
    #[error("XML parsing failed: {0}")]
    XmlError(String),

    /// Well-formed response that lacks fields required to continue
    #[error("Malformed response: {message}")]
    MalformedResponse { message: String },

    /// The history server rejected a fetch (expired or unknown WebEnv)
    #[error("History session error: {0}")]
    HistorySessionError(String),

    /// API rate limit exceeded
    #[error("API rate limit exceeded")]
    RateLimitExceeded,

    /// Generic API error with HTTP status code
    #[error("API error {status}: {message}")]
    ApiError { status: u16, message: String },
}

pub type Result<T> = result::Result<T, PubMedError>;

impl RetryableError for PubMedError {
    fn is_retryable(&self) -> bool {
        match self {
            PubMedError::RequestError(err) => {
                if err.is_timeout() || err.is_connect() {
                    return true;
                }

                if let Some(status) = err.status() {
                    return status.is_server_error() || status.as_u16() == 429;
                }

                // DNS failures, resets and truncated bodies
                !err.is_builder() && !err.is_redirect() && !err.is_decode()
            }

            PubMedError::RateLimitExceeded => true,

            PubMedError::ApiError { status, .. } => (500..600).contains(status) || *status == 429,

            PubMedError::XmlError(_)
            | PubMedError::MalformedResponse { .. }
            | PubMedError::HistorySessionError(_) => false,
        }
    }

    fn retry_reason(&self) -> &str {
        match self {
            PubMedError::RequestError(err) if err.is_timeout() => "Request timeout",
            PubMedError::RequestError(err) if err.is_connect() => "Connection error",
            PubMedError::RequestError(_) => "Network error",
            PubMedError::RateLimitExceeded => "Rate limit exceeded",
            PubMedError::ApiError { status: 429, .. } => "Rate limit exceeded",
            PubMedError::ApiError { status: 500..=599, .. } => "Server error",
            PubMedError::ApiError { .. } => "Client error",
            PubMedError::XmlError(_) => "Invalid XML response",
            PubMedError::MalformedResponse { .. } => "Incomplete response",
            PubMedError::HistorySessionError(_) => "History session rejected",
        }
    }
}

/// A single record in a fetched batch that could not become a citation.
///
/// These are diagnostics: the rest of the batch is still extracted, and the
/// error is handed to the caller alongside the citations rather than raised.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("record {record_index} (PMID {}) skipped: {reason}", .pmid.as_deref().unwrap_or("unknown"))]
pub struct ExtractionError {
    /// Position of the record within its batch payload
    pub record_index: usize,
    /// PMID, when it could be read before the failure
    pub pmid: Option<String>,
    pub reason: String,
}

impl ExtractionError {
    pub(crate) fn new(record_index: usize, pmid: Option<String>, reason: impl Into<String>) -> Self {
        Self {
            record_index,
            pmid,
            reason: reason.into(),
        }
    }
}
