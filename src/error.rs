// src/error.rs
//! Application error types with structured error handling.
//!
//! Per-item failures are collected into a [`ConvertError`] aggregate while a
//! converter runs; the dispatcher later classifies that aggregate into one
//! [`ImportError`] the caller can act on.

use crate::converter::ImportMode;
use std::fmt;
use thiserror::Error;

/// Notion API error codes as a typed vocabulary.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NotionErrorCode {
    /// The request URL is not a valid Notion endpoint
    InvalidRequestUrl,
    /// The request is not supported
    InvalidRequest,
    /// Request body contains invalid JSON
    InvalidJson,
    /// Request parameters failed Notion's validation
    ValidationFailed,
    /// API key is invalid or expired
    Unauthorized,
    /// API key lacks permission for this resource
    RestrictedResource,
    /// The requested object does not exist or is inaccessible
    ObjectNotFound,
    /// Conflict with current state of the resource
    Conflict,
    /// API rate limit exceeded
    RateLimited,
    /// Notion internal server error
    InternalError,
    /// Notion is temporarily unavailable
    ServiceUnavailable,
    /// HTTP status code fallback when the error body is unparseable
    HttpStatus(u16),
    /// An error code this client doesn't recognize yet
    Unknown(String),
}

impl NotionErrorCode {
    /// Parse a Notion API error code string into the typed vocabulary.
    pub fn from_api_response(code: &str) -> Self {
        match code {
            "invalid_request_url" => Self::InvalidRequestUrl,
            "invalid_request" => Self::InvalidRequest,
            "invalid_json" => Self::InvalidJson,
            "validation_error" => Self::ValidationFailed,
            "unauthorized" => Self::Unauthorized,
            "restricted_resource" => Self::RestrictedResource,
            "object_not_found" => Self::ObjectNotFound,
            "conflict_error" => Self::Conflict,
            "rate_limited" => Self::RateLimited,
            "internal_server_error" => Self::InternalError,
            "service_unavailable" => Self::ServiceUnavailable,
            other => Self::Unknown(other.to_string()),
        }
    }

    /// Create from an HTTP status code when the error body is unparseable.
    pub fn from_http_status(status: u16) -> Self {
        match status {
            401 => Self::Unauthorized,
            403 => Self::RestrictedResource,
            404 => Self::ObjectNotFound,
            429 => Self::RateLimited,
            500 => Self::InternalError,
            503 => Self::ServiceUnavailable,
            other => Self::HttpStatus(other),
        }
    }

    /// Whether this error is transient and worth retrying.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            Self::RateLimited | Self::ServiceUnavailable | Self::InternalError
        )
    }
}

impl fmt::Display for NotionErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidRequestUrl => write!(f, "invalid_request_url"),
            Self::InvalidRequest => write!(f, "invalid_request"),
            Self::InvalidJson => write!(f, "invalid_json"),
            Self::ValidationFailed => write!(f, "validation_error"),
            Self::Unauthorized => write!(f, "unauthorized"),
            Self::RestrictedResource => write!(f, "restricted_resource"),
            Self::ObjectNotFound => write!(f, "object_not_found"),
            Self::Conflict => write!(f, "conflict_error"),
            Self::RateLimited => write!(f, "rate_limited"),
            Self::InternalError => write!(f, "internal_server_error"),
            Self::ServiceUnavailable => write!(f, "service_unavailable"),
            Self::HttpStatus(code) => write!(f, "http_{}", code),
            Self::Unknown(code) => write!(f, "{}", code),
        }
    }
}

/// Returned by the progress sink once the caller asked to stop.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq, Default)]
#[error("import cancelled")]
pub struct CancelError;

/// Main application error type.
#[derive(Error, Debug)]
pub enum AppError {
    #[error("Missing configuration: {0}")]
    MissingConfiguration(String),

    #[error("Network failure: {0}")]
    NetworkFailure(#[from] reqwest::Error),

    #[error("Notion API returned an error ({code}): {message}")]
    NotionService {
        code: NotionErrorCode,
        message: String,
        status: u16,
    },

    #[error("Malformed response: {0}")]
    MalformedResponse(String),

    #[error("Filesystem IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Archive error: {0}")]
    Archive(#[from] zip::result::ZipError),

    #[error("Failed to parse {path}: {message}")]
    Parse { path: String, message: String },

    #[error("Unknown import format: {0}")]
    UnknownFormat(String),

    #[error("No objects to import")]
    NoObjectsToImport,

    #[error("Object store error: {0}")]
    Store(String),

    #[error("Maximum recursion depth ({0}) exceeded")]
    RecursionLimitExceeded(usize),

    #[error("Internal error: {message}")]
    InternalError { message: String },

    #[error(transparent)]
    Cancelled(#[from] CancelError),

    #[error(transparent)]
    ValidationError(#[from] crate::types::ValidationError),
}

impl From<serde_json::Error> for AppError {
    fn from(err: serde_json::Error) -> Self {
        AppError::MalformedResponse(err.to_string())
    }
}

impl AppError {
    /// Transport-level failures; the only kind the search retry re-attempts.
    pub fn is_transport(&self) -> bool {
        matches!(self, AppError::NetworkFailure(_))
    }

    pub fn is_cancelled(&self) -> bool {
        matches!(self, AppError::Cancelled(_))
    }

    pub fn notion_code(&self) -> Option<&NotionErrorCode> {
        match self {
            AppError::NotionService { code, .. } => Some(code),
            _ => None,
        }
    }
}

/// Ordered aggregate of per-item failures, keyed by path or object name.
#[derive(Debug, Default)]
pub struct ConvertError {
    errors: Vec<(String, AppError)>,
}

impl ConvertError {
    pub fn new() -> Self {
        Self::default()
    }

    /// Aggregate holding a single failure.
    pub fn from_error(key: impl Into<String>, err: impl Into<AppError>) -> Self {
        let mut aggregate = Self::new();
        aggregate.add(key, err);
        aggregate
    }

    pub fn add(&mut self, key: impl Into<String>, err: impl Into<AppError>) {
        self.errors.push((key.into(), err.into()));
    }

    pub fn merge(&mut self, other: ConvertError) {
        self.errors.extend(other.errors);
    }

    pub fn is_empty(&self) -> bool {
        self.errors.is_empty()
    }

    pub fn len(&self) -> usize {
        self.errors.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &AppError)> {
        self.errors.iter().map(|(key, err)| (key.as_str(), err))
    }

    pub fn get(&self, key: &str) -> Option<&AppError> {
        self.errors.iter().find(|(k, _)| k == key).map(|(_, e)| e)
    }

    /// Whether the converter has to stop at the current item boundary.
    ///
    /// Inputs that merely held nothing importable never abort a run.
    pub fn should_abort(&self, mode: ImportMode) -> bool {
        mode == ImportMode::AllOrNothing
            && self
                .errors
                .iter()
                .any(|(_, e)| !matches!(e, AppError::NoObjectsToImport))
    }

    pub fn is_cancelled(&self) -> bool {
        self.errors.iter().any(|(_, e)| e.is_cancelled())
    }

    fn has_notion_code(&self, wanted: &NotionErrorCode) -> bool {
        self.errors
            .iter()
            .any(|(_, e)| e.notion_code() == Some(wanted))
    }

    /// Classifies the aggregate into the error surfaced to the caller.
    pub fn result_error(self) -> Option<ImportError> {
        if self.is_empty() {
            return None;
        }
        if self.is_cancelled() {
            return Some(ImportError::Cancelled);
        }
        if self
            .errors
            .iter()
            .any(|(_, e)| matches!(e, AppError::NoObjectsToImport))
        {
            return Some(ImportError::NoObjectsToImport);
        }
        if self.has_notion_code(&NotionErrorCode::Unauthorized) {
            return Some(ImportError::Unauthorized);
        }
        if self.has_notion_code(&NotionErrorCode::RateLimited) {
            return Some(ImportError::RateLimited);
        }
        Some(ImportError::Failed(self))
    }
}

impl fmt::Display for ConvertError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let parts: Vec<String> = self
            .errors
            .iter()
            .map(|(key, err)| format!("{}: {}", key, err))
            .collect();
        write!(f, "{}", parts.join("; "))
    }
}

impl std::error::Error for ConvertError {}

/// The classified top-level outcome of a failed or partial import.
#[derive(Error, Debug)]
pub enum ImportError {
    #[error("import cancelled")]
    Cancelled,

    #[error("no objects to import")]
    NoObjectsToImport,

    #[error("Notion rejected the API key")]
    Unauthorized,

    #[error("Notion rate limit exceeded")]
    RateLimited,

    #[error("import failed: {0}")]
    Failed(ConvertError),
}

/// Result type alias for convenience
pub type Result<T, E = AppError> = std::result::Result<T, E>;

#[cfg(test)]
mod tests {
    use super::*;

    fn notion(code: NotionErrorCode) -> AppError {
        AppError::NotionService {
            code,
            message: "boom".to_string(),
            status: 400,
        }
    }

    #[test]
    fn decodes_known_codes() {
        assert_eq!(
            NotionErrorCode::from_api_response("invalid_request_url"),
            NotionErrorCode::InvalidRequestUrl
        );
        assert_eq!(
            NotionErrorCode::from_api_response("something_new"),
            NotionErrorCode::Unknown("something_new".to_string())
        );
        assert!(NotionErrorCode::RateLimited.is_retryable());
        assert!(!NotionErrorCode::Unauthorized.is_retryable());
    }

    #[test]
    fn abort_depends_on_mode() {
        let mut errors = ConvertError::new();
        assert!(!errors.should_abort(ImportMode::AllOrNothing));
        errors.add("notes", AppError::NoObjectsToImport);
        assert!(!errors.should_abort(ImportMode::AllOrNothing));
        errors.add("a.html", AppError::MalformedResponse("bad".into()));
        assert!(errors.should_abort(ImportMode::AllOrNothing));
        assert!(!errors.should_abort(ImportMode::IgnoreErrors));
    }

    #[test]
    fn classification_priority() {
        let mut errors = ConvertError::new();
        errors.add("x", notion(NotionErrorCode::Unauthorized));
        errors.add("y", AppError::NoObjectsToImport);
        assert!(matches!(
            errors.result_error(),
            Some(ImportError::NoObjectsToImport)
        ));

        let mut errors = ConvertError::new();
        errors.add("x", notion(NotionErrorCode::RateLimited));
        errors.add("y", CancelError);
        assert!(matches!(errors.result_error(), Some(ImportError::Cancelled)));

        let errors = ConvertError::from_error("x", notion(NotionErrorCode::RateLimited));
        assert!(matches!(errors.result_error(), Some(ImportError::RateLimited)));

        assert!(ConvertError::new().result_error().is_none());
    }

    #[test]
    fn merge_keeps_order() {
        let mut first = ConvertError::from_error("a", AppError::NoObjectsToImport);
        first.merge(ConvertError::from_error("b", AppError::Store("x".into())));
        let keys: Vec<&str> = first.iter().map(|(k, _)| k).collect();
        assert_eq!(keys, vec!["a", "b"]);
    }
}
