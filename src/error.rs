//! Error taxonomy for the pallet worker
//!
//! - [`FetchError`] / [`SubmitError`]: Quality API failures, wrapping an [`ApiError`].
//!   The pallet processor logs these and never propagates them.
//! - [`crate::transport::mqtt::DecodeError`]: malformed inbound payloads
//! - [`crate::transport::mqtt::MqttError`]: broker connect-class failures
//! - [`crate::config::ConfigError`]: startup configuration problems
//!
//! [`WorkerError`] is what startup and the run loop return to `main`.

use once_cell::sync::Lazy;
use regex::Regex;
use reqwest::StatusCode;
use thiserror::Error;

/// Transport- or protocol-level failure of a single Quality API call
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("request to {url} failed: {source}")]
    Request {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("{url} responded with HTTP {status}")]
    Status { url: String, status: StatusCode },

    #[error("response body from {url} is not valid JSON: {source}")]
    InvalidBody {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("cannot build request URL for pallet '{pallet_id}'")]
    InvalidUrl { pallet_id: String },
}

impl ApiError {
    /// HTTP status for non-2xx responses
    pub fn status(&self) -> Option<StatusCode> {
        match self {
            ApiError::Status { status, .. } => Some(*status),
            ApiError::Request { source, .. } => source.status(),
            _ => None,
        }
    }

    pub fn is_timeout(&self) -> bool {
        matches!(self, ApiError::Request { source, .. } if source.is_timeout())
    }
}

/// Fetching pallet data failed
#[derive(Debug, Error)]
#[error("Failed to fetch data for pallet {pallet_id}: {source}")]
pub struct FetchError {
    pub pallet_id: String,
    #[source]
    pub source: ApiError,
}

/// Submitting analysis results failed
#[derive(Debug, Error)]
#[error("Failed to submit results for pallet {pallet_id}: {source}")]
pub struct SubmitError {
    pub pallet_id: String,
    #[source]
    pub source: ApiError,
}

/// Crate-wide error type
#[derive(Debug, Error)]
pub enum WorkerError {
    #[error("Configuration error: {0}")]
    Config(#[from] crate::config::ConfigError),

    #[error("Broker connection error: {0}")]
    Connect(#[from] crate::transport::mqtt::MqttError),
}

/// Result type for worker operations
pub type WorkerResult<T> = Result<T, WorkerError>;

static SECRET_PATTERN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)(password|token|key|secret)[=:]\s*\S+").expect("secret pattern is valid")
});

const MAX_LOGGED_ERROR_LEN: usize = 500;

/// Redact credential-looking values and bound the length of an error message
/// before it is logged.
pub fn sanitize_error_message(message: &str) -> String {
    let mut sanitized = SECRET_PATTERN
        .replace_all(message, "${1}=***")
        .to_string();

    if sanitized.len() > MAX_LOGGED_ERROR_LEN {
        let truncate_suffix = "...[truncated]";
        let mut cut = MAX_LOGGED_ERROR_LEN - truncate_suffix.len();
        while !sanitized.is_char_boundary(cut) {
            cut -= 1;
        }
        sanitized = format!("{}{}", &sanitized[..cut], truncate_suffix);
    }

    sanitized
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fetch_error_display_names_pallet() {
        let error = FetchError {
            pallet_id: "P2".to_string(),
            source: ApiError::Status {
                url: "http://api/pallets/P2/data".to_string(),
                status: StatusCode::NOT_FOUND,
            },
        };

        let text = error.to_string();
        assert!(text.contains("P2"));
        assert!(text.contains("404"));
        assert_eq!(error.source.status(), Some(StatusCode::NOT_FOUND));
    }

    #[test]
    fn test_submit_error_display() {
        let error = SubmitError {
            pallet_id: "P9".to_string(),
            source: ApiError::Status {
                url: "http://api/pallets/P9/results".to_string(),
                status: StatusCode::INTERNAL_SERVER_ERROR,
            },
        };
        assert_eq!(
            error.to_string(),
            "Failed to submit results for pallet P9: http://api/pallets/P9/results responded with HTTP 500 Internal Server Error"
        );
    }

    #[test]
    fn test_invalid_url_has_no_status() {
        let error = ApiError::InvalidUrl {
            pallet_id: "x".to_string(),
        };
        assert_eq!(error.status(), None);
        assert!(!error.is_timeout());
    }

    #[test]
    fn test_worker_error_wraps_config_errors() {
        let error: WorkerError =
            crate::config::ConfigError::InvalidConfig("port must be non-zero".to_string()).into();
        assert!(matches!(error, WorkerError::Config(_)));
        assert_eq!(
            error.to_string(),
            "Configuration error: Invalid configuration: port must be non-zero"
        );
    }

    #[test]
    fn test_sanitize_redacts_secrets() {
        let sanitized =
            sanitize_error_message("auth failed: password=secret123 api_key=abc token: t0k");

        assert!(!sanitized.contains("secret123"));
        assert!(!sanitized.contains("abc"));
        assert!(!sanitized.contains("t0k"));
        assert!(sanitized.contains("password=***"));
        assert!(sanitized.contains("key=***"));
    }

    #[test]
    fn test_sanitize_case_insensitive() {
        let sanitized = sanitize_error_message("PASSWORD=secret123 Token=abc Key=xyz");
        assert!(!sanitized.contains("secret123"));
        assert!(!sanitized.contains("xyz"));
    }

    #[test]
    fn test_sanitize_truncates_long_messages() {
        let sanitized = sanitize_error_message(&"x".repeat(600));
        assert!(sanitized.len() <= 500);
        assert!(sanitized.ends_with("...[truncated]"));

        let exact = sanitize_error_message(&"x".repeat(500));
        assert_eq!(exact.len(), 500);
        assert!(!exact.contains("truncated"));
    }

    #[test]
    fn test_sanitize_truncates_on_char_boundary() {
        let sanitized = sanitize_error_message(&"é".repeat(400));
        assert!(sanitized.len() <= 500);
        assert!(sanitized.ends_with("...[truncated]"));
    }

    #[test]
    fn test_sanitize_empty_message() {
        assert_eq!(sanitize_error_message(""), "");
    }
}
