use http::StatusCode;
use thiserror::Error;

/// Result type alias for fanout operations
pub type Result<T, E = FanoutError> = std::result::Result<T, E>;

/// Errors that can occur while resolving endpoints or proxying a request
#[derive(Error, Debug)]
pub enum FanoutError {
    #[error("illegal endpoint [{raw}]: {detail}")]
    InvalidEndpoint { raw: String, detail: String },

    #[error("failed to read request body: {0}")]
    RequestBodyError(String),

    #[error("request to {0} failed: {1}")]
    UpstreamRequestFailed(String, String),

    #[error("timeout")]
    UpstreamTimeout(String),

    #[error("failed to read response body from {0}: {1}")]
    ResponseBodyError(String, String),

    #[error("server returned error status {status}, response body: {body}")]
    NonSuccessStatus {
        endpoint: String,
        status: StatusCode,
        body: String,
    },

    #[error("internal error: {0}")]
    InternalError(String),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

impl FanoutError {
    /// Coarse outcome class used for log fields and metric tags.
    pub fn outcome_class(&self) -> &'static str {
        match self {
            FanoutError::UpstreamTimeout(_) => "timeout",
            FanoutError::NonSuccessStatus { .. } => "error_status",
            FanoutError::ResponseBodyError(..) => "body_error",
            _ => "failure",
        }
    }
}
