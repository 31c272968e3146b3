//! Error types for the REST client

use thiserror::Error;

/// Errors that can occur during a REST call
#[derive(Debug, Error)]
pub enum RestError {
    /// Transport failure: DNS, TCP, TLS or a timeout
    #[error("Network/HTTP error: {0}")]
    Network(String),

    /// The server answered with a non-success status
    #[error("HTTP status {code}: {body}")]
    Status { code: u16, body: String },

    /// The body could not be decoded as JSON
    #[error("JSON parsing error: {0}")]
    Parse(String),
}

impl RestError {
    /// Status code of the failed response, if the server answered at all
    pub fn status_code(&self) -> Option<u16> {
        match self {
            RestError::Status { code, .. } => Some(*code),
            _ => None,
        }
    }

    /// 401 and 403 both mean the access token is no longer accepted
    pub fn is_unauthorized(&self) -> bool {
        matches!(self.status_code(), Some(401) | Some(403))
    }

    /// Whether another attempt could succeed without changing the request
    pub fn is_transient(&self) -> bool {
        match self {
            RestError::Network(_) => true,
            RestError::Status { code, .. } => *code >= 500,
            RestError::Parse(_) => false,
        }
    }
}
