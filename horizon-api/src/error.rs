use rest_client::RestError;
use thiserror::Error;

/// Failures of the authentication collaborator
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum AuthError {
    /// The identity service rejected the credentials or refresh token
    #[error("Invalid credentials")]
    InvalidCredentials,

    /// The identity service could not be reached or answered garbage
    #[error("Authentication connection failed: {0}")]
    ConnectionFailed(String),
}

/// Outcome taxonomy of an authenticated metadata fetch
///
/// Transport failures are retried before they surface as `Unreachable`,
/// an auth failure is retried exactly once after re-authentication, and
/// protocol failures are never retried.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum FetchError {
    /// Still rejected after one re-authentication, or re-authentication failed
    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    /// Transport failure or server error after the retry budget was spent
    #[error("Service unreachable after {attempts} attempt(s): {reason}")]
    Unreachable { attempts: u32, reason: String },

    /// Unexpected status or an undecodable body
    #[error("Protocol error: {0}")]
    Protocol(String),
}

impl FetchError {
    /// Whether the caller may try the whole operation again later
    pub fn is_retryable(&self) -> bool {
        matches!(self, FetchError::Unreachable { .. })
    }
}

impl From<AuthError> for FetchError {
    fn from(error: AuthError) -> Self {
        match error {
            AuthError::InvalidCredentials => FetchError::Unauthorized(error.to_string()),
            AuthError::ConnectionFailed(reason) => FetchError::Unreachable { attempts: 1, reason },
        }
    }
}

/// High-level API errors for Horizon operations
#[derive(Debug, Error)]
pub enum ApiError {
    /// Authentication failed
    #[error("Authentication error: {0}")]
    Auth(#[from] AuthError),

    /// An authenticated fetch failed
    #[error("Fetch error: {0}")]
    Fetch(#[from] FetchError),

    /// Unauthenticated transport call failed
    #[error("Network error: {0}")]
    Network(#[from] RestError),

    /// A response was well-formed JSON but not the expected shape
    #[error("Parse error: {0}")]
    Parse(String),

    /// The requested region code is not in the region table
    #[error("Unsupported region: {0}")]
    UnsupportedRegion(String),

    /// The backoffice configuration lacks a required service
    #[error("Missing service endpoint: {0}")]
    MissingEndpoint(&'static str),
}

impl From<serde_json::Error> for ApiError {
    fn from(error: serde_json::Error) -> Self {
        ApiError::Parse(error.to_string())
    }
}

/// Type alias for results that can return an ApiError
pub type Result<T> = std::result::Result<T, ApiError>;
