use horizon_api::{ApiError, AuthError, FetchError};
use horizon_stream::PushError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum SdkError {
    #[error("State management error: {0}")]
    StateError(#[from] horizon_state::StateError),

    #[error("API error: {0}")]
    ApiError(#[from] ApiError),

    #[error("Authentication error: {0}")]
    AuthError(#[from] AuthError),

    #[error("Metadata lookup error: {0}")]
    FetchError(#[from] FetchError),

    #[error("Push channel error: {0}")]
    PushError(#[from] PushError),

    #[error("Logging setup error: {0}")]
    Logging(#[from] horizon_state::logging::LoggingError),

    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("Unsupported region: {0}")]
    UnsupportedRegion(String),

    #[error("Region {0} signs in through an external provider; supply an authenticator")]
    UnsupportedAuthFlow(String),

    #[error("Connect failed after {attempts} attempts: {last}")]
    ConnectFailed { attempts: u32, last: Box<SdkError> },

    #[error("System is disconnected")]
    Disconnected,
}

impl SdkError {
    /// Whether running the connect sequence again could succeed
    ///
    /// Rejected credentials and configuration problems are final. A push
    /// handshake rejection is retried with a fresh session.
    pub fn is_retryable(&self) -> bool {
        match self {
            SdkError::ApiError(ApiError::Network(e)) => e.is_transient(),
            SdkError::ApiError(ApiError::Auth(e)) | SdkError::AuthError(e) => {
                matches!(e, AuthError::ConnectionFailed(_))
            }
            SdkError::ApiError(ApiError::Fetch(e)) | SdkError::FetchError(e) => e.is_retryable(),
            SdkError::PushError(e) => matches!(
                e,
                PushError::ConnectTimeout { .. } | PushError::Rejected(_) | PushError::Closed
            ),
            _ => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rest_client::RestError;
    use std::time::Duration;

    #[test]
    fn test_retryable_classification() {
        assert!(SdkError::from(AuthError::ConnectionFailed("timeout".into())).is_retryable());
        assert!(!SdkError::from(AuthError::InvalidCredentials).is_retryable());
        assert!(SdkError::from(ApiError::Network(RestError::Status {
            code: 503,
            body: String::new()
        }))
        .is_retryable());
        assert!(!SdkError::from(ApiError::Network(RestError::Status {
            code: 404,
            body: String::new()
        }))
        .is_retryable());
        assert!(SdkError::from(FetchError::Unreachable { attempts: 3, reason: "down".into() })
            .is_retryable());
        assert!(!SdkError::from(FetchError::Protocol("bad".into())).is_retryable());
        assert!(SdkError::from(PushError::Rejected("bad token".into())).is_retryable());
        assert!(SdkError::from(PushError::ConnectTimeout {
            timeout: Duration::from_secs(1),
            last_error: "refused".into()
        })
        .is_retryable());
        assert!(!SdkError::from(PushError::Configuration("port".into())).is_retryable());
        assert!(!SdkError::Configuration("attempts".into()).is_retryable());
    }

    #[test]
    fn test_connect_failed_message_keeps_cause() {
        let error = SdkError::ConnectFailed {
            attempts: 3,
            last: Box::new(SdkError::from(PushError::Closed)),
        };
        let message = error.to_string();
        assert!(message.starts_with("Connect failed after 3 attempts"));
        assert!(message.contains("Push channel error"));
    }
}
