//! Authentication collaborator and the two sign-in flows shipped with the SDK

use crate::endpoints::ServiceEndpoints;
use crate::error::AuthError;
use crate::region::RegionSettings;
use crate::session::Session;
use chrono::DateTime;
use parking_lot::Mutex;
use rest_client::{RestClient, RestError};
use serde::Deserialize;
use serde_json::{json, Value};
use tracing::{debug, warn};

/// Identity-service status code for a rejected username/password
const INVALID_CREDENTIALS_CODE: i64 = 97401;

/// Issues sessions for a household
///
/// `previous` is the session being replaced, or `None` on first sign-in.
/// Implementations are called from fetch-triggered refreshes on arbitrary
/// threads and must not call back into the session store.
pub trait Authenticator: Send + Sync {
    fn authorize(&self, previous: Option<&Session>) -> Result<Session, AuthError>;
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Grant {
    household_id: String,
    access_token: String,
    #[serde(default)]
    refresh_token: Option<String>,
    #[serde(default)]
    refresh_token_expiry: Option<i64>,
    #[serde(default)]
    username: Option<String>,
}

/// Posts username and password to the authorization service
pub struct PasswordAuthenticator {
    rest: RestClient,
    api_url: String,
    authorization_service: String,
    username: String,
    password: String,
}

impl PasswordAuthenticator {
    pub fn new(
        rest: RestClient,
        region: &RegionSettings,
        endpoints: &ServiceEndpoints,
        username: impl Into<String>,
        password: impl Into<String>,
    ) -> Self {
        Self {
            rest,
            api_url: region.api_url.to_string(),
            authorization_service: endpoints.authorization.clone(),
            username: username.into(),
            password: password.into(),
        }
    }
}

impl Authenticator for PasswordAuthenticator {
    fn authorize(&self, _previous: Option<&Session>) -> Result<Session, AuthError> {
        debug!(username = %self.username, "Authorizing with password");
        let url = format!("{}/auth-service/v1/authorization", self.api_url);
        let body = json!({ "username": self.username, "password": self.password });
        let grant = self
            .rest
            .post_json(&url, &[("x-device-code", "web")], &body)
            .map_err(auth_failure)?;
        complete_session(&self.rest, &self.authorization_service, grant)
    }
}

/// Exchanges a refresh token for a session and keeps the rotated token
pub struct RefreshTokenAuthenticator {
    rest: RestClient,
    api_url: String,
    authorization_service: String,
    refresh_token: Mutex<String>,
}

impl RefreshTokenAuthenticator {
    pub fn new(
        rest: RestClient,
        region: &RegionSettings,
        endpoints: &ServiceEndpoints,
        refresh_token: impl Into<String>,
    ) -> Self {
        Self {
            rest,
            api_url: region.api_url.to_string(),
            authorization_service: endpoints.authorization.clone(),
            refresh_token: Mutex::new(refresh_token.into()),
        }
    }

    /// The refresh token that will be used for the next exchange
    pub fn refresh_token(&self) -> String {
        self.refresh_token.lock().clone()
    }
}

impl Authenticator for RefreshTokenAuthenticator {
    fn authorize(&self, previous: Option<&Session>) -> Result<Session, AuthError> {
        let token = previous
            .and_then(|session| session.refresh_token.clone())
            .unwrap_or_else(|| self.refresh_token());

        debug!("Authorizing with refresh token");
        let url = format!("{}/auth-service/v1/authorization/refresh", self.api_url);
        let grant = self
            .rest
            .post_json(&url, &[], &json!({ "refreshToken": token }))
            .map_err(auth_failure)?;

        let session = complete_session(&self.rest, &self.authorization_service, grant)?;
        if let Some(rotated) = &session.refresh_token {
            *self.refresh_token.lock() = rotated.clone();
        }
        Ok(session)
    }
}

/// Decode the grant and fetch the push-broker token with the new access token
fn complete_session(
    rest: &RestClient,
    authorization_service: &str,
    grant: Value,
) -> Result<Session, AuthError> {
    let grant: Grant = serde_json::from_value(grant)
        .map_err(|e| AuthError::ConnectionFailed(format!("invalid authorization response: {e}")))?;

    let cookie = format!("ACCESSTOKEN={}", grant.access_token);
    let url = format!("{authorization_service}/v1/mqtt/token");
    let response = rest
        .get_json(&url, &[("Cookie", cookie.as_str())])
        .map_err(auth_failure)?;
    let push_channel_token = response
        .get("token")
        .and_then(Value::as_str)
        .ok_or_else(|| AuthError::ConnectionFailed("push token response has no token".to_string()))?
        .to_string();

    Ok(Session {
        household_id: grant.household_id,
        access_token: grant.access_token,
        push_channel_token,
        expiry: grant
            .refresh_token_expiry
            .and_then(|secs| DateTime::from_timestamp(secs, 0)),
        refresh_token: grant.refresh_token,
        username: grant.username,
    })
}

fn auth_failure(error: RestError) -> AuthError {
    match error {
        RestError::Status { code, body } => {
            let detail: Option<Value> = serde_json::from_str(&body).ok();
            let status_code = detail
                .as_ref()
                .and_then(|d| d.pointer("/error/statusCode"))
                .and_then(Value::as_i64);
            if status_code == Some(INVALID_CREDENTIALS_CODE) || code == 401 {
                return AuthError::InvalidCredentials;
            }
            let message = detail
                .as_ref()
                .and_then(|d| d.pointer("/error/message"))
                .and_then(Value::as_str)
                .map(str::to_string)
                .unwrap_or_else(|| format!("HTTP {code}"));
            warn!(code, %message, "Authorization rejected");
            AuthError::ConnectionFailed(message)
        }
        other => AuthError::ConnectionFailed(other.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_invalid_credentials_status_code() {
        let error = RestError::Status {
            code: 400,
            body: r#"{"error":{"statusCode":97401,"message":"bad"}}"#.to_string(),
        };
        assert_eq!(auth_failure(error), AuthError::InvalidCredentials);
    }

    #[test]
    fn test_other_error_keeps_message() {
        let error = RestError::Status {
            code: 500,
            body: r#"{"error":{"statusCode":1,"message":"maintenance"}}"#.to_string(),
        };
        assert_eq!(
            auth_failure(error),
            AuthError::ConnectionFailed("maintenance".to_string())
        );
    }

    #[test]
    fn test_network_failure() {
        let error = auth_failure(RestError::Network("refused".to_string()));
        assert!(matches!(error, AuthError::ConnectionFailed(_)));
    }
}
