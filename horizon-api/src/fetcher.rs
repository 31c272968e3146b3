//! Authenticated GET with bounded retries and one re-authentication

use crate::error::FetchError;
use crate::session::{Session, SessionStore};
use rest_client::{RestClient, RestError};
use serde_json::Value;
use std::sync::Arc;
use std::thread;
use std::time::Duration;
use tracing::{debug, warn};

/// Exponential backoff budget for transient failures
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Total attempts, including the first one
    /// Default: 3
    pub max_attempts: u32,

    /// Delay before the second attempt; doubled for every further attempt
    /// Default: 500 ms
    pub base_delay: Duration,

    /// Upper bound for a single delay
    /// Default: 8 seconds
    pub max_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            base_delay: Duration::from_millis(500),
            max_delay: Duration::from_secs(8),
        }
    }
}

impl RetryPolicy {
    /// Retry without sleeping between attempts
    pub fn immediate(max_attempts: u32) -> Self {
        Self {
            max_attempts,
            base_delay: Duration::ZERO,
            max_delay: Duration::ZERO,
        }
    }

    pub fn with_max_attempts(mut self, max_attempts: u32) -> Self {
        self.max_attempts = max_attempts;
        self
    }

    pub fn with_base_delay(mut self, base_delay: Duration) -> Self {
        self.base_delay = base_delay;
        self
    }

    /// Delay to wait after the given failed attempt (1-based)
    pub fn delay_after(&self, attempt: u32) -> Duration {
        let factor = 2u32.saturating_pow(attempt.saturating_sub(1));
        self.base_delay.saturating_mul(factor).min(self.max_delay)
    }
}

/// Fetches JSON documents on behalf of the current session
pub struct MetadataFetcher {
    rest: RestClient,
    sessions: Arc<SessionStore>,
    retry: RetryPolicy,
}

impl MetadataFetcher {
    pub fn new(rest: RestClient, sessions: Arc<SessionStore>, retry: RetryPolicy) -> Self {
        Self { rest, sessions, retry }
    }

    pub fn sessions(&self) -> &Arc<SessionStore> {
        &self.sessions
    }

    /// GET `url` with the session's access token
    ///
    /// A 401/403 triggers exactly one re-authentication followed by one more
    /// try; a second auth failure is `Unauthorized`. Transport errors and
    /// server errors are retried per [`RetryPolicy`].
    pub fn fetch(&self, url: &str) -> Result<Value, FetchError> {
        let session = self.sessions.current();
        match self.fetch_with_backoff(url, &session) {
            Err((error, _)) if error.is_unauthorized() => {
                warn!(%url, "Access token rejected, re-authenticating");
                let fresh = self.sessions.refresh_after(&session)?;
                self.fetch_with_backoff(url, &fresh)
                    .map_err(|(error, attempts)| match error {
                        error if error.is_unauthorized() => {
                            FetchError::Unauthorized(format!("{url}: {error}"))
                        }
                        error => classify(url, error, attempts),
                    })
            }
            result => result.map_err(|(error, attempts)| classify(url, error, attempts)),
        }
    }

    fn fetch_with_backoff(
        &self,
        url: &str,
        session: &Session,
    ) -> Result<Value, (RestError, u32)> {
        let cookie = session.cookie();
        let max_attempts = self.retry.max_attempts.max(1);
        let mut attempt = 1;

        loop {
            debug!(%url, attempt, "Executing API call");
            match self.rest.get_json(url, &[("Cookie", cookie.as_str())]) {
                Ok(value) => return Ok(value),
                Err(error) if error.is_transient() && attempt < max_attempts => {
                    let delay = self.retry.delay_after(attempt);
                    warn!(%url, attempt, ?delay, error = %error, "API call failed, retrying");
                    thread::sleep(delay);
                    attempt += 1;
                }
                Err(error) => return Err((error, attempt)),
            }
        }
    }
}

fn classify(url: &str, error: RestError, attempts: u32) -> FetchError {
    if error.is_transient() {
        FetchError::Unreachable {
            attempts,
            reason: format!("{url}: {error}"),
        }
    } else {
        FetchError::Protocol(format!("{url}: {error}"))
    }
}
