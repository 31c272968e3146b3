//! Connection settings for a household

use crate::error::SdkError;
use horizon_api::{AuthFlow, RegionSettings, RetryPolicy};
use horizon_stream::PushConfig;
use std::fmt;
use std::time::Duration;

/// How the SDK signs in to the identity service
#[derive(Clone, PartialEq, Eq)]
pub enum Credentials {
    Password { username: String, password: String },
    RefreshToken(String),
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Credentials::Password { username, .. } => f
                .debug_struct("Password")
                .field("username", username)
                .field("password", &"***")
                .finish(),
            Credentials::RefreshToken(_) => f.debug_tuple("RefreshToken").field(&"***").finish(),
        }
    }
}

/// Settings for [`HorizonSystem::connect`](crate::HorizonSystem::connect)
///
/// ```rust,ignore
/// let config = SdkConfig::new("nl")?
///     .with_password("user@example.com", "secret")
///     .with_controller_name("Living room tablet");
/// ```
#[derive(Debug, Clone)]
pub struct SdkConfig {
    /// Region table entry the household belongs to
    pub region: RegionSettings,

    /// Sign-in credentials; `None` only with a custom authenticator
    pub credentials: Option<Credentials>,

    /// Profile whose personalization applies to lookups
    pub profile_id: Option<String>,

    /// Retry budget of each REST call
    pub retry: RetryPolicy,

    /// Push channel settings, including the controller display name
    pub push: PushConfig,

    /// Attempts of the whole connect sequence
    /// Default: 3
    pub connect_attempts: u32,

    /// Delay after the first failed connect, doubled for each further one
    /// Default: 2 seconds
    pub connect_backoff: Duration,

    /// Upper bound for a single connect delay
    /// Default: 30 seconds
    pub max_connect_backoff: Duration,
}

impl SdkConfig {
    /// Defaults for a region code such as `nl`, `ch` or `gb`
    pub fn new(region_code: &str) -> Result<Self, SdkError> {
        let region = RegionSettings::lookup(region_code)
            .ok_or_else(|| SdkError::UnsupportedRegion(region_code.to_string()))?;
        Ok(Self::for_region(*region))
    }

    /// Defaults for an explicit region entry
    pub fn for_region(region: RegionSettings) -> Self {
        Self {
            region,
            credentials: None,
            profile_id: None,
            retry: RetryPolicy::default(),
            push: PushConfig::default(),
            connect_attempts: 3,
            connect_backoff: Duration::from_secs(2),
            max_connect_backoff: Duration::from_secs(30),
        }
    }

    pub fn with_password(mut self, username: impl Into<String>, password: impl Into<String>) -> Self {
        self.credentials = Some(Credentials::Password {
            username: username.into(),
            password: password.into(),
        });
        self
    }

    pub fn with_refresh_token(mut self, token: impl Into<String>) -> Self {
        self.credentials = Some(Credentials::RefreshToken(token.into()));
        self
    }

    pub fn with_profile_id(mut self, profile_id: impl Into<String>) -> Self {
        self.profile_id = Some(profile_id.into());
        self
    }

    /// Name shown on the box for content pushed from this client
    pub fn with_controller_name(mut self, name: impl Into<String>) -> Self {
        self.push = self.push.with_controller_name(name);
        self
    }

    pub fn with_retry_policy(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    pub fn with_push_config(mut self, push: PushConfig) -> Self {
        self.push = push;
        self
    }

    pub fn with_connect_attempts(mut self, attempts: u32) -> Self {
        self.connect_attempts = attempts;
        self
    }

    pub fn with_connect_backoff(mut self, backoff: Duration) -> Self {
        self.connect_backoff = backoff;
        self
    }

    /// Delay before connect attempt `attempt + 1`
    pub fn connect_delay_after(&self, attempt: u32) -> Duration {
        let factor = 2u32.saturating_pow(attempt.saturating_sub(1));
        self.connect_backoff
            .saturating_mul(factor)
            .min(self.max_connect_backoff)
    }

    /// Validate the configuration and return any issues
    ///
    /// `custom_auth` tells whether the caller supplies its own authenticator,
    /// which lifts the need for credentials and a supported sign-in flow.
    pub fn validate(&self, custom_auth: bool) -> Result<(), SdkError> {
        if self.connect_attempts == 0 {
            return Err(SdkError::Configuration(
                "Connect attempts must be greater than 0".to_string(),
            ));
        }

        if self.retry.max_attempts == 0 {
            return Err(SdkError::Configuration(
                "HTTP retry attempts must be greater than 0".to_string(),
            ));
        }

        self.push
            .validate()
            .map_err(|e| SdkError::Configuration(e.to_string()))?;

        if custom_auth {
            return Ok(());
        }

        if self.region.auth_flow == AuthFlow::ExternalSso {
            return Err(SdkError::UnsupportedAuthFlow(self.region.code.to_string()));
        }

        match &self.credentials {
            None => Err(SdkError::Configuration(
                "Credentials are required without a custom authenticator".to_string(),
            )),
            Some(Credentials::Password { username, .. }) if username.trim().is_empty() => Err(
                SdkError::Configuration("Username must not be empty".to_string()),
            ),
            Some(Credentials::RefreshToken(token)) if token.trim().is_empty() => Err(
                SdkError::Configuration("Refresh token must not be empty".to_string()),
            ),
            Some(_) => Ok(()),
        }
    }
}
