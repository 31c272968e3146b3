//! Configuration types for the push channel
//!
//! These settings control how the MQTT connection to the household broker
//! is established and kept alive.

use crate::error::PushError;
use std::time::Duration;

/// Configuration for a [`PushChannel`](crate::PushChannel)
#[derive(Debug, Clone)]
pub struct PushConfig {
    /// Broker port when the discovered broker address is a bare host name
    /// Default: 443
    pub port: u16,

    /// MQTT keep-alive interval
    /// Default: 30 seconds
    pub keep_alive: Duration,

    /// Capacity of the outbound request queue
    /// Default: 64
    pub request_capacity: usize,

    /// Pause between reconnect attempts after the link drops
    /// Default: 5 seconds
    pub reconnect_delay: Duration,

    /// How long `wait_connected` blocks for the broker handshake
    /// Default: 20 seconds
    pub connect_timeout: Duration,

    /// Name shown on the box when this client pushes content to it
    /// Default: "Horizon SDK"
    pub controller_name: String,

    /// Broker to use instead of the one announced by service discovery
    /// Default: None
    pub broker_override: Option<String>,
}

impl Default for PushConfig {
    fn default() -> Self {
        Self {
            port: 443,
            keep_alive: Duration::from_secs(30),
            request_capacity: 64,
            reconnect_delay: Duration::from_secs(5),
            connect_timeout: Duration::from_secs(20),
            controller_name: "Horizon SDK".to_string(),
            broker_override: None,
        }
    }
}

impl PushConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Short timeouts for interactive tools that prefer failing fast
    pub fn fast_fail() -> Self {
        Self {
            reconnect_delay: Duration::from_secs(1),
            connect_timeout: Duration::from_secs(5),
            ..Default::default()
        }
    }

    pub fn with_keep_alive(mut self, keep_alive: Duration) -> Self {
        self.keep_alive = keep_alive;
        self
    }

    pub fn with_reconnect_delay(mut self, delay: Duration) -> Self {
        self.reconnect_delay = delay;
        self
    }

    pub fn with_connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = timeout;
        self
    }

    pub fn with_controller_name(mut self, name: impl Into<String>) -> Self {
        self.controller_name = name.into();
        self
    }

    pub fn with_broker_override(mut self, broker: impl Into<String>) -> Self {
        self.broker_override = Some(broker.into());
        self
    }

    /// Validate the configuration and return any issues
    pub fn validate(&self) -> Result<(), PushError> {
        if self.port == 0 {
            return Err(PushError::Configuration("Broker port must be non-zero".to_string()));
        }

        // rumqttc rejects keep-alive intervals under five seconds
        if self.keep_alive < Duration::from_secs(5) {
            return Err(PushError::Configuration(
                "Keep-alive must be at least 5 seconds".to_string(),
            ));
        }

        if self.request_capacity == 0 {
            return Err(PushError::Configuration(
                "Request capacity must be greater than 0".to_string(),
            ));
        }

        if self.connect_timeout == Duration::ZERO {
            return Err(PushError::Configuration(
                "Connect timeout must be greater than 0".to_string(),
            ));
        }

        if self.controller_name.trim().is_empty() {
            return Err(PushError::Configuration(
                "Controller name must not be empty".to_string(),
            ));
        }

        Ok(())
    }

    /// Websocket URL for a broker address from service discovery
    pub fn broker_url(&self, broker: &str) -> String {
        let broker = self.broker_override.as_deref().unwrap_or(broker);
        if broker.starts_with("wss://") || broker.starts_with("ws://") {
            broker.to_string()
        } else {
            format!("wss://{}:{}/mqtt", broker.trim_end_matches('/'), self.port)
        }
    }
}
