//! Private REST client for Horizon cloud service calls
//!
//! This crate provides a minimal blocking JSON client used by `horizon-api`
//! to talk to the backoffice, authentication, personalization, linear,
//! recording, VOD and purchase services.

mod error;

pub use error::RestError;

use serde_json::Value;
use std::time::Duration;

/// Request header as a name/value pair
pub type Header<'a> = (&'a str, &'a str);

/// A minimal JSON client over a shared `ureq` agent
#[derive(Debug, Clone)]
pub struct RestClient {
    agent: ureq::Agent,
}

impl RestClient {
    /// Create a new client with default timeouts (5s connect, 10s read)
    pub fn new() -> Self {
        Self::with_timeouts(Duration::from_secs(5), Duration::from_secs(10))
    }

    /// Create a client with explicit connect and read timeouts
    pub fn with_timeouts(connect: Duration, read: Duration) -> Self {
        Self {
            agent: ureq::AgentBuilder::new()
                .timeout_connect(connect)
                .timeout_read(read)
                .user_agent(concat!("horizon-sdk/", env!("CARGO_PKG_VERSION")))
                .build(),
        }
    }

    /// Send a GET request and decode the JSON response body
    pub fn get_json(&self, url: &str, headers: &[Header<'_>]) -> Result<Value, RestError> {
        let mut request = self.agent.get(url).set("Accept", "application/json");
        for (name, value) in headers {
            request = request.set(name, value);
        }
        Self::decode(request.call())
    }

    /// Send a JSON body with POST and decode the JSON response body
    pub fn post_json(
        &self,
        url: &str,
        headers: &[Header<'_>],
        body: &Value,
    ) -> Result<Value, RestError> {
        let mut request = self.agent.post(url).set("Accept", "application/json");
        for (name, value) in headers {
            request = request.set(name, value);
        }
        Self::decode(request.send_json(body))
    }

    fn decode(result: Result<ureq::Response, ureq::Error>) -> Result<Value, RestError> {
        let response = match result {
            Ok(response) => response,
            Err(ureq::Error::Status(code, response)) => {
                let body = response.into_string().unwrap_or_default();
                return Err(RestError::Status { code, body });
            }
            Err(ureq::Error::Transport(transport)) => {
                return Err(RestError::Network(transport.to_string()));
            }
        };

        let text = response
            .into_string()
            .map_err(|e| RestError::Network(e.to_string()))?;

        parse_body(&text)
    }
}

impl Default for RestClient {
    fn default() -> Self {
        Self::new()
    }
}

/// Empty bodies decode to `Value::Null`; some endpoints answer 204 or an empty 200.
fn parse_body(text: &str) -> Result<Value, RestError> {
    if text.trim().is_empty() {
        return Ok(Value::Null);
    }
    serde_json::from_str(text).map_err(|e| RestError::Parse(e.to_string()))
}
