//! Sync handle over the household push connection

use crate::commands::CommandBuilder;
use crate::config::PushConfig;
use crate::error::{PushError, Result};
use crate::events::PushEvents;
use crate::frame::{random_id, OutboundFrame, CLIENT_ID_LEN};
use crate::sink::CommandSink;
use crate::topics;
use crate::worker::{spawn_push_worker, WorkerContext};
use parking_lot::{Condvar, Mutex};
use rumqttc::{AsyncClient, MqttOptions, QoS, Transport};
use std::sync::mpsc;
use std::sync::Arc;
use std::thread::JoinHandle;
use std::time::{Duration, Instant};
use tokio::sync::oneshot;
use tracing::{debug, info};

/// Connection state of the push link
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LinkStatus {
    /// Handshake pending, first or after a drop
    Connecting,
    Connected,
    /// Broker refused the credentials; terminal
    Rejected(String),
    /// Worker has stopped; terminal
    Closed,
}

struct LinkState {
    status: LinkStatus,
    last_error: Option<String>,
}

/// Link status shared with the worker, with a wake-up for waiters
pub(crate) struct Link {
    state: Mutex<LinkState>,
    changed: Condvar,
}

impl Link {
    fn new() -> Self {
        Self {
            state: Mutex::new(LinkState {
                status: LinkStatus::Connecting,
                last_error: None,
            }),
            changed: Condvar::new(),
        }
    }

    pub(crate) fn status(&self) -> LinkStatus {
        self.state.lock().status.clone()
    }

    pub(crate) fn set(&self, status: LinkStatus) {
        self.state.lock().status = status;
        self.changed.notify_all();
    }

    /// Record a failure; returns whether the link was up before
    pub(crate) fn mark_down(&self, reason: &str) -> bool {
        let mut state = self.state.lock();
        let was_connected = state.status == LinkStatus::Connected;
        state.status = LinkStatus::Connecting;
        state.last_error = Some(reason.to_string());
        was_connected
    }

    /// Terminal close; a rejection stays visible as the final status
    pub(crate) fn close(&self, reason: Option<String>) {
        let mut state = self.state.lock();
        if !matches!(state.status, LinkStatus::Rejected(_)) {
            state.status = LinkStatus::Closed;
        }
        if reason.is_some() {
            state.last_error = reason;
        }
        drop(state);
        self.changed.notify_all();
    }

    /// Block until the link leaves `Connecting` or the timeout expires
    fn wait_settled(&self, timeout: Duration) -> (LinkStatus, Option<String>) {
        let deadline = Instant::now() + timeout;
        let mut state = self.state.lock();
        while state.status == LinkStatus::Connecting {
            if self.changed.wait_until(&mut state, deadline).timed_out() {
                break;
            }
        }
        (state.status.clone(), state.last_error.clone())
    }
}

/// What the broker needs to admit this client
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PushCredentials {
    /// Broker address from service discovery, host name or websocket URL
    pub broker: String,
    /// MQTT user name
    pub household_id: String,
    /// MQTT password
    pub token: String,
}

/// Push channel to the household broker
///
/// Opening the channel starts a background worker that connects, subscribes
/// to the household topics and keeps reconnecting after drops. Inbound
/// frames are delivered through the returned [`PushEvents`] iterator.
///
/// ```rust,ignore
/// let (channel, events) = PushChannel::open(&PushConfig::default(), &credentials)?;
/// channel.wait_connected(Duration::from_secs(20))?;
/// for event in events {
///     println!("{event:?}");
/// }
/// ```
pub struct PushChannel {
    client: AsyncClient,
    commands: CommandBuilder,
    link: Arc<Link>,
    shutdown_tx: Mutex<Option<oneshot::Sender<()>>>,
    worker: Mutex<Option<JoinHandle<()>>>,
}

impl PushChannel {
    /// Start connecting in the background
    pub fn open(config: &PushConfig, credentials: &PushCredentials) -> Result<(Self, PushEvents)> {
        config.validate()?;

        let client_id = random_id(CLIENT_ID_LEN);
        let url = config.broker_url(&credentials.broker);
        debug!(%url, %client_id, "Opening push channel");

        let mut options = MqttOptions::new(client_id.clone(), url, config.port);
        options.set_transport(Transport::wss_with_default_config());
        options.set_credentials(credentials.household_id.clone(), credentials.token.clone());
        options.set_keep_alive(config.keep_alive);
        let (client, eventloop) = AsyncClient::new(options, config.request_capacity);

        let link = Arc::new(Link::new());
        let (event_tx, event_rx) = mpsc::channel();
        let (shutdown_tx, shutdown_rx) = oneshot::channel();

        let context = WorkerContext {
            client: client.clone(),
            subscriptions: topics::subscriptions(&credentials.household_id, &client_id),
            link: Arc::clone(&link),
            event_tx,
            reconnect_delay: config.reconnect_delay,
        };
        let worker = spawn_push_worker(context, eventloop, shutdown_rx)
            .map_err(|e| PushError::Runtime(e.to_string()))?;

        let channel = Self {
            client,
            commands: CommandBuilder::new(
                credentials.household_id.clone(),
                client_id,
                config.controller_name.clone(),
            ),
            link,
            shutdown_tx: Mutex::new(Some(shutdown_tx)),
            worker: Mutex::new(Some(worker)),
        };
        Ok((channel, PushEvents::new(event_rx)))
    }

    pub fn client_id(&self) -> &str {
        self.commands.client_id()
    }

    pub fn status(&self) -> LinkStatus {
        self.link.status()
    }

    pub fn is_connected(&self) -> bool {
        self.link.status() == LinkStatus::Connected
    }

    /// Block until the first handshake completes
    pub fn wait_connected(&self, timeout: Duration) -> Result<()> {
        match self.link.wait_settled(timeout) {
            (LinkStatus::Connected, _) => Ok(()),
            (LinkStatus::Rejected(reason), _) => Err(PushError::Rejected(reason)),
            (LinkStatus::Closed, _) => Err(PushError::Closed),
            (LinkStatus::Connecting, last_error) => Err(PushError::ConnectTimeout {
                timeout,
                last_error: last_error.unwrap_or_else(|| "no answer from broker".to_string()),
            }),
        }
    }

    /// Stop the worker and wait for it to exit
    ///
    /// Safe to call while the handshake is still pending and more than once.
    pub fn shutdown(&self) {
        if let Some(tx) = self.shutdown_tx.lock().take() {
            let _ = tx.send(());
        }
        if let Some(worker) = self.worker.lock().take() {
            if worker.join().is_err() {
                tracing::warn!("Push worker panicked during shutdown");
            }
            info!("Push channel closed");
        }
    }
}

impl CommandSink for PushChannel {
    fn publish(&self, frame: OutboundFrame) -> Result<()> {
        if !self.is_connected() {
            return Err(PushError::NotConnected);
        }
        debug!(topic = %frame.topic, kind = ?frame.kind(), "Publishing command");
        self.client
            .try_publish(frame.topic.clone(), QoS::AtMostOnce, false, frame.to_bytes())
            .map_err(|e| PushError::Publish(e.to_string()))
    }

    fn commands(&self) -> &CommandBuilder {
        &self.commands
    }
}

impl Drop for PushChannel {
    fn drop(&mut self) {
        self.shutdown();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread;

    #[test]
    fn test_link_wait_times_out_while_connecting() {
        let link = Link::new();
        link.mark_down("dns failure");
        let (status, last_error) = link.wait_settled(Duration::from_millis(30));
        assert_eq!(status, LinkStatus::Connecting);
        assert_eq!(last_error.as_deref(), Some("dns failure"));
    }

    #[test]
    fn test_link_wakes_waiter_on_connect() {
        let link = Arc::new(Link::new());
        let setter = Arc::clone(&link);
        let handle = thread::spawn(move || {
            thread::sleep(Duration::from_millis(20));
            setter.set(LinkStatus::Connected);
        });

        let (status, _) = link.wait_settled(Duration::from_secs(5));
        assert_eq!(status, LinkStatus::Connected);
        handle.join().unwrap();
    }

    #[test]
    fn test_mark_down_reports_previous_state() {
        let link = Link::new();
        assert!(!link.mark_down("first"));
        link.set(LinkStatus::Connected);
        assert!(link.mark_down("dropped"));
        assert_eq!(link.status(), LinkStatus::Connecting);
    }

    #[test]
    fn test_close_keeps_rejection() {
        let link = Link::new();
        link.set(LinkStatus::Rejected("NotAuthorized".to_string()));
        link.close(None);
        assert_eq!(link.status(), LinkStatus::Rejected("NotAuthorized".to_string()));

        let link = Link::new();
        link.close(Some("runtime".to_string()));
        assert_eq!(link.status(), LinkStatus::Closed);
    }
}
