//! Background worker thread for the MQTT event loop
//!
//! Spawns a thread with its own tokio runtime that drives the rumqttc event
//! loop while the parent [`PushChannel`](crate::PushChannel) stays sync.

use crate::channel::{Link, LinkStatus};
use crate::events::PushEvent;
use crate::frame::InboundFrame;
use rumqttc::{AsyncClient, ConnectReturnCode, ConnectionError, Event, EventLoop, Packet, QoS};
use std::io;
use std::sync::mpsc;
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;
use tokio::sync::oneshot;

/// Bound on flushing the DISCONNECT packet during shutdown
const DISCONNECT_FLUSH: Duration = Duration::from_millis(250);

/// State shared between the worker and its channel handle
pub(crate) struct WorkerContext {
    pub client: AsyncClient,
    pub subscriptions: Vec<String>,
    pub link: Arc<Link>,
    pub event_tx: mpsc::Sender<PushEvent>,
    pub reconnect_delay: Duration,
}

/// Spawns the background push worker thread
pub(crate) fn spawn_push_worker(
    context: WorkerContext,
    eventloop: EventLoop,
    shutdown_rx: oneshot::Receiver<()>,
) -> io::Result<JoinHandle<()>> {
    thread::Builder::new()
        .name("horizon-push".to_string())
        .spawn(move || {
            let rt = match tokio::runtime::Builder::new_current_thread()
                .enable_all()
                .build()
            {
                Ok(rt) => rt,
                Err(e) => {
                    tracing::error!("Failed to create tokio runtime for push worker: {}", e);
                    context.link.close(Some(e.to_string()));
                    return;
                }
            };

            rt.block_on(run_push_loop(context, eventloop, shutdown_rx));
        })
}

/// Main event loop running inside the tokio runtime
async fn run_push_loop(
    context: WorkerContext,
    mut eventloop: EventLoop,
    mut shutdown_rx: oneshot::Receiver<()>,
) {
    tracing::info!("Push worker started");

    'run: loop {
        tokio::select! {
            _ = &mut shutdown_rx => {
                tracing::debug!("Push worker received shutdown");
                if let Err(e) = context.client.try_disconnect() {
                    tracing::debug!("Disconnect request not queued: {}", e);
                }
                let _ = tokio::time::timeout(DISCONNECT_FLUSH, eventloop.poll()).await;
                break 'run;
            }

            polled = eventloop.poll() => {
                match polled {
                    Ok(event) => context.handle_event(event),

                    Err(ConnectionError::ConnectionRefused(code)) => {
                        let reason = refusal_reason(code);
                        tracing::warn!("Broker refused connection: {}", reason);
                        context.link.set(LinkStatus::Rejected(reason.clone()));
                        context.forward(PushEvent::Rejected(reason));
                        break 'run;
                    }

                    Err(error) => {
                        let reason = error.to_string();
                        if context.link.mark_down(&reason) {
                            tracing::warn!("Push channel dropped: {}", reason);
                            context.forward(PushEvent::Disconnected(reason));
                        } else {
                            tracing::debug!("Push channel connect attempt failed: {}", reason);
                        }

                        tokio::select! {
                            _ = &mut shutdown_rx => break 'run,
                            _ = tokio::time::sleep(context.reconnect_delay) => {}
                        }
                    }
                }
            }
        }
    }

    context.link.close(None);
    tracing::info!("Push worker shut down");
}

impl WorkerContext {
    fn handle_event(&self, event: Event) {
        match event {
            Event::Incoming(Packet::ConnAck(ack)) if ack.code == ConnectReturnCode::Success => {
                for topic in &self.subscriptions {
                    if let Err(e) = self.client.try_subscribe(topic.as_str(), QoS::AtMostOnce) {
                        tracing::warn!("Failed to subscribe to {}: {}", topic, e);
                    }
                }
                self.link.set(LinkStatus::Connected);
                tracing::info!("Push channel connected, {} subscriptions sent", self.subscriptions.len());
                self.forward(PushEvent::Connected);
            }
            Event::Incoming(Packet::Publish(publish)) => {
                match InboundFrame::from_bytes(&publish.topic, &publish.payload) {
                    Some(frame) => {
                        tracing::trace!("Frame on {}", frame.topic);
                        self.forward(PushEvent::Frame(frame));
                    }
                    None => tracing::debug!("Ignoring non-JSON payload on {}", publish.topic),
                }
            }
            _ => {}
        }
    }

    fn forward(&self, event: PushEvent) {
        if self.event_tx.send(event).is_err() {
            tracing::debug!("Push event receiver dropped");
        }
    }
}

fn refusal_reason(code: ConnectReturnCode) -> String {
    format!("{code:?}")
}
