//! Push channel for Horizon set-top box events
//!
//! The household broker speaks MQTT over secure websockets. This crate keeps
//! one connection per household in a background thread and exposes a sync
//! API: inbound frames arrive through a blocking iterator, outbound command
//! frames are published fire-and-forget through the [`CommandSink`] trait.
//!
//! # Example
//!
//! ```rust,ignore
//! use horizon_stream::{PushChannel, PushConfig, PushCredentials, PushEvent};
//!
//! let credentials = PushCredentials {
//!     broker: "obomsg.prod.nl.horizon.tv".to_string(),
//!     household_id: "hh".to_string(),
//!     token: "push-token".to_string(),
//! };
//! let (channel, events) = PushChannel::open(&PushConfig::default(), &credentials)?;
//! for event in events {
//!     if let PushEvent::Frame(frame) = event {
//!         println!("{} {}", frame.topic, frame.payload);
//!     }
//! }
//! ```

pub mod channel;
pub mod commands;
pub mod config;
pub mod error;
pub mod events;
pub mod frame;
pub mod sink;
pub mod topics;
mod worker;

pub use channel::{LinkStatus, PushChannel, PushCredentials};
pub use commands::{CommandBuilder, MediaKey};
pub use config::PushConfig;
pub use error::{PushError, Result};
pub use events::{PushEvent, PushEvents};
pub use frame::{random_id, InboundFrame, OutboundFrame};
pub use sink::CommandSink;
