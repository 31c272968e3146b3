//! Horizon SDK - Sync API for LG Horizon set-top boxes
//!
//! Connects to a household, keeps the "now playing" state of every box up to
//! date from the push channel and sends remote-control commands.
//!
//! # Example
//!
//! ```rust,ignore
//! use horizon_sdk::{HorizonSystem, SdkConfig};
//!
//! fn main() -> Result<(), horizon_sdk::SdkError> {
//!     horizon_sdk::init_logging_from_env()?;
//!
//!     let config = SdkConfig::new("ch")?.with_password("user@example.com", "secret");
//!     let system = HorizonSystem::connect(config)?;
//!
//!     let living_room = system
//!         .settop_box_by_name("Living room")
//!         .ok_or_else(|| horizon_sdk::SdkError::Configuration("no such box".into()))?;
//!     living_room.set_channel("NPO 1 HD")?;
//!
//!     for change in system.changes() {
//!         println!("{}: {:?}", change.device_id, change.snapshot);
//!     }
//!
//!     system.disconnect();
//!     Ok(())
//! }
//! ```

mod config;
mod error;
mod system;

pub use config::{Credentials, SdkConfig};
pub use error::SdkError;
pub use system::{HorizonSystem, HorizonSystemBuilder};

// Re-export the types applications work with
pub use horizon_api::{
    AuthError, Authenticator, RecordingDetail, RecordingEntry, RecordingGroup, RegionSettings,
    RetryPolicy, Session, ShowEpisodeEntry,
};
pub use horizon_state::logging::{init_logging, init_logging_from_env, LoggingError, LoggingMode};
pub use horizon_state::{
    ChangeEvent, ChangeIterator, ChannelCatalog, ChannelDescriptor, ConnectivityState, Device,
    DeviceId, ListenerId, PlaybackSnapshot, SettopBox, SourceKind, StateError,
};
pub use horizon_stream::{LinkStatus, PushConfig, PushError};
