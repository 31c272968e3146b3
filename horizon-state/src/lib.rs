//! Horizon set-top box state synchronization
//!
//! Keeps a live "now playing" view of every box in a household. Push frames
//! are decoded once into closed message types, routed to the owning box and
//! reconciled into a [`PlaybackSnapshot`], enriched with metadata from the
//! REST services when needed.
//!
//! # Architecture
//!
//! ```text
//! PushEvents → Registry → decoder → SettopBox → ChangeNotifier
//!                                       ↓            ↓
//!                               MetadataSource   on_change / ChangeIterator
//! ```
//!
//! # Quick Start
//!
//! ```rust,ignore
//! use horizon_state::{CatalogHandle, ChannelCatalog, Registry};
//!
//! let catalog = CatalogHandle::new(ChannelCatalog::build(&records, &entitlements));
//! let registry = Registry::new(devices, sink, metadata, catalog)?;
//! registry.start(events)?;
//!
//! for change in registry.changes() {
//!     println!("{}: {:?}", change.device_id, change.snapshot.title);
//! }
//! ```

pub mod catalog;
pub mod change;
pub mod decoder;
pub mod dispatch;
pub mod error;
pub mod logging;
pub mod model;
pub mod registry;
pub mod settop_box;

pub use catalog::{CatalogHandle, ChannelCatalog, ChannelDescriptor};
pub use change::{ChangeEvent, ChangeIterator, ListenerId};
pub use decoder::{decode_frame, BoxMessage, ChannelPlayback, PlayerSource, PlayerState, UiState};
pub use error::{Result, StateError};
pub use model::{
    ChannelId, ConnectivityState, Device, DeviceId, PlaybackSnapshot, SourceKind,
    UNKNOWN_CHANNEL_TITLE,
};
pub use registry::Registry;
pub use settop_box::SettopBox;
