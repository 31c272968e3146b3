//! Data types tracked per set-top box

mod device;
mod ids;
mod snapshot;

pub use device::Device;
pub use ids::{ChannelId, DeviceId};
pub use snapshot::{ConnectivityState, PlaybackSnapshot, SourceKind, UNKNOWN_CHANNEL_TITLE};
