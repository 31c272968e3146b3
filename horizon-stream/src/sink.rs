//! Outbound seam used by the state engine

use crate::commands::CommandBuilder;
use crate::error::Result;
use crate::frame::OutboundFrame;

/// Anything that can deliver command frames to the boxes
///
/// [`PushChannel`](crate::PushChannel) is the production implementation;
/// tests record frames in memory instead.
pub trait CommandSink: Send + Sync {
    /// Fire-and-forget delivery of one frame
    fn publish(&self, frame: OutboundFrame) -> Result<()>;

    /// Builder stamped with this sink's client identity
    fn commands(&self) -> &CommandBuilder;
}
