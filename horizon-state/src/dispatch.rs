//! Isolation boundary around frame handling
//!
//! A frame that fails or panics inside a box must not take down the actor
//! thread or leave a half-updated snapshot behind. The failure is logged
//! together with the raw frame and the box falls back to the empty snapshot.

use crate::decoder::BoxMessage;
use crate::error::StateError;
use crate::settop_box::SettopBox;
use horizon_stream::InboundFrame;
use std::any::Any;
use std::panic::{catch_unwind, AssertUnwindSafe};
use tracing::warn;

/// Apply `message` to `settop_box`, containing any failure
///
/// Returns the error that forced a reset, if any.
pub fn dispatch(settop_box: &SettopBox, message: BoxMessage, raw: &InboundFrame) -> Option<StateError> {
    let outcome = catch_unwind(AssertUnwindSafe(|| settop_box.handle(message)))
        .unwrap_or_else(|payload| Err(StateError::Panic(panic_message(payload.as_ref()))));

    let error = outcome.err()?;
    warn!(
        device = %settop_box.id(),
        topic = %raw.topic,
        frame = %raw.payload,
        "Could not handle frame, resetting box state: {}",
        error
    );
    settop_box.force_reset();
    Some(error)
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    payload
        .downcast_ref::<&str>()
        .map(|s| s.to_string())
        .or_else(|| payload.downcast_ref::<String>().cloned())
        .unwrap_or_else(|| "unknown panic".to_string())
}
