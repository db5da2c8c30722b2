//! Cirrus message bus
//!
//! Two logical channels connect the UI-facing producers with the
//! orchestration core: a *command* channel carrying intents toward the
//! listener pool and a *status* channel carrying progress back. Delivery is
//! at-least-once to current subscribers only; nothing is persisted past
//! delivery, and a subscriber that falls behind skips the gap instead of
//! replaying it.

pub mod bus;
pub mod error;
pub mod message;

// Re-exports
pub use bus::{CommandStream, MessageBus, StatusStream};
pub use error::{BusError, Result};
pub use message::{Command, CommandEnvelope, Phase, ResourceDelta, ResourceRef, StatusEvent};
