use std::time::{SystemTime, UNIX_EPOCH};

use uuid::Uuid;

use crate::EventId;

/// Metadata attached to every event.
///
/// - `id`: unique identifier of the event.
/// - `timestamp`: creation time in nanoseconds since Unix epoch (truncated to `u64`).
/// - `correlation_id`: optional id linking the event to the one that caused it.
///
/// The runtime attaches no logic to the `correlation_id`. It is the causal
/// context a behavior passes along when one event leads to another, e.g. via
/// [`Context::emit_child`](crate::Context::emit_child).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Meta {
    id: EventId,
    timestamp: u64,
    correlation_id: Option<EventId>,
}

impl Meta {
    pub fn new(correlation_id: Option<EventId>) -> Self {
        Self {
            id: Uuid::new_v4().as_u128(),
            // A clock before the epoch yields 0 rather than failing event creation.
            timestamp: SystemTime::now()
                .duration_since(UNIX_EPOCH)
                .map(|d| d.as_nanos() as u64)
                .unwrap_or_default(),
            correlation_id,
        }
    }

    /// Unique identifier of the event.
    pub fn id(&self) -> EventId {
        self.id
    }

    /// Timestamp in nanoseconds since Unix epoch (u64 truncation).
    pub fn timestamp(&self) -> u64 {
        self.timestamp
    }

    pub fn correlation_id(&self) -> Option<EventId> {
        self.correlation_id
    }
}
