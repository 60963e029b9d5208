//! Well-known topics and responses shared by behaviors.
//!
//! Topics ending in `?` are requests expecting a response, topics ending in
//! `!` are commands.

/// Request answered with [`PONG_RESPONSE`], used to probe whether a cell is alive.
pub const PING_TOPIC: &str = "ping?";

/// Default payload value answering a [`PING_TOPIC`] request.
pub const PONG_RESPONSE: &str = "pong!";

/// Request for the events a behavior has processed so far.
pub const PROCESSED_TOPIC: &str = "processed?";

/// Command to drop collected state.
pub const RESET_TOPIC: &str = "reset!";
