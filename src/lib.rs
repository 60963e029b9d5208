//! Cellnet - runtime for networks of event-processing cells
//!
//! A cell wraps a [`Behavior`] and processes the events arriving in its
//! mailbox one at a time, in its own task. Cells never share state: they talk
//! through topic-addressed [`Event`]s. Each cell emits to the set of cells
//! subscribed to it, and the subscription graph can change at runtime.
//!
//! An [`Environment`] owns a network of cells. Besides fire-and-forget
//! emission it supports request/response with a timeout.
//!
//! Faults of a behavior (errors or panics while processing) are handled by
//! the cell: the behavior's [`Behavior::recover`] hook decides whether to go
//! on, and too frequent faults stop the cell for good.
//!
//! ```rust
//! use std::time::Duration;
//! use cellnet::{Behavior, Environment, Event, Payload, Result};
//!
//! struct Doubler;
//!
//! impl Behavior for Doubler {
//!     async fn process_event(&mut self, event: &Event) -> Result<()> {
//!         let n: i64 = event.payload().decode(cellnet::DEFAULT_PAYLOAD)?;
//!         event.respond(Ok(Payload::new(n * 2)))
//!     }
//! }
//!
//! # #[tokio::main(flavor = "current_thread")]
//! # async fn main() -> Result<()> {
//! let env = Environment::default();
//! env.start_cell("doubler", Doubler).await?;
//!
//! let response = env
//!     .request("doubler", "double?", serde_json::json!(21), None, Duration::from_secs(1))
//!     .await?;
//! assert_eq!(response.decode::<i64>(cellnet::DEFAULT_PAYLOAD)?, 42);
//!
//! env.stop().await
//! # }
//! ```

mod behavior;
mod cell_id;
mod config;
mod context;
mod environment;
mod error;
mod event;
mod fault;
mod mailbox;
mod meta;
mod payload;
mod topic;

mod internal;

#[cfg(feature = "test-support")]
pub mod testing;

pub use behavior::Behavior;
pub use cell_id::CellId;
pub use config::{Config, DEFAULT_TIMEOUT};
pub use context::Context;
pub use environment::Environment;
pub use error::Error;
pub use event::Event;
pub use fault::Fault;
pub use mailbox::{LocalMailbox, Mailbox, MailboxFactory};
pub use meta::Meta;
pub use payload::{DEFAULT_PAYLOAD, Payload, PayloadValues};
pub use topic::{PING_TOPIC, PONG_RESPONSE, PROCESSED_TOPIC, RESET_TOPIC};

pub type Result<T = ()> = std::result::Result<T, Error>;
pub type EventId = u128;
