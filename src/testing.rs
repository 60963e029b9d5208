//! Helpers for testing cell networks.
//!
//! Enabled with the `test-support` feature.
//!
//! [`TestBehavior`] records every ordinary event it processes and forwards
//! it to its subscribers, so chains of test cells can be inspected from the
//! outside with [`PROCESSED_TOPIC`] requests.

use std::time::Duration;

use crate::{
    Behavior, CellId, Context, Error, Event, Fault, PING_TOPIC, PONG_RESPONSE, PROCESSED_TOPIC, Payload,
    RESET_TOPIC, Result,
};

/// Topic making a [`TestBehavior`] panic while processing.
pub const PANIC_TOPIC: &str = "panic!";

/// Number of recoveries a [`TestBehavior`] accepts before giving up.
const MAX_RECOVERINGS: usize = 5;

/// Collecting and re-emitting behavior.
///
/// - [`PROCESSED_TOPIC`] requests are answered with the list of processed
///   events, each formatted with `Display`.
/// - [`RESET_TOPIC`] clears that list.
/// - [`PING_TOPIC`] requests are answered with [`PONG_RESPONSE`].
/// - [`PANIC_TOPIC`] panics.
/// - Anything else is recorded and emitted to the subscribers.
#[derive(Debug, Default)]
pub struct TestBehavior {
    ctx: Option<Context>,
    processed: Vec<String>,
    recoverings: usize,
}

impl TestBehavior {
    pub fn new() -> Self {
        Self::default()
    }
}

impl Behavior for TestBehavior {
    async fn init(&mut self, ctx: Context) -> Result<()> {
        self.ctx = Some(ctx);
        Ok(())
    }

    async fn process_event(&mut self, event: &Event) -> Result<()> {
        match event.topic() {
            PROCESSED_TOPIC => event.respond(Payload::encode(&self.processed)),
            RESET_TOPIC => {
                self.processed.clear();
                Ok(())
            }
            PING_TOPIC => event.respond(Ok(Payload::new(PONG_RESPONSE))),
            PANIC_TOPIC => panic!("Ouch!"),
            _ => {
                self.processed.push(event.to_string());
                if let Some(ctx) = &self.ctx {
                    if let Err(e) = ctx.emit(event.clone()).await {
                        tracing::warn!(cell = %ctx.id(), error = %e, "cannot forward event");
                    }
                }
                Ok(())
            }
        }
    }

    async fn recover(&mut self, fault: &Fault) -> Result<()> {
        self.recoverings += 1;
        if self.recoverings > MAX_RECOVERINGS {
            let id = self
                .ctx
                .as_ref()
                .map(|ctx| ctx.id().clone())
                .unwrap_or_else(CellId::random);
            return Err(Error::CannotRecover {
                id,
                reason: fault.to_string(),
            });
        }
        Ok(())
    }
}

/// Gives the cells a moment to process what was emitted so far.
pub async fn let_it_work() {
    tokio::time::sleep(Duration::from_millis(100)).await;
}
