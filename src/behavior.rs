use std::future::Future;

use crate::{Context, Event, Fault, Result};

/// Pluggable logic executed by a cell.
///
/// A cell owns exactly one behavior and calls it from a single task, so the
/// behavior's state needs no synchronization. Events are processed one at a
/// time in mailbox order.
///
/// Lifecycle:
/// - [`init`](Behavior::init) once, before the cell accepts events. An error
///   aborts [`Environment::start_cell`](crate::Environment::start_cell).
/// - [`process_event`](Behavior::process_event) for every event.
/// - [`recover`](Behavior::recover) after a failed or panicked step.
/// - [`terminate`](Behavior::terminate) once, after the last processed event.
///
/// Like [`process_event`](Behavior::process_event), all hooks can be written
/// as plain `async fn` in the implementation; no `#[async_trait]` needed.
///
/// ```rust
/// use cellnet::{Behavior, Context, Event, Result};
///
/// struct Forwarder {
///     ctx: Option<Context>,
/// }
///
/// impl Behavior for Forwarder {
///     async fn init(&mut self, ctx: Context) -> Result<()> {
///         self.ctx = Some(ctx);
///         Ok(())
///     }
///
///     async fn process_event(&mut self, event: &Event) -> Result<()> {
///         if let Some(ctx) = &self.ctx {
///             ctx.emit(event.clone()).await?;
///         }
///         Ok(())
///     }
/// }
/// ```
pub trait Behavior: Send + 'static {
    /// Called once when the cell starts. Keep the context to emit events later.
    fn init(&mut self, ctx: Context) -> impl Future<Output = Result<()>> + Send {
        let _ctx = ctx;
        async { Ok(()) }
    }

    /// Called once when the cell stops.
    fn terminate(&mut self) -> impl Future<Output = Result<()>> + Send {
        async { Ok(()) }
    }

    /// Handle a single event.
    ///
    /// Returning an error (or panicking) starts the recovery path of the cell.
    /// The emitter of the event never sees this error.
    fn process_event(&mut self, event: &Event) -> impl Future<Output = Result<()>> + Send;

    /// Called after a fault of [`process_event`](Behavior::process_event).
    ///
    /// Return `Ok(())` to resume processing with the state as left here, or
    /// an error to stop the cell. By default every fault is tolerated until
    /// the cell's fault rate limit is hit.
    fn recover(&mut self, fault: &Fault) -> impl Future<Output = Result<()>> + Send {
        let _fault = fault;
        async { Ok(()) }
    }
}
