use std::sync::{Arc, Weak};

use crate::{
    CellId, Environment, Event, EventId, Payload, Result, environment::EnvironmentInner,
    internal::Cluster,
};

/// Runtime-provided context through which a behavior interacts with the network.
///
/// Handed to [`Behavior::init`](crate::Behavior::init). Use it to:
/// - `id()`: the id of the cell running the behavior
/// - `subscribers()`: ids of the cells currently receiving this cell's emits
/// - `emit(event)`: send an event to all current subscribers
/// - `emit_new(topic, payload, correlation)`: construct and emit in one step
/// - `emit_child(topic, payload, parent)`: emit correlated to the event being processed
/// - `environment()`: the owning environment, while it exists
///
/// Emitting only waits for the subscribers' mailboxes to accept the event.
#[derive(Clone)]
pub struct Context {
    id: CellId,
    subscribers: Cluster,
    environment: Weak<EnvironmentInner>,
}

impl Context {
    pub(crate) fn new(id: CellId, subscribers: Cluster, environment: Weak<EnvironmentInner>) -> Self {
        Self {
            id,
            subscribers,
            environment,
        }
    }

    /// The environment the cell runs in, `None` once it has been dropped.
    pub fn environment(&self) -> Option<Environment> {
        self.environment.upgrade().map(Environment::from_inner)
    }

    #[inline]
    pub fn id(&self) -> &CellId {
        &self.id
    }

    pub fn subscribers(&self) -> Vec<CellId> {
        self.subscribers.ids()
    }

    /// Sends the event to every current subscriber.
    ///
    /// All subscribers are attempted; failed recipients are reported together
    /// in [`Error::Undelivered`](crate::Error::Undelivered).
    pub async fn emit(&self, event: Event) -> Result<()> {
        self.subscribers.emit(event).await
    }

    pub async fn emit_new<T, P>(
        &self,
        topic: T,
        payload: P,
        correlation_id: Option<EventId>,
    ) -> Result<()>
    where
        T: Into<Arc<str>>,
        P: Into<Payload>,
    {
        self.emit(Event::new(topic, payload, correlation_id)?).await
    }

    /// Emits a new event correlated to `parent`.
    pub async fn emit_child<T, P>(&self, topic: T, payload: P, parent: &Event) -> Result<()>
    where
        T: Into<Arc<str>>,
        P: Into<Payload>,
    {
        self.emit_new(topic, payload, Some(parent.id())).await
    }
}

impl std::fmt::Debug for Context {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Context").field("id", &self.id).finish_non_exhaustive()
    }
}
