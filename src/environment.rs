use std::{sync::Arc, time::Duration};

use crate::{
    Behavior, CellId, Config, Error, Event, EventId, LocalMailbox, MailboxFactory, Payload,
    Result, internal::Cluster,
};

/// An isolated network of cells, and the public facade of the runtime.
///
/// - `start_cell(id, behavior)` / `stop_cell(id)` manage cells.
/// - `subscribe(emitter, ids)` / `unsubscribe(emitter, ids)` wire the graph:
///   events a cell emits go to its subscribers.
/// - `emit(id, event)` / `emit_new(...)` deliver fire-and-forget to one cell.
/// - `request(...)` delivers a request and waits for the reply or a timeout.
/// - `stop()` stops every cell.
///
/// Handles are cheap to clone. Several environments can coexist in one
/// process without interfering. Dropping the last handle signals all cells to
/// stop; call [`stop`](Environment::stop) to wait for them.
///
/// Needs a running Tokio runtime: every cell spawns tasks.
///
/// See also: [`Behavior`], [`Context`](crate::Context), [`Config`].
#[derive(Clone)]
pub struct Environment {
    inner: Arc<EnvironmentInner>,
}

pub(crate) struct EnvironmentInner {
    pub(crate) id: Arc<str>,
    pub(crate) config: Config,
    pub(crate) mailbox_factory: MailboxFactory,
    pub(crate) cells: Cluster,
}

impl Environment {
    /// Create a new environment with the given configuration.
    pub fn new(config: Config) -> Self {
        let id: Arc<str> = match &config.id {
            Some(id) if !id.is_empty() => Arc::from(id.as_str()),
            _ => Arc::from(uuid::Uuid::new_v4().to_string()),
        };
        let mailbox_factory = config
            .mailbox_factory
            .clone()
            .unwrap_or_else(|| LocalMailbox::factory(config.mailbox_size));
        tracing::info!(environment = %id, "cells environment started");
        Self {
            inner: Arc::new(EnvironmentInner {
                id,
                config,
                mailbox_factory,
                cells: Cluster::new(),
            }),
        }
    }

    pub(crate) fn from_inner(inner: Arc<EnvironmentInner>) -> Self {
        Self { inner }
    }

    pub fn id(&self) -> &str {
        &self.inner.id
    }

    pub fn config(&self) -> &Config {
        &self.inner.config
    }

    /// Start a new cell running `behavior`.
    ///
    /// [`Behavior::init`] completes before this returns; its error aborts the
    /// start. An id that is already taken fails with [`Error::DuplicateId`]
    /// and leaves the existing cell untouched.
    pub async fn start_cell<I, B>(&self, id: I, behavior: B) -> Result<()>
    where
        I: Into<CellId>,
        B: Behavior,
    {
        self.inner
            .cells
            .start_cell(&self.inner, id.into(), behavior)
            .await
    }

    /// Remove the cell and wait until its behavior is terminated.
    ///
    /// Other cells' subscriptions to it are not removed. A cell may stop
    /// itself through its [`Context`](crate::Context); the call then returns
    /// without waiting and the behavior terminates after the current event.
    pub async fn stop_cell(&self, id: &str) -> Result<()> {
        self.inner.cells.stop_cell(id).await
    }

    pub fn has_cell(&self, id: &str) -> bool {
        self.inner.cells.contains(id)
    }

    /// Ids of all registered cells, in no particular order.
    pub fn cells(&self) -> Vec<CellId> {
        self.inner.cells.ids()
    }

    /// Make the given cells receivers of the events emitted by `emitter`.
    ///
    /// Fails without changes if any id is unknown.
    pub fn subscribe<I, S>(&self, emitter: &str, subscribers: I) -> Result<()>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let cell = self.inner.cells.cell(emitter)?;
        let subset = self.inner.cells.subset(subscribers)?;
        cell.subscribers().subscribe(&subset);
        Ok(())
    }

    pub fn unsubscribe<I, S>(&self, emitter: &str, subscribers: I) -> Result<()>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let cell = self.inner.cells.cell(emitter)?;
        let subset = self.inner.cells.subset(subscribers)?;
        cell.subscribers().unsubscribe(&subset);
        Ok(())
    }

    /// Ids of the cells subscribed to `id`, in no particular order.
    pub fn subscribers(&self, id: &str) -> Result<Vec<CellId>> {
        self.inner.cells.subscribers(id)
    }

    /// Deliver an event to one cell. Returns once the mailbox accepted it.
    pub async fn emit(&self, id: &str, event: Event) -> Result<()> {
        self.inner.cells.emit_direct(id, event).await
    }

    pub async fn emit_new<T, P>(
        &self,
        id: &str,
        topic: T,
        payload: P,
        correlation_id: Option<EventId>,
    ) -> Result<()>
    where
        T: Into<Arc<str>>,
        P: Into<Payload>,
    {
        self.emit(id, Event::new(topic, payload, correlation_id)?).await
    }

    /// Send a request to one cell and wait for its response.
    ///
    /// Fails with [`Error::Timeout`] when no response arrives within
    /// `timeout`, or as soon as the request was dropped unanswered. The
    /// request is not withdrawn from the cell; a late response is discarded.
    pub async fn request<T, P>(
        &self,
        id: &str,
        topic: T,
        payload: P,
        correlation_id: Option<EventId>,
        timeout: Duration,
    ) -> Result<Payload>
    where
        T: Into<Arc<str>>,
        P: Into<Payload>,
    {
        let (event, reply) = Event::request(topic, payload, correlation_id)?;
        let topic: Arc<str> = Arc::from(event.topic());
        self.emit(id, event).await?;

        match tokio::time::timeout(timeout, reply).await {
            Ok(Ok(response)) => response,
            Ok(Err(_)) | Err(_) => Err(Error::Timeout {
                id: CellId::from(id),
                topic,
                timeout,
            }),
        }
    }

    /// [`request`](Environment::request) with the configured request timeout.
    pub async fn request_default<T, P>(&self, id: &str, topic: T, payload: P) -> Result<Payload>
    where
        T: Into<Arc<str>>,
        P: Into<Payload>,
    {
        let timeout = self.inner.config.request_timeout;
        self.request(id, topic, payload, None, timeout).await
    }

    /// Stop every cell and wait until all of them released their resources.
    ///
    /// Idempotent. Cells can't be started afterwards.
    pub async fn stop(&self) -> Result<()> {
        self.inner.cells.stop().await;
        tracing::info!(environment = %self.inner.id, "cells environment terminated");
        Ok(())
    }
}

impl Default for Environment {
    fn default() -> Self {
        Self::new(Config::default())
    }
}

impl std::fmt::Debug for Environment {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Environment")
            .field("id", &self.inner.id)
            .field("cells", &self.inner.cells.ids())
            .finish()
    }
}

impl Drop for EnvironmentInner {
    fn drop(&mut self) {
        self.cells.cancel_all();
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;
    use crate::{Context, DEFAULT_PAYLOAD, PING_TOPIC, PONG_RESPONSE};

    /// Answers pings, records everything else and forwards it.
    #[derive(Default)]
    struct Echo {
        ctx: Option<Context>,
        seen: Vec<String>,
    }

    impl Behavior for Echo {
        async fn init(&mut self, ctx: Context) -> Result<()> {
            self.ctx = Some(ctx);
            Ok(())
        }

        async fn process_event(&mut self, event: &Event) -> Result<()> {
            match event.topic() {
                PING_TOPIC => event.respond(Ok(Payload::new(PONG_RESPONSE))),
                "seen?" => event.respond(Payload::encode(&self.seen)),
                _ => {
                    self.seen.push(event.to_string());
                    if let Some(ctx) = &self.ctx {
                        let _ = ctx.emit(event.clone()).await;
                    }
                    Ok(())
                }
            }
        }
    }

    #[tokio::test]
    async fn test_start_stop_cell() {
        let env = Environment::default();
        env.start_cell("foo", Echo::default()).await.unwrap();
        assert!(env.has_cell("foo"));

        env.stop_cell("foo").await.unwrap();
        assert!(!env.has_cell("foo"));

        assert!(!env.has_cell("bar"));
        assert!(env.stop_cell("bar").await.unwrap_err().is_invalid_id());
        env.stop().await.unwrap();
    }

    #[tokio::test]
    async fn test_environment_ids() {
        let named = Environment::new(Config::default().with_id("named"));
        assert_eq!(named.id(), "named");

        let a = Environment::default();
        let b = Environment::default();
        assert_ne!(a.id(), b.id());
    }

    #[tokio::test]
    async fn test_environments_are_isolated() {
        let a = Environment::default();
        let b = Environment::default();
        a.start_cell("foo", Echo::default()).await.unwrap();
        b.start_cell("foo", Echo::default()).await.unwrap();

        a.stop().await.unwrap();
        assert!(!a.has_cell("foo"));
        assert!(b.has_cell("foo"));
        let pong = b
            .request("foo", PING_TOPIC, (), None, Duration::from_secs(1))
            .await
            .unwrap();
        assert_eq!(pong.default_value(), Some(&json!(PONG_RESPONSE)));
        b.stop().await.unwrap();
    }

    #[tokio::test]
    async fn test_start_after_stop_fails() {
        let env = Environment::default();
        env.stop().await.unwrap();
        env.stop().await.unwrap();
        let err = env.start_cell("late", Echo::default()).await.unwrap_err();
        assert!(err.is_stopping());
    }

    #[tokio::test]
    async fn test_context_reaches_environment() {
        struct Spawner;
        impl Behavior for Spawner {
            async fn init(&mut self, ctx: Context) -> Result<()> {
                let env = ctx.environment().ok_or_else(|| Error::external("no env"))?;
                env.start_cell(format!("{}-child", ctx.id()), Echo::default())
                    .await
            }

            async fn process_event(&mut self, _event: &Event) -> Result<()> {
                Ok(())
            }
        }

        let env = Environment::default();
        env.start_cell("parent", Spawner).await.unwrap();
        assert!(env.has_cell("parent-child"));
        env.stop().await.unwrap();
    }

    #[tokio::test]
    async fn test_fan_out_reaches_all_subscribers() {
        let env = Environment::default();
        for id in ["source", "a", "b", "c"] {
            env.start_cell(id, Echo::default()).await.unwrap();
        }
        env.subscribe("source", ["a", "b", "c"]).unwrap();

        env.emit_new("source", "hello", json!(1), None).await.unwrap();
        // Answered only after "hello" was processed and forwarded.
        env.request("source", "seen?", (), None, Duration::from_secs(1))
            .await
            .unwrap();
        for id in ["a", "b", "c"] {
            let seen = env
                .request(id, "seen?", (), None, Duration::from_secs(1))
                .await
                .unwrap()
                .decode::<Vec<String>>(DEFAULT_PAYLOAD)
                .unwrap();
            assert_eq!(seen, vec![r#"<event: "hello" / payload: <"default": 1>>"#]);
        }
        env.stop().await.unwrap();
    }

    #[tokio::test]
    async fn test_fan_out_to_stopped_subscriber_is_reported() {
        let env = Environment::default();
        for id in ["a", "b", "c"] {
            env.start_cell(id, Echo::default()).await.unwrap();
        }
        env.subscribe("a", ["b", "c"]).unwrap();
        env.stop_cell("b").await.unwrap();

        // The stale reference to "b" stays until unsubscribed explicitly.
        let mut subs = env.subscribers("a").unwrap();
        subs.sort();
        assert_eq!(subs, vec![CellId::from("b"), CellId::from("c")]);

        let cell = env.inner.cells.cell("a").unwrap();
        let event = Event::new("hello", (), None).unwrap();
        let err = cell.subscribers().emit(event).await.unwrap_err();
        assert!(matches!(err, Error::Undelivered(ids) if ids == vec![CellId::from("b")]));

        // "c" still got it.
        let seen = env
            .request("c", "seen?", (), None, Duration::from_secs(1))
            .await
            .unwrap()
            .decode::<Vec<String>>(DEFAULT_PAYLOAD)
            .unwrap();
        assert_eq!(seen.len(), 1);
        env.stop().await.unwrap();
    }

    #[tokio::test]
    async fn test_subset_is_atomic() {
        let env = Environment::default();
        env.start_cell("a", Echo::default()).await.unwrap();
        env.start_cell("b", Echo::default()).await.unwrap();

        let partial = env.inner.cells.subset(["a", "nope"]);
        assert!(matches!(partial, Err(ref e) if e.is_invalid_id()));
        let subset = env.inner.cells.subset(["a", "b"]).unwrap();
        let mut ids = subset.ids();
        ids.sort();
        assert_eq!(ids, vec![CellId::from("a"), CellId::from("b")]);
        env.stop().await.unwrap();
    }
}
