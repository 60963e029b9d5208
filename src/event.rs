use std::{fmt, sync::Arc};

use parking_lot::Mutex;
use tokio::sync::oneshot;

use crate::{EventId, Meta, Payload, Result};

/// Value delivered through a request's reply slot.
pub(crate) type Response = Result<Payload>;

/// One-shot reply channel of a request.
///
/// Shared by every clone of the request event. The first `respond` takes the
/// sender, later ones find the slot empty.
#[derive(Clone)]
struct ReplySlot(Arc<Mutex<Option<oneshot::Sender<Response>>>>);

/// Immutable topic + payload message, optionally carrying a reply slot.
///
/// An event with a reply slot is a *request*: the processing behavior is
/// expected to call [`Event::respond`] once. Requests and plain notifications
/// otherwise flow identically through the cell network.
///
/// Cloning is cheap; the payload and the reply slot are shared.
#[derive(Clone)]
pub struct Event {
    topic: Arc<str>,
    payload: Payload,
    meta: Meta,
    reply: Option<ReplySlot>,
}

impl Event {
    /// Creates a notification event.
    ///
    /// `correlation_id` is the optional causal context, typically the id of
    /// the event that led to this one. An empty topic fails with
    /// [`Error::NoTopic`](crate::Error::NoTopic).
    pub fn new<T, P>(topic: T, payload: P, correlation_id: Option<EventId>) -> Result<Self>
    where
        T: Into<Arc<str>>,
        P: Into<Payload>,
    {
        let topic = topic.into();
        if topic.is_empty() {
            return Err(crate::Error::NoTopic);
        }
        Ok(Self {
            topic,
            payload: payload.into(),
            meta: Meta::new(correlation_id),
            reply: None,
        })
    }

    /// Creates a request event and the receiving end of its reply slot.
    pub(crate) fn request<T, P>(
        topic: T,
        payload: P,
        correlation_id: Option<EventId>,
    ) -> Result<(Self, oneshot::Receiver<Response>)>
    where
        T: Into<Arc<str>>,
        P: Into<Payload>,
    {
        let mut event = Self::new(topic, payload, correlation_id)?;
        let (tx, rx) = oneshot::channel();
        event.reply = Some(ReplySlot(Arc::new(Mutex::new(Some(tx)))));
        Ok((event, rx))
    }

    pub fn topic(&self) -> &str {
        &self.topic
    }

    pub fn payload(&self) -> &Payload {
        &self.payload
    }

    pub fn meta(&self) -> &Meta {
        &self.meta
    }

    #[inline]
    pub fn id(&self) -> EventId {
        self.meta.id()
    }

    pub fn is_request(&self) -> bool {
        self.reply.is_some()
    }

    /// Answers a request with a payload or an error.
    ///
    /// Never blocks: the reply slot holds exactly one response. A reply to a
    /// requester that already gave up (timeout) is dropped. Only the first
    /// response of a request is delivered.
    pub fn respond<P: Into<Payload>>(&self, response: Result<P>) -> Result<()> {
        let slot = self.reply.as_ref().ok_or(crate::Error::NoRequest)?;
        let Some(sender) = slot.0.lock().take() else {
            tracing::warn!(event = %self, "request already responded, response dropped");
            return Ok(());
        };
        if sender.send(response.map(Into::into)).is_err() {
            tracing::debug!(event = %self, "requester is gone, response dropped");
        }
        Ok(())
    }
}

impl fmt::Display for Event {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "<event: {:?} / payload: {}>", &*self.topic, self.payload)
    }
}

impl fmt::Debug for Event {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Event")
            .field("topic", &self.topic)
            .field("payload", &self.payload)
            .field("meta", &self.meta)
            .field("request", &self.is_request())
            .finish()
    }
}
