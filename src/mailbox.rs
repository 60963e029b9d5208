use std::sync::Arc;

use parking_lot::Mutex;
use tokio::{
    select,
    sync::mpsc::{Receiver, Sender, channel},
    task::JoinHandle,
};
use tokio_util::sync::CancellationToken;

use crate::{CellId, Error, Event, Result, internal::RingBuffer};

/// Constructs the mailbox of a newly started cell.
///
/// Installed via [`Config::with_mailbox_factory`](crate::Config::with_mailbox_factory).
/// The default builds a [`LocalMailbox`] with the configured size.
pub type MailboxFactory = Arc<dyn Fn(&CellId) -> Result<Arc<dyn Mailbox>> + Send + Sync>;

/// Per-cell FIFO queue between event producers and the cell's processing loop.
///
/// Implementations must preserve the order of events pushed by one producer
/// and must reject pushes with [`Error::Stopping`] once stopped.
#[async_trait::async_trait]
pub trait Mailbox: Send + Sync + 'static {
    /// Appends an event. Resolves once the event is accepted, not processed.
    async fn push(&self, event: Event) -> Result<()>;

    /// Hands out the receiving end of the queue.
    ///
    /// There is a single consumer per mailbox: only the first call returns `Some`.
    fn events(&self) -> Option<Receiver<Event>>;

    /// Stops accepting and delivering events.
    async fn stop(&self) -> Result<()>;
}

/// In-memory mailbox backed by a growable ring buffer.
///
/// A dedicated task owns the buffer. While the buffer is empty it waits for
/// the next push, otherwise it offers the oldest event to the cell and keeps
/// accepting pushes at the same time. The buffer grows when full, so
/// producers never wait for a slow consumer.
pub struct LocalMailbox {
    pusher: Sender<Event>,
    events: Mutex<Option<Receiver<Event>>>,
    cancel_token: CancellationToken,
    task: Mutex<Option<JoinHandle<()>>>,
}

impl LocalMailbox {
    /// Smallest initial buffer size a local mailbox is created with.
    pub const MIN_SIZE: usize = 5;

    /// Creates the mailbox and spawns its task on the current Tokio runtime.
    pub fn new(size: usize) -> Self {
        let (pusher, pushed) = channel(1);
        let (delivery, events) = channel(1);
        let cancel_token = CancellationToken::new();
        let backend = MailboxBackend {
            buffer: RingBuffer::new(size.max(Self::MIN_SIZE)),
            pushed,
            delivery,
            cancel_token: cancel_token.clone(),
        };
        let task = tokio::spawn(backend.run());
        Self {
            pusher,
            events: Mutex::new(Some(events)),
            cancel_token,
            task: Mutex::new(Some(task)),
        }
    }

    /// Factory creating local mailboxes with the given initial size.
    pub fn factory(size: usize) -> MailboxFactory {
        Arc::new(move |_id: &CellId| -> Result<Arc<dyn Mailbox>> {
            Ok(Arc::new(LocalMailbox::new(size)))
        })
    }
}

#[async_trait::async_trait]
impl Mailbox for LocalMailbox {
    async fn push(&self, event: Event) -> Result<()> {
        select! {
            biased;
            _ = self.cancel_token.cancelled() => Err(Error::Stopping("mailbox")),
            res = self.pusher.send(event) => res.map_err(|_| Error::Stopping("mailbox")),
        }
    }

    fn events(&self) -> Option<Receiver<Event>> {
        self.events.lock().take()
    }

    async fn stop(&self) -> Result<()> {
        self.cancel_token.cancel();
        let task = self.task.lock().take();
        if let Some(task) = task {
            task.await
                .map_err(|e| Error::external(format!("mailbox task failed: {e}")))?;
        }
        Ok(())
    }
}

impl Drop for LocalMailbox {
    fn drop(&mut self) {
        self.cancel_token.cancel();
    }
}

struct MailboxBackend {
    buffer: RingBuffer<Event>,
    pushed: Receiver<Event>,
    delivery: Sender<Event>,
    cancel_token: CancellationToken,
}

impl MailboxBackend {
    async fn run(mut self) {
        loop {
            if self.buffer.is_empty() {
                select! {
                    biased;
                    _ = self.cancel_token.cancelled() => break,
                    Some(event) = self.pushed.recv() => enqueue(&mut self.buffer, event),
                    else => break,
                }
            } else {
                select! {
                    _ = self.cancel_token.cancelled() => break,
                    Some(event) = self.pushed.recv() => enqueue(&mut self.buffer, event),
                    permit = self.delivery.reserve() => match permit {
                        Ok(permit) => {
                            if let Some(event) = self.buffer.pop() {
                                permit.send(event);
                            }
                        }
                        // The consumer is gone.
                        Err(_) => break,
                    },
                }
            }
        }
        self.cancel_token.cancel();
    }
}

/// Appends to the buffer, logging when it had to grow.
fn enqueue(buffer: &mut RingBuffer<Event>, event: Event) {
    let capacity = buffer.capacity();
    buffer.push(event);
    if buffer.capacity() > capacity {
        tracing::trace!(
            len = buffer.len(),
            capacity = buffer.capacity(),
            "mailbox buffer grew"
        );
    }
}
