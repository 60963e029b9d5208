use std::{
    panic::AssertUnwindSafe,
    sync::{Arc, Weak},
};

use futures_util::FutureExt;
use parking_lot::Mutex;
use tokio::{select, sync::mpsc::Receiver, task::JoinHandle, time::Instant};
use tokio_util::sync::CancellationToken;

use crate::{
    Behavior, CellId, Context, Error, Event, Fault, Mailbox, Result,
    environment::EnvironmentInner,
    internal::{Cluster, Recoverings},
};

/// A running cell as referenced by clusters.
///
/// The behavior itself lives in the [`CellHandler`] task; this side only
/// holds what producers and the registry need.
pub(crate) struct Cell {
    id: CellId,
    mailbox: Arc<dyn Mailbox>,
    subscribers: Cluster,
    cancel_token: CancellationToken,
    task: Mutex<Option<JoinHandle<()>>>,
}

impl Cell {
    /// Creates the mailbox, initializes the behavior and spawns the processing loop.
    pub async fn start<B: Behavior>(
        owner: &Arc<EnvironmentInner>,
        id: CellId,
        mut behavior: B,
    ) -> Result<Arc<Cell>> {
        let init_error = |source: Error| Error::CellInit {
            id: id.clone(),
            source: Box::new(source),
        };

        let mailbox = (owner.mailbox_factory)(&id).map_err(init_error)?;
        let events = mailbox
            .events()
            .ok_or_else(|| init_error(Error::Stopping("mailbox")))?;

        let subscribers = Cluster::new();
        let ctx = Context::new(id.clone(), subscribers.clone(), Arc::downgrade(owner));
        if let Err(e) = behavior.init(ctx).await {
            if let Err(e) = mailbox.stop().await {
                tracing::warn!(cell = %id, error = %e, "cannot stop mailbox of failed cell");
            }
            return Err(init_error(e));
        }

        let cancel_token = CancellationToken::new();
        let handler = CellHandler {
            id: id.clone(),
            behavior,
            events,
            mailbox: Arc::downgrade(&mailbox),
            cancel_token: cancel_token.clone(),
            recoverings: Recoverings::new(owner.config.max_faults, owner.config.fault_window),
        };
        let task = tokio::spawn(handler.run());

        tracing::info!(cell = %id, "cell started");
        Ok(Arc::new(Cell {
            id,
            mailbox,
            subscribers,
            cancel_token,
            task: Mutex::new(Some(task)),
        }))
    }

    #[inline]
    pub fn id(&self) -> &CellId {
        &self.id
    }

    pub fn subscribers(&self) -> &Cluster {
        &self.subscribers
    }

    /// Queues an event for processing.
    pub async fn push(&self, event: Event) -> Result<()> {
        self.mailbox.push(event).await
    }

    /// Signals the processing loop to stop without waiting for it.
    pub fn cancel(&self) {
        self.cancel_token.cancel();
    }

    /// Stops the processing loop, then the mailbox.
    ///
    /// Mailbox errors are logged and dropped, the shutdown proceeds regardless.
    /// Called from the cell's own processing step, it does not wait for the
    /// loop: the loop ends once that step returns.
    pub async fn stop(&self) {
        self.cancel_token.cancel();
        let task = {
            let mut task = self.task.lock();
            let own = task
                .as_ref()
                .is_some_and(|task| Some(task.id()) == tokio::task::try_id());
            if own { None } else { task.take() }
        };
        if let Some(task) = task {
            if let Err(e) = task.await {
                tracing::error!(cell = %self.id, error = %e, "cell task failed");
            }
        }
        if let Err(e) = self.mailbox.stop().await {
            tracing::warn!(cell = %self.id, error = %e, "cannot stop mailbox of cell");
        }
        // Own subscriptions would otherwise keep subscribed cells alive in cycles.
        self.subscribers.clear();
        tracing::info!(cell = %self.id, "cell terminated");
    }
}

/// Processing loop of a cell: owns the behavior exclusively.
struct CellHandler<B: Behavior> {
    id: CellId,
    behavior: B,
    events: Receiver<Event>,
    mailbox: Weak<dyn Mailbox>,
    cancel_token: CancellationToken,
    recoverings: Recoverings,
}

impl<B: Behavior> CellHandler<B> {
    async fn run(mut self) {
        loop {
            select! {
                biased;
                _ = self.cancel_token.cancelled() => break,
                event = self.events.recv() => {
                    let Some(event) = event else {
                        break;
                    };
                    if let Err(e) = self.process(&event).await {
                        tracing::error!(cell = %self.id, error = %e, "cell stopped processing");
                        self.close_mailbox().await;
                        break;
                    }
                }
            }
        }

        if let Err(e) = self.behavior.terminate().await {
            tracing::warn!(cell = %self.id, error = %e, "cell terminated with error");
        }
    }

    async fn process(&mut self, event: &Event) -> Result<()> {
        let outcome = AssertUnwindSafe(self.behavior.process_event(event))
            .catch_unwind()
            .await;
        let fault = match outcome {
            Ok(Ok(())) => return Ok(()),
            Ok(Err(e)) => Fault::Failed(e),
            Err(panic) => Fault::from_panic(panic),
        };
        self.recover(fault).await
    }

    /// Supervision: gives up when faults are too frequent or the behavior
    /// cannot recover, otherwise resumes with the behavior's state as is.
    async fn recover(&mut self, fault: Fault) -> Result<()> {
        self.recoverings.record(Instant::now());
        tracing::error!(
            cell = %self.id,
            %fault,
            faults = self.recoverings.len(),
            "recovering cell after fault"
        );
        if self.recoverings.is_too_frequent() {
            return Err(Error::RecoveredTooOften {
                id: self.id.clone(),
                reason: fault.to_string(),
            });
        }

        let outcome = AssertUnwindSafe(self.behavior.recover(&fault))
            .catch_unwind()
            .await
            .unwrap_or_else(|panic| Err(Error::external(Fault::from_panic(panic).to_string())));
        if let Err(source) = outcome {
            return Err(Error::EventRecovering {
                id: self.id.clone(),
                reason: fault.to_string(),
                source: Box::new(source),
            });
        }

        self.recoverings.trim();
        Ok(())
    }

    /// Makes the stopped state visible to producers: later pushes are rejected.
    async fn close_mailbox(&mut self) {
        if let Some(mailbox) = self.mailbox.upgrade() {
            if let Err(e) = mailbox.stop().await {
                tracing::warn!(cell = %self.id, error = %e, "cannot stop mailbox of cell");
            }
        }
    }
}
