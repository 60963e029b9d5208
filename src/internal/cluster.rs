use std::{
    collections::{HashMap, HashSet},
    sync::Arc,
};

use futures_util::future::join_all;
use parking_lot::RwLock;

use crate::{Behavior, CellId, Error, Event, Result, environment::EnvironmentInner, internal::Cell};

/// Concurrency-safe mapping from id to cell.
///
/// Serves two roles: the registry of an environment, and the subscriber set
/// of a single cell. A subscriber set holds the same `Arc<Cell>` references
/// as the registry, so subscribing is a bulk merge of one cluster into another.
///
/// Mutations take the write lock, lookups and emits the read lock. No lock is
/// held while awaiting a mailbox.
#[derive(Clone, Default)]
pub(crate) struct Cluster {
    members: Arc<RwLock<Members>>,
}

#[derive(Default)]
struct Members {
    cells: HashMap<CellId, Arc<Cell>>,
    /// Ids whose behavior is being initialized.
    starting: HashSet<CellId>,
    closed: bool,
}

impl Cluster {
    pub fn new() -> Self {
        Self::default()
    }

    /// Initializes and registers a new cell.
    ///
    /// The id is reserved while the behavior initializes, so concurrent starts
    /// of the same id fail with [`Error::DuplicateId`]. The reservation is
    /// released however the start ends, including when this future is dropped.
    pub async fn start_cell<B: Behavior>(
        &self,
        owner: &Arc<EnvironmentInner>,
        id: CellId,
        behavior: B,
    ) -> Result<()> {
        let reservation = {
            let mut members = self.members.write();
            if members.closed {
                return Err(Error::Stopping("environment"));
            }
            if members.cells.contains_key(&id) || !members.starting.insert(id.clone()) {
                return Err(Error::DuplicateId(id));
            }
            Reservation {
                members: &self.members,
                id: id.clone(),
                released: false,
            }
        };

        let started = Cell::start(owner, id, behavior).await;

        let rejected = {
            let mut members = self.members.write();
            let id = reservation.release(&mut members);
            let cell = started?;
            if members.closed {
                Some(cell)
            } else {
                members.cells.insert(id, cell);
                None
            }
        };
        if let Some(cell) = rejected {
            cell.stop().await;
            return Err(Error::Stopping("environment"));
        }
        Ok(())
    }

    /// Removes the cell, then waits for its loop and mailbox to stop.
    pub async fn stop_cell(&self, id: &str) -> Result<()> {
        let cell = self
            .members
            .write()
            .cells
            .remove(id)
            .ok_or_else(|| Error::InvalidId(CellId::from(id)))?;
        cell.stop().await;
        Ok(())
    }

    pub fn cell(&self, id: &str) -> Result<Arc<Cell>> {
        self.members
            .read()
            .cells
            .get(id)
            .cloned()
            .ok_or_else(|| Error::InvalidId(CellId::from(id)))
    }

    pub fn contains(&self, id: &str) -> bool {
        self.members.read().cells.contains_key(id)
    }

    /// Adds all cells of `other` to this cluster.
    pub fn subscribe(&self, other: &Cluster) {
        let cells = other.snapshot();
        let mut members = self.members.write();
        for cell in cells {
            members.cells.insert(cell.id().clone(), cell);
        }
    }

    /// Removes all cells of `other` from this cluster.
    pub fn unsubscribe(&self, other: &Cluster) {
        let ids = other.ids();
        let mut members = self.members.write();
        for id in &ids {
            members.cells.remove(id);
        }
    }

    /// Ids of all cells, in no particular order.
    pub fn ids(&self) -> Vec<CellId> {
        self.members.read().cells.keys().cloned().collect()
    }

    pub fn subscribers(&self, id: &str) -> Result<Vec<CellId>> {
        Ok(self.cell(id)?.subscribers().ids())
    }

    /// Builds a reference-only cluster of the given cells.
    ///
    /// Fails as a whole if any id is unknown.
    pub fn subset<I, S>(&self, ids: I) -> Result<Cluster>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let members = self.members.read();
        let mut cells = HashMap::new();
        for id in ids {
            let id = id.as_ref();
            let cell = members
                .cells
                .get(id)
                .ok_or_else(|| Error::InvalidId(CellId::from(id)))?;
            cells.insert(cell.id().clone(), cell.clone());
        }
        Ok(Cluster {
            members: Arc::new(RwLock::new(Members {
                cells,
                ..Members::default()
            })),
        })
    }

    /// Delivers an event to exactly one cell.
    pub async fn emit_direct(&self, id: &str, event: Event) -> Result<()> {
        let cell = self.cell(id)?;
        cell.push(event).await
    }

    /// Delivers an event to every cell of the cluster.
    ///
    /// Best effort: a failing delivery does not keep the event from the other
    /// cells. All failed recipients are reported in [`Error::Undelivered`].
    pub async fn emit(&self, event: Event) -> Result<()> {
        let cells = self.snapshot();
        let mut failed = Vec::new();
        for cell in cells {
            if let Err(e) = cell.push(event.clone()).await {
                tracing::debug!(cell = %cell.id(), error = %e, "cannot deliver event");
                failed.push(cell.id().clone());
            }
        }
        if failed.is_empty() {
            Ok(())
        } else {
            Err(Error::Undelivered(failed))
        }
    }

    /// Removes and stops every cell. Later starts fail with [`Error::Stopping`].
    pub async fn stop(&self) {
        let cells: Vec<_> = {
            let mut members = self.members.write();
            members.closed = true;
            members.cells.drain().map(|(_, cell)| cell).collect()
        };
        join_all(cells.iter().map(|cell| cell.stop())).await;
    }

    /// Signals every cell to stop without waiting.
    ///
    /// Also empties their subscriber sets: cells subscribed to each other
    /// would otherwise keep one another, and their mailboxes, alive.
    pub fn cancel_all(&self) {
        for cell in self.members.read().cells.values() {
            cell.cancel();
            cell.subscribers().clear();
        }
    }

    pub fn clear(&self) {
        self.members.write().cells.clear();
    }

    fn snapshot(&self) -> Vec<Arc<Cell>> {
        self.members.read().cells.values().cloned().collect()
    }
}

/// Id reserved by a cell start in progress.
struct Reservation<'a> {
    members: &'a RwLock<Members>,
    id: CellId,
    released: bool,
}

impl Reservation<'_> {
    /// Ends the reservation under an already held lock.
    fn release(mut self, members: &mut Members) -> CellId {
        members.starting.remove(&self.id);
        self.released = true;
        self.id.clone()
    }
}

impl Drop for Reservation<'_> {
    fn drop(&mut self) {
        if !self.released {
            self.members.write().starting.remove(&self.id);
        }
    }
}
