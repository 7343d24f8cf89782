//! Auto-updating note projections.
//!
//! # Responsibility
//! - Broadcast store mutations to interested observers.
//! - Keep a projection snapshot current by re-querying after changes.
//!
//! # Invariants
//! - A [`LiveProjection`] re-queries on its first refresh and after any
//!   published change, never otherwise.
//! - Disconnected observers are pruned on the next publish.

use crate::model::note::{Note, NoteId};
use crate::repo::note_repo::{NoteProjection, NoteRepository};
use crate::repo::RepoResult;
use std::cell::RefCell;
use std::sync::mpsc::{self, Receiver, Sender};

/// A committed store mutation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NoteChange {
    Inserted(NoteId),
    Updated(NoteId),
    Deleted(NoteId),
}

impl NoteChange {
    pub fn note_id(self) -> NoteId {
        match self {
            Self::Inserted(id) | Self::Updated(id) | Self::Deleted(id) => id,
        }
    }
}

/// Fan-out of [`NoteChange`] events to subscribers.
#[derive(Debug, Default)]
pub struct ChangeFeed {
    subscribers: RefCell<Vec<Sender<NoteChange>>>,
}

impl ChangeFeed {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn subscribe(&self) -> Receiver<NoteChange> {
        let (tx, rx) = mpsc::channel();
        self.subscribers.borrow_mut().push(tx);
        rx
    }

    pub fn publish(&self, change: NoteChange) {
        self.subscribers
            .borrow_mut()
            .retain(|subscriber| subscriber.send(change).is_ok());
    }

    pub fn subscriber_count(&self) -> usize {
        self.subscribers.borrow().len()
    }
}

/// Snapshot of one projection, refreshed on demand after changes.
#[derive(Debug)]
pub struct LiveProjection {
    projection: NoteProjection,
    changes: Receiver<NoteChange>,
    snapshot: Vec<Note>,
    dirty: bool,
}

impl LiveProjection {
    pub fn new(projection: NoteProjection, changes: Receiver<NoteChange>) -> Self {
        Self {
            projection,
            changes,
            snapshot: Vec::new(),
            dirty: true,
        }
    }

    pub fn projection(&self) -> &NoteProjection {
        &self.projection
    }

    /// Last loaded notes; empty before the first refresh.
    pub fn snapshot(&self) -> &[Note] {
        &self.snapshot
    }

    /// Whether the snapshot needs a refresh.
    pub fn is_stale(&mut self) -> bool {
        self.absorb_changes();
        self.dirty
    }

    /// Re-runs the projection if needed. Returns whether the snapshot changed.
    pub fn refresh<R: NoteRepository>(&mut self, repo: &R) -> RepoResult<bool> {
        if !self.is_stale() {
            return Ok(false);
        }

        let notes = repo.list_notes(&self.projection)?;
        let changed = notes != self.snapshot;
        self.snapshot = notes;
        self.dirty = false;
        Ok(changed)
    }

    fn absorb_changes(&mut self) {
        if self.changes.try_iter().count() > 0 {
            self.dirty = true;
        }
    }
}
