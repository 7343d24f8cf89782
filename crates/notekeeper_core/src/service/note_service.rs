//! Note use-case service.
//!
//! # Responsibility
//! - Provide insert/update/complete/delete use-cases over the note store.
//! - Keep each note's pending reminder in line with its due time and
//!   completion state.
//! - Publish store changes to live projections.
//!
//! # Invariants
//! - Input is validated before any store write.
//! - After every successful mutation a note has a pending reminder iff it is
//!   active and `scheduled_at - 10min` is in the future.
//! - Reminder failures never roll back a committed note write; they are logged
//!   and reported as `ReminderStatus::Failed`.

use crate::clock::Clock;
use crate::live::{ChangeFeed, LiveProjection, NoteChange};
use crate::model::note::{Note, NoteDraft, NoteId, NoteValidationError};
use crate::reminder::policy::wanted_fire_time;
use crate::reminder::scheduler::{ReminderScheduler, ScheduleOutcome};
use crate::repo::note_repo::{NoteFilter, NoteProjection, NoteRepository};
use crate::repo::{RepoError, RepoResult};
use log::{error, info};
use serde::Serialize;
use std::collections::BTreeMap;
use std::error::Error;
use std::fmt::{Display, Formatter};

/// Service error for note use-cases.
#[derive(Debug)]
pub enum NoteServiceError {
    /// Rejected user input; nothing was written.
    Validation(NoteValidationError),
    /// Target note does not exist.
    NoteNotFound(NoteId),
    /// The store failed to read or write.
    Persistence(RepoError),
    /// Internal consistency mismatch between write and read-back.
    InconsistentState(&'static str),
}

impl Display for NoteServiceError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Validation(err) => write!(f, "{err}"),
            Self::NoteNotFound(id) => write!(f, "note not found: {id}"),
            Self::Persistence(err) => write!(f, "persistence failure: {err}"),
            Self::InconsistentState(details) => write!(f, "inconsistent note state: {details}"),
        }
    }
}

impl Error for NoteServiceError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Validation(err) => Some(err),
            Self::Persistence(err) => Some(err),
            _ => None,
        }
    }
}

impl From<RepoError> for NoteServiceError {
    fn from(value: RepoError) -> Self {
        match value {
            RepoError::NotFound(id) => Self::NoteNotFound(id),
            other => Self::Persistence(other),
        }
    }
}

impl From<NoteValidationError> for NoteServiceError {
    fn from(value: NoteValidationError) -> Self {
        Self::Validation(value)
    }
}

pub type NoteServiceResult<T> = Result<T, NoteServiceError>;

/// Reminder state of a note right after a mutation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReminderStatus {
    /// A reminder is queued for `fire_at`.
    Pending { fire_at: i64 },
    /// No reminder is queued.
    Absent,
    /// The job facility failed; see the log for details.
    Failed,
}

/// Result envelope of a write use-case.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NoteMutation {
    /// Stored note after the write (for deletes: the removed note).
    pub note: Note,
    pub reminder: ReminderStatus,
}

/// Per-category counters.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CategoryStats {
    pub category: String,
    pub active: u64,
    pub completed: u64,
    pub total: u64,
}

/// Store-wide counters shown on the statistics screen.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct NoteStats {
    pub active: u64,
    pub completed: u64,
    pub total: u64,
    /// `completed * 100 / total`, rounded down; 0 for an empty store.
    pub completion_rate_percent: u64,
    /// Sorted by category label.
    pub categories: Vec<CategoryStats>,
}

/// Note service facade over a repository, a reminder scheduler and a clock.
pub struct NoteService<R, S, C> {
    repo: R,
    scheduler: S,
    clock: C,
    changes: ChangeFeed,
}

impl<R: NoteRepository, S: ReminderScheduler, C: Clock> NoteService<R, S, C> {
    pub fn new(repo: R, scheduler: S, clock: C) -> Self {
        Self {
            repo,
            scheduler,
            clock,
            changes: ChangeFeed::new(),
        }
    }

    pub fn repo(&self) -> &R {
        &self.repo
    }

    pub fn scheduler(&self) -> &S {
        &self.scheduler
    }

    /// Validates and stores a new note, then schedules its reminder.
    pub fn insert_note(&self, draft: NoteDraft) -> NoteServiceResult<NoteMutation> {
        draft.validate()?;

        let id = self.repo.insert_note(&draft, self.clock.now_ms())?;
        let note = self.read_back(id, "inserted note not found in read-back")?;
        self.changes.publish(NoteChange::Inserted(id));
        info!("event=note_insert module=service status=ok note_id={id}");

        let reminder = self.schedule_if_wanted(&note);
        Ok(NoteMutation { note, reminder })
    }

    /// Replaces an existing note and re-derives its reminder.
    ///
    /// `created_at` on the input is ignored; the stored value is kept.
    pub fn update_note(&self, note: &Note) -> NoteServiceResult<NoteMutation> {
        note.validate()?;

        self.repo.update_note(note)?;
        let stored = self.read_back(note.id, "updated note not found in read-back")?;
        self.changes.publish(NoteChange::Updated(note.id));
        info!(
            "event=note_update module=service status=ok note_id={}",
            note.id
        );

        let reminder = self.replace_reminder(&stored);
        Ok(NoteMutation {
            note: stored,
            reminder,
        })
    }

    /// Sets the completion flag and cancels or restores the reminder.
    pub fn set_completed(&self, id: NoteId, completed: bool) -> NoteServiceResult<NoteMutation> {
        self.repo.set_completed(id, completed)?;
        let note = self.read_back(id, "completed note not found in read-back")?;
        self.changes.publish(NoteChange::Updated(id));
        info!("event=note_complete module=service status=ok note_id={id} completed={completed}");

        let reminder = self.replace_reminder(&note);
        Ok(NoteMutation { note, reminder })
    }

    /// Flips the completion flag.
    pub fn toggle_completed(&self, id: NoteId) -> NoteServiceResult<NoteMutation> {
        let current = self
            .repo
            .get_note(id)?
            .ok_or(NoteServiceError::NoteNotFound(id))?;
        self.set_completed(id, !current.is_completed)
    }

    /// Removes the note, then cancels its reminder.
    ///
    /// A failed store delete leaves the pending reminder in place.
    pub fn delete_note(&self, id: NoteId) -> NoteServiceResult<NoteMutation> {
        let note = self
            .repo
            .get_note(id)?
            .ok_or(NoteServiceError::NoteNotFound(id))?;

        self.repo.delete_note(id)?;
        let reminder = self.cancel_reminder(id);
        self.changes.publish(NoteChange::Deleted(id));
        info!("event=note_delete module=service status=ok note_id={id}");

        Ok(NoteMutation { note, reminder })
    }

    /// Re-derives reminders for every stored note.
    ///
    /// Used after opening a store whose job table may be out of date.
    /// Returns the number of notes left with a pending reminder.
    pub fn reconcile_reminders(&self) -> NoteServiceResult<usize> {
        let notes = self.repo.list_notes(&NoteProjection::All)?;
        let mut pending = 0;
        let mut failed = 0;
        for note in &notes {
            match self.replace_reminder(note) {
                ReminderStatus::Pending { .. } => pending += 1,
                ReminderStatus::Absent => {}
                ReminderStatus::Failed => failed += 1,
            }
        }
        info!(
            "event=reminder_reconcile module=service status=ok notes={} pending={pending} failed={failed}",
            notes.len()
        );
        Ok(pending)
    }

    pub fn get_note(&self, id: NoteId) -> RepoResult<Option<Note>> {
        self.repo.get_note(id)
    }

    pub fn list_notes(&self, projection: &NoteProjection) -> RepoResult<Vec<Note>> {
        self.repo.list_notes(projection)
    }

    pub fn filter_notes(&self, filter: &NoteFilter) -> RepoResult<Vec<Note>> {
        self.repo.filter_notes(filter)
    }

    pub fn list_categories(&self) -> RepoResult<Vec<String>> {
        self.repo.list_categories()
    }

    pub fn completed_count(&self) -> RepoResult<u64> {
        self.repo.completed_count()
    }

    /// Counts notes overall and per category.
    pub fn stats(&self) -> RepoResult<NoteStats> {
        let notes = self.repo.list_notes(&NoteProjection::All)?;
        let mut stats = NoteStats::default();
        let mut per_category: BTreeMap<String, CategoryStats> = BTreeMap::new();

        for note in &notes {
            let entry = per_category
                .entry(note.category.clone())
                .or_insert_with(|| CategoryStats {
                    category: note.category.clone(),
                    active: 0,
                    completed: 0,
                    total: 0,
                });
            entry.total += 1;
            stats.total += 1;
            if note.is_completed {
                entry.completed += 1;
                stats.completed += 1;
            } else {
                entry.active += 1;
                stats.active += 1;
            }
        }

        if stats.total > 0 {
            stats.completion_rate_percent = stats.completed * 100 / stats.total;
        }
        stats.categories = per_category.into_values().collect();
        Ok(stats)
    }

    /// Starts observing a projection. Call [`NoteService::refresh`] to load it.
    pub fn observe(&self, projection: NoteProjection) -> LiveProjection {
        LiveProjection::new(projection, self.changes.subscribe())
    }

    /// Brings `live` up to date; returns whether its snapshot changed.
    pub fn refresh(&self, live: &mut LiveProjection) -> RepoResult<bool> {
        live.refresh(&self.repo)
    }

    fn read_back(&self, id: NoteId, details: &'static str) -> NoteServiceResult<Note> {
        self.repo
            .get_note(id)?
            .ok_or(NoteServiceError::InconsistentState(details))
    }

    fn replace_reminder(&self, note: &Note) -> ReminderStatus {
        if self.cancel_reminder(note.id) == ReminderStatus::Failed {
            return ReminderStatus::Failed;
        }
        self.schedule_if_wanted(note)
    }

    fn schedule_if_wanted(&self, note: &Note) -> ReminderStatus {
        let Some(fire_at) = wanted_fire_time(note, self.clock.now_ms()) else {
            return ReminderStatus::Absent;
        };

        match self.scheduler.schedule(note, fire_at) {
            Ok(ScheduleOutcome::Scheduled { fire_at }) => ReminderStatus::Pending { fire_at },
            Ok(ScheduleOutcome::SkippedPast) => ReminderStatus::Absent,
            Err(err) => {
                error!(
                    "event=reminder_schedule module=service status=error note_id={} error={}",
                    note.id, err
                );
                ReminderStatus::Failed
            }
        }
    }

    fn cancel_reminder(&self, id: NoteId) -> ReminderStatus {
        match self.scheduler.cancel(id) {
            Ok(_) => ReminderStatus::Absent,
            Err(err) => {
                error!("event=reminder_cancel module=service status=error note_id={id} error={err}");
                ReminderStatus::Failed
            }
        }
    }
}
