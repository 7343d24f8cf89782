//! Reminder scheduler contract and the queue-backed implementation.
//!
//! # Invariants
//! - `schedule` with a fire time at or before "now" enqueues nothing and is
//!   not an error.
//! - `cancel` for an id without a pending job is a no-op.

use crate::clock::Clock;
use crate::model::note::{Note, NoteId};
use crate::reminder::queue::{DelayedJobQueue, ReminderJob};
use crate::reminder::ReminderResult;
use log::{debug, info};

/// Result of a `schedule` call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScheduleOutcome {
    Scheduled { fire_at: i64 },
    /// Fire time already passed; nothing was enqueued.
    SkippedPast,
}

/// Schedules and cancels one-shot note reminders.
pub trait ReminderScheduler {
    /// Enqueues a reminder for `note` at `fire_at_ms` unless it is in the past.
    fn schedule(&self, note: &Note, fire_at_ms: i64) -> ReminderResult<ScheduleOutcome>;
    /// Cancels any pending reminder for `note_id`; returns whether one existed.
    fn cancel(&self, note_id: NoteId) -> ReminderResult<bool>;
}

/// Scheduler that turns notes into persisted [`ReminderJob`]s.
pub struct NotificationScheduler<Q, C> {
    queue: Q,
    clock: C,
}

impl<Q: DelayedJobQueue, C: Clock> NotificationScheduler<Q, C> {
    pub fn new(queue: Q, clock: C) -> Self {
        Self { queue, clock }
    }

    /// Read access to the underlying job queue.
    pub fn queue(&self) -> &Q {
        &self.queue
    }
}

impl<Q: DelayedJobQueue, C: Clock> ReminderScheduler for NotificationScheduler<Q, C> {
    fn schedule(&self, note: &Note, fire_at_ms: i64) -> ReminderResult<ScheduleOutcome> {
        let now_ms = self.clock.now_ms();
        if fire_at_ms <= now_ms {
            debug!(
                "event=reminder_schedule module=reminder status=skipped note_id={} fire_at={} now={}",
                note.id, fire_at_ms, now_ms
            );
            return Ok(ScheduleOutcome::SkippedPast);
        }

        self.queue.enqueue(&ReminderJob {
            note_id: note.id,
            fire_at: fire_at_ms,
            title: note.title.clone(),
            body: note.description.clone(),
            enqueued_at: now_ms,
        })?;

        info!(
            "event=reminder_schedule module=reminder status=ok note_id={} delay_ms={}",
            note.id,
            fire_at_ms - now_ms
        );
        Ok(ScheduleOutcome::Scheduled {
            fire_at: fire_at_ms,
        })
    }

    fn cancel(&self, note_id: NoteId) -> ReminderResult<bool> {
        let removed = self.queue.cancel(note_id)?;
        debug!(
            "event=reminder_cancel module=reminder status=ok note_id={note_id} removed={removed}"
        );
        Ok(removed)
    }
}

#[cfg(test)]
mod tests {
    use super::{NotificationScheduler, ReminderScheduler, ScheduleOutcome};
    use crate::clock::ManualClock;
    use crate::db::open_db_in_memory;
    use crate::model::note::NoteDraft;
    use crate::reminder::queue::{DelayedJobQueue, SqliteJobQueue};

    #[test]
    fn past_fire_time_is_silently_skipped() {
        let conn = open_db_in_memory().unwrap();
        let clock = ManualClock::new(10_000);
        let scheduler = NotificationScheduler::new(SqliteJobQueue::try_new(&conn).unwrap(), &clock);
        let note = NoteDraft::new("late", 20_000).into_note(1, 0);

        assert_eq!(
            scheduler.schedule(&note, 10_000).unwrap(),
            ScheduleOutcome::SkippedPast
        );
        assert!(scheduler.queue().pending_jobs().unwrap().is_empty());
    }

    #[test]
    fn future_fire_time_enqueues_title_and_description() {
        let conn = open_db_in_memory().unwrap();
        let clock = ManualClock::new(10_000);
        let scheduler = NotificationScheduler::new(SqliteJobQueue::try_new(&conn).unwrap(), &clock);
        let note = NoteDraft::new("Pay rent", 900_000)
            .with_description("before the 5th")
            .into_note(4, 0);

        let outcome = scheduler.schedule(&note, 300_000).unwrap();
        assert_eq!(outcome, ScheduleOutcome::Scheduled { fire_at: 300_000 });

        let job = scheduler.queue().pending(4).unwrap().unwrap();
        assert_eq!(job.title, "Pay rent");
        assert_eq!(job.body, "before the 5th");
        assert_eq!(job.enqueued_at, 10_000);
    }

    #[test]
    fn cancel_without_pending_job_is_noop() {
        let conn = open_db_in_memory().unwrap();
        let scheduler =
            NotificationScheduler::new(SqliteJobQueue::try_new(&conn).unwrap(), ManualClock::new(0));
        assert!(!scheduler.cancel(42).unwrap());
    }
}
