//! Firing side of reminders: take due jobs, present notifications.
//!
//! # Responsibility
//! - Drain due jobs from the queue and hand them to a [`Notifier`].
//! - Expose the next wake-up time for hosts that sleep between runs.
//!
//! # Invariants
//! - Jobs are removed before delivery; a failed delivery is not retried.
//! - Log events carry ids and counts only, never titles or bodies.

use crate::model::note::NoteId;
use crate::reminder::queue::{DelayedJobQueue, ReminderJob};
use crate::reminder::ReminderResult;
use log::{error, info};

/// Fixed notification channel every reminder is posted on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NotificationChannel {
    pub id: &'static str,
    pub name: &'static str,
    pub description: &'static str,
}

pub const NOTES_CHANNEL: NotificationChannel = NotificationChannel {
    id: "notes_channel",
    name: "Notes",
    description: "Upcoming task reminders",
};

const FALLBACK_TITLE: &str = "Reminder";

/// A user-visible reminder, keyed by note id.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Reminder {
    pub channel: NotificationChannel,
    pub note_id: NoteId,
    /// Heading; falls back to "Reminder" for untitled jobs.
    pub title: String,
    pub body: String,
}

impl From<ReminderJob> for Reminder {
    fn from(job: ReminderJob) -> Self {
        let title = if job.title.trim().is_empty() {
            FALLBACK_TITLE.to_string()
        } else {
            job.title
        };
        Self {
            channel: NOTES_CHANNEL,
            note_id: job.note_id,
            title,
            body: job.body,
        }
    }
}

/// Presents reminders to the user.
pub trait Notifier {
    fn notify(&self, reminder: &Reminder) -> ReminderResult<()>;
}

impl<N: Notifier + ?Sized> Notifier for &N {
    fn notify(&self, reminder: &Reminder) -> ReminderResult<()> {
        (**self).notify(reminder)
    }
}

/// Notifier that only records metadata in the log.
#[derive(Debug, Clone, Copy, Default)]
pub struct LogNotifier;

impl Notifier for LogNotifier {
    fn notify(&self, reminder: &Reminder) -> ReminderResult<()> {
        info!(
            "event=reminder_fire module=reminder status=ok channel={} note_id={}",
            reminder.channel.id, reminder.note_id
        );
        Ok(())
    }
}

/// Outcome of one dispatch pass.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DispatchReport {
    /// Note ids whose reminders were delivered, in fire order.
    pub delivered: Vec<NoteId>,
    /// Note ids whose delivery failed. These jobs are gone.
    pub failed: Vec<NoteId>,
}

/// Moves due jobs from a queue to a notifier.
pub struct ReminderDispatcher<Q, N> {
    queue: Q,
    notifier: N,
}

impl<Q: DelayedJobQueue, N: Notifier> ReminderDispatcher<Q, N> {
    pub fn new(queue: Q, notifier: N) -> Self {
        Self { queue, notifier }
    }

    /// Fires every job due at `now_ms`.
    ///
    /// # Errors
    /// - Returns queue errors; notifier errors are logged and reported in
    ///   [`DispatchReport::failed`].
    pub fn dispatch_due(&self, now_ms: i64) -> ReminderResult<DispatchReport> {
        let due = self.queue.take_due(now_ms)?;
        let mut report = DispatchReport::default();

        for job in due {
            let reminder = Reminder::from(job);
            match self.notifier.notify(&reminder) {
                Ok(()) => report.delivered.push(reminder.note_id),
                Err(err) => {
                    error!(
                        "event=reminder_fire module=reminder status=error note_id={} error={}",
                        reminder.note_id, err
                    );
                    report.failed.push(reminder.note_id);
                }
            }
        }

        if !report.delivered.is_empty() || !report.failed.is_empty() {
            info!(
                "event=reminder_dispatch module=reminder status=ok delivered={} failed={}",
                report.delivered.len(),
                report.failed.len()
            );
        }
        Ok(report)
    }

    /// Earliest pending fire time, if any job is queued.
    pub fn next_fire_at(&self) -> ReminderResult<Option<i64>> {
        self.queue.next_fire_at()
    }
}
