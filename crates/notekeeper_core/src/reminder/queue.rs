//! Persisted one-shot delayed job queue.
//!
//! # Responsibility
//! - Store pending reminder jobs keyed by note id.
//! - Hand out due jobs atomically so each fires at most once.
//!
//! # Invariants
//! - `reminder_jobs.note_id` is the primary key; enqueue replaces.
//! - `take_due` selects and deletes inside one transaction.

use crate::model::note::NoteId;
use crate::reminder::ReminderResult;
use crate::repo::ensure_schema_ready;
use rusqlite::{params, Connection, OptionalExtension, Row};

const JOB_SELECT_SQL: &str = "SELECT
    note_id,
    fire_at,
    title,
    body,
    enqueued_at
FROM reminder_jobs";

/// One pending reminder.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReminderJob {
    pub note_id: NoteId,
    /// Epoch milliseconds at which the reminder becomes due.
    pub fire_at: i64,
    /// Notification heading.
    pub title: String,
    /// Notification body.
    pub body: String,
    pub enqueued_at: i64,
}

/// Delayed-job facility behind the reminder scheduler.
pub trait DelayedJobQueue {
    /// Stores `job`, replacing any pending job for the same note.
    fn enqueue(&self, job: &ReminderJob) -> ReminderResult<()>;
    /// Removes the pending job for `note_id`; returns whether one existed.
    fn cancel(&self, note_id: NoteId) -> ReminderResult<bool>;
    fn pending(&self, note_id: NoteId) -> ReminderResult<Option<ReminderJob>>;
    /// All pending jobs ordered by `fire_at, note_id`.
    fn pending_jobs(&self) -> ReminderResult<Vec<ReminderJob>>;
    /// Earliest pending fire time.
    fn next_fire_at(&self) -> ReminderResult<Option<i64>>;
    /// Removes and returns every job with `fire_at <= now_ms`.
    fn take_due(&self, now_ms: i64) -> ReminderResult<Vec<ReminderJob>>;
}

impl<Q: DelayedJobQueue + ?Sized> DelayedJobQueue for &Q {
    fn enqueue(&self, job: &ReminderJob) -> ReminderResult<()> {
        (**self).enqueue(job)
    }

    fn cancel(&self, note_id: NoteId) -> ReminderResult<bool> {
        (**self).cancel(note_id)
    }

    fn pending(&self, note_id: NoteId) -> ReminderResult<Option<ReminderJob>> {
        (**self).pending(note_id)
    }

    fn pending_jobs(&self) -> ReminderResult<Vec<ReminderJob>> {
        (**self).pending_jobs()
    }

    fn next_fire_at(&self) -> ReminderResult<Option<i64>> {
        (**self).next_fire_at()
    }

    fn take_due(&self, now_ms: i64) -> ReminderResult<Vec<ReminderJob>> {
        (**self).take_due(now_ms)
    }
}

/// SQLite-backed job queue sharing the notes connection.
pub struct SqliteJobQueue<'conn> {
    conn: &'conn Connection,
}

impl<'conn> SqliteJobQueue<'conn> {
    /// Attaches the queue to a migrated connection.
    pub fn try_new(conn: &'conn Connection) -> ReminderResult<Self> {
        ensure_schema_ready(conn, "reminder_jobs")?;
        Ok(Self { conn })
    }
}

impl DelayedJobQueue for SqliteJobQueue<'_> {
    fn enqueue(&self, job: &ReminderJob) -> ReminderResult<()> {
        self.conn.execute(
            "INSERT INTO reminder_jobs (note_id, fire_at, title, body, enqueued_at)
             VALUES (?1, ?2, ?3, ?4, ?5)
             ON CONFLICT(note_id) DO UPDATE SET
                fire_at = excluded.fire_at,
                title = excluded.title,
                body = excluded.body,
                enqueued_at = excluded.enqueued_at;",
            params![job.note_id, job.fire_at, job.title, job.body, job.enqueued_at],
        )?;
        Ok(())
    }

    fn cancel(&self, note_id: NoteId) -> ReminderResult<bool> {
        let removed = self
            .conn
            .execute("DELETE FROM reminder_jobs WHERE note_id = ?1;", [note_id])?;
        Ok(removed > 0)
    }

    fn pending(&self, note_id: NoteId) -> ReminderResult<Option<ReminderJob>> {
        let job = self
            .conn
            .query_row(
                &format!("{JOB_SELECT_SQL} WHERE note_id = ?1;"),
                [note_id],
                parse_job_row,
            )
            .optional()?;
        Ok(job)
    }

    fn pending_jobs(&self) -> ReminderResult<Vec<ReminderJob>> {
        let mut stmt = self
            .conn
            .prepare(&format!("{JOB_SELECT_SQL} ORDER BY fire_at ASC, note_id ASC;"))?;
        let jobs = stmt
            .query_map([], parse_job_row)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(jobs)
    }

    fn next_fire_at(&self) -> ReminderResult<Option<i64>> {
        let next = self
            .conn
            .query_row("SELECT MIN(fire_at) FROM reminder_jobs;", [], |row| {
                row.get::<_, Option<i64>>(0)
            })?;
        Ok(next)
    }

    fn take_due(&self, now_ms: i64) -> ReminderResult<Vec<ReminderJob>> {
        let tx = self.conn.unchecked_transaction()?;
        let due = {
            let mut stmt = tx.prepare(&format!(
                "{JOB_SELECT_SQL} WHERE fire_at <= ?1 ORDER BY fire_at ASC, note_id ASC;"
            ))?;
            let jobs = stmt
                .query_map([now_ms], parse_job_row)?
                .collect::<Result<Vec<_>, _>>()?;
            jobs
        };
        tx.execute("DELETE FROM reminder_jobs WHERE fire_at <= ?1;", [now_ms])?;
        tx.commit()?;
        Ok(due)
    }
}

fn parse_job_row(row: &Row<'_>) -> rusqlite::Result<ReminderJob> {
    Ok(ReminderJob {
        note_id: row.get("note_id")?,
        fire_at: row.get("fire_at")?,
        title: row.get("title")?,
        body: row.get("body")?,
        enqueued_at: row.get("enqueued_at")?,
    })
}

#[cfg(test)]
mod tests {
    use super::{DelayedJobQueue, ReminderJob, SqliteJobQueue};
    use crate::db::open_db_in_memory;

    fn job(note_id: i64, fire_at: i64) -> ReminderJob {
        ReminderJob {
            note_id,
            fire_at,
            title: format!("note {note_id}"),
            body: String::new(),
            enqueued_at: 0,
        }
    }

    #[test]
    fn enqueue_replaces_pending_job_for_same_note() {
        let conn = open_db_in_memory().unwrap();
        let queue = SqliteJobQueue::try_new(&conn).unwrap();

        queue.enqueue(&job(1, 100)).unwrap();
        queue.enqueue(&job(1, 200)).unwrap();

        let jobs = queue.pending_jobs().unwrap();
        assert_eq!(jobs.len(), 1);
        assert_eq!(jobs[0].fire_at, 200);
    }

    #[test]
    fn cancel_reports_whether_a_job_existed() {
        let conn = open_db_in_memory().unwrap();
        let queue = SqliteJobQueue::try_new(&conn).unwrap();

        queue.enqueue(&job(3, 100)).unwrap();
        assert!(queue.cancel(3).unwrap());
        assert!(!queue.cancel(3).unwrap());
        assert!(queue.pending(3).unwrap().is_none());
    }

    #[test]
    fn take_due_removes_only_due_jobs_in_fire_order() {
        let conn = open_db_in_memory().unwrap();
        let queue = SqliteJobQueue::try_new(&conn).unwrap();

        queue.enqueue(&job(1, 300)).unwrap();
        queue.enqueue(&job(2, 100)).unwrap();
        queue.enqueue(&job(3, 900)).unwrap();

        let due = queue.take_due(300).unwrap();
        let ids: Vec<_> = due.iter().map(|job| job.note_id).collect();
        assert_eq!(ids, vec![2, 1]);
        assert!(queue.take_due(300).unwrap().is_empty());
        assert_eq!(queue.next_fire_at().unwrap(), Some(900));
    }
}
