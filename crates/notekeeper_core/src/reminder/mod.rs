//! Reminder scheduling, persisted job queue and dispatch.
//!
//! # Responsibility
//! - Turn "remind me before this note is due" into a one-shot delayed job.
//! - Persist pending jobs so they survive process restarts.
//! - Hand due jobs to a notifier exactly once.
//!
//! # Invariants
//! - At most one pending job per note id.
//! - A job is removed from the queue before it is delivered.
//! - Scheduling for a fire time that is not in the future is a silent no-op.

use crate::db::DbError;
use crate::repo::RepoError;
use std::error::Error;
use std::fmt::{Display, Formatter};

pub mod dispatch;
pub mod policy;
pub mod queue;
pub mod scheduler;

pub type ReminderResult<T> = Result<T, ReminderError>;

/// Failure inside the reminder job facility.
#[derive(Debug)]
pub enum ReminderError {
    Db(DbError),
    /// The queue could not be attached to the connection.
    Unavailable(RepoError),
    /// Notifier failed to present a reminder.
    Delivery(String),
}

impl Display for ReminderError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Db(err) => write!(f, "{err}"),
            Self::Unavailable(err) => write!(f, "reminder queue unavailable: {err}"),
            Self::Delivery(message) => write!(f, "reminder delivery failed: {message}"),
        }
    }
}

impl Error for ReminderError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Db(err) => Some(err),
            Self::Unavailable(err) => Some(err),
            Self::Delivery(_) => None,
        }
    }
}

impl From<DbError> for ReminderError {
    fn from(value: DbError) -> Self {
        Self::Db(value)
    }
}

impl From<rusqlite::Error> for ReminderError {
    fn from(value: rusqlite::Error) -> Self {
        Self::Db(DbError::Sqlite(value))
    }
}

impl From<RepoError> for ReminderError {
    fn from(value: RepoError) -> Self {
        Self::Unavailable(value)
    }
}
