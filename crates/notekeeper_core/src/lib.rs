//! Core domain logic for NoteKeeper.
//! This crate is the single source of truth for note and reminder invariants.

pub mod clock;
pub mod db;
pub mod live;
pub mod logging;
pub mod model;
pub mod reminder;
pub mod repo;
pub mod service;

pub use clock::{Clock, ManualClock, SystemClock};
pub use live::{ChangeFeed, LiveProjection, NoteChange};
pub use logging::{default_log_level, init_logging, logging_status, LogTarget};
pub use model::note::{
    normalize_category, Note, NoteDraft, NoteId, NoteValidationError, Priority, DEFAULT_CATEGORY,
    PRESET_CATEGORIES,
};
pub use reminder::dispatch::{
    DispatchReport, LogNotifier, NotificationChannel, Notifier, Reminder, ReminderDispatcher,
    NOTES_CHANNEL,
};
pub use reminder::policy::{reminder_fire_time, REMINDER_LEAD_MS};
pub use reminder::queue::{DelayedJobQueue, ReminderJob, SqliteJobQueue};
pub use reminder::scheduler::{NotificationScheduler, ReminderScheduler, ScheduleOutcome};
pub use reminder::{ReminderError, ReminderResult};
pub use repo::note_repo::{
    NoteFilter, NoteProjection, NoteRepository, SqliteNoteRepository, StatusFilter,
};
pub use repo::{RepoError, RepoResult};
pub use service::note_service::{
    CategoryStats, NoteMutation, NoteService, NoteServiceError, NoteServiceResult, NoteStats,
    ReminderStatus,
};
