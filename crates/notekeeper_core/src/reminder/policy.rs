//! When a note deserves a reminder.
//!
//! # Invariants
//! - Fire time is always `scheduled_at - REMINDER_LEAD_MS`.
//! - Completed notes never get a reminder.
//! - A reminder is only wanted when its fire time is strictly after `now`.

use crate::clock::MINUTE_MS;
use crate::model::note::Note;

/// How long before the due time a reminder fires.
pub const REMINDER_LEAD_MS: i64 = 10 * MINUTE_MS;

/// Fire time for a note's reminder, in epoch milliseconds.
pub fn reminder_fire_time(note: &Note) -> i64 {
    note.scheduled_at.saturating_sub(REMINDER_LEAD_MS)
}

/// Returns the fire time when `note` should have a pending reminder at `now_ms`.
pub fn wanted_fire_time(note: &Note, now_ms: i64) -> Option<i64> {
    if note.is_completed {
        return None;
    }
    let fire_at = reminder_fire_time(note);
    (fire_at > now_ms).then_some(fire_at)
}
