//! Note domain model.
//!
//! # Responsibility
//! - Define `Note`, `NoteDraft` and `Priority`.
//! - Normalize category labels and validate user input.
//!
//! # Invariants
//! - `id` is assigned by the store and never reused.
//! - `created_at` is set once on insert and survives updates.
//! - `title` is non-empty after trimming for any note accepted by
//!   `NoteDraft::validate`.

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::error::Error;
use std::fmt::{Display, Formatter};

static WHITESPACE_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s+").expect("valid ws regex"));

/// Store-assigned note identifier.
pub type NoteId = i64;

/// Label used when a note has no explicit category.
pub const DEFAULT_CATEGORY: &str = "General";

/// Category labels offered by hosts when creating a note.
pub const PRESET_CATEGORIES: [&str; 5] = ["General", "Work", "Personal", "Health", "Shopping"];

/// Note urgency. Ordering follows urgency: `Low < Medium < High`.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(rename_all = "snake_case")]
pub enum Priority {
    #[default]
    Low,
    Medium,
    High,
}

impl Priority {
    /// Integer rank persisted in `notes.priority`.
    pub fn rank(self) -> i64 {
        match self {
            Self::Low => 1,
            Self::Medium => 2,
            Self::High => 3,
        }
    }

    /// Inverse of [`Priority::rank`].
    pub fn from_rank(rank: i64) -> Option<Self> {
        match rank {
            1 => Some(Self::Low),
            2 => Some(Self::Medium),
            3 => Some(Self::High),
            _ => None,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Low => "low",
            Self::Medium => "medium",
            Self::High => "high",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "low" | "1" => Some(Self::Low),
            "medium" | "2" => Some(Self::Medium),
            "high" | "3" => Some(Self::High),
            _ => None,
        }
    }
}

impl Display for Priority {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.pad(self.as_str())
    }
}

/// Validation failures for user-provided note input.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NoteValidationError {
    EmptyTitle,
    InvalidScheduledAt(i64),
}

impl Display for NoteValidationError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::EmptyTitle => write!(f, "note title must not be empty"),
            Self::InvalidScheduledAt(value) => {
                write!(f, "scheduled time must be a positive epoch ms value, got {value}")
            }
        }
    }
}

impl Error for NoteValidationError {}

/// Insert shape for a note: everything except store-owned fields.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NoteDraft {
    pub title: String,
    pub description: String,
    /// Due time, Unix epoch milliseconds.
    pub scheduled_at: i64,
    pub category: String,
    pub priority: Priority,
    pub is_completed: bool,
    /// Optional ARGB display color.
    pub color: Option<u32>,
}

impl NoteDraft {
    /// Creates an active, low-priority draft in the default category.
    pub fn new(title: impl Into<String>, scheduled_at: i64) -> Self {
        Self {
            title: title.into(),
            description: String::new(),
            scheduled_at,
            category: DEFAULT_CATEGORY.to_string(),
            priority: Priority::Low,
            is_completed: false,
            color: None,
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    pub fn with_category(mut self, category: impl AsRef<str>) -> Self {
        self.category = normalize_category(category.as_ref());
        self
    }

    pub fn with_priority(mut self, priority: Priority) -> Self {
        self.priority = priority;
        self
    }

    pub fn with_color(mut self, color: Option<u32>) -> Self {
        self.color = color;
        self
    }

    /// Checks user input before it reaches the store.
    ///
    /// # Errors
    /// - `EmptyTitle` when the title is blank.
    /// - `InvalidScheduledAt` when the due time is not a positive timestamp.
    pub fn validate(&self) -> Result<(), NoteValidationError> {
        validate_fields(&self.title, self.scheduled_at)
    }

    /// Binds store-owned fields, producing the persisted shape.
    pub fn into_note(self, id: NoteId, created_at: i64) -> Note {
        Note {
            id,
            title: self.title.trim().to_string(),
            description: self.description,
            scheduled_at: self.scheduled_at,
            created_at,
            category: normalize_category(&self.category),
            priority: self.priority,
            is_completed: self.is_completed,
            color: self.color,
        }
    }
}

/// Canonical persisted note.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Note {
    pub id: NoteId,
    pub title: String,
    pub description: String,
    /// Due time, Unix epoch milliseconds.
    pub scheduled_at: i64,
    /// Creation time, Unix epoch milliseconds.
    pub created_at: i64,
    pub category: String,
    pub priority: Priority,
    pub is_completed: bool,
    pub color: Option<u32>,
}

impl Note {
    /// Same checks as [`NoteDraft::validate`], applied to an edited note.
    pub fn validate(&self) -> Result<(), NoteValidationError> {
        validate_fields(&self.title, self.scheduled_at)
    }

    pub fn is_active(&self) -> bool {
        !self.is_completed
    }

    /// Case-insensitive substring match on title or description.
    ///
    /// A blank query matches every note.
    pub fn matches_text(&self, query: &str) -> bool {
        let needle = query.trim().to_lowercase();
        if needle.is_empty() {
            return true;
        }
        self.title.to_lowercase().contains(&needle)
            || self.description.to_lowercase().contains(&needle)
    }
}

/// Trims a category label and collapses inner whitespace.
///
/// Blank labels fall back to [`DEFAULT_CATEGORY`].
pub fn normalize_category(value: &str) -> String {
    let collapsed = WHITESPACE_RE.replace_all(value.trim(), " ");
    if collapsed.is_empty() {
        DEFAULT_CATEGORY.to_string()
    } else {
        collapsed.into_owned()
    }
}

fn validate_fields(title: &str, scheduled_at: i64) -> Result<(), NoteValidationError> {
    if title.trim().is_empty() {
        return Err(NoteValidationError::EmptyTitle);
    }
    if scheduled_at <= 0 {
        return Err(NoteValidationError::InvalidScheduledAt(scheduled_at));
    }
    Ok(())
}
