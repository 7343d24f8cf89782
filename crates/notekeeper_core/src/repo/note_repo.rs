//! Note repository contracts and SQLite implementation.
//!
//! # Responsibility
//! - Provide CRUD APIs over the `notes` table.
//! - Serve the sorted/filtered read projections used by hosts.
//!
//! # Invariants
//! - Active projection: `priority DESC, scheduled_at ASC, id ASC`.
//! - Completed projection: `scheduled_at DESC, id DESC`.
//! - Range, search, category and "all" projections: `scheduled_at ASC, id ASC`.
//! - Updates never touch `created_at`.
//! - Text matching is case-insensitive (Unicode-aware) on title or description.

use crate::model::note::{normalize_category, Note, NoteDraft, NoteId, Priority};
use crate::repo::{ensure_schema_ready, RepoError, RepoResult};
use rusqlite::types::Value;
use rusqlite::{params, params_from_iter, Connection, Row};

const NOTE_SELECT_SQL: &str = "SELECT
    id,
    title,
    description,
    scheduled_at,
    created_at,
    category,
    priority,
    is_completed,
    color
FROM notes";

const ORDER_ACTIVE: &str = " ORDER BY priority DESC, scheduled_at ASC, id ASC";
const ORDER_COMPLETED: &str = " ORDER BY scheduled_at DESC, id DESC";
const ORDER_DUE: &str = " ORDER BY scheduled_at ASC, id ASC";

/// Read projections over the note store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NoteProjection {
    /// Every note, by due time.
    All,
    /// Not completed, most urgent first.
    Active,
    /// Completed, latest due first.
    Completed,
    /// Due within `[start_ms, end_ms)`.
    DateRange { start_ms: i64, end_ms: i64 },
    /// Title or description contains the text, ignoring case.
    Search(String),
    /// Exact category label.
    Category(String),
}

/// Completion-state tab used by [`NoteFilter`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum StatusFilter {
    #[default]
    Any,
    Active,
    Completed,
}

/// Combined filter as composed by the main list screen.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NoteFilter {
    pub status: StatusFilter,
    /// Blank or `None` disables text matching.
    pub text: Option<String>,
    /// `None` disables category matching.
    pub category: Option<String>,
}

/// Repository interface for note operations.
pub trait NoteRepository {
    /// Inserts a note and returns the assigned id.
    fn insert_note(&self, draft: &NoteDraft, created_at: i64) -> RepoResult<NoteId>;
    /// Replaces all mutable fields of an existing note.
    fn update_note(&self, note: &Note) -> RepoResult<()>;
    /// Sets only the completion flag.
    fn set_completed(&self, id: NoteId, completed: bool) -> RepoResult<()>;
    /// Removes a note permanently.
    fn delete_note(&self, id: NoteId) -> RepoResult<()>;
    fn get_note(&self, id: NoteId) -> RepoResult<Option<Note>>;
    fn list_notes(&self, projection: &NoteProjection) -> RepoResult<Vec<Note>>;
    fn filter_notes(&self, filter: &NoteFilter) -> RepoResult<Vec<Note>>;
    /// Distinct category labels in use, sorted.
    fn list_categories(&self) -> RepoResult<Vec<String>>;
    fn completed_count(&self) -> RepoResult<u64>;
}

/// SQLite-backed note repository.
pub struct SqliteNoteRepository<'conn> {
    conn: &'conn Connection,
}

impl<'conn> SqliteNoteRepository<'conn> {
    /// Constructs a repository from a migrated connection.
    ///
    /// # Errors
    /// - `UninitializedConnection` when migrations were not applied.
    /// - `MissingRequiredTable("notes")` when the schema is incomplete.
    pub fn try_new(conn: &'conn Connection) -> RepoResult<Self> {
        ensure_schema_ready(conn, "notes")?;
        Ok(Self { conn })
    }

    fn query_notes(&self, sql: &str, bind_values: Vec<Value>) -> RepoResult<Vec<Note>> {
        let mut stmt = self.conn.prepare(sql)?;
        let mut rows = stmt.query(params_from_iter(bind_values))?;
        let mut notes = Vec::new();
        while let Some(row) = rows.next()? {
            notes.push(parse_note_row(row)?);
        }
        Ok(notes)
    }
}

impl NoteRepository for SqliteNoteRepository<'_> {
    fn insert_note(&self, draft: &NoteDraft, created_at: i64) -> RepoResult<NoteId> {
        let note = draft.clone().into_note(0, created_at);
        self.conn.execute(
            "INSERT INTO notes (
                title,
                description,
                scheduled_at,
                created_at,
                category,
                priority,
                is_completed,
                color
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8);",
            params![
                note.title,
                note.description,
                note.scheduled_at,
                note.created_at,
                note.category,
                note.priority.rank(),
                bool_to_int(note.is_completed),
                note.color.map(i64::from),
            ],
        )?;

        Ok(self.conn.last_insert_rowid())
    }

    fn update_note(&self, note: &Note) -> RepoResult<()> {
        let changed = self.conn.execute(
            "UPDATE notes
             SET
                title = ?1,
                description = ?2,
                scheduled_at = ?3,
                category = ?4,
                priority = ?5,
                is_completed = ?6,
                color = ?7
             WHERE id = ?8;",
            params![
                note.title.trim(),
                note.description,
                note.scheduled_at,
                normalize_category(&note.category),
                note.priority.rank(),
                bool_to_int(note.is_completed),
                note.color.map(i64::from),
                note.id,
            ],
        )?;

        if changed == 0 {
            return Err(RepoError::NotFound(note.id));
        }
        Ok(())
    }

    fn set_completed(&self, id: NoteId, completed: bool) -> RepoResult<()> {
        let changed = self.conn.execute(
            "UPDATE notes SET is_completed = ?1 WHERE id = ?2;",
            params![bool_to_int(completed), id],
        )?;

        if changed == 0 {
            return Err(RepoError::NotFound(id));
        }
        Ok(())
    }

    fn delete_note(&self, id: NoteId) -> RepoResult<()> {
        let changed = self
            .conn
            .execute("DELETE FROM notes WHERE id = ?1;", [id])?;

        if changed == 0 {
            return Err(RepoError::NotFound(id));
        }
        Ok(())
    }

    fn get_note(&self, id: NoteId) -> RepoResult<Option<Note>> {
        let mut stmt = self
            .conn
            .prepare(&format!("{NOTE_SELECT_SQL} WHERE id = ?1;"))?;
        let mut rows = stmt.query([id])?;
        if let Some(row) = rows.next()? {
            return Ok(Some(parse_note_row(row)?));
        }
        Ok(None)
    }

    fn list_notes(&self, projection: &NoteProjection) -> RepoResult<Vec<Note>> {
        match projection {
            NoteProjection::All => {
                self.query_notes(&format!("{NOTE_SELECT_SQL}{ORDER_DUE};"), Vec::new())
            }
            NoteProjection::Active => self.query_notes(
                &format!("{NOTE_SELECT_SQL} WHERE is_completed = 0{ORDER_ACTIVE};"),
                Vec::new(),
            ),
            NoteProjection::Completed => self.query_notes(
                &format!("{NOTE_SELECT_SQL} WHERE is_completed = 1{ORDER_COMPLETED};"),
                Vec::new(),
            ),
            NoteProjection::DateRange { start_ms, end_ms } => {
                if end_ms <= start_ms {
                    return Ok(Vec::new());
                }
                self.query_notes(
                    &format!(
                        "{NOTE_SELECT_SQL} WHERE scheduled_at >= ?1 AND scheduled_at < ?2{ORDER_DUE};"
                    ),
                    vec![Value::Integer(*start_ms), Value::Integer(*end_ms)],
                )
            }
            NoteProjection::Search(text) => {
                // SQLite LIKE/lower() only fold ASCII; match in Rust instead.
                let notes =
                    self.query_notes(&format!("{NOTE_SELECT_SQL}{ORDER_DUE};"), Vec::new())?;
                Ok(notes
                    .into_iter()
                    .filter(|note| note.matches_text(text))
                    .collect())
            }
            NoteProjection::Category(category) => self.query_notes(
                &format!("{NOTE_SELECT_SQL} WHERE category = ?1{ORDER_DUE};"),
                vec![Value::Text(normalize_category(category))],
            ),
        }
    }

    fn filter_notes(&self, filter: &NoteFilter) -> RepoResult<Vec<Note>> {
        let mut sql = format!("{NOTE_SELECT_SQL} WHERE 1 = 1");
        let mut bind_values: Vec<Value> = Vec::new();

        match filter.status {
            StatusFilter::Any => {}
            StatusFilter::Active => sql.push_str(" AND is_completed = 0"),
            StatusFilter::Completed => sql.push_str(" AND is_completed = 1"),
        }

        if let Some(category) = filter.category.as_ref() {
            sql.push_str(" AND category = ?");
            bind_values.push(Value::Text(normalize_category(category)));
        }

        sql.push_str(match filter.status {
            StatusFilter::Any => ORDER_DUE,
            StatusFilter::Active => ORDER_ACTIVE,
            StatusFilter::Completed => ORDER_COMPLETED,
        });

        let notes = self.query_notes(&sql, bind_values)?;
        Ok(match filter.text.as_deref() {
            Some(text) => notes
                .into_iter()
                .filter(|note| note.matches_text(text))
                .collect(),
            None => notes,
        })
    }

    fn list_categories(&self) -> RepoResult<Vec<String>> {
        let mut stmt = self
            .conn
            .prepare("SELECT DISTINCT category FROM notes ORDER BY category ASC;")?;
        let categories = stmt
            .query_map([], |row| row.get::<_, String>(0))?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(categories)
    }

    fn completed_count(&self) -> RepoResult<u64> {
        let count: i64 = self.conn.query_row(
            "SELECT COUNT(*) FROM notes WHERE is_completed = 1;",
            [],
            |row| row.get(0),
        )?;
        u64::try_from(count)
            .map_err(|_| RepoError::InvalidData(format!("negative completed count {count}")))
    }
}

fn parse_note_row(row: &Row<'_>) -> RepoResult<Note> {
    let id: NoteId = row.get("id")?;

    let rank: i64 = row.get("priority")?;
    let priority = Priority::from_rank(rank).ok_or_else(|| {
        RepoError::InvalidData(format!("invalid priority `{rank}` in notes.priority (id={id})"))
    })?;

    let is_completed = match row.get::<_, i64>("is_completed")? {
        0 => false,
        1 => true,
        other => {
            return Err(RepoError::InvalidData(format!(
                "invalid is_completed value `{other}` in notes.is_completed (id={id})"
            )));
        }
    };

    let color = match row.get::<_, Option<i64>>("color")? {
        Some(value) => Some(u32::try_from(value).map_err(|_| {
            RepoError::InvalidData(format!("invalid color `{value}` in notes.color (id={id})"))
        })?),
        None => None,
    };

    Ok(Note {
        id,
        title: row.get("title")?,
        description: row.get("description")?,
        scheduled_at: row.get("scheduled_at")?,
        created_at: row.get("created_at")?,
        category: row.get("category")?,
        priority,
        is_completed,
        color,
    })
}

fn bool_to_int(value: bool) -> i64 {
    if value {
        1
    } else {
        0
    }
}
