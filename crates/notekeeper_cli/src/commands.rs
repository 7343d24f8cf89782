//! Subcommands and their wiring onto core services.

use crate::time::{day_bounds, format_ms, parse_due};
use anyhow::{bail, Context, Result};
use clap::Subcommand;
use log::debug;
use notekeeper_core::{
    Clock, Note, NoteDraft, NoteFilter, NoteId, NoteMutation, NoteProjection, NoteService,
    Notifier, NotificationScheduler, Priority, Reminder, ReminderDispatcher, ReminderResult,
    ReminderStatus, SqliteJobQueue, SqliteNoteRepository, StatusFilter, SystemClock,
    PRESET_CATEGORIES,
};
use rusqlite::Connection;
use std::thread;
use std::time::Duration;

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Create a note.
    Add {
        #[arg(long)]
        title: String,
        /// Local due time, `YYYY-MM-DD HH:MM`.
        #[arg(long)]
        due: String,
        #[arg(long, default_value = "")]
        description: String,
        #[arg(long, default_value = notekeeper_core::DEFAULT_CATEGORY)]
        category: String,
        /// low|medium|high
        #[arg(long, default_value = "low", value_parser = parse_priority)]
        priority: Priority,
        /// ARGB color, e.g. `0xFF3366CC`.
        #[arg(long, value_parser = parse_color)]
        color: Option<u32>,
    },
    /// Change fields of an existing note.
    Edit {
        id: NoteId,
        #[arg(long)]
        title: Option<String>,
        #[arg(long)]
        due: Option<String>,
        #[arg(long)]
        description: Option<String>,
        #[arg(long)]
        category: Option<String>,
        #[arg(long, value_parser = parse_priority)]
        priority: Option<Priority>,
        #[arg(long, value_parser = parse_color, conflicts_with = "no_color")]
        color: Option<u32>,
        /// Remove the note's color.
        #[arg(long)]
        no_color: bool,
    },
    /// Mark a note completed.
    Complete { id: NoteId },
    /// Mark a completed note active again.
    Reopen { id: NoteId },
    /// Flip a note's completion state.
    Toggle { id: NoteId },
    /// Delete a note and its pending reminder.
    Delete { id: NoteId },
    /// Print one note.
    Show {
        id: NoteId,
        #[arg(long)]
        json: bool,
    },
    /// List notes. Defaults to active notes, most urgent first.
    List {
        /// Completed notes instead of active ones.
        #[arg(long, conflicts_with = "all")]
        completed: bool,
        /// Active and completed notes.
        #[arg(long)]
        all: bool,
        #[arg(long)]
        category: Option<String>,
        #[arg(long)]
        search: Option<String>,
        /// Notes due on one local day, `YYYY-MM-DD`.
        #[arg(long, conflicts_with_all = ["from", "to", "completed", "all", "category", "search"])]
        day: Option<String>,
        /// Range start, `YYYY-MM-DD HH:MM` (inclusive).
        #[arg(long, requires = "to", conflicts_with_all = ["completed", "all", "category", "search"])]
        from: Option<String>,
        /// Range end, `YYYY-MM-DD HH:MM` (exclusive).
        #[arg(long, requires = "from")]
        to: Option<String>,
        #[arg(long)]
        json: bool,
    },
    /// Categories in use, plus presets.
    Categories,
    /// Completion counters.
    Stats {
        #[arg(long)]
        json: bool,
    },
    /// Fire due reminders.
    Remind {
        /// Keep running and fire reminders as they come due.
        #[arg(long)]
        watch: bool,
        /// Upper bound on one sleep while watching, in seconds.
        #[arg(long, default_value_t = 30)]
        poll_secs: u64,
        /// Rebuild the reminder queue from the notes before firing.
        #[arg(long)]
        reconcile: bool,
    },
}

struct TerminalNotifier;

impl Notifier for TerminalNotifier {
    fn notify(&self, reminder: &Reminder) -> ReminderResult<()> {
        println!("[{}] {}", reminder.channel.name, reminder.title);
        if !reminder.body.is_empty() {
            println!("    {}", reminder.body);
        }
        Ok(())
    }
}

pub fn run(command: Command, conn: &Connection) -> Result<()> {
    let clock = SystemClock;
    let service = NoteService::new(
        SqliteNoteRepository::try_new(conn)?,
        NotificationScheduler::new(SqliteJobQueue::try_new(conn)?, clock),
        clock,
    );

    match command {
        Command::Add {
            title,
            due,
            description,
            category,
            priority,
            color,
        } => {
            let draft = NoteDraft::new(title, parse_due(&due)?)
                .with_description(description)
                .with_category(category)
                .with_priority(priority)
                .with_color(color);
            let created = service.insert_note(draft)?;
            print_mutation("added", &created);
        }
        Command::Edit {
            id,
            title,
            due,
            description,
            category,
            priority,
            color,
            no_color,
        } => {
            let mut note = service
                .get_note(id)?
                .with_context(|| format!("note {id} does not exist"))?;
            if let Some(title) = title {
                note.title = title;
            }
            if let Some(due) = due {
                note.scheduled_at = parse_due(&due)?;
            }
            if let Some(description) = description {
                note.description = description;
            }
            if let Some(category) = category {
                note.category = category;
            }
            if let Some(priority) = priority {
                note.priority = priority;
            }
            note.color = edited_color(note.color, color, no_color);
            let updated = service.update_note(&note)?;
            print_mutation("updated", &updated);
        }
        Command::Complete { id } => print_mutation("completed", &service.set_completed(id, true)?),
        Command::Reopen { id } => print_mutation("reopened", &service.set_completed(id, false)?),
        Command::Toggle { id } => print_mutation("toggled", &service.toggle_completed(id)?),
        Command::Delete { id } => print_mutation("deleted", &service.delete_note(id)?),
        Command::Show { id, json } => {
            let note = service
                .get_note(id)?
                .with_context(|| format!("note {id} does not exist"))?;
            if json {
                println!("{}", serde_json::to_string_pretty(&note)?);
            } else {
                print_note(&note);
                if !note.description.is_empty() {
                    println!("    {}", note.description);
                }
            }
        }
        Command::List {
            completed,
            all,
            category,
            search,
            day,
            from,
            to,
            json,
        } => {
            let notes = if let Some(day) = day {
                let (start_ms, end_ms) = day_bounds(&day)?;
                service.list_notes(&NoteProjection::DateRange { start_ms, end_ms })?
            } else if let (Some(from), Some(to)) = (from, to) {
                service.list_notes(&NoteProjection::DateRange {
                    start_ms: parse_due(&from)?,
                    end_ms: parse_due(&to)?,
                })?
            } else {
                let status = if all {
                    StatusFilter::Any
                } else if completed {
                    StatusFilter::Completed
                } else {
                    StatusFilter::Active
                };
                service.filter_notes(&NoteFilter {
                    status,
                    text: search,
                    category,
                })?
            };

            if json {
                println!("{}", serde_json::to_string_pretty(&notes)?);
            } else if notes.is_empty() {
                println!("no notes");
            } else {
                notes.iter().for_each(print_note);
            }
        }
        Command::Categories => {
            let mut categories = service.list_categories()?;
            for preset in PRESET_CATEGORIES {
                if !categories.iter().any(|category| category == preset) {
                    categories.push(preset.to_string());
                }
            }
            categories.sort();
            categories.iter().for_each(|category| println!("{category}"));
        }
        Command::Stats { json } => {
            let stats = service.stats()?;
            if json {
                println!("{}", serde_json::to_string_pretty(&stats)?);
            } else {
                println!(
                    "active {}  completed {}  total {}  done {}%",
                    stats.active, stats.completed, stats.total, stats.completion_rate_percent
                );
                for category in &stats.categories {
                    println!(
                        "  {:<12} active {}  completed {}  total {}",
                        category.category, category.active, category.completed, category.total
                    );
                }
            }
        }
        Command::Remind {
            watch,
            poll_secs,
            reconcile,
        } => {
            if reconcile {
                let pending = service.reconcile_reminders()?;
                debug!("event=cli_reconcile module=cli status=ok pending={pending}");
            }
            let dispatcher =
                ReminderDispatcher::new(SqliteJobQueue::try_new(conn)?, TerminalNotifier);
            loop {
                let now_ms = clock.now_ms();
                let report = dispatcher.dispatch_due(now_ms)?;
                if !report.failed.is_empty() {
                    bail!("failed to show reminders for notes {:?}", report.failed);
                }
                if !watch {
                    break;
                }
                thread::sleep(sleep_until(dispatcher.next_fire_at()?, now_ms, poll_secs));
            }
        }
    }

    Ok(())
}

fn sleep_until(next_fire_at: Option<i64>, now_ms: i64, poll_secs: u64) -> Duration {
    let cap = Duration::from_secs(poll_secs.max(1));
    match next_fire_at {
        Some(fire_at) => {
            let wait_ms = u64::try_from(fire_at.saturating_sub(now_ms)).unwrap_or(0);
            Duration::from_millis(wait_ms).min(cap)
        }
        None => cap,
    }
}

fn print_mutation(verb: &str, mutation: &NoteMutation) {
    let reminder = match mutation.reminder {
        ReminderStatus::Pending { fire_at } => format!("reminder at {}", format_ms(fire_at)),
        ReminderStatus::Absent => "no reminder".to_string(),
        ReminderStatus::Failed => "reminder could not be scheduled".to_string(),
    };
    println!("{verb} #{} ({reminder})", mutation.note.id);
}

fn print_note(note: &Note) {
    println!(
        "#{:<4} [{}] {:<6} {}  {}  ({})",
        note.id,
        if note.is_completed { "x" } else { " " },
        note.priority,
        format_ms(note.scheduled_at),
        note.title,
        note.category
    );
}

fn edited_color(current: Option<u32>, color: Option<u32>, no_color: bool) -> Option<u32> {
    if no_color {
        None
    } else {
        color.or(current)
    }
}

fn parse_priority(value: &str) -> Result<Priority, String> {
    Priority::parse(value).ok_or_else(|| format!("unknown priority `{value}`"))
}

fn parse_color(value: &str) -> Result<u32, String> {
    let digits = value
        .trim()
        .trim_start_matches("0x")
        .trim_start_matches('#');
    u32::from_str_radix(digits, 16).map_err(|err| format!("invalid color `{value}`: {err}"))
}

#[cfg(test)]
mod tests {
    use super::{edited_color, parse_color, parse_priority, sleep_until, Command};
    use clap::Parser;
    use notekeeper_core::Priority;
    use std::time::Duration;

    #[test]
    fn sleep_is_capped_and_never_negative() {
        assert_eq!(sleep_until(None, 0, 30), Duration::from_secs(30));
        assert_eq!(sleep_until(Some(5_000), 0, 30), Duration::from_secs(5));
        assert_eq!(sleep_until(Some(0), 5_000, 30), Duration::ZERO);
        assert_eq!(sleep_until(Some(600_000), 0, 30), Duration::from_secs(30));
    }

    #[test]
    fn value_parsers_accept_common_spellings() {
        assert_eq!(parse_priority("High"), Ok(Priority::High));
        assert!(parse_priority("urgent").is_err());
        assert_eq!(parse_color("0xFF3366CC"), Ok(0xFF33_66CC));
        assert_eq!(parse_color("#00ff00"), Ok(0x00FF00));
        assert!(parse_color("blue").is_err());
    }

    #[test]
    fn edit_color_can_be_kept_replaced_or_cleared() {
        assert_eq!(edited_color(Some(0xFF00_0000), None, false), Some(0xFF00_0000));
        assert_eq!(edited_color(Some(0xFF00_0000), Some(0x00FF00), false), Some(0x00FF00));
        assert_eq!(edited_color(Some(0xFF00_0000), None, true), None);
    }

    #[derive(Debug, Parser)]
    struct EditArgs {
        #[command(subcommand)]
        command: Command,
    }

    #[test]
    fn edit_accepts_no_color_but_not_together_with_color() {
        let parsed = EditArgs::try_parse_from(["notekeeper", "edit", "3", "--no-color"]).unwrap();
        assert!(matches!(
            parsed.command,
            Command::Edit { id: 3, no_color: true, color: None, .. }
        ));
        assert!(EditArgs::try_parse_from([
            "notekeeper", "edit", "3", "--no-color", "--color", "0xFF00FF00"
        ])
        .is_err());
    }
}
