use notekeeper_core::db::open_db_in_memory;
use notekeeper_core::{
    DelayedJobQueue, LogNotifier, ManualClock, NoteDraft, NoteService, Notifier,
    NotificationScheduler, Reminder, ReminderDispatcher, ReminderError, ReminderResult,
    SqliteJobQueue, SqliteNoteRepository, NOTES_CHANNEL,
};
use std::cell::RefCell;

const MINUTE: i64 = 60 * 1000;
const T: i64 = 1_800_000_000_000;

#[derive(Default)]
struct RecordingNotifier {
    shown: RefCell<Vec<Reminder>>,
    fail_for: Option<i64>,
}

impl Notifier for RecordingNotifier {
    fn notify(&self, reminder: &Reminder) -> ReminderResult<()> {
        if self.fail_for == Some(reminder.note_id) {
            return Err(ReminderError::Delivery("notification surface busy".to_string()));
        }
        self.shown.borrow_mut().push(reminder.clone());
        Ok(())
    }
}

#[test]
fn due_reminder_fires_once_with_title_and_description() {
    let conn = open_db_in_memory().unwrap();
    let clock = ManualClock::new(T - 20 * MINUTE);
    let service = NoteService::new(
        SqliteNoteRepository::try_new(&conn).unwrap(),
        NotificationScheduler::new(SqliteJobQueue::try_new(&conn).unwrap(), &clock),
        &clock,
    );
    let id = service
        .insert_note(NoteDraft::new("Pay rent", T).with_description("transfer before noon"))
        .unwrap()
        .note
        .id;

    let dispatcher = ReminderDispatcher::new(
        SqliteJobQueue::try_new(&conn).unwrap(),
        RecordingNotifier::default(),
    );
    assert_eq!(dispatcher.next_fire_at().unwrap(), Some(T - 10 * MINUTE));

    let early = dispatcher.dispatch_due(T - 11 * MINUTE).unwrap();
    assert!(early.delivered.is_empty());

    let report = dispatcher.dispatch_due(T - 10 * MINUTE).unwrap();
    assert_eq!(report.delivered, vec![id]);

    let again = dispatcher.dispatch_due(T).unwrap();
    assert!(again.delivered.is_empty());
    assert_eq!(dispatcher.next_fire_at().unwrap(), None);
}

#[test]
fn reminder_carries_channel_and_content() {
    let conn = open_db_in_memory().unwrap();
    let clock = ManualClock::new(T - 20 * MINUTE);
    let service = NoteService::new(
        SqliteNoteRepository::try_new(&conn).unwrap(),
        NotificationScheduler::new(SqliteJobQueue::try_new(&conn).unwrap(), &clock),
        &clock,
    );
    service
        .insert_note(NoteDraft::new("Pay rent", T).with_description("transfer before noon"))
        .unwrap();

    let notifier = RecordingNotifier::default();
    let dispatcher = ReminderDispatcher::new(SqliteJobQueue::try_new(&conn).unwrap(), &notifier);
    dispatcher.dispatch_due(T).unwrap();

    let shown = notifier.shown.borrow();
    assert_eq!(shown.len(), 1);
    assert_eq!(shown[0].channel, NOTES_CHANNEL);
    assert_eq!(shown[0].title, "Pay rent");
    assert_eq!(shown[0].body, "transfer before noon");
}

#[test]
fn failed_delivery_is_reported_and_not_retried() {
    let conn = open_db_in_memory().unwrap();
    let queue = SqliteJobQueue::try_new(&conn).unwrap();
    for (note_id, fire_at) in [(1, T), (2, T + MINUTE)] {
        queue
            .enqueue(&notekeeper_core::ReminderJob {
                note_id,
                fire_at,
                title: String::new(),
                body: String::new(),
                enqueued_at: 0,
            })
            .unwrap();
    }

    let notifier = RecordingNotifier {
        fail_for: Some(1),
        ..RecordingNotifier::default()
    };
    let dispatcher = ReminderDispatcher::new(SqliteJobQueue::try_new(&conn).unwrap(), &notifier);
    let report = dispatcher.dispatch_due(T + MINUTE).unwrap();
    assert_eq!(report.failed, vec![1]);
    assert_eq!(report.delivered, vec![2]);
    assert_eq!(notifier.shown.borrow()[0].title, "Reminder");
    assert!(queue.pending_jobs().unwrap().is_empty());
}

#[test]
fn log_notifier_accepts_every_reminder() {
    let conn = open_db_in_memory().unwrap();
    let queue = SqliteJobQueue::try_new(&conn).unwrap();
    queue
        .enqueue(&notekeeper_core::ReminderJob {
            note_id: 9,
            fire_at: T,
            title: "t".to_string(),
            body: "b".to_string(),
            enqueued_at: 0,
        })
        .unwrap();

    let dispatcher = ReminderDispatcher::new(queue, LogNotifier);
    assert_eq!(dispatcher.dispatch_due(T).unwrap().delivered, vec![9]);
}
