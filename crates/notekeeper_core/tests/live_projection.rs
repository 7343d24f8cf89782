use notekeeper_core::db::open_db_in_memory;
use notekeeper_core::{
    ChangeFeed, ManualClock, NoteChange, NoteDraft, NoteProjection, NoteService,
    NotificationScheduler, Priority, SqliteJobQueue, SqliteNoteRepository,
};

const T: i64 = 1_800_000_000_000;

#[test]
fn projection_tracks_inserts_completions_and_deletes() {
    let conn = open_db_in_memory().unwrap();
    let clock = ManualClock::new(T - 3_600_000);
    let service = NoteService::new(
        SqliteNoteRepository::try_new(&conn).unwrap(),
        NotificationScheduler::new(SqliteJobQueue::try_new(&conn).unwrap(), &clock),
        &clock,
    );

    let mut active = service.observe(NoteProjection::Active);
    let mut completed = service.observe(NoteProjection::Completed);
    assert!(!service.refresh(&mut active).unwrap());
    assert!(active.snapshot().is_empty());

    let low = service.insert_note(NoteDraft::new("low", T)).unwrap().note.id;
    let high = service
        .insert_note(NoteDraft::new("high", T).with_priority(Priority::High))
        .unwrap()
        .note
        .id;
    assert!(service.refresh(&mut active).unwrap());
    let order: Vec<_> = active.snapshot().iter().map(|note| note.id).collect();
    assert_eq!(order, vec![high, low]);

    service.set_completed(low, true).unwrap();
    assert!(service.refresh(&mut active).unwrap());
    assert!(service.refresh(&mut completed).unwrap());
    assert_eq!(active.snapshot().len(), 1);
    assert_eq!(completed.snapshot()[0].id, low);

    service.delete_note(low).unwrap();
    assert!(service.refresh(&mut completed).unwrap());
    assert!(completed.snapshot().is_empty());
}

#[test]
fn refresh_without_changes_does_not_requery() {
    let conn = open_db_in_memory().unwrap();
    let clock = ManualClock::new(T);
    let service = NoteService::new(
        SqliteNoteRepository::try_new(&conn).unwrap(),
        NotificationScheduler::new(SqliteJobQueue::try_new(&conn).unwrap(), &clock),
        &clock,
    );
    service.insert_note(NoteDraft::new("one", T)).unwrap();

    let mut all = service.observe(NoteProjection::All);
    assert!(all.is_stale());
    assert!(service.refresh(&mut all).unwrap());
    assert!(!all.is_stale());

    // Writes behind the service's back are not observed until the next change.
    conn.execute("DELETE FROM notes;", []).unwrap();
    assert!(!service.refresh(&mut all).unwrap());
    assert_eq!(all.snapshot().len(), 1);
}

#[test]
fn change_feed_prunes_dropped_subscribers() {
    let feed = ChangeFeed::new();
    let kept = feed.subscribe();
    let dropped = feed.subscribe();
    drop(dropped);
    assert_eq!(feed.subscriber_count(), 2);

    feed.publish(NoteChange::Inserted(1));
    assert_eq!(feed.subscriber_count(), 1);
    assert_eq!(kept.try_recv().unwrap().note_id(), 1);
}
