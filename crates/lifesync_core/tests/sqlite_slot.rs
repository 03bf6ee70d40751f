use chrono::NaiveDate;
use lifesync_core::{
    LifeService, LoadSource, ManualClock, NoteDraft, PersistenceGateway, SequentialIds,
    SqliteSlot, StorageSlot, TaskDraft, DEFAULT_STORAGE_KEY,
};
use std::path::Path;

fn open_service(path: &Path) -> LifeService<SqliteSlot> {
    LifeService::open_with(
        PersistenceGateway::with_default_key(SqliteSlot::open(path).unwrap()),
        Box::new(SequentialIds::new("id")),
        Box::new(ManualClock::at_millis(1_704_700_800_000)),
    )
}

#[test]
fn state_survives_reopen() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("lifesync.db");

    let mut service = open_service(&path);
    let date = NaiveDate::from_ymd_opt(2024, 1, 8).unwrap();
    service.add_task(TaskDraft::new("Renew passport", date));
    service.add_note(NoteDraft::new("Packing list", "socks"));
    let expected = service.state().clone();
    drop(service);

    let reopened = open_service(&path);
    assert_eq!(reopened.last_load().source, LoadSource::Stored);
    assert_eq!(reopened.state(), &expected);
}

#[test]
fn write_replaces_previous_value_and_remove_clears_it() {
    let mut slot = SqliteSlot::open_in_memory().unwrap();
    slot.write("k", "first").unwrap();
    slot.write("k", "second").unwrap();
    assert_eq!(slot.read("k").unwrap().as_deref(), Some("second"));

    let rows: i64 = slot
        .connection()
        .query_row("SELECT COUNT(*) FROM storage_slots;", [], |row| row.get(0))
        .unwrap();
    assert_eq!(rows, 1);

    slot.remove("k").unwrap();
    assert_eq!(slot.read("k").unwrap(), None);
}

#[test]
fn unparseable_document_is_backed_up_before_reset() {
    let mut slot = SqliteSlot::open_in_memory().unwrap();
    slot.write(DEFAULT_STORAGE_KEY, "{oops").unwrap();
    let mut gateway = PersistenceGateway::with_default_key(slot);

    let outcome = gateway.load(&SequentialIds::new("id"));
    assert!(matches!(outcome.source, LoadSource::Corrupted(_)));
    assert!(outcome.state.is_empty());

    let slot = gateway.slot();
    assert_eq!(slot.backup_count(DEFAULT_STORAGE_KEY).unwrap(), 1);
    assert_eq!(
        slot.latest_backup(DEFAULT_STORAGE_KEY).unwrap(),
        Some(("{oops".to_string(), "unparseable".to_string()))
    );
}

#[test]
fn backups_are_capped_per_key() {
    let mut slot = SqliteSlot::open_in_memory().unwrap();
    for index in 0..8 {
        slot.quarantine("k", &format!("doc-{index}"), "test").unwrap();
    }
    slot.quarantine("other", "x", "test").unwrap();

    assert_eq!(slot.backup_count("k").unwrap(), 5);
    assert_eq!(slot.backup_count("other").unwrap(), 1);
    assert_eq!(
        slot.latest_backup("k").unwrap(),
        Some(("doc-7".to_string(), "test".to_string()))
    );
}
