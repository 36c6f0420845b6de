use jsonpad::session::DocumentSession;
use jsonpad::settings::{Settings, SettingsEntry};
use jsonpad::store::FileStore;
use serde_json::json;
use std::thread::sleep;
use std::time::Duration;
use tempfile::tempdir;

#[test]
fn test_save_new_file_takes_no_backup() {
    let dir = tempdir().unwrap();
    let store = FileStore::open(dir.path()).unwrap();
    let receipt = store.save("notes.json", "{\"a\": 1}").unwrap();
    assert_eq!(receipt.filename, "notes.json");
    assert!(receipt.backup.is_none());
    assert_eq!(store.load_raw("notes.json").unwrap(), "{\"a\": 1}");
}

#[test]
fn test_overwrite_snapshots_previous_content() {
    let dir = tempdir().unwrap();
    let store = FileStore::open(dir.path()).unwrap();
    store.save("notes.json", "old").unwrap();
    let receipt = store.save("notes.json", "new").unwrap();

    let backup_name = receipt.backup.unwrap();
    assert!(backup_name.starts_with("notes_"));
    assert!(backup_name.ends_with(".json"));
    let backup_path = dir.path().join("backup").join(&backup_name);
    assert_eq!(std::fs::read_to_string(backup_path).unwrap(), "old");
    assert_eq!(store.load_raw("notes.json").unwrap(), "new");
}

#[test]
fn test_list_backups_newest_first() {
    let dir = tempdir().unwrap();
    let store = FileStore::open(dir.path()).unwrap();
    store.save("notes.json", "v1").unwrap();
    sleep(Duration::from_millis(5));
    store.save("notes.json", "v2").unwrap();
    sleep(Duration::from_millis(5));
    store.save("notes.json", "v3").unwrap();

    let backups = store.list_backups("notes.json").unwrap();
    assert_eq!(backups.len(), 2);
    // Newest first: the v2 snapshot precedes the v1 snapshot.
    assert!(backups[0].name > backups[1].name);
    let newest = dir.path().join("backup").join(&backups[0].name);
    assert_eq!(std::fs::read_to_string(newest).unwrap(), "v2");
}

#[test]
fn test_restore_writes_pre_restore_snapshot() {
    let dir = tempdir().unwrap();
    let store = FileStore::open(dir.path()).unwrap();
    store.save("notes.json", "original").unwrap();
    sleep(Duration::from_millis(5));
    store.save("notes.json", "edited").unwrap();

    let backups = store.list_backups("notes.json").unwrap();
    let receipt = store.restore("notes.json", &backups[0].name).unwrap();

    assert_eq!(store.load_raw("notes.json").unwrap(), "original");
    let pre_restore = receipt.backup.unwrap();
    assert!(pre_restore.starts_with("notes_pre-restore_"));
    let pre_restore_path = dir.path().join("backup").join(&pre_restore);
    assert_eq!(std::fs::read_to_string(pre_restore_path).unwrap(), "edited");
}

#[test]
fn test_restore_unknown_backup_fails_and_changes_nothing() {
    let dir = tempdir().unwrap();
    let store = FileStore::open(dir.path()).unwrap();
    store.save("notes.json", "content").unwrap();
    assert!(store.restore("notes.json", "notes_nope.json").is_err());
    assert_eq!(store.load_raw("notes.json").unwrap(), "content");
}

#[test]
fn test_list_files_skips_settings_and_merges_metadata() {
    let dir = tempdir().unwrap();
    let store = FileStore::open(dir.path()).unwrap();
    store.save("b.json", "{}").unwrap();
    store.save("a.json", "{}").unwrap();
    std::fs::write(dir.path().join("ignore.txt"), "x").unwrap();

    let mut settings = Settings::default();
    settings.set_entry(SettingsEntry {
        filename: "a.json".to_string(),
        title: Some("Alpha".to_string()),
        url: Some("https://example.com".to_string()),
    });
    store.save_settings(&settings).unwrap();

    let files = store.list_files().unwrap();
    let names: Vec<&str> = files.iter().map(|f| f.name.as_str()).collect();
    assert_eq!(names, ["a.json", "b.json"]);
    assert_eq!(files[0].title.as_deref(), Some("Alpha"));
    assert_eq!(files[0].url.as_deref(), Some("https://example.com"));
    assert!(files[1].title.is_none());
}

#[test]
fn test_settings_round_trip() {
    let dir = tempdir().unwrap();
    let store = FileStore::open(dir.path()).unwrap();
    assert_eq!(store.settings().unwrap(), Settings::default());

    let mut settings = Settings::default();
    settings.set_entry(SettingsEntry {
        filename: "doc.json".to_string(),
        title: Some("Doc".to_string()),
        url: None,
    });
    store.save_settings(&settings).unwrap();
    assert_eq!(store.settings().unwrap(), settings);
}

#[test]
fn test_load_parses_document() {
    let dir = tempdir().unwrap();
    let store = FileStore::open(dir.path()).unwrap();
    store.save("doc.json", "{\"a\": [1, 2]}").unwrap();
    let doc = store.load("doc.json").unwrap();
    assert_eq!(doc.filename, "doc.json");
    assert_eq!(doc.value, json!({"a": [1, 2]}));
}

#[test]
fn test_load_rejects_corrupt_document() {
    let dir = tempdir().unwrap();
    let store = FileStore::open(dir.path()).unwrap();
    store.save("doc.json", "{broken").unwrap();
    assert!(store.load("doc.json").is_err());
}

#[test]
fn test_filenames_are_reduced_to_their_last_component() {
    let dir = tempdir().unwrap();
    let store = FileStore::open(dir.path()).unwrap();
    store.save("../escape.json", "{}").unwrap();
    // The write landed inside the data dir, not above it.
    assert!(dir.path().join("escape.json").exists());
    assert!(store.load_raw("escape.json").is_ok());
}

#[test]
fn test_backup_pruning_keeps_newest() {
    let dir = tempdir().unwrap();
    let store = FileStore::open(dir.path()).unwrap().with_keep_backups(Some(2));
    store.save("doc.json", "v1").unwrap();
    for content in ["v2", "v3", "v4", "v5"] {
        sleep(Duration::from_millis(5));
        store.save("doc.json", content).unwrap();
    }
    let backups = store.list_backups("doc.json").unwrap();
    assert_eq!(backups.len(), 2);
    let newest = dir.path().join("backup").join(&backups[0].name);
    assert_eq!(std::fs::read_to_string(newest).unwrap(), "v4");
}

#[test]
fn test_sibling_stem_backups_do_not_collide() {
    // "a_b.json" extends the stem of "a.json"; each document must see
    // only its own snapshots.
    let dir = tempdir().unwrap();
    let store = FileStore::open(dir.path()).unwrap();
    store.save("a.json", "a v1").unwrap();
    store.save("a_b.json", "ab v1").unwrap();
    sleep(Duration::from_millis(5));
    store.save("a.json", "a v2").unwrap();
    store.save("a_b.json", "ab v2").unwrap();

    let a_backups = store.list_backups("a.json").unwrap();
    assert_eq!(a_backups.len(), 1);
    assert!(
        !a_backups[0].name.starts_with("a_b_"),
        "a.json lists sibling backup: {}",
        a_backups[0].name
    );
    let a_path = dir.path().join("backup").join(&a_backups[0].name);
    assert_eq!(std::fs::read_to_string(a_path).unwrap(), "a v1");

    let ab_backups = store.list_backups("a_b.json").unwrap();
    assert_eq!(ab_backups.len(), 1);
    assert!(ab_backups[0].name.starts_with("a_b_"));
}

#[test]
fn test_prune_spares_sibling_backups() {
    let dir = tempdir().unwrap();
    let store = FileStore::open(dir.path()).unwrap().with_keep_backups(Some(1));
    store.save("a_b.json", "ab v1").unwrap();
    sleep(Duration::from_millis(5));
    store.save("a_b.json", "ab v2").unwrap();
    sleep(Duration::from_millis(5));
    store.save("a.json", "a v1").unwrap();
    sleep(Duration::from_millis(5));
    store.save("a.json", "a v2").unwrap();

    // Pruning after the "a.json" save must not count or delete the
    // sibling's snapshot, and must keep a.json's own.
    let a_backups = store.list_backups("a.json").unwrap();
    assert_eq!(a_backups.len(), 1);
    let a_path = dir.path().join("backup").join(&a_backups[0].name);
    assert_eq!(std::fs::read_to_string(a_path).unwrap(), "a v1");
    assert_eq!(store.list_backups("a_b.json").unwrap().len(), 1);
}

#[test]
fn test_pre_restore_snapshots_are_listed_as_backups() {
    let dir = tempdir().unwrap();
    let store = FileStore::open(dir.path()).unwrap();
    store.save("doc.json", "v1").unwrap();
    sleep(Duration::from_millis(5));
    store.save("doc.json", "v2").unwrap();

    let backups = store.list_backups("doc.json").unwrap();
    store.restore("doc.json", &backups[0].name).unwrap();

    let after = store.list_backups("doc.json").unwrap();
    assert_eq!(after.len(), 2);
    assert!(
        after
            .iter()
            .any(|b| b.name.starts_with("doc_pre-restore_"))
    );
}

#[test]
fn test_save_leaves_no_scratch_files() {
    let dir = tempdir().unwrap();
    let store = FileStore::open(dir.path()).unwrap();
    store.save("doc.json", "v1").unwrap();
    store.save("doc.json", "v2").unwrap();
    store.save_settings(&Settings::default()).unwrap();

    assert_eq!(store.load_raw("doc.json").unwrap(), "v2");
    for entry in std::fs::read_dir(dir.path()).unwrap() {
        let name = entry.unwrap().file_name().to_string_lossy().to_string();
        assert!(!name.ends_with(".tmp"), "scratch file left behind: {}", name);
    }
    // Scratch files never surface as documents either.
    let names: Vec<String> = store
        .list_files()
        .unwrap()
        .into_iter()
        .map(|f| f.name)
        .collect();
    assert_eq!(names, ["doc.json"]);
}

#[test]
fn test_save_pipeline_end_to_end() {
    // Full flow: load, mark, prepare, persist, commit. The saved file
    // has the marked node gone and named arrays sorted; the backup
    // still holds the pre-save content.
    let dir = tempdir().unwrap();
    let store = FileStore::open(dir.path()).unwrap();
    let original = "{\"junk\": true, \"items\": [{\"Name\": \"b\"}, {\"Name\": \"a\"}]}";
    store.save("doc.json", original).unwrap();

    let doc = store.load("doc.json").unwrap();
    let mut session = DocumentSession::open(&doc.filename, &doc.raw, doc.value);
    session.toggle_mark_rendered("junk");
    sleep(Duration::from_millis(5));

    let plan = session.prepare_save().unwrap();
    let receipt = store.save(session.filename(), &plan.text).unwrap();
    session.commit_saved(plan);

    let saved = store.load("doc.json").unwrap();
    assert_eq!(
        saved.value,
        json!({"items": [{"Name": "a"}, {"Name": "b"}]})
    );
    let backup_path = dir.path().join("backup").join(receipt.backup.unwrap());
    assert_eq!(std::fs::read_to_string(backup_path).unwrap(), original);
}

#[test]
fn test_aborted_save_leaves_no_backup() {
    let dir = tempdir().unwrap();
    let store = FileStore::open(dir.path()).unwrap();
    store.save("doc.json", "{\"a\": 1}").unwrap();

    let doc = store.load("doc.json").unwrap();
    let mut session = DocumentSession::open(&doc.filename, &doc.raw, doc.value);
    session.edit_raw("{invalid");

    let report = session.prepare_save().unwrap_err();
    assert_eq!(report.line, 1);
    // Save never reached the store: no backup, file untouched.
    assert!(store.list_backups("doc.json").unwrap().is_empty());
    assert_eq!(store.load_raw("doc.json").unwrap(), "{\"a\": 1}");
    assert!(session.is_dirty());
}
