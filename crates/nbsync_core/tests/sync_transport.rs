use nbsync_core::db::{open_db, open_db_in_memory};
use nbsync_core::{
    decode_envelope, DecodeError, IncomingNotebook, SeedMode, SeedNotebook, StoreLocation,
    SyncError, SyncService, DEFAULT_TEMPLATE,
};
use rusqlite::Connection;
use std::sync::Arc;
use std::thread;

fn store_with(rows: &[(&str, &str)]) -> SyncService {
    let service = SyncService::open_in_memory().unwrap();
    let batch: Vec<IncomingNotebook> = rows
        .iter()
        .map(|(name, code)| IncomingNotebook::from_code(*name, *code))
        .collect();
    service.merge_incoming(&batch).unwrap();
    service
}

fn names(service: &SyncService) -> Vec<String> {
    service
        .list()
        .unwrap()
        .into_iter()
        .map(|notebook| notebook.name)
        .collect()
}

#[test]
fn empty_store_round_trip_is_a_no_op() {
    let source = SyncService::open_in_memory().unwrap();
    let target = SyncService::open_in_memory().unwrap();

    let snapshot = source.download_snapshot().unwrap();
    assert_eq!(snapshot.notebook_count, 0);

    let summary = target.upload_snapshot(&snapshot.bytes).unwrap();
    assert_eq!(summary.notebook_count, 0);
    assert_eq!(summary.inserted, 0);
    assert!(summary.warnings.is_empty());
}

#[test]
fn uploading_own_snapshot_changes_nothing() {
    let service = store_with(&[("a", "one"), ("b", "two")]);

    let snapshot = service.download_snapshot().unwrap();
    let summary = service.upload_snapshot(&snapshot.bytes).unwrap();

    assert_eq!(summary.inserted, 0);
    assert_eq!(summary.unchanged, 2);
    assert!(summary.warnings.is_empty());
    assert_eq!(summary.notebook_count, 2);
}

#[test]
fn envelope_upload_merges_with_rename_warnings() {
    let server = store_with(&[("a", "codeA")]);
    let client = store_with(&[("a", "codeA2"), ("b", "codeB")]);

    let envelope = client.download_snapshot().unwrap().to_envelope();
    let summary = server.upload_envelope(&envelope).unwrap();

    assert_eq!(summary.notebook_count, 3);
    assert_eq!(summary.inserted, 2);
    assert_eq!(summary.warnings, vec!["Renamed 'a' to 'a_1'".to_string()]);
    assert_eq!(names(&server), vec!["a", "a_1", "b"]);
    assert_eq!(server.get("a").unwrap().unwrap().code, "codeA");
}

fn triples(service: &SyncService) -> Vec<(String, String, String)> {
    let mut rows: Vec<(String, String, String)> = service
        .list()
        .unwrap()
        .into_iter()
        .map(|notebook| (notebook.name, notebook.hash, notebook.code))
        .collect();
    rows.sort();
    rows
}

#[test]
fn round_trip_preserves_every_triple() {
    let server = store_with(&[("a", "one"), ("b", "two"), ("c", "three")]);
    server
        .merge_incoming(&[IncomingNotebook::new("legacy", "not-a-sha256", "old body")])
        .unwrap();
    let snapshot = server.download_snapshot().unwrap();
    assert_eq!(snapshot.notebook_count, 4);

    let bytes = decode_envelope(&snapshot.to_envelope()).unwrap();
    let client = SyncService::open_in_memory().unwrap();
    let summary = client.upload_snapshot(&bytes).unwrap();

    assert_eq!(summary.notebook_count, 4);
    assert_eq!(names(&client), vec!["a", "b", "c", "legacy"]);
    assert_eq!(triples(&client), triples(&server));
    assert_eq!(client.get("legacy").unwrap().unwrap().hash, "not-a-sha256");
}

#[test]
fn line_wrapped_envelope_is_accepted() {
    let server = SyncService::open_in_memory().unwrap();
    let client = store_with(&[("wrapped", "body")]);
    let envelope = client.download_snapshot().unwrap().to_envelope();
    let wrapped = envelope
        .as_bytes()
        .chunks(76)
        .map(|line| std::str::from_utf8(line).unwrap())
        .collect::<Vec<_>>()
        .join("\n");

    let summary = server.upload_envelope(&wrapped).unwrap();

    assert_eq!(summary.inserted, 1);
    assert_eq!(names(&server), vec!["wrapped"]);
}

#[test]
fn garbage_snapshot_leaves_target_untouched() {
    let server = store_with(&[("a", "one")]);

    let err = server.upload_snapshot(b"this is not a database").unwrap_err();

    assert!(matches!(err, SyncError::Decode(DecodeError::NotAStore(_))));
    assert_eq!(err.code(), "decode_error");
    assert_eq!(names(&server), vec!["a"]);
}

#[test]
fn snapshot_without_notebooks_table_is_rejected() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("other.sqlite3");
    {
        let conn = Connection::open(&path).unwrap();
        conn.execute_batch("CREATE TABLE something_else (id INTEGER PRIMARY KEY);")
            .unwrap();
    }
    let bytes = std::fs::read(&path).unwrap();
    let server = store_with(&[("a", "one")]);

    let err = server.upload_snapshot(&bytes).unwrap_err();

    assert!(matches!(err, SyncError::Decode(_)));
    assert_eq!(server.count().unwrap(), 1);
}

#[test]
fn invalid_envelope_is_a_decode_error() {
    let server = SyncService::open_in_memory().unwrap();
    let err = server.upload_envelope("%%% not base64 %%%").unwrap_err();
    assert!(matches!(err, SyncError::Decode(DecodeError::Envelope(_))));
    assert_eq!(server.count().unwrap(), 0);
}

#[test]
fn unversioned_snapshot_is_accepted() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("populated.db");
    {
        let conn = Connection::open(&path).unwrap();
        conn.execute_batch(
            "CREATE TABLE notebooks (
                name TEXT PRIMARY KEY,
                hash TEXT NOT NULL,
                code TEXT NOT NULL,
                created_at TIMESTAMP DEFAULT CURRENT_TIMESTAMP,
                updated_at TIMESTAMP DEFAULT CURRENT_TIMESTAMP
            );
            INSERT INTO notebooks (name, hash, code) VALUES ('legacy', 'h', 'body');",
        )
        .unwrap();
    }
    let bytes = std::fs::read(&path).unwrap();
    let server = SyncService::open_in_memory().unwrap();

    let summary = server.upload_snapshot(&bytes).unwrap();

    assert_eq!(summary.inserted, 1);
    let stored = server.get("legacy").unwrap().unwrap();
    assert_eq!(stored.hash, "h");
    assert_eq!(stored.code, "body");
}

#[test]
fn failed_insert_rolls_back_whole_batch() {
    let conn = open_db_in_memory().unwrap();
    conn.execute_batch(
        "CREATE TRIGGER reject_poison BEFORE INSERT ON notebooks
         WHEN NEW.name = 'poison'
         BEGIN
             SELECT RAISE(ABORT, 'disk on fire');
         END;",
    )
    .unwrap();
    let server = SyncService::from_connection(conn, StoreLocation::Memory).unwrap();
    server
        .merge_incoming(&[IncomingNotebook::from_code("kept", "k")])
        .unwrap();
    let client = store_with(&[("fresh", "f"), ("poison", "p")]);

    let snapshot = client.download_snapshot().unwrap();
    let err = server.upload_snapshot(&snapshot.bytes).unwrap_err();

    assert!(matches!(err, SyncError::StoreUnavailable(_)));
    assert_eq!(names(&server), vec!["kept"]);
}

#[test]
fn template_code_falls_back_to_default() {
    let service = SyncService::open_in_memory().unwrap();
    assert_eq!(service.template_code().unwrap(), DEFAULT_TEMPLATE);

    service
        .seed(
            &[SeedNotebook::new("template", "custom template")],
            SeedMode::Always,
        )
        .unwrap();
    assert_eq!(service.template_code().unwrap(), "custom template");
}

#[test]
fn file_store_persists_across_reopen() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("nested").join("notebooks.db");

    {
        let service = SyncService::open(&path).unwrap();
        assert_eq!(service.location(), &StoreLocation::File(path.clone()));
        service
            .merge_incoming(&[IncomingNotebook::from_code("saved", "body")])
            .unwrap();
    }

    let reopened = SyncService::open(&path).unwrap();
    assert_eq!(names(&reopened), vec!["saved"]);

    let raw = open_db(&path).unwrap();
    let count: i64 = raw
        .query_row("SELECT COUNT(*) FROM notebooks;", [], |row| row.get(0))
        .unwrap();
    assert_eq!(count, 1);
}

#[test]
fn concurrent_uploads_never_lose_a_notebook() {
    let server = Arc::new(SyncService::open_in_memory().unwrap());
    let first = store_with(&[("shared", "from first")])
        .download_snapshot()
        .unwrap();
    let second = store_with(&[("shared", "from second")])
        .download_snapshot()
        .unwrap();

    let handles: Vec<_> = [first, second]
        .into_iter()
        .map(|snapshot| {
            let server = Arc::clone(&server);
            thread::spawn(move || server.upload_snapshot(&snapshot.bytes).unwrap())
        })
        .collect();
    let warnings: Vec<String> = handles
        .into_iter()
        .flat_map(|handle| handle.join().unwrap().warnings)
        .collect();

    assert_eq!(warnings, vec!["Renamed 'shared' to 'shared_1'".to_string()]);
    assert_eq!(names(&server), vec!["shared", "shared_1"]);
    let mut codes: Vec<String> = server
        .list()
        .unwrap()
        .into_iter()
        .map(|notebook| notebook.code)
        .collect();
    codes.sort();
    assert_eq!(codes, vec!["from first", "from second"]);
}
