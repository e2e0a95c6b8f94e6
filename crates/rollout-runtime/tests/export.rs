use rollout_runtime::{
    Config, CreateOptions, Error, RolloutRecorder, RolloutStore, export_session, import_session,
};
use rollout_types::{EventMsg, ResponseItem, RolloutItem, RolloutLine, TtlConfig};
use std::io::Cursor as IoCursor;
use tempfile::TempDir;

const SESSION: &str = "22222222-2222-2222-2222-222222222222";

fn store() -> RolloutStore {
    RolloutStore::open_in_memory(Config::default()).unwrap()
}

async fn seeded(store: &RolloutStore) {
    let recorder = RolloutRecorder::create(
        store,
        SESSION,
        CreateOptions {
            instructions: Some("port the build".to_string()),
            cwd: Some("/work/build".into()),
            ..Default::default()
        },
    )
    .await
    .unwrap();
    recorder
        .record_items(&[
            ResponseItem::message("user", "hi").into(),
            EventMsg::agent_message("hello").into(),
        ])
        .await
        .unwrap();
    recorder.shutdown().await.unwrap();
}

async fn export_to_string(store: &RolloutStore, id: &str) -> String {
    let mut out = Vec::new();
    export_session(store, id, &mut out).await.unwrap();
    String::from_utf8(out).unwrap()
}

#[tokio::test]
async fn test_export_writes_one_line_per_item() {
    let store = store();
    seeded(&store).await;

    let text = export_to_string(&store, SESSION).await;
    let lines: Vec<&str> = text.lines().collect();
    assert_eq!(lines.len(), 3);

    let header: RolloutLine = serde_json::from_str(lines[0]).unwrap();
    assert!(matches!(header.item, RolloutItem::SessionMeta(_)));

    let message: RolloutLine = serde_json::from_str(lines[1]).unwrap();
    insta::assert_json_snapshot!(message, { ".timestamp" => "[timestamp]" }, @r#"
    {
      "timestamp": "[timestamp]",
      "type": "response-item",
      "payload": {
        "type": "message",
        "role": "user",
        "content": "hi"
      }
    }
    "#);
}

#[tokio::test]
async fn test_export_unknown_session_is_not_found() {
    let store = store();
    let mut out = Vec::new();
    let err = export_session(&store, SESSION, &mut out).await.unwrap_err();
    assert!(matches!(err, Error::NotFound(_)));
    assert!(out.is_empty());
}

#[tokio::test]
async fn test_import_restores_exported_session() {
    let source = store();
    seeded(&source).await;
    let text = export_to_string(&source, SESSION).await;

    let target = store();
    let id = import_session(&target, IoCursor::new(text.as_bytes()), None)
        .await
        .unwrap();
    assert_eq!(id.to_string(), SESSION);

    let original = RolloutRecorder::get_history(&source, SESSION).await.unwrap();
    let restored = RolloutRecorder::get_history(&target, SESSION).await.unwrap();
    assert_eq!(original.items(), restored.items());

    // Same id twice is refused
    let again = import_session(&target, IoCursor::new(text.as_bytes()), None).await;
    assert!(matches!(again, Err(Error::AlreadyExists(_))));
}

#[tokio::test]
async fn test_import_applies_ttl_override() {
    let source = store();
    seeded(&source).await;
    let text = export_to_string(&source, SESSION).await;

    let target = store();
    import_session(
        &target,
        IoCursor::new(text.as_bytes()),
        Some(TtlConfig::Days(1)),
    )
    .await
    .unwrap();

    let later = chrono::Utc::now() + chrono::Duration::days(2);
    let report = target.cleanup_expired_at(later).await.unwrap();
    assert_eq!(report.deleted, 1);
}

#[tokio::test]
async fn test_import_rejects_malformed_input() {
    let target = store();

    let headless = r#"{"timestamp":"2025-05-07T17:24:21.000Z","type":"event","payload":{"type":"agent_message","message":"x"}}"#;
    let err = import_session(&target, IoCursor::new(headless.as_bytes()), None)
        .await
        .unwrap_err();
    match err {
        Error::CorruptRecord {
            sequence, reason, ..
        } => {
            assert_eq!(sequence, None);
            assert!(reason.starts_with("line 1:"), "{reason}");
            assert!(reason.contains("session-meta"), "{reason}");
        }
        other => panic!("expected CorruptRecord, got {other:?}"),
    }

    let err = import_session(&target, IoCursor::new("\n{broken".as_bytes()), None)
        .await
        .unwrap_err();
    assert!(
        matches!(&err, Error::CorruptRecord { reason, .. } if reason.starts_with("line 2:")),
        "{err:?}"
    );

    let err = import_session(&target, IoCursor::new("\n\n".as_bytes()), None)
        .await
        .unwrap_err();
    assert!(matches!(err, Error::CorruptRecord { sequence: None, .. }));

    let page = RolloutRecorder::list_conversations(&target, 10, None)
        .await
        .unwrap();
    assert!(page.items.is_empty());
    assert_eq!(page.num_scanned, 0);
}

#[tokio::test]
async fn test_failed_import_leaves_nothing_behind() {
    let source = store();
    seeded(&source).await;
    let text = export_to_string(&source, SESSION).await;

    let dir = TempDir::new().unwrap();
    let target = RolloutStore::open(dir.path()).unwrap();

    // Let the session-meta header through and fail every later item
    let sabotage = rusqlite::Connection::open(dir.path().join("rollout.db")).unwrap();
    sabotage
        .execute_batch(
            "CREATE TRIGGER fail_items BEFORE INSERT ON items WHEN NEW.seq > 0
             BEGIN SELECT RAISE(ABORT, 'disk full'); END;",
        )
        .unwrap();

    let err = import_session(&target, IoCursor::new(text.as_bytes()), None)
        .await
        .unwrap_err();
    assert!(matches!(err, Error::WriteFailed { .. }));
    assert!(err.is_retryable());

    let history = RolloutRecorder::get_history(&target, SESSION).await.unwrap();
    assert!(history.is_new());

    sabotage.execute_batch("DROP TRIGGER fail_items;").unwrap();

    import_session(&target, IoCursor::new(text.as_bytes()), None)
        .await
        .unwrap();
    let original = RolloutRecorder::get_history(&source, SESSION).await.unwrap();
    let restored = RolloutRecorder::get_history(&target, SESSION).await.unwrap();
    assert_eq!(original.items(), restored.items());
}
