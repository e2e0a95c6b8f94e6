use rollout_runtime::{
    Config, CreateOptions, Error, InitialHistory, RolloutRecorder, RolloutStore,
};
use rollout_types::{EventMsg, ItemKind, ResponseItem, RolloutItem, SessionId, TtlConfig};
use tempfile::TempDir;

const SESSION: &str = "11111111-1111-1111-1111-111111111111";

fn memory_store() -> RolloutStore {
    RolloutStore::open_in_memory(Config::default()).unwrap()
}

fn file_store() -> (TempDir, RolloutStore) {
    let dir = TempDir::new().unwrap();
    let store = RolloutStore::open(dir.path()).unwrap();
    (dir, store)
}

fn options(instructions: &str) -> CreateOptions {
    CreateOptions {
        instructions: Some(instructions.to_string()),
        cwd: Some("/work/repo".into()),
        ..Default::default()
    }
}

fn sequences(history: &InitialHistory) -> Vec<u64> {
    match history {
        InitialHistory::New => Vec::new(),
        InitialHistory::Resumed(resumed) => resumed.history.iter().map(|r| r.sequence).collect(),
    }
}

#[tokio::test]
async fn test_create_record_and_resume() {
    let store = memory_store();

    let recorder = RolloutRecorder::create(&store, SESSION, options("debug task"))
        .await
        .unwrap();
    recorder
        .record_items(&[ResponseItem::message("user", "hi").into()])
        .await
        .unwrap();
    recorder.shutdown().await.unwrap();

    let history = RolloutRecorder::get_history(&store, SESSION).await.unwrap();
    assert!(!history.is_new());
    assert_eq!(sequences(&history), vec![0, 1]);

    let items = history.items();
    match items[0] {
        RolloutItem::SessionMeta(meta) => {
            assert_eq!(meta.meta.id.to_string(), SESSION);
            assert_eq!(meta.meta.instructions.as_deref(), Some("debug task"));
        }
        other => panic!("expected session-meta header, got {:?}", other.kind()),
    }
    assert_eq!(*items[1], ResponseItem::message("user", "hi").into());

    let resumed = RolloutRecorder::resume(&store, SESSION).await.unwrap();
    resumed
        .record_items(&[EventMsg::agent_message("welcome back").into()])
        .await
        .unwrap();
    resumed.shutdown().await.unwrap();

    let history = RolloutRecorder::get_history(&store, SESSION).await.unwrap();
    assert_eq!(sequences(&history), vec![0, 1, 2]);
}

#[tokio::test]
async fn test_history_of_unknown_session_is_new() {
    let store = memory_store();
    let history = RolloutRecorder::get_history(&store, &SessionId::new().to_string())
        .await
        .unwrap();
    assert_eq!(history, InitialHistory::New);
}

#[tokio::test]
async fn test_invalid_id_is_rejected_everywhere() {
    let store = memory_store();

    assert!(matches!(
        RolloutRecorder::create(&store, "not-a-uuid", CreateOptions::default()).await,
        Err(Error::InvalidId(_))
    ));
    assert!(matches!(
        RolloutRecorder::resume(&store, "not-a-uuid").await,
        Err(Error::InvalidId(_))
    ));
    assert!(matches!(
        RolloutRecorder::get_history(&store, "").await,
        Err(Error::InvalidId(_))
    ));
}

#[tokio::test]
async fn test_duplicate_create_fails() {
    let store = memory_store();
    let first = RolloutRecorder::create(&store, SESSION, CreateOptions::default())
        .await
        .unwrap();
    first.shutdown().await.unwrap();

    let second = RolloutRecorder::create(&store, SESSION, CreateOptions::default()).await;
    assert!(matches!(second, Err(Error::AlreadyExists(_))));
}

#[tokio::test]
async fn test_resume_missing_session_is_not_found() {
    let store = memory_store();
    let err = RolloutRecorder::resume(&store, SESSION).await.err().unwrap();
    assert!(matches!(err, Error::NotFound(_)));

    // The failed resume must not leave a claim behind
    let recorder = RolloutRecorder::create(&store, SESSION, CreateOptions::default())
        .await
        .unwrap();
    recorder.shutdown().await.unwrap();
}

#[tokio::test]
async fn test_second_writer_is_busy() {
    let store = memory_store();
    let recorder = RolloutRecorder::create(&store, SESSION, CreateOptions::default())
        .await
        .unwrap();

    let busy = RolloutRecorder::resume(&store, SESSION).await;
    assert!(matches!(busy, Err(Error::SessionBusy(_))));
    assert!(matches!(
        RolloutRecorder::delete_session(&store, SESSION).await,
        Err(Error::SessionBusy(_))
    ));

    recorder.shutdown().await.unwrap();
    let resumed = RolloutRecorder::resume(&store, SESSION).await.unwrap();
    resumed.shutdown().await.unwrap();
}

#[tokio::test]
async fn test_shutdown_is_idempotent_and_final() {
    let store = memory_store();
    let recorder = RolloutRecorder::create(&store, SESSION, CreateOptions::default())
        .await
        .unwrap();

    recorder.flush().await.unwrap();
    recorder.shutdown().await.unwrap();
    recorder.shutdown().await.unwrap();

    let err = recorder
        .record_items(&[EventMsg::user_message("too late").into()])
        .await
        .unwrap_err();
    assert!(matches!(err, Error::NotInitialized(_)));
    assert!(matches!(recorder.flush().await, Err(Error::NotInitialized(_))));
}

#[tokio::test]
async fn test_ephemeral_items_are_not_written() {
    let store = memory_store();
    let recorder = RolloutRecorder::create(&store, SESSION, CreateOptions::default())
        .await
        .unwrap();

    let pending = recorder
        .enqueue_items(&[
            RolloutItem::Event(EventMsg::AgentMessageDelta {
                delta: "par".to_string(),
            }),
            RolloutItem::ResponseItem(ResponseItem::Other),
        ])
        .await
        .unwrap();
    assert!(pending.is_none());

    recorder
        .record_items(&[
            RolloutItem::Event(EventMsg::TaskStarted {
                model_context_window: None,
            }),
            EventMsg::agent_message("kept").into(),
        ])
        .await
        .unwrap();
    recorder.shutdown().await.unwrap();

    let history = RolloutRecorder::get_history(&store, SESSION).await.unwrap();
    let kinds: Vec<ItemKind> = history.items().iter().map(|item| item.kind()).collect();
    assert_eq!(kinds, vec![ItemKind::SessionMeta, ItemKind::Event]);
}

#[tokio::test]
async fn test_queued_batches_commit_in_order() {
    let store = memory_store();
    let recorder = RolloutRecorder::create(&store, SESSION, CreateOptions::default())
        .await
        .unwrap();

    let mut pending = Vec::new();
    for n in 0..20 {
        let item: RolloutItem = EventMsg::agent_message(format!("message {n}")).into();
        pending.push(recorder.enqueue_items(&[item]).await.unwrap().unwrap());
    }
    for write in pending {
        write.await.unwrap();
    }
    assert_eq!(recorder.pending_batches(), 0);
    recorder.shutdown().await.unwrap();

    let history = RolloutRecorder::get_history(&store, SESSION).await.unwrap();
    assert_eq!(sequences(&history), (0..21).collect::<Vec<_>>());
    let texts: Vec<String> = history
        .items()
        .iter()
        .skip(1)
        .map(|item| match item {
            RolloutItem::Event(EventMsg::AgentMessage { message }) => message.clone(),
            other => panic!("unexpected {:?}", other.kind()),
        })
        .collect();
    let expected: Vec<String> = (0..20).map(|n| format!("message {n}")).collect();
    assert_eq!(texts, expected);
}

#[tokio::test]
async fn test_flush_waits_for_unawaited_batches() {
    let store = memory_store();
    let recorder = RolloutRecorder::create(&store, SESSION, CreateOptions::default())
        .await
        .unwrap();

    for n in 0..10 {
        let item: RolloutItem = EventMsg::user_message(format!("queued {n}")).into();
        drop(recorder.enqueue_items(&[item]).await.unwrap());
    }
    recorder.flush().await.unwrap();
    assert_eq!(recorder.pending_batches(), 0);

    let history = RolloutRecorder::get_history(&store, SESSION).await.unwrap();
    assert_eq!(sequences(&history), (0..11).collect::<Vec<_>>());

    // Nothing queued: both complete without writing
    recorder.flush().await.unwrap();
    recorder.flush().await.unwrap();
    let history = RolloutRecorder::get_history(&store, SESSION).await.unwrap();
    assert_eq!(history.items().len(), 11);

    recorder.shutdown().await.unwrap();
}

#[tokio::test]
async fn test_out_of_range_ttl_is_rejected() {
    let store = memory_store();
    let ttl: TtlConfig = "100000000".parse().unwrap();

    let err = RolloutRecorder::create(
        &store,
        SESSION,
        CreateOptions {
            ttl: Some(ttl),
            ..Default::default()
        },
    )
    .await
    .err()
    .unwrap();
    assert!(matches!(err, Error::Config(_)), "{err:?}");
    assert!(RolloutRecorder::get_history(&store, SESSION).await.unwrap().is_new());

    // No claim or row is left behind
    let recorder = RolloutRecorder::create(&store, SESSION, CreateOptions::default())
        .await
        .unwrap();
    recorder.shutdown().await.unwrap();
}

#[tokio::test]
async fn test_failed_batch_can_be_retried() {
    let (dir, store) = file_store();
    let recorder = RolloutRecorder::create(&store, SESSION, CreateOptions::default())
        .await
        .unwrap();

    let sabotage = rusqlite::Connection::open(dir.path().join("rollout.db")).unwrap();
    sabotage
        .execute_batch(
            "CREATE TRIGGER fail_items BEFORE INSERT ON items
             BEGIN SELECT RAISE(ABORT, 'disk full'); END;",
        )
        .unwrap();

    let batch: Vec<RolloutItem> = vec![
        EventMsg::user_message("first").into(),
        EventMsg::agent_message("second").into(),
    ];
    let err = recorder.record_items(&batch).await.unwrap_err();
    assert!(matches!(err, Error::WriteFailed { .. }));
    assert!(err.is_retryable());

    sabotage
        .execute_batch("DROP TRIGGER fail_items;")
        .unwrap();

    recorder.record_items(&batch).await.unwrap();
    recorder.flush().await.unwrap();
    recorder.shutdown().await.unwrap();

    let history = RolloutRecorder::get_history(&store, SESSION).await.unwrap();
    assert_eq!(sequences(&history), vec![0, 1, 2]);
}

#[tokio::test]
async fn test_delete_session() {
    let store = memory_store();
    let recorder = RolloutRecorder::create(&store, SESSION, CreateOptions::default())
        .await
        .unwrap();
    recorder.shutdown().await.unwrap();

    assert!(RolloutRecorder::delete_session(&store, SESSION).await.unwrap());
    assert!(!RolloutRecorder::delete_session(&store, SESSION).await.unwrap());
    assert!(
        RolloutRecorder::get_history(&store, SESSION)
            .await
            .unwrap()
            .is_new()
    );
}

#[tokio::test]
async fn test_listing_shows_sessions_with_user_content() {
    let store = memory_store();

    let quiet_id = SessionId::new().to_string();
    let quiet = RolloutRecorder::create(&store, &quiet_id, CreateOptions::default())
        .await
        .unwrap();
    quiet.shutdown().await.unwrap();

    let chatty = RolloutRecorder::create(&store, SESSION, CreateOptions::default())
        .await
        .unwrap();
    chatty
        .record_items(&[EventMsg::user_message("  refactor the parser ").into()])
        .await
        .unwrap();
    chatty.shutdown().await.unwrap();

    let page = RolloutRecorder::list_conversations(&store, 10, None)
        .await
        .unwrap();
    assert_eq!(page.items.len(), 1);
    assert_eq!(page.items[0].id.to_string(), SESSION);
    assert_eq!(page.items[0].preview.as_deref(), Some("refactor the parser"));
    assert!(page.next_cursor.is_none());

    assert!(matches!(
        RolloutRecorder::list_conversations(&store, 0, None).await,
        Err(Error::InvalidPageSize(0))
    ));
    assert!(matches!(
        RolloutRecorder::list_conversations(&store, 10, Some("%%%")).await,
        Err(Error::InvalidCursor(_))
    ));
}

#[tokio::test]
async fn test_permanent_sessions_survive_cleanup() {
    let store = memory_store();
    let recorder = RolloutRecorder::create(
        &store,
        SESSION,
        CreateOptions {
            ttl: Some(TtlConfig::Permanent),
            ..Default::default()
        },
    )
    .await
    .unwrap();
    recorder.shutdown().await.unwrap();

    let far_future = chrono::Utc::now() + chrono::Duration::days(36500);
    let report = store.cleanup_expired_at(far_future).await.unwrap();
    assert_eq!(report.deleted, 0);
    assert!(
        !RolloutRecorder::get_history(&store, SESSION)
            .await
            .unwrap()
            .is_new()
    );
}

#[tokio::test]
async fn test_cleanup_reaps_expired_sessions() {
    let store = memory_store();
    let recorder = RolloutRecorder::create(
        &store,
        SESSION,
        CreateOptions {
            ttl: Some(TtlConfig::Days(1)),
            ..Default::default()
        },
    )
    .await
    .unwrap();
    recorder
        .record_items(&[EventMsg::user_message("short lived").into()])
        .await
        .unwrap();
    recorder.shutdown().await.unwrap();

    assert_eq!(RolloutRecorder::cleanup_expired(&store).await.unwrap(), 0);

    let later = chrono::Utc::now() + chrono::Duration::days(2);
    let report = store.cleanup_expired_at(later).await.unwrap();
    assert_eq!(report.deleted, 1);
    assert!(
        RolloutRecorder::get_history(&store, SESSION)
            .await
            .unwrap()
            .is_new()
    );
}
