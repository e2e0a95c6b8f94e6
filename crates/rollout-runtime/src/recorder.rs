use chrono::{DateTime, Utc};
use rollout_index::{ConversationPage, Cursor, ItemRecord};
use rollout_types::{
    GitInfo, RolloutItem, SessionId, SessionMeta, SessionMetaLine, TtlConfig, format_timestamp,
};
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use tracing::{debug, info};

use crate::policy;
use crate::sequencer::{PendingWrite, Sequencer};
use crate::store::RolloutStore;
use crate::{Error, Result};

/// Optional inputs for [`RolloutRecorder::create`]
#[derive(Debug, Clone, Default)]
pub struct CreateOptions {
    /// Free-text instructions stored in the session header
    pub instructions: Option<String>,
    /// Retention override; the store's configured TTL applies when `None`
    pub ttl: Option<TtlConfig>,
    /// Working directory recorded in the header (defaults to the process cwd)
    pub cwd: Option<PathBuf>,
    pub git: Option<GitInfo>,
}

/// What a caller needs to start a conversation
#[derive(Debug, Clone, PartialEq)]
pub enum InitialHistory {
    /// No stored session with that id
    New,
    Resumed(ResumedHistory),
}

#[derive(Debug, Clone, PartialEq)]
pub struct ResumedHistory {
    pub session_id: SessionId,
    /// Every stored item in sequence order, header first
    pub history: Vec<ItemRecord>,
}

impl InitialHistory {
    pub fn is_new(&self) -> bool {
        matches!(self, InitialHistory::New)
    }

    /// Stored items without their index metadata
    pub fn items(&self) -> Vec<&RolloutItem> {
        match self {
            InitialHistory::New => Vec::new(),
            InitialHistory::Resumed(resumed) => {
                resumed.history.iter().map(|record| &record.item).collect()
            }
        }
    }
}

/// Records rollout items for one session into the store.
///
/// Exactly one recorder may be open per session within a store; a second
/// `create`/`resume` for the same id fails with [`Error::SessionBusy`] until
/// the first is shut down or dropped.
pub struct RolloutRecorder {
    store: RolloutStore,
    session_id: SessionId,
    sequencer: Sequencer,
    shut_down: AtomicBool,
}

impl RolloutRecorder {
    /// Start a new session: write its index row and `session-meta` header.
    pub async fn create(
        store: &RolloutStore,
        session_id: &str,
        options: CreateOptions,
    ) -> Result<Self> {
        let id = SessionId::parse(session_id)?;
        let now = Utc::now();
        let cwd = match options.cwd {
            Some(cwd) => cwd,
            None => std::env::current_dir().unwrap_or_else(|_| PathBuf::from(".")),
        };

        let meta = SessionMetaLine {
            meta: SessionMeta {
                id,
                timestamp: format_timestamp(now),
                cwd,
                originator: store.config().originator.clone(),
                cli_version: env!("CARGO_PKG_VERSION").to_string(),
                instructions: options.instructions,
            },
            git: options.git,
        };
        let ttl = options.ttl.unwrap_or(store.config().ttl_days);

        Self::create_from_meta(store, meta, now, ttl).await
    }

    pub(crate) async fn create_from_meta(
        store: &RolloutStore,
        meta: SessionMetaLine,
        created: DateTime<Utc>,
        ttl: TtlConfig,
    ) -> Result<Self> {
        let id = meta.meta.id;
        let expires_at = ttl.expires_at(created)?;
        let claim = store.claim_writer(id)?;

        let record = store
            .with_db(move |db| Ok(db.create_session(&meta, created, expires_at)?))
            .await?;

        info!(
            session_id = %id,
            ttl = %ttl,
            "Created rollout session"
        );

        let sequencer = Sequencer::spawn(store.clone(), claim, id, record.item_count);
        Ok(Self {
            store: store.clone(),
            session_id: id,
            sequencer,
            shut_down: AtomicBool::new(false),
        })
    }

    /// Reopen an existing session for appending. Nothing is written.
    pub async fn resume(store: &RolloutStore, session_id: &str) -> Result<Self> {
        let id = SessionId::parse(session_id)?;
        let claim = store.claim_writer(id)?;

        let (record, last_sequence) = store
            .with_db(move |db| Ok((db.get_session(&id)?, db.last_sequence(&id)?)))
            .await?;
        let record = record.ok_or_else(|| Error::NotFound(id.to_string()))?;

        let next_sequence = match last_sequence {
            Some(last) if last + 1 == record.item_count => last + 1,
            other => {
                return Err(Error::CorruptRecord {
                    session_id: id.to_string(),
                    sequence: other,
                    reason: format!(
                        "item log does not match item count {}",
                        record.item_count
                    ),
                });
            }
        };

        info!(session_id = %id, next_sequence, "Resumed rollout session");

        let sequencer = Sequencer::spawn(store.clone(), claim, id, next_sequence);
        Ok(Self {
            store: store.clone(),
            session_id: id,
            sequencer,
            shut_down: AtomicBool::new(false),
        })
    }

    pub fn session_id(&self) -> SessionId {
        self.session_id
    }

    pub fn store(&self) -> &RolloutStore {
        &self.store
    }

    /// Persist the durable subset of `items` as one atomic batch.
    ///
    /// Returns once the batch is committed. On [`Error::WriteFailed`] nothing
    /// was written and the same items may be submitted again.
    pub async fn record_items(&self, items: &[RolloutItem]) -> Result<()> {
        match self.enqueue_items(items).await? {
            Some(pending) => pending.await.map(|_| ()),
            None => Ok(()),
        }
    }

    /// Queue the durable subset of `items` without waiting for the commit.
    ///
    /// `None` when the policy dropped every item.
    pub async fn enqueue_items(&self, items: &[RolloutItem]) -> Result<Option<PendingWrite>> {
        self.ensure_open()?;

        let persisted = policy::filter_persisted(items);
        if persisted.is_empty() {
            debug!(
                session_id = %self.session_id,
                dropped = items.len(),
                "No durable items in batch"
            );
            return Ok(None);
        }

        self.sequencer.add_items(persisted).await.map(Some)
    }

    /// Wait until everything queued so far is committed
    pub async fn flush(&self) -> Result<()> {
        self.ensure_open()?;
        self.sequencer.flush().await
    }

    /// Flush and stop the writer. Later calls are no-ops.
    pub async fn shutdown(&self) -> Result<()> {
        if self.shut_down.swap(true, Ordering::SeqCst) {
            return Ok(());
        }

        let result = self.sequencer.shutdown().await;
        info!(session_id = %self.session_id, "Rollout recorder shut down");
        result
    }

    /// Batches queued but not yet committed
    pub fn pending_batches(&self) -> usize {
        self.sequencer.pending()
    }

    fn ensure_open(&self) -> Result<()> {
        if self.shut_down.load(Ordering::SeqCst) {
            return Err(Error::NotInitialized(self.session_id.to_string()));
        }
        Ok(())
    }

    // Store-level operations; they do not need an open recorder.

    /// One page of sessions, most recently updated first
    pub async fn list_conversations(
        store: &RolloutStore,
        page_size: usize,
        cursor: Option<&str>,
    ) -> Result<ConversationPage> {
        let cursor = cursor.map(Cursor::parse).transpose()?;
        let scan_cap = store.config().listing.scan_cap;

        store
            .with_db(move |db| Ok(db.list_conversations(page_size, cursor.as_ref(), scan_cap)?))
            .await
    }

    /// Stored history of a session, or [`InitialHistory::New`] if it does not exist
    pub async fn get_history(store: &RolloutStore, session_id: &str) -> Result<InitialHistory> {
        let id = SessionId::parse(session_id)?;

        let history = store
            .with_db(move |db| {
                if !db.session_exists(&id)? {
                    return Ok(None);
                }
                Ok(Some(db.load_items(&id)?))
            })
            .await?;

        Ok(match history {
            Some(history) => InitialHistory::Resumed(ResumedHistory {
                session_id: id,
                history,
            }),
            None => InitialHistory::New,
        })
    }

    /// Delete every session whose TTL has passed; returns how many were removed
    pub async fn cleanup_expired(store: &RolloutStore) -> Result<usize> {
        let report = store.cleanup_expired_at(Utc::now()).await?;
        Ok(report.deleted)
    }

    /// Remove a session and its items. `false` if there was nothing to delete.
    pub async fn delete_session(store: &RolloutStore, session_id: &str) -> Result<bool> {
        let id = SessionId::parse(session_id)?;
        if store.has_live_writer(&id) {
            return Err(Error::SessionBusy(id.to_string()));
        }

        let deleted = store.with_db(move |db| Ok(db.delete_session(&id)?)).await?;
        if deleted {
            info!(session_id = %id, "Deleted rollout session");
        }
        Ok(deleted)
    }
}
