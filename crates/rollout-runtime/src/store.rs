use chrono::{DateTime, Utc};
use rollout_index::{CleanupReport, DEFAULT_CLEANUP_BATCH, Database};
use rollout_types::SessionId;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use crate::config::{Config, DB_FILE_NAME};
use crate::{Error, Result};

// NOTE: Store Sharing Model
//
// One SQLite connection per store, behind a std Mutex, driven from
// spawn_blocking so async callers never block the runtime.
//
// The writer registry is the in-process half of "one writer per session":
// - A recorder claims its session on create/resume and releases it when its
//   writer task exits
// - Each claim carries a pending-batch counter; the reaper skips sessions
//   whose counter is non-zero
// - Across processes there is no registry; the per-session transactions make
//   a reap and a commit on the same session serialize (one wins, one fails)

/// Shared handle to a rollout database
#[derive(Clone)]
pub struct RolloutStore {
    inner: Arc<StoreInner>,
}

struct StoreInner {
    db: Arc<Mutex<Database>>,
    writers: Mutex<HashMap<SessionId, Arc<WriterState>>>,
    config: Config,
    path: Option<PathBuf>,
}

/// Live-writer bookkeeping for one session
#[derive(Debug, Default)]
pub(crate) struct WriterState {
    pending: AtomicUsize,
}

impl WriterState {
    pub(crate) fn begin_batch(&self) {
        self.pending.fetch_add(1, Ordering::SeqCst);
    }

    pub(crate) fn end_batch(&self) {
        self.pending.fetch_sub(1, Ordering::SeqCst);
    }

    pub(crate) fn pending(&self) -> usize {
        self.pending.load(Ordering::SeqCst)
    }
}

/// Registry claim for a session; released on drop
pub(crate) struct WriterClaim {
    store: RolloutStore,
    session_id: SessionId,
    state: Arc<WriterState>,
}

impl WriterClaim {
    pub(crate) fn state(&self) -> &Arc<WriterState> {
        &self.state
    }
}

impl Drop for WriterClaim {
    fn drop(&mut self) {
        if let Ok(mut writers) = self.store.inner.writers.lock() {
            writers.remove(&self.session_id);
        }
    }
}

impl RolloutStore {
    /// Open `<data_dir>/rollout.db`, reading `<data_dir>/config.toml` if present
    pub fn open(data_dir: &Path) -> Result<Self> {
        let config = Config::load_from(&Config::path_in(data_dir))?;
        Self::open_with_config(&data_dir.join(DB_FILE_NAME), config)
    }

    pub fn open_with_config(db_path: &Path, config: Config) -> Result<Self> {
        let db = Database::open(db_path)?;
        Ok(Self::from_parts(db, config, Some(db_path.to_path_buf())))
    }

    pub fn open_in_memory(config: Config) -> Result<Self> {
        let db = Database::open_in_memory()?;
        Ok(Self::from_parts(db, config, None))
    }

    fn from_parts(db: Database, config: Config, path: Option<PathBuf>) -> Self {
        Self {
            inner: Arc::new(StoreInner {
                db: Arc::new(Mutex::new(db)),
                writers: Mutex::new(HashMap::new()),
                config,
                path,
            }),
        }
    }

    pub fn config(&self) -> &Config {
        &self.inner.config
    }

    /// Database file, `None` for in-memory stores
    pub fn path(&self) -> Option<&Path> {
        self.inner.path.as_deref()
    }

    /// Run a closure against the database on the blocking pool
    pub(crate) async fn with_db<T, F>(&self, f: F) -> Result<T>
    where
        F: FnOnce(&Database) -> Result<T> + Send + 'static,
        T: Send + 'static,
    {
        let db = Arc::clone(&self.inner.db);
        tokio::task::spawn_blocking(move || {
            let guard = db
                .lock()
                .map_err(|_| Error::Io(std::io::Error::other("rollout database lock poisoned")))?;
            f(&guard)
        })
        .await
        .map_err(|e| Error::Io(std::io::Error::other(format!("database task failed: {e}"))))?
    }

    /// Claim the session for a new writer, failing if one is already live
    pub(crate) fn claim_writer(&self, session_id: SessionId) -> Result<WriterClaim> {
        let mut writers = self
            .inner
            .writers
            .lock()
            .map_err(|_| Error::Io(std::io::Error::other("writer registry lock poisoned")))?;

        if writers.contains_key(&session_id) {
            return Err(Error::SessionBusy(session_id.to_string()));
        }

        let state = Arc::new(WriterState::default());
        writers.insert(session_id, Arc::clone(&state));

        Ok(WriterClaim {
            store: self.clone(),
            session_id,
            state,
        })
    }

    pub fn has_live_writer(&self, session_id: &SessionId) -> bool {
        self.inner
            .writers
            .lock()
            .map(|writers| writers.contains_key(session_id))
            .unwrap_or(false)
    }

    /// Whether a live writer has batches queued but not yet committed
    fn has_pending_writes(&self, session_id: &SessionId) -> bool {
        self.inner
            .writers
            .lock()
            .map(|writers| {
                writers
                    .get(session_id)
                    .is_some_and(|state| state.pending() > 0)
            })
            .unwrap_or(false)
    }

    /// Reap sessions expired before `now`, skipping those with pending writes
    pub async fn cleanup_expired_at(&self, now: DateTime<Utc>) -> Result<CleanupReport> {
        let store = self.clone();
        self.with_db(move |db| {
            let report =
                db.cleanup_expired(now, DEFAULT_CLEANUP_BATCH, |id| store.has_pending_writes(id))?;
            Ok(report)
        })
        .await
    }
}
