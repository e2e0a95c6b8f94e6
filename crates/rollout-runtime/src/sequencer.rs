use chrono::Utc;
use rollout_index::CommitOutcome;
use rollout_types::{RolloutItem, SessionId};
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};
use tokio::sync::{mpsc, oneshot};
use tracing::{debug, warn};

use crate::store::{RolloutStore, WriterClaim, WriterState};
use crate::{Error, Result};

// NOTE: Write Path
//
// One writer task per open session owns the next sequence number. Commands
// arrive over a bounded FIFO channel, so batches commit in submission order.
//
// - Consecutive Append commands already waiting in the queue are coalesced
//   into one transaction (bounded by max_batch_items); each caller's items
//   stay contiguous and in order
// - next_sequence only moves after a confirmed commit, so a failed batch can
//   be resubmitted unchanged
// - A failure is reported to every caller whose items were in the failed
//   transaction; if one of them stopped waiting, the next flush reports it
// - The registry claim lives inside the task; it is released when the task
//   exits, before a shutdown is acknowledged

enum WriterCmd {
    Append {
        items: Vec<RolloutItem>,
        ack: oneshot::Sender<Result<CommitOutcome>>,
    },
    /// Ensure all prior batches are processed; respond when done.
    Flush { ack: oneshot::Sender<Result<()>> },
    Shutdown { ack: oneshot::Sender<Result<()>> },
}

/// Completion signal for one queued batch
pub struct PendingWrite {
    session_id: SessionId,
    rx: oneshot::Receiver<Result<CommitOutcome>>,
}

impl Future for PendingWrite {
    type Output = Result<CommitOutcome>;

    fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        let session_id = self.session_id;
        match Pin::new(&mut self.rx).poll(cx) {
            Poll::Ready(Ok(result)) => Poll::Ready(result),
            Poll::Ready(Err(_)) => Poll::Ready(Err(Error::write_failed(
                session_id,
                "writer task stopped before the batch was processed",
            ))),
            Poll::Pending => Poll::Pending,
        }
    }
}

/// Handle to a session's writer task
pub struct Sequencer {
    session_id: SessionId,
    tx: mpsc::Sender<WriterCmd>,
    state: Arc<WriterState>,
}

impl Sequencer {
    /// Start the writer task; `next_sequence` is the session's current item count
    pub(crate) fn spawn(
        store: RolloutStore,
        claim: WriterClaim,
        session_id: SessionId,
        next_sequence: u64,
    ) -> Self {
        let writer_config = store.config().writer.clone();
        let (tx, rx) = mpsc::channel(writer_config.queue_capacity.max(1));
        let state = Arc::clone(claim.state());

        let writer = BatchWriter {
            store,
            session_id,
            next_sequence,
            max_batch_items: writer_config.max_batch_items.max(1),
            state: Arc::clone(&state),
            unreported_failure: None,
            claim: Some(claim),
        };
        tokio::spawn(writer.run(rx));

        Self {
            session_id,
            tx,
            state,
        }
    }

    /// Queue a batch; the returned future resolves once it is committed or rejected
    pub async fn add_items(&self, items: Vec<RolloutItem>) -> Result<PendingWrite> {
        let (ack, rx) = oneshot::channel();

        self.state.begin_batch();
        if self.tx.send(WriterCmd::Append { items, ack }).await.is_err() {
            self.state.end_batch();
            return Err(Error::NotInitialized(self.session_id.to_string()));
        }

        Ok(PendingWrite {
            session_id: self.session_id,
            rx,
        })
    }

    /// Wait until every previously queued batch has been processed
    pub async fn flush(&self) -> Result<()> {
        let (ack, rx) = oneshot::channel();
        self.send_and_wait(WriterCmd::Flush { ack }, rx).await
    }

    /// Drain the queue and stop the writer task
    pub async fn shutdown(&self) -> Result<()> {
        let (ack, rx) = oneshot::channel();
        self.send_and_wait(WriterCmd::Shutdown { ack }, rx).await
    }

    /// Batches queued but not yet committed
    pub fn pending(&self) -> usize {
        self.state.pending()
    }

    async fn send_and_wait(
        &self,
        cmd: WriterCmd,
        rx: oneshot::Receiver<Result<()>>,
    ) -> Result<()> {
        let not_running = || Error::NotInitialized(self.session_id.to_string());
        self.tx.send(cmd).await.map_err(|_| not_running())?;
        rx.await.map_err(|_| not_running())?
    }
}

struct BatchWriter {
    store: RolloutStore,
    session_id: SessionId,
    next_sequence: u64,
    max_batch_items: usize,
    state: Arc<WriterState>,
    unreported_failure: Option<String>,
    claim: Option<WriterClaim>,
}

type Ack = oneshot::Sender<Result<CommitOutcome>>;

impl BatchWriter {
    async fn run(mut self, mut rx: mpsc::Receiver<WriterCmd>) {
        let mut deferred: Option<WriterCmd> = None;

        loop {
            let cmd = match deferred.take() {
                Some(cmd) => cmd,
                None => match rx.recv().await {
                    Some(cmd) => cmd,
                    None => break,
                },
            };

            match cmd {
                WriterCmd::Append { items, ack } => {
                    let mut total = items.len();
                    let mut batch = vec![(items, ack)];

                    while total < self.max_batch_items {
                        match rx.try_recv() {
                            Ok(WriterCmd::Append { items, ack })
                                if total + items.len() <= self.max_batch_items =>
                            {
                                total += items.len();
                                batch.push((items, ack));
                            }
                            Ok(other) => {
                                deferred = Some(other);
                                break;
                            }
                            Err(_) => break,
                        }
                    }

                    self.commit(batch).await;
                }
                WriterCmd::Flush { ack } => {
                    let _ = ack.send(self.take_failure());
                }
                WriterCmd::Shutdown { ack } => {
                    let result = self.take_failure();
                    drop(self.claim.take());
                    let _ = ack.send(result);
                    return;
                }
            }
        }

        debug!(session_id = %self.session_id, "Rollout writer channel closed");
    }

    async fn commit(&mut self, batch: Vec<(Vec<RolloutItem>, Ack)>) {
        let mut items = Vec::new();
        let mut acks = Vec::with_capacity(batch.len());
        for (batch_items, ack) in batch {
            items.extend(batch_items);
            acks.push(ack);
        }

        let session_id = self.session_id;
        let first_sequence = self.next_sequence;
        let count = items.len();
        let result = self
            .store
            .with_db(move |db| {
                Ok(db.append_items(&session_id, first_sequence, &items, Utc::now())?)
            })
            .await;

        match result {
            Ok(outcome) => {
                self.next_sequence = outcome.item_count;
                debug!(
                    session_id = %session_id,
                    first_sequence,
                    count,
                    "Committed rollout batch"
                );
                for ack in acks {
                    let _ = ack.send(Ok(outcome));
                    self.state.end_batch();
                }
            }
            Err(err) => {
                let reason = err.to_string();
                warn!(
                    session_id = %session_id,
                    first_sequence,
                    count,
                    error = %reason,
                    "Rollout batch failed"
                );
                let mut undelivered = false;
                for ack in acks {
                    undelivered |= ack.send(Err(Error::write_failed(session_id, &reason))).is_err();
                    self.state.end_batch();
                }
                if undelivered {
                    self.unreported_failure = Some(reason);
                }
            }
        }
    }

    fn take_failure(&mut self) -> Result<()> {
        match self.unreported_failure.take() {
            Some(reason) => Err(Error::write_failed(self.session_id, reason)),
            None => Ok(()),
        }
    }
}
