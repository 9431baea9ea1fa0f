//! In-order dispatch of optimistic writes.
//!
//! Chapter, status and delete changes are applied to the view first and then
//! handed to a single task that issues them to the record store one at a
//! time, so two quick bumps of the same record reach the store in the order
//! they were made.

use std::sync::Arc;

use tokio::sync::{mpsc, oneshot};

use scantrack_api::traits::RecordStore;
use scantrack_core::debug_log::{self, SharedEventLog, StoreOp, SyncEvent};
use scantrack_core::models::{MangaPatch, Session};

/// A write queued behind the optimistic view change.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WriteOp {
    Update { id: String, patch: MangaPatch },
    Delete { id: String },
}

impl WriteOp {
    fn store_op(&self) -> StoreOp {
        match self {
            Self::Update { .. } => StoreOp::Update,
            Self::Delete { .. } => StoreOp::Delete,
        }
    }

    fn record_id(&self) -> &str {
        match self {
            Self::Update { id, .. } | Self::Delete { id } => id,
        }
    }
}

/// How a dispatched write ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WriteOutcome {
    Applied,
    /// The store rejected the write. The view keeps the optimistic change.
    Failed(String),
}

/// Awaitable outcome of one write. Dropping it does not cancel the write.
#[derive(Debug)]
pub struct WriteTicket(oneshot::Receiver<WriteOutcome>);

impl WriteTicket {
    pub async fn outcome(self) -> WriteOutcome {
        self.0
            .await
            .unwrap_or_else(|_| WriteOutcome::Failed("write queue closed".into()))
    }
}

enum Job {
    Write {
        session: Session,
        op: WriteOp,
        reply: oneshot::Sender<WriteOutcome>,
    },
    Flush(oneshot::Sender<()>),
}

/// Handle to the write task. Clones share the same queue.
#[derive(Clone)]
pub struct WriteQueue {
    tx: mpsc::UnboundedSender<Job>,
}

impl WriteQueue {
    /// Start the write task on the current tokio runtime.
    pub fn spawn<S>(store: Arc<S>, events: SharedEventLog) -> Self
    where
        S: RecordStore + 'static,
    {
        let (tx, rx) = mpsc::unbounded_channel();
        tokio::spawn(write_loop(store, events, rx));
        Self { tx }
    }

    pub fn submit(&self, session: Session, op: WriteOp) -> WriteTicket {
        let (reply, rx) = oneshot::channel();
        // A closed queue drops `reply`, which the ticket reports as a failure.
        let _ = self.tx.send(Job::Write { session, op, reply });
        WriteTicket(rx)
    }

    /// Wait until every write submitted before this call has finished.
    pub async fn flush(&self) {
        let (done, rx) = oneshot::channel();
        if self.tx.send(Job::Flush(done)).is_ok() {
            let _ = rx.await;
        }
    }
}

async fn write_loop<S: RecordStore>(
    store: Arc<S>,
    events: SharedEventLog,
    mut rx: mpsc::UnboundedReceiver<Job>,
) {
    while let Some(job) = rx.recv().await {
        match job {
            Job::Write { session, op, reply } => {
                let result = match &op {
                    WriteOp::Update { id, patch } => store.update(&session, id, patch).await,
                    WriteOp::Delete { id } => store.delete(&session, id).await,
                };
                let outcome = match result {
                    Ok(()) => {
                        tracing::debug!(op = %op.store_op(), id = op.record_id(), "Write applied");
                        WriteOutcome::Applied
                    }
                    Err(e) => {
                        let message = e.to_string();
                        tracing::warn!(
                            op = %op.store_op(),
                            id = op.record_id(),
                            "Write failed, keeping local change: {message}"
                        );
                        debug_log::record(
                            &events,
                            SyncEvent::StoreFailed {
                                op: op.store_op(),
                                record_id: Some(op.record_id().to_string()),
                                message: message.clone(),
                            },
                        );
                        WriteOutcome::Failed(message)
                    }
                };
                let _ = reply.send(outcome);
            }
            Job::Flush(done) => {
                let _ = done.send(());
            }
        }
    }
}
