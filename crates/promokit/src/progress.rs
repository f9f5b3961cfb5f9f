//! Per-job progress fan-out.
//!
//! Every store mutation publishes one [`ProgressEvent`]. Each subscriber
//! owns an unbounded queue drained by its own task, so a slow callback never
//! delays the producer or other subscribers, and callbacks for one
//! subscriber are strictly serialized.

use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;
use uuid::Uuid;

use crate::job::{GenerationJob, GenerationResult, JobStatus, StageProgress};

/// What a progress event signifies.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProgressEventKind {
    /// Any non-terminal change, including intermediate stage transitions.
    Progress,
    /// The job reached `Completed`; carries the final result snapshot.
    Complete,
    /// The job reached `Failed`; carries the error message.
    Error,
}

/// A state-change notification for one job. Reflects post-transition state.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProgressEvent {
    pub job_id: Uuid,
    pub kind: ProgressEventKind,
    pub progress: StageProgress,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result: Option<GenerationResult>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    pub timestamp: DateTime<Utc>,
}

impl ProgressEvent {
    /// Builds the event describing a job's current state. Used both for
    /// post-mutation publication and for the replay delivered to fresh
    /// subscribers.
    pub(crate) fn snapshot(job: &GenerationJob) -> Self {
        let kind = match job.status {
            JobStatus::Completed => ProgressEventKind::Complete,
            JobStatus::Failed => ProgressEventKind::Error,
            _ => ProgressEventKind::Progress,
        };
        Self {
            job_id: job.id,
            kind,
            progress: job.progress,
            result: job.result_snapshot(),
            error: job.error.clone(),
            timestamp: job.updated_at,
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(
            self.kind,
            ProgressEventKind::Complete | ProgressEventKind::Error
        )
    }
}

/// Callback invoked with each event for one subscriber.
pub type ProgressCallback = Box<dyn Fn(ProgressEvent) + Send + Sync + 'static>;

struct SubscriberState {
    closed: AtomicBool,
    /// Held while a callback runs; `unsubscribe` takes it after setting
    /// `closed` so that no callback can begin once `unsubscribe` returns.
    gate: Mutex<()>,
    callback: ProgressCallback,
}

impl SubscriberState {
    fn deliver(&self, event: ProgressEvent) {
        let _guard = self
            .gate
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner);
        if self.closed.load(Ordering::SeqCst) {
            return;
        }
        let job_id = event.job_id;
        if catch_unwind(AssertUnwindSafe(|| (self.callback)(event))).is_err() {
            tracing::warn!(%job_id, "progress subscriber callback panicked; event discarded");
        }
    }
}

/// Handle kept by the job store; feeds the subscriber's queue.
pub(crate) struct SubscriberHandle {
    state: Arc<SubscriberState>,
    tx: mpsc::UnboundedSender<ProgressEvent>,
}

impl SubscriberHandle {
    /// Enqueues an event. Returns false when the subscriber is gone and the
    /// handle should be pruned.
    pub(crate) fn deliver(&self, event: ProgressEvent) -> bool {
        if self.state.closed.load(Ordering::SeqCst) {
            return false;
        }
        self.tx.send(event).is_ok()
    }
}

/// A subscriber that has been registered but whose drain task has not
/// started yet. Created under the job's lock; activated outside of it so
/// the replay callback never runs inside a store critical section.
pub(crate) struct PendingSubscriber {
    state: Arc<SubscriberState>,
    tx: mpsc::UnboundedSender<ProgressEvent>,
    rx: mpsc::UnboundedReceiver<ProgressEvent>,
}

impl PendingSubscriber {
    pub(crate) fn new(callback: ProgressCallback) -> Self {
        let (tx, rx) = mpsc::unbounded_channel();
        Self {
            state: Arc::new(SubscriberState {
                closed: AtomicBool::new(false),
                gate: Mutex::new(()),
                callback,
            }),
            tx,
            rx,
        }
    }

    pub(crate) fn handle(&self) -> SubscriberHandle {
        SubscriberHandle {
            state: Arc::clone(&self.state),
            tx: self.tx.clone(),
        }
    }

    /// Delivers the replay event synchronously, then starts the drain task.
    /// Events published after registration queue behind the replay, so the
    /// subscriber observes the same total order as everyone else.
    pub(crate) fn activate(self, replay: ProgressEvent) -> Subscription {
        let Self { state, tx, mut rx } = self;
        drop(tx);

        state.deliver(replay);

        let drain_state = Arc::clone(&state);
        tokio::spawn(async move {
            while let Some(event) = rx.recv().await {
                if drain_state.closed.load(Ordering::SeqCst) {
                    break;
                }
                drain_state.deliver(event);
            }
        });

        Subscription { state }
    }
}

/// Handle for one subscription. Delivery continues until [`unsubscribe`] is
/// called or the job is deleted; dropping the handle alone does not stop it.
///
/// [`unsubscribe`]: Subscription::unsubscribe
pub struct Subscription {
    state: Arc<SubscriberState>,
}

impl Subscription {
    /// After this returns, no further callback will begin; a callback
    /// already running is allowed to finish first.
    pub fn unsubscribe(&self) {
        self.state.closed.store(true, Ordering::SeqCst);
        drop(
            self.state
                .gate
                .lock()
                .unwrap_or_else(std::sync::PoisonError::into_inner),
        );
    }
}
