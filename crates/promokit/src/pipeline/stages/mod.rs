//! Stage adapters: translate a stage into capability calls, apply the
//! timeout/retry/pacing policy, and merge outputs into the job store.

mod ads;
mod analysis;
mod packages;
mod texts;

pub(crate) use ads::run_ads;
pub(crate) use analysis::run_analysis;
pub(crate) use packages::run_packages;
pub(crate) use texts::run_texts;

use std::future::Future;
use std::time::Duration;

use tokio_util::sync::CancellationToken;
use uuid::Uuid;

use crate::error::{ErrorKind, StageError};
use crate::job::{Stage, StageStatus};
use crate::store::JobStore;

/// Stage status transition that tolerates a concurrently deleted job: the
/// record being gone is reported as a cancellation so the stage unwinds.
pub(crate) fn mark(
    store: &JobStore,
    id: Uuid,
    stage: Stage,
    status: StageStatus,
) -> Result<(), StageError> {
    store
        .update_stage(id, stage, status)
        .map_err(|_| StageError::new(ErrorKind::Cancelled, "job record removed"))
}

/// Runs generation tasks in chunks of `chunk_size`, pausing between chunks
/// to respect upstream rate limits. Output order matches input order; a
/// cancellation mid-branch fails the not-yet-started slots.
pub(crate) async fn run_paced<T, F>(
    tasks: Vec<F>,
    chunk_size: usize,
    pause: Duration,
    cancel: &CancellationToken,
) -> Vec<Result<T, StageError>>
where
    F: Future<Output = Result<T, StageError>>,
{
    let chunk_size = chunk_size.max(1);
    let mut results = Vec::with_capacity(tasks.len());
    let mut remaining = tasks;
    let mut first = true;

    while !remaining.is_empty() {
        let abort = if cancel.is_cancelled() {
            true
        } else if first {
            false
        } else {
            tokio::select! {
                _ = cancel.cancelled() => true,
                _ = tokio::time::sleep(pause) => false,
            }
        };
        if abort {
            results.extend(remaining.drain(..).map(|_| Err(StageError::cancelled())));
            break;
        }
        first = false;

        let take = chunk_size.min(remaining.len());
        let chunk: Vec<F> = remaining.drain(..take).collect();
        results.extend(futures::future::join_all(chunk).await);
    }

    results
}
