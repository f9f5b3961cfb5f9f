//! In-memory job registry.
//!
//! Single source of truth for job state. The table itself is guarded by a
//! coarse mutex for structural operations (create, delete, list); each entry
//! carries its own lock for in-record mutations. Every mutation bumps
//! `updated_at`, enforces status monotonicity, and publishes exactly one
//! progress event inside the entry's critical section, which gives all
//! subscribers of one job the same total order of events. Callbacks
//! themselves run on subscriber-owned tasks, never under a store lock.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use chrono::Utc;
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

use crate::error::OrchestratorError;
use crate::job::{GenerationJob, GenerationOptions, GenerationResult, JobStatus, Stage, StageStatus};
use crate::progress::{PendingSubscriber, ProgressCallback, ProgressEvent, SubscriberHandle, Subscription};

struct JobEntry {
    record: GenerationJob,
    subscribers: Vec<SubscriberHandle>,
    cancel: CancellationToken,
}

impl JobEntry {
    fn publish(&mut self) {
        let event = ProgressEvent::snapshot(&self.record);
        self.subscribers.retain(|s| s.deliver(event.clone()));
    }
}

/// In-memory registry of generation jobs.
#[derive(Default)]
pub struct JobStore {
    jobs: Mutex<HashMap<Uuid, Arc<Mutex<JobEntry>>>>,
}

impl JobStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a new pending job from the given options and returns a
    /// snapshot of it.
    pub fn create(&self, options: GenerationOptions) -> GenerationJob {
        let record = GenerationJob::new(options);
        let snapshot = record.clone();
        let entry = Arc::new(Mutex::new(JobEntry {
            record,
            subscribers: Vec::new(),
            cancel: CancellationToken::new(),
        }));
        self.table().insert(snapshot.id, entry);
        snapshot
    }

    /// Point-in-time snapshot of one job; the caller's copy is detached
    /// from the store.
    pub fn get(&self, id: Uuid) -> Option<GenerationJob> {
        let entry = self.entry(id)?;
        let guard = lock(&entry);
        Some(guard.record.clone())
    }

    /// Snapshot of all current records. Ordering is unspecified.
    pub fn list(&self) -> Vec<GenerationJob> {
        let entries: Vec<_> = self.table().values().cloned().collect();
        entries
            .iter()
            .map(|entry| lock(entry).record.clone())
            .collect()
    }

    pub fn len(&self) -> usize {
        self.table().len()
    }

    pub fn is_empty(&self) -> bool {
        self.table().is_empty()
    }

    /// The cancellation token shared with the job's executor.
    pub fn cancel_token(&self, id: Uuid) -> Option<CancellationToken> {
        let entry = self.entry(id)?;
        let guard = lock(&entry);
        Some(guard.cancel.clone())
    }

    /// Transitions the job's overall status. Terminal states are absorbing:
    /// once `Completed` or `Failed`, later transitions are ignored.
    pub fn update_status(&self, id: Uuid, status: JobStatus) -> Result<(), OrchestratorError> {
        self.mutate(id, |record| {
            if record.status.is_terminal() {
                tracing::warn!(
                    job_id = %record.id,
                    current = %record.status,
                    requested = %status,
                    "ignoring status transition out of a terminal state"
                );
                return false;
            }
            record.status = status;
            true
        })
    }

    /// Transitions one stage's status. A stage marked `Skipped` at creation
    /// keeps that status for the lifetime of the job.
    pub fn update_stage(
        &self,
        id: Uuid,
        stage: Stage,
        status: StageStatus,
    ) -> Result<(), OrchestratorError> {
        self.mutate(id, |record| {
            if record.progress.stage(stage) == StageStatus::Skipped {
                tracing::warn!(job_id = %record.id, %stage, "ignoring transition of a skipped stage");
                return false;
            }
            record.progress.set(stage, status);
            true
        })
    }

    /// Records the top-level failure reason.
    pub fn set_error(&self, id: Uuid, message: &str) -> Result<(), OrchestratorError> {
        self.mutate(id, |record| {
            if record.status.is_terminal() {
                return false;
            }
            record.error = Some(message.to_string());
            true
        })
    }

    /// Merges stage output into the job's result under the entry lock.
    pub fn with_result(
        &self,
        id: Uuid,
        merge: impl FnOnce(&mut GenerationResult),
    ) -> Result<(), OrchestratorError> {
        self.mutate(id, |record| {
            merge(&mut record.result);
            true
        })
    }

    /// Removes the job and tears down its subscriber set. Any in-flight
    /// executor observes the cancelled token at its next suspension point.
    pub fn delete(&self, id: Uuid) -> bool {
        let Some(entry) = self.table().remove(&id) else {
            return false;
        };
        let mut guard = lock(&entry);
        guard.cancel.cancel();
        guard.subscribers.clear();
        true
    }

    /// Registers a subscriber for one job. The current state is delivered
    /// synchronously as a replay event before this returns, so callers never
    /// need a separate initial `get`.
    pub fn subscribe(
        &self,
        id: Uuid,
        callback: ProgressCallback,
    ) -> Result<Subscription, OrchestratorError> {
        let entry = self.entry(id).ok_or(OrchestratorError::JobNotFound(id))?;
        let pending = PendingSubscriber::new(callback);
        let replay = {
            let mut guard = lock(&entry);
            guard.subscribers.push(pending.handle());
            ProgressEvent::snapshot(&guard.record)
        };
        Ok(pending.activate(replay))
    }

    /// Deletes terminal jobs whose age exceeds `ttl`. Returns how many were
    /// evicted. Non-terminal jobs are never touched.
    pub fn evict_terminal_older_than(&self, ttl: Duration) -> usize {
        let ttl = chrono::Duration::from_std(ttl).unwrap_or(chrono::Duration::MAX);
        let now = Utc::now();

        let candidates: Vec<Uuid> = {
            let table = self.table();
            table
                .iter()
                .filter(|(_, entry)| {
                    let guard = lock(entry);
                    guard.record.is_terminal() && now - guard.record.created_at > ttl
                })
                .map(|(id, _)| *id)
                .collect()
        };

        let mut evicted = 0;
        for id in candidates {
            if self.delete(id) {
                tracing::debug!(job_id = %id, "evicted expired job");
                evicted += 1;
            }
        }
        evicted
    }

    fn table(&self) -> std::sync::MutexGuard<'_, HashMap<Uuid, Arc<Mutex<JobEntry>>>> {
        self.jobs.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn entry(&self, id: Uuid) -> Option<Arc<Mutex<JobEntry>>> {
        self.table().get(&id).cloned()
    }

    /// Shared mutation path: applies `apply` under the entry lock, bumps
    /// timestamps, and publishes one event. `apply` returning false means
    /// the mutation was rejected by a guard and nothing is published.
    fn mutate(
        &self,
        id: Uuid,
        apply: impl FnOnce(&mut GenerationJob) -> bool,
    ) -> Result<(), OrchestratorError> {
        let entry = self.entry(id).ok_or(OrchestratorError::JobNotFound(id))?;
        let mut guard = lock(&entry);

        if !apply(&mut guard.record) {
            return Ok(());
        }

        let now = Utc::now();
        guard.record.updated_at = now;
        if guard.record.is_terminal() && guard.record.completed_at.is_none() {
            guard.record.completed_at = Some(now);
        }
        guard.publish();
        Ok(())
    }
}

fn lock(entry: &Arc<Mutex<JobEntry>>) -> std::sync::MutexGuard<'_, JobEntry> {
    entry.lock().unwrap_or_else(PoisonError::into_inner)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::progress::ProgressEventKind;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn collector() -> (ProgressCallback, Arc<Mutex<Vec<ProgressEvent>>>) {
        let events = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&events);
        let callback: ProgressCallback = Box::new(move |ev| sink.lock().unwrap().push(ev));
        (callback, events)
    }

    #[test]
    fn test_create_and_get_snapshot() {
        let store = JobStore::new();
        let job = store.create(GenerationOptions::default());

        let mut fetched = store.get(job.id).unwrap();
        fetched.status = JobStatus::Failed;

        // Caller mutations never reach the store.
        assert_eq!(store.get(job.id).unwrap().status, JobStatus::Pending);
    }

    #[test]
    fn test_get_unknown_id() {
        let store = JobStore::new();
        assert!(store.get(Uuid::new_v4()).is_none());
    }

    #[test]
    fn test_update_bumps_updated_at() {
        let store = JobStore::new();
        let job = store.create(GenerationOptions::default());

        store.update_status(job.id, JobStatus::Processing).unwrap();
        let after = store.get(job.id).unwrap();
        assert!(after.updated_at >= after.created_at);
        assert!(after.completed_at.is_none());
    }

    #[test]
    fn test_terminal_transition_sets_completed_at() {
        let store = JobStore::new();
        let job = store.create(GenerationOptions::default());

        store.update_status(job.id, JobStatus::Completed).unwrap();
        let after = store.get(job.id).unwrap();
        assert_eq!(after.completed_at, Some(after.updated_at));
    }

    #[test]
    fn test_terminal_status_is_absorbing() {
        let store = JobStore::new();
        let job = store.create(GenerationOptions::default());

        store.update_status(job.id, JobStatus::Failed).unwrap();
        let completed_at = store.get(job.id).unwrap().completed_at;

        store.update_status(job.id, JobStatus::Processing).unwrap();
        let after = store.get(job.id).unwrap();
        assert_eq!(after.status, JobStatus::Failed);
        assert_eq!(after.completed_at, completed_at);
    }

    #[test]
    fn test_skipped_stage_never_rewritten() {
        let store = JobStore::new();
        let job = store.create(GenerationOptions {
            skip_ads: true,
            ..Default::default()
        });

        store
            .update_stage(job.id, Stage::Ads, StageStatus::Processing)
            .unwrap();
        assert_eq!(
            store.get(job.id).unwrap().progress.ads,
            StageStatus::Skipped
        );
    }

    #[test]
    fn test_mutations_on_missing_job() {
        let store = JobStore::new();
        let id = Uuid::new_v4();
        assert!(matches!(
            store.update_status(id, JobStatus::Processing),
            Err(OrchestratorError::JobNotFound(_))
        ));
        assert!(matches!(
            store.update_stage(id, Stage::Texts, StageStatus::Done),
            Err(OrchestratorError::JobNotFound(_))
        ));
        assert!(matches!(
            store.set_error(id, "x"),
            Err(OrchestratorError::JobNotFound(_))
        ));
    }

    #[test]
    fn test_delete_round_trip() {
        let store = JobStore::new();
        let job = store.create(GenerationOptions::default());

        assert!(store.delete(job.id));
        assert!(store.get(job.id).is_none());
        assert!(!store.delete(job.id));
    }

    #[tokio::test]
    async fn test_subscribe_replays_current_state() {
        let store = JobStore::new();
        let job = store.create(GenerationOptions::default());
        store.update_status(job.id, JobStatus::Completed).unwrap();

        let (callback, events) = collector();
        let sub = store.subscribe(job.id, callback).unwrap();

        // Replay is synchronous: already observable, and terminal.
        {
            let seen = events.lock().unwrap();
            assert_eq!(seen.len(), 1);
            assert_eq!(seen[0].kind, ProgressEventKind::Complete);
        }
        sub.unsubscribe();
    }

    #[tokio::test]
    async fn test_events_published_per_mutation() {
        let store = JobStore::new();
        let job = store.create(GenerationOptions::default());

        let (callback, events) = collector();
        let sub = store.subscribe(job.id, callback).unwrap();

        store.update_status(job.id, JobStatus::Processing).unwrap();
        store
            .update_stage(job.id, Stage::Analysis, StageStatus::Processing)
            .unwrap();
        store
            .update_stage(job.id, Stage::Analysis, StageStatus::Done)
            .unwrap();

        tokio::time::sleep(std::time::Duration::from_millis(50)).await;
        let seen = events.lock().unwrap();
        // replay + three mutations
        assert_eq!(seen.len(), 4);
        assert!(seen.iter().all(|e| e.job_id == job.id));
        drop(seen);
        sub.unsubscribe();
    }

    #[tokio::test]
    async fn test_subscriber_count_pruned_after_unsubscribe() {
        let store = JobStore::new();
        let job = store.create(GenerationOptions::default());

        let count = Arc::new(AtomicUsize::new(0));
        let count_cb = Arc::clone(&count);
        let sub = store
            .subscribe(job.id, Box::new(move |_| {
                count_cb.fetch_add(1, Ordering::SeqCst);
            }))
            .unwrap();
        sub.unsubscribe();

        store.update_status(job.id, JobStatus::Processing).unwrap();
        tokio::time::sleep(std::time::Duration::from_millis(50)).await;
        assert_eq!(count.load(Ordering::SeqCst), 1, "replay only");
    }

    #[test]
    fn test_eviction_spares_young_and_running_jobs() {
        let store = JobStore::new();
        let terminal = store.create(GenerationOptions::default());
        let running = store.create(GenerationOptions::default());

        store
            .update_status(terminal.id, JobStatus::Completed)
            .unwrap();
        store
            .update_status(running.id, JobStatus::Processing)
            .unwrap();

        // Generous TTL: nothing is old enough.
        assert_eq!(store.evict_terminal_older_than(Duration::from_secs(3600)), 0);

        // Zero TTL: only the terminal job goes.
        assert_eq!(store.evict_terminal_older_than(Duration::ZERO), 1);
        assert!(store.get(terminal.id).is_none());
        assert!(store.get(running.id).is_some());
    }

    #[test]
    fn test_cancel_token_shared() {
        let store = JobStore::new();
        let job = store.create(GenerationOptions::default());

        let token = store.cancel_token(job.id).unwrap();
        assert!(!token.is_cancelled());
        store.delete(job.id);
        assert!(token.is_cancelled());
    }
}
