//! Public orchestrator surface consumed by transports (HTTP, WS, CLI).

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::Serialize;
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

use crate::bundle;
use crate::capabilities::CapabilitySet;
use crate::config::{ConfigError, OrchestratorConfig};
use crate::error::OrchestratorError;
use crate::job::{GenerationJob, GenerationOptions, GenerationResult, JobStatus, StageProgress};
use crate::pipeline::{PipelineContext, PipelineRunner};
use crate::progress::{ProgressCallback, Subscription};
use crate::reaper::spawn_reaper;
use crate::scheduler::Scheduler;
use crate::store::JobStore;
use crate::validation::validate_submission;

/// What `submit` hands back: the job id, its status at return time, and a
/// closed-form completion estimate.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SubmitReceipt {
    pub job_id: Uuid,
    pub status: JobStatus,
    pub estimated_seconds: u64,
}

/// Point-in-time view of one job for the query surface. `result` is only
/// present once the job is terminal and at least one stage produced output.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StatusSnapshot {
    pub job_id: Uuid,
    pub status: JobStatus,
    pub progress: StageProgress,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result: Option<GenerationResult>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub completed_at: Option<DateTime<Utc>>,
}

impl From<GenerationJob> for StatusSnapshot {
    fn from(job: GenerationJob) -> Self {
        Self {
            job_id: job.id,
            status: job.status,
            progress: job.progress,
            result: job.result_snapshot(),
            error: job.error.clone(),
            created_at: job.created_at,
            updated_at: job.updated_at,
            completed_at: job.completed_at,
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SystemStatus {
    pub active_jobs: usize,
    pub max_concurrent_jobs: usize,
    pub total_jobs: usize,
}

/// The in-process generation job orchestrator.
///
/// Must be constructed inside a tokio runtime: submissions spawn their
/// pipeline task and the reaper runs in the background until [`shutdown`].
///
/// [`shutdown`]: Orchestrator::shutdown
pub struct Orchestrator {
    config: Arc<OrchestratorConfig>,
    store: Arc<JobStore>,
    scheduler: Scheduler,
    capabilities: CapabilitySet,
    shutdown: CancellationToken,
}

impl Orchestrator {
    pub fn new(
        config: OrchestratorConfig,
        capabilities: CapabilitySet,
    ) -> Result<Self, ConfigError> {
        config.validate()?;

        let config = Arc::new(config);
        let store = Arc::new(JobStore::new());
        let shutdown = CancellationToken::new();

        if let Some(period) = config.cleanup_interval() {
            spawn_reaper(
                Arc::clone(&store),
                period,
                config.job_ttl(),
                shutdown.clone(),
            );
        }

        Ok(Self {
            scheduler: Scheduler::new(config.max_concurrent_jobs),
            config,
            store,
            capabilities,
            shutdown,
        })
    }

    /// Validates and admits a submission, creates the job, and launches its
    /// pipeline. Rejected submissions (validation or capacity) create no
    /// job record.
    pub fn submit(
        &self,
        image: Vec<u8>,
        options: GenerationOptions,
    ) -> Result<SubmitReceipt, OrchestratorError> {
        let mut options = options;
        if options.ad_platforms.is_empty() {
            options.ad_platforms = self.config.default_ad_platforms.clone();
        }

        validate_submission(&image, &options, &self.capabilities)?;
        let permit = self.scheduler.try_admit()?;

        let job = self.store.create(options.clone());
        let estimated_seconds = estimate_seconds(&options);
        tracing::info!(job_id = %job.id, estimated_seconds, "job submitted");

        let cancel = self
            .store
            .cancel_token(job.id)
            .unwrap_or_default();
        let ctx = PipelineContext {
            job_id: job.id,
            image,
            options,
            capabilities: self.capabilities.clone(),
            config: Arc::clone(&self.config),
            cancel,
        };
        let runner = PipelineRunner::new(Arc::clone(&self.store));
        tokio::spawn(async move { runner.run(ctx, permit).await });

        Ok(SubmitReceipt {
            job_id: job.id,
            status: job.status,
            estimated_seconds,
        })
    }

    pub fn status(&self, id: Uuid) -> Option<StatusSnapshot> {
        self.store.get(id).map(StatusSnapshot::from)
    }

    pub fn list_jobs(&self) -> Vec<GenerationJob> {
        self.store.list()
    }

    /// Removes the job record, cancelling any in-flight work first.
    pub fn delete_job(&self, id: Uuid) -> bool {
        self.store.delete(id)
    }

    /// Fires the job's cancellation token. In-flight stages abort at their
    /// next suspension point; a terminal job is unaffected.
    pub fn cancel_job(&self, id: Uuid) -> bool {
        match self.store.cancel_token(id) {
            Some(token) => {
                token.cancel();
                true
            }
            None => false,
        }
    }

    /// Registers a progress subscriber. The job's current state is
    /// delivered synchronously as a replay event before this returns.
    pub fn subscribe(
        &self,
        id: Uuid,
        callback: ProgressCallback,
    ) -> Result<Subscription, OrchestratorError> {
        self.store.subscribe(id, callback)
    }

    /// Resolves when the job reaches a terminal state, with the terminal
    /// snapshot, whether it completed or failed. A job that is already
    /// terminal resolves immediately from the replay event.
    pub async fn wait_for_completion(
        &self,
        id: Uuid,
        timeout: Duration,
    ) -> Result<GenerationJob, OrchestratorError> {
        let (tx, mut rx) = tokio::sync::mpsc::unbounded_channel();
        let subscription = self.store.subscribe(
            id,
            Box::new(move |event| {
                if event.is_terminal() {
                    let _ = tx.send(());
                }
            }),
        )?;

        let outcome = tokio::time::timeout(timeout, rx.recv()).await;
        subscription.unsubscribe();

        match outcome {
            Ok(Some(())) => self.store.get(id).ok_or(OrchestratorError::JobNotFound(id)),
            // The channel only closes when the job (and with it the
            // subscriber set) was deleted out from under us.
            Ok(None) => Err(OrchestratorError::JobNotFound(id)),
            Err(_) => Err(OrchestratorError::WaitTimeout(id)),
        }
    }

    /// Materializes the download bundle for a finished job and returns its
    /// directory.
    pub fn write_bundle(&self, id: Uuid, root: &Path) -> Result<PathBuf, OrchestratorError> {
        let job = self.store.get(id).ok_or(OrchestratorError::JobNotFound(id))?;
        Ok(bundle::write_bundle(root, &job)?)
    }

    pub fn system_status(&self) -> SystemStatus {
        SystemStatus {
            active_jobs: self.scheduler.active(),
            max_concurrent_jobs: self.scheduler.max_concurrent(),
            total_jobs: self.store.len(),
        }
    }

    /// Stops the reaper. In-flight jobs run to completion.
    pub fn shutdown(&self) {
        self.shutdown.cancel();
    }
}

/// Closed-form completion estimate in seconds: a 10 s analysis floor plus
/// 15 s per package variation, 10 s per ad platform, and 10 s for texts,
/// counting only stages that will actually run.
fn estimate_seconds(options: &GenerationOptions) -> u64 {
    let packages = if options.skip_packages {
        0
    } else {
        options.package_variations as u64 * 15
    };
    let ads = if options.skip_ads {
        0
    } else {
        options.ad_platforms.len() as u64 * 10
    };
    let texts = if options.skip_texts { 0 } else { 10 };
    10 + packages + ads + texts
}
