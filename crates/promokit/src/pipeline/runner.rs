use std::sync::Arc;

use uuid::Uuid;

use crate::job::JobStatus;
use crate::pipeline::context::PipelineContext;
use crate::pipeline::stages;
use crate::scheduler::AdmissionPermit;
use crate::store::JobStore;

/// Drives the stage DAG for one admitted job.
pub struct PipelineRunner {
    store: Arc<JobStore>,
}

impl PipelineRunner {
    pub fn new(store: Arc<JobStore>) -> Self {
        Self { store }
    }

    /// Runs the job to a terminal state. The admission permit is held for
    /// the whole run and released on return, whatever the outcome.
    #[tracing::instrument(skip_all, fields(job_id = %ctx.job_id))]
    pub async fn run(&self, ctx: PipelineContext, permit: AdmissionPermit) {
        let _permit = permit;
        let store = self.store.as_ref();
        let id = ctx.job_id;

        // A job cancelled between submission and pickup never starts.
        if ctx.cancel.is_cancelled() {
            self.fail(id, "job cancelled before processing started");
            return;
        }

        if store.update_status(id, JobStatus::Processing).is_err() {
            tracing::warn!("job removed before processing started");
            return;
        }

        // Sequential gate: nothing else runs until analysis succeeds, and
        // its failure fails the whole job. The remaining stages are left
        // untouched in Pending.
        let analysis = match stages::run_analysis(store, &ctx).await {
            Ok(analysis) => analysis,
            Err(error) => {
                tracing::warn!(error = %error, "analysis failed, aborting job");
                self.fail(id, &error.to_string());
                return;
            }
        };

        tokio::join!(
            stages::run_packages(store, &ctx, &analysis),
            stages::run_ads(store, &ctx, &analysis),
            stages::run_texts(store, &ctx, &analysis),
        );

        if ctx.cancel.is_cancelled() {
            self.fail(id, "job cancelled");
            return;
        }

        let _ = store.with_result(id, |result| {
            result.download_url = Some(format!("/downloads/{id}"));
        });
        if store.update_status(id, JobStatus::Completed).is_ok() {
            tracing::info!("job completed");
        }
    }

    fn fail(&self, id: Uuid, reason: &str) {
        let _ = self.store.set_error(id, reason);
        let _ = self.store.update_status(id, JobStatus::Failed);
    }
}
