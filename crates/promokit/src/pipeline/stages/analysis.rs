//! Analysis stage: the sequential gate feeding every branch.

use crate::analysis::ProductAnalysis;
use crate::error::{ErrorKind, StageError};
use crate::job::{Stage, StageStatus};
use crate::pipeline::context::PipelineContext;
use crate::pipeline::retry::call_with_policy;
use crate::pipeline::stages::mark;
use crate::store::JobStore;

pub(crate) async fn run_analysis(
    store: &JobStore,
    ctx: &PipelineContext,
) -> Result<ProductAnalysis, StageError> {
    let analyzer = ctx
        .capabilities
        .analyzer
        .as_ref()
        .ok_or_else(|| StageError::new(ErrorKind::Fatal, "vision capability not configured"))?;

    mark(store, ctx.job_id, Stage::Analysis, StageStatus::Processing)?;

    let image: &[u8] = &ctx.image;
    let outcome = call_with_policy(
        ctx.config.timeouts.analysis(),
        &ctx.config.retry,
        &ctx.cancel,
        "analysis",
        || analyzer.analyze(image),
    )
    .await;

    match outcome {
        Ok(analysis) => {
            tracing::info!(
                job_id = %ctx.job_id,
                category = %analysis.category,
                confidence = analysis.confidence,
                "analysis complete"
            );
            mark(store, ctx.job_id, Stage::Analysis, StageStatus::Done)?;
            let stored = analysis.clone();
            store
                .with_result(ctx.job_id, |result| result.analysis = Some(stored))
                .map_err(|_| StageError::new(ErrorKind::Cancelled, "job record removed"))?;
            Ok(analysis)
        }
        Err(error) => {
            let _ = mark(store, ctx.job_id, Stage::Analysis, StageStatus::Failed);
            Err(error)
        }
    }
}
