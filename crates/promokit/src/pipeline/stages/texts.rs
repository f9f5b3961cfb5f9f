//! Texts branch: description, catchcopy, and SEO sub-generations run in
//! parallel and assemble into one bundle with a single aggregate status.

use crate::analysis::ProductAnalysis;
use crate::capabilities::TextContext;
use crate::job::{Stage, StageStatus, TextBundle};
use crate::pipeline::context::PipelineContext;
use crate::pipeline::retry::call_with_policy;
use crate::pipeline::stages::mark;
use crate::store::JobStore;

pub(crate) async fn run_texts(store: &JobStore, ctx: &PipelineContext, analysis: &ProductAnalysis) {
    if ctx.options.skip_texts {
        return;
    }
    let Some(synthesizer) = ctx.capabilities.text_synthesizer.as_ref() else {
        let _ = mark(store, ctx.job_id, Stage::Texts, StageStatus::Failed);
        return;
    };

    if mark(store, ctx.job_id, Stage::Texts, StageStatus::Processing).is_err() {
        return;
    }

    let text_ctx = TextContext::new(analysis.clone(), &ctx.options);
    let timeout = ctx.config.timeouts.texts();

    let (description, catchcopy, seo) = tokio::join!(
        call_with_policy(
            timeout,
            &ctx.config.retry,
            &ctx.cancel,
            "texts.description",
            || synthesizer.description(&text_ctx),
        ),
        call_with_policy(
            timeout,
            &ctx.config.retry,
            &ctx.cancel,
            "texts.catchcopy",
            || synthesizer.catchcopy(&text_ctx),
        ),
        call_with_policy(timeout, &ctx.config.retry, &ctx.cancel, "texts.seo", || {
            synthesizer.seo(&text_ctx)
        }),
    );

    let bundle = match (description, catchcopy, seo) {
        (Ok(description), Ok(catchcopy), Ok(seo)) => TextBundle {
            description,
            catchcopy,
            seo,
        },
        (description, catchcopy, seo) => {
            for (label, error) in [
                ("description", description.err()),
                ("catchcopy", catchcopy.err()),
                ("seo", seo.err()),
            ] {
                if let Some(error) = error {
                    tracing::warn!(
                        job_id = %ctx.job_id,
                        sub_task = label,
                        error = %error,
                        "text sub-generation failed"
                    );
                }
            }
            let _ = mark(store, ctx.job_id, Stage::Texts, StageStatus::Failed);
            return;
        }
    };

    if mark(store, ctx.job_id, Stage::Texts, StageStatus::Done).is_err() {
        return;
    }
    let _ = store.with_result(ctx.job_id, |result| result.texts = Some(bundle));
}
