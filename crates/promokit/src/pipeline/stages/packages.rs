//! Packages branch: N styled package-design variations.

use crate::analysis::ProductAnalysis;
use crate::capabilities::ImageRequest;
use crate::catalog::{select_template, ImageSize, VariationStyle};
use crate::job::{GenerationOptions, PackageDesign, Stage, StageStatus};
use crate::pipeline::context::PipelineContext;
use crate::pipeline::retry::call_with_policy;
use crate::pipeline::stages::{mark, run_paced};
use crate::store::JobStore;

pub(crate) async fn run_packages(
    store: &JobStore,
    ctx: &PipelineContext,
    analysis: &ProductAnalysis,
) {
    if ctx.options.skip_packages {
        return;
    }
    let Some(synthesizer) = ctx.capabilities.image_synthesizer.as_ref() else {
        // Presence is validated at submission; reaching this is a wiring bug.
        let _ = mark(store, ctx.job_id, Stage::Packages, StageStatus::Failed);
        return;
    };

    if mark(store, ctx.job_id, Stage::Packages, StageStatus::Processing).is_err() {
        return;
    }

    let template = ctx
        .options
        .package_template
        .clone()
        .unwrap_or_else(|| select_template(&analysis.category, analysis.shape.kind).to_string());
    let styles = VariationStyle::pick(ctx.options.package_variations);

    let tasks: Vec<_> = styles
        .iter()
        .map(|style| {
            let request = ImageRequest {
                prompt: package_prompt(analysis, &ctx.options, &template, *style),
                size: ImageSize::Square,
            };
            let label = format!("packages[{style}]");
            async move {
                call_with_policy(
                    ctx.config.timeouts.image(),
                    &ctx.config.retry,
                    &ctx.cancel,
                    &label,
                    || synthesizer.synthesize(&request),
                )
                .await
            }
        })
        .collect();

    let outcomes = run_paced(
        tasks,
        ctx.config.intra_branch_concurrency,
        ctx.config.pacing_pause(),
        &ctx.cancel,
    )
    .await;

    let mut designs = Vec::new();
    for (style, outcome) in styles.iter().zip(outcomes) {
        match outcome {
            Ok(image) => designs.push(PackageDesign {
                style: *style,
                template: template.clone(),
                image,
            }),
            Err(error) => {
                tracing::warn!(
                    job_id = %ctx.job_id,
                    %style,
                    error = %error,
                    "package variation failed"
                );
            }
        }
    }

    if designs.is_empty() {
        let _ = mark(store, ctx.job_id, Stage::Packages, StageStatus::Failed);
        return;
    }

    if mark(store, ctx.job_id, Stage::Packages, StageStatus::Done).is_err() {
        return;
    }
    let _ = store.with_result(ctx.job_id, |result| result.packages = Some(designs));
}

fn package_prompt(
    analysis: &ProductAnalysis,
    options: &GenerationOptions,
    template: &str,
    style: VariationStyle,
) -> String {
    let mut prompt = format!(
        "Product package design, {template} template, {hint}. \
         Product category: {category}. Primary color {primary}.",
        hint = style.prompt_hint(),
        category = analysis.category,
        primary = analysis.colors.primary,
    );
    if let Some(brand) = &options.brand_name {
        prompt.push_str(&format!(" Brand name \"{brand}\" prominently displayed."));
    }
    if let Some(product) = &options.product_name {
        prompt.push_str(&format!(" Product name \"{product}\"."));
    }
    prompt.push_str(" Professional product photography, studio lighting, no text artifacts.");
    prompt
}
