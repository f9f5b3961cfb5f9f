//! Ads branch: one image per requested platform, resized to the platform's
//! canonical dimensions.

use std::io::Cursor;

use image::imageops::FilterType;

use crate::analysis::ProductAnalysis;
use crate::capabilities::ImageRequest;
use crate::catalog::AdPlatform;
use crate::error::{ErrorKind, StageError};
use crate::job::{AdImage, GenerationOptions, Stage, StageStatus, SynthesizedImage};
use crate::pipeline::context::PipelineContext;
use crate::pipeline::retry::call_with_policy;
use crate::pipeline::stages::{mark, run_paced};
use crate::store::JobStore;

pub(crate) async fn run_ads(store: &JobStore, ctx: &PipelineContext, analysis: &ProductAnalysis) {
    if ctx.options.skip_ads {
        return;
    }
    let Some(synthesizer) = ctx.capabilities.image_synthesizer.as_ref() else {
        let _ = mark(store, ctx.job_id, Stage::Ads, StageStatus::Failed);
        return;
    };

    if mark(store, ctx.job_id, Stage::Ads, StageStatus::Processing).is_err() {
        return;
    }

    let platforms = ctx.options.ad_platforms.clone();
    let tasks: Vec<_> = platforms
        .iter()
        .map(|&platform| {
            let request = ImageRequest {
                prompt: ad_prompt(analysis, &ctx.options, platform),
                size: platform.synthesis_size(),
            };
            let label = format!("ads[{platform}]");
            async move {
                let synthesized = call_with_policy(
                    ctx.config.timeouts.image(),
                    &ctx.config.retry,
                    &ctx.cancel,
                    &label,
                    || synthesizer.synthesize(&request),
                )
                .await?;
                finalize_ad(platform, synthesized)
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

    let mut ads = Vec::new();
    for (platform, outcome) in platforms.iter().zip(outcomes) {
        match outcome {
            Ok(ad) => ads.push(ad),
            Err(error) => {
                tracing::warn!(
                    job_id = %ctx.job_id,
                    %platform,
                    error = %error,
                    "ad generation failed"
                );
            }
        }
    }

    if ads.is_empty() {
        let _ = mark(store, ctx.job_id, Stage::Ads, StageStatus::Failed);
        return;
    }

    if mark(store, ctx.job_id, Stage::Ads, StageStatus::Done).is_err() {
        return;
    }
    let _ = store.with_result(ctx.job_id, |result| result.ads = Some(ads));
}

/// Resizes the synthesized image from its size class down to the platform's
/// exact dimensions. URL-only results (no bytes) pass through untouched.
fn finalize_ad(platform: AdPlatform, synthesized: SynthesizedImage) -> Result<AdImage, StageError> {
    let (width, height) = platform.dimensions();

    if synthesized.data.is_empty() {
        return Ok(AdImage {
            platform,
            width,
            height,
            image: synthesized,
        });
    }

    let decoded = image::load_from_memory(&synthesized.data).map_err(|e| {
        StageError::new(
            ErrorKind::Fatal,
            format!("undecodable image for {platform}: {e}"),
        )
    })?;
    let resized = decoded.resize_to_fill(width, height, FilterType::Lanczos3);

    let mut buffer = Cursor::new(Vec::new());
    resized
        .write_to(&mut buffer, image::ImageFormat::Png)
        .map_err(|e| {
            StageError::new(
                ErrorKind::Fatal,
                format!("failed to encode {platform} image: {e}"),
            )
        })?;

    Ok(AdImage {
        platform,
        width,
        height,
        image: SynthesizedImage {
            data: buffer.into_inner(),
            ..synthesized
        },
    })
}

fn ad_prompt(
    analysis: &ProductAnalysis,
    options: &GenerationOptions,
    platform: AdPlatform,
) -> String {
    let mut prompt = format!(
        "Advertising image for a {category} product, composed for {platform}. \
         Primary color {primary}, eye-catching commercial photography.",
        category = analysis.category,
        primary = analysis.colors.primary,
    );
    if let Some(brand) = &options.brand_name {
        prompt.push_str(&format!(" Brand \"{brand}\"."));
    }
    if let Some(product) = &options.product_name {
        prompt.push_str(&format!(" Featuring \"{product}\"."));
    }
    prompt
}
