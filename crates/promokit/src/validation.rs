//! Submission validation.
//!
//! Runs before admission: a submission that fails any check never creates a
//! job. Errors carry the field tag of whichever input was rejected.

use crate::capabilities::CapabilitySet;
use crate::error::OrchestratorError;
use crate::job::GenerationOptions;

pub const MAX_IMAGE_BYTES: usize = 10 * 1024 * 1024;
pub const MAX_BRAND_NAME_CHARS: usize = 100;
pub const MAX_PRODUCT_NAME_CHARS: usize = 200;
pub const MIN_PACKAGE_VARIATIONS: usize = 1;
pub const MAX_PACKAGE_VARIATIONS: usize = 10;

/// Image formats accepted for analysis, detected by magic-number prefix.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImageFormat {
    Jpeg,
    Png,
    Webp,
}

impl ImageFormat {
    /// Sniffs the format from the leading bytes. Anything else, including
    /// well-formed files of other formats, is rejected upstream.
    pub fn sniff(bytes: &[u8]) -> Option<ImageFormat> {
        if bytes.starts_with(&[0xFF, 0xD8]) {
            return Some(ImageFormat::Jpeg);
        }
        if bytes.starts_with(&[0x89, 0x50, 0x4E, 0x47, 0x0D, 0x0A, 0x1A, 0x0A]) {
            return Some(ImageFormat::Png);
        }
        if bytes.len() >= 12 && &bytes[0..4] == b"RIFF" && &bytes[8..12] == b"WEBP" {
            return Some(ImageFormat::Webp);
        }
        None
    }

    pub fn mime(&self) -> &'static str {
        match self {
            ImageFormat::Jpeg => "image/jpeg",
            ImageFormat::Png => "image/png",
            ImageFormat::Webp => "image/webp",
        }
    }
}

/// Validates image bytes, options, and capability presence for one
/// submission.
pub fn validate_submission(
    image: &[u8],
    options: &GenerationOptions,
    capabilities: &CapabilitySet,
) -> Result<(), OrchestratorError> {
    if image.is_empty() {
        return Err(invalid("imageBuffer", "image data is empty"));
    }
    if image.len() > MAX_IMAGE_BYTES {
        return Err(invalid(
            "imageBuffer",
            format!(
                "image is {} bytes, maximum is {} bytes",
                image.len(),
                MAX_IMAGE_BYTES
            ),
        ));
    }
    if ImageFormat::sniff(image).is_none() {
        return Err(invalid(
            "imageBuffer",
            "unsupported image format; expected JPEG, PNG, or WebP",
        ));
    }

    if let Some(brand) = &options.brand_name {
        if brand.chars().count() > MAX_BRAND_NAME_CHARS {
            return Err(invalid(
                "brandName",
                format!("brand name exceeds {MAX_BRAND_NAME_CHARS} characters"),
            ));
        }
    }
    if let Some(product) = &options.product_name {
        if product.chars().count() > MAX_PRODUCT_NAME_CHARS {
            return Err(invalid(
                "productName",
                format!("product name exceeds {MAX_PRODUCT_NAME_CHARS} characters"),
            ));
        }
    }

    if !(MIN_PACKAGE_VARIATIONS..=MAX_PACKAGE_VARIATIONS).contains(&options.package_variations) {
        return Err(invalid(
            "packageVariations",
            format!(
                "packageVariations must be between {MIN_PACKAGE_VARIATIONS} and {MAX_PACKAGE_VARIATIONS}"
            ),
        ));
    }

    // Capability presence for the stages this submission will run.
    if capabilities.analyzer.is_none() {
        return Err(invalid("claudeApiKey", "vision capability is not configured"));
    }
    let needs_images = !(options.skip_packages && options.skip_ads);
    if needs_images && capabilities.image_synthesizer.is_none() {
        return Err(invalid(
            "openaiApiKey",
            "image synthesis capability is not configured",
        ));
    }
    if !options.skip_texts && capabilities.text_synthesizer.is_none() {
        return Err(invalid(
            "claudeApiKey",
            "text synthesis capability is not configured",
        ));
    }

    Ok(())
}

fn invalid(field: &'static str, message: impl Into<String>) -> OrchestratorError {
    OrchestratorError::InvalidInput {
        field,
        message: message.into(),
    }
}
