//! Capability contracts for the external generative services.
//!
//! The orchestrator is polymorphic over three capabilities: vision
//! analysis, image synthesis, and text synthesis. Production wiring uses
//! the HTTP clients in [`anthropic`] and [`openai`]; tests substitute
//! deterministic fakes programmed to emit any error kind and latency.

pub mod anthropic;
pub mod openai;

use std::sync::Arc;

use async_trait::async_trait;
use thiserror::Error;

use crate::analysis::ProductAnalysis;
use crate::catalog::ImageSize;
use crate::config::ProviderSettings;
use crate::error::ErrorKind;
use crate::job::{Catchcopy, GenerationOptions, ProductDescription, SeoText, SynthesizedImage};

pub use anthropic::AnthropicClient;
pub use openai::OpenAiImageClient;

/// Failure raised at the capability boundary, already classified.
#[derive(Debug, Clone, Error)]
pub enum CapabilityError {
    /// The service rejected the image itself; never retried.
    #[error("image rejected: {0}")]
    BadImage(String),

    /// Credentials rejected; never retried.
    #[error("authentication rejected: {0}")]
    Auth(String),

    /// Upstream rate limit; retried with backoff.
    #[error("rate limited: {0}")]
    RateLimit(String),

    /// The call's own deadline elapsed.
    #[error("timed out: {0}")]
    Timeout(String),

    /// Transport-level failure; retried.
    #[error("network failure: {0}")]
    Network(String),

    /// 5xx-class upstream failure; retried.
    #[error("transient upstream failure: {0}")]
    Transient(String),

    /// Semantic rejection (malformed response, empty result); never
    /// retried.
    #[error("upstream rejection: {0}")]
    Fatal(String),
}

impl CapabilityError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            CapabilityError::BadImage(_) | CapabilityError::Fatal(_) => ErrorKind::Fatal,
            CapabilityError::Auth(_) => ErrorKind::AuthError,
            CapabilityError::RateLimit(_) => ErrorKind::RateLimit,
            CapabilityError::Timeout(_) => ErrorKind::Timeout,
            CapabilityError::Network(_) => ErrorKind::NetworkError,
            CapabilityError::Transient(_) => ErrorKind::Transient,
        }
    }

    pub fn is_retryable(&self) -> bool {
        self.kind().is_retryable()
    }
}

/// Request for one synthesized image.
#[derive(Debug, Clone)]
pub struct ImageRequest {
    pub prompt: String,
    pub size: ImageSize,
}

/// Structured context handed to the text capability.
#[derive(Debug, Clone)]
pub struct TextContext {
    pub analysis: ProductAnalysis,
    pub brand_name: Option<String>,
    pub product_name: Option<String>,
    pub tone: Option<String>,
    pub language: Option<String>,
}

impl TextContext {
    pub fn new(analysis: ProductAnalysis, options: &GenerationOptions) -> Self {
        Self {
            analysis,
            brand_name: options.brand_name.clone(),
            product_name: options.product_name.clone(),
            tone: options.tone.clone(),
            language: options.language.clone(),
        }
    }
}

/// Vision capability: turns raw image bytes into a structured analysis.
#[async_trait]
pub trait Analyzer: Send + Sync {
    async fn analyze(&self, image: &[u8]) -> Result<ProductAnalysis, CapabilityError>;
}

/// Image synthesis capability.
#[async_trait]
pub trait ImageSynthesizer: Send + Sync {
    async fn synthesize(&self, request: &ImageRequest) -> Result<SynthesizedImage, CapabilityError>;
}

/// Text synthesis capability: three independent sub-generations assembled
/// into one bundle by the text stage.
#[async_trait]
pub trait TextSynthesizer: Send + Sync {
    async fn description(&self, ctx: &TextContext) -> Result<ProductDescription, CapabilityError>;
    async fn catchcopy(&self, ctx: &TextContext) -> Result<Catchcopy, CapabilityError>;
    async fn seo(&self, ctx: &TextContext) -> Result<SeoText, CapabilityError>;
}

/// The capabilities available to an orchestrator instance.
///
/// Fields are optional so deployments that skip a stage class entirely need
/// no credentials for it; validation checks presence against the submission
/// flags before any job is created.
#[derive(Clone, Default)]
pub struct CapabilitySet {
    pub analyzer: Option<Arc<dyn Analyzer>>,
    pub image_synthesizer: Option<Arc<dyn ImageSynthesizer>>,
    pub text_synthesizer: Option<Arc<dyn TextSynthesizer>>,
}

impl CapabilitySet {
    pub fn new(
        analyzer: Arc<dyn Analyzer>,
        image_synthesizer: Arc<dyn ImageSynthesizer>,
        text_synthesizer: Arc<dyn TextSynthesizer>,
    ) -> Self {
        Self {
            analyzer: Some(analyzer),
            image_synthesizer: Some(image_synthesizer),
            text_synthesizer: Some(text_synthesizer),
        }
    }

    /// Builds production clients from environment-derived settings. A
    /// capability is absent when its key is missing; validation rejects
    /// submissions that would need it.
    pub fn from_settings(settings: &ProviderSettings) -> Self {
        let anthropic = settings.anthropic_api_key.as_ref().map(|key| {
            Arc::new(AnthropicClient::new(
                key.clone(),
                settings.anthropic_model.clone(),
            ))
        });
        let openai = settings.openai_api_key.as_ref().map(|key| {
            Arc::new(OpenAiImageClient::new(
                key.clone(),
                settings.openai_image_model.clone(),
            )) as Arc<dyn ImageSynthesizer>
        });

        Self {
            analyzer: anthropic
                .clone()
                .map(|c| c as Arc<dyn Analyzer>),
            image_synthesizer: openai,
            text_synthesizer: anthropic.map(|c| c as Arc<dyn TextSynthesizer>),
        }
    }
}

/// Maps an HTTP response status onto the capability error taxonomy.
/// Statuses with no specific classification are treated as transient.
pub(crate) fn classify_status(status: reqwest::StatusCode, body: &str) -> CapabilityError {
    let detail = if body.is_empty() {
        format!("status {status}")
    } else {
        let trimmed: String = body.chars().take(300).collect();
        format!("status {status}: {trimmed}")
    };

    match status.as_u16() {
        401 | 403 => CapabilityError::Auth(detail),
        408 => CapabilityError::Timeout(detail),
        429 => CapabilityError::RateLimit(detail),
        400..=499 => CapabilityError::Fatal(detail),
        _ => CapabilityError::Transient(detail),
    }
}

/// Maps a transport-level `reqwest` failure.
pub(crate) fn classify_transport(err: reqwest::Error) -> CapabilityError {
    if err.is_timeout() {
        CapabilityError::Timeout(err.to_string())
    } else {
        CapabilityError::Network(err.to_string())
    }
}
