//! In-process orchestration engine that turns a single product
//! image into a bundle of marketing assets: package-design variations,
//! platform-sized ad images, and marketing texts.
//!
//! The engine sequences a stage DAG (analysis, then parallel package / ad /
//! text generation) over three external generative capabilities, enforces a
//! global concurrency cap, publishes fine-grained progress to subscribers,
//! and tolerates partial downstream failure.

pub mod analysis;
pub mod bundle;
pub mod capabilities;
pub mod catalog;
pub mod config;
pub mod error;
pub mod job;
pub mod orchestrator;
pub mod pipeline;
pub mod progress;
pub mod reaper;
pub mod scheduler;
pub mod store;
pub mod validation;

pub use analysis::{ColorPalette, ProductAnalysis, ShapeKind, ShapeProfile, SurfaceTexture};
pub use capabilities::{
    Analyzer, AnthropicClient, CapabilityError, CapabilitySet, ImageRequest, ImageSynthesizer,
    OpenAiImageClient, TextContext, TextSynthesizer,
};
pub use catalog::{select_template, AdPlatform, ImageSize, VariationStyle};
pub use config::{
    load_config, load_config_from_str, ConfigError, OrchestratorConfig, ProviderSettings,
    RetryPolicy, StageTimeouts,
};
pub use error::{ErrorKind, OrchestratorError, StageError};
pub use job::{
    AdImage, Catchcopy, GenerationJob, GenerationOptions, GenerationResult, JobStatus,
    PackageDesign, ProductDescription, SeoText, Stage, StageProgress, StageStatus,
    SynthesizedImage, TextBundle,
};
pub use orchestrator::{Orchestrator, StatusSnapshot, SubmitReceipt, SystemStatus};
pub use progress::{ProgressCallback, ProgressEvent, ProgressEventKind, Subscription};
pub use store::JobStore;
pub use validation::ImageFormat;
