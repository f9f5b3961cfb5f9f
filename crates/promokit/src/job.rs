//! Job data model: statuses, submission options, and the incrementally
//! filled result bundle.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::analysis::ProductAnalysis;
use crate::catalog::{AdPlatform, VariationStyle};

/// Overall status of a generation job.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JobStatus {
    Pending,
    Processing,
    Completed,
    Failed,
}

impl JobStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(self, JobStatus::Completed | JobStatus::Failed)
    }
}

impl std::fmt::Display for JobStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            JobStatus::Pending => write!(f, "pending"),
            JobStatus::Processing => write!(f, "processing"),
            JobStatus::Completed => write!(f, "completed"),
            JobStatus::Failed => write!(f, "failed"),
        }
    }
}

/// Status of a single pipeline stage.
///
/// `Skipped` is assigned at creation time from the submission options and is
/// never rewritten afterwards.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StageStatus {
    Pending,
    Processing,
    Done,
    Failed,
    Skipped,
}

impl StageStatus {
    pub fn is_settled(&self) -> bool {
        matches!(
            self,
            StageStatus::Done | StageStatus::Failed | StageStatus::Skipped
        )
    }
}

/// The four pipeline stages, in DAG order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    Analysis,
    Packages,
    Ads,
    Texts,
}

impl Stage {
    pub const ALL: [Stage; 4] = [Stage::Analysis, Stage::Packages, Stage::Ads, Stage::Texts];

    pub fn as_str(&self) -> &'static str {
        match self {
            Stage::Analysis => "analysis",
            Stage::Packages => "packages",
            Stage::Ads => "ads",
            Stage::Texts => "texts",
        }
    }
}

impl std::fmt::Display for Stage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Per-stage status map for one job.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StageProgress {
    pub analysis: StageStatus,
    pub packages: StageStatus,
    pub ads: StageStatus,
    pub texts: StageStatus,
}

impl StageProgress {
    /// Initial map for a fresh job: `Skipped` where the options ask for it,
    /// `Pending` otherwise. Analysis can never be skipped.
    pub fn for_options(options: &GenerationOptions) -> Self {
        let skip = |flag: bool| {
            if flag {
                StageStatus::Skipped
            } else {
                StageStatus::Pending
            }
        };
        Self {
            analysis: StageStatus::Pending,
            packages: skip(options.skip_packages),
            ads: skip(options.skip_ads),
            texts: skip(options.skip_texts),
        }
    }

    pub fn stage(&self, stage: Stage) -> StageStatus {
        match stage {
            Stage::Analysis => self.analysis,
            Stage::Packages => self.packages,
            Stage::Ads => self.ads,
            Stage::Texts => self.texts,
        }
    }

    pub fn set(&mut self, stage: Stage, status: StageStatus) {
        match stage {
            Stage::Analysis => self.analysis = status,
            Stage::Packages => self.packages = status,
            Stage::Ads => self.ads = status,
            Stage::Texts => self.texts = status,
        }
    }

    /// True when every stage has reached a settled state.
    pub fn all_settled(&self) -> bool {
        Stage::ALL.iter().all(|s| self.stage(*s).is_settled())
    }
}

/// Frozen copy of the submission options attached to a job.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct GenerationOptions {
    pub brand_name: Option<String>,
    pub product_name: Option<String>,
    /// Number of package-design variations, in [1, 10].
    pub package_variations: usize,
    /// Explicit package template; auto-selected from the analysis when
    /// absent.
    pub package_template: Option<String>,
    /// Platforms to generate ad images for; the configured default set is
    /// substituted when empty.
    pub ad_platforms: Vec<AdPlatform>,
    pub skip_packages: bool,
    pub skip_ads: bool,
    pub skip_texts: bool,
    /// Desired tone for generated texts, e.g. "casual" or "formal".
    pub tone: Option<String>,
    /// Output language for generated texts, e.g. "en" or "ja".
    pub language: Option<String>,
}

impl Default for GenerationOptions {
    fn default() -> Self {
        Self {
            brand_name: None,
            product_name: None,
            package_variations: 3,
            package_template: None,
            ad_platforms: AdPlatform::defaults(),
            skip_packages: false,
            skip_ads: false,
            skip_texts: false,
            tone: None,
            language: None,
        }
    }
}

/// One synthesized image plus provider metadata.
///
/// Raw bytes are kept out of serialized events; they are only materialized
/// into the download bundle.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SynthesizedImage {
    #[serde(skip)]
    pub data: Vec<u8>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub revised_prompt: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub seed: Option<u64>,
}

/// One package-design variation.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PackageDesign {
    pub style: VariationStyle,
    pub template: String,
    pub image: SynthesizedImage,
}

/// One platform-sized advertising image.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AdImage {
    pub platform: AdPlatform,
    pub width: u32,
    pub height: u32,
    pub image: SynthesizedImage,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProductDescription {
    pub long: String,
    pub short: String,
    #[serde(default)]
    pub bullets: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Catchcopy {
    pub main: String,
    #[serde(default)]
    pub variations: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SeoText {
    pub title: String,
    pub description: String,
    #[serde(default)]
    pub keywords: Vec<String>,
}

/// The three marketing-text sub-bundles assembled by the text stage.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TextBundle {
    pub description: ProductDescription,
    pub catchcopy: Catchcopy,
    pub seo: SeoText,
}

/// Per-stage outputs, filled in as stages complete. A field is only ever
/// populated after its producing stage reached `Done`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerationResult {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub analysis: Option<ProductAnalysis>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub packages: Option<Vec<PackageDesign>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ads: Option<Vec<AdImage>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub texts: Option<TextBundle>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub download_url: Option<String>,
}

impl GenerationResult {
    pub fn is_empty(&self) -> bool {
        self.analysis.is_none()
            && self.packages.is_none()
            && self.ads.is_none()
            && self.texts.is_none()
    }
}

/// A single generation job: status, per-stage progress, frozen options,
/// timestamps, and the incrementally built result.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerationJob {
    pub id: Uuid,
    pub status: JobStatus,
    pub progress: StageProgress,
    pub options: GenerationOptions,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub completed_at: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    pub result: GenerationResult,
}

impl GenerationJob {
    pub fn new(options: GenerationOptions) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            status: JobStatus::Pending,
            progress: StageProgress::for_options(&options),
            options,
            created_at: now,
            updated_at: now,
            completed_at: None,
            error: None,
            result: GenerationResult::default(),
        }
    }

    pub fn is_terminal(&self) -> bool {
        self.status.is_terminal()
    }

    /// The result bundle as exposed through the query surface: present only
    /// once the job is terminal and at least one stage produced output.
    pub fn result_snapshot(&self) -> Option<GenerationResult> {
        if self.is_terminal() && !self.result.is_empty() {
            Some(self.result.clone())
        } else {
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_job_is_pending() {
        let job = GenerationJob::new(GenerationOptions::default());
        assert_eq!(job.status, JobStatus::Pending);
        assert_eq!(job.progress.analysis, StageStatus::Pending);
        assert_eq!(job.progress.packages, StageStatus::Pending);
        assert!(job.error.is_none());
        assert!(job.completed_at.is_none());
        assert!(job.result.is_empty());
        assert_eq!(job.created_at, job.updated_at);
    }

    #[test]
    fn test_progress_respects_skip_flags() {
        let options = GenerationOptions {
            skip_packages: true,
            skip_ads: true,
            ..Default::default()
        };
        let progress = StageProgress::for_options(&options);
        assert_eq!(progress.analysis, StageStatus::Pending);
        assert_eq!(progress.packages, StageStatus::Skipped);
        assert_eq!(progress.ads, StageStatus::Skipped);
        assert_eq!(progress.texts, StageStatus::Pending);
    }

    #[test]
    fn test_all_settled() {
        let mut progress = StageProgress::for_options(&GenerationOptions::default());
        assert!(!progress.all_settled());
        progress.set(Stage::Analysis, StageStatus::Done);
        progress.set(Stage::Packages, StageStatus::Failed);
        progress.set(Stage::Ads, StageStatus::Done);
        assert!(!progress.all_settled());
        progress.set(Stage::Texts, StageStatus::Done);
        assert!(progress.all_settled());
    }

    #[test]
    fn test_options_default_round_trip() {
        let options: GenerationOptions = serde_json::from_str("{}").unwrap();
        assert_eq!(options.package_variations, 3);
        assert_eq!(options.ad_platforms.len(), 4);
        assert!(!options.skip_texts);
    }

    #[test]
    fn test_result_snapshot_only_when_terminal() {
        let mut job = GenerationJob::new(GenerationOptions::default());
        job.result.download_url = Some("/downloads/x".into());
        // download_url alone does not make the result non-empty
        assert!(job.result.is_empty());

        job.result.texts = Some(TextBundle {
            description: ProductDescription {
                long: "l".into(),
                short: "s".into(),
                bullets: vec![],
            },
            catchcopy: Catchcopy {
                main: "m".into(),
                variations: vec![],
            },
            seo: SeoText {
                title: "t".into(),
                description: "d".into(),
                keywords: vec![],
            },
        });
        assert!(job.result_snapshot().is_none(), "non-terminal job exposes no result");

        job.status = JobStatus::Completed;
        assert!(job.result_snapshot().is_some());
    }

    #[test]
    fn test_synthesized_image_bytes_not_serialized() {
        let image = SynthesizedImage {
            data: vec![1, 2, 3],
            url: None,
            revised_prompt: Some("a red can".into()),
            seed: Some(42),
        };
        let json = serde_json::to_value(&image).unwrap();
        assert!(json.get("data").is_none());
        assert_eq!(json["revisedPrompt"], "a red can");
    }
}
