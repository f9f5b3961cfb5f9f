//! Deterministic fake capabilities.
//!
//! Each fake can be scripted per call: the behavior closure receives the
//! zero-based call number and returns the outcome, which lets tests model
//! flaky services ("fail twice, then succeed"), permanent failures, and
//! slow upstreams.

#![allow(dead_code)]

use std::io::Cursor;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;
use std::time::Duration;

use promokit::{
    Analyzer, CapabilityError, Catchcopy, ImageRequest, ImageSynthesizer, ProductAnalysis,
    ProductDescription, SeoText, SynthesizedImage, TextContext, TextSynthesizer,
};

/// The canonical analyzer output used across the suite: a red beverage can.
pub fn sample_analysis() -> ProductAnalysis {
    serde_json::from_str(
        r##"{
            "category": "beverage",
            "colors": {"primary": "#FF0000", "secondary": ["#FFFFFF"], "palette": ["#FF0000", "#FFFFFF"]},
            "shape": {"kind": "cylindrical", "dimensions": {"width": 0.4, "height": 1.0, "depth": 0.4}},
            "surface": "glossy",
            "confidence": 0.9
        }"##,
    )
    .unwrap()
}

pub fn sample_description() -> ProductDescription {
    ProductDescription {
        long: "A refreshing red beverage with a bold, fruity taste that stands out on any shelf."
            .into(),
        short: "Bold red refreshment.".into(),
        bullets: vec!["Fruity".into(), "Refreshing".into(), "Iconic red".into()],
    }
}

pub fn sample_catchcopy() -> Catchcopy {
    Catchcopy {
        main: "Taste the red.".into(),
        variations: vec!["Red done right.".into(), "Boldly refreshing.".into()],
    }
}

pub fn sample_seo() -> SeoText {
    SeoText {
        title: "Red Beverage | TestBrand".into(),
        description: "A bold red beverage from TestBrand.".into(),
        keywords: vec!["beverage".into(), "red".into(), "refreshing".into()],
    }
}

type AnalyzerScript =
    Arc<dyn Fn(u32) -> Result<ProductAnalysis, CapabilityError> + Send + Sync>;

pub struct FakeAnalyzer {
    pub calls: Arc<AtomicU32>,
    delay: Duration,
    script: AnalyzerScript,
}

impl FakeAnalyzer {
    /// Always succeeds with [`sample_analysis`].
    pub fn ok() -> Self {
        Self::scripted(|_| Ok(sample_analysis()))
    }

    /// Always fails with the error produced by `make_error`.
    pub fn failing(
        make_error: impl Fn() -> CapabilityError + Send + Sync + 'static,
    ) -> Self {
        Self::scripted(move |_| Err(make_error()))
    }

    pub fn scripted(
        script: impl Fn(u32) -> Result<ProductAnalysis, CapabilityError> + Send + Sync + 'static,
    ) -> Self {
        Self {
            calls: Arc::new(AtomicU32::new(0)),
            delay: Duration::ZERO,
            script: Arc::new(script),
        }
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    pub fn call_count(&self) -> u32 {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait::async_trait]
impl Analyzer for FakeAnalyzer {
    async fn analyze(&self, _image: &[u8]) -> Result<ProductAnalysis, CapabilityError> {
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }
        let call = self.calls.fetch_add(1, Ordering::SeqCst);
        (self.script)(call)
    }
}

type ImageScript = Arc<dyn Fn(u32) -> Result<(), CapabilityError> + Send + Sync>;

pub struct FakeImageSynthesizer {
    pub calls: Arc<AtomicU32>,
    delay: Duration,
    /// Decodable PNG returned on success; ads must survive a real resize.
    payload: Arc<Vec<u8>>,
    script: ImageScript,
}

impl FakeImageSynthesizer {
    pub fn ok() -> Self {
        Self::scripted(|_| Ok(()))
    }

    pub fn failing(
        make_error: impl Fn() -> CapabilityError + Send + Sync + 'static,
    ) -> Self {
        Self::scripted(move |_| Err(make_error()))
    }

    pub fn scripted(
        script: impl Fn(u32) -> Result<(), CapabilityError> + Send + Sync + 'static,
    ) -> Self {
        Self {
            calls: Arc::new(AtomicU32::new(0)),
            delay: Duration::ZERO,
            payload: Arc::new(encoded_png(64, 64)),
            script: Arc::new(script),
        }
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    pub fn call_count(&self) -> u32 {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait::async_trait]
impl ImageSynthesizer for FakeImageSynthesizer {
    async fn synthesize(
        &self,
        request: &ImageRequest,
    ) -> Result<SynthesizedImage, CapabilityError> {
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }
        let call = self.calls.fetch_add(1, Ordering::SeqCst);
        (self.script)(call)?;
        Ok(SynthesizedImage {
            data: self.payload.as_ref().clone(),
            url: None,
            revised_prompt: Some(request.prompt.clone()),
            seed: Some(u64::from(call)),
        })
    }
}

type TextScript = Arc<dyn Fn(u32) -> Result<(), CapabilityError> + Send + Sync>;

pub struct FakeTextSynthesizer {
    pub calls: Arc<AtomicU32>,
    delay: Duration,
    script: TextScript,
}

impl FakeTextSynthesizer {
    pub fn ok() -> Self {
        Self::scripted(|_| Ok(()))
    }

    pub fn failing(
        make_error: impl Fn() -> CapabilityError + Send + Sync + 'static,
    ) -> Self {
        Self::scripted(move |_| Err(make_error()))
    }

    pub fn scripted(
        script: impl Fn(u32) -> Result<(), CapabilityError> + Send + Sync + 'static,
    ) -> Self {
        Self {
            calls: Arc::new(AtomicU32::new(0)),
            delay: Duration::ZERO,
            script: Arc::new(script),
        }
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    async fn gate(&self) -> Result<(), CapabilityError> {
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }
        let call = self.calls.fetch_add(1, Ordering::SeqCst);
        (self.script)(call)
    }
}

#[async_trait::async_trait]
impl TextSynthesizer for FakeTextSynthesizer {
    async fn description(
        &self,
        _ctx: &TextContext,
    ) -> Result<ProductDescription, CapabilityError> {
        self.gate().await?;
        Ok(sample_description())
    }

    async fn catchcopy(&self, _ctx: &TextContext) -> Result<Catchcopy, CapabilityError> {
        self.gate().await?;
        Ok(sample_catchcopy())
    }

    async fn seo(&self, _ctx: &TextContext) -> Result<SeoText, CapabilityError> {
        self.gate().await?;
        Ok(sample_seo())
    }
}

/// Encodes a solid red PNG of the given dimensions.
pub fn encoded_png(width: u32, height: u32) -> Vec<u8> {
    let img = image::RgbImage::from_pixel(width, height, image::Rgb([220, 20, 20]));
    let mut buffer = Cursor::new(Vec::new());
    image::DynamicImage::ImageRgb8(img)
        .write_to(&mut buffer, image::ImageFormat::Png)
        .unwrap();
    buffer.into_inner()
}

/// Encodes a solid red JPEG of the given dimensions.
pub fn encoded_jpeg(width: u32, height: u32) -> Vec<u8> {
    let img = image::RgbImage::from_pixel(width, height, image::Rgb([220, 20, 20]));
    let mut buffer = Cursor::new(Vec::new());
    image::DynamicImage::ImageRgb8(img)
        .write_to(&mut buffer, image::ImageFormat::Jpeg)
        .unwrap();
    buffer.into_inner()
}
