//! Orchestrator harness for integration tests.
//!
//! Builds an [`Orchestrator`] over fake capabilities with timings shrunk to
//! keep the suite fast: millisecond backoff and pacing, reaper disabled
//! unless a test turns it on.

#![allow(dead_code)]

use std::sync::{Arc, Mutex};

use promokit::{
    Analyzer, CapabilitySet, ImageSynthesizer, Orchestrator, OrchestratorConfig, ProgressCallback,
    ProgressEvent, ProgressEventKind, RetryPolicy, TextSynthesizer,
};

use super::fakes::{FakeAnalyzer, FakeImageSynthesizer, FakeTextSynthesizer};

/// Config with test-friendly timings; semantics match the defaults.
pub fn test_config() -> OrchestratorConfig {
    OrchestratorConfig {
        cleanup_interval_millis: 0,
        retry: RetryPolicy {
            max_attempts: 3,
            initial_backoff_millis: 2,
            multiplier: 2.0,
        },
        pacing_pause_millis: 2,
        ..Default::default()
    }
}

pub struct HarnessBuilder {
    config: OrchestratorConfig,
    analyzer: Arc<dyn Analyzer>,
    image_synthesizer: Arc<dyn ImageSynthesizer>,
    text_synthesizer: Arc<dyn TextSynthesizer>,
}

impl HarnessBuilder {
    pub fn config(mut self, config: OrchestratorConfig) -> Self {
        self.config = config;
        self
    }

    pub fn analyzer(mut self, analyzer: impl Analyzer + 'static) -> Self {
        self.analyzer = Arc::new(analyzer);
        self
    }

    pub fn image_synthesizer(mut self, synthesizer: impl ImageSynthesizer + 'static) -> Self {
        self.image_synthesizer = Arc::new(synthesizer);
        self
    }

    pub fn text_synthesizer(mut self, synthesizer: impl TextSynthesizer + 'static) -> Self {
        self.text_synthesizer = Arc::new(synthesizer);
        self
    }

    pub fn build(self) -> TestHarness {
        let capabilities = CapabilitySet::new(
            self.analyzer,
            self.image_synthesizer,
            self.text_synthesizer,
        );
        TestHarness {
            orchestrator: Orchestrator::new(self.config, capabilities).unwrap(),
        }
    }
}

pub struct TestHarness {
    pub orchestrator: Orchestrator,
}

impl TestHarness {
    /// All capabilities succeed instantly.
    pub fn all_ok() -> Self {
        Self::builder().build()
    }

    pub fn builder() -> HarnessBuilder {
        HarnessBuilder {
            config: test_config(),
            analyzer: Arc::new(FakeAnalyzer::ok()),
            image_synthesizer: Arc::new(FakeImageSynthesizer::ok()),
            text_synthesizer: Arc::new(FakeTextSynthesizer::ok()),
        }
    }
}

/// Collects every event a subscriber sees, for ordering assertions.
#[derive(Clone, Default)]
pub struct EventLog {
    events: Arc<Mutex<Vec<ProgressEvent>>>,
}

impl EventLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn callback(&self) -> ProgressCallback {
        let sink = Arc::clone(&self.events);
        Box::new(move |event| sink.lock().unwrap().push(event))
    }

    pub fn events(&self) -> Vec<ProgressEvent> {
        self.events.lock().unwrap().clone()
    }

    pub fn kinds(&self) -> Vec<ProgressEventKind> {
        self.events().iter().map(|e| e.kind).collect()
    }

    pub fn terminal_count(&self) -> usize {
        self.events().iter().filter(|e| e.is_terminal()).count()
    }

    pub fn len(&self) -> usize {
        self.events.lock().unwrap().len()
    }
}
