use std::sync::Arc;

use tokio_util::sync::CancellationToken;
use uuid::Uuid;

use crate::capabilities::CapabilitySet;
use crate::config::OrchestratorConfig;
use crate::job::GenerationOptions;

/// Everything one pipeline run needs. The executor owns the image bytes
/// for the lifetime of the job; they are released when the run ends.
pub struct PipelineContext {
    pub job_id: Uuid,
    pub image: Vec<u8>,
    pub options: GenerationOptions,
    pub capabilities: CapabilitySet,
    pub config: Arc<OrchestratorConfig>,
    /// Observed at every suspension point; fired by cancel/delete.
    pub cancel: CancellationToken,
}
