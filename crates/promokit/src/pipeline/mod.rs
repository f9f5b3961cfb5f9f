//! Async stage pipeline.
//!
//! One job runs through an ordered DAG: analysis first as a sequential
//! gate, then the packages / ads / texts branches concurrently. Analysis
//! failure is fatal to the job; branch failures are recorded on the stage
//! only and the job still completes.

mod context;
mod retry;
mod runner;
pub(crate) mod stages;

pub use context::PipelineContext;
pub use runner::PipelineRunner;
