//! Admission control.
//!
//! A fixed pool of permits caps the number of concurrently active jobs.
//! There is no waiting room: when the pool is empty, submission is rejected
//! synchronously and the caller retries.

use std::sync::Arc;

use tokio::sync::{OwnedSemaphorePermit, Semaphore};

use crate::error::OrchestratorError;

/// RAII admission slot. Dropping it (when the job terminates) frees the
/// slot for the next submission.
#[derive(Debug)]
pub struct AdmissionPermit {
    _permit: OwnedSemaphorePermit,
}

#[derive(Debug)]
pub struct Scheduler {
    semaphore: Arc<Semaphore>,
    max_concurrent: usize,
}

impl Scheduler {
    pub fn new(max_concurrent: usize) -> Self {
        Self {
            semaphore: Arc::new(Semaphore::new(max_concurrent)),
            max_concurrent,
        }
    }

    /// Attempts to admit one job. Fails immediately with
    /// `CapacityExhausted` when the cap is reached.
    pub fn try_admit(&self) -> Result<AdmissionPermit, OrchestratorError> {
        match Arc::clone(&self.semaphore).try_acquire_owned() {
            Ok(permit) => Ok(AdmissionPermit { _permit: permit }),
            Err(_) => Err(OrchestratorError::CapacityExhausted {
                current: self.active(),
                max: self.max_concurrent,
            }),
        }
    }

    /// Number of jobs currently holding an admission slot.
    pub fn active(&self) -> usize {
        self.max_concurrent - self.semaphore.available_permits()
    }

    pub fn max_concurrent(&self) -> usize {
        self.max_concurrent
    }
}
