//! Download bundle writer.
//!
//! Materializes the aggregated output tree for one finished job:
//!
//! ```text
//! {root}/{jobId}/analysis.json
//! {root}/{jobId}/packages/{style}.png     (one per successful package)
//! {root}/{jobId}/ads/{platform}.png       (one per successful platform)
//! {root}/{jobId}/texts.json
//! ```
//!
//! The tree is produced lazily on first request; serving or archiving it is
//! the transport layer's concern.

use std::path::{Path, PathBuf};

use thiserror::Error;

use crate::job::GenerationJob;

#[derive(Debug, Error)]
pub enum BundleError {
    #[error("job is not finished yet")]
    JobNotFinished,

    #[error("failed to create directory '{path}': {source}")]
    CreateDirectory {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to write '{path}': {source}")]
    WriteFile {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to serialize bundle entry: {0}")]
    Serialize(#[from] serde_json::Error),
}

/// Writes the job's bundle under `root` and returns the bundle directory.
/// Only fields of successful stages exist, so absent outputs are simply
/// absent from the tree.
pub fn write_bundle(root: &Path, job: &GenerationJob) -> Result<PathBuf, BundleError> {
    if !job.is_terminal() {
        return Err(BundleError::JobNotFinished);
    }

    let dir = root.join(job.id.to_string());
    create_dir(&dir)?;

    if let Some(analysis) = &job.result.analysis {
        write_file(&dir.join("analysis.json"), &serde_json::to_vec_pretty(analysis)?)?;
    }

    if let Some(packages) = &job.result.packages {
        let packages_dir = dir.join("packages");
        create_dir(&packages_dir)?;
        for design in packages {
            if design.image.data.is_empty() {
                continue;
            }
            write_file(
                &packages_dir.join(format!("{}.png", design.style.slug())),
                &design.image.data,
            )?;
        }
    }

    if let Some(ads) = &job.result.ads {
        let ads_dir = dir.join("ads");
        create_dir(&ads_dir)?;
        for ad in ads {
            if ad.image.data.is_empty() {
                continue;
            }
            write_file(
                &ads_dir.join(format!("{}.png", ad.platform.slug())),
                &ad.image.data,
            )?;
        }
    }

    if let Some(texts) = &job.result.texts {
        write_file(&dir.join("texts.json"), &serde_json::to_vec_pretty(texts)?)?;
    }

    Ok(dir)
}

fn create_dir(path: &Path) -> Result<(), BundleError> {
    std::fs::create_dir_all(path).map_err(|source| BundleError::CreateDirectory {
        path: path.to_path_buf(),
        source,
    })
}

fn write_file(path: &Path, data: &[u8]) -> Result<(), BundleError> {
    std::fs::write(path, data).map_err(|source| BundleError::WriteFile {
        path: path.to_path_buf(),
        source,
    })
}
