// Upload pipeline: Ingest -> Normalize -> Record.
//
// Failure at any stage rolls back the files written so far; a record is
// only persisted once the final file is on disk, and exactly one file
// remains per successful upload.
mod error;
mod heif;
pub mod ingest;
pub mod normalize;

pub use error::UploadError;
pub use ingest::IngestedFile;
pub use normalize::{NormalizeAction, Normalizer, classify};

use axum::extract::Multipart;
use std::path::Path;
use tracing::{info, warn};

use crate::AppState;
use crate::store::PaintingRecord;

/// Run one upload through the full pipeline and return the persisted record.
pub async fn process_upload(
    state: &AppState,
    multipart: Multipart,
) -> Result<PaintingRecord, UploadError> {
    let config = &state.config;

    let ingested = ingest::ingest_field(
        multipart,
        &config.storage.upload_directory,
        config.upload.max_size_bytes(),
    )
    .await?;

    let normalizer = Normalizer::new(&config.upload);
    let normalized = match normalizer.normalize(&ingested).await {
        Ok(normalized) => normalized,
        Err(e) => {
            remove_quietly(&ingested.path).await;
            return Err(e);
        }
    };

    let (final_path, final_name) = match normalized {
        Some(normalized) => {
            if normalized.path != ingested.path {
                remove_quietly(&ingested.path).await;
            }
            (normalized.path, normalized.filename)
        }
        None => (ingested.path.clone(), ingested.stored_name.clone()),
    };

    let size = match tokio::fs::metadata(&final_path).await {
        Ok(metadata) => metadata.len(),
        Err(e) => {
            remove_quietly(&final_path).await;
            return Err(e.into());
        }
    };

    let record = PaintingRecord::new(final_name, ingested.original_name.clone(), size);
    if let Err(e) = state.store.add(record.clone()).await {
        // A record must never point at a file that was rolled back.
        remove_quietly(&final_path).await;
        return Err(UploadError::Persistence(e));
    }

    info!(
        "Uploaded {} as {} ({} bytes)",
        record.original_name, record.filename, record.size
    );
    Ok(record)
}

/// Best-effort file removal; a missing file is fine, anything else is logged.
pub(crate) async fn remove_quietly(path: &Path) {
    if let Err(e) = tokio::fs::remove_file(path).await
        && e.kind() != std::io::ErrorKind::NotFound
    {
        warn!("Failed to remove {:?}: {}", path, e);
    }
}
