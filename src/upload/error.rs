use axum::http::StatusCode;
use thiserror::Error;

use crate::store::StoreError;

#[derive(Debug, Error)]
pub enum UploadError {
    /// Bad, missing or oversize file. Rejected before any application write.
    #[error("{0}")]
    Validation(String),

    /// Every transcoding path for this file failed. Terminal per upload.
    #[error("image transcoding failed: {0}")]
    Transcode(String),

    #[error("failed to persist painting metadata: {0}")]
    Persistence(#[from] StoreError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("image error: {0}")]
    Image(#[from] image::ImageError),
}

impl UploadError {
    pub fn status(&self) -> StatusCode {
        match self {
            UploadError::Validation(_) => StatusCode::BAD_REQUEST,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}
