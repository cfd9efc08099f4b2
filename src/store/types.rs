use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// One catalog entry describing an uploaded painting.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct PaintingRecord {
    /// Opaque unique identifier, generated at creation. Sole lookup key.
    pub id: String,
    /// Name of the stored file under the uploads directory.
    pub filename: String,
    /// Client-supplied filename, kept for display only. Never used for paths.
    pub original_name: String,
    /// Publicly servable path derived from `filename`.
    pub image_url: String,
    /// Creation timestamp. Sole sort key (descending).
    pub date: DateTime<Utc>,
    /// Byte length of the stored file.
    pub size: u64,
}

impl PaintingRecord {
    pub fn new(filename: String, original_name: String, size: u64) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            image_url: format!("/uploads/{}", filename),
            filename,
            original_name,
            date: Utc::now(),
            size,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GalleryStats {
    pub total_paintings: usize,
    pub total_size: u64,
    pub first_painting: Option<DateTime<Utc>>,
    pub latest_painting: Option<DateTime<Utc>>,
}
