use axum::extract::Multipart;
use std::path::{Path, PathBuf};
use tracing::debug;

use super::UploadError;

/// The multipart field the admin panel submits.
pub const UPLOAD_FIELD: &str = "painting";

/// Extensions accepted for ingest. HEIC/HEIF often arrives with a generic
/// media type, so the extension check is authoritative for those.
const IMAGE_EXTENSIONS: &[&str] = &[
    "jpg", "jpeg", "png", "gif", "bmp", "webp", "heic", "heif",
];

/// An uploaded file durably staged under a collision-free name.
#[derive(Debug)]
pub struct IngestedFile {
    pub path: PathBuf,
    pub stored_name: String,
    pub original_name: String,
    pub content_type: Option<String>,
    pub size: u64,
}

pub fn extension_of(file_name: &str) -> Option<String> {
    Path::new(file_name)
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_lowercase())
}

fn is_acceptable(content_type: Option<&str>, original_name: &str) -> bool {
    if content_type.is_some_and(|t| t.starts_with("image/")) {
        return true;
    }
    extension_of(original_name).is_some_and(|ext| IMAGE_EXTENSIONS.contains(&ext.as_str()))
}

/// Accept the single `painting` field from a multipart request and stage it
/// under `<upload_dir>/<uuid>.<ext>`.
///
/// Validation failures happen before the write, so a rejected upload leaves
/// nothing in the uploads directory.
pub async fn ingest_field(
    mut multipart: Multipart,
    upload_dir: &Path,
    max_bytes: u64,
) -> Result<IngestedFile, UploadError> {
    while let Ok(Some(field)) = multipart.next_field().await {
        if field.name() != Some(UPLOAD_FIELD) {
            continue;
        }

        let original_name = field
            .file_name()
            .map(|s| s.to_string())
            .filter(|s| !s.is_empty())
            .ok_or_else(|| UploadError::Validation("no filename provided".to_string()))?;
        let content_type = field.content_type().map(|s| s.to_string());

        let bytes = field.bytes().await.map_err(|e| {
            UploadError::Validation(format!("failed to read uploaded file: {}", e))
        })?;

        if bytes.is_empty() {
            return Err(UploadError::Validation("uploaded file is empty".to_string()));
        }
        if bytes.len() as u64 > max_bytes {
            return Err(UploadError::Validation(format!(
                "file too large: {} bytes (limit {} bytes)",
                bytes.len(),
                max_bytes
            )));
        }
        if !is_acceptable(content_type.as_deref(), &original_name) {
            return Err(UploadError::Validation(format!(
                "not an accepted image type: {}",
                original_name
            )));
        }

        let extension = extension_of(&original_name).unwrap_or_else(|| {
            // image/* media type with no usable extension; jpg is the safest
            // default since everything gets normalized toward JPEG anyway.
            "jpg".to_string()
        });
        let stored_name = format!("{}.{}", uuid::Uuid::new_v4(), extension);
        let path = upload_dir.join(&stored_name);

        let size = bytes.len() as u64;
        tokio::fs::write(&path, &bytes).await?;
        debug!(
            "Ingested {} ({} bytes) as {:?}",
            original_name, size, path
        );

        return Ok(IngestedFile {
            path,
            stored_name,
            original_name,
            content_type,
            size,
        });
    }

    Err(UploadError::Validation(
        "no painting file in request".to_string(),
    ))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn image_media_type_is_accepted() {
        assert!(is_acceptable(Some("image/png"), "whatever.dat"));
        assert!(is_acceptable(Some("image/jpeg"), "photo"));
    }

    #[test]
    fn heic_with_generic_media_type_is_accepted_by_extension() {
        assert!(is_acceptable(Some("application/octet-stream"), "IMG_0001.HEIC"));
        assert!(is_acceptable(None, "shot.heif"));
    }

    #[test]
    fn non_image_is_rejected() {
        assert!(!is_acceptable(Some("text/plain"), "notes.txt"));
        assert!(!is_acceptable(None, "archive.zip"));
        assert!(!is_acceptable(None, "no_extension"));
    }

    #[test]
    fn extension_is_lowercased() {
        assert_eq!(extension_of("A.PNG"), Some("png".to_string()));
        assert_eq!(extension_of("b.tar.gz"), Some("gz".to_string()));
        assert_eq!(extension_of("none"), None);
    }
}
