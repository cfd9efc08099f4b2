use axum::{
    body::Body,
    http::{StatusCode, header},
    response::{IntoResponse, Response},
};
use std::{path::PathBuf, time::UNIX_EPOCH};
use tokio::fs::File;
use tokio_util::io::ReaderStream;
use tracing::{debug, error};

/// Streams files out of a single directory with content-type and cache
/// headers. Used for both the public pages and the uploaded images.
#[derive(Clone)]
pub struct StaticFileHandler {
    pub directory: PathBuf,
}

impl StaticFileHandler {
    pub fn new(directory: PathBuf) -> Self {
        Self { directory }
    }

    pub async fn serve(&self, path: &str) -> Response {
        if path.split('/').any(|component| component == "..") {
            error!("Path traversal attempt: {}", path);
            return (StatusCode::FORBIDDEN, "Forbidden").into_response();
        }

        let file_path = self.directory.join(path.trim_start_matches('/'));
        debug!("Attempting to serve static file: {:?}", file_path);

        let metadata = match tokio::fs::metadata(&file_path).await {
            Ok(m) if m.is_file() => m,
            Ok(_) => return (StatusCode::NOT_FOUND, "File not found").into_response(),
            Err(e) => {
                debug!("Failed to get metadata for {:?}: {}", file_path, e);
                return (StatusCode::NOT_FOUND, "File not found").into_response();
            }
        };

        let file = match File::open(&file_path).await {
            Ok(file) => file,
            Err(e) => {
                debug!("Failed to open file {:?}: {}", file_path, e);
                return (StatusCode::NOT_FOUND, "File not found").into_response();
            }
        };

        let content_type = mime_guess::from_path(&file_path)
            .first_or_octet_stream()
            .to_string();

        let cache_control = if content_type.starts_with("image/") {
            // Uploaded images get a fresh UUID name per upload, never rewritten
            "public, max-age=31536000"
        } else if content_type.starts_with("text/css")
            || content_type.starts_with("application/javascript")
        {
            "public, max-age=300, must-revalidate"
        } else {
            "public, max-age=3600"
        };

        let stream = ReaderStream::new(file);
        let body = Body::from_stream(stream);

        let mut response = Response::builder()
            .status(StatusCode::OK)
            .header(header::CONTENT_TYPE, content_type)
            .header(header::CACHE_CONTROL, cache_control);

        if let Ok(modified) = metadata.modified()
            && let Ok(duration) = modified.duration_since(UNIX_EPOCH)
        {
            let http_date = httpdate::fmt_http_date(modified);
            response = response.header(header::LAST_MODIFIED, http_date);

            let etag = format!("\"{}-{}\"", duration.as_secs(), metadata.len());
            response = response.header(header::ETAG, etag);
        }

        match response.body(body) {
            Ok(response) => response,
            Err(e) => {
                error!("Failed to build response for {:?}: {}", file_path, e);
                (StatusCode::INTERNAL_SERVER_ERROR, "Internal error").into_response()
            }
        }
    }
}
