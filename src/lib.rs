use serde::{Deserialize, Serialize};
use std::path::PathBuf;

pub mod api;
pub mod startup_checks;
pub mod static_files;
pub mod store;
pub mod upload;

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Config {
    pub server: ServerConfig,
    pub app: AppConfig,
    pub static_files: StaticConfig,
    pub storage: StorageConfig,
    pub upload: UploadConfig,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct AppConfig {
    pub name: String,
    pub log_level: String,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct StaticConfig {
    pub directory: PathBuf,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct StorageConfig {
    pub data_file: PathBuf,
    pub upload_directory: PathBuf,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct UploadConfig {
    pub max_size_mb: u64,
    pub max_dimension: u32,
    pub jpeg_quality: u8,
    pub tool_timeout_seconds: u64,
}

impl UploadConfig {
    pub fn max_size_bytes(&self) -> u64 {
        self.max_size_mb * 1024 * 1024
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            server: ServerConfig {
                host: "127.0.0.1".to_string(),
                port: 3000,
            },
            app: AppConfig {
                name: "Garou".to_string(),
                log_level: "info".to_string(),
            },
            static_files: StaticConfig {
                directory: PathBuf::from("public"),
            },
            storage: StorageConfig {
                data_file: PathBuf::from("data/paintings.json"),
                upload_directory: PathBuf::from("uploads"),
            },
            upload: UploadConfig {
                max_size_mb: 10,
                max_dimension: 2048,
                jpeg_quality: 85,
                tool_timeout_seconds: 30,
            },
        }
    }
}

use axum::{
    Router,
    extract::{DefaultBodyLimit, Path, State},
    response::IntoResponse,
};
use std::sync::Arc;
use tower_http::trace::TraceLayer;

#[derive(Clone)]
pub struct AppState {
    pub store: store::SharedStore,
    pub static_handler: static_files::StaticFileHandler,
    pub uploads_handler: static_files::StaticFileHandler,
    pub config: Config,
}

async fn static_file_handler(
    State(app_state): State<AppState>,
    Path(path): Path<String>,
) -> impl IntoResponse {
    app_state.static_handler.serve(&path).await
}

async fn index_handler(State(app_state): State<AppState>) -> impl IntoResponse {
    app_state.static_handler.serve("index.html").await
}

async fn uploaded_file_handler(
    State(app_state): State<AppState>,
    Path(path): Path<String>,
) -> impl IntoResponse {
    app_state.uploads_handler.serve(&path).await
}

pub async fn create_app(config: Config) -> Router {
    let store = Arc::new(store::PaintingStore::new(config.storage.data_file.clone()));

    let static_handler =
        static_files::StaticFileHandler::new(config.static_files.directory.clone());
    let uploads_handler =
        static_files::StaticFileHandler::new(config.storage.upload_directory.clone());

    // Leave headroom above the ingest limit so oversize uploads reach the
    // size check and get a proper 400 instead of a transport error.
    let body_limit = config.upload.max_size_bytes() as usize + 1024 * 1024;

    let app_state = AppState {
        store,
        static_handler,
        uploads_handler,
        config: config.clone(),
    };

    Router::new()
        .route(
            "/api/paintings",
            axum::routing::get(api::list_paintings_handler),
        )
        .route(
            "/api/upload",
            axum::routing::post(api::upload_painting_handler)
                .layer(DefaultBodyLimit::max(body_limit)),
        )
        .route(
            "/api/paintings/{id}",
            axum::routing::get(api::get_painting_handler)
                .put(api::update_painting_handler)
                .delete(api::delete_painting_handler),
        )
        .route("/api/stats", axum::routing::get(api::stats_handler))
        .route(
            "/uploads/{*path}",
            axum::routing::get(uploaded_file_handler),
        )
        .route("/", axum::routing::get(index_handler))
        .route("/{*path}", axum::routing::get(static_file_handler))
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(|request: &axum::http::Request<_>| {
                    let method = request.method();
                    let uri = request.uri();
                    let matched_path = request
                        .extensions()
                        .get::<axum::extract::MatchedPath>()
                        .map(|matched_path| matched_path.as_str());

                    tracing::info_span!(
                        "http_request",
                        method = %method,
                        uri = %uri,
                        matched_path,
                    )
                })
                .on_response(
                    |response: &axum::http::Response<_>,
                     latency: std::time::Duration,
                     _span: &tracing::Span| {
                        let status = response.status();
                        let size = response
                            .headers()
                            .get("content-length")
                            .and_then(|h| h.to_str().ok())
                            .unwrap_or("-");

                        tracing::info!(
                            target: "access_log",
                            status = %status,
                            size = %size,
                            latency_ms = %latency.as_millis(),
                            "response"
                        );
                    },
                ),
        )
        .with_state(app_state)
}
