use crate::Config;
use thiserror::Error;
use tracing::{error, info, warn};

#[derive(Debug, Error)]
pub enum StartupCheckError {
    #[error("Failed to create upload directory: {0}")]
    UploadDirectoryCreationFailed(std::io::Error),

    #[error("Failed to create data directory: {0}")]
    DataDirectoryCreationFailed(std::io::Error),

    #[error("Static files directory does not exist")]
    StaticDirectoryMissing,
}

impl StartupCheckError {
    /// Directory creation failures make the server unable to take uploads.
    pub fn is_critical(&self) -> bool {
        !matches!(self, StartupCheckError::StaticDirectoryMissing)
    }
}

pub async fn perform_startup_checks(config: &Config) -> Result<(), Vec<StartupCheckError>> {
    let mut errors = Vec::new();

    info!("Performing startup checks...");

    let upload_dir = &config.storage.upload_directory;
    if upload_dir.exists() {
        info!("Upload directory exists: {:?}", upload_dir);
    } else {
        info!("Upload directory does not exist, creating: {:?}", upload_dir);
        if let Err(e) = tokio::fs::create_dir_all(upload_dir).await {
            error!("Failed to create upload directory: {}", e);
            errors.push(StartupCheckError::UploadDirectoryCreationFailed(e));
        }
    }

    if let Some(data_dir) = config.storage.data_file.parent()
        && !data_dir.as_os_str().is_empty()
        && !data_dir.exists()
    {
        info!("Data directory does not exist, creating: {:?}", data_dir);
        if let Err(e) = tokio::fs::create_dir_all(data_dir).await {
            error!("Failed to create data directory: {}", e);
            errors.push(StartupCheckError::DataDirectoryCreationFailed(e));
        }
    }

    let static_dir = &config.static_files.directory;
    if static_dir.exists() {
        info!("Static files directory exists: {:?}", static_dir);
    } else {
        warn!("Static files directory does not exist: {:?}", static_dir);
        warn!("The gallery and admin pages will not be served");
        errors.push(StartupCheckError::StaticDirectoryMissing);
    }

    if errors.is_empty() {
        info!("All startup checks passed");
        Ok(())
    } else {
        error!("Startup checks failed with {} errors", errors.len());
        Err(errors)
    }
}
