use image::{DynamicImage, codecs::jpeg::JpegEncoder, imageops::FilterType};
use image::ImageEncoder;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::debug;

use super::ingest::{IngestedFile, extension_of};
use super::{UploadError, heif, remove_quietly};
use crate::UploadConfig;

/// Raster formats that get re-encoded straight to JPEG.
const REENCODE_EXTENSIONS: &[&str] = &["png", "gif", "bmp", "webp"];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NormalizeAction {
    /// HEIC/HEIF input: decode, falling back to external tools.
    Heif,
    /// Known non-JPEG raster format: one pass through the JPEG pipeline.
    Reencode,
    /// Already JPEG (or unrecognized but accepted): keep as-is.
    Keep,
}

pub fn classify(extension: Option<&str>, content_type: Option<&str>) -> NormalizeAction {
    let heif_ext = matches!(extension, Some("heic") | Some("heif"));
    let heif_type = content_type.is_some_and(|t| t == "image/heic" || t == "image/heif");
    if heif_ext || heif_type {
        return NormalizeAction::Heif;
    }

    if extension.is_some_and(|e| REENCODE_EXTENSIONS.contains(&e)) {
        NormalizeAction::Reencode
    } else {
        NormalizeAction::Keep
    }
}

/// The file that should be persisted after normalization.
#[derive(Debug)]
pub struct NormalizedFile {
    pub path: PathBuf,
    pub filename: String,
}

impl NormalizedFile {
    fn at(path: PathBuf) -> Self {
        let filename = path
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or_default()
            .to_string();
        Self { path, filename }
    }
}

/// Converts accepted input into a JPEG bounded to the configured maximum
/// dimension. Owns its intermediates: a failed run leaves no partial output
/// behind (the ingested original is the orchestrator's to clean up).
pub struct Normalizer {
    pub(super) max_dimension: u32,
    pub(super) jpeg_quality: u8,
    pub(super) tool_timeout: Duration,
}

impl Normalizer {
    pub fn new(config: &UploadConfig) -> Self {
        Self {
            max_dimension: config.max_dimension,
            jpeg_quality: config.jpeg_quality,
            tool_timeout: Duration::from_secs(config.tool_timeout_seconds),
        }
    }

    /// Normalize an ingested file. `Ok(None)` means the original is already
    /// suitable and should be persisted unchanged.
    pub async fn normalize(
        &self,
        ingested: &IngestedFile,
    ) -> Result<Option<NormalizedFile>, UploadError> {
        let action = classify(
            extension_of(&ingested.stored_name).as_deref(),
            ingested.content_type.as_deref(),
        );
        debug!("Normalize action for {}: {:?}", ingested.stored_name, action);

        let dest = match action {
            NormalizeAction::Keep => return Ok(None),
            NormalizeAction::Reencode | NormalizeAction::Heif => {
                ingested.path.with_extension("jpg")
            }
        };

        let result = match action {
            NormalizeAction::Reencode => self.reencode_file(&ingested.path, &dest).await,
            NormalizeAction::Heif => heif::transcode(self, &ingested.path, &dest).await,
            NormalizeAction::Keep => unreachable!(),
        };

        match result {
            Ok(()) => Ok(Some(NormalizedFile::at(dest))),
            Err(e) => {
                remove_quietly(&dest).await;
                Err(e)
            }
        }
    }

    /// Decode `src` with the general raster pipeline and write a bounded
    /// JPEG to `dest`. Runs on a blocking thread.
    pub(super) async fn reencode_file(&self, src: &Path, dest: &Path) -> Result<(), UploadError> {
        let src = src.to_path_buf();
        let dest = dest.to_path_buf();
        let max_dimension = self.max_dimension;
        let quality = self.jpeg_quality;

        tokio::task::spawn_blocking(move || -> Result<(), UploadError> {
            let img = image::open(&src)?;
            encode_jpeg_bounded(&img, &dest, max_dimension, quality)
        })
        .await
        .map_err(std::io::Error::other)??;

        Ok(())
    }
}

/// Write `img` to `dest` as JPEG, bounded to `max_dimension` on the longer
/// side. Aspect ratio is preserved and images are never upscaled.
pub(super) fn encode_jpeg_bounded(
    img: &DynamicImage,
    dest: &Path,
    max_dimension: u32,
    quality: u8,
) -> Result<(), UploadError> {
    let bounded = bound_image(img, max_dimension);

    // JPEG has no alpha channel.
    let rgb = bounded.to_rgb8();
    let output = std::fs::File::create(dest)?;
    let encoder = JpegEncoder::new_with_quality(output, quality);
    encoder.write_image(
        &rgb,
        rgb.width(),
        rgb.height(),
        image::ExtendedColorType::Rgb8,
    )?;

    Ok(())
}

fn bound_image(img: &DynamicImage, max_dimension: u32) -> DynamicImage {
    let (orig_width, orig_height) = (img.width(), img.height());

    let final_width = max_dimension.min(orig_width);
    let final_height = max_dimension.min(orig_height);

    if final_width != orig_width || final_height != orig_height {
        img.resize(final_width, final_height, FilterType::Lanczos3)
    } else {
        img.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn classify_heif_by_extension_or_media_type() {
        assert_eq!(classify(Some("heic"), None), NormalizeAction::Heif);
        assert_eq!(
            classify(Some("heif"), Some("application/octet-stream")),
            NormalizeAction::Heif
        );
        assert_eq!(classify(None, Some("image/heif")), NormalizeAction::Heif);
    }

    #[test]
    fn classify_known_rasters_for_reencode() {
        for ext in ["png", "gif", "bmp", "webp"] {
            assert_eq!(classify(Some(ext), None), NormalizeAction::Reencode);
        }
    }

    #[test]
    fn classify_keeps_jpeg_and_unknown() {
        assert_eq!(classify(Some("jpg"), Some("image/jpeg")), NormalizeAction::Keep);
        assert_eq!(classify(Some("jpeg"), None), NormalizeAction::Keep);
        assert_eq!(classify(None, Some("image/x-whatever")), NormalizeAction::Keep);
    }

    fn write_png(dir: &TempDir, name: &str, width: u32, height: u32) -> std::path::PathBuf {
        let path = dir.path().join(name);
        let img = image::RgbImage::from_pixel(width, height, image::Rgb([200, 30, 90]));
        img.save(&path).unwrap();
        path
    }

    #[tokio::test]
    async fn reencode_bounds_large_images_preserving_aspect() {
        let dir = TempDir::new().unwrap();
        let src = write_png(&dir, "wide.png", 4096, 1024);
        let dest = dir.path().join("wide.jpg");

        let normalizer = Normalizer::new(&crate::Config::default().upload);
        normalizer.reencode_file(&src, &dest).await.unwrap();

        let (w, h) = image::image_dimensions(&dest).unwrap();
        assert_eq!((w, h), (2048, 512));
    }

    #[tokio::test]
    async fn reencode_never_upscales() {
        let dir = TempDir::new().unwrap();
        let src = write_png(&dir, "small.png", 120, 60);
        let dest = dir.path().join("small.jpg");

        let normalizer = Normalizer::new(&crate::Config::default().upload);
        normalizer.reencode_file(&src, &dest).await.unwrap();

        let (w, h) = image::image_dimensions(&dest).unwrap();
        assert_eq!((w, h), (120, 60));
    }

    #[tokio::test]
    async fn reencode_on_garbage_input_fails() {
        let dir = TempDir::new().unwrap();
        let src = dir.path().join("junk.png");
        std::fs::write(&src, b"definitely not a png").unwrap();
        let dest = dir.path().join("junk.jpg");

        let normalizer = Normalizer::new(&crate::Config::default().upload);
        assert!(normalizer.reencode_file(&src, &dest).await.is_err());
    }
}
