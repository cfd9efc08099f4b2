//! HEIC/HEIF transcoding: libheif decode first (when built in), then an
//! ordered list of external converter tools, each tried until one produces
//! an intermediate JPEG that the general raster pipeline can bound.

use std::path::Path;
use tokio::process::Command;
use tokio::time::timeout;
use tracing::{debug, warn};

use super::normalize::Normalizer;
use super::{UploadError, remove_quietly};

pub(super) async fn transcode(
    normalizer: &Normalizer,
    src: &Path,
    dest: &Path,
) -> Result<(), UploadError> {
    #[cfg(feature = "heif")]
    match decode_primary(normalizer, src, dest).await {
        Ok(()) => return Ok(()),
        Err(e) => warn!("libheif decode failed for {:?}: {}", src, e),
    }

    #[cfg(not(feature = "heif"))]
    debug!("built without the heif feature, going straight to converter tools");

    transcode_with_tools(normalizer, src, dest).await
}

/// Primary path: decode raw pixels with libheif and re-encode through the
/// raster pipeline.
#[cfg(feature = "heif")]
async fn decode_primary(
    normalizer: &Normalizer,
    src: &Path,
    dest: &Path,
) -> Result<(), UploadError> {
    let src = src.to_path_buf();
    let dest = dest.to_path_buf();
    let max_dimension = normalizer.max_dimension;
    let quality = normalizer.jpeg_quality;

    tokio::task::spawn_blocking(move || -> Result<(), UploadError> {
        let img = decode_libheif(&src)?;
        super::normalize::encode_jpeg_bounded(&img, &dest, max_dimension, quality)
    })
    .await
    .map_err(std::io::Error::other)??;

    Ok(())
}

#[cfg(feature = "heif")]
fn decode_libheif(path: &Path) -> Result<image::DynamicImage, UploadError> {
    use libheif_rs::{ColorSpace, HeifContext, LibHeif, RgbChroma};

    let path_str = path
        .to_str()
        .ok_or_else(|| UploadError::Transcode("non-UTF-8 path".to_string()))?;

    let lib_heif = LibHeif::new();
    let ctx = HeifContext::read_from_file(path_str)
        .map_err(|e| UploadError::Transcode(format!("libheif open: {}", e)))?;
    let handle = ctx
        .primary_image_handle()
        .map_err(|e| UploadError::Transcode(format!("libheif handle: {}", e)))?;
    let decoded = lib_heif
        .decode(&handle, ColorSpace::Rgb(RgbChroma::Rgb), None)
        .map_err(|e| UploadError::Transcode(format!("libheif decode: {}", e)))?;

    let planes = decoded.planes();
    let plane = planes
        .interleaved
        .ok_or_else(|| UploadError::Transcode("libheif returned no RGB plane".to_string()))?;

    let (width, height) = (plane.width, plane.height);
    let stride = plane.stride;
    let mut rgb = image::RgbImage::new(width, height);
    // Rows are padded to the plane stride.
    for (y, row) in plane.data.chunks(stride).take(height as usize).enumerate() {
        for x in 0..width as usize {
            let i = x * 3;
            rgb.put_pixel(x as u32, y as u32, image::Rgb([row[i], row[i + 1], row[i + 2]]));
        }
    }

    Ok(image::DynamicImage::ImageRgb8(rgb))
}

/// Fallback path: each tool writes an intermediate JPEG which is then run
/// through the raster pipeline to enforce size and quality bounds. The
/// intermediate is removed whatever happens.
async fn transcode_with_tools(
    normalizer: &Normalizer,
    src: &Path,
    dest: &Path,
) -> Result<(), UploadError> {
    let intermediate = src.with_extension("tool.jpg");

    for (name, mut command) in converter_invocations(src, &intermediate) {
        remove_quietly(&intermediate).await;

        match timeout(normalizer.tool_timeout, command.output()).await {
            Err(_) => {
                warn!(
                    "{} timed out after {:?} converting {:?}",
                    name, normalizer.tool_timeout, src
                );
            }
            Ok(Err(e)) => {
                debug!("{} is not available: {}", name, e);
            }
            Ok(Ok(output)) if !output.status.success() => {
                warn!(
                    "{} failed on {:?}: {}",
                    name,
                    src,
                    String::from_utf8_lossy(&output.stderr).trim()
                );
            }
            Ok(Ok(_)) => {
                if !intermediate.exists() {
                    warn!("{} reported success but produced no output", name);
                    continue;
                }
                debug!("Converted {:?} via {}", src, name);
                let result = normalizer.reencode_file(&intermediate, dest).await;
                remove_quietly(&intermediate).await;
                return result;
            }
        }
    }

    remove_quietly(&intermediate).await;
    Err(UploadError::Transcode(
        "HEIF decode failed and no converter tool succeeded".to_string(),
    ))
}

fn converter_invocations(src: &Path, out: &Path) -> Vec<(&'static str, Command)> {
    let mut tools = Vec::new();

    let mut magick = Command::new("magick");
    magick.arg(src).arg(out).kill_on_drop(true);
    tools.push(("magick", magick));

    let mut heif_convert = Command::new("heif-convert");
    heif_convert.arg(src).arg(out).kill_on_drop(true);
    tools.push(("heif-convert", heif_convert));

    #[cfg(target_os = "macos")]
    {
        let mut sips = Command::new("sips");
        sips.args(["-s", "format", "jpeg"])
            .arg(src)
            .arg("--out")
            .arg(out)
            .kill_on_drop(true);
        tools.push(("sips", sips));
    }

    tools
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::UploadConfig;
    use tempfile::TempDir;

    #[tokio::test]
    async fn garbage_heic_exhausts_all_paths_and_cleans_up() {
        let dir = TempDir::new().unwrap();
        let src = dir.path().join("junk.heic");
        std::fs::write(&src, b"not a heif container at all").unwrap();
        let dest = dir.path().join("junk.jpg");

        let normalizer = Normalizer::new(&UploadConfig {
            max_size_mb: 10,
            max_dimension: 2048,
            jpeg_quality: 85,
            tool_timeout_seconds: 10,
        });

        let result = transcode(&normalizer, &src, &dest).await;
        assert!(result.is_err());
        assert!(!dest.exists());
        assert!(!src.with_extension("tool.jpg").exists());
    }
}
