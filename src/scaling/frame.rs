use super::transform::{Resolution, ScaleTransform};
use anyhow::{Context, Result};
use bytes::Bytes;
use image::imageops::FilterType;
use image::ImageFormat;
use std::future::Future;
use std::io::Cursor;
use std::path::PathBuf;
use tracing::{debug, warn};

/// Provides raw screenshots at the desktop's original resolution.
pub trait ScreenshotSource: Send + Sync {
    fn capture(&self) -> impl Future<Output = Result<Bytes>> + Send;
}

/// Reads the current frame from an image file on disk.
#[derive(Debug, Clone)]
pub struct FileScreenshotSource {
    path: PathBuf,
}

impl FileScreenshotSource {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

impl ScreenshotSource for FileScreenshotSource {
    async fn capture(&self) -> Result<Bytes> {
        let data = tokio::fs::read(&self.path)
            .await
            .with_context(|| format!("failed to read screenshot '{}'", self.path.display()))?;
        Ok(Bytes::from(data))
    }
}

/// Produces model-facing screenshots sized to the transform's scaled resolution.
pub struct FrameScaler<S> {
    source: S,
    transform: ScaleTransform,
}

impl<S: ScreenshotSource> FrameScaler<S> {
    pub fn new(source: S, transform: ScaleTransform) -> Self {
        Self { source, transform }
    }

    pub fn transform(&self) -> &ScaleTransform {
        &self.transform
    }

    /// Captures a frame and scales it. Capture failures propagate; scaling
    /// failures fall back to the unscaled capture.
    pub async fn take_screenshot(&self) -> Result<Bytes> {
        let original = self.source.capture().await?;
        Ok(self.scale_image(original).await)
    }

    pub async fn scale_image(&self, original: Bytes) -> Bytes {
        if self.transform.is_identity() {
            return original;
        }

        let target = self.transform.scaled();
        let input = original.clone();
        match tokio::task::spawn_blocking(move || resize_exact(&input, target)).await {
            Ok(Ok(scaled)) => {
                debug!(
                    target_resolution = %target,
                    input_bytes = original.len(),
                    output_bytes = scaled.len(),
                    "scaled screenshot"
                );
                scaled
            }
            Ok(Err(error)) => {
                warn!(%error, "screenshot scaling failed; sending unscaled frame");
                original
            }
            Err(join_error) => {
                warn!(error = %join_error, "screenshot scaling task failed; sending unscaled frame");
                original
            }
        }
    }
}

fn resize_exact(data: &[u8], target: Resolution) -> Result<Bytes> {
    let decoded = image::load_from_memory(data).context("failed to decode screenshot")?;
    // Lanczos3 keeps sub-10px UI elements legible; exact dimensions, no letterboxing.
    let resized = decoded.resize_exact(target.width, target.height, FilterType::Lanczos3);

    let mut out = Cursor::new(Vec::new());
    resized
        .write_to(&mut out, ImageFormat::Png)
        .context("failed to encode scaled screenshot")?;
    Ok(Bytes::from(out.into_inner()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scaling::transform::ScaleBounds;
    use image::{DynamicImage, GenericImageView, RgbImage};

    struct StaticSource(Bytes);

    impl ScreenshotSource for StaticSource {
        async fn capture(&self) -> Result<Bytes> {
            Ok(self.0.clone())
        }
    }

    fn png(width: u32, height: u32) -> Bytes {
        let image = DynamicImage::ImageRgb8(RgbImage::from_fn(width, height, |x, y| {
            image::Rgb([(x % 256) as u8, (y % 256) as u8, 128])
        }));
        let mut out = Cursor::new(Vec::new());
        image.write_to(&mut out, ImageFormat::Png).unwrap();
        Bytes::from(out.into_inner())
    }

    fn transform(width: u32, height: u32) -> ScaleTransform {
        ScaleTransform::new(Resolution::new(width, height), ScaleBounds::default()).unwrap()
    }

    #[tokio::test]
    async fn test_identity_transform_returns_source_bytes() {
        let source = png(800, 600);
        let scaler = FrameScaler::new(StaticSource(source.clone()), transform(800, 600));
        let shot = scaler.take_screenshot().await.unwrap();
        assert_eq!(shot, source);
    }

    #[tokio::test]
    async fn test_scaled_screenshot_hits_exact_resolution() {
        let scaler = FrameScaler::new(StaticSource(png(1920, 1080)), transform(1920, 1080));
        let shot = scaler.take_screenshot().await.unwrap();
        let decoded = image::load_from_memory(&shot).unwrap();
        assert_eq!(decoded.dimensions(), (1024, 576));
    }

    #[tokio::test]
    async fn test_undecodable_frame_falls_back_to_source() {
        let garbage = Bytes::from_static(b"not an image");
        let scaler = FrameScaler::new(StaticSource(garbage.clone()), transform(1920, 1080));
        let shot = scaler.take_screenshot().await.unwrap();
        assert_eq!(shot, garbage);
    }

    #[tokio::test]
    async fn test_file_source_reports_missing_file() {
        let source = FileScreenshotSource::new("/nonexistent/desksurf-frame.png");
        assert!(source.capture().await.is_err());
    }
}
