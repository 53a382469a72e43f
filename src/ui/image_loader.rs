//! Fetching and decoding image items for the kiosk window.

use image::imageops::FilterType;
use image::DynamicImage;
use reqwest::Client;
use std::fmt;
use std::path::PathBuf;
use thiserror::Error;

/// Largest encoded image accepted
pub const MAX_IMAGE_BYTES: u64 = 64 * 1024 * 1024;

/// Decoded images are scaled down to fit this square
pub const MAX_DIMENSION: u32 = 4096;

#[derive(Debug, Error)]
pub enum ImageLoadError {
    #[error("failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("download failed: {0}")]
    Http(reqwest::Error),
    #[error("server answered {0}")]
    Status(u16),
    #[error("image exceeds {MAX_IMAGE_BYTES} bytes")]
    TooLarge,
    #[error("undecodable image: {0}")]
    Decode(#[from] image::ImageError),
    #[error("unsupported image source {0:?}")]
    Unsupported(String),
    #[error("decoder task failed: {0}")]
    Task(#[from] tokio::task::JoinError),
}

/// RGBA8 pixels, row major, ready for upload
#[derive(Clone, PartialEq)]
pub struct DecodedImage {
    pub width: u32,
    pub height: u32,
    pub pixels: Vec<u8>,
}

impl fmt::Debug for DecodedImage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DecodedImage")
            .field("width", &self.width)
            .field("height", &self.height)
            .field("bytes", &self.pixels.len())
            .finish()
    }
}

impl DecodedImage {
    fn from_dynamic(image: DynamicImage) -> Self {
        let image = if image.width() > MAX_DIMENSION || image.height() > MAX_DIMENSION {
            image.resize(MAX_DIMENSION, MAX_DIMENSION, FilterType::Triangle)
        } else {
            image
        };
        let rgba = image.into_rgba8();
        let (width, height) = rgba.dimensions();
        Self {
            width,
            height,
            pixels: rgba.into_raw(),
        }
    }

    pub fn size(&self) -> [f32; 2] {
        [self.width as f32, self.height as f32]
    }
}

#[derive(Debug, PartialEq)]
enum Location {
    Remote(String),
    Local(PathBuf),
}

fn locate(source: &str) -> Result<Location, ImageLoadError> {
    if let Some(path) = source.strip_prefix("file://") {
        return Ok(Location::Local(PathBuf::from(path)));
    }
    let lower = source.to_ascii_lowercase();
    if lower.starts_with("http://") || lower.starts_with("https://") {
        Ok(Location::Remote(source.to_string()))
    } else if has_scheme(source) {
        Err(ImageLoadError::Unsupported(source.to_string()))
    } else {
        Ok(Location::Local(PathBuf::from(source)))
    }
}

/// `scheme:` prefix, but not a Windows drive letter
pub(crate) fn has_scheme(source: &str) -> bool {
    match source.split_once(':') {
        Some((scheme, _)) => {
            scheme.len() > 1
                && scheme
                    .chars()
                    .all(|c| c.is_ascii_alphanumeric() || c == '+' || c == '-' || c == '.')
        }
        None => false,
    }
}

/// Read `source` from disk or over HTTP and decode it off the async threads
pub async fn load_image(client: &Client, source: &str) -> Result<DecodedImage, ImageLoadError> {
    let bytes = match locate(source)? {
        Location::Remote(url) => download(client, &url).await?,
        Location::Local(path) => tokio::fs::read(&path)
            .await
            .map_err(|source| ImageLoadError::Io { path, source })?,
    };
    if bytes.len() as u64 > MAX_IMAGE_BYTES {
        return Err(ImageLoadError::TooLarge);
    }

    let image = tokio::task::spawn_blocking(move || image::load_from_memory(&bytes)).await??;
    Ok(tokio::task::spawn_blocking(move || DecodedImage::from_dynamic(image)).await?)
}

async fn download(client: &Client, url: &str) -> Result<Vec<u8>, ImageLoadError> {
    // Storage URLs often carry access tokens; keep them out of error text
    let http = |e: reqwest::Error| ImageLoadError::Http(e.without_url());

    let response = client.get(url).send().await.map_err(http)?;
    let status = response.status();
    if !status.is_success() {
        return Err(ImageLoadError::Status(status.as_u16()));
    }
    if response.content_length().is_some_and(|len| len > MAX_IMAGE_BYTES) {
        return Err(ImageLoadError::TooLarge);
    }
    Ok(response.bytes().await.map_err(http)?.to_vec())
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{Rgba, RgbaImage};

    #[test]
    fn test_locate() {
        assert_eq!(
            locate("https://cdn.example.com/a.png").unwrap(),
            Location::Remote("https://cdn.example.com/a.png".to_string())
        );
        assert_eq!(locate("file:///srv/a.png").unwrap(), Location::Local(PathBuf::from("/srv/a.png")));
        assert_eq!(locate("slides/a.png").unwrap(), Location::Local(PathBuf::from("slides/a.png")));
        assert_eq!(locate("C:\\media\\a.png").unwrap(), Location::Local(PathBuf::from("C:\\media\\a.png")));
        assert!(matches!(locate("ftp://host/a.png"), Err(ImageLoadError::Unsupported(_))));
    }

    #[test]
    fn test_drive_letters_are_paths() {
        assert!(!has_scheme("C:\\media\\a.png"));
        assert!(has_scheme("https://x"));
        assert!(!has_scheme("slides/a.png"));
    }

    #[tokio::test]
    async fn test_load_local_png() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("slide.png");
        RgbaImage::from_pixel(3, 2, Rgba([255, 0, 0, 255])).save(&path).unwrap();

        let image = load_image(&Client::new(), path.to_str().unwrap()).await.unwrap();
        assert_eq!((image.width, image.height), (3, 2));
        assert_eq!(image.pixels.len(), 3 * 2 * 4);
        assert_eq!(&image.pixels[..4], &[255, 0, 0, 255]);
        assert_eq!(image.size(), [3.0, 2.0]);
    }

    #[tokio::test]
    async fn test_load_failures() {
        let dir = tempfile::tempdir().unwrap();
        let garbage = dir.path().join("broken.png");
        std::fs::write(&garbage, b"not an image").unwrap();
        let missing = dir.path().join("gone.png");
        let client = Client::new();

        let err = load_image(&client, garbage.to_str().unwrap()).await.unwrap_err();
        assert!(matches!(err, ImageLoadError::Decode(_)));

        let err = load_image(&client, missing.to_str().unwrap()).await.unwrap_err();
        assert!(matches!(err, ImageLoadError::Io { .. }));
        assert!(err.to_string().contains("gone.png"));
    }

    #[tokio::test]
    async fn test_download_error_hides_url() {
        // Nothing listens on port 1
        let err = load_image(&Client::new(), "http://127.0.0.1:1/a.png?token=SECRET")
            .await
            .unwrap_err();
        assert!(matches!(err, ImageLoadError::Http(_)));
        assert!(!err.to_string().contains("SECRET"));
    }

    #[test]
    fn test_oversized_images_are_scaled_down() {
        let wide = DynamicImage::ImageRgba8(RgbaImage::new(MAX_DIMENSION * 2, 10));
        let image = DecodedImage::from_dynamic(wide);
        assert_eq!(image.width, MAX_DIMENSION);
        assert!(image.height <= 10);
        assert_eq!(image.pixels.len(), (image.width * image.height * 4) as usize);
    }
}
