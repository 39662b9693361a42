//! Captured images (ID photos, signatures) and where they live on disk.

use async_trait::async_trait;
use base64::{engine::general_purpose::STANDARD, Engine as _};
use image::ImageFormat;
use std::fmt;
use std::path::{Component, Path, PathBuf};

/// Sub-folders of the media root, one per kind of capture.
pub const SIGNATURES: &str = "signatures";
pub const ID_PHOTOS: &str = "id_photos";
pub const AGREEMENT_SIGNATURES: &str = "agreement_signatures";

#[derive(Debug, Clone, PartialEq)]
pub enum MediaError {
    InvalidImage(String),
    Io(String),
}

impl fmt::Display for MediaError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MediaError::InvalidImage(msg) => write!(f, "Invalid image: {}", msg),
            MediaError::Io(msg) => write!(f, "Storage error: {}", msg),
        }
    }
}

impl std::error::Error for MediaError {}

impl From<std::io::Error> for MediaError {
    fn from(e: std::io::Error) -> Self {
        MediaError::Io(e.to_string())
    }
}

/// A validated image ready to be written.
#[derive(Debug, Clone)]
pub struct DecodedImage {
    pub bytes: Vec<u8>,
    pub extension: &'static str,
}

/// Decode a canvas/camera capture: `data:image/png;base64,...` or bare base64.
pub fn decode_data_url(data: &str) -> Result<DecodedImage, MediaError> {
    let data = data.trim();
    let payload = match data.strip_prefix("data:") {
        Some(rest) => {
            let (header, body) = rest
                .split_once(',')
                .ok_or_else(|| MediaError::InvalidImage("malformed data URL".to_string()))?;
            if !header.ends_with(";base64") {
                return Err(MediaError::InvalidImage(
                    "data URL is not base64 encoded".to_string(),
                ));
            }
            body
        }
        None => data,
    };

    if payload.is_empty() {
        return Err(MediaError::InvalidImage("empty image".to_string()));
    }

    let bytes = STANDARD
        .decode(payload)
        .map_err(|e| MediaError::InvalidImage(e.to_string()))?;

    let extension = match image::guess_format(&bytes) {
        Ok(ImageFormat::Png) => "png",
        Ok(ImageFormat::Jpeg) => "jpg",
        Ok(other) => {
            return Err(MediaError::InvalidImage(format!(
                "unsupported format {:?}",
                other
            )))
        }
        Err(e) => return Err(MediaError::InvalidImage(e.to_string())),
    };

    // Reject truncated or corrupt payloads now rather than at PDF time
    image::load_from_memory(&bytes).map_err(|e| MediaError::InvalidImage(e.to_string()))?;

    Ok(DecodedImage { bytes, extension })
}

#[async_trait]
pub trait MediaStore: Send + Sync {
    /// Write the image and return its path relative to the media root.
    async fn save(&self, folder: &str, image: &DecodedImage) -> Result<String, MediaError>;

    async fn load(&self, path: &str) -> Result<Vec<u8>, MediaError>;
}

/// Decode a submitted capture and store it in one go.
pub async fn store_data_url(
    store: &dyn MediaStore,
    folder: &str,
    data: &str,
) -> Result<String, MediaError> {
    let image = decode_data_url(data)?;
    store.save(folder, &image).await
}

/// Files under a directory on the local filesystem.
pub struct LocalMediaStore {
    root: PathBuf,
}

impl LocalMediaStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    fn resolve(&self, relative: &str) -> Result<PathBuf, MediaError> {
        let relative = Path::new(relative);
        if relative
            .components()
            .any(|c| !matches!(c, Component::Normal(_)))
        {
            return Err(MediaError::Io(format!(
                "refusing path outside media root: {}",
                relative.display()
            )));
        }
        Ok(self.root.join(relative))
    }
}

#[async_trait]
impl MediaStore for LocalMediaStore {
    async fn save(&self, folder: &str, image: &DecodedImage) -> Result<String, MediaError> {
        let relative = format!("{}/{}.{}", folder, uuid::Uuid::new_v4(), image.extension);
        let target = self.resolve(&relative)?;

        if let Some(parent) = target.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        tokio::fs::write(&target, &image.bytes).await?;

        tracing::debug!("Stored {} bytes at {}", image.bytes.len(), relative);
        Ok(relative)
    }

    async fn load(&self, path: &str) -> Result<Vec<u8>, MediaError> {
        let target = self.resolve(path)?;
        Ok(tokio::fs::read(target).await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{DynamicImage, RgbImage};
    use std::io::Cursor;

    fn png_data_url() -> String {
        let img = DynamicImage::ImageRgb8(RgbImage::from_pixel(4, 3, image::Rgb([10, 20, 30])));
        let mut buf = Cursor::new(Vec::new());
        img.write_to(&mut buf, ImageFormat::Png).unwrap();
        format!("data:image/png;base64,{}", STANDARD.encode(buf.into_inner()))
    }

    #[test]
    fn test_decode_data_url_png() {
        let decoded = decode_data_url(&png_data_url()).unwrap();
        assert_eq!(decoded.extension, "png");
        assert!(!decoded.bytes.is_empty());
    }

    #[test]
    fn test_decode_accepts_bare_base64() {
        let url = png_data_url();
        let bare = url.split_once(',').unwrap().1;
        assert_eq!(decode_data_url(bare).unwrap().extension, "png");
    }

    #[test]
    fn test_decode_rejects_garbage() {
        assert!(matches!(
            decode_data_url("data:image/png;base64,bm90IGFuIGltYWdl"),
            Err(MediaError::InvalidImage(_))
        ));
        assert!(decode_data_url("data:image/png,plain").is_err());
        assert!(decode_data_url("").is_err());
    }

    #[tokio::test]
    async fn test_local_store_roundtrip() {
        let root = std::env::temp_dir().join(format!("phonedesk-media-{}", uuid::Uuid::new_v4()));
        let store = LocalMediaStore::new(&root);

        let path = store_data_url(&store, SIGNATURES, &png_data_url())
            .await
            .unwrap();
        assert!(path.starts_with("signatures/"));
        assert!(path.ends_with(".png"));

        let bytes = store.load(&path).await.unwrap();
        assert!(image::load_from_memory(&bytes).is_ok());

        assert!(store.load("../etc/passwd").await.is_err());
        let _ = std::fs::remove_dir_all(root);
    }
}
