//! Image payload types returned to callers.

use crate::error::Result;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

/// Image formats recognized in provider responses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ImageFormat {
    /// PNG format (lossless).
    Png,
    /// JPEG format (lossy).
    Jpeg,
    /// WebP format.
    WebP,
    /// GIF format.
    Gif,
}

impl ImageFormat {
    /// Returns the file extension for this format.
    pub fn extension(&self) -> &'static str {
        match self {
            Self::Png => "png",
            Self::Jpeg => "jpg",
            Self::WebP => "webp",
            Self::Gif => "gif",
        }
    }

    /// Returns the MIME type for this format.
    pub fn mime_type(&self) -> &'static str {
        match self {
            Self::Png => "image/png",
            Self::Jpeg => "image/jpeg",
            Self::WebP => "image/webp",
            Self::Gif => "image/gif",
        }
    }

    /// Attempts to detect format from file extension.
    pub fn from_extension(ext: &str) -> Option<Self> {
        match ext.to_lowercase().as_str() {
            "png" => Some(Self::Png),
            "jpg" | "jpeg" => Some(Self::Jpeg),
            "webp" => Some(Self::WebP),
            "gif" => Some(Self::Gif),
            _ => None,
        }
    }

    /// Maps a `Content-Type` header value (parameters ignored) to a format.
    pub fn from_content_type(content_type: &str) -> Option<Self> {
        let mime = content_type.split(';').next()?.trim().to_ascii_lowercase();
        match mime.as_str() {
            "image/png" => Some(Self::Png),
            "image/jpeg" | "image/jpg" => Some(Self::Jpeg),
            "image/webp" => Some(Self::WebP),
            "image/gif" => Some(Self::Gif),
            _ => None,
        }
    }

    /// Detects image format from magic bytes.
    pub fn from_magic_bytes(data: &[u8]) -> Option<Self> {
        // PNG: 89 50 4E 47 0D 0A 1A 0A
        if data.starts_with(&[0x89, 0x50, 0x4E, 0x47, 0x0D, 0x0A, 0x1A, 0x0A]) {
            return Some(Self::Png);
        }

        // JPEG: FF D8 FF
        if data.starts_with(&[0xFF, 0xD8, 0xFF]) {
            return Some(Self::Jpeg);
        }

        if data.starts_with(b"GIF87a") || data.starts_with(b"GIF89a") {
            return Some(Self::Gif);
        }

        // WebP: RIFF....WEBP
        if data.len() >= 12 && data.starts_with(b"RIFF") && &data[8..12] == b"WEBP" {
            return Some(Self::WebP);
        }

        None
    }
}

/// Returns true if a `Content-Type` value denotes binary image data.
///
/// Accepts `image/*` and `application/octet-stream`, case-insensitively.
pub fn is_image_content_type(content_type: &str) -> bool {
    let mime = content_type.trim_start().to_ascii_lowercase();
    mime.starts_with("image/") || mime.starts_with("application/octet-stream")
}

/// Image bytes produced by the first successful provider.
#[derive(Debug, Clone)]
#[must_use = "generated image should be saved or processed"]
pub struct GenerationResult {
    /// Raw image bytes exactly as returned by the provider.
    pub image_bytes: Vec<u8>,
    /// Name of the provider that produced the image.
    pub provider_name: String,
    /// `Content-Type` reported by the provider.
    pub content_type: String,
    /// Wall time of the successful attempt.
    pub duration: Duration,
}

impl GenerationResult {
    /// Creates a new result.
    pub fn new(
        image_bytes: Vec<u8>,
        provider_name: impl Into<String>,
        content_type: impl Into<String>,
        duration: Duration,
    ) -> Self {
        Self {
            image_bytes,
            provider_name: provider_name.into(),
            content_type: content_type.into(),
            duration,
        }
    }

    /// Best-effort format: magic bytes first, then the content type.
    pub fn format(&self) -> Option<ImageFormat> {
        ImageFormat::from_magic_bytes(&self.image_bytes)
            .or_else(|| ImageFormat::from_content_type(&self.content_type))
    }

    /// Returns the size of the image data in bytes.
    pub fn size(&self) -> usize {
        self.image_bytes.len()
    }

    /// Splits the result into bytes and provider name.
    pub fn into_parts(self) -> (Vec<u8>, String) {
        (self.image_bytes, self.provider_name)
    }

    /// Saves the image to the specified path.
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        std::fs::write(path, &self.image_bytes)?;
        Ok(())
    }

    /// Encodes the image data as base64.
    pub fn to_base64(&self) -> String {
        use base64::Engine;
        base64::engine::general_purpose::STANDARD.encode(&self.image_bytes)
    }

    /// Returns the image as a data URL.
    pub fn to_data_url(&self) -> String {
        let mime = self
            .format()
            .map(|f| f.mime_type())
            .unwrap_or("application/octet-stream");
        format!("data:{};base64,{}", mime, self.to_base64())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const PNG_MAGIC: [u8; 12] = [0x89, 0x50, 0x4E, 0x47, 0x0D, 0x0A, 0x1A, 0x0A, 0, 0, 0, 0];
    const JPEG_MAGIC: [u8; 12] = [0xFF, 0xD8, 0xFF, 0xE0, 0, 0, 0, 0, 0, 0, 0, 0];
    const WEBP_MAGIC: [u8; 12] = *b"RIFF\x00\x00\x00\x00WEBP";

    #[test]
    fn test_format_from_magic_bytes() {
        assert_eq!(ImageFormat::from_magic_bytes(&PNG_MAGIC), Some(ImageFormat::Png));
        assert_eq!(ImageFormat::from_magic_bytes(&JPEG_MAGIC), Some(ImageFormat::Jpeg));
        assert_eq!(ImageFormat::from_magic_bytes(&WEBP_MAGIC), Some(ImageFormat::WebP));
        assert_eq!(ImageFormat::from_magic_bytes(b"GIF89a..."), Some(ImageFormat::Gif));
        assert_eq!(ImageFormat::from_magic_bytes(b"RIFF"), None);
    }

    #[test]
    fn test_format_from_content_type() {
        assert_eq!(
            ImageFormat::from_content_type("image/PNG; charset=binary"),
            Some(ImageFormat::Png)
        );
        assert_eq!(ImageFormat::from_content_type("image/jpeg"), Some(ImageFormat::Jpeg));
        assert_eq!(ImageFormat::from_content_type("application/octet-stream"), None);
    }

    #[test]
    fn test_is_image_content_type() {
        assert!(is_image_content_type("image/png"));
        assert!(is_image_content_type("Image/JPEG"));
        assert!(is_image_content_type("application/octet-stream"));
        assert!(!is_image_content_type("application/json"));
        assert!(!is_image_content_type("text/html; charset=utf-8"));
        assert!(!is_image_content_type(""));
    }

    #[test]
    fn test_result_format_prefers_magic_bytes() {
        let result = GenerationResult::new(
            PNG_MAGIC.to_vec(),
            "deepai",
            "application/octet-stream",
            Duration::ZERO,
        );
        assert_eq!(result.format(), Some(ImageFormat::Png));
        assert_eq!(result.size(), 12);
        assert!(result.to_data_url().starts_with("data:image/png;base64,"));
    }

    #[test]
    fn test_result_data_url_unknown_format() {
        let result =
            GenerationResult::new(vec![1, 2, 3], "p", "application/octet-stream", Duration::ZERO);
        assert_eq!(result.format(), None);
        assert_eq!(result.to_data_url(), "data:application/octet-stream;base64,AQID");
    }

    #[test]
    fn test_into_parts() {
        let result = GenerationResult::new(vec![7], "huggingface", "image/png", Duration::ZERO);
        let (bytes, provider) = result.into_parts();
        assert_eq!(bytes, vec![7]);
        assert_eq!(provider, "huggingface");
    }
}
