use crate::error::{Error, Result};
use reqwest::{header, Client};
use std::time::Duration;
use tracing::debug;
use url::Url;

/// Raster image formats the store accepts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImageFormat {
    Gif,
    Jpeg,
    Png,
    Webp,
}

impl ImageFormat {
    /// Canonical file extension for the format
    pub fn ext(&self) -> &'static str {
        match self {
            ImageFormat::Gif => "gif",
            ImageFormat::Jpeg => "jpg",
            ImageFormat::Png => "png",
            ImageFormat::Webp => "webp",
        }
    }

    /// Detect the format from the leading bytes of the payload
    pub fn sniff(bytes: &[u8]) -> Option<Self> {
        // PNG: 89 50 4E 47 0D 0A 1A 0A
        if bytes.starts_with(&[0x89, 0x50, 0x4E, 0x47, 0x0D, 0x0A, 0x1A, 0x0A]) {
            return Some(ImageFormat::Png);
        }
        // JPEG: FF D8 FF
        if bytes.starts_with(&[0xFF, 0xD8, 0xFF]) {
            return Some(ImageFormat::Jpeg);
        }
        // GIF: GIF87a or GIF89a
        if bytes.starts_with(b"GIF87a") || bytes.starts_with(b"GIF89a") {
            return Some(ImageFormat::Gif);
        }
        // WebP: RIFF....WEBP
        if bytes.len() >= 12 && bytes.starts_with(b"RIFF") && &bytes[8..12] == b"WEBP" {
            return Some(ImageFormat::Webp);
        }
        None
    }

    fn from_content_type(content_type: &str) -> Option<Self> {
        // Ignore any parameters after the media type
        let media_type = content_type
            .split(';')
            .next()
            .unwrap_or(content_type)
            .trim()
            .to_lowercase();

        match media_type.as_str() {
            "image/gif" => Some(ImageFormat::Gif),
            "image/jpeg" | "image/jpg" => Some(ImageFormat::Jpeg),
            "image/png" => Some(ImageFormat::Png),
            "image/webp" => Some(ImageFormat::Webp),
            _ => None,
        }
    }
}

#[derive(Debug)]
pub struct FetchedImage {
    pub bytes: Vec<u8>,
    pub format: ImageFormat,
}

/// HTTP fetcher for remote images with bounded timeout and body size
pub struct ImageFetcher {
    client: Client,
    max_image_size: usize,
}

impl ImageFetcher {
    pub fn new(user_agent: String, timeout: Duration, max_image_size: usize) -> Result<Self> {
        let client = Client::builder()
            .user_agent(user_agent)
            .timeout(timeout)
            .redirect(reqwest::redirect::Policy::limited(10))
            .build()
            .map_err(Error::Http)?;

        Ok(Self {
            client,
            max_image_size,
        })
    }

    /// Fetch a single image and validate that the payload is a known
    /// raster format.
    ///
    /// There is no retry here: a failed image is left alone for the
    /// current pass, and the next save of the entry gets another chance.
    pub async fn fetch(&self, url: &Url) -> Result<FetchedImage> {
        debug!("Fetching image: {}", url);

        let response = self.client.get(url.as_str()).send().await?;

        if !response.status().is_success() {
            return Err(Error::Validation(format!(
                "HTTP {} for {}",
                response.status(),
                url
            )));
        }

        // Extract the content type before consuming the response
        let content_type = response
            .headers()
            .get(header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(String::from);

        // Check the declared length before reading the body
        if let Some(content_length) = response.content_length() {
            if content_length > self.max_image_size as u64 {
                return Err(Error::Validation(format!(
                    "Image size {} exceeds maximum {}",
                    content_length, self.max_image_size
                )));
            }
        }

        let bytes = response.bytes().await?;

        if bytes.len() > self.max_image_size {
            return Err(Error::Validation(format!(
                "Image size {} exceeds maximum {}",
                bytes.len(),
                self.max_image_size
            )));
        }

        // Trust the payload signature over the declared content type; some
        // servers label images as application/octet-stream or worse.
        let format = ImageFormat::sniff(&bytes)
            .or_else(|| content_type.as_deref().and_then(ImageFormat::from_content_type))
            .ok_or_else(|| {
                Error::Validation(format!(
                    "Response from {} is not a supported image (content-type: {})",
                    url,
                    content_type.as_deref().unwrap_or("none")
                ))
            })?;

        Ok(FetchedImage {
            bytes: bytes.to_vec(),
            format,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fetcher_creation() {
        let fetcher = ImageFetcher::new(
            "TestBot/1.0".to_string(),
            Duration::from_secs(10),
            10_485_760,
        );
        assert!(fetcher.is_ok());
    }

    #[test]
    fn test_sniff_magic_bytes() {
        let png = [0x89, 0x50, 0x4E, 0x47, 0x0D, 0x0A, 0x1A, 0x0A, 0x00, 0x00];
        assert_eq!(ImageFormat::sniff(&png), Some(ImageFormat::Png));

        let jpeg = [0xFF, 0xD8, 0xFF, 0xE0, 0x00, 0x10, 0x4A, 0x46];
        assert_eq!(ImageFormat::sniff(&jpeg), Some(ImageFormat::Jpeg));

        assert_eq!(ImageFormat::sniff(b"GIF89a\x00\x00"), Some(ImageFormat::Gif));

        let webp = b"RIFF\x24\x00\x00\x00WEBPVP8 ";
        assert_eq!(ImageFormat::sniff(webp), Some(ImageFormat::Webp));
    }

    #[test]
    fn test_sniff_rejects_non_images() {
        assert_eq!(ImageFormat::sniff(b"<!DOCTYPE html><html>"), None);
        assert_eq!(ImageFormat::sniff(b""), None);
        assert_eq!(ImageFormat::sniff(b"plain text"), None);
    }

    #[test]
    fn test_format_from_content_type() {
        assert_eq!(
            ImageFormat::from_content_type("image/png"),
            Some(ImageFormat::Png)
        );
        assert_eq!(
            ImageFormat::from_content_type("image/jpeg; charset=binary"),
            Some(ImageFormat::Jpeg)
        );
        assert_eq!(
            ImageFormat::from_content_type("IMAGE/WEBP"),
            Some(ImageFormat::Webp)
        );
        assert_eq!(ImageFormat::from_content_type("text/html"), None);
        assert_eq!(ImageFormat::from_content_type("image/svg+xml"), None);
    }

    #[test]
    fn test_canonical_extensions() {
        assert_eq!(ImageFormat::Jpeg.ext(), "jpg");
        assert_eq!(ImageFormat::Png.ext(), "png");
        assert_eq!(ImageFormat::Gif.ext(), "gif");
        assert_eq!(ImageFormat::Webp.ext(), "webp");
    }
}
