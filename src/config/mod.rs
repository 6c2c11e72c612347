use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Settings {
    pub server: ServerConfig,
    pub store: StoreConfig,
    pub downloader: DownloaderConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoreConfig {
    pub root_dir: PathBuf,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DownloaderConfig {
    pub enabled: bool,
    /// Host/prefix prepended to local references in rewritten documents.
    /// Empty means root-relative references.
    pub public_base_url: String,
    pub timeout_seconds: u64,
    pub max_image_size: usize,
    pub max_images_per_document: usize,
    pub download_concurrency: usize,
    pub user_agent: String,
}

/// Accessor for the configuration values the pipeline reads per operation.
///
/// Injected into the downloader and the entry subscriber at construction.
/// Implementations are queried on every operation, never cached, so a
/// running instance picks up configuration changes without a restart.
pub trait ConfigSource: Send + Sync {
    fn download_images_enabled(&self) -> bool;
    fn public_base_url(&self) -> String;
}

impl ConfigSource for Settings {
    fn download_images_enabled(&self) -> bool {
        self.downloader.enabled
    }

    fn public_base_url(&self) -> String {
        self.downloader.public_base_url.clone()
    }
}

impl Settings {
    /// Load settings from environment variables
    pub fn from_env() -> Result<Self> {
        let host = std::env::var("HOST").unwrap_or_else(|_| "0.0.0.0".to_string());
        let port = std::env::var("PORT")
            .unwrap_or_else(|_| "3000".to_string())
            .parse()
            .map_err(|_| Error::Config("Invalid PORT value".to_string()))?;

        let root_dir = std::env::var("STORE_DIR")
            .unwrap_or_else(|_| "./data/images".to_string())
            .into();

        let enabled = std::env::var("DOWNLOAD_IMAGES_ENABLED")
            .unwrap_or_else(|_| "true".to_string())
            .parse()
            .map_err(|_| Error::Config("Invalid DOWNLOAD_IMAGES_ENABLED value".to_string()))?;

        let public_base_url = std::env::var("PUBLIC_BASE_URL").unwrap_or_default();

        let timeout_seconds = std::env::var("IMAGE_TIMEOUT")
            .unwrap_or_else(|_| "10".to_string())
            .parse()
            .map_err(|_| Error::Config("Invalid IMAGE_TIMEOUT value".to_string()))?;

        let max_image_size = std::env::var("MAX_IMAGE_SIZE")
            .unwrap_or_else(|_| "10485760".to_string())
            .parse()
            .map_err(|_| Error::Config("Invalid MAX_IMAGE_SIZE value".to_string()))?;

        let max_images_per_document = std::env::var("MAX_IMAGES_PER_DOCUMENT")
            .unwrap_or_else(|_| "50".to_string())
            .parse()
            .map_err(|_| Error::Config("Invalid MAX_IMAGES_PER_DOCUMENT value".to_string()))?;

        let download_concurrency = std::env::var("DOWNLOAD_CONCURRENCY")
            .unwrap_or_else(|_| "4".to_string())
            .parse()
            .map_err(|_| Error::Config("Invalid DOWNLOAD_CONCURRENCY value".to_string()))?;

        Ok(Settings {
            server: ServerConfig { host, port },
            store: StoreConfig { root_dir },
            downloader: DownloaderConfig {
                enabled,
                public_base_url,
                timeout_seconds,
                max_image_size,
                max_images_per_document,
                download_concurrency,
                user_agent: format!("ImageMirror/{}", env!("CARGO_PKG_VERSION")),
            },
        })
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<()> {
        if self.server.port == 0 {
            return Err(Error::Config("Port must be non-zero".to_string()));
        }

        if self.downloader.download_concurrency == 0 {
            return Err(Error::Config(
                "Download concurrency must be non-zero".to_string(),
            ));
        }

        if self.downloader.max_image_size == 0 {
            return Err(Error::Config("Max image size must be non-zero".to_string()));
        }

        if !self.downloader.public_base_url.is_empty()
            && url::Url::parse(&self.downloader.public_base_url).is_err()
        {
            return Err(Error::Config(
                "PUBLIC_BASE_URL must be a well-formed absolute URL".to_string(),
            ));
        }

        Ok(())
    }
}
