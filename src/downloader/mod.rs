// Image localization pipeline: fetch remote images referenced by saved
// articles and rewrite documents to point at the local copies.

pub mod fetcher;
pub mod html;
pub mod store;

use crate::config::{ConfigSource, DownloaderConfig};
use crate::error::Result;
use crate::utils::resolve_image_url;
use fetcher::ImageFetcher;
use futures::stream::{self, StreamExt};
use std::sync::Arc;
use std::time::Duration;
use store::ImageStore;
use tracing::{debug, warn};

/// Route under which the content store is served
pub const LOCAL_ROUTE: &str = "/local-store";

/// Outcome of a document or single-image pass
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RewriteResult {
    /// At least one reference was localized; carries the replacement value
    Changed(String),
    /// Nothing to do; the caller must leave the stored value untouched
    Unchanged,
}

/// Outcome of localizing one image
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FetchOutcome {
    Stored(StoredImage),
    /// No safe localization for this reference; leave the original as-is
    NotApplicable,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredImage {
    /// Key plus canonical extension, e.g. `9f2c1a40d2b317e8.jpg`
    pub filename: String,
    /// Reference to substitute into the document
    pub local_ref: String,
}

/// Orchestrator for image localization.
///
/// Stateless across passes: each call resolves, fetches, stores, and
/// rewrites in a single bounded sweep. Failures never escape a pass; the
/// worst case is a document that keeps some of its remote references.
pub struct ImageDownloader {
    fetcher: ImageFetcher,
    store: ImageStore,
    config: Arc<dyn ConfigSource>,
    max_images_per_document: usize,
    download_concurrency: usize,
}

impl ImageDownloader {
    pub fn new(
        downloader_config: &DownloaderConfig,
        config: Arc<dyn ConfigSource>,
        store: ImageStore,
    ) -> Result<Self> {
        let fetcher = ImageFetcher::new(
            downloader_config.user_agent.clone(),
            Duration::from_secs(downloader_config.timeout_seconds),
            downloader_config.max_image_size,
        )?;

        Ok(Self {
            fetcher,
            store,
            config,
            max_images_per_document: downloader_config.max_images_per_document,
            download_concurrency: downloader_config.download_concurrency.max(1),
        })
    }

    /// Localize every image referenced by an HTML document.
    ///
    /// Distinct URLs are fetched concurrently, then substituted by URL
    /// identity over the original text, so the result does not depend on
    /// fetch completion order. References that cannot be localized keep
    /// their original value.
    pub async fn process_html(&self, html: &str, page_url: &str) -> RewriteResult {
        let mut urls = html::collect_image_urls(html);
        if urls.is_empty() {
            debug!("No image references found for {}", page_url);
            return RewriteResult::Unchanged;
        }

        // Bound the pass: per-image latency is capped by the client
        // timeout, so capping the image count caps the whole save.
        if urls.len() > self.max_images_per_document {
            warn!(
                "Document at {} references {} images, processing first {}",
                page_url,
                urls.len(),
                self.max_images_per_document
            );
            urls.truncate(self.max_images_per_document);
        }

        let outcomes: Vec<(String, Result<FetchOutcome>)> = stream::iter(urls)
            .map(|image_url| async move {
                let outcome = self.fetch_and_store(&image_url, page_url).await;
                (image_url, outcome)
            })
            .buffer_unordered(self.download_concurrency)
            .collect()
            .await;

        let mut replacements = Vec::new();
        for (image_url, outcome) in outcomes {
            match outcome {
                Ok(FetchOutcome::Stored(stored)) => {
                    replacements.push((image_url, stored.local_ref));
                }
                Ok(FetchOutcome::NotApplicable) => {}
                Err(e) => {
                    warn!("Failed to store image {}: {}", image_url, e);
                }
            }
        }

        if replacements.is_empty() {
            return RewriteResult::Unchanged;
        }

        let (rewritten, substituted) = html::substitute_urls(html, &replacements);
        if substituted == 0 {
            return RewriteResult::Unchanged;
        }

        debug!(
            "Localized {} image reference(s) for {}",
            substituted, page_url
        );
        RewriteResult::Changed(rewritten)
    }

    /// Localize a bare image URL, as held by preview/thumbnail fields
    pub async fn process_single_image(&self, image_url: &str, page_url: &str) -> RewriteResult {
        match self.fetch_and_store(image_url, page_url).await {
            Ok(FetchOutcome::Stored(stored)) => RewriteResult::Changed(stored.local_ref),
            Ok(FetchOutcome::NotApplicable) => RewriteResult::Unchanged,
            Err(e) => {
                warn!("Failed to store image {}: {}", image_url, e);
                RewriteResult::Unchanged
            }
        }
    }

    /// Resolve, fetch, validate, and store one image.
    ///
    /// Every non-storage failure collapses to `NotApplicable`: the image
    /// keeps its original reference and the save proceeds. Only a content
    /// store write error surfaces, and callers above treat it per-image.
    pub async fn fetch_and_store(&self, image_url: &str, page_url: &str) -> Result<FetchOutcome> {
        let image_url = image_url.trim();
        if image_url.is_empty() {
            return Ok(FetchOutcome::NotApplicable);
        }

        let public_base = normalized_base(&self.config.public_base_url());

        // References already pointing at this store must not be re-fetched
        if is_local_ref(image_url, &public_base) {
            debug!("Skipping already-local reference {}", image_url);
            return Ok(FetchOutcome::NotApplicable);
        }

        let Some(resolved) = resolve_image_url(image_url, page_url) else {
            debug!(
                "Skipping unresolvable image reference {} (page {})",
                image_url, page_url
            );
            return Ok(FetchOutcome::NotApplicable);
        };

        let key = ImageStore::storage_key(&resolved);

        let fetched = match self.fetcher.fetch(&resolved).await {
            Ok(fetched) => fetched,
            Err(e) => {
                debug!("Could not fetch {}: {}", resolved, e);
                return Ok(FetchOutcome::NotApplicable);
            }
        };

        let filename = format!("{}.{}", key, fetched.format.ext());

        // Content-addressed: an existing object for this key already holds
        // these bytes, so the write can be skipped on repeat saves.
        if !self.store.exists(&filename).await {
            self.store.put(&filename, &fetched.bytes).await?;
        }

        let local_ref = format!("{}{}/{}", public_base, LOCAL_ROUTE, filename);

        Ok(FetchOutcome::Stored(StoredImage {
            filename,
            local_ref,
        }))
    }
}

fn normalized_base(public_base_url: &str) -> String {
    public_base_url.trim().trim_end_matches('/').to_string()
}

/// A reference is local when it already points under the store route,
/// either root-relative or absolute under the configured public base.
fn is_local_ref(image_url: &str, public_base: &str) -> bool {
    let route_prefix = format!("{LOCAL_ROUTE}/");
    if image_url.starts_with(&route_prefix) {
        return true;
    }

    !public_base.is_empty() && image_url.starts_with(&format!("{public_base}{route_prefix}"))
}
