// Lifecycle hook: rewrites entry fields with localized image references
// just before the surrounding save is flushed.

use crate::config::ConfigSource;
use crate::downloader::{ImageDownloader, RewriteResult};
use std::sync::Arc;
use tracing::{debug, info};

/// Field values of an entry as seen by the save in flight
#[derive(Debug, Clone)]
pub struct EntryEvent {
    /// Article HTML
    pub content: String,
    /// Source page URL, the base for resolving relative references
    pub url: String,
    /// Bare URL of the preview/thumbnail image, if any
    pub preview_picture: Option<String>,
}

/// Which fields the caller's diff marked as changed on an update
#[derive(Debug, Clone, Copy, Default)]
pub struct EntryChanges {
    pub content: bool,
    pub preview_picture: bool,
}

/// Replacement values to write back into the in-flight change set.
/// `None` means "leave the field as-is".
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EntryMutations {
    pub content: Option<String>,
    pub preview_picture: Option<String>,
}

impl EntryMutations {
    pub fn is_empty(&self) -> bool {
        self.content.is_none() && self.preview_picture.is_none()
    }
}

/// Subscriber invoked by the persistence layer on entry create/update.
///
/// The configuration accessor is injected and read per event, and the
/// caller supplies the field diff for updates, so this type carries no
/// knowledge of the entity manager or its change tracking.
pub struct EntrySubscriber {
    downloader: ImageDownloader,
    config: Arc<dyn ConfigSource>,
}

impl EntrySubscriber {
    pub fn new(downloader: ImageDownloader, config: Arc<dyn ConfigSource>) -> Self {
        Self { downloader, config }
    }

    /// A new entry is about to be inserted: localize the whole document
    /// and the preview picture.
    pub async fn entry_created(&self, entry: &EntryEvent) -> EntryMutations {
        if !self.config.download_images_enabled() {
            return EntryMutations::default();
        }

        let mutations = EntryMutations {
            content: self.localize_content(entry).await,
            preview_picture: self.localize_preview(entry).await,
        };

        if !mutations.is_empty() {
            info!("Localized images for new entry {}", entry.url);
        }

        mutations
    }

    /// An existing entry is about to be updated: only fields the caller's
    /// diff marked as changed are reprocessed.
    pub async fn entry_updated(&self, entry: &EntryEvent, changes: &EntryChanges) -> EntryMutations {
        if !self.config.download_images_enabled() {
            return EntryMutations::default();
        }

        let mutations = EntryMutations {
            content: if changes.content {
                self.localize_content(entry).await
            } else {
                None
            },
            preview_picture: if changes.preview_picture {
                self.localize_preview(entry).await
            } else {
                None
            },
        };

        if !mutations.is_empty() {
            info!("Localized images for updated entry {}", entry.url);
        }

        mutations
    }

    async fn localize_content(&self, entry: &EntryEvent) -> Option<String> {
        match self.downloader.process_html(&entry.content, &entry.url).await {
            RewriteResult::Changed(html) => Some(html),
            RewriteResult::Unchanged => {
                debug!("Content of {} left untouched", entry.url);
                None
            }
        }
    }

    async fn localize_preview(&self, entry: &EntryEvent) -> Option<String> {
        let preview = entry.preview_picture.as_deref()?;

        match self
            .downloader
            .process_single_image(preview, &entry.url)
            .await
        {
            RewriteResult::Changed(local_ref) => Some(local_ref),
            RewriteResult::Unchanged => {
                debug!("Preview picture of {} left untouched", entry.url);
                None
            }
        }
    }
}
