use crate::config::{ConfigSource, Settings};
use crate::downloader::{store::ImageStore, ImageDownloader, RewriteResult};
use crate::Result;
use std::sync::Arc;

fn build_downloader(settings: &Arc<Settings>) -> Result<ImageDownloader> {
    let store = ImageStore::new(settings.store.root_dir.clone());
    let config: Arc<dyn ConfigSource> = settings.clone();
    ImageDownloader::new(&settings.downloader, config, store)
}

/// Rewrite an HTML file so its image references point at the local store
pub async fn process_file(
    settings: Settings,
    input: &str,
    page_url: &str,
    output: Option<String>,
) -> Result<()> {
    let settings = Arc::new(settings);
    let downloader = build_downloader(&settings)?;

    let html = tokio::fs::read_to_string(input).await?;

    match downloader.process_html(&html, page_url).await {
        RewriteResult::Changed(rewritten) => {
            match output {
                Some(path) => {
                    tokio::fs::write(&path, &rewritten).await?;
                    println!(
                        "\x1b[32m\u{2713}\x1b[0m Rewrote image references, output written to {path}"
                    );
                }
                None => {
                    println!("{rewritten}");
                }
            }
        }
        RewriteResult::Unchanged => {
            println!("No image references were localized, document unchanged");
        }
    }

    Ok(())
}

/// Fetch and store a single image, printing the local reference
pub async fn localize_image(settings: Settings, image_url: &str, page_url: &str) -> Result<()> {
    let settings = Arc::new(settings);
    let downloader = build_downloader(&settings)?;

    match downloader.process_single_image(image_url, page_url).await {
        RewriteResult::Changed(local_ref) => {
            println!("\x1b[32m\u{2713}\x1b[0m Stored as {local_ref}");
        }
        RewriteResult::Unchanged => {
            println!("Image was not localized (unreachable, not an image, or already local)");
        }
    }

    Ok(())
}
