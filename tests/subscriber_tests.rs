use image_mirror::config::{
    ConfigSource, DownloaderConfig, ServerConfig, Settings, StoreConfig,
};
use image_mirror::downloader::store::ImageStore;
use image_mirror::downloader::ImageDownloader;
use image_mirror::subscriber::{EntryChanges, EntryEvent, EntrySubscriber};
use std::path::Path;
use std::sync::Arc;

const PNG_BYTES: &[u8] = &[
    0x89, 0x50, 0x4E, 0x47, 0x0D, 0x0A, 0x1A, 0x0A, 0x00, 0x00, 0x00, 0x0D, b'I', b'H', b'D',
    b'R',
];

fn test_settings(store_dir: &Path, enabled: bool) -> Settings {
    Settings {
        server: ServerConfig {
            host: "127.0.0.1".to_string(),
            port: 3000,
        },
        store: StoreConfig {
            root_dir: store_dir.to_path_buf(),
        },
        downloader: DownloaderConfig {
            enabled,
            public_base_url: String::new(),
            timeout_seconds: 5,
            max_image_size: 1_048_576,
            max_images_per_document: 50,
            download_concurrency: 4,
            user_agent: "ImageMirror-test/0.1".to_string(),
        },
    }
}

fn build_subscriber(settings: Settings) -> EntrySubscriber {
    let settings = Arc::new(settings);
    let store = ImageStore::new(settings.store.root_dir.clone());
    let config: Arc<dyn ConfigSource> = settings.clone();
    let downloader = ImageDownloader::new(&settings.downloader, config.clone(), store).unwrap();
    EntrySubscriber::new(downloader, config)
}

#[tokio::test]
async fn test_disabled_config_skips_pipeline_entirely() {
    let mut server = mockito::Server::new_async().await;
    let mock = server
        .mock("GET", "/a.png")
        .with_status(200)
        .with_header("content-type", "image/png")
        .with_body(PNG_BYTES)
        .expect(0)
        .create_async()
        .await;

    let dir = tempfile::tempdir().unwrap();
    let subscriber = build_subscriber(test_settings(dir.path(), false));

    let entry = EntryEvent {
        content: r#"<img src="/a.png">"#.to_string(),
        url: format!("{}/article", server.url()),
        preview_picture: Some(format!("{}/a.png", server.url())),
    };

    let mutations = subscriber.entry_created(&entry).await;
    assert!(mutations.is_empty());

    let mutations = subscriber
        .entry_updated(
            &entry,
            &EntryChanges {
                content: true,
                preview_picture: true,
            },
        )
        .await;
    assert!(mutations.is_empty());

    // No fetch was ever attempted
    mock.assert_async().await;
}

#[tokio::test]
async fn test_created_entry_localizes_content_and_preview() {
    let mut server = mockito::Server::new_async().await;
    server
        .mock("GET", "/inline.png")
        .with_status(200)
        .with_header("content-type", "image/png")
        .with_body(PNG_BYTES)
        .create_async()
        .await;
    server
        .mock("GET", "/preview.png")
        .with_status(200)
        .with_header("content-type", "image/png")
        .with_body(PNG_BYTES)
        .create_async()
        .await;

    let dir = tempfile::tempdir().unwrap();
    let subscriber = build_subscriber(test_settings(dir.path(), true));

    let entry = EntryEvent {
        content: r#"<p>Text</p><img src="/inline.png">"#.to_string(),
        url: format!("{}/article", server.url()),
        preview_picture: Some(format!("{}/preview.png", server.url())),
    };

    let mutations = subscriber.entry_created(&entry).await;

    let content = mutations.content.expect("content should be rewritten");
    assert!(content.contains("/local-store/"));
    assert!(!content.contains("/inline.png"));

    let preview = mutations
        .preview_picture
        .expect("preview should be rewritten");
    assert!(preview.starts_with("/local-store/"));
    assert!(preview.ends_with(".png"));
}

#[tokio::test]
async fn test_updated_entry_honors_change_flags() {
    let mut server = mockito::Server::new_async().await;
    server
        .mock("GET", "/inline.png")
        .with_status(200)
        .with_header("content-type", "image/png")
        .with_body(PNG_BYTES)
        .create_async()
        .await;
    let preview_mock = server
        .mock("GET", "/preview.png")
        .with_status(200)
        .with_header("content-type", "image/png")
        .with_body(PNG_BYTES)
        .expect(0)
        .create_async()
        .await;

    let dir = tempfile::tempdir().unwrap();
    let subscriber = build_subscriber(test_settings(dir.path(), true));

    let entry = EntryEvent {
        content: r#"<img src="/inline.png">"#.to_string(),
        url: format!("{}/article", server.url()),
        preview_picture: Some(format!("{}/preview.png", server.url())),
    };

    // Only the content field changed; the preview must not be touched
    let mutations = subscriber
        .entry_updated(
            &entry,
            &EntryChanges {
                content: true,
                preview_picture: false,
            },
        )
        .await;

    assert!(mutations.content.is_some());
    assert!(mutations.preview_picture.is_none());
    preview_mock.assert_async().await;
}

#[tokio::test]
async fn test_update_with_unreachable_images_mutates_nothing() {
    let mut server = mockito::Server::new_async().await;
    server
        .mock("GET", "/gone.png")
        .with_status(404)
        .create_async()
        .await;

    let dir = tempfile::tempdir().unwrap();
    let subscriber = build_subscriber(test_settings(dir.path(), true));

    let entry = EntryEvent {
        content: r#"<img src="/gone.png">"#.to_string(),
        url: format!("{}/article", server.url()),
        preview_picture: None,
    };

    let mutations = subscriber
        .entry_updated(
            &entry,
            &EntryChanges {
                content: true,
                preview_picture: true,
            },
        )
        .await;

    // Nothing localized: the caller must not bump the stored entity
    assert!(mutations.is_empty());
}
