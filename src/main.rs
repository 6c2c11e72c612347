use clap::Parser;
use image_mirror::{
    cli::{Cli, Commands},
    config::Settings,
    downloader::store::ImageStore,
    server::{self, AppState},
    Error, Result,
};
use std::sync::Arc;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<()> {
    // Load environment variables from .env file if it exists
    // Silently ignore if file doesn't exist
    let _ = dotenvy::dotenv();

    // Initialize logging
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,image_mirror=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Parse CLI arguments
    let cli = Cli::parse();

    // Load configuration
    let settings = Settings::from_env()?;
    settings.validate()?;

    // Handle commands
    match cli.command {
        Commands::Serve { port, host } => {
            serve(settings, port, host).await?;
        }
        Commands::Process { input, url, output } => {
            image_mirror::cli::commands::process_file(settings, &input, &url, output).await?;
        }
        Commands::Image { url, page } => {
            image_mirror::cli::commands::localize_image(settings, &url, &page).await?;
        }
    }

    Ok(())
}

async fn serve(mut settings: Settings, port: Option<u16>, host: Option<String>) -> Result<()> {
    // Override settings with CLI arguments
    if let Some(port) = port {
        settings.server.port = port;
    }
    if let Some(host) = host {
        settings.server.host = host;
    }

    info!("Starting image mirror server");
    info!("Store: {}", settings.store.root_dir.display());
    info!("Server: {}:{}", settings.server.host, settings.server.port);

    let store = Arc::new(ImageStore::new(settings.store.root_dir.clone()));
    let state = AppState { store };
    let app = server::create_router(state);

    let addr = format!("{}:{}", settings.server.host, settings.server.port);
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .map_err(|e| Error::Internal(format!("Failed to bind to {addr}: {e}")))?;

    println!("\n========================================");
    println!("Image Mirror Server");
    println!("========================================");
    println!("Status: Running");
    println!("Address: http://{addr}");
    println!("Store: {}", settings.store.root_dir.display());
    println!("\nEndpoints:");
    println!("  GET  /health");
    println!("  GET  /stats");
    println!("  GET  /local-store/<key>.<ext>");
    println!("\nPress Ctrl+C to stop");
    println!("========================================\n");

    info!("Server listening on {}", addr);

    axum::serve(listener, app)
        .await
        .map_err(|e| Error::Internal(format!("Server error: {e}")))?;

    info!("Shutting down...");
    Ok(())
}
