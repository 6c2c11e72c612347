// Command-line interface

pub mod commands;

use clap::{Parser, Subcommand};

#[derive(Parser, Debug)]
#[command(name = "image-mirror")]
#[command(about = "Image mirror - local image cache for saved articles", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Serve the content store over HTTP
    Serve {
        /// Port to listen on
        #[arg(short, long, env = "PORT")]
        port: Option<u16>,

        /// Host to bind to
        #[arg(long, env = "HOST")]
        host: Option<String>,
    },

    /// Localize every image referenced by an HTML file
    Process {
        /// Path to the HTML file
        input: String,

        /// Page URL the document was saved from (base for relative references)
        #[arg(short, long)]
        url: String,

        /// Write the rewritten document here instead of stdout
        #[arg(short, long)]
        output: Option<String>,
    },

    /// Localize a single image URL
    Image {
        /// Image URL to fetch and store
        url: String,

        /// Page URL the image was referenced from
        #[arg(short, long)]
        page: String,
    },
}
