use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use progimage_cli::api_client::ApiClient;
use progimage_core::{ImageService, StoredImageResponse};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "progimage")]
#[command(about = "Upload and fetch images from a ProgImage server")]
struct Args {
    /// Base URL of the ProgImage API
    #[arg(long, env = "PROGIMAGE_API_URL", default_value = "http://localhost:9090")]
    api_url: String,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Upload an image file and print its identifier
    Upload {
        /// Path to a PNG, JPEG or GIF file
        file: PathBuf,
    },
    /// Download an image, optionally converted to another format
    Get {
        id: String,

        /// Target format: png, jpg or gif
        #[arg(long, value_name = "EXT")]
        format: Option<String>,

        /// Output file (default: stdout)
        #[arg(long, short, value_name = "PATH")]
        output: Option<PathBuf>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    progimage_cli::init_tracing();

    let args = Args::parse();
    let client = ApiClient::new(args.api_url)?;

    match args.command {
        Command::Upload { file } => {
            let data = progimage_cli::open_upload(&file).await?;
            let id = client
                .store(data)
                .await
                .with_context(|| format!("Failed to upload {}", file.display()))?;
            println!(
                "{}",
                serde_json::to_string_pretty(&StoredImageResponse { id })?
            );
        }
        Command::Get { id, format, output } => {
            let image = match format.as_deref() {
                Some(ext) => client.get_as(&id, ext).await,
                None => client.get(&id).await,
            }
            .with_context(|| format!("Failed to fetch image {}", id))?;

            let written = match output {
                Some(path) => {
                    let mut file = tokio::fs::File::create(&path)
                        .await
                        .with_context(|| format!("Failed to create {}", path.display()))?;
                    progimage_cli::write_image(image.data, &mut file).await?
                }
                None => progimage_cli::write_image(image.data, &mut tokio::io::stdout()).await?,
            };
            tracing::info!(
                image_id = %id,
                content_type = %image.content_type,
                size_bytes = written,
                "Image downloaded"
            );
        }
    }

    Ok(())
}
