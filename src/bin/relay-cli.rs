use std::path::{Path, PathBuf};
use std::process::ExitCode;

use clap::{Parser, Subcommand};
use reqwest::multipart::{Form, Part};
use serde_json::Value;
use tokio_util::io::ReaderStream;

#[derive(Parser)]
#[command(name = "relay-cli")]
#[command(about = "Upload images to a running image relay", long_about = None)]
struct Cli {
    #[arg(short, long, default_value = "http://localhost:3000")]
    url: String,

    /// Multipart field the relay expects the image under.
    #[arg(short, long, default_value = "image")]
    field: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Upload an image and print the processor's reply
    Upload {
        path: PathBuf,

        /// Content type to declare; guessed from the extension when omitted
        #[arg(long)]
        mime: Option<String>,

        /// Endpoint path on the relay
        #[arg(long, default_value = "/api/process-image")]
        route: String,
    },
    /// Check relay liveness
    Health,
}

#[tokio::main]
async fn main() -> Result<ExitCode, Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    let client = reqwest::Client::new();
    let base = cli.url.trim_end_matches('/');

    let res = match cli.command {
        Commands::Upload { path, mime, route } => {
            let mime = mime.unwrap_or_else(|| guess_mime(&path).essence_str().to_string());
            let file = tokio::fs::File::open(&path).await?;
            let len = file.metadata().await?.len();
            let file_name = path
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_else(|| "upload".to_string());

            let part = Part::stream_with_length(
                reqwest::Body::wrap_stream(ReaderStream::new(file)),
                len,
            )
            .file_name(file_name)
            .mime_str(&mime)?;
            let form = Form::new().part(cli.field, part);

            client
                .post(format!("{}{}", base, route))
                .multipart(form)
                .send()
                .await?
        }
        Commands::Health => client.get(format!("{}/health", base)).send().await?,
    };

    print_response(res).await
}

async fn print_response(res: reqwest::Response) -> Result<ExitCode, Box<dyn std::error::Error>> {
    let status = res.status();
    if !status.is_success() {
        eprintln!("Error: relay returned status {}", status);
        if let Ok(text) = res.text().await {
            eprintln!("Response: {}", text);
        }
        return Ok(ExitCode::FAILURE);
    }

    let json: Value = res.json().await?;
    println!("{}", serde_json::to_string_pretty(&json)?);
    Ok(ExitCode::SUCCESS)
}

fn guess_mime(path: &Path) -> mime_guess::Mime {
    mime_guess::from_path(path).first_or_octet_stream()
}
