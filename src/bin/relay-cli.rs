use clap::{Parser, Subcommand};
use reqwest::header::{HeaderMap, HeaderValue, CONTENT_TYPE};
use serde_json::Value;
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "relay-cli")]
#[command(about = "Command line client for a running event relay", long_about = None)]
struct Cli {
    #[arg(short, long, default_value = "http://localhost:8080")]
    url: String,

    /// Reuse a request id instead of letting the relay generate one
    #[arg(long)]
    request_id: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// List connectors registered with the control plane
    Topics,
    /// Ensure the sink connector exists and show it
    Connector,
    /// Publish one event
    Send {
        /// Inline JSON payload
        #[arg(short, long, conflicts_with = "file")]
        data: Option<String>,
        /// Read the payload from a file
        #[arg(short, long)]
        file: Option<PathBuf>,
    },
    /// Check relay liveness
    Health,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    let client = reqwest::Client::new();
    let base = cli.url.trim_end_matches('/');

    let mut headers = HeaderMap::new();
    if let Some(id) = &cli.request_id {
        headers.insert("x-request-id", HeaderValue::from_str(id)?);
    }

    let request = match cli.command {
        Commands::Topics => client.get(format!("{base}/topics")),
        Commands::Connector => client.get(format!("{base}/topic")),
        Commands::Health => client.get(format!("{base}/health")),
        Commands::Send { data, file } => {
            let payload = match (data, file) {
                (Some(data), _) => data,
                (None, Some(path)) => std::fs::read_to_string(path)?,
                (None, None) => return Err("send needs --data or --file".into()),
            };
            client
                .post(format!("{base}/logging"))
                .header(CONTENT_TYPE, "application/json")
                .body(payload)
        }
    };

    let res = request.headers(headers).send().await?;
    print_response(res).await
}

async fn print_response(res: reqwest::Response) -> Result<(), Box<dyn std::error::Error>> {
    let status = res.status();
    let request_id = res
        .headers()
        .get("x-request-id")
        .and_then(|v| v.to_str().ok())
        .map(str::to_string);
    if let Some(id) = request_id {
        eprintln!("x-request-id: {}", id);
    }

    let text = res.text().await?;
    let rendered = match serde_json::from_str::<Value>(&text) {
        Ok(json) => serde_json::to_string_pretty(&json)?,
        Err(_) => text,
    };

    if !status.is_success() {
        eprintln!("Error: relay returned status {}", status);
        eprintln!("{}", rendered);
        std::process::exit(1);
    }
    println!("{}", rendered);
    Ok(())
}
