use clap::{Parser, Subcommand, ValueEnum};
use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION};
use reqwest::Url;
use serde_json::Value;

#[derive(Parser)]
#[command(name = "cache-cli")]
#[command(about = "Operator CLI for the cache proxy", long_about = None)]
struct Cli {
    #[arg(short, long, default_value = "http://localhost:8081")]
    url: String,

    #[arg(short, long, env = "CACHE_PROXY_ADMIN_KEY")]
    key: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Clone, Copy, ValueEnum)]
enum Toggle {
    On,
    Off,
}

#[derive(Subcommand)]
enum Commands {
    /// Show proxy version and API availability
    Status,
    /// Mark the API available (on) or unavailable (off)
    Availability {
        #[arg(value_enum)]
        state: Toggle,
    },
    /// Inspect the cache entry for a key
    Entry { key: String },
    /// Clear a cache entry, un-blocking the key
    Clear { key: String },
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    let client = reqwest::Client::new();

    let mut headers = HeaderMap::new();
    headers.insert(
        AUTHORIZATION,
        HeaderValue::from_str(&format!("Bearer {}", cli.key))?,
    );

    let base = cli.url.trim_end_matches('/');
    let request = match cli.command {
        Commands::Status => client.get(format!("{base}/admin/status")),
        Commands::Availability { state } => client
            .put(format!("{base}/admin/availability"))
            .json(&serde_json::json!({ "available": matches!(state, Toggle::On) })),
        Commands::Entry { key } => client.get(entry_url(base, &key)?),
        Commands::Clear { key } => client.delete(entry_url(base, &key)?),
    };

    let res = request.headers(headers).send().await?;
    print_response(res).await
}

/// `{base}/admin/entries/{key}` with the key percent-encoded as a single path segment.
fn entry_url(base: &str, key: &str) -> Result<Url, Box<dyn std::error::Error>> {
    let mut url = Url::parse(base)?;
    url.path_segments_mut()
        .map_err(|_| format!("{base} cannot be used as a base URL"))?
        .pop_if_empty()
        .extend(["admin", "entries", key]);
    Ok(url)
}

async fn print_response(res: reqwest::Response) -> Result<(), Box<dyn std::error::Error>> {
    let status = res.status();
    if !status.is_success() {
        eprintln!("Error: Admin API returned status {}", status);
        if let Ok(text) = res.text().await {
            eprintln!("Response: {}", text);
        }
        std::process::exit(1);
    }

    let json: Value = res.json().await?;
    println!("{}", serde_json::to_string_pretty(&json)?);
    Ok(())
}
