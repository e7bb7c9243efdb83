use clap::Parser;
use tracing_subscriber::EnvFilter;

use reviewlens::app::{self, AppConfig};

/// Web frontend for the review sentiment analysis service
#[derive(Debug, Parser)]
#[command(name = "reviewlens", version, about)]
struct Args {
    /// Address to listen on
    #[arg(long, default_value = "127.0.0.1:3000")]
    bind: String,

    /// Base URL of the classification backend
    #[arg(long, env = "REVIEWLENS_API_URL", default_value = "http://127.0.0.1:8000")]
    api_url: String,

    /// Durable state file; omitted means state lives in memory only
    #[arg(long)]
    state_file: Option<std::path::PathBuf>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let args = Args::parse();

    app::run(AppConfig {
        bind: args.bind,
        api_url: args.api_url,
        state_file: args.state_file,
    })
    .await
}
