use anyhow::{Context, Result};
use clap::Parser;
use mock_server::Store;
use tokio::net::TcpListener;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser, Debug)]
#[command(name = "mock-server")]
#[command(about = "In-memory AfyaLink backend for local development", long_about = None)]
struct Args {
    /// Address to bind
    #[arg(long, env = "HOST", default_value = "127.0.0.1")]
    host: String,

    /// Port to bind
    #[arg(long, env = "PORT", default_value_t = 5000)]
    port: u16,

    /// Preload a demo doctor (doc1 / password123) and two programs
    #[arg(long)]
    seed: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "mock_server=info,tower_http=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let mut store = Store::default();
    if args.seed {
        store.seed_demo().context("Failed to seed demo data")?;
    }

    let addr = format!("{}:{}", args.host, args.port);
    let listener = TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind {addr}"))?;
    mock_server::serve(listener, store)
        .await
        .context("Server terminated")
}
