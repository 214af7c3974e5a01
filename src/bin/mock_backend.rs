//! Mock points backend
//!
//! Serves the admin API from in-memory data for local testing of the CLI.
//!
//! Behavior:
//! 1. Listens on configurable port (default 1314, the CLI's default base URL)
//! 2. Accepts `POST /admin/v1/login` with the seeded account (admin / admin123)
//! 3. Every other route needs the issued bearer token, else answers code 3999
//! 4. Overdrafts and unknown records answer code 1001
//!
//! Usage:
//!   cargo run --bin mock-backend -- --port 1314

use clap::Parser;
use points_admin::io::mock_backend::{self, MockBackend, DEFAULT_PASSWORD, DEFAULT_USERNAME};
use std::sync::Arc;
use tokio::net::TcpListener;
use tokio::sync::watch;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "mock-backend")]
#[command(about = "In-memory points backend for local simulation")]
struct Args {
    /// TCP port to listen on
    #[arg(short, long, default_value = "1314")]
    port: u16,

    /// Bind address
    #[arg(long, default_value = "127.0.0.1")]
    host: String,

    /// Extra account as username:password (repeatable)
    #[arg(long = "account")]
    accounts: Vec<String>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .init();

    let args = Args::parse();

    let mut backend = MockBackend::new();
    for account in &args.accounts {
        let Some((username, password)) = account.split_once(':') else {
            anyhow::bail!("--account expects username:password, got {:?}", account);
        };
        backend = backend.with_account(username, password);
    }

    let listener = TcpListener::bind(format!("{}:{}", args.host, args.port)).await?;
    info!(
        addr = %listener.local_addr()?,
        username = DEFAULT_USERNAME,
        password = DEFAULT_PASSWORD,
        extra_accounts = args.accounts.len(),
        "mock_backend_ready"
    );

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            let _ = shutdown_tx.send(true);
        }
    });

    mock_backend::serve(listener, Arc::new(backend), shutdown_rx).await?;
    Ok(())
}
