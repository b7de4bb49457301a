//! Meta Engine Backend Server
//!
//! Hosts a durable key-value store over TCP for remote `MetaEngine` clients.

use std::sync::Arc;

use clap::Parser;
use metaengine::network::Server;
use metaengine::{Config, Store, WalSyncStrategy};
use tracing_subscriber::{fmt, EnvFilter};

/// Meta Engine Server
#[derive(Parser, Debug)]
#[command(name = "metaengine-server")]
#[command(about = "Durable key-value backend for the Meta Engine record store")]
#[command(version)]
struct Args {
    /// Data directory
    #[arg(short, long, default_value = "./metaengine_data")]
    data_dir: String,

    /// Listen address (host:port)
    #[arg(short, long, default_value = "127.0.0.1:6379")]
    listen: String,

    /// Maximum concurrent connections
    #[arg(short, long, default_value = "1024")]
    max_connections: usize,

    /// Password clients must AUTH with
    #[arg(short, long)]
    password: Option<String>,

    /// WAL size in MB before a checkpoint is taken
    #[arg(short = 'w', long, default_value = "64")]
    wal_mb: u64,

    /// fsync the WAL after every write instead of every 100 entries
    #[arg(long)]
    sync_every_write: bool,
}

fn main() {
    // Initialize tracing/logging
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,metaengine=debug"));

    fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_thread_ids(true)
        .init();

    let args = Args::parse();

    tracing::info!("Meta Engine Server v{}", metaengine::VERSION);
    tracing::info!("Data directory: {}", args.data_dir);
    tracing::info!("Listen address: {}", args.listen);

    let mut builder = Config::builder()
        .data_dir(&args.data_dir)
        .listen_addr(&args.listen)
        .max_connections(args.max_connections)
        .wal_size_limit(args.wal_mb * 1024 * 1024);
    if let Some(password) = &args.password {
        builder = builder.password(password.as_str());
    }
    if args.sync_every_write {
        builder = builder.wal_sync_strategy(WalSyncStrategy::EveryWrite);
    }
    let config = builder.build();

    let store = match Store::open(config.clone()) {
        Ok(s) => Arc::new(s),
        Err(e) => {
            tracing::error!("Failed to open store: {}", e);
            std::process::exit(1);
        }
    };

    tracing::info!("Store initialized with {} keys", store.key_count());

    let server = match Server::bind(config, store) {
        Ok(s) => s,
        Err(e) => {
            tracing::error!("Failed to bind {}: {}", args.listen, e);
            std::process::exit(1);
        }
    };

    if let Err(e) = server.run() {
        tracing::error!("Server error: {}", e);
        std::process::exit(1);
    }

    tracing::info!("Server stopped");
}
