//! kvcache server entry point
//!
//! Parses the command line, restores the snapshot if there is one, and
//! serves clients until Ctrl+C.

use kvcache::snapshot::load_file;
use kvcache::{CliAction, Config, Server, StorageEngine};
use std::sync::Arc;
use tokio::signal;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

fn print_help() {
    println!(
        r#"
kvcache - An in-memory key-value cache speaking the Redis protocol

USAGE:
    kvcache [OPTIONS]

OPTIONS:
    -h, --host <HOST>          Host to bind to (default: 127.0.0.1)
    -p, --port <PORT>          Port to listen on (default: 6379)
        --dir <DIR>            Snapshot directory (default: /tmp/redis-files)
        --dbfilename <NAME>    Snapshot file name (default: dump.rdb)
    -v, --version              Print version information
        --help                 Print this help message

EXAMPLES:
    kvcache                                    # Start on 127.0.0.1:6379
    kvcache --port 6380                        # Start on port 6380
    kvcache --dir /data --dbfilename snap.rdb  # Restore from /data/snap.rdb

LOGGING:
    Set RUST_LOG to change verbosity, e.g. RUST_LOG=kvcache=debug
"#
    );
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = match Config::parse_args(std::env::args().skip(1)) {
        Ok(CliAction::Run(config)) => config,
        Ok(CliAction::Help) => {
            print_help();
            return Ok(());
        }
        Ok(CliAction::Version) => {
            println!("kvcache version {}", kvcache::VERSION);
            return Ok(());
        }
        Err(e) => {
            eprintln!("Error: {}", e);
            print_help();
            std::process::exit(1);
        }
    };

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .with_line_number(false)
        .init();

    info!(version = kvcache::VERSION, "Starting kvcache");

    let config = Arc::new(config);
    let storage = Arc::new(StorageEngine::new());

    let snapshot_path = config.snapshot_path();
    match load_file(&snapshot_path).await {
        Ok(Some(snapshot)) => {
            let restored = snapshot.restore_into(&storage);
            info!(
                path = %snapshot_path.display(),
                keys = restored,
                "Restored snapshot"
            );
        }
        Ok(None) => {
            info!(path = %snapshot_path.display(), "No snapshot found, starting empty");
        }
        Err(e) => {
            warn!(
                path = %snapshot_path.display(),
                error = %e,
                "Failed to decode snapshot, starting empty"
            );
        }
    }

    let server = Server::bind(Arc::clone(&config), storage).await?;

    let shutdown = async {
        match signal::ctrl_c().await {
            Ok(()) => info!("Shutdown signal received, stopping server..."),
            Err(e) => {
                error!(error = %e, "Failed to listen for Ctrl+C");
                std::future::pending::<()>().await
            }
        }
    };

    tokio::select! {
        _ = server.run() => {}
        _ = shutdown => {}
    }

    info!("Server shutdown complete");
    Ok(())
}
