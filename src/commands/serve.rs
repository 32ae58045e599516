//! Serve command implementation
//!
//! Brings up the full store: engine, background compactor, and the RESP
//! listener, then runs until Ctrl+C.

use granary::{server, Result, ServerConfig, StorageEngine};
use std::path::PathBuf;
use std::sync::Arc;
use tokio::signal;

/// Run the granary server
pub async fn run_serve(
    data_dir: Option<PathBuf>,
    port: Option<u16>,
    memtable_max: Option<usize>,
    config_path: Option<PathBuf>,
) -> Result<()> {
    let mut config = match config_path {
        Some(path) => ServerConfig::load(&path)?,
        None => ServerConfig::default(),
    };
    if let Some(data_dir) = data_dir {
        config.data_dir = data_dir;
    }
    if let Some(port) = port {
        config.port = port;
    }
    if let Some(memtable_max) = memtable_max {
        config.memtable_max = memtable_max;
    }

    println!("granary starting");
    println!("━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━");
    println!("Data directory: {:?}", config.data_dir);
    println!("Client port: {}", config.port);
    println!("Memtable threshold: {} keys", config.memtable_max);
    println!("Compaction trigger: {} tables", config.compact_trigger);
    println!();

    let engine = Arc::new(StorageEngine::new(config.engine_config())?);
    println!("✓ Storage engine initialized");

    engine.start_compaction();
    println!("✓ Compactor started");

    let addr = format!("0.0.0.0:{}", config.port);
    let server_engine = Arc::clone(&engine);
    let server_handle = tokio::spawn(async move {
        if let Err(e) = server::serve(server_engine, &addr).await {
            eprintln!("server error: {}", e);
        }
    });

    println!();
    println!("Ready on port {}. Press Ctrl+C to stop.", config.port);
    println!();

    tokio::select! {
        _ = signal::ctrl_c() => {
            println!();
            println!("Shutting down...");
        }
        _ = server_handle => {
            eprintln!("server stopped unexpectedly");
        }
    }

    println!("{}", engine.metrics_summary());
    println!("✓ Stopped");

    Ok(())
}
