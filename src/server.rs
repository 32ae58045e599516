//! TCP front end
//!
//! Accepts client connections and speaks the RESP subset over them, one
//! task per connection. The engine itself never reports "not found"; the
//! translation from a tombstone-valued GET to `-ERR Key not found`
//! happens here.

use crate::config::TOMBSTONE;
use crate::protocol::{bulk_response, error_response, ok_response, read_request, Request};
use crate::storage_engine::StorageEngine;
use crate::{Result, StorageError};
use std::sync::Arc;
use tokio::io::{AsyncWriteExt, BufReader};
use tokio::net::{TcpListener, TcpStream};

/// Bind `addr` and serve until the task is dropped.
pub async fn serve(engine: Arc<StorageEngine>, addr: &str) -> Result<()> {
    let listener = TcpListener::bind(addr).await?;
    println!("✓ Listening on {}", addr);

    loop {
        match listener.accept().await {
            Ok((stream, peer)) => {
                let engine = Arc::clone(&engine);
                tokio::spawn(async move {
                    if let Err(e) = handle_connection(stream, engine).await {
                        eprintln!("connection error from {}: {}", peer, e);
                    }
                });
            }
            Err(e) => {
                eprintln!("failed to accept connection: {}", e);
            }
        }
    }
}

/// Process request frames until the peer hangs up. A framing error gets
/// one `-ERR` reply and closes the connection; engine errors are
/// reported per request and the connection stays up.
async fn handle_connection(stream: TcpStream, engine: Arc<StorageEngine>) -> Result<()> {
    let mut reader = BufReader::new(stream);

    loop {
        let request = match read_request(&mut reader).await {
            Ok(Some(request)) => request,
            Ok(None) => return Ok(()),
            Err(StorageError::Protocol(message)) => {
                let writer = reader.get_mut();
                writer.write_all(error_response(&message).as_bytes()).await?;
                return Ok(());
            }
            Err(e) => return Err(e),
        };

        let response = dispatch(&engine, request);
        reader.get_mut().write_all(response.as_bytes()).await?;
    }
}

fn dispatch(engine: &StorageEngine, request: Request) -> String {
    match request {
        Request::Set { key, value } => match engine.set(&key, &value) {
            Ok(()) => ok_response().to_string(),
            Err(e) => error_response(&e.to_string()),
        },
        Request::Del { key } => match engine.del(&key) {
            Ok(()) => ok_response().to_string(),
            Err(e) => error_response(&e.to_string()),
        },
        Request::Get { key } => match engine.get(&key) {
            Ok(value) if value == TOMBSTONE => error_response("Key not found"),
            Ok(value) => bulk_response(&value),
            Err(e) => error_response(&e.to_string()),
        },
    }
}
