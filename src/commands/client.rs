//! Client command implementation
//!
//! One-shot SET/GET/DEL against a running granary server: frame the
//! request, print the reply.

use granary::protocol::{encode_request, Request};
use granary::{Result, StorageError};
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::TcpStream;

/// Execute a SET command
pub async fn set(addr: &str, key: String, value: String) -> Result<()> {
    let response = round_trip(addr, &Request::Set { key, value }).await?;
    println!("{}", response);
    Ok(())
}

/// Execute a GET command
pub async fn get(addr: &str, key: String) -> Result<()> {
    let response = round_trip(addr, &Request::Get { key }).await?;
    println!("{}", response);
    Ok(())
}

/// Execute a DEL command
pub async fn del(addr: &str, key: String) -> Result<()> {
    let response = round_trip(addr, &Request::Del { key }).await?;
    println!("{}", response);
    Ok(())
}

/// Send one frame and decode the reply into a printable line.
async fn round_trip(addr: &str, request: &Request) -> Result<String> {
    let mut stream = TcpStream::connect(addr).await?;
    stream.write_all(encode_request(request).as_bytes()).await?;

    let mut reader = BufReader::new(&mut stream);
    let mut line = String::new();
    reader.read_line(&mut line).await?;
    let line = line.trim_end().to_string();

    match line.chars().next() {
        Some('+') => Ok(line[1..].to_string()),
        Some('-') => Ok(line.trim_start_matches('-').to_string()),
        Some('$') => {
            let mut value = String::new();
            reader.read_line(&mut value).await?;
            Ok(value.trim_end().to_string())
        }
        _ => Err(StorageError::Protocol(format!(
            "unexpected reply {:?}",
            line
        ))),
    }
}
