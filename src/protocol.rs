//! Wire protocol message framing
//!
//! A minimal RESP-2 subset: requests arrive as arrays of bulk strings
//! (`*3\r\n$3\r\nSET\r\n$1\r\nk\r\n$1\r\nv\r\n`), responses leave as a
//! simple string (`+OK`), a bulk string, or an error line. Only SET, GET,
//! and DEL exist; the command word is case-insensitive.

use crate::{Result, StorageError};
use tokio::io::{AsyncBufRead, AsyncBufReadExt};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Request {
    Set { key: String, value: String },
    Get { key: String },
    Del { key: String },
}

/// Read one request frame. `Ok(None)` means the peer closed the
/// connection cleanly between frames.
pub async fn read_request<R>(reader: &mut R) -> Result<Option<Request>>
where
    R: AsyncBufRead + Unpin,
{
    let header = match read_line(reader).await? {
        Some(line) => line,
        None => return Ok(None),
    };

    let argc: usize = header
        .strip_prefix('*')
        .and_then(|count| count.parse().ok())
        .ok_or_else(|| {
            StorageError::Protocol(format!("expected array header, got {:?}", header))
        })?;
    if !(2..=3).contains(&argc) {
        return Err(StorageError::Protocol(format!(
            "unsupported argument count {}",
            argc
        )));
    }

    let mut args = Vec::with_capacity(argc);
    for _ in 0..argc {
        args.push(read_bulk(reader).await?);
    }

    let command = args[0].to_ascii_uppercase();
    match (command.as_str(), argc) {
        ("SET", 3) => {
            let value = args.pop().unwrap_or_default();
            let key = args.pop().unwrap_or_default();
            Ok(Some(Request::Set { key, value }))
        }
        ("GET", 2) => Ok(Some(Request::Get {
            key: args.swap_remove(1),
        })),
        ("DEL", 2) => Ok(Some(Request::Del {
            key: args.swap_remove(1),
        })),
        _ => Err(StorageError::Protocol(format!(
            "unknown command {:?} with {} arguments",
            command,
            argc - 1
        ))),
    }
}

async fn read_line<R>(reader: &mut R) -> Result<Option<String>>
where
    R: AsyncBufRead + Unpin,
{
    let mut line = String::new();
    let bytes_read = reader.read_line(&mut line).await?;
    if bytes_read == 0 {
        return Ok(None);
    }
    while line.ends_with('\n') || line.ends_with('\r') {
        line.pop();
    }
    Ok(Some(line))
}

async fn read_bulk<R>(reader: &mut R) -> Result<String>
where
    R: AsyncBufRead + Unpin,
{
    let header = read_line(reader).await?.ok_or_else(|| {
        StorageError::Protocol("stream ended inside a request frame".to_string())
    })?;
    let declared: usize = header
        .strip_prefix('$')
        .and_then(|len| len.parse().ok())
        .ok_or_else(|| {
            StorageError::Protocol(format!("expected bulk length, got {:?}", header))
        })?;

    let payload = read_line(reader).await?.ok_or_else(|| {
        StorageError::Protocol("stream ended inside a bulk string".to_string())
    })?;
    if payload.len() != declared {
        return Err(StorageError::Protocol(format!(
            "bulk length mismatch: declared {}, got {}",
            declared,
            payload.len()
        )));
    }
    Ok(payload)
}

/// Frame a request for the wire; what the client side sends.
pub fn encode_request(request: &Request) -> String {
    match request {
        Request::Set { key, value } => format!(
            "*3\r\n$3\r\nSET\r\n${}\r\n{}\r\n${}\r\n{}\r\n",
            key.len(),
            key,
            value.len(),
            value
        ),
        Request::Get { key } => format!("*2\r\n$3\r\nGET\r\n${}\r\n{}\r\n", key.len(), key),
        Request::Del { key } => format!("*2\r\n$3\r\nDEL\r\n${}\r\n{}\r\n", key.len(), key),
    }
}

pub fn ok_response() -> &'static str {
    "+OK\r\n"
}

pub fn bulk_response(value: &str) -> String {
    format!("${}\r\n{}\r\n", value.len(), value)
}

pub fn error_response(message: &str) -> String {
    format!("-ERR {}\r\n", message)
}
