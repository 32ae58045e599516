use granary::{server, EngineConfig, StorageEngine};
use std::sync::Arc;
use tempfile::TempDir;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::TcpStream;
use tokio::time::{sleep, Duration};

async fn start_server(port: u16) -> TempDir {
    let dir = TempDir::new().unwrap();
    let engine = Arc::new(StorageEngine::new(EngineConfig::new(dir.path())).unwrap());

    tokio::spawn(async move {
        let _ = server::serve(engine, &format!("127.0.0.1:{}", port)).await;
    });
    sleep(Duration::from_millis(100)).await;
    dir
}

async fn read_reply(reader: &mut BufReader<TcpStream>) -> String {
    let mut line = String::new();
    reader.read_line(&mut line).await.unwrap();
    line
}

#[tokio::test]
async fn test_set_get_del_session() {
    let _dir = start_server(17891).await;

    let stream = TcpStream::connect("127.0.0.1:17891").await.unwrap();
    let mut reader = BufReader::new(stream);

    reader
        .get_mut()
        .write_all(b"*3\r\n$3\r\nSET\r\n$3\r\nfoo\r\n$3\r\nbar\r\n")
        .await
        .unwrap();
    assert_eq!(read_reply(&mut reader).await, "+OK\r\n");

    reader
        .get_mut()
        .write_all(b"*2\r\n$3\r\nGET\r\n$3\r\nfoo\r\n")
        .await
        .unwrap();
    assert_eq!(read_reply(&mut reader).await, "$3\r\n");
    assert_eq!(read_reply(&mut reader).await, "bar\r\n");

    reader
        .get_mut()
        .write_all(b"*2\r\n$3\r\nDEL\r\n$3\r\nfoo\r\n")
        .await
        .unwrap();
    assert_eq!(read_reply(&mut reader).await, "+OK\r\n");

    reader
        .get_mut()
        .write_all(b"*2\r\n$3\r\nGET\r\n$3\r\nfoo\r\n")
        .await
        .unwrap();
    assert_eq!(read_reply(&mut reader).await, "-ERR Key not found\r\n");
}

#[tokio::test]
async fn test_get_of_absent_key_is_an_error() {
    let _dir = start_server(17892).await;

    let stream = TcpStream::connect("127.0.0.1:17892").await.unwrap();
    let mut reader = BufReader::new(stream);

    reader
        .get_mut()
        .write_all(b"*2\r\n$3\r\nGET\r\n$5\r\nnever\r\n")
        .await
        .unwrap();
    assert_eq!(read_reply(&mut reader).await, "-ERR Key not found\r\n");
}

#[tokio::test]
async fn test_malformed_request_errors_and_closes() {
    let _dir = start_server(17893).await;

    let stream = TcpStream::connect("127.0.0.1:17893").await.unwrap();
    let mut reader = BufReader::new(stream);

    reader.get_mut().write_all(b"WHAT\r\n").await.unwrap();
    let reply = read_reply(&mut reader).await;
    assert!(reply.starts_with("-ERR "), "unexpected reply {:?}", reply);

    // the server closes the connection after a framing error
    let mut rest = String::new();
    let closed = reader.read_line(&mut rest).await.unwrap();
    assert_eq!(closed, 0);
}

#[tokio::test]
async fn test_invalid_key_is_rejected_per_request() {
    let _dir = start_server(17894).await;

    let stream = TcpStream::connect("127.0.0.1:17894").await.unwrap();
    let mut reader = BufReader::new(stream);

    reader
        .get_mut()
        .write_all(b"*3\r\n$3\r\nSET\r\n$5\r\nbad#k\r\n$1\r\nv\r\n")
        .await
        .unwrap();
    let reply = read_reply(&mut reader).await;
    assert!(reply.starts_with("-ERR Invalid key"), "got {:?}", reply);

    // connection survives an engine-level rejection
    reader
        .get_mut()
        .write_all(b"*3\r\n$3\r\nSET\r\n$2\r\nok\r\n$1\r\nv\r\n")
        .await
        .unwrap();
    assert_eq!(read_reply(&mut reader).await, "+OK\r\n");
}
