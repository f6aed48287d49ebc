use aegis_gate::GateConfig;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};
use tokio::task::JoinHandle;

/// Spin up a scripted decision service that serves exactly one connection:
/// it reads the full check request, writes `response` verbatim and closes.
/// The join handle resolves to the captured request bytes.
pub async fn spawn_decider(response: Vec<u8>) -> (String, JoinHandle<Vec<u8>>) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let endpoint = listener.local_addr().unwrap().to_string();
    let handle = tokio::spawn(async move {
        let (mut stream, _) = listener.accept().await.unwrap();
        let request = read_check_request(&mut stream).await;
        stream.write_all(&response).await.unwrap();
        stream.shutdown().await.ok();
        request
    });
    (endpoint, handle)
}

/// Like [`spawn_decider`], but serves the same response to `connections`
/// sequential connections.
#[allow(dead_code)]
pub async fn spawn_decider_serving(response: Vec<u8>, connections: usize) -> String {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let endpoint = listener.local_addr().unwrap().to_string();
    tokio::spawn(async move {
        for _ in 0..connections {
            let (mut stream, _) = listener.accept().await.unwrap();
            let _request = read_check_request(&mut stream).await;
            stream.write_all(&response).await.unwrap();
            stream.shutdown().await.ok();
        }
    });
    endpoint
}

/// A decider that accepts the connection, reads the request and then goes
/// silent without ever answering or closing. Used for timeout tests.
#[allow(dead_code)]
pub async fn spawn_silent_decider() -> String {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let endpoint = listener.local_addr().unwrap().to_string();
    tokio::spawn(async move {
        let (mut stream, _) = listener.accept().await.unwrap();
        let _request = read_check_request(&mut stream).await;
        tokio::time::sleep(std::time::Duration::from_secs(30)).await;
        drop(stream);
    });
    endpoint
}

/// A decider that closes the connection without sending a single byte.
#[allow(dead_code)]
pub async fn spawn_mute_decider() -> String {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let endpoint = listener.local_addr().unwrap().to_string();
    tokio::spawn(async move {
        let (mut stream, _) = listener.accept().await.unwrap();
        let _request = read_check_request(&mut stream).await;
        stream.shutdown().await.ok();
    });
    endpoint
}

async fn read_check_request(stream: &mut TcpStream) -> Vec<u8> {
    let mut buf = Vec::new();
    let mut chunk = [0u8; 4096];
    loop {
        if let Some(total) = expected_request_len(&buf) {
            if buf.len() >= total {
                break;
            }
        }
        let n = stream.read(&mut chunk).await.unwrap();
        if n == 0 {
            break;
        }
        buf.extend_from_slice(&chunk[..n]);
    }
    buf
}

fn expected_request_len(buf: &[u8]) -> Option<usize> {
    let head_end = buf.windows(4).position(|w| w == b"\r\n\r\n")? + 4;
    let head = std::str::from_utf8(&buf[..head_end]).ok()?;
    let content_length = head
        .lines()
        .find_map(|line| line.strip_prefix("Content-Length: "))
        .and_then(|v| v.trim().parse::<usize>().ok())?;
    Some(head_end + content_length)
}

/// A well-formed HTTP/1.1 decision response with Content-Length framing.
#[allow(dead_code)]
pub fn json_response(json: &str) -> Vec<u8> {
    format!(
        "HTTP/1.1 200 OK\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{json}",
        json.len()
    )
    .into_bytes()
}

/// An enabled config pointed at `endpoint` with a short test timeout.
#[allow(dead_code)]
pub fn test_config(endpoint: &str) -> GateConfig {
    GateConfig {
        enabled: true,
        endpoint: endpoint.to_string(),
        timeout_ms: 2_000,
        ..GateConfig::default()
    }
}
