//! One blocking request/response exchange with the decision service.
//!
//! The client speaks just enough HTTP/1.1 for the fixed check endpoint: a
//! single POST frame with `Connection: close`, then a read loop into a
//! doubling buffer until the response is complete. Completion is detected
//! from the header/body separator plus `Content-Length` when present, and
//! falls back to reading until the peer closes. Nothing is retried; any
//! failure ends the exchange.

use std::future::Future;

use memchr::memmem;
use thiserror::Error;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;

use crate::config::GateConfig;
use crate::util::Deadline;

/// Fixed path of the decision endpoint.
pub const CHECK_PATH: &str = "/api/v1/check";

/// Smallest response buffer the read loop will start with.
pub const MIN_BUFFER_BYTES: usize = 8 * 1024;

#[derive(Debug, Error)]
pub enum WireError {
    #[error("failed to connect to decision service at {endpoint}: {source}")]
    Connect {
        endpoint: String,
        source: std::io::Error,
    },
    #[error("failed to write check request: {0}")]
    Write(std::io::Error),
    #[error("failed to read decision response: {0}")]
    Read(std::io::Error),
    #[error("decision service did not answer within {0} ms")]
    TimedOut(u64),
    #[error("decision response exceeded {0} bytes before completing")]
    ResponseTooLarge(usize),
    #[error("empty response from decision service")]
    EmptyResponse,
}

/// Perform one exchange: connect, write the request frame in full, read the
/// response to completion. Returns the raw response bytes (head + body).
pub async fn exchange(config: &GateConfig, payload: &[u8]) -> Result<Vec<u8>, WireError> {
    let deadline = Deadline::new_ms(config.timeout_ms);

    let mut stream = bounded(&deadline, config.timeout_ms, TcpStream::connect(&config.endpoint))
        .await?
        .map_err(|source| WireError::Connect {
            endpoint: config.endpoint.clone(),
            source,
        })?;

    let frame = request_frame(&config.endpoint, payload);
    bounded(&deadline, config.timeout_ms, stream.write_all(&frame))
        .await?
        .map_err(WireError::Write)?;

    let initial = config
        .buffer_initial_bytes
        .max(MIN_BUFFER_BYTES)
        .min(config.buffer_max_bytes);
    let mut buf = vec![0u8; initial];
    let mut filled = 0usize;
    let mut expected: Option<usize> = None;

    loop {
        if let Some(total) = expected {
            if filled >= total {
                break;
            }
        }
        if filled == buf.len() {
            if buf.len() >= config.buffer_max_bytes {
                return Err(WireError::ResponseTooLarge(config.buffer_max_bytes));
            }
            let grown = (buf.len() * 2).min(config.buffer_max_bytes);
            buf.resize(grown, 0);
            tracing::debug!(bytes = grown, "expanded decision response buffer");
        }

        let n = bounded(&deadline, config.timeout_ms, stream.read(&mut buf[filled..]))
            .await?
            .map_err(WireError::Read)?;
        if n == 0 {
            break;
        }
        filled += n;
        if expected.is_none() {
            expected = expected_total(&buf[..filled]);
        }
    }

    if filled == 0 {
        return Err(WireError::EmptyResponse);
    }
    buf.truncate(filled);
    Ok(buf)
}

async fn bounded<T>(
    deadline: &Deadline,
    timeout_ms: u64,
    fut: impl Future<Output = T>,
) -> Result<T, WireError> {
    match tokio::time::timeout(deadline.remaining(), fut).await {
        Ok(value) => Ok(value),
        Err(_) => Err(WireError::TimedOut(timeout_ms)),
    }
}

fn request_frame(endpoint: &str, payload: &[u8]) -> Vec<u8> {
    let head = format!(
        "POST {CHECK_PATH} HTTP/1.1\r\n\
         Host: {endpoint}\r\n\
         Content-Type: application/json\r\n\
         Content-Length: {}\r\n\
         Connection: close\r\n\r\n",
        payload.len()
    );
    let mut frame = Vec::with_capacity(head.len() + payload.len());
    frame.extend_from_slice(head.as_bytes());
    frame.extend_from_slice(payload);
    frame
}

/// Offset of the first byte after the header/body separator, if present.
/// `\r\n\r\n` is preferred, `\n\n` accepted as a fallback.
pub(crate) fn body_offset(buf: &[u8]) -> Option<usize> {
    if let Some(idx) = memmem::find(buf, b"\r\n\r\n") {
        return Some(idx + 4);
    }
    memmem::find(buf, b"\n\n").map(|idx| idx + 2)
}

/// Total response length implied by the head, once the separator and a
/// parsable `Content-Length` are both present.
fn expected_total(buf: &[u8]) -> Option<usize> {
    let head_len = body_offset(buf)?;
    let content_length = content_length(&buf[..head_len])?;
    head_len.checked_add(content_length)
}

fn content_length(head: &[u8]) -> Option<usize> {
    for line in head.split(|&b| b == b'\n') {
        let line = match line.last() {
            Some(b'\r') => &line[..line.len() - 1],
            _ => line,
        };
        let Some(colon) = memchr::memchr(b':', line) else {
            continue;
        };
        if !line[..colon].eq_ignore_ascii_case(b"content-length") {
            continue;
        }
        let value = std::str::from_utf8(&line[colon + 1..]).ok()?;
        return value.trim().parse::<usize>().ok();
    }
    None
}
