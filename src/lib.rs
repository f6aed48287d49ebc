//! Core library for aegis-gate, the request-inspection side of the aegis
//! antibot stack. For each inbound HTTP request the host hands over its
//! facts; the gate encodes them into a JSON check payload, exchanges it with
//! the decision service over a single `Connection: close` HTTP/1.1 round
//! trip, extracts `code`, `body` and `headers` from the reply with a
//! fault-tolerant scanner, and answers with a [`Verdict`]: keep processing
//! the request, or send the synthesized substitute response and stop.
//!
//! Errors anywhere in that pipeline never leak to the host; they resolve
//! through the configured fail-open/fail-closed policy, so every call yields
//! exactly one verdict.

pub mod applier;
mod blocklog;
pub mod codec;
mod config;
pub mod decoder;
pub mod encoder;
mod gate;
pub mod util;
mod wire;

pub use config::GateConfig;
pub use decoder::{DecodeError, Decision};
pub use gate::{CheckError, Gate};
pub use wire::WireError;

use serde::{Deserialize, Serialize};

/// Content type answered when the decision service does not name one.
pub const DEFAULT_CONTENT_TYPE: &str = "text/plain; charset=utf-8";

/// Everything the host lifecycle knows about one inbound request. The body,
/// when present, must already be fully received — the gate does no streaming
/// assembly — and is probed only up to the configured size cap.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RequestFacts {
    pub client_address: String,
    pub url: String,
    pub method: String,
    /// Header pairs in wire order; repeated names stay repeated.
    #[serde(default)]
    pub headers: Vec<(String, String)>,
    /// The raw `Cookie` header value, if the request carried one.
    #[serde(default)]
    pub cookie_header: Option<String>,
    #[serde(default)]
    pub body: Option<Vec<u8>>,
}

/// The gate's sole output: continue processing, or answer with this response
/// and stop.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Verdict {
    Allow,
    Block(BlockResponse),
}

impl Verdict {
    pub fn is_allow(&self) -> bool {
        matches!(self, Verdict::Allow)
    }
}

/// A fully formed substitute response for a blocked request. Reserved header
/// names live in dedicated single-valued slots; everything else is carried in
/// `extra_headers` in decision order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BlockResponse {
    pub status: u16,
    pub content_type: Option<String>,
    pub location: Option<String>,
    pub last_modified: Option<String>,
    pub etag: Option<String>,
    pub expires: Option<String>,
    pub server: Option<String>,
    pub www_authenticate: Option<String>,
    pub cache_control: Option<String>,
    pub extra_headers: Vec<(String, String)>,
    pub body: Vec<u8>,
}

impl BlockResponse {
    pub fn new(status: u16, body: Vec<u8>) -> Self {
        Self {
            status,
            content_type: None,
            location: None,
            last_modified: None,
            etag: None,
            expires: None,
            server: None,
            www_authenticate: None,
            cache_control: None,
            extra_headers: Vec::new(),
            body,
        }
    }

    /// The generic fail-closed answer.
    pub(crate) fn internal_error() -> Self {
        Self::new(500, Vec::new())
    }

    /// Outbound Content-Length; always the body length, regardless of what
    /// the decision service claimed.
    pub fn content_length(&self) -> usize {
        self.body.len()
    }

    /// Assemble the complete outbound header list: content type (defaulted
    /// when unset), derived content length, the populated reserved slots,
    /// then the extra headers in order.
    pub fn headers(&self) -> Vec<(String, String)> {
        let mut out = vec![
            (
                "Content-Type".to_string(),
                self.content_type
                    .clone()
                    .unwrap_or_else(|| DEFAULT_CONTENT_TYPE.to_string()),
            ),
            ("Content-Length".to_string(), self.body.len().to_string()),
        ];
        let slots: [(&str, &Option<String>); 7] = [
            ("Location", &self.location),
            ("Last-Modified", &self.last_modified),
            ("ETag", &self.etag),
            ("Expires", &self.expires),
            ("Server", &self.server),
            ("WWW-Authenticate", &self.www_authenticate),
            ("Cache-Control", &self.cache_control),
        ];
        for (name, value) in slots {
            if let Some(v) = value {
                out.push((name.to_string(), v.clone()));
            }
        }
        out.extend(self.extra_headers.iter().cloned());
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn header_list_defaults_content_type_and_derives_length() {
        let resp = BlockResponse::new(403, b"denied".to_vec());
        let headers = resp.headers();
        assert_eq!(
            headers[0],
            ("Content-Type".to_string(), DEFAULT_CONTENT_TYPE.to_string())
        );
        assert_eq!(headers[1], ("Content-Length".to_string(), "6".to_string()));
    }

    #[test]
    fn internal_error_shape() {
        let resp = BlockResponse::internal_error();
        assert_eq!(resp.status, 500);
        assert!(resp.body.is_empty());
        assert_eq!(resp.content_length(), 0);
    }
}
