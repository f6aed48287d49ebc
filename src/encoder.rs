//! Check-request encoding.
//!
//! Builds the JSON payload the decision service expects from the facts of one
//! inbound request. The payload is assembled by hand rather than through a
//! serializer: header and cookie maps must preserve encounter order and may
//! carry duplicate keys, which the peer resolves last-one-wins.

use crate::codec::escape_json;
use crate::RequestFacts;

/// Build the check payload:
/// `{"clientAddress":…,"url":…,"method":…,"body":…,"headers":{…},"cookies":{…}}`.
///
/// A body that is absent or longer than `max_body_bytes` is encoded as the
/// empty string; it is never truncated. Total function: any input produces a
/// payload.
pub fn build_check_payload(facts: &RequestFacts, max_body_bytes: usize) -> Vec<u8> {
    let mut out = Vec::with_capacity(512);

    out.extend_from_slice(b"{\"clientAddress\":\"");
    out.extend_from_slice(&escape_json(facts.client_address.as_bytes()));
    out.extend_from_slice(b"\",\"url\":\"");
    out.extend_from_slice(&escape_json(facts.url.as_bytes()));
    out.extend_from_slice(b"\",\"method\":\"");
    out.extend_from_slice(&escape_json(facts.method.as_bytes()));
    out.extend_from_slice(b"\",\"body\":\"");
    if let Some(body) = &facts.body {
        if !body.is_empty() && body.len() <= max_body_bytes {
            out.extend_from_slice(&escape_json(body));
        }
    }

    out.extend_from_slice(b"\",\"headers\":{");
    for (i, (name, value)) in facts.headers.iter().enumerate() {
        if i > 0 {
            out.push(b',');
        }
        push_pair(&mut out, name.as_bytes(), value.as_bytes());
    }

    out.extend_from_slice(b"},\"cookies\":{");
    if let Some(cookie_header) = &facts.cookie_header {
        for (i, (name, value)) in parse_cookie_pairs(cookie_header).iter().enumerate() {
            if i > 0 {
                out.push(b',');
            }
            push_pair(&mut out, name.as_bytes(), value.as_bytes());
        }
    }
    out.extend_from_slice(b"}}");

    out
}

fn push_pair(out: &mut Vec<u8>, name: &[u8], value: &[u8]) {
    out.push(b'"');
    out.extend_from_slice(&escape_json(name));
    out.extend_from_slice(b"\":\"");
    out.extend_from_slice(&escape_json(value));
    out.push(b'"');
}

/// Split a `Cookie` header into `name=value` pairs.
///
/// Segments are separated by `;` with leading spaces/tabs trimmed; a segment
/// without `=` is skipped without failing the rest. Values are taken verbatim
/// up to the next `;`. Duplicate names are kept in encounter order.
fn parse_cookie_pairs(header: &str) -> Vec<(&str, &str)> {
    let mut pairs = Vec::new();
    let bytes = header.as_bytes();
    let mut i = 0;

    while i < bytes.len() {
        while i < bytes.len() && (bytes[i] == b' ' || bytes[i] == b'\t') {
            i += 1;
        }
        if i >= bytes.len() {
            break;
        }

        let name_start = i;
        while i < bytes.len() && bytes[i] != b'=' && bytes[i] != b';' {
            i += 1;
        }
        if i >= bytes.len() || bytes[i] != b'=' {
            // no value; skip to the next segment
            while i < bytes.len() && bytes[i] != b';' {
                i += 1;
            }
            if i < bytes.len() {
                i += 1;
            }
            continue;
        }
        let name_end = i;
        i += 1;

        let value_start = i;
        while i < bytes.len() && bytes[i] != b';' {
            i += 1;
        }
        let value_end = i;
        if i < bytes.len() {
            i += 1;
        }

        pairs.push((&header[name_start..name_end], &header[value_start..value_end]));
    }

    pairs
}
