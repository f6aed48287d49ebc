//! Decision extraction from the raw wire response.
//!
//! The reply schema is fixed — `code`, `body`, `headers` — so this is a
//! targeted scanner, not a JSON parser. It tolerates surrounding whitespace,
//! keeps whatever headers it managed to collect when an entry is malformed,
//! and treats a missing `body` or `headers` as empty. Only two conditions
//! fail the decode: no header/body separator in the frame, and no parsable
//! `code` field — without a code the decision cannot be trusted.

use memchr::memmem;
use thiserror::Error;

use crate::codec::{decode_html_entities, unescape_json};
use crate::wire::body_offset;

#[derive(Debug, Error)]
pub enum DecodeError {
    #[error("no header/body separator in decision response")]
    Framing,
    #[error("decision response has no parsable \"code\" field")]
    MissingCode,
}

/// One decoded decision. `code` 0 means allow; any other value is the HTTP
/// status the host should answer with.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Decision {
    pub code: i64,
    pub body: Vec<u8>,
    pub headers: Vec<(String, String)>,
}

/// Split the frame, extract the three fields and run the body through the
/// unescape + entity-decode pipeline.
pub fn decode(raw: &[u8]) -> Result<Decision, DecodeError> {
    let json_start = body_offset(raw).ok_or(DecodeError::Framing)?;
    let json = &raw[json_start..];

    let code = scan_int(json, "code").ok_or(DecodeError::MissingCode)?;

    let body = match scan_string(json, "body") {
        Some(raw_body) => decode_html_entities(&unescape_json(raw_body)),
        None => Vec::new(),
    };

    let headers = scan_headers(json);

    Ok(Decision {
        code,
        body,
        headers,
    })
}

/// Find `"key"` followed by optional whitespace and a colon; returns the
/// index just past the colon. Matches textually, so a key inside a string
/// value can shadow the real one — acceptable for this fixed schema.
fn find_field(json: &[u8], key: &str) -> Option<usize> {
    let token = format!("\"{key}\"");
    for start in memmem::find_iter(json, token.as_bytes()) {
        let mut i = start + token.len();
        while i < json.len() && json[i].is_ascii_whitespace() {
            i += 1;
        }
        if i < json.len() && json[i] == b':' {
            return Some(i + 1);
        }
    }
    None
}

/// Extract an integer field: optional whitespace, optional `-`, digits.
fn scan_int(json: &[u8], key: &str) -> Option<i64> {
    let mut i = find_field(json, key)?;
    while i < json.len() && json[i].is_ascii_whitespace() {
        i += 1;
    }
    let start = i;
    if i < json.len() && json[i] == b'-' {
        i += 1;
    }
    let digits_start = i;
    while i < json.len() && json[i].is_ascii_digit() {
        i += 1;
    }
    if i == digits_start {
        return None;
    }
    std::str::from_utf8(&json[start..i]).ok()?.parse().ok()
}

/// Extract a string field as its raw, still-escaped contents.
fn scan_string<'a>(json: &'a [u8], key: &str) -> Option<&'a [u8]> {
    let mut i = find_field(json, key)?;
    while i < json.len() && json[i].is_ascii_whitespace() {
        i += 1;
    }
    if i >= json.len() || json[i] != b'"' {
        return None;
    }
    i += 1;
    take_string_body(json, i).map(|(raw, _)| raw)
}

/// Walk the `headers` object and collect string key/value pairs. A
/// brace-depth counter keeps unexpected nested objects from ending the scan
/// early; an unterminated string aborts the remainder but keeps what was
/// already collected.
fn scan_headers(json: &[u8]) -> Vec<(String, String)> {
    let mut headers = Vec::new();
    let Some(mut i) = find_field(json, "headers") else {
        return headers;
    };
    while i < json.len() && json[i].is_ascii_whitespace() {
        i += 1;
    }
    if i >= json.len() || json[i] != b'{' {
        return headers;
    }
    i += 1;
    let mut depth = 1usize;

    while i < json.len() && depth > 0 {
        while i < json.len() && (json[i].is_ascii_whitespace() || json[i] == b',') {
            i += 1;
        }
        if i >= json.len() {
            break;
        }
        match json[i] {
            b'}' => {
                depth -= 1;
                i += 1;
                continue;
            }
            b'{' => {
                depth += 1;
                i += 1;
                continue;
            }
            b'"' => {}
            _ => {
                i += 1;
                continue;
            }
        }

        i += 1;
        let Some((key, after_key)) = take_string_body(json, i) else {
            break;
        };
        i = after_key;

        while i < json.len() && (json[i].is_ascii_whitespace() || json[i] == b':') {
            i += 1;
        }
        if i >= json.len() || json[i] != b'"' {
            // non-string value; the outer loop steps over it
            continue;
        }
        i += 1;
        let Some((value, after_value)) = take_string_body(json, i) else {
            break;
        };
        i = after_value;

        headers.push((lossy(key), lossy(value)));
    }

    headers
}

/// Scan a string body starting just after its opening quote. A backslash
/// always skips exactly the next byte. Returns the raw slice and the index
/// just past the closing quote, or None when unterminated.
fn take_string_body(json: &[u8], start: usize) -> Option<(&[u8], usize)> {
    let mut i = start;
    while i < json.len() {
        match json[i] {
            b'\\' => i += 2,
            b'"' => return Some((&json[start..i], i + 1)),
            _ => i += 1,
        }
    }
    None
}

fn lossy(bytes: &[u8]) -> String {
    String::from_utf8_lossy(bytes).into_owned()
}
