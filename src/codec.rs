//! Byte-level text transforms for check payloads and decision bodies.
//!
//! The escape direction runs over attacker-controlled request data and the
//! decode direction over decision-service output, so all three transforms are
//! total: they accept any byte sequence, allocate a fresh output and never
//! fail. They operate on bytes rather than `str` because request bodies and
//! service replies are not guaranteed to be valid UTF-8 and must be
//! reproduced faithfully.

/// Escape a byte sequence for embedding inside a JSON string literal.
///
/// `"`, `\` and `/` get a backslash, the standard short escapes are used for
/// `\b \f \n \r \t`, and any other control byte below 0x20 is emitted as
/// `\u00XX`. All remaining bytes pass through verbatim.
pub fn escape_json(input: &[u8]) -> Vec<u8> {
    let mut out = Vec::with_capacity(input.len() + input.len() / 8);
    for &b in input {
        match b {
            b'"' => out.extend_from_slice(b"\\\""),
            b'\\' => out.extend_from_slice(b"\\\\"),
            b'/' => out.extend_from_slice(b"\\/"),
            0x08 => out.extend_from_slice(b"\\b"),
            0x0c => out.extend_from_slice(b"\\f"),
            b'\n' => out.extend_from_slice(b"\\n"),
            b'\r' => out.extend_from_slice(b"\\r"),
            b'\t' => out.extend_from_slice(b"\\t"),
            b if b < 0x20 => {
                out.extend_from_slice(format!("\\u{:04X}", b).as_bytes());
            }
            b => out.push(b),
        }
    }
    out
}

/// Reverse the short escapes produced by [`escape_json`].
///
/// Unknown escapes keep both bytes so malformed input loses nothing. A
/// `\uXXXX` sequence is consumed but rendered as a single `?` placeholder
/// byte instead of the decoded code point; a truncated `\u` at end of input
/// keeps the backslash and continues from the `u`.
pub fn unescape_json(input: &[u8]) -> Vec<u8> {
    let mut out = Vec::with_capacity(input.len());
    let mut i = 0;
    while i < input.len() {
        let b = input[i];
        if b != b'\\' || i + 1 >= input.len() {
            out.push(b);
            i += 1;
            continue;
        }
        match input[i + 1] {
            b'n' => {
                out.push(b'\n');
                i += 2;
            }
            b't' => {
                out.push(b'\t');
                i += 2;
            }
            b'r' => {
                out.push(b'\r');
                i += 2;
            }
            b'b' => {
                out.push(0x08);
                i += 2;
            }
            b'f' => {
                out.push(0x0c);
                i += 2;
            }
            b'"' => {
                out.push(b'"');
                i += 2;
            }
            b'\\' => {
                out.push(b'\\');
                i += 2;
            }
            b'/' => {
                out.push(b'/');
                i += 2;
            }
            b'u' => {
                if i + 6 <= input.len() {
                    out.push(b'?');
                    i += 6;
                } else {
                    out.push(b'\\');
                    i += 1;
                }
            }
            other => {
                out.push(b'\\');
                out.push(other);
                i += 2;
            }
        }
    }
    out
}

const ENTITIES: [(&[u8], u8); 5] = [
    (b"&lt;", b'<'),
    (b"&gt;", b'>'),
    (b"&amp;", b'&'),
    (b"&quot;", b'"'),
    (b"&#x27;", b'\''),
];

/// Decode the five HTML entities the decision service emits in block bodies.
///
/// Single left-to-right pass: the replacement byte is never re-examined, so
/// `&amp;lt;` decodes to `&lt;` and stops there. Any other `&...` run is left
/// untouched.
pub fn decode_html_entities(input: &[u8]) -> Vec<u8> {
    let mut out = Vec::with_capacity(input.len());
    let mut i = 0;
    'outer: while i < input.len() {
        if input[i] == b'&' {
            for (entity, replacement) in ENTITIES {
                if input[i..].starts_with(entity) {
                    out.push(replacement);
                    i += entity.len();
                    continue 'outer;
                }
            }
        }
        out.push(input[i]);
        i += 1;
    }
    out
}
