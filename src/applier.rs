//! Mapping a decoded decision onto the outbound verdict.
//!
//! Code 0 allows the request; anything else becomes a substitute response.
//! Header names from the decision route either into a dedicated single-valued
//! slot (the reserved set, last-one-wins) or into the ordered list of extra
//! headers. The outbound Content-Length always comes from the body itself,
//! never from the service.

use thiserror::Error;

use crate::decoder::Decision;
use crate::{BlockResponse, Verdict};

#[derive(Debug, Error)]
#[error("decision code {0} is not a usable HTTP status")]
pub struct InvalidStatus(pub i64);

/// Turn a decision into a verdict. Fails only when a nonzero code cannot be
/// expressed as an HTTP status (outside 100..=999).
pub fn apply(decision: Decision) -> Result<Verdict, InvalidStatus> {
    if decision.code == 0 {
        return Ok(Verdict::Allow);
    }

    let status = u16::try_from(decision.code)
        .ok()
        .filter(|s| (100..=999).contains(s))
        .ok_or(InvalidStatus(decision.code))?;

    let mut response = BlockResponse::new(status, decision.body);
    for (name, value) in decision.headers {
        route_header(&mut response, name, value);
    }
    Ok(Verdict::Block(response))
}

fn route_header(response: &mut BlockResponse, name: String, value: String) {
    let slot = if name.eq_ignore_ascii_case("content-type") {
        &mut response.content_type
    } else if name.eq_ignore_ascii_case("content-length") {
        // recognized so it never reaches the extra list; the outbound value
        // is derived from the body
        return;
    } else if name.eq_ignore_ascii_case("location") {
        &mut response.location
    } else if name.eq_ignore_ascii_case("last-modified") {
        &mut response.last_modified
    } else if name.eq_ignore_ascii_case("etag") {
        &mut response.etag
    } else if name.eq_ignore_ascii_case("expires") {
        &mut response.expires
    } else if name.eq_ignore_ascii_case("server") {
        &mut response.server
    } else if name.eq_ignore_ascii_case("www-authenticate") {
        &mut response.www_authenticate
    } else if name.eq_ignore_ascii_case("cache-control") {
        &mut response.cache_control
    } else {
        response.extra_headers.push((name, value));
        return;
    };
    *slot = Some(value);
}
