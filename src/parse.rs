use serde::Deserialize;

use crate::catalog::{ProbeResult, Record};
use crate::{Error, Result};

#[derive(Debug, Deserialize)]
struct Payload {
    total: u64,
    count: u64,
    #[serde(alias = "items")]
    products: Vec<Record>,
}

/// Decodes a catalog response body and checks the counters agree with the page.
pub(crate) fn parse_probe(body: &[u8]) -> Result<ProbeResult> {
    let payload: Payload = serde_json::from_slice(body)?;

    if payload.count > payload.total {
        return Err(Error::MalformedPayload(format!(
            "count {} exceeds total {}",
            payload.count, payload.total
        )));
    }
    if payload.count != payload.products.len() as u64 {
        return Err(Error::MalformedPayload(format!(
            "count {} but {} products in the page",
            payload.count,
            payload.products.len()
        )));
    }

    Ok(ProbeResult {
        total: payload.total,
        count: payload.count,
        items: payload.products,
    })
}
