//! Remote document fetching.

use crate::DecodeError;
use std::io::Read;

/// Hard cap on fetched document size (64 MiB). A runaway response should
/// fail the load rather than exhaust memory.
const MAX_DOCUMENT_BYTES: u64 = 64 * 1024 * 1024;

/// Fetch a PDF from a direct link. The server must allow the request;
/// HTTP errors and transport failures both surface as [`DecodeError::Fetch`].
pub fn fetch_document(url: &str) -> Result<Vec<u8>, DecodeError> {
    let response = ureq::get(url)
        .call()
        .map_err(|err| DecodeError::Fetch(err.to_string()))?;

    let mut bytes = Vec::new();
    response
        .into_reader()
        .take(MAX_DOCUMENT_BYTES)
        .read_to_end(&mut bytes)
        .map_err(DecodeError::Io)?;

    if bytes.is_empty() {
        return Err(DecodeError::Fetch(format!("empty response from {url}")));
    }

    Ok(bytes)
}
