//! Shared HTTP utilities for gateway implementations.

use http::header::{HeaderValue, LOCATION};
use http::{HeaderMap, StatusCode};

pub(super) fn header_to_string(header_value: Option<&HeaderValue>) -> Option<String> {
    header_value
        .and_then(|raw| raw.to_str().ok())
        .map(ToOwned::to_owned)
}

/// Returns the redirect target when `status` is a redirect carrying a
/// `Location` header.
pub(super) fn redirect_target(status: StatusCode, headers: &HeaderMap) -> Option<String> {
    if !status.is_redirection() {
        return None;
    }
    header_to_string(headers.get(LOCATION))
}

pub(super) fn extract_github_message(body: &str) -> Option<String> {
    let Ok(value) = serde_json::from_str::<serde_json::Value>(body) else {
        return None;
    };
    value
        .get("message")
        .and_then(serde_json::Value::as_str)
        .map(ToOwned::to_owned)
}
