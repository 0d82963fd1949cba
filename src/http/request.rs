//! Inbound request handling.
//!
//! # Responsibilities
//! - Read the request ID stamped by the request-id layer
//! - Flatten an HTTP request into the metadata forwarded to peers
//!
//! # Design Decisions
//! - Only the path is forwarded, not the query string
//! - One value per header name (the first); names are lower-case
//! - Bodies are forwarded as text, invalid UTF-8 replaced

use std::collections::BTreeMap;

use axum::http::{request::Parts, HeaderMap};

use crate::bridge::RequestMetadata;

pub const X_REQUEST_ID: &str = "x-request-id";

/// The request ID header value, or `"unknown"`.
pub fn request_id(headers: &HeaderMap) -> &str {
    headers
        .get(X_REQUEST_ID)
        .and_then(|v| v.to_str().ok())
        .unwrap_or("unknown")
}

/// Build the metadata sent to a peer from request head and buffered body.
pub fn describe(parts: &Parts, body: &[u8]) -> RequestMetadata {
    let mut headers = BTreeMap::new();
    for (name, value) in parts.headers.iter() {
        headers
            .entry(name.as_str().to_string())
            .or_insert_with(|| String::from_utf8_lossy(value.as_bytes()).into_owned());
    }

    RequestMetadata {
        method: parts.method.to_string(),
        path: parts.uri.path().to_string(),
        body: String::from_utf8_lossy(body).into_owned(),
        headers,
    }
}
