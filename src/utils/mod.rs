//! Utility functions and helpers.

pub mod http;

use url::Url;

use crate::error::{AppError, Result};

/// Check that a scan target is an absolute http(s) URL.
///
/// Returns the URL unchanged so job ids stay identical to what the caller sent.
pub fn validate_target_url(url_str: &str) -> Result<&str> {
    let url = Url::parse(url_str)?;
    match url.scheme() {
        "http" | "https" => Ok(url_str),
        other => Err(AppError::validation(format!(
            "Unsupported URL scheme '{}' in {}",
            other, url_str
        ))),
    }
}
