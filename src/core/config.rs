//! Purpose: Endpoint and client configuration for the BaasBox backend.
//! Exports: `ClientConfig`, default page length and timeout constants.
//! Role: Single validated source for the URL prefix and appcode of a client.
//! Invariants: The endpoint always parses as http/https and carries no query or fragment.
//! Invariants: A rejected endpoint assignment never clobbers the prior value.
#![allow(clippy::result_large_err)]

use crate::core::error::{Error, ErrorKind};
use std::time::Duration;
use url::Url;

pub const DEFAULT_PAGE_LENGTH: u64 = 50;
pub const DEFAULT_TIMEOUT: Duration = Duration::from_millis(20_000);

#[derive(Clone, Debug)]
pub struct ClientConfig {
    endpoint: Url,
    appcode: String,
    page_length: u64,
    timeout: Duration,
}

impl ClientConfig {
    pub fn new(endpoint: impl AsRef<str>, appcode: impl Into<String>) -> Result<Self, Error> {
        let endpoint = normalize_endpoint(endpoint.as_ref())?;
        Ok(Self {
            endpoint,
            appcode: appcode.into(),
            page_length: DEFAULT_PAGE_LENGTH,
            timeout: DEFAULT_TIMEOUT,
        })
    }

    pub fn with_page_length(mut self, page_length: u64) -> Self {
        self.page_length = page_length;
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn endpoint(&self) -> &Url {
        &self.endpoint
    }

    pub fn appcode(&self) -> &str {
        &self.appcode
    }

    pub fn page_length(&self) -> u64 {
        self.page_length
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Replace the endpoint. An invalid URL is reported as a diagnostic and
    /// the previously configured endpoint stays in effect.
    pub fn set_endpoint(&mut self, raw: &str) {
        match normalize_endpoint(raw) {
            Ok(endpoint) => self.endpoint = endpoint,
            Err(err) => {
                tracing::error!("{raw} is not a valid endpoint URL, keeping previous value: {err}");
            }
        }
    }
}

/// Endpoint URLs may carry a path prefix (e.g. `/v1`); it is preserved
/// verbatim when request paths are appended. Query and fragment are dropped,
/// a trailing slash is trimmed.
fn normalize_endpoint(raw: &str) -> Result<Url, Error> {
    let mut url = Url::parse(raw).map_err(|err| {
        Error::new(ErrorKind::Usage)
            .with_message("invalid endpoint url")
            .with_source(err)
    })?;
    let scheme = url.scheme();
    if scheme != "http" && scheme != "https" {
        return Err(
            Error::new(ErrorKind::Usage).with_message("endpoint url must use http or https scheme")
        );
    }
    url.set_query(None);
    url.set_fragment(None);
    if let Ok(mut segments) = url.path_segments_mut() {
        segments.pop_if_empty();
    }
    Ok(url)
}
