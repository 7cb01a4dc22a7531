//! Purpose: Invocation of named server-side plugins.
//! Exports: `call_plugin` on `Client`.
//! Role: Thin resource surface with a caller-chosen HTTP method.
//! Invariants: Only GET/POST/PUT/DELETE are accepted; anything else is a
//! usage error raised before any network call.
#![allow(clippy::result_large_err)]

use crate::api::client::Client;
use crate::core::error::{Error, ErrorKind};
use serde_json::Value;

impl Client {
    /// `{method}` `/plugin/{name}`, with a JSON body when one is given.
    pub fn call_plugin(
        &self,
        name: &str,
        method: &str,
        data: Option<&Value>,
    ) -> Result<Value, Error> {
        let method = normalize_method(method)?;
        let url = self.url(&["plugin", name])?;
        self.request_json(method, &url, data)
    }
}

fn normalize_method(method: &str) -> Result<&'static str, Error> {
    match method.to_ascii_uppercase().as_str() {
        "GET" => Ok("GET"),
        "POST" => Ok("POST"),
        "PUT" => Ok("PUT"),
        "DELETE" => Ok("DELETE"),
        _ => Err(Error::new(ErrorKind::Usage)
            .with_message(format!("unsupported plugin method: {method}"))
            .with_hint("Use one of GET, POST, PUT, DELETE.")),
    }
}
