//! Purpose: Push notification dispatch.
//! Exports: `send_push_notification` on `Client`.
//! Role: Thin resource surface; the payload shape is the backend's contract.
#![allow(clippy::result_large_err)]

use crate::api::client::Client;
use crate::core::error::Error;
use serde_json::Value;

impl Client {
    /// POST `/push/message` with the caller's notification payload
    /// (`message`, `users`, and per-platform options as the backend defines).
    pub fn send_push_notification(&self, params: &Value) -> Result<Value, Error> {
        let url = self.url(&["push", "message"])?;
        self.request_json("POST", &url, Some(params))
    }
}
