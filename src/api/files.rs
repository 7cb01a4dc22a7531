//! Purpose: File and asset operations against `/file` and `/asset`.
//! Exports: Upload/fetch/delete/details, file ACLs, and asset helpers on `Client`.
//! Role: Thin resource surface; upload frames one multipart part by hand.
//! Invariants: File content travels as raw bytes; only metadata is enveloped.
//! Invariants: The session credential travels in the header, never the URL.
#![allow(clippy::result_large_err)]

use crate::api::client::{APPCODE_HEADER, Client, Permission};
use crate::core::error::{Error, ErrorKind};
use serde_json::Value;
use std::fmt::Write as _;
use url::Url;

impl Client {
    /// POST `/file` as `multipart/form-data` with a single `file` part.
    /// Returns the stored file's metadata (including its id).
    pub fn upload_file(
        &self,
        filename: &str,
        content_type: &str,
        bytes: &[u8],
    ) -> Result<Value, Error> {
        let url = self.url(&["file"])?;
        let boundary = multipart_boundary()?;
        let body = multipart_body(&boundary, "file", filename, content_type, bytes);
        let response = self
            .request("POST", &url)
            .set("Accept", "application/json")
            .set(
                "Content-Type",
                &format!("multipart/form-data; boundary={boundary}"),
            )
            .send_bytes(&body);
        self.finish_raw(response)
    }

    /// GET `/file/{id}`: the file content itself.
    pub fn fetch_file(&self, id: &str) -> Result<Vec<u8>, Error> {
        let url = self.url(&["file", id])?;
        self.request_bytes(&url)
    }

    /// DELETE `/file/{id}`.
    pub fn delete_file(&self, id: &str) -> Result<(), Error> {
        let url = self.url(&["file", id])?;
        let _: Value = self.request_json::<(), Value>("DELETE", &url, None)?;
        Ok(())
    }

    /// GET `/file/details/{id}`: metadata without the content.
    pub fn fetch_file_details(&self, id: &str) -> Result<Value, Error> {
        let url = self.url(&["file", "details", id])?;
        self.request_json::<(), Value>("GET", &url, None)
    }

    pub fn grant_user_access_to_file(
        &self,
        id: &str,
        permission: Permission,
        username: &str,
    ) -> Result<(), Error> {
        self.file_acl("PUT", id, permission, "user", username)
    }

    pub fn revoke_user_access_to_file(
        &self,
        id: &str,
        permission: Permission,
        username: &str,
    ) -> Result<(), Error> {
        self.file_acl("DELETE", id, permission, "user", username)
    }

    pub fn grant_role_access_to_file(
        &self,
        id: &str,
        permission: Permission,
        role: &str,
    ) -> Result<(), Error> {
        self.file_acl("PUT", id, permission, "role", role)
    }

    pub fn revoke_role_access_to_file(
        &self,
        id: &str,
        permission: Permission,
        role: &str,
    ) -> Result<(), Error> {
        self.file_acl("DELETE", id, permission, "role", role)
    }

    /// GET `/asset/{name}/data` (JSON assets only).
    pub fn load_asset_data(&self, name: &str) -> Result<Value, Error> {
        let url = self.url(&["asset", name, "data"])?;
        self.request_json::<(), Value>("GET", &url, None)
    }

    /// The URI of an asset with the appcode appended as a query parameter,
    /// for fetching outside this client (e.g. an image tag).
    pub fn asset_url(&self, name: &str) -> Result<Url, Error> {
        let mut url = self.url(&["asset", name])?;
        url.query_pairs_mut()
            .append_pair(APPCODE_HEADER, self.config().appcode());
        Ok(url)
    }

    fn file_acl(
        &self,
        method: &str,
        id: &str,
        permission: Permission,
        target_kind: &str,
        target: &str,
    ) -> Result<(), Error> {
        let url = self.url(&["file", id, permission.as_str(), target_kind, target])?;
        let _: Value = self.request_json::<(), Value>(method, &url, None)?;
        Ok(())
    }
}

fn multipart_boundary() -> Result<String, Error> {
    let mut bytes = [0u8; 16];
    getrandom::fill(&mut bytes).map_err(|err| {
        Error::new(ErrorKind::Internal)
            .with_message(format!("failed to generate multipart boundary: {err}"))
    })?;
    let mut boundary = String::with_capacity(8 + bytes.len() * 2);
    boundary.push_str("baasbox-");
    for byte in bytes {
        let _ = write!(boundary, "{byte:02x}");
    }
    Ok(boundary)
}

fn multipart_body(
    boundary: &str,
    field: &str,
    filename: &str,
    content_type: &str,
    bytes: &[u8],
) -> Vec<u8> {
    let header = format!(
        "--{boundary}\r\n\
         Content-Disposition: form-data; name=\"{field}\"; filename=\"{filename}\"\r\n\
         Content-Type: {content_type}\r\n\r\n"
    );
    let trailer = format!("\r\n--{boundary}--\r\n");
    let mut body = Vec::with_capacity(header.len() + bytes.len() + trailer.len());
    body.extend_from_slice(header.as_bytes());
    body.extend_from_slice(bytes);
    body.extend_from_slice(trailer.as_bytes());
    body
}

#[cfg(test)]
mod tests {
    use super::{multipart_body, multipart_boundary};

    #[test]
    fn multipart_body_frames_one_part() {
        let body = multipart_body("b123", "file", "note.txt", "text/plain", b"hello");
        let text = String::from_utf8(body).expect("utf8 body");
        assert!(text.starts_with("--b123\r\n"));
        assert!(text.contains("Content-Disposition: form-data; name=\"file\"; filename=\"note.txt\"\r\n"));
        assert!(text.contains("Content-Type: text/plain\r\n\r\nhello\r\n"));
        assert!(text.ends_with("--b123--\r\n"));
    }

    #[test]
    fn multipart_boundary_is_hex_with_prefix() {
        let boundary = multipart_boundary().expect("boundary");
        let hex = boundary.strip_prefix("baasbox-").expect("prefix");
        assert_eq!(hex.len(), 32);
        assert!(hex.chars().all(|c| c.is_ascii_hexdigit()));
    }
}
