//! Purpose: Session-aware HTTP transport for the BaasBox REST API.
//! Exports: `Client`, `ListOptions`, `Permission`, header name constants.
//! Role: Owns the request interceptor; every resource method routes through it.
//! Invariants: Outgoing requests always carry the appcode header; the session
//! header is attached exactly when a session exists at call time.
//! Invariants: Success bodies are parsed as the backend envelope and returned
//! with the `data` payload unwrapped, uniformly for every operation.
#![allow(clippy::result_large_err)]

use crate::core::config::ClientConfig;
use crate::core::error::{Error, ErrorKind, kind_from_status};
use crate::core::session::{Session, SessionStore, default_session_path};
use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::io::Read;
use std::path::PathBuf;
use std::sync::Arc;
use url::Url;

pub const SESSION_HEADER: &str = "X-BB-SESSION";
pub const APPCODE_HEADER: &str = "X-BAASBOX-APPCODE";

/// One BaasBox backend client. Cheap to clone; clones share the session
/// store, so a login through one handle is visible to all of them.
#[derive(Clone)]
pub struct Client {
    inner: Arc<ClientInner>,
}

struct ClientInner {
    config: ClientConfig,
    sessions: SessionStore,
    agent: ureq::Agent,
}

#[derive(serde::Deserialize)]
struct Envelope<T> {
    data: T,
}

/// Paging and filter options for list endpoints.
#[derive(Clone, Debug, Default)]
pub struct ListOptions {
    pub page: Option<u64>,
    pub records_per_page: Option<u64>,
    pub where_filter: Option<String>,
    pub order_by: Option<String>,
}

impl ListOptions {
    pub fn new() -> Self {
        Self::default()
    }
}

/// Access level on a document or file ACL.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum Permission {
    Read,
    Delete,
    Update,
    All,
}

impl Permission {
    pub fn as_str(self) -> &'static str {
        match self {
            Permission::Read => "read",
            Permission::Delete => "delete",
            Permission::Update => "update",
            Permission::All => "all",
        }
    }
}

impl Client {
    /// Client with the default per-user session file (`~/.baasbox/session.json`).
    pub fn new(config: ClientConfig) -> Self {
        Self::with_session_path(config, default_session_path())
    }

    /// Client with an explicit session file, for tests or for running several
    /// independent identities in one process.
    pub fn with_session_path(config: ClientConfig, path: impl Into<PathBuf>) -> Self {
        let agent = ureq::AgentBuilder::new().timeout(config.timeout()).build();
        Self {
            inner: Arc::new(ClientInner {
                sessions: SessionStore::open(path),
                config,
                agent,
            }),
        }
    }

    pub fn config(&self) -> &ClientConfig {
        &self.inner.config
    }

    /// The session currently held by this client, if any. Local only.
    pub fn current_user(&self) -> Option<Session> {
        self.inner.sessions.current()
    }

    /// Re-hydrate the session from its file, e.g. after another process
    /// logged in against the same session file.
    pub fn refresh_session(&self) {
        self.inner.sessions.refresh();
    }

    pub(crate) fn sessions(&self) -> &SessionStore {
        &self.inner.sessions
    }

    pub(crate) fn url(&self, segments: &[&str]) -> Result<Url, Error> {
        build_url(self.inner.config.endpoint(), segments)
    }

    /// The interceptor. Everything the client sends is built here, so the
    /// two backend-required headers are attached unconditionally: the appcode
    /// always, the session token when a session exists at call time.
    pub(crate) fn request(&self, method: &str, url: &Url) -> ureq::Request {
        tracing::debug!("{method} {url}");
        let mut request = self.inner.agent.request(method, url.as_str());
        if let Some(session) = self.inner.sessions.current() {
            request = request.set(SESSION_HEADER, &session.token);
        }
        request.set(APPCODE_HEADER, self.inner.config.appcode())
    }

    /// One round trip with an optional JSON body; unwraps the envelope.
    pub(crate) fn request_json<T, R>(
        &self,
        method: &str,
        url: &Url,
        body: Option<&T>,
    ) -> Result<R, Error>
    where
        T: Serialize,
        R: DeserializeOwned,
    {
        let request = self.request(method, url).set("Accept", "application/json");
        let response = match body {
            None => request.call(),
            Some(body) => {
                let payload = serde_json::to_string(body).map_err(|err| {
                    Error::new(ErrorKind::Internal)
                        .with_message("failed to encode request json")
                        .with_source(err)
                })?;
                request
                    .set("Content-Type", "application/json")
                    .send_string(&payload)
            }
        };
        finish(response)
    }

    /// One round trip with a form-encoded body; unwraps the envelope.
    /// Only the login operation speaks this wire format.
    pub(crate) fn request_form<R>(
        &self,
        method: &str,
        url: &Url,
        form: &[(&str, &str)],
    ) -> Result<R, Error>
    where
        R: DeserializeOwned,
    {
        let response = self
            .request(method, url)
            .set("Accept", "application/json")
            .send_form(form);
        finish(response)
    }

    /// GET returning the raw response bytes (file content, not an envelope).
    pub(crate) fn request_bytes(&self, url: &Url) -> Result<Vec<u8>, Error> {
        let response = self.request("GET", url).call();
        match response {
            Ok(resp) => {
                let mut reader = resp.into_reader();
                let mut out = Vec::new();
                reader.read_to_end(&mut out).map_err(|err| {
                    Error::new(ErrorKind::Io)
                        .with_message("failed to read response body")
                        .with_source(err)
                })?;
                Ok(out)
            }
            Err(ureq::Error::Status(code, resp)) => Err(parse_error_response(code, resp)),
            Err(ureq::Error::Transport(err)) => Err(transport_error(err)),
        }
    }

    /// Finish a request whose body was already sent by the caller
    /// (multipart upload takes this path).
    pub(crate) fn finish_raw<R>(
        &self,
        response: Result<ureq::Response, ureq::Error>,
    ) -> Result<R, Error>
    where
        R: DeserializeOwned,
    {
        finish(response)
    }
}

fn finish<R>(response: Result<ureq::Response, ureq::Error>) -> Result<R, Error>
where
    R: DeserializeOwned,
{
    match response {
        Ok(resp) => {
            let envelope: Envelope<R> = read_json_response(resp)?;
            Ok(envelope.data)
        }
        Err(ureq::Error::Status(code, resp)) => Err(parse_error_response(code, resp)),
        Err(ureq::Error::Transport(err)) => Err(transport_error(err)),
    }
}

fn transport_error(err: ureq::Transport) -> Error {
    Error::new(ErrorKind::Io)
        .with_message("request failed")
        .with_source(err)
}

fn read_json_response<R>(response: ureq::Response) -> Result<R, Error>
where
    R: DeserializeOwned,
{
    let body = response.into_string().map_err(|err| {
        Error::new(ErrorKind::Io)
            .with_message("failed to read response body")
            .with_source(err)
    })?;
    serde_json::from_str(&body).map_err(|err| {
        Error::new(ErrorKind::Internal)
            .with_message("invalid response json")
            .with_source(err)
    })
}

/// Non-2xx outcome: kind from the status line, backend body kept verbatim.
fn parse_error_response(status: u16, response: ureq::Response) -> Error {
    let body = response.into_string().unwrap_or_default();
    let err = Error::new(kind_from_status(status)).with_status(status);
    match serde_json::from_str::<Value>(&body) {
        Ok(value) => {
            let message = value
                .get("message")
                .and_then(Value::as_str)
                .map(str::to_string)
                .unwrap_or_else(|| format!("backend error status {status}"));
            err.with_message(message).with_body(value)
        }
        Err(_) => err.with_message(format!("backend error status {status}")),
    }
}

fn build_url(endpoint: &Url, segments: &[&str]) -> Result<Url, Error> {
    let mut url = endpoint.clone();
    {
        let mut path = url
            .path_segments_mut()
            .map_err(|_| Error::new(ErrorKind::Usage).with_message("endpoint url cannot be a base"))?;
        path.pop_if_empty();
        for segment in segments {
            path.push(segment);
        }
    }
    Ok(url)
}

pub(crate) fn apply_list_options(url: &mut Url, options: &ListOptions) {
    if options.page.is_none()
        && options.records_per_page.is_none()
        && options.where_filter.is_none()
        && options.order_by.is_none()
    {
        return;
    }
    let mut pairs = url.query_pairs_mut();
    if let Some(page) = options.page {
        pairs.append_pair("page", &page.to_string());
    }
    if let Some(records_per_page) = options.records_per_page {
        pairs.append_pair("recordsPerPage", &records_per_page.to_string());
    }
    if let Some(where_filter) = &options.where_filter {
        pairs.append_pair("where", where_filter);
    }
    if let Some(order_by) = &options.order_by {
        pairs.append_pair("orderBy", order_by);
    }
}
