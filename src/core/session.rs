//! Purpose: Hold the authenticated identity and persist it across runs.
//! Exports: `Session`, `SessionStore`, `default_session_path`, role constants.
//! Role: Single authority for "who is currently logged in" inside one client.
//! Invariants: Mutations write through to the session file immediately.
//! Invariants: Unreadable or malformed storage fails closed to "no session".
//! Invariants: Only login/signup/logout paths call `set`/`clear`.
#![allow(clippy::result_large_err)]

use crate::core::error::{Error, ErrorKind};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::sync::Mutex;

// Role names built into the BaasBox backend.
pub const ANONYMOUS_ROLE: &str = "anonymous";
pub const REGISTERED_ROLE: &str = "registered";
pub const ADMINISTRATOR_ROLE: &str = "administrator";

/// The authenticated identity and credential currently active in a client.
///
/// Field names follow the backend's camelCase wire form so the persisted
/// session file matches what the server hands out at login.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Session {
    pub username: String,
    pub token: String,
    #[serde(default)]
    pub roles: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub visible_by_anonymous_users: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub visible_by_the_user: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub visible_by_friends: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub visible_by_registered_users: Option<bool>,
}

impl Session {
    pub fn has_role(&self, role: &str) -> bool {
        self.roles.iter().any(|name| name == role)
    }
}

/// File-backed store for the single current session.
///
/// Memory is hydrated from the file once at construction; reads afterwards
/// are memory-only. `refresh` re-reads the file on demand, e.g. after another
/// process logged in with the same session file.
#[derive(Debug)]
pub struct SessionStore {
    path: PathBuf,
    current: Mutex<Option<Session>>,
}

impl SessionStore {
    pub fn open(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let current = Mutex::new(read_session_file(&path));
        Self { path, current }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// The in-memory session, if any. Idempotent between mutations.
    pub fn current(&self) -> Option<Session> {
        self.lock().clone()
    }

    /// Replace the current session and write it through to the file.
    pub fn set(&self, session: Session) -> Result<(), Error> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent).map_err(|err| {
                Error::new(ErrorKind::Io)
                    .with_message("failed to create session directory")
                    .with_path(parent)
                    .with_source(err)
            })?;
        }
        let json = serde_json::to_string(&session).map_err(|err| {
            Error::new(ErrorKind::Internal)
                .with_message("failed to encode session json")
                .with_source(err)
        })?;
        std::fs::write(&self.path, json).map_err(|err| {
            Error::new(ErrorKind::Io)
                .with_message("failed to write session file")
                .with_path(&self.path)
                .with_source(err)
        })?;
        *self.lock() = Some(session);
        Ok(())
    }

    /// Drop the current session from memory and remove the file.
    /// A file that is already gone is not an error.
    pub fn clear(&self) -> Result<(), Error> {
        match std::fs::remove_file(&self.path) {
            Ok(()) => {}
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => {}
            Err(err) => {
                return Err(Error::new(ErrorKind::Io)
                    .with_message("failed to remove session file")
                    .with_path(&self.path)
                    .with_source(err));
            }
        }
        *self.lock() = None;
        Ok(())
    }

    /// Re-hydrate from the file. The file is authoritative when present;
    /// when it is absent the in-memory value is kept.
    pub fn refresh(&self) {
        if let Some(session) = read_session_file(&self.path) {
            *self.lock() = Some(session);
        }
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Option<Session>> {
        self.current
            .lock()
            .unwrap_or_else(|poison| poison.into_inner())
    }
}

pub fn default_session_path() -> PathBuf {
    let home = std::env::var_os("HOME").unwrap_or_default();
    PathBuf::from(home).join(".baasbox").join("session.json")
}

fn read_session_file(path: &Path) -> Option<Session> {
    let bytes = match std::fs::read(path) {
        Ok(bytes) => bytes,
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => return None,
        Err(err) => {
            tracing::warn!("session file {} unreadable, ignoring: {err}", path.display());
            return None;
        }
    };
    match serde_json::from_slice(&bytes) {
        Ok(session) => Some(session),
        Err(err) => {
            tracing::warn!("session file {} malformed, ignoring: {err}", path.display());
            None
        }
    }
}
