//! Purpose: Define the stable public Rust API boundary for the BaasBox client.
//! Exports: `Client` plus the config, session, and error types at the surface.
//! Role: Public, additive-only surface; hides transport plumbing.
//! Invariants: This module is the only public path to the HTTP transport.
//! Invariants: Resource methods hang off `Client`, grouped by concern.

mod auth;
mod client;
mod documents;
mod files;
mod plugins;
mod push;
mod social;

pub use crate::core::config::{ClientConfig, DEFAULT_PAGE_LENGTH, DEFAULT_TIMEOUT};
#[doc(hidden)]
pub use crate::core::error::to_exit_code;
pub use crate::core::error::{Error, ErrorKind};
pub use crate::core::session::{
    ADMINISTRATOR_ROLE, ANONYMOUS_ROLE, REGISTERED_ROLE, Session, SessionStore,
    default_session_path,
};
pub use auth::SignupVisibility;
pub use client::{APPCODE_HEADER, Client, ListOptions, Permission, SESSION_HEADER};
