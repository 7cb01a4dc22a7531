//! Purpose: Shared library crate used by the `baasbox` CLI and tests.
//! Exports: `api` (client surface) and `core` (config, session, errors).
//! Role: Rust client for the BaasBox backend-as-a-service HTTP API.
//! Invariants: Every request leaves the process through the api::Client interceptor.
//! Invariants: Core modules prefer explicit inputs/outputs over hidden state.
pub mod api;
pub mod core;
