//! `mb360-agent` library crate.
//!
//! Polls an MB360 terminal for its attendance log and forwards new punches
//! to the bridge API. The binary entrypoint lives in `main.rs`; modules are
//! public for integration testing.

pub mod config;
pub mod cursor_store;
pub mod forwarder;
pub mod poller;
pub mod session;
