//! Domain layer for the MB360 device bridge.
//!
//! Pure logic only: event classification and validation, device response
//! parsing and poll cursor bookkeeping. No network or database access.

pub mod attlog;
pub mod cursor;
pub mod error;
pub mod event;
pub mod types;
