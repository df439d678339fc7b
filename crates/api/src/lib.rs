//! MB360 device bridge API server library.
//!
//! Exposes the building blocks (config, state, error handling, routes, the
//! raw TCP relay) so integration tests and the binary entrypoint can both
//! access them.

pub mod config;
pub mod error;
pub mod handlers;
pub mod ingest;
pub mod middleware;
pub mod relay;
pub mod response;
pub mod router;
pub mod routes;
pub mod state;
