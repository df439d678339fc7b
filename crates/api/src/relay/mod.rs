//! Raw TCP relay for devices configured with a plain socket client.
//!
//! A device connects, writes one JSON object (newline optional), reads
//! `{"status":"received"}` and the connection is closed.
//! [`server::RelayServer`] owns the socket side and hands each decoded
//! message over a bounded channel to [`processor::run`], which validates
//! and stores it.

pub mod processor;
pub mod server;

use std::net::SocketAddr;

pub use server::RelayServer;

/// Capacity of the channel between connection tasks and the processor.
pub const RELAY_CHANNEL_CAPACITY: usize = 256;

/// A JSON message received on the relay, tagged with its sender.
#[derive(Debug, Clone)]
pub struct RelayMessage {
    pub peer: SocketAddr,
    pub body: serde_json::Value,
}
