//! Request extractors shared by device-facing handlers.
//!
//! - [`device::DeviceSource`] -- Identifies the sending device and enforces
//!   the source allowlist.

pub mod device;
