//! Source-address checks for device endpoints.

use std::net::{IpAddr, SocketAddr};

use axum::extract::{ConnectInfo, FromRequestParts};
use axum::http::request::Parts;
use mb360_core::error::CoreError;

use crate::error::AppError;
use crate::state::AppState;

/// Set of addresses allowed to push device events.
///
/// An empty list accepts every source, which is the default for local
/// setups where the device address is not yet known.
#[derive(Debug, Clone, Default)]
pub struct DeviceAllowlist {
    ips: Vec<IpAddr>,
}

impl DeviceAllowlist {
    pub fn new(ips: Vec<IpAddr>) -> Self {
        Self { ips }
    }

    /// Allow any source.
    pub fn open() -> Self {
        Self::default()
    }

    pub fn permits(&self, ip: IpAddr) -> bool {
        self.ips.is_empty() || self.ips.contains(&canonical(ip))
    }
}

/// Fold IPv4-mapped IPv6 addresses (`::ffff:a.b.c.d`) back to IPv4 so a
/// dual-stack listener matches IPv4 allowlist entries.
fn canonical(ip: IpAddr) -> IpAddr {
    match ip {
        IpAddr::V6(v6) => v6
            .to_ipv4_mapped()
            .map(IpAddr::V4)
            .unwrap_or(IpAddr::V6(v6)),
        v4 => v4,
    }
}

/// Identifier stored as `device_id` for a peer address.
pub fn device_id_for(ip: IpAddr) -> String {
    canonical(ip).to_string()
}

/// The device that sent the current request, identified by peer address.
///
/// Rejects the request with 403 when the address is not on the configured
/// [`DeviceAllowlist`].
#[derive(Debug, Clone, Copy)]
pub struct DeviceSource {
    pub ip: IpAddr,
}

impl DeviceSource {
    /// Identifier stored as `device_id` when the payload does not name one.
    pub fn device_id(&self) -> String {
        device_id_for(self.ip)
    }
}

impl FromRequestParts<AppState> for DeviceSource {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let ConnectInfo(addr) = ConnectInfo::<SocketAddr>::from_request_parts(parts, state)
            .await
            .map_err(|e| AppError::InternalError(format!("Peer address unavailable: {e}")))?;

        let ip = addr.ip();
        if !state.config.device_allowlist.permits(ip) {
            tracing::warn!(%ip, uri = %parts.uri, "Untrusted source accessing MB360 endpoint");
            return Err(AppError::Core(CoreError::Forbidden(
                "Source address is not an allowed device".into(),
            )));
        }

        Ok(DeviceSource { ip })
    }
}

#[cfg(test)]
mod tests {
    use std::net::{Ipv4Addr, Ipv6Addr};

    use super::*;

    #[test]
    fn empty_allowlist_permits_everything() {
        let list = DeviceAllowlist::open();
        assert!(list.permits(IpAddr::V4(Ipv4Addr::new(203, 0, 113, 7))));
    }

    #[test]
    fn allowlist_rejects_unknown_source() {
        let list = DeviceAllowlist::new(vec![IpAddr::V4(Ipv4Addr::new(192, 168, 10, 23))]);
        assert!(list.permits(IpAddr::V4(Ipv4Addr::new(192, 168, 10, 23))));
        assert!(!list.permits(IpAddr::V4(Ipv4Addr::new(192, 168, 10, 24))));
    }

    #[test]
    fn mapped_ipv6_matches_ipv4_entry() {
        let list = DeviceAllowlist::new(vec![IpAddr::V4(Ipv4Addr::new(192, 168, 10, 23))]);
        let mapped = Ipv4Addr::new(192, 168, 10, 23).to_ipv6_mapped();
        assert!(list.permits(IpAddr::V6(mapped)));
        assert!(!list.permits(IpAddr::V6(Ipv6Addr::LOCALHOST)));
    }
}
