use std::net::IpAddr;

use crate::middleware::device::DeviceAllowlist;

/// Server configuration loaded from environment variables.
///
/// All fields have sensible defaults suitable for local development.
/// In production, override via environment variables.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Bind address (default: `0.0.0.0`).
    pub host: String,
    /// Bind port (default: `3000`).
    pub port: u16,
    /// Allowed CORS origins, parsed from comma-separated `CORS_ORIGINS` env var.
    pub cors_origins: Vec<String>,
    /// HTTP request timeout in seconds (default: `30`).
    pub request_timeout_secs: u64,
    /// How long to wait for background tasks after the server stops (default: `5`).
    pub shutdown_timeout_secs: u64,
    /// Raw TCP relay settings.
    pub relay: RelayConfig,
    /// Source addresses allowed to submit device events.
    pub device_allowlist: DeviceAllowlist,
}

/// Settings for the raw socket relay that devices push JSON lines to.
#[derive(Debug, Clone)]
pub struct RelayConfig {
    /// Whether to start the relay listener at all (default: `true`).
    pub enabled: bool,
    /// Relay bind port (default: `8000`). Binds on the same host as HTTP.
    pub port: u16,
    /// Seconds to wait for a client to send its line (default: `10`).
    pub read_timeout_secs: u64,
}

impl ServerConfig {
    /// Load configuration from environment variables with defaults.
    ///
    /// | Env Var                   | Default                    |
    /// |---------------------------|----------------------------|
    /// | `HOST`                    | `0.0.0.0`                  |
    /// | `PORT`                    | `3000`                     |
    /// | `CORS_ORIGINS`            | `http://localhost:5173`    |
    /// | `REQUEST_TIMEOUT_SECS`    | `30`                       |
    /// | `SHUTDOWN_TIMEOUT_SECS`   | `5`                        |
    /// | `RELAY_ENABLED`           | `true`                     |
    /// | `RELAY_PORT`              | `8000`                     |
    /// | `RELAY_READ_TIMEOUT_SECS` | `10`                       |
    /// | `MB360_DEVICE_IPS`        | empty (accept any source)  |
    pub fn from_env() -> Self {
        let host = std::env::var("HOST").unwrap_or_else(|_| "0.0.0.0".into());

        let port: u16 = std::env::var("PORT")
            .unwrap_or_else(|_| "3000".into())
            .parse()
            .expect("PORT must be a valid u16");

        let cors_origins = split_list(
            &std::env::var("CORS_ORIGINS").unwrap_or_else(|_| "http://localhost:5173".into()),
        );

        let request_timeout_secs: u64 = std::env::var("REQUEST_TIMEOUT_SECS")
            .unwrap_or_else(|_| "30".into())
            .parse()
            .expect("REQUEST_TIMEOUT_SECS must be a valid u64");

        let shutdown_timeout_secs: u64 = std::env::var("SHUTDOWN_TIMEOUT_SECS")
            .unwrap_or_else(|_| "5".into())
            .parse()
            .expect("SHUTDOWN_TIMEOUT_SECS must be a valid u64");

        let relay = RelayConfig {
            enabled: std::env::var("RELAY_ENABLED")
                .map(|v| !matches!(v.trim(), "0" | "false" | "no" | "off"))
                .unwrap_or(true),
            port: std::env::var("RELAY_PORT")
                .unwrap_or_else(|_| "8000".into())
                .parse()
                .expect("RELAY_PORT must be a valid u16"),
            read_timeout_secs: std::env::var("RELAY_READ_TIMEOUT_SECS")
                .unwrap_or_else(|_| "10".into())
                .parse()
                .expect("RELAY_READ_TIMEOUT_SECS must be a valid u64"),
        };

        let device_ips: Vec<IpAddr> = split_list(&std::env::var("MB360_DEVICE_IPS").unwrap_or_default())
            .iter()
            .map(|ip| {
                ip.parse()
                    .unwrap_or_else(|e| panic!("Invalid MB360_DEVICE_IPS entry '{ip}': {e}"))
            })
            .collect();

        Self {
            host,
            port,
            cors_origins,
            request_timeout_secs,
            shutdown_timeout_secs,
            relay,
            device_allowlist: DeviceAllowlist::new(device_ips),
        }
    }
}

/// Split a comma-separated env value, dropping blanks.
fn split_list(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn split_list_drops_blanks() {
        assert_eq!(
            split_list(" 10.0.0.1, ,10.0.0.2,"),
            vec!["10.0.0.1".to_string(), "10.0.0.2".to_string()]
        );
        assert!(split_list("").is_empty());
    }
}
