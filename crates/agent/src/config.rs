use std::path::PathBuf;
use std::str::FromStr;

/// How the agent reaches the device.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transport {
    /// Command socket (`GET_ATTENDANCE_DATA`).
    Tcp,
    /// Web export (`/cgi-bin/AttLog.cgi`).
    Http,
}

impl FromStr for Transport {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "tcp" => Ok(Transport::Tcp),
            "http" => Ok(Transport::Http),
            _ => Err(ConfigError::Invalid {
                var: "MB360_TRANSPORT",
                value: s.to_string(),
            }),
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("{var} has an invalid value '{value}'")]
    Invalid { var: &'static str, value: String },
}

/// Agent configuration loaded from environment variables.
#[derive(Debug, Clone)]
pub struct AgentConfig {
    pub device_host: String,
    pub device_port: u16,
    pub transport: Transport,
    /// Base URL of the bridge API.
    pub api_url: String,
    pub poll_interval_secs: u64,
    /// Where the cursor is persisted; `None` keeps it in memory only.
    pub cursor_file: Option<PathBuf>,
    /// Connect/read timeout for the device and the API.
    pub device_timeout_secs: u64,
}

impl AgentConfig {
    /// Load configuration from environment variables with defaults.
    ///
    /// | Env Var               | Default                  |
    /// |-----------------------|--------------------------|
    /// | `MB360_DEVICE_HOST`   | `192.168.10.23`          |
    /// | `MB360_DEVICE_PORT`   | `80`                     |
    /// | `MB360_TRANSPORT`     | `tcp`                    |
    /// | `MB360_API_URL`       | `http://localhost:3000`  |
    /// | `POLL_INTERVAL_SECS`  | `60`                     |
    /// | `MB360_CURSOR_FILE`   | unset (in-memory cursor) |
    /// | `DEVICE_TIMEOUT_SECS` | `10`                     |
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Build from an arbitrary variable source.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |name: &str, default: &str| lookup(name).unwrap_or_else(|| default.to_string());

        Ok(Self {
            device_host: var("MB360_DEVICE_HOST", "192.168.10.23"),
            device_port: parse("MB360_DEVICE_PORT", var("MB360_DEVICE_PORT", "80"))?,
            transport: var("MB360_TRANSPORT", "tcp").parse()?,
            api_url: var("MB360_API_URL", "http://localhost:3000"),
            poll_interval_secs: parse_nonzero("POLL_INTERVAL_SECS", var("POLL_INTERVAL_SECS", "60"))?,
            cursor_file: lookup("MB360_CURSOR_FILE")
                .filter(|v| !v.trim().is_empty())
                .map(PathBuf::from),
            device_timeout_secs: parse_nonzero(
                "DEVICE_TIMEOUT_SECS",
                var("DEVICE_TIMEOUT_SECS", "10"),
            )?,
        })
    }
}

fn parse<T: FromStr>(var: &'static str, value: String) -> Result<T, ConfigError> {
    value
        .trim()
        .parse()
        .map_err(|_| ConfigError::Invalid { var, value })
}

/// Seconds that must be at least 1.
fn parse_nonzero(var: &'static str, value: String) -> Result<u64, ConfigError> {
    match parse::<u64>(var, value.clone())? {
        0 => Err(ConfigError::Invalid { var, value }),
        secs => Ok(secs),
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use assert_matches::assert_matches;

    use super::*;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |name| map.get(name).cloned()
    }

    #[test]
    fn defaults_apply_when_unset() {
        let config = AgentConfig::from_lookup(lookup(&[])).unwrap();
        assert_eq!(config.device_host, "192.168.10.23");
        assert_eq!(config.device_port, 80);
        assert_eq!(config.transport, Transport::Tcp);
        assert_eq!(config.api_url, "http://localhost:3000");
        assert_eq!(config.poll_interval_secs, 60);
        assert!(config.cursor_file.is_none());
        assert_eq!(config.device_timeout_secs, 10);
    }

    #[test]
    fn overrides_are_read() {
        let config = AgentConfig::from_lookup(lookup(&[
            ("MB360_TRANSPORT", "HTTP"),
            ("MB360_DEVICE_PORT", "4370"),
            ("MB360_CURSOR_FILE", "/var/lib/mb360/cursor.json"),
        ]))
        .unwrap();
        assert_eq!(config.transport, Transport::Http);
        assert_eq!(config.device_port, 4370);
        assert_eq!(
            config.cursor_file,
            Some(PathBuf::from("/var/lib/mb360/cursor.json"))
        );
    }

    #[test]
    fn bad_number_names_the_variable() {
        let err = AgentConfig::from_lookup(lookup(&[("POLL_INTERVAL_SECS", "soon")])).unwrap_err();
        assert_matches!(err, ConfigError::Invalid { var: "POLL_INTERVAL_SECS", .. });
    }

    #[test]
    fn zero_poll_interval_is_rejected() {
        let err = AgentConfig::from_lookup(lookup(&[("POLL_INTERVAL_SECS", "0")])).unwrap_err();
        assert_matches!(err, ConfigError::Invalid { var: "POLL_INTERVAL_SECS", ref value } if value == "0");
    }

    #[test]
    fn zero_device_timeout_is_rejected() {
        let err = AgentConfig::from_lookup(lookup(&[("DEVICE_TIMEOUT_SECS", "0")])).unwrap_err();
        assert_matches!(err, ConfigError::Invalid { var: "DEVICE_TIMEOUT_SECS", .. });
    }

    #[test]
    fn unknown_transport_is_rejected() {
        assert!("serial".parse::<Transport>().is_err());
    }
}
