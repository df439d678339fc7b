//! One-shot command sessions with an MB360 terminal.
//!
//! Every call opens a fresh connection, sends a single command, reads one
//! response and closes. Failures surface immediately; there is no retry.

use std::io;
use std::time::Duration;

use async_trait::async_trait;
use mb360_core::attlog::{parse_attendance_log, AttendanceRecord};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;

/// Largest response read from the device socket.
pub const RESPONSE_BUFFER_BYTES: usize = 2048;

/// Socket command returning the attendance log.
pub const GET_ATTENDANCE_COMMAND: &str = "GET_ATTENDANCE_DATA\r\n";

/// Marker the device includes in its reply to a successful enrolment.
const SUCCESS_MARKER: &str = "SUCCESS";

/// Path of the attendance log export on the device's web server.
const ATTLOG_PATH: &str = "/cgi-bin/AttLog.cgi";

// ---------------------------------------------------------------------------
// Error
// ---------------------------------------------------------------------------

#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    /// The device refused or dropped the connection attempt.
    #[error("Failed to connect to {addr}: {source}")]
    Connect {
        addr: String,
        #[source]
        source: io::Error,
    },

    /// The device did not answer in time.
    #[error("Device did not respond within {0:?}")]
    Timeout(Duration),

    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// The device web server answered with a non-2xx status.
    #[error("Device returned HTTP {0}")]
    Rejected(u16),
}

// ---------------------------------------------------------------------------
// Attendance source seam
// ---------------------------------------------------------------------------

/// Anything the poller can pull an attendance log from.
#[async_trait]
pub trait AttendanceSource: Send + Sync {
    /// Identifier recorded as `device_id` on forwarded events.
    fn device_id(&self) -> &str;

    async fn fetch_records(&self) -> Result<Vec<AttendanceRecord>, SessionError>;
}

/// A user to enrol on the terminal.
#[derive(Debug, Clone)]
pub struct NewDeviceUser {
    pub user_id: String,
    pub name: String,
    pub fingerprint: Option<String>,
    pub face: Option<String>,
}

impl NewDeviceUser {
    /// Render the `ADD_USER` socket command.
    pub fn command(&self) -> String {
        let mut command = format!("ADD_USER:{},{}", self.user_id, self.name);
        for template in [&self.fingerprint, &self.face].into_iter().flatten() {
            command.push(',');
            command.push_str(template);
        }
        command.push_str("\r\n");
        command
    }
}

// ---------------------------------------------------------------------------
// Raw socket session
// ---------------------------------------------------------------------------

/// Talks to the terminal's command socket.
#[derive(Debug, Clone)]
pub struct TcpSession {
    host: String,
    port: u16,
    timeout: Duration,
}

impl TcpSession {
    pub fn new(host: impl Into<String>, port: u16, timeout: Duration) -> Self {
        Self {
            host: host.into(),
            port,
            timeout,
        }
    }

    /// Send one command and return whatever fits in the response buffer.
    pub async fn send_command(&self, command: &str) -> Result<String, SessionError> {
        let addr = format!("{}:{}", self.host, self.port);

        let mut stream = tokio::time::timeout(self.timeout, TcpStream::connect(&addr))
            .await
            .map_err(|_| SessionError::Timeout(self.timeout))?
            .map_err(|source| SessionError::Connect {
                addr: addr.clone(),
                source,
            })?;

        stream.write_all(command.as_bytes()).await?;

        let mut buf = [0u8; RESPONSE_BUFFER_BYTES];
        let read = tokio::time::timeout(self.timeout, stream.read(&mut buf))
            .await
            .map_err(|_| SessionError::Timeout(self.timeout))??;

        tracing::debug!(%addr, bytes = read, "Device responded");
        Ok(String::from_utf8_lossy(&buf[..read]).into_owned())
    }

    pub async fn get_attendance_records(&self) -> Result<Vec<AttendanceRecord>, SessionError> {
        let response = self.send_command(GET_ATTENDANCE_COMMAND).await?;
        Ok(parse_attendance_log(&response))
    }

    /// Enrol a user; `Ok(false)` when the device answered without `SUCCESS`.
    pub async fn add_user(&self, user: &NewDeviceUser) -> Result<bool, SessionError> {
        let response = self.send_command(&user.command()).await?;
        let added = response.contains(SUCCESS_MARKER);
        if !added {
            tracing::warn!(user_id = %user.user_id, response = %response.trim(), "Device rejected user");
        }
        Ok(added)
    }
}

#[async_trait]
impl AttendanceSource for TcpSession {
    fn device_id(&self) -> &str {
        &self.host
    }

    async fn fetch_records(&self) -> Result<Vec<AttendanceRecord>, SessionError> {
        self.get_attendance_records().await
    }
}

// ---------------------------------------------------------------------------
// Web export session
// ---------------------------------------------------------------------------

/// Fetches the attendance log from the terminal's built-in web server.
#[derive(Debug, Clone)]
pub struct HttpSession {
    host: String,
    url: String,
    client: reqwest::Client,
}

impl HttpSession {
    /// `host` may carry a port (`10.0.0.5:8080`).
    pub fn new(host: impl Into<String>, timeout: Duration) -> Result<Self, SessionError> {
        let host = host.into();
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self {
            url: format!("http://{host}{ATTLOG_PATH}"),
            host,
            client,
        })
    }

    pub async fn get_attendance_log(&self) -> Result<String, SessionError> {
        let response = self.client.get(&self.url).send().await?;
        if !response.status().is_success() {
            return Err(SessionError::Rejected(response.status().as_u16()));
        }
        Ok(response.text().await?)
    }
}

#[async_trait]
impl AttendanceSource for HttpSession {
    fn device_id(&self) -> &str {
        self.host.split(':').next().unwrap_or(&self.host)
    }

    async fn fetch_records(&self) -> Result<Vec<AttendanceRecord>, SessionError> {
        let body = self.get_attendance_log().await?;
        Ok(parse_attendance_log(&body))
    }
}

/// The transport picked at startup.
#[derive(Debug, Clone)]
pub enum DeviceSession {
    Tcp(TcpSession),
    Http(HttpSession),
}

#[async_trait]
impl AttendanceSource for DeviceSession {
    fn device_id(&self) -> &str {
        match self {
            DeviceSession::Tcp(s) => s.device_id(),
            DeviceSession::Http(s) => s.device_id(),
        }
    }

    async fn fetch_records(&self) -> Result<Vec<AttendanceRecord>, SessionError> {
        match self {
            DeviceSession::Tcp(s) => s.fetch_records().await,
            DeviceSession::Http(s) => s.fetch_records().await,
        }
    }
}
