//! Device event classification and validation.
//!
//! A device message arrives as a loosely-typed JSON object
//! ([`RawEventPayload`]). [`RawEventPayload::into_event`] checks every field,
//! collects all problems into a single [`CoreError::Validation`], and on
//! success returns a normalized [`DeviceEvent`] ready to be persisted.

use std::fmt;
use std::str::FromStr;

use chrono::DateTime;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use validator::Validate;

use crate::error::CoreError;
use crate::types::Timestamp;

/// Verify mode assumed for attendance punches that do not report one.
pub const DEFAULT_VERIFY_MODE: VerifyMode = VerifyMode::Face;

// ---------------------------------------------------------------------------
// Discriminators
// ---------------------------------------------------------------------------

/// The three event kinds an MB360 terminal reports.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventKind {
    Attendance,
    Door,
    Temperature,
}

impl EventKind {
    pub const ALL: [EventKind; 3] = [EventKind::Attendance, EventKind::Door, EventKind::Temperature];

    pub fn as_str(self) -> &'static str {
        match self {
            EventKind::Attendance => "attendance",
            EventKind::Door => "door",
            EventKind::Temperature => "temperature",
        }
    }
}

impl fmt::Display for EventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for EventKind {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        EventKind::ALL
            .into_iter()
            .find(|kind| kind.as_str() == s)
            .ok_or_else(|| CoreError::UnknownEventType(s.to_string()))
    }
}

/// Credential used for an attendance punch.
///
/// The device reports these as numeric codes: 1 = fingerprint, 2 = face,
/// 3 = card.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VerifyMode {
    Fingerprint,
    Face,
    Card,
}

impl VerifyMode {
    pub fn from_code(code: u64) -> Option<Self> {
        match code {
            1 => Some(VerifyMode::Fingerprint),
            2 => Some(VerifyMode::Face),
            3 => Some(VerifyMode::Card),
            _ => None,
        }
    }

    /// Parse either a mode name (`"card"`) or a device code (`"3"`).
    pub fn parse(s: &str) -> Option<Self> {
        let s = s.trim();
        match s.to_ascii_lowercase().as_str() {
            "fingerprint" => Some(VerifyMode::Fingerprint),
            "face" => Some(VerifyMode::Face),
            "card" => Some(VerifyMode::Card),
            _ => s.parse().ok().and_then(Self::from_code),
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            VerifyMode::Fingerprint => "fingerprint",
            VerifyMode::Face => "face",
            VerifyMode::Card => "card",
        }
    }

    fn from_value(value: &Value) -> Option<Self> {
        match value {
            Value::Number(n) => n.as_u64().and_then(Self::from_code),
            Value::String(s) => Self::parse(s),
            _ => None,
        }
    }
}

/// Whether an attendance punch was a check-in or a check-out.
///
/// Device codes: 0 = check-in, 1 = check-out.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PunchState {
    CheckIn,
    CheckOut,
}

impl PunchState {
    pub fn from_code(code: u64) -> Option<Self> {
        match code {
            0 => Some(PunchState::CheckIn),
            1 => Some(PunchState::CheckOut),
            _ => None,
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        let s = s.trim();
        match s.to_ascii_lowercase().as_str() {
            "check_in" => Some(PunchState::CheckIn),
            "check_out" => Some(PunchState::CheckOut),
            _ => s.parse().ok().and_then(Self::from_code),
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            PunchState::CheckIn => "check_in",
            PunchState::CheckOut => "check_out",
        }
    }

    fn from_value(value: &Value) -> Option<Self> {
        match value {
            Value::Number(n) => n.as_u64().and_then(Self::from_code),
            Value::String(s) => Self::parse(s),
            _ => None,
        }
    }
}

/// Door sensor state reported with a `door` event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DoorAction {
    Open,
    Closed,
}

impl DoorAction {
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "open" => Some(DoorAction::Open),
            "closed" => Some(DoorAction::Closed),
            _ => None,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            DoorAction::Open => "open",
            DoorAction::Closed => "closed",
        }
    }
}

// ---------------------------------------------------------------------------
// Normalized events
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AttendanceEvent {
    pub event_id: String,
    pub user_id: String,
    pub device_id: String,
    pub timestamp: Timestamp,
    pub verify_mode: VerifyMode,
    pub punch: Option<PunchState>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DoorEvent {
    pub event_id: String,
    pub user_id: Option<String>,
    pub device_id: String,
    pub action: DoorAction,
    pub timestamp: Timestamp,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TemperatureEvent {
    pub event_id: String,
    pub user_id: Option<String>,
    pub device_id: String,
    pub value: f64,
    pub timestamp: Timestamp,
}

/// A validated device event, one variant per [`EventKind`].
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "event_type", rename_all = "snake_case")]
pub enum DeviceEvent {
    Attendance(AttendanceEvent),
    Door(DoorEvent),
    Temperature(TemperatureEvent),
}

impl DeviceEvent {
    pub fn kind(&self) -> EventKind {
        match self {
            DeviceEvent::Attendance(_) => EventKind::Attendance,
            DeviceEvent::Door(_) => EventKind::Door,
            DeviceEvent::Temperature(_) => EventKind::Temperature,
        }
    }

    pub fn event_id(&self) -> &str {
        match self {
            DeviceEvent::Attendance(e) => &e.event_id,
            DeviceEvent::Door(e) => &e.event_id,
            DeviceEvent::Temperature(e) => &e.event_id,
        }
    }

    pub fn device_id(&self) -> &str {
        match self {
            DeviceEvent::Attendance(e) => &e.device_id,
            DeviceEvent::Door(e) => &e.device_id,
            DeviceEvent::Temperature(e) => &e.device_id,
        }
    }
}

// ---------------------------------------------------------------------------
// Raw payload
// ---------------------------------------------------------------------------

/// A device message as received on the wire, before any type checking.
///
/// Every field is kept as an untyped JSON value so that type mismatches can
/// be reported per field instead of failing the whole decode. JSON `null`
/// is treated the same as an absent field.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RawEventPayload {
    #[serde(default)]
    pub event_id: Option<Value>,
    #[serde(default)]
    pub event_type: Option<Value>,
    #[serde(default)]
    pub user_id: Option<Value>,
    #[serde(default)]
    pub timestamp: Option<Value>,
    #[serde(default)]
    pub temperature: Option<Value>,
    #[serde(default)]
    pub door_state: Option<Value>,
    #[serde(default)]
    pub verify_mode: Option<Value>,
    #[serde(default)]
    pub punch_state: Option<Value>,
    #[serde(default)]
    pub device_id: Option<Value>,
}

/// String-typed fields that passed coercion; length and range limits are
/// declared here and checked by `validator`.
#[derive(Debug, Validate)]
struct CheckedFields {
    #[validate(length(min = 1, max = 128, message = "must be between 1 and 128 characters"))]
    event_id: String,
    #[validate(length(min = 1, max = 64, message = "must be between 1 and 64 characters"))]
    user_id: Option<String>,
    #[validate(range(min = -50.0, max = 150.0, message = "must be between -50 and 150"))]
    temperature: Option<f64>,
    #[validate(length(min = 1, max = 64, message = "must be between 1 and 64 characters"))]
    device_id: Option<String>,
}

/// Accumulates `field: message` problems in the order they are found.
#[derive(Debug, Default)]
struct FieldErrors(Vec<String>);

impl FieldErrors {
    fn push(&mut self, field: &str, message: &str) {
        self.0.push(format!("{field}: {message}"));
    }

    fn extend_from(&mut self, errors: &validator::ValidationErrors) {
        let mut fields: Vec<_> = errors.field_errors().into_iter().collect();
        fields.sort_by(|a, b| a.0.cmp(&b.0));
        for (field, errs) in fields {
            for err in errs {
                let message = err
                    .message
                    .as_deref()
                    .map(str::to_string)
                    .unwrap_or_else(|| err.code.to_string());
                self.push(&field, &message);
            }
        }
    }

    fn into_result(self) -> Result<(), CoreError> {
        if self.0.is_empty() {
            Ok(())
        } else {
            Err(CoreError::Validation(self.0.join("; ")))
        }
    }
}

impl RawEventPayload {
    /// Decode an HTTP request body. Field names must match exactly.
    pub fn from_json(value: Value) -> Result<Self, CoreError> {
        if !value.is_object() {
            return Err(CoreError::Validation(
                "payload must be a JSON object".to_string(),
            ));
        }
        serde_json::from_value(value).map_err(|e| CoreError::Validation(e.to_string()))
    }

    /// Decode a message received over the raw TCP relay.
    ///
    /// Devices speaking the socket protocol use the short keys `id` and
    /// `type`, and send numeric ids. Both forms are accepted here; when a
    /// message carries both the long and the short key, the long key wins.
    pub fn from_relay(value: Value) -> Result<Self, CoreError> {
        let Value::Object(mut map) = value else {
            return Err(CoreError::Validation(
                "payload must be a JSON object".to_string(),
            ));
        };
        rename_alias(&mut map, "id", "event_id");
        rename_alias(&mut map, "type", "event_type");
        if let Some(Value::Number(n)) = map.get("event_id") {
            let id = n.to_string();
            map.insert("event_id".to_string(), Value::String(id));
        }
        Self::from_json(Value::Object(map))
    }

    /// Validate every field and build the normalized event.
    ///
    /// `peer_device_id` identifies the sender (usually its IP address) and
    /// is used unless the payload carries an explicit `device_id`.
    pub fn into_event(self, peer_device_id: &str) -> Result<DeviceEvent, CoreError> {
        let mut errors = FieldErrors::default();

        let event_id = required_string(&mut errors, "event_id", self.event_id.as_ref());
        let user_id = optional_string(&mut errors, "user_id", self.user_id.as_ref());
        let device_id = optional_string(&mut errors, "device_id", self.device_id.as_ref());

        let kind = match self.event_type.as_ref() {
            None => {
                errors.push("event_type", "is required");
                None
            }
            Some(Value::String(s)) => match s.parse::<EventKind>() {
                Ok(kind) => Some(kind),
                Err(_) => {
                    errors.push("event_type", "must be one of attendance, door, temperature");
                    None
                }
            },
            Some(_) => {
                errors.push("event_type", "must be a string");
                None
            }
        };

        let timestamp = match self.timestamp.as_ref() {
            None => {
                errors.push("timestamp", "is required");
                None
            }
            Some(value) => {
                let ts = as_number(value).and_then(timestamp_from_epoch);
                if ts.is_none() {
                    errors.push("timestamp", "must be a numeric epoch in seconds");
                }
                ts
            }
        };

        let temperature = match self.temperature.as_ref() {
            None => None,
            Some(value) => {
                let reading = as_number(value);
                if reading.is_none() {
                    errors.push("temperature", "must be numeric");
                }
                reading
            }
        };

        let door_state = match self.door_state.as_ref() {
            None => None,
            Some(value) => {
                let action = value.as_str().and_then(DoorAction::parse);
                if action.is_none() {
                    errors.push("door_state", "must be one of open, closed");
                }
                action
            }
        };

        let verify_mode = match self.verify_mode.as_ref() {
            None => None,
            Some(value) => {
                let mode = VerifyMode::from_value(value);
                if mode.is_none() {
                    errors.push("verify_mode", "must be one of fingerprint, face, card");
                }
                mode
            }
        };

        let punch = match self.punch_state.as_ref() {
            None => None,
            Some(value) => {
                let punch = PunchState::from_value(value);
                if punch.is_none() {
                    errors.push("punch_state", "must be one of check_in, check_out");
                }
                punch
            }
        };

        match kind {
            Some(EventKind::Attendance) if user_id.is_none() => {
                errors.push("user_id", "is required for attendance events");
            }
            Some(EventKind::Door) if door_state.is_none() && self.door_state.is_none() => {
                errors.push("door_state", "is required for door events");
            }
            Some(EventKind::Temperature) if self.temperature.is_none() => {
                errors.push("temperature", "is required for temperature events");
            }
            _ => {}
        }

        let checked = CheckedFields {
            event_id: event_id.clone().unwrap_or_else(|| "-".to_string()),
            user_id: user_id.clone(),
            temperature,
            device_id: device_id.clone(),
        };
        if let Err(e) = checked.validate() {
            errors.extend_from(&e);
        }

        errors.into_result()?;

        // Every value below was checked above; a `None` here means the
        // error list was not empty and we already returned.
        let (Some(kind), Some(event_id), Some(timestamp)) = (kind, event_id, timestamp) else {
            return Err(CoreError::Internal(
                "validated payload is missing a required field".to_string(),
            ));
        };
        let device_id = device_id.unwrap_or_else(|| peer_device_id.to_string());

        let event = match kind {
            EventKind::Attendance => DeviceEvent::Attendance(AttendanceEvent {
                event_id,
                user_id: user_id.unwrap_or_default(),
                device_id,
                timestamp,
                verify_mode: verify_mode.unwrap_or(DEFAULT_VERIFY_MODE),
                punch,
            }),
            EventKind::Door => DeviceEvent::Door(DoorEvent {
                event_id,
                user_id,
                device_id,
                action: door_state.unwrap_or(DoorAction::Closed),
                timestamp,
            }),
            EventKind::Temperature => DeviceEvent::Temperature(TemperatureEvent {
                event_id,
                user_id,
                device_id,
                value: temperature.unwrap_or_default(),
                timestamp,
            }),
        };
        Ok(event)
    }
}

fn rename_alias(map: &mut Map<String, Value>, short: &str, long: &str) {
    if let Some(value) = map.remove(short) {
        map.entry(long.to_string()).or_insert(value);
    }
}

fn required_string(errors: &mut FieldErrors, field: &str, value: Option<&Value>) -> Option<String> {
    match value {
        None => {
            errors.push(field, "is required");
            None
        }
        Some(Value::String(s)) => Some(s.clone()),
        Some(_) => {
            errors.push(field, "must be a string");
            None
        }
    }
}

fn optional_string(errors: &mut FieldErrors, field: &str, value: Option<&Value>) -> Option<String> {
    match value {
        None => None,
        Some(Value::String(s)) => Some(s.clone()),
        Some(_) => {
            errors.push(field, "must be a string");
            None
        }
    }
}

/// Read a JSON number, or a string holding one.
fn as_number(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok(),
        _ => None,
    }
    .filter(|v| v.is_finite())
}

/// Convert fractional epoch seconds into a UTC timestamp.
///
/// Negative and out-of-range values yield `None`.
pub fn timestamp_from_epoch(secs: f64) -> Option<Timestamp> {
    if !secs.is_finite() || secs < 0.0 {
        return None;
    }
    let whole = secs.trunc();
    let nanos = (((secs - whole) * 1e9).round() as u32).min(999_999_999);
    DateTime::from_timestamp(whole as i64, nanos)
}
