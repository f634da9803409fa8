use std::{fmt, str::FromStr};

use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// SensorType
// ---------------------------------------------------------------------------

/// The four sensor kinds the backend knows about.
///
/// On the wire a sensor type is its numeric id (`sensorId: 1..=4`). As text
/// (URLs, config, query strings) it is the camelCase name used by the
/// dashboard, e.g. `soilMoisture`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub enum SensorType {
    Temperature = 1,
    Humidity = 2,
    Light = 3,
    SoilMoisture = 4,
}

impl SensorType {
    /// Every concrete sensor type, in id order.
    pub const ALL: [SensorType; 4] = [
        SensorType::Temperature,
        SensorType::Humidity,
        SensorType::Light,
        SensorType::SoilMoisture,
    ];

    pub fn id(self) -> u8 {
        self as u8
    }

    pub fn from_id(id: u8) -> Option<Self> {
        Self::ALL.into_iter().find(|s| s.id() == id)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            SensorType::Temperature => "temperature",
            SensorType::Humidity => "humidity",
            SensorType::Light => "light",
            SensorType::SoilMoisture => "soilMoisture",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ParseSensorError {
    #[error("unknown sensor type: {0:?}")]
    UnknownName(String),
    #[error("unknown sensor id: {0}")]
    UnknownId(u8),
}

impl From<SensorType> for u8 {
    fn from(s: SensorType) -> Self {
        s.id()
    }
}

impl TryFrom<u8> for SensorType {
    type Error = ParseSensorError;

    fn try_from(id: u8) -> Result<Self, Self::Error> {
        Self::from_id(id).ok_or(ParseSensorError::UnknownId(id))
    }
}

impl FromStr for SensorType {
    type Err = ParseSensorError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "temperature" => Ok(Self::Temperature),
            "humidity" => Ok(Self::Humidity),
            "light" => Ok(Self::Light),
            "soilMoisture" | "soil_moisture" | "soil-moisture" => Ok(Self::SoilMoisture),
            other => Err(ParseSensorError::UnknownName(other.to_owned())),
        }
    }
}

impl fmt::Display for SensorType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ---------------------------------------------------------------------------
// SensorSelector
// ---------------------------------------------------------------------------

/// A concrete sensor type or the `"all"` wildcard.
///
/// The wildcard is valid for listing and status checks but has no meaning
/// for single-value averaging.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SensorSelector {
    All,
    One(SensorType),
}

impl SensorSelector {
    /// Concrete types covered by this selector.
    pub fn sensors(self) -> Vec<SensorType> {
        match self {
            SensorSelector::All => SensorType::ALL.to_vec(),
            SensorSelector::One(s) => vec![s],
        }
    }
}

impl From<SensorType> for SensorSelector {
    fn from(s: SensorType) -> Self {
        SensorSelector::One(s)
    }
}

impl FromStr for SensorSelector {
    type Err = ParseSensorError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "all" => Ok(Self::All),
            other => other.parse().map(Self::One),
        }
    }
}

impl fmt::Display for SensorSelector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SensorSelector::All => f.write_str("all"),
            SensorSelector::One(s) => fmt::Display::fmt(s, f),
        }
    }
}

// ---------------------------------------------------------------------------
// Timestamps
//
// The backend serialises DateTime values either as RFC 3339 with an offset or
// as a bare local timestamp ("2024-01-01T10:00:00.123"). Bare timestamps are
// interpreted as UTC.
// ---------------------------------------------------------------------------

/// Parse a backend timestamp. Returns `None` for anything unrecognisable.
pub fn parse_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    let raw = raw.trim();
    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Some(dt.with_timezone(&Utc));
    }
    ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f"]
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(raw, fmt).ok())
        .map(|naive| naive.and_utc())
}

mod timestamp {
    use chrono::{DateTime, Utc};
    use serde::{de, Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(dt: &DateTime<Utc>, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_str(&dt.to_rfc3339())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<DateTime<Utc>, D::Error> {
        let raw = String::deserialize(d)?;
        super::parse_timestamp(&raw)
            .ok_or_else(|| de::Error::custom(format!("unrecognised timestamp: {raw:?}")))
    }
}

// ---------------------------------------------------------------------------
// Sensor readings: /SensorReading/...
// ---------------------------------------------------------------------------

/// One timestamped measurement. Created by the backend, never mutated here.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Reading {
    pub id: i64,
    #[serde(with = "timestamp")]
    pub date: DateTime<Utc>,
    pub value: f64,
    pub sensor_id: SensorType,
}

/// Average of one sensor type's readings over one calendar date.
///
/// Derived on demand, never persisted. `value` is rounded to two decimals.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AggregateValue {
    pub date: NaiveDate,
    pub value: f64,
    pub sensor_id: SensorType,
}

/// Sensor metadata: GET /Sensor/{id}
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Sensor {
    pub id: i64,
    #[serde(rename = "type", default)]
    pub kind: Option<String>,
    #[serde(default)]
    pub unit: Option<String>,
    #[serde(default)]
    pub threshold_value: Option<f64>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SensorThresholdUpdate {
    pub threshold_value: f64,
}

// ---------------------------------------------------------------------------
// Logs: /Log
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogKind {
    /// Emitted for a sensor reading.
    Sensor,
    /// Emitted by a water pump.
    Watering,
    /// Neither sensor nor pump.
    System,
}

/// One event record from the backend log.
///
/// `date` is kept as the raw string: a malformed timestamp must degrade to
/// "device off" during status inference, not fail the whole log fetch.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LogEntry {
    pub id: i64,
    pub date: String,
    #[serde(default)]
    pub message: String,
    #[serde(default)]
    pub water_pump_id: Option<i64>,
    #[serde(default)]
    pub sensor_reading_id: Option<i64>,
    #[serde(default)]
    pub greenhouse_id: i64,
}

impl LogEntry {
    pub fn timestamp(&self) -> Option<DateTime<Utc>> {
        parse_timestamp(&self.date)
    }

    pub fn kind(&self) -> LogKind {
        match (self.sensor_reading_id, self.water_pump_id) {
            (Some(_), _) => LogKind::Sensor,
            (None, Some(_)) => LogKind::Watering,
            (None, None) => LogKind::System,
        }
    }
}

// ---------------------------------------------------------------------------
// Greenhouse: /Greenhouse/...
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Greenhouse {
    pub id: i64,
    pub name: String,
    #[serde(default)]
    pub gardener_id: Option<i64>,
}

#[derive(Debug, Serialize)]
pub struct GreenhouseNameUpdate<'a> {
    pub name: &'a str,
}

// ---------------------------------------------------------------------------
// Water pumps: /WaterPump/...
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WaterPump {
    pub id: i64,
    pub greenhouse_id: i64,
    pub current_water_level: f64,
    pub capacity: f64,
    pub threshold: f64,
    pub auto_watering: bool,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NewWaterPump {
    pub greenhouse_id: i64,
    pub capacity: f64,
    pub threshold: f64,
    pub auto_watering: bool,
}

#[derive(Debug, Serialize)]
pub struct PumpThresholdUpdate {
    pub threshold: f64,
}

#[derive(Debug, Serialize)]
pub struct PumpCapacityUpdate {
    pub capacity: f64,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AutoWateringUpdate {
    pub auto_watering: bool,
}

#[derive(Debug, Serialize)]
pub struct WaterLevelUpdate {
    /// Water added to the tank, in the backend's unit (millilitres).
    pub amount: f64,
}

/// Body of `GET /WaterPump/{id}/water-level`.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WaterLevel {
    pub current_water_level: f64,
    #[serde(default)]
    pub capacity: Option<f64>,
}

// ---------------------------------------------------------------------------
// Plants & pictures: /Plant, /Picture
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Plant {
    pub id: i64,
    pub name: String,
    #[serde(default)]
    pub species: Option<String>,
    #[serde(default)]
    pub greenhouse_id: Option<i64>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NewPlant {
    pub name: String,
    pub species: Option<String>,
    pub greenhouse_id: i64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Picture {
    pub id: i64,
    pub url: String,
    #[serde(default)]
    pub note: Option<String>,
    pub plant_id: i64,
    #[serde(default)]
    pub time_stamp: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct PictureNoteUpdate<'a> {
    pub note: &'a str,
}

/// A file to upload as a plant picture.
#[derive(Debug, Clone)]
pub struct PictureUpload {
    pub plant_id: i64,
    pub file_name: String,
    /// MIME type, e.g. `image/jpeg`. `None` lets the backend sniff it.
    pub content_type: Option<String>,
    pub bytes: Vec<u8>,
    pub note: Option<String>,
}

// ---------------------------------------------------------------------------
// Notifications: /Notification, /notificationpref, /notificationHub
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Notification {
    pub id: i64,
    #[serde(rename = "type", default)]
    pub kind: String,
    pub message: String,
    #[serde(default)]
    pub time_stamp: Option<String>,
    #[serde(default)]
    pub is_read: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NotificationPreference {
    #[serde(rename = "type")]
    pub kind: String,
    pub is_enabled: bool,
    #[serde(default)]
    pub gardener_id: Option<i64>,
}

#[derive(Debug, Serialize)]
pub struct NotificationPreferenceToggle<'a> {
    #[serde(rename = "type")]
    pub kind: &'a str,
}

// ---------------------------------------------------------------------------
// Auth: /Auth/confirm-password
// ---------------------------------------------------------------------------

#[derive(Debug, Serialize)]
pub struct ConfirmPasswordRequest<'a> {
    pub password: &'a str,
}
