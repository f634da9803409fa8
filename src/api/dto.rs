use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};

use crate::{
    aggregation::{round2, Bucket},
    dashboard::{DashboardView, SensorSummary},
    gateway::models::{AggregateValue, LogEntry, LogKind, Reading, WaterPump},
};

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct ReadingDto {
    pub id: i64,
    pub date: DateTime<Utc>,
    pub value: f64,
    /// camelCase sensor name, e.g. `soilMoisture`
    pub sensor: String,
}

impl From<Reading> for ReadingDto {
    fn from(r: Reading) -> Self {
        Self {
            id: r.id,
            date: r.date,
            value: r.value,
            sensor: r.sensor_id.to_string(),
        }
    }
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct AggregateDto {
    pub date: NaiveDate,
    /// Mean of the day's readings, two decimals
    pub value: f64,
    pub sensor: String,
}

impl From<AggregateValue> for AggregateDto {
    fn from(a: AggregateValue) -> Self {
        Self {
            date: a.date,
            value: a.value,
            sensor: a.sensor_id.to_string(),
        }
    }
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct SensorSummaryDto {
    pub sensor: String,
    pub latest: ReadingDto,
    pub today_average: Option<f64>,
    pub yesterday_average: Option<f64>,
    /// Today's average minus yesterday's
    pub day_over_day: Option<f64>,
    /// Number of readings in the sensor's history
    pub history_len: usize,
}

impl From<SensorSummary> for SensorSummaryDto {
    fn from(s: SensorSummary) -> Self {
        Self {
            sensor: s.sensor.to_string(),
            latest: s.latest.into(),
            today_average: s.today_average.map(|a| a.value),
            yesterday_average: s.yesterday_average.map(|a| a.value),
            day_over_day: s.day_over_day,
            history_len: s.history.len(),
        }
    }
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct DashboardDto {
    pub greenhouse_id: i64,
    pub greenhouse_name: String,
    pub date: NaiveDate,
    pub compiled_at: DateTime<Utc>,
    pub sensors: Vec<SensorSummaryDto>,
}

impl From<DashboardView> for DashboardDto {
    fn from(v: DashboardView) -> Self {
        Self {
            greenhouse_id: v.greenhouse.id,
            greenhouse_name: v.greenhouse.name,
            date: v.date,
            compiled_at: v.compiled_at,
            sensors: v.sensors.into_iter().map(Into::into).collect(),
        }
    }
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct BucketDto {
    /// `HH:MM` for hourly buckets, `YYYY-MM-DD` for daily ones
    pub label: String,
    /// `null` when no reading fell in the bucket
    pub value: Option<f64>,
}

impl From<Bucket> for BucketDto {
    fn from(b: Bucket) -> Self {
        Self {
            label: b.label,
            value: b.value,
        }
    }
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct StatusDto {
    /// The sensor name, or `all`
    pub selector: String,
    pub on: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum AverageStatus {
    Ok,
    NoData,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct AverageDto {
    pub status: AverageStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub average: Option<AggregateDto>,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum LogKindDto {
    Sensor,
    Watering,
    System,
}

impl From<LogKind> for LogKindDto {
    fn from(k: LogKind) -> Self {
        match k {
            LogKind::Sensor => Self::Sensor,
            LogKind::Watering => Self::Watering,
            LogKind::System => Self::System,
        }
    }
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct LogEntryDto {
    pub id: i64,
    /// As sent by the backend
    pub date: String,
    pub message: String,
    pub kind: LogKindDto,
    pub water_pump_id: Option<i64>,
    pub sensor_reading_id: Option<i64>,
}

impl From<LogEntry> for LogEntryDto {
    fn from(l: LogEntry) -> Self {
        let kind = l.kind().into();
        Self {
            id: l.id,
            date: l.date,
            message: l.message,
            kind,
            water_pump_id: l.water_pump_id,
            sensor_reading_id: l.sensor_reading_id,
        }
    }
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct WaterPumpDto {
    pub id: i64,
    pub greenhouse_id: i64,
    pub current_water_level: f64,
    pub capacity: f64,
    pub threshold: f64,
    pub auto_watering: bool,
    /// Tank fill level in percent; absent when capacity is zero
    pub fill_percent: Option<f64>,
}

impl From<WaterPump> for WaterPumpDto {
    fn from(p: WaterPump) -> Self {
        let fill_percent =
            (p.capacity > 0.0).then(|| round2(p.current_water_level / p.capacity * 100.0));
        Self {
            id: p.id,
            greenhouse_id: p.greenhouse_id,
            current_water_level: p.current_water_level,
            capacity: p.capacity,
            threshold: p.threshold,
            auto_watering: p.auto_watering,
            fill_percent,
        }
    }
}

// ---------------------------------------------------------------------------
// Query parameters
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct ChartQuery {
    /// `24h` (default), `7d` or `30d`
    pub timeframe: Option<String>,
}

#[derive(Debug, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct DateQuery {
    /// `YYYY-MM-DD`
    pub date: Option<String>,
}
