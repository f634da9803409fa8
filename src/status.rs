//! On/off inference for sensors from the recency of their log entries.
//!
//! This is a liveness heuristic, not a heartbeat protocol: a burst of stale
//! data can transiently misreport a device.

use chrono::{DateTime, TimeDelta, Utc};
use tracing::{debug, warn};

use crate::gateway::{
    models::{LogEntry, SensorSelector, SensorType},
    Fetched, GatewayClient, GatewayError,
};

/// Maximum age of the freshest log entry for a device to count as "on".
pub const FRESHNESS_WINDOW_MINUTES: i64 = 60;

/// Decide whether `sensor` is on, given the backend log and the current time.
///
/// Entries count when their `sensorReadingId` equals the sensor's type id or
/// is absent (untyped entries are ambiguous and included). No matching entry,
/// or a latest entry with an unparseable timestamp, means off.
pub fn infer_status(logs: &[LogEntry], sensor: SensorType, now: DateTime<Utc>) -> bool {
    let type_id = i64::from(sensor.id());

    let latest = logs
        .iter()
        .filter(|log| log.sensor_reading_id.map_or(true, |id| id == type_id))
        .max_by_key(|log| log.timestamp());

    let Some(latest) = latest else {
        return false;
    };
    let Some(ts) = latest.timestamp() else {
        debug!(%sensor, date = %latest.date, "Latest log entry has unparseable date");
        return false;
    };

    (now - ts).abs() <= TimeDelta::minutes(FRESHNESS_WINDOW_MINUTES)
}

/// Gateway-backed status checks.
#[derive(Debug, Clone)]
pub struct StatusInferencer {
    gateway: GatewayClient,
}

impl StatusInferencer {
    pub fn new(gateway: GatewayClient) -> Self {
        Self { gateway }
    }

    /// Status of a single sensor type. An empty log means off; a failed log
    /// request is an error.
    pub async fn sensor_status(
        &self,
        sensor: SensorType,
        now: DateTime<Utc>,
    ) -> Result<bool, GatewayError> {
        let logs = self.gateway.logs(None).await.into_result()?;
        Ok(logs.is_some_and(|logs| infer_status(&logs, sensor, now)))
    }

    /// Status for a selector.
    ///
    /// For `All`, every concrete type must be on. Evaluation stops at the
    /// first type that is off or whose check fails; failures are logged and
    /// count as off, so `All` never returns an error.
    pub async fn status(
        &self,
        selector: SensorSelector,
        now: DateTime<Utc>,
    ) -> Result<bool, GatewayError> {
        match selector {
            SensorSelector::One(sensor) => self.sensor_status(sensor, now).await,
            SensorSelector::All => Ok(self.all_on(now).await),
        }
    }

    async fn all_on(&self, now: DateTime<Utc>) -> bool {
        // One log fetch serves all four checks; the endpoint is not per-type.
        let logs = match self.gateway.logs(None).await {
            Fetched::Data(logs) => logs,
            Fetched::Empty => return false,
            Fetched::Failed(e) => {
                warn!(error = %e, "Status check failed; reporting all sensors off");
                return false;
            }
        };

        for sensor in SensorType::ALL {
            if !infer_status(&logs, sensor, now) {
                debug!(%sensor, "Sensor is off; short-circuiting all-sensor status");
                return false;
            }
        }
        true
    }
}
