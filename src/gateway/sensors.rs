use chrono::NaiveDate;
use reqwest::Method;
use serde_json::Value;
use tracing::{info, warn};

use super::{
    models::{
        AggregateValue, Reading, Sensor, SensorSelector, SensorThresholdUpdate, SensorType,
    },
    parse_array_body, Fetched, GatewayClient, GatewayError,
};
use crate::aggregation;

impl GatewayClient {
    /// All readings ever recorded for one sensor type.
    pub async fn readings_by_sensor(&self, sensor: SensorType) -> Result<Vec<Reading>, GatewayError> {
        self.get_json("sensor readings", &format!("/SensorReading/sensor/{}", sensor.id()))
            .await
    }

    /// The last element of the sensor's reading collection.
    ///
    /// Fails with `NotFound` if the backend has no readings for the type.
    pub async fn latest_reading(&self, sensor: SensorType) -> Result<Reading, GatewayError> {
        let path = format!("/SensorReading/sensor/{}", sensor.id());
        let readings: Vec<Reading> = self.get_json("latest sensor reading", &path).await?;
        readings.into_iter().last().ok_or_else(|| GatewayError::NotFound {
            resource: "latest sensor reading",
            url: self.url(&path),
        })
    }

    /// All readings (every sensor type) recorded on `date`.
    pub async fn readings_by_date(&self, date: NaiveDate) -> Result<Vec<Reading>, GatewayError> {
        self.get_json("sensor readings by date", &date_path(date)).await
    }

    /// Average of one sensor type over `date`.
    ///
    /// Never fails for an ordinary absence of data: the wildcard selector and
    /// a date without matching readings both yield `Fetched::Empty`, as does a
    /// body that isn't an array of readings. Only transport/HTTP failures
    /// produce `Fetched::Failed`.
    pub async fn sensor_average_by_date(
        &self,
        selector: SensorSelector,
        date: NaiveDate,
    ) -> Fetched<AggregateValue> {
        let sensor = match selector {
            SensorSelector::One(sensor) => sensor,
            SensorSelector::All => {
                info!(%date, "Average requested for all sensors; no single value to compute");
                return Fetched::Empty;
            }
        };

        let url = self.url(&date_path(date));
        let request = self.request(Method::GET, &url).await;
        let bytes = match self.execute("sensor average", &url, request).await {
            Ok(bytes) => bytes,
            Err(e) => return Fetched::Failed(e),
        };

        let readings: Vec<Reading> = match parse_array_body(&bytes) {
            Ok(readings) => readings,
            Err(reason) => {
                warn!(url = %url, reason = %reason, "Unexpected readings response; no average");
                return Fetched::Empty;
            }
        };

        match aggregation::average_for_date(&readings, sensor, date) {
            Some(avg) => Fetched::Data(avg),
            None => {
                warn!(%sensor, %date, "No readings to average");
                Fetched::Empty
            }
        }
    }

    /// Sensor metadata, including its alert threshold when one is set.
    pub async fn sensor(&self, sensor: SensorType) -> Result<Sensor, GatewayError> {
        self.get_json("sensor", &format!("/Sensor/{}", sensor.id())).await
    }

    /// The configured threshold of `sensor`; `NotFound` if none is set.
    pub async fn sensor_threshold(&self, sensor: SensorType) -> Result<f64, GatewayError> {
        let path = format!("/Sensor/{}", sensor.id());
        let meta: Sensor = self.get_json("sensor threshold", &path).await?;
        meta.threshold_value.ok_or_else(|| GatewayError::NotFound {
            resource: "sensor threshold",
            url: self.url(&path),
        })
    }

    pub async fn update_sensor_threshold(
        &self,
        sensor: SensorType,
        threshold_value: f64,
    ) -> Result<(), GatewayError> {
        self.send_unit(
            Method::PATCH,
            "sensor threshold update",
            &format!("/Sensor/update/{}", sensor.id()),
            Some(&SensorThresholdUpdate { threshold_value }),
        )
        .await
    }

    /// The most recent ML prediction record, passed through untouched.
    pub async fn latest_prediction(&self) -> Result<Value, GatewayError> {
        self.get_json("prediction", "/Prediction/").await
    }
}

fn date_path(date: NaiveDate) -> String {
    format!("/SensorReading/date/{}", date.format("%Y-%m-%d"))
}
