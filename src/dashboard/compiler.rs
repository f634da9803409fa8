use chrono::{DateTime, NaiveDate, Utc};
use futures::future::try_join_all;
use tracing::{debug, info};

use super::{DashboardView, SensorSummary};
use crate::gateway::{models::SensorType, GatewayClient, GatewayError};

/// Joins greenhouse identity, latest readings, daily averages and history
/// into one [`DashboardView`].
#[derive(Debug, Clone)]
pub struct DashboardCompiler {
    gateway: GatewayClient,
}

impl DashboardCompiler {
    pub fn new(gateway: GatewayClient) -> Self {
        Self { gateway }
    }

    /// Compile the dashboard for `gardener_id` as of `now`.
    ///
    /// All 17 backend requests run concurrently. The first failure aborts the
    /// whole compilation; a day with no readings is a `None` average, not a
    /// failure.
    pub async fn compile(
        &self,
        gardener_id: i64,
        now: DateTime<Utc>,
    ) -> Result<DashboardView, GatewayError> {
        let today = now.date_naive();
        let yesterday = today.pred_opt().unwrap_or(today);
        info!(gardener_id, %today, "Compiling dashboard");

        let (greenhouse, sensors) = tokio::try_join!(
            self.gateway.greenhouse_for_gardener(gardener_id),
            try_join_all(
                SensorType::ALL.map(|sensor| self.summarize(sensor, today, yesterday))
            ),
        )?;

        info!(
            gardener_id,
            greenhouse_id = greenhouse.id,
            sensors = sensors.len(),
            "Dashboard compiled"
        );

        Ok(DashboardView {
            greenhouse,
            date: today,
            compiled_at: now,
            sensors,
        })
    }

    async fn summarize(
        &self,
        sensor: SensorType,
        today: NaiveDate,
        yesterday: NaiveDate,
    ) -> Result<SensorSummary, GatewayError> {
        let (latest, today_average, yesterday_average, history) = tokio::try_join!(
            self.gateway.latest_reading(sensor),
            async {
                self.gateway
                    .sensor_average_by_date(sensor.into(), today)
                    .await
                    .into_result()
            },
            async {
                self.gateway
                    .sensor_average_by_date(sensor.into(), yesterday)
                    .await
                    .into_result()
            },
            self.gateway.readings_by_sensor(sensor),
        )?;

        debug!(%sensor, readings = history.len(), "Sensor summary fetched");
        Ok(SensorSummary::new(
            sensor,
            latest,
            today_average,
            yesterday_average,
            history,
        ))
    }
}
