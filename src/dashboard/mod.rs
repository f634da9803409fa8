pub mod cache;
pub mod compiler;
pub mod refresh;

use chrono::{DateTime, NaiveDate, Utc};
use serde::Serialize;

use crate::{
    aggregation::{self, Bucket, Timeframe},
    gateway::models::{AggregateValue, Greenhouse, Reading, SensorType},
};

pub use self::{cache::DashboardCache, compiler::DashboardCompiler, refresh::RefreshService};

/// Everything the dashboard shows for one sensor type.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SensorSummary {
    pub sensor: SensorType,
    pub latest: Reading,
    pub today_average: Option<AggregateValue>,
    pub yesterday_average: Option<AggregateValue>,
    /// Today's average minus yesterday's; `None` unless both exist.
    pub day_over_day: Option<f64>,
    pub history: Vec<Reading>,
}

impl SensorSummary {
    pub fn new(
        sensor: SensorType,
        latest: Reading,
        today_average: Option<AggregateValue>,
        yesterday_average: Option<AggregateValue>,
        history: Vec<Reading>,
    ) -> Self {
        let day_over_day = aggregation::day_over_day(
            today_average.as_ref().map(|a| a.value),
            yesterday_average.as_ref().map(|a| a.value),
        );
        Self {
            sensor,
            latest,
            today_average,
            yesterday_average,
            day_over_day,
            history,
        }
    }
}

/// One fully compiled dashboard. Built in a single pass; never partial.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DashboardView {
    pub greenhouse: Greenhouse,
    pub date: NaiveDate,
    pub compiled_at: DateTime<Utc>,
    /// One entry per sensor type, in [`SensorType::ALL`] order.
    pub sensors: Vec<SensorSummary>,
}

impl DashboardView {
    pub fn sensor(&self, sensor: SensorType) -> Option<&SensorSummary> {
        self.sensors.iter().find(|s| s.sensor == sensor)
    }

    /// Chart the stored history of `sensor` over `timeframe` ending at `now`.
    pub fn chart(&self, sensor: SensorType, timeframe: Timeframe, now: DateTime<Utc>) -> Option<Vec<Bucket>> {
        self.sensor(sensor)
            .map(|summary| aggregation::bucketize(&summary.history, timeframe, now))
    }
}
