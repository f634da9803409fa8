//! Time-bucketed aggregation of sensor readings for charts, plus the
//! per-date averages the dashboard shows.
//!
//! Everything here is a pure function of its inputs: `now` is always passed
//! in, never read from the clock.

use std::{fmt, str::FromStr};

use chrono::{DateTime, DurationRound, NaiveDate, NaiveTime, TimeDelta, Utc};
use serde::Serialize;

use crate::gateway::models::{AggregateValue, Reading, SensorType};

// ---------------------------------------------------------------------------
// Timeframe
// ---------------------------------------------------------------------------

/// Chart window. Each timeframe has a fixed bucket count and width.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Timeframe {
    /// 24 clock-hour buckets, the last one containing `now`.
    Last24Hours,
    /// 7 UTC calendar-day buckets, the last one being today.
    Last7Days,
    /// 30 UTC calendar-day buckets, the last one being today.
    Last30Days,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown timeframe {0:?} (expected 24h, 7d or 30d)")]
pub struct ParseTimeframeError(pub String);

impl Timeframe {
    pub fn bucket_count(self) -> usize {
        match self {
            Timeframe::Last24Hours => 24,
            Timeframe::Last7Days => 7,
            Timeframe::Last30Days => 30,
        }
    }

    fn bucket_width(self) -> TimeDelta {
        match self {
            Timeframe::Last24Hours => TimeDelta::hours(1),
            Timeframe::Last7Days | Timeframe::Last30Days => TimeDelta::days(1),
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Timeframe::Last24Hours => "24h",
            Timeframe::Last7Days => "7d",
            Timeframe::Last30Days => "30d",
        }
    }

    /// Start of the newest bucket.
    fn anchor(self, now: DateTime<Utc>) -> DateTime<Utc> {
        match self {
            Timeframe::Last24Hours => now.duration_trunc(TimeDelta::hours(1)).unwrap_or(now),
            Timeframe::Last7Days | Timeframe::Last30Days => {
                now.date_naive().and_time(NaiveTime::MIN).and_utc()
            }
        }
    }

    fn label(self, start: DateTime<Utc>) -> String {
        match self {
            Timeframe::Last24Hours => start.format("%H:%M").to_string(),
            Timeframe::Last7Days | Timeframe::Last30Days => start.format("%Y-%m-%d").to_string(),
        }
    }
}

impl FromStr for Timeframe {
    type Err = ParseTimeframeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "24h" => Ok(Self::Last24Hours),
            "7d" => Ok(Self::Last7Days),
            "30d" => Ok(Self::Last30Days),
            other => Err(ParseTimeframeError(other.to_owned())),
        }
    }
}

impl fmt::Display for Timeframe {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ---------------------------------------------------------------------------
// Buckets
// ---------------------------------------------------------------------------

/// One slot on a chart's time axis.
///
/// `value` is `None` when no reading fell in the slot. Gaps are never
/// coerced to zero.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Bucket {
    pub label: String,
    pub value: Option<f64>,
}

#[derive(Debug, Clone, Copy)]
struct Window {
    start: DateTime<Utc>,
    end: DateTime<Utc>,
}

/// Half-open `[start, end)` windows for `timeframe`, oldest first.
fn windows(timeframe: Timeframe, now: DateTime<Utc>) -> Vec<Window> {
    let width = timeframe.bucket_width();
    let newest = timeframe.anchor(now);
    let count = timeframe.bucket_count();

    (0..count)
        .map(|i| {
            let back = i32::try_from(count - 1 - i).unwrap_or(i32::MAX);
            let start = newest - width * back;
            Window { start, end: start + width }
        })
        .collect()
}

/// Bucket `readings` into the fixed-length axis for `timeframe`.
///
/// The output always has [`Timeframe::bucket_count`] entries with labels
/// ordered oldest to newest. Readings outside the window are ignored.
pub fn bucketize(readings: &[Reading], timeframe: Timeframe, now: DateTime<Utc>) -> Vec<Bucket> {
    let windows = windows(timeframe, now);
    let mut acc = vec![(0.0_f64, 0_usize); windows.len()];

    for reading in readings {
        // Windows are contiguous and sorted, so the first one that has not
        // ended yet is the only candidate.
        let idx = windows.partition_point(|w| w.end <= reading.date);
        if let Some(w) = windows.get(idx) {
            if w.start <= reading.date {
                acc[idx].0 += reading.value;
                acc[idx].1 += 1;
            }
        }
    }

    windows
        .iter()
        .zip(acc)
        .map(|(w, (sum, n))| Bucket {
            label: timeframe.label(w.start),
            value: (n > 0).then(|| round2(sum / n as f64)),
        })
        .collect()
}

// ---------------------------------------------------------------------------
// Averages
// ---------------------------------------------------------------------------

/// Round to exactly two decimal places.
pub fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

fn mean(values: impl IntoIterator<Item = f64>) -> Option<f64> {
    let (sum, n) = values
        .into_iter()
        .fold((0.0, 0_usize), |(sum, n), v| (sum + v, n + 1));
    (n > 0).then(|| sum / n as f64)
}

/// Average the readings of `sensor` among `readings`, which the caller has
/// already scoped to `date`.
///
/// Returns `None` when no reading matches.
pub fn average_for_date(
    readings: &[Reading],
    sensor: SensorType,
    date: NaiveDate,
) -> Option<AggregateValue> {
    mean(
        readings
            .iter()
            .filter(|r| r.sensor_id == sensor)
            .map(|r| r.value),
    )
    .map(|avg| AggregateValue {
        date,
        value: round2(avg),
        sensor_id: sensor,
    })
}

/// Today minus yesterday, when both averages exist.
pub fn day_over_day(today: Option<f64>, yesterday: Option<f64>) -> Option<f64> {
    Some(round2(today? - yesterday?))
}
