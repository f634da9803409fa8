use chrono::NaiveDate;
use reqwest::Method;
use tracing::warn;

use super::{models::LogEntry, parse_array_body, Fetched, GatewayClient};

impl GatewayClient {
    /// Backend log entries, optionally restricted to one calendar date.
    ///
    /// Fail-soft: an empty list and a body that isn't an array of log entries
    /// both yield `Fetched::Empty` (the latter with a warning). Only
    /// transport/HTTP failures yield `Fetched::Failed`.
    pub async fn logs(&self, date: Option<NaiveDate>) -> Fetched<Vec<LogEntry>> {
        let path = match date {
            Some(date) => format!("/Log/{}", date.format("%Y-%m-%d")),
            None => "/Log".to_owned(),
        };
        let url = self.url(&path);

        let request = self.request(Method::GET, &url).await;
        let bytes = match self.execute("logs", &url, request).await {
            Ok(bytes) => bytes,
            Err(e) => return Fetched::Failed(e),
        };

        let entries: Vec<LogEntry> = match parse_array_body(&bytes) {
            Ok(entries) => entries,
            Err(reason) => {
                warn!(url = %url, reason = %reason, "Unexpected log response; treating as empty");
                return Fetched::Empty;
            }
        };

        if entries.is_empty() {
            warn!(url = %url, "No log entries");
            Fetched::Empty
        } else {
            Fetched::Data(entries)
        }
    }
}
