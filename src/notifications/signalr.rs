//! SignalR JSON protocol over Server-Sent Events.
//!
//! Connection sequence:
//! 1. `POST {hub}/negotiate?negotiateVersion=1` returns a connection token,
//! 2. `GET {hub}?id={token}` opens the event stream,
//! 3. `POST {hub}?id={token}` sends the protocol handshake,
//! 4. each SSE `data` payload carries `\u{1e}`-terminated JSON records.

use async_trait::async_trait;
use reqwest::{header, Method, Url};
use serde::Deserialize;
use serde_json::{json, Value};
use tracing::{debug, info, warn};

use super::{HubError, HubLink, HubTransport};
use crate::{
    config::Config,
    gateway::{self, models::Notification, GatewayClient},
};

/// Terminator of every SignalR JSON record.
pub const RECORD_SEPARATOR: char = '\u{1e}';

/// The handshake record announcing the JSON protocol.
pub fn handshake_frame() -> String {
    format!("{}{RECORD_SEPARATOR}", json!({ "protocol": "json", "version": 1 }))
}

// ---------------------------------------------------------------------------
// Framing
// ---------------------------------------------------------------------------

/// Incremental Server-Sent Events decoder. Yields the `data` of each
/// complete event; other fields and comments are ignored.
#[derive(Debug, Default)]
pub struct SseDecoder {
    line: Vec<u8>,
    data: Vec<String>,
}

impl SseDecoder {
    pub fn push(&mut self, chunk: &[u8]) -> Vec<String> {
        let mut events = Vec::new();
        for &byte in chunk {
            if byte != b'\n' {
                self.line.push(byte);
                continue;
            }

            let mut line = std::mem::take(&mut self.line);
            if line.last() == Some(&b'\r') {
                line.pop();
            }
            if line.is_empty() {
                if !self.data.is_empty() {
                    events.push(self.data.join("\n"));
                    self.data.clear();
                }
                continue;
            }

            let line = String::from_utf8_lossy(&line);
            if let Some(value) = line.strip_prefix("data:") {
                self.data
                    .push(value.strip_prefix(' ').unwrap_or(value).to_owned());
            }
        }
        events
    }
}

/// Splits a text stream into complete `\u{1e}`-terminated records.
#[derive(Debug, Default)]
pub struct RecordBuffer {
    pending: String,
}

impl RecordBuffer {
    pub fn push(&mut self, text: &str) -> Vec<String> {
        self.pending.push_str(text);
        let Some(last) = self.pending.rfind(RECORD_SEPARATOR) else {
            return Vec::new();
        };

        let rest = self.pending.split_off(last + RECORD_SEPARATOR.len_utf8());
        let complete = std::mem::replace(&mut self.pending, rest);
        complete
            .split(RECORD_SEPARATOR)
            .filter(|r| !r.trim().is_empty())
            .map(str::to_owned)
            .collect()
    }
}

/// A decoded hub record.
#[derive(Debug, Clone, PartialEq)]
pub enum HubMessage {
    /// Reply to the client handshake; `error` set when rejected.
    Handshake { error: Option<String> },
    Invocation { target: String, arguments: Vec<Value> },
    Ping,
    Close { error: Option<String> },
    /// A record type this client does not act on.
    Other(i64),
}

#[derive(Deserialize)]
struct RawRecord {
    #[serde(rename = "type")]
    kind: Option<i64>,
    #[serde(default)]
    target: String,
    #[serde(default)]
    arguments: Vec<Value>,
    #[serde(default)]
    error: Option<String>,
}

pub fn parse_record(record: &str) -> Result<HubMessage, serde_json::Error> {
    let raw: RawRecord = serde_json::from_str(record)?;
    Ok(match raw.kind {
        None => HubMessage::Handshake { error: raw.error },
        Some(1) => HubMessage::Invocation {
            target: raw.target,
            arguments: raw.arguments,
        },
        Some(6) => HubMessage::Ping,
        Some(7) => HubMessage::Close { error: raw.error },
        Some(other) => HubMessage::Other(other),
    })
}

/// The notification carried by an invocation of `method`, if any.
///
/// Method names compare case-insensitively, as SignalR does.
pub fn notification_from(message: &HubMessage, method: &str) -> Option<Notification> {
    let HubMessage::Invocation { target, arguments } = message else {
        return None;
    };
    if !target.eq_ignore_ascii_case(method) {
        debug!(target = %target, "Ignoring hub invocation for other method");
        return None;
    }
    let payload = arguments.first()?;
    match serde_json::from_value(payload.clone()) {
        Ok(notification) => Some(notification),
        Err(e) => {
            warn!(error = %e, "Hub invocation argument is not a notification");
            None
        }
    }
}

// ---------------------------------------------------------------------------
// Transport
// ---------------------------------------------------------------------------

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct NegotiateResponse {
    #[serde(default)]
    connection_token: Option<String>,
    #[serde(default)]
    connection_id: Option<String>,
}

/// Production transport: the backend's SignalR hub over SSE, authenticated
/// with the gateway's session token.
#[derive(Debug, Clone)]
pub struct SignalRTransport {
    gateway: GatewayClient,
    hub_path: String,
    method: String,
}

impl SignalRTransport {
    pub fn new(gateway: GatewayClient, hub_path: impl Into<String>, method: impl Into<String>) -> Self {
        Self {
            gateway,
            hub_path: hub_path.into(),
            method: method.into(),
        }
    }

    pub fn from_config(gateway: GatewayClient, config: &Config) -> Self {
        Self::new(gateway, config.hub_path.clone(), config.hub_method.clone())
    }

    async fn negotiate(&self) -> Result<String, HubError> {
        const RESOURCE: &str = "hub negotiation";

        let url = self
            .gateway
            .url(&format!("{}/negotiate?negotiateVersion=1", self.hub_path));
        let request = self.gateway.request(Method::POST, &url).await;
        let bytes = self.gateway.execute(RESOURCE, &url, request).await?;
        let negotiated: NegotiateResponse = gateway::decode(RESOURCE, &url, &bytes)?;

        negotiated
            .connection_token
            .or(negotiated.connection_id)
            .ok_or(HubError::MissingConnectionToken)
    }

    fn handle(&self, link: &HubLink, message: HubMessage) -> Result<bool, HubError> {
        match message {
            HubMessage::Handshake { error: Some(e) } => return Err(HubError::Handshake(e)),
            HubMessage::Handshake { error: None } => {
                info!(hub = %self.hub_path, "Notification hub connected");
                link.opened();
            }
            HubMessage::Close { error: Some(e) } => return Err(HubError::Closed(e)),
            HubMessage::Close { error: None } => return Ok(false),
            HubMessage::Ping | HubMessage::Other(_) => {}
            invocation @ HubMessage::Invocation { .. } => {
                if let Some(notification) = notification_from(&invocation, &self.method) {
                    debug!(id = notification.id, kind = %notification.kind, "Notification received");
                    link.deliver(notification);
                }
            }
        }
        Ok(true)
    }
}

#[async_trait]
impl HubTransport for SignalRTransport {
    async fn run(&self, link: &HubLink) -> Result<(), HubError> {
        let token = self.negotiate().await?;
        let mut connection = Url::parse(&self.gateway.url(&self.hub_path))
            .map_err(|e| HubError::InvalidUrl(e.to_string()))?;
        connection.query_pairs_mut().append_pair("id", &token);
        let url = connection.as_str();

        let stream_request = self
            .gateway
            .request(Method::GET, url)
            .await
            .header(header::ACCEPT, "text/event-stream");
        let mut response = self
            .gateway
            .send("notification stream", url, stream_request)
            .await?;

        let handshake = self
            .gateway
            .request(Method::POST, url)
            .await
            .header(header::CONTENT_TYPE, "text/plain")
            .body(handshake_frame());
        self.gateway.execute("hub handshake", url, handshake).await?;

        let mut events = SseDecoder::default();
        let mut records = RecordBuffer::default();
        while let Some(chunk) = response.chunk().await.map_err(HubError::Stream)? {
            for data in events.push(&chunk) {
                for record in records.push(&data) {
                    let message = parse_record(&record).map_err(HubError::Malformed)?;
                    if !self.handle(link, message)? {
                        return Ok(());
                    }
                }
            }
        }
        Ok(())
    }
}
