pub mod errors;
pub mod models;

mod account;
mod logs;
mod plants;
mod sensors;
mod water_pumps;

use std::sync::Arc;

use reqwest::{Client, Method, RequestBuilder, Response};
use serde::{de::DeserializeOwned, Serialize};
use tokio::sync::RwLock;
use tracing::{debug, warn};

use crate::config::Config;

pub use self::errors::{Fetched, GatewayError};

/// Typed client for the greenhouse REST backend.
///
/// Cheap to clone; all clones share one connection pool and one session
/// token.
#[derive(Debug, Clone)]
pub struct GatewayClient {
    inner: Arc<Inner>,
}

#[derive(Debug)]
struct Inner {
    http: Client,
    base_url: String,
    /// Session bearer token. `None` means requests go out unauthenticated.
    token: RwLock<Option<String>>,
}

impl GatewayClient {
    pub fn new(config: &Config) -> Self {
        Self::with_base_url(&config.backend_base_url, config.backend_token.clone())
    }

    pub fn with_base_url(base_url: &str, token: Option<String>) -> Self {
        Self {
            inner: Arc::new(Inner {
                http: Client::new(),
                base_url: base_url.trim_end_matches('/').to_owned(),
                token: RwLock::new(token),
            }),
        }
    }

    pub fn base_url(&self) -> &str {
        &self.inner.base_url
    }

    // -----------------------------------------------------------------------
    // Session token
    // -----------------------------------------------------------------------

    pub async fn set_token(&self, token: impl Into<String>) {
        *self.inner.token.write().await = Some(token.into());
    }

    pub async fn clear_token(&self) {
        *self.inner.token.write().await = None;
    }

    pub async fn token(&self) -> Option<String> {
        self.inner.token.read().await.clone()
    }

    pub async fn has_token(&self) -> bool {
        self.inner.token.read().await.is_some()
    }

    // -----------------------------------------------------------------------
    // Request plumbing
    // -----------------------------------------------------------------------

    pub(crate) fn url(&self, path: &str) -> String {
        format!("{}{}", self.inner.base_url, path)
    }

    /// Start a request, attaching the bearer token when one is set.
    pub(crate) async fn request(&self, method: Method, url: &str) -> RequestBuilder {
        let builder = self.inner.http.request(method, url);
        match self.inner.token.read().await.as_deref() {
            Some(token) => builder.bearer_auth(token),
            None => builder,
        }
    }

    /// Send `request` and return the response if its status is 2xx. The
    /// body is left unread.
    pub(crate) async fn send(
        &self,
        resource: &'static str,
        url: &str,
        request: RequestBuilder,
    ) -> Result<Response, GatewayError> {
        debug!(resource, url = %url, "Backend request");

        let response = request.send().await.map_err(|source| GatewayError::Transport {
            resource,
            url: url.to_owned(),
            source,
        })?;

        let status = response.status();
        if !status.is_success() {
            warn!(resource, url = %url, status = status.as_u16(), "Backend returned error status");
            return Err(GatewayError::RequestFailed {
                resource,
                url: url.to_owned(),
                status,
            });
        }
        Ok(response)
    }

    /// Send `request` and return the body of a 2xx response.
    pub(crate) async fn execute(
        &self,
        resource: &'static str,
        url: &str,
        request: RequestBuilder,
    ) -> Result<Vec<u8>, GatewayError> {
        let response = self.send(resource, url, request).await?;
        let bytes = response.bytes().await.map_err(|source| GatewayError::Transport {
            resource,
            url: url.to_owned(),
            source,
        })?;
        Ok(bytes.to_vec())
    }

    pub(crate) async fn get_json<T: DeserializeOwned>(
        &self,
        resource: &'static str,
        path: &str,
    ) -> Result<T, GatewayError> {
        let url = self.url(path);
        let request = self.request(Method::GET, &url).await;
        let bytes = self.execute(resource, &url, request).await?;
        decode(resource, &url, &bytes)
    }

    /// Send a JSON body and decode the JSON response.
    pub(crate) async fn send_json<B, T>(
        &self,
        method: Method,
        resource: &'static str,
        path: &str,
        body: &B,
    ) -> Result<T, GatewayError>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        let url = self.url(path);
        let request = self.request(method, &url).await.json(body);
        let bytes = self.execute(resource, &url, request).await?;
        decode(resource, &url, &bytes)
    }

    /// Send an optional JSON body and ignore whatever comes back.
    pub(crate) async fn send_unit<B>(
        &self,
        method: Method,
        resource: &'static str,
        path: &str,
        body: Option<&B>,
    ) -> Result<(), GatewayError>
    where
        B: Serialize + ?Sized,
    {
        let url = self.url(path);
        let mut request = self.request(method, &url).await;
        if let Some(body) = body {
            request = request.json(body);
        }
        self.execute(resource, &url, request).await?;
        Ok(())
    }
}

pub(crate) fn decode<T: DeserializeOwned>(
    resource: &'static str,
    url: &str,
    bytes: &[u8],
) -> Result<T, GatewayError> {
    serde_json::from_slice(bytes).map_err(|source| GatewayError::Decode {
        resource,
        url: url.to_owned(),
        source,
    })
}

/// Decode a body that must be a JSON array. The error is a human-readable
/// reason for callers that coerce bad shapes to an empty result.
pub(crate) fn parse_array_body<T: DeserializeOwned>(bytes: &[u8]) -> Result<Vec<T>, String> {
    let value: serde_json::Value = serde_json::from_slice(bytes).map_err(|e| e.to_string())?;
    if !value.is_array() {
        return Err("expected a JSON array".to_owned());
    }
    serde_json::from_value(value).map_err(|e| e.to_string())
}
