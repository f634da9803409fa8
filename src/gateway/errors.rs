use reqwest::StatusCode;

/// Failure of a single backend operation.
///
/// `resource` is a short human-readable name of what was being fetched
/// (e.g. `"sensor readings"`), `url` the full URL that was attempted.
#[derive(Debug, thiserror::Error)]
pub enum GatewayError {
    /// The backend answered with a non-2xx status.
    #[error("{resource} request to {url} failed with status {status}")]
    RequestFailed {
        resource: &'static str,
        url: String,
        status: StatusCode,
    },

    /// The response was fine but the expected element or field is absent.
    #[error("{resource} not found at {url}")]
    NotFound { resource: &'static str, url: String },

    /// The request never produced a response (DNS, connect, TLS, body read).
    #[error("{resource} request to {url} could not be completed: {source}")]
    Transport {
        resource: &'static str,
        url: String,
        #[source]
        source: reqwest::Error,
    },

    /// A 2xx body that is not the JSON shape we expected.
    #[error("{resource} response from {url} could not be decoded: {source}")]
    Decode {
        resource: &'static str,
        url: String,
        #[source]
        source: serde_json::Error,
    },

    /// The request could not be built from the given input.
    #[error("invalid {resource} request: {reason}")]
    InvalidRequest {
        resource: &'static str,
        reason: String,
    },
}

impl GatewayError {
    /// Backend status code, for `RequestFailed` only.
    pub fn status(&self) -> Option<StatusCode> {
        match self {
            GatewayError::RequestFailed { status, .. } => Some(*status),
            _ => None,
        }
    }
}

/// Outcome of a fail-soft gateway helper.
///
/// Keeps "there is legitimately no data" (`Empty`) apart from "the request
/// failed" (`Failed`), so callers can't conflate the two.
#[derive(Debug)]
pub enum Fetched<T> {
    Data(T),
    Empty,
    Failed(GatewayError),
}

impl<T> Fetched<T> {
    /// `Empty` becomes `Ok(None)`, `Failed` becomes `Err`.
    pub fn into_result(self) -> Result<Option<T>, GatewayError> {
        match self {
            Fetched::Data(v) => Ok(Some(v)),
            Fetched::Empty => Ok(None),
            Fetched::Failed(e) => Err(e),
        }
    }

    pub fn is_empty(&self) -> bool {
        matches!(self, Fetched::Empty)
    }
}
