// API client module: turns one logical operation into one HTTP exchange
// against an instance and classifies whatever comes back. All response
// classification lives here so every command reports failures the same way.

use anyhow::{Context, Result};
use reqwest::blocking::Client;
use reqwest::header::{HeaderMap, HeaderName, HeaderValue, AUTHORIZATION};
use reqwest::Method;
use serde::Deserialize;
use serde_json::{Map, Value};
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, error, warn};
use url::Url;

use crate::error::ApiError;

/// Path of the login endpoint. A 401 from here means bad credentials rather
/// than a bad token.
pub const TOKEN_PATH: &str = "/token";

/// Default bound on a single request, connect time included.
pub const DEFAULT_TIMEOUT_SECS: u64 = 30;

/// Decoded JSON object from a successful response.
pub type Payload = Map<String, Value>;

/// Body of an outgoing request.
#[derive(Debug, Clone, PartialEq)]
pub enum RequestBody {
    Empty,
    Json(Value),
    Form(Vec<(String, String)>),
}

/// Description of one API call. Built fresh for every call.
#[derive(Debug, Clone)]
pub struct Operation {
    pub method: Method,
    pub path: String,
    pub body: RequestBody,
    pub headers: HeaderMap,
    /// When set the dispatcher attaches `Authorization: Bearer <token>` and
    /// refuses to send without a token.
    pub requires_auth: bool,
}

impl Operation {
    pub fn new(method: Method, path: impl Into<String>) -> Self {
        Self {
            method,
            path: path.into(),
            body: RequestBody::Empty,
            headers: HeaderMap::new(),
            requires_auth: false,
        }
    }

    pub fn json(mut self, body: Value) -> Self {
        self.body = RequestBody::Json(body);
        self
    }

    pub fn form(mut self, fields: &[(&str, &str)]) -> Self {
        let fields = fields
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        self.body = RequestBody::Form(fields);
        self
    }

    pub fn header(mut self, name: HeaderName, value: &'static str) -> Self {
        self.headers.insert(name, HeaderValue::from_static(value));
        self
    }

    pub fn authenticated(mut self) -> Self {
        self.requires_auth = true;
        self
    }
}

/// A request ready to go on the wire.
#[derive(Debug, Clone)]
pub struct HttpRequest {
    pub method: Method,
    pub url: Url,
    pub headers: HeaderMap,
    pub body: RequestBody,
}

/// Status and raw body of a received response.
#[derive(Debug, Clone)]
pub struct HttpResponse {
    pub status: u16,
    pub body: String,
}

#[derive(Debug, Error)]
pub enum TransportError {
    /// The instance could not be reached (DNS, refused, timeout).
    #[error("connection failed: {0}")]
    Connect(String),
    #[error("{0}")]
    Other(String),
}

/// Performs a single HTTP exchange. Implemented over reqwest for real use
/// and by recording fakes in tests.
pub trait Transport {
    fn execute(&self, request: HttpRequest) -> Result<HttpResponse, TransportError>;
}

impl<T: Transport + ?Sized> Transport for &T {
    fn execute(&self, request: HttpRequest) -> Result<HttpResponse, TransportError> {
        (**self).execute(request)
    }
}

/// Blocking reqwest transport with a bounded per-request timeout.
#[derive(Clone)]
pub struct HttpTransport {
    client: Client,
}

impl HttpTransport {
    pub fn new(timeout: Duration) -> Result<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .context("Failed to build HTTP client")?;
        Ok(HttpTransport { client })
    }
}

impl Transport for HttpTransport {
    fn execute(&self, request: HttpRequest) -> Result<HttpResponse, TransportError> {
        let mut builder = self
            .client
            .request(request.method, request.url)
            .headers(request.headers);
        builder = match &request.body {
            RequestBody::Empty => builder,
            RequestBody::Json(body) => builder.json(body),
            RequestBody::Form(fields) => builder.form(fields),
        };

        let res = builder.send().map_err(transport_error)?;
        let status = res.status().as_u16();
        let body = res.text().map_err(transport_error)?;
        Ok(HttpResponse { status, body })
    }
}

fn transport_error(err: reqwest::Error) -> TransportError {
    if err.is_connect() || err.is_timeout() {
        TransportError::Connect(err.to_string())
    } else {
        TransportError::Other(err.to_string())
    }
}

// Error envelope returned by the service on non-2xx responses.
#[derive(Deserialize, Debug)]
struct ErrorEnvelope {
    detail: Value,
}

/// Sends operations through a `Transport` and classifies the outcome.
pub struct Dispatcher<T: Transport = HttpTransport> {
    transport: T,
}

impl Dispatcher<HttpTransport> {
    /// Dispatcher over the real network.
    pub fn http(timeout: Duration) -> Result<Self> {
        Ok(Dispatcher::new(HttpTransport::new(timeout)?))
    }
}

impl<T: Transport> Dispatcher<T> {
    pub fn new(transport: T) -> Self {
        Dispatcher { transport }
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    /// Perform `op` against `base_url`. Authenticated operations without a
    /// token fail before anything is sent.
    pub fn send(&self, op: Operation, base_url: &str, token: Option<&str>) -> Result<Payload, ApiError> {
        let mut headers = op.headers;
        if op.requires_auth {
            let token = token.filter(|t| !t.is_empty()).ok_or(ApiError::MissingToken)?;
            // A token that cannot be put in a header can never be valid.
            let value = HeaderValue::from_str(&format!("Bearer {token}"))
                .map_err(|_| ApiError::InvalidToken)?;
            headers.insert(AUTHORIZATION, value);
        }

        let url = endpoint_url(base_url, &op.path)?;
        debug!(method = %op.method, %url, "dispatching request");

        let request = HttpRequest { method: op.method, url, headers, body: op.body };
        let response = match self.transport.execute(request) {
            Ok(response) => response,
            Err(TransportError::Connect(reason)) => {
                warn!(base_url, %reason, "instance unreachable");
                return Err(ApiError::Connection { base_url: base_url.to_string() });
            }
            Err(TransportError::Other(reason)) => {
                error!(base_url, %reason, "request failed unexpectedly");
                return Err(ApiError::Unexpected(reason));
            }
        };

        debug!(status = response.status, path = %op.path, "response received");
        classify(&op.path, response)
    }
}

/// Append `path` to the base URL's own path, so instances mounted under a
/// prefix keep it. Query and fragment of the base are dropped.
pub fn endpoint_url(base_url: &str, path: &str) -> Result<Url, ApiError> {
    let mut url = Url::parse(base_url).map_err(|e| ApiError::InvalidUrl {
        url: base_url.to_string(),
        reason: e.to_string(),
    })?;
    let joined = format!(
        "{}/{}",
        url.path().trim_end_matches('/'),
        path.trim_start_matches('/')
    );
    url.set_path(&joined);
    url.set_query(None);
    url.set_fragment(None);
    Ok(url)
}

/// Map a raw response onto a payload or a classified error.
pub fn classify(path: &str, response: HttpResponse) -> Result<Payload, ApiError> {
    let status = response.status;
    if (200..300).contains(&status) {
        if response.body.trim().is_empty() {
            return Ok(Payload::new());
        }
        return serde_json::from_str::<Payload>(&response.body).map_err(|e| {
            error!(path, status, "undecodable success response");
            ApiError::Unexpected(format!("invalid JSON in response from {path}: {e}"))
        });
    }

    let detail = serde_json::from_str::<ErrorEnvelope>(&response.body)
        .ok()
        .map(|envelope| envelope.detail);

    match status {
        422 => {
            let message = detail
                .as_ref()
                .and_then(first_field_error)
                .unwrap_or_else(|| render_detail(detail.as_ref(), &response.body, status));
            Err(ApiError::Validation(message))
        }
        401 if path == TOKEN_PATH => Err(ApiError::InvalidCredentials(render_detail(
            detail.as_ref(),
            &response.body,
            status,
        ))),
        401 => Err(ApiError::InvalidToken),
        _ => Err(ApiError::Service {
            status,
            detail: render_detail(detail.as_ref(), &response.body, status),
        }),
    }
}

// `detail` of a 422 is a list of field errors; the first one's `msg` wins.
fn first_field_error(detail: &Value) -> Option<String> {
    detail
        .as_array()?
        .first()?
        .get("msg")?
        .as_str()
        .map(str::to_string)
}

fn render_detail(detail: Option<&Value>, raw: &str, status: u16) -> String {
    match detail {
        Some(Value::String(s)) => s.clone(),
        Some(other) => other.to_string(),
        None if !raw.trim().is_empty() => raw.trim().to_string(),
        None => format!("Request failed with status {status}"),
    }
}
