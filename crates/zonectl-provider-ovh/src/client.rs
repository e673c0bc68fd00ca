// # OVH API Transport
//
// Authenticated request execution against the OVH REST API.
//
// ## Request Signing
//
// Every call carries `X-Ovh-Application`, `X-Ovh-Consumer`, `X-Ovh-Timestamp`
// and `X-Ovh-Signature`, where the signature is
//
// ```text
// "$1$" + hex(sha1(secret + "+" + consumer + "+" + METHOD + "+" + url + "+" + body + "+" + timestamp))
// ```
//
// The timestamp is the local clock corrected by the offset to the server
// clock, fetched once per client from the unauthenticated `GET /auth/time`.
//
// ## Security
//
// - The application secret and consumer key NEVER appear in logs
// - Debug output redacts them
//
// No retries happen here: a failed call surfaces immediately.

use async_trait::async_trait;
use reqwest::Method;
use serde_json::Value;
use sha1::{Digest, Sha1};
use std::fmt;
use std::time::Duration;
use tokio::sync::OnceCell;
use tokio_util::sync::CancellationToken;
use zonectl_core::{Error, Result};

/// Default HTTP timeout for API requests (30 seconds)
const DEFAULT_HTTP_TIMEOUT: Duration = Duration::from_secs(30);

/// Known endpoint aliases and their API base URLs
const ENDPOINTS: &[(&str, &str)] = &[
    ("ovh-eu", "https://eu.api.ovh.com/1.0"),
    ("ovh-ca", "https://ca.api.ovh.com/1.0"),
    ("ovh-us", "https://api.us.ovhcloud.com/1.0"),
    ("kimsufi-eu", "https://eu.api.kimsufi.com/1.0"),
    ("kimsufi-ca", "https://ca.api.kimsufi.com/1.0"),
    ("soyoustart-eu", "https://eu.api.soyoustart.com/1.0"),
    ("soyoustart-ca", "https://ca.api.soyoustart.com/1.0"),
];

/// Path-addressed JSON API the record store talks to
///
/// Paths are relative to the API base (`/domain/zone/...`). Every method
/// races `cancel` and returns `Error::Cancelled` if it fires first.
#[async_trait]
pub trait Transport: Send + Sync {
    /// `GET path`, returning the decoded JSON body
    async fn get(&self, cancel: &CancellationToken, path: &str) -> Result<Value>;

    /// `POST path` with an optional JSON body, returning the decoded JSON
    /// response (`Value::Null` when the API sends none)
    async fn post(&self, cancel: &CancellationToken, path: &str, body: Option<&Value>)
    -> Result<Value>;

    /// `DELETE path`
    async fn delete(&self, cancel: &CancellationToken, path: &str) -> Result<()>;
}

/// Builds a [`Transport`]; invoked lazily by the record store
pub trait Connector: Send + Sync {
    fn connect(&self) -> Result<Box<dyn Transport>>;
}

/// Static OVH credentials, the connector for [`OvhClient`]
#[derive(Clone)]
pub struct OvhCredentials {
    pub endpoint: String,
    pub application_key: String,
    pub application_secret: String,
    pub consumer_key: String,
}

impl fmt::Debug for OvhCredentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OvhCredentials")
            .field("endpoint", &self.endpoint)
            .field("application_key", &self.application_key)
            .field("application_secret", &"<REDACTED>")
            .field("consumer_key", &"<REDACTED>")
            .finish()
    }
}

impl Connector for OvhCredentials {
    fn connect(&self) -> Result<Box<dyn Transport>> {
        Ok(Box::new(OvhClient::new(self)?))
    }
}

/// Resolve an endpoint alias to its base URL.
///
/// Values starting with `http://` or `https://` are taken verbatim (minus a
/// trailing slash).
pub fn resolve_endpoint(endpoint: &str) -> Result<String> {
    if endpoint.starts_with("https://") || endpoint.starts_with("http://") {
        return Ok(endpoint.trim_end_matches('/').to_string());
    }

    ENDPOINTS
        .iter()
        .find(|(alias, _)| *alias == endpoint)
        .map(|(_, url)| url.to_string())
        .ok_or_else(|| Error::config(format!("Unknown OVH endpoint: {}", endpoint)))
}

/// Compute the `X-Ovh-Signature` header value
pub fn sign(
    application_secret: &str,
    consumer_key: &str,
    method: &str,
    url: &str,
    body: &str,
    timestamp: i64,
) -> String {
    let mut hasher = Sha1::new();
    hasher.update(format!(
        "{}+{}+{}+{}+{}+{}",
        application_secret, consumer_key, method, url, body, timestamp
    ));
    format!("$1${:x}", hasher.finalize())
}

/// Signed HTTP client for the OVH API
pub struct OvhClient {
    base_url: String,
    application_key: String,
    application_secret: String,
    consumer_key: String,
    http: reqwest::Client,
    /// Server clock minus local clock, in seconds
    time_delta: OnceCell<i64>,
}

impl fmt::Debug for OvhClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OvhClient")
            .field("base_url", &self.base_url)
            .field("application_key", &self.application_key)
            .field("application_secret", &"<REDACTED>")
            .field("consumer_key", &"<REDACTED>")
            .finish()
    }
}

impl OvhClient {
    /// Create a client from credentials
    ///
    /// Fails with `Error::Config` for an unknown endpoint alias or empty
    /// credentials. No request is made.
    pub fn new(credentials: &OvhCredentials) -> Result<Self> {
        let base_url = resolve_endpoint(&credentials.endpoint)?;

        if credentials.application_key.is_empty()
            || credentials.application_secret.is_empty()
            || credentials.consumer_key.is_empty()
        {
            return Err(Error::config(
                "OVH application key, application secret and consumer key are required",
            ));
        }

        let http = reqwest::Client::builder()
            .timeout(DEFAULT_HTTP_TIMEOUT)
            .build()
            .map_err(|e| Error::config(format!("Failed to build HTTP client: {}", e)))?;

        tracing::debug!(base_url = %base_url, "OVH client created");

        Ok(Self {
            base_url,
            application_key: credentials.application_key.clone(),
            application_secret: credentials.application_secret.clone(),
            consumer_key: credentials.consumer_key.clone(),
            http,
            time_delta: OnceCell::new(),
        })
    }

    /// Signing timestamp: local Unix time shifted to the server clock
    async fn timestamp(&self, cancel: &CancellationToken) -> Result<i64> {
        let delta = self
            .time_delta
            .get_or_try_init(|| async {
                let url = format!("{}/auth/time", self.base_url);
                let response = cancellable(cancel, self.http.get(&url).send()).await??;
                let server_time: i64 = decode(response).await?.as_i64().ok_or_else(|| {
                    Error::transport("Invalid response format: /auth/time is not an integer")
                })?;
                let delta = server_time - chrono::Utc::now().timestamp();
                tracing::debug!(delta, "OVH clock offset computed");
                Ok::<i64, Error>(delta)
            })
            .await?;

        Ok(chrono::Utc::now().timestamp() + *delta)
    }

    async fn call(
        &self,
        cancel: &CancellationToken,
        method: Method,
        path: &str,
        body: Option<&Value>,
    ) -> Result<Value> {
        let url = format!("{}{}", self.base_url, path);
        let body_text = match body {
            Some(body) => serde_json::to_string(body)?,
            None => String::new(),
        };
        let timestamp = self.timestamp(cancel).await?;
        let signature = sign(
            &self.application_secret,
            &self.consumer_key,
            method.as_str(),
            &url,
            &body_text,
            timestamp,
        );

        tracing::debug!(method = %method, path, "OVH API call");

        let mut request = self
            .http
            .request(method, &url)
            .header("Accept", "application/json")
            .header("X-Ovh-Application", &self.application_key)
            .header("X-Ovh-Consumer", &self.consumer_key)
            .header("X-Ovh-Timestamp", timestamp.to_string())
            .header("X-Ovh-Signature", signature);

        if body.is_some() {
            request = request
                .header("Content-Type", "application/json")
                .body(body_text);
        }

        let response = cancellable(cancel, request.send()).await??;
        decode(response).await
    }
}

#[async_trait]
impl Transport for OvhClient {
    async fn get(&self, cancel: &CancellationToken, path: &str) -> Result<Value> {
        self.call(cancel, Method::GET, path, None).await
    }

    async fn post(
        &self,
        cancel: &CancellationToken,
        path: &str,
        body: Option<&Value>,
    ) -> Result<Value> {
        self.call(cancel, Method::POST, path, body).await
    }

    async fn delete(&self, cancel: &CancellationToken, path: &str) -> Result<()> {
        self.call(cancel, Method::DELETE, path, None).await.map(|_| ())
    }
}

/// Await `request` unless `cancel` fires first
async fn cancellable(
    cancel: &CancellationToken,
    request: impl std::future::Future<Output = reqwest::Result<reqwest::Response>>,
) -> Result<Result<reqwest::Response>> {
    tokio::select! {
        biased;
        _ = cancel.cancelled() => Err(Error::Cancelled),
        response = request => Ok(response.map_err(|e| Error::transport(format!("HTTP request failed: {}", e)))),
    }
}

/// Turn a response into JSON, mapping non-2xx statuses to backend errors
async fn decode(response: reqwest::Response) -> Result<Value> {
    let status = response.status();
    let text = response
        .text()
        .await
        .map_err(|e| Error::transport(format!("Failed to read response: {}", e)))?;

    if !status.is_success() {
        // OVH reports failures as {"errorCode": ..., "message": ...}
        let message = serde_json::from_str::<Value>(&text)
            .ok()
            .and_then(|json| json["message"].as_str().map(str::to_string))
            .unwrap_or(text);
        return Err(Error::backend(status.as_u16(), message));
    }

    if text.trim().is_empty() {
        return Ok(Value::Null);
    }

    serde_json::from_str(&text)
        .map_err(|e| Error::transport(format!("Failed to parse response: {}", e)))
}
