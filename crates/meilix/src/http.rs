//! 📡 The HTTP layer: one `reqwest::Client`, one base URL, a handful of verbs.
//!
//! 🧠 Every request goes through [`HttpRequests::send`], which is the single place that
//! turns transport failures into [`MeilixError::Communication`] and non-2xx answers into
//! [`MeilixError::Api`]. Bodies are serialized by us, not by reqwest, so the same bytes
//! can be gzipped on the way out when asked.

use std::io::Write;
use std::time::Duration;

use flate2::Compression;
use flate2::write::GzEncoder;
use reqwest::Method;
use reqwest::header::{
    AUTHORIZATION, CONTENT_ENCODING, CONTENT_TYPE, HeaderMap, HeaderName, HeaderValue,
};
use serde::Serialize;
use serde::de::DeserializeOwned;
use tracing::{debug, trace};

use crate::app_config::ClientConfig;
use crate::errors::{ApiError, MeilixError, Result};

pub(crate) const JSON: &str = "application/json";
pub(crate) const NDJSON: &str = "application/x-ndjson";
pub(crate) const CSV: &str = "text/csv";

/// 📦 A request body that has already been rendered to bytes.
#[derive(Debug)]
pub(crate) struct Payload {
    pub(crate) bytes: Vec<u8>,
    pub(crate) content_type: &'static str,
    pub(crate) compress: bool,
}

impl Payload {
    pub(crate) fn json<B: Serialize + ?Sized>(body: &B, compress: bool) -> Result<Self> {
        Ok(Payload {
            bytes: serde_json::to_vec(body)?,
            content_type: JSON,
            compress,
        })
    }

    pub(crate) fn raw(bytes: Vec<u8>, content_type: &'static str, compress: bool) -> Self {
        Payload {
            bytes,
            content_type,
            compress,
        }
    }
}

/// 🔌 Shared transport. Cloning a `reqwest::Client` clones a handle to the same pool.
#[derive(Debug, Clone)]
pub(crate) struct HttpRequests {
    client: reqwest::Client,
    base_url: String,
}

impl HttpRequests {
    /// 🚀 Build the client with auth, user agent and custom headers baked in as defaults.
    pub(crate) fn new(config: &ClientConfig) -> Result<Self> {
        let mut headers = HeaderMap::new();
        if let Some(api_key) = &config.api_key {
            let bearer = HeaderValue::from_str(&format!("Bearer {api_key}")).map_err(|_| {
                MeilixError::Validation("api key contains invalid header characters".to_string())
            })?;
            headers.insert(AUTHORIZATION, bearer);
        }
        for (name, value) in &config.custom_headers {
            let header_name = HeaderName::from_bytes(name.as_bytes()).map_err(|_| {
                MeilixError::Validation(format!("invalid custom header name '{name}'"))
            })?;
            let header_value = HeaderValue::from_str(value).map_err(|_| {
                MeilixError::Validation(format!("invalid value for custom header '{name}'"))
            })?;
            headers.insert(header_name, header_value);
        }

        let mut builder = reqwest::Client::builder()
            .connect_timeout(Duration::from_secs(10))
            .user_agent(user_agent())
            .default_headers(headers);
        if let Some(timeout_secs) = config.timeout_secs {
            builder = builder.timeout(Duration::from_secs(timeout_secs));
        }
        let client = builder.build().map_err(MeilixError::Communication)?;

        Ok(HttpRequests {
            client,
            // 📡 trim_end_matches('/'): one slash of difference, infinite suffering of difference
            base_url: config.url.trim_end_matches('/').to_string(),
        })
    }

    pub(crate) fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path.trim_start_matches('/'))
    }

    /// 📡 Fire one request. 2xx comes back as the response, everything else as an error.
    pub(crate) async fn send(
        &self,
        method: Method,
        path: &str,
        payload: Option<Payload>,
    ) -> Result<reqwest::Response> {
        let url = self.url(path);
        debug!("📡 {} {}", method, url);
        let mut request = self.client.request(method, &url);

        if let Some(payload) = payload {
            request = request.header(CONTENT_TYPE, payload.content_type);
            let bytes = if payload.compress {
                request = request.header(CONTENT_ENCODING, "gzip");
                gzip(&payload.bytes)?
            } else {
                payload.bytes
            };
            trace!("📦 request body is {} bytes", bytes.len());
            request = request.body(bytes);
        }

        let response = request.send().await.map_err(MeilixError::Communication)?;
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        let body = response.text().await.map_err(MeilixError::Communication)?;
        debug!("🚫 {} answered {}: {}", url, status, body);
        Err(MeilixError::Api(ApiError::from_response(status.as_u16(), body)))
    }

    pub(crate) async fn get<R: DeserializeOwned>(&self, path: &str) -> Result<R> {
        let response = self.send(Method::GET, path, None).await?;
        parse_json(response).await
    }

    /// 📮 Send without a body and parse the JSON answer.
    pub(crate) async fn send_empty<R: DeserializeOwned>(&self, method: Method, path: &str) -> Result<R> {
        let response = self.send(method, path, None).await?;
        parse_json(response).await
    }

    pub(crate) async fn send_json<B, R>(
        &self,
        method: Method,
        path: &str,
        body: &B,
        compress: bool,
    ) -> Result<R>
    where
        B: Serialize + ?Sized,
        R: DeserializeOwned,
    {
        let payload = Payload::json(body, compress)?;
        let response = self.send(method, path, Some(payload)).await?;
        parse_json(response).await
    }

    pub(crate) async fn send_raw<R: DeserializeOwned>(
        &self,
        method: Method,
        path: &str,
        payload: Payload,
    ) -> Result<R> {
        let response = self.send(method, path, Some(payload)).await?;
        parse_json(response).await
    }
}

async fn parse_json<R: DeserializeOwned>(response: reqwest::Response) -> Result<R> {
    let bytes = response.bytes().await.map_err(MeilixError::Communication)?;
    Ok(serde_json::from_slice(&bytes)?)
}

fn gzip(bytes: &[u8]) -> Result<Vec<u8>> {
    let mut encoder = GzEncoder::new(Vec::with_capacity(bytes.len() / 4), Compression::default());
    encoder.write_all(bytes)?;
    Ok(encoder.finish()?)
}

pub(crate) fn user_agent() -> String {
    format!("Meilix Rust client (v{})", crate::VERSION)
}

/// 🔗 `path?k=v&k=v`, or just `path` when there is nothing to ask.
pub(crate) fn with_query(path: &str, pairs: &[(&str, String)]) -> String {
    if pairs.is_empty() {
        return path.to_string();
    }
    let query = pairs
        .iter()
        .map(|(key, value)| format!("{}={}", key, urlencoding::encode(value)))
        .collect::<Vec<_>>()
        .join("&");
    format!("{path}?{query}")
}
