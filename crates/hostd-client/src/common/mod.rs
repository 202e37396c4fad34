//! Common utilities for the hostd API client
//!
//! Provides the transport wrapper shared by every resource call: URL
//! building, response envelope decoding and ETag handling.

pub mod query;

use crate::error::HostError;
use crate::models::{OperationInfo, Response, ResponseType};
use reqwest::{Client, Method, StatusCode};
use serde::de::DeserializeOwned;
use tracing::debug;

/// API version prefix every resource path lives under
pub const API_PREFIX: &str = "/1.0";

/// HTTP client wrapper speaking the hostd response envelope
#[derive(Debug, Clone)]
pub struct HttpClient {
    client: Client,
    base_url: String,
}

impl HttpClient {
    /// Create a new HTTP client wrapper
    pub fn new(client: Client, base_url: String) -> Self {
        Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }

    /// Get the base URL
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Build a full URL from a path relative to the API prefix
    pub fn build_url(&self, path: &str) -> String {
        if path.starts_with("http") {
            path.to_string()
        } else if path.starts_with(API_PREFIX) {
            format!("{}{}", self.base_url, path)
        } else {
            format!("{}{}{}", self.base_url, API_PREFIX, path)
        }
    }

    /// Send a request and decode the envelope
    ///
    /// Returns the envelope and the ETag header of the reply (empty when the
    /// host sent none). A non-empty `etag` is submitted as `If-Match`.
    pub async fn query(
        &self,
        method: Method,
        path: &str,
        body: Option<&serde_json::Value>,
        etag: &str,
    ) -> Result<(Response, String), HostError> {
        let url = self.build_url(path);
        match body {
            Some(body) => debug!("{} {} with body: {}", method, url, body),
            None => debug!("{} {}", method, url),
        }

        let mut request = self
            .client
            .request(method.clone(), &url)
            .header("Accept", "application/json");
        if let Some(body) = body {
            request = request.json(body);
        }
        if !etag.is_empty() {
            request = request.header("If-Match", etag);
        }

        let response = request.send().await.map_err(HostError::Http)?;
        let status = response.status();
        let reply_etag = response
            .headers()
            .get(reqwest::header::ETAG)
            .and_then(|v| v.to_str().ok())
            .unwrap_or_default()
            .to_string();

        let text = response.text().await?;
        let envelope: Response = match serde_json::from_str(&text) {
            Ok(envelope) => envelope,
            Err(e) => {
                if !status.is_success() {
                    return Err(classify(
                        status.as_u16(),
                        format!("{} {} failed: {} - {}", method, path, status, text),
                    ));
                }
                return Err(HostError::UnexpectedResponse(format!(
                    "error decoding response body: {} - Response (first 500 chars): {}",
                    e,
                    text.chars().take(500).collect::<String>()
                )));
            }
        };

        if envelope.response_type == ResponseType::Error || !status.is_success() {
            let code = if envelope.error_code != 0 {
                envelope.error_code
            } else {
                status.as_u16()
            };
            let message = if envelope.error.is_empty() {
                format!("{} {} failed: {}", method, path, status)
            } else {
                envelope.error.clone()
            };
            return Err(classify(code, message));
        }

        Ok((envelope, reply_etag))
    }

    /// Make a GET request expecting a sync reply; returns metadata and ETag
    pub async fn get<T: DeserializeOwned>(&self, path: &str) -> Result<(T, String), HostError> {
        let (envelope, etag) = self.query(Method::GET, path, None, "").await?;
        Ok((sync_metadata(envelope, path)?, etag))
    }

    /// Make a PUT request guarded by `etag`
    pub async fn put(
        &self,
        path: &str,
        body: &serde_json::Value,
        etag: &str,
    ) -> Result<(), HostError> {
        let (envelope, _) = self.query(Method::PUT, path, Some(body), etag).await?;
        expect_sync(&envelope, path)
    }

    /// Make a POST request expecting a sync reply
    pub async fn post<T: DeserializeOwned>(
        &self,
        path: &str,
        body: &serde_json::Value,
    ) -> Result<T, HostError> {
        let (envelope, _) = self.query(Method::POST, path, Some(body), "").await?;
        sync_metadata(envelope, path)
    }

    /// Make a POST request that starts a background operation
    pub async fn post_operation(
        &self,
        path: &str,
        body: &serde_json::Value,
    ) -> Result<OperationInfo, HostError> {
        let (envelope, _) = self.query(Method::POST, path, Some(body), "").await?;
        if envelope.response_type != ResponseType::Async {
            return Err(HostError::UnexpectedResponse(format!(
                "POST {} returned a {:?} response where an operation was expected",
                path, envelope.response_type
            )));
        }
        let mut op: OperationInfo = serde_json::from_value(envelope.metadata)?;
        if op.id.is_empty() {
            op.id = query::last_segment(&envelope.operation).to_string();
        }
        Ok(op)
    }

    /// Make a DELETE request expecting a sync reply
    pub async fn delete(&self, path: &str) -> Result<(), HostError> {
        let (envelope, _) = self.query(Method::DELETE, path, None, "").await?;
        expect_sync(&envelope, path)
    }
}

fn classify(code: u16, message: String) -> HostError {
    match StatusCode::from_u16(code) {
        Ok(StatusCode::PRECONDITION_FAILED) => HostError::Conflict(message),
        Ok(StatusCode::NOT_FOUND) => HostError::NotFound(message),
        _ => HostError::Api(message),
    }
}

fn expect_sync(envelope: &Response, path: &str) -> Result<(), HostError> {
    if envelope.response_type != ResponseType::Sync {
        return Err(HostError::UnexpectedResponse(format!(
            "{} returned a {:?} response where a sync reply was expected",
            path, envelope.response_type
        )));
    }
    Ok(())
}

fn sync_metadata<T: DeserializeOwned>(envelope: Response, path: &str) -> Result<T, HostError> {
    expect_sync(&envelope, path)?;
    serde_json::from_value(envelope.metadata).map_err(HostError::Serialization)
}
