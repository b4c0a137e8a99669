//! REST client.
//!
//! Every call is a JSON request against `api_base`. When a credential is
//! held it is sent as a bearer token. Non-success responses surface as
//! [`ClientError::Http`] carrying the status, the body's `message` field
//! and the decoded body.

mod endpoints;
pub mod models;

use std::sync::Arc;

use parking_lot::RwLock;
use reqwest::header::CONTENT_TYPE;
use reqwest::{Method, StatusCode};
use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::{debug, warn};

use crate::config::ClientConfig;
use crate::error::{ClientError, Result};

pub use models::*;

/// Credential shared between the auth store, the REST client and socket
/// URL construction.
#[derive(Debug, Clone, Default)]
pub struct SharedToken(Arc<RwLock<Option<String>>>);

impl SharedToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self) -> Option<String> {
        self.0.read().clone()
    }

    pub fn set(&self, token: Option<String>) {
        *self.0.write() = token;
    }

    pub fn is_set(&self) -> bool {
        self.0.read().is_some()
    }
}

#[derive(Debug, Clone)]
pub struct ApiClient {
    http: reqwest::Client,
    base: String,
    token: SharedToken,
}

impl ApiClient {
    pub fn new(config: &ClientConfig, token: SharedToken) -> Result<Self> {
        let http = reqwest::Client::builder().build()?;
        Ok(Self {
            http,
            base: config.api_base.trim_end_matches('/').to_string(),
            token,
        })
    }

    pub fn token(&self) -> &SharedToken {
        &self.token
    }

    pub fn url(&self, path: &str) -> String {
        format!("{}{}", self.base, path)
    }

    /// Send a request and return the decoded body.
    pub async fn request<B>(
        &self,
        method: Method,
        path: &str,
        body: Option<&B>,
    ) -> Result<serde_json::Value>
    where
        B: Serialize + ?Sized,
    {
        let url = self.url(path);
        debug!(%method, %url, "api request");

        let mut req = self
            .http
            .request(method.clone(), &url)
            .header(CONTENT_TYPE, "application/json");
        if let Some(token) = self.token.get() {
            req = req.bearer_auth(token);
        }
        if let Some(body) = body {
            req = req.json(body);
        }

        let res = req.send().await?;
        let status = res.status();
        let text = res.text().await?;
        let data = decode_body(&text);

        if !status.is_success() {
            let err = http_error(status, data);
            warn!(%method, %url, status = status.as_u16(), error = %err, "api request failed");
            return Err(err);
        }
        Ok(data)
    }

    /// Like [`request`](Self::request), decoding the body into `T`.
    pub async fn request_as<T, B>(&self, method: Method, path: &str, body: Option<&B>) -> Result<T>
    where
        T: DeserializeOwned,
        B: Serialize + ?Sized,
    {
        let data = self.request(method, path, body).await?;
        Ok(serde_json::from_value(data)?)
    }

    async fn get<T: DeserializeOwned>(&self, path: &str) -> Result<T> {
        self.request_as(Method::GET, path, None::<&()>).await
    }

    async fn post<T, B>(&self, path: &str, body: Option<&B>) -> Result<T>
    where
        T: DeserializeOwned,
        B: Serialize + ?Sized,
    {
        self.request_as(Method::POST, path, body).await
    }

    async fn put<T, B>(&self, path: &str, body: &B) -> Result<T>
    where
        T: DeserializeOwned,
        B: Serialize + ?Sized,
    {
        self.request_as(Method::PUT, path, Some(body)).await
    }
}

/// Empty → `null`; invalid JSON → the raw text as a string.
pub fn decode_body(text: &str) -> serde_json::Value {
    if text.is_empty() {
        return serde_json::Value::Null;
    }
    serde_json::from_str(text).unwrap_or_else(|_| serde_json::Value::String(text.to_string()))
}

/// Build the error for a non-success response.
pub fn http_error(status: StatusCode, data: serde_json::Value) -> ClientError {
    let message = data
        .get("message")
        .and_then(|m| m.as_str())
        .map(str::to_string)
        .or_else(|| status.canonical_reason().map(str::to_string))
        .unwrap_or_else(|| "Request failed".to_string());
    ClientError::Http {
        status: status.as_u16(),
        message,
        data,
    }
}
