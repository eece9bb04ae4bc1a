//! Remote gateway: one HTTP call per request against the Attio REST API.

use async_trait::async_trait;
use attio_core::ToolError;
use reqwest::Method;
use serde_json::{Map, Value};

use crate::util::{GatewayConfig, client};

/// A single call to the Attio API, relative to the configured base URL.
#[derive(Debug, Clone, PartialEq)]
pub struct ApiRequest {
    pub method: Method,
    pub path: String,
    pub query: Vec<(String, String)>,
    pub body: Option<Value>,
}

impl ApiRequest {
    pub fn new(method: Method, path: impl Into<String>) -> Self {
        Self {
            method,
            path: path.into(),
            query: Vec::new(),
            body: None,
        }
    }

    pub fn with_query(mut self, query: &[(String, String)]) -> Self {
        self.query = query.to_vec();
        self
    }

    pub fn with_body(mut self, body: Value) -> Self {
        self.body = Some(body);
        self
    }
}

/// Executes API requests. Implementations decode 2xx bodies to JSON (204
/// and empty bodies become `{}`) and map every other status to
/// [`ToolError::Remote`].
#[async_trait]
pub trait Gateway: Send + Sync {
    async fn send(&self, request: ApiRequest) -> Result<Value, ToolError>;

    async fn get(&self, path: &str, query: &[(String, String)]) -> Result<Value, ToolError> {
        self.send(ApiRequest::new(Method::GET, path).with_query(query))
            .await
    }

    async fn post(&self, path: &str, body: Value) -> Result<Value, ToolError> {
        self.send(ApiRequest::new(Method::POST, path).with_body(body))
            .await
    }

    async fn put(
        &self,
        path: &str,
        body: Value,
        query: &[(String, String)],
    ) -> Result<Value, ToolError> {
        self.send(
            ApiRequest::new(Method::PUT, path)
                .with_body(body)
                .with_query(query),
        )
        .await
    }

    async fn patch(&self, path: &str, body: Value) -> Result<Value, ToolError> {
        self.send(ApiRequest::new(Method::PATCH, path).with_body(body))
            .await
    }

    async fn delete(&self, path: &str) -> Result<Value, ToolError> {
        self.send(ApiRequest::new(Method::DELETE, path)).await
    }
}

pub struct HttpGateway {
    config: GatewayConfig,
    http: reqwest::Client,
}

impl HttpGateway {
    pub fn new(config: GatewayConfig) -> Result<Self, ToolError> {
        let http = client(config.timeout).map_err(|e| {
            ToolError::unexpected(format!("Failed to build HTTP client: {e}"))
        })?;
        Ok(Self { config, http })
    }
}

#[async_trait]
impl Gateway for HttpGateway {
    async fn send(&self, request: ApiRequest) -> Result<Value, ToolError> {
        let api_key = self.config.api_key.as_deref().ok_or_else(|| {
            ToolError::unexpected("ATTIO_API_KEY environment variable not set")
        })?;

        let mut url = reqwest::Url::parse(&format!(
            "{}{}",
            self.config.api_url.trim_end_matches('/'),
            request.path
        ))
        .map_err(|e| ToolError::unexpected(format!("Invalid API URL/path: {e}")))?;
        if !request.query.is_empty() {
            let mut qp = url.query_pairs_mut();
            for (k, v) in &request.query {
                qp.append_pair(k, v);
            }
        }

        let mut builder = self
            .http
            .request(request.method.clone(), url)
            .bearer_auth(api_key);
        if let Some(body) = &request.body {
            builder = builder.json(body);
        }

        let response = builder.send().await.map_err(|e| {
            ToolError::unexpected(format!(
                "Failed to reach Attio API at {}: {e}",
                self.config.api_url
            ))
        })?;
        let status = response.status().as_u16();
        let bytes = response.bytes().await.map_err(|e| {
            ToolError::unexpected(format!("Failed to read Attio API response body: {e}"))
        })?;

        tracing::debug!(
            method = %request.method,
            path = %request.path,
            status,
            "attio api call"
        );
        decode_response(status, &bytes)
    }
}

/// Maps a raw HTTP response onto the gateway contract.
pub fn decode_response(status: u16, bytes: &[u8]) -> Result<Value, ToolError> {
    if !(200..=299).contains(&status) {
        return Err(ToolError::Remote {
            status,
            message: remote_error_message(bytes),
        });
    }
    if status == 204 || bytes.iter().all(u8::is_ascii_whitespace) {
        return Ok(Value::Object(Map::new()));
    }
    serde_json::from_slice(bytes).map_err(|e| {
        ToolError::unexpected(format!("Failed to decode Attio API response: {e}"))
    })
}

/// Error text from a failed response: the body's `message` (or `error`),
/// followed by any `validation_errors` as `path.to.field: message` pairs.
pub fn remote_error_message(bytes: &[u8]) -> String {
    let raw_text = String::from_utf8_lossy(bytes).to_string();
    let Ok(Value::Object(body)) = serde_json::from_slice::<Value>(bytes) else {
        return raw_text;
    };

    let message = ["message", "error"]
        .iter()
        .filter_map(|key| body.get(*key))
        .find_map(|value| match value {
            Value::String(text) if !text.is_empty() => Some(text.clone()),
            Value::Null | Value::String(_) => None,
            other => Some(other.to_string()),
        })
        .unwrap_or(raw_text);

    let Some(validation_errors) = body.get("validation_errors").and_then(Value::as_array) else {
        return message;
    };
    let details = validation_errors
        .iter()
        .map(|error| {
            let path = error
                .get("path")
                .and_then(Value::as_array)
                .map(|segments| {
                    segments
                        .iter()
                        .map(attio_core::values::scalar_text)
                        .collect::<Vec<_>>()
                        .join(".")
                })
                .unwrap_or_default();
            let detail = error
                .get("message")
                .map(attio_core::values::scalar_text)
                .unwrap_or_default();
            format!("{path}: {detail}")
        })
        .collect::<Vec<_>>()
        .join("; ");
    format!("{message} [{details}]")
}
