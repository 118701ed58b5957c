//! HTTP binding for a remote tool backend.
//!
//! Endpoints:
//! - `POST /v1/functions/execute` with `{app_name, function_name, parameters}`
//! - `GET /v1/apps`
//! - `GET /v1/functions?app_name=...`
//! - `POST /v1/functions/search` with `{query, limit}`

use crate::{
    AppDescriptor, BackendConfig, CatalogError, FunctionDescriptor, ToolCall, ToolCatalog,
    ToolInvoker,
};
use async_trait::async_trait;
use reqwest::{Client, ClientBuilder, RequestBuilder};
use serde::de::DeserializeOwned;
use serde_json::{json, Value};
use toolflow_core::{InvocationError, InvocationErrorKind};
use tracing::{debug, warn};

const API_KEY_HEADER: &str = "X-API-KEY";

/// Tool backend reached over HTTP.
#[derive(Clone)]
pub struct HttpToolBackend {
    /// HTTP client
    client: Client,

    /// Connection settings
    config: BackendConfig,
}

impl HttpToolBackend {
    /// Create a new backend client.
    pub fn new(config: BackendConfig) -> Self {
        Self {
            client: ClientBuilder::new()
                .timeout(config.timeout)
                .build()
                .unwrap_or_default(),
            config,
        }
    }

    /// Connection settings.
    pub fn config(&self) -> &BackendConfig {
        &self.config
    }

    fn authorize(&self, request: RequestBuilder) -> RequestBuilder {
        match &self.config.api_key {
            Some(key) => request.header(API_KEY_HEADER, key),
            None => request,
        }
    }

    async fn fetch<T: DeserializeOwned>(&self, request: RequestBuilder) -> Result<T, CatalogError> {
        let response = self
            .authorize(request)
            .send()
            .await
            .map_err(|e| CatalogError::Unavailable(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(CatalogError::Status {
                status: status.as_u16(),
                body,
            });
        }

        response
            .json()
            .await
            .map_err(|e| CatalogError::Decode(e.to_string()))
    }
}

#[async_trait]
impl ToolInvoker for HttpToolBackend {
    async fn invoke(
        &self,
        app: &str,
        function: &str,
        parameters: Value,
    ) -> Result<Value, InvocationError> {
        let url = self.config.endpoint("/v1/functions/execute");
        let call = ToolCall::new(app, function, parameters);

        debug!(app, function, "POST {}", url);

        let response = self
            .authorize(self.client.post(&url).json(&call))
            .send()
            .await
            .map_err(|e| InvocationError::transport(app, function, describe_transport(&e)))?;

        let status = response.status().as_u16();
        let text = response
            .text()
            .await
            .map_err(|e| InvocationError::transport(app, function, describe_transport(&e)))?;

        if let Some(kind) = classify_status(status) {
            warn!(app, function, status, "tool call rejected");
            return Err(InvocationError::new(
                app,
                function,
                kind,
                format!("status {}: {}", status, error_message(&text)),
            ));
        }

        let body = if text.trim().is_empty() {
            Value::Null
        } else {
            serde_json::from_str(&text).map_err(|e| {
                InvocationError::remote_failure(app, function, format!("invalid JSON response: {}", e))
            })?
        };

        unwrap_envelope(app, function, body)
    }
}

#[async_trait]
impl ToolCatalog for HttpToolBackend {
    async fn list_apps(&self) -> Result<Vec<AppDescriptor>, CatalogError> {
        self.fetch(self.client.get(self.config.endpoint("/v1/apps")))
            .await
    }

    async fn list_functions(&self, app: &str) -> Result<Vec<FunctionDescriptor>, CatalogError> {
        let request = self
            .client
            .get(self.config.endpoint("/v1/functions"))
            .query(&[("app_name", app)]);

        let mut functions: Vec<FunctionDescriptor> = self.fetch(request).await?;
        for function in &mut functions {
            if function.app_name.is_empty() {
                function.app_name = app.to_string();
            }
        }
        Ok(functions)
    }

    async fn search_functions(
        &self,
        query: &str,
        limit: usize,
    ) -> Result<Vec<FunctionDescriptor>, CatalogError> {
        let request = self
            .client
            .post(self.config.endpoint("/v1/functions/search"))
            .json(&json!({ "query": query, "limit": limit }));

        self.fetch(request).await
    }
}

/// Map an HTTP status to an invocation error kind; `None` for success.
pub fn classify_status(status: u16) -> Option<InvocationErrorKind> {
    match status {
        200..=299 => None,
        404 => Some(InvocationErrorKind::NotFound),
        400 | 422 => Some(InvocationErrorKind::Validation),
        401 | 403 | 408 | 429 => Some(InvocationErrorKind::Transport),
        500..=599 => Some(InvocationErrorKind::Transport),
        _ => Some(InvocationErrorKind::RemoteFailure),
    }
}

/// Unwrap a `{success, data, error}` result envelope.
///
/// Bodies without a boolean `success` field are returned as-is.
pub fn unwrap_envelope(app: &str, function: &str, body: Value) -> Result<Value, InvocationError> {
    let mut map = match body {
        Value::Object(map) => map,
        other => return Ok(other),
    };

    match map.get("success") {
        Some(Value::Bool(true)) => Ok(map.remove("data").unwrap_or(Value::Null)),
        Some(Value::Bool(false)) => {
            let cause = match map.remove("error") {
                Some(Value::String(message)) => message,
                Some(Value::Null) | None => "tool reported failure".to_string(),
                Some(other) => other.to_string(),
            };
            Err(InvocationError::remote_failure(app, function, cause))
        }
        _ => Ok(Value::Object(map)),
    }
}

/// Pull a readable message out of an error body.
fn error_message(text: &str) -> String {
    if let Ok(Value::Object(map)) = serde_json::from_str::<Value>(text) {
        for key in ["detail", "message", "error"] {
            match map.get(key) {
                Some(Value::String(message)) => return message.clone(),
                Some(Value::Null) | None => continue,
                Some(other) => return other.to_string(),
            }
        }
    }

    let text = text.trim();
    if text.is_empty() {
        "empty response".to_string()
    } else {
        text.chars().take(500).collect()
    }
}

fn describe_transport(error: &reqwest::Error) -> String {
    if error.is_timeout() {
        format!("request timed out: {}", error)
    } else if error.is_connect() {
        format!("connection failed: {}", error)
    } else {
        error.to_string()
    }
}
