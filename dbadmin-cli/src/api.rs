///! HTTP transport for the database-administration API

use std::time::Duration;

use async_trait::async_trait;
use dbadmin_common::ApiError;
use serde_json::Value;
use tracing::debug;

/// Default mount point of the dbadmin module inside the ERP backend
pub const DEFAULT_BASE_PATH: &str = "/api/v1/dbadmin";

/// Request method used by mutations
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Method {
    Get,
    Post,
    Delete,
}

impl Method {
    pub fn as_str(&self) -> &'static str {
        match self {
            Method::Get => "GET",
            Method::Post => "POST",
            Method::Delete => "DELETE",
        }
    }
}

/// The REST collaborator every panel talks to.
///
/// Paths are relative to the API base path. JSON calls return the raw
/// response body; `Value::Null` stands for an empty body.
#[async_trait]
pub trait Transport: Send + Sync {
    async fn get_json(&self, path: &str) -> Result<Value, ApiError>;

    async fn send_json(
        &self,
        method: Method,
        path: &str,
        body: Option<Value>,
    ) -> Result<Value, ApiError>;

    async fn get_bytes(&self, path: &str) -> Result<Vec<u8>, ApiError>;
}

/// Extract `data` from a `{ "data": T }` envelope
pub fn unwrap_envelope(body: Value) -> Result<Value, ApiError> {
    match body {
        Value::Object(mut map) => map
            .remove("data")
            .ok_or_else(|| ApiError::Decode("response has no `data` field".to_string())),
        Value::Null => Err(ApiError::Decode("empty response body".to_string())),
        _ => Err(ApiError::Decode("response is not a JSON object".to_string())),
    }
}

/// Percent-encode a single path segment (ids, table names)
pub fn segment(value: &str) -> String {
    urlencoding::encode(value).into_owned()
}

pub struct ApiClient {
    base_url: String,
    client: reqwest::Client,
    token: Option<String>,
}

impl ApiClient {
    pub fn new(server: &str, base_path: &str, timeout: Duration) -> Result<Self, ApiError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| ApiError::Transport(e.to_string()))?;

        Ok(Self {
            base_url: format!(
                "{}/{}",
                server.trim_end_matches('/'),
                base_path.trim_matches('/')
            )
            .trim_end_matches('/')
            .to_string(),
            client,
            token: None,
        })
    }

    /// Attach a bearer token to every request
    pub fn with_token(mut self, token: Option<String>) -> Self {
        self.token = token.filter(|t| !t.is_empty());
        self
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Build request with authentication header
    fn build_request(&self, method: reqwest::Method, path: &str) -> reqwest::RequestBuilder {
        let url = format!("{}{}", self.base_url, path);
        let mut request = self.client.request(method, &url);

        if let Some(token) = &self.token {
            request = request.header("Authorization", format!("Bearer {}", token));
        }

        request
    }

    async fn execute(&self, request: reqwest::RequestBuilder) -> Result<reqwest::Response, ApiError> {
        let response = request
            .send()
            .await
            .map_err(|e| ApiError::Transport(e.to_string()))?;

        if !response.status().is_success() {
            let status = response.status().as_u16();
            let error_text = response.text().await.unwrap_or_default();
            return Err(ApiError::from_response(status, &error_text));
        }

        Ok(response)
    }

    async fn read_json(response: reqwest::Response) -> Result<Value, ApiError> {
        let bytes = response
            .bytes()
            .await
            .map_err(|e| ApiError::Transport(e.to_string()))?;

        if bytes.iter().all(|b| b.is_ascii_whitespace()) {
            return Ok(Value::Null);
        }

        serde_json::from_slice(&bytes).map_err(|e| ApiError::Decode(e.to_string()))
    }
}

#[async_trait]
impl Transport for ApiClient {
    async fn get_json(&self, path: &str) -> Result<Value, ApiError> {
        debug!(method = "GET", path, "api request");
        let response = self
            .execute(self.build_request(reqwest::Method::GET, path))
            .await?;
        Self::read_json(response).await
    }

    async fn send_json(
        &self,
        method: Method,
        path: &str,
        body: Option<Value>,
    ) -> Result<Value, ApiError> {
        debug!(method = method.as_str(), path, "api request");
        let method = match method {
            Method::Get => reqwest::Method::GET,
            Method::Post => reqwest::Method::POST,
            Method::Delete => reqwest::Method::DELETE,
        };

        let mut request = self.build_request(method, path);
        if let Some(body) = &body {
            request = request.json(body);
        }

        let response = self.execute(request).await?;
        Self::read_json(response).await
    }

    async fn get_bytes(&self, path: &str) -> Result<Vec<u8>, ApiError> {
        debug!(method = "GET", path, "api download");
        let response = self
            .execute(self.build_request(reqwest::Method::GET, path))
            .await?;

        let bytes = response
            .bytes()
            .await
            .map_err(|e| ApiError::Transport(e.to_string()))?;
        Ok(bytes.to_vec())
    }
}
