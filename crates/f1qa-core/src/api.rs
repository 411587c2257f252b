use std::time::Duration;

use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION, CONTENT_TYPE};
use reqwest::{Client, Method, StatusCode};
use serde::de::DeserializeOwned;
use serde_json::Value;
use tracing::{debug, warn};

use crate::error::ApiError;
use crate::models::{
    AskRequest, AskResponse, EntityListResponse, EntityType, HealthResponse,
    NetworkExploreResponse,
};

pub const DEFAULT_BASE_URL: &str = "http://localhost:8000/api/v1";
pub const DEFAULT_TIMEOUT: Duration = Duration::from_millis(30_000);
pub const DEFAULT_EXPLORE_DEPTH: u32 = 2;

pub const ASK_PATH: &str = "/ask";
pub const HEALTH_PATH: &str = "/health";
pub const ENTITIES_PATH: &str = "/entities";
pub const EXPLORE_PATH: &str = "/network/explore";

/// HTTP client for the Q&A backend.
///
/// Built once at startup and handed to whoever needs it. Cloning is cheap and
/// shares the connection pool, so a spawned request task can own a copy. The
/// only mutable settings are the default headers and the timeout.
#[derive(Clone)]
pub struct ApiClient {
    client: Client,
    base_url: String,
    headers: HeaderMap,
    timeout: Duration,
}

impl ApiClient {
    pub fn new(base_url: &str) -> Self {
        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));

        Self {
            client: Client::new(),
            base_url: base_url.trim_end_matches('/').to_string(),
            headers,
            timeout: DEFAULT_TIMEOUT,
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    pub fn set_timeout(&mut self, timeout: Duration) {
        self.timeout = timeout;
    }

    /// Attach `Authorization: Bearer <token>` to every request, or remove it
    /// when `token` is `None` or empty.
    pub fn set_auth_token(&mut self, token: Option<&str>) -> Result<(), ApiError> {
        match token {
            Some(token) if !token.is_empty() => {
                let value = HeaderValue::from_str(&format!("Bearer {}", token)).map_err(|_| {
                    ApiError::InvalidInput("auth token contains invalid characters".to_string())
                })?;
                self.headers.insert(AUTHORIZATION, value);
            }
            _ => {
                self.headers.remove(AUTHORIZATION);
            }
        }
        Ok(())
    }

    pub fn has_auth_token(&self) -> bool {
        self.headers.contains_key(AUTHORIZATION)
    }

    /// Issue a call against `path` and decode the JSON payload.
    pub async fn send<T: DeserializeOwned>(
        &self,
        path: &str,
        method: Method,
        body: Option<Value>,
    ) -> Result<T, ApiError> {
        self.request(path, method, &[], body).await
    }

    async fn request<T: DeserializeOwned>(
        &self,
        path: &str,
        method: Method,
        query: &[(String, String)],
        body: Option<Value>,
    ) -> Result<T, ApiError> {
        let url = format!("{}{}", self.base_url, path);
        let timeout_ms = self.timeout.as_millis() as u64;
        debug!(%method, %url, "sending request");

        let mut builder = self
            .client
            .request(method, &url)
            .headers(self.headers.clone());
        if !query.is_empty() {
            builder = builder.query(query);
        }
        if let Some(body) = body {
            builder = builder.json(&body);
        }

        let transport = |e: reqwest::Error| {
            if e.is_timeout() {
                ApiError::Timeout(timeout_ms)
            } else {
                ApiError::Network(e.to_string())
            }
        };

        let call = async {
            let response = builder.send().await.map_err(transport)?;
            let status = response.status();

            if !status.is_success() {
                let body = response.json::<Value>().await.ok();
                return Err(ApiError::Http {
                    status: status.as_u16(),
                    detail: error_detail(status, body),
                });
            }

            let bytes = response.bytes().await.map_err(transport)?;
            serde_json::from_slice(&bytes).map_err(|e| ApiError::Decode(e.to_string()))
        };

        // Dropping `call` on expiry aborts the in-flight request.
        match tokio::time::timeout(self.timeout, call).await {
            Ok(result) => result,
            Err(_) => Err(ApiError::Timeout(timeout_ms)),
        }
    }

    /// `POST /ask`, translating status codes into conversation-level errors.
    pub async fn ask_question(&self, question: &str) -> Result<AskResponse, ApiError> {
        let body = serde_json::to_value(AskRequest { question })
            .map_err(|e| ApiError::Decode(e.to_string()))?;

        match self.send(ASK_PATH, Method::POST, Some(body)).await {
            Ok(answer) => Ok(answer),
            Err(err) => {
                warn!(error = %err, "ask_question failed");
                Err(match err {
                    ApiError::Http { status: 400, detail } => ApiError::InvalidInput(detail),
                    ApiError::Http { status: 500, detail } => ApiError::ServerError(detail),
                    ApiError::Network(reason) => ApiError::ConnectionError(reason),
                    other => other,
                })
            }
        }
    }

    /// `GET /health`. Never retried; every failure is `HealthCheckFailed`.
    pub async fn check_health(&self) -> Result<HealthResponse, ApiError> {
        self.send(HEALTH_PATH, Method::GET, None)
            .await
            .map_err(|err| {
                warn!(error = %err, "check_health failed");
                ApiError::HealthCheckFailed(err.to_string())
            })
    }

    /// `GET /entities/{type}?<filters>`.
    pub async fn get_entities(
        &self,
        entity_type: EntityType,
        filters: &[(&str, &str)],
    ) -> Result<EntityListResponse, ApiError> {
        let path = format!("{}/{}", ENTITIES_PATH, entity_type.as_str());
        let query: Vec<(String, String)> = filters
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();

        self.request(&path, Method::GET, &query, None)
            .await
            .map_err(|err| {
                warn!(error = %err, entity_type = entity_type.as_str(), "get_entities failed");
                ApiError::EntitiesUnavailable {
                    entity_type: entity_type.as_str().to_string(),
                    reason: err.to_string(),
                }
            })
    }

    /// `GET /network/explore/{node_id}?depth=<n>`.
    pub async fn explore_network(
        &self,
        node_id: &str,
        depth: u32,
    ) -> Result<NetworkExploreResponse, ApiError> {
        let path = format!("{}/{}", EXPLORE_PATH, node_id);
        let query = vec![("depth".to_string(), depth.to_string())];

        self.request(&path, Method::GET, &query, None)
            .await
            .map_err(|err| {
                warn!(error = %err, node_id, "explore_network failed");
                ApiError::ExploreFailed(err.to_string())
            })
    }

    pub async fn test_connection(&self) -> bool {
        self.check_health().await.is_ok()
    }
}

/// Server-provided `detail`, else `HTTP <code>: <reason>`.
fn error_detail(status: StatusCode, body: Option<Value>) -> String {
    match body.as_ref().and_then(|b| b.get("detail")) {
        Some(Value::String(detail)) => detail.clone(),
        Some(Value::Null) | None => format!(
            "HTTP {}: {}",
            status.as_u16(),
            status.canonical_reason().unwrap_or("Unknown")
        ),
        Some(other) => other.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_base_url_trailing_slash_trimmed() {
        let api = ApiClient::new("http://localhost:8000/api/v1/");
        assert_eq!(api.base_url(), "http://localhost:8000/api/v1");
        assert_eq!(api.timeout(), DEFAULT_TIMEOUT);
    }

    #[test]
    fn test_auth_token_set_and_cleared() {
        let mut api = ApiClient::new(DEFAULT_BASE_URL);
        api.set_auth_token(Some("abc123")).unwrap();
        assert!(api.has_auth_token());
        api.set_auth_token(None).unwrap();
        assert!(!api.has_auth_token());
        api.set_auth_token(Some("bad\ntoken")).unwrap_err();
    }

    #[test]
    fn test_error_detail_prefers_server_detail() {
        let detail = error_detail(StatusCode::BAD_REQUEST, Some(json!({"detail": "too short"})));
        assert_eq!(detail, "too short");

        let fallback = error_detail(StatusCode::INTERNAL_SERVER_ERROR, None);
        assert_eq!(fallback, "HTTP 500: Internal Server Error");
    }
}
