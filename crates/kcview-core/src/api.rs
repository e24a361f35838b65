//! Backend HTTP client.
//!
//! The view only ever issues `GET` requests, optionally carrying a bearer
//! token. Failures are split into HTTP status failures (the server answered
//! with a non-success code) and transport failures (no usable answer).

use std::time::Duration;

use async_trait::async_trait;
use thiserror::Error;

/// Per-request settings.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RequestConfig {
    pub headers: Vec<(String, String)>,
}

impl RequestConfig {
    /// Builds a config that carries `Authorization: Bearer <token>` only when a token is present.
    pub fn bearer(token: Option<&str>) -> Self {
        match token {
            Some(token) => Self {
                headers: vec![("Authorization".to_string(), format!("Bearer {token}"))],
            },
            None => Self::default(),
        }
    }

    /// Looks up a header value by case-insensitive name.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(key, _)| key.eq_ignore_ascii_case(name))
            .map(|(_, value)| value.as_str())
    }
}

/// A successful response; `data` is the body as text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApiResponse {
    pub status: u16,
    pub data: String,
}

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ApiError {
    /// The server answered with a non-success status.
    #[error("Request failed with status code {status}")]
    Status { status: u16, body: String },

    /// Connection, TLS, timeout or body decoding failure.
    #[error("{0}")]
    Transport(String),
}

impl ApiError {
    /// HTTP status carried by the error, if the server answered at all.
    pub fn status(&self) -> Option<u16> {
        match self {
            ApiError::Status { status, .. } => Some(*status),
            ApiError::Transport(_) => None,
        }
    }
}

#[async_trait]
pub trait ApiClient: Send + Sync {
    async fn get(&self, url: &str, config: &RequestConfig) -> Result<ApiResponse, ApiError>;
}

/// `ApiClient` backed by reqwest.
#[derive(Debug, Clone)]
pub struct HttpApiClient {
    client: reqwest::Client,
}

impl HttpApiClient {
    /// Creates a client; `timeout` of `None` waits indefinitely.
    pub fn new(timeout: Option<Duration>) -> Result<Self, ApiError> {
        let mut builder = reqwest::Client::builder();
        if let Some(timeout) = timeout {
            builder = builder.timeout(timeout);
        }
        let client = builder
            .build()
            .map_err(|e| ApiError::Transport(e.to_string()))?;
        Ok(Self { client })
    }
}

#[async_trait]
impl ApiClient for HttpApiClient {
    async fn get(&self, url: &str, config: &RequestConfig) -> Result<ApiResponse, ApiError> {
        let mut request = self.client.get(url);
        for (name, value) in &config.headers {
            request = request.header(name.as_str(), value.as_str());
        }

        let response = request
            .send()
            .await
            .map_err(|e| ApiError::Transport(e.to_string()))?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| ApiError::Transport(e.to_string()))?;

        if !status.is_success() {
            return Err(ApiError::Status {
                status: status.as_u16(),
                body,
            });
        }

        Ok(ApiResponse {
            status: status.as_u16(),
            data: body,
        })
    }
}

#[cfg(test)]
mod tests {
    use wiremock::matchers::{header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    use super::*;

    #[test]
    fn test_bearer_config_only_with_token() {
        assert_eq!(RequestConfig::bearer(None), RequestConfig::default());

        let config = RequestConfig::bearer(Some("T"));
        assert_eq!(config.header("authorization"), Some("Bearer T"));
        assert_eq!(config.headers.len(), 1);
    }

    #[test]
    fn test_status_error_message() {
        let err = ApiError::Status {
            status: 503,
            body: String::new(),
        };
        assert_eq!(err.to_string(), "Request failed with status code 503");
        assert_eq!(err.status(), Some(503));
        assert_eq!(ApiError::Transport("boom".into()).status(), None);
    }

    #[tokio::test]
    async fn test_get_returns_body_text() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/public"))
            .respond_with(ResponseTemplate::new(200).set_body_string("Hello PUBLIC"))
            .expect(1)
            .mount(&server)
            .await;

        let client = HttpApiClient::new(None).unwrap();
        let response = client
            .get(&format!("{}/public", server.uri()), &RequestConfig::default())
            .await
            .unwrap();

        assert_eq!(response.status, 200);
        assert_eq!(response.data, "Hello PUBLIC");

        let requests = server.received_requests().await.unwrap();
        assert!(requests[0].headers.get("authorization").is_none());
    }

    #[tokio::test]
    async fn test_get_sends_bearer_header() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/private"))
            .and(header("authorization", "Bearer T"))
            .respond_with(ResponseTemplate::new(200).set_body_string("secret"))
            .expect(1)
            .mount(&server)
            .await;

        let client = HttpApiClient::new(None).unwrap();
        let response = client
            .get(
                &format!("{}/private", server.uri()),
                &RequestConfig::bearer(Some("T")),
            )
            .await
            .unwrap();
        assert_eq!(response.data, "secret");
    }

    #[tokio::test]
    async fn test_non_success_status_is_status_error() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/admin"))
            .respond_with(ResponseTemplate::new(401).set_body_string("nope"))
            .mount(&server)
            .await;

        let client = HttpApiClient::new(None).unwrap();
        let err = client
            .get(&format!("{}/admin", server.uri()), &RequestConfig::default())
            .await
            .unwrap_err();

        assert_eq!(
            err,
            ApiError::Status {
                status: 401,
                body: "nope".to_string()
            }
        );
    }

    #[tokio::test]
    async fn test_connection_refused_is_transport_error() {
        let client = HttpApiClient::new(Some(Duration::from_secs(2))).unwrap();
        let err = client
            .get("http://127.0.0.1:1/public", &RequestConfig::default())
            .await
            .unwrap_err();

        assert!(matches!(err, ApiError::Transport(_)));
        assert!(!err.to_string().is_empty());
    }
}
