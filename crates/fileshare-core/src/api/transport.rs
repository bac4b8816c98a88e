//! Transport layer: executes one remote call and reports the raw outcome.
//!
//! The transport never retries and never refreshes. It attaches the bearer
//! credential it is handed, and maps unreachable endpoints and non-success
//! statuses into `ApiError`. Logical failures come back inside the envelope.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, RequestBuilder};
use serde_json::Value;
use tracing::debug;

use super::envelope::{Operation, RequestEnvelope, ResponseEnvelope, RestMethod};
use super::ApiError;
use crate::auth::Credential;
use crate::config::Config;

#[async_trait]
pub trait Transport: Send + Sync {
    async fn execute(
        &self,
        envelope: &RequestEnvelope,
        credential: Option<&Credential>,
    ) -> Result<ResponseEnvelope, ApiError>;
}

/// reqwest-backed transport.
/// Clone is cheap - reqwest::Client uses Arc internally for connection pooling.
#[derive(Clone)]
pub struct HttpTransport {
    client: Client,
    base_url: String,
    graphql_url: String,
}

impl HttpTransport {
    pub fn new(config: &Config) -> anyhow::Result<Self> {
        // The cookie store carries the refresh cookie set by login/refresh.
        let client = Client::builder()
            .timeout(Duration::from_secs(config.request_timeout_secs))
            .cookie_store(true)
            .build()?;

        let base_url = config.api_base_url.trim_end_matches('/').to_string();
        let graphql_url = format!("{}{}", base_url, config.graphql_path);

        Ok(Self {
            client,
            base_url,
            graphql_url,
        })
    }

    fn build(&self, envelope: &RequestEnvelope) -> RequestBuilder {
        match &envelope.operation {
            Operation::GraphQl { .. } => {
                let body = envelope.graphql_body().unwrap_or(Value::Null);
                self.client.post(&self.graphql_url).json(&body)
            }
            Operation::Rest { method, path } => {
                let url = format!("{}{}", self.base_url, path);
                let builder = match method {
                    RestMethod::Get => self.client.get(&url),
                    RestMethod::Put => self.client.put(&url),
                    RestMethod::Delete => self.client.delete(&url),
                };
                if envelope.variables.is_null() {
                    builder
                } else {
                    builder.json(&envelope.variables)
                }
            }
        }
    }
}

#[async_trait]
impl Transport for HttpTransport {
    async fn execute(
        &self,
        envelope: &RequestEnvelope,
        credential: Option<&Credential>,
    ) -> Result<ResponseEnvelope, ApiError> {
        let mut request = self.build(envelope);
        if let Some(credential) = credential {
            request = request.bearer_auth(credential.expose());
        }

        debug!(
            operation = envelope.operation.name(),
            authenticated = credential.is_some(),
            "Sending request"
        );

        let response = request.send().await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            debug!(operation = envelope.operation.name(), %status, "Request failed");
            return Err(ApiError::from_status(status, &body));
        }

        match envelope.operation {
            Operation::GraphQl { .. } => response
                .json::<ResponseEnvelope>()
                .await
                .map_err(|e| ApiError::InvalidResponse(e.to_string())),
            Operation::Rest { .. } => {
                let text = response.text().await?;
                let data = if text.trim().is_empty() {
                    Value::Null
                } else {
                    serde_json::from_str(&text)
                        .map_err(|e| ApiError::InvalidResponse(e.to_string()))?
                };
                Ok(ResponseEnvelope::success(data))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_urls_from_config() {
        let config = Config {
            api_base_url: "https://files.example.com/".to_string(),
            ..Config::default()
        };
        let transport = HttpTransport::new(&config).unwrap();
        assert_eq!(transport.base_url, "https://files.example.com");
        assert_eq!(transport.graphql_url, "https://files.example.com/graphql");
    }

    #[test]
    fn test_bearer_header_attached() {
        let transport = HttpTransport::new(&Config::default()).unwrap();
        let envelope = RequestEnvelope::rest(RestMethod::Get, "/api/files/", Value::Null);
        let credential = Credential::new("abc123");

        let request = transport
            .build(&envelope)
            .bearer_auth(credential.expose())
            .build()
            .unwrap();

        assert_eq!(request.url().as_str(), "http://localhost:8080/api/files/");
        let auth = request.headers().get(reqwest::header::AUTHORIZATION).unwrap();
        assert_eq!(auth.to_str().unwrap(), "Bearer abc123");
    }

    #[tokio::test]
    async fn test_unreachable_endpoint_is_network_error() {
        let config = Config {
            // Port 9 (discard) on localhost is closed in test environments.
            api_base_url: "http://127.0.0.1:9".to_string(),
            request_timeout_secs: 2,
            ..Config::default()
        };
        let transport = HttpTransport::new(&config).unwrap();
        let envelope = RequestEnvelope::graphql("Me", "query Me { me { id } }", Value::Null);

        let err = transport.execute(&envelope, None).await.unwrap_err();
        assert!(matches!(err, ApiError::Network(_)));
    }
}
