//! HTTP transport for the text-generation service.

use async_trait::async_trait;
use std::time::Duration;
use tracing::debug;

use super::models::GenerateRequest;
use crate::config::SecretString;
use crate::errors::DigestError;
use crate::invoker::TransportResponse;
use crate::utils::parse_retry_after;

/// Performs one `generateContent` call.
///
/// Implementations return every HTTP status as a [`TransportResponse`];
/// only failures to obtain a response at all are errors.
#[async_trait]
pub trait GenerationTransport: Send + Sync {
    /// Sends the request once, authenticated with `api_key`.
    async fn send(
        &self,
        request: &GenerateRequest,
        api_key: &SecretString,
    ) -> Result<TransportResponse, DigestError>;
}

/// `reqwest` based transport. The api key travels as the `key` query parameter.
#[derive(Debug, Clone)]
pub struct HttpGenerationTransport {
    client: reqwest::Client,
    endpoint: String,
}

impl HttpGenerationTransport {
    /// Creates a transport for `{base_url}/models/{model}:generateContent`.
    pub fn new(base_url: &str, model: &str, timeout: Duration) -> Result<Self, DigestError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| {
                DigestError::config("generation", format!("failed to build HTTP client: {e}"))
            })?;

        Ok(Self {
            client,
            endpoint: Self::endpoint_for(base_url, model),
        })
    }

    /// Builds the endpoint URL.
    #[must_use]
    pub fn endpoint_for(base_url: &str, model: &str) -> String {
        format!("{}/models/{}:generateContent", base_url.trim_end_matches('/'), model)
    }

    /// Returns the endpoint URL (without the key).
    #[must_use]
    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }
}

#[async_trait]
impl GenerationTransport for HttpGenerationTransport {
    async fn send(
        &self,
        request: &GenerateRequest,
        api_key: &SecretString,
    ) -> Result<TransportResponse, DigestError> {
        debug!(endpoint = %self.endpoint, "Sending generateContent request");

        let response = self
            .client
            .post(&self.endpoint)
            .query(&[("key", api_key.expose())])
            .json(request)
            .send()
            .await
            .map_err(|e| DigestError::Transport(format!("request failed: {}", e.without_url())))?;

        let status = response.status().as_u16();
        let retry_after = response
            .headers()
            .get(reqwest::header::RETRY_AFTER)
            .and_then(|v| v.to_str().ok())
            .and_then(parse_retry_after);
        let body = response.text().await.map_err(|e| {
            DigestError::Transport(format!("failed to read response body: {}", e.without_url()))
        })?;

        Ok(TransportResponse {
            status,
            body,
            retry_after,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::generation::parse_generate_response;
    use crate::testing::{generate_response_body, StubHttpServer, StubResponse};

    fn transport(server: &StubHttpServer) -> HttpGenerationTransport {
        HttpGenerationTransport::new(&server.url(), "gemini-test", Duration::from_secs(5)).unwrap()
    }

    #[test]
    fn test_endpoint_for() {
        assert_eq!(
            HttpGenerationTransport::endpoint_for(
                "https://generativelanguage.googleapis.com/v1beta/",
                "gemini-2.5-flash"
            ),
            concat!(
                "https://generativelanguage.googleapis.com/v1beta",
                "/models/gemini-2.5-flash:generateContent"
            )
        );
    }

    #[tokio::test]
    async fn test_send_posts_prompt_with_key_parameter() {
        let server = StubHttpServer::start(vec![StubResponse::new(
            200,
            generate_response_body("要約"),
        )])
        .await
        .unwrap();

        let response = transport(&server)
            .send(
                &GenerateRequest::from_prompt("summarize this"),
                &SecretString::new("key-123"),
            )
            .await
            .unwrap();

        assert_eq!(response.status, 200);
        assert_eq!(response.retry_after, None);
        let parsed = parse_generate_response(&response.body).unwrap();
        assert_eq!(parsed.first_text().unwrap(), "要約");

        let requests = server.requests();
        assert_eq!(requests.len(), 1);
        let request = &requests[0];
        assert_eq!(request.method, "POST");
        assert_eq!(request.path(), "/models/gemini-test:generateContent");
        assert_eq!(request.query_param("key").as_deref(), Some("key-123"));
        let body = request.body_json().unwrap();
        assert_eq!(body["contents"][0]["parts"][0]["text"], "summarize this");
    }

    #[tokio::test]
    async fn test_rate_limit_is_a_response_not_an_error() {
        let server = StubHttpServer::start(vec![StubResponse::new(
            429,
            r#"{"error":{"code":429,"status":"RESOURCE_EXHAUSTED"}}"#,
        )
        .with_header("Retry-After", "17")])
        .await
        .unwrap();

        let response = transport(&server)
            .send(&GenerateRequest::from_prompt("x"), &SecretString::new("k"))
            .await
            .unwrap();

        assert_eq!(response.status, 429);
        assert_eq!(response.retry_after, Some(Duration::from_secs(17)));
        assert!(response.body.contains("RESOURCE_EXHAUSTED"));
    }

    #[tokio::test]
    async fn test_server_error_is_a_response() {
        let server = StubHttpServer::start(vec![StubResponse::new(503, "overloaded")])
            .await
            .unwrap();

        let response = transport(&server)
            .send(&GenerateRequest::from_prompt("x"), &SecretString::new("k"))
            .await
            .unwrap();

        assert_eq!(response.status, 503);
        assert_eq!(response.body, "overloaded");
    }

    #[tokio::test]
    async fn test_connection_failure_is_a_transport_error() {
        let server = StubHttpServer::start(Vec::new()).await.unwrap();
        let transport = transport(&server);
        drop(server);

        let err = transport
            .send(&GenerateRequest::from_prompt("x"), &SecretString::new("secret-key"))
            .await
            .unwrap_err();

        assert_eq!(err.kind(), "TransportError");
        assert!(!err.to_string().contains("secret-key"));
    }
}
