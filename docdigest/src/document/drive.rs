//! Drive-style export API adapter.

use async_trait::async_trait;
use std::time::Duration;
use tracing::{debug, warn};

use super::{Artifact, DocumentSource, PDF_MIME_TYPE, TEXT_MIME_TYPE};
use crate::config::SecretString;
use crate::errors::DigestError;
use crate::utils::text::{ERROR_BODY_LIMIT, LOG_BODY_LIMIT};
use crate::utils::truncate_chars;

/// Reads documents through `GET {base}/files/{id}/export?mimeType=...`.
pub struct DriveDocumentSource {
    client: reqwest::Client,
    base_url: String,
    access_token: Option<SecretString>,
    output_file_name: String,
}

impl std::fmt::Debug for DriveDocumentSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DriveDocumentSource")
            .field("base_url", &self.base_url)
            .field("access_token", &self.access_token)
            .field("output_file_name", &self.output_file_name)
            .finish_non_exhaustive()
    }
}

impl DriveDocumentSource {
    /// Creates an adapter. Without a token requests are sent unauthenticated.
    pub fn new(
        base_url: impl Into<String>,
        access_token: Option<SecretString>,
        timeout: Duration,
    ) -> Result<Self, DigestError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| {
                DigestError::config("documents", format!("failed to build HTTP client: {e}"))
            })?;

        Ok(Self {
            client,
            base_url: base_url.into(),
            access_token,
            output_file_name: super::DEFAULT_OUTPUT_FILE_NAME.to_string(),
        })
    }

    /// Sets the file name of converted artifacts.
    #[must_use]
    pub fn with_output_file_name(mut self, file_name: impl Into<String>) -> Self {
        self.output_file_name = file_name.into();
        self
    }

    /// Builds the export URL for a document, escaping the id as one path segment.
    pub fn export_url(&self, document_id: &str) -> Result<reqwest::Url, String> {
        let mut url =
            reqwest::Url::parse(&self.base_url).map_err(|e| format!("invalid base URL: {e}"))?;
        url.path_segments_mut()
            .map_err(|()| format!("base URL cannot carry a path: {}", self.base_url))?
            .pop_if_empty()
            .extend(["files", document_id, "export"]);
        Ok(url)
    }

    async fn export(
        &self,
        document_id: &str,
        mime_type: &str,
    ) -> Result<reqwest::Response, String> {
        let url = self.export_url(document_id)?;
        debug!(document_id, mime_type, "Exporting document");

        let mut request = self.client.get(url).query(&[("mimeType", mime_type)]);
        if let Some(token) = &self.access_token {
            request = request.bearer_auth(token.expose());
        }

        let response = request
            .send()
            .await
            .map_err(|e| format!("request failed: {}", e.without_url()))?;

        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        let body = response.text().await.unwrap_or_default();
        warn!(
            document_id,
            status = status.as_u16(),
            body = truncate_chars(&body, LOG_BODY_LIMIT),
            "Document export failed"
        );
        Err(format!(
            "HTTP {} - {}",
            status.as_u16(),
            truncate_chars(&body, ERROR_BODY_LIMIT)
        ))
    }
}

#[async_trait]
impl DocumentSource for DriveDocumentSource {
    async fn get_text(&self, document_id: &str) -> Result<String, DigestError> {
        let response = self
            .export(document_id, TEXT_MIME_TYPE)
            .await
            .map_err(|message| DigestError::fetch(document_id, message))?;

        response.text().await.map_err(|e| {
            DigestError::fetch(
                document_id,
                format!("failed to read body: {}", e.without_url()),
            )
        })
    }

    async fn convert_to_output_format(&self, document_id: &str) -> Result<Artifact, DigestError> {
        let response = self
            .export(document_id, PDF_MIME_TYPE)
            .await
            .map_err(|message| DigestError::conversion(document_id, message))?;

        let bytes = response.bytes().await.map_err(|e| {
            DigestError::conversion(
                document_id,
                format!("failed to read body: {}", e.without_url()),
            )
        })?;

        Ok(Artifact::new(
            self.output_file_name.clone(),
            PDF_MIME_TYPE,
            bytes.to_vec(),
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{StubHttpServer, StubResponse};

    fn source(base: &str) -> DriveDocumentSource {
        DriveDocumentSource::new(
            base,
            Some(SecretString::new("drive-token-xyz")),
            Duration::from_secs(5),
        )
        .unwrap()
    }

    #[test]
    fn test_export_url() {
        let url = source("https://www.googleapis.com/drive/v3")
            .export_url("1AbC")
            .unwrap();
        assert_eq!(url.as_str(), "https://www.googleapis.com/drive/v3/files/1AbC/export");
    }

    #[test]
    fn test_export_url_trailing_slash_and_escaping() {
        let url = source("https://example.test/drive/v3/")
            .export_url("a/b c")
            .unwrap();
        assert_eq!(url.as_str(), "https://example.test/drive/v3/files/a%2Fb%20c/export");
    }

    #[test]
    fn test_invalid_base_url() {
        assert!(source("not a url").export_url("x").is_err());
    }

    #[test]
    fn test_debug_redacts_token() {
        let debug = format!("{:?}", source("https://example.test"));
        assert!(!debug.contains("drive-token-xyz"));
        assert!(debug.contains("[REDACTED]"));
    }

    #[tokio::test]
    async fn test_get_text_exports_plain_text() {
        let server = StubHttpServer::start(vec![StubResponse::new(200, "本文です")])
            .await
            .unwrap();

        let text = source(&server.url()).get_text("doc-1").await.unwrap();
        assert_eq!(text, "本文です");

        let request = &server.requests()[0];
        assert_eq!(request.method, "GET");
        assert_eq!(request.path(), "/files/doc-1/export");
        assert_eq!(request.query_param("mimeType").as_deref(), Some(TEXT_MIME_TYPE));
        assert_eq!(request.header("authorization"), Some("Bearer drive-token-xyz"));
    }

    #[tokio::test]
    async fn test_get_text_without_token_sends_no_authorization() {
        let server = StubHttpServer::start(vec![StubResponse::new(200, "x")])
            .await
            .unwrap();
        let source = DriveDocumentSource::new(server.url(), None, Duration::from_secs(5)).unwrap();

        source.get_text("doc-1").await.unwrap();
        assert_eq!(server.requests()[0].header("authorization"), None);
    }

    #[tokio::test]
    async fn test_failed_text_export_is_fetch_error() {
        let body = "x".repeat(ERROR_BODY_LIMIT + 50);
        let server = StubHttpServer::start(vec![StubResponse::new(404, body.clone())])
            .await
            .unwrap();

        let err = source(&server.url()).get_text("doc-1").await.unwrap_err();

        assert_eq!(err.kind(), "FetchError");
        let message = err.to_string();
        assert!(message.contains("doc-1"));
        assert!(message.contains("HTTP 404 - "));
        assert!(message.contains(&body[..ERROR_BODY_LIMIT]));
        assert!(!message.contains(&body[..=ERROR_BODY_LIMIT]));
    }

    #[tokio::test]
    async fn test_convert_returns_pdf_artifact() {
        let pdf = b"%PDF-1.7 fake".to_vec();
        let server = StubHttpServer::start(vec![StubResponse::new(200, pdf.clone())])
            .await
            .unwrap();

        let artifact = source(&server.url())
            .with_output_file_name("digest.pdf")
            .convert_to_output_format("doc-1")
            .await
            .unwrap();

        assert_eq!(artifact.file_name, "digest.pdf");
        assert_eq!(artifact.mime_type, PDF_MIME_TYPE);
        assert_eq!(artifact.bytes, pdf);
        assert_eq!(
            server.requests()[0].query_param("mimeType").as_deref(),
            Some(PDF_MIME_TYPE)
        );
    }

    #[tokio::test]
    async fn test_failed_pdf_export_is_conversion_error() {
        let server = StubHttpServer::start(vec![StubResponse::new(403, "forbidden")])
            .await
            .unwrap();

        let err = source(&server.url())
            .convert_to_output_format("doc-1")
            .await
            .unwrap_err();

        assert_eq!(err.kind(), "ConversionError");
        assert!(err.to_string().contains("HTTP 403 - forbidden"));
    }
}
