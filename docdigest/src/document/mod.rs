//! Document source: reads the text of a document and converts it to PDF.

mod drive;

pub use drive::DriveDocumentSource;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::errors::DigestError;

/// MIME type requested for text extraction.
pub const TEXT_MIME_TYPE: &str = "text/plain";
/// MIME type of the converted artifact.
pub const PDF_MIME_TYPE: &str = "application/pdf";
/// File name given to the converted artifact unless configured otherwise.
pub const DEFAULT_OUTPUT_FILE_NAME: &str = "summary-document.pdf";

/// A converted document, ready to be attached to a notification.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Artifact {
    /// Attachment file name.
    pub file_name: String,
    /// MIME type of `bytes`.
    pub mime_type: String,
    /// Raw file content, base64 encoded on the wire.
    #[serde(rename = "content_base64", with = "base64_bytes")]
    pub bytes: Vec<u8>,
}

impl Artifact {
    /// Creates an artifact.
    #[must_use]
    pub fn new(file_name: impl Into<String>, mime_type: impl Into<String>, bytes: Vec<u8>) -> Self {
        Self {
            file_name: file_name.into(),
            mime_type: mime_type.into(),
            bytes,
        }
    }

    /// Creates a PDF artifact with the default file name.
    #[must_use]
    pub fn pdf(bytes: Vec<u8>) -> Self {
        Self::new(DEFAULT_OUTPUT_FILE_NAME, PDF_MIME_TYPE, bytes)
    }

    /// Renames the artifact.
    #[must_use]
    pub fn with_file_name(mut self, file_name: impl Into<String>) -> Self {
        self.file_name = file_name.into();
        self
    }

    /// Size in bytes.
    #[must_use]
    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    /// Returns true if the artifact has no content.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }
}

mod base64_bytes {
    use base64::{engine::general_purpose::STANDARD, Engine};
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S>(bytes: &[u8], serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(&STANDARD.encode(bytes))
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Vec<u8>, D::Error>
    where
        D: Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        STANDARD.decode(&s).map_err(serde::de::Error::custom)
    }
}

/// Store holding the source document.
#[async_trait]
pub trait DocumentSource: Send + Sync {
    /// Returns the full body text of the document.
    async fn get_text(&self, document_id: &str) -> Result<String, DigestError>;

    /// Converts the document to PDF.
    async fn convert_to_output_format(&self, document_id: &str) -> Result<Artifact, DigestError>;
}
