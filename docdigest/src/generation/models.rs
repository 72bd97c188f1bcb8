//! Wire types for the text-generation service.

use serde::{Deserialize, Serialize};

use crate::errors::DigestError;

/// A single text part of a request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Part {
    /// The text content.
    pub text: String,
}

/// One content block of a request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Content {
    /// Parts making up the content.
    pub parts: Vec<Part>,
}

/// Request body for `generateContent`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GenerateRequest {
    /// Content blocks; the pipeline always sends exactly one.
    pub contents: Vec<Content>,
}

impl GenerateRequest {
    /// Builds a request carrying a single prompt.
    #[must_use]
    pub fn from_prompt(prompt: impl Into<String>) -> Self {
        Self {
            contents: vec![Content {
                parts: vec![Part { text: prompt.into() }],
            }],
        }
    }
}

/// A part of a response candidate. Non-text parts deserialize with `text: None`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct ResponsePart {
    /// Text content, if this part carries text.
    #[serde(default)]
    pub text: Option<String>,
}

/// Content of a response candidate.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct CandidateContent {
    /// Parts of the candidate.
    #[serde(default)]
    pub parts: Vec<ResponsePart>,
}

/// One generated candidate.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct Candidate {
    /// Candidate content; absent when the candidate was blocked.
    #[serde(default)]
    pub content: Option<CandidateContent>,
    /// Why generation stopped, if reported.
    #[serde(default, rename = "finishReason")]
    pub finish_reason: Option<String>,
}

/// Response body of `generateContent`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct GenerateResponse {
    /// Generated candidates.
    #[serde(default)]
    pub candidates: Vec<Candidate>,
}

impl GenerateResponse {
    /// Returns the first candidate's first content part text.
    ///
    /// Every missing level fails closed with [`DigestError::MalformedResponse`],
    /// as does text that is empty after trimming.
    pub fn first_text(&self) -> Result<&str, DigestError> {
        let candidate = self.candidates.first().ok_or_else(|| {
            DigestError::MalformedResponse("response contained no candidates".into())
        })?;

        let content = candidate.content.as_ref().ok_or_else(|| {
            DigestError::MalformedResponse(format!(
                "first candidate has no content (finish reason: {})",
                candidate.finish_reason.as_deref().unwrap_or("unknown")
            ))
        })?;

        let part = content.parts.first().ok_or_else(|| {
            DigestError::MalformedResponse("first candidate has no content parts".into())
        })?;
        let text = part.text.as_deref().ok_or_else(|| {
            DigestError::MalformedResponse("first content part has no text".into())
        })?;

        if text.trim().is_empty() {
            return Err(DigestError::MalformedResponse("summary text is empty".into()));
        }

        Ok(text)
    }
}

/// Parses a `generateContent` response body.
pub fn parse_generate_response(body: &str) -> Result<GenerateResponse, DigestError> {
    serde_json::from_str(body)
        .map_err(|e| DigestError::MalformedResponse(format!("invalid JSON: {e}")))
}
