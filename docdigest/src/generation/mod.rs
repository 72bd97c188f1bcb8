//! Text-generation service client.
//!
//! Request and response shapes follow the `generateContent` JSON format:
//! `{ contents: [{ parts: [{ text }] }] }` in, and
//! `{ candidates: [{ content: { parts: [{ text }] } }] }` out.

mod models;
mod transport;

pub use models::{
    parse_generate_response, Candidate, CandidateContent, Content, GenerateRequest,
    GenerateResponse, Part, ResponsePart,
};
pub use transport::{GenerationTransport, HttpGenerationTransport};
