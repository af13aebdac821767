//! Content generation boundary.
//!
//! The pipeline only sees the [`ContentGenerator`] trait. The production
//! implementation talks to an OpenAI-compatible chat-completions endpoint
//! ([`HttpGenerator`]); tests script their own.

pub mod http;
pub mod prompt;

use async_trait::async_trait;
use serde_json::Value;
use thiserror::Error;

pub use http::HttpGenerator;
pub use prompt::build_request;

/// Errors from a single generation call. Always isolated to one stage.
#[derive(Error, Debug)]
pub enum GenerationError {
    /// The request could not be sent or the connection dropped.
    #[error("Request failed: {0}")]
    Transport(String),

    /// The service answered with a non-success status.
    #[error("Service returned {status}: {body}")]
    Status { status: u16, body: String },

    /// The response could not be decoded.
    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    /// The response decoded but carried no content.
    #[error("Service returned no content")]
    EmptyContent,

    /// The generator refused the request before calling out.
    #[error("Generator unavailable: {0}")]
    Unavailable(String),
}

/// Everything the generator needs for one report.
#[derive(Debug, Clone)]
pub struct GenerationRequest {
    pub report_type: String,
    pub title: String,
    pub sections: Vec<String>,
    pub company_profile: Value,
    /// Responses whose topic matches the report's category focus.
    pub focused_responses: Vec<Value>,
}

/// A generated body plus what it cost.
#[derive(Debug, Clone, Default)]
pub struct GeneratedContent {
    pub body: String,
    pub prompt_tokens: u64,
    pub completion_tokens: u64,
}

/// Produces the body of one report. Calls may be slow and may fail; the
/// pipeline never retries them.
#[async_trait]
pub trait ContentGenerator: Send + Sync {
    async fn generate(&self, request: &GenerationRequest)
        -> Result<GeneratedContent, GenerationError>;
}
