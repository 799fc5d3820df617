//! Hosted Model Clients
//!
//! Provides the two upstream collaborators of the estimation pipeline behind
//! object-safe traits so handlers and tests can swap implementations.
//!
//! ## Architecture
//!
//! - **Embedder**: turns free text into a dense vector (`text-embedding-004`, 768 dims)
//! - **Generator**: multi-turn text generation that is asked for strict JSON
//! - **GeminiClient**: implements both over the Gemini REST API

use async_trait::async_trait;
use serde::Serialize;

pub mod gemini;
pub use gemini::{GeminiClient, GeminiConfig};

/// Errors raised while talking to a hosted model.
#[derive(Debug, thiserror::Error)]
pub enum LlmError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),
    #[error("{provider} returned status {status}: {body}")]
    Status {
        provider: &'static str,
        status: reqwest::StatusCode,
        body: String,
    },
    #[error("prompt was blocked by the provider: {0}")]
    Blocked(String),
    #[error("model returned no content")]
    EmptyResponse,
    #[error("unexpected response shape: {0}")]
    InvalidResponse(String),
}

/// Speaker of a conversation turn.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum TurnRole {
    User,
    Model,
}

/// One message of a generation conversation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Turn {
    pub role: TurnRole,
    pub text: String,
}

impl Turn {
    pub fn user(text: impl Into<String>) -> Self {
        Self {
            role: TurnRole::User,
            text: text.into(),
        }
    }

    pub fn model(text: impl Into<String>) -> Self {
        Self {
            role: TurnRole::Model,
            text: text.into(),
        }
    }
}

/// Text embedding backend
#[async_trait]
pub trait Embedder: Send + Sync {
    /// Embed a single piece of text
    async fn embed(&self, text: &str) -> Result<Vec<f32>, LlmError>;

    /// Model identifier for logging
    fn model_name(&self) -> &str;
}

/// Generative model backend
#[async_trait]
pub trait Generator: Send + Sync {
    /// Run a conversation and return the raw text of the first candidate
    async fn generate(&self, turns: &[Turn]) -> Result<String, LlmError>;

    /// Model identifier for logging
    fn model_name(&self) -> &str;
}
