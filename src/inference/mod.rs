pub mod ollama;
pub mod parser;
pub mod prompt;

pub use ollama::*;
pub use parser::*;
pub use prompt::*;

use thiserror::Error;

use crate::pipeline::CollaboratorError;

#[derive(Error, Debug)]
pub enum OllamaError {
    #[error("Ollama is not running at {0}")]
    Connection(String),

    #[error("Ollama request timed out after {0}s")]
    Timeout(u64),

    #[error("Ollama returned error (status {status}): {body}")]
    Api { status: u16, body: String },

    #[error("HTTP client error: {0}")]
    HttpClient(String),

    #[error("Malformed model response: {0}")]
    MalformedResponse(String),

    #[error("JSON parsing error: {0}")]
    JsonParsing(String),

    #[error("Prompt serialization error: {0}")]
    Prompt(#[from] serde_json::Error),
}

impl OllamaError {
    /// Parse failures are worth one retry with stricter instructions.
    pub fn is_parse_error(&self) -> bool {
        matches!(self, Self::MalformedResponse(_) | Self::JsonParsing(_))
    }
}

impl From<OllamaError> for CollaboratorError {
    fn from(e: OllamaError) -> Self {
        match e {
            OllamaError::Connection(_) | OllamaError::Timeout(_) => {
                CollaboratorError::Unavailable(e.to_string())
            }
            e if e.is_parse_error() => CollaboratorError::MalformedOutput(e.to_string()),
            e => CollaboratorError::Backend(e.to_string()),
        }
    }
}
