use std::time::Duration;
use thiserror::Error;

/// Errors raised while talking to the completion service.
#[derive(Error, Debug)]
pub enum PromptError {
    #[error("Failed to build Reqwest client: {0}")]
    ReqwestClientBuild(reqwest::Error),
    #[error("Failed to send request to AI API: {0}")]
    AiRequest(reqwest::Error),
    #[error("Failed to deserialize AI API response: {0}")]
    AiDeserialization(reqwest::Error),
    #[error("AI API returned status {status}: {body}")]
    AiApi { status: u16, body: String },
    #[error("AI API returned no content")]
    EmptyResponse,
    #[error("AI request timed out after {0:?}")]
    Timeout(Duration),
    #[error("AI provider is not configured: {0}")]
    MissingAiProvider(String),
    #[error("API key is missing")]
    MissingApiKey,
    #[error("Response cache I/O failed: {0}")]
    Cache(#[from] std::io::Error),
}

impl PromptError {
    /// Whether a retry has a reasonable chance of succeeding.
    pub fn is_transient(&self) -> bool {
        match self {
            PromptError::AiRequest(e) => e.is_timeout() || e.is_connect() || e.is_request(),
            PromptError::AiApi { status, .. } => *status == 429 || *status >= 500,
            PromptError::EmptyResponse | PromptError::Timeout(_) => true,
            _ => false,
        }
    }
}

/// Errors raised by a PDF forms backend.
///
/// `Load`, `NoFields` and `Save` are structural and abort a document. The
/// remaining variants describe a single rejected field write.
#[derive(Error, Debug)]
pub enum FormError {
    #[error("Failed to load PDF '{path}': {reason}")]
    Load { path: String, reason: String },
    #[error("PDF '{0}' declares no form fields")]
    NoFields(String),
    #[error("Failed to save PDF '{path}': {reason}")]
    Save { path: String, reason: String },
    #[error("Document has no field named '{0}'")]
    UnknownField(String),
    #[error("Field '{field}' cannot be written: unsupported field type '{kind}'")]
    UnsupportedField { field: String, kind: String },
    #[error("Value '{value}' is not a valid state for toggle field '{field}'")]
    InvalidToggleState { field: String, value: String },
    #[error("Malformed field '{field}': {reason}")]
    Malformed { field: String, reason: String },
}

impl FormError {
    /// Structural errors describe the whole document rather than one field.
    pub fn is_structural(&self) -> bool {
        matches!(
            self,
            FormError::Load { .. } | FormError::NoFields(_) | FormError::Save { .. }
        )
    }
}
