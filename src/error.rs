use serde::Serialize;
use std::fmt;
use thiserror::Error;

/// Stable, machine-readable failure category reported to callers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorCode {
    ValidationError,
    UnsupportedModel,
    InvalidJson,
    ProviderTransport,
    ProviderTimeout,
    ProviderResponse,
    MissingAuth,
    InvalidAuthFormat,
    InvalidApiKey,
}

impl ErrorCode {
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorCode::ValidationError => "validation_error",
            ErrorCode::UnsupportedModel => "unsupported_model",
            ErrorCode::InvalidJson => "invalid_json",
            ErrorCode::ProviderTransport => "provider_transport",
            ErrorCode::ProviderTimeout => "provider_timeout",
            ErrorCode::ProviderResponse => "provider_response",
            ErrorCode::MissingAuth => "missing_auth",
            ErrorCode::InvalidAuthFormat => "invalid_auth_format",
            ErrorCode::InvalidApiKey => "invalid_api_key",
        }
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Failure of a single upstream chat-completion call.
///
/// Raw status and body are kept whenever the backend produced them so callers
/// can see what the provider actually said.
#[derive(Debug, Error)]
pub enum ProviderError {
    #[error("Failed to build provider client: {0}")]
    Client(String),

    #[error("API request failed: {0}")]
    Transport(String),

    #[error("API request timed out after {0} seconds")]
    Timeout(u64),

    #[error("API request failed with status {status}: {}", body_preview(.body))]
    Status { status: u16, body: String },

    #[error("Invalid response format: {detail}; body: {}", body_preview(.body))]
    Malformed { detail: String, body: String },

    #[error("Invalid response format: no choices; body: {}", body_preview(.body))]
    EmptyChoices { body: String },
}

const BODY_PREVIEW_CHARS: usize = 512;

/// Upstream body cut to `BODY_PREVIEW_CHARS` characters for error messages.
fn body_preview(body: &str) -> String {
    match body.char_indices().nth(BODY_PREVIEW_CHARS) {
        Some((idx, _)) => format!("{}...", &body[..idx]),
        None => body.to_string(),
    }
}

impl ProviderError {
    pub fn code(&self) -> ErrorCode {
        match self {
            ProviderError::Client(_) | ProviderError::Transport(_) => ErrorCode::ProviderTransport,
            ProviderError::Timeout(_) => ErrorCode::ProviderTimeout,
            ProviderError::Status { .. }
            | ProviderError::Malformed { .. }
            | ProviderError::EmptyChoices { .. } => ErrorCode::ProviderResponse,
        }
    }
}

#[derive(Debug, Error)]
pub enum DispatchError {
    #[error("{0}")]
    Validation(String),

    #[error("Unsupported model: {0}")]
    UnknownModel(String),

    #[error(transparent)]
    Provider(#[from] ProviderError),
}

impl DispatchError {
    pub fn code(&self) -> ErrorCode {
        match self {
            DispatchError::Validation(_) => ErrorCode::ValidationError,
            DispatchError::UnknownModel(_) => ErrorCode::UnsupportedModel,
            DispatchError::Provider(e) => e.code(),
        }
    }

    /// Caller mistakes, rejected before any network call.
    pub fn is_validation(&self) -> bool {
        matches!(self, DispatchError::Validation(_) | DispatchError::UnknownModel(_))
    }
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Config file IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Config JSON parsing error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Invalid configuration: {0}")]
    Invalid(String),
}
