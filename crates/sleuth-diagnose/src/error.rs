//! Error taxonomy for a diagnosis call.

use std::fmt;

use thiserror::Error;

pub type Result<T> = std::result::Result<T, DiagnoseError>;

/// Coarse classification used for logging. Callers only display the message.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    Config,
    Network,
    Protocol,
    Parsing,
    Validation,
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            ErrorKind::Config => "config",
            ErrorKind::Network => "network",
            ErrorKind::Protocol => "protocol",
            ErrorKind::Parsing => "parsing",
            ErrorKind::Validation => "validation",
        })
    }
}

#[derive(Debug, Error)]
pub enum DiagnoseError {
    #[error(
        "OpenRouter API key is missing. Set {} in your environment, or add it to ~/.sleuth/env or the project's .env file.",
        sleuth_core::API_KEY_ENV
    )]
    MissingCredential,

    #[error("Nothing to analyze: the error message is empty.")]
    EmptyInput,

    #[error("API Error: {status} {reason} - {message}")]
    Api {
        status: u16,
        reason: String,
        message: String,
    },

    #[error("Request to the model endpoint failed: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("No content received from AI.")]
    EmptyResponse,

    #[error("Malformed response envelope: {0}")]
    Envelope(#[source] serde_json::Error),

    #[error(transparent)]
    Parse(#[from] ParseError),
}

impl DiagnoseError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            DiagnoseError::MissingCredential | DiagnoseError::EmptyInput => ErrorKind::Config,
            DiagnoseError::Api { .. } | DiagnoseError::Transport(_) => ErrorKind::Network,
            DiagnoseError::EmptyResponse | DiagnoseError::Envelope(_) => ErrorKind::Protocol,
            DiagnoseError::Parse(e) => e.kind(),
        }
    }

    /// HTTP status for API errors.
    pub fn status(&self) -> Option<u16> {
        match self {
            DiagnoseError::Api { status, .. } => Some(*status),
            DiagnoseError::Transport(e) => e.status().map(|s| s.as_u16()),
            _ => None,
        }
    }
}

/// The model replied, but the reply could not be coerced into a diagnosis.
#[derive(Debug, Error)]
pub enum ParseError {
    #[error("The AI did not return a valid JSON structure.")]
    NoJsonObject,

    #[error("Failed to parse AI response into JSON even after auto-fix strategies: {0}")]
    InvalidJson(#[source] serde_json::Error),

    #[error("AI response missing required fields: {}", .0.join(", "))]
    MissingFields(Vec<&'static str>),

    #[error("AI response has an invalid field: {0}")]
    InvalidField(#[source] serde_json::Error),
}

impl ParseError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            ParseError::NoJsonObject | ParseError::InvalidJson(_) => ErrorKind::Parsing,
            ParseError::MissingFields(_) | ParseError::InvalidField(_) => ErrorKind::Validation,
        }
    }
}
