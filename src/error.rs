use thiserror::Error;

use crate::signing::SignStep;

/// Uniform status code reported for every failure by callers that still
/// branch on an integer result.
pub const FAILURE_STATUS: i32 = 1;

#[derive(Debug, Error)]
pub enum Error {
    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("IO error: {0}")]
    Io(String),

    #[error("Format error: {0}")]
    Format(String),

    #[error("No private key loaded")]
    MissingKey,

    #[error("{step} failed: {message}")]
    Crypto { step: SignStep, message: String },

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl Error {
    pub(crate) fn crypto(step: SignStep, message: impl Into<String>) -> Self {
        Error::Crypto {
            step,
            message: message.into(),
        }
    }

    /// Broad category of this error.
    pub fn kind(&self) -> ErrorKind {
        match self {
            Error::Configuration(_) | Error::MissingKey | Error::Json(_) => {
                ErrorKind::Configuration
            }
            Error::Io(_) => ErrorKind::Io,
            Error::Format(_) => ErrorKind::Format,
            Error::Crypto { .. } => ErrorKind::Crypto,
        }
    }

    /// Legacy integer status. Always [`FAILURE_STATUS`]; the step that failed
    /// is only visible through the diagnostic sink and `Display`.
    pub fn status(&self) -> i32 {
        FAILURE_STATUS
    }
}

impl From<rsa::pkcs8::Error> for Error {
    fn from(err: rsa::pkcs8::Error) -> Self {
        Error::Format(format!("PKCS#8: {}", err))
    }
}

impl From<rsa::pkcs1::Error> for Error {
    fn from(err: rsa::pkcs1::Error) -> Self {
        Error::Format(format!("PKCS#1: {}", err))
    }
}

/// Closed set of error categories.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    Configuration,
    Io,
    Format,
    Crypto,
}

impl std::fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            ErrorKind::Configuration => "CONFIGURATION",
            ErrorKind::Io => "IO",
            ErrorKind::Format => "FORMAT",
            ErrorKind::Crypto => "CRYPTO",
        };
        write!(f, "{}", s)
    }
}
