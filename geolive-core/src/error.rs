use thiserror::Error;

/// Structured error codes carried in the backend's error envelope.
///
/// Older backend deployments only send a free-text message; callers that
/// need to classify those fall back to message inspection (see
/// [`Error::is_owner_mismatch`]).
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ApiErrorCode {
    OwnerMismatch,
    StreamNotFound,
    StreamEnded,
    Other(String),
}

impl ApiErrorCode {
    #[must_use]
    pub fn parse(code: &str) -> Self {
        match code {
            "OWNER_MISMATCH" => Self::OwnerMismatch,
            "STREAM_NOT_FOUND" => Self::StreamNotFound,
            "STREAM_ENDED" => Self::StreamEnded,
            other => Self::Other(other.to_string()),
        }
    }
}

#[derive(Error, Debug)]
pub enum Error {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Invalid URL: {0}")]
    Url(#[from] url::ParseError),

    #[error("Backend error: {message}")]
    Api {
        code: Option<ApiErrorCode>,
        message: String,
    },

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Streaming SDK error: {0}")]
    Sdk(String),

    #[error("No usable user identity")]
    IdentityUnavailable,

    #[error("Room id could not be resolved")]
    RoomUnresolved,
}

impl Error {
    /// Whether this error indicates the backend rejected a stream mutation
    /// because the caller is not the recorded owner.
    ///
    /// Prefers the structured `OWNER_MISMATCH` code; envelopes without a
    /// code fall back to the legacy message substring check.
    #[must_use]
    pub fn is_owner_mismatch(&self) -> bool {
        match self {
            Self::Api {
                code: Some(ApiErrorCode::OwnerMismatch),
                ..
            } => true,
            Self::Api {
                code: None,
                message,
            } => {
                let message = message.to_lowercase();
                message.contains("only stream owner") || message.contains("owner")
            }
            _ => false,
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;
