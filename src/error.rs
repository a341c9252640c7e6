use std::fmt;

use thiserror::Error;

/// Classification of a failed remote call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize)]
pub enum ErrorKind {
    Auth,
    RateLimited,
    NotFound,
    Validation,
    Transient,
    Unknown,
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ErrorKind::Auth => write!(f, "Auth"),
            ErrorKind::RateLimited => write!(f, "RateLimited"),
            ErrorKind::NotFound => write!(f, "NotFound"),
            ErrorKind::Validation => write!(f, "Validation"),
            ErrorKind::Transient => write!(f, "Transient"),
            ErrorKind::Unknown => write!(f, "Unknown"),
        }
    }
}

type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// A remote failure turned into a decision-ready value by the classifier.
#[derive(Error, Debug)]
#[error("{kind}: {message}{}", .http_status.map(|s| format!(" (status {})", s)).unwrap_or_default())]
pub struct ClassifiedError {
    pub kind: ErrorKind,
    pub http_status: Option<u16>,
    pub message: String,
    /// Set for 422 responses whose body reports a duplicate resource.
    pub already_exists: bool,
    #[source]
    pub cause: Option<BoxError>,
}

impl ClassifiedError {
    pub fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            http_status: None,
            message: message.into(),
            already_exists: false,
            cause: None,
        }
    }

    pub fn with_status(mut self, status: u16) -> Self {
        self.http_status = Some(status);
        self
    }

    pub fn with_cause(mut self, cause: impl Into<BoxError>) -> Self {
        self.cause = Some(cause.into());
        self
    }

    pub fn marked_already_exists(mut self) -> Self {
        self.already_exists = true;
        self
    }

    /// True for the idempotent-create race: a validation failure caused by a duplicate.
    pub fn is_already_exists(&self) -> bool {
        self.kind == ErrorKind::Validation && self.already_exists
    }
}

#[derive(Error, Debug)]
pub enum Error {
    #[error(transparent)]
    Classified(#[from] ClassifiedError),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Unexpected error during {context}: {source}")]
    Unexpected {
        context: String,
        #[source]
        source: BoxError,
    },

    #[error("Provisioning cancelled")]
    Cancelled,

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Invalid header value: {0}")]
    InvalidHeader(#[from] reqwest::header::InvalidHeaderValue),

    #[error("HTTP client setup failed: {0}")]
    HttpSetup(#[from] reqwest::Error),
}

pub type Result<T> = std::result::Result<T, Error>;

impl Error {
    pub fn unexpected(context: impl Into<String>, source: impl Into<BoxError>) -> Self {
        Error::Unexpected {
            context: context.into(),
            source: source.into(),
        }
    }

    pub fn is_classified(&self) -> bool {
        matches!(self, Error::Classified(_))
    }

    pub fn kind(&self) -> Option<ErrorKind> {
        match self {
            Error::Classified(e) => Some(e.kind),
            _ => None,
        }
    }

    pub fn is_already_exists(&self) -> bool {
        matches!(self, Error::Classified(e) if e.is_already_exists())
    }
}
