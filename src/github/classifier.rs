use reqwest::header::HeaderMap;
use reqwest::StatusCode;

use crate::error::{ClassifiedError, ErrorKind};
use crate::github::graphql::GraphQlError;

const PERMISSION_KEYWORDS: [&str; 5] = [
    "permission",
    "forbidden",
    "access denied",
    "unauthorized",
    "not authorized",
];

/// Outcome of a read that is allowed to find nothing.
#[derive(Debug, Clone, PartialEq)]
pub enum Lookup<T> {
    Found(T),
    Absent,
}

impl<T> Lookup<T> {
    pub fn into_option(self) -> Option<T> {
        match self {
            Lookup::Found(value) => Some(value),
            Lookup::Absent => None,
        }
    }

    pub fn is_found(&self) -> bool {
        matches!(self, Lookup::Found(_))
    }

    pub fn map<U, F: FnOnce(T) -> U>(self, f: F) -> Lookup<U> {
        match self {
            Lookup::Found(value) => Lookup::Found(f(value)),
            Lookup::Absent => Lookup::Absent,
        }
    }
}

impl<T> From<Option<T>> for Lookup<T> {
    fn from(value: Option<T>) -> Self {
        match value {
            Some(v) => Lookup::Found(v),
            None => Lookup::Absent,
        }
    }
}

/// A failed remote call before classification.
#[derive(Debug)]
pub enum RawFailure {
    Http {
        status: StatusCode,
        headers: HeaderMap,
        body: String,
    },
    Transport(reqwest::Error),
    GraphQl(Vec<GraphQlError>),
}

/// Turns raw HTTP/GraphQL failures into typed [`ClassifiedError`]s.
///
/// With `ignore_not_found` set, [`ErrorClassifier::lookup`] reports a
/// not-found failure as [`Lookup::Absent`] instead of an error.
#[derive(Debug, Clone, Copy, Default)]
pub struct ErrorClassifier {
    ignore_not_found: bool,
}

impl ErrorClassifier {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn ignoring_not_found() -> Self {
        Self {
            ignore_not_found: true,
        }
    }

    pub fn ignores_not_found(&self) -> bool {
        self.ignore_not_found
    }

    pub fn classify(&self, raw: RawFailure, context: &str) -> ClassifiedError {
        let classified = match raw {
            RawFailure::Http {
                status,
                headers,
                body,
            } => classify_http(status, &headers, &body, context),
            RawFailure::Transport(err) => classify_transport(err, context),
            RawFailure::GraphQl(errors) => classify_graphql(&errors, context),
        };
        self.log(&classified, context);
        classified
    }

    /// Folds a not-found error into [`Lookup::Absent`] when this classifier ignores it.
    pub fn lookup<T>(
        &self,
        outcome: std::result::Result<T, ClassifiedError>,
    ) -> std::result::Result<Lookup<T>, ClassifiedError> {
        match outcome {
            Ok(value) => Ok(Lookup::Found(value)),
            Err(err) if self.ignore_not_found && err.kind == ErrorKind::NotFound => {
                Ok(Lookup::Absent)
            }
            Err(err) => Err(err),
        }
    }

    fn log(&self, err: &ClassifiedError, context: &str) {
        match err.kind {
            ErrorKind::NotFound if self.ignore_not_found => {
                tracing::debug!("Resource not found during {} - treating as absent", context);
            }
            ErrorKind::Auth | ErrorKind::Unknown => {
                tracing::error!("{} error during {}: {}", err.kind, context, err.message);
            }
            ErrorKind::NotFound
            | ErrorKind::RateLimited
            | ErrorKind::Validation
            | ErrorKind::Transient => {
                tracing::warn!("{} error during {}: {}", err.kind, context, err.message);
            }
        }
    }
}

fn classify_http(
    status: StatusCode,
    headers: &HeaderMap,
    body: &str,
    context: &str,
) -> ClassifiedError {
    let code = status.as_u16();
    let classified = match code {
        401 => ClassifiedError::new(
            ErrorKind::Auth,
            format!("Authentication failed during {}. Check the token", context),
        ),
        403 => {
            let remaining = headers
                .get("x-ratelimit-remaining")
                .and_then(|v| v.to_str().ok());
            if remaining == Some("0") {
                ClassifiedError::new(
                    ErrorKind::RateLimited,
                    format!("Rate limit exceeded during {}", context),
                )
            } else {
                ClassifiedError::new(
                    ErrorKind::Auth,
                    format!("Permission denied during {}. Check the token scopes", context),
                )
            }
        }
        404 => ClassifiedError::new(
            ErrorKind::NotFound,
            format!("Resource not found during {}", context),
        ),
        422 => {
            let err = ClassifiedError::new(
                ErrorKind::Validation,
                format!("Validation failed during {}: {}", context, body),
            );
            if body.to_lowercase().contains("already exists") {
                err.marked_already_exists()
            } else {
                err
            }
        }
        _ => ClassifiedError::new(
            ErrorKind::Unknown,
            format!("Unhandled HTTP error during {}: {}", context, body),
        ),
    };
    classified.with_status(code)
}

fn classify_transport(err: reqwest::Error, context: &str) -> ClassifiedError {
    if let Some(status) = err.status() {
        return ClassifiedError::new(
            ErrorKind::Unknown,
            format!("HTTP error during {}: {}", context, err),
        )
        .with_status(status.as_u16())
        .with_cause(err);
    }

    let kind = if err.is_decode() || err.is_body() {
        ErrorKind::Unknown
    } else {
        ErrorKind::Transient
    };
    let message = match kind {
        ErrorKind::Unknown => format!("Malformed response during {}: {}", context, err),
        _ => format!("Network/request error during {}: {}", context, err),
    };
    ClassifiedError::new(kind, message).with_cause(err)
}

fn classify_graphql(errors: &[GraphQlError], context: &str) -> ClassifiedError {
    let mut forbidden = false;
    let mut not_found = false;

    for err in errors {
        let error_type = err.error_type.as_deref().unwrap_or_default().to_uppercase();
        let message = err.message.to_lowercase();

        if error_type == "NOT_FOUND" || message.contains("not found") {
            not_found = true;
        }
        if error_type == "FORBIDDEN" || PERMISSION_KEYWORDS.iter().any(|k| message.contains(k)) {
            forbidden = true;
        }
    }

    let summary = errors
        .iter()
        .map(|e| e.message.as_str())
        .collect::<Vec<_>>()
        .join("; ");

    // Forbidden wins when one response carries both signals.
    if forbidden {
        ClassifiedError::new(
            ErrorKind::Auth,
            format!("GraphQL permission denied during {}: {}", context, summary),
        )
    } else if not_found {
        ClassifiedError::new(
            ErrorKind::NotFound,
            format!("GraphQL resource not found during {}: {}", context, summary),
        )
    } else {
        ClassifiedError::new(
            ErrorKind::Unknown,
            format!("GraphQL operation failed during {}: {}", context, summary),
        )
    }
}
