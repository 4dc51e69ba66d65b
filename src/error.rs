/******************************************************************************
    Author: Joaquín Béjar García
    Email: jb@taunais.com
    Date: 7/10/26
 ******************************************************************************/
use crate::constants::SESSION_EXPIRED_MESSAGE;
use serde::Serialize;
use std::collections::BTreeMap;
use std::fmt;
use std::io;
use thiserror::Error;

/// Coarse classification of a [`NormalizedError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum ErrorKind {
    FieldError,
    FormError,
    NetworkError,
    SessionExpired,
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ErrorKind::FieldError => "FieldError",
            ErrorKind::FormError => "FormError",
            ErrorKind::NetworkError => "NetworkError",
            ErrorKind::SessionExpired => "SessionExpired",
        };
        f.write_str(name)
    }
}

/// The single failure shape every call site receives.
///
/// `SessionExpired` is kept apart from the form/field variants so that a consumer can
/// force a logout instead of rendering a message next to an input.
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize)]
#[serde(tag = "kind")]
pub enum NormalizedError {
    /// Validation failure attributable to one or more named fields.
    #[error("validation failed: {}", join_fields(.fields))]
    FieldError { fields: BTreeMap<String, String> },
    /// Request-level failure that is not tied to a field.
    #[error("{message}")]
    FormError { message: String },
    /// The transport never produced a response.
    #[error("network error: {message}")]
    NetworkError { message: String },
    /// Refresh failed, or a credential was required and none was available.
    #[error("{}", SESSION_EXPIRED_MESSAGE)]
    SessionExpired,
}

fn join_fields(fields: &BTreeMap<String, String>) -> String {
    fields
        .iter()
        .map(|(field, message)| format!("{field}: {message}"))
        .collect::<Vec<_>>()
        .join(", ")
}

impl NormalizedError {
    pub fn form(message: impl Into<String>) -> Self {
        NormalizedError::FormError {
            message: message.into(),
        }
    }

    pub fn network(message: impl Into<String>) -> Self {
        NormalizedError::NetworkError {
            message: message.into(),
        }
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            NormalizedError::FieldError { .. } => ErrorKind::FieldError,
            NormalizedError::FormError { .. } => ErrorKind::FormError,
            NormalizedError::NetworkError { .. } => ErrorKind::NetworkError,
            NormalizedError::SessionExpired => ErrorKind::SessionExpired,
        }
    }

    pub fn fields(&self) -> Option<&BTreeMap<String, String>> {
        match self {
            NormalizedError::FieldError { fields } => Some(fields),
            _ => None,
        }
    }

    pub fn message(&self) -> Option<&str> {
        match self {
            NormalizedError::FormError { message } | NormalizedError::NetworkError { message } => {
                Some(message)
            }
            NormalizedError::SessionExpired => Some(SESSION_EXPIRED_MESSAGE),
            NormalizedError::FieldError { .. } => None,
        }
    }

    pub fn is_session_expired(&self) -> bool {
        matches!(self, NormalizedError::SessionExpired)
    }
}

/// Failure of a single HTTP exchange before any response was received.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TransportError {
    #[error("request timed out: {0}")]
    Timeout(String),
    #[error("connection failed: {0}")]
    Connect(String),
    #[error("invalid request: {0}")]
    InvalidRequest(String),
    #[error("network error: {0}")]
    Other(String),
}

impl From<reqwest::Error> for TransportError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_timeout() {
            TransportError::Timeout(e.to_string())
        } else if e.is_connect() {
            TransportError::Connect(e.to_string())
        } else if e.is_builder() {
            TransportError::InvalidRequest(e.to_string())
        } else {
            TransportError::Other(e.to_string())
        }
    }
}

impl From<TransportError> for NormalizedError {
    fn from(e: TransportError) -> Self {
        NormalizedError::network(e.to_string())
    }
}

/// Errors raised by a durable storage backend.
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("io error: {0}")]
    Io(#[from] io::Error),
    #[error("serialization error: {0}")]
    Serialization(String),
    #[error("rejected credentials: {0}")]
    Rejected(String),
}

/// Errors raised while wiring a client together.
#[derive(Debug, Error)]
pub enum AppError {
    #[error("http client error: {0:#}")]
    HttpClient(anyhow::Error),
    #[error("storage error: {0}")]
    Storage(#[from] StorageError),
}
