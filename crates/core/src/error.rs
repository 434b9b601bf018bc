//! Error taxonomy shared by every store adapter and the migration bridge.

use std::fmt;

/// Backend-specific failure classes reported by a remote database.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RemoteErrorKind {
    /// Transport-level failure (offline, timeout, reset).
    Network,
    /// The caller is not allowed to perform the operation.
    PermissionDenied,
    /// Storage or request quota exhausted.
    QuotaExceeded,
    /// A query referenced a field the remote schema does not declare.
    UnknownField { field: String },
    /// Anything else the backend reported.
    Other,
}

/// An error returned by a remote backend SDK call.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{kind}: {message}")]
pub struct RemoteError {
    pub kind: RemoteErrorKind,
    pub message: String,
}

impl RemoteError {
    pub fn new(kind: RemoteErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }

    pub fn network(message: impl Into<String>) -> Self {
        Self::new(RemoteErrorKind::Network, message)
    }

    pub fn unknown_field(field: impl Into<String>) -> Self {
        let field = field.into();
        let message = format!("Field '{field}' is not declared in the schema");
        Self::new(RemoteErrorKind::UnknownField { field }, message)
    }

    /// True only when the backend rejected a query because `field` is
    /// missing from its schema.
    pub fn is_unknown_field(&self, field: &str) -> bool {
        matches!(&self.kind, RemoteErrorKind::UnknownField { field: f } if f == field)
    }
}

impl fmt::Display for RemoteErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Network => f.write_str("network error"),
            Self::PermissionDenied => f.write_str("permission denied"),
            Self::QuotaExceeded => f.write_str("quota exceeded"),
            Self::UnknownField { field } => write!(f, "unknown field '{field}'"),
            Self::Other => f.write_str("remote error"),
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum CoreError {
    #[error("Authentication required")]
    AuthenticationRequired,

    #[error("Entity not found: {entity} with key {key}")]
    NotFound { entity: &'static str, key: String },

    #[error("Invalid payload: {0}")]
    InvalidPayload(String),

    #[error("Remote operation failed: {0}")]
    Remote(#[from] RemoteError),

    #[error("Local storage error: {0}")]
    LocalStorage(String),
}

impl CoreError {
    pub fn not_found(entity: &'static str, key: impl Into<String>) -> Self {
        Self::NotFound {
            entity,
            key: key.into(),
        }
    }
}

impl From<std::io::Error> for CoreError {
    fn from(err: std::io::Error) -> Self {
        Self::LocalStorage(err.to_string())
    }
}

/// A wire record that could not be turned into a domain entity.
///
/// Decoders return this instead of raising; list readers log and drop it.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("Failed to decode {record_type}: {reason}")]
pub struct DecodeError {
    pub record_type: &'static str,
    pub reason: String,
}

impl DecodeError {
    pub fn missing(record_type: &'static str, field: &str) -> Self {
        Self {
            record_type,
            reason: format!("missing or mistyped field '{field}'"),
        }
    }

    pub fn invalid(record_type: &'static str, reason: impl Into<String>) -> Self {
        Self {
            record_type,
            reason: reason.into(),
        }
    }
}
