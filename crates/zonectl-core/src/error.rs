//! Error types for zonectl
//!
//! Every public zone operation returns either its full result or exactly one
//! [`Error`]; partial results never travel alongside an error.

use std::fmt;
use thiserror::Error;

/// Result type alias for zone operations
pub type Result<T> = std::result::Result<T, Error>;

/// Core error type for zone operations
#[derive(Error, Debug)]
pub enum Error {
    /// A record failed local constraints before any network call
    #[error("Invalid record: {0}")]
    Validation(String),

    /// A backend record could not be turned into an abstract record
    #[error("Malformed record: {0}")]
    Parse(String),

    /// A single backend call failed (non-2xx status or transport failure)
    #[error("{}", backend_message(.status, .message))]
    Backend {
        /// HTTP status, absent for transport failures
        status: Option<u16>,
        /// Message reported by the backend or the transport
        message: String,
    },

    /// Set-records failed, and every record it had created was rolled back.
    /// The zone is unchanged.
    #[error("atomic error: {0}")]
    Atomic(#[source] Box<Error>),

    /// Set-records failed and the zone may be inconsistent
    #[error(transparent)]
    NonAtomic(NonAtomicError),

    /// Configuration errors
    #[error("Configuration error: {0}")]
    Config(String),

    /// The operation's cancellation token fired
    #[error("operation cancelled")]
    Cancelled,

    /// JSON serialization/deserialization errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Generic error with context
    #[error("{0}")]
    Other(String),
}

fn backend_message(status: &Option<u16>, message: &str) -> String {
    match status {
        Some(status) => format!("Backend error (HTTP {}): {}", status, message),
        None => format!("Backend error: {}", message),
    }
}

impl Error {
    /// Create a validation error
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    /// Create a parse error
    pub fn parse(msg: impl Into<String>) -> Self {
        Self::Parse(msg.into())
    }

    /// Create a backend error carrying an HTTP status
    pub fn backend(status: u16, msg: impl Into<String>) -> Self {
        Self::Backend {
            status: Some(status),
            message: msg.into(),
        }
    }

    /// Create a backend error for a failure below HTTP (connect, TLS, body)
    pub fn transport(msg: impl Into<String>) -> Self {
        Self::Backend {
            status: None,
            message: msg.into(),
        }
    }

    /// Create a configuration error
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    /// Wrap a creation failure whose rollback fully succeeded
    pub fn atomic(cause: Error) -> Self {
        Self::Atomic(Box::new(cause))
    }

    /// True when the zone is confirmed unchanged after a failed set-records
    pub fn is_atomic(&self) -> bool {
        matches!(self, Self::Atomic(_))
    }

    /// True when the zone must be re-read before trusting its state
    pub fn is_non_atomic(&self) -> bool {
        matches!(self, Self::NonAtomic(_))
    }

    /// True for a backend 404
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::Backend { status: Some(404), .. })
    }

    /// True when the error came from cancellation rather than a failure
    pub fn is_cancelled(&self) -> bool {
        matches!(self, Self::Cancelled)
    }
}

/// Aggregate failure after which the zone state is unverified
///
/// Raised either when rolling back after a failed creation partially failed
/// (`cause` is the creation error, `failures` the rollback errors), or when
/// the deletions that follow successful creations partially failed (`cause`
/// is absent, `failures` the deletion errors).
#[derive(Debug)]
pub struct NonAtomicError {
    cause: Option<Box<Error>>,
    failures: Vec<Error>,
}

impl NonAtomicError {
    /// Rollback after a failed creation did not fully succeed
    pub fn rollback_failed(cause: Error, failures: Vec<Error>) -> Self {
        Self {
            cause: Some(Box::new(cause)),
            failures,
        }
    }

    /// Creations landed but some obsolete records could not be removed
    pub fn cleanup_failed(failures: Vec<Error>) -> Self {
        Self {
            cause: None,
            failures,
        }
    }

    /// The error that triggered the rollback, if any
    pub fn cause(&self) -> Option<&Error> {
        self.cause.as_deref()
    }

    /// Secondary failures, in the order they happened
    pub fn failures(&self) -> &[Error] {
        &self.failures
    }
}

impl fmt::Display for NonAtomicError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.cause {
            Some(cause) => write!(
                f,
                "set records failed: {}; rollback failed with {} errors (possible inconsistent state on the zone)",
                cause,
                self.failures.len()
            )?,
            None => write!(
                f,
                "set records failed during cleanup with {} errors (possible inconsistent state on the zone)",
                self.failures.len()
            )?,
        }
        for failure in &self.failures {
            write!(f, "\n  - {}", failure)?;
        }
        Ok(())
    }
}

impl std::error::Error for NonAtomicError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match &self.cause {
            Some(cause) => Some(cause.as_ref()),
            None => self
                .failures
                .first()
                .map(|e| e as &(dyn std::error::Error + 'static)),
        }
    }
}

impl From<NonAtomicError> for Error {
    fn from(err: NonAtomicError) -> Self {
        Self::NonAtomic(err)
    }
}

/// Helper for converting anyhow::Error to our Error type
impl From<anyhow::Error> for Error {
    fn from(err: anyhow::Error) -> Self {
        Self::Other(err.to_string())
    }
}
