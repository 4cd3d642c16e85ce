//! Error types for the asix-eeprom crate.

use std::fmt;

/// Stable token naming the kind of an [`Error`].
///
/// Callers use this to decide on a recovery policy without matching on the
/// diagnostic text.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    DeviceUnavailable,
    Timeout,
    AuthorizationRejected,
    VerificationMismatch,
    NotFound,
    IntegrityMismatch,
    Validation,
    Unknown,
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::DeviceUnavailable => "device_unavailable",
            Self::Timeout => "timeout",
            Self::AuthorizationRejected => "authorization_rejected",
            Self::VerificationMismatch => "verification_mismatch",
            Self::NotFound => "not_found",
            Self::IntegrityMismatch => "integrity_mismatch",
            Self::Validation => "validation",
            Self::Unknown => "unknown",
        };
        f.write_str(s)
    }
}

/// The error type for EEPROM and file backup operations.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum Error {
    /// The device or remote host is not reachable (not opened or disconnected).
    #[error("device unavailable: {0}")]
    DeviceUnavailable(String),

    /// The collaborator gave up waiting for the device or remote command.
    #[error("timed out: {0}")]
    Timeout(String),

    /// The device refused the write authorization value.
    #[error("authorization rejected: {0}")]
    AuthorizationRejected(String),

    /// A post-mutation read-back did not match what was written.
    #[error("verification mismatch: {0}")]
    VerificationMismatch(String),

    /// A file or backup entry does not exist.
    #[error("not found: {0}")]
    NotFound(String),

    /// A backup's content no longer matches its recorded checksum.
    #[error("integrity mismatch: expected checksum {expected}, found {actual}")]
    IntegrityMismatch {
        /// Checksum recorded when the backup was taken.
        expected: String,
        /// Checksum computed now, or a note that it could not be computed.
        actual: String,
    },

    /// Invalid argument(s) were provided; nothing was sent to the collaborator.
    #[error("invalid argument: {0}")]
    Validation(String),

    /// An unexpected collaborator fault.
    #[error("unexpected fault: {0}")]
    Unknown(String),
}

impl Error {
    /// The kind token for this error.
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::DeviceUnavailable(_) => ErrorKind::DeviceUnavailable,
            Self::Timeout(_) => ErrorKind::Timeout,
            Self::AuthorizationRejected(_) => ErrorKind::AuthorizationRejected,
            Self::VerificationMismatch(_) => ErrorKind::VerificationMismatch,
            Self::NotFound(_) => ErrorKind::NotFound,
            Self::IntegrityMismatch { .. } => ErrorKind::IntegrityMismatch,
            Self::Validation(_) => ErrorKind::Validation,
            Self::Unknown(_) => ErrorKind::Unknown,
        }
    }

    /// Whether the whole logical operation may be retried from idle.
    ///
    /// Only transient link problems qualify. Authorization and verification
    /// failures must be shown to the operator before any further mutation.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::DeviceUnavailable(_) | Self::Timeout(_))
    }
}

/// A fault reported by an external collaborator (USB transport or remote shell).
///
/// Collaborators return this instead of panicking; the engines translate it
/// into [`Error`] at the component boundary.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TransportFault {
    /// The device or channel is gone.
    #[error("disconnected: {0}")]
    Disconnected(String),

    /// The collaborator's own timeout fired.
    #[error("timed out: {0}")]
    TimedOut(String),

    /// The device rejected the authorization value.
    #[error("authorization rejected: {0}")]
    AuthorizationRejected(String),

    /// Anything else.
    #[error("{0}")]
    Other(String),
}

impl From<TransportFault> for Error {
    fn from(fault: TransportFault) -> Self {
        match fault {
            TransportFault::Disconnected(msg) => Error::DeviceUnavailable(msg),
            TransportFault::TimedOut(msg) => Error::Timeout(msg),
            TransportFault::AuthorizationRejected(msg) => Error::AuthorizationRejected(msg),
            TransportFault::Other(msg) => Error::Unknown(msg),
        }
    }
}

/// A specialized `Result` type for this crate.
pub type Result<T> = std::result::Result<T, Error>;
