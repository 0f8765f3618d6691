//! Error types for the a7p-core library.
//!
//! Every failure the engine can surface is a variant of [`Error`]. The
//! variants follow the archive lifecycle: container format, schema decode,
//! checksum, validation and recovery.

use crate::archive::{Checksum, StoredChecksum};
use crate::validate::Violation;
use thiserror::Error;

/// Result type alias for a7p operations
pub type Result<T> = std::result::Result<T, Error>;

/// Comprehensive error type for all a7p operations
#[derive(Error, Debug)]
#[non_exhaustive]
pub enum Error {
    /// The byte stream is not a valid archive container
    #[error("malformed archive: {details}")]
    ArchiveFormat {
        /// Detailed description of the issue
        details: String,
    },

    /// The payload violates protobuf framing rules
    #[error("invalid protobuf wire format at offset {offset}: {details}")]
    InvalidWireFormat {
        /// Byte offset where the error occurred
        offset: usize,
        /// Detailed description of the issue
        details: String,
    },

    /// prost rejected the payload
    #[error("failed to decode profile payload: {0}")]
    SchemaDecode(#[from] prost::DecodeError),

    /// Stored checksum does not match the payload
    #[error("checksum mismatch: stored {stored}, computed {computed}")]
    ChecksumMismatch {
        /// Checksum carried by the archive
        stored: StoredChecksum,
        /// Checksum of the payload bytes as read
        computed: Checksum,
    },

    /// One or more error-severity violations
    #[error("validation failed with {} violation(s)", .0.len())]
    Validation(Vec<Violation>),

    /// The recovery engine ran out of correction strategies
    #[error("unrecoverable profile: {reason}")]
    Unrecoverable {
        /// Why recovery gave up
        reason: String,
        /// Violations still outstanding when recovery stopped
        violations: Vec<Violation>,
    },

    /// The requested zero distance cannot be resolved
    #[error("invalid zero distance: {details}")]
    ZeroDistance {
        /// Detailed description of the issue
        details: String,
    },

    /// Generic internal error
    #[error("internal error: {0}")]
    Internal(String),
}

impl Error {
    /// Creates a new archive format error
    pub fn archive_format(details: impl Into<String>) -> Self {
        Self::ArchiveFormat {
            details: details.into(),
        }
    }

    /// Creates a new wire format error
    pub fn invalid_wire_format(offset: usize, details: impl Into<String>) -> Self {
        Self::InvalidWireFormat {
            offset,
            details: details.into(),
        }
    }

    /// Creates a new unrecoverable error
    pub fn unrecoverable(reason: impl Into<String>, violations: Vec<Violation>) -> Self {
        Self::Unrecoverable {
            reason: reason.into(),
            violations,
        }
    }

    /// Creates a new zero distance error
    pub fn zero_distance(details: impl Into<String>) -> Self {
        Self::ZeroDistance {
            details: details.into(),
        }
    }

    /// Creates a new internal error
    pub fn internal(msg: impl Into<String>) -> Self {
        Self::Internal(msg.into())
    }

    /// Returns true if the recovery engine may be able to repair this failure
    pub fn is_recoverable(&self) -> bool {
        matches!(self, Self::ChecksumMismatch { .. } | Self::Validation(_))
    }

    /// Returns true if the failure happened while decoding the payload
    pub fn is_decode_error(&self) -> bool {
        matches!(self, Self::SchemaDecode(_) | Self::InvalidWireFormat { .. })
    }

    /// Violations attached to this error, if any
    pub fn violations(&self) -> &[Violation] {
        match self {
            Self::Validation(violations) | Self::Unrecoverable { violations, .. } => violations,
            _ => &[],
        }
    }
}
