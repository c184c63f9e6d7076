//! Datagram-level error taxonomy.

use crate::enums::DatagramKind;
use crate::time::TimeError;
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum DatagramError {
    #[error("Unknown datagram kind {0:?}")]
    UnknownKind(String),
    #[error("Unsupported {kind} datagram version {version:?}")]
    UnsupportedVersion { kind: DatagramKind, version: char },
    #[error("Payload truncated at byte {offset}: need {needed} bytes, {available} available")]
    Truncated {
        offset: usize,
        needed: usize,
        available: usize,
    },
    #[error("Invalid value {value} for field {field}")]
    InvalidField { field: &'static str, value: i64 },
    #[error("Corrupt timestamp: {0}")]
    CorruptTimestamp(#[from] TimeError),
    #[error("XML error: {0}")]
    Xml(String),
    #[error("Cannot encode datagram: {0}")]
    Encode(String),
}

/// How a stream reader should treat a record that failed to decode.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    /// Drop the record, count it, and keep reading the stream.
    SkipRecord,
    /// The stream position can no longer be trusted.
    AbortFile,
}

impl DatagramError {
    pub fn severity(&self) -> Severity {
        match self {
            Self::UnknownKind(_)
            | Self::UnsupportedVersion { .. }
            | Self::InvalidField { .. }
            | Self::CorruptTimestamp(_)
            | Self::Xml(_) => Severity::SkipRecord,
            Self::Truncated { .. } | Self::Encode(_) => Severity::AbortFile,
        }
    }
}
