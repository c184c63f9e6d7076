//! Stream and file-level errors.

use simrad_core::DatagramError;
use std::io;
use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum FrameError {
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
    #[error("Framing error at byte {offset}: {reason}")]
    Framing { offset: u64, reason: FramingReason },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FramingReason {
    /// The stream ended inside a frame.
    PrematureEof { needed: u64, got: u64 },
    NegativeLength(i32),
    /// Leading and trailing length words disagree.
    LengthMismatch { leading: i32, trailing: i32 },
}

impl std::fmt::Display for FramingReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::PrematureEof { needed, got } => {
                write!(f, "premature end of file, needed {needed} bytes, got {got}")
            }
            Self::NegativeLength(n) => write!(f, "negative frame length {n}"),
            Self::LengthMismatch { leading, trailing } => {
                write!(f, "leading length {leading} does not match trailing length {trailing}")
            }
        }
    }
}

/// Errors that end a datagram stream.
#[derive(Error, Debug)]
pub enum StreamError {
    #[error(transparent)]
    Frame(#[from] FrameError),
    #[error("Datagram at byte {offset}: {source}")]
    Datagram {
        offset: u64,
        #[source]
        source: DatagramError,
    },
}

#[derive(Error, Debug)]
pub enum WriteError {
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
    #[error("Cannot encode datagram: {0}")]
    Encode(#[from] DatagramError),
    #[error("Payload of {0} bytes does not fit a frame")]
    Oversize(usize),
    #[error("Output file already exists: {}", .0.display())]
    OutputExists(PathBuf),
}
