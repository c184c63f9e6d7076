use ping_series::{ResampleError, SeriesError};
use simrad_io::{StreamError, WriteError};
use std::io;
use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum RawError {
    #[error("Cannot open {}: {source}", path.display())]
    Open {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error(transparent)]
    Stream(#[from] StreamError),
    #[error(transparent)]
    Write(WriteError),
    #[error(transparent)]
    Series(#[from] SeriesError),
    #[error(transparent)]
    Resample(#[from] ResampleError),
    #[error("Sample datagram for {channel} at byte {offset} precedes its configuration")]
    ConfigurationMissing { channel: String, offset: u64 },
    #[error("Corrupt timestamp at byte {offset}")]
    CorruptTimestamp { offset: u64 },
    #[error("Unknown channel {0}")]
    UnknownChannel(String),
    #[error("Output file already exists: {}", .0.display())]
    OutputExists(PathBuf),
    #[error("Output group {0} has no configuration to write")]
    NoConfiguration(u32),
}

impl From<WriteError> for RawError {
    fn from(e: WriteError) -> Self {
        match e {
            WriteError::OutputExists(path) => Self::OutputExists(path),
            other => Self::Write(other),
        }
    }
}

impl RawError {
    /// Errors that stop reading the current file but keep what was read.
    pub fn is_file_fatal(&self) -> bool {
        matches!(
            self,
            Self::Stream(_) | Self::ConfigurationMissing { .. } | Self::CorruptTimestamp { .. }
        )
    }
}
