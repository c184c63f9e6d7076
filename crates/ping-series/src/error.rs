use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum SeriesError {
    #[error("Incompatible channel data: {0}")]
    IncompatibleChannelData(String),
    #[error("Ping index {index} out of range for {n_pings} pings")]
    IndexOutOfRange { index: usize, n_pings: usize },
    #[error("Shape mismatch: {0}")]
    ShapeMismatch(String),
}

#[derive(Error, Debug, Clone, PartialEq)]
pub enum ResampleError {
    #[error("No pings selected")]
    Empty,
    #[error("Invalid sample interval {0}")]
    InvalidInterval(f64),
    #[error("Series has no {0} data")]
    MissingField(&'static str),
    #[error(transparent)]
    Series(#[from] SeriesError),
}

#[derive(Error, Debug, Clone, PartialEq)]
pub enum AlignError {
    #[error("No channels to align")]
    NoChannels,
    #[error("Cannot pad {0}: padding a multi-frequency composite corrupts the combined values")]
    PadComposite(String),
    #[error(transparent)]
    Series(#[from] SeriesError),
}
