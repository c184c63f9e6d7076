//! Reads Simrad EK60/EK80 raw files into per-channel ping stores and writes
//! stores back out as raw files.

pub mod ancillary;
pub mod channel;
pub mod demux;
pub mod error;
pub mod options;
pub mod reader;
pub mod writer;

pub use ancillary::{AncillaryData, BottomDetection, BottomLog, FilterLog, MotionColumns, MotionLog, NmeaEntry, NmeaLog};
pub use channel::{
    Channel, ChannelSummary, ConfigurationRecord, FileConfiguration, StoreKey, StoreSummary, INDEX2POWER,
};
pub use demux::{ChannelDemux, Route};
pub use error::RawError;
pub use options::{CorruptTimePolicy, ReadOptions, WriteOptions};
pub use reader::{FileReport, RawReader};
pub use writer::{RawWriter, WriteReport};
