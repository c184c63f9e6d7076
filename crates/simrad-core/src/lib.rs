//! Simrad EK60/EK80 raw datagram model: NT time codec, header field tables,
//! and symmetric decode/encode for every supported record kind.

pub mod calibration;
pub mod config;
pub mod cursor;
pub mod datagram;
pub mod depth;
pub mod enums;
pub mod error;
pub mod fields;
pub mod filter;
pub mod motion;
pub mod sample;
pub mod text;
pub mod time;
pub mod xml;

pub use calibration::CalibrationParameters;
pub use config::{BeamConfiguration, LegacyConfiguration, MbesExtras, Transceiver};
pub use datagram::{Datagram, Payload};
pub use enums::{ComplexPrecision, DatagramKind, DatagramTag, SampleDataType, SounderLayout};
pub use error::{DatagramError, Severity};
pub use sample::{ComplexSamples, ElectricalAngle, SampleV0, SampleV3};
pub use time::{datetime_to_nt, nt_to_datetime, TimeError};
pub use xml::{ChannelConfiguration, Environment, PingParameters, XmlConfiguration, XmlDatagram};
