//! Ping-indexed sample stores for echosounder channels: growable sample
//! arrays with per-ping attributes, vertical resampling onto a common grid,
//! and ping-time alignment across channels.

pub mod align;
pub mod attributes;
pub mod error;
pub mod processed;
pub mod resample;
pub mod select;
pub mod store;

pub use align::{align_pings, AlignMode, AlignReport, Alignable, ChannelAlignment};
pub use attributes::{PingAttributes, PingHeader, PingValue};
pub use error::{AlignError, ResampleError, SeriesError};
pub use processed::{range_axis, resample_channels, ProcessedSeries, VerticalAxis};
pub use resample::{resample_rows, ResampleInterval, Resampled, SampleDomain, SampleField};
pub use select::{merge_positions, MatchReport, PingSelection, TimePrecision};
pub use store::{InsertAt, PingSamples, PingSeries, SampleKind, FREQUENCY_TOLERANCE};
