//! Raw-file I/O: length framing, datagram streams with skip accounting, and
//! atomic output files.

pub mod error;
pub mod frame;
pub mod stream;
pub mod writer;

pub use error::{FrameError, FramingReason, StreamError, WriteError};
pub use frame::{frame_bytes, write_frame, Frame, FrameReader};
pub use stream::{DatagramStream, RecordCounts, SkippedRecord, StreamItem};
pub use writer::{AtomicFile, DatagramWriter};
