//! Datagram stream over framed input, applying the record skip policy.

use crate::error::StreamError;
use crate::frame::FrameReader;
use serde::{Deserialize, Serialize};
use simrad_core::{Datagram, DatagramError, Severity};
use std::collections::BTreeMap;
use std::io::Read;

/// Per-stream record counts.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RecordCounts {
    pub frames: u64,
    pub decoded: u64,
    /// Unknown kind tags and how often each was seen.
    pub unknown_kinds: BTreeMap<String, u64>,
    pub unsupported_versions: u64,
    /// Records dropped for other recoverable reasons (bad XML, bad time, bad field).
    pub skipped: u64,
    /// Records that ended the stream.
    pub fatal: u64,
}

impl RecordCounts {
    pub fn unknown_total(&self) -> u64 {
        self.unknown_kinds.values().sum()
    }

    fn record_skip(&mut self, err: &DatagramError) {
        match err {
            DatagramError::UnknownKind(tag) => {
                *self.unknown_kinds.entry(tag.clone()).or_default() += 1;
            }
            DatagramError::UnsupportedVersion { .. } => self.unsupported_versions += 1,
            _ => self.skipped += 1,
        }
    }
}

/// A record that could not be decoded but did not end the stream.
#[derive(Debug)]
pub struct SkippedRecord {
    pub offset: u64,
    pub error: DatagramError,
}

#[derive(Debug)]
pub enum StreamItem {
    Datagram(Datagram),
    Skipped(SkippedRecord),
}

pub struct DatagramStream<R: Read> {
    frames: FrameReader<R>,
    counts: RecordCounts,
    done: bool,
}

impl<R: Read> DatagramStream<R> {
    pub fn new(reader: R) -> Self {
        Self {
            frames: FrameReader::new(reader),
            counts: RecordCounts::default(),
            done: false,
        }
    }

    pub fn counts(&self) -> &RecordCounts {
        &self.counts
    }

    pub fn into_counts(self) -> RecordCounts {
        self.counts
    }

    pub fn position(&self) -> u64 {
        self.frames.position()
    }

    /// Next datagram or skipped record. A returned error ends the stream;
    /// later calls return `Ok(None)`.
    pub fn next_item(&mut self) -> Result<Option<StreamItem>, StreamError> {
        if self.done {
            return Ok(None);
        }
        let frame = match self.frames.read_next() {
            Ok(Some(f)) => f,
            Ok(None) => {
                self.done = true;
                return Ok(None);
            }
            Err(e) => return Err(self.fail(e.into())),
        };
        self.counts.frames += 1;

        match Datagram::decode(&frame.payload, frame.offset) {
            Ok(d) => {
                self.counts.decoded += 1;
                log::debug!("{} at byte {}", d.tag(), frame.offset);
                Ok(Some(StreamItem::Datagram(d)))
            }
            Err(error) => match error.severity() {
                Severity::SkipRecord => {
                    match &error {
                        DatagramError::UnknownKind(tag) => {
                            log::debug!("Skipping unknown datagram {:?} at byte {}", tag, frame.offset)
                        }
                        other => log::warn!("Skipping datagram at byte {}: {}", frame.offset, other),
                    }
                    self.counts.record_skip(&error);
                    Ok(Some(StreamItem::Skipped(SkippedRecord {
                        offset: frame.offset,
                        error,
                    })))
                }
                Severity::AbortFile => Err(self.fail(StreamError::Datagram {
                    offset: frame.offset,
                    source: error,
                })),
            },
        }
    }

    fn fail(&mut self, e: StreamError) -> StreamError {
        self.done = true;
        self.counts.fatal += 1;
        e
    }
}

impl<R: Read> Iterator for DatagramStream<R> {
    type Item = Result<StreamItem, StreamError>;

    fn next(&mut self) -> Option<Self::Item> {
        self.next_item().transpose()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::frame::write_frame;
    use chrono::NaiveDate;
    use simrad_core::motion::Motion;
    use simrad_core::text::Annotation;
    use simrad_core::Payload;
    use std::io::Cursor;

    fn time() -> chrono::NaiveDateTime {
        NaiveDate::from_ymd_opt(2021, 4, 5)
            .unwrap()
            .and_hms_opt(6, 7, 8)
            .unwrap()
    }

    fn encoded(p: Payload) -> Vec<u8> {
        Datagram::new(time(), p).encode().unwrap()
    }

    #[test]
    fn test_unknown_kind_is_skipped_and_counted() {
        let mut buf = Vec::new();
        write_frame(&mut buf, &encoded(Payload::Annotation(Annotation { text: "start".into() }))).unwrap();
        write_frame(&mut buf, b"IDX0\0\0\0\0\0\0\0\0").unwrap();
        write_frame(&mut buf, b"IDX0\0\0\0\0\0\0\0\0").unwrap();
        write_frame(&mut buf, &encoded(Payload::Motion(Motion::default()))).unwrap();

        let mut s = DatagramStream::new(Cursor::new(buf));
        let items: Vec<_> = s.by_ref().collect::<Result<_, _>>().unwrap();
        assert_eq!(items.len(), 4);
        assert!(matches!(items[1], StreamItem::Skipped(_)));
        assert!(matches!(&items[3], StreamItem::Datagram(d) if d.tag().to_string() == "MRU0"));
        assert_eq!(s.counts().decoded, 2);
        assert_eq!(s.counts().unknown_kinds.get("IDX0"), Some(&2));
        assert_eq!(s.counts().unknown_total(), 2);
    }

    #[test]
    fn test_truncated_payload_aborts() {
        let mut buf = Vec::new();
        write_frame(&mut buf, b"MRU0\0\0\0\0\0\0\0\0\0\0").unwrap();
        write_frame(&mut buf, &encoded(Payload::Motion(Motion::default()))).unwrap();

        let mut s = DatagramStream::new(Cursor::new(buf));
        assert!(matches!(
            s.next_item(),
            Err(StreamError::Datagram {
                source: DatagramError::Truncated { .. },
                ..
            })
        ));
        assert!(s.next_item().unwrap().is_none());
        assert_eq!(s.counts().fatal, 1);
    }

    #[test]
    fn test_unsupported_version_skipped() {
        let mut buf = Vec::new();
        write_frame(&mut buf, b"RAW7\0\0\0\0\0\0\0\0").unwrap();
        let mut s = DatagramStream::new(Cursor::new(buf));
        assert!(matches!(s.next_item().unwrap(), Some(StreamItem::Skipped(_))));
        assert_eq!(s.counts().unsupported_versions, 1);
    }
}
