//! Datagram envelope: tag, NT timestamp, and the kind-specific payload.

use crate::config::{BeamConfiguration, LegacyConfiguration};
use crate::cursor::{PayloadCursor, PayloadWriter};
use crate::depth::{BottomDepths, DepthDetections};
use crate::enums::{DatagramKind, DatagramTag};
use crate::error::DatagramError;
use crate::fields;
use crate::filter::FilterStage;
use crate::motion::Motion;
use crate::sample::{SampleV0, SampleV3};
use crate::text::{Annotation, NmeaSentence};
use crate::time::{datetime_to_nt, nt_to_datetime};
use crate::xml::XmlDatagram;
use chrono::NaiveDateTime;

/// Decode/encode of everything after the 12-byte type and time prefix.
pub trait PayloadBody: Sized {
    fn decode_body(cur: &mut PayloadCursor<'_>) -> Result<Self, DatagramError>;
    fn encode_body(&self, out: &mut PayloadWriter) -> Result<(), DatagramError>;
}

#[derive(Debug, Clone, PartialEq)]
pub enum Payload {
    /// CON0
    Configuration(LegacyConfiguration),
    /// CON1
    BeamConfiguration(BeamConfiguration),
    /// RAW0
    Sample(SampleV0),
    /// RAW3
    ChannelSample(SampleV3),
    /// NME0
    Nmea(NmeaSentence),
    /// TAG0
    Annotation(Annotation),
    /// DEP0
    Depth(DepthDetections),
    /// BOT0
    Bottom(BottomDepths),
    /// MRU0
    Motion(Motion),
    /// FIL1
    Filter(FilterStage),
    /// XML0
    Xml(XmlDatagram),
}

impl Payload {
    pub fn tag(&self) -> DatagramTag {
        let (kind, version) = match self {
            Self::Configuration(_) => (DatagramKind::Con, 0),
            Self::BeamConfiguration(_) => (DatagramKind::Con, 1),
            Self::Sample(_) => (DatagramKind::Raw, 0),
            Self::ChannelSample(_) => (DatagramKind::Raw, 3),
            Self::Nmea(_) => (DatagramKind::Nme, 0),
            Self::Annotation(_) => (DatagramKind::Tag, 0),
            Self::Depth(_) => (DatagramKind::Dep, 0),
            Self::Bottom(_) => (DatagramKind::Bot, 0),
            Self::Motion(_) => (DatagramKind::Mru, 0),
            Self::Filter(_) => (DatagramKind::Fil, 1),
            Self::Xml(_) => (DatagramKind::Xml, 0),
        };
        DatagramTag::new(kind, version)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Datagram {
    pub timestamp: NaiveDateTime,
    /// Byte offset of the frame in its source file (0 for constructed datagrams).
    pub file_offset: u64,
    pub payload: Payload,
}

impl Datagram {
    pub fn new(timestamp: NaiveDateTime, payload: Payload) -> Self {
        Self {
            timestamp,
            file_offset: 0,
            payload,
        }
    }

    pub fn tag(&self) -> DatagramTag {
        self.payload.tag()
    }

    pub fn kind(&self) -> DatagramKind {
        self.payload.tag().kind
    }

    /// Decode one frame payload read at `file_offset`.
    pub fn decode(bytes: &[u8], file_offset: u64) -> Result<Self, DatagramError> {
        let tag = DatagramTag::parse(bytes)?;
        let header_size =
            fields::header_size(tag.kind, tag.version).ok_or(DatagramError::UnsupportedVersion {
                kind: tag.kind,
                version: (b'0' + tag.version) as char,
            })?;

        let mut cur = PayloadCursor::new(bytes);
        cur.require(header_size)?;
        cur.skip(4)?;
        let low = cur.read_u32()?;
        let high = cur.read_u32()?;
        let timestamp = nt_to_datetime(low, high)?;

        let payload = match (tag.kind, tag.version) {
            (DatagramKind::Con, 0) => Payload::Configuration(PayloadBody::decode_body(&mut cur)?),
            (DatagramKind::Con, 1) => {
                Payload::BeamConfiguration(PayloadBody::decode_body(&mut cur)?)
            }
            (DatagramKind::Raw, 0) => Payload::Sample(PayloadBody::decode_body(&mut cur)?),
            (DatagramKind::Raw, 3) => Payload::ChannelSample(PayloadBody::decode_body(&mut cur)?),
            (DatagramKind::Nme, 0) => Payload::Nmea(PayloadBody::decode_body(&mut cur)?),
            (DatagramKind::Tag, 0) => Payload::Annotation(PayloadBody::decode_body(&mut cur)?),
            (DatagramKind::Dep, 0) => Payload::Depth(PayloadBody::decode_body(&mut cur)?),
            (DatagramKind::Bot, 0) => Payload::Bottom(PayloadBody::decode_body(&mut cur)?),
            (DatagramKind::Mru, 0) => Payload::Motion(PayloadBody::decode_body(&mut cur)?),
            (DatagramKind::Fil, 1) => Payload::Filter(PayloadBody::decode_body(&mut cur)?),
            (DatagramKind::Xml, 0) => Payload::Xml(PayloadBody::decode_body(&mut cur)?),
            _ => {
                return Err(DatagramError::UnsupportedVersion {
                    kind: tag.kind,
                    version: (b'0' + tag.version) as char,
                })
            }
        };

        Ok(Self {
            timestamp,
            file_offset,
            payload,
        })
    }

    /// Encode to payload bytes (without the frame length words).
    pub fn encode(&self) -> Result<Vec<u8>, DatagramError> {
        let tag = self.tag();
        let (low, high) = datetime_to_nt(&self.timestamp)?;
        let mut out = PayloadWriter::with_capacity(fields::header_size(tag.kind, tag.version).unwrap_or(12));
        out.put_bytes(&tag.to_bytes());
        out.put_u32(low);
        out.put_u32(high);
        match &self.payload {
            Payload::Configuration(p) => p.encode_body(&mut out)?,
            Payload::BeamConfiguration(p) => p.encode_body(&mut out)?,
            Payload::Sample(p) => p.encode_body(&mut out)?,
            Payload::ChannelSample(p) => p.encode_body(&mut out)?,
            Payload::Nmea(p) => p.encode_body(&mut out)?,
            Payload::Annotation(p) => p.encode_body(&mut out)?,
            Payload::Depth(p) => p.encode_body(&mut out)?,
            Payload::Bottom(p) => p.encode_body(&mut out)?,
            Payload::Motion(p) => p.encode_body(&mut out)?,
            Payload::Filter(p) => p.encode_body(&mut out)?,
            Payload::Xml(p) => p.encode_body(&mut out)?,
        }
        Ok(out.into_inner())
    }
}
