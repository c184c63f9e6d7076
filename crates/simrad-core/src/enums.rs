//! Datagram kinds, version tags, sounder layouts, and sample data-type bits.

use crate::error::DatagramError;
use serde::{Deserialize, Serialize};
use std::fmt;

// ─── Datagram Kind ──────────────────────────────────────────────────────────

/// The three-letter record kind at the start of every payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum DatagramKind {
    Con,
    Raw,
    Nme,
    Tag,
    Dep,
    Bot,
    Mru,
    Fil,
    Xml,
}

impl DatagramKind {
    pub const ALL: [Self; 9] = [
        Self::Con,
        Self::Raw,
        Self::Nme,
        Self::Tag,
        Self::Dep,
        Self::Bot,
        Self::Mru,
        Self::Fil,
        Self::Xml,
    ];

    pub fn from_bytes(b: &[u8]) -> Option<Self> {
        match b {
            b"CON" => Some(Self::Con),
            b"RAW" => Some(Self::Raw),
            b"NME" => Some(Self::Nme),
            b"TAG" => Some(Self::Tag),
            b"DEP" => Some(Self::Dep),
            b"BOT" => Some(Self::Bot),
            b"MRU" => Some(Self::Mru),
            b"FIL" => Some(Self::Fil),
            b"XML" => Some(Self::Xml),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Con => "CON",
            Self::Raw => "RAW",
            Self::Nme => "NME",
            Self::Tag => "TAG",
            Self::Dep => "DEP",
            Self::Bot => "BOT",
            Self::Mru => "MRU",
            Self::Fil => "FIL",
            Self::Xml => "XML",
        }
    }
}

impl fmt::Display for DatagramKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ─── Datagram Tag ───────────────────────────────────────────────────────────

/// Kind plus version digit, e.g. `RAW3`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct DatagramTag {
    pub kind: DatagramKind,
    pub version: u8,
}

impl DatagramTag {
    pub const fn new(kind: DatagramKind, version: u8) -> Self {
        Self { kind, version }
    }

    /// Parse the leading 4 bytes of a payload.
    pub fn parse(payload: &[u8]) -> Result<Self, DatagramError> {
        if payload.len() < 4 {
            return Err(DatagramError::Truncated {
                offset: 0,
                needed: 4,
                available: payload.len(),
            });
        }
        let kind = DatagramKind::from_bytes(&payload[..3]).ok_or_else(|| {
            DatagramError::UnknownKind(String::from_utf8_lossy(&payload[..4]).into_owned())
        })?;
        let digit = payload[3];
        if !digit.is_ascii_digit() {
            return Err(DatagramError::UnsupportedVersion {
                kind,
                version: digit as char,
            });
        }
        Ok(Self {
            kind,
            version: digit - b'0',
        })
    }

    pub fn to_bytes(&self) -> [u8; 4] {
        let k = self.kind.as_str().as_bytes();
        [k[0], k[1], k[2], b'0' + self.version]
    }
}

impl fmt::Display for DatagramTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", self.kind, self.version)
    }
}

// ─── Sounder Layout (CON0) ──────────────────────────────────────────────────

/// Per-transceiver record layout selected by the CON0 `sounder_name`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SounderLayout {
    /// ER60 and ES60 transceiver records.
    Er60,
    /// Multibeam (ME70) records with beam-steering angles.
    Mbes,
}

impl SounderLayout {
    pub fn from_sounder_name(name: &str) -> Option<Self> {
        match name.trim() {
            "ER60" | "ES60" => Some(Self::Er60),
            "MBES" => Some(Self::Mbes),
            _ => None,
        }
    }

    /// Resolve a layout, falling back to ER60 for unknown sounders.
    pub fn resolve(name: &str) -> Self {
        Self::from_sounder_name(name).unwrap_or_else(|| {
            log::warn!(
                "Unknown sounder_name {:?}, decoding transceivers with the ER60 layout",
                name
            );
            Self::Er60
        })
    }
}

// ─── Complex Precision (RAW3) ───────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ComplexPrecision {
    Float16,
    Float32,
}

impl ComplexPrecision {
    pub fn bytes_per_component(&self) -> usize {
        match self {
            Self::Float16 => 2,
            Self::Float32 => 4,
        }
    }
}

// ─── Sample Data Type (RAW3) ────────────────────────────────────────────────

/// RAW3 `data_type` bitmask. Low nibble selects the arrays present; the high
/// byte holds the number of complex components per sample.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct SampleDataType(pub u16);

impl SampleDataType {
    pub const POWER: u16 = 0b0001;
    pub const ANGLE: u16 = 0b0010;
    pub const COMPLEX_16: u16 = 0b0100;
    pub const COMPLEX_32: u16 = 0b1000;

    pub fn new(power: bool, angle: bool, complex: Option<(ComplexPrecision, u8)>) -> Self {
        let mut bits = 0u16;
        if power {
            bits |= Self::POWER;
        }
        if angle {
            bits |= Self::ANGLE;
        }
        if let Some((precision, n_complex)) = complex {
            bits |= match precision {
                ComplexPrecision::Float16 => Self::COMPLEX_16,
                ComplexPrecision::Float32 => Self::COMPLEX_32,
            };
            bits |= (n_complex as u16) << 8;
        }
        Self(bits)
    }

    pub fn has_power(&self) -> bool {
        self.0 & Self::POWER != 0
    }

    pub fn has_angle(&self) -> bool {
        self.0 & Self::ANGLE != 0
    }

    pub fn n_complex(&self) -> usize {
        (self.0 >> 8) as usize
    }

    /// Component precision when complex samples are present.
    pub fn complex_precision(&self) -> Option<ComplexPrecision> {
        if self.n_complex() == 0 {
            None
        } else if self.0 & Self::COMPLEX_32 != 0 {
            Some(ComplexPrecision::Float32)
        } else {
            Some(ComplexPrecision::Float16)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_tag() {
        let tag = DatagramTag::parse(b"RAW3....").unwrap();
        assert_eq!(tag, DatagramTag::new(DatagramKind::Raw, 3));
        assert_eq!(&tag.to_bytes(), b"RAW3");
        assert_eq!(tag.to_string(), "RAW3");
    }

    #[test]
    fn test_unknown_kind() {
        assert!(matches!(
            DatagramTag::parse(b"IDX0"),
            Err(DatagramError::UnknownKind(s)) if s == "IDX0"
        ));
    }

    #[test]
    fn test_non_digit_version() {
        assert!(matches!(
            DatagramTag::parse(b"CONX"),
            Err(DatagramError::UnsupportedVersion { kind: DatagramKind::Con, version: 'X' })
        ));
    }

    #[test]
    fn test_sounder_fallback() {
        assert_eq!(SounderLayout::resolve("ES60"), SounderLayout::Er60);
        assert_eq!(SounderLayout::resolve("MBES"), SounderLayout::Mbes);
        assert_eq!(SounderLayout::resolve("EK500"), SounderLayout::Er60);
        assert_eq!(SounderLayout::from_sounder_name("EK500"), None);
    }

    #[test]
    fn test_data_type_bits() {
        let dt = SampleDataType::new(false, false, Some((ComplexPrecision::Float32, 4)));
        assert_eq!(dt.0, 0x0408);
        assert_eq!(dt.n_complex(), 4);
        assert_eq!(dt.complex_precision(), Some(ComplexPrecision::Float32));
        assert!(!dt.has_power());

        let dt = SampleDataType(0b0001);
        assert!(dt.has_power());
        assert!(!dt.has_angle());
        assert_eq!(dt.complex_precision(), None);
    }
}
