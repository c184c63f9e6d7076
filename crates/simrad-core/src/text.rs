//! NME0 (NMEA sentence) and TAG0 (annotation) datagrams.

use crate::cursor::{latin1_decode, strip_nuls, PayloadCursor, PayloadWriter};
use crate::datagram::PayloadBody;
use crate::error::DatagramError;

/// Talker and sentence type from a `$XXYYY,` prefix.
fn split_nmea_prefix(text: &str) -> Option<(&str, &str)> {
    let b = text.as_bytes();
    if b.len() < 7 || b[0] != b'$' || b[6] != b',' {
        return None;
    }
    if !b[1..6].iter().all(|c| c.is_ascii_alphabetic()) {
        return None;
    }
    Some((&text[1..3], &text[3..6]))
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct NmeaSentence {
    pub text: String,
    /// Two-letter talker ID, empty when the prefix is not recognised.
    pub talker: String,
    /// Three-letter sentence type, `UNKNOWN` when the prefix is not recognised.
    pub sentence_type: String,
}

impl NmeaSentence {
    pub fn new(text: impl Into<String>) -> Self {
        let text = text.into();
        let (talker, sentence_type) = match split_nmea_prefix(&text) {
            Some((t, s)) => (t.to_string(), s.to_string()),
            None => (String::new(), "UNKNOWN".to_string()),
        };
        Self {
            text,
            talker,
            sentence_type,
        }
    }
}

impl PayloadBody for NmeaSentence {
    fn decode_body(cur: &mut PayloadCursor<'_>) -> Result<Self, DatagramError> {
        Ok(Self::new(latin1_decode(strip_nuls(cur.rest()))))
    }

    fn encode_body(&self, out: &mut PayloadWriter) -> Result<(), DatagramError> {
        out.put_terminated_text(&self.text);
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct Annotation {
    pub text: String,
}

impl PayloadBody for Annotation {
    fn decode_body(cur: &mut PayloadCursor<'_>) -> Result<Self, DatagramError> {
        Ok(Self {
            text: latin1_decode(strip_nuls(cur.rest())),
        })
    }

    fn encode_body(&self, out: &mut PayloadWriter) -> Result<(), DatagramError> {
        out.put_terminated_text(&self.text);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::datagram::{Datagram, Payload};
    use chrono::NaiveDate;

    fn time() -> chrono::NaiveDateTime {
        NaiveDate::from_ymd_opt(2018, 8, 20)
            .unwrap()
            .and_hms_opt(6, 30, 0)
            .unwrap()
    }

    #[test]
    fn test_nmea_prefix() {
        let s = NmeaSentence::new("$GPGGA,123519,4807.038,N,01131.000,E,1,08,0.9,545.4,M,46.9,M,,*47");
        assert_eq!(s.talker, "GP");
        assert_eq!(s.sentence_type, "GGA");

        let s = NmeaSentence::new("$SD123,xyz");
        assert_eq!(s.talker, "");
        assert_eq!(s.sentence_type, "UNKNOWN");

        let s = NmeaSentence::new("$GP");
        assert_eq!(s.sentence_type, "UNKNOWN");
    }

    #[test]
    fn test_nmea_round_trip() {
        let s = NmeaSentence::new("$INVTG,85.1,T,,M,9.8,N,18.2,K*5C");
        let d = Datagram::new(time(), Payload::Nmea(s.clone()));
        let bytes = d.encode().unwrap();
        assert_eq!((bytes.len() - 12) % 4, 0);
        assert_eq!(Datagram::decode(&bytes, 0).unwrap().payload, Payload::Nmea(s));
    }

    #[test]
    fn test_annotation_latin1() {
        let a = Annotation {
            text: "Début transect 3".into(),
        };
        let d = Datagram::new(time(), Payload::Annotation(a.clone()));
        let back = Datagram::decode(&d.encode().unwrap(), 0).unwrap();
        assert_eq!(back.payload, Payload::Annotation(a));
    }
}
