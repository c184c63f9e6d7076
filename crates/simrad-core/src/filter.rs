//! FIL1 receiver filter stage datagram.

use crate::cursor::{PayloadCursor, PayloadWriter};
use crate::datagram::PayloadBody;
use crate::error::DatagramError;
use num_complex::Complex32;

#[derive(Debug, Clone, PartialEq, Default)]
pub struct FilterStage {
    pub stage: i16,
    pub spare: Vec<u8>,
    pub channel_id: String,
    pub decimation_factor: i16,
    pub coefficients: Vec<Complex32>,
}

impl PayloadBody for FilterStage {
    fn decode_body(cur: &mut PayloadCursor<'_>) -> Result<Self, DatagramError> {
        let stage = cur.read_i16()?;
        let spare = cur.read_spare(2)?;
        let channel_id = cur.read_text(128)?;
        let n = cur.read_i16()?;
        if n < 0 {
            return Err(DatagramError::InvalidField {
                field: "n_coefficients",
                value: n as i64,
            });
        }
        let decimation_factor = cur.read_i16()?;
        let coefficients = cur
            .read_f32_vec(2 * n as usize)?
            .chunks_exact(2)
            .map(|c| Complex32::new(c[0], c[1]))
            .collect();
        Ok(Self {
            stage,
            spare,
            channel_id,
            decimation_factor,
            coefficients,
        })
    }

    fn encode_body(&self, out: &mut PayloadWriter) -> Result<(), DatagramError> {
        let n = i16::try_from(self.coefficients.len()).map_err(|_| {
            DatagramError::Encode(format!(
                "{} filter coefficients do not fit the 16-bit count",
                self.coefficients.len()
            ))
        })?;
        out.put_i16(self.stage);
        out.put_fixed(&self.spare, 2);
        out.put_text(&self.channel_id, 128);
        out.put_i16(n);
        out.put_i16(self.decimation_factor);
        for c in &self.coefficients {
            out.put_f32(c.re);
            out.put_f32(c.im);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::datagram::{Datagram, Payload};
    use chrono::NaiveDate;

    #[test]
    fn test_filter_round_trip() {
        let t = NaiveDate::from_ymd_opt(2019, 2, 3)
            .unwrap()
            .and_hms_opt(4, 5, 6)
            .unwrap();
        let p = Payload::Filter(FilterStage {
            stage: 2,
            channel_id: "WBT 545612-15 ES38-7_ES".into(),
            decimation_factor: 8,
            coefficients: vec![Complex32::new(0.25, -0.5), Complex32::new(1.0, 0.0)],
            ..Default::default()
        });
        let bytes = Datagram::new(t, p.clone()).encode().unwrap();
        assert_eq!(bytes.len(), 148 + 16);
        assert_eq!(Datagram::decode(&bytes, 0).unwrap().payload, p);
    }
}
