//! Sample datagrams: legacy RAW0 (slot addressed) and EK80 RAW3 (channel-ID
//! addressed, optionally complex).

use crate::cursor::{PayloadCursor, PayloadWriter};
use crate::datagram::PayloadBody;
use crate::enums::{ComplexPrecision, SampleDataType};
use crate::error::DatagramError;
use half::f16;
use num_complex::Complex32;

/// Electrical angle pair, stored on the wire athwartship byte first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ElectricalAngle {
    pub athwartship: i8,
    pub alongship: i8,
}

fn read_angles(cur: &mut PayloadCursor<'_>, n: usize) -> Result<Vec<ElectricalAngle>, DatagramError> {
    let bytes = cur.read_bytes(2 * n)?;
    Ok(bytes
        .chunks_exact(2)
        .map(|c| ElectricalAngle {
            athwartship: c[0] as i8,
            alongship: c[1] as i8,
        })
        .collect())
}

fn write_angles(out: &mut PayloadWriter, angles: &[ElectricalAngle]) {
    for a in angles {
        out.put_i8(a.athwartship);
        out.put_i8(a.alongship);
    }
}

fn read_count(cur: &mut PayloadCursor<'_>) -> Result<usize, DatagramError> {
    let count = cur.read_i32()?;
    if count < 0 {
        return Err(DatagramError::InvalidField {
            field: "count",
            value: count as i64,
        });
    }
    Ok(count as usize)
}

fn check_len(what: &str, got: usize, want: usize) -> Result<(), DatagramError> {
    if got != want {
        return Err(DatagramError::Encode(format!(
            "{what} holds {got} values, sample count is {want}"
        )));
    }
    Ok(())
}

// ─── RAW0 ───────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Default)]
pub struct SampleV0 {
    /// 1-based transceiver slot.
    pub channel: i16,
    /// Bit 0: power present. Bit 1: angles present.
    pub mode: i16,
    pub transducer_depth: f32,
    pub frequency: f32,
    pub transmit_power: f32,
    pub pulse_length: f32,
    pub bandwidth: f32,
    pub sample_interval: f32,
    pub sound_velocity: f32,
    pub absorption_coefficient: f32,
    pub heave: f32,
    pub roll: f32,
    pub pitch: f32,
    pub temperature: f32,
    pub heading: f32,
    pub transmit_mode: i16,
    pub spare0: Vec<u8>,
    pub offset: i32,
    pub count: i32,
    pub power: Option<Vec<i16>>,
    pub angle: Option<Vec<ElectricalAngle>>,
}

impl SampleV0 {
    pub const MODE_POWER: i16 = 0b01;
    pub const MODE_ANGLE: i16 = 0b10;
}

impl PayloadBody for SampleV0 {
    fn decode_body(cur: &mut PayloadCursor<'_>) -> Result<Self, DatagramError> {
        let mut d = Self {
            channel: cur.read_i16()?,
            mode: cur.read_i16()?,
            transducer_depth: cur.read_f32()?,
            frequency: cur.read_f32()?,
            transmit_power: cur.read_f32()?,
            pulse_length: cur.read_f32()?,
            bandwidth: cur.read_f32()?,
            sample_interval: cur.read_f32()?,
            sound_velocity: cur.read_f32()?,
            absorption_coefficient: cur.read_f32()?,
            heave: cur.read_f32()?,
            roll: cur.read_f32()?,
            pitch: cur.read_f32()?,
            temperature: cur.read_f32()?,
            heading: cur.read_f32()?,
            transmit_mode: cur.read_i16()?,
            spare0: cur.read_spare(6)?,
            offset: cur.read_i32()?,
            ..Default::default()
        };
        let count = read_count(cur)?;
        d.count = count as i32;

        if count == 0 {
            d.power = Some(Vec::new());
            d.angle = Some(Vec::new());
            return Ok(d);
        }
        if d.mode & Self::MODE_POWER != 0 {
            d.power = Some(cur.read_i16_vec(count)?);
        }
        if d.mode & Self::MODE_ANGLE != 0 {
            d.angle = Some(read_angles(cur, count)?);
        }
        Ok(d)
    }

    fn encode_body(&self, out: &mut PayloadWriter) -> Result<(), DatagramError> {
        let count = if self.mode == 0 { 0 } else { self.count.max(0) };

        out.put_i16(self.channel);
        out.put_i16(self.mode);
        out.put_f32_slice(&[
            self.transducer_depth,
            self.frequency,
            self.transmit_power,
            self.pulse_length,
            self.bandwidth,
            self.sample_interval,
            self.sound_velocity,
            self.absorption_coefficient,
            self.heave,
            self.roll,
            self.pitch,
            self.temperature,
            self.heading,
        ]);
        out.put_i16(self.transmit_mode);
        out.put_fixed(&self.spare0, 6);
        out.put_i32(self.offset);
        out.put_i32(count);

        if count == 0 {
            return Ok(());
        }
        let n = count as usize;
        if self.mode & Self::MODE_POWER != 0 {
            let power = self.power.as_deref().unwrap_or(&[]);
            check_len("power", power.len(), n)?;
            for &p in power {
                out.put_i16(p);
            }
        }
        if self.mode & Self::MODE_ANGLE != 0 {
            let angle = self.angle.as_deref().unwrap_or(&[]);
            check_len("angle", angle.len(), n)?;
            write_angles(out, angle);
        }
        Ok(())
    }
}

// ─── RAW3 ───────────────────────────────────────────────────────────────────

/// Complex samples, sample-major: `samples[i * n_complex + k]` is sample `i`
/// of receiver sector `k`.
#[derive(Debug, Clone, PartialEq)]
pub struct ComplexSamples {
    pub precision: ComplexPrecision,
    pub n_complex: usize,
    pub samples: Vec<Complex32>,
}

impl ComplexSamples {
    pub fn n_samples(&self) -> usize {
        if self.n_complex == 0 {
            0
        } else {
            self.samples.len() / self.n_complex
        }
    }

    pub fn sample(&self, i: usize, sector: usize) -> Option<Complex32> {
        self.samples.get(i * self.n_complex + sector).copied()
    }
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct SampleV3 {
    pub channel_id: String,
    pub data_type: SampleDataType,
    pub spare: Vec<u8>,
    pub offset: i32,
    pub count: i32,
    pub power: Option<Vec<i16>>,
    pub angle: Option<Vec<ElectricalAngle>>,
    pub complex: Option<ComplexSamples>,
}

impl PayloadBody for SampleV3 {
    fn decode_body(cur: &mut PayloadCursor<'_>) -> Result<Self, DatagramError> {
        let mut d = Self {
            channel_id: cur.read_text(128)?,
            data_type: SampleDataType(cur.read_u16()?),
            spare: cur.read_spare(2)?,
            offset: cur.read_i32()?,
            ..Default::default()
        };
        let count = read_count(cur)?;
        d.count = count as i32;
        let dt = d.data_type;

        if count == 0 {
            d.power = dt.has_power().then(Vec::new);
            d.angle = dt.has_angle().then(Vec::new);
            d.complex = dt.complex_precision().map(|precision| ComplexSamples {
                precision,
                n_complex: dt.n_complex(),
                samples: Vec::new(),
            });
            return Ok(d);
        }

        if dt.has_power() {
            d.power = Some(cur.read_i16_vec(count)?);
        }
        if dt.has_angle() {
            d.angle = Some(read_angles(cur, count)?);
        }
        if let Some(precision) = dt.complex_precision() {
            let n_values = 2 * count * dt.n_complex();
            let components = match precision {
                ComplexPrecision::Float32 => cur.read_f32_vec(n_values)?,
                ComplexPrecision::Float16 => cur
                    .read_u16_vec(n_values)?
                    .into_iter()
                    .map(|b| f16::from_bits(b).to_f32())
                    .collect(),
            };
            d.complex = Some(ComplexSamples {
                precision,
                n_complex: dt.n_complex(),
                samples: components
                    .chunks_exact(2)
                    .map(|c| Complex32::new(c[0], c[1]))
                    .collect(),
            });
        }
        Ok(d)
    }

    fn encode_body(&self, out: &mut PayloadWriter) -> Result<(), DatagramError> {
        let count = self.count.max(0);
        let dt = self.data_type;

        out.put_text(&self.channel_id, 128);
        out.put_u16(dt.0);
        out.put_fixed(&self.spare, 2);
        out.put_i32(self.offset);
        out.put_i32(count);

        if count == 0 {
            return Ok(());
        }
        let n = count as usize;
        if dt.has_power() {
            let power = self.power.as_deref().unwrap_or(&[]);
            check_len("power", power.len(), n)?;
            for &p in power {
                out.put_i16(p);
            }
        }
        if dt.has_angle() {
            let angle = self.angle.as_deref().unwrap_or(&[]);
            check_len("angle", angle.len(), n)?;
            write_angles(out, angle);
        }
        if let Some(precision) = dt.complex_precision() {
            let complex = self
                .complex
                .as_ref()
                .ok_or_else(|| DatagramError::Encode("data_type selects complex samples but none are set".into()))?;
            if complex.precision != precision || complex.n_complex != dt.n_complex() {
                return Err(DatagramError::Encode(format!(
                    "complex samples are {:?} x{}, data_type selects {:?} x{}",
                    complex.precision,
                    complex.n_complex,
                    precision,
                    dt.n_complex()
                )));
            }
            check_len("complex", complex.samples.len(), n * complex.n_complex)?;
            for c in &complex.samples {
                match precision {
                    ComplexPrecision::Float32 => {
                        out.put_f32(c.re);
                        out.put_f32(c.im);
                    }
                    ComplexPrecision::Float16 => {
                        out.put_u16(f16::from_f32(c.re).to_bits());
                        out.put_u16(f16::from_f32(c.im).to_bits());
                    }
                }
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::datagram::{Datagram, Payload};
    use chrono::NaiveDate;

    fn time() -> chrono::NaiveDateTime {
        NaiveDate::from_ymd_opt(2017, 3, 9)
            .unwrap()
            .and_hms_milli_opt(22, 1, 5, 250)
            .unwrap()
    }

    fn roundtrip(p: Payload) -> Payload {
        let bytes = Datagram::new(time(), p).encode().unwrap();
        Datagram::decode(&bytes, 0).unwrap().payload
    }

    #[test]
    fn test_raw0_power_and_angle() {
        let s = SampleV0 {
            channel: 2,
            mode: 3,
            frequency: 38000.0,
            pulse_length: 0.001024,
            sample_interval: 0.000256,
            sound_velocity: 1494.0,
            absorption_coefficient: 0.0098,
            offset: 0,
            count: 4,
            power: Some(vec![1200, -5, 0, 32767]),
            angle: Some(vec![
                ElectricalAngle { athwartship: -3, alongship: 4 },
                ElectricalAngle { athwartship: 127, alongship: -128 },
                ElectricalAngle::default(),
                ElectricalAngle { athwartship: 1, alongship: 1 },
            ]),
            ..Default::default()
        };
        let bytes = Datagram::new(time(), Payload::Sample(s.clone())).encode().unwrap();
        assert_eq!(bytes.len(), 84 + 4 * 2 + 4 * 2);
        assert_eq!(Datagram::decode(&bytes, 0).unwrap().payload, Payload::Sample(s));
    }

    #[test]
    fn test_raw0_mode_zero_drops_count() {
        let s = SampleV0 {
            channel: 1,
            mode: 0,
            count: 10,
            ..Default::default()
        };
        match roundtrip(Payload::Sample(s)) {
            Payload::Sample(back) => {
                assert_eq!(back.count, 0);
                assert_eq!(back.power, Some(vec![]));
                assert_eq!(back.angle, Some(vec![]));
            }
            other => panic!("unexpected payload {:?}", other),
        }
    }

    #[test]
    fn test_raw0_length_mismatch() {
        let s = SampleV0 {
            mode: 1,
            count: 3,
            power: Some(vec![1, 2]),
            ..Default::default()
        };
        assert!(Datagram::new(time(), Payload::Sample(s)).encode().is_err());
    }

    #[test]
    fn test_raw3_power_only() {
        let s = SampleV3 {
            channel_id: "WBT 545612-15 ES38-7_ES".into(),
            data_type: SampleDataType::new(true, false, None),
            count: 3,
            power: Some(vec![10, 20, 30]),
            ..Default::default()
        };
        match roundtrip(Payload::ChannelSample(s)) {
            Payload::ChannelSample(back) => {
                assert_eq!(back.power, Some(vec![10, 20, 30]));
                assert!(back.angle.is_none());
                assert!(back.complex.is_none());
            }
            other => panic!("unexpected payload {:?}", other),
        }
    }

    #[test]
    fn test_raw3_zero_count_gives_empty_arrays() {
        let s = SampleV3 {
            channel_id: "WBT 1".into(),
            data_type: SampleDataType::new(true, false, None),
            count: 0,
            ..Default::default()
        };
        match roundtrip(Payload::ChannelSample(s)) {
            Payload::ChannelSample(back) => {
                assert_eq!(back.power, Some(vec![]));
                assert_eq!(back.angle, None);
                assert!(back.complex.is_none());
            }
            other => panic!("unexpected payload {:?}", other),
        }
    }

    #[test]
    fn test_raw3_complex32() {
        let samples: Vec<Complex32> = (0..8)
            .map(|i| Complex32::new(i as f32 * 0.5, -(i as f32)))
            .collect();
        let s = SampleV3 {
            channel_id: "WBT 2".into(),
            data_type: SampleDataType::new(false, false, Some((ComplexPrecision::Float32, 4))),
            count: 2,
            complex: Some(ComplexSamples {
                precision: ComplexPrecision::Float32,
                n_complex: 4,
                samples,
            }),
            ..Default::default()
        };
        let bytes = Datagram::new(time(), Payload::ChannelSample(s.clone()))
            .encode()
            .unwrap();
        assert_eq!(bytes.len(), 152 + 2 * 4 * 8);
        match Datagram::decode(&bytes, 0).unwrap().payload {
            Payload::ChannelSample(back) => {
                let c = back.complex.clone().unwrap();
                assert_eq!(c.n_samples(), 2);
                assert_eq!(c.sample(1, 2), Some(Complex32::new(3.0, -6.0)));
                assert_eq!(back, s);
            }
            other => panic!("unexpected payload {:?}", other),
        }
    }

    #[test]
    fn test_raw3_complex16_is_half_precision() {
        let s = SampleV3 {
            channel_id: "WBT 3".into(),
            data_type: SampleDataType::new(false, false, Some((ComplexPrecision::Float16, 1))),
            count: 2,
            complex: Some(ComplexSamples {
                precision: ComplexPrecision::Float16,
                n_complex: 1,
                samples: vec![Complex32::new(1.0, -0.25), Complex32::new(0.1, 2048.0)],
            }),
            ..Default::default()
        };
        match roundtrip(Payload::ChannelSample(s)) {
            Payload::ChannelSample(back) => {
                let c = back.complex.unwrap();
                assert_eq!(c.samples[0], Complex32::new(1.0, -0.25));
                assert!((c.samples[1].re - 0.1).abs() < 1e-3);
                assert_eq!(c.samples[1].im, 2048.0);
            }
            other => panic!("unexpected payload {:?}", other),
        }
    }

    #[test]
    fn test_negative_count_rejected() {
        let s = SampleV3 {
            channel_id: "X".into(),
            count: 0,
            ..Default::default()
        };
        let mut bytes = Datagram::new(time(), Payload::ChannelSample(s)).encode().unwrap();
        bytes[148..152].copy_from_slice(&(-1i32).to_le_bytes());
        assert!(matches!(
            Datagram::decode(&bytes, 0),
            Err(DatagramError::InvalidField { field: "count", value: -1 })
        ));
    }
}
