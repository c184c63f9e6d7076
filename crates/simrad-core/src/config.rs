//! Legacy CON0 configuration and CON1 beam configuration datagrams.

use crate::cursor::{PayloadCursor, PayloadWriter};
use crate::datagram::PayloadBody;
use crate::enums::SounderLayout;
use crate::error::DatagramError;
use crate::fields::{self, MBES_EXTRAS_SIZE};

const SPARE0_SIZE: usize = 98;

/// Tables are stored to six decimal digits.
fn round6(x: f32) -> f32 {
    ((x as f64 * 1e6).round() / 1e6) as f32
}

fn round6_table(t: [f32; 5]) -> [f32; 5] {
    t.map(round6)
}

// ─── Transceiver Records ────────────────────────────────────────────────────

/// ER60/ES60 transceiver record.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Er60Transceiver {
    pub channel_id: String,
    pub beam_type: i32,
    pub frequency: f32,
    pub gain: f32,
    pub equivalent_beam_angle: f32,
    pub beamwidth_alongship: f32,
    pub beamwidth_athwartship: f32,
    pub angle_sensitivity_alongship: f32,
    pub angle_sensitivity_athwartship: f32,
    pub angle_offset_alongship: f32,
    pub angle_offset_athwartship: f32,
    pub pos_x: f32,
    pub pos_y: f32,
    pub pos_z: f32,
    pub dir_x: f32,
    pub dir_y: f32,
    pub dir_z: f32,
    pub pulse_length_table: [f32; 5],
    pub spare1: Vec<u8>,
    pub gain_table: [f32; 5],
    pub spare2: Vec<u8>,
    pub sa_correction_table: [f32; 5],
    pub spare3: Vec<u8>,
    pub gpt_software_version: String,
    pub spare4: Vec<u8>,
}

impl Er60Transceiver {
    fn decode(cur: &mut PayloadCursor<'_>) -> Result<Self, DatagramError> {
        Ok(Self {
            channel_id: cur.read_text(128)?,
            beam_type: cur.read_i32()?,
            frequency: cur.read_f32()?,
            gain: cur.read_f32()?,
            equivalent_beam_angle: cur.read_f32()?,
            beamwidth_alongship: cur.read_f32()?,
            beamwidth_athwartship: cur.read_f32()?,
            angle_sensitivity_alongship: cur.read_f32()?,
            angle_sensitivity_athwartship: cur.read_f32()?,
            angle_offset_alongship: cur.read_f32()?,
            angle_offset_athwartship: cur.read_f32()?,
            pos_x: cur.read_f32()?,
            pos_y: cur.read_f32()?,
            pos_z: cur.read_f32()?,
            dir_x: cur.read_f32()?,
            dir_y: cur.read_f32()?,
            dir_z: cur.read_f32()?,
            pulse_length_table: round6_table(cur.read_f32_array()?),
            spare1: cur.read_spare(8)?,
            gain_table: round6_table(cur.read_f32_array()?),
            spare2: cur.read_spare(8)?,
            sa_correction_table: round6_table(cur.read_f32_array()?),
            spare3: cur.read_spare(8)?,
            gpt_software_version: cur.read_text(16)?,
            spare4: cur.read_spare(28)?,
        })
    }

    fn encode(&self, out: &mut PayloadWriter) {
        out.put_text(&self.channel_id, 128);
        out.put_i32(self.beam_type);
        out.put_f32_slice(&[
            self.frequency,
            self.gain,
            self.equivalent_beam_angle,
            self.beamwidth_alongship,
            self.beamwidth_athwartship,
            self.angle_sensitivity_alongship,
            self.angle_sensitivity_athwartship,
            self.angle_offset_alongship,
            self.angle_offset_athwartship,
            self.pos_x,
            self.pos_y,
            self.pos_z,
            self.dir_x,
            self.dir_y,
            self.dir_z,
        ]);
        out.put_f32_slice(&self.pulse_length_table);
        out.put_fixed(&self.spare1, 8);
        out.put_f32_slice(&self.gain_table);
        out.put_fixed(&self.spare2, 8);
        out.put_f32_slice(&self.sa_correction_table);
        out.put_fixed(&self.spare3, 8);
        out.put_text(&self.gpt_software_version, 16);
        out.put_fixed(&self.spare4, 28);
    }
}

/// Multibeam (MBES) transceiver record.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct MbesTransceiver {
    pub channel_id: String,
    pub beam_type: i32,
    pub frequency: f32,
    pub reserved1: f32,
    pub equivalent_beam_angle: f32,
    pub beamwidth_alongship: f32,
    pub beamwidth_athwartship: f32,
    pub angle_sensitivity_alongship: f32,
    pub angle_sensitivity_athwartship: f32,
    pub angle_offset_alongship: f32,
    pub angle_offset_athwartship: f32,
    pub pos_x: f32,
    pub pos_y: f32,
    pub pos_z: f32,
    pub beam_steering_angle_alongship: f32,
    pub beam_steering_angle_athwartship: f32,
    pub beam_steering_angle_unused: f32,
    pub pulse_length: f32,
    pub reserved2: f32,
    pub spare1: Vec<u8>,
    pub gain: f32,
    pub reserved3: f32,
    pub spare2: Vec<u8>,
    pub sa_correction: f32,
    pub reserved4: f32,
    pub spare3: Vec<u8>,
    pub gpt_software_version: String,
    pub spare4: Vec<u8>,
}

impl MbesTransceiver {
    fn decode(cur: &mut PayloadCursor<'_>) -> Result<Self, DatagramError> {
        Ok(Self {
            channel_id: cur.read_text(128)?,
            beam_type: cur.read_i32()?,
            frequency: cur.read_f32()?,
            reserved1: cur.read_f32()?,
            equivalent_beam_angle: cur.read_f32()?,
            beamwidth_alongship: cur.read_f32()?,
            beamwidth_athwartship: cur.read_f32()?,
            angle_sensitivity_alongship: cur.read_f32()?,
            angle_sensitivity_athwartship: cur.read_f32()?,
            angle_offset_alongship: cur.read_f32()?,
            angle_offset_athwartship: cur.read_f32()?,
            pos_x: cur.read_f32()?,
            pos_y: cur.read_f32()?,
            pos_z: cur.read_f32()?,
            beam_steering_angle_alongship: cur.read_f32()?,
            beam_steering_angle_athwartship: cur.read_f32()?,
            beam_steering_angle_unused: cur.read_f32()?,
            pulse_length: cur.read_f32()?,
            reserved2: cur.read_f32()?,
            spare1: cur.read_spare(20)?,
            gain: cur.read_f32()?,
            reserved3: cur.read_f32()?,
            spare2: cur.read_spare(20)?,
            sa_correction: cur.read_f32()?,
            reserved4: cur.read_f32()?,
            spare3: cur.read_spare(20)?,
            gpt_software_version: cur.read_text(16)?,
            spare4: cur.read_spare(28)?,
        })
    }

    fn encode(&self, out: &mut PayloadWriter) {
        out.put_text(&self.channel_id, 128);
        out.put_i32(self.beam_type);
        out.put_f32_slice(&[
            self.frequency,
            self.reserved1,
            self.equivalent_beam_angle,
            self.beamwidth_alongship,
            self.beamwidth_athwartship,
            self.angle_sensitivity_alongship,
            self.angle_sensitivity_athwartship,
            self.angle_offset_alongship,
            self.angle_offset_athwartship,
            self.pos_x,
            self.pos_y,
            self.pos_z,
            self.beam_steering_angle_alongship,
            self.beam_steering_angle_athwartship,
            self.beam_steering_angle_unused,
            self.pulse_length,
            self.reserved2,
        ]);
        out.put_fixed(&self.spare1, 20);
        out.put_f32(self.gain);
        out.put_f32(self.reserved3);
        out.put_fixed(&self.spare2, 20);
        out.put_f32(self.sa_correction);
        out.put_f32(self.reserved4);
        out.put_fixed(&self.spare3, 20);
        out.put_text(&self.gpt_software_version, 16);
        out.put_fixed(&self.spare4, 28);
    }
}

/// One transceiver entry, in the layout chosen by the sounder name.
#[derive(Debug, Clone, PartialEq)]
pub enum Transceiver {
    Er60(Er60Transceiver),
    Mbes(MbesTransceiver),
}

impl Transceiver {
    pub fn layout(&self) -> SounderLayout {
        match self {
            Self::Er60(_) => SounderLayout::Er60,
            Self::Mbes(_) => SounderLayout::Mbes,
        }
    }

    pub fn channel_id(&self) -> &str {
        match self {
            Self::Er60(t) => &t.channel_id,
            Self::Mbes(t) => &t.channel_id,
        }
    }

    pub fn frequency(&self) -> f32 {
        match self {
            Self::Er60(t) => t.frequency,
            Self::Mbes(t) => t.frequency,
        }
    }
}

// ─── CON0 ───────────────────────────────────────────────────────────────────

/// Header values MBES sounders pack into the start of `spare0`.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct MbesExtras {
    pub multiplexing: i16,
    pub time_bias: u32,
    pub sound_velocity_avg: f32,
    pub sound_velocity_transducer: f32,
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct LegacyConfiguration {
    pub survey_name: String,
    pub transect_name: String,
    pub sounder_name: String,
    pub version: String,
    /// Unparsed remainder of the `spare0` field.
    pub spare0: Vec<u8>,
    pub mbes_extras: Option<MbesExtras>,
    /// Transceivers in slot order; slot numbers start at 1.
    pub transceivers: Vec<Transceiver>,
}

impl LegacyConfiguration {
    pub fn layout(&self) -> SounderLayout {
        SounderLayout::resolve(&self.sounder_name)
    }

    /// Channel ID for a 1-based transceiver slot.
    pub fn channel_for_slot(&self, slot: usize) -> Option<&str> {
        slot.checked_sub(1)
            .and_then(|i| self.transceivers.get(i))
            .map(|t| t.channel_id())
    }
}

impl PayloadBody for LegacyConfiguration {
    fn decode_body(cur: &mut PayloadCursor<'_>) -> Result<Self, DatagramError> {
        let survey_name = cur.read_text(128)?;
        let transect_name = cur.read_text(128)?;
        let sounder_name = cur.read_text(128)?;
        let version = cur.read_text(30)?;
        let spare0_raw = cur.read_bytes(SPARE0_SIZE)?;
        let count = cur.read_i32()?;
        if count < 0 {
            return Err(DatagramError::InvalidField {
                field: "transceiver_count",
                value: count as i64,
            });
        }

        let layout = SounderLayout::resolve(&sounder_name);
        let (mbes_extras, spare0) = match layout {
            SounderLayout::Mbes => {
                let mut ex = PayloadCursor::new(&spare0_raw[..MBES_EXTRAS_SIZE]);
                let extras = MbesExtras {
                    multiplexing: ex.read_i16()?,
                    time_bias: ex.read_u32()?,
                    sound_velocity_avg: ex.read_f32()?,
                    sound_velocity_transducer: ex.read_f32()?,
                };
                let rest = crate::cursor::strip_nuls(&spare0_raw[MBES_EXTRAS_SIZE..]);
                (Some(extras), rest.to_vec())
            }
            SounderLayout::Er60 => (None, crate::cursor::strip_nuls(spare0_raw).to_vec()),
        };

        let record_size = fields::transceiver_size(layout);
        let mut transceivers = Vec::with_capacity(count as usize);
        for _ in 0..count {
            cur.require(record_size)?;
            transceivers.push(match layout {
                SounderLayout::Er60 => Transceiver::Er60(Er60Transceiver::decode(cur)?),
                SounderLayout::Mbes => Transceiver::Mbes(MbesTransceiver::decode(cur)?),
            });
        }

        Ok(Self {
            survey_name,
            transect_name,
            sounder_name,
            version,
            spare0,
            mbes_extras,
            transceivers,
        })
    }

    fn encode_body(&self, out: &mut PayloadWriter) -> Result<(), DatagramError> {
        let layout = SounderLayout::resolve(&self.sounder_name);
        if let Some(bad) = self.transceivers.iter().find(|t| t.layout() != layout) {
            return Err(DatagramError::Encode(format!(
                "transceiver {} does not use the {:?} layout of sounder {:?}",
                bad.channel_id(),
                layout,
                self.sounder_name
            )));
        }

        out.put_text(&self.survey_name, 128);
        out.put_text(&self.transect_name, 128);
        out.put_text(&self.sounder_name, 128);
        out.put_text(&self.version, 30);
        match layout {
            SounderLayout::Mbes => {
                let ex = self.mbes_extras.unwrap_or_default();
                out.put_i16(ex.multiplexing);
                out.put_u32(ex.time_bias);
                out.put_f32(ex.sound_velocity_avg);
                out.put_f32(ex.sound_velocity_transducer);
                out.put_fixed(&self.spare0, SPARE0_SIZE - MBES_EXTRAS_SIZE);
            }
            SounderLayout::Er60 => out.put_fixed(&self.spare0, SPARE0_SIZE),
        }
        out.put_i32(self.transceivers.len() as i32);
        for t in &self.transceivers {
            match t {
                Transceiver::Er60(t) => t.encode(out),
                Transceiver::Mbes(t) => t.encode(out),
            }
        }
        Ok(())
    }
}

// ─── CON1 ───────────────────────────────────────────────────────────────────

/// CON1 carries only an XML beam configuration string.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct BeamConfiguration {
    pub beam_config: String,
}

impl PayloadBody for BeamConfiguration {
    fn decode_body(cur: &mut PayloadCursor<'_>) -> Result<Self, DatagramError> {
        let text = crate::cursor::strip_nuls(cur.rest());
        Ok(Self {
            beam_config: String::from_utf8_lossy(text).into_owned(),
        })
    }

    fn encode_body(&self, out: &mut PayloadWriter) -> Result<(), DatagramError> {
        out.put_word_padded(self.beam_config.as_bytes());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::datagram::{Datagram, Payload};
    use chrono::NaiveDate;

    pub(crate) fn sample_er60(channel_id: &str, frequency: f32) -> Er60Transceiver {
        Er60Transceiver {
            channel_id: channel_id.to_string(),
            beam_type: 1,
            frequency,
            gain: 26.5,
            equivalent_beam_angle: -20.7,
            beamwidth_alongship: 7.1,
            beamwidth_athwartship: 7.0,
            angle_sensitivity_alongship: 21.9,
            angle_sensitivity_athwartship: 21.9,
            angle_offset_athwartship: 0.02,
            dir_z: 1.0,
            pulse_length_table: [0.000256, 0.000512, 0.001024, 0.002048, 0.004096],
            gain_table: [24.0, 25.5, 26.5, 26.6, 26.7],
            sa_correction_table: [0.0, -0.7, -0.64, -0.6, -0.58],
            gpt_software_version: "070413".into(),
            ..Default::default()
        }
    }

    fn time() -> chrono::NaiveDateTime {
        NaiveDate::from_ymd_opt(2015, 6, 1)
            .unwrap()
            .and_hms_opt(12, 0, 0)
            .unwrap()
    }

    #[test]
    fn test_er60_round_trip() {
        let cfg = LegacyConfiguration {
            survey_name: "DY1706".into(),
            transect_name: "T01".into(),
            sounder_name: "ER60".into(),
            version: "2.4.3".into(),
            transceivers: vec![
                Transceiver::Er60(sample_er60("GPT  38 kHz 009072033fa5 1 ES38B", 38000.0)),
                Transceiver::Er60(sample_er60("GPT 120 kHz 00907203422d 2 ES120-7", 120000.0)),
            ],
            ..Default::default()
        };
        let d = Datagram::new(time(), Payload::Configuration(cfg.clone()));
        let bytes = d.encode().unwrap();
        assert_eq!(bytes.len(), 528 + 2 * 320);

        let back = Datagram::decode(&bytes, 0).unwrap();
        assert_eq!(back.timestamp, d.timestamp);
        match back.payload {
            Payload::Configuration(c) => {
                assert_eq!(c, cfg);
                assert_eq!(c.channel_for_slot(2), Some("GPT 120 kHz 00907203422d 2 ES120-7"));
                assert_eq!(c.channel_for_slot(0), None);
            }
            other => panic!("unexpected payload {:?}", other),
        }
    }

    #[test]
    fn test_mbes_extras_round_trip() {
        let cfg = LegacyConfiguration {
            sounder_name: "MBES".into(),
            mbes_extras: Some(MbesExtras {
                multiplexing: 2,
                time_bias: 3600,
                sound_velocity_avg: 1494.5,
                sound_velocity_transducer: 1490.0,
            }),
            transceivers: vec![Transceiver::Mbes(MbesTransceiver {
                channel_id: "ME70 beam 1".into(),
                frequency: 70000.0,
                beam_steering_angle_alongship: -12.5,
                pulse_length: 0.001,
                gain: 25.0,
                ..Default::default()
            })],
            ..Default::default()
        };
        let d = Datagram::new(time(), Payload::Configuration(cfg.clone()));
        let back = Datagram::decode(&d.encode().unwrap(), 0).unwrap();
        assert_eq!(back.payload, Payload::Configuration(cfg));
    }

    #[test]
    fn test_layout_mismatch_rejected() {
        let cfg = LegacyConfiguration {
            sounder_name: "ER60".into(),
            transceivers: vec![Transceiver::Mbes(MbesTransceiver::default())],
            ..Default::default()
        };
        let d = Datagram::new(time(), Payload::Configuration(cfg));
        assert!(matches!(d.encode(), Err(DatagramError::Encode(_))));
    }

    #[test]
    fn test_truncated_transceiver() {
        let cfg = LegacyConfiguration {
            sounder_name: "ER60".into(),
            transceivers: vec![Transceiver::Er60(sample_er60("A", 38000.0))],
            ..Default::default()
        };
        let bytes = Datagram::new(time(), Payload::Configuration(cfg))
            .encode()
            .unwrap();
        let cut = &bytes[..bytes.len() - 10];
        assert!(matches!(
            Datagram::decode(cut, 0),
            Err(DatagramError::Truncated { .. })
        ));
    }

    #[test]
    fn test_beam_config_round_trip() {
        let d = Datagram::new(
            time(),
            Payload::BeamConfiguration(BeamConfiguration {
                beam_config: "<BeamConfig><Beam Id=\"1\"/></BeamConfig>".into(),
            }),
        );
        let bytes = d.encode().unwrap();
        assert_eq!(bytes.len() % 4, 0);
        assert_eq!(Datagram::decode(&bytes, 0).unwrap().payload, d.payload);
    }
}
