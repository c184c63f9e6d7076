//! Flat calibration record extracted from a channel's configuration.

use crate::config::Transceiver;
use crate::xml::ChannelConfiguration;
use serde::{Deserialize, Serialize};

/// Relative tolerance used when matching a ping's pulse length to a table entry.
const PULSE_MATCH_TOLERANCE: f64 = 1e-3;

/// Calibration values for one channel at one pulse length.
///
/// Values that vary per ping (absorption, sound velocity) are `None` when the
/// configuration does not carry them; callers take them from the ping series.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct CalibrationParameters {
    pub channel_id: String,
    pub frequency: f64,
    pub pulse_length: Option<f64>,
    pub gain: f64,
    pub sa_correction: f64,
    pub equivalent_beam_angle: f64,
    pub beamwidth_alongship: f64,
    pub beamwidth_athwartship: f64,
    pub angle_sensitivity_alongship: f64,
    pub angle_sensitivity_athwartship: f64,
    pub angle_offset_alongship: f64,
    pub angle_offset_athwartship: f64,
    pub absorption_coefficient: Option<f64>,
    pub sound_velocity: Option<f64>,
    /// Transducer position `(x, y, z)` in metres.
    pub transducer_offset: [f64; 3],
}

fn table_index(table: &[f64], pulse_length: f64) -> Option<usize> {
    table.iter().position(|&p| {
        let scale = p.abs().max(pulse_length.abs()).max(f64::MIN_POSITIVE);
        (p - pulse_length).abs() / scale <= PULSE_MATCH_TOLERANCE
    })
}

impl CalibrationParameters {
    /// From a CON0 transceiver. ER60 gain and sa-correction come from the
    /// five-entry tables at the matching pulse length.
    pub fn from_transceiver(t: &Transceiver, pulse_length: Option<f64>) -> Self {
        match t {
            Transceiver::Er60(x) => {
                let pulses: Vec<f64> = x.pulse_length_table.iter().map(|&v| v as f64).collect();
                let idx = pulse_length.and_then(|p| table_index(&pulses, p));
                let (gain, sa_correction) = match idx {
                    Some(i) => (x.gain_table[i] as f64, x.sa_correction_table[i] as f64),
                    None => {
                        if let Some(p) = pulse_length {
                            log::warn!(
                                "{}: pulse length {} s is not in the transceiver table, using the nominal gain",
                                x.channel_id,
                                p
                            );
                        }
                        (x.gain as f64, 0.0)
                    }
                };
                Self {
                    channel_id: x.channel_id.clone(),
                    frequency: x.frequency as f64,
                    pulse_length,
                    gain,
                    sa_correction,
                    equivalent_beam_angle: x.equivalent_beam_angle as f64,
                    beamwidth_alongship: x.beamwidth_alongship as f64,
                    beamwidth_athwartship: x.beamwidth_athwartship as f64,
                    angle_sensitivity_alongship: x.angle_sensitivity_alongship as f64,
                    angle_sensitivity_athwartship: x.angle_sensitivity_athwartship as f64,
                    angle_offset_alongship: x.angle_offset_alongship as f64,
                    angle_offset_athwartship: x.angle_offset_athwartship as f64,
                    absorption_coefficient: None,
                    sound_velocity: None,
                    transducer_offset: [x.pos_x as f64, x.pos_y as f64, x.pos_z as f64],
                }
            }
            Transceiver::Mbes(x) => Self {
                channel_id: x.channel_id.clone(),
                frequency: x.frequency as f64,
                pulse_length: pulse_length.or(Some(x.pulse_length as f64)),
                gain: x.gain as f64,
                sa_correction: x.sa_correction as f64,
                equivalent_beam_angle: x.equivalent_beam_angle as f64,
                beamwidth_alongship: x.beamwidth_alongship as f64,
                beamwidth_athwartship: x.beamwidth_athwartship as f64,
                angle_sensitivity_alongship: x.angle_sensitivity_alongship as f64,
                angle_sensitivity_athwartship: x.angle_sensitivity_athwartship as f64,
                angle_offset_alongship: x.angle_offset_alongship as f64,
                angle_offset_athwartship: x.angle_offset_athwartship as f64,
                absorption_coefficient: None,
                sound_velocity: None,
                transducer_offset: [x.pos_x as f64, x.pos_y as f64, x.pos_z as f64],
            },
        }
    }

    /// From a flattened XML channel record. Gain and sa-correction arrays are
    /// indexed by the matching `PulseDuration` entry.
    pub fn from_xml_channel(c: &ChannelConfiguration, pulse_length: Option<f64>) -> Self {
        let r = &c.record;
        let pulses = r.f64_list("pulse_duration").unwrap_or_default();
        let idx = pulse_length.and_then(|p| table_index(&pulses, p));
        let pick = |name: &str| -> f64 {
            let values = r.f64_list(name).unwrap_or_default();
            match (idx, values.len()) {
                (_, 0) => 0.0,
                (Some(i), n) if i < n => values[i],
                _ => values[0],
            }
        };
        let get = |name: &str| r.f64(name).unwrap_or(0.0);

        Self {
            channel_id: c.channel_id.clone(),
            frequency: get("transducer_frequency"),
            pulse_length,
            gain: pick("gain"),
            sa_correction: pick("sa_correction"),
            equivalent_beam_angle: get("equivalent_beam_angle"),
            beamwidth_alongship: get("beam_width_alongship"),
            beamwidth_athwartship: get("beam_width_athwartship"),
            angle_sensitivity_alongship: get("angle_sensitivity_alongship"),
            angle_sensitivity_athwartship: get("angle_sensitivity_athwartship"),
            angle_offset_alongship: get("angle_offset_alongship"),
            angle_offset_athwartship: get("angle_offset_athwartship"),
            absorption_coefficient: None,
            sound_velocity: None,
            transducer_offset: [
                get("transducer_offset_x"),
                get("transducer_offset_y"),
                get("transducer_offset_z"),
            ],
        }
    }
}
