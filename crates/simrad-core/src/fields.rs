//! Declarative header layouts. Each supported kind/version lists its fixed
//! fields in wire order so the header size is known before any variable tail
//! is read.

use crate::enums::{DatagramKind, SounderLayout};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldType {
    /// Fixed-width NUL-padded text or spare bytes.
    Char(usize),
    I16,
    I32,
    U32,
    F32,
    F64,
    F32Array(usize),
}

impl FieldType {
    pub const fn size(&self) -> usize {
        match self {
            Self::Char(n) => *n,
            Self::I16 => 2,
            Self::I32 | Self::U32 | Self::F32 => 4,
            Self::F64 => 8,
            Self::F32Array(n) => 4 * *n,
        }
    }
}

pub type FieldSpec = (&'static str, FieldType);

use FieldType::*;

// ─── Header Tables ──────────────────────────────────────────────────────────

pub const PREFIX_FIELDS: &[FieldSpec] = &[
    ("type", Char(4)),
    ("low_date", U32),
    ("high_date", U32),
];

pub const CON0_FIELDS: &[FieldSpec] = &[
    ("type", Char(4)),
    ("low_date", U32),
    ("high_date", U32),
    ("survey_name", Char(128)),
    ("transect_name", Char(128)),
    ("sounder_name", Char(128)),
    ("version", Char(30)),
    ("spare0", Char(98)),
    ("transceiver_count", I32),
];

pub const RAW0_FIELDS: &[FieldSpec] = &[
    ("type", Char(4)),
    ("low_date", U32),
    ("high_date", U32),
    ("channel", I16),
    ("mode", I16),
    ("transducer_depth", F32),
    ("frequency", F32),
    ("transmit_power", F32),
    ("pulse_length", F32),
    ("bandwidth", F32),
    ("sample_interval", F32),
    ("sound_velocity", F32),
    ("absorption_coefficient", F32),
    ("heave", F32),
    ("roll", F32),
    ("pitch", F32),
    ("temperature", F32),
    ("heading", F32),
    ("transmit_mode", I16),
    ("spare0", Char(6)),
    ("offset", I32),
    ("count", I32),
];

pub const RAW3_FIELDS: &[FieldSpec] = &[
    ("type", Char(4)),
    ("low_date", U32),
    ("high_date", U32),
    ("channel_id", Char(128)),
    ("data_type", I16),
    ("spare", Char(2)),
    ("offset", I32),
    ("count", I32),
];

pub const TRANSCEIVER_COUNT_FIELDS: &[FieldSpec] = &[
    ("type", Char(4)),
    ("low_date", U32),
    ("high_date", U32),
    ("transceiver_count", U32),
];

pub const MRU0_FIELDS: &[FieldSpec] = &[
    ("type", Char(4)),
    ("low_date", U32),
    ("high_date", U32),
    ("heave", F32),
    ("roll", F32),
    ("pitch", F32),
    ("heading", F32),
];

pub const FIL1_FIELDS: &[FieldSpec] = &[
    ("type", Char(4)),
    ("low_date", U32),
    ("high_date", U32),
    ("stage", I16),
    ("spare", Char(2)),
    ("channel_id", Char(128)),
    ("n_coefficients", I16),
    ("decimation_factor", I16),
];

// ─── CON0 Transceiver Records ───────────────────────────────────────────────

pub const ER60_TRANSCEIVER_FIELDS: &[FieldSpec] = &[
    ("channel_id", Char(128)),
    ("beam_type", I32),
    ("frequency", F32),
    ("gain", F32),
    ("equivalent_beam_angle", F32),
    ("beamwidth_alongship", F32),
    ("beamwidth_athwartship", F32),
    ("angle_sensitivity_alongship", F32),
    ("angle_sensitivity_athwartship", F32),
    ("angle_offset_alongship", F32),
    ("angle_offset_athwartship", F32),
    ("pos_x", F32),
    ("pos_y", F32),
    ("pos_z", F32),
    ("dir_x", F32),
    ("dir_y", F32),
    ("dir_z", F32),
    ("pulse_length_table", F32Array(5)),
    ("spare1", Char(8)),
    ("gain_table", F32Array(5)),
    ("spare2", Char(8)),
    ("sa_correction_table", F32Array(5)),
    ("spare3", Char(8)),
    ("gpt_software_version", Char(16)),
    ("spare4", Char(28)),
];

pub const MBES_TRANSCEIVER_FIELDS: &[FieldSpec] = &[
    ("channel_id", Char(128)),
    ("beam_type", I32),
    ("frequency", F32),
    ("reserved1", F32),
    ("equivalent_beam_angle", F32),
    ("beamwidth_alongship", F32),
    ("beamwidth_athwartship", F32),
    ("angle_sensitivity_alongship", F32),
    ("angle_sensitivity_athwartship", F32),
    ("angle_offset_alongship", F32),
    ("angle_offset_athwartship", F32),
    ("pos_x", F32),
    ("pos_y", F32),
    ("pos_z", F32),
    ("beam_steering_angle_alongship", F32),
    ("beam_steering_angle_athwartship", F32),
    ("beam_steering_angle_unused", F32),
    ("pulse_length", F32),
    ("reserved2", F32),
    ("spare1", Char(20)),
    ("gain", F32),
    ("reserved3", F32),
    ("spare2", Char(20)),
    ("sa_correction", F32),
    ("reserved4", F32),
    ("spare3", Char(20)),
    ("gpt_software_version", Char(16)),
    ("spare4", Char(28)),
];

/// Bytes of the CON0 `spare0` field that MBES sounders use for extra header values.
pub const MBES_EXTRAS_SIZE: usize = 14;

pub fn record_size(fields: &[FieldSpec]) -> usize {
    fields.iter().map(|(_, t)| t.size()).sum()
}

/// Fixed header layout for a kind/version, or `None` if unsupported.
pub fn header_fields(kind: DatagramKind, version: u8) -> Option<&'static [FieldSpec]> {
    match (kind, version) {
        (DatagramKind::Con, 0) => Some(CON0_FIELDS),
        (DatagramKind::Con, 1) => Some(PREFIX_FIELDS),
        (DatagramKind::Raw, 0) => Some(RAW0_FIELDS),
        (DatagramKind::Raw, 3) => Some(RAW3_FIELDS),
        (DatagramKind::Dep, 0) | (DatagramKind::Bot, 0) => Some(TRANSCEIVER_COUNT_FIELDS),
        (DatagramKind::Nme, 0) | (DatagramKind::Tag, 0) | (DatagramKind::Xml, 0) => {
            Some(PREFIX_FIELDS)
        }
        (DatagramKind::Mru, 0) => Some(MRU0_FIELDS),
        (DatagramKind::Fil, 1) => Some(FIL1_FIELDS),
        _ => None,
    }
}

pub fn header_size(kind: DatagramKind, version: u8) -> Option<usize> {
    header_fields(kind, version).map(record_size)
}

pub fn transceiver_fields(layout: SounderLayout) -> &'static [FieldSpec] {
    match layout {
        SounderLayout::Er60 => ER60_TRANSCEIVER_FIELDS,
        SounderLayout::Mbes => MBES_TRANSCEIVER_FIELDS,
    }
}

pub fn transceiver_size(layout: SounderLayout) -> usize {
    record_size(transceiver_fields(layout))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_header_sizes() {
        assert_eq!(header_size(DatagramKind::Con, 0), Some(528));
        assert_eq!(header_size(DatagramKind::Con, 1), Some(12));
        assert_eq!(header_size(DatagramKind::Raw, 0), Some(84));
        assert_eq!(header_size(DatagramKind::Raw, 3), Some(152));
        assert_eq!(header_size(DatagramKind::Dep, 0), Some(16));
        assert_eq!(header_size(DatagramKind::Bot, 0), Some(16));
        assert_eq!(header_size(DatagramKind::Mru, 0), Some(28));
        assert_eq!(header_size(DatagramKind::Fil, 1), Some(148));
        assert_eq!(header_size(DatagramKind::Xml, 0), Some(12));
        assert_eq!(header_size(DatagramKind::Raw, 1), None);
        assert_eq!(header_size(DatagramKind::Fil, 0), None);
    }

    #[test]
    fn test_transceiver_sizes() {
        assert_eq!(transceiver_size(SounderLayout::Er60), 320);
        assert_eq!(transceiver_size(SounderLayout::Mbes), 320);
    }
}
