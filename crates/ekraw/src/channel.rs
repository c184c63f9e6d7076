//! A channel's ping stores and the configuration records they were read with.

use crate::ancillary::MotionLog;
use chrono::NaiveDateTime;
use ping_series::{PingSeries, SampleKind, SeriesError};
use serde::{Deserialize, Serialize};
use simrad_core::{BeamConfiguration, CalibrationParameters, LegacyConfiguration, XmlConfiguration};
use std::collections::BTreeMap;
use std::path::PathBuf;

/// dB per raw power index step, `10 * log10(2) / 256`.
pub const INDEX2POWER: f64 = 0.011758984205624266;

pub fn power_from_index(index: i16) -> f32 {
    (index as f64 * INDEX2POWER) as f32
}

/// Nearest raw index for a dB value. Lossy; NaN becomes the lowest index.
pub fn index_from_power(db: f32) -> i16 {
    if db.is_nan() {
        return i16::MIN;
    }
    (db as f64 / INDEX2POWER)
        .round()
        .clamp(i16::MIN as f64, i16::MAX as f64) as i16
}

/// Electrical angle step, NaN becomes 0.
pub fn angle_step(v: f32) -> i8 {
    if v.is_nan() {
        return 0;
    }
    v.round().clamp(i8::MIN as f32, i8::MAX as f32) as i8
}

/// Pulse form of continuous-wave pings.
pub const PULSE_CW: i16 = 0;
pub const PULSE_FM: i16 = 1;

/// Stores are split by sample kind and pulse form.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct StoreKey {
    pub kind: SampleKind,
    pub pulse_form: i16,
}

impl StoreKey {
    pub fn power_angle() -> Self {
        Self {
            kind: SampleKind::PowerAngle,
            pulse_form: PULSE_CW,
        }
    }
}

#[derive(Debug, Clone)]
pub struct Channel {
    channel_id: String,
    frequency: f64,
    stores: BTreeMap<StoreKey, PingSeries>,
}

impl Channel {
    pub fn new(channel_id: impl Into<String>, frequency: f64) -> Self {
        Self {
            channel_id: channel_id.into(),
            frequency,
            stores: BTreeMap::new(),
        }
    }

    pub fn channel_id(&self) -> &str {
        &self.channel_id
    }

    pub fn frequency(&self) -> f64 {
        self.frequency
    }

    pub fn store(&self, key: StoreKey) -> Option<&PingSeries> {
        self.stores.get(&key)
    }

    pub fn store_mut(&mut self, key: StoreKey) -> Option<&mut PingSeries> {
        self.stores.get_mut(&key)
    }

    pub fn stores(&self) -> impl Iterator<Item = (&StoreKey, &PingSeries)> {
        self.stores.iter()
    }

    pub fn stores_mut(&mut self) -> impl Iterator<Item = (&StoreKey, &mut PingSeries)> {
        self.stores.iter_mut()
    }

    /// Store for `key`, created with `make` on first use.
    pub(crate) fn store_or_insert_with(
        &mut self,
        key: StoreKey,
        make: impl FnOnce() -> PingSeries,
    ) -> &mut PingSeries {
        self.stores.entry(key).or_insert_with(make)
    }

    pub fn n_pings(&self) -> usize {
        self.stores.values().map(|s| s.n_pings()).sum()
    }

    /// Interpolate motion onto every store's ping times.
    pub fn apply_motion(&mut self, motion: &MotionLog) -> Result<(), SeriesError> {
        for s in self.stores.values_mut() {
            let m = motion.interpolate(s.ping_times());
            s.set_motion(&m.heave, &m.pitch, &m.roll, &m.heading)?;
        }
        Ok(())
    }

    pub fn set_output_group(&mut self, group: u32) {
        for s in self.stores.values_mut() {
            s.set_output_group(group);
        }
    }

    pub fn summary(&self) -> ChannelSummary {
        let mut first = None;
        let mut last = None;
        for t in self.stores.values().flat_map(|s| s.ping_times().iter().flatten()) {
            first = Some(first.map_or(*t, |f: NaiveDateTime| f.min(*t)));
            last = Some(last.map_or(*t, |l: NaiveDateTime| l.max(*t)));
        }
        ChannelSummary {
            channel_id: self.channel_id.clone(),
            frequency: self.frequency,
            stores: self
                .stores
                .iter()
                .map(|(k, s)| StoreSummary {
                    kind: format!("{:?}", k.kind),
                    pulse_form: k.pulse_form,
                    n_pings: s.n_pings(),
                    n_samples: s.n_samples(),
                })
                .collect(),
            first_ping: first,
            last_ping: last,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoreSummary {
    pub kind: String,
    pub pulse_form: i16,
    pub n_pings: usize,
    pub n_samples: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChannelSummary {
    pub channel_id: String,
    pub frequency: f64,
    pub stores: Vec<StoreSummary>,
    pub first_ping: Option<NaiveDateTime>,
    pub last_ping: Option<NaiveDateTime>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum ConfigurationRecord {
    Legacy(LegacyConfiguration),
    Xml(XmlConfiguration),
}

impl ConfigurationRecord {
    pub fn channel_ids(&self) -> Vec<&str> {
        match self {
            Self::Legacy(c) => c.transceivers.iter().map(|t| t.channel_id()).collect(),
            Self::Xml(c) => c.channels.iter().map(|c| c.channel_id.as_str()).collect(),
        }
    }

    pub fn contains(&self, channel_id: &str) -> bool {
        self.channel_ids().contains(&channel_id)
    }

    /// Calibration for one channel at `pulse_length` seconds.
    pub fn calibration(&self, channel_id: &str, pulse_length: Option<f64>) -> Option<CalibrationParameters> {
        match self {
            Self::Legacy(c) => c
                .transceivers
                .iter()
                .find(|t| t.channel_id() == channel_id)
                .map(|t| CalibrationParameters::from_transceiver(t, pulse_length)),
            Self::Xml(c) => c
                .channel(channel_id)
                .map(|ch| CalibrationParameters::from_xml_channel(ch, pulse_length)),
        }
    }
}

/// Configuration datagram(s) of one input file.
#[derive(Debug, Clone, PartialEq)]
pub struct FileConfiguration {
    /// Position of the file in the read order.
    pub file_index: usize,
    pub path: Option<PathBuf>,
    pub timestamp: NaiveDateTime,
    pub record: ConfigurationRecord,
    pub beam_config: Option<BeamConfiguration>,
}
