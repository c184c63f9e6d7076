//! Routes sample datagrams to channel IDs.
//!
//! Slot numbers are only meaningful within one file, so the map is rebuilt
//! from every file's configuration and never carried across files.

use crate::error::RawError;
use crate::options::ReadOptions;
use simrad_core::{LegacyConfiguration, XmlConfiguration};
use std::collections::BTreeMap;

/// Where a sample datagram goes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Route<'a> {
    Accepted(&'a str),
    /// Configured but excluded by the channel or frequency filters.
    Filtered(&'a str),
}

#[derive(Debug, Clone, Default)]
pub struct ChannelDemux {
    /// Channel ID and filter result, index 0 is slot 1.
    slots: Vec<(String, bool)>,
    ids: BTreeMap<String, bool>,
}

impl ChannelDemux {
    pub fn is_configured(&self) -> bool {
        !self.ids.is_empty()
    }

    pub fn configure_legacy(&mut self, config: &LegacyConfiguration, options: &ReadOptions) {
        self.slots = config
            .transceivers
            .iter()
            .map(|t| {
                let id = t.channel_id().to_string();
                let ok = options.accepts_channel(&id, t.frequency() as f64);
                (id, ok)
            })
            .collect();
        self.ids = self.slots.iter().cloned().collect();
        self.log_map();
    }

    pub fn configure_xml(&mut self, config: &XmlConfiguration, options: &ReadOptions) {
        self.slots = config
            .channels
            .iter()
            .map(|c| {
                let ok = options.accepts_channel(&c.channel_id, c.frequency().unwrap_or(f64::NAN));
                (c.channel_id.clone(), ok)
            })
            .collect();
        self.ids = self.slots.iter().cloned().collect();
        self.log_map();
    }

    fn log_map(&self) {
        for (i, (id, ok)) in self.slots.iter().enumerate() {
            log::debug!("Slot {} -> {}{}", i + 1, id, if *ok { "" } else { " (filtered)" });
        }
    }

    /// Route a RAW0 datagram by its 1-based slot.
    pub fn route_slot(&self, slot: i16, offset: u64) -> Result<Route<'_>, RawError> {
        let entry = usize::try_from(slot)
            .ok()
            .and_then(|s| s.checked_sub(1))
            .and_then(|i| self.slots.get(i));
        match entry {
            Some((id, true)) => Ok(Route::Accepted(id)),
            Some((id, false)) => Ok(Route::Filtered(id)),
            None => Err(RawError::ConfigurationMissing {
                channel: format!("slot {slot}"),
                offset,
            }),
        }
    }

    /// Route a RAW3 or FIL1 datagram by channel ID.
    pub fn route_id(&self, channel_id: &str, offset: u64) -> Result<Route<'_>, RawError> {
        match self.ids.get_key_value(channel_id) {
            Some((id, true)) => Ok(Route::Accepted(id)),
            Some((id, false)) => Ok(Route::Filtered(id)),
            None => Err(RawError::ConfigurationMissing {
                channel: channel_id.to_string(),
                offset,
            }),
        }
    }

    /// Route for the `index`-th (0-based) per-transceiver entry of a DEP0 or
    /// BOT0 datagram.
    pub fn route_index(&self, index: usize) -> Option<Route<'_>> {
        self.slots.get(index).map(|(id, ok)| {
            if *ok {
                Route::Accepted(id)
            } else {
                Route::Filtered(id)
            }
        })
    }

    pub fn accepted(&self) -> impl Iterator<Item = &str> {
        self.slots.iter().filter(|(_, ok)| *ok).map(|(id, _)| id.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use simrad_core::config::Er60Transceiver;
    use simrad_core::Transceiver;

    fn legacy(ids: &[(&str, f32)]) -> LegacyConfiguration {
        LegacyConfiguration {
            sounder_name: "ER60".into(),
            transceivers: ids
                .iter()
                .map(|(id, f)| {
                    Transceiver::Er60(Er60Transceiver {
                        channel_id: id.to_string(),
                        frequency: *f,
                        ..Default::default()
                    })
                })
                .collect(),
            ..Default::default()
        }
    }

    #[test]
    fn test_unconfigured_is_missing() {
        let d = ChannelDemux::default();
        assert!(!d.is_configured());
        assert!(matches!(
            d.route_slot(1, 40),
            Err(RawError::ConfigurationMissing { offset: 40, .. })
        ));
        assert!(d.route_id("GPT 38", 0).is_err());
    }

    #[test]
    fn test_slots_follow_each_file() {
        let opts = ReadOptions::default();
        let mut d = ChannelDemux::default();
        d.configure_legacy(&legacy(&[("GPT 38", 38000.0), ("GPT 120", 120000.0)]), &opts);
        assert_eq!(d.route_slot(2, 0).unwrap(), Route::Accepted("GPT 120"));

        let mut d = ChannelDemux::default();
        d.configure_legacy(&legacy(&[("GPT 120", 120000.0), ("GPT 38", 38000.0)]), &opts);
        assert_eq!(d.route_slot(2, 0).unwrap(), Route::Accepted("GPT 38"));
        assert!(d.route_slot(3, 0).is_err());
        assert!(d.route_slot(0, 0).is_err());
    }

    #[test]
    fn test_filtered_channels() {
        let opts = ReadOptions {
            frequencies: Some(vec![38000.0]),
            ..Default::default()
        };
        let mut d = ChannelDemux::default();
        d.configure_legacy(&legacy(&[("GPT 38", 38000.0), ("GPT 120", 120000.0)]), &opts);
        assert_eq!(d.route_id("GPT 120", 0).unwrap(), Route::Filtered("GPT 120"));
        assert_eq!(d.route_index(0), Some(Route::Accepted("GPT 38")));
        assert_eq!(d.accepted().collect::<Vec<_>>(), vec!["GPT 38"]);
    }
}
