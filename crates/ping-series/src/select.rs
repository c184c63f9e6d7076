//! Ping selection by number and time, and time-axis matching between stores.

use crate::error::SeriesError;
use crate::store::PingSeries;
use chrono::NaiveDateTime;
use std::collections::HashSet;

/// Bounds for [`PingSeries::get_indices`]. Ping numbers are 1-based and all
/// bounds are inclusive. Pings with no time never match a time bound.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PingSelection {
    pub start_time: Option<NaiveDateTime>,
    pub end_time: Option<NaiveDateTime>,
    pub start_ping: Option<usize>,
    pub end_ping: Option<usize>,
}

impl PingSelection {
    fn has_time_bounds(&self) -> bool {
        self.start_time.is_some() || self.end_time.is_some()
    }

    fn accepts(&self, number: usize, time: Option<NaiveDateTime>) -> bool {
        if self.start_ping.is_some_and(|s| number < s) || self.end_ping.is_some_and(|e| number > e) {
            return false;
        }
        if !self.has_time_bounds() {
            return true;
        }
        match time {
            Some(t) => {
                self.start_time.map_or(true, |s| t >= s) && self.end_time.map_or(true, |e| t <= e)
            }
            None => false,
        }
    }
}

/// Rounding applied to ping times before they are compared.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TimePrecision {
    #[default]
    Exact,
    Millisecond,
    Centisecond,
    Decisecond,
    Second,
}

impl TimePrecision {
    fn unit_micros(&self) -> i64 {
        match self {
            Self::Exact => 1,
            Self::Millisecond => 1_000,
            Self::Centisecond => 10_000,
            Self::Decisecond => 100_000,
            Self::Second => 1_000_000,
        }
    }

    /// Comparison key: microseconds since the epoch rounded to the unit.
    pub fn key(&self, t: NaiveDateTime) -> i64 {
        let unit = self.unit_micros();
        (t.and_utc().timestamp_micros() + unit / 2).div_euclid(unit)
    }
}

/// What [`PingSeries::match_pings`] changed.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MatchReport {
    pub inserted: Vec<NaiveDateTime>,
    pub removed: Vec<Option<NaiveDateTime>>,
}

/// Final rows for `new` times merged into `existing`. Both inputs must be
/// sorted; new times go after equal existing ones.
pub fn merge_positions(existing: &[Option<NaiveDateTime>], new: &[NaiveDateTime]) -> Vec<usize> {
    new.iter()
        .enumerate()
        .map(|(k, t)| existing.partition_point(|e| *e <= Some(*t)) + k)
        .collect()
}

impl PingSeries {
    /// Indices of the selected pings in time order. Empty times sort first.
    pub fn get_indices(&self, selection: &PingSelection) -> Vec<usize> {
        let times = self.ping_times();
        let mut order: Vec<usize> = (0..times.len()).collect();
        order.sort_by_key(|&i| times[i]);
        order
            .into_iter()
            .filter(|&i| selection.accepts(i + 1, times[i]))
            .collect()
    }

    /// Make this store's time axis equal `target`: pings whose time is not
    /// in `target` are removed and empty pings are inserted for target times
    /// missing here.
    pub fn match_pings(
        &mut self,
        target: &[Option<NaiveDateTime>],
        precision: TimePrecision,
    ) -> Result<MatchReport, SeriesError> {
        let target_keys: HashSet<i64> = target.iter().flatten().map(|t| precision.key(*t)).collect();

        let remove: Vec<usize> = self
            .ping_times()
            .iter()
            .enumerate()
            .filter(|(_, t)| t.map_or(true, |t| !target_keys.contains(&precision.key(t))))
            .map(|(i, _)| i)
            .collect();
        let removed = remove.iter().map(|&i| self.ping_times()[i]).collect();
        self.delete(&remove, true)?;

        let own_keys: HashSet<i64> = self.ping_times().iter().flatten().map(|t| precision.key(*t)).collect();
        let inserted: Vec<NaiveDateTime> = target
            .iter()
            .flatten()
            .filter(|t| !own_keys.contains(&precision.key(**t)))
            .copied()
            .collect();
        self.insert_empty_at_times(&inserted)?;

        log::debug!(
            "{}: matched pings, {} removed, {} inserted",
            self.channel_id(),
            remove.len(),
            inserted.len()
        );
        Ok(MatchReport { inserted, removed })
    }
}
