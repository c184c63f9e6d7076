//! Ping-time alignment across channels.

use crate::error::{AlignError, SeriesError};
use crate::processed::ProcessedSeries;
use crate::select::merge_positions;
use crate::store::PingSeries;
use chrono::NaiveDateTime;
use ndarray::Array2;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum AlignMode {
    /// Insert empty pings so every channel has the longest channel's times.
    #[default]
    Pad,
    /// Delete pings so every channel has only the shortest channel's times.
    Delete,
}

/// Anything with a ping-time axis that can gain empty pings or lose pings.
pub trait Alignable {
    fn label(&self) -> &str;
    fn times(&self) -> &[Option<NaiveDateTime>];
    fn is_composite(&self) -> bool {
        false
    }
    /// Insert empty pings at `times`, keeping the axis time ordered.
    fn insert_empty_pings(&mut self, times: &[NaiveDateTime]) -> Result<(), SeriesError>;
    fn remove_pings(&mut self, indices: &[usize]) -> Result<(), SeriesError>;
}

impl Alignable for PingSeries {
    fn label(&self) -> &str {
        self.channel_id()
    }

    fn times(&self) -> &[Option<NaiveDateTime>] {
        self.ping_times()
    }

    fn insert_empty_pings(&mut self, times: &[NaiveDateTime]) -> Result<(), SeriesError> {
        self.insert_empty_at_times(times).map(|_| ())
    }

    fn remove_pings(&mut self, indices: &[usize]) -> Result<(), SeriesError> {
        self.delete(indices, true)
    }
}

impl Alignable for ProcessedSeries {
    fn label(&self) -> &str {
        &self.channel_id
    }

    fn times(&self) -> &[Option<NaiveDateTime>] {
        &self.ping_time
    }

    fn is_composite(&self) -> bool {
        self.is_composite
    }

    fn insert_empty_pings(&mut self, times: &[NaiveDateTime]) -> Result<(), SeriesError> {
        if times.is_empty() {
            return Ok(());
        }
        self.sort_by_time();
        let mut times = times.to_vec();
        times.sort();
        let dest = merge_positions(&self.ping_time, &times);

        let total = self.n_pings() + times.len();
        let mut is_new = vec![false; total];
        for &d in &dest {
            is_new[d] = true;
        }
        let mut data = Array2::from_elem((total, self.n_samples()), f32::NAN);
        let mut ping_time = Vec::with_capacity(total);
        let mut depth = Vec::with_capacity(total);
        let (mut old, mut new) = (0, 0);
        for (row, &fresh) in is_new.iter().enumerate() {
            if fresh {
                ping_time.push(Some(times[new]));
                depth.push(f32::NAN);
                new += 1;
            } else {
                data.row_mut(row).assign(&self.data.row(old));
                ping_time.push(self.ping_time[old]);
                depth.push(self.transducer_depth[old]);
                old += 1;
            }
        }
        self.data = data;
        self.ping_time = ping_time;
        self.transducer_depth = depth;
        Ok(())
    }

    fn remove_pings(&mut self, indices: &[usize]) -> Result<(), SeriesError> {
        let n = self.n_pings();
        let mut drop = vec![false; n];
        for &i in indices {
            if i >= n {
                return Err(SeriesError::IndexOutOfRange { index: i, n_pings: n });
            }
            drop[i] = true;
        }
        let keep: Vec<usize> = (0..n).filter(|&i| !drop[i]).collect();
        self.take_rows(&keep);
        Ok(())
    }
}

impl<T: Alignable + ?Sized> Alignable for &mut T {
    fn label(&self) -> &str {
        (**self).label()
    }

    fn times(&self) -> &[Option<NaiveDateTime>] {
        (**self).times()
    }

    fn is_composite(&self) -> bool {
        (**self).is_composite()
    }

    fn insert_empty_pings(&mut self, times: &[NaiveDateTime]) -> Result<(), SeriesError> {
        (**self).insert_empty_pings(times)
    }

    fn remove_pings(&mut self, indices: &[usize]) -> Result<(), SeriesError> {
        (**self).remove_pings(indices)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ChannelAlignment {
    pub label: String,
    pub inserted: Vec<NaiveDateTime>,
    pub removed: Vec<Option<NaiveDateTime>>,
    /// Changed pings relative to the reference channel's ping count.
    pub percent: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct AlignReport {
    pub mode: AlignMode,
    pub reference: String,
    pub channels: Vec<ChannelAlignment>,
}

impl AlignReport {
    pub fn is_unchanged(&self) -> bool {
        self.channels
            .iter()
            .all(|c| c.inserted.is_empty() && c.removed.is_empty())
    }
}

fn sorted_times(times: &[Option<NaiveDateTime>]) -> Vec<NaiveDateTime> {
    let mut v: Vec<NaiveDateTime> = times.iter().flatten().copied().collect();
    v.sort();
    v
}

/// Align the ping times of all channels. The reference channel (longest
/// for `Pad`, shortest for `Delete`, first on ties) is left untouched.
pub fn align_pings<T: Alignable>(channels: &mut [T], mode: AlignMode) -> Result<AlignReport, AlignError> {
    if channels.is_empty() {
        return Err(AlignError::NoChannels);
    }
    let mut reference = 0;
    for (i, c) in channels.iter().enumerate() {
        let n = c.times().len();
        let better = match mode {
            AlignMode::Pad => n > channels[reference].times().len(),
            AlignMode::Delete => n < channels[reference].times().len(),
        };
        if better {
            reference = i;
        }
    }
    if mode == AlignMode::Pad {
        if let Some(c) = channels.iter().find(|c| c.is_composite()) {
            return Err(AlignError::PadComposite(c.label().to_string()));
        }
    }

    let ref_times = sorted_times(channels[reference].times());
    let ref_n = channels[reference].times().len().max(1) as f64;
    let mut report = AlignReport {
        mode,
        reference: channels[reference].label().to_string(),
        channels: Vec::with_capacity(channels.len() - 1),
    };

    for (i, c) in channels.iter_mut().enumerate() {
        if i == reference {
            continue;
        }
        let mut entry = ChannelAlignment {
            label: c.label().to_string(),
            inserted: Vec::new(),
            removed: Vec::new(),
            percent: 0.0,
        };
        match mode {
            AlignMode::Pad => {
                let own = sorted_times(c.times());
                entry.inserted = ref_times
                    .iter()
                    .filter(|t| own.binary_search(t).is_err())
                    .copied()
                    .collect();
                c.insert_empty_pings(&entry.inserted)?;
                entry.percent = entry.inserted.len() as f64 / ref_n * 100.0;
            }
            AlignMode::Delete => {
                let remove: Vec<usize> = c
                    .times()
                    .iter()
                    .enumerate()
                    .filter(|(_, t)| t.map_or(true, |t| ref_times.binary_search(&t).is_err()))
                    .map(|(i, _)| i)
                    .collect();
                entry.removed = remove.iter().map(|&i| c.times()[i]).collect();
                c.remove_pings(&remove)?;
                entry.percent = entry.removed.len() as f64 / ref_n * 100.0;
            }
        }
        if entry.percent > 0.0 {
            log::info!(
                "{}: {} {} pings ({:.1}% of {})",
                entry.label,
                match mode {
                    AlignMode::Pad => "padded",
                    AlignMode::Delete => "deleted",
                },
                entry.inserted.len() + entry.removed.len(),
                entry.percent,
                report.reference
            );
        }
        report.channels.push(entry);
    }
    Ok(report)
}
