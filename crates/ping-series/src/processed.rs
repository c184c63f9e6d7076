//! Resampled sample matrices with a range or depth axis.

use crate::error::ResampleError;
use crate::resample::{ResampleInterval, SampleField};
use crate::select::PingSelection;
use crate::store::PingSeries;
use chrono::NaiveDateTime;
use ndarray::{s, Array2, Axis};
use simrad_core::CalibrationParameters;
use std::collections::BTreeMap;
use std::thread;

/// Sound speeds closer than this are treated as equal, m/s.
const SOUND_SPEED_TOLERANCE: f64 = 0.01;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VerticalAxis {
    /// Metres from the transducer face.
    Range,
    /// Metres below the surface.
    Depth,
}

/// A caller-owned, resampled view of one channel.
#[derive(Debug, Clone)]
pub struct ProcessedSeries {
    pub channel_id: String,
    pub frequency: f64,
    pub field: SampleField,
    pub ping_time: Vec<Option<NaiveDateTime>>,
    /// `[n_pings, n_samples]`.
    pub data: Array2<f32>,
    pub axis: Vec<f64>,
    pub axis_kind: VerticalAxis,
    /// Seconds.
    pub sample_interval: f64,
    /// In samples of `sample_interval`.
    pub sample_offset: f64,
    pub sound_velocity: f64,
    pub transducer_depth: Vec<f32>,
    pub calibration: Option<CalibrationParameters>,
    /// Set on multi-frequency products. Such series cannot be padded.
    pub is_composite: bool,
    pub is_log: bool,
}

/// `(k + offset) * interval * c / 2` for each sample `k`.
pub fn range_axis(n_samples: usize, sample_offset: f64, sample_interval: f64, sound_velocity: f64) -> Vec<f64> {
    let dr = sample_interval * sound_velocity / 2.0;
    (0..n_samples).map(|k| (k as f64 + sample_offset) * dr).collect()
}

/// Most frequent finite value, rounded to the tolerance. Ties go to the
/// smaller value.
fn most_common(values: &[f64]) -> Option<f64> {
    let mut counts: BTreeMap<i64, (usize, f64)> = BTreeMap::new();
    for &v in values.iter().filter(|v| v.is_finite()) {
        counts
            .entry((v / SOUND_SPEED_TOLERANCE).round() as i64)
            .or_insert((0, v))
            .0 += 1;
    }
    let mut best: Option<(usize, f64)> = None;
    for (_, (n, v)) in counts {
        if best.map_or(true, |(b, _)| n > b) {
            best = Some((n, v));
        }
    }
    best.map(|(_, v)| v)
}

/// Move a row recorded at sound speed `c_row` onto the grid of `c`.
fn reconcile_row(row: &[f32], offset: f64, c_row: f64, c: f64) -> Vec<f32> {
    let n = row.len();
    (0..n)
        .map(|k| {
            let f = (k as f64 + offset) * c / c_row - offset;
            if f < 0.0 || f > (n - 1) as f64 {
                return f32::NAN;
            }
            let lo = f.floor() as usize;
            let hi = (lo + 1).min(n - 1);
            let w = (f - lo as f64) as f32;
            row[lo] + (row[hi] - row[lo]) * w
        })
        .collect()
}

impl ProcessedSeries {
    /// Resample `indices` of `series` and attach a range axis. Pings
    /// recorded at a sound speed other than the most common one are
    /// interpolated onto its range grid.
    pub fn from_series(
        series: &PingSeries,
        indices: &[usize],
        field: SampleField,
        policy: ResampleInterval,
        calibration: Option<CalibrationParameters>,
    ) -> Result<Self, ResampleError> {
        let r = series.resample(indices, field, policy)?;
        let a = series.attributes();
        let speeds: Vec<f64> = indices.iter().map(|&i| a.sound_velocity[i] as f64).collect();
        let sound_velocity = calibration
            .as_ref()
            .and_then(|c| c.sound_velocity)
            .or_else(|| most_common(&speeds))
            .ok_or(ResampleError::MissingField("sound_velocity"))?;

        let mut data = r.data;
        let mut moved = 0;
        for (row, &c_row) in speeds.iter().enumerate() {
            if !c_row.is_finite() || (c_row - sound_velocity).abs() <= SOUND_SPEED_TOLERANCE {
                continue;
            }
            let src = data.row(row).to_vec();
            let dst = reconcile_row(&src, r.sample_offset, c_row, sound_velocity);
            data.row_mut(row).assign(&ndarray::ArrayView1::from(&dst[..]));
            moved += 1;
        }
        if moved > 0 {
            log::info!(
                "{}: {} pings interpolated to {} m/s",
                series.channel_id(),
                moved,
                sound_velocity
            );
        }

        let axis = range_axis(data.ncols(), r.sample_offset, r.sample_interval, sound_velocity);
        Ok(Self {
            channel_id: series.channel_id().to_string(),
            frequency: series.frequency(),
            field,
            ping_time: indices.iter().map(|&i| a.ping_time[i]).collect(),
            data,
            axis,
            axis_kind: VerticalAxis::Range,
            sample_interval: r.sample_interval,
            sample_offset: r.sample_offset,
            sound_velocity,
            transducer_depth: indices.iter().map(|&i| a.transducer_depth[i]).collect(),
            calibration,
            is_composite: false,
            is_log: field == SampleField::Power,
        })
    }

    pub fn n_pings(&self) -> usize {
        self.data.nrows()
    }

    pub fn n_samples(&self) -> usize {
        self.data.ncols()
    }

    /// Convert a range axis to depth by adding each ping's transducer depth.
    /// When the depth varies between pings the rows are shifted onto a
    /// common depth grid.
    pub fn to_depth(&mut self) {
        if self.axis_kind == VerticalAxis::Depth {
            return;
        }
        let depths: Vec<f64> = self
            .transducer_depth
            .iter()
            .map(|&d| if d.is_finite() { d as f64 } else { 0.0 })
            .collect();
        let d_min = depths.iter().copied().fold(f64::INFINITY, f64::min);
        let d_min = if d_min.is_finite() { d_min } else { 0.0 };
        let dr = self.sample_interval * self.sound_velocity / 2.0;
        let shifts: Vec<usize> = depths
            .iter()
            .map(|d| if dr > 0.0 { ((d - d_min) / dr).round() as usize } else { 0 })
            .collect();
        let max_shift = shifts.iter().copied().max().unwrap_or(0);

        if max_shift > 0 {
            let ns = self.n_samples();
            let mut out = Array2::from_elem((self.n_pings(), ns + max_shift), f32::NAN);
            for (i, &sh) in shifts.iter().enumerate() {
                out.slice_mut(s![i, sh..sh + ns]).assign(&self.data.row(i));
            }
            self.data = out;
            let start = self.axis.first().copied().unwrap_or(self.sample_offset * dr);
            self.axis = (0..self.n_samples()).map(|k| start + k as f64 * dr).collect();
        }
        for x in self.axis.iter_mut() {
            *x += d_min;
        }
        self.axis_kind = VerticalAxis::Depth;
    }

    /// Log power values to linear (`10^(x/10)`). Angle data is unaffected.
    pub fn to_linear(&mut self) {
        if self.is_log && self.field == SampleField::Power {
            self.data.mapv_inplace(|x| 10f32.powf(x / 10.0));
            self.is_log = false;
        }
    }

    pub fn to_log(&mut self) {
        if !self.is_log && self.field == SampleField::Power {
            self.data.mapv_inplace(|x| 10.0 * x.log10());
            self.is_log = true;
        }
    }

    /// Stable sort of the pings by time, empty times first.
    pub(crate) fn sort_by_time(&mut self) {
        let mut order: Vec<usize> = (0..self.ping_time.len()).collect();
        order.sort_by_key(|&i| self.ping_time[i]);
        if order.iter().enumerate().any(|(i, &j)| i != j) {
            self.take_rows(&order);
        }
    }

    pub(crate) fn take_rows(&mut self, rows: &[usize]) {
        self.data = self.data.select(Axis(0), rows);
        self.ping_time = rows.iter().map(|&i| self.ping_time[i]).collect();
        self.transducer_depth = rows.iter().map(|&i| self.transducer_depth[i]).collect();
    }
}

/// Resample every store on its own thread, each over all its pings in time
/// order. Results come back in input order.
pub fn resample_channels(
    series: &[&PingSeries],
    field: SampleField,
    policy: ResampleInterval,
) -> Vec<Result<ProcessedSeries, ResampleError>> {
    thread::scope(|scope| {
        let handles: Vec<_> = series
            .iter()
            .map(|s| {
                scope.spawn(move || {
                    let indices = s.get_indices(&PingSelection::default());
                    ProcessedSeries::from_series(s, &indices, field, policy, None)
                })
            })
            .collect();
        handles
            .into_iter()
            .map(|h| h.join().unwrap_or(Err(ResampleError::Empty)))
            .collect()
    })
}
