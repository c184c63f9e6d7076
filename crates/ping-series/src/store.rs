//! One channel's accumulated pings.
//!
//! Sample arrays are `[n_pings, n_samples]` (and `[n_pings, n_samples,
//! n_complex]` for complex data). Cells that were never written hold NaN.

use crate::attributes::{InsertPlan, PingAttributes, PingHeader};
use crate::error::SeriesError;
use chrono::NaiveDateTime;
use ndarray::{s, Array2, Array3, ArrayView1, ArrayView2, Axis};
use num_complex::Complex32;

/// Frequencies closer than this are treated as the same channel frequency.
pub const FREQUENCY_TOLERANCE: f64 = 1e-3;

const COMPLEX_NAN: Complex32 = Complex32::new(f32::NAN, f32::NAN);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum SampleKind {
    PowerAngle,
    Complex,
}

/// Sample vectors of one incoming ping. Missing vectors are stored as NaN.
#[derive(Debug, Clone, Copy, Default)]
pub struct PingSamples<'a> {
    /// dB.
    pub power: Option<&'a [f32]>,
    pub angles_alongship: Option<&'a [f32]>,
    pub angles_athwartship: Option<&'a [f32]>,
    /// Sample-major, `n_complex` values per sample.
    pub complex: Option<&'a [Complex32]>,
}

/// Where [`PingSeries::insert`] places the incoming pings.
#[derive(Debug, Clone, PartialEq)]
pub enum InsertAt {
    /// Before the ping currently at this index; `n_pings` appends.
    Index(usize),
    /// After the last ping whose time is at or before this time.
    AfterTime(NaiveDateTime),
    /// Final row of each incoming ping, one entry per ping.
    Indices(Vec<usize>),
}

#[derive(Debug, Clone, PartialEq)]
pub struct PingSeries {
    channel_id: String,
    frequency: f64,
    kind: SampleKind,
    n_complex: usize,
    n_samples: usize,
    attrs: PingAttributes,
    power: Option<Array2<f32>>,
    angles_alongship: Option<Array2<f32>>,
    angles_athwartship: Option<Array2<f32>>,
    complex: Option<Array3<Complex32>>,
}

fn nan_2d(rows: usize, cols: usize) -> Array2<f32> {
    Array2::from_elem((rows, cols), f32::NAN)
}

fn nan_3d(rows: usize, cols: usize, depth: usize) -> Array3<Complex32> {
    Array3::from_elem((rows, cols, depth), COMPLEX_NAN)
}

fn resized_2d(a: &Array2<f32>, rows: usize, cols: usize) -> Array2<f32> {
    let mut out = nan_2d(rows, cols);
    let r = rows.min(a.nrows());
    let c = cols.min(a.ncols());
    out.slice_mut(s![..r, ..c]).assign(&a.slice(s![..r, ..c]));
    out
}

fn resized_3d(a: &Array3<Complex32>, rows: usize, cols: usize) -> Array3<Complex32> {
    let depth = a.shape()[2];
    let mut out = nan_3d(rows, cols, depth);
    let r = rows.min(a.shape()[0]);
    let c = cols.min(a.shape()[1]);
    out.slice_mut(s![..r, ..c, ..]).assign(&a.slice(s![..r, ..c, ..]));
    out
}

fn push_row(a: &mut Array2<f32>, values: Option<&[f32]>, width: usize) -> Result<(), SeriesError> {
    if width == 0 {
        *a = nan_2d(a.nrows() + 1, 0);
        return Ok(());
    }
    let mut row = vec![f32::NAN; width];
    if let Some(v) = values {
        row[..v.len()].copy_from_slice(v);
    }
    a.push_row(ArrayView1::from(&row[..]))
        .map_err(|e| SeriesError::ShapeMismatch(e.to_string()))
}

fn scatter_2d(
    a: Option<&Array2<f32>>,
    b: Option<&Array2<f32>>,
    plan: &InsertPlan,
    width: usize,
) -> Option<Array2<f32>> {
    if a.is_none() && b.is_none() {
        return None;
    }
    let mut out = nan_2d(plan.total, width);
    for (src, dest) in [(a, &plan.existing), (b, &plan.inserted)] {
        if let Some(src) = src {
            let w = src.ncols();
            for (j, &d) in dest.iter().enumerate() {
                out.slice_mut(s![d, ..w]).assign(&src.row(j));
            }
        }
    }
    Some(out)
}

fn scatter_3d(
    a: Option<&Array3<Complex32>>,
    b: Option<&Array3<Complex32>>,
    plan: &InsertPlan,
    width: usize,
    depth: usize,
) -> Option<Array3<Complex32>> {
    if a.is_none() && b.is_none() {
        return None;
    }
    let mut out = nan_3d(plan.total, width, depth);
    for (src, dest) in [(a, &plan.existing), (b, &plan.inserted)] {
        if let Some(src) = src {
            let w = src.shape()[1];
            for (j, &d) in dest.iter().enumerate() {
                out.slice_mut(s![d, ..w, ..])
                    .assign(&src.index_axis(Axis(0), j));
            }
        }
    }
    Some(out)
}

impl PingSeries {
    /// A power/angle store. `store_angles` keeps both angle arrays.
    pub fn power_angle(
        channel_id: impl Into<String>,
        frequency: f64,
        store_power: bool,
        store_angles: bool,
    ) -> Self {
        Self {
            channel_id: channel_id.into(),
            frequency,
            kind: SampleKind::PowerAngle,
            n_complex: 0,
            n_samples: 0,
            attrs: PingAttributes::default(),
            power: store_power.then(|| nan_2d(0, 0)),
            angles_alongship: store_angles.then(|| nan_2d(0, 0)),
            angles_athwartship: store_angles.then(|| nan_2d(0, 0)),
            complex: None,
        }
    }

    pub fn complex(channel_id: impl Into<String>, frequency: f64, n_complex: usize) -> Self {
        Self {
            channel_id: channel_id.into(),
            frequency,
            kind: SampleKind::Complex,
            n_complex,
            n_samples: 0,
            attrs: PingAttributes::default(),
            power: None,
            angles_alongship: None,
            angles_athwartship: None,
            complex: Some(nan_3d(0, 0, n_complex)),
        }
    }

    /// A store with the same channel, kind and arrays holding `n_pings`
    /// empty pings.
    pub fn empty_like(&self, n_pings: usize) -> Self {
        let ns = self.n_samples;
        Self {
            channel_id: self.channel_id.clone(),
            frequency: self.frequency,
            kind: self.kind,
            n_complex: self.n_complex,
            n_samples: ns,
            attrs: PingAttributes::with_len(n_pings),
            power: self.power.as_ref().map(|_| nan_2d(n_pings, ns)),
            angles_alongship: self.angles_alongship.as_ref().map(|_| nan_2d(n_pings, ns)),
            angles_athwartship: self.angles_athwartship.as_ref().map(|_| nan_2d(n_pings, ns)),
            complex: self.complex.as_ref().map(|_| nan_3d(n_pings, ns, self.n_complex)),
        }
    }

    pub fn channel_id(&self) -> &str {
        &self.channel_id
    }

    pub fn frequency(&self) -> f64 {
        self.frequency
    }

    pub fn kind(&self) -> SampleKind {
        self.kind
    }

    /// Complex values per sample (receiver sectors); 0 for power/angle data.
    pub fn n_complex(&self) -> usize {
        self.n_complex
    }

    pub fn n_pings(&self) -> usize {
        self.attrs.ping_time.len()
    }

    pub fn n_samples(&self) -> usize {
        self.n_samples
    }

    pub fn is_empty(&self) -> bool {
        self.n_pings() == 0
    }

    pub fn attributes(&self) -> &PingAttributes {
        &self.attrs
    }

    pub fn ping_times(&self) -> &[Option<NaiveDateTime>] {
        &self.attrs.ping_time
    }

    pub fn header(&self, i: usize) -> Option<PingHeader> {
        self.attrs.header(i)
    }

    pub fn power(&self) -> Option<&Array2<f32>> {
        self.power.as_ref()
    }

    pub fn angles_alongship(&self) -> Option<&Array2<f32>> {
        self.angles_alongship.as_ref()
    }

    pub fn angles_athwartship(&self) -> Option<&Array2<f32>> {
        self.angles_athwartship.as_ref()
    }

    pub fn complex_samples(&self) -> Option<&Array3<Complex32>> {
        self.complex.as_ref()
    }

    /// Assign every ping to writer output group `group`.
    pub fn set_output_group(&mut self, group: u32) {
        self.attrs.output_group.iter_mut().for_each(|g| *g = group);
    }

    pub fn set_output_group_for(&mut self, indices: &[usize], group: u32) -> Result<(), SeriesError> {
        self.check_indices(indices)?;
        for &i in indices {
            self.attrs.output_group[i] = group;
        }
        Ok(())
    }

    /// Overwrite the motion columns, e.g. with values interpolated from a
    /// motion log. Each slice must have one value per ping.
    pub fn set_motion(
        &mut self,
        heave: &[f32],
        pitch: &[f32],
        roll: &[f32],
        heading: &[f32],
    ) -> Result<(), SeriesError> {
        let n = self.n_pings();
        if [heave.len(), pitch.len(), roll.len(), heading.len()].iter().any(|&l| l != n) {
            return Err(SeriesError::ShapeMismatch(format!(
                "motion columns must have {n} values"
            )));
        }
        self.attrs.heave.copy_from_slice(heave);
        self.attrs.pitch.copy_from_slice(pitch);
        self.attrs.roll.copy_from_slice(roll);
        self.attrs.heading.copy_from_slice(heading);
        Ok(())
    }

    /// Every column has `n_pings` entries and every array has `n_pings` rows
    /// and `n_samples` columns.
    pub fn check_invariants(&self) -> Result<(), SeriesError> {
        let n = self.n_pings();
        if let Some(bad) = self.attrs.lengths().into_iter().position(|l| l != n) {
            return Err(SeriesError::ShapeMismatch(format!(
                "attribute {} has {} entries, expected {}",
                PingAttributes::NAMES[bad],
                self.attrs.lengths()[bad],
                n
            )));
        }
        let arrays = [
            ("power", self.power.as_ref()),
            ("angles_alongship", self.angles_alongship.as_ref()),
            ("angles_athwartship", self.angles_athwartship.as_ref()),
        ];
        for (name, a) in arrays {
            if let Some(a) = a {
                if a.dim() != (n, self.n_samples) {
                    return Err(SeriesError::ShapeMismatch(format!(
                        "{name} is {:?}, expected ({n}, {})",
                        a.dim(),
                        self.n_samples
                    )));
                }
            }
        }
        if let Some(c) = &self.complex {
            if c.dim() != (n, self.n_samples, self.n_complex) {
                return Err(SeriesError::ShapeMismatch(format!(
                    "complex is {:?}, expected ({n}, {}, {})",
                    c.dim(),
                    self.n_samples,
                    self.n_complex
                )));
            }
        }
        Ok(())
    }

    /// Stores can only be combined when they hold the same kind of samples
    /// at the same frequency.
    pub fn check_compatible(&self, other: &PingSeries) -> Result<(), SeriesError> {
        if self.kind != other.kind {
            return Err(SeriesError::IncompatibleChannelData(format!(
                "{} holds {:?} samples, {} holds {:?}",
                self.channel_id, self.kind, other.channel_id, other.kind
            )));
        }
        if (self.frequency - other.frequency).abs() > FREQUENCY_TOLERANCE {
            return Err(SeriesError::IncompatibleChannelData(format!(
                "{} is {} Hz, {} is {} Hz",
                self.channel_id, self.frequency, other.channel_id, other.frequency
            )));
        }
        if self.n_complex != other.n_complex {
            return Err(SeriesError::IncompatibleChannelData(format!(
                "{} has {} complex sectors, {} has {}",
                self.channel_id, self.n_complex, other.channel_id, other.n_complex
            )));
        }
        Ok(())
    }

    fn check_indices(&self, indices: &[usize]) -> Result<(), SeriesError> {
        let n = self.n_pings();
        match indices.iter().find(|&&i| i >= n) {
            Some(&index) => Err(SeriesError::IndexOutOfRange { index, n_pings: n }),
            None => Ok(()),
        }
    }

    /// Width of the incoming ping in samples.
    fn check_samples(&self, p: &PingSamples<'_>) -> Result<usize, SeriesError> {
        match self.kind {
            SampleKind::PowerAngle if p.complex.is_some() => {
                return Err(SeriesError::IncompatibleChannelData(format!(
                    "complex samples for power/angle channel {}",
                    self.channel_id
                )))
            }
            SampleKind::Complex
                if p.power.is_some()
                    || p.angles_alongship.is_some()
                    || p.angles_athwartship.is_some() =>
            {
                return Err(SeriesError::IncompatibleChannelData(format!(
                    "power/angle samples for complex channel {}",
                    self.channel_id
                )))
            }
            _ => {}
        }
        if let (Some(a), Some(b)) = (p.angles_alongship, p.angles_athwartship) {
            if a.len() != b.len() {
                return Err(SeriesError::ShapeMismatch(format!(
                    "{} alongship angles but {} athwartship",
                    a.len(),
                    b.len()
                )));
            }
        }
        let mut width = [p.power, p.angles_alongship, p.angles_athwartship]
            .iter()
            .flatten()
            .map(|v| v.len())
            .max()
            .unwrap_or(0);
        if let Some(c) = p.complex {
            if self.n_complex == 0 || c.len() % self.n_complex != 0 {
                return Err(SeriesError::ShapeMismatch(format!(
                    "{} complex values is not a multiple of {} sectors",
                    c.len(),
                    self.n_complex
                )));
            }
            width = width.max(c.len() / self.n_complex);
        }
        Ok(width)
    }

    /// Grow the sample axis, NaN filling the new columns.
    fn widen(&mut self, width: usize) {
        if width <= self.n_samples {
            return;
        }
        let n = self.n_pings();
        for a in [
            &mut self.power,
            &mut self.angles_alongship,
            &mut self.angles_athwartship,
        ]
        .into_iter()
        .flatten()
        {
            *a = resized_2d(a, n, width);
        }
        if let Some(c) = self.complex.as_mut() {
            *c = resized_3d(c, n, width);
        }
        self.n_samples = width;
    }

    /// Append one ping. `sample_count` in the stored header is set to the
    /// width of the supplied samples.
    pub fn append_ping(&mut self, header: &PingHeader, samples: &PingSamples<'_>) -> Result<(), SeriesError> {
        let width = self.check_samples(samples)?;
        self.widen(width);
        let ns = self.n_samples;

        if let Some(a) = self.power.as_mut() {
            push_row(a, samples.power, ns)?;
        }
        if let Some(a) = self.angles_alongship.as_mut() {
            push_row(a, samples.angles_alongship, ns)?;
        }
        if let Some(a) = self.angles_athwartship.as_mut() {
            push_row(a, samples.angles_athwartship, ns)?;
        }
        if let Some(a) = self.complex.as_mut() {
            let nc = self.n_complex;
            let mut row = Array2::from_elem((ns, nc), COMPLEX_NAN);
            if let Some(c) = samples.complex {
                let v = ArrayView2::from_shape((c.len() / nc, nc), c)
                    .map_err(|e| SeriesError::ShapeMismatch(e.to_string()))?;
                row.slice_mut(s![..v.nrows(), ..]).assign(&v);
            }
            if ns == 0 {
                *a = nan_3d(a.shape()[0] + 1, 0, nc);
            } else {
                a.push(Axis(0), row.view())
                    .map_err(|e| SeriesError::ShapeMismatch(e.to_string()))?;
            }
        }

        let mut h = *header;
        h.sample_count = width as i32;
        self.attrs.push(&h);
        Ok(())
    }

    /// Append all of `other`'s pings.
    pub fn append(&mut self, other: &PingSeries) -> Result<(), SeriesError> {
        let n = self.n_pings();
        self.insert(other, InsertAt::Index(n))
    }

    fn plan_insert(&self, m: usize, at: &InsertAt) -> Result<InsertPlan, SeriesError> {
        let n = self.n_pings();
        let at_index = |i: usize| InsertPlan {
            total: n + m,
            existing: (0..n).map(|j| if j < i { j } else { j + m }).collect(),
            inserted: (i..i + m).collect(),
        };
        match at {
            InsertAt::Index(i) if *i > n => Err(SeriesError::IndexOutOfRange { index: *i, n_pings: n }),
            InsertAt::Index(i) => Ok(at_index(*i)),
            InsertAt::AfterTime(t) => {
                let i = self
                    .attrs
                    .ping_time
                    .iter()
                    .rposition(|p| *p <= Some(*t))
                    .map_or(0, |p| p + 1);
                Ok(at_index(i))
            }
            InsertAt::Indices(dest) => {
                if dest.len() != m {
                    return Err(SeriesError::ShapeMismatch(format!(
                        "{} destination indices for {} pings",
                        dest.len(),
                        m
                    )));
                }
                let total = n + m;
                let mut taken = vec![false; total];
                for &d in dest {
                    if d >= total {
                        return Err(SeriesError::IndexOutOfRange { index: d, n_pings: total });
                    }
                    if taken[d] {
                        return Err(SeriesError::ShapeMismatch(format!("duplicate destination index {d}")));
                    }
                    taken[d] = true;
                }
                let existing = (0..total).filter(|&d| !taken[d]).collect();
                Ok(InsertPlan {
                    total,
                    existing,
                    inserted: dest.clone(),
                })
            }
        }
    }

    /// Insert `other`'s pings. The narrower of the two stores is padded
    /// with NaN columns first; arrays present in only one store are NaN for
    /// the other store's pings.
    pub fn insert(&mut self, other: &PingSeries, at: InsertAt) -> Result<(), SeriesError> {
        self.check_compatible(other)?;
        let plan = self.plan_insert(other.n_pings(), &at)?;
        let width = self.n_samples.max(other.n_samples);

        self.power = scatter_2d(self.power.as_ref(), other.power.as_ref(), &plan, width);
        self.angles_alongship = scatter_2d(
            self.angles_alongship.as_ref(),
            other.angles_alongship.as_ref(),
            &plan,
            width,
        );
        self.angles_athwartship = scatter_2d(
            self.angles_athwartship.as_ref(),
            other.angles_athwartship.as_ref(),
            &plan,
            width,
        );
        self.complex = scatter_3d(
            self.complex.as_ref(),
            other.complex.as_ref(),
            &plan,
            width,
            self.n_complex,
        );
        self.attrs.scatter(&other.attrs, &plan);
        self.n_samples = width;
        Ok(())
    }

    /// Delete pings. With `shrink` the kept pings are compacted and the
    /// store gets shorter; without it the deleted pings are blanked in place.
    pub fn delete(&mut self, indices: &[usize], shrink: bool) -> Result<(), SeriesError> {
        self.check_indices(indices)?;
        if !shrink {
            self.attrs.blank(indices);
            for a in [
                &mut self.power,
                &mut self.angles_alongship,
                &mut self.angles_athwartship,
            ]
            .into_iter()
            .flatten()
            {
                for &i in indices {
                    a.row_mut(i).fill(f32::NAN);
                }
            }
            if let Some(c) = self.complex.as_mut() {
                for &i in indices {
                    c.index_axis_mut(Axis(0), i).fill(COMPLEX_NAN);
                }
            }
            return Ok(());
        }

        let mut drop = vec![false; self.n_pings()];
        for &i in indices {
            drop[i] = true;
        }
        let keep: Vec<usize> = (0..drop.len()).filter(|&i| !drop[i]).collect();
        self.take_rows(&keep);
        Ok(())
    }

    /// Reorder or subset the pings in place. Indices must be in range.
    fn take_rows(&mut self, rows: &[usize]) {
        self.attrs = self.attrs.take(rows);
        for a in [
            &mut self.power,
            &mut self.angles_alongship,
            &mut self.angles_athwartship,
        ]
        .into_iter()
        .flatten()
        {
            *a = a.select(Axis(0), rows);
        }
        if let Some(c) = self.complex.as_mut() {
            *c = c.select(Axis(0), rows);
        }
    }

    /// A copy holding only the given pings, in the given order.
    pub fn select(&self, indices: &[usize]) -> Result<Self, SeriesError> {
        self.check_indices(indices)?;
        let mut out = self.clone();
        out.take_rows(indices);
        Ok(out)
    }

    /// Reallocate to a new shape. New cells are empty; shrinking the sample
    /// axis truncates.
    pub fn resize(&mut self, n_pings: usize, n_samples: usize) {
        self.attrs.resize(n_pings);
        for a in [
            &mut self.power,
            &mut self.angles_alongship,
            &mut self.angles_athwartship,
        ]
        .into_iter()
        .flatten()
        {
            *a = resized_2d(a, n_pings, n_samples);
        }
        if let Some(c) = self.complex.as_mut() {
            *c = resized_3d(c, n_pings, n_samples);
        }
        self.n_samples = n_samples;
    }

    /// Stable sort of the pings by time, empty times first.
    pub fn sort_by_time(&mut self) {
        let order = self.get_indices(&Default::default());
        if order.iter().enumerate().any(|(i, &j)| i != j) {
            self.take_rows(&order);
        }
    }

    /// Insert empty pings carrying the given times, keeping the store time
    /// ordered. Returns the rows the new pings landed on.
    pub fn insert_empty_at_times(&mut self, times: &[NaiveDateTime]) -> Result<Vec<usize>, SeriesError> {
        if times.is_empty() {
            return Ok(Vec::new());
        }
        self.sort_by_time();
        let mut times = times.to_vec();
        times.sort();
        let dest = crate::select::merge_positions(&self.attrs.ping_time, &times);
        let mut empties = self.empty_like(times.len());
        for (slot, t) in empties.attrs.ping_time.iter_mut().zip(&times) {
            *slot = Some(*t);
        }
        self.insert(&empties, InsertAt::Indices(dest.clone()))?;
        Ok(dest)
    }
}
