//! Vertical resampling of pings recorded with different sample intervals and
//! offsets onto one sample grid.

use crate::error::ResampleError;
use crate::store::PingSeries;
use ndarray::{Array2, ArrayView2, Axis};

const RATIO_TOLERANCE: f64 = 1e-6;

/// Target sample interval policy.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub enum ResampleInterval {
    /// Finest interval among the selected pings.
    #[default]
    Shortest,
    Longest,
    /// Seconds.
    Fixed(f64),
}

/// How block averages are taken.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SampleDomain {
    /// Log values (dB), averaged as `10^(x/20)` amplitudes.
    #[default]
    Power,
    /// Averaged directly.
    Linear,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SampleField {
    Power,
    AnglesAlongship,
    AnglesAthwartship,
}

impl SampleField {
    pub fn name(&self) -> &'static str {
        match self {
            Self::Power => "power",
            Self::AnglesAlongship => "angles_alongship",
            Self::AnglesAthwartship => "angles_athwartship",
        }
    }

    pub fn domain(&self) -> SampleDomain {
        match self {
            Self::Power => SampleDomain::Power,
            Self::AnglesAlongship | Self::AnglesAthwartship => SampleDomain::Linear,
        }
    }
}

/// Output of the resampler.
#[derive(Debug, Clone, PartialEq)]
pub struct Resampled {
    /// `[n_pings, n_samples]`, NaN where no ping data maps.
    pub data: Array2<f32>,
    /// Seconds.
    pub sample_interval: f64,
    /// Offset of the first output row in output samples.
    pub sample_offset: f64,
}

/// Per-interval resampling rule.
#[derive(Debug, Clone, Copy, PartialEq)]
enum Method {
    Copy,
    Replicate(usize),
    Average(usize),
    /// Non-integer ratio: each output sample takes the source sample at or
    /// before its position. Holds `interval / target`.
    Previous(f64),
}

impl Method {
    fn for_intervals(interval: f64, target: f64) -> Self {
        let up = interval / target;
        if (up - 1.0).abs() < RATIO_TOLERANCE {
            return Self::Copy;
        }
        if up > 1.0 && (up - up.round()).abs() < RATIO_TOLERANCE {
            return Self::Replicate(up.round() as usize);
        }
        let down = target / interval;
        if down > 1.0 && (down - down.round()).abs() < RATIO_TOLERANCE {
            return Self::Average(down.round() as usize);
        }
        Self::Previous(up)
    }

    fn apply(&self, src: &[f32], domain: SampleDomain) -> Vec<f32> {
        match *self {
            Self::Copy => src.to_vec(),
            Self::Replicate(n) => src.iter().flat_map(|&x| std::iter::repeat(x).take(n)).collect(),
            Self::Average(n) => src.chunks(n).map(|block| block_mean(block, domain)).collect(),
            Self::Previous(ratio) => {
                let len = (src.len() as f64 * ratio).floor() as usize;
                (0..len)
                    .map(|j| {
                        let i = ((j as f64 / ratio).floor() as usize).min(src.len() - 1);
                        src[i]
                    })
                    .collect()
            }
        }
    }
}

/// Mean of the finite values of a block; NaN when there are none.
fn block_mean(block: &[f32], domain: SampleDomain) -> f32 {
    let mut sum = 0.0f64;
    let mut n = 0usize;
    for &x in block.iter().filter(|x| x.is_finite()) {
        sum += match domain {
            SampleDomain::Power => 10f64.powf(x as f64 / 20.0),
            SampleDomain::Linear => x as f64,
        };
        n += 1;
    }
    if n == 0 {
        return f32::NAN;
    }
    let mean = sum / n as f64;
    match domain {
        SampleDomain::Power => (20.0 * mean.log10()) as f32,
        SampleDomain::Linear => mean as f32,
    }
}

fn same_interval(a: f64, b: f64) -> bool {
    (a - b).abs() <= RATIO_TOLERANCE * a.abs().max(b.abs())
}

/// Resample rows onto a common grid.
///
/// Row `i` holds `counts[i]` valid samples taken every `intervals[i]` seconds
/// starting `offsets[i]` samples from the transducer. Rows with a missing or
/// non-positive interval come out all NaN.
pub fn resample_rows(
    rows: ArrayView2<'_, f32>,
    counts: &[usize],
    intervals: &[f64],
    offsets: &[f64],
    policy: ResampleInterval,
    domain: SampleDomain,
) -> Result<Resampled, ResampleError> {
    let n = rows.nrows();
    if n == 0 || counts.len() != n || intervals.len() != n || offsets.len() != n {
        return Err(ResampleError::Empty);
    }
    let valid: Vec<usize> = (0..n)
        .filter(|&i| intervals[i].is_finite() && intervals[i] > 0.0)
        .collect();
    if valid.is_empty() {
        return Err(ResampleError::Empty);
    }

    let target = match policy {
        ResampleInterval::Shortest => valid.iter().map(|&i| intervals[i]).fold(f64::INFINITY, f64::min),
        ResampleInterval::Longest => valid.iter().map(|&i| intervals[i]).fold(0.0, f64::max),
        ResampleInterval::Fixed(x) if x.is_finite() && x > 0.0 => x,
        ResampleInterval::Fixed(x) => return Err(ResampleError::InvalidInterval(x)),
    };

    let mut groups: Vec<(f64, Vec<usize>)> = Vec::new();
    for &i in &valid {
        match groups.iter_mut().find(|(g, _)| same_interval(*g, intervals[i])) {
            Some((_, members)) => members.push(i),
            None => groups.push((intervals[i], vec![i])),
        }
    }

    let offset_time = |i: usize| {
        let o = offsets[i];
        if o.is_finite() { o * intervals[i] } else { 0.0 }
    };
    let min_offset = valid.iter().map(|&i| offset_time(i)).fold(f64::INFINITY, f64::min);

    let mut blocks: Vec<(usize, usize, Vec<f32>)> = Vec::with_capacity(valid.len());
    let mut width = 0;
    for (interval, members) in &groups {
        let method = Method::for_intervals(*interval, target);
        log::debug!(
            "Resampling {} pings at {:e} s to {:e} s: {:?}",
            members.len(),
            interval,
            target,
            method
        );
        for &i in members {
            let row = rows.index_axis(Axis(0), i);
            let count = counts[i].min(row.len());
            let src: Vec<f32> = row.iter().take(count).copied().collect();
            let data = if src.is_empty() { src } else { method.apply(&src, domain) };
            let shift = ((offset_time(i) - min_offset) / target).round().max(0.0) as usize;
            width = width.max(shift + data.len());
            blocks.push((i, shift, data));
        }
    }

    let mut out = Array2::from_elem((n, width), f32::NAN);
    for (i, shift, data) in blocks {
        for (k, v) in data.into_iter().enumerate() {
            out[[i, shift + k]] = v;
        }
    }
    Ok(Resampled {
        data: out,
        sample_interval: target,
        sample_offset: min_offset / target,
    })
}

impl PingSeries {
    /// Resample one sample array for the given pings, in the given order.
    pub fn resample(
        &self,
        indices: &[usize],
        field: SampleField,
        policy: ResampleInterval,
    ) -> Result<Resampled, ResampleError> {
        if indices.is_empty() {
            return Err(ResampleError::Empty);
        }
        let arr = match field {
            SampleField::Power => self.power(),
            SampleField::AnglesAlongship => self.angles_alongship(),
            SampleField::AnglesAthwartship => self.angles_athwartship(),
        }
        .ok_or(ResampleError::MissingField(field.name()))?;
        if let Some(&index) = indices.iter().find(|&&i| i >= self.n_pings()) {
            return Err(crate::error::SeriesError::IndexOutOfRange {
                index,
                n_pings: self.n_pings(),
            }
            .into());
        }

        let a = self.attributes();
        let rows = arr.select(Axis(0), indices);
        let counts: Vec<usize> = indices.iter().map(|&i| a.sample_count[i].max(0) as usize).collect();
        let intervals: Vec<f64> = indices.iter().map(|&i| a.sample_interval[i] as f64).collect();
        let offsets: Vec<f64> = indices.iter().map(|&i| a.sample_offset[i].max(0) as f64).collect();
        resample_rows(rows.view(), &counts, &intervals, &offsets, policy, field.domain())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    #[test]
    fn test_same_interval_is_unchanged() {
        let rows = array![[-50.0f32, -51.0, -52.0], [-60.0, -61.0, f32::NAN]];
        let r = resample_rows(
            rows.view(),
            &[3, 2],
            &[128e-6, 128e-6],
            &[0.0, 0.0],
            ResampleInterval::Shortest,
            SampleDomain::Power,
        )
        .unwrap();
        assert_eq!(r.data.dim(), (2, 3));
        assert_eq!(r.data.row(0).to_vec(), vec![-50.0, -51.0, -52.0]);
        assert_eq!(r.data[[1, 1]], -61.0);
        assert!(r.data[[1, 2]].is_nan());
        assert_eq!(r.sample_interval, 128e-6);
        assert_eq!(r.sample_offset, 0.0);
    }

    #[test]
    fn test_offset_shift_only_at_target_interval() {
        let rows = array![[1.0f32, 2.0], [3.0, 4.0]];
        let r = resample_rows(
            rows.view(),
            &[2, 2],
            &[1e-4, 1e-4],
            &[2.0, 0.0],
            ResampleInterval::Shortest,
            SampleDomain::Linear,
        )
        .unwrap();
        assert_eq!(r.data.dim(), (2, 4));
        assert!(r.data[[0, 0]].is_nan());
        assert_eq!(r.data[[0, 2]], 1.0);
        assert_eq!(r.data[[1, 0]], 3.0);
        assert!(r.data[[1, 3]].is_nan());
    }

    #[test]
    fn test_upsample_replicates() {
        let rows = array![[1.0f32, 2.0, 3.0, 4.0], [7.0, 8.0, f32::NAN, f32::NAN]];
        let r = resample_rows(
            rows.view(),
            &[4, 2],
            &[128e-6, 256e-6],
            &[0.0, 0.0],
            ResampleInterval::Shortest,
            SampleDomain::Linear,
        )
        .unwrap();
        assert_eq!(r.data.dim(), (2, 4));
        assert_eq!(r.data.row(1).to_vec(), vec![7.0, 7.0, 8.0, 8.0]);
        assert_eq!(r.data.row(0).to_vec(), vec![1.0, 2.0, 3.0, 4.0]);
    }

    #[test]
    fn test_downsample_power_constant_is_preserved() {
        for &v in &[-70.0f32, -50.0, -34.0, -10.0] {
            for &n in &[2usize, 3, 4] {
                let fine = vec![v; 12];
                let rows = Array2::from_shape_vec((1, 12), fine).unwrap();
                let r = resample_rows(
                    rows.view(),
                    &[12],
                    &[64e-6],
                    &[0.0],
                    ResampleInterval::Fixed(64e-6 * n as f64),
                    SampleDomain::Power,
                )
                .unwrap();
                assert_eq!(r.data.ncols(), 12 / n);
                for x in r.data.iter() {
                    assert!((x - v).abs() < 1e-4, "v={v} n={n} got {x}");
                }
            }
        }
    }

    #[test]
    fn test_downsample_averages_in_linear_amplitude() {
        let rows = array![[-20.0f32, 0.0]];
        let r = resample_rows(
            rows.view(),
            &[2],
            &[1e-4],
            &[0.0],
            ResampleInterval::Fixed(2e-4),
            SampleDomain::Power,
        )
        .unwrap();
        let expected = 20.0 * ((0.1f64 + 1.0) / 2.0).log10();
        assert!((r.data[[0, 0]] as f64 - expected).abs() < 1e-5);

        let r = resample_rows(
            rows.view(),
            &[2],
            &[1e-4],
            &[0.0],
            ResampleInterval::Fixed(2e-4),
            SampleDomain::Linear,
        )
        .unwrap();
        assert!((r.data[[0, 0]] + 10.0).abs() < 1e-6);
    }

    #[test]
    fn test_partial_block_uses_available_values() {
        let rows = array![[1.0f32, 3.0, 5.0, 7.0, 9.0]];
        let r = resample_rows(
            rows.view(),
            &[5],
            &[1e-4],
            &[0.0],
            ResampleInterval::Fixed(2e-4),
            SampleDomain::Linear,
        )
        .unwrap();
        assert_eq!(r.data.row(0).to_vec(), vec![2.0, 6.0, 9.0]);
    }

    #[test]
    fn test_non_integer_ratio_takes_previous_sample() {
        let rows = array![[1.0f32, 2.0, 3.0, 4.0]];
        let r = resample_rows(
            rows.view(),
            &[4],
            &[0.75],
            &[0.0],
            ResampleInterval::Fixed(0.5),
            SampleDomain::Linear,
        )
        .unwrap();
        assert_eq!(r.data.row(0).to_vec(), vec![1.0, 1.0, 2.0, 3.0, 3.0, 4.0]);
    }

    #[test]
    fn test_offsets_use_output_grid() {
        // Offset of 4 samples at 128 us is 2 samples at 256 us.
        let rows = array![[1.0f32, 2.0], [5.0, 6.0]];
        let r = resample_rows(
            rows.view(),
            &[2, 2],
            &[256e-6, 128e-6],
            &[0.0, 4.0],
            ResampleInterval::Longest,
            SampleDomain::Linear,
        )
        .unwrap();
        assert_eq!(r.sample_interval, 256e-6);
        assert_eq!(r.data.dim(), (2, 3));
        assert_eq!(r.data[[1, 2]], 5.5);
        assert!(r.data[[1, 0]].is_nan());
    }

    #[test]
    fn test_invalid_inputs() {
        let rows = array![[1.0f32]];
        assert!(matches!(
            resample_rows(rows.view(), &[1], &[1e-4], &[0.0], ResampleInterval::Fixed(0.0), SampleDomain::Linear),
            Err(ResampleError::InvalidInterval(_))
        ));
        assert!(matches!(
            resample_rows(rows.view(), &[1], &[f64::NAN], &[0.0], ResampleInterval::Shortest, SampleDomain::Linear),
            Err(ResampleError::Empty)
        ));
    }
}
