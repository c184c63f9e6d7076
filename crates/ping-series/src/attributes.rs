//! Per-ping scalar attributes.
//!
//! Every attribute is a column of one value per ping. Empty cells (new pings,
//! widened stores, blanked deletes) hold the type's `EMPTY` value: NaN for
//! floats, -1 for signed integers, 0 for unsigned integers and `None` for
//! ping times.

use chrono::NaiveDateTime;

/// A value that can live in a per-ping column.
pub trait PingValue: Copy {
    const EMPTY: Self;
}

impl PingValue for f32 {
    const EMPTY: Self = f32::NAN;
}

impl PingValue for f64 {
    const EMPTY: Self = f64::NAN;
}

impl PingValue for i16 {
    const EMPTY: Self = -1;
}

impl PingValue for i32 {
    const EMPTY: Self = -1;
}

impl PingValue for u32 {
    const EMPTY: Self = 0;
}

impl PingValue for Option<NaiveDateTime> {
    const EMPTY: Self = None;
}

/// Destination rows for an insert: existing ping `j` moves to
/// `existing[j]`, inserted ping `k` lands at `inserted[k]`.
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct InsertPlan {
    pub total: usize,
    pub existing: Vec<usize>,
    pub inserted: Vec<usize>,
}

fn scatter<T: PingValue>(v: &mut Vec<T>, other: &[T], plan: &InsertPlan) {
    let mut out = vec![T::EMPTY; plan.total];
    for (&d, &x) in plan.existing.iter().zip(v.iter()) {
        out[d] = x;
    }
    for (&d, &x) in plan.inserted.iter().zip(other.iter()) {
        out[d] = x;
    }
    *v = out;
}

fn blank<T: PingValue>(v: &mut [T], indices: &[usize]) {
    for &i in indices {
        if let Some(x) = v.get_mut(i) {
            *x = T::EMPTY;
        }
    }
}

fn take<T: PingValue>(v: &[T], indices: &[usize]) -> Vec<T> {
    indices.iter().map(|&i| v[i]).collect()
}

macro_rules! ping_attributes {
    ($( $(#[$doc:meta])* $name:ident : $ty:ty ),* $(,)?) => {
        /// Scalar values of a single ping.
        #[derive(Debug, Clone, Copy, PartialEq)]
        pub struct PingHeader {
            $( $(#[$doc])* pub $name: $ty, )*
        }

        impl Default for PingHeader {
            fn default() -> Self {
                Self { $( $name: <$ty as PingValue>::EMPTY, )* }
            }
        }

        /// Column store of [`PingHeader`] values, one entry per ping.
        #[derive(Debug, Clone, Default, PartialEq)]
        pub struct PingAttributes {
            $( pub $name: Vec<$ty>, )*
        }

        impl PingAttributes {
            pub const NAMES: &'static [&'static str] = &[$( stringify!($name) ),*];

            /// Length of every column, in declaration order.
            pub fn lengths(&self) -> Vec<usize> {
                vec![$( self.$name.len() ),*]
            }

            pub fn header(&self, i: usize) -> Option<PingHeader> {
                if i >= self.ping_time.len() {
                    return None;
                }
                Some(PingHeader { $( $name: self.$name[i], )* })
            }

            pub(crate) fn with_len(n: usize) -> Self {
                Self { $( $name: vec![<$ty as PingValue>::EMPTY; n], )* }
            }

            pub(crate) fn push(&mut self, h: &PingHeader) {
                $( self.$name.push(h.$name); )*
            }

            pub(crate) fn resize(&mut self, n: usize) {
                $( self.$name.resize(n, <$ty as PingValue>::EMPTY); )*
            }

            pub(crate) fn blank(&mut self, indices: &[usize]) {
                $( blank(&mut self.$name, indices); )*
            }

            pub(crate) fn take(&self, indices: &[usize]) -> Self {
                Self { $( $name: take(&self.$name, indices), )* }
            }

            pub(crate) fn scatter(&mut self, other: &Self, plan: &InsertPlan) {
                $( scatter(&mut self.$name, &other.$name, plan); )*
            }
        }
    };
}

ping_attributes! {
    ping_time: Option<NaiveDateTime>,
    /// Nominal frequency for CW pings, Hz.
    frequency: f32,
    /// FM sweep start and end, Hz.
    frequency_start: f32,
    frequency_end: f32,
    transducer_depth: f32,
    transmit_power: f32,
    /// Seconds.
    pulse_length: f32,
    bandwidth: f32,
    /// Seconds between samples.
    sample_interval: f32,
    sound_velocity: f32,
    absorption_coefficient: f32,
    heave: f32,
    roll: f32,
    pitch: f32,
    temperature: f32,
    heading: f32,
    slope: f32,
    transmit_mode: i16,
    channel_mode: i16,
    /// 0 for CW, 1 for FM.
    pulse_form: i16,
    /// Index of the first stored sample.
    sample_offset: i32,
    sample_count: i32,
    /// Position of the source file in the read order.
    file_index: i32,
    /// Writer grouping key.
    output_group: u32,
}
