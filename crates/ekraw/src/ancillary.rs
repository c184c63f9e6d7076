//! Non-sample datagrams collected while reading: NMEA, annotations, motion,
//! bottom detections, filter stages and environment records.

use chrono::NaiveDateTime;
use simrad_core::filter::FilterStage;
use simrad_core::text::NmeaSentence;
use simrad_core::Environment;
use std::collections::BTreeMap;

fn seconds(t: NaiveDateTime) -> f64 {
    t.and_utc().timestamp_micros() as f64 * 1e-6
}

/// Linear interpolation of `(xs, ys)` at `x`; NaN outside `xs`. `xs` must be
/// sorted and free of duplicates.
pub fn interpolate(xs: &[f64], ys: &[f64], x: f64) -> f64 {
    if xs.is_empty() || x < xs[0] || x > xs[xs.len() - 1] {
        return f64::NAN;
    }
    let hi = xs.partition_point(|&v| v < x);
    if xs[hi] == x {
        return ys[hi];
    }
    let lo = hi - 1;
    let w = (x - xs[lo]) / (xs[hi] - xs[lo]);
    ys[lo] + (ys[hi] - ys[lo]) * w
}

/// Sort by time and drop repeated timestamps, keeping the first.
fn sorted_unique<T: Clone>(entries: &[(NaiveDateTime, T)]) -> Vec<(NaiveDateTime, T)> {
    let mut v = entries.to_vec();
    v.sort_by_key(|(t, _)| *t);
    v.dedup_by_key(|(t, _)| *t);
    v
}

#[derive(Debug, Clone, PartialEq)]
pub struct NmeaEntry {
    pub time: NaiveDateTime,
    pub sentence: NmeaSentence,
}

#[derive(Debug, Clone, Default)]
pub struct NmeaLog {
    pub entries: Vec<NmeaEntry>,
}

impl NmeaLog {
    pub fn push(&mut self, time: NaiveDateTime, sentence: NmeaSentence) {
        self.entries.push(NmeaEntry { time, sentence });
    }

    /// Sentences of one type (`GGA`, `VTG`, ...), optionally from one talker.
    pub fn by_type<'a>(&'a self, talker: Option<&'a str>, sentence_type: &'a str) -> impl Iterator<Item = &'a NmeaEntry> {
        self.entries.iter().filter(move |e| {
            e.sentence.sentence_type == sentence_type && talker.map_or(true, |t| e.sentence.talker == t)
        })
    }

    /// Count of sentences per `talker + type`.
    pub fn sentence_counts(&self) -> BTreeMap<String, usize> {
        let mut out = BTreeMap::new();
        for e in &self.entries {
            let key = format!("{}{}", e.sentence.talker, e.sentence.sentence_type);
            *out.entry(key).or_default() += 1;
        }
        out
    }
}

/// Motion values per ping.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MotionColumns {
    pub heave: Vec<f32>,
    pub pitch: Vec<f32>,
    pub roll: Vec<f32>,
    pub heading: Vec<f32>,
}

#[derive(Debug, Clone, Default)]
pub struct MotionLog {
    /// `(time, [heave, pitch, roll, heading])`.
    pub entries: Vec<(NaiveDateTime, [f32; 4])>,
}

impl MotionLog {
    pub fn push(&mut self, time: NaiveDateTime, heave: f32, pitch: f32, roll: f32, heading: f32) {
        self.entries.push((time, [heave, pitch, roll, heading]));
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Interpolate onto ping times. Pings outside the logged span, or with
    /// no time, get NaN.
    pub fn interpolate(&self, times: &[Option<NaiveDateTime>]) -> MotionColumns {
        let entries = sorted_unique(&self.entries);
        let xs: Vec<f64> = entries.iter().map(|(t, _)| seconds(*t)).collect();
        let column = |k: usize| -> Vec<f32> {
            let ys: Vec<f64> = entries.iter().map(|(_, v)| v[k] as f64).collect();
            times
                .iter()
                .map(|t| t.map_or(f32::NAN, |t| interpolate(&xs, &ys, seconds(t)) as f32))
                .collect()
        };
        MotionColumns {
            heave: column(0),
            pitch: column(1),
            roll: column(2),
            heading: column(3),
        }
    }
}

/// One bottom detection.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BottomDetection {
    pub depth: f64,
    /// DEP0 only; NaN for BOT0.
    pub reflectivity: f32,
}

#[derive(Debug, Clone, Default)]
pub struct BottomLog {
    pub channels: BTreeMap<String, Vec<(NaiveDateTime, BottomDetection)>>,
}

impl BottomLog {
    pub fn push(&mut self, channel_id: &str, time: NaiveDateTime, detection: BottomDetection) {
        self.channels
            .entry(channel_id.to_string())
            .or_default()
            .push((time, detection));
    }

    /// Bottom depth for each ping time, NaN where no detection brackets it.
    pub fn interpolate(&self, channel_id: &str, times: &[Option<NaiveDateTime>]) -> Vec<f64> {
        let Some(entries) = self.channels.get(channel_id) else {
            return vec![f64::NAN; times.len()];
        };
        let entries = sorted_unique(entries);
        let xs: Vec<f64> = entries.iter().map(|(t, _)| seconds(*t)).collect();
        let ys: Vec<f64> = entries.iter().map(|(_, d)| d.depth).collect();
        times
            .iter()
            .map(|t| t.map_or(f64::NAN, |t| interpolate(&xs, &ys, seconds(t))))
            .collect()
    }
}

/// Latest filter stages per channel, keyed by stage number.
#[derive(Debug, Clone, Default)]
pub struct FilterLog {
    pub channels: BTreeMap<String, BTreeMap<i16, (NaiveDateTime, FilterStage)>>,
}

impl FilterLog {
    pub fn push(&mut self, time: NaiveDateTime, stage: FilterStage) {
        self.channels
            .entry(stage.channel_id.clone())
            .or_default()
            .insert(stage.stage, (time, stage));
    }

    pub fn stages(&self, channel_id: &str) -> impl Iterator<Item = &(NaiveDateTime, FilterStage)> {
        self.channels.get(channel_id).into_iter().flat_map(|m| m.values())
    }
}

/// Everything read that is not a sample datagram.
#[derive(Debug, Clone, Default)]
pub struct AncillaryData {
    pub nmea: NmeaLog,
    pub annotations: Vec<(NaiveDateTime, String)>,
    pub motion: MotionLog,
    pub bottom: BottomLog,
    pub filters: FilterLog,
    pub environment: Vec<(NaiveDateTime, Environment)>,
}

impl AncillaryData {
    /// Most recent environment record at or before `t`.
    pub fn environment_at(&self, t: NaiveDateTime) -> Option<&Environment> {
        self.environment
            .iter()
            .filter(|(et, _)| *et <= t)
            .max_by_key(|(et, _)| *et)
            .map(|(_, e)| e)
    }
}
