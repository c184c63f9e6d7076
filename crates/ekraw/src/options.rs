//! Reader and writer options.

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// What to do with a record whose NT timestamp cannot be represented.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum CorruptTimePolicy {
    /// Skip the record and keep reading.
    #[default]
    Skip,
    /// Stop reading the file.
    Abort,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReadOptions {
    /// Only read these channel IDs.
    pub channel_ids: Option<Vec<String>>,
    /// Only read channels with these nominal frequencies, Hz.
    pub frequencies: Option<Vec<f64>>,
    pub start_time: Option<NaiveDateTime>,
    pub end_time: Option<NaiveDateTime>,
    /// 1-based, counted across all files read by one reader.
    pub start_ping: Option<u64>,
    pub end_ping: Option<u64>,
    pub store_power: bool,
    pub store_angles: bool,
    pub store_complex: bool,
    /// Truncate incoming sample vectors to this many samples.
    pub max_sample_count: Option<usize>,
    pub corrupt_time_policy: CorruptTimePolicy,
}

impl Default for ReadOptions {
    fn default() -> Self {
        Self {
            channel_ids: None,
            frequencies: None,
            start_time: None,
            end_time: None,
            start_ping: None,
            end_ping: None,
            store_power: true,
            store_angles: true,
            store_complex: true,
            max_sample_count: None,
            corrupt_time_policy: CorruptTimePolicy::Skip,
        }
    }
}

impl ReadOptions {
    pub fn accepts_channel(&self, channel_id: &str, frequency: f64) -> bool {
        let id_ok = self
            .channel_ids
            .as_ref()
            .map_or(true, |ids| ids.iter().any(|id| id == channel_id));
        let freq_ok = self
            .frequencies
            .as_ref()
            .map_or(true, |fs| fs.iter().any(|f| (f - frequency).abs() < 0.5));
        id_ok && freq_ok
    }

    pub fn accepts_time(&self, t: NaiveDateTime) -> bool {
        self.start_time.map_or(true, |s| t >= s) && self.end_time.map_or(true, |e| t <= e)
    }

    pub fn accepts_ping(&self, number: u64) -> bool {
        self.start_ping.map_or(true, |s| number >= s) && self.end_ping.map_or(true, |e| number <= e)
    }

    /// True once `t` or `number` is past the end bounds.
    pub fn past_end(&self, t: NaiveDateTime, number: u64) -> bool {
        self.end_time.is_some_and(|e| t > e) || self.end_ping.is_some_and(|e| number > e)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WriteOptions {
    pub output_dir: PathBuf,
    pub prefix: String,
    pub suffix: String,
    pub overwrite: bool,
    /// `chrono` strftime pattern for the time part of the file name.
    pub time_format: String,
}

impl Default for WriteOptions {
    fn default() -> Self {
        Self {
            output_dir: PathBuf::from("."),
            prefix: String::new(),
            suffix: String::new(),
            overwrite: false,
            time_format: "D%Y%m%d-T%H%M%S".to_string(),
        }
    }
}

impl WriteOptions {
    /// `<prefix><time><suffix>.raw` for a file starting at `start`.
    pub fn file_name(&self, start: NaiveDateTime) -> String {
        format!(
            "{}{}{}.raw",
            self.prefix,
            start.format(&self.time_format),
            self.suffix
        )
    }

    /// Output file for one group. The group number is appended to the
    /// suffix when more than one group is written.
    pub fn output_path(&self, start: NaiveDateTime, group: Option<u32>) -> PathBuf {
        let name = match group {
            Some(g) => format!(
                "{}{}{}-G{}.raw",
                self.prefix,
                start.format(&self.time_format),
                self.suffix,
                g
            ),
            None => self.file_name(start),
        };
        self.output_dir.join(name)
    }
}
