//! Raw file reader: streams datagrams file by file, routes samples to
//! channel stores and collects the ancillary logs.

use crate::ancillary::{AncillaryData, BottomDetection};
use crate::channel::{
    power_from_index, Channel, ConfigurationRecord, FileConfiguration, StoreKey, PULSE_CW,
};
use crate::demux::{ChannelDemux, Route};
use crate::error::RawError;
use crate::options::{CorruptTimePolicy, ReadOptions};
use chrono::NaiveDateTime;
use ping_series::{
    PingHeader, PingSamples, PingSelection, PingSeries, ProcessedSeries, ResampleInterval,
    SampleField, SampleKind,
};
use serde::{Deserialize, Serialize};
use simrad_core::{
    CalibrationParameters, Datagram, DatagramError, Payload, PingParameters, SampleV0, SampleV3,
    XmlDatagram,
};
use simrad_io::{DatagramStream, RecordCounts, StreamItem};
use std::collections::{BTreeMap, HashMap};
use std::fs::File;
use std::io::{BufReader, Read};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};

/// What happened while reading one file.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FileReport {
    pub file_index: usize,
    pub path: Option<PathBuf>,
    pub counts: RecordCounts,
    pub pings_read: u64,
    /// Sample datagrams dropped by the channel, time or ping filters.
    pub pings_filtered: u64,
    /// Records dropped because their timestamp could not be decoded.
    pub corrupt_times: u64,
    /// Set when reading stopped early; pings read before that are kept.
    pub aborted: Option<String>,
}

/// Per-file reader state. Slot maps and ping parameters never outlive the
/// file they were read from.
struct FileState {
    file_index: usize,
    demux: ChannelDemux,
    parameters: HashMap<String, PingParameters>,
    sound_speed: Option<f64>,
    beam_config: Option<simrad_core::BeamConfiguration>,
    report: FileReport,
}

enum Flow {
    Continue,
    /// Past the end bounds, nothing more to read in this file.
    Stop,
}

#[derive(Debug, Default)]
pub struct RawReader {
    options: ReadOptions,
    channels: BTreeMap<String, Channel>,
    configurations: Vec<FileConfiguration>,
    ancillary: AncillaryData,
    reports: Vec<FileReport>,
    /// Transmit cycles seen so far, across files.
    ping_number: u64,
    last_ping_time: Option<NaiveDateTime>,
}

impl RawReader {
    pub fn new(options: ReadOptions) -> Self {
        Self {
            options,
            ..Default::default()
        }
    }

    pub fn options(&self) -> &ReadOptions {
        &self.options
    }

    pub fn channels(&self) -> impl Iterator<Item = &Channel> {
        self.channels.values()
    }

    pub fn channel(&self, channel_id: &str) -> Option<&Channel> {
        self.channels.get(channel_id)
    }

    pub fn channel_mut(&mut self, channel_id: &str) -> Option<&mut Channel> {
        self.channels.get_mut(channel_id)
    }

    pub fn channel_ids(&self) -> impl Iterator<Item = &str> {
        self.channels.keys().map(String::as_str)
    }

    pub fn series(&self, channel_id: &str, key: StoreKey) -> Option<&PingSeries> {
        self.channels.get(channel_id).and_then(|c| c.store(key))
    }

    pub fn series_mut(&mut self, channel_id: &str, key: StoreKey) -> Option<&mut PingSeries> {
        self.channels.get_mut(channel_id).and_then(|c| c.store_mut(key))
    }

    pub fn configurations(&self) -> &[FileConfiguration] {
        &self.configurations
    }

    pub fn ancillary(&self) -> &AncillaryData {
        &self.ancillary
    }

    pub fn reports(&self) -> &[FileReport] {
        &self.reports
    }

    pub(crate) fn parts(&self) -> (&BTreeMap<String, Channel>, &[FileConfiguration], &AncillaryData) {
        (&self.channels, &self.configurations, &self.ancillary)
    }

    pub fn read_file(&mut self, path: impl AsRef<Path>) -> Result<FileReport, RawError> {
        let path = path.as_ref();
        let file = File::open(path).map_err(|source| RawError::Open {
            path: path.to_path_buf(),
            source,
        })?;
        log::info!("Reading {}", path.display());
        self.read_stream(BufReader::new(file), Some(path.to_path_buf()))
    }

    pub fn read_files<P: AsRef<Path>>(&mut self, paths: &[P]) -> Result<Vec<FileReport>, RawError> {
        self.read_files_with_cancel(paths, &AtomicBool::new(false))
    }

    /// Read files in order, checking `cancel` before each one. Files read
    /// before cancellation stay in the reader.
    pub fn read_files_with_cancel<P: AsRef<Path>>(
        &mut self,
        paths: &[P],
        cancel: &AtomicBool,
    ) -> Result<Vec<FileReport>, RawError> {
        let mut out = Vec::with_capacity(paths.len());
        for p in paths {
            if cancel.load(Ordering::Relaxed) {
                log::info!("Reading cancelled after {} of {} files", out.len(), paths.len());
                break;
            }
            out.push(self.read_file(p)?);
        }
        Ok(out)
    }

    /// Read one datagram stream as the next file. File-fatal errors end the
    /// file and are recorded in the report; other errors are returned.
    pub fn read_stream<R: Read>(&mut self, reader: R, path: Option<PathBuf>) -> Result<FileReport, RawError> {
        let file_index = self.reports.len();
        let mut state = FileState {
            file_index,
            demux: ChannelDemux::default(),
            parameters: HashMap::new(),
            sound_speed: None,
            beam_config: None,
            report: FileReport {
                file_index,
                path,
                ..Default::default()
            },
        };

        let mut stream = DatagramStream::new(reader);
        loop {
            let item = match stream.next_item() {
                Ok(Some(item)) => item,
                Ok(None) => break,
                Err(e) => {
                    abort(&mut state.report, e.into());
                    break;
                }
            };
            let result = match item {
                StreamItem::Skipped(rec) => self.handle_skipped(&mut state, rec.offset, &rec.error),
                StreamItem::Datagram(d) => self.handle(&mut state, d),
            };
            match result {
                Ok(Flow::Continue) => {}
                Ok(Flow::Stop) => {
                    log::debug!("Past the end bounds at byte {}", stream.position());
                    break;
                }
                Err(e) if e.is_file_fatal() => {
                    abort(&mut state.report, e);
                    break;
                }
                Err(e) => return Err(e),
            }
        }

        if let Some(b) = state.beam_config.take() {
            if let Some(c) = self
                .configurations
                .iter_mut()
                .rev()
                .find(|c| c.file_index == file_index)
            {
                c.beam_config = Some(b);
            }
        }

        let mut report = state.report;
        report.counts = stream.into_counts();
        log::info!(
            "File {}: {} datagrams, {} pings, {} filtered, {} unknown, {} skipped",
            file_index,
            report.counts.decoded,
            report.pings_read,
            report.pings_filtered,
            report.counts.unknown_total(),
            report.counts.skipped + report.counts.unsupported_versions
        );
        self.reports.push(report.clone());
        Ok(report)
    }

    fn handle_skipped(&mut self, state: &mut FileState, offset: u64, error: &DatagramError) -> Result<Flow, RawError> {
        if let DatagramError::CorruptTimestamp(_) = error {
            state.report.corrupt_times += 1;
            if self.options.corrupt_time_policy == CorruptTimePolicy::Abort {
                return Err(RawError::CorruptTimestamp { offset });
            }
        }
        Ok(Flow::Continue)
    }

    fn handle(&mut self, state: &mut FileState, d: Datagram) -> Result<Flow, RawError> {
        let t = d.timestamp;
        let offset = d.file_offset;
        match d.payload {
            Payload::Configuration(c) => {
                state.demux.configure_legacy(&c, &self.options);
                for x in &c.transceivers {
                    self.ensure_channel(x.channel_id(), x.frequency() as f64);
                }
                self.push_configuration(state, t, ConfigurationRecord::Legacy(c));
            }
            Payload::BeamConfiguration(b) => state.beam_config = Some(b),
            Payload::Xml(XmlDatagram::Configuration(c)) => {
                state.demux.configure_xml(&c, &self.options);
                for ch in &c.channels {
                    self.ensure_channel(&ch.channel_id, ch.frequency().unwrap_or(f64::NAN));
                }
                self.push_configuration(state, t, ConfigurationRecord::Xml(c));
            }
            Payload::Xml(XmlDatagram::Parameter(p)) => match p.channel_id() {
                Some(id) => {
                    state.parameters.insert(id.to_string(), p);
                }
                None => log::warn!("Parameter datagram at byte {} has no channel ID", offset),
            },
            Payload::Xml(XmlDatagram::Environment(e)) => {
                if let Some(c) = e.sound_speed() {
                    state.sound_speed = Some(c);
                }
                self.ancillary.environment.push((t, e));
            }
            Payload::Xml(XmlDatagram::Other { subtype, .. }) => {
                log::debug!("Ignoring XML0 {} datagram at byte {}", subtype, offset);
            }
            Payload::Sample(s) => return self.handle_raw0(state, t, offset, s),
            Payload::ChannelSample(s) => return self.handle_raw3(state, t, offset, s),
            Payload::Nmea(n) => {
                if self.options.accepts_time(t) {
                    self.ancillary.nmea.push(t, n);
                }
            }
            Payload::Annotation(a) => {
                if self.options.accepts_time(t) {
                    self.ancillary.annotations.push((t, a.text));
                }
            }
            Payload::Motion(m) => {
                self.ancillary.motion.push(t, m.heave, m.pitch, m.roll, m.heading);
            }
            Payload::Depth(dep) => {
                for (i, e) in dep.entries.iter().enumerate() {
                    if let Some(Route::Accepted(id)) = state.demux.route_index(i) {
                        let detection = BottomDetection {
                            depth: e.depth as f64,
                            reflectivity: e.reflectivity,
                        };
                        self.ancillary.bottom.push(id, t, detection);
                    }
                }
            }
            Payload::Bottom(bot) => {
                for (i, &depth) in bot.depths.iter().enumerate() {
                    if let Some(Route::Accepted(id)) = state.demux.route_index(i) {
                        let detection = BottomDetection {
                            depth,
                            reflectivity: f32::NAN,
                        };
                        self.ancillary.bottom.push(id, t, detection);
                    }
                }
            }
            Payload::Filter(f) => match state.demux.route_id(&f.channel_id, offset) {
                Ok(Route::Filtered(_)) => {}
                Ok(Route::Accepted(_)) => self.ancillary.filters.push(t, f),
                Err(_) => {
                    log::warn!("Filter stage for unconfigured channel {} at byte {}", f.channel_id, offset);
                    self.ancillary.filters.push(t, f);
                }
            },
        }
        Ok(Flow::Continue)
    }

    fn ensure_channel(&mut self, channel_id: &str, frequency: f64) {
        if !self.options.accepts_channel(channel_id, frequency) {
            return;
        }
        self.channels
            .entry(channel_id.to_string())
            .or_insert_with(|| Channel::new(channel_id, frequency));
    }

    fn push_configuration(&mut self, state: &FileState, t: NaiveDateTime, record: ConfigurationRecord) {
        log::debug!(
            "File {} configuration: {} channels",
            state.file_index,
            record.channel_ids().len()
        );
        self.configurations.push(FileConfiguration {
            file_index: state.file_index,
            path: state.report.path.clone(),
            timestamp: t,
            record,
            beam_config: None,
        });
    }

    /// The ping counter advances once per transmit cycle, whatever the
    /// channel filters do with the samples.
    fn count_ping(&mut self, t: NaiveDateTime) {
        if self.last_ping_time != Some(t) {
            self.ping_number += 1;
            self.last_ping_time = Some(t);
        }
    }

    /// Apply the time and ping bounds. `Some` means the ping is dropped.
    fn admit_ping(&self, state: &mut FileState, t: NaiveDateTime) -> Option<Flow> {
        if self.options.past_end(t, self.ping_number) {
            state.report.pings_filtered += 1;
            return Some(Flow::Stop);
        }
        if !self.options.accepts_time(t) || !self.options.accepts_ping(self.ping_number) {
            state.report.pings_filtered += 1;
            return Some(Flow::Continue);
        }
        None
    }

    fn handle_raw0(&mut self, state: &mut FileState, t: NaiveDateTime, offset: u64, s: SampleV0) -> Result<Flow, RawError> {
        self.count_ping(t);
        let channel_id = match state.demux.route_slot(s.channel, offset)? {
            Route::Accepted(id) => id.to_string(),
            Route::Filtered(_) => {
                state.report.pings_filtered += 1;
                return Ok(Flow::Continue);
            }
        };
        if let Some(flow) = self.admit_ping(state, t) {
            return Ok(flow);
        }

        let max = self.options.max_sample_count.unwrap_or(usize::MAX);
        let power: Option<Vec<f32>> = s
            .power
            .as_ref()
            .filter(|_| self.options.store_power)
            .map(|p| p.iter().take(max).map(|&v| power_from_index(v)).collect());
        let angles = s.angle.as_ref().filter(|_| self.options.store_angles);
        let along: Option<Vec<f32>> = angles.map(|a| a.iter().take(max).map(|x| x.alongship as f32).collect());
        let athwart: Option<Vec<f32>> = angles.map(|a| a.iter().take(max).map(|x| x.athwartship as f32).collect());

        let header = PingHeader {
            ping_time: Some(t),
            frequency: s.frequency,
            transducer_depth: s.transducer_depth,
            transmit_power: s.transmit_power,
            pulse_length: s.pulse_length,
            bandwidth: s.bandwidth,
            sample_interval: s.sample_interval,
            sound_velocity: s.sound_velocity,
            absorption_coefficient: s.absorption_coefficient,
            heave: s.heave,
            roll: s.roll,
            pitch: s.pitch,
            temperature: s.temperature,
            heading: s.heading,
            transmit_mode: s.transmit_mode,
            pulse_form: PULSE_CW,
            sample_offset: s.offset,
            file_index: state.file_index as i32,
            output_group: 0,
            ..Default::default()
        };
        let samples = PingSamples {
            power: power.as_deref(),
            angles_alongship: along.as_deref(),
            angles_athwartship: athwart.as_deref(),
            complex: None,
        };

        let (store_power, store_angles) = (self.options.store_power, self.options.store_angles);
        let channel = self
            .channels
            .entry(channel_id.clone())
            .or_insert_with(|| Channel::new(channel_id.clone(), s.frequency as f64));
        let frequency = channel.frequency();
        channel
            .store_or_insert_with(StoreKey::power_angle(), || {
                PingSeries::power_angle(channel_id.clone(), frequency, store_power, store_angles)
            })
            .append_ping(&header, &samples)?;
        state.report.pings_read += 1;
        Ok(Flow::Continue)
    }

    fn handle_raw3(&mut self, state: &mut FileState, t: NaiveDateTime, offset: u64, s: SampleV3) -> Result<Flow, RawError> {
        self.count_ping(t);
        let channel_id = match state.demux.route_id(&s.channel_id, offset)? {
            Route::Accepted(id) => id.to_string(),
            Route::Filtered(_) => {
                state.report.pings_filtered += 1;
                return Ok(Flow::Continue);
            }
        };
        if let Some(flow) = self.admit_ping(state, t) {
            return Ok(flow);
        }

        let record = state.parameters.get(&channel_id).map(|p| &p.record);
        if record.is_none() {
            log::debug!("No ping parameters for {} at byte {}", channel_id, offset);
        }
        let value = |name: &str| record.and_then(|r| r.f64(name)).map_or(f32::NAN, |v| v as f32);
        let pulse_form = record
            .and_then(|r| r.i64("pulse_form"))
            .map_or(PULSE_CW, |v| v as i16);
        let header = PingHeader {
            ping_time: Some(t),
            frequency: value("frequency"),
            frequency_start: value("frequency_start"),
            frequency_end: value("frequency_end"),
            pulse_length: value("pulse_duration"),
            sample_interval: value("sample_interval"),
            transmit_power: value("transmit_power"),
            slope: value("slope"),
            channel_mode: record.and_then(|r| r.i64("channel_mode")).map_or(-1, |v| v as i16),
            pulse_form,
            sound_velocity: state.sound_speed.map_or(f32::NAN, |c| c as f32),
            sample_offset: s.offset,
            file_index: state.file_index as i32,
            output_group: 0,
            ..Default::default()
        };

        let max = self.options.max_sample_count.unwrap_or(usize::MAX);
        let channel = self
            .channels
            .entry(channel_id.clone())
            .or_insert_with(|| Channel::new(channel_id.clone(), header.frequency as f64));
        let frequency = channel.frequency();
        let mut appended = false;

        if let Some(c) = s.complex.as_ref().filter(|_| self.options.store_complex) {
            let nc = c.n_complex;
            let n = c.samples.len().min(max.saturating_mul(nc));
            let key = StoreKey {
                kind: SampleKind::Complex,
                pulse_form,
            };
            channel
                .store_or_insert_with(key, || PingSeries::complex(channel_id.clone(), frequency, nc))
                .append_ping(
                    &header,
                    &PingSamples {
                        complex: Some(&c.samples[..n]),
                        ..Default::default()
                    },
                )?;
            appended = true;
        }

        let power: Option<Vec<f32>> = s
            .power
            .as_ref()
            .filter(|_| self.options.store_power)
            .map(|p| p.iter().take(max).map(|&v| power_from_index(v)).collect());
        let angles = s.angle.as_ref().filter(|_| self.options.store_angles);
        let along: Option<Vec<f32>> = angles.map(|a| a.iter().take(max).map(|x| x.alongship as f32).collect());
        let athwart: Option<Vec<f32>> = angles.map(|a| a.iter().take(max).map(|x| x.athwartship as f32).collect());
        if power.is_some() || along.is_some() {
            let (store_power, store_angles) = (self.options.store_power, self.options.store_angles);
            let key = StoreKey {
                kind: SampleKind::PowerAngle,
                pulse_form,
            };
            channel
                .store_or_insert_with(key, || {
                    PingSeries::power_angle(channel_id.clone(), frequency, store_power, store_angles)
                })
                .append_ping(
                    &header,
                    &PingSamples {
                        power: power.as_deref(),
                        angles_alongship: along.as_deref(),
                        angles_athwartship: athwart.as_deref(),
                        complex: None,
                    },
                )?;
            appended = true;
        }

        if appended {
            state.report.pings_read += 1;
        } else {
            state.report.pings_filtered += 1;
        }
        Ok(Flow::Continue)
    }

    /// Calibration for a channel from the most recent configuration that
    /// lists it. Sound speed comes from the latest environment record, when
    /// there is one.
    pub fn get_calibration(&self, channel_id: &str, pulse_length: Option<f64>) -> Result<CalibrationParameters, RawError> {
        let mut cal = self
            .configurations
            .iter()
            .rev()
            .find_map(|c| c.record.calibration(channel_id, pulse_length))
            .ok_or_else(|| RawError::UnknownChannel(channel_id.to_string()))?;
        if let Some((_, env)) = self.ancillary.environment.last() {
            cal.sound_velocity = env.sound_speed();
        }
        Ok(cal)
    }

    /// Interpolate the MRU motion log onto every store.
    pub fn apply_motion(&mut self) -> Result<(), RawError> {
        if self.ancillary.motion.is_empty() {
            return Ok(());
        }
        for c in self.channels.values_mut() {
            c.apply_motion(&self.ancillary.motion)?;
        }
        Ok(())
    }

    /// Assign pings to a writer output group, for one channel or all.
    pub fn set_output_group(&mut self, channel_id: Option<&str>, group: u32) -> Result<(), RawError> {
        match channel_id {
            Some(id) => self
                .channels
                .get_mut(id)
                .ok_or_else(|| RawError::UnknownChannel(id.to_string()))?
                .set_output_group(group),
            None => self.channels.values_mut().for_each(|c| c.set_output_group(group)),
        }
        Ok(())
    }

    /// Resampled samples of one store with a range axis and calibration.
    pub fn processed(
        &self,
        channel_id: &str,
        key: StoreKey,
        field: SampleField,
        policy: ResampleInterval,
        selection: &PingSelection,
    ) -> Result<ProcessedSeries, RawError> {
        let series = self
            .series(channel_id, key)
            .ok_or_else(|| RawError::UnknownChannel(channel_id.to_string()))?;
        let indices = series.get_indices(selection);
        let pulse_length = indices
            .first()
            .map(|&i| series.attributes().pulse_length[i] as f64)
            .filter(|p| p.is_finite());
        let calibration = self.get_calibration(channel_id, pulse_length).ok();
        Ok(ProcessedSeries::from_series(series, &indices, field, policy, calibration)?)
    }
}

fn abort(report: &mut FileReport, e: RawError) {
    log::warn!("Stopped reading file {}: {}", report.file_index, e);
    report.aborted = Some(e.to_string());
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, NaiveDate};
    use simrad_core::config::Er60Transceiver;
    use simrad_core::depth::{BottomDepths, DepthDetections, DepthEntry};
    use simrad_core::motion::Motion;
    use simrad_core::sample::ElectricalAngle;
    use simrad_core::{LegacyConfiguration, Transceiver};
    use simrad_io::write_frame;
    use std::io::Cursor;

    fn t(s: i64) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2012, 6, 20)
            .unwrap()
            .and_hms_opt(1, 0, 0)
            .unwrap()
            + Duration::seconds(s)
    }

    fn config(ids: &[(&str, f32)]) -> Payload {
        Payload::Configuration(LegacyConfiguration {
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
        })
    }

    fn raw0(slot: i16, n: usize) -> Payload {
        Payload::Sample(SampleV0 {
            channel: slot,
            mode: SampleV0::MODE_POWER | SampleV0::MODE_ANGLE,
            frequency: 38000.0,
            sample_interval: 256e-6,
            sound_velocity: 1500.0,
            count: n as i32,
            power: Some((0..n as i16).map(|k| -1000 * k).collect()),
            angle: Some(vec![
                ElectricalAngle {
                    athwartship: -2,
                    alongship: 3
                };
                n
            ]),
            ..Default::default()
        })
    }

    fn stream(items: &[(i64, Payload)]) -> Cursor<Vec<u8>> {
        let mut buf = Vec::new();
        for (s, p) in items {
            let d = Datagram::new(t(*s), p.clone());
            write_frame(&mut buf, &d.encode().unwrap()).unwrap();
        }
        Cursor::new(buf)
    }

    #[test]
    fn test_reads_power_and_angles() {
        let mut r = RawReader::new(ReadOptions::default());
        let report = r
            .read_stream(
                stream(&[(0, config(&[("GPT 38", 38000.0)])), (1, raw0(1, 4)), (2, raw0(1, 6))]),
                None,
            )
            .unwrap();
        assert_eq!(report.pings_read, 2);
        assert!(report.aborted.is_none());

        let s = r.series("GPT 38", StoreKey::power_angle()).unwrap();
        assert_eq!(s.n_pings(), 2);
        assert_eq!(s.n_samples(), 6);
        let p = s.power().unwrap();
        assert!((p[[0, 1]] as f64 + 1000.0 * crate::channel::INDEX2POWER).abs() < 1e-3);
        assert!(p[[0, 5]].is_nan());
        assert_eq!(s.angles_alongship().unwrap()[[1, 0]], 3.0);
        assert_eq!(s.angles_athwartship().unwrap()[[1, 0]], -2.0);
        assert_eq!(s.attributes().sample_count, vec![4, 6]);
    }

    #[test]
    fn test_sample_before_configuration_aborts_file() {
        let mut r = RawReader::new(ReadOptions::default());
        let report = r
            .read_stream(stream(&[(1, raw0(1, 4)), (2, config(&[("GPT 38", 38000.0)]))]), None)
            .unwrap();
        assert!(report.aborted.as_deref().is_some_and(|m| m.contains("precedes its configuration")));
        assert_eq!(report.pings_read, 0);
    }

    #[test]
    fn test_abort_keeps_pings_read() {
        let mut r = RawReader::new(ReadOptions::default());
        let report = r
            .read_stream(
                stream(&[(0, config(&[("GPT 38", 38000.0)])), (1, raw0(1, 4)), (2, raw0(2, 4))]),
                None,
            )
            .unwrap();
        assert!(report.aborted.is_some());
        assert_eq!(r.series("GPT 38", StoreKey::power_angle()).unwrap().n_pings(), 1);
    }

    #[test]
    fn test_ping_and_frequency_filters() {
        let opts = ReadOptions {
            frequencies: Some(vec![38000.0]),
            start_ping: Some(2),
            ..Default::default()
        };
        let mut r = RawReader::new(opts);
        let items = [
            (0, config(&[("GPT 38", 38000.0), ("GPT 120", 120000.0)])),
            (1, raw0(1, 4)),
            (1, raw0(2, 4)),
            (2, raw0(1, 4)),
            (2, raw0(2, 4)),
            (3, raw0(1, 4)),
        ];
        let report = r.read_stream(stream(&items), None).unwrap();
        assert_eq!(report.pings_read, 2);
        assert_eq!(report.pings_filtered, 3);
        assert!(r.channel("GPT 120").is_none());
        let s = r.series("GPT 38", StoreKey::power_angle()).unwrap();
        assert_eq!(s.ping_times(), &[Some(t(2)), Some(t(3))]);
    }

    #[test]
    fn test_end_time_stops_file() {
        let opts = ReadOptions {
            end_time: Some(t(2)),
            ..Default::default()
        };
        let mut r = RawReader::new(opts);
        let items = [
            (0, config(&[("GPT 38", 38000.0)])),
            (1, raw0(1, 4)),
            (2, raw0(1, 4)),
            (3, raw0(1, 4)),
            (4, raw0(1, 4)),
        ];
        let report = r.read_stream(stream(&items), None).unwrap();
        assert_eq!(report.pings_read, 2);
        assert_eq!(report.pings_filtered, 1);
    }

    #[test]
    fn test_max_sample_count_and_storage_flags() {
        let opts = ReadOptions {
            store_angles: false,
            max_sample_count: Some(3),
            ..Default::default()
        };
        let mut r = RawReader::new(opts);
        r.read_stream(stream(&[(0, config(&[("GPT 38", 38000.0)])), (1, raw0(1, 8))]), None)
            .unwrap();
        let s = r.series("GPT 38", StoreKey::power_angle()).unwrap();
        assert_eq!(s.n_samples(), 3);
        assert!(s.angles_alongship().is_none());
    }

    #[test]
    fn test_ancillary_routing() {
        let mut r = RawReader::new(ReadOptions::default());
        let items = [
            (0, config(&[("GPT 38", 38000.0), ("GPT 120", 120000.0)])),
            (
                1,
                Payload::Depth(DepthDetections {
                    entries: vec![
                        DepthEntry {
                            depth: 50.0,
                            reflectivity: -20.0,
                            unused: 0.0,
                        },
                        DepthEntry {
                            depth: 51.0,
                            reflectivity: -21.0,
                            unused: 0.0,
                        },
                    ],
                }),
            ),
            (2, Payload::Bottom(BottomDepths { depths: vec![52.0, 53.0] })),
            (3, Payload::Motion(Motion { heave: 0.5, roll: 1.0, pitch: 2.0, heading: 3.0 })),
            (4, Payload::Nmea(simrad_core::text::NmeaSentence::new("$GPGGA,1"))),
        ];
        r.read_stream(stream(&items), None).unwrap();
        let a = r.ancillary();
        assert_eq!(a.bottom.channels["GPT 120"].len(), 2);
        assert_eq!(a.bottom.channels["GPT 38"][0].1.reflectivity, -20.0);
        assert_eq!(a.motion.len(), 1);
        assert_eq!(a.nmea.by_type(Some("GP"), "GGA").count(), 1);
    }

    #[test]
    fn test_get_calibration() {
        let mut r = RawReader::new(ReadOptions::default());
        r.read_stream(stream(&[(0, config(&[("GPT 38", 38000.0)]))]), None)
            .unwrap();
        let cal = r.get_calibration("GPT 38", None).unwrap();
        assert_eq!(cal.frequency, 38000.0);
        assert!(matches!(
            r.get_calibration("GPT 18", None),
            Err(RawError::UnknownChannel(_))
        ));
    }

    #[test]
    fn test_cancel_before_first_file() {
        let mut r = RawReader::new(ReadOptions::default());
        let cancel = AtomicBool::new(true);
        let reports = r
            .read_files_with_cancel(&["/nonexistent/a.raw"], &cancel)
            .unwrap();
        assert!(reports.is_empty());
        assert!(matches!(
            r.read_files(&["/nonexistent/a.raw"]),
            Err(RawError::Open { .. })
        ));
    }
}
