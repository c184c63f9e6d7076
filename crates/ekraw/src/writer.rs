//! Raw file writer. One output file per output group: configuration
//! datagrams first, then every other datagram of the group in time order.

use crate::ancillary::{AncillaryData, BottomDetection};
use crate::channel::{angle_step, index_from_power, Channel, ConfigurationRecord, FileConfiguration};
use crate::error::RawError;
use crate::options::WriteOptions;
use crate::reader::RawReader;
use chrono::NaiveDateTime;
use ndarray::s;
use num_complex::Complex32;
use ping_series::{PingHeader, PingSeries, SampleKind};
use serde::{Deserialize, Serialize};
use simrad_core::depth::{BottomDepths, DepthDetections, DepthEntry};
use simrad_core::motion::Motion;
use simrad_core::sample::ElectricalAngle;
use simrad_core::text::Annotation;
use simrad_core::xml::{XmlRecord, XmlValue};
use simrad_core::{
    ComplexPrecision, ComplexSamples, Datagram, LegacyConfiguration, Payload, PingParameters,
    SampleDataType, SampleV0, SampleV3, XmlConfiguration, XmlDatagram,
};
use simrad_io::AtomicFile;
use std::collections::{BTreeMap, BTreeSet};
use std::path::PathBuf;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct WriteReport {
    pub files: Vec<PathBuf>,
    pub pings_written: u64,
    /// Pings with no time. They cannot be placed in a time ordered file.
    pub pings_without_time: u64,
    /// Pings that only hold empty values, e.g. alignment padding.
    pub empty_pings: u64,
    pub datagrams_written: u64,
}

/// One stored ping selected for output.
struct PingRef<'a> {
    channel_id: &'a str,
    series: &'a PingSeries,
    row: usize,
    header: PingHeader,
}

/// A ping group's configuration after merging every contributing file.
enum GroupConfiguration {
    Legacy(LegacyConfiguration),
    Xml(XmlConfiguration),
}

pub struct RawWriter {
    options: WriteOptions,
}

impl RawWriter {
    pub fn new(options: WriteOptions) -> Self {
        Self { options }
    }

    pub fn options(&self) -> &WriteOptions {
        &self.options
    }

    /// Write everything the reader holds, one file per output group.
    pub fn write(&self, reader: &RawReader) -> Result<WriteReport, RawError> {
        let (channels, configurations, ancillary) = reader.parts();
        let mut report = WriteReport::default();
        let groups = collect_groups(channels, &mut report);
        if report.pings_without_time > 0 {
            log::warn!("Skipping {} pings with no time", report.pings_without_time);
        }
        let numbered = groups.len() > 1;
        for (group, pings) in groups {
            let label = numbered.then_some(group);
            self.write_group(group, label, pings, configurations, ancillary, &mut report)?;
        }
        Ok(report)
    }

    fn write_group(
        &self,
        group: u32,
        label: Option<u32>,
        pings: Vec<PingRef<'_>>,
        configurations: &[FileConfiguration],
        ancillary: &AncillaryData,
        report: &mut WriteReport,
    ) -> Result<(), RawError> {
        let file_indices: BTreeSet<usize> = pings.iter().map(|p| p.header.file_index.max(0) as usize).collect();
        let configs: Vec<&FileConfiguration> = configurations
            .iter()
            .filter(|c| file_indices.contains(&c.file_index))
            .collect();
        let first = *configs.first().ok_or(RawError::NoConfiguration(group))?;
        let config = merge_configurations(&configs);

        let times: Vec<NaiveDateTime> = pings.iter().filter_map(|p| p.header.ping_time).collect();
        let (Some(&start), Some(&end)) = (times.iter().min(), times.iter().max()) else {
            return Ok(());
        };
        let in_range = |t: &NaiveDateTime| *t >= start && *t <= end;
        let channel_ids: BTreeSet<&str> = pings.iter().map(|p| p.channel_id).collect();

        let mut head = Vec::new();
        let mut body: Vec<(NaiveDateTime, Vec<Datagram>)> = Vec::new();
        let t0 = first.timestamp;
        match &config {
            GroupConfiguration::Legacy(c) => {
                head.push(Datagram::new(t0, Payload::Configuration(c.clone())));
                if let Some(b) = configs.iter().find_map(|c| c.beam_config.as_ref()) {
                    head.push(Datagram::new(t0, Payload::BeamConfiguration(b.clone())));
                }
                body.extend(bottom_datagrams(c, ancillary, &in_range));
            }
            GroupConfiguration::Xml(c) => {
                head.push(Datagram::new(t0, Payload::Xml(XmlDatagram::Configuration(c.clone()))));
                for id in &channel_ids {
                    for (t, stage) in ancillary.filters.stages(id) {
                        head.push(Datagram::new(*t, Payload::Filter(stage.clone())));
                    }
                }
                if let Some(env) = ancillary
                    .environment_at(start)
                    .or_else(|| ancillary.environment.first().map(|(_, e)| e))
                {
                    head.push(Datagram::new(t0, Payload::Xml(XmlDatagram::Environment(env.clone()))));
                }
            }
        }

        for e in ancillary.nmea.entries.iter().filter(|e| in_range(&e.time)) {
            body.push((e.time, vec![Datagram::new(e.time, Payload::Nmea(e.sentence.clone()))]));
        }
        for (t, text) in ancillary.annotations.iter().filter(|(t, _)| in_range(t)) {
            let a = Annotation { text: text.clone() };
            body.push((*t, vec![Datagram::new(*t, Payload::Annotation(a))]));
        }
        for (t, [heave, pitch, roll, heading]) in ancillary.motion.entries.iter().filter(|(t, _)| in_range(t)) {
            let m = Motion {
                heave: *heave,
                roll: *roll,
                pitch: *pitch,
                heading: *heading,
            };
            body.push((*t, vec![Datagram::new(*t, Payload::Motion(m))]));
        }

        let mut written = 0;
        for p in &pings {
            let Some(t) = p.header.ping_time else { continue };
            let datagrams = match &config {
                GroupConfiguration::Legacy(c) => {
                    let slot = c
                        .transceivers
                        .iter()
                        .position(|x| x.channel_id() == p.channel_id)
                        .ok_or_else(|| RawError::UnknownChannel(p.channel_id.to_string()))?;
                    vec![Datagram::new(t, Payload::Sample(raw0_sample(p, slot as i16 + 1)))]
                }
                GroupConfiguration::Xml(c) => {
                    if c.channel(p.channel_id).is_none() {
                        return Err(RawError::UnknownChannel(p.channel_id.to_string()));
                    }
                    vec![
                        Datagram::new(t, Payload::Xml(XmlDatagram::Parameter(ping_parameters(p)))),
                        Datagram::new(t, Payload::ChannelSample(raw3_sample(p))),
                    ]
                }
            };
            body.push((t, datagrams));
            written += 1;
        }
        body.sort_by_key(|(t, _)| *t);

        let path = self.options.output_path(start, label);
        let mut file = AtomicFile::create(&path, self.options.overwrite)?;
        let mut n = 0;
        for d in head.iter().chain(body.iter().flat_map(|(_, ds)| ds.iter())) {
            file.write(d)?;
            n += 1;
        }
        let path = file.commit()?;
        log::info!("Output group {}: {} pings to {}", group, written, path.display());

        report.files.push(path);
        report.pings_written += written;
        report.datagrams_written += n;
        Ok(())
    }
}

fn collect_groups<'a>(channels: &'a BTreeMap<String, Channel>, report: &mut WriteReport) -> BTreeMap<u32, Vec<PingRef<'a>>> {
    let mut groups: BTreeMap<u32, Vec<PingRef<'a>>> = BTreeMap::new();
    for channel in channels.values() {
        for (_, series) in channel.stores() {
            for row in 0..series.n_pings() {
                let Some(header) = series.header(row) else { continue };
                if header.ping_time.is_none() {
                    report.pings_without_time += 1;
                    continue;
                }
                if header.sample_count < 0 {
                    report.empty_pings += 1;
                    continue;
                }
                groups.entry(header.output_group).or_default().push(PingRef {
                    channel_id: channel.channel_id(),
                    series,
                    row,
                    header,
                });
            }
        }
    }
    groups
}

/// The first file's configuration, plus channels only other files list.
fn merge_configurations(configs: &[&FileConfiguration]) -> GroupConfiguration {
    let mut merged = match &configs[0].record {
        ConfigurationRecord::Legacy(c) => GroupConfiguration::Legacy(c.clone()),
        ConfigurationRecord::Xml(c) => GroupConfiguration::Xml(c.clone()),
    };
    for other in &configs[1..] {
        match (&mut merged, &other.record) {
            (GroupConfiguration::Legacy(m), ConfigurationRecord::Legacy(o)) => {
                for t in &o.transceivers {
                    if !m.transceivers.iter().any(|x| x.channel_id() == t.channel_id()) {
                        m.transceivers.push(t.clone());
                    }
                }
            }
            (GroupConfiguration::Xml(m), ConfigurationRecord::Xml(o)) => {
                for c in &o.channels {
                    if m.channel(&c.channel_id).is_none() {
                        m.channels.push(c.clone());
                    }
                }
            }
            _ => log::warn!(
                "File {} mixes CON0 and XML0 configurations with file {}, keeping the first",
                other.file_index,
                configs[0].file_index
            ),
        }
    }
    merged
}

/// DEP0 (when any reflectivity is known) or BOT0 datagrams, one per
/// detection time, with entries in slot order.
fn bottom_datagrams(
    config: &LegacyConfiguration,
    ancillary: &AncillaryData,
    in_range: &dyn Fn(&NaiveDateTime) -> bool,
) -> Vec<(NaiveDateTime, Vec<Datagram>)> {
    let n = config.transceivers.len();
    let mut by_time: BTreeMap<NaiveDateTime, Vec<Option<BottomDetection>>> = BTreeMap::new();
    for (slot, t) in config.transceivers.iter().enumerate() {
        let Some(entries) = ancillary.bottom.channels.get(t.channel_id()) else { continue };
        for (time, d) in entries.iter().filter(|(time, _)| in_range(time)) {
            by_time.entry(*time).or_insert_with(|| vec![None; n])[slot] = Some(*d);
        }
    }
    by_time
        .into_iter()
        .map(|(t, row)| {
            let payload = if row.iter().flatten().any(|d| !d.reflectivity.is_nan()) {
                Payload::Depth(DepthDetections {
                    entries: row
                        .iter()
                        .map(|d| DepthEntry {
                            depth: d.map_or(f32::NAN, |d| d.depth as f32),
                            reflectivity: d.map_or(f32::NAN, |d| d.reflectivity),
                            unused: 0.0,
                        })
                        .collect(),
                })
            } else {
                Payload::Bottom(BottomDepths {
                    depths: row.iter().map(|d| d.map_or(f64::NAN, |d| d.depth)).collect(),
                })
            };
            (t, vec![Datagram::new(t, payload)])
        })
        .collect()
}

fn sample_count(p: &PingRef<'_>) -> usize {
    (p.header.sample_count.max(0) as usize).min(p.series.n_samples())
}

fn power_row(p: &PingRef<'_>, n: usize) -> Option<Vec<i16>> {
    p.series
        .power()
        .map(|a| a.slice(s![p.row, ..n]).iter().map(|&v| index_from_power(v)).collect())
}

/// None when the ping has no angle values, e.g. a power-only RAW3 ping.
fn angle_row(p: &PingRef<'_>, n: usize) -> Option<Vec<ElectricalAngle>> {
    let (along, athwart) = (p.series.angles_alongship()?, p.series.angles_athwartship()?);
    let (along, athwart) = (along.slice(s![p.row, ..n]), athwart.slice(s![p.row, ..n]));
    if along.iter().chain(athwart.iter()).all(|v| v.is_nan()) {
        return None;
    }
    Some(
        along
            .iter()
            .zip(athwart.iter())
            .map(|(&al, &at)| ElectricalAngle {
                athwartship: angle_step(at),
                alongship: angle_step(al),
            })
            .collect(),
    )
}

fn raw0_sample(p: &PingRef<'_>, slot: i16) -> SampleV0 {
    let h = &p.header;
    let n = sample_count(p);
    let power = power_row(p, n);
    let angle = angle_row(p, n);
    let mut mode = 0;
    if power.is_some() {
        mode |= SampleV0::MODE_POWER;
    }
    if angle.is_some() {
        mode |= SampleV0::MODE_ANGLE;
    }
    SampleV0 {
        channel: slot,
        mode,
        transducer_depth: h.transducer_depth,
        frequency: h.frequency,
        transmit_power: h.transmit_power,
        pulse_length: h.pulse_length,
        bandwidth: h.bandwidth,
        sample_interval: h.sample_interval,
        sound_velocity: h.sound_velocity,
        absorption_coefficient: h.absorption_coefficient,
        heave: h.heave,
        roll: h.roll,
        pitch: h.pitch,
        temperature: h.temperature,
        heading: h.heading,
        transmit_mode: h.transmit_mode,
        spare0: Vec::new(),
        offset: h.sample_offset.max(0),
        count: n as i32,
        power,
        angle,
    }
}

fn ping_parameters(p: &PingRef<'_>) -> PingParameters {
    let h = &p.header;
    let mut record = XmlRecord::default();
    record.insert("channel_id", XmlValue::Text(p.channel_id.to_string()));
    if h.channel_mode >= 0 {
        record.insert("channel_mode", XmlValue::Int(h.channel_mode as i64));
    }
    record.insert("pulse_form", XmlValue::Int(h.pulse_form.max(0) as i64));
    for (name, v) in [
        ("frequency", h.frequency),
        ("frequency_start", h.frequency_start),
        ("frequency_end", h.frequency_end),
        ("pulse_duration", h.pulse_length),
        ("sample_interval", h.sample_interval),
        ("transmit_power", h.transmit_power),
        ("slope", h.slope),
    ] {
        if v.is_finite() {
            record.insert(name, XmlValue::Float(v as f64));
        }
    }
    PingParameters { record }
}

fn raw3_sample(p: &PingRef<'_>) -> SampleV3 {
    let n = sample_count(p);
    let (data_type, power, angle, complex) = match p.series.kind() {
        SampleKind::PowerAngle => {
            let power = power_row(p, n);
            let angle = angle_row(p, n);
            let dt = SampleDataType::new(power.is_some(), angle.is_some(), None);
            (dt, power, angle, None)
        }
        SampleKind::Complex => {
            let nc = p.series.n_complex();
            let samples: Vec<Complex32> = p
                .series
                .complex_samples()
                .map(|a| a.slice(s![p.row, ..n, ..]).iter().copied().collect())
                .unwrap_or_default();
            let dt = SampleDataType::new(false, false, Some((ComplexPrecision::Float32, nc as u8)));
            let c = ComplexSamples {
                precision: ComplexPrecision::Float32,
                n_complex: nc,
                samples,
            };
            (dt, None, None, Some(c))
        }
    };
    SampleV3 {
        channel_id: p.channel_id.to_string(),
        data_type,
        spare: Vec::new(),
        offset: p.header.sample_offset.max(0),
        count: n as i32,
        power,
        angle,
        complex,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, NaiveDate};
    use ping_series::PingSamples;

    fn t(s: i64) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2020, 9, 1)
            .unwrap()
            .and_hms_opt(0, 0, 0)
            .unwrap()
            + Duration::seconds(s)
    }

    fn series() -> PingSeries {
        let mut s = PingSeries::power_angle("GPT 38", 38000.0, true, true);
        let p = [-10.0f32, -20.0, -30.0];
        let a = [1.0f32, -2.0, 3.0];
        let h = PingHeader {
            ping_time: Some(t(0)),
            sample_interval: 256e-6,
            sample_offset: 2,
            channel_mode: 0,
            pulse_form: 0,
            frequency: 38000.0,
            pulse_length: 1.024e-3,
            ..Default::default()
        };
        s.append_ping(
            &h,
            &PingSamples {
                power: Some(&p[..]),
                angles_alongship: Some(&a[..]),
                angles_athwartship: Some(&a[..]),
                complex: None,
            },
        )
        .unwrap();
        s
    }

    fn ping(s: &PingSeries) -> PingRef<'_> {
        PingRef {
            channel_id: s.channel_id(),
            series: s,
            row: 0,
            header: s.header(0).unwrap(),
        }
    }

    #[test]
    fn test_raw0_from_store() {
        let s = series();
        let d = raw0_sample(&ping(&s), 2);
        assert_eq!(d.channel, 2);
        assert_eq!(d.mode, SampleV0::MODE_POWER | SampleV0::MODE_ANGLE);
        assert_eq!(d.count, 3);
        assert_eq!(d.offset, 2);
        assert_eq!(d.power.as_ref().unwrap()[1], index_from_power(-20.0));
        assert_eq!(d.angle.as_ref().unwrap()[1].alongship, -2);
    }

    #[test]
    fn test_raw3_and_parameters_from_store() {
        let s = series();
        let d = raw3_sample(&ping(&s));
        assert!(d.data_type.has_power() && d.data_type.has_angle());
        assert!(d.complex.is_none());
        let p = ping_parameters(&ping(&s));
        assert_eq!(p.channel_id(), Some("GPT 38"));
        assert_eq!(p.record.i64("pulse_form"), Some(0));
        assert!(p.record.get("frequency_start").is_none());
    }

    #[test]
    fn test_complex_row_is_sample_major() {
        let mut s = PingSeries::complex("WBT 1", 38000.0, 2);
        let c: Vec<Complex32> = (0..6).map(|k| Complex32::new(k as f32, 0.0)).collect();
        let h = PingHeader {
            ping_time: Some(t(0)),
            ..Default::default()
        };
        s.append_ping(
            &h,
            &PingSamples {
                complex: Some(&c[..]),
                ..Default::default()
            },
        )
        .unwrap();
        let d = raw3_sample(&ping(&s));
        let cs = d.complex.unwrap();
        assert_eq!(d.count, 3);
        assert_eq!(cs.n_complex, 2);
        assert_eq!(cs.samples, c);
        assert_eq!(d.data_type.n_complex(), 2);
    }
}
