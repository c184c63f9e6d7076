//! Synthetic raw files for the integration tests.
#![allow(dead_code)]

use chrono::{Duration, NaiveDate, NaiveDateTime};
use num_complex::Complex32;
use simrad_core::config::Er60Transceiver;
use simrad_core::sample::ElectricalAngle;
use simrad_core::xml::{XmlRecord, XmlValue};
use simrad_core::{
    ComplexPrecision, ComplexSamples, Datagram, LegacyConfiguration, Payload, PingParameters,
    SampleDataType, SampleV0, SampleV3, Transceiver, XmlDatagram,
};
use simrad_io::write_frame;
use std::path::{Path, PathBuf};

pub const EK80_CONFIG: &str = r#"<?xml version="1.0" encoding="utf-8"?>
<Configuration>
  <Header ApplicationName="EK80" Version="1.12.2.0" FileFormatVersion="1.20" TimeBias="0" />
  <Transceivers MergeOperation="AddNodeTree">
    <Transceiver TransceiverName="WBT 545612" TransceiverNumber="1" TransceiverType="WBT" SerialNumber="545612">
      <Channels>
        <Channel ChannelID="WBT 545612-15 ES38-7_ES" PulseDuration="0.000256;0.000512;0.001024" HWChannelConfiguration="0">
          <Transducer TransducerName="ES38-7" Frequency="38000" Gain="26.1;26.3;26.5" SaCorrection="-0.6;-0.65;-0.7" EquivalentBeamAngle="-20.6" />
        </Channel>
        <Channel ChannelID="WBT 545612-16 ES38-7_SPLIT" PulseDuration="0.000512;0.001024" HWChannelConfiguration="1">
          <Transducer TransducerName="ES38-7" Frequency="38000" Gain="25.9;26.1" SaCorrection="-0.5;-0.55" EquivalentBeamAngle="-20.6" />
        </Channel>
      </Channels>
    </Transceiver>
  </Transceivers>
</Configuration>"#;

pub const EK80_ES: &str = "WBT 545612-15 ES38-7_ES";
pub const EK80_SPLIT: &str = "WBT 545612-16 ES38-7_SPLIT";

pub fn t0() -> NaiveDateTime {
    NaiveDate::from_ymd_opt(2017, 7, 24)
        .unwrap()
        .and_hms_opt(19, 2, 52)
        .unwrap()
}

pub fn at(ms: i64) -> NaiveDateTime {
    t0() + Duration::milliseconds(ms)
}

pub fn legacy_config(channels: &[(&str, f32)]) -> Payload {
    Payload::Configuration(LegacyConfiguration {
        survey_name: "Test survey".into(),
        transect_name: "T1".into(),
        sounder_name: "ER60".into(),
        version: "2.4.3".into(),
        transceivers: channels
            .iter()
            .map(|(id, f)| {
                Transceiver::Er60(Er60Transceiver {
                    channel_id: id.to_string(),
                    frequency: *f,
                    gain: 25.0,
                    pulse_length_table: [0.000256, 0.000512, 0.001024, 0.002048, 0.004096],
                    gain_table: [24.0, 24.5, 25.0, 25.5, 26.0],
                    sa_correction_table: [-0.1, -0.2, -0.3, -0.4, -0.5],
                    equivalent_beam_angle: -20.6,
                    ..Default::default()
                })
            })
            .collect(),
        ..Default::default()
    })
}

/// Power indices for sample `k` of a ping.
pub fn power_index(ping: usize, k: usize, base: i16) -> i16 {
    base - (k as i16) * 7 - (ping % 5) as i16
}

pub fn raw0(slot: i16, ping: usize, n: usize, interval: f32, pulse: f32, base: i16) -> Payload {
    Payload::Sample(SampleV0 {
        channel: slot,
        mode: SampleV0::MODE_POWER | SampleV0::MODE_ANGLE,
        transducer_depth: 5.0,
        frequency: 38000.0,
        transmit_power: 1000.0,
        pulse_length: pulse,
        bandwidth: 2425.0,
        sample_interval: interval,
        sound_velocity: 1494.0,
        absorption_coefficient: 0.0098,
        temperature: 8.0,
        transmit_mode: 0,
        count: n as i32,
        power: Some((0..n).map(|k| power_index(ping, k, base)).collect()),
        angle: Some(
            (0..n)
                .map(|k| ElectricalAngle {
                    athwartship: (k % 11) as i8 - 5,
                    alongship: 5 - (k % 7) as i8,
                })
                .collect(),
        ),
        ..Default::default()
    })
}

pub fn parameter(channel_id: &str, pulse_form: i64) -> Payload {
    let mut r = XmlRecord::default();
    r.insert("channel_id", XmlValue::Text(channel_id.to_string()));
    r.insert("channel_mode", XmlValue::Int(0));
    r.insert("pulse_form", XmlValue::Int(pulse_form));
    if pulse_form == 0 {
        r.insert("frequency", XmlValue::Float(38000.0));
    } else {
        r.insert("frequency_start", XmlValue::Float(34000.0));
        r.insert("frequency_end", XmlValue::Float(45000.0));
    }
    r.insert("pulse_duration", XmlValue::Float(0.001024));
    r.insert("sample_interval", XmlValue::Float(3.2e-5));
    r.insert("transmit_power", XmlValue::Float(2000.0));
    r.insert("slope", XmlValue::Float(0.0104));
    Payload::Xml(XmlDatagram::Parameter(PingParameters { record: r }))
}

pub fn raw3_power(channel_id: &str, power: Vec<i16>) -> Payload {
    Payload::ChannelSample(SampleV3 {
        channel_id: channel_id.to_string(),
        data_type: SampleDataType::new(true, false, None),
        offset: 0,
        count: power.len() as i32,
        power: Some(power),
        ..Default::default()
    })
}

pub fn raw3_complex(channel_id: &str, n: usize, n_complex: usize, seed: f32) -> Payload {
    let samples = (0..n * n_complex)
        .map(|i| Complex32::new(seed + i as f32 * 0.25, -(i as f32) * 0.5))
        .collect();
    Payload::ChannelSample(SampleV3 {
        channel_id: channel_id.to_string(),
        data_type: SampleDataType::new(false, false, Some((ComplexPrecision::Float32, n_complex as u8))),
        offset: 0,
        count: n as i32,
        complex: Some(ComplexSamples {
            precision: ComplexPrecision::Float32,
            n_complex,
            samples,
        }),
        ..Default::default()
    })
}

pub fn ek80_config() -> Payload {
    Payload::Xml(XmlDatagram::parse(EK80_CONFIG).unwrap())
}

/// Frame `datagrams` into a raw file at `dir/name`.
pub fn write_raw(dir: &Path, name: &str, datagrams: &[(NaiveDateTime, Payload)]) -> PathBuf {
    let mut buf = Vec::new();
    for (t, p) in datagrams {
        let d = Datagram::new(*t, p.clone());
        write_frame(&mut buf, &d.encode().unwrap()).unwrap();
    }
    let path = dir.join(name);
    std::fs::write(&path, buf).unwrap();
    path
}
