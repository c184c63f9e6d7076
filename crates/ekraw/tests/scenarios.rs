mod common;

use common::*;
use ekraw::{RawError, RawReader, ReadOptions, StoreKey};
use ping_series::{PingSelection, ResampleInterval, SampleField, SampleKind};
use simrad_core::{Datagram, Payload, XmlDatagram};
use simrad_io::{DatagramStream, StreamItem};
use std::fs::File;
use std::io::BufReader;
use tempfile::TempDir;

fn ping_file(dir: &TempDir, name: &str, start_ms: i64, n_pings: usize, n_samples: usize, interval: f32, pulse: f32) -> std::path::PathBuf {
    let mut items = vec![(at(start_ms), legacy_config(&[("T1", 38000.0)]))];
    for i in 0..n_pings {
        items.push((at(start_ms + 1000 * i as i64 + 1), raw0(1, i, n_samples, interval, pulse, -200)));
    }
    write_raw(dir.path(), name, &items)
}

#[test]
fn test_two_pulse_lengths_append_and_resample() {
    let dir = TempDir::new().unwrap();
    let a = ping_file(&dir, "a.raw", 0, 136, 50, 256e-6, 1.024e-3);
    let b = ping_file(&dir, "b.raw", 200_000, 763, 100, 128e-6, 0.512e-3);

    let mut reader = RawReader::new(ReadOptions::default());
    let reports = reader.read_files(&[a, b]).unwrap();
    assert_eq!(reports.len(), 2);
    assert!(reports.iter().all(|r| r.aborted.is_none()));

    let series = reader.series("T1", StoreKey::power_angle()).unwrap();
    assert_eq!(series.n_pings(), 899);
    series.check_invariants().unwrap();
    assert_eq!(series.n_samples(), 100);

    let indices = series.get_indices(&PingSelection::default());
    let r = series
        .resample(&indices, SampleField::Power, ResampleInterval::Shortest)
        .unwrap();
    assert!((r.sample_interval - 128e-6).abs() < 1e-9);
    assert_eq!(r.data.ncols(), 100);

    let power = series.power().unwrap();
    for (row, &i) in indices.iter().enumerate() {
        if i < 136 {
            for k in 0..50 {
                assert_eq!(r.data[[row, 2 * k]], power[[i, k]]);
                assert_eq!(r.data[[row, 2 * k + 1]], power[[i, k]]);
            }
        } else {
            for k in 0..100 {
                assert_eq!(r.data[[row, k]], power[[i, k]]);
            }
        }
    }
}

#[test]
fn test_raw3_power_only() {
    let dir = TempDir::new().unwrap();
    let path = write_raw(
        dir.path(),
        "ek80.raw",
        &[
            (at(0), ek80_config()),
            (at(10), parameter(EK80_ES, 0)),
            (at(10), raw3_power(EK80_ES, vec![-100, -200, -300])),
            (at(20), parameter(EK80_ES, 0)),
            (at(20), raw3_power(EK80_ES, vec![])),
        ],
    );

    let stream = DatagramStream::new(BufReader::new(File::open(&path).unwrap()));
    let samples: Vec<_> = stream
        .filter_map(|item| match item.unwrap() {
            StreamItem::Datagram(Datagram {
                payload: Payload::ChannelSample(s),
                ..
            }) => Some(s),
            _ => None,
        })
        .collect();
    assert_eq!(samples.len(), 2);
    assert!(samples[0].angle.is_none());
    assert!(samples[0].complex.is_none());
    assert_eq!(samples[0].power.as_deref(), Some(&[-100i16, -200, -300][..]));
    assert_eq!(samples[1].power, Some(vec![]));
    assert!(samples[1].angle.is_none());

    let mut reader = RawReader::new(ReadOptions::default());
    reader.read_file(&path).unwrap();
    let s = reader.series(EK80_ES, StoreKey::power_angle()).unwrap();
    assert_eq!(s.n_pings(), 2);
    assert_eq!(s.attributes().sample_count, vec![3, 0]);
    assert!((s.attributes().pulse_length[0] - 1.024e-3).abs() < 1e-9);
    assert!((s.attributes().sample_interval[0] - 3.2e-5).abs() < 1e-12);
    assert!(reader.series(EK80_ES, StoreKey { kind: SampleKind::Complex, pulse_form: 0 }).is_none());
}

#[test]
fn test_xml_two_channels_one_transceiver() {
    let dir = TempDir::new().unwrap();
    let path = write_raw(dir.path(), "cfg.raw", &[(at(0), ek80_config())]);

    let mut reader = RawReader::new(ReadOptions::default());
    reader.read_file(&path).unwrap();
    let ids: Vec<&str> = reader.channel_ids().collect();
    assert_eq!(ids, vec![EK80_ES, EK80_SPLIT]);

    let Some(ekraw::ConfigurationRecord::Xml(cfg)) = reader.configurations().first().map(|c| &c.record) else {
        panic!("expected an XML configuration");
    };
    assert_eq!(cfg.channels.len(), 2);
    for c in &cfg.channels {
        assert_eq!(c.record.text("transceiver_name"), Some("WBT 545612"));
        assert_eq!(c.record.text("transceiver_type"), Some("WBT"));
    }
    assert_eq!(cfg.channels[1].record.text("hw_channel_configuration"), Some("1"));

    let es = reader.get_calibration(EK80_ES, Some(0.001024)).unwrap();
    assert!((es.gain - 26.5).abs() < 1e-9);
    assert!((es.sa_correction + 0.7).abs() < 1e-9);
    let split = reader.get_calibration(EK80_SPLIT, Some(0.000512)).unwrap();
    assert!((split.gain - 25.9).abs() < 1e-9);
}

#[test]
fn test_channels_resolved_by_id_across_files() {
    let dir = TempDir::new().unwrap();
    let a = write_raw(
        dir.path(),
        "a.raw",
        &[
            (at(0), legacy_config(&[("T1", 38000.0), ("T2", 120000.0)])),
            (at(1), raw0(1, 0, 10, 256e-6, 1.024e-3, -100)),
            (at(1), raw0(2, 0, 10, 256e-6, 1.024e-3, -5000)),
        ],
    );
    let b = write_raw(
        dir.path(),
        "b.raw",
        &[
            (at(100), legacy_config(&[("T2", 120000.0), ("T1", 38000.0)])),
            (at(101), raw0(1, 0, 10, 256e-6, 1.024e-3, -5000)),
            (at(101), raw0(2, 0, 10, 256e-6, 1.024e-3, -100)),
        ],
    );

    let mut reader = RawReader::new(ReadOptions::default());
    reader.read_files(&[a, b]).unwrap();
    for (id, base) in [("T1", -100i16), ("T2", -5000)] {
        let s = reader.series(id, StoreKey::power_angle()).unwrap();
        assert_eq!(s.n_pings(), 2);
        let expected = ekraw::channel::power_from_index(power_index(0, 0, base));
        assert_eq!(s.power().unwrap()[[0, 0]], expected);
        assert_eq!(s.power().unwrap()[[1, 0]], expected);
        assert_eq!(s.attributes().file_index, vec![0, 1]);
    }
}

#[test]
fn test_configuration_missing_aborts_only_that_file() {
    let dir = TempDir::new().unwrap();
    let bad = write_raw(
        dir.path(),
        "bad.raw",
        &[
            (at(0), raw0(1, 0, 10, 256e-6, 1.024e-3, -100)),
            (at(1), legacy_config(&[("T1", 38000.0)])),
            (at(2), raw0(1, 1, 10, 256e-6, 1.024e-3, -100)),
        ],
    );
    let good = ping_file(&dir, "good.raw", 10_000, 3, 10, 256e-6, 1.024e-3);

    let mut reader = RawReader::new(ReadOptions::default());
    let reports = reader.read_files(&[bad, good]).unwrap();
    assert!(reports[0].aborted.is_some());
    assert_eq!(reports[0].pings_read, 0);
    assert!(reports[1].aborted.is_none());
    assert_eq!(reader.series("T1", StoreKey::power_angle()).unwrap().n_pings(), 3);

    let e = RawError::ConfigurationMissing {
        channel: "slot 1".into(),
        offset: 0,
    };
    assert!(e.is_file_fatal());
}

#[test]
fn test_truncated_file_keeps_earlier_pings() {
    let dir = TempDir::new().unwrap();
    let path = ping_file(&dir, "cut.raw", 0, 4, 20, 256e-6, 1.024e-3);
    let bytes = std::fs::read(&path).unwrap();
    std::fs::write(&path, &bytes[..bytes.len() - 30]).unwrap();

    let mut reader = RawReader::new(ReadOptions::default());
    let report = reader.read_file(&path).unwrap();
    assert!(report.aborted.is_some());
    assert_eq!(report.counts.fatal, 1);
    assert_eq!(reader.series("T1", StoreKey::power_angle()).unwrap().n_pings(), 3);
}

#[test]
fn test_environment_sound_speed_applied_to_raw3() {
    let dir = TempDir::new().unwrap();
    let env = XmlDatagram::parse(r#"<?xml version="1.0" encoding="utf-8"?><Environment Depth="100" SoundSpeed="1502.5" Temperature="7.5"><Transducer TransducerName="ES38-7" SoundSpeed="1502.5" /></Environment>"#).unwrap();
    let path = write_raw(
        dir.path(),
        "env.raw",
        &[
            (at(0), ek80_config()),
            (at(0), Payload::Xml(env)),
            (at(10), parameter(EK80_SPLIT, 1)),
            (at(10), raw3_complex(EK80_SPLIT, 8, 4, 1.0)),
        ],
    );
    let mut reader = RawReader::new(ReadOptions::default());
    reader.read_file(&path).unwrap();
    let key = StoreKey {
        kind: SampleKind::Complex,
        pulse_form: 1,
    };
    let s = reader.series(EK80_SPLIT, key).unwrap();
    assert_eq!(s.n_complex(), 4);
    assert_eq!(s.n_samples(), 8);
    assert_eq!(s.attributes().sound_velocity[0], 1502.5);
    assert_eq!(s.attributes().frequency_start[0], 34000.0);
    assert!(s.attributes().frequency[0].is_nan());
    assert_eq!(reader.get_calibration(EK80_SPLIT, None).unwrap().sound_velocity, Some(1502.5));
}
