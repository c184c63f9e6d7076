//! rawinfo: summarise the datagrams and channels of EK60/EK80 raw files.

use clap::Parser;
use ekraw::{ChannelSummary, FileReport, RawReader, ReadOptions};
use serde::Serialize;
use simrad_core::CalibrationParameters;
use simrad_io::{DatagramStream, StreamItem};
use std::collections::BTreeMap;
use std::fs::File;
use std::io::BufReader;
use std::path::{Path, PathBuf};

#[derive(Parser)]
#[command(
    name = "rawinfo",
    version,
    about = "Summarise the datagrams and channels of Simrad EK60/EK80 raw files"
)]
struct Cli {
    /// Input raw files, read in order
    #[arg(required = true)]
    files: Vec<PathBuf>,

    /// Only report these channel IDs
    #[arg(short, long)]
    channel: Vec<String>,

    /// Only report channels with these nominal frequencies (Hz)
    #[arg(short, long)]
    frequency: Vec<f64>,

    /// Print the summary as JSON
    #[arg(long, default_value_t = false)]
    json: bool,
}

#[derive(Serialize)]
struct FileInfo {
    report: FileReport,
    /// Decoded datagrams per tag, e.g. `RAW0`.
    datagrams: BTreeMap<String, u64>,
}

#[derive(Serialize)]
struct Summary {
    files: Vec<FileInfo>,
    channels: Vec<ChannelSummary>,
    calibration: Vec<CalibrationParameters>,
    nmea: BTreeMap<String, usize>,
    annotations: usize,
    motion_records: usize,
}

fn count_datagrams(path: &Path) -> Result<BTreeMap<String, u64>, Box<dyn std::error::Error>> {
    let mut counts = BTreeMap::new();
    let stream = DatagramStream::new(BufReader::new(File::open(path)?));
    for item in stream {
        match item {
            Ok(StreamItem::Datagram(d)) => *counts.entry(d.tag().to_string()).or_default() += 1,
            Ok(StreamItem::Skipped(_)) => {}
            Err(e) => {
                log::warn!("{}: {}", path.display(), e);
                break;
            }
        }
    }
    Ok(counts)
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .format_timestamp_secs()
        .init();
    let cli = Cli::parse();

    let options = ReadOptions {
        channel_ids: (!cli.channel.is_empty()).then(|| cli.channel.clone()),
        frequencies: (!cli.frequency.is_empty()).then(|| cli.frequency.clone()),
        ..Default::default()
    };
    let mut reader = RawReader::new(options);
    let reports = reader.read_files(&cli.files)?;

    let mut files = Vec::with_capacity(reports.len());
    for (report, path) in reports.into_iter().zip(&cli.files) {
        files.push(FileInfo {
            datagrams: count_datagrams(path)?,
            report,
        });
    }
    let channels: Vec<ChannelSummary> = reader.channels().map(|c| c.summary()).collect();
    let calibration = reader
        .channel_ids()
        .filter_map(|id| {
            let pulse = reader
                .channel(id)?
                .stores()
                .find_map(|(_, s)| s.attributes().pulse_length.first().copied())
                .filter(|p| p.is_finite())
                .map(f64::from);
            reader.get_calibration(id, pulse).ok()
        })
        .collect();
    let anc = reader.ancillary();
    let summary = Summary {
        files,
        channels,
        calibration,
        nmea: anc.nmea.sentence_counts(),
        annotations: anc.annotations.len(),
        motion_records: anc.motion.len(),
    };

    if cli.json {
        println!("{}", serde_json::to_string_pretty(&summary)?);
        return Ok(());
    }
    print_summary(&summary);
    Ok(())
}

fn print_summary(s: &Summary) {
    for f in &s.files {
        let r = &f.report;
        let name = r.path.as_deref().map_or_else(|| "-".into(), |p| p.display().to_string());
        println!("File {}: {}", r.file_index, name);
        println!(
            "  {} datagrams, {} pings read, {} filtered",
            r.counts.decoded, r.pings_read, r.pings_filtered
        );
        for (tag, n) in &f.datagrams {
            println!("    {tag}: {n}");
        }
        if r.counts.unknown_total() > 0 {
            println!("  Unknown datagrams: {:?}", r.counts.unknown_kinds);
        }
        if r.counts.skipped + r.counts.unsupported_versions > 0 {
            println!(
                "  Skipped: {} unsupported versions, {} other",
                r.counts.unsupported_versions, r.counts.skipped
            );
        }
        if let Some(reason) = &r.aborted {
            println!("  Aborted: {reason}");
        }
    }

    println!("Channels:");
    for c in &s.channels {
        println!("  {} ({} Hz)", c.channel_id, c.frequency);
        if let (Some(first), Some(last)) = (c.first_ping, c.last_ping) {
            println!("    {first} .. {last}");
        }
        for st in &c.stores {
            println!(
                "    {} pulse form {}: {} pings x {} samples",
                st.kind, st.pulse_form, st.n_pings, st.n_samples
            );
        }
        if let Some(cal) = s.calibration.iter().find(|cal| cal.channel_id == c.channel_id) {
            println!(
                "    gain {:.2} dB, sa correction {:.2} dB, EBA {:.2} dB",
                cal.gain, cal.sa_correction, cal.equivalent_beam_angle
            );
        }
    }

    if !s.nmea.is_empty() {
        println!("NMEA:");
        for (k, n) in &s.nmea {
            println!("  {k}: {n}");
        }
    }
    if s.annotations > 0 {
        println!("Annotations: {}", s.annotations);
    }
    if s.motion_records > 0 {
        println!("Motion records: {}", s.motion_records);
    }
}
