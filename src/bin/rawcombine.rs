//! rawcombine: merge several EK60/EK80 raw files into one.

use chrono::NaiveDateTime;
use clap::Parser;
use ekraw::{RawReader, RawWriter, ReadOptions, StoreKey, WriteOptions};
use ping_series::{align_pings, AlignMode, PingSeries};
use std::path::PathBuf;

const TIME_FORMAT: &str = "%Y-%m-%dT%H:%M:%S";

fn parse_time(s: &str) -> Result<NaiveDateTime, String> {
    NaiveDateTime::parse_from_str(s, TIME_FORMAT)
        .map_err(|e| format!("expected {TIME_FORMAT}: {e}"))
}

#[derive(Parser)]
#[command(
    name = "rawcombine",
    version,
    about = "Combine Simrad EK60/EK80 raw files into a single raw file"
)]
struct Cli {
    /// Input raw files, read in order
    #[arg(required = true)]
    files: Vec<PathBuf>,

    /// Output directory
    #[arg(short, long, default_value = ".")]
    out_dir: PathBuf,

    /// Output file name prefix
    #[arg(long, default_value = "")]
    prefix: String,

    /// Output file name suffix
    #[arg(long, default_value = "")]
    suffix: String,

    /// Replace an existing output file
    #[arg(long, default_value_t = false)]
    overwrite: bool,

    /// Only keep these channel IDs
    #[arg(short, long)]
    channel: Vec<String>,

    /// Only keep pings at or after this time (UTC, 2017-07-24T19:02:52)
    #[arg(long, value_parser = parse_time)]
    start: Option<NaiveDateTime>,

    /// Only keep pings at or before this time
    #[arg(long, value_parser = parse_time)]
    end: Option<NaiveDateTime>,

    /// Drop complex samples
    #[arg(long, default_value_t = false)]
    no_complex: bool,

    /// Drop CW power/angle pings not recorded on every channel
    #[arg(long, default_value_t = false)]
    common_pings: bool,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .format_timestamp_secs()
        .init();
    let cli = Cli::parse();

    let options = ReadOptions {
        channel_ids: (!cli.channel.is_empty()).then(|| cli.channel.clone()),
        start_time: cli.start,
        end_time: cli.end,
        store_complex: !cli.no_complex,
        ..Default::default()
    };
    let mut reader = RawReader::new(options);
    let reports = reader.read_files(&cli.files)?;
    for r in reports.iter().filter(|r| r.aborted.is_some()) {
        log::warn!(
            "File {} stopped early: {}",
            r.file_index,
            r.aborted.as_deref().unwrap_or_default()
        );
    }

    if cli.common_pings {
        let key = StoreKey::power_angle();
        let ids: Vec<String> = reader
            .channel_ids()
            .filter(|id| reader.series(id, key).is_some())
            .map(str::to_string)
            .collect();
        let mut series: Vec<PingSeries> = ids
            .iter()
            .filter_map(|id| reader.series(id, key).cloned())
            .collect();
        if series.len() > 1 {
            align_pings(&mut series, AlignMode::Delete)?;
            for (id, s) in ids.iter().zip(series) {
                if let Some(target) = reader.series_mut(id, key) {
                    *target = s;
                }
            }
        }
    }

    reader.set_output_group(None, 0)?;
    let writer = RawWriter::new(WriteOptions {
        output_dir: cli.out_dir,
        prefix: cli.prefix,
        suffix: cli.suffix,
        overwrite: cli.overwrite,
        ..Default::default()
    });
    let report = writer.write(&reader)?;
    for f in &report.files {
        println!("{}", f.display());
    }
    log::info!(
        "{} pings in {} datagrams from {} files",
        report.pings_written,
        report.datagrams_written,
        cli.files.len()
    );
    Ok(())
}
