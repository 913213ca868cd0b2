//! teltrack CLI: Track finding for beam telescope hit files.
//!
//! Reads hit files, reconstructs track segments event by event and writes
//! the "hits on segments" dump used by the alignment stage.
#![allow(clippy::cast_precision_loss, clippy::too_many_lines)]

use clap::{Parser, Subcommand};
use log::{debug, info, warn};
use std::fs::File;
use std::io::BufWriter;
use std::path::{Path, PathBuf};
use std::time::Instant;
use teltrack_algorithms::{reconstruct_events, ReconstructionStatistics, TrackingConfig, Xy};
use teltrack_core::HitGroup;
use teltrack_io::{
    load_config, write_histograms_json, write_segments_json, HitFileReader, SegmentDumpWriter,
};
use thiserror::Error;

/// Result type for CLI operations.
type Result<T> = std::result::Result<T, CliError>;

/// CLI error types.
#[derive(Error, Debug)]
enum CliError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("I/O error: {0}")]
    TeltrackIo(#[from] teltrack_io::Error),

    #[error("Core error: {0}")]
    Core(#[from] teltrack_core::Error),

    #[error("Thread pool error: {0}")]
    ThreadPool(#[from] rayon::ThreadPoolBuildError),
}

/// Beam telescope track finder.
#[derive(Parser)]
#[command(name = "teltrack")]
#[command(author, version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Reconstruct track segments from hit files
    Reconstruct {
        /// Input hit file(s)
        #[arg(required = true)]
        input: Vec<PathBuf>,

        /// Output segment dump
        #[arg(short, long)]
        output: PathBuf,

        /// JSON tracking configuration (cuts and run parameters)
        #[arg(short, long)]
        config: Option<PathBuf>,

        /// Charge over momentum of the beam
        #[arg(long)]
        qbyp: Option<f64>,

        /// Field factor along x
        #[arg(long)]
        bfac_x: Option<f64>,

        /// Field factor along y
        #[arg(long)]
        bfac_y: Option<f64>,

        /// Longitudinal position of the magnet
        #[arg(long)]
        z_mag: Option<f64>,

        /// Beam energy written to the dump headers
        #[arg(long)]
        beam_energy: Option<f64>,

        /// Also write the segments as JSON
        #[arg(long)]
        json: Option<PathBuf>,

        /// Fill monitoring histograms and write their summaries as JSON
        #[arg(long)]
        histograms: Option<PathBuf>,

        /// Number of worker threads (defaults to all cores)
        #[arg(short = 'j', long)]
        threads: Option<usize>,

        /// Verbosity (-v info, -vv debug, -vvv trace)
        #[arg(short, long, action = clap::ArgAction::Count)]
        verbose: u8,
    },

    /// Show information about a hit file
    Info {
        /// Input hit file
        input: PathBuf,
    },
}

fn init_logging(verbose: u8) {
    let level = match verbose {
        0 => log::LevelFilter::Warn,
        1 => log::LevelFilter::Info,
        2 => log::LevelFilter::Debug,
        _ => log::LevelFilter::Trace,
    };
    env_logger::Builder::from_default_env()
        .filter_level(level)
        .format_timestamp_millis()
        .init();
}

/// Applies command-line overrides on top of the configured run parameters.
fn apply_overrides(
    mut config: TrackingConfig,
    qbyp: Option<f64>,
    bfac_x: Option<f64>,
    bfac_y: Option<f64>,
    z_mag: Option<f64>,
    beam_energy: Option<f64>,
) -> TrackingConfig {
    if let Some(qbyp) = qbyp {
        config = config.with_qbyp(qbyp);
    }
    if bfac_x.is_some() || bfac_y.is_some() {
        let bfac = config.run.bfac;
        config = config.with_bfac(Xy::new(bfac_x.unwrap_or(bfac.x), bfac_y.unwrap_or(bfac.y)));
    }
    if let Some(z_mag) = z_mag {
        config = config.with_z_mag(z_mag);
    }
    if let Some(beam_energy) = beam_energy {
        config = config.with_beam_energy(beam_energy);
    }
    config
}

fn print_statistics(stats: &ReconstructionStatistics) {
    eprintln!("  Events:              {}", stats.events);
    eprintln!("  Hits:                {}", stats.hits);
    for arm in 0..2 {
        eprintln!(
            "  Arm {}: doublets {}/{} accepted, {} triplets",
            arm, stats.doublets_accepted[arm], stats.doublets_tested[arm], stats.triplets[arm]
        );
    }
    eprintln!("  Candidate pairs:     {}", stats.candidate_pairs);
    eprintln!("  Ambiguous triplets:  {}", stats.ambiguous_triplets);
    eprintln!("  Segments:            {}", stats.segments);
    eprintln!(
        "  DUT hits attached:   {}/{}",
        stats.dut_hits_attached, stats.dut_candidates
    );
    if stats.events > 0 {
        eprintln!(
            "  Segments per event:  {:.3}",
            stats.segments as f64 / stats.events as f64
        );
    }
}

fn create_file(path: &Path) -> Result<BufWriter<File>> {
    Ok(BufWriter::new(File::create(path)?))
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Commands::Reconstruct {
            input,
            output,
            config,
            qbyp,
            bfac_x,
            bfac_y,
            z_mag,
            beam_energy,
            json,
            histograms,
            threads,
            verbose,
        } => {
            init_logging(verbose);

            if let Some(threads) = threads {
                rayon::ThreadPoolBuilder::new()
                    .num_threads(threads)
                    .build_global()?;
            }

            let base = match &config {
                Some(path) => load_config(path)?,
                None => TrackingConfig::default(),
            };
            let config = apply_overrides(base, qbyp, bfac_x, bfac_y, z_mag, beam_energy);
            config.run.validate()?;
            info!(
                "Cuts: doublet {:?}, triplet {:?}, slope {:?}, position {:?}, dut {:?}",
                config.cuts.doublet,
                config.cuts.triplet,
                config.cuts.slope,
                config.cuts.position,
                config.cuts.dut
            );
            info!(
                "Run: qbyp {}, bfac {:?} (field {}), z_mag {}, beam energy {}",
                config.run.qbyp,
                config.run.bfac,
                if config.run.field_on() { "on" } else { "off" },
                config.run.z_mag,
                config.run.beam_energy
            );

            let start = Instant::now();
            let mut writer = SegmentDumpWriter::create(&output, config.run.beam_energy)?;
            let mut total = ReconstructionStatistics::default();
            let mut all_events = Vec::new();
            let mut all_histograms = teltrack_core::HistogramCollector::new();

            for path in &input {
                info!("Reading: {}", path.display());
                let events = HitFileReader::open(path)?.read_all()?;
                if events.is_empty() {
                    warn!("No events in {}", path.display());
                    continue;
                }
                debug!("{} events in {}", events.len(), path.display());

                let run = reconstruct_events(&events, &config, histograms.is_some());
                for result in &run.events {
                    writer.write_event(result)?;
                }
                info!(
                    "{}: {} events, {} segments",
                    path.display(),
                    run.statistics.events,
                    run.statistics.segments
                );

                total.merge(&run.statistics);
                all_histograms.merge(&run.histograms);
                if json.is_some() {
                    all_events.extend(run.events);
                }
            }
            writer.flush()?;

            if let Some(path) = &json {
                write_segments_json(create_file(path)?, &all_events)?;
                info!("Segments JSON written to {}", path.display());
            }
            if let Some(path) = &histograms {
                write_histograms_json(create_file(path)?, &all_histograms)?;
                info!(
                    "{} histograms written to {}",
                    all_histograms.len(),
                    path.display()
                );
            }

            let elapsed = start.elapsed();
            eprintln!("Reconstruction complete:");
            print_statistics(&total);
            eprintln!("  Segment blocks:      {}", writer.segments_written());
            eprintln!("  Output:              {}", output.display());
            eprintln!("  Time:                {:.2?}", elapsed);
        }

        Commands::Info { input } => {
            init_logging(0);

            let mut events = 0usize;
            let mut hits = 0usize;
            let mut group = HitGroup::new();
            let mut first = None;
            let mut last = None;

            for event in HitFileReader::open(&input)?.events() {
                let event = event?;
                events += 1;
                hits += event.hits.len();
                group.extend(&event.hits);
                first.get_or_insert(event.header);
                last = Some(event.header);
            }

            println!("File: {}", input.display());
            println!("Events: {}", events);
            println!("Hits: {}", hits);
            if let (Some(first), Some(last)) = (first, last) {
                println!(
                    "Range: run {} event {} .. run {} event {}",
                    first.run, first.event, last.run, last.event
                );
            }
            if events > 0 {
                println!("Hits per event: {:.2}", hits as f64 / events as f64);
            }
            println!("Hits per plane:");
            for (plane, count) in group.occupancy() {
                let kind = if plane < teltrack_core::FIRST_DUT_PLANE {
                    "telescope"
                } else {
                    "dut"
                };
                println!("  {:>3} ({}): {}", plane, kind, count);
            }
        }
    }

    Ok(())
}
