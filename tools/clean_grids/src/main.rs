//! Batch noise and footprint cleaning of LiDAR cluster grids.
//!
//! Walks every date folder under a parent directory and writes cleaned
//! cluster/grid pairs to `<date>/cleaned/`. Runs as a dry run unless `--write`
//! is given.

use std::fs;
use std::path::PathBuf;

use anyhow::{bail, Context, Result};
use clap::{Parser, ValueEnum};
use log::LevelFilter;
use serde::Serialize;

use shore_core::config::CleaningConfig;
use shore_core::pipeline::{clean_lidar_data, EventKind, RunReport, UnitReport};

// ── CLI ───────────────────────────────────────────────────────────────────────

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
enum Kind {
    Erosion,
    Accretion,
    Both,
}

impl Kind {
    fn event_kinds(self) -> &'static [EventKind] {
        match self {
            Kind::Erosion => &[EventKind::Erosion],
            Kind::Accretion => &[EventKind::Accretion],
            Kind::Both => &[EventKind::Erosion, EventKind::Accretion],
        }
    }
}

#[derive(Parser, Debug)]
#[command(
    name = "clean_grids",
    about = "Remove noise clusters and unsupported accretion from 10x10 cm LiDAR grids"
)]
struct Args {
    /// Directory whose sub-directories are date folders.
    parent: PathBuf,

    /// Event kind to clean.
    #[arg(short, long, value_enum, default_value = "both")]
    kind: Kind,

    /// JSON file with cleaning parameters; flags below override it.
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Smallest cluster size kept, in cells.
    #[arg(long)]
    min_cell_count: Option<usize>,

    /// Alongshore buffer for the accretion footprint check, in cells.
    #[arg(long)]
    buffer_bins: Option<usize>,

    /// Replace existing cleaned files.
    #[arg(long)]
    overwrite: bool,

    /// Write outputs instead of reporting what would be written.
    #[arg(long)]
    write: bool,

    /// Dry-run sample size (0 processes every folder).
    #[arg(long)]
    sample: Option<usize>,

    /// Seed for the dry-run sample.
    #[arg(long)]
    seed: Option<u64>,

    /// Write every unit's diagnostics to this JSON file.
    #[arg(long)]
    diagnostics_json: Option<PathBuf>,

    /// Increase log verbosity (-v info, -vv debug).
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,
}

/// Config file (or defaults) with command-line overrides applied.
fn resolve_config(args: &Args) -> Result<CleaningConfig> {
    let mut cfg = match &args.config {
        Some(path) => CleaningConfig::from_json_file(path)?,
        None => CleaningConfig::default(),
    };
    if let Some(n) = args.min_cell_count {
        cfg.min_cell_count = n;
    }
    if let Some(n) = args.buffer_bins {
        cfg.buffer_bins = n;
    }
    if args.overwrite {
        cfg.overwrite_existing = true;
    }
    if args.write {
        cfg.dry_run = false;
    }
    match args.sample {
        Some(0) => cfg.dry_run_sample = None,
        Some(n) => cfg.dry_run_sample = Some(n),
        None => {}
    }
    if let Some(seed) = args.seed {
        cfg.seed = seed;
    }
    cfg.validate()?;
    Ok(cfg)
}

fn init_logging(verbose: u8) {
    env_logger::Builder::new()
        .filter_level(match verbose {
            0 => LevelFilter::Warn,
            1 => LevelFilter::Info,
            _ => LevelFilter::Debug,
        })
        .format_timestamp_secs()
        .init();
}

// ── Reporting ─────────────────────────────────────────────────────────────────

#[derive(Serialize)]
struct DiagnosticsFile<'a> {
    config: &'a CleaningConfig,
    units: Vec<&'a UnitReport>,
    failures: Vec<FailureEntry>,
}

#[derive(Serialize)]
struct FailureEntry {
    folder: PathBuf,
    kind: EventKind,
    error: String,
}

fn print_summary(kind: EventKind, report: &RunReport) {
    eprintln!(
        "[clean_grids] {kind}: {} folders in {:.2} s",
        report.outcomes.len(),
        report.elapsed_ms as f64 / 1000.0
    );
    eprintln!(
        "  {:<12} {:>8} {:>10} {:>8}  status",
        "date", "noise", "footprint", "written"
    );
    eprintln!("  {}", "-".repeat(52));
    for outcome in &report.outcomes {
        let name = outcome
            .folder
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        match &outcome.result {
            Ok(unit) if unit.skipped => {
                eprintln!("  {name:<12} {:>8} {:>10} {:>8}  outputs exist", "-", "-", "-");
            }
            Ok(unit) => eprintln!(
                "  {name:<12} {:>8} {:>10} {:>8}  ok",
                unit.noise_removed(),
                unit.footprint_rejected(),
                unit.files_written()
            ),
            Err(e) => eprintln!("  {name:<12} {:>8} {:>10} {:>8}  error: {e}", "-", "-", "-"),
        }
    }
}

// ── Entry point ───────────────────────────────────────────────────────────────

fn main() -> Result<()> {
    let args = Args::parse();
    init_logging(args.verbose);

    if !args.parent.is_dir() {
        bail!("{} is not a directory", args.parent.display());
    }
    let config = resolve_config(&args).context("Invalid cleaning configuration")?;
    if config.dry_run {
        eprintln!("[clean_grids] Dry run: nothing will be written (pass --write to apply)");
    }

    let mut reports = Vec::new();
    for &kind in args.kind.event_kinds() {
        let report = clean_lidar_data(&args.parent, kind, &config)
            .with_context(|| format!("Cannot list date folders in {}", args.parent.display()))?;
        print_summary(kind, &report);
        reports.push((kind, report));
    }

    let failed: usize = reports.iter().map(|(_, r)| r.failures().count()).sum();

    if let Some(path) = &args.diagnostics_json {
        let file = DiagnosticsFile {
            config: &config,
            units: reports.iter().flat_map(|(_, r)| r.reports()).collect(),
            failures: reports
                .iter()
                .flat_map(|(kind, r)| {
                    r.failures().map(move |(folder, e)| FailureEntry {
                        folder: folder.to_path_buf(),
                        kind: *kind,
                        error: e.to_string(),
                    })
                })
                .collect(),
        };
        let json = serde_json::to_string_pretty(&file)?;
        fs::write(path, json).with_context(|| format!("Cannot write {}", path.display()))?;
        eprintln!("  -> {}", path.display());
    }

    if failed > 0 {
        eprintln!("\nDone with {failed} failed unit(s).");
    } else {
        eprintln!("\nDone.");
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(argv: &[&str]) -> Args {
        Args::try_parse_from(std::iter::once("clean_grids").chain(argv.iter().copied())).unwrap()
    }

    #[test]
    fn defaults_are_a_sampled_dry_run() {
        let args = parse(&["data"]);
        assert_eq!(args.kind, Kind::Both);
        let cfg = resolve_config(&args).unwrap();
        assert_eq!(cfg, CleaningConfig::default());
    }

    #[test]
    fn flags_override_defaults() {
        let args = parse(&[
            "data",
            "--kind",
            "accretion",
            "--min-cell-count",
            "40",
            "--buffer-bins",
            "5",
            "--write",
            "--overwrite",
            "--sample",
            "0",
            "--seed",
            "9",
        ]);
        assert_eq!(args.kind.event_kinds(), &[EventKind::Accretion]);
        let cfg = resolve_config(&args).unwrap();
        assert_eq!(cfg.min_cell_count, 40);
        assert_eq!(cfg.buffer_bins, 5);
        assert!(!cfg.dry_run);
        assert!(cfg.overwrite_existing);
        assert_eq!(cfg.dry_run_sample, None);
        assert_eq!(cfg.seed, 9);
    }

    #[test]
    fn zero_threshold_is_rejected() {
        let args = parse(&["data", "--min-cell-count", "0"]);
        assert!(resolve_config(&args).is_err());
    }

    #[test]
    fn verbosity_counts_flags() {
        assert_eq!(parse(&["data", "-vv"]).verbose, 2);
    }
}
