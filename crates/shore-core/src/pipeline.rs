//! Batch orchestrator: cleans every date folder under a parent directory.
//!
//! Per date folder and event kind:
//!   1. Skip the unit when both cleaned outputs exist and overwrite is off.
//!   2. Create `cleaned/` (only reported in dry-run mode).
//!   3. Load the cluster/grid pair and run the noise filter.
//!   4. Accretion only: footprint check against the unfiltered erosion grid
//!      of the same folder.
//!   5. Save both cleaned grids.
//!
//! A failure in one folder is recorded in its outcome and never stops the run.

use std::fmt;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::time::Instant;

use log::{info, warn};
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::cluster::{FilterResult, FootprintRejection, NoiseRemoval};
use crate::config::CleaningConfig;
use crate::csv_grid::{load_grid, save_grid, CsvGridError};
use crate::grid::{GridError, GridTable};

// ── File naming ───────────────────────────────────────────────────────────────

const CLUSTER_MARKER: &str = "clusters_10x10cm.csv";
const GRID_MARKER: &str = "grid_10x10cm.csv";
const ACCRETION_MARKER: &str = "acc";

/// Sub-folder of each date folder that receives cleaned outputs.
pub const CLEANED_DIR: &str = "cleaned";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EventKind {
    Erosion,
    Accretion,
}

impl EventKind {
    /// Short tag used in output file names.
    pub fn tag(self) -> &'static str {
        match self {
            EventKind::Erosion => "ero",
            EventKind::Accretion => "acc",
        }
    }

    /// Erosion inputs carry the marker and never the accretion marker;
    /// accretion inputs carry `acc_` directly before the marker.
    fn matches(self, file_name: &str, marker: &str) -> bool {
        match self {
            EventKind::Erosion => file_name.contains(marker) && !file_name.contains(ACCRETION_MARKER),
            EventKind::Accretion => file_name.contains(&format!("{ACCRETION_MARKER}_{marker}")),
        }
    }
}

impl fmt::Display for EventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EventKind::Erosion => f.write_str("erosion"),
            EventKind::Accretion => f.write_str("accretion"),
        }
    }
}

// ── Errors ────────────────────────────────────────────────────────────────────

#[derive(Error, Debug)]
pub enum CleanError {
    #[error("no {kind} {which} file in '{}'", folder.display())]
    MissingInput {
        folder: PathBuf,
        kind: EventKind,
        which: &'static str,
    },

    #[error(transparent)]
    Csv(#[from] CsvGridError),

    #[error("'{}': {source}", path.display())]
    Layout {
        path: PathBuf,
        #[source]
        source: GridError,
    },

    #[error("I/O error on '{}': {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

fn io_error(path: &Path) -> impl FnOnce(io::Error) -> CleanError + '_ {
    move |source| CleanError::Io {
        path: path.to_path_buf(),
        source,
    }
}

// ── Reports ───────────────────────────────────────────────────────────────────

/// Everything a unit removed, skipped or wrote, in the order it happened.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum Diagnostic {
    NoiseRemoved(NoiseRemoval),
    FootprintRejected(FootprintRejection),
    FootprintSkipped { reason: String },
    OutputsPresent { clusters: PathBuf, grid: PathBuf },
    WouldCreateDir { path: PathBuf },
    CreatedDir { path: PathBuf },
    WouldWrite { path: PathBuf },
    Wrote { path: PathBuf },
    WriteSkipped { path: PathBuf },
}

#[derive(Debug, Clone, Serialize)]
pub struct UnitReport {
    pub date: String,
    pub kind: EventKind,
    /// True when the unit was skipped because its outputs already exist.
    pub skipped: bool,
    pub diagnostics: Vec<Diagnostic>,
    pub elapsed_ms: u64,
}

impl UnitReport {
    pub fn noise_removed(&self) -> usize {
        self.count(|d| matches!(d, Diagnostic::NoiseRemoved(_)))
    }

    pub fn footprint_rejected(&self) -> usize {
        self.count(|d| matches!(d, Diagnostic::FootprintRejected(_)))
    }

    pub fn files_written(&self) -> usize {
        self.count(|d| matches!(d, Diagnostic::Wrote { .. }))
    }

    fn count(&self, pred: impl Fn(&Diagnostic) -> bool) -> usize {
        self.diagnostics.iter().filter(|d| pred(d)).count()
    }
}

#[derive(Debug)]
pub struct FolderOutcome {
    pub folder: PathBuf,
    pub result: Result<UnitReport, CleanError>,
}

#[derive(Debug)]
pub struct RunReport {
    /// One outcome per processed folder, in folder name order.
    pub outcomes: Vec<FolderOutcome>,
    pub elapsed_ms: u64,
}

impl RunReport {
    pub fn failures(&self) -> impl Iterator<Item = (&Path, &CleanError)> {
        self.outcomes
            .iter()
            .filter_map(|o| o.result.as_ref().err().map(|e| (o.folder.as_path(), e)))
    }

    pub fn reports(&self) -> impl Iterator<Item = &UnitReport> {
        self.outcomes.iter().filter_map(|o| o.result.as_ref().ok())
    }
}

// ── Paths ─────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InputPair {
    pub clusters: PathBuf,
    pub grid: PathBuf,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutputPaths {
    pub dir: PathBuf,
    pub clusters: PathBuf,
    pub grid: PathBuf,
}

fn date_name(folder: &Path) -> String {
    folder
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default()
}

/// Locate the cluster and grid inputs of `kind` in a date folder. When several
/// files match, the first by name wins.
pub fn find_inputs(folder: &Path, kind: EventKind) -> Result<InputPair, CleanError> {
    let mut names: Vec<String> = fs::read_dir(folder)
        .map_err(io_error(folder))?
        .filter_map(|entry| entry.ok())
        .filter(|entry| entry.path().is_file())
        .map(|entry| entry.file_name().to_string_lossy().into_owned())
        .collect();
    names.sort();

    let pick = |marker: &str, which: &'static str| {
        names
            .iter()
            .find(|n| kind.matches(n, marker))
            .map(|n| folder.join(n))
            .ok_or_else(|| CleanError::MissingInput {
                folder: folder.to_path_buf(),
                kind,
                which,
            })
    };

    Ok(InputPair {
        clusters: pick(CLUSTER_MARKER, "cluster")?,
        grid: pick(GRID_MARKER, "grid")?,
    })
}

/// `<folder>/cleaned/<date>_<tag>_{clusters,grid}_cleaned.csv`
pub fn output_paths(date_folder: &Path, kind: EventKind) -> OutputPaths {
    let date = date_name(date_folder);
    let dir = date_folder.join(CLEANED_DIR);
    OutputPaths {
        clusters: dir.join(format!("{date}_{}_clusters_cleaned.csv", kind.tag())),
        grid: dir.join(format!("{date}_{}_grid_cleaned.csv", kind.tag())),
        dir,
    }
}

/// Immediate sub-directories of `parent`, sorted by name.
pub fn list_date_folders(parent: &Path) -> Result<Vec<PathBuf>, CleanError> {
    let mut folders: Vec<PathBuf> = fs::read_dir(parent)
        .map_err(io_error(parent))?
        .filter_map(|entry| entry.ok())
        .map(|entry| entry.path())
        .filter(|path| path.is_dir())
        .collect();
    folders.sort();
    Ok(folders)
}

/// Pick at most `n` folders at random, reproducibly for a given seed. The
/// result keeps name order.
pub fn sample_folders(folders: Vec<PathBuf>, n: usize, seed: u64) -> Vec<PathBuf> {
    if folders.len() <= n {
        return folders;
    }
    let mut rng = StdRng::seed_from_u64(seed);
    let mut picked: Vec<PathBuf> = folders.choose_multiple(&mut rng, n).cloned().collect();
    picked.sort();
    picked
}

// ── Unit processing ───────────────────────────────────────────────────────────

/// Unfiltered erosion pair of a date folder.
#[derive(Debug, Clone)]
pub struct ErosionPair {
    pub clusters: GridTable,
    pub grid: GridTable,
}

/// A unit cleaned in memory, before anything is written.
#[derive(Debug, Clone)]
pub struct CleanedUnit {
    pub kind: EventKind,
    pub result: FilterResult,
    /// Erosion pair consulted by the footprint check (accretion only).
    pub erosion: Option<ErosionPair>,
    /// Why the footprint check did not run, for accretion units.
    pub footprint_skipped: Option<String>,
}

fn load_pair(inputs: &InputPair) -> Result<(GridTable, GridTable), CleanError> {
    let clusters = load_grid(&inputs.clusters)?;
    let grid = load_grid(&inputs.grid)?;
    Ok((clusters, grid))
}

/// Load and clean one unit without touching the filesystem.
///
/// For accretion units a missing or unreadable erosion pair skips the
/// footprint check; the noise-filtered result is still returned.
pub fn clean_unit(
    folder: &Path,
    kind: EventKind,
    config: &CleaningConfig,
) -> Result<CleanedUnit, CleanError> {
    let inputs = find_inputs(folder, kind)?;
    let (clusters, grid) = load_pair(&inputs)?;
    let layout = |source| CleanError::Layout {
        path: inputs.clusters.clone(),
        source,
    };

    let mut result = FilterResult::new(clusters, grid, config.min_cell_count).map_err(layout)?;
    let mut erosion = None;
    let mut footprint_skipped = None;

    if kind == EventKind::Accretion {
        match find_inputs(folder, EventKind::Erosion).and_then(|p| load_pair(&p)) {
            Ok((clusters, grid)) => {
                result = result
                    .with_footprint_check(&grid, config.buffer_bins)
                    .map_err(layout)?;
                info!(
                    "Applied footprint check for accretion events ({} removed)",
                    result.footprint.len()
                );
                erosion = Some(ErosionPair { clusters, grid });
            }
            Err(e) => {
                warn!("No erosion data for footprint check in {}: {e}", folder.display());
                footprint_skipped = Some(e.to_string());
            }
        }
    }

    Ok(CleanedUnit {
        kind,
        result,
        erosion,
        footprint_skipped,
    })
}

fn persist(table: &GridTable, path: &Path, config: &CleaningConfig) -> Result<Diagnostic, CleanError> {
    if config.dry_run {
        info!("[dry-run] Would write file: {}", path.display());
        return Ok(Diagnostic::WouldWrite {
            path: path.to_path_buf(),
        });
    }
    match save_grid(table, path, config.overwrite_existing) {
        Ok(()) => {
            info!("Wrote file: {}", path.display());
            Ok(Diagnostic::Wrote {
                path: path.to_path_buf(),
            })
        }
        Err(CsvGridError::OutputExists(path)) => {
            warn!("File {} exists and overwrite is off; skipping", path.display());
            Ok(Diagnostic::WriteSkipped { path })
        }
        Err(e) => Err(e.into()),
    }
}

/// Clean one date folder for one event kind and persist the result.
pub fn process_date_folder(
    folder: &Path,
    kind: EventKind,
    config: &CleaningConfig,
) -> Result<UnitReport, CleanError> {
    let start = Instant::now();
    let date = date_name(folder);
    let out = output_paths(folder, kind);
    let mut diagnostics = Vec::new();

    info!("Processing {kind} in date folder: {}", folder.display());

    if !config.dry_run && !config.overwrite_existing && out.clusters.exists() && out.grid.exists() {
        info!(
            "Skipping {} because output files exist and overwrite is off",
            folder.display()
        );
        diagnostics.push(Diagnostic::OutputsPresent {
            clusters: out.clusters,
            grid: out.grid,
        });
        return Ok(UnitReport {
            date,
            kind,
            skipped: true,
            diagnostics,
            elapsed_ms: start.elapsed().as_millis() as u64,
        });
    }

    if !out.dir.exists() {
        if config.dry_run {
            info!("[dry-run] Would create folder: {}", out.dir.display());
            diagnostics.push(Diagnostic::WouldCreateDir { path: out.dir.clone() });
        } else {
            fs::create_dir_all(&out.dir).map_err(io_error(&out.dir))?;
            info!("Created folder: {}", out.dir.display());
            diagnostics.push(Diagnostic::CreatedDir { path: out.dir.clone() });
        }
    }

    let unit = clean_unit(folder, kind, config)?;
    diagnostics.extend(unit.result.noise.iter().copied().map(Diagnostic::NoiseRemoved));
    diagnostics.extend(
        unit.result
            .footprint
            .iter()
            .cloned()
            .map(Diagnostic::FootprintRejected),
    );
    if let Some(reason) = unit.footprint_skipped {
        diagnostics.push(Diagnostic::FootprintSkipped { reason });
    }

    diagnostics.push(persist(&unit.result.clusters, &out.clusters, config)?);
    diagnostics.push(persist(&unit.result.grid, &out.grid, config)?);

    let elapsed_ms = start.elapsed().as_millis() as u64;
    info!("Finished processing {date} in {:.2} seconds", elapsed_ms as f64 / 1000.0);

    Ok(UnitReport {
        date,
        kind,
        skipped: false,
        diagnostics,
        elapsed_ms,
    })
}

// ── Batch entry point ─────────────────────────────────────────────────────────

#[cfg(feature = "threading")]
fn run_units(folders: &[PathBuf], kind: EventKind, config: &CleaningConfig) -> Vec<FolderOutcome> {
    use rayon::prelude::*;
    folders
        .par_iter()
        .map(|folder| FolderOutcome {
            folder: folder.clone(),
            result: process_date_folder(folder, kind, config),
        })
        .collect()
}

#[cfg(not(feature = "threading"))]
fn run_units(folders: &[PathBuf], kind: EventKind, config: &CleaningConfig) -> Vec<FolderOutcome> {
    folders
        .iter()
        .map(|folder| FolderOutcome {
            folder: folder.clone(),
            result: process_date_folder(folder, kind, config),
        })
        .collect()
}

/// Clean every date folder under `parent` for one event kind.
///
/// In dry-run mode with `dry_run_sample` set, only a seeded random sample of
/// folders is processed. Only a failure to list `parent` is returned as an
/// error; per-folder failures land in the report.
pub fn clean_lidar_data(
    parent: &Path,
    kind: EventKind,
    config: &CleaningConfig,
) -> Result<RunReport, CleanError> {
    let start = Instant::now();
    let mut folders = list_date_folders(parent)?;
    if config.dry_run {
        if let Some(n) = config.dry_run_sample {
            folders = sample_folders(folders, n, config.seed);
        }
    }

    let outcomes = run_units(&folders, kind, config);
    for outcome in &outcomes {
        if let Err(e) = &outcome.result {
            warn!("Skipped {}: {e}", outcome.folder.display());
        }
    }

    let elapsed_ms = start.elapsed().as_millis() as u64;
    info!(
        "Total processing time for {} folders: {:.2} seconds",
        folders.len(),
        elapsed_ms as f64 / 1000.0
    );

    Ok(RunReport {
        outcomes,
        elapsed_ms,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::csv_grid::save_grid;
    use tempfile::TempDir;

    const DATE: &str = "20200101";

    fn write(dir: &Path, name: &str, table: &GridTable) {
        save_grid(table, &dir.join(name), true).unwrap();
    }

    /// Accretion: cluster 3 (rows 10–15, cols 4–8), cluster 5 (rows 30–35,
    /// cols 0–4), cluster 9 (2 cells). Erosion: a single positive cell at
    /// (32, 6), inside cluster 5's footprint but below cluster 3's top.
    fn make_date_folder(root: &Path, date: &str, with_erosion: bool) -> PathBuf {
        let folder = root.join(date);
        fs::create_dir_all(&folder).unwrap();

        let mut acc_ids = GridTable::zeros(40, 10);
        let mut acc_vals = acc_ids.zeroed_like();
        for r in 10..=15 {
            for c in 4..=8 {
                acc_ids.set(r, c, Some(3.0));
                acc_vals.set(r, c, Some(0.5));
            }
        }
        for r in 30..=35 {
            for c in 0..=4 {
                acc_ids.set(r, c, Some(5.0));
                acc_vals.set(r, c, Some(0.25));
            }
        }
        acc_ids.set(0, 0, Some(9.0));
        acc_ids.set(0, 1, Some(9.0));
        acc_vals.set(0, 0, Some(1.0));
        acc_vals.set(0, 1, None);
        write(&folder, &format!("{date}_acc_clusters_10x10cm.csv"), &acc_ids);
        write(&folder, &format!("{date}_acc_grid_10x10cm.csv"), &acc_vals);

        if with_erosion {
            let mut ero_ids = GridTable::zeros(40, 10);
            let mut ero_vals = ero_ids.zeroed_like();
            ero_ids.set(32, 6, Some(1.0));
            ero_vals.set(32, 6, Some(1.2));
            write(&folder, &format!("{date}_clusters_10x10cm.csv"), &ero_ids);
            write(&folder, &format!("{date}_grid_10x10cm.csv"), &ero_vals);
        }
        folder
    }

    fn live_config() -> CleaningConfig {
        CleaningConfig {
            dry_run: false,
            ..CleaningConfig::default()
        }
    }

    #[test]
    fn find_inputs_separates_erosion_and_accretion() {
        let tmp = TempDir::new().unwrap();
        let folder = make_date_folder(tmp.path(), DATE, true);

        let ero = find_inputs(&folder, EventKind::Erosion).unwrap();
        assert_eq!(ero.clusters, folder.join("20200101_clusters_10x10cm.csv"));
        assert_eq!(ero.grid, folder.join("20200101_grid_10x10cm.csv"));

        let acc = find_inputs(&folder, EventKind::Accretion).unwrap();
        assert_eq!(acc.clusters, folder.join("20200101_acc_clusters_10x10cm.csv"));
        assert_eq!(acc.grid, folder.join("20200101_acc_grid_10x10cm.csv"));
    }

    #[test]
    fn find_inputs_reports_missing_file() {
        let tmp = TempDir::new().unwrap();
        let folder = make_date_folder(tmp.path(), DATE, false);
        let err = find_inputs(&folder, EventKind::Erosion).unwrap_err();
        assert!(matches!(
            err,
            CleanError::MissingInput { kind: EventKind::Erosion, which: "cluster", .. }
        ));
    }

    #[test]
    fn output_paths_follow_naming_scheme() {
        let out = output_paths(Path::new("/data/20200101"), EventKind::Accretion);
        assert_eq!(out.dir, PathBuf::from("/data/20200101/cleaned"));
        assert_eq!(
            out.clusters,
            PathBuf::from("/data/20200101/cleaned/20200101_acc_clusters_cleaned.csv")
        );
        assert_eq!(
            out.grid,
            PathBuf::from("/data/20200101/cleaned/20200101_acc_grid_cleaned.csv")
        );
    }

    #[test]
    fn accretion_unit_applies_noise_and_footprint() {
        let tmp = TempDir::new().unwrap();
        let folder = make_date_folder(tmp.path(), DATE, true);

        let report = process_date_folder(&folder, EventKind::Accretion, &live_config()).unwrap();
        assert!(!report.skipped);
        assert_eq!(report.noise_removed(), 1);
        assert_eq!(report.footprint_rejected(), 1);
        assert_eq!(report.files_written(), 2);
        assert!(report.diagnostics.contains(&Diagnostic::FootprintRejected(FootprintRejection {
            cluster_id: 3,
            row_range: 0..36,
            col_range: 8..10,
        })));

        let out = output_paths(&folder, EventKind::Accretion);
        let ids = load_grid(&out.clusters).unwrap();
        let vals = load_grid(&out.grid).unwrap();
        assert_eq!(ids.shape(), (40, 10));
        assert_eq!(ids.get(12, 6), Some(0.0));
        assert_eq!(ids.get(0, 0), Some(0.0));
        assert_eq!(ids.get(32, 2), Some(5.0));
        assert_eq!(vals.get(32, 2), Some(0.25));
        assert_eq!(vals.get(12, 6), Some(0.0));
    }

    #[test]
    fn erosion_unit_only_filters_noise() {
        let tmp = TempDir::new().unwrap();
        let folder = make_date_folder(tmp.path(), DATE, true);

        let report = process_date_folder(&folder, EventKind::Erosion, &live_config()).unwrap();
        assert_eq!(report.noise_removed(), 1);
        assert_eq!(report.footprint_rejected(), 0);

        let out = output_paths(&folder, EventKind::Erosion);
        let vals = load_grid(&out.grid).unwrap();
        assert!(vals.values().iter().all(|v| *v == Some(0.0)));
    }

    #[test]
    fn dry_run_touches_nothing() {
        let tmp = TempDir::new().unwrap();
        let folder = make_date_folder(tmp.path(), DATE, true);

        let report =
            process_date_folder(&folder, EventKind::Accretion, &CleaningConfig::default()).unwrap();
        let out = output_paths(&folder, EventKind::Accretion);
        assert!(!out.dir.exists());
        assert!(report
            .diagnostics
            .contains(&Diagnostic::WouldCreateDir { path: out.dir.clone() }));
        assert!(report
            .diagnostics
            .contains(&Diagnostic::WouldWrite { path: out.clusters.clone() }));
        assert_eq!(report.files_written(), 0);
    }

    #[test]
    fn existing_outputs_skip_the_unit() {
        let tmp = TempDir::new().unwrap();
        let folder = make_date_folder(tmp.path(), DATE, true);
        let config = live_config();

        process_date_folder(&folder, EventKind::Accretion, &config).unwrap();
        let again = process_date_folder(&folder, EventKind::Accretion, &config).unwrap();
        assert!(again.skipped);
        assert!(matches!(again.diagnostics[0], Diagnostic::OutputsPresent { .. }));
    }

    #[test]
    fn single_existing_output_is_skipped_not_overwritten() {
        let tmp = TempDir::new().unwrap();
        let folder = make_date_folder(tmp.path(), DATE, true);
        let out = output_paths(&folder, EventKind::Erosion);
        fs::create_dir_all(&out.dir).unwrap();
        fs::write(&out.grid, "sentinel").unwrap();

        let report = process_date_folder(&folder, EventKind::Erosion, &live_config()).unwrap();
        assert!(report
            .diagnostics
            .contains(&Diagnostic::WriteSkipped { path: out.grid.clone() }));
        assert_eq!(report.files_written(), 1);
        assert_eq!(fs::read_to_string(&out.grid).unwrap(), "sentinel");

        let overwrite = CleaningConfig {
            overwrite_existing: true,
            ..live_config()
        };
        let report = process_date_folder(&folder, EventKind::Erosion, &overwrite).unwrap();
        assert_eq!(report.files_written(), 2);
        assert_ne!(fs::read_to_string(&out.grid).unwrap(), "sentinel");
    }

    #[test]
    fn accretion_without_erosion_skips_footprint_but_writes() {
        let tmp = TempDir::new().unwrap();
        let folder = make_date_folder(tmp.path(), DATE, false);

        let report = process_date_folder(&folder, EventKind::Accretion, &live_config()).unwrap();
        assert_eq!(report.footprint_rejected(), 0);
        assert!(report
            .diagnostics
            .iter()
            .any(|d| matches!(d, Diagnostic::FootprintSkipped { .. })));
        assert_eq!(report.files_written(), 2);

        let ids = load_grid(&output_paths(&folder, EventKind::Accretion).clusters).unwrap();
        assert_eq!(ids.get(12, 6), Some(3.0));
    }

    #[test]
    fn clean_unit_keeps_erosion_pair_for_accretion() {
        let tmp = TempDir::new().unwrap();
        let folder = make_date_folder(tmp.path(), DATE, true);

        let unit = clean_unit(&folder, EventKind::Accretion, &CleaningConfig::default()).unwrap();
        let erosion = unit.erosion.unwrap();
        assert_eq!(erosion.grid.get(32, 6), Some(1.2));
        assert!(unit.footprint_skipped.is_none());
        assert_eq!(unit.result.original_clusters.get(12, 6), Some(3.0));
    }

    #[test]
    fn bad_folder_does_not_abort_the_run() {
        let tmp = TempDir::new().unwrap();
        make_date_folder(tmp.path(), "20200101", true);
        let broken = make_date_folder(tmp.path(), "20200202", true);
        fs::write(
            broken.join("20200202_grid_10x10cm.csv"),
            ",a,b\nr0,1\n",
        )
        .unwrap();
        fs::create_dir_all(tmp.path().join("20200303")).unwrap();

        let report = clean_lidar_data(tmp.path(), EventKind::Erosion, &live_config()).unwrap();
        assert_eq!(report.outcomes.len(), 3);
        assert_eq!(report.reports().count(), 1);

        let failures: Vec<_> = report.failures().collect();
        assert_eq!(failures.len(), 2);
        assert!(matches!(
            failures[0].1,
            CleanError::Csv(CsvGridError::Format { .. })
        ));
        assert!(matches!(failures[1].1, CleanError::MissingInput { .. }));
    }

    #[test]
    fn sample_is_bounded_and_reproducible() {
        let folders: Vec<PathBuf> = (0..20).map(|i| PathBuf::from(format!("d{i:02}"))).collect();
        let a = sample_folders(folders.clone(), 5, 7);
        let b = sample_folders(folders.clone(), 5, 7);
        assert_eq!(a.len(), 5);
        assert_eq!(a, b);
        assert!(a.windows(2).all(|w| w[0] < w[1]));
        assert_eq!(sample_folders(folders[..3].to_vec(), 5, 7).len(), 3);
    }

    #[test]
    fn diagnostics_serialize_with_event_tag() {
        let d = Diagnostic::NoiseRemoved(NoiseRemoval { cluster_id: 7, cell_count: 3 });
        let json = serde_json::to_value(&d).unwrap();
        assert_eq!(json["event"], "noise_removed");
        assert_eq!(json["cluster_id"], 7);
    }
}
