//! Bubble plots of one date folder's clusters before and after cleaning.
//!
//! Writes `<date>_<tag>_bubbles.png` and `<date>_<tag>_summary.json` to the
//! folder's `cleaned/` directory. Each bubble sits at a cluster centroid
//! (x = alongshore row, y = vertical column) with area proportional to volume.
//! Accretion plots overlay the unfiltered erosion clusters in red on the top
//! panel.

use std::f64::consts::PI;
use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::{Parser, ValueEnum};
use image::{Rgb, RgbImage};
use log::{info, warn, LevelFilter};
use serde::Serialize;

use shore_core::cluster::{summarize, ClusterSummary};
use shore_core::config::CleaningConfig;
use shore_core::pipeline::{clean_unit, EventKind, CLEANED_DIR};

// ── Layout ────────────────────────────────────────────────────────────────────

const PANEL_W: u32 = 1200;
const PANEL_H: u32 = 300;
const MARGIN: u32 = 24;
const FILL_ALPHA: f64 = 0.6;

const WHITE: Rgb<u8> = Rgb([255, 255, 255]);
const FRAME: Rgb<u8> = Rgb([120, 120, 120]);
const EDGE: Rgb<u8> = Rgb([0, 0, 0]);
const ACCRETION_BLUE: Rgb<u8> = Rgb([0, 0, 255]);
const EROSION_RED: Rgb<u8> = Rgb([255, 0, 0]);
const DEFAULT_BLUE: Rgb<u8> = Rgb([31, 119, 180]);

// ── CLI ───────────────────────────────────────────────────────────────────────

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
enum Kind {
    Erosion,
    Accretion,
}

impl From<Kind> for EventKind {
    fn from(k: Kind) -> Self {
        match k {
            Kind::Erosion => EventKind::Erosion,
            Kind::Accretion => EventKind::Accretion,
        }
    }
}

#[derive(Parser, Debug)]
#[command(name = "visualize", about = "Render cluster bubble plots for one date folder")]
struct Args {
    /// Date folder holding the input grids.
    date_folder: PathBuf,

    #[arg(short, long, value_enum, default_value = "accretion")]
    kind: Kind,

    /// JSON file with cleaning parameters.
    #[arg(short, long)]
    config: Option<PathBuf>,

    #[arg(long)]
    min_cell_count: Option<usize>,

    #[arg(long)]
    buffer_bins: Option<usize>,

    /// Bubble area, in square pixels, per unit of volume.
    #[arg(long, default_value = "10")]
    bubble_scale: f64,

    /// Output directory (default: <date_folder>/cleaned).
    #[arg(short, long)]
    output: Option<PathBuf>,

    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,
}

// ── Rendering ─────────────────────────────────────────────────────────────────

/// Plot rectangle inside one panel, in image pixels.
#[derive(Clone, Copy, Debug)]
struct PlotArea {
    x0: f64,
    y0: f64,
    x1: f64,
    y1: f64,
}

impl PlotArea {
    fn for_panel(index: u32) -> Self {
        let top = index * PANEL_H;
        Self {
            x0: MARGIN as f64,
            y0: (top + MARGIN) as f64,
            x1: (PANEL_W - MARGIN) as f64,
            y1: (top + PANEL_H - MARGIN) as f64,
        }
    }

    /// Map a centroid onto the plot. Axis limits are `0..rows` alongshore and
    /// `0..cols` vertically, with the vertical axis pointing up.
    fn project(&self, row: f64, col: f64, rows: usize, cols: usize) -> (f64, f64) {
        let fx = row / rows.max(1) as f64;
        let fy = col / cols.max(1) as f64;
        (
            self.x0 + fx * (self.x1 - self.x0),
            self.y1 - fy * (self.y1 - self.y0),
        )
    }

    fn contains(&self, x: f64, y: f64) -> bool {
        x >= self.x0 && x <= self.x1 && y >= self.y0 && y <= self.y1
    }
}

struct Layer<'a> {
    clusters: &'a [ClusterSummary],
    color: Rgb<u8>,
}

/// Radius of a bubble whose area is `|volume| * scale`.
fn bubble_radius(volume: f64, scale: f64) -> f64 {
    (volume.abs() * scale / PI).sqrt()
}

fn blend(px: &mut Rgb<u8>, color: Rgb<u8>, alpha: f64) {
    for (dst, src) in px.0.iter_mut().zip(color.0) {
        *dst = (alpha * src as f64 + (1.0 - alpha) * *dst as f64).round() as u8;
    }
}

fn draw_frame(img: &mut RgbImage, area: &PlotArea) {
    let (x0, y0, x1, y1) = (area.x0 as u32, area.y0 as u32, area.x1 as u32, area.y1 as u32);
    for x in x0..=x1 {
        img.put_pixel(x, y0, FRAME);
        img.put_pixel(x, y1, FRAME);
    }
    for y in y0..=y1 {
        img.put_pixel(x0, y, FRAME);
        img.put_pixel(x1, y, FRAME);
    }
}

/// Semi-transparent disc with a one-pixel black edge, clipped to the plot.
fn draw_bubble(img: &mut RgbImage, area: &PlotArea, cx: f64, cy: f64, radius: f64, color: Rgb<u8>) {
    let r = radius.max(1.0);
    let y_lo = (cy - r).floor().max(0.0) as u32;
    let y_hi = (cy + r).ceil().min(img.height() as f64 - 1.0) as u32;
    let x_lo = (cx - r).floor().max(0.0) as u32;
    let x_hi = (cx + r).ceil().min(img.width() as f64 - 1.0) as u32;

    for y in y_lo..=y_hi {
        for x in x_lo..=x_hi {
            let (px, py) = (x as f64, y as f64);
            if !area.contains(px, py) {
                continue;
            }
            let d = ((px - cx).powi(2) + (py - cy).powi(2)).sqrt();
            if d <= r - 1.0 {
                blend(img.get_pixel_mut(x, y), color, FILL_ALPHA);
            } else if d <= r {
                img.put_pixel(x, y, EDGE);
            }
        }
    }
}

fn draw_panel(
    img: &mut RgbImage,
    index: u32,
    shape: (usize, usize),
    layers: &[Layer<'_>],
    bubble_scale: f64,
) {
    let area = PlotArea::for_panel(index);
    draw_frame(img, &area);
    for layer in layers {
        for s in layer.clusters {
            let (x, y) = area.project(s.centroid_row, s.centroid_col, shape.0, shape.1);
            draw_bubble(img, &area, x, y, bubble_radius(s.volume, bubble_scale), layer.color);
        }
    }
}

/// Top panel: clusters as loaded. Bottom panel: clusters after cleaning.
fn render(
    shape: (usize, usize),
    top: &[Layer<'_>],
    bottom: &[Layer<'_>],
    bubble_scale: f64,
) -> RgbImage {
    let mut img = RgbImage::from_pixel(PANEL_W, 2 * PANEL_H, WHITE);
    draw_panel(&mut img, 0, shape, top, bubble_scale);
    draw_panel(&mut img, 1, shape, bottom, bubble_scale);
    img
}

// ── Summary export ────────────────────────────────────────────────────────────

#[derive(Serialize)]
struct SummaryFile<'a> {
    date: String,
    kind: EventKind,
    min_cell_count: usize,
    buffer_bins: usize,
    original: &'a [ClusterSummary],
    cleaned: &'a [ClusterSummary],
    /// Unfiltered erosion clusters used by the accretion footprint check.
    #[serde(skip_serializing_if = "Option::is_none")]
    erosion: Option<&'a [ClusterSummary]>,
}

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
    cfg.validate()?;
    Ok(cfg)
}

fn date_name(folder: &Path) -> String {
    folder
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default()
}

/// Write `<stem>_summary.json` and, unless there are no clusters at all,
/// `<stem>_bubbles.png` into `out_dir`. Returns whether the image was written.
fn write_outputs(
    out_dir: &Path,
    stem: &str,
    summary: &SummaryFile<'_>,
    shape: (usize, usize),
    bubble_scale: f64,
) -> Result<bool> {
    let json_path = out_dir.join(format!("{stem}_summary.json"));
    fs::write(&json_path, serde_json::to_string_pretty(summary)?)
        .with_context(|| format!("Cannot write {}", json_path.display()))?;
    eprintln!("  -> {}", json_path.display());

    if summary.original.is_empty() && summary.cleaned.is_empty() {
        warn!("No clusters to plot for {}; image skipped", summary.date);
        return Ok(false);
    }

    let primary = match summary.kind {
        EventKind::Accretion => ACCRETION_BLUE,
        EventKind::Erosion => DEFAULT_BLUE,
    };
    let mut top = vec![Layer { clusters: summary.original, color: primary }];
    if let Some(erosion) = summary.erosion {
        top.push(Layer { clusters: erosion, color: EROSION_RED });
    }
    let bottom = [Layer { clusters: summary.cleaned, color: DEFAULT_BLUE }];

    let img = render(shape, &top, &bottom, bubble_scale);
    let png_path = out_dir.join(format!("{stem}_bubbles.png"));
    img.save(&png_path)
        .with_context(|| format!("Cannot write {}", png_path.display()))?;
    info!("Rendered {} bubbles", summary.original.len() + summary.cleaned.len());
    eprintln!("  -> {}", png_path.display());
    Ok(true)
}

// ── Entry point ───────────────────────────────────────────────────────────────

fn main() -> Result<()> {
    let args = Args::parse();
    env_logger::Builder::new()
        .filter_level(match args.verbose {
            0 => LevelFilter::Warn,
            1 => LevelFilter::Info,
            _ => LevelFilter::Debug,
        })
        .format_timestamp_secs()
        .init();

    let config = resolve_config(&args).context("Invalid cleaning configuration")?;
    let kind = EventKind::from(args.kind);
    let date = date_name(&args.date_folder);

    eprintln!("[visualize] Cleaning {kind} clusters in {}", args.date_folder.display());
    let unit = clean_unit(&args.date_folder, kind, &config)
        .with_context(|| format!("Cannot clean {}", args.date_folder.display()))?;
    let result = &unit.result;

    let original = summarize(&result.original_clusters, &result.original_grid)?;
    let cleaned = summarize(&result.clusters, &result.grid)?;
    let erosion = match &unit.erosion {
        Some(pair) => Some(summarize(&pair.clusters, &pair.grid)?),
        None => None,
    };
    if let Some(reason) = &unit.footprint_skipped {
        eprintln!("  [warn] Footprint check skipped: {reason}");
    }
    eprintln!(
        "  {} clusters loaded, {} after cleaning ({} noise, {} footprint)",
        original.len(),
        cleaned.len(),
        result.noise.len(),
        result.footprint.len()
    );

    let out_dir = args
        .output
        .clone()
        .unwrap_or_else(|| args.date_folder.join(CLEANED_DIR));
    fs::create_dir_all(&out_dir)
        .with_context(|| format!("Cannot create {}", out_dir.display()))?;

    let stem = format!("{date}_{}", kind.tag());
    let summary = SummaryFile {
        date,
        kind,
        min_cell_count: config.min_cell_count,
        buffer_bins: config.buffer_bins,
        original: &original,
        cleaned: &cleaned,
        erosion: erosion.as_deref(),
    };
    write_outputs(
        &out_dir,
        &stem,
        &summary,
        result.original_grid.shape(),
        args.bubble_scale,
    )?;
    Ok(())
}
