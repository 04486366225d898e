//! Footprint validation of accretion clusters against erosion evidence.
//!
//! An accretion cluster is kept only when the erosion grid holds at least one
//! positive cell in its footprint: the cluster's alongshore span widened by
//! `buffer_bins` rows on each side, from the cluster's top column up to the
//! shoreward edge of the grid.
//!
//! ```text
//!             col: top ........ erosion.cols()
//!   row_min - buffer  +-------------------+
//!                     |   footprint       |
//!                     |   window          |
//!   row_max + buffer  +-------------------+
//! ```
//!
//! Both ends of the row span are clamped to the erosion grid, which may differ
//! in shape from the accretion grids.

use std::ops::Range;

use log::debug;
use serde::Serialize;

use super::{extent_of, index_clusters};
use crate::grid::{ClusterId, GridTable, Result};

/// An accretion cluster removed for lack of erosion in its footprint.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FootprintRejection {
    pub cluster_id: ClusterId,
    /// Erosion rows searched, end exclusive.
    pub row_range: Range<usize>,
    /// Erosion columns searched, end exclusive.
    pub col_range: Range<usize>,
}

#[derive(Debug, Clone)]
pub struct FootprintOutcome {
    pub clusters: GridTable,
    pub grid: GridTable,
    /// Rejections in ascending cluster id order.
    pub rejected: Vec<FootprintRejection>,
}

/// Rows and columns of the erosion grid searched for a cluster spanning rows
/// `row_min..=row_max` with top column `top`. Either range may be empty.
pub fn footprint_window(
    row_min: usize,
    row_max: usize,
    top: usize,
    buffer_bins: usize,
    erosion_rows: usize,
    erosion_cols: usize,
) -> (Range<usize>, Range<usize>) {
    let lo = row_min.saturating_sub(buffer_bins);
    let hi = row_max
        .saturating_add(buffer_bins)
        .saturating_add(1)
        .min(erosion_rows);
    (lo..hi, top..erosion_cols)
}

/// True when any erosion cell in the window is positive. Missing reads as zero.
fn has_erosion(erosion: &GridTable, rows: &Range<usize>, cols: &Range<usize>) -> bool {
    rows.clone()
        .any(|r| cols.clone().any(|c| erosion.get_or_zero(r, c) > 0.0))
}

/// Remove accretion clusters with no erosion evidence in their footprint.
///
/// Clusters are visited in ascending id order. Supported clusters pass through
/// unchanged; unsupported ones are zeroed in both accretion grids.
pub fn validate_footprint(
    acc_ids: &GridTable,
    acc_values: &GridTable,
    erosion: &GridTable,
    buffer_bins: usize,
) -> Result<FootprintOutcome> {
    acc_ids.ensure_same_shape(acc_values)?;
    let index = index_clusters(acc_ids)?;

    let mut clusters = acc_ids.clone();
    let mut grid = acc_values.clone();
    let mut rejected = Vec::new();

    for (&cluster_id, cells) in &index {
        let Some(ext) = extent_of(cells) else {
            continue;
        };
        let (row_range, col_range) = footprint_window(
            ext.row_min,
            ext.row_max,
            ext.col_max,
            buffer_bins,
            erosion.rows(),
            erosion.cols(),
        );

        if has_erosion(erosion, &row_range, &col_range) {
            continue;
        }

        for &(r, c) in cells {
            clusters.set(r, c, Some(0.0));
            grid.set(r, c, Some(0.0));
        }
        debug!(
            "Accretion cluster {} removed: no erosion in footprint (rows {}-{}, cols {}-{})",
            cluster_id, row_range.start, row_range.end, col_range.start, col_range.end
        );
        rejected.push(FootprintRejection {
            cluster_id,
            row_range,
            col_range,
        });
    }

    Ok(FootprintOutcome {
        clusters,
        grid,
        rejected,
    })
}
