//! Cluster operations over a cluster-id grid: noise filtering, footprint
//! validation against erosion evidence, and per-cluster summaries.
//!
//! A cluster is every cell sharing one nonzero id. Attributes are computed on
//! demand from the grids; nothing is cached, so a grid can be edited between
//! calls without invalidation.
pub mod filter;
pub mod footprint;
pub mod summary;

use std::collections::BTreeMap;

use serde::Serialize;

use crate::grid::{ClusterId, GridTable, Result};

pub use filter::{filter_noise, FilterResult, FilteredPair, NoiseRemoval};
pub use footprint::{validate_footprint, FootprintOutcome, FootprintRejection};
pub use summary::{summarize, ClusterSummary, UNIT_AREA};

/// Cell coordinates of every cluster, keyed by ascending id.
pub type ClusterIndex = BTreeMap<ClusterId, Vec<(usize, usize)>>;

/// Row and column bounds of a cluster, inclusive on both ends.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ClusterExtent {
    /// Smallest alongshore (row) index.
    pub row_min: usize,
    pub row_max: usize,
    pub col_min: usize,
    /// Highest column occupied, the cluster's top on the shore profile.
    pub col_max: usize,
}

/// Group every non-background cell by cluster id, scanning row-major so each
/// cell list is sorted.
pub fn index_clusters(ids: &GridTable) -> Result<ClusterIndex> {
    let mut index = ClusterIndex::new();
    for r in 0..ids.rows() {
        for c in 0..ids.cols() {
            if let Some(id) = ids.cluster_id(r, c)? {
                index.entry(id).or_default().push((r, c));
            }
        }
    }
    Ok(index)
}

/// Cells carrying `id`, row-major.
pub fn cluster_cells(ids: &GridTable, id: ClusterId) -> Result<Vec<(usize, usize)>> {
    let mut cells = Vec::new();
    for r in 0..ids.rows() {
        for c in 0..ids.cols() {
            if ids.cluster_id(r, c)? == Some(id) {
                cells.push((r, c));
            }
        }
    }
    Ok(cells)
}

/// Bounding extent of a set of cells; `None` for an empty set.
pub fn extent_of(cells: &[(usize, usize)]) -> Option<ClusterExtent> {
    let &(r0, c0) = cells.first()?;
    let mut ext = ClusterExtent {
        row_min: r0,
        row_max: r0,
        col_min: c0,
        col_max: c0,
    };
    for &(r, c) in &cells[1..] {
        ext.row_min = ext.row_min.min(r);
        ext.row_max = ext.row_max.max(r);
        ext.col_min = ext.col_min.min(c);
        ext.col_max = ext.col_max.max(c);
    }
    Some(ext)
}

/// Extent of cluster `id`, or `None` if it has no cells.
pub fn cluster_extent(ids: &GridTable, id: ClusterId) -> Result<Option<ClusterExtent>> {
    Ok(extent_of(&cluster_cells(ids, id)?))
}

/// Unweighted mean `(row, col)` of a set of cells.
pub fn centroid_of(cells: &[(usize, usize)]) -> Option<(f64, f64)> {
    if cells.is_empty() {
        return None;
    }
    let n = cells.len() as f64;
    let (sr, sc) = cells
        .iter()
        .fold((0.0, 0.0), |(sr, sc), &(r, c)| (sr + r as f64, sc + c as f64));
    Some((sr / n, sc / n))
}

/// Centroid of cluster `id`, or `None` if it has no cells.
pub fn cluster_centroid(ids: &GridTable, id: ClusterId) -> Result<Option<(f64, f64)>> {
    Ok(centroid_of(&cluster_cells(ids, id)?))
}

/// Sum of `values` over `cells` times the unit cell area. Missing reads as zero.
pub fn volume_of(values: &GridTable, cells: &[(usize, usize)]) -> f64 {
    cells.iter().map(|&(r, c)| values.get_or_zero(r, c)).sum::<f64>() * UNIT_AREA
}

/// Volume of cluster `id`; zero if it has no cells.
pub fn cluster_volume(ids: &GridTable, values: &GridTable, id: ClusterId) -> Result<f64> {
    ids.ensure_same_shape(values)?;
    Ok(volume_of(values, &cluster_cells(ids, id)?))
}
