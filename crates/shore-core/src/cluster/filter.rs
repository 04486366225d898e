//! Noise removal by cluster cell count.
//!
//! A cluster survives when it holds at least `min_cell_count` cells. Cells of
//! removed clusters become literal `0` in both grids, not missing. In the output
//! files "filtered out" is therefore indistinguishable from a measured zero.

use serde::Serialize;

use super::footprint::{validate_footprint, FootprintRejection};
use super::index_clusters;
use crate::grid::{ClusterId, GridTable, Result};

/// A cluster dropped for having too few cells.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct NoiseRemoval {
    pub cluster_id: ClusterId,
    pub cell_count: usize,
}

/// Output of one filtering pass.
#[derive(Debug, Clone)]
pub struct FilteredPair {
    pub clusters: GridTable,
    pub grid: GridTable,
    /// Removed clusters in ascending id order.
    pub removed: Vec<NoiseRemoval>,
}

/// Zero every cluster with fewer than `min_cell_count` cells.
///
/// `ids` and `values` must share a shape. Surviving cells keep their id and
/// value (a missing value stays missing); every other cell, background
/// included, is written as `0`.
pub fn filter_noise(
    ids: &GridTable,
    values: &GridTable,
    min_cell_count: usize,
) -> Result<FilteredPair> {
    ids.ensure_same_shape(values)?;
    let index = index_clusters(ids)?;

    let mut clusters = ids.zeroed_like();
    let mut grid = values.zeroed_like();
    let mut removed = Vec::new();

    for (&cluster_id, cells) in &index {
        if cells.len() < min_cell_count {
            removed.push(NoiseRemoval {
                cluster_id,
                cell_count: cells.len(),
            });
            continue;
        }
        for &(r, c) in cells {
            clusters.set(r, c, ids.get(r, c));
            grid.set(r, c, values.get(r, c));
        }
    }

    Ok(FilteredPair {
        clusters,
        grid,
        removed,
    })
}

/// Cleaning state of one (date, event type) unit: the pair as loaded, the
/// pair after cleaning, and a record of everything removed along the way.
#[derive(Debug, Clone)]
pub struct FilterResult {
    pub original_clusters: GridTable,
    pub original_grid: GridTable,
    pub clusters: GridTable,
    pub grid: GridTable,
    pub noise: Vec<NoiseRemoval>,
    pub footprint: Vec<FootprintRejection>,
}

impl FilterResult {
    /// Take ownership of a loaded pair and run the noise filter over it.
    pub fn new(
        original_clusters: GridTable,
        original_grid: GridTable,
        min_cell_count: usize,
    ) -> Result<Self> {
        let FilteredPair {
            clusters,
            grid,
            removed,
        } = filter_noise(&original_clusters, &original_grid, min_cell_count)?;
        Ok(Self {
            original_clusters,
            original_grid,
            clusters,
            grid,
            noise: removed,
            footprint: Vec::new(),
        })
    }

    /// Drop filtered clusters with no erosion evidence in their footprint.
    /// `erosion` is only read.
    pub fn with_footprint_check(self, erosion: &GridTable, buffer_bins: usize) -> Result<Self> {
        let outcome = validate_footprint(&self.clusters, &self.grid, erosion, buffer_bins)?;
        Ok(Self {
            clusters: outcome.clusters,
            grid: outcome.grid,
            footprint: outcome.rejected,
            ..self
        })
    }
}
