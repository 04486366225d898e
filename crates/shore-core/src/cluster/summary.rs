//! Per-cluster centroid and volume for reporting and bubble plots.

use serde::{Deserialize, Serialize};

use super::{centroid_of, index_clusters, volume_of};
use crate::grid::{ClusterId, GridTable, Result};

/// Area of one 10×10 cm grid cell in square metres.
pub const UNIT_AREA: f64 = 0.01;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClusterSummary {
    pub id: ClusterId,
    pub cell_count: usize,
    /// Mean alongshore (row) index.
    pub centroid_row: f64,
    /// Mean vertical (column) index.
    pub centroid_col: f64,
    pub volume: f64,
}

/// Summarise every nonzero cluster in ascending id order.
///
/// Returns an empty vector when the grid holds no clusters; callers should
/// skip their reporting rather than treat that as an error.
pub fn summarize(ids: &GridTable, values: &GridTable) -> Result<Vec<ClusterSummary>> {
    ids.ensure_same_shape(values)?;
    let index = index_clusters(ids)?;

    Ok(index
        .iter()
        .filter_map(|(&id, cells)| {
            let (centroid_row, centroid_col) = centroid_of(cells)?;
            Some(ClusterSummary {
                id,
                cell_count: cells.len(),
                centroid_row,
                centroid_col,
                volume: volume_of(values, cells),
            })
        })
        .collect())
}
