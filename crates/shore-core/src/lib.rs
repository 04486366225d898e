//! Cleaning of gridded shoreline change clusters.
//!
//! Each date folder holds a cluster-id grid and a value grid per event kind
//! (erosion, accretion) at 10×10 cm resolution. Cleaning drops clusters too
//! small to be real and, for accretion, clusters with no erosion anywhere in
//! their shoreward footprint.
pub mod cluster;
pub mod config;
pub mod csv_grid;
pub mod grid;
pub mod pipeline;
