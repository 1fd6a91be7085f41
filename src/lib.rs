//! Windowed GeoTIFF grid loading, point sampling and GeoTIFF export.

pub mod bbox;
pub mod config;
pub mod geotags;
pub mod grid;
pub mod points;
pub mod readers;
pub mod sampler;
pub mod utils;
pub mod writers;

pub use bbox::BoundingBox;
pub use grid::{FloatGrid, Grid, GridLoc, IntGrid};
pub use readers::{GeoTiffReader, ReadError, ReadOutcome};
pub use writers::{GeoTiffWriter, Provenance, WriteError, WriteReport};
