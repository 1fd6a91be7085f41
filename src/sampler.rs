//! Samples point locations against a stack of rasters.

use std::path::PathBuf;

use log::{info, warn};

use crate::bbox::{BboxError, BoundingBox};
use crate::grid::FloatGrid;
use crate::points::{Point, points_window};
use crate::readers::{GeoTiffReader, ReadOutcome};

pub const NO_DATA: &str = "No Data";

/// Grids loaded for one window, in raster order.
#[derive(Debug, Default)]
pub struct GridStack {
    pub grids: Vec<FloatGrid>,
    /// Rasters that do not overlap the window.
    pub outside: usize,
    /// Rasters that could not be read.
    pub failed: usize,
}

impl GridStack {
    /// Loads every raster restricted to `window`.
    pub fn load(rasters: &[PathBuf], window: &BoundingBox) -> Self {
        let mut stack = GridStack::default();
        for path in rasters {
            match GeoTiffReader::new(path).read_window::<f32>(window, None) {
                Ok(ReadOutcome::Loaded(grid)) => stack.grids.push(grid),
                Ok(ReadOutcome::OutsideWindow { .. }) => stack.outside += 1,
                Err(e) => {
                    warn!("{e}");
                    stack.failed += 1;
                }
            }
        }
        info!(
            "loaded {} of {} rasters ({} outside the window, {} failed)",
            stack.grids.len(),
            rasters.len(),
            stack.outside,
            stack.failed
        );
        stack
    }

    /// True when nothing was loaded only because every raster lies outside
    /// the window.
    pub fn all_outside(&self) -> bool {
        self.failed == 0
    }

    /// First non-nodata value at the location, trying rasters in order.
    pub fn value_at(&self, lon: f64, lat: f64) -> Option<f32> {
        self.grids.iter().find_map(|grid| grid.value_at(lon, lat))
    }
}

/// Per-point results of a sampling run.
#[derive(Debug)]
pub struct SampleRun {
    pub values: Vec<Option<f32>>,
    pub stack: GridStack,
}

impl SampleRun {
    pub fn has_data(&self) -> bool {
        !self.stack.grids.is_empty()
    }
}

/// Samples `points` against `rasters`. The read window is the bounding box
/// of the points unless `window` overrides it.
pub fn sample_points(
    points: &[Point],
    rasters: &[PathBuf],
    window: Option<BoundingBox>,
) -> Result<SampleRun, BboxError> {
    let window = match window {
        Some(window) => window,
        None => points_window(points)?,
    };

    let stack = GridStack::load(rasters, &window);
    let values = points
        .iter()
        .map(|p| stack.value_at(p.lon, p.lat))
        .collect();

    Ok(SampleRun { values, stack })
}

pub fn format_value(value: Option<f32>) -> String {
    value.map_or_else(|| NO_DATA.to_string(), |v| format!("{v:.2}"))
}
