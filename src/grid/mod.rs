//! In-memory raster grids.
//!
//! A [`Grid`] always describes the *full* source raster (dimensions, extent,
//! cell size) but only holds the rows a reader chose to load. Every access
//! goes through [`Grid::row`] or [`Grid::value_at`], which report unloaded
//! rows as `None`.

use std::collections::TryReserveError;
use std::fmt;

use crate::bbox::BoundingBox;

pub mod rows;
pub mod sample;

pub use rows::RowStore;
pub use sample::Sample;

pub type FloatGrid = Grid<f32>;
pub type IntGrid = Grid<i32>;

/// GeoTIFF model type for geographic (lat/long) rasters.
pub const MODEL_GEOGRAPHIC: u16 = 2;
pub const GCS_WGS_84: u16 = 4326;
pub const DATUM_WGS_84: u16 = 6326;

/// Coordinate reference keys copied verbatim from a source's GeoKey
/// directory. They are never interpreted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GeoKeys {
    pub model_type: u16,
    pub geographic_type: u16,
    pub geodetic_datum: u16,
}

impl Default for GeoKeys {
    fn default() -> Self {
        Self {
            model_type: MODEL_GEOGRAPHIC,
            geographic_type: GCS_WGS_84,
            geodetic_datum: DATUM_WGS_84,
        }
    }
}

/// Cell position, `x` is the column and `y` the row (0 = north).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GridLoc {
    pub x: usize,
    pub y: usize,
}

#[derive(Debug, Clone)]
pub struct Grid<T> {
    pub num_rows: usize,
    pub num_cols: usize,
    pub no_data: Option<T>,
    pub extent: BoundingBox,
    pub cell_size_x: f64,
    pub cell_size_y: f64,
    /// `None` until populated from a source; the writer then falls back to
    /// WGS84 geographic keys.
    pub geo: Option<GeoKeys>,
    rows: RowStore<T>,
}

impl<T: Sample> Grid<T> {
    /// Creates a grid with no rows loaded and no georeferencing.
    pub fn new(num_rows: usize, num_cols: usize) -> Self {
        Self::with_rows(num_rows, num_cols, RowStore::new(num_rows, num_cols))
    }

    /// Like [`Grid::new`], but fails instead of aborting when the row table
    /// for `num_rows` cannot be allocated.
    pub fn try_new(num_rows: usize, num_cols: usize) -> Result<Self, TryReserveError> {
        let rows = RowStore::try_new(num_rows, num_cols)?;
        Ok(Self::with_rows(num_rows, num_cols, rows))
    }

    fn with_rows(num_rows: usize, num_cols: usize, rows: RowStore<T>) -> Self {
        Self {
            num_rows,
            num_cols,
            no_data: T::implicit_no_data(),
            extent: BoundingBox::new(0.0, 0.0, 0.0, 0.0),
            cell_size_x: 0.0,
            cell_size_y: 0.0,
            geo: None,
            rows,
        }
    }

    /// Sets the origin (top-left corner) and cell size, deriving the
    /// bottom/right edges from the dimensions.
    pub fn with_origin(mut self, top: f64, left: f64, cell_size_x: f64, cell_size_y: f64) -> Self {
        self.cell_size_x = cell_size_x;
        self.cell_size_y = cell_size_y;
        self.extent = BoundingBox::new(
            top,
            top - cell_size_y * self.num_rows as f64,
            left,
            left + cell_size_x * self.num_cols as f64,
        );
        self
    }

    pub fn with_no_data(mut self, no_data: Option<T>) -> Self {
        self.no_data = no_data;
        self
    }

    /// Legacy single cell size, equal to [`Grid::cell_size_x`].
    pub fn cell_size(&self) -> f64 {
        self.cell_size_x
    }

    /// Value new rows are filled with.
    pub fn fill_value(&self) -> T {
        self.no_data.unwrap_or_default()
    }

    pub fn is_no_data(&self, value: T) -> bool {
        self.no_data.is_some_and(|nd| value.is_no_data(nd))
    }

    pub fn row(&self, row: usize) -> Option<&[T]> {
        self.rows.get(row)
    }

    pub fn row_mut(&mut self, row: usize) -> Option<&mut [T]> {
        self.rows.get_mut(row)
    }

    pub fn is_row_allocated(&self, row: usize) -> bool {
        self.rows.is_allocated(row)
    }

    pub fn allocated_rows(&self) -> impl Iterator<Item = usize> + '_ {
        self.rows.allocated()
    }

    pub fn allocated_row_count(&self) -> usize {
        self.rows.allocated_count()
    }

    pub(crate) fn rows_mut(&mut self) -> &mut RowStore<T> {
        &mut self.rows
    }

    /// Loads `row` filled with the nodata sentinel if it is not present yet.
    pub fn allocate_row(&mut self, row: usize) {
        let fill = self.fill_value();
        self.rows.allocate(row, fill);
    }

    /// Centre latitude of `row`.
    pub fn row_latitude(&self, row: usize) -> f64 {
        self.extent.top - (row as f64 + 0.5) * self.cell_size_y
    }

    /// Maps a coordinate onto a cell of the full raster.
    ///
    /// The row may still be unloaded; use [`Grid::value_at`] to also
    /// account for that and for nodata cells.
    pub fn grid_loc(&self, lon: f64, lat: f64) -> Option<GridLoc> {
        let col = ((lon - self.extent.left) / self.cell_size_x).floor();
        let row = ((self.extent.top - lat) / self.cell_size_y).floor();

        if !col.is_finite() || !row.is_finite() || col < 0.0 || row < 0.0 {
            return None;
        }

        let (x, y) = (col as usize, row as usize);
        if x >= self.num_cols || y >= self.num_rows {
            return None;
        }

        Some(GridLoc { x, y })
    }

    /// Cell value at a coordinate, `None` when outside the raster, on an
    /// unloaded row, or equal to the nodata sentinel.
    pub fn value_at(&self, lon: f64, lat: f64) -> Option<T> {
        let GridLoc { x, y } = self.grid_loc(lon, lat)?;
        let value = *self.row(y)?.get(x)?;
        if self.is_no_data(value) {
            None
        } else {
            Some(value)
        }
    }
}

impl<T: Sample> fmt::Display for Grid<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut min_value: Option<T> = None;
        let mut max_value: Option<T> = None;
        for row in self.allocated_rows() {
            let Some(values) = self.row(row) else {
                continue;
            };
            for &v in values.iter().filter(|&&v| !self.is_no_data(v)) {
                if min_value.is_none_or(|m| v < m) {
                    min_value = Some(v);
                }
                if max_value.is_none_or(|m| v > m) {
                    max_value = Some(v);
                }
            }
        }

        let show = |v: Option<T>| v.map_or_else(|| "n/a".to_string(), |v| v.to_string());

        write!(
            f,
            "Width: {}\nHeight: {}\nLoaded rows: {}\nExtent: top {} bottom {} left {} right {}\nCell size: {} x {}\nMin value: {}\nMax value: {}",
            self.num_cols,
            self.num_rows,
            self.allocated_row_count(),
            self.extent.top,
            self.extent.bottom,
            self.extent.left,
            self.extent.right,
            self.cell_size_x,
            self.cell_size_y,
            show(min_value),
            show(max_value),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn four_by_four() -> FloatGrid {
        let mut grid = FloatGrid::new(4, 4).with_origin(10.0, 20.0, 1.0, 1.0);
        for row in 0..4 {
            grid.allocate_row(row);
            let values = grid.row_mut(row).unwrap();
            for (col, v) in values.iter_mut().enumerate() {
                *v = (row * 4 + col) as f32;
            }
        }
        grid
    }

    #[test]
    fn test_extent_from_origin() {
        let grid = four_by_four();
        assert_eq!(grid.extent, BoundingBox::new(10.0, 6.0, 20.0, 24.0));
        assert_eq!(grid.cell_size(), 1.0);
        assert!(grid.no_data.unwrap().is_nan());
    }

    #[test]
    fn test_grid_loc_row_zero_is_north() {
        let grid = four_by_four();
        assert_eq!(grid.grid_loc(21.5, 9.5), Some(GridLoc { x: 1, y: 0 }));
        assert_eq!(grid.grid_loc(20.0, 10.0), Some(GridLoc { x: 0, y: 0 }));
        assert_eq!(grid.grid_loc(23.99, 6.01), Some(GridLoc { x: 3, y: 3 }));
    }

    #[test]
    fn test_grid_loc_out_of_range() {
        let grid = four_by_four();
        assert_eq!(grid.grid_loc(19.9, 9.0), None);
        assert_eq!(grid.grid_loc(24.0, 9.0), None);
        assert_eq!(grid.grid_loc(21.0, 10.5), None);
        assert_eq!(grid.grid_loc(21.0, 6.0), None);
        assert_eq!(grid.grid_loc(f64::NAN, 8.0), None);
    }

    #[test]
    fn test_value_at_respects_rows_and_no_data() {
        let mut grid = FloatGrid::new(3, 2)
            .with_origin(1.0, 0.0, 0.5, 0.5)
            .with_no_data(Some(-9999.0));
        grid.allocate_row(0);
        grid.allocate_row(2);
        grid.row_mut(0).unwrap().copy_from_slice(&[3.0, -9999.0]);

        assert_eq!(grid.value_at(0.1, 0.9), Some(3.0));
        assert_eq!(grid.value_at(0.6, 0.9), None);
        // Row 1 is present in the raster but was never loaded.
        assert!(grid.grid_loc(0.1, 0.4).is_some());
        assert_eq!(grid.value_at(0.1, 0.4), None);
        // Row 2 was loaded but never written: it still holds the sentinel.
        assert_eq!(grid.value_at(0.1, -0.2), None);
    }

    #[test]
    fn test_nan_no_data_cells_are_detected() {
        let mut grid = FloatGrid::new(1, 2).with_origin(1.0, 0.0, 1.0, 1.0);
        grid.allocate_row(0);
        grid.row_mut(0).unwrap()[1] = 2.5;
        assert!(grid.is_no_data(grid.row(0).unwrap()[0]));
        assert_eq!(grid.value_at(0.5, 0.5), None);
        assert_eq!(grid.value_at(1.5, 0.5), Some(2.5));
    }

    #[test]
    fn test_int_grid_without_sentinel() {
        let mut grid = IntGrid::new(1, 1).with_origin(1.0, 0.0, 1.0, 1.0);
        grid.allocate_row(0);
        assert_eq!(grid.no_data, None);
        assert_eq!(grid.value_at(0.5, 0.5), Some(0));
    }

    #[test]
    fn test_row_latitude_is_cell_centre() {
        let grid = four_by_four();
        assert_eq!(grid.row_latitude(0), 9.5);
        assert_eq!(grid.row_latitude(3), 6.5);
    }

    #[test]
    fn test_display_summarizes_loaded_values() {
        let grid = four_by_four();
        let text = grid.to_string();
        assert!(text.contains("Loaded rows: 4"));
        assert!(text.contains("Min value: 0"));
        assert!(text.contains("Max value: 15"));
    }
}
