//! Windowed loading of a [`RasterSource`] into a sparse [`Grid`].

use std::ops::Range;

use log::{debug, warn};

use super::{ChunkLayout, RasterInfo, RasterSource, ReadError, ReadOutcome};
use crate::bbox::BoundingBox;
use crate::grid::{Grid, Sample};

/// Reads the part of `source` overlapping `window`.
///
/// Rows whose centre latitude lies within one cell of the window are
/// allocated and decoded; all others stay unloaded. A grid passed in
/// `existing` is reused when its dimensions match the source.
pub fn read_window<S, T>(
    source: &mut S,
    window: &BoundingBox,
    existing: Option<Grid<T>>,
) -> Result<ReadOutcome<T>, ReadError>
where
    S: RasterSource + ?Sized,
    T: Sample,
{
    let info = source.info()?;
    check_format::<T>(source.name(), &info)?;
    let extent = georeferenced_extent(source.name(), &info)?;

    if !window.intersects(&extent) {
        debug!("{} does not intersect the requested window", source.name());
        return Ok(ReadOutcome::OutsideWindow { recycled: existing });
    }

    let grid = prepare_grid(source.name(), &info, extent, window, existing)?;
    let grid = decode(source, &info, window, grid)?;
    Ok(ReadOutcome::Loaded(grid))
}

/// Reads every row of `source`.
pub fn read_all<S, T>(source: &mut S) -> Result<Grid<T>, ReadError>
where
    S: RasterSource + ?Sized,
    T: Sample,
{
    let info = source.info()?;
    check_format::<T>(source.name(), &info)?;
    let extent = georeferenced_extent(source.name(), &info)?;

    let grid = prepare_grid(source.name(), &info, extent, &extent, None)?;
    decode(source, &info, &extent, grid)
}

fn check_format<T: Sample>(name: &str, info: &RasterInfo) -> Result<(), ReadError> {
    if info.sample_format == T::FORMAT
        && info.bits_per_sample == T::BITS
        && info.samples_per_pixel == 1
    {
        return Ok(());
    }

    warn!("{name} is not a supported {}{} GeoTiff", T::FORMAT, T::BITS);
    Err(ReadError::UnsupportedFormat {
        name: name.to_string(),
        expected: format!("{}{}", T::FORMAT, T::BITS),
        found: format!(
            "{} band(s) of {}-bit {}",
            info.samples_per_pixel, info.bits_per_sample, info.sample_format
        ),
    })
}

fn georeferenced_extent(name: &str, info: &RasterInfo) -> Result<BoundingBox, ReadError> {
    if info.tie_point.is_none() {
        return Err(ReadError::MissingGeoreference {
            name: name.to_string(),
            tag: "ModelTiepoint",
        });
    }
    info.extent().ok_or_else(|| ReadError::MissingGeoreference {
        name: name.to_string(),
        tag: "ModelPixelScale",
    })
}

/// Sets up georeferencing and allocates the rows the window needs.
fn prepare_grid<T: Sample>(
    name: &str,
    info: &RasterInfo,
    extent: BoundingBox,
    window: &BoundingBox,
    existing: Option<Grid<T>>,
) -> Result<Grid<T>, ReadError> {
    let num_rows = info.height as usize;
    let num_cols = info.width as usize;
    let scale = info.pixel_scale.unwrap_or_default();

    let no_data = match info.no_data.as_deref() {
        Some(text) => T::parse_no_data(text).or_else(|| {
            warn!("{name} has an unparsable nodata value {text:?}");
            T::implicit_no_data()
        }),
        None => T::implicit_no_data(),
    };

    let band = row_band(num_rows, extent.top, scale[1], window);
    let too_large = || {
        warn!("{name} too large (out of memory) with {num_rows} rows");
        ReadError::Allocation {
            name: name.to_string(),
            rows: band.len(),
            cols: num_cols,
        }
    };

    let cells = band
        .len()
        .checked_mul(num_cols)
        .and_then(|cells| cells.checked_mul(size_of::<T>()))
        .filter(|&bytes| bytes <= isize::MAX as usize);
    if cells.is_none() {
        return Err(too_large());
    }

    // A reused grid keeps its storage but none of its rows.
    let mut grid = match existing {
        Some(mut grid) if grid.num_rows == num_rows && grid.num_cols == num_cols => {
            grid.rows_mut().clear();
            grid
        }
        _ => Grid::try_new(num_rows, num_cols).map_err(|_| too_large())?,
    };

    grid.no_data = no_data;
    grid.extent = extent;
    grid.cell_size_x = scale[0];
    grid.cell_size_y = scale[1];
    grid.geo = info.geo_keys;

    if grid.rows_mut().try_reserve_rows(band.len()).is_err() {
        return Err(too_large());
    }
    for row in band.clone() {
        grid.allocate_row(row);
    }

    debug!(
        "{name}: loading {} of {num_rows} rows",
        grid.allocated_row_count()
    );

    Ok(grid)
}

/// Rows whose centre latitude lies within one cell of the window, i.e. in
/// `[window.bottom - cell_size_y, window.top + cell_size_y]`.
fn row_band(num_rows: usize, top: f64, cell_size_y: f64, window: &BoundingBox) -> Range<usize> {
    if cell_size_y.is_nan() || cell_size_y < 0.0 {
        return 0..0;
    }
    let low = window.bottom - cell_size_y;
    let high = window.top + cell_size_y;
    let centre = |row: usize| top - (row as f64 + 0.5) * cell_size_y;

    // Centres decrease with the row index.
    let first = partition_point(num_rows, |row| centre(row) > high);
    let end = partition_point(num_rows, |row| centre(row) >= low);
    first..end.max(first)
}

/// First index in `0..len` for which `pred` is false, `pred` being true for
/// a prefix of the range.
fn partition_point(len: usize, pred: impl Fn(usize) -> bool) -> usize {
    let (mut lo, mut hi) = (0, len);
    while lo < hi {
        let mid = lo + (hi - lo) / 2;
        if pred(mid) {
            lo = mid + 1;
        } else {
            hi = mid;
        }
    }
    lo
}

fn decode<S, T>(
    source: &mut S,
    info: &RasterInfo,
    window: &BoundingBox,
    mut grid: Grid<T>,
) -> Result<Grid<T>, ReadError>
where
    S: RasterSource + ?Sized,
    T: Sample,
{
    match info.layout {
        ChunkLayout::Strips { rows_per_strip } => read_strips(source, &mut grid, rows_per_strip),
        ChunkLayout::Tiles { width, length } => {
            read_tiles(source, &mut grid, window, width as usize, length as usize)
        }
    }
    Ok(grid)
}

fn decode_chunk<S, T>(source: &mut S, index: u32) -> Result<Vec<T>, ReadError>
where
    S: RasterSource + ?Sized,
    T: Sample,
{
    let chunk = source.read_chunk(index)?;
    T::from_chunk(chunk).ok_or_else(|| ReadError::Chunk {
        index,
        reason: "sample type does not match the declared format".to_string(),
    })
}

/// Scanline path: decodes only the strips holding loaded rows. A strip
/// that fails to decode leaves its rows filled with nodata.
fn read_strips<S, T>(source: &mut S, grid: &mut Grid<T>, rows_per_strip: u32)
where
    S: RasterSource + ?Sized,
    T: Sample,
{
    let rows_per_strip = rows_per_strip.max(1) as usize;
    let num_cols = grid.num_cols;
    let fill = grid.fill_value();
    let rows: Vec<usize> = grid.allocated_rows().collect();

    let mut current: Option<(usize, Option<Vec<T>>)> = None;
    for row in rows {
        let strip = row / rows_per_strip;
        if current.as_ref().is_none_or(|(index, _)| *index != strip) {
            let decoded = match decode_chunk(source, strip as u32) {
                Ok(data) => Some(data),
                Err(e) => {
                    warn!("{} corrupt? (strip {strip} read failed: {e})", source.name());
                    None
                }
            };
            current = Some((strip, decoded));
        }

        let Some(values) = grid.row_mut(row) else {
            continue;
        };
        let start = (row - strip * rows_per_strip) * num_cols;
        match current.as_ref().and_then(|(_, data)| data.as_ref()) {
            Some(data) if data.len() >= start + num_cols => {
                values.copy_from_slice(&data[start..start + num_cols]);
            }
            Some(_) => {
                warn!("{} strip {strip} is short, row {row} set to nodata", source.name());
                values.fill(fill);
            }
            None => values.fill(fill),
        }
    }
}

/// Tiled path: decodes only tiles whose geographic box intersects the
/// window and scatters them into the loaded rows.
fn read_tiles<S, T>(
    source: &mut S,
    grid: &mut Grid<T>,
    window: &BoundingBox,
    tile_width: usize,
    tile_length: usize,
) where
    S: RasterSource + ?Sized,
    T: Sample,
{
    let tile_width = tile_width.max(1);
    let tile_length = tile_length.max(1);
    let (width, height) = (grid.num_cols, grid.num_rows);
    let tiles_across = width.div_ceil(tile_width);
    let (top, left) = (grid.extent.top, grid.extent.left);
    let (scale_x, scale_y) = (grid.cell_size_x, grid.cell_size_y);

    let mut decoded = 0usize;
    let mut skipped = 0usize;

    for (tile_row, y) in (0..height).step_by(tile_length).enumerate() {
        for (tile_col, x) in (0..width).step_by(tile_width).enumerate() {
            let tile_box = BoundingBox::new(
                top - y as f64 * scale_y,
                top - (y + tile_length) as f64 * scale_y,
                left + x as f64 * scale_x,
                left + (x + tile_width) as f64 * scale_x,
            );
            if !tile_box.intersects(window) {
                skipped += 1;
                continue;
            }

            let index = (tile_row * tiles_across + tile_col) as u32;
            let data: Vec<T> = match decode_chunk(source, index) {
                Ok(data) => data,
                Err(e) => {
                    warn!("{} tile {index} read failed: {e}", source.name());
                    continue;
                }
            };
            decoded += 1;

            // Edge tiles come back either cropped to the image or padded
            // to the nominal tile size.
            let data_width = tile_width.min(width - x);
            let data_height = tile_length.min(height - y);
            let stride = if data.len() == data_width * data_height {
                data_width
            } else if data.len() == tile_width * tile_length {
                tile_width
            } else {
                warn!(
                    "{} tile {index} has {} samples, expected {}",
                    source.name(),
                    data.len(),
                    data_width * data_height
                );
                continue;
            };

            for j in 0..data_height {
                let gy = y + j;
                let Some(values) = grid.row_mut(gy) else {
                    continue;
                };
                for i in 0..data_width {
                    let gx = x + i;
                    if gx >= width {
                        continue;
                    }
                    values[gx] = data[j * stride + i];
                }
            }
        }
    }

    debug!(
        "{}: decoded {decoded} tiles, skipped {skipped}",
        source.name()
    );
}
