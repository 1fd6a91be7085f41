use std::fs::File;
use std::io::{BufWriter, Seek, Write};
use std::path::{Path, PathBuf};

use chrono::NaiveDateTime;
use log::{debug, warn};
use thiserror::Error;
use tiff::encoder::colortype::Gray32Float;
use tiff::encoder::{Compression, DeflateLevel, TiffEncoder};
use tiff::tags::Tag;

use crate::geotags::{self, extension_tags};
use crate::grid::FloatGrid;

/// Rows grouped into each strip of the output.
pub const ROWS_PER_STRIP: u32 = 20;

const SOFTWARE: &str = concat!("tifgrid ", env!("CARGO_PKG_VERSION"));

#[derive(Debug, Error)]
pub enum WriteError {
    #[error("Failed to create {}: {source}", path.display())]
    Create {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("TIFF encoding error: {0}")]
    Encode(#[from] tiff::TiffError),
    #[error("Invalid grid: {0}")]
    InvalidGrid(String),
}

/// Optional provenance tags.
#[derive(Debug, Clone, Default)]
pub struct Provenance {
    pub artist: Option<String>,
    pub datetime: Option<NaiveDateTime>,
    pub copyright: Option<String>,
}

/// What a finished write managed to store.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct WriteReport {
    pub rows_written: usize,
    /// Rows that were not loaded in the grid, written as nodata.
    pub missing_rows: Vec<usize>,
}

impl WriteReport {
    pub fn is_complete(&self) -> bool {
        self.missing_rows.is_empty()
    }
}

/// Writes a [`FloatGrid`] as an untiled, deflate compressed, single-band
/// float32 GeoTIFF.
pub struct GeoTiffWriter<'a> {
    grid: &'a FloatGrid,
    provenance: Provenance,
}

impl<'a> GeoTiffWriter<'a> {
    #[must_use]
    pub fn new(grid: &'a FloatGrid) -> Self {
        extension_tags();
        Self {
            grid,
            provenance: Provenance::default(),
        }
    }

    #[must_use]
    pub fn provenance(mut self, provenance: Provenance) -> Self {
        self.provenance = provenance;
        self
    }

    pub fn write<P: AsRef<Path>>(self, path: P) -> Result<WriteReport, WriteError> {
        let path = path.as_ref();
        let file = File::create(path).map_err(|source| WriteError::Create {
            path: path.to_path_buf(),
            source,
        })?;
        let report = self.write_to(BufWriter::new(file))?;
        debug!("wrote {} rows to {}", report.rows_written, path.display());
        Ok(report)
    }

    pub fn write_to<W: Write + Seek>(self, writer: W) -> Result<WriteReport, WriteError> {
        let grid = self.grid;
        if grid.num_rows == 0 || grid.num_cols == 0 {
            return Err(WriteError::InvalidGrid("grid has zero dimensions".to_string()));
        }
        let width = u32::try_from(grid.num_cols)
            .map_err(|_| WriteError::InvalidGrid(format!("{} columns", grid.num_cols)))?;
        let height = u32::try_from(grid.num_rows)
            .map_err(|_| WriteError::InvalidGrid(format!("{} rows", grid.num_rows)))?;

        // Unloaded rows are stored as the value the nodata tag announces.
        let fill = grid.no_data.unwrap_or(f32::NAN);
        let mut report = WriteReport::default();
        let mut data = Vec::with_capacity(grid.num_rows * grid.num_cols);
        for row in 0..grid.num_rows {
            match grid.row(row) {
                Some(values) => data.extend_from_slice(values),
                None => {
                    data.resize(data.len() + grid.num_cols, fill);
                    report.missing_rows.push(row);
                }
            }
        }

        let mut encoder = TiffEncoder::new(writer)?
            .with_compression(Compression::Deflate(DeflateLevel::Balanced));
        let mut image = encoder.new_image::<Gray32Float>(width, height)?;
        image.rows_per_strip(ROWS_PER_STRIP)?;
        self.write_tags(image.encoder())?;
        image.write_data(&data)?;
        report.rows_written = grid.num_rows;

        if !report.missing_rows.is_empty() {
            warn!(
                "{} rows were not loaded and were written as nodata",
                report.missing_rows.len()
            );
        }
        Ok(report)
    }

    fn write_tags<W: Write + Seek, K: tiff::encoder::TiffKind>(
        &self,
        dir: &mut tiff::encoder::DirectoryEncoder<W, K>,
    ) -> Result<(), WriteError> {
        let grid = self.grid;
        let tags = extension_tags();

        dir.write_tag(tags.gdal_nodata, format_no_data(grid.no_data).as_str())?;
        dir.write_tag(Tag::Software, SOFTWARE)?;
        if let Some(artist) = &self.provenance.artist {
            dir.write_tag(Tag::Artist, artist.as_str())?;
        }
        if let Some(datetime) = &self.provenance.datetime {
            let text = datetime.format("%Y:%m:%d %H:%M:%S").to_string();
            dir.write_tag(Tag::DateTime, text.as_str())?;
        }
        if let Some(copyright) = &self.provenance.copyright {
            dir.write_tag(Tag::Copyright, copyright.as_str())?;
        }

        let pixel_scale = [grid.cell_size_x, grid.cell_size_y, 0.0];
        dir.write_tag(tags.model_pixel_scale, pixel_scale.as_slice())?;

        let tie_point = [0.0, 0.0, 0.0, grid.extent.left, grid.extent.top, 0.0];
        dir.write_tag(tags.model_tiepoint, tie_point.as_slice())?;

        let keys = grid.geo.unwrap_or_default();
        let directory = geotags::geo_key_directory(&keys);
        dir.write_tag(tags.geo_key_directory, directory.as_slice())?;

        Ok(())
    }
}

/// Nodata as GDAL expects it: a `%f` style decimal, `nan` for NaN.
fn format_no_data(no_data: Option<f32>) -> String {
    match no_data {
        Some(v) if v.is_nan() => "nan".to_string(),
        Some(v) if v.is_infinite() => (if v > 0.0 { "inf" } else { "-inf" }).to_string(),
        Some(v) => format!("{v:.6}"),
        None => "nan".to_string(),
    }
}

impl FloatGrid {
    /// Writes this grid to a GeoTIFF file without provenance tags.
    pub fn write_geotiff<P: AsRef<Path>>(&self, path: P) -> Result<WriteReport, WriteError> {
        GeoTiffWriter::new(self).write(path)
    }
}
