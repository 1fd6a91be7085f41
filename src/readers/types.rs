use std::fmt;
use std::path::PathBuf;

use thiserror::Error;

use crate::bbox::BoundingBox;
use crate::grid::{GeoKeys, Grid};

/// A raster the window reader can pull metadata and pixel chunks from.
///
/// Chunks are numbered the TIFF way: strips top to bottom, or tiles in
/// row-major order.
pub trait RasterSource {
    fn name(&self) -> &str;
    fn info(&mut self) -> Result<RasterInfo, ReadError>;
    fn read_chunk(&mut self, index: u32) -> Result<ChunkData, ReadError>;
}

#[derive(Debug, Error)]
pub enum ReadError {
    #[error("Failed to open {}: {source}", path.display())]
    Open {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("Unknown raster file type: {}", .0.display())]
    UnknownFileType(PathBuf),
    #[error("Failed to decode TIFF: {0}")]
    Tiff(#[from] tiff::TiffError),
    #[error("{name} is not a supported {expected} GeoTiff ({found})")]
    UnsupportedFormat {
        name: String,
        expected: String,
        found: String,
    },
    #[error("{name} has no {tag} tag")]
    MissingGeoreference { name: String, tag: &'static str },
    #[error("{name} too large (out of memory) with {rows} rows of {cols} columns")]
    Allocation {
        name: String,
        rows: usize,
        cols: usize,
    },
    #[error("Failed to decode chunk {index}: {reason}")]
    Chunk { index: u32, reason: String },
}

/// Result of a windowed read.
#[derive(Debug)]
pub enum ReadOutcome<T> {
    Loaded(Grid<T>),
    /// The source does not overlap the window. Nothing was decoded; the
    /// grid handed in for reuse (if any) comes back untouched.
    OutsideWindow { recycled: Option<Grid<T>> },
}

impl<T> ReadOutcome<T> {
    pub fn into_grid(self) -> Option<Grid<T>> {
        match self {
            ReadOutcome::Loaded(grid) => Some(grid),
            ReadOutcome::OutsideWindow { .. } => None,
        }
    }

    pub fn is_outside(&self) -> bool {
        matches!(self, ReadOutcome::OutsideWindow { .. })
    }
}

/// TIFF `SampleFormat` values.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SampleFormat {
    Uint,
    Int,
    Float,
    Other(u16),
}

impl SampleFormat {
    pub fn from_code(code: u16) -> Self {
        match code {
            1 => SampleFormat::Uint,
            2 => SampleFormat::Int,
            3 => SampleFormat::Float,
            other => SampleFormat::Other(other),
        }
    }
}

impl fmt::Display for SampleFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SampleFormat::Uint => write!(f, "UInt"),
            SampleFormat::Int => write!(f, "Int"),
            SampleFormat::Float => write!(f, "Float"),
            SampleFormat::Other(code) => write!(f, "SampleFormat({code})"),
        }
    }
}

/// Physical pixel organisation of a source.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChunkLayout {
    Strips { rows_per_strip: u32 },
    Tiles { width: u32, length: u32 },
}

/// Decoded pixels of one strip or tile.
#[derive(Debug, Clone, PartialEq)]
pub enum ChunkData {
    F32(Vec<f32>),
    I32(Vec<i32>),
}

impl ChunkData {
    pub fn len(&self) -> usize {
        match self {
            ChunkData::F32(v) => v.len(),
            ChunkData::I32(v) => v.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct RasterInfo {
    pub width: u32,
    pub height: u32,
    pub samples_per_pixel: u16,
    pub bits_per_sample: u16,
    pub sample_format: SampleFormat,
    /// `[I, J, K, X, Y, Z]`, pixel (I, J) sits at model (X, Y).
    pub tie_point: Option<[f64; 6]>,
    /// `[ScaleX, ScaleY, ScaleZ]`
    pub pixel_scale: Option<[f64; 3]>,
    pub layout: ChunkLayout,
    /// Raw GDAL nodata tag text.
    pub no_data: Option<String>,
    pub geo_keys: Option<GeoKeys>,
}

impl RasterInfo {
    /// Geographic extent derived from the tie point and pixel scale.
    pub fn extent(&self) -> Option<BoundingBox> {
        let tie = self.tie_point?;
        let scale = self.pixel_scale?;
        Some(BoundingBox::new(
            tie[4],
            tie[4] - scale[1] * f64::from(self.height),
            tie[3],
            tie[3] + scale[0] * f64::from(self.width),
        ))
    }
}

impl fmt::Display for RasterInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Width: {}\nHeight: {}", self.width, self.height)?;
        writeln!(
            f,
            "Samples: {} x {}-bit {}",
            self.samples_per_pixel, self.bits_per_sample, self.sample_format
        )?;
        match self.layout {
            ChunkLayout::Strips { rows_per_strip } => {
                writeln!(f, "Layout: strips of {rows_per_strip} rows")?
            }
            ChunkLayout::Tiles { width, length } => {
                writeln!(f, "Layout: {width}x{length} tiles")?
            }
        }
        if let Some(extent) = self.extent() {
            writeln!(
                f,
                "Extent: top {} bottom {} left {} right {}",
                extent.top, extent.bottom, extent.left, extent.right
            )?;
        }
        write!(f, "NoData: {}", self.no_data.as_deref().unwrap_or("none"))
    }
}
