pub mod geotiff;
#[cfg(test)]
pub(crate) mod memory;
pub mod types;
pub mod utils;
pub mod window;

use std::path::Path;

pub use geotiff::{GeoTiffReader, TiffSource};
pub use types::{
    ChunkData, ChunkLayout, RasterInfo, RasterSource, ReadError, ReadOutcome, SampleFormat,
};
pub use utils::{FileType, reader_from_filetype};
pub use window::{read_all, read_window};

/// Opens `path` as a [`RasterSource`] based on its extension.
pub fn create_source(path: &Path) -> Result<Box<dyn RasterSource>, ReadError> {
    match reader_from_filetype(path) {
        Some(FileType::GeoTiff) => Ok(Box::new(TiffSource::open(path)?)),
        None => Err(ReadError::UnknownFileType(path.to_path_buf())),
    }
}
