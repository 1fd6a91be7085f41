pub mod geotiff;

pub use geotiff::{GeoTiffWriter, Provenance, ROWS_PER_STRIP, WriteError, WriteReport};
