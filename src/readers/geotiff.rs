use std::fs::File;
use std::io::{BufReader, Read, Seek};
use std::path::{Path, PathBuf};

use tiff::decoder::{Decoder, DecodingResult};
use tiff::tags::Tag;

use super::window::{read_all, read_window};
use super::{ChunkData, ChunkLayout, RasterInfo, RasterSource, ReadError, ReadOutcome, SampleFormat};
use crate::bbox::BoundingBox;
use crate::geotags::{self, extension_tags};
use crate::grid::{Grid, Sample};

/// A TIFF file decoded through the `tiff` crate.
///
/// The underlying handle is closed when the source is dropped.
pub struct TiffSource<R: Read + Seek> {
    name: String,
    decoder: Decoder<R>,
}

impl TiffSource<BufReader<File>> {
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self, ReadError> {
        let path = path.as_ref();
        let file = File::open(path).map_err(|source| ReadError::Open {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_reader(path.display().to_string(), BufReader::new(file))
    }
}

impl<R: Read + Seek> TiffSource<R> {
    pub fn from_reader(name: String, reader: R) -> Result<Self, ReadError> {
        let decoder = Decoder::new(reader)?;
        Ok(Self { name, decoder })
    }

    fn first_u16(&mut self, tag: Tag) -> Result<Option<u16>, ReadError> {
        let values = self.decoder.find_tag_unsigned_vec::<u16>(tag)?;
        Ok(values.and_then(|v| v.first().copied()))
    }
}

impl<R: Read + Seek> RasterSource for TiffSource<R> {
    fn name(&self) -> &str {
        &self.name
    }

    fn info(&mut self) -> Result<RasterInfo, ReadError> {
        let tags = extension_tags();
        let (width, height) = self.decoder.dimensions()?;

        let samples_per_pixel = self
            .decoder
            .find_tag_unsigned::<u16>(Tag::SamplesPerPixel)?
            .unwrap_or(1);
        let bits_per_sample = self.first_u16(Tag::BitsPerSample)?.unwrap_or(1);
        let sample_format = SampleFormat::from_code(self.first_u16(Tag::SampleFormat)?.unwrap_or(1));

        let tie_point = self
            .decoder
            .get_tag_f64_vec(tags.model_tiepoint)
            .ok()
            .and_then(|v| {
                if v.len() >= 6 {
                    Some([v[0], v[1], v[2], v[3], v[4], v[5]])
                } else {
                    None
                }
            });

        let pixel_scale = self
            .decoder
            .get_tag_f64_vec(tags.model_pixel_scale)
            .ok()
            .and_then(|v| {
                if v.len() >= 3 {
                    Some([v[0], v[1], v[2]])
                } else {
                    None
                }
            });

        let (chunk_width, chunk_height) = self.decoder.chunk_dimensions();
        let layout = if self.decoder.find_tag(Tag::TileWidth)?.is_some() {
            ChunkLayout::Tiles {
                width: chunk_width,
                length: chunk_height,
            }
        } else {
            ChunkLayout::Strips {
                rows_per_strip: chunk_height,
            }
        };

        let no_data = self.decoder.get_tag_ascii_string(tags.gdal_nodata).ok();

        let geo_keys = self
            .decoder
            .find_tag_unsigned_vec::<u16>(tags.geo_key_directory)
            .ok()
            .flatten()
            .and_then(|dir| geotags::parse_geo_keys(&dir));

        Ok(RasterInfo {
            width,
            height,
            samples_per_pixel,
            bits_per_sample,
            sample_format,
            tie_point,
            pixel_scale,
            layout,
            no_data,
            geo_keys,
        })
    }

    fn read_chunk(&mut self, index: u32) -> Result<ChunkData, ReadError> {
        match self.decoder.read_chunk(index)? {
            DecodingResult::F32(data) => Ok(ChunkData::F32(data)),
            DecodingResult::I32(data) => Ok(ChunkData::I32(data)),
            _ => Err(ReadError::Chunk {
                index,
                reason: "unexpected sample type".to_string(),
            }),
        }
    }
}

/// Reads single-band GeoTIFF files from disk.
#[derive(Debug, Clone)]
pub struct GeoTiffReader {
    pub file_name: PathBuf,
}

impl GeoTiffReader {
    pub fn new<P: Into<PathBuf>>(file_name: P) -> Self {
        extension_tags();
        Self {
            file_name: file_name.into(),
        }
    }

    pub fn info(&self) -> Result<RasterInfo, ReadError> {
        TiffSource::open(&self.file_name)?.info()
    }

    /// Loads the rows of the file that overlap `window`, reusing `existing`
    /// when its dimensions match the file.
    pub fn read_window<T: Sample>(
        &self,
        window: &BoundingBox,
        existing: Option<Grid<T>>,
    ) -> Result<ReadOutcome<T>, ReadError> {
        let mut source = TiffSource::open(&self.file_name)?;
        read_window(&mut source, window, existing)
    }

    /// Loads the whole file.
    pub fn read_all<T: Sample>(&self) -> Result<Grid<T>, ReadError> {
        let mut source = TiffSource::open(&self.file_name)?;
        read_all(&mut source)
    }
}
