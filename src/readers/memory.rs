//! In-memory [`RasterSource`] for tests. Records every chunk request.

use std::collections::HashSet;

use super::{ChunkData, ChunkLayout, RasterInfo, RasterSource, ReadError, SampleFormat};

pub struct MemorySource {
    info: RasterInfo,
    data: ChunkData,
    padded: bool,
    failing: HashSet<u32>,
    reads: Vec<u32>,
}

impl MemorySource {
    fn build(width: u32, height: u32, layout: ChunkLayout, data: ChunkData, format: SampleFormat) -> Self {
        assert_eq!(data.len(), (width * height) as usize);
        Self {
            info: RasterInfo {
                width,
                height,
                samples_per_pixel: 1,
                bits_per_sample: 32,
                sample_format: format,
                tie_point: None,
                pixel_scale: None,
                layout,
                no_data: None,
                geo_keys: None,
            },
            data,
            padded: false,
            failing: HashSet::new(),
            reads: Vec::new(),
        }
    }

    pub fn strips(width: u32, height: u32, rows_per_strip: u32, data: Vec<f32>) -> Self {
        Self::build(
            width,
            height,
            ChunkLayout::Strips { rows_per_strip },
            ChunkData::F32(data),
            SampleFormat::Float,
        )
    }

    /// Describes a raster without holding any of its samples. Only for
    /// reads that never reach a decode.
    pub fn header_only(width: u32, height: u32) -> Self {
        let mut source = Self::strips(0, 0, 1, Vec::new());
        source.info.width = width;
        source.info.height = height;
        source
    }

    pub fn int_strips(width: u32, height: u32, rows_per_strip: u32, data: Vec<i32>) -> Self {
        Self::build(
            width,
            height,
            ChunkLayout::Strips { rows_per_strip },
            ChunkData::I32(data),
            SampleFormat::Int,
        )
    }

    pub fn tiles(width: u32, height: u32, tile_width: u32, tile_length: u32, data: Vec<f32>) -> Self {
        Self::build(
            width,
            height,
            ChunkLayout::Tiles {
                width: tile_width,
                length: tile_length,
            },
            ChunkData::F32(data),
            SampleFormat::Float,
        )
    }

    pub fn with_origin(mut self, top: f64, left: f64, scale_x: f64, scale_y: f64) -> Self {
        self.info.tie_point = Some([0.0, 0.0, 0.0, left, top, 0.0]);
        self.info.pixel_scale = Some([scale_x, scale_y, 0.0]);
        self
    }

    pub fn with_no_data(mut self, text: &str) -> Self {
        self.info.no_data = Some(text.to_string());
        self
    }

    pub fn with_format(mut self, format: SampleFormat, bits: u16, samples: u16) -> Self {
        self.info.sample_format = format;
        self.info.bits_per_sample = bits;
        self.info.samples_per_pixel = samples;
        self
    }

    /// Edge tiles are returned at full nominal size, like libtiff does.
    pub fn padded(mut self, padded: bool) -> Self {
        self.padded = padded;
        self
    }

    pub fn failing(mut self, index: u32) -> Self {
        self.failing.insert(index);
        self
    }

    pub fn reads(&self) -> &[u32] {
        &self.reads
    }

    fn extract<T: Copy + Default>(&self, values: &[T], index: u32) -> Vec<T> {
        let width = self.info.width as usize;
        let height = self.info.height as usize;
        let (x0, y0, w, h, out_w, out_h) = match self.info.layout {
            ChunkLayout::Strips { rows_per_strip } => {
                let rps = rows_per_strip as usize;
                let y0 = index as usize * rps;
                let h = rps.min(height - y0);
                (0, y0, width, h, width, h)
            }
            ChunkLayout::Tiles {
                width: tw,
                length: tl,
            } => {
                let (tw, tl) = (tw as usize, tl as usize);
                let across = width.div_ceil(tw);
                let x0 = (index as usize % across) * tw;
                let y0 = (index as usize / across) * tl;
                let w = tw.min(width - x0);
                let h = tl.min(height - y0);
                if self.padded {
                    (x0, y0, w, h, tw, tl)
                } else {
                    (x0, y0, w, h, w, h)
                }
            }
        };

        let mut out = vec![T::default(); out_w * out_h];
        for j in 0..h {
            for i in 0..w {
                out[j * out_w + i] = values[(y0 + j) * width + x0 + i];
            }
        }
        out
    }
}

impl RasterSource for MemorySource {
    fn name(&self) -> &str {
        "memory"
    }

    fn info(&mut self) -> Result<RasterInfo, ReadError> {
        Ok(self.info.clone())
    }

    fn read_chunk(&mut self, index: u32) -> Result<ChunkData, ReadError> {
        self.reads.push(index);
        if self.failing.contains(&index) {
            return Err(ReadError::Chunk {
                index,
                reason: "corrupt".to_string(),
            });
        }
        Ok(match &self.data {
            ChunkData::F32(values) => ChunkData::F32(self.extract(values, index)),
            ChunkData::I32(values) => ChunkData::I32(self.extract(values, index)),
        })
    }
}
