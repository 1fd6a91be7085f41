use std::fmt::{Debug, Display};

use crate::readers::{ChunkData, SampleFormat};

/// A cell value type a [`Grid`](super::Grid) can hold.
///
/// Only single-band 32-bit samples are supported: `f32` for elevation style
/// data and `i32` for classified/integer data.
pub trait Sample: Copy + Default + Debug + Display + PartialOrd + 'static {
    /// TIFF `SampleFormat` a source must declare to be decoded as `Self`.
    const FORMAT: SampleFormat;
    const BITS: u16 = 32;

    /// Sentinel used when a source carries no nodata tag.
    fn implicit_no_data() -> Option<Self>;

    /// Parses the GDAL nodata tag text.
    fn parse_no_data(text: &str) -> Option<Self>;

    /// Canonical nodata test. Never relies on `==` against NaN.
    fn is_no_data(self, sentinel: Self) -> bool;

    /// Extracts samples of this type from a decoded chunk.
    fn from_chunk(chunk: ChunkData) -> Option<Vec<Self>>;
}

/// GDAL writes the nodata tag as free text, optionally NUL terminated.
fn clean(text: &str) -> &str {
    text.trim_matches(|c: char| c == '\0' || c.is_whitespace())
}

impl Sample for f32 {
    const FORMAT: SampleFormat = SampleFormat::Float;

    fn implicit_no_data() -> Option<Self> {
        Some(f32::NAN)
    }

    fn parse_no_data(text: &str) -> Option<Self> {
        clean(text).parse::<f64>().ok().map(|v| v as f32)
    }

    fn is_no_data(self, sentinel: Self) -> bool {
        if sentinel.is_nan() {
            self.is_nan()
        } else {
            self.to_bits() == sentinel.to_bits() || self == sentinel
        }
    }

    fn from_chunk(chunk: ChunkData) -> Option<Vec<Self>> {
        match chunk {
            ChunkData::F32(data) => Some(data),
            ChunkData::I32(_) => None,
        }
    }
}

impl Sample for i32 {
    const FORMAT: SampleFormat = SampleFormat::Int;

    fn implicit_no_data() -> Option<Self> {
        None
    }

    fn parse_no_data(text: &str) -> Option<Self> {
        let text = clean(text);
        if let Ok(v) = text.parse::<i32>() {
            return Some(v);
        }
        // "-9999.0" style values written by float-minded tools.
        let v = text.parse::<f64>().ok()?;
        if v.fract() == 0.0 && v >= f64::from(i32::MIN) && v <= f64::from(i32::MAX) {
            Some(v as i32)
        } else {
            None
        }
    }

    fn is_no_data(self, sentinel: Self) -> bool {
        self == sentinel
    }

    fn from_chunk(chunk: ChunkData) -> Option<Vec<Self>> {
        match chunk {
            ChunkData::I32(data) => Some(data),
            ChunkData::F32(_) => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_nan_sentinel_detected_without_equality() {
        let sentinel = f32::NAN;
        assert!(f32::NAN.is_no_data(sentinel));
        assert!((-f32::NAN).is_no_data(sentinel));
        assert!(!0.0f32.is_no_data(sentinel));
        assert!(!(-9999.0f32).is_no_data(sentinel));
    }

    #[test]
    fn test_finite_sentinel() {
        assert!((-9999.0f32).is_no_data(-9999.0));
        assert!(!(-9998.0f32).is_no_data(-9999.0));
        assert!(!f32::NAN.is_no_data(-9999.0));
        assert!(7i32.is_no_data(7));
        assert!(!8i32.is_no_data(7));
    }

    #[test]
    fn test_parse_no_data_text() {
        assert_eq!(f32::parse_no_data("-9999.000000"), Some(-9999.0));
        assert_eq!(f32::parse_no_data(" -32768\0"), Some(-32768.0));
        assert!(f32::parse_no_data("nan").unwrap().is_nan());
        assert!(f32::parse_no_data("NaN").unwrap().is_nan());
        assert_eq!(f32::parse_no_data("abc"), None);

        assert_eq!(i32::parse_no_data("-9999"), Some(-9999));
        assert_eq!(i32::parse_no_data("-9999.0"), Some(-9999));
        assert_eq!(i32::parse_no_data("0.5"), None);
        assert_eq!(i32::parse_no_data("nan"), None);
    }

    #[test]
    fn test_implicit_no_data() {
        assert!(f32::implicit_no_data().unwrap().is_nan());
        assert_eq!(i32::implicit_no_data(), None);
    }
}
