//! GeoTIFF and GDAL tag ids and GeoKey directory helpers.

use std::sync::OnceLock;

use tiff::tags::Tag;

use crate::grid::GeoKeys;

pub const TAG_MODEL_PIXEL_SCALE: u16 = 33550;
pub const TAG_MODEL_TIEPOINT: u16 = 33922;
pub const TAG_GEO_KEY_DIRECTORY: u16 = 34735;
pub const TAG_GDAL_METADATA: u16 = 42112;
pub const TAG_GDAL_NODATA: u16 = 42113;

pub const GT_MODEL_TYPE_GEO_KEY: u16 = 1024;
pub const GT_RASTER_TYPE_GEO_KEY: u16 = 1025;
pub const GEOGRAPHIC_TYPE_GEO_KEY: u16 = 2048;
pub const GEOG_GEODETIC_DATUM_GEO_KEY: u16 = 2050;
pub const GEOG_ANGULAR_UNITS_GEO_KEY: u16 = 2054;

pub const RASTER_PIXEL_IS_AREA: u16 = 1;
pub const ANGULAR_DEGREE: u16 = 9102;

/// Tag handles for the GeoTIFF and GDAL extension tags.
///
/// The decoder keys its directory by the canonical [`Tag`] for each code,
/// so lookups must use `Tag::from_u16_exhaustive` rather than
/// `Tag::Unknown`.
#[derive(Debug)]
pub struct ExtensionTags {
    pub model_pixel_scale: Tag,
    pub model_tiepoint: Tag,
    pub geo_key_directory: Tag,
    pub gdal_metadata: Tag,
    pub gdal_nodata: Tag,
}

static EXTENSION_TAGS: OnceLock<ExtensionTags> = OnceLock::new();

/// Resolves the extension tags on first use. Called by reader and writer
/// construction.
pub fn extension_tags() -> &'static ExtensionTags {
    EXTENSION_TAGS.get_or_init(|| {
        log::debug!("registering GeoTIFF/GDAL extension tags");
        ExtensionTags {
            model_pixel_scale: Tag::from_u16_exhaustive(TAG_MODEL_PIXEL_SCALE),
            model_tiepoint: Tag::from_u16_exhaustive(TAG_MODEL_TIEPOINT),
            geo_key_directory: Tag::from_u16_exhaustive(TAG_GEO_KEY_DIRECTORY),
            gdal_metadata: Tag::from_u16_exhaustive(TAG_GDAL_METADATA),
            gdal_nodata: Tag::from_u16_exhaustive(TAG_GDAL_NODATA),
        }
    })
}

/// Extracts the coordinate reference keys from a GeoKey directory.
///
/// Only keys stored inline (TIFFTagLocation 0) are read. Returns `None` for
/// an empty or malformed directory; absent individual keys fall back to the
/// WGS84 defaults.
pub fn parse_geo_keys(directory: &[u16]) -> Option<GeoKeys> {
    if directory.len() < 4 {
        return None;
    }
    let count = directory[3] as usize;
    let entries = directory.get(4..4 + count * 4)?;

    let mut keys = GeoKeys::default();
    for entry in entries.chunks_exact(4) {
        let (key, location, value) = (entry[0], entry[1], entry[3]);
        if location != 0 {
            continue;
        }
        match key {
            GT_MODEL_TYPE_GEO_KEY => keys.model_type = value,
            GEOGRAPHIC_TYPE_GEO_KEY => keys.geographic_type = value,
            GEOG_GEODETIC_DATUM_GEO_KEY => keys.geodetic_datum = value,
            _ => {}
        }
    }
    Some(keys)
}

/// Builds a GeoKey directory for `keys`, always PixelIsArea with degree
/// angular units. Keys are emitted in ascending id order.
pub fn geo_key_directory(keys: &GeoKeys) -> Vec<u16> {
    let entries = [
        (GT_MODEL_TYPE_GEO_KEY, keys.model_type),
        (GT_RASTER_TYPE_GEO_KEY, RASTER_PIXEL_IS_AREA),
        (GEOGRAPHIC_TYPE_GEO_KEY, keys.geographic_type),
        (GEOG_GEODETIC_DATUM_GEO_KEY, keys.geodetic_datum),
        (GEOG_ANGULAR_UNITS_GEO_KEY, ANGULAR_DEGREE),
    ];

    // KeyDirectoryVersion, KeyRevision, MinorRevision, NumberOfKeys
    let mut directory = vec![1, 1, 0, entries.len() as u16];
    for (key, value) in entries {
        directory.extend_from_slice(&[key, 0, 1, value]);
    }
    directory
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_geo_key_directory_round_trip() {
        let keys = GeoKeys {
            model_type: 2,
            geographic_type: 4269,
            geodetic_datum: 6269,
        };
        let directory = geo_key_directory(&keys);
        assert_eq!(&directory[..4], &[1, 1, 0, 5]);
        assert_eq!(directory.len(), 4 + 5 * 4);
        assert_eq!(parse_geo_keys(&directory), Some(keys));
    }

    #[test]
    fn test_geo_keys_skip_offset_entries() {
        // GeographicType stored in GeoDoubleParams (location != 0) is ignored.
        let directory = [1, 1, 0, 2, 1024, 0, 1, 1, 2048, 34736, 1, 0];
        let keys = parse_geo_keys(&directory).unwrap();
        assert_eq!(keys.model_type, 1);
        assert_eq!(keys.geographic_type, GeoKeys::default().geographic_type);
    }

    #[test]
    fn test_truncated_directory() {
        assert_eq!(parse_geo_keys(&[1, 1, 0]), None);
        assert_eq!(parse_geo_keys(&[1, 1, 0, 2, 1024, 0, 1, 2]), None);
    }

    #[test]
    fn test_extension_tags_are_stable() {
        let first = extension_tags() as *const ExtensionTags;
        let second = extension_tags() as *const ExtensionTags;
        assert_eq!(first, second);
        assert_eq!(extension_tags().gdal_nodata.to_u16(), TAG_GDAL_NODATA);
    }
}
