use chrono::NaiveDateTime;

use serde::Deserialize;
use serde::Deserializer;
use serde::de::Error;

use std::fs::File;
use std::io::BufReader;
use std::path::{Path, PathBuf};

use crate::bbox::BoundingBox;
use crate::utils;
use crate::writers::Provenance;

pub mod error;
pub use error::ConfigError;

/// Settings for a sampling run.
#[derive(Debug, Clone)]
pub struct Config {
    points: PathBuf,
    rasters: Vec<String>,
    bbox: Option<BoundingBox>,
    output: Option<PathBuf>,
    provenance: Provenance,
}

/// Accepts `2024-03-09 14:05:00` and `2024-03-09T14:05:00`.
pub fn parse_datetime(text: &str) -> Result<NaiveDateTime, chrono::ParseError> {
    NaiveDateTime::parse_from_str(text, "%Y-%m-%d %H:%M:%S")
        .or_else(|_| NaiveDateTime::parse_from_str(text, "%Y-%m-%dT%H:%M:%S"))
}

// Validates the bbox, the raster list and the provenance datetime while
// deserializing.
impl<'de> Deserialize<'de> for Config {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        #[derive(Deserialize)]
        struct ConfigHelper {
            points: PathBuf,
            rasters: Vec<String>,
            bbox: Option<BboxHelper>,
            output: Option<PathBuf>,
            provenance: Option<ProvenanceHelper>,
        }

        #[derive(Deserialize)]
        struct BboxHelper {
            top: f64,
            bottom: f64,
            left: f64,
            right: f64,
        }

        #[derive(Deserialize)]
        struct ProvenanceHelper {
            artist: Option<String>,
            datetime: Option<String>,
            copyright: Option<String>,
        }

        let helper = ConfigHelper::deserialize(deserializer)?;

        if helper.rasters.is_empty() {
            return Err(D::Error::custom(ConfigError::NoRasters));
        }

        let bbox = if let Some(b) = helper.bbox {
            Some(
                BoundingBox::checked(b.top, b.bottom, b.left, b.right)
                    .map_err(|e| D::Error::custom(ConfigError::from(e)))?,
            )
        } else {
            None
        };

        let provenance = match helper.provenance {
            Some(p) => Provenance {
                artist: p.artist,
                datetime: p
                    .datetime
                    .as_deref()
                    .map(parse_datetime)
                    .transpose()
                    .map_err(|e| D::Error::custom(ConfigError::from(e)))?,
                copyright: p.copyright,
            },
            None => Provenance::default(),
        };

        Ok(Config {
            points: helper.points,
            rasters: helper.rasters,
            bbox,
            output: helper.output,
            provenance,
        })
    }
}

impl Config {
    pub fn new(points: PathBuf, rasters: Vec<String>) -> Self {
        Self {
            points,
            rasters,
            bbox: None,
            output: None,
            provenance: Provenance::default(),
        }
    }

    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Config, ConfigError> {
        let file = File::open(path)?;
        let reader = BufReader::new(file);

        let config: Config = serde_json::from_reader(reader)?;

        Ok(config)
    }

    pub fn points(&self) -> &Path {
        &self.points
    }

    pub fn rasters(&self) -> &[String] {
        &self.rasters
    }

    /// Raster entries expanded into files: directories are walked and glob
    /// patterns matched.
    pub fn raster_paths(&self) -> Result<Vec<PathBuf>, ConfigError> {
        let paths = utils::expand_raster_paths(&self.rasters)?;
        if paths.is_empty() {
            return Err(ConfigError::NoRasters);
        }
        Ok(paths)
    }

    pub fn bbox(&self) -> Option<&BoundingBox> {
        self.bbox.as_ref()
    }

    pub fn output(&self) -> Option<&Path> {
        self.output.as_deref()
    }

    pub fn provenance(&self) -> &Provenance {
        &self.provenance
    }

    pub fn with_output(mut self, output: Option<PathBuf>) -> Self {
        if output.is_some() {
            self.output = output;
        }
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use std::fs::File;
    use std::io::Write;
    use tempfile::tempdir;

    fn write_config(contents: &str) -> (tempfile::TempDir, PathBuf) {
        let dir = tempdir().unwrap();
        let file_path = dir.path().join("config.json");
        let mut file = File::create(&file_path).unwrap();
        file.write_all(contents.as_bytes()).unwrap();
        (dir, file_path)
    }

    #[test]
    fn test_from_file() {
        let (_dir, path) = write_config(
            r#"
    {
        "points": "points.csv",
        "rasters": ["dem/*.tif", "extra.tif"],
        "bbox": { "top": 46.5, "bottom": 45.0, "left": -72.0, "right": -70.5 },
        "output": "values.txt",
        "provenance": {
            "artist": "Survey team",
            "datetime": "2024-03-09 14:05:00"
        }
    }
    "#,
        );

        let config = Config::from_file(path).unwrap();

        assert_eq!(config.points(), Path::new("points.csv"));
        assert_eq!(config.rasters(), ["dem/*.tif", "extra.tif"]);
        assert_eq!(
            config.bbox(),
            Some(&BoundingBox::new(46.5, 45.0, -72.0, -70.5))
        );
        assert_eq!(config.output(), Some(Path::new("values.txt")));
        assert_eq!(config.provenance().artist.as_deref(), Some("Survey team"));
        assert_eq!(
            config.provenance().datetime,
            NaiveDate::from_ymd_opt(2024, 3, 9)
                .expect("Invalid date")
                .and_hms_opt(14, 5, 0)
        );
        assert_eq!(config.provenance().copyright, None);
    }

    #[test]
    fn test_invalid_bbox_is_rejected() {
        let (_dir, path) = write_config(
            r#"{ "points": "p.csv", "rasters": ["a.tif"],
                 "bbox": { "top": 10.0, "bottom": 20.0, "left": 0.0, "right": 1.0 } }"#,
        );
        let err = Config::from_file(path).unwrap_err();
        assert!(matches!(err, ConfigError::Json(_)));
        assert!(err.to_string().contains("Invalid bbox"));
    }

    #[test]
    fn test_empty_rasters_are_rejected() {
        let (_dir, path) = write_config(r#"{ "points": "p.csv", "rasters": [] }"#);
        let err = Config::from_file(path).unwrap_err();
        assert!(err.to_string().contains("No rasters configured"));
    }

    #[test]
    fn test_bad_datetime_is_rejected() {
        let (_dir, path) = write_config(
            r#"{ "points": "p.csv", "rasters": ["a.tif"],
                 "provenance": { "datetime": "yesterday" } }"#,
        );
        let err = Config::from_file(path).unwrap_err();
        assert!(err.to_string().contains("Failed to parse datetime"));
    }

    #[test]
    fn test_parse_datetime_formats() {
        let expected = NaiveDate::from_ymd_opt(2023, 1, 2)
            .unwrap()
            .and_hms_opt(3, 4, 5)
            .unwrap();
        assert_eq!(parse_datetime("2023-01-02 03:04:05").unwrap(), expected);
        assert_eq!(parse_datetime("2023-01-02T03:04:05").unwrap(), expected);
        assert!(parse_datetime("2023/01/02").is_err());
    }

    #[test]
    fn test_missing_file() {
        let err = Config::from_file("/no/such/config.json").unwrap_err();
        assert!(matches!(err, ConfigError::Io(_)));
    }
}
