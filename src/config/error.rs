use thiserror::Error;

use crate::bbox::BboxError;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Failed to parse JSON: {0}")]
    Json(#[from] serde_json::Error),
    #[error("Invalid bbox: {0}")]
    Bbox(#[from] BboxError),
    #[error("Failed to parse datetime: {0}")]
    DateParse(#[from] chrono::ParseError),
    #[error("Invalid raster pattern: {0}")]
    Pattern(#[from] glob::PatternError),
    #[error("No rasters configured")]
    NoRasters,
}
