use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;

use log::{info, warn};
use thiserror::Error;

use crate::bbox::{BboxError, BoundingBox};

#[derive(Debug, Error)]
pub enum PointsError {
    #[error("Failed to open {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("Failed to read points: {0}")]
    Read(#[from] std::io::Error),
}

/// A named location to sample.
#[derive(Debug, Clone, PartialEq)]
pub struct Point {
    pub name: String,
    pub lat: f64,
    pub lon: f64,
}

/// Reads `name;lat;lon` lines from a file.
pub fn read_points<P: AsRef<Path>>(path: P) -> Result<Vec<Point>, PointsError> {
    let path = path.as_ref();
    let file = File::open(path).map_err(|source| PointsError::Io {
        path: path.display().to_string(),
        source,
    })?;
    let points = parse_points(BufReader::new(file))?;
    info!("Read in {} points", points.len());
    Ok(points)
}

/// Parses `name;lat;lon` lines. Blank lines are ignored and malformed ones
/// are skipped with a warning.
pub fn parse_points<R: BufRead>(reader: R) -> Result<Vec<Point>, PointsError> {
    let mut points = Vec::new();
    for (number, line) in reader.lines().enumerate() {
        let line = line?;
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        match parse_line(line) {
            Some(point) => points.push(point),
            None => warn!("skipping malformed point on line {}: {line:?}", number + 1),
        }
    }
    Ok(points)
}

fn parse_line(line: &str) -> Option<Point> {
    let mut fields = line.splitn(3, ';');
    let name = fields.next()?.trim();
    let lat = fields.next()?.trim().parse::<f64>().ok()?;
    let lon = fields.next()?.trim().parse::<f64>().ok()?;
    if name.is_empty() || !lat.is_finite() || !lon.is_finite() {
        return None;
    }
    Some(Point {
        name: name.to_string(),
        lat,
        lon,
    })
}

/// Window enclosing every point.
pub fn points_window(points: &[Point]) -> Result<BoundingBox, BboxError> {
    BoundingBox::enclosing(points.iter().map(|p| (p.lat, p.lon)))
}
