use serde::Deserialize;
use thiserror::Error;

#[derive(Debug, Error, PartialEq)]
pub enum BboxError {
    #[error("Longitude values must be between -180 and 180")]
    Longitude,
    #[error("Latitude values must be between -90 and 90")]
    Latitude,
    #[error("Bottom must be <= top and left must be <= right")]
    Order,
    #[error("Cannot build a bounding box from zero points")]
    Empty,
}

/// Axis-aligned geographic rectangle in degrees.
///
/// `top`/`bottom` are latitudes, `left`/`right` are longitudes. No
/// normalization is applied by [`BoundingBox::new`]; keeping
/// `top >= bottom` and `right >= left` is up to the caller.
#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
pub struct BoundingBox {
    pub top: f64,
    pub bottom: f64,
    pub left: f64,
    pub right: f64,
}

impl BoundingBox {
    pub fn new(top: f64, bottom: f64, left: f64, right: f64) -> Self {
        Self {
            top,
            bottom,
            left,
            right,
        }
    }

    /// Like [`BoundingBox::new`] but rejects coordinates outside the
    /// geographic ranges or with inverted edges.
    pub fn checked(top: f64, bottom: f64, left: f64, right: f64) -> Result<Self, BboxError> {
        if !(-180.0..=180.0).contains(&left) || !(-180.0..=180.0).contains(&right) {
            return Err(BboxError::Longitude);
        }

        if !(-90.0..=90.0).contains(&bottom) || !(-90.0..=90.0).contains(&top) {
            return Err(BboxError::Latitude);
        }

        if bottom > top || left > right {
            return Err(BboxError::Order);
        }

        Ok(Self::new(top, bottom, left, right))
    }

    /// Smallest box enclosing every `(lat, lon)` pair.
    pub fn enclosing<I>(points: I) -> Result<Self, BboxError>
    where
        I: IntoIterator<Item = (f64, f64)>,
    {
        let mut points = points.into_iter().peekable();
        if points.peek().is_none() {
            return Err(BboxError::Empty);
        }

        let mut bbox = Self::new(-90.0, 90.0, 180.0, -180.0);
        for (lat, lon) in points {
            bbox.top = bbox.top.max(lat);
            bbox.bottom = bbox.bottom.min(lat);
            bbox.left = bbox.left.min(lon);
            bbox.right = bbox.right.max(lon);
        }

        Ok(bbox)
    }

    /// Strict overlap test: boxes that only share an edge or a corner do
    /// not intersect.
    pub fn intersects(&self, other: &BoundingBox) -> bool {
        self.left < other.right
            && self.right > other.left
            && self.bottom < other.top
            && self.top > other.bottom
    }

    pub fn contains(&self, lon: f64, lat: f64) -> bool {
        (self.left..=self.right).contains(&lon) && (self.bottom..=self.top).contains(&lat)
    }
}

#[cfg(test)]
mod test {
    use crate::bbox::{BboxError, BoundingBox};

    #[test]
    fn test_bbox_coords_are_within_ranges() {
        let valid_bbox = BoundingBox::checked(73.3, 70.9, -67.2, -58.7);
        assert!(valid_bbox.is_ok());

        let invalid_lon = BoundingBox::checked(10.0, 0.0, -200.0, 0.0);
        assert_eq!(invalid_lon, Err(BboxError::Longitude));

        let invalid_lon2 = BoundingBox::checked(10.0, 0.0, 0.0, 200.0);
        assert_eq!(invalid_lon2, Err(BboxError::Longitude));

        let invalid_lat = BoundingBox::checked(0.0, -100.0, 0.0, 10.0);
        assert_eq!(invalid_lat, Err(BboxError::Latitude));

        let invalid_lat2 = BoundingBox::checked(100.0, 0.0, 0.0, 10.0);
        assert_eq!(invalid_lat2, Err(BboxError::Latitude));

        let inverted_lon = BoundingBox::checked(10.0, 0.0, 10.0, 0.0);
        assert_eq!(inverted_lon, Err(BboxError::Order));

        let inverted_lat = BoundingBox::checked(0.0, 10.0, 0.0, 10.0);
        assert_eq!(inverted_lat, Err(BboxError::Order));
    }

    #[test]
    fn test_overlapping_boxes_intersect() {
        let a = BoundingBox::new(10.0, 0.0, 0.0, 10.0);
        let b = BoundingBox::new(15.0, 5.0, 5.0, 15.0);
        assert!(a.intersects(&b));
        assert!(b.intersects(&a));

        let inner = BoundingBox::new(6.0, 4.0, 4.0, 6.0);
        assert!(a.intersects(&inner));
        assert!(inner.intersects(&a));
    }

    #[test]
    fn test_shared_edges_do_not_intersect() {
        let a = BoundingBox::new(10.0, 0.0, 0.0, 10.0);

        let east = BoundingBox::new(10.0, 0.0, 10.0, 20.0);
        assert!(!a.intersects(&east));
        assert!(!east.intersects(&a));

        let south = BoundingBox::new(0.0, -10.0, 0.0, 10.0);
        assert!(!a.intersects(&south));

        let corner = BoundingBox::new(20.0, 10.0, 10.0, 20.0);
        assert!(!a.intersects(&corner));

        let far = BoundingBox::new(50.0, 40.0, 40.0, 50.0);
        assert!(!a.intersects(&far));
    }

    #[test]
    fn test_enclosing_points() {
        let bbox = BoundingBox::enclosing([(45.5, -73.6), (46.8, -71.2), (45.0, -72.0)]).unwrap();
        assert_eq!(bbox, BoundingBox::new(46.8, 45.0, -73.6, -71.2));

        let single = BoundingBox::enclosing([(1.0, 2.0)]).unwrap();
        assert_eq!(single, BoundingBox::new(1.0, 1.0, 2.0, 2.0));

        let none: [(f64, f64); 0] = [];
        assert_eq!(BoundingBox::enclosing(none), Err(BboxError::Empty));
    }

    #[test]
    fn test_contains_is_inclusive() {
        let bbox = BoundingBox::new(10.0, 0.0, 0.0, 10.0);
        assert!(bbox.contains(0.0, 10.0));
        assert!(bbox.contains(5.0, 5.0));
        assert!(!bbox.contains(10.5, 5.0));
    }
}
