use thiserror::Error;

use crate::db::models::Post;

#[derive(Debug, Error, PartialEq)]
pub enum GeoError {
    #[error("latitude and longitude must be finite numbers")]
    InvalidCoordinate,

    #[error("distance must be a finite, non-negative number")]
    InvalidDistance,
}

/// A validated "posts near this point" query.
///
/// Distances are planar: Euclidean distance measured directly in degrees of
/// latitude/longitude. This ignores the curvature of the earth and the
/// shrinking of longitude degrees away from the equator.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ProximityQuery {
    latitude: f64,
    longitude: f64,
    distance: f64,
}

impl ProximityQuery {
    pub fn new(latitude: f64, longitude: f64, distance: f64) -> Result<Self, GeoError> {
        if !latitude.is_finite() || !longitude.is_finite() {
            return Err(GeoError::InvalidCoordinate);
        }
        if !distance.is_finite() || distance < 0.0 {
            return Err(GeoError::InvalidDistance);
        }

        Ok(Self {
            latitude,
            longitude,
            distance,
        })
    }

    pub fn distance_to(&self, latitude: f64, longitude: f64) -> f64 {
        planar_distance((self.latitude, self.longitude), (latitude, longitude))
    }

    /// True when the post has both coordinates and lies within range.
    pub fn contains(&self, post: &Post) -> bool {
        match post.coordinates() {
            Some((lat, lon)) => self.distance_to(lat, lon) <= self.distance,
            None => false,
        }
    }
}

/// Euclidean distance; `hypot` keeps large finite inputs from overflowing.
pub fn planar_distance(a: (f64, f64), b: (f64, f64)) -> f64 {
    (a.0 - b.0).hypot(a.1 - b.1)
}

/// Full scan over `posts`, keeping input order.
pub fn filter_nearby(posts: Vec<Post>, query: &ProximityQuery) -> Vec<Post> {
    posts.into_iter().filter(|p| query.contains(p)).collect()
}
