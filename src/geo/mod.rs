pub mod pins;
pub mod proximity;

pub use pins::{Feature, FeatureCollection};
pub use proximity::{filter_nearby, planar_distance, GeoError, ProximityQuery};
