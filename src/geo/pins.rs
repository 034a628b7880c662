// GeoJSON projection of geo-tagged posts for map rendering
use serde::Serialize;

use crate::db::models::Post;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FeatureCollection {
    #[serde(rename = "type")]
    pub kind: &'static str,
    pub features: Vec<Feature>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Feature {
    #[serde(rename = "type")]
    pub kind: &'static str,
    pub geometry: Geometry,
    pub properties: PinProperties,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Geometry {
    #[serde(rename = "type")]
    pub kind: &'static str,
    /// GeoJSON order: `[longitude, latitude]`
    pub coordinates: [f64; 2],
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PinProperties {
    pub id: String,
    pub title: Option<String>,
    pub body: String,
    pub author: String,
}

impl Feature {
    /// `None` for posts without both coordinates.
    pub fn from_post(post: &Post) -> Option<Self> {
        let (latitude, longitude) = post.coordinates()?;

        Some(Self {
            kind: "Feature",
            geometry: Geometry {
                kind: "Point",
                coordinates: [longitude, latitude],
            },
            properties: PinProperties {
                id: post.id.clone(),
                title: post.title.clone(),
                body: post.body.clone(),
                author: post.author_id.clone(),
            },
        })
    }
}

impl FeatureCollection {
    pub fn from_posts(posts: &[Post]) -> Self {
        Self {
            kind: "FeatureCollection",
            features: posts.iter().filter_map(Feature::from_post).collect(),
        }
    }
}
