//! Object detection models.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// A point expressed as a fraction of an image's width and height.
///
/// The detection API omits coordinates equal to zero, so both fields
/// default to `0.0` when absent.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize, JsonSchema)]
pub struct NormalizedVertex {
    /// Horizontal position (0.0 = left edge, 1.0 = right edge)
    #[serde(default)]
    pub x: f64,
    /// Vertical position (0.0 = top edge, 1.0 = bottom edge)
    #[serde(default)]
    pub y: f64,
}

impl NormalizedVertex {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }
}

/// Bounding polygon of a detected object.
///
/// Vertices are ordered top-left, top-right, bottom-right, bottom-left.
/// The wire format does not enforce a vertex count; crop math requires four.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct BoundingPoly {
    #[serde(default)]
    pub normalized_vertices: Vec<NormalizedVertex>,
}

impl BoundingPoly {
    /// Create a polygon from vertices.
    pub fn new(normalized_vertices: Vec<NormalizedVertex>) -> Self {
        Self {
            normalized_vertices,
        }
    }

    /// Axis-aligned rectangle from its top-left and bottom-right corners.
    pub fn from_corners(left: f64, top: f64, right: f64, bottom: f64) -> Self {
        Self::new(vec![
            NormalizedVertex::new(left, top),
            NormalizedVertex::new(right, top),
            NormalizedVertex::new(right, bottom),
            NormalizedVertex::new(left, bottom),
        ])
    }

    /// Horizontal position of the top-left vertex, if any.
    pub fn left_edge(&self) -> Option<f64> {
        self.normalized_vertices.first().map(|v| v.x)
    }

    /// Comma-joined `x,y` pairs, as accepted by the visual search `crop` parameter.
    pub fn crop_param(&self) -> String {
        self.normalized_vertices
            .iter()
            .flat_map(|v| [v.x, v.y])
            .map(|c| c.to_string())
            .collect::<Vec<_>>()
            .join(",")
    }
}

/// An object found by the remote detection service.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct DetectedObject {
    /// Opaque knowledge-graph id
    #[serde(rename = "mid", default)]
    pub id: String,

    /// Human readable label, e.g. "Shirt"
    #[serde(rename = "name", default)]
    pub label: String,

    /// Detection confidence
    #[serde(default)]
    pub score: f64,

    /// Normalized bounding polygon
    #[serde(rename = "boundingPoly", default)]
    pub bounding_poly: BoundingPoly,
}

impl DetectedObject {
    pub fn new(id: impl Into<String>, label: impl Into<String>, score: f64, bounding_poly: BoundingPoly) -> Self {
        Self {
            id: id.into(),
            label: label.into(),
            score,
            bounding_poly,
        }
    }
}

/// Drop detections whose top-left x matches an earlier detection.
///
/// This is a coarse positional filter, not an overlap test: two different
/// objects that start at the same horizontal offset collapse into the first
/// one, and near-duplicates with slightly different offsets both survive.
/// Detections without vertices are always kept.
pub fn dedup_by_left_edge(objects: Vec<DetectedObject>) -> Vec<DetectedObject> {
    let mut seen: Vec<f64> = Vec::with_capacity(objects.len());

    objects
        .into_iter()
        .filter(|object| match object.bounding_poly.left_edge() {
            Some(x) if seen.contains(&x) => false,
            Some(x) => {
                seen.push(x);
                true
            }
            None => true,
        })
        .collect()
}
