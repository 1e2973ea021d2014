//! Core annotation model.
//!
//! A [`LabelFile`] is the per-image record produced by the annotation
//! editor; each of its [`Shape`]s is one vector annotation. Shapes are
//! read-only for the duration of an export.

use serde::{Deserialize, Deserializer, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// A 2D point in continuous image coordinates.
///
/// Serialized as a `[x, y]` pair, the way label files store points.
#[derive(Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(from = "[f64; 2]", into = "[f64; 2]")]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

impl Point {
    /// Creates a new point.
    #[inline]
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    /// Returns true if both coordinates are finite (not NaN or infinite).
    #[inline]
    pub fn is_finite(&self) -> bool {
        self.x.is_finite() && self.y.is_finite()
    }

    /// Euclidean distance to another point.
    #[inline]
    pub fn distance(&self, other: &Point) -> f64 {
        (self.x - other.x).hypot(self.y - other.y)
    }
}

impl fmt::Debug for Point {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {})", self.x, self.y)
    }
}

impl From<[f64; 2]> for Point {
    fn from([x, y]: [f64; 2]) -> Self {
        Self { x, y }
    }
}

impl From<Point> for [f64; 2] {
    fn from(p: Point) -> Self {
        [p.x, p.y]
    }
}

impl From<(f64, f64)> for Point {
    fn from((x, y): (f64, f64)) -> Self {
        Self { x, y }
    }
}

/// The geometry tag of a shape.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ShapeKind {
    #[default]
    Polygon,
    Rectangle,
    Circle,
    Line,
    Point,
    #[serde(rename = "linestrip")]
    LineStrip,
}

impl ShapeKind {
    /// Name as written in label files.
    pub fn name(&self) -> &'static str {
        match self {
            ShapeKind::Polygon => "polygon",
            ShapeKind::Rectangle => "rectangle",
            ShapeKind::Circle => "circle",
            ShapeKind::Line => "line",
            ShapeKind::Point => "point",
            ShapeKind::LineStrip => "linestrip",
        }
    }

    /// Whether the shape encloses an area that can back a segmentation mask.
    ///
    /// Lines and points only trace thin masks, adequate for bounding boxes.
    pub fn has_area(&self) -> bool {
        !matches!(self, ShapeKind::Line | ShapeKind::Point)
    }
}

impl fmt::Display for ShapeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// One vector annotation record.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Shape {
    pub label: String,

    #[serde(default, deserialize_with = "null_as_default")]
    pub shape_type: ShapeKind,

    pub points: Vec<Point>,

    #[serde(default)]
    pub group_id: Option<i64>,

    #[serde(default, deserialize_with = "null_as_default")]
    pub flags: BTreeMap<String, bool>,

    /// Keys the exporter does not interpret, passed through untouched.
    #[serde(flatten)]
    pub other_data: serde_json::Map<String, serde_json::Value>,
}

impl Shape {
    /// Creates a shape with no group, flags or extra data.
    pub fn new(label: impl Into<String>, shape_type: ShapeKind, points: Vec<Point>) -> Self {
        Self {
            label: label.into(),
            shape_type,
            points,
            group_id: None,
            flags: BTreeMap::new(),
            other_data: serde_json::Map::new(),
        }
    }

    /// Convenience constructor for a two-corner rectangle.
    pub fn rectangle(label: impl Into<String>, a: (f64, f64), b: (f64, f64)) -> Self {
        Self::new(label, ShapeKind::Rectangle, vec![a.into(), b.into()])
    }

    /// Convenience constructor for a polygon.
    pub fn polygon(label: impl Into<String>, points: &[(f64, f64)]) -> Self {
        Self::new(
            label,
            ShapeKind::Polygon,
            points.iter().copied().map(Point::from).collect(),
        )
    }

    /// Sets the group id, returning the shape.
    pub fn with_group(mut self, group_id: i64) -> Self {
        self.group_id = Some(group_id);
        self
    }
}

/// The per-image label record written by the annotation editor.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LabelFile {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,

    #[serde(default, deserialize_with = "null_as_default")]
    pub flags: BTreeMap<String, bool>,

    /// Older files call this array `annotations`.
    #[serde(default, alias = "annotations", deserialize_with = "null_as_default")]
    pub shapes: Vec<Shape>,

    /// Image path relative to the label file.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image_path: Option<String>,

    /// Base64-encoded image bytes embedded in the label file.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image_data: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image_height: Option<u32>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image_width: Option<u32>,
}

fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn shape_parses_label_file_record() {
        let json = r#"{
            "label": "car",
            "points": [[10, 10], [50, 50.5]],
            "group_id": null,
            "shape_type": "rectangle",
            "flags": {},
            "description": "parked"
        }"#;
        let shape: Shape = serde_json::from_str(json).expect("parse shape");
        assert_eq!(shape.label, "car");
        assert_eq!(shape.shape_type, ShapeKind::Rectangle);
        assert_eq!(shape.points, vec![Point::new(10.0, 10.0), Point::new(50.0, 50.5)]);
        assert_eq!(shape.group_id, None);
        assert_eq!(
            shape.other_data.get("description"),
            Some(&serde_json::Value::String("parked".to_string()))
        );
    }

    #[test]
    fn shape_type_defaults_to_polygon() {
        let shape: Shape =
            serde_json::from_str(r#"{"label":"a","points":[[0,0],[1,0],[1,1]],"flags":null}"#)
                .expect("parse shape");
        assert_eq!(shape.shape_type, ShapeKind::Polygon);
        assert!(shape.flags.is_empty());
    }

    #[test]
    fn linestrip_uses_label_file_spelling() {
        let kind: ShapeKind = serde_json::from_str("\"linestrip\"").expect("parse kind");
        assert_eq!(kind, ShapeKind::LineStrip);
        assert_eq!(
            serde_json::to_string(&ShapeKind::LineStrip).expect("serialize kind"),
            "\"linestrip\""
        );
    }

    #[test]
    fn label_file_accepts_annotations_alias() {
        let json = r#"{"annotations":[{"label":"a","points":[[1,2]],"shape_type":"point"}],"imagePath":"a.png"}"#;
        let file: LabelFile = serde_json::from_str(json).expect("parse label file");
        assert_eq!(file.shapes.len(), 1);
        assert_eq!(file.image_path.as_deref(), Some("a.png"));
    }

    #[test]
    fn shape_round_trips_other_data() {
        let mut shape = Shape::rectangle("car", (1.0, 2.0), (3.0, 4.0)).with_group(7);
        shape
            .other_data
            .insert("score".to_string(), serde_json::json!(0.5));
        let json = serde_json::to_string(&shape).expect("serialize shape");
        let restored: Shape = serde_json::from_str(&json).expect("parse shape");
        assert_eq!(restored, shape);
    }

    #[test]
    fn area_bearing_kinds() {
        assert!(ShapeKind::Polygon.has_area());
        assert!(ShapeKind::LineStrip.has_area());
        assert!(!ShapeKind::Line.has_area());
        assert!(!ShapeKind::Point.has_area());
    }
}
