//! Bounding box types.
//!
//! [`BBoxXYXY`] holds continuous image coordinates as drawn by the annotator.
//! [`PixelBox`] holds the tight integer extent of a rasterized mask.

use serde::{Deserialize, Serialize};

use super::model::Point;

/// An axis-aligned bounding box in XYXY format (xmin, ymin, xmax, ymax).
///
/// This type does NOT enforce that min <= max in [`BBoxXYXY::from_xyxy`];
/// use [`BBoxXYXY::from_corners`] to get a normalized box from two
/// arbitrary rectangle corners.
#[derive(Clone, Copy, PartialEq)]
pub struct BBoxXYXY {
    pub min: Point,
    pub max: Point,
}

impl BBoxXYXY {
    /// Creates a new bounding box from explicit coordinates.
    #[inline]
    pub fn from_xyxy(xmin: f64, ymin: f64, xmax: f64, ymax: f64) -> Self {
        Self {
            min: Point::new(xmin, ymin),
            max: Point::new(xmax, ymax),
        }
    }

    /// Builds a normalized box from two opposite corners.
    ///
    /// Each axis is sorted independently, so `(50,50)-(10,10)` and
    /// `(10,50)-(50,10)` both yield `(10,10)-(50,50)`.
    #[inline]
    pub fn from_corners(a: Point, b: Point) -> Self {
        Self::from_xyxy(a.x.min(b.x), a.y.min(b.y), a.x.max(b.x), a.y.max(b.y))
    }

    /// Returns the minimum x coordinate.
    #[inline]
    pub fn xmin(&self) -> f64 {
        self.min.x
    }

    /// Returns the minimum y coordinate.
    #[inline]
    pub fn ymin(&self) -> f64 {
        self.min.y
    }

    /// Returns the maximum x coordinate.
    #[inline]
    pub fn xmax(&self) -> f64 {
        self.max.x
    }

    /// Returns the maximum y coordinate.
    #[inline]
    pub fn ymax(&self) -> f64 {
        self.max.y
    }

    /// Returns the width of the bounding box.
    ///
    /// May be negative if the box is malformed (xmax < xmin).
    #[inline]
    pub fn width(&self) -> f64 {
        self.max.x - self.min.x
    }

    /// Returns the height of the bounding box.
    #[inline]
    pub fn height(&self) -> f64 {
        self.max.y - self.min.y
    }

    /// Returns true if all coordinates are finite (not NaN or infinite).
    #[inline]
    pub fn is_finite(&self) -> bool {
        self.min.is_finite() && self.max.is_finite()
    }

    /// The rectangle as an explicit closed polygon `x1,y1,x2,y1,x2,y2,x1,y2`.
    pub fn to_polygon(&self) -> Vec<f64> {
        vec![
            self.xmin(),
            self.ymin(),
            self.xmax(),
            self.ymin(),
            self.xmax(),
            self.ymax(),
            self.xmin(),
            self.ymax(),
        ]
    }
}

impl std::fmt::Debug for BBoxXYXY {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BBoxXYXY")
            .field("xmin", &self.min.x)
            .field("ymin", &self.min.y)
            .field("xmax", &self.max.x)
            .field("ymax", &self.max.y)
            .finish()
    }
}

impl Default for BBoxXYXY {
    fn default() -> Self {
        Self::from_xyxy(0.0, 0.0, 0.0, 0.0)
    }
}

/// Tight integer extent of the nonzero pixels of a mask.
///
/// `x`/`y` are the first covered column/row; `width`/`height` count pixels,
/// so a single covered pixel has width and height 1.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PixelBox {
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
}

impl PixelBox {
    /// COCO bbox format: `[x, y, width, height]`.
    #[inline]
    pub fn to_xywh(&self) -> [f64; 4] {
        [
            self.x as f64,
            self.y as f64,
            self.width as f64,
            self.height as f64,
        ]
    }

    /// Exclusive right edge.
    #[inline]
    pub fn right(&self) -> u32 {
        self.x + self.width
    }

    /// Exclusive bottom edge.
    #[inline]
    pub fn bottom(&self) -> u32 {
        self.y + self.height
    }
}
