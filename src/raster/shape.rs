//! Shape rasterization.
//!
//! Every fill samples pixel centers: pixel `(col, row)` is covered when
//! `(col + 0.5, row + 0.5)` lies inside the shape. Geometry outside the
//! image is clipped without error.

use thiserror::Error;

use super::Mask;
use crate::ir::{BBoxXYXY, Point, Shape, ShapeKind};

/// Why a shape could not be rasterized.
#[derive(Clone, Debug, PartialEq, Error)]
pub enum GeometryError {
    #[error("{kind} needs {expected} point(s), found {found}")]
    WrongPointCount {
        kind: ShapeKind,
        expected: &'static str,
        found: usize,
    },

    #[error("{kind} has a non-finite coordinate")]
    NonFinite { kind: ShapeKind },
}

/// Converts one shape into a mask of the given image size.
///
/// Polygons and linestrips are filled as closed rings with the even-odd
/// rule; self-intersecting rings get even-odd holes. A ring that covers no
/// pixel center (two or fewer distinct points, or zero area) falls back to
/// its traced outline. Lines trace a one-pixel path and points mark the
/// pixel they fall in.
pub fn rasterize(shape: &Shape, height: usize, width: usize) -> Result<Mask, GeometryError> {
    let kind = shape.shape_type;
    let points = &shape.points;

    if points.iter().any(|p| !p.is_finite()) {
        return Err(GeometryError::NonFinite { kind });
    }

    let mut mask = Mask::empty(height, width);
    match kind {
        ShapeKind::Rectangle => {
            let [a, b] = exactly_two(kind, points)?;
            fill_box(&mut mask, &BBoxXYXY::from_corners(a, b));
        }
        ShapeKind::Circle => {
            let [center, rim] = exactly_two(kind, points)?;
            fill_disk(&mut mask, center, center.distance(&rim));
        }
        ShapeKind::Polygon | ShapeKind::LineStrip => {
            at_least_one(kind, points)?;
            if distinct_points(points) > 2 {
                fill_ring(&mut mask, points);
            }
            if mask.is_empty() {
                trace_path(&mut mask, points, true);
            }
        }
        ShapeKind::Line => {
            at_least_one(kind, points)?;
            trace_path(&mut mask, points, false);
        }
        ShapeKind::Point => {
            at_least_one(kind, points)?;
            for p in points {
                mask.set_at(p.x, p.y);
            }
        }
    }
    Ok(mask)
}

fn exactly_two(kind: ShapeKind, points: &[Point]) -> Result<[Point; 2], GeometryError> {
    match points {
        [a, b] => Ok([*a, *b]),
        _ => Err(GeometryError::WrongPointCount {
            kind,
            expected: "2",
            found: points.len(),
        }),
    }
}

fn at_least_one(kind: ShapeKind, points: &[Point]) -> Result<(), GeometryError> {
    if points.is_empty() {
        return Err(GeometryError::WrongPointCount {
            kind,
            expected: "1 or more",
            found: 0,
        });
    }
    Ok(())
}

/// Counts distinct points, stopping once three are found.
fn distinct_points(points: &[Point]) -> usize {
    let mut seen: Vec<Point> = Vec::with_capacity(3);
    for p in points {
        if !seen.contains(p) {
            seen.push(*p);
            if seen.len() > 2 {
                break;
            }
        }
    }
    seen.len()
}

/// Index range of pixels whose centers lie in `[lo, hi]`, clipped to `0..len`.
fn center_range(lo: f64, hi: f64, len: usize) -> Option<(usize, usize)> {
    let first = (lo - 0.5).ceil().max(0.0);
    let last = (hi - 0.5).floor().min(len as f64 - 1.0);
    (len > 0 && first <= last).then_some((first as usize, last as usize))
}

fn fill_box(mask: &mut Mask, bbox: &BBoxXYXY) {
    let Some((col0, col1)) = center_range(bbox.xmin(), bbox.xmax(), mask.width()) else {
        return;
    };
    let Some((row0, row1)) = center_range(bbox.ymin(), bbox.ymax(), mask.height()) else {
        return;
    };
    for row in row0..=row1 {
        mask.fill_span(row, col0, col1);
    }
}

fn fill_disk(mask: &mut Mask, center: Point, radius: f64) {
    let Some((row0, row1)) = center_range(center.y - radius, center.y + radius, mask.height())
    else {
        return;
    };
    for row in row0..=row1 {
        let dy = row as f64 + 0.5 - center.y;
        let reach = radius * radius - dy * dy;
        if reach < 0.0 {
            continue;
        }
        let half = reach.sqrt();
        if let Some((col0, col1)) = center_range(center.x - half, center.x + half, mask.width()) {
            mask.fill_span(row, col0, col1);
        }
    }
}

/// Even-odd scanline fill of a closed ring.
fn fill_ring(mask: &mut Mask, points: &[Point]) {
    let (ymin, ymax) = points
        .iter()
        .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), p| {
            (lo.min(p.y), hi.max(p.y))
        });
    let Some((row0, row1)) = center_range(ymin, ymax, mask.height()) else {
        return;
    };

    let n = points.len();
    let mut crossings: Vec<f64> = Vec::with_capacity(n);
    for row in row0..=row1 {
        let y = row as f64 + 0.5;
        crossings.clear();
        for i in 0..n {
            let a = points[i];
            let b = points[(i + 1) % n];
            // Half-open in y so a vertex on the scanline is counted once.
            if (a.y <= y && y < b.y) || (b.y <= y && y < a.y) {
                crossings.push(a.x + (y - a.y) * (b.x - a.x) / (b.y - a.y));
            }
        }
        crossings.sort_by(f64::total_cmp);
        for pair in crossings.chunks_exact(2) {
            if let Some((col0, col1)) = center_range(pair[0], pair[1], mask.width()) {
                mask.fill_span(row, col0, col1);
            }
        }
    }
}

/// Marks every pixel a polyline passes through.
fn trace_path(mask: &mut Mask, points: &[Point], closed: bool) {
    if let [only] = points {
        mask.set_at(only.x, only.y);
        return;
    }
    for pair in points.windows(2) {
        trace_segment(mask, pair[0], pair[1]);
    }
    if closed && points.len() > 2 {
        trace_segment(mask, points[points.len() - 1], points[0]);
    }
}

fn trace_segment(mask: &mut Mask, a: Point, b: Point) {
    let Some((a, b)) = clip_segment(a, b, mask.width() as f64 + 1.0, mask.height() as f64 + 1.0)
    else {
        return;
    };
    let (dx, dy) = (b.x - a.x, b.y - a.y);
    // Sub-pixel steps so no crossed pixel is skipped.
    let steps = (dx.abs().max(dy.abs()) * 2.0).ceil().max(1.0) as usize;
    for i in 0..=steps {
        let t = i as f64 / steps as f64;
        mask.set_at(a.x + t * dx, a.y + t * dy);
    }
}

/// Liang-Barsky clip of segment `a-b` to `[-1, xmax] x [-1, ymax]`.
fn clip_segment(a: Point, b: Point, xmax: f64, ymax: f64) -> Option<(Point, Point)> {
    let (dx, dy) = (b.x - a.x, b.y - a.y);
    let (mut t0, mut t1) = (0.0f64, 1.0f64);
    for (p, q) in [
        (-dx, a.x + 1.0),
        (dx, xmax - a.x),
        (-dy, a.y + 1.0),
        (dy, ymax - a.y),
    ] {
        if p == 0.0 {
            if q < 0.0 {
                return None;
            }
            continue;
        }
        let r = q / p;
        if p < 0.0 {
            t0 = t0.max(r);
        } else {
            t1 = t1.min(r);
        }
        if t0 > t1 {
            return None;
        }
    }
    let at = |t: f64| Point::new(a.x + t * dx, a.y + t * dy);
    Some((at(t0), at(t1)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ir::PixelBox;

    #[test]
    fn far_away_lines_are_clipped_before_tracing() {
        let line = Shape::new(
            "lane",
            ShapeKind::Line,
            vec![Point::new(-1e12, 2.5), Point::new(1e12, 2.5)],
        );
        let mask = rasterize(&line, 4, 8).expect("rasterize");
        assert_eq!(mask.count(), 8);
        assert!((0..8).all(|col| mask.get(2, col)));
    }

    #[test]
    fn rectangle_covers_pixel_centers_inside() {
        let shape = Shape::rectangle("car", (10.0, 10.0), (50.0, 50.0));
        let mask = rasterize(&shape, 100, 100).expect("rasterize");
        assert_eq!(mask.count(), 1600);
        assert_eq!(
            mask.bbox(),
            Some(PixelBox {
                x: 10,
                y: 10,
                width: 40,
                height: 40
            })
        );
    }

    #[test]
    fn reversed_rectangle_matches_normalized() {
        let forward = Shape::rectangle("car", (10.0, 10.0), (50.0, 50.0));
        let reversed = Shape::rectangle("car", (50.0, 50.0), (10.0, 10.0));
        let crossed = Shape::rectangle("car", (10.0, 50.0), (50.0, 10.0));
        let expected = rasterize(&forward, 100, 100).expect("rasterize");
        assert_eq!(rasterize(&reversed, 100, 100).expect("rasterize"), expected);
        assert_eq!(rasterize(&crossed, 100, 100).expect("rasterize"), expected);
    }

    #[test]
    fn polygon_square_matches_rectangle() {
        let square = Shape::polygon(
            "car",
            &[(10.0, 10.0), (50.0, 10.0), (50.0, 50.0), (10.0, 50.0)],
        );
        let rect = Shape::rectangle("car", (10.0, 10.0), (50.0, 50.0));
        assert_eq!(
            rasterize(&square, 100, 100).expect("rasterize"),
            rasterize(&rect, 100, 100).expect("rasterize")
        );
    }

    #[test]
    fn linestrip_is_filled_as_closed_ring() {
        let mut strip = Shape::polygon("road", &[(0.0, 0.0), (10.0, 0.0), (10.0, 10.0)]);
        strip.shape_type = ShapeKind::LineStrip;
        let mut poly = strip.clone();
        poly.shape_type = ShapeKind::Polygon;
        let strip_mask = rasterize(&strip, 20, 20).expect("rasterize");
        assert_eq!(strip_mask, rasterize(&poly, 20, 20).expect("rasterize"));
        // Centers on or right of the diagonal: 10 + 9 + ... + 1.
        assert_eq!(strip_mask.count(), 55);
    }

    #[test]
    fn circle_uses_distance_to_rim_point() {
        let shape = Shape::new(
            "ball",
            ShapeKind::Circle,
            vec![Point::new(50.0, 50.0), Point::new(50.0, 60.0)],
        );
        let mask = rasterize(&shape, 100, 100).expect("rasterize");
        assert!(mask.get(50, 50));
        assert!(mask.get(50, 59));
        assert!(!mask.get(50, 61));
        let bbox = mask.bbox().expect("non-empty");
        assert_eq!((bbox.x, bbox.width), (40, 20));
        // Close to pi * r^2.
        assert!((mask.count() as f64 - std::f64::consts::PI * 100.0).abs() < 20.0);
    }

    #[test]
    fn off_canvas_geometry_is_clipped() {
        let shape = Shape::rectangle("car", (-20.0, -20.0), (5.0, 200.0));
        let mask = rasterize(&shape, 10, 10).expect("rasterize");
        assert_eq!(mask.count(), 50);

        let outside = Shape::rectangle("car", (20.0, 20.0), (30.0, 30.0));
        assert!(rasterize(&outside, 10, 10).expect("rasterize").is_empty());
    }

    #[test]
    fn line_traces_thin_path() {
        let shape = Shape::new(
            "edge",
            ShapeKind::Line,
            vec![Point::new(0.5, 0.5), Point::new(9.5, 0.5)],
        );
        let mask = rasterize(&shape, 10, 10).expect("rasterize");
        assert_eq!(mask.count(), 10);
        assert_eq!(mask.bbox().map(|b| b.height), Some(1));
    }

    #[test]
    fn point_marks_single_pixel() {
        let shape = Shape::new("dot", ShapeKind::Point, vec![Point::new(3.2, 4.7)]);
        let mask = rasterize(&shape, 10, 10).expect("rasterize");
        assert_eq!(mask.count(), 1);
        assert!(mask.get(4, 3));
    }

    #[test]
    fn degenerate_polygon_falls_back_to_outline() {
        let shape = Shape::polygon("sliver", &[(1.5, 1.5), (6.5, 1.5)]);
        let mask = rasterize(&shape, 10, 10).expect("rasterize");
        assert_eq!(mask.count(), 6);
    }

    #[test]
    fn rectangle_needs_two_points() {
        let shape = Shape::new(
            "car",
            ShapeKind::Rectangle,
            vec![Point::new(1.0, 1.0), Point::new(2.0, 2.0), Point::new(3.0, 3.0)],
        );
        assert_eq!(
            rasterize(&shape, 10, 10),
            Err(GeometryError::WrongPointCount {
                kind: ShapeKind::Rectangle,
                expected: "2",
                found: 3
            })
        );
    }

    #[test]
    fn non_finite_points_are_rejected() {
        let shape = Shape::polygon("bad", &[(0.0, 0.0), (f64::NAN, 1.0), (1.0, 1.0)]);
        assert!(matches!(
            rasterize(&shape, 10, 10),
            Err(GeometryError::NonFinite { .. })
        ));
    }
}
