#![allow(dead_code)]

use labelforge::ir::Shape;
use labelforge::registry::IGNORE_LABEL;
use proptest::prelude::*;
use proptest::strategy::BoxedStrategy;
use proptest::test_runner::{Config as ProptestConfig, FileFailurePersistence};

/// Side length of the square images generated shapes live on.
pub const CANVAS: usize = 32;

pub fn proptest_config() -> ProptestConfig {
    let cases = std::env::var("PROPTEST_CASES")
        .ok()
        .and_then(|v| v.parse::<u32>().ok())
        .unwrap_or(64);

    let mut config = ProptestConfig::with_failure_persistence(FileFailurePersistence::WithSource(
        "proptest-regressions",
    ));
    config.cases = cases;
    config.max_shrink_iters = 1024;
    config
}

/// A coordinate that may fall slightly outside the canvas.
pub fn arb_coord() -> BoxedStrategy<f64> {
    (-4.0f64..(CANVAS as f64 + 4.0)).boxed()
}

pub fn arb_label() -> BoxedStrategy<String> {
    prop_oneof![
        6 => prop::sample::select(vec!["car", "person", "road", "sky"]).prop_map(str::to_string),
        1 => Just(IGNORE_LABEL.to_string()),
    ]
    .boxed()
}

pub fn arb_rectangle() -> BoxedStrategy<Shape> {
    (arb_label(), arb_coord(), arb_coord(), arb_coord(), arb_coord())
        .prop_map(|(label, x1, y1, x2, y2)| Shape::rectangle(label, (x1, y1), (x2, y2)))
        .boxed()
}

pub fn arb_polygon() -> BoxedStrategy<Shape> {
    (arb_label(), prop::collection::vec((arb_coord(), arb_coord()), 3..8))
        .prop_map(|(label, points)| Shape::polygon(label, &points))
        .boxed()
}

/// A rectangle or polygon, optionally sharing one of a few group ids.
pub fn arb_area_shape() -> BoxedStrategy<Shape> {
    (
        prop_oneof![arb_rectangle(), arb_polygon()],
        prop::option::of(0i64..3),
    )
        .prop_map(|(shape, group)| match group {
            Some(group_id) => shape.with_group(group_id),
            None => shape,
        })
        .boxed()
}

pub fn arb_image_shapes(max_shapes: usize) -> BoxedStrategy<Vec<Shape>> {
    prop::collection::vec(arb_area_shape(), 0..=max_shapes).boxed()
}
