use std::fs;

use labelforge::export::source::MemorySource;
use labelforge::ir::Shape;
use labelforge::{export_dataset, ExportFormat, ExportOptions, LabelforgeError};

mod common;

fn overlapping_source() -> MemorySource {
    MemorySource::new()
        .with_image(
            "a",
            common::gray_image(30, 20),
            vec![
                Shape::polygon("sky", &[(0.0, 0.0), (30.0, 0.0), (30.0, 10.0), (0.0, 10.0)]),
                Shape::rectangle("bird", (5.0, 5.0), (15.0, 15.0)),
            ],
        )
        .with_image(
            "b",
            common::gray_image(30, 20),
            vec![
                Shape::rectangle("bird", (5.0, 5.0), (15.0, 15.0)),
                Shape::polygon("sky", &[(0.0, 0.0), (30.0, 0.0), (30.0, 10.0), (0.0, 10.0)]),
            ],
        )
}

fn pixel_map_options(root: &std::path::Path) -> ExportOptions {
    ExportOptions {
        format: ExportFormat::PixelMap,
        output_dir: root.to_path_buf(),
    }
}

#[test]
fn last_shape_wins_where_shapes_overlap() {
    let temp = tempfile::tempdir().expect("create temp dir");
    export_dataset(&overlapping_source(), &pixel_map_options(temp.path())).expect("export");

    // sky = 1, bird = 2
    let a = image::open(temp.path().join("PixelMap/a.png"))
        .expect("open a.png")
        .to_luma8();
    assert_eq!(a.dimensions(), (30, 20));
    assert_eq!(a.get_pixel(7, 7).0[0], 2);
    assert_eq!(a.get_pixel(20, 7).0[0], 1);
    assert_eq!(a.get_pixel(20, 15).0[0], 0);

    let b = image::open(temp.path().join("PixelMap/b.png"))
        .expect("open b.png")
        .to_luma8();
    assert_eq!(b.get_pixel(7, 7).0[0], 1);
    assert_eq!(b.get_pixel(7, 12).0[0], 2);
}

#[test]
fn re_export_is_byte_identical() {
    let first = tempfile::tempdir().expect("create temp dir");
    let second = tempfile::tempdir().expect("create temp dir");
    export_dataset(&overlapping_source(), &pixel_map_options(first.path())).expect("first");
    export_dataset(&overlapping_source(), &pixel_map_options(second.path())).expect("second");

    for name in ["a.png", "b.png"] {
        let one = fs::read(first.path().join("PixelMap").join(name)).expect("read first");
        let two = fs::read(second.path().join("PixelMap").join(name)).expect("read second");
        assert_eq!(one, two, "{name} differs between runs");
    }
}

#[test]
fn image_without_shapes_still_exports() {
    let temp = tempfile::tempdir().expect("create temp dir");
    let source = MemorySource::new()
        .with_image(
            "labeled",
            common::gray_image(10, 10),
            vec![Shape::polygon("x", &[(0.0, 0.0), (5.0, 0.0), (5.0, 5.0)])],
        )
        .with_image("empty", common::gray_image(10, 10), Vec::new());
    export_dataset(&source, &pixel_map_options(temp.path())).expect("export");

    let empty = image::open(temp.path().join("PixelMap/empty.png"))
        .expect("open empty.png")
        .to_luma8();
    assert!(empty.pixels().all(|p| p.0[0] == 0));
}

#[test]
fn rectangle_only_scope_is_refused() {
    let temp = tempfile::tempdir().expect("create temp dir");
    let source =
        MemorySource::new().with_image("car", common::gray_image(100, 100), common::car_shapes());
    let err = export_dataset(&source, &pixel_map_options(temp.path())).expect_err("refused");
    assert!(matches!(err, LabelforgeError::RectangleOnlyScope { .. }));
}

#[test]
fn duplicate_base_names_are_reported() {
    use labelforge::export::report::ExportIssueCode;

    let temp = tempfile::tempdir().expect("create temp dir");
    let shapes = vec![Shape::polygon("x", &[(0.0, 0.0), (5.0, 0.0), (5.0, 5.0)])];
    let source = MemorySource::new()
        .with_image("same", common::gray_image(10, 10), shapes.clone())
        .with_image("same", common::gray_image(10, 10), shapes);
    let report = export_dataset(&source, &pixel_map_options(temp.path())).expect("export");
    assert_eq!(report.issues_with(ExportIssueCode::DuplicateBaseName).count(), 1);
}
