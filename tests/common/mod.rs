#![allow(dead_code)]

use std::fs;
use std::path::{Path, PathBuf};

use image::{DynamicImage, Rgb, RgbImage};
use labelforge::ir::io_label_file::write_label_file;
use labelforge::ir::{LabelFile, Shape};

/// A flat gray test image.
pub fn gray_image(width: u32, height: u32) -> DynamicImage {
    DynamicImage::ImageRgb8(RgbImage::from_pixel(width, height, Rgb([120, 120, 120])))
}

pub fn write_png(path: &Path, width: u32, height: u32) {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).expect("create parent dir");
    }
    gray_image(width, height)
        .save_with_format(path, image::ImageFormat::Png)
        .expect("write png file");
}

/// Writes `<dir>/<base>.png` and its label file `<dir>/<base>.json`.
///
/// Returns the image path.
pub fn write_labeled_image(dir: &Path, base: &str, width: u32, height: u32, shapes: Vec<Shape>) -> PathBuf {
    let image_path = dir.join(format!("{base}.png"));
    write_png(&image_path, width, height);

    let label_file = LabelFile {
        version: Some("5.0.1".to_string()),
        shapes,
        image_path: Some(format!("{base}.png")),
        image_height: Some(height),
        image_width: Some(width),
        ..Default::default()
    };
    write_label_file(&dir.join(format!("{base}.json")), &label_file).expect("write label file");
    image_path
}

/// The single "car" rectangle image used across export tests.
pub fn car_shapes() -> Vec<Shape> {
    vec![Shape::rectangle("car", (10.0, 10.0), (50.0, 50.0))]
}

pub fn read_json(path: &Path) -> serde_json::Value {
    let text = fs::read_to_string(path).expect("read json file");
    serde_json::from_str(&text).expect("parse json file")
}
