//! Format encoders.
//!
//! An encoder sees one image at a time through an [`ImageContext`]: the
//! decoded pixels, the image's rasterized shapes and its aggregated
//! instances. Class ids on those shapes come from the dataset-wide
//! [`ClassRegistry`](crate::registry::ClassRegistry). It never looks at other
//! images. Encoders that produce a dataset-wide artifact (COCO) collect
//! per-image entries and write them in [`Encoder::finish`].
//!
//! | Encoder | Subtree | Accepts |
//! |---------|---------|---------|
//! | [`PixelMapEncoder`] | `PixelMap/` | area shapes |
//! | [`VocDetectionEncoder`] | `VOC/` | rectangles |
//! | [`VocSegmentationEncoder`] | `VOC/` | area shapes |
//! | [`CocoEncoder`] | `COCO/` | area shapes |

pub mod coco;
pub mod pixel_map;
pub mod viz;
pub mod voc;

pub use coco::CocoEncoder;
pub use pixel_map::PixelMapEncoder;
pub use voc::{VocDetectionEncoder, VocSegmentationEncoder};

use std::path::Path;

use image::{DynamicImage, GrayImage, ImageFormat, Luma, RgbImage};
use ndarray::Array2;

use crate::error::LabelforgeError;
use crate::export::layout::OutputLayout;
use crate::export::report::ExportReport;
use crate::instance::{InstanceSet, ShapeMask};
use crate::ir::{ImageId, ShapeKind};
use crate::raster::label;

/// Everything an encoder may know about the image being exported.
pub struct ImageContext<'a> {
    /// 0-based position in the export's image list.
    pub image_id: ImageId,
    /// Output base name (source file name without extension).
    pub base_name: &'a str,
    pub image: &'a DynamicImage,
    /// Shapes the encoder accepted, in annotation-list order.
    pub shapes: &'a [ShapeMask<'a>],
    pub instances: &'a InstanceSet,
}

impl ImageContext<'_> {
    pub fn height(&self) -> usize {
        self.image.height() as usize
    }

    pub fn width(&self) -> usize {
        self.image.width() as usize
    }

    /// Semantic class raster, painted in annotation order, ignore on top.
    pub fn class_raster(&self) -> Array2<i32> {
        label::class_raster(
            self.shapes.iter().map(|s| (s.class_id, &s.mask)),
            self.height(),
            self.width(),
        )
    }

    /// Instance raster, ids `1..=N` in first-appearance order.
    pub fn instance_raster(&self) -> Array2<i32> {
        self.instances.id_raster(self.shapes)
    }
}

/// Turns aggregated images into on-disk artifacts.
pub trait Encoder {
    /// Format name used in reports and error messages.
    fn name(&self) -> &'static str;

    /// Encoder mode within the format.
    fn mode(&self) -> &'static str;

    /// Output subtree written by this encoder.
    fn layout(&self) -> &OutputLayout;

    /// Whether shapes of this kind can be encoded. Unsupported shapes are
    /// skipped (and reported) before the image reaches the encoder.
    fn supports(&self, kind: ShapeKind) -> bool;

    /// Writes the artifacts of one image.
    fn encode_image(
        &mut self,
        ctx: &ImageContext<'_>,
        report: &mut ExportReport,
    ) -> Result<(), LabelforgeError>;

    /// Writes dataset-wide artifacts after the last image.
    fn finish(self, report: &mut ExportReport) -> Result<(), LabelforgeError>
    where
        Self: Sized,
    {
        let _ = report;
        Ok(())
    }
}

/// Saves an image as JPEG (alpha is dropped).
pub fn write_jpeg(path: &Path, image: &DynamicImage) -> Result<(), LabelforgeError> {
    write_rgb_jpeg(path, &image.to_rgb8())
}

/// Saves an RGB buffer as JPEG.
pub fn write_rgb_jpeg(path: &Path, image: &RgbImage) -> Result<(), LabelforgeError> {
    image
        .save_with_format(path, ImageFormat::Jpeg)
        .map_err(|source| LabelforgeError::ImageWrite {
            path: path.to_path_buf(),
            source,
        })
}

/// Saves a label raster as a single-channel 8-bit PNG.
///
/// Values must lie in `-1..=254`; `-1` is stored as `255`.
pub fn write_label_png(path: &Path, raster: &Array2<i32>) -> Result<(), LabelforgeError> {
    if let Some(&value) = raster.iter().find(|&&v| !(-1..=254).contains(&v)) {
        return Err(LabelforgeError::LabelOutOfRange {
            path: path.to_path_buf(),
            value,
        });
    }

    let (height, width) = raster.dim();
    let png = GrayImage::from_fn(width as u32, height as u32, |x, y| {
        Luma([raster[[y as usize, x as usize]] as u8])
    });
    png.save_with_format(path, ImageFormat::Png)
        .map_err(|source| LabelforgeError::ImageWrite {
            path: path.to_path_buf(),
            source,
        })
}

/// Saves a label raster as an `.npy` array of `i32`.
pub fn write_label_npy(path: &Path, raster: &Array2<i32>) -> Result<(), LabelforgeError> {
    ndarray_npy::write_npy(path, raster).map_err(|source| LabelforgeError::NpyWrite {
        path: path.to_path_buf(),
        source,
    })
}
