//! VOC-style per-image layout.
//!
//! Detection mode writes the image, an annotation XML with one `<object>`
//! per rectangle, and a box overlay. Segmentation mode writes the image plus
//! a class raster and an instance raster, each as `.npy`, as an 8-bit PNG
//! and as a colorized visualization.

use std::fmt;
use std::fs;
use std::path::PathBuf;

use super::{viz, write_jpeg, write_label_npy, write_label_png, write_rgb_jpeg, Encoder, ImageContext};
use crate::error::LabelforgeError;
use crate::export::layout::OutputLayout;
use crate::export::report::ExportReport;
use crate::ir::{BBoxXYXY, ClassId, ShapeKind};

/// Subtree name below the output root.
pub const SUBTREE: &str = "VOC";

const JPEG_IMAGES: &str = "JPEGImages";
const ANNOTATIONS: &str = "Annotations";
const ANNOTATIONS_VIZ: &str = "AnnotationsVisualization";
const SEG_CLASS: &str = "SegmentationClass";
const SEG_CLASS_PNG: &str = "SegmentationClassPNG";
const SEG_CLASS_VIZ: &str = "SegmentationClassVisualization";
const SEG_OBJECT: &str = "SegmentationObject";
const SEG_OBJECT_PNG: &str = "SegmentationObjectPNG";
const SEG_OBJECT_VIZ: &str = "SegmentationObjectVisualization";

const DETECTION_DIRS: &[&str] = &[JPEG_IMAGES, ANNOTATIONS, ANNOTATIONS_VIZ];
const SEGMENTATION_DIRS: &[&str] = &[
    JPEG_IMAGES,
    SEG_CLASS,
    SEG_CLASS_PNG,
    SEG_CLASS_VIZ,
    SEG_OBJECT,
    SEG_OBJECT_PNG,
    SEG_OBJECT_VIZ,
];

/// Writes `VOC/{JPEGImages,Annotations,AnnotationsVisualization}`.
pub struct VocDetectionEncoder {
    layout: OutputLayout,
}

impl VocDetectionEncoder {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            layout: OutputLayout::new(root, SUBTREE, DETECTION_DIRS),
        }
    }
}

impl Encoder for VocDetectionEncoder {
    fn name(&self) -> &'static str {
        "voc"
    }

    fn mode(&self) -> &'static str {
        "detection"
    }

    fn layout(&self) -> &OutputLayout {
        &self.layout
    }

    fn supports(&self, kind: ShapeKind) -> bool {
        kind == ShapeKind::Rectangle
    }

    fn encode_image(
        &mut self,
        ctx: &ImageContext<'_>,
        _report: &mut ExportReport,
    ) -> Result<(), LabelforgeError> {
        let base = ctx.base_name;
        write_jpeg(&self.layout.artifact(JPEG_IMAGES, base, "jpg"), ctx.image)?;

        // Ignore-class boxes are left out of both the XML and the overlay.
        let objects: Vec<VocObject<'_>> = ctx
            .shapes
            .iter()
            .filter(|s| !s.class_id.is_ignore())
            .filter_map(|s| match s.shape.points.as_slice() {
                [a, b] => Some(VocObject {
                    name: &s.shape.label,
                    class_id: s.class_id,
                    bbox: BBoxXYXY::from_corners(*a, *b),
                }),
                _ => None,
            })
            .collect();

        let xml = VocAnnotation {
            filename: format!("{base}.jpg"),
            height: ctx.image.height(),
            width: ctx.image.width(),
            // JPEGImages are always written as RGB.
            depth: 3,
            objects: &objects,
        };
        let xml_path = self.layout.artifact(ANNOTATIONS, base, "xml");
        fs::write(&xml_path, xml.to_string())?;

        let boxes: Vec<(ClassId, BBoxXYXY)> =
            objects.iter().map(|o| (o.class_id, o.bbox)).collect();
        write_rgb_jpeg(
            &self.layout.artifact(ANNOTATIONS_VIZ, base, "jpg"),
            &viz::detection_overlay(ctx.image, &boxes),
        )?;

        log::debug!("Wrote {} ({} objects)", xml_path.display(), objects.len());
        Ok(())
    }
}

/// Writes the `VOC/Segmentation*` rasters and visualizations.
pub struct VocSegmentationEncoder {
    layout: OutputLayout,
}

impl VocSegmentationEncoder {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            layout: OutputLayout::new(root, SUBTREE, SEGMENTATION_DIRS),
        }
    }
}

impl Encoder for VocSegmentationEncoder {
    fn name(&self) -> &'static str {
        "voc"
    }

    fn mode(&self) -> &'static str {
        "segmentation"
    }

    fn layout(&self) -> &OutputLayout {
        &self.layout
    }

    fn supports(&self, kind: ShapeKind) -> bool {
        kind.has_area()
    }

    fn encode_image(
        &mut self,
        ctx: &ImageContext<'_>,
        _report: &mut ExportReport,
    ) -> Result<(), LabelforgeError> {
        let base = ctx.base_name;
        let layout = &self.layout;
        write_jpeg(&layout.artifact(JPEG_IMAGES, base, "jpg"), ctx.image)?;

        let class_raster = ctx.class_raster();
        write_label_png(&layout.artifact(SEG_CLASS_PNG, base, "png"), &class_raster)?;
        write_label_npy(&layout.artifact(SEG_CLASS, base, "npy"), &class_raster)?;
        write_rgb_jpeg(
            &layout.artifact(SEG_CLASS_VIZ, base, "jpg"),
            &viz::label_to_rgb(&class_raster, ctx.image),
        )?;

        let instance_raster = ctx.instance_raster();
        write_label_png(&layout.artifact(SEG_OBJECT_PNG, base, "png"), &instance_raster)?;
        write_label_npy(&layout.artifact(SEG_OBJECT, base, "npy"), &instance_raster)?;
        write_rgb_jpeg(
            &layout.artifact(SEG_OBJECT_VIZ, base, "jpg"),
            &viz::label_to_rgb(&instance_raster, ctx.image),
        )?;

        log::debug!(
            "Wrote segmentation for {base} ({} instances)",
            ctx.instances.len()
        );
        Ok(())
    }
}

struct VocObject<'a> {
    name: &'a str,
    class_id: ClassId,
    bbox: BBoxXYXY,
}

/// The annotation XML document of one detection image.
struct VocAnnotation<'a> {
    filename: String,
    height: u32,
    width: u32,
    depth: u8,
    objects: &'a [VocObject<'a>],
}

impl fmt::Display for VocAnnotation<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "<annotation>")?;
        writeln!(f, "  <folder/>")?;
        writeln!(f, "  <filename>{}</filename>", xml_escape(&self.filename))?;
        writeln!(f, "  <database/>")?;
        writeln!(f, "  <annotation/>")?;
        writeln!(f, "  <image/>")?;
        writeln!(f, "  <size>")?;
        writeln!(f, "    <height>{}</height>", self.height)?;
        writeln!(f, "    <width>{}</width>", self.width)?;
        writeln!(f, "    <depth>{}</depth>", self.depth)?;
        writeln!(f, "  </size>")?;
        writeln!(f, "  <segmented/>")?;

        for object in self.objects {
            let bbox = &object.bbox;
            writeln!(f, "  <object>")?;
            writeln!(f, "    <name>{}</name>", xml_escape(object.name))?;
            writeln!(f, "    <pose/>")?;
            writeln!(f, "    <truncated/>")?;
            writeln!(f, "    <difficult/>")?;
            writeln!(
                f,
                "    <bndbox><xmin>{}</xmin><ymin>{}</ymin><xmax>{}</xmax><ymax>{}</ymax></bndbox>",
                bbox.xmin(),
                bbox.ymin(),
                bbox.xmax(),
                bbox.ymax()
            )?;
            writeln!(f, "  </object>")?;
        }

        writeln!(f, "</annotation>")
    }
}

fn xml_escape(raw: &str) -> String {
    raw.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
        .replace('\'', "&apos;")
}
