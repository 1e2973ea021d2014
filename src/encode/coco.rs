//! COCO instance-segmentation document.
//!
//! Images are copied to `COCO/JPEGImages/` with an instance overlay in
//! `COCO/Visualization/`; a single `COCO/annotations.json` covering every
//! exported image is written once, after the last image.
//!
//! Conventions of the document:
//! - `image.id` is the image's 0-based position in the export list.
//! - `annotation.id` counts from 0 across the whole document.
//! - `category_id` is the class registry id; `categories` lists every
//!   registered label except `__ignore__`, including `_background_` as 0.
//! - An instance made only of rectangles is segmented by 8-number polygons,
//!   any other instance by compressed RLE. `area` and `bbox` always come
//!   from the RLE of the instance mask.

use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::PathBuf;

use chrono::{Datelike, Local, NaiveDateTime};
use serde::Serialize;

use super::{viz, write_jpeg, write_rgb_jpeg, Encoder, ImageContext};
use crate::error::LabelforgeError;
use crate::export::layout::OutputLayout;
use crate::export::report::{ExportIssue, ExportIssueCode, ExportReport};
use crate::ir::{AnnotationId, ShapeKind};
use crate::raster::Rle;
use crate::registry::ClassRegistry;

/// Subtree name below the output root.
pub const SUBTREE: &str = "COCO";

/// File name of the dataset document inside the subtree.
pub const ANNOTATIONS_FILE: &str = "annotations.json";

const JPEG_IMAGES: &str = "JPEGImages";
const VISUALIZATION: &str = "Visualization";
const DATE_FORMAT: &str = "%Y-%m-%d %H:%M:%S%.6f";

/// Accumulates the COCO document and writes it on [`Encoder::finish`].
pub struct CocoEncoder {
    layout: OutputLayout,
    document: CocoDocument,
    next_annotation_id: AnnotationId,
}

impl CocoEncoder {
    /// Creates an encoder stamped with the current local time.
    pub fn new(root: impl Into<PathBuf>, registry: &ClassRegistry) -> Self {
        Self::with_timestamp(root, registry, Local::now().naive_local())
    }

    /// Creates an encoder with a fixed `info.date_created`.
    pub fn with_timestamp(
        root: impl Into<PathBuf>,
        registry: &ClassRegistry,
        created: NaiveDateTime,
    ) -> Self {
        let categories = registry
            .categories()
            .map(|(name, id)| CocoCategory {
                supercategory: None,
                id: id.as_i32(),
                name: name.to_string(),
            })
            .collect();

        Self {
            layout: OutputLayout::new(root, SUBTREE, &[JPEG_IMAGES, VISUALIZATION]),
            document: CocoDocument {
                info: CocoInfo {
                    description: None,
                    url: None,
                    version: None,
                    year: created.year(),
                    contributor: None,
                    date_created: created.format(DATE_FORMAT).to_string(),
                },
                licenses: vec![CocoLicense {
                    url: None,
                    id: 0,
                    name: None,
                }],
                images: Vec::new(),
                kind: "instances",
                annotations: Vec::new(),
                categories,
            },
            next_annotation_id: AnnotationId::new(0),
        }
    }

    /// Path of the dataset document.
    pub fn annotations_path(&self) -> PathBuf {
        self.layout.dir().join(ANNOTATIONS_FILE)
    }

    fn allocate_annotation_id(&mut self) -> AnnotationId {
        let id = self.next_annotation_id;
        self.next_annotation_id = AnnotationId::new(id.as_u64() + 1);
        id
    }
}

impl Encoder for CocoEncoder {
    fn name(&self) -> &'static str {
        "coco"
    }

    fn mode(&self) -> &'static str {
        "instances"
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
        report: &mut ExportReport,
    ) -> Result<(), LabelforgeError> {
        let base = ctx.base_name;
        write_jpeg(&self.layout.artifact(JPEG_IMAGES, base, "jpg"), ctx.image)?;

        self.document.images.push(CocoImage {
            license: 0,
            url: None,
            file_name: format!("{JPEG_IMAGES}/{base}.jpg"),
            height: ctx.image.height(),
            width: ctx.image.width(),
            date_captured: None,
            id: ctx.image_id.as_u64(),
        });

        for instance in ctx.instances.iter() {
            if instance.mask.is_empty() {
                report.add(
                    ExportIssue::warning(
                        ExportIssueCode::EmptyInstance,
                        format!(
                            "instance '{}' ({}) has no pixels left after ignore removal",
                            instance.label, instance.key
                        ),
                    )
                    .on_image(base),
                );
                continue;
            }

            let rle = Rle::encode(&instance.mask);
            let segmentation = if instance.is_all_rectangles() {
                Segmentation::Polygon(instance.rectangles.iter().map(|r| r.to_polygon()).collect())
            } else {
                Segmentation::CompressedRle {
                    size: [rle.height, rle.width],
                    counts: rle.to_compressed(),
                }
            };

            let id = self.allocate_annotation_id();
            self.document.annotations.push(CocoAnnotation {
                id: id.as_u64(),
                image_id: ctx.image_id.as_u64(),
                category_id: instance.class_id.as_i32(),
                segmentation,
                area: rle.area() as f64,
                bbox: rle.bbox().to_xywh(),
                iscrowd: 0,
            });
        }

        let overlay = viz::instance_overlay(
            ctx.image,
            ctx.instances.iter().map(|i| (i.class_id, &i.mask)),
        );
        write_rgb_jpeg(&self.layout.artifact(VISUALIZATION, base, "jpg"), &overlay)?;
        Ok(())
    }

    fn finish(self, _report: &mut ExportReport) -> Result<(), LabelforgeError> {
        let path = self.annotations_path();
        let file = File::create(&path)?;
        let mut writer = BufWriter::new(file);
        serde_json::to_writer_pretty(&mut writer, &self.document).map_err(|source| {
            LabelforgeError::CocoJsonWrite {
                path: path.clone(),
                source,
            }
        })?;
        writer.flush()?;

        log::info!(
            "Wrote {} ({} images, {} annotations)",
            path.display(),
            self.document.images.len(),
            self.document.annotations.len()
        );
        Ok(())
    }
}

#[derive(Serialize)]
struct CocoDocument {
    info: CocoInfo,
    licenses: Vec<CocoLicense>,
    images: Vec<CocoImage>,
    #[serde(rename = "type")]
    kind: &'static str,
    annotations: Vec<CocoAnnotation>,
    categories: Vec<CocoCategory>,
}

#[derive(Serialize)]
struct CocoInfo {
    description: Option<String>,
    url: Option<String>,
    version: Option<String>,
    year: i32,
    contributor: Option<String>,
    date_created: String,
}

#[derive(Serialize)]
struct CocoLicense {
    url: Option<String>,
    id: u32,
    name: Option<String>,
}

#[derive(Serialize)]
struct CocoImage {
    license: u32,
    url: Option<String>,
    file_name: String,
    height: u32,
    width: u32,
    date_captured: Option<String>,
    id: u64,
}

#[derive(Serialize)]
struct CocoAnnotation {
    id: u64,
    image_id: u64,
    category_id: i32,
    segmentation: Segmentation,
    area: f64,
    bbox: [f64; 4],
    iscrowd: u8,
}

#[derive(Serialize)]
#[serde(untagged)]
enum Segmentation {
    /// One flat `[x1, y1, x2, y2, ...]` ring per shape.
    Polygon(Vec<Vec<f64>>),
    CompressedRle { size: [u32; 2], counts: String },
}

#[derive(Serialize)]
struct CocoCategory {
    supercategory: Option<String>,
    id: i32,
    name: String,
}
