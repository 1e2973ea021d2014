//! Export orchestration.
//!
//! An export runs in two passes over an [`AnnotationSource`]:
//!
//! 1. **Plan**: read every image's shapes in list order, build the
//!    [`ClassRegistry`], and pick the encoder mode from the shape kinds in
//!    scope. Refusals ([`LabelforgeError::AmbiguousFormatSelection`],
//!    [`LabelforgeError::RectangleOnlyScope`]) happen here, before any
//!    directory is touched.
//! 2. **Encode**: reset the format's output subtree, then for each image in
//!    order decode its pixels, rasterize the shapes the encoder accepts,
//!    aggregate instances and hand them to the encoder.
//!
//! Images are processed strictly one after another. The registry is the
//! only state shared between images, besides the run-scoped instance key
//! allocator.

pub mod layout;
pub mod report;
pub mod source;

use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

use serde::Serialize;

use crate::encode::{
    CocoEncoder, Encoder, ImageContext, PixelMapEncoder, VocDetectionEncoder,
    VocSegmentationEncoder,
};
use crate::error::LabelforgeError;
use crate::instance::{aggregate, KeyAllocator, ShapeMask};
use crate::ir::{ImageId, Shape, ShapeKind};
use crate::raster::rasterize;
use crate::registry::ClassRegistry;
use report::{ExportIssue, ExportIssueCode, ExportReport};
use source::AnnotationSource;

/// Output dataset format.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum ExportFormat {
    PixelMap,
    Voc,
    Coco,
}

impl ExportFormat {
    pub fn name(&self) -> &'static str {
        match self {
            ExportFormat::PixelMap => "pixel-map",
            ExportFormat::Voc => "voc",
            ExportFormat::Coco => "coco",
        }
    }

    /// Subtree of the output root this format writes into.
    pub fn subtree(&self) -> &'static str {
        match self {
            ExportFormat::PixelMap => crate::encode::pixel_map::SUBTREE,
            ExportFormat::Voc => crate::encode::voc::SUBTREE,
            ExportFormat::Coco => crate::encode::coco::SUBTREE,
        }
    }
}

impl fmt::Display for ExportFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for ExportFormat {
    type Err = LabelforgeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "pixel-map" | "pixelmap" | "pixel_map" => Ok(ExportFormat::PixelMap),
            "voc" => Ok(ExportFormat::Voc),
            "coco" => Ok(ExportFormat::Coco),
            other => Err(LabelforgeError::UnsupportedFormat(format!(
                "'{}' (supported: pixel-map, voc, coco)",
                other
            ))),
        }
    }
}

/// The encoder chosen for a format and scope.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum ExportMode {
    ClassMap,
    VocDetection,
    VocSegmentation,
    CocoInstances,
}

impl ExportMode {
    pub fn format(&self) -> ExportFormat {
        match self {
            ExportMode::ClassMap => ExportFormat::PixelMap,
            ExportMode::VocDetection | ExportMode::VocSegmentation => ExportFormat::Voc,
            ExportMode::CocoInstances => ExportFormat::Coco,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            ExportMode::ClassMap => "class-map",
            ExportMode::VocDetection => "detection",
            ExportMode::VocSegmentation => "segmentation",
            ExportMode::CocoInstances => "instances",
        }
    }
}

/// Shape kinds found in the export scope.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct ScopeSummary {
    pub images: usize,
    pub kinds: BTreeMap<ShapeKind, usize>,
}

impl ScopeSummary {
    /// Tallies the kinds of the given shapes.
    pub fn from_shapes<'a, I>(images: usize, shapes: I) -> Self
    where
        I: IntoIterator<Item = &'a Shape>,
    {
        let mut kinds = BTreeMap::new();
        for shape in shapes {
            *kinds.entry(shape.shape_type).or_insert(0) += 1;
        }
        Self { images, kinds }
    }

    pub fn shape_count(&self) -> usize {
        self.kinds.values().sum()
    }

    /// True when every shape is a rectangle (vacuously true for no shapes).
    pub fn all_rectangles(&self) -> bool {
        self.kinds.keys().all(|kind| *kind == ShapeKind::Rectangle)
    }

    pub fn has_polygon(&self) -> bool {
        self.kinds.contains_key(&ShapeKind::Polygon)
    }

    /// Kinds in scope, comma separated.
    pub fn kind_list(&self) -> String {
        self.kinds
            .keys()
            .map(|kind| kind.name())
            .collect::<Vec<_>>()
            .join(", ")
    }
}

/// Picks the encoder mode for a format from the shape kinds in scope.
///
/// - VOC: only rectangles gives detection; any polygon gives segmentation;
///   every other mix is refused as ambiguous.
/// - COCO and pixel maps need mask-bearing shapes and refuse a scope made
///   only of rectangles.
pub fn select_mode(format: ExportFormat, scope: &ScopeSummary) -> Result<ExportMode, LabelforgeError> {
    match format {
        ExportFormat::Voc if scope.all_rectangles() => Ok(ExportMode::VocDetection),
        ExportFormat::Voc if scope.has_polygon() => Ok(ExportMode::VocSegmentation),
        ExportFormat::Voc => Err(LabelforgeError::AmbiguousFormatSelection {
            kinds: scope.kind_list(),
        }),
        ExportFormat::PixelMap | ExportFormat::Coco if scope.all_rectangles() => {
            Err(LabelforgeError::RectangleOnlyScope {
                format: format.name(),
            })
        }
        ExportFormat::PixelMap => Ok(ExportMode::ClassMap),
        ExportFormat::Coco => Ok(ExportMode::CocoInstances),
    }
}

/// Result of the planning pass.
#[derive(Clone, Debug)]
pub struct ExportPlan {
    pub mode: ExportMode,
    pub registry: ClassRegistry,
    pub scope: ScopeSummary,
    /// Output base name of each image, in export order.
    pub base_names: Vec<String>,
    /// Shapes of each image, in export order.
    pub shapes: Vec<Vec<Shape>>,
}

impl ExportPlan {
    /// Base names used by more than one image, with their positions.
    pub fn duplicate_base_names(&self) -> Vec<(&str, Vec<usize>)> {
        let mut positions: HashMap<&str, Vec<usize>> = HashMap::new();
        for (index, name) in self.base_names.iter().enumerate() {
            positions.entry(name.as_str()).or_default().push(index);
        }
        let mut duplicates: Vec<_> = positions
            .into_iter()
            .filter(|(_, indices)| indices.len() > 1)
            .collect();
        duplicates.sort_by_key(|(_, indices)| indices[0]);
        duplicates
    }
}

impl fmt::Display for ExportPlan {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(
            f,
            "Plan: {} ({})",
            self.mode.format(),
            self.mode.name()
        )?;
        writeln!(
            f,
            "  {} images, {} shapes ({})",
            self.scope.images,
            self.scope.shape_count(),
            self.scope.kind_list()
        )?;
        writeln!(f, "  classes:")?;
        for (label, id) in self.registry.iter() {
            writeln!(f, "    {:>3}  {}", id, label)?;
        }
        Ok(())
    }
}

/// Runs the planning pass: loads every image's shapes, builds the class
/// registry and selects the encoder mode. Writes nothing.
pub fn plan_export<S: AnnotationSource>(
    source: &S,
    format: ExportFormat,
) -> Result<ExportPlan, LabelforgeError> {
    let mut shapes = Vec::with_capacity(source.len());
    let mut base_names = Vec::with_capacity(source.len());
    for index in 0..source.len() {
        shapes.push(source.load_shapes(index)?);
        base_names.push(source.base_name(index).to_string());
    }

    let registry = ClassRegistry::build(shapes.iter().flatten());
    let scope = ScopeSummary::from_shapes(source.len(), shapes.iter().flatten());
    let mode = select_mode(format, &scope)?;
    log::info!(
        "Planned {} export ({}): {} images, {} shapes, {} classes",
        format,
        mode.name(),
        scope.images,
        scope.shape_count(),
        registry.len()
    );

    Ok(ExportPlan {
        mode,
        registry,
        scope,
        base_names,
        shapes,
    })
}

/// Library-level export configuration.
#[derive(Clone, Debug)]
pub struct ExportOptions {
    pub format: ExportFormat,
    /// Output root; the format subtree is created below it.
    pub output_dir: PathBuf,
}

/// Plans and runs a whole export.
///
/// The format's output subtree is removed and recreated before the first
/// image is written. On error, output written so far is left as is.
pub fn export_dataset<S: AnnotationSource>(
    source: &S,
    options: &ExportOptions,
) -> Result<ExportReport, LabelforgeError> {
    let plan = plan_export(source, options.format)?;
    run_plan(source, &plan, options)
}

/// Runs the encode pass of an existing plan.
pub fn run_plan<S: AnnotationSource>(
    source: &S,
    plan: &ExportPlan,
    options: &ExportOptions,
) -> Result<ExportReport, LabelforgeError> {
    let root = options.output_dir.clone();
    match plan.mode {
        ExportMode::ClassMap => run_encoder(source, plan, PixelMapEncoder::new(root)),
        ExportMode::VocDetection => run_encoder(source, plan, VocDetectionEncoder::new(root)),
        ExportMode::VocSegmentation => {
            run_encoder(source, plan, VocSegmentationEncoder::new(root))
        }
        ExportMode::CocoInstances => {
            run_encoder(source, plan, CocoEncoder::new(root, &plan.registry))
        }
    }
}

fn run_encoder<S, E>(source: &S, plan: &ExportPlan, mut encoder: E) -> Result<ExportReport, LabelforgeError>
where
    S: AnnotationSource,
    E: Encoder,
{
    let mut report = ExportReport::new(encoder.name(), encoder.mode());
    report.categories = plan
        .registry
        .categories()
        .map(|(label, _)| label.to_string())
        .collect();
    report.counts.categories = report.categories.len();

    for (name, indices) in plan.duplicate_base_names() {
        let message = format!(
            "base name '{name}' is shared by images {indices:?}; later images overwrite earlier outputs"
        );
        log::warn!("{message}");
        report.add(ExportIssue::warning(ExportIssueCode::DuplicateBaseName, message).on_image(name));
    }

    let layout = encoder.layout().clone();
    if layout.reset()? {
        report.add(ExportIssue::info(
            ExportIssueCode::OutputReset,
            format!("removed previous output {}", layout.dir().display()),
        ));
    }
    log::info!(
        "Exporting {} images as {} ({}) to {}",
        plan.base_names.len(),
        encoder.name(),
        encoder.mode(),
        layout.dir().display()
    );

    let mut keys = KeyAllocator::new();
    for (index, (base_name, shapes)) in plan.base_names.iter().zip(&plan.shapes).enumerate() {
        log::debug!("Exporting image {index} '{base_name}' ({} shapes)", shapes.len());
        let image = source.load_pixels(index)?;
        let (height, width) = (image.height() as usize, image.width() as usize);

        let mut shape_masks: Vec<ShapeMask<'_>> = Vec::with_capacity(shapes.len());
        let mut unsupported: Vec<ShapeKind> = Vec::new();
        for (shape_index, shape) in shapes.iter().enumerate() {
            let kind = shape.shape_type;
            if !encoder.supports(kind) {
                let message = format!(
                    "{kind} shape '{}' cannot be encoded as {}; skipped",
                    shape.label,
                    encoder.name()
                );
                log::warn!("{base_name}: {message}");
                report.add(
                    ExportIssue::warning(ExportIssueCode::UnsupportedShape, message)
                        .on_image(base_name.as_str())
                        .on_shape(shape_index),
                );
                report.counts.skipped_shapes += 1;
                if !unsupported.contains(&kind) {
                    unsupported.push(kind);
                }
                continue;
            }

            let Some(class_id) = plan.registry.id_of(&shape.label) else {
                return Err(LabelforgeError::UnregisteredLabel {
                    image: base_name.clone(),
                    label: shape.label.clone(),
                });
            };
            match rasterize(shape, height, width) {
                Ok(mask) => shape_masks.push(ShapeMask {
                    index: shape_index,
                    shape,
                    class_id,
                    mask,
                }),
                Err(err) => {
                    let message = format!("shape '{}' skipped: {err}", shape.label);
                    log::warn!("{base_name}: {message}");
                    report.add(
                        ExportIssue::warning(ExportIssueCode::InvalidGeometry, message)
                            .on_image(base_name.as_str())
                            .on_shape(shape_index),
                    );
                    report.counts.skipped_shapes += 1;
                }
            }
        }

        if shape_masks.is_empty() && !unsupported.is_empty() {
            return Err(LabelforgeError::UnsupportedShapeForFormat {
                image: base_name.clone(),
                format: encoder.name(),
                kinds: unsupported
                    .iter()
                    .map(|kind| kind.name())
                    .collect::<Vec<_>>()
                    .join(", "),
            });
        }

        let instances = aggregate(&shape_masks, height, width, &mut keys);
        let ctx = ImageContext {
            image_id: ImageId::from(index),
            base_name,
            image: &image,
            shapes: &shape_masks,
            instances: &instances,
        };
        encoder.encode_image(&ctx, &mut report)?;

        report.counts.images += 1;
        report.counts.shapes += shape_masks.len();
        report.counts.instances += instances.len();
    }

    encoder.finish(&mut report)?;
    log::info!(
        "Export finished: {} images, {} instances, {} issues",
        report.counts.images,
        report.counts.instances,
        report.issues.len()
    );
    Ok(report)
}
