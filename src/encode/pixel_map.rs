//! Flat class-index pixel maps.
//!
//! One single-channel PNG per image under `PixelMap/`, each pixel holding
//! its semantic class id. Overlapping shapes resolve "last shape wins";
//! ignored pixels hold `255` (`-1` as an unsigned byte).

use std::path::PathBuf;

use super::{write_label_png, Encoder, ImageContext};
use crate::error::LabelforgeError;
use crate::export::layout::OutputLayout;
use crate::export::report::ExportReport;
use crate::ir::ShapeKind;

/// Subtree name below the output root.
pub const SUBTREE: &str = "PixelMap";

/// Writes `PixelMap/<base>.png`.
pub struct PixelMapEncoder {
    layout: OutputLayout,
}

impl PixelMapEncoder {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            layout: OutputLayout::new(root, SUBTREE, &[]),
        }
    }
}

impl Encoder for PixelMapEncoder {
    fn name(&self) -> &'static str {
        "pixel-map"
    }

    fn mode(&self) -> &'static str {
        "class-map"
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
        let path = self.layout.artifact("", ctx.base_name, "png");
        write_label_png(&path, &ctx.class_raster())?;
        log::debug!("Wrote {}", path.display());
        Ok(())
    }
}
