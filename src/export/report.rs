//! Export report types.
//!
//! An [`ExportReport`] records what an export produced and every shape or
//! output it had to leave out, so nothing is dropped silently.

use serde::Serialize;
use std::fmt;

/// A report generated by one export run.
#[derive(Clone, Debug, Default, Serialize)]
pub struct ExportReport {
    /// Output format name (`pixel-map`, `voc`, `coco`).
    pub format: String,
    /// Selected encoder mode, e.g. `detection` or `segmentation` for VOC.
    pub mode: String,
    pub counts: ExportCounts,
    /// Registered categories in id order, `__ignore__` excluded.
    pub categories: Vec<String>,
    pub issues: Vec<ExportIssue>,
}

impl ExportReport {
    /// Create a new empty report.
    pub fn new(format: impl Into<String>, mode: impl Into<String>) -> Self {
        Self {
            format: format.into(),
            mode: mode.into(),
            ..Default::default()
        }
    }

    /// Add an issue to the report.
    pub fn add(&mut self, issue: ExportIssue) {
        self.issues.push(issue);
    }

    /// Count of warning-level issues.
    pub fn warning_count(&self) -> usize {
        self.issues
            .iter()
            .filter(|i| i.severity == ExportSeverity::Warning)
            .count()
    }

    /// Count of info-level issues.
    pub fn info_count(&self) -> usize {
        self.issues
            .iter()
            .filter(|i| i.severity == ExportSeverity::Info)
            .count()
    }

    /// Issues with the given code.
    pub fn issues_with(&self, code: ExportIssueCode) -> impl Iterator<Item = &ExportIssue> {
        self.issues.iter().filter(move |i| i.code == code)
    }
}

impl fmt::Display for ExportReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Exported {} ({})", self.format, self.mode)?;
        writeln!(
            f,
            "  {} images, {} shapes, {} instances, {} categories",
            self.counts.images, self.counts.shapes, self.counts.instances, self.counts.categories
        )?;
        if self.counts.skipped_shapes > 0 {
            writeln!(f, "  {} shapes skipped", self.counts.skipped_shapes)?;
        }

        let warnings = self.warning_count();
        if warnings > 0 {
            writeln!(f)?;
            writeln!(f, "Warnings ({}):", warnings)?;
            for issue in self
                .issues
                .iter()
                .filter(|i| i.severity == ExportSeverity::Warning)
            {
                writeln!(f, "  - {}", issue)?;
            }
        }

        let infos = self.info_count();
        if infos > 0 {
            writeln!(f)?;
            writeln!(f, "Notes ({}):", infos)?;
            for issue in self
                .issues
                .iter()
                .filter(|i| i.severity == ExportSeverity::Info)
            {
                writeln!(f, "  - {}", issue)?;
            }
        }

        Ok(())
    }
}

/// Counts of exported elements.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct ExportCounts {
    pub images: usize,
    /// Shapes that reached an encoder.
    pub shapes: usize,
    pub skipped_shapes: usize,
    pub instances: usize,
    pub categories: usize,
}

/// A single issue raised while exporting.
#[derive(Clone, Debug, Serialize)]
pub struct ExportIssue {
    pub severity: ExportSeverity,
    pub code: ExportIssueCode,
    /// Base name of the image the issue belongs to, if any.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub image: Option<String>,
    /// Position of the shape in the image's annotation list, if any.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub shape_index: Option<usize>,
    pub message: String,
}

impl ExportIssue {
    /// Create a warning-level issue (something was left out of the output).
    pub fn warning(code: ExportIssueCode, message: impl Into<String>) -> Self {
        Self {
            severity: ExportSeverity::Warning,
            code,
            image: None,
            shape_index: None,
            message: message.into(),
        }
    }

    /// Create an info-level issue.
    pub fn info(code: ExportIssueCode, message: impl Into<String>) -> Self {
        Self {
            severity: ExportSeverity::Info,
            code,
            image: None,
            shape_index: None,
            message: message.into(),
        }
    }

    /// Attach the image the issue belongs to.
    pub fn on_image(mut self, image: impl Into<String>) -> Self {
        self.image = Some(image.into());
        self
    }

    /// Attach the offending shape's position.
    pub fn on_shape(mut self, index: usize) -> Self {
        self.shape_index = Some(index);
        self
    }
}

impl fmt::Display for ExportIssue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match (&self.image, self.shape_index) {
            (Some(image), Some(index)) => write!(f, "{image} shape #{index}: {}", self.message),
            (Some(image), None) => write!(f, "{image}: {}", self.message),
            _ => f.write_str(&self.message),
        }
    }
}

/// Severity level for export issues.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ExportSeverity {
    /// Something requested was not written.
    Warning,
    /// A policy note; nothing was lost.
    Info,
}

/// Stable issue codes for programmatic consumption.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ExportIssueCode {
    /// Shape type the selected encoder cannot use (e.g. a line into a mask format).
    UnsupportedShape,
    /// Shape geometry that cannot be rasterized.
    InvalidGeometry,
    /// Instance left with no pixels after ignore removal.
    EmptyInstance,
    /// Two images share a base name, so the later one overwrites the earlier.
    DuplicateBaseName,
    /// An existing output subtree was removed before writing.
    OutputReset,
}
