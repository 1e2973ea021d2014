use std::path::PathBuf;
use thiserror::Error;

/// The main error type for labelforge operations.
#[derive(Debug, Error)]
pub enum LabelforgeError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to read annotations from {path}: {message}")]
    MissingAnnotationSource { path: PathBuf, message: String },

    #[error("No {format} export is possible for image '{image}': every shape is unsupported ({kinds})")]
    UnsupportedShapeForFormat {
        image: String,
        format: &'static str,
        kinds: String,
    },

    #[error("Ambiguous VOC export: scope contains neither only rectangles nor any polygon (found: {kinds})")]
    AmbiguousFormatSelection { kinds: String },

    #[error("{format} export needs mask-bearing shapes, but every annotation in scope is a rectangle")]
    RectangleOnlyScope { format: &'static str },

    #[error("Label '{label}' in image '{image}' is missing from the export plan's class registry")]
    UnregisteredLabel { image: String, label: String },

    #[error("Refusing to reset {path}: {message}")]
    UnexpectedOutputTarget { path: PathBuf, message: String },

    #[error("Output {path} already exists (pass --overwrite to replace it)")]
    OutputExists { path: PathBuf },

    #[error("Failed to decode image {path}: {source}")]
    ImageDecode {
        path: PathBuf,
        #[source]
        source: image::ImageError,
    },

    #[error("Failed to write image {path}: {source}")]
    ImageWrite {
        path: PathBuf,
        #[source]
        source: image::ImageError,
    },

    #[error("Failed to write array {path}: {source}")]
    NpyWrite {
        path: PathBuf,
        #[source]
        source: ndarray_npy::WriteNpyError,
    },

    #[error("Failed to write COCO JSON to {path}: {source}")]
    CocoJsonWrite {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("Label value {value} in {path} does not fit an 8-bit label image")]
    LabelOutOfRange { path: PathBuf, value: i32 },

    #[error("Unsupported format: {0}")]
    UnsupportedFormat(String),
}
