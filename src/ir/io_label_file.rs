//! Label file reader.
//!
//! The annotation editor stores one JSON label file per image. For an image
//! `dir/photo.jpg` the label file is `dir/photo.json`, or `photo.json` inside
//! a separate labels directory. A label file may embed its image as base64
//! `imageData`; otherwise the pixels come from the image file itself.

use std::fs::File;
use std::io::BufReader;
use std::path::{Path, PathBuf};

use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;
use image::DynamicImage;

use super::model::LabelFile;
use crate::error::LabelforgeError;

const LABEL_FILE_EXTENSION: &str = "json";

/// Returns the label file path for an image path.
///
/// A `.json` path is already a label file and is returned unchanged. When
/// `labels_dir` is given, label files are looked up there by file name only.
pub fn label_file_path(image_path: &Path, labels_dir: Option<&Path>) -> PathBuf {
    if is_label_file(image_path) {
        return image_path.to_path_buf();
    }
    let label_path = image_path.with_extension(LABEL_FILE_EXTENSION);
    match (labels_dir, label_path.file_name()) {
        (Some(dir), Some(name)) => dir.join(name),
        _ => label_path,
    }
}

/// Returns true if the path has the label file extension.
pub fn is_label_file(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| ext.eq_ignore_ascii_case(LABEL_FILE_EXTENSION))
        .unwrap_or(false)
}

/// Reads a label file from disk.
///
/// # Errors
/// Any read or parse failure is reported as
/// [`LabelforgeError::MissingAnnotationSource`].
pub fn read_label_file(path: &Path) -> Result<LabelFile, LabelforgeError> {
    let file = File::open(path).map_err(|source| LabelforgeError::MissingAnnotationSource {
        path: path.to_path_buf(),
        message: source.to_string(),
    })?;
    let reader = BufReader::new(file);

    serde_json::from_reader(reader).map_err(|source| LabelforgeError::MissingAnnotationSource {
        path: path.to_path_buf(),
        message: source.to_string(),
    })
}

/// Parses a label file from a UTF-8 string.
///
/// Useful for testing without file I/O.
pub fn from_label_file_str(json: &str) -> Result<LabelFile, serde_json::Error> {
    serde_json::from_str(json)
}

/// Parses a label file from bytes.
///
/// Useful for fuzzing and processing raw bytes without UTF-8 validation overhead.
pub fn from_label_file_slice(bytes: &[u8]) -> Result<LabelFile, serde_json::Error> {
    serde_json::from_slice(bytes)
}

/// Writes a label file as pretty JSON.
pub fn write_label_file(path: &Path, label_file: &LabelFile) -> Result<(), LabelforgeError> {
    let json = serde_json::to_string_pretty(label_file).map_err(|source| {
        LabelforgeError::MissingAnnotationSource {
            path: path.to_path_buf(),
            message: format!("cannot serialize label file: {source}"),
        }
    })?;
    std::fs::write(path, json).map_err(LabelforgeError::Io)
}

/// Decodes the image that belongs to a label file.
///
/// Embedded `imageData` wins; otherwise `fallback_image` is decoded, and if
/// that is absent too, `imagePath` is resolved relative to the label file.
pub fn load_label_image(
    label_path: &Path,
    label_file: &LabelFile,
    fallback_image: Option<&Path>,
) -> Result<DynamicImage, LabelforgeError> {
    if let Some(encoded) = label_file.image_data.as_deref() {
        let bytes = STANDARD.decode(encoded.trim()).map_err(|source| {
            LabelforgeError::MissingAnnotationSource {
                path: label_path.to_path_buf(),
                message: format!("invalid base64 imageData: {source}"),
            }
        })?;
        return image::load_from_memory(&bytes).map_err(|source| LabelforgeError::ImageDecode {
            path: label_path.to_path_buf(),
            source,
        });
    }

    let image_path = match (fallback_image, label_file.image_path.as_deref()) {
        (Some(path), _) => path.to_path_buf(),
        (None, Some(relative)) => label_path
            .parent()
            .map(|dir| dir.join(relative))
            .unwrap_or_else(|| PathBuf::from(relative)),
        (None, None) => {
            return Err(LabelforgeError::MissingAnnotationSource {
                path: label_path.to_path_buf(),
                message: "label file has neither imageData nor imagePath".to_string(),
            })
        }
    };

    image::open(&image_path).map_err(|source| LabelforgeError::ImageDecode {
        path: image_path,
        source,
    })
}
