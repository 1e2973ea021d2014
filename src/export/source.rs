//! Where images and their shapes come from.
//!
//! The exporter only needs an ordered image list and, per image, its shapes
//! and decoded pixels. [`LabelDirSource`] reads label files from disk;
//! [`MemorySource`] holds everything in memory for library callers and
//! tests.

use std::path::{Path, PathBuf};

use image::DynamicImage;
use walkdir::WalkDir;

use crate::error::LabelforgeError;
use crate::ir::io_label_file::{is_label_file, label_file_path, load_label_image, read_label_file};
use crate::ir::Shape;

const IMAGE_EXTENSIONS: [&str; 8] = ["png", "jpg", "jpeg", "bmp", "gif", "tif", "tiff", "webp"];

/// An ordered list of images with shapes and pixels.
///
/// Indices run over `0..len()` in export order.
pub trait AnnotationSource {
    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Output base name of an image (file name without extension).
    fn base_name(&self, index: usize) -> &str;

    /// The image's shapes in storage order.
    fn load_shapes(&self, index: usize) -> Result<Vec<Shape>, LabelforgeError>;

    /// The image's decoded pixels.
    fn load_pixels(&self, index: usize) -> Result<DynamicImage, LabelforgeError>;
}

/// One image backed by a label file on disk.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ImageEntry {
    /// The image file, absent when the label file was given directly.
    pub image_path: Option<PathBuf>,
    pub label_path: PathBuf,
    pub base_name: String,
}

impl ImageEntry {
    /// Entry for an image or label file path.
    ///
    /// A `.json` path is taken as the label file itself; any other path is
    /// an image whose label file is looked up next to it or in `labels_dir`.
    pub fn from_path(path: &Path, labels_dir: Option<&Path>) -> Self {
        let base_name = path
            .file_stem()
            .map(|stem| stem.to_string_lossy().into_owned())
            .unwrap_or_default();
        let image_path = (!is_label_file(path)).then(|| path.to_path_buf());
        Self {
            image_path,
            label_path: label_file_path(path, labels_dir),
            base_name,
        }
    }
}

/// Label files on disk.
#[derive(Clone, Debug, Default)]
pub struct LabelDirSource {
    entries: Vec<ImageEntry>,
}

impl LabelDirSource {
    /// Builds the image list from input paths.
    ///
    /// Files are taken as given, in order. A directory is scanned
    /// non-recursively for image files that have a label file; its images
    /// are sorted by lower-cased path. `pattern` keeps only paths containing
    /// the substring.
    pub fn from_inputs(
        inputs: &[PathBuf],
        labels_dir: Option<&Path>,
        pattern: Option<&str>,
    ) -> Result<Self, LabelforgeError> {
        let mut entries = Vec::new();
        for input in inputs {
            if input.is_dir() {
                for image_path in scan_image_dir(input)? {
                    let entry = ImageEntry::from_path(&image_path, labels_dir);
                    if entry.label_path.is_file() {
                        entries.push(entry);
                    } else {
                        log::debug!("Skipping unlabeled image {}", image_path.display());
                    }
                }
            } else {
                entries.push(ImageEntry::from_path(input, labels_dir));
            }
        }

        if let Some(pattern) = pattern {
            entries.retain(|entry| {
                let path = entry.image_path.as_ref().unwrap_or(&entry.label_path);
                path.to_string_lossy().contains(pattern)
            });
        }

        log::info!("Found {} images to export", entries.len());
        Ok(Self { entries })
    }

    pub fn entries(&self) -> &[ImageEntry] {
        &self.entries
    }
}

impl AnnotationSource for LabelDirSource {
    fn len(&self) -> usize {
        self.entries.len()
    }

    fn base_name(&self, index: usize) -> &str {
        &self.entries[index].base_name
    }

    fn load_shapes(&self, index: usize) -> Result<Vec<Shape>, LabelforgeError> {
        Ok(read_label_file(&self.entries[index].label_path)?.shapes)
    }

    fn load_pixels(&self, index: usize) -> Result<DynamicImage, LabelforgeError> {
        let entry = &self.entries[index];
        let label_file = read_label_file(&entry.label_path)?;
        load_label_image(&entry.label_path, &label_file, entry.image_path.as_deref())
    }
}

fn scan_image_dir(dir: &Path) -> Result<Vec<PathBuf>, LabelforgeError> {
    let mut files = Vec::new();
    for entry in WalkDir::new(dir).min_depth(1).max_depth(1).follow_links(true) {
        let entry = entry.map_err(|source| LabelforgeError::MissingAnnotationSource {
            path: dir.to_path_buf(),
            message: format!("failed while scanning directory: {source}"),
        })?;
        if entry.file_type().is_file() && has_image_extension(entry.path()) {
            files.push(entry.into_path());
        }
    }
    files.sort_by_cached_key(|path| path.to_string_lossy().to_lowercase());
    Ok(files)
}

fn has_image_extension(path: &Path) -> bool {
    let Some(ext) = path.extension().and_then(|ext| ext.to_str()) else {
        return false;
    };
    IMAGE_EXTENSIONS
        .iter()
        .any(|allowed| ext.eq_ignore_ascii_case(allowed))
}

/// One in-memory image.
#[derive(Clone, Debug)]
pub struct MemoryImage {
    pub base_name: String,
    pub image: DynamicImage,
    pub shapes: Vec<Shape>,
}

/// Images and shapes already in memory.
#[derive(Clone, Debug, Default)]
pub struct MemorySource {
    images: Vec<MemoryImage>,
}

impl MemorySource {
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends an image to the export list.
    pub fn push(&mut self, base_name: impl Into<String>, image: DynamicImage, shapes: Vec<Shape>) {
        self.images.push(MemoryImage {
            base_name: base_name.into(),
            image,
            shapes,
        });
    }

    /// Builder form of [`MemorySource::push`].
    pub fn with_image(
        mut self,
        base_name: impl Into<String>,
        image: DynamicImage,
        shapes: Vec<Shape>,
    ) -> Self {
        self.push(base_name, image, shapes);
        self
    }
}

impl AnnotationSource for MemorySource {
    fn len(&self) -> usize {
        self.images.len()
    }

    fn base_name(&self, index: usize) -> &str {
        &self.images[index].base_name
    }

    fn load_shapes(&self, index: usize) -> Result<Vec<Shape>, LabelforgeError> {
        Ok(self.images[index].shapes.clone())
    }

    fn load_pixels(&self, index: usize) -> Result<DynamicImage, LabelforgeError> {
        Ok(self.images[index].image.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    fn touch(path: &Path) {
        fs::write(path, b"").expect("write file");
    }

    #[test]
    fn directory_scan_is_sorted_filtered_and_flat() {
        let temp = tempfile::tempdir().expect("create temp dir");
        let dir = temp.path();
        for name in ["b.PNG", "a.jpg", "C.jpeg", "notes.txt", "d.png"] {
            touch(&dir.join(name));
        }
        for name in ["b.json", "a.json", "C.json"] {
            touch(&dir.join(name));
        }
        fs::create_dir(dir.join("nested")).expect("create nested dir");
        touch(&dir.join("nested").join("e.png"));
        touch(&dir.join("nested").join("e.json"));

        let source =
            LabelDirSource::from_inputs(&[dir.to_path_buf()], None, None).expect("scan inputs");
        let names: Vec<_> = (0..source.len()).map(|i| source.base_name(i)).collect();
        // d.png has no label file; nested/ is not descended into.
        assert_eq!(names, vec!["a", "b", "C"]);
    }

    #[test]
    fn pattern_and_labels_dir() {
        let temp = tempfile::tempdir().expect("create temp dir");
        let images = temp.path().join("images");
        let labels = temp.path().join("labels");
        fs::create_dir_all(&images).expect("create images dir");
        fs::create_dir_all(&labels).expect("create labels dir");
        for name in ["cat_1.png", "dog_1.png"] {
            touch(&images.join(name));
        }
        for name in ["cat_1.json", "dog_1.json"] {
            touch(&labels.join(name));
        }

        let source = LabelDirSource::from_inputs(&[images.clone()], Some(&labels), Some("dog"))
            .expect("scan inputs");
        assert_eq!(source.len(), 1);
        assert_eq!(source.entries()[0].label_path, labels.join("dog_1.json"));
        assert_eq!(source.entries()[0].image_path, Some(images.join("dog_1.png")));
    }

    #[test]
    fn label_file_input_has_no_image_path() {
        let entry = ImageEntry::from_path(Path::new("data/frame_7.json"), None);
        assert_eq!(entry.image_path, None);
        assert_eq!(entry.label_path, PathBuf::from("data/frame_7.json"));
        assert_eq!(entry.base_name, "frame_7");
    }

    #[test]
    fn unreadable_label_file_is_missing_annotation_source() {
        let temp = tempfile::tempdir().expect("create temp dir");
        let image = temp.path().join("x.png");
        touch(&image);
        fs::write(temp.path().join("x.json"), "{ not json").expect("write label");

        let source = LabelDirSource::from_inputs(&[image], None, None).expect("inputs");
        assert!(matches!(
            source.load_shapes(0),
            Err(LabelforgeError::MissingAnnotationSource { .. })
        ));
    }
}
