//! Newtype IDs for type-safe identification of export elements.
//!
//! Using newtypes prevents accidentally mixing up different kinds of IDs
//! (e.g., passing an image position where a class id is expected).

use serde::{Deserialize, Serialize};
use std::fmt;

/// A semantic class identifier assigned by the class registry.
///
/// `-1` is reserved for the ignore class and `0` for the background.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ClassId(pub i32);

impl ClassId {
    /// Pixels covered by this class are excluded from every output.
    pub const IGNORE: ClassId = ClassId(-1);

    /// Pixels not covered by any shape.
    pub const BACKGROUND: ClassId = ClassId(0);

    /// Creates a new ClassId.
    #[inline]
    pub fn new(id: i32) -> Self {
        Self(id)
    }

    /// Returns the underlying i32 value.
    #[inline]
    pub fn as_i32(&self) -> i32 {
        self.0
    }

    /// Returns true for the reserved ignore class.
    #[inline]
    pub fn is_ignore(&self) -> bool {
        *self == Self::IGNORE
    }
}

impl fmt::Debug for ClassId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ClassId({})", self.0)
    }
}

impl fmt::Display for ClassId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.0, f)
    }
}

impl From<i32> for ClassId {
    fn from(id: i32) -> Self {
        Self(id)
    }
}

/// Identifies an image by its 0-based position in the export's image list.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ImageId(pub u64);

impl ImageId {
    /// Creates a new ImageId.
    #[inline]
    pub fn new(id: u64) -> Self {
        Self(id)
    }

    /// Returns the underlying u64 value.
    #[inline]
    pub fn as_u64(&self) -> u64 {
        self.0
    }
}

impl fmt::Debug for ImageId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ImageId({})", self.0)
    }
}

impl fmt::Display for ImageId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<usize> for ImageId {
    fn from(position: usize) -> Self {
        Self(position as u64)
    }
}

/// A document-wide annotation identifier (COCO `annotation.id`).
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AnnotationId(pub u64);

impl AnnotationId {
    /// Creates a new AnnotationId.
    #[inline]
    pub fn new(id: u64) -> Self {
        Self(id)
    }

    /// Returns the underlying u64 value.
    #[inline]
    pub fn as_u64(&self) -> u64 {
        self.0
    }
}

impl fmt::Debug for AnnotationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "AnnotationId({})", self.0)
    }
}

impl fmt::Display for AnnotationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// The second half of an instance identity `(label, key)`.
///
/// Shapes sharing a `group_id` share a key; shapes without one get a key
/// synthesized for the current export run. Synthetic keys are not stable
/// across runs.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum InstanceKey {
    Group(i64),
    Synthetic(u64),
}

impl fmt::Display for InstanceKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            InstanceKey::Group(id) => write!(f, "group {}", id),
            InstanceKey::Synthetic(id) => write!(f, "#{}", id),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_id_equality() {
        assert_eq!(ImageId(1), ImageId(1));
        assert_ne!(ImageId(1), ImageId(2));
    }

    #[test]
    fn test_reserved_class_ids() {
        assert!(ClassId::IGNORE.is_ignore());
        assert!(!ClassId::BACKGROUND.is_ignore());
        assert!(ClassId::IGNORE < ClassId::BACKGROUND);
        assert_eq!(ClassId::from(3).as_i32(), 3);
    }

    #[test]
    fn test_instance_keys_do_not_collide_across_kinds() {
        use std::collections::HashSet;
        let mut set = HashSet::new();
        set.insert(InstanceKey::Group(1));
        set.insert(InstanceKey::Synthetic(1));
        set.insert(InstanceKey::Group(1)); // duplicate
        assert_eq!(set.len(), 2);
    }
}
