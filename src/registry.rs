//! Class registry: the dataset-wide label to class-id table.
//!
//! The registry is seeded with `__ignore__ -> -1` and `_background_ -> 0`.
//! Every other label gets the next id (`1, 2, 3, ...`) the first time it is
//! seen while scanning shapes in image-list order, then per-image storage
//! order. Identical label-introduction order therefore yields identical ids
//! on every run.

use std::collections::HashMap;

use serde::Serialize;

use crate::ir::{ClassId, Shape};

/// Reserved label whose pixels are excluded from every output.
pub const IGNORE_LABEL: &str = "__ignore__";

/// Reserved label for uncovered pixels.
pub const BACKGROUND_LABEL: &str = "_background_";

/// Ordered mapping from label to [`ClassId`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ClassRegistry {
    entries: Vec<(String, ClassId)>,
    index: HashMap<String, ClassId>,
}

impl ClassRegistry {
    /// Creates a registry holding only the two reserved labels.
    pub fn new() -> Self {
        let mut registry = Self {
            entries: Vec::new(),
            index: HashMap::new(),
        };
        registry.insert(IGNORE_LABEL, ClassId::IGNORE);
        registry.insert(BACKGROUND_LABEL, ClassId::BACKGROUND);
        registry
    }

    /// Builds the registry from every shape of the dataset, in visiting order.
    pub fn build<'a, I>(shapes: I) -> Self
    where
        I: IntoIterator<Item = &'a Shape>,
    {
        let mut registry = Self::new();
        for shape in shapes {
            registry.register(&shape.label);
        }
        registry
    }

    /// Returns the id of `label`, appending it with the next id if unseen.
    ///
    /// Existing ids are never reassigned.
    pub fn register(&mut self, label: &str) -> ClassId {
        if let Some(id) = self.index.get(label) {
            return *id;
        }
        // Two reserved entries occupy -1 and 0, so the next id is len - 1.
        let id = ClassId::new(self.entries.len() as i32 - 1);
        self.insert(label, id);
        id
    }

    /// Looks up the id of a label.
    pub fn id_of(&self, label: &str) -> Option<ClassId> {
        self.index.get(label).copied()
    }

    /// All entries in registration order, reserved labels first.
    pub fn iter(&self) -> impl Iterator<Item = (&str, ClassId)> {
        self.entries.iter().map(|(label, id)| (label.as_str(), *id))
    }

    /// Entries that appear in outputs: everything except `__ignore__`.
    ///
    /// `_background_` is included with id 0.
    pub fn categories(&self) -> impl Iterator<Item = (&str, ClassId)> {
        self.iter().filter(|(_, id)| !id.is_ignore())
    }

    /// Number of entries, reserved labels included.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// True when no label beyond the reserved two is registered.
    pub fn is_empty(&self) -> bool {
        self.entries.len() <= 2
    }

    fn insert(&mut self, label: &str, id: ClassId) {
        self.entries.push((label.to_string(), id));
        self.index.insert(label.to_string(), id);
    }
}

impl Default for ClassRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl Serialize for ClassRegistry {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        use serde::ser::SerializeMap;
        let mut map = serializer.serialize_map(Some(self.entries.len()))?;
        for (label, id) in &self.entries {
            map.serialize_entry(label, id)?;
        }
        map.end()
    }
}
