//! Instance aggregation.
//!
//! Shapes of one image are grouped into instances keyed by
//! `(label, instance key)`. The key is the shape's `group_id` when present;
//! otherwise a [`KeyAllocator`] hands out a synthetic key unique within the
//! export run, making the shape a singleton instance. Shapes of the ignore
//! class never form instances: their pixels are collected into one ignore
//! mask that is removed from every instance mask.

use std::collections::HashMap;

use ndarray::Array2;

use crate::ir::{BBoxXYXY, ClassId, InstanceKey, Shape, ShapeKind};
use crate::raster::{label, Mask};

/// A rasterized shape of the current image.
#[derive(Clone, Debug)]
pub struct ShapeMask<'a> {
    /// Position of the shape in the image's annotation list.
    pub index: usize,
    pub shape: &'a Shape,
    pub class_id: ClassId,
    pub mask: Mask,
}

/// One annotated object of an image.
#[derive(Clone, Debug)]
pub struct Instance {
    pub label: String,
    pub key: InstanceKey,
    pub class_id: ClassId,
    /// Union of the constituent shape masks, minus ignored pixels.
    pub mask: Mask,
    /// Annotation-list positions of the constituent shapes.
    pub shape_indices: Vec<usize>,
    /// Normalized boxes of constituent rectangles.
    pub rectangles: Vec<BBoxXYXY>,
}

impl Instance {
    /// True when every constituent shape is a rectangle.
    pub fn is_all_rectangles(&self) -> bool {
        !self.rectangles.is_empty() && self.rectangles.len() == self.shape_indices.len()
    }
}

/// The instances of one image, in order of first appearance.
#[derive(Clone, Debug)]
pub struct InstanceSet {
    pub instances: Vec<Instance>,
    /// Pixels covered by any ignore-class shape.
    pub ignore: Mask,
    /// For each entry of the aggregated [`ShapeMask`] slice, the index of
    /// its instance, `None` for ignore shapes.
    shape_instance: Vec<Option<usize>>,
}

impl InstanceSet {
    pub fn len(&self) -> usize {
        self.instances.len()
    }

    pub fn is_empty(&self) -> bool {
        self.instances.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Instance> {
        self.instances.iter()
    }

    /// Instance-id raster: shapes painted in order with their instance's
    /// 1-based position, `0` for background and ignored pixels.
    pub fn id_raster(&self, shapes: &[ShapeMask<'_>]) -> Array2<i32> {
        let (height, width) = (self.ignore.height(), self.ignore.width());
        let layers = shapes
            .iter()
            .zip(&self.shape_instance)
            .filter_map(|(shape, slot)| slot.map(|i| (i as i32 + 1, &shape.mask)));
        label::instance_raster(layers, &self.ignore, height, width)
    }
}

/// Hands out synthetic instance keys for shapes without a `group_id`.
///
/// One allocator lives for a whole export run so that keys never repeat
/// across images. Keys are not stable between runs.
#[derive(Clone, Debug, Default)]
pub struct KeyAllocator {
    next: u64,
}

impl KeyAllocator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Key for a shape: its group id, or a fresh synthetic key.
    pub fn key_for(&mut self, shape: &Shape) -> InstanceKey {
        match shape.group_id {
            Some(group_id) => InstanceKey::Group(group_id),
            None => {
                let key = InstanceKey::Synthetic(self.next);
                self.next += 1;
                key
            }
        }
    }
}

/// Groups an image's shape masks into instances.
///
/// Every instance mask equals the OR of its shapes' masks minus the pixels
/// of any ignore-class shape.
pub fn aggregate(
    shapes: &[ShapeMask<'_>],
    height: usize,
    width: usize,
    keys: &mut KeyAllocator,
) -> InstanceSet {
    let mut instances: Vec<Instance> = Vec::new();
    let mut by_key: HashMap<(&str, InstanceKey), usize> = HashMap::new();
    let mut shape_instance = Vec::with_capacity(shapes.len());
    let mut ignore = Mask::empty(height, width);

    for shape_mask in shapes {
        if shape_mask.class_id.is_ignore() {
            ignore.union_with(&shape_mask.mask);
            shape_instance.push(None);
            continue;
        }

        let shape = shape_mask.shape;
        let key = keys.key_for(shape);
        let slot = *by_key.entry((shape.label.as_str(), key)).or_insert_with(|| {
            instances.push(Instance {
                label: shape.label.clone(),
                key,
                class_id: shape_mask.class_id,
                mask: Mask::empty(height, width),
                shape_indices: Vec::new(),
                rectangles: Vec::new(),
            });
            instances.len() - 1
        });

        let instance = &mut instances[slot];
        instance.mask.union_with(&shape_mask.mask);
        instance.shape_indices.push(shape_mask.index);
        if shape.shape_type == ShapeKind::Rectangle {
            if let [a, b] = shape.points.as_slice() {
                instance.rectangles.push(BBoxXYXY::from_corners(*a, *b));
            }
        }
        shape_instance.push(Some(slot));
    }

    for instance in &mut instances {
        instance.mask.subtract(&ignore);
    }

    InstanceSet {
        instances,
        ignore,
        shape_instance,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::raster::rasterize;
    use crate::registry::{ClassRegistry, IGNORE_LABEL};

    fn masks<'a>(shapes: &'a [Shape], registry: &mut ClassRegistry) -> Vec<ShapeMask<'a>> {
        shapes
            .iter()
            .enumerate()
            .map(|(index, shape)| ShapeMask {
                index,
                shape,
                class_id: registry.register(&shape.label),
                mask: rasterize(shape, 20, 20).expect("rasterize"),
            })
            .collect()
    }

    #[test]
    fn grouped_shapes_share_one_instance() {
        let shapes = vec![
            Shape::rectangle("person", (0.0, 0.0), (5.0, 5.0)).with_group(7),
            Shape::rectangle("person", (10.0, 10.0), (15.0, 15.0)).with_group(7),
            Shape::rectangle("car", (0.0, 10.0), (5.0, 15.0)).with_group(7),
        ];
        let mut registry = ClassRegistry::new();
        let shape_masks = masks(&shapes, &mut registry);
        let set = aggregate(&shape_masks, 20, 20, &mut KeyAllocator::new());

        assert_eq!(set.len(), 2);
        let person = &set.instances[0];
        assert_eq!(person.key, InstanceKey::Group(7));
        assert_eq!(person.shape_indices, vec![0, 1]);
        assert_eq!(person.mask.count(), 50);
        assert!(person.is_all_rectangles());
        assert_eq!(set.instances[1].label, "car");
    }

    #[test]
    fn ungrouped_shapes_are_singletons() {
        let shapes = vec![
            Shape::rectangle("car", (0.0, 0.0), (5.0, 5.0)),
            Shape::rectangle("car", (0.0, 0.0), (5.0, 5.0)),
        ];
        let mut registry = ClassRegistry::new();
        let shape_masks = masks(&shapes, &mut registry);
        let mut keys = KeyAllocator::new();
        let first = aggregate(&shape_masks, 20, 20, &mut keys);
        assert_eq!(first.len(), 2);
        assert_ne!(first.instances[0].key, first.instances[1].key);

        // Keys keep counting across images of the same run.
        let second = aggregate(&shape_masks, 20, 20, &mut keys);
        assert_eq!(second.instances[0].key, InstanceKey::Synthetic(2));
    }

    #[test]
    fn ignore_pixels_are_removed_from_every_instance() {
        let shapes = vec![
            Shape::rectangle("car", (0.0, 0.0), (10.0, 10.0)),
            Shape::rectangle(IGNORE_LABEL, (0.0, 0.0), (5.0, 10.0)),
            Shape::polygon("road", &[(0.0, 0.0), (10.0, 0.0), (10.0, 10.0), (0.0, 10.0)]),
        ];
        let mut registry = ClassRegistry::new();
        let shape_masks = masks(&shapes, &mut registry);
        let set = aggregate(&shape_masks, 20, 20, &mut KeyAllocator::new());

        assert_eq!(set.len(), 2);
        assert_eq!(set.ignore.count(), 50);
        for instance in set.iter() {
            assert_eq!(instance.mask.count(), 50);
            assert!(!instance.mask.get(0, 0));
        }
        assert!(!set.instances[1].is_all_rectangles());
    }

    #[test]
    fn id_raster_numbers_instances_from_one() {
        let shapes = vec![
            Shape::rectangle("car", (0.0, 0.0), (4.0, 4.0)),
            Shape::rectangle(IGNORE_LABEL, (0.0, 0.0), (2.0, 2.0)),
            Shape::rectangle("car", (10.0, 10.0), (12.0, 12.0)),
        ];
        let mut registry = ClassRegistry::new();
        let shape_masks = masks(&shapes, &mut registry);
        let set = aggregate(&shape_masks, 20, 20, &mut KeyAllocator::new());
        let raster = set.id_raster(&shape_masks);

        assert_eq!(raster[[0, 0]], 0);
        assert_eq!(raster[[3, 3]], 1);
        assert_eq!(raster[[11, 11]], 2);
        assert_eq!(raster[[19, 19]], 0);
    }
}
