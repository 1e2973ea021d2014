//! Label rasters painted from many masks.
//!
//! Both rasters are an ordered fold: layers are painted in the order given,
//! so a later layer overwrites an earlier one where they overlap. Pixels
//! claimed by the ignore class are applied after the fold and always win.

use ndarray::{Array2, Zip};

use super::Mask;
use crate::ir::ClassId;

/// Paints class ids into an `(height, width)` raster, background `0`.
///
/// Every pixel covered by an [`ClassId::IGNORE`] layer ends up `-1`, even
/// when a later layer paints over it.
pub fn class_raster<'a, I>(layers: I, height: usize, width: usize) -> Array2<i32>
where
    I: IntoIterator<Item = (ClassId, &'a Mask)>,
{
    let mut raster = Array2::from_elem((height, width), ClassId::BACKGROUND.as_i32());
    let mut ignore = Mask::empty(height, width);

    for (class_id, mask) in layers {
        paint(&mut raster, mask, class_id.as_i32());
        if class_id.is_ignore() {
            ignore.union_with(mask);
        }
    }

    paint(&mut raster, &ignore, ClassId::IGNORE.as_i32());
    raster
}

/// Paints instance ids into an `(height, width)` raster, background `0`.
///
/// Pixels covered by `ignore` are reset to `0` after the fold.
pub fn instance_raster<'a, I>(layers: I, ignore: &Mask, height: usize, width: usize) -> Array2<i32>
where
    I: IntoIterator<Item = (i32, &'a Mask)>,
{
    let mut raster = Array2::zeros((height, width));
    for (instance_id, mask) in layers {
        paint(&mut raster, mask, instance_id);
    }
    paint(&mut raster, ignore, 0);
    raster
}

fn paint(raster: &mut Array2<i32>, mask: &Mask, value: i32) {
    Zip::from(raster)
        .and(mask.as_array())
        .for_each(|pixel, &covered| {
            if covered {
                *pixel = value;
            }
        });
}
