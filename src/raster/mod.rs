//! Pixel-level representations: boolean masks, label rasters and RLE.
//!
//! - [`Mask`]: one shape or instance, `true` where covered
//! - [`rasterize`]: vector shape to [`Mask`]
//! - [`label`]: class-id and instance-id rasters painted from many masks
//! - [`Rle`]: COCO run-length encoding in column-major order

pub mod label;
mod rle;
mod shape;

pub use rle::{Rle, RleError};
pub use shape::{rasterize, GeometryError};

use ndarray::{Array2, Zip};

use crate::ir::PixelBox;

/// A boolean pixel grid of image size (`height` rows by `width` columns).
///
/// Masks combined with [`Mask::union_with`] or [`Mask::subtract`] must come
/// from the same image and therefore share dimensions.
#[derive(Clone, PartialEq, Eq)]
pub struct Mask {
    pixels: Array2<bool>,
}

impl Mask {
    /// An all-false mask.
    pub fn empty(height: usize, width: usize) -> Self {
        Self {
            pixels: Array2::from_elem((height, width), false),
        }
    }

    /// Wraps an existing `(height, width)` array.
    pub fn from_array(pixels: Array2<bool>) -> Self {
        Self { pixels }
    }

    #[inline]
    pub fn height(&self) -> usize {
        self.pixels.nrows()
    }

    #[inline]
    pub fn width(&self) -> usize {
        self.pixels.ncols()
    }

    #[inline]
    pub fn get(&self, row: usize, col: usize) -> bool {
        self.pixels[[row, col]]
    }

    #[inline]
    pub fn set(&mut self, row: usize, col: usize) {
        self.pixels[[row, col]] = true;
    }

    /// Sets `row`, columns `start..=end`, clipped to the grid.
    pub(crate) fn fill_span(&mut self, row: usize, start: usize, end: usize) {
        if row >= self.height() || start >= self.width() {
            return;
        }
        let end = end.min(self.width() - 1);
        for col in start..=end {
            self.pixels[[row, col]] = true;
        }
    }

    /// Sets the pixel containing the continuous point `(x, y)` if on the grid.
    pub(crate) fn set_at(&mut self, x: f64, y: f64) {
        let (col, row) = (x.floor(), y.floor());
        if col >= 0.0 && row >= 0.0 && (col as usize) < self.width() && (row as usize) < self.height()
        {
            self.pixels[[row as usize, col as usize]] = true;
        }
    }

    /// Number of covered pixels.
    pub fn count(&self) -> u64 {
        self.pixels.iter().filter(|&&covered| covered).count() as u64
    }

    /// True when no pixel is covered.
    pub fn is_empty(&self) -> bool {
        !self.pixels.iter().any(|&covered| covered)
    }

    /// Pixel-wise OR.
    pub fn union_with(&mut self, other: &Mask) {
        Zip::from(&mut self.pixels)
            .and(&other.pixels)
            .for_each(|mine, &theirs| *mine |= theirs);
    }

    /// Clears every pixel covered by `other`.
    pub fn subtract(&mut self, other: &Mask) {
        Zip::from(&mut self.pixels)
            .and(&other.pixels)
            .for_each(|mine, &theirs| *mine &= !theirs);
    }

    /// Tight extent of the covered pixels, `None` for an empty mask.
    pub fn bbox(&self) -> Option<PixelBox> {
        let mut extent: Option<(usize, usize, usize, usize)> = None;
        for ((row, col), &covered) in self.pixels.indexed_iter() {
            if !covered {
                continue;
            }
            extent = Some(match extent {
                None => (col, row, col, row),
                Some((x0, y0, x1, y1)) => (x0.min(col), y0.min(row), x1.max(col), y1.max(row)),
            });
        }
        extent.map(|(x0, y0, x1, y1)| PixelBox {
            x: x0 as u32,
            y: y0 as u32,
            width: (x1 - x0 + 1) as u32,
            height: (y1 - y0 + 1) as u32,
        })
    }

    /// Pixels in column-major (Fortran) order: down each column, left to right.
    pub fn iter_column_major(&self) -> impl Iterator<Item = bool> + '_ {
        self.pixels.t().into_iter().copied()
    }

    /// The underlying `(height, width)` array.
    pub fn as_array(&self) -> &Array2<bool> {
        &self.pixels
    }
}

impl std::fmt::Debug for Mask {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Mask")
            .field("height", &self.height())
            .field("width", &self.width())
            .field("count", &self.count())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn union_and_subtract() {
        let mut a = Mask::empty(3, 3);
        a.set(0, 0);
        a.set(1, 1);
        let mut b = Mask::empty(3, 3);
        b.set(1, 1);
        b.set(2, 2);

        let mut union = a.clone();
        union.union_with(&b);
        assert_eq!(union.count(), 3);

        a.subtract(&b);
        assert_eq!(a.count(), 1);
        assert!(a.get(0, 0));
        assert!(!a.get(1, 1));
    }

    #[test]
    fn bbox_is_tight() {
        let mut mask = Mask::empty(10, 10);
        assert_eq!(mask.bbox(), None);
        mask.set(2, 3);
        mask.set(5, 7);
        assert_eq!(
            mask.bbox(),
            Some(PixelBox {
                x: 3,
                y: 2,
                width: 5,
                height: 4
            })
        );
    }

    #[test]
    fn column_major_walks_down_columns() {
        let mut mask = Mask::empty(2, 3);
        mask.set(0, 1);
        mask.set(1, 2);
        let order: Vec<bool> = mask.iter_column_major().collect();
        assert_eq!(order, vec![false, false, true, false, false, true]);
    }

    #[test]
    fn set_at_clips_off_grid_points() {
        let mut mask = Mask::empty(4, 4);
        mask.set_at(-0.5, 1.0);
        mask.set_at(4.0, 1.0);
        mask.set_at(1.9, 3.99);
        assert_eq!(mask.count(), 1);
        assert!(mask.get(3, 1));
    }
}
