//! COCO run-length encoding.
//!
//! Runs are taken in column-major order and alternate background/foreground,
//! starting with a (possibly empty) background run. The compressed string
//! form is the one COCO tooling stores in `segmentation.counts`: each count
//! (delta-coded against the count two positions back, from the fourth count
//! on) is written as little-endian 5-bit groups with a continuation bit,
//! offset into printable ASCII by 48.

use thiserror::Error;

use super::Mask;
use crate::ir::PixelBox;

/// A run-length encoded binary mask.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Rle {
    pub height: u32,
    pub width: u32,
    pub counts: Vec<u32>,
}

/// Errors decoding a compressed RLE string.
#[derive(Clone, Debug, PartialEq, Eq, Error)]
pub enum RleError {
    #[error("invalid character {0:?} in RLE counts")]
    InvalidChar(char),

    #[error("RLE counts end in the middle of a value")]
    Truncated,

    #[error("RLE run {index} is negative or overflows")]
    BadRun { index: usize },

    #[error("RLE covers {found} pixels, expected {expected}")]
    SizeMismatch { expected: u64, found: u64 },
}

impl Rle {
    /// Encodes a mask.
    pub fn encode(mask: &Mask) -> Self {
        let mut counts = Vec::new();
        let mut current = false;
        let mut run: u32 = 0;
        for covered in mask.iter_column_major() {
            if covered != current {
                counts.push(run);
                run = 0;
                current = covered;
            }
            run += 1;
        }
        counts.push(run);

        Self {
            height: mask.height() as u32,
            width: mask.width() as u32,
            counts,
        }
    }

    /// Number of foreground pixels.
    pub fn area(&self) -> u64 {
        self.counts.iter().skip(1).step_by(2).map(|&c| c as u64).sum()
    }

    /// Tight `[x, y, width, height]` of the foreground, computed on the runs.
    ///
    /// An empty mask yields `[0, 0, 0, 0]`.
    pub fn bbox(&self) -> PixelBox {
        let h = self.height as u64;
        // Ignore a trailing background run.
        let m = self.counts.len() / 2 * 2;
        if m == 0 || h == 0 {
            return PixelBox::default();
        }

        let (mut xs, mut ys) = (self.width as u64, h);
        let (mut xe, mut ye) = (0u64, 0u64);
        let mut cc: u64 = 0;
        for pair in self.counts[..m].chunks_exact(2) {
            cc += pair[0] as u64;
            let run = pair[1] as u64;
            if run == 0 {
                continue;
            }
            // First and last pixel of the foreground run.
            let (first, last) = (cc, cc + run - 1);
            cc += run;
            let (x0, y0) = (first / h, first % h);
            let (x1, y1) = (last / h, last % h);
            if x0 < x1 {
                // The run wraps into a new column, so it spans full height.
                ys = 0;
                ye = h - 1;
            }
            xs = xs.min(x0);
            xe = xe.max(x1);
            ys = ys.min(y0).min(y1);
            ye = ye.max(y0).max(y1);
        }

        if self.area() == 0 {
            return PixelBox::default();
        }
        PixelBox {
            x: xs as u32,
            y: ys as u32,
            width: (xe - xs + 1) as u32,
            height: (ye - ys + 1) as u32,
        }
    }

    /// Expands back into a mask.
    pub fn decode(&self) -> Mask {
        let (h, w) = (self.height as usize, self.width as usize);
        let mut mask = Mask::empty(h, w);
        let mut offset = 0usize;
        for (j, &count) in self.counts.iter().enumerate() {
            let count = count as usize;
            if j % 2 == 1 {
                for idx in offset..(offset + count).min(h * w) {
                    mask.set(idx % h, idx / h);
                }
            }
            offset += count;
        }
        mask
    }

    /// The compressed string form of the counts.
    pub fn to_compressed(&self) -> String {
        let mut out = String::with_capacity(self.counts.len() * 2);
        for (i, &count) in self.counts.iter().enumerate() {
            let mut x = count as i64;
            if i > 2 {
                x -= self.counts[i - 2] as i64;
            }
            loop {
                let mut c = (x & 0x1f) as u8;
                x >>= 5;
                let more = if c & 0x10 != 0 { x != -1 } else { x != 0 };
                if more {
                    c |= 0x20;
                }
                out.push((c + 48) as char);
                if !more {
                    break;
                }
            }
        }
        out
    }

    /// Parses the compressed string form.
    pub fn from_compressed(height: u32, width: u32, encoded: &str) -> Result<Self, RleError> {
        let mut counts: Vec<u32> = Vec::new();
        let mut chars = encoded.chars();

        while let Some(first) = chars.next() {
            let mut x: i64 = 0;
            let mut k = 0u32;
            let mut next = Some(first);
            loop {
                let ch = next.ok_or(RleError::Truncated)?;
                let c = (ch as u32)
                    .checked_sub(48)
                    .filter(|c| *c < 64)
                    .ok_or(RleError::InvalidChar(ch))? as i64;
                if k >= 12 {
                    return Err(RleError::BadRun {
                        index: counts.len(),
                    });
                }
                x |= (c & 0x1f) << (5 * k);
                k += 1;
                if c & 0x20 == 0 {
                    if c & 0x10 != 0 {
                        x |= -1i64 << (5 * k);
                    }
                    break;
                }
                next = chars.next();
            }

            let index = counts.len();
            if index > 2 {
                x += counts[index - 2] as i64;
            }
            let count = u32::try_from(x).map_err(|_| RleError::BadRun { index })?;
            counts.push(count);
        }

        let rle = Self {
            height,
            width,
            counts,
        };
        let expected = height as u64 * width as u64;
        let found: u64 = rle.counts.iter().map(|&c| c as u64).sum();
        if found != expected {
            return Err(RleError::SizeMismatch { expected, found });
        }
        Ok(rle)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ir::Shape;
    use crate::raster::rasterize;

    fn mask_from(rows: &[&str]) -> Mask {
        let mut mask = Mask::empty(rows.len(), rows[0].len());
        for (r, line) in rows.iter().enumerate() {
            for (c, ch) in line.chars().enumerate() {
                if ch == '#' {
                    mask.set(r, c);
                }
            }
        }
        mask
    }

    #[test]
    fn encode_counts_columns_top_to_bottom() {
        let mask = mask_from(&["..#", ".##", "..."]);
        let rle = Rle::encode(&mask);
        // Column 0: ..., column 1: .#., column 2: ##.
        assert_eq!(rle.counts, vec![4, 1, 1, 2, 1]);
        assert_eq!(rle.area(), 3);
        assert_eq!(rle.decode(), mask);
    }

    #[test]
    fn zero_length_foreground_runs_have_no_extent() {
        let rle = Rle::from_compressed(1, 1, "001").expect("decode counts");
        assert_eq!(rle.counts, vec![0, 0, 1]);
        assert_eq!(rle.bbox(), PixelBox::default());
        assert_eq!(rle.decode(), Mask::empty(1, 1));

        let later = Rle::from_compressed(2, 1, "0011").expect("decode counts");
        assert_eq!(later.counts, vec![0, 0, 1, 1]);
        assert_eq!(
            later.bbox(),
            PixelBox {
                x: 0,
                y: 1,
                width: 1,
                height: 1
            }
        );
    }

    #[test]
    fn empty_and_full_masks() {
        let empty = Rle::encode(&Mask::empty(4, 5));
        assert_eq!(empty.counts, vec![20]);
        assert_eq!(empty.area(), 0);
        assert_eq!(empty.bbox(), PixelBox::default());

        let full = Rle::encode(&mask_from(&["##", "##"]));
        assert_eq!(full.counts, vec![0, 4]);
        assert_eq!(
            full.bbox(),
            PixelBox {
                x: 0,
                y: 0,
                width: 2,
                height: 2
            }
        );
    }

    #[test]
    fn bbox_matches_mask_extent() {
        let shape = Shape::rectangle("car", (10.0, 10.0), (50.0, 50.0));
        let mask = rasterize(&shape, 100, 100).expect("rasterize");
        let rle = Rle::encode(&mask);
        assert_eq!(rle.area(), 1600);
        assert_eq!(rle.bbox().to_xywh(), [10.0, 10.0, 40.0, 40.0]);
        assert_eq!(Some(rle.bbox()), mask.bbox());
    }

    #[test]
    fn bbox_of_run_wrapping_columns_spans_full_height() {
        // Foreground runs from the bottom of column 0 into the top of column 1.
        let mask = mask_from(&[".#", "..", "#."]);
        let rle = Rle::encode(&mask);
        assert_eq!(rle.counts, vec![2, 2, 2]);
        assert_eq!(rle.bbox(), mask.bbox().expect("non-empty"));
    }

    #[test]
    fn compressed_string_matches_known_encoding() {
        // Small counts stay single characters: 48 + count.
        let rle = Rle {
            height: 3,
            width: 3,
            counts: vec![4, 1, 1, 2, 1],
        };
        // Counts from index 3 on are delta-coded: 2-1=1, 1-1=0.
        assert_eq!(rle.to_compressed(), "41110");
    }

    #[test]
    fn compressed_string_round_trips_large_masks() {
        let shape = Shape::polygon("blob", &[(5.0, 3.0), (90.0, 20.0), (60.0, 95.0), (2.0, 70.0)]);
        let mask = rasterize(&shape, 100, 120).expect("rasterize");
        let rle = Rle::encode(&mask);
        let encoded = rle.to_compressed();
        let decoded = Rle::from_compressed(100, 120, &encoded).expect("decode");
        assert_eq!(decoded, rle);
        assert_eq!(decoded.decode(), mask);
    }

    #[test]
    fn from_compressed_rejects_garbage() {
        assert_eq!(
            Rle::from_compressed(1, 1, " "),
            Err(RleError::InvalidChar(' '))
        );
        assert!(matches!(
            Rle::from_compressed(2, 2, "1"),
            Err(RleError::SizeMismatch { .. })
        ));
        // Continuation bit set on the last character.
        assert_eq!(Rle::from_compressed(1, 1, "P"), Err(RleError::Truncated));
    }
}
