//! Visualization images written next to the exported labels.
//!
//! All overlays are drawn over a grayscale copy of the source image so the
//! class colors stand out. Colors follow the VOC label colormap.

use image::{DynamicImage, GrayImage, Rgb, RgbImage};
use ndarray::Array2;

use crate::ir::{BBoxXYXY, ClassId, PixelBox};
use crate::raster::Mask;

const BLEND: f32 = 0.5;
const OUTLINE_WIDTH: i64 = 2;

/// VOC colormap entry: the bits of `index` are spread over the high bits of
/// the three channels, three bits per round.
pub fn label_color(index: u8) -> Rgb<u8> {
    let (mut r, mut g, mut b) = (0u8, 0u8, 0u8);
    let mut id = index;
    for j in 0..8 {
        r |= (id & 1) << (7 - j);
        g |= ((id >> 1) & 1) << (7 - j);
        b |= ((id >> 2) & 1) << (7 - j);
        id >>= 3;
    }
    Rgb([r, g, b])
}

/// Color of a raster value; the ignore value `-1` is black.
pub fn value_color(value: i32) -> Rgb<u8> {
    if value == ClassId::IGNORE.as_i32() {
        return Rgb([0, 0, 0]);
    }
    label_color(value.rem_euclid(256) as u8)
}

/// Grayscale copy of the image, expanded back to three channels.
pub fn gray_base(image: &DynamicImage) -> RgbImage {
    DynamicImage::ImageLuma8(image.to_luma8()).to_rgb8()
}

/// Colors a label raster and blends it over the grayscale image.
///
/// Ignored pixels (`-1`) are drawn solid black.
pub fn label_to_rgb(raster: &Array2<i32>, image: &DynamicImage) -> RgbImage {
    let gray: GrayImage = image.to_luma8();
    RgbImage::from_fn(gray.width(), gray.height(), |x, y| {
        let value = raster
            .get((y as usize, x as usize))
            .copied()
            .unwrap_or(ClassId::BACKGROUND.as_i32());
        if value == ClassId::IGNORE.as_i32() {
            return Rgb([0, 0, 0]);
        }
        let luma = gray.get_pixel(x, y).0[0];
        blend(Rgb([luma, luma, luma]), value_color(value), BLEND)
    })
}

/// Box outlines of a detection image, one color per class.
pub fn detection_overlay(image: &DynamicImage, boxes: &[(ClassId, BBoxXYXY)]) -> RgbImage {
    let mut canvas = gray_base(image);
    let (w, h) = (canvas.width(), canvas.height());
    for (class_id, bbox) in boxes {
        draw_outline(
            &mut canvas,
            canvas_coord(bbox.xmin(), w),
            canvas_coord(bbox.ymin(), h),
            canvas_coord(bbox.xmax(), w) - 1,
            canvas_coord(bbox.ymax(), h) - 1,
            value_color(class_id.as_i32()),
        );
    }
    canvas
}

/// Rounds a coordinate and pins it just outside `0..len`, far enough that
/// an edge beyond the canvas stays invisible.
fn canvas_coord(value: f64, len: u32) -> i64 {
    let margin = (OUTLINE_WIDTH + 1) as f64;
    value.round().clamp(-margin, len as f64 + margin) as i64
}

/// Instance masks tinted with their class color, each outlined by its box.
pub fn instance_overlay<'a, I>(image: &DynamicImage, instances: I) -> RgbImage
where
    I: IntoIterator<Item = (ClassId, &'a Mask)>,
{
    let mut canvas = gray_base(image);
    for (class_id, mask) in instances {
        let color = value_color(class_id.as_i32());
        tint(&mut canvas, mask, color);
        if let Some(PixelBox {
            x,
            y,
            width,
            height,
        }) = mask.bbox()
        {
            draw_outline(
                &mut canvas,
                x as i64,
                y as i64,
                (x + width) as i64 - 1,
                (y + height) as i64 - 1,
                color,
            );
        }
    }
    canvas
}

fn blend(base: Rgb<u8>, color: Rgb<u8>, alpha: f32) -> Rgb<u8> {
    let mix = |b: u8, c: u8| (b as f32 * (1.0 - alpha) + c as f32 * alpha).round() as u8;
    Rgb([
        mix(base.0[0], color.0[0]),
        mix(base.0[1], color.0[1]),
        mix(base.0[2], color.0[2]),
    ])
}

fn tint(canvas: &mut RgbImage, mask: &Mask, color: Rgb<u8>) {
    for ((row, col), &covered) in mask.as_array().indexed_iter() {
        let (x, y) = (col as u32, row as u32);
        if covered && x < canvas.width() && y < canvas.height() {
            let pixel = canvas.get_pixel_mut(x, y);
            *pixel = blend(*pixel, color, BLEND);
        }
    }
}

/// Draws an inclusive rectangle outline, clipped to the canvas.
fn draw_outline(canvas: &mut RgbImage, x0: i64, y0: i64, x1: i64, y1: i64, color: Rgb<u8>) {
    let (w, h) = (canvas.width() as i64, canvas.height() as i64);
    let mut put = |x: i64, y: i64| {
        if (0..w).contains(&x) && (0..h).contains(&y) {
            canvas.put_pixel(x as u32, y as u32, color);
        }
    };
    // Walk only the visible part of each edge.
    let (cx0, cx1) = (x0.max(0), x1.min(w - 1));
    let (cy0, cy1) = (y0.max(0), y1.min(h - 1));
    for t in 0..OUTLINE_WIDTH {
        for x in cx0..=cx1 {
            put(x, y0 + t);
            put(x, y1 - t);
        }
        for y in cy0..=cy1 {
            put(x0 + t, y);
            put(x1 - t, y);
        }
    }
}
