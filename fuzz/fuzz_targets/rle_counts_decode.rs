//! Fuzz target for compressed COCO RLE counts.
//!
//! The first two bytes pick the mask size; the rest is the counts string.

#![no_main]

use libfuzzer_sys::fuzz_target;
use labelforge::raster::Rle;

fuzz_target!(|data: &[u8]| {
    if data.len() < 2 || data.len() > 64 * 1024 {
        return;
    }

    let height = u32::from(data[0]) + 1;
    let width = u32::from(data[1]) + 1;
    let Ok(counts) = std::str::from_utf8(&data[2..]) else {
        return;
    };
    if let Ok(rle) = Rle::from_compressed(height, width, counts) {
        let _ = rle.bbox();
        let _ = rle.decode();
    }
});
