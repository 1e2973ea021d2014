//! Fuzz target for shape rasterization.
//!
//! Every shape of a parsed label file is rasterized onto a small canvas;
//! malformed geometry must come back as an error, never a panic.

#![no_main]

use libfuzzer_sys::fuzz_target;
use labelforge::ir::io_label_file::from_label_file_slice;
use labelforge::raster::rasterize;

fuzz_target!(|data: &[u8]| {
    if data.len() > 64 * 1024 {
        return;
    }

    let Ok(file) = from_label_file_slice(data) else {
        return;
    };
    for shape in file.shapes.iter().take(64) {
        let _ = rasterize(shape, 48, 64);
    }
});
