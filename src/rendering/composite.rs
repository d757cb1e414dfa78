//! Flattening "over" blend of a heatmap overlay onto a page screenshot

use crate::rendering::raster::RasterImage;

/// Blend one straight-alpha `src` pixel over `dst`; the result is opaque.
pub fn over(dst: [u8; 4], src: [u8; 4]) -> [u8; 4] {
    let a = u16::from(src[3]);
    if a == 0 {
        return [dst[0], dst[1], dst[2], 255];
    }
    let inv = 255 - a;
    let mut out = [0u8, 0, 0, 255];
    for i in 0..3 {
        out[i] = mul_div255(u16::from(src[i]), a) + mul_div255(u16::from(dst[i]), inv);
    }
    out
}

/// Composite `overlay` over `base`, returning a raster with `base`'s dimensions.
///
/// Without an overlay the base is returned untouched. An overlay of a
/// different size is aligned to the base's top-left corner: pixels it does
/// not cover are treated as transparent and anything past the base's edges
/// is cropped.
pub fn composite(base: RasterImage, overlay: Option<&RasterImage>) -> RasterImage {
    let Some(overlay) = overlay else {
        return base;
    };

    let mut out = base;
    let width = out.width as usize;
    for y in 0..out.height as usize {
        for x in 0..width {
            let i = (y * width + x) * 4;
            let src = overlay.pixel(x as u32, y as u32).unwrap_or([0, 0, 0, 0]);
            let dst = [out.pixels[i], out.pixels[i + 1], out.pixels[i + 2], out.pixels[i + 3]];
            out.pixels[i..i + 4].copy_from_slice(&over(dst, src));
        }
    }
    out
}

fn mul_div255(x: u16, y: u16) -> u8 {
    (((u32::from(x) * u32::from(y)) + 127) / 255) as u8
}
