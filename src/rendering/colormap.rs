//! Cold-to-hot color ramp for intensity maps

use crate::rendering::density::IntensityMap;
use crate::rendering::raster::RasterImage;

/// Alpha of a fully saturated overlay pixel. The overlay never goes opaque.
pub const MAX_ALPHA: u8 = 180;

/// Hue of zero intensity (blue), as a fraction of the color wheel.
const COLD_HUE: f32 = 240.0 / 360.0;

const SATURATION: f32 = 1.0;
const LIGHTNESS: f32 = 0.5;

/// Colorize an intensity map into an RGBA overlay of the same size.
///
/// Intensity is clamped to `1.0` for display only; pixels with zero intensity
/// stay fully transparent.
pub fn colorize(map: &IntensityMap) -> RasterImage {
    let mut overlay = RasterImage::transparent(map.width, map.height);
    for (value, px) in map.values.iter().zip(overlay.pixels.chunks_exact_mut(4)) {
        let i = value.min(1.0);
        if i <= 0.0 {
            continue;
        }
        px.copy_from_slice(&heat_color(i));
    }
    overlay
}

/// RGBA for a display intensity in `(0, 1]`.
pub fn heat_color(i: f32) -> [u8; 4] {
    let hue = (1.0 - i) * COLD_HUE;
    let [r, g, b] = hsl_to_rgb(hue, SATURATION, LIGHTNESS);
    let a = (i * MAX_ALPHA as f32).round().clamp(0.0, MAX_ALPHA as f32) as u8;
    [r, g, b, a]
}

/// Convert HSL (all components in `[0, 1]`) to 8-bit RGB.
pub fn hsl_to_rgb(h: f32, s: f32, l: f32) -> [u8; 3] {
    if s == 0.0 {
        let v = to_byte(l);
        return [v, v, v];
    }
    let q = if l < 0.5 { l * (1.0 + s) } else { l + s - l * s };
    let p = 2.0 * l - q;
    [
        to_byte(hue_to_channel(p, q, h + 1.0 / 3.0)),
        to_byte(hue_to_channel(p, q, h)),
        to_byte(hue_to_channel(p, q, h - 1.0 / 3.0)),
    ]
}

fn hue_to_channel(p: f32, q: f32, mut t: f32) -> f32 {
    if t < 0.0 {
        t += 1.0;
    }
    if t > 1.0 {
        t -= 1.0;
    }
    if t < 1.0 / 6.0 {
        p + (q - p) * 6.0 * t
    } else if t < 0.5 {
        q
    } else if t < 2.0 / 3.0 {
        p + (q - p) * (2.0 / 3.0 - t) * 6.0
    } else {
        p
    }
}

fn to_byte(v: f32) -> u8 {
    (v * 255.0).round().clamp(0.0, 255.0) as u8
}
