//! Density accumulation: turns a finite point set into a per-pixel intensity map.
//!
//! Each point spreads a linear radial falloff over a disc of radius
//! [`RADIUS`]. Contributions add up across points and the running value of
//! every pixel is clamped to [`MAX_ACCUM`] right after each addition. All
//! contributions are non-negative, so clamping incrementally gives the same
//! result as clamping once after summing.

use crate::Point;

/// Influence radius of a single point, in pixels.
pub const RADIUS: f32 = 30.0;

/// Contribution of a point at its own center.
pub const PEAK: f32 = 0.4;

/// Saturation cap for accumulated intensity.
pub const MAX_ACCUM: f32 = 5.0;

/// Per-pixel scalar intensity, row-major, top-left origin.
#[derive(Debug, Clone, PartialEq)]
pub struct IntensityMap {
    pub width: u32,
    pub height: u32,
    pub values: Vec<f32>,
}

impl IntensityMap {
    pub fn zeros(width: u32, height: u32) -> Self {
        Self { width, height, values: vec![0.0; width as usize * height as usize] }
    }

    /// Intensity at `(x, y)`, or `None` outside the map.
    pub fn get(&self, x: u32, y: u32) -> Option<f32> {
        if x >= self.width || y >= self.height {
            return None;
        }
        Some(self.values[y as usize * self.width as usize + x as usize])
    }

    pub fn max_value(&self) -> f32 {
        self.values.iter().copied().fold(0.0, f32::max)
    }
}

/// Accumulate `points` into a `width x height` intensity map.
///
/// Points may lie outside the raster; they still contribute wherever their
/// disc intersects it. Non-finite points are skipped.
pub fn accumulate(points: &[Point], width: u32, height: u32) -> IntensityMap {
    let mut map = IntensityMap::zeros(width, height);
    if width == 0 || height == 0 {
        return map;
    }

    for p in points {
        if !p.x.is_finite() || !p.y.is_finite() {
            continue;
        }
        splat(&mut map, p.x as f32, p.y as f32);
    }

    map
}

fn splat(map: &mut IntensityMap, px: f32, py: f32) {
    let x0 = (px - RADIUS).ceil().max(0.0);
    let y0 = (py - RADIUS).ceil().max(0.0);
    let x1 = (px + RADIUS).floor().min(map.width as f32 - 1.0);
    let y1 = (py + RADIUS).floor().min(map.height as f32 - 1.0);
    if x0 > x1 || y0 > y1 {
        return;
    }

    let stride = map.width as usize;
    for y in y0 as usize..=y1 as usize {
        let dy = y as f32 - py;
        let row = y * stride;
        for x in x0 as usize..=x1 as usize {
            let dx = x as f32 - px;
            let d = (dx * dx + dy * dy).sqrt();
            if d >= RADIUS {
                continue;
            }
            let cell = &mut map.values[row + x];
            *cell = (*cell + (1.0 - d / RADIUS) * PEAK).min(MAX_ACCUM);
        }
    }
}
