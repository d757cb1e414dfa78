//! Raster pipeline: density accumulation, color mapping and compositing
//!
//! These stages are pure CPU transforms. They run strictly in order
//! accumulate -> colorize -> composite, once per request, and never fail on
//! well-formed input.

pub mod colormap;
pub mod composite;
pub mod density;
pub mod raster;

pub use colormap::colorize;
pub use composite::composite;
pub use density::{accumulate, IntensityMap};
pub use raster::RasterImage;

use crate::Point;

/// Run the overlay stages for `points` on top of `base`.
///
/// An empty point set, or one whose discs all miss the raster, leaves `base`
/// exactly as it was.
pub fn apply_heatmap(base: RasterImage, points: &[Point]) -> RasterImage {
    if points.is_empty() {
        return base;
    }
    let intensity = accumulate(points, base.width, base.height);
    if intensity.max_value() == 0.0 {
        return base;
    }
    let overlay = colorize(&intensity);
    composite(base, Some(&overlay))
}
