use crate::{LngLatBbox, Tile};

/// Row-major 2x3 affine map from raster `(col, row)` to `(lon, lat)`.
///
/// ```text
/// | lon |   | a b c |   | col |
/// | lat | = | d e f | * | row |
///                       |  1  |
/// ```
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Affine {
    pub a: f64,
    pub b: f64,
    pub c: f64,
    pub d: f64,
    pub e: f64,
    pub f: f64,
}

impl Affine {
    pub const fn new(a: f64, b: f64, c: f64, d: f64, e: f64, f: f64) -> Self {
        Affine { a, b, c, d, e, f }
    }

    /// Maps a square `raster_size` raster onto `bounds`, with row 0 on the northern edge.
    pub fn from_bounds(bounds: LngLatBbox, raster_size: u32) -> Self {
        let size = f64::from(raster_size);
        let pixel_width = (bounds.east - bounds.west) / size;
        let pixel_height = (bounds.north - bounds.south) / size;
        Affine::new(pixel_width, 0.0, bounds.west, 0.0, -pixel_height, bounds.north)
    }

    pub fn for_tile(tile: &Tile, raster_size: u32) -> Self {
        Affine::from_bounds(tile.bounds(), raster_size)
    }

    pub fn apply(&self, col: f64, row: f64) -> (f64, f64) {
        (
            self.a * col + self.b * row + self.c,
            self.d * col + self.e * row + self.f,
        )
    }
}
