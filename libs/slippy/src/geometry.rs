use serde::{Deserialize, Serialize};

use crate::{Affine, Tile};

/// Edge length of the rasters the model sees, in pixels.
pub const TILE_SIZE: u32 = 256;

/// Axis-aligned rectangle in raster pixel space.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PixelBox {
    pub x0: f64,
    pub y0: f64,
    pub x1: f64,
    pub y1: f64,
}

impl PixelBox {
    pub const fn new(x0: f64, y0: f64, x1: f64, y1: f64) -> Self {
        PixelBox { x0, y0, x1, y1 }
    }

    fn corners(&self) -> [(f64, f64); 4] {
        [
            (self.x0, self.y0),
            (self.x1, self.y0),
            (self.x1, self.y1),
            (self.x0, self.y1),
        ]
    }
}

/// GeoJSON geometry, `{"type": "Polygon", "coordinates": [[[lon, lat], ...]]}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum Geometry {
    Polygon { coordinates: Vec<Vec<[f64; 2]>> },
}

impl Geometry {
    /// Closed counter-clockwise ring around the given extent.
    pub fn rect(west: f64, south: f64, east: f64, north: f64) -> Self {
        Geometry::Polygon {
            coordinates: vec![vec![
                [west, south],
                [east, south],
                [east, north],
                [west, north],
                [west, south],
            ]],
        }
    }

    pub fn exterior(&self) -> &[[f64; 2]] {
        match self {
            Geometry::Polygon { coordinates } => coordinates.first().map(Vec::as_slice).unwrap_or_default(),
        }
    }
}

/// Projects pixel rectangles of a tile's raster onto the map.
#[derive(Debug, Clone, Copy)]
pub struct GeoTransformer {
    raster_size: u32,
}

impl Default for GeoTransformer {
    fn default() -> Self {
        GeoTransformer::new(TILE_SIZE)
    }
}

impl GeoTransformer {
    pub const fn new(raster_size: u32) -> Self {
        GeoTransformer { raster_size }
    }

    pub fn raster_size(&self) -> u32 {
        self.raster_size
    }

    pub fn pixel_box_to_polygon(&self, tile: &Tile, pixels: PixelBox) -> Geometry {
        let affine = Affine::for_tile(tile, self.raster_size);
        let mut west = f64::INFINITY;
        let mut south = f64::INFINITY;
        let mut east = f64::NEG_INFINITY;
        let mut north = f64::NEG_INFINITY;
        for (col, row) in pixels.corners() {
            let (lon, lat) = affine.apply(col, row);
            west = west.min(lon);
            east = east.max(lon);
            south = south.min(lat);
            north = north.max(lat);
        }
        Geometry::rect(west, south, east, north)
    }
}
