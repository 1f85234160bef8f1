//! Web-mercator tile pyramid math: tile addressing, quadkeys, bounds and the
//! pixel to lon/lat mapping used to place raster detections on the map.

mod affine;
mod geometry;
mod tile;

pub use affine::Affine;
pub use geometry::{GeoTransformer, Geometry, PixelBox, TILE_SIZE};
pub use tile::{InvalidTile, LngLatBbox, MAX_ZOOM, Quadrant, Tile, Window};
