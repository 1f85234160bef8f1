use std::f64::consts::PI;
use std::fmt;

use thiserror::Error;

/// Deepest zoom level whose coordinates still fit in a `u32`.
pub const MAX_ZOOM: u8 = 31;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum InvalidTile {
    #[error("zoom {0} exceeds the maximum of {MAX_ZOOM}")]
    Zoom(u8),
    #[error("tile {x}/{y} is outside the {size}x{size} grid at zoom {z}")]
    OutOfRange { x: u32, y: u32, z: u8, size: u64 },
    #[error("invalid quadkey digit {0:?}")]
    QuadkeyDigit(char),
    #[error("quadkey is longer than {MAX_ZOOM} digits")]
    QuadkeyLength,
}

/// A square cell of the web-mercator tile pyramid.
///
/// Row `y` grows southward, so `(0, 0)` is the north-west corner at every zoom.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Tile {
    x: u32,
    y: u32,
    z: u8,
}

/// Geographic extent of a tile in degrees.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LngLatBbox {
    pub west: f64,
    pub south: f64,
    pub east: f64,
    pub north: f64,
}

impl Tile {
    pub fn new(x: u32, y: u32, z: u8) -> Result<Self, InvalidTile> {
        if z > MAX_ZOOM {
            return Err(InvalidTile::Zoom(z));
        }
        let size = 1u64 << z;
        if u64::from(x) >= size || u64::from(y) >= size {
            return Err(InvalidTile::OutOfRange { x, y, z, size });
        }
        Ok(Tile { x, y, z })
    }

    pub fn x(&self) -> u32 {
        self.x
    }

    pub fn y(&self) -> u32 {
        self.y
    }

    pub fn z(&self) -> u8 {
        self.z
    }

    /// Bing-style quadkey: one base-4 digit per zoom level, coarsest first.
    pub fn quadkey(&self) -> String {
        (1..=self.z)
            .rev()
            .map(|level| {
                let mask = 1u32 << (level - 1);
                let mut digit = b'0';
                if self.x & mask != 0 {
                    digit += 1;
                }
                if self.y & mask != 0 {
                    digit += 2;
                }
                digit as char
            })
            .collect()
    }

    pub fn from_quadkey(quadkey: &str) -> Result<Self, InvalidTile> {
        if quadkey.len() > usize::from(MAX_ZOOM) {
            return Err(InvalidTile::QuadkeyLength);
        }
        let (mut x, mut y) = (0u32, 0u32);
        for c in quadkey.chars() {
            x <<= 1;
            y <<= 1;
            match c {
                '0' => {}
                '1' => x |= 1,
                '2' => y |= 1,
                '3' => {
                    x |= 1;
                    y |= 1;
                }
                c => return Err(InvalidTile::QuadkeyDigit(c)),
            }
        }
        Tile::new(x, y, quadkey.len() as u8)
    }

    pub fn bounds(&self) -> LngLatBbox {
        let scale = 2_f64.powi(i32::from(self.z));
        let lon = |x: f64| x / scale * 360.0 - 180.0;
        let lat = |y: f64| (PI * (1.0 - 2.0 * y / scale)).sinh().atan().to_degrees();
        let (x, y) = (f64::from(self.x), f64::from(self.y));
        LngLatBbox {
            west: lon(x),
            south: lat(y + 1.0),
            east: lon(x + 1.0),
            north: lat(y),
        }
    }

    pub fn parent(&self) -> Option<Tile> {
        let z = self.z.checked_sub(1)?;
        Some(Tile {
            x: self.x >> 1,
            y: self.y >> 1,
            z,
        })
    }

    /// The four tiles one zoom level down, in row-major quadrant order.
    pub fn children(&self) -> Result<[Tile; 4], InvalidTile> {
        if self.z >= MAX_ZOOM {
            return Err(InvalidTile::Zoom(self.z + 1));
        }
        Ok(Quadrant::ALL.map(|q| q.offset(self)))
    }
}

impl fmt::Display for Tile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}/{}", self.z, self.x, self.y)
    }
}

/// Pixel rectangle inside a raster, `col`/`row` of the top-left corner plus size.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Window {
    pub col: u32,
    pub row: u32,
    pub width: u32,
    pub height: u32,
}

/// Position of a child tile inside its parent's raster.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Quadrant {
    TopLeft,
    TopRight,
    BottomLeft,
    BottomRight,
}

impl Quadrant {
    pub const ALL: [Quadrant; 4] = [
        Quadrant::TopLeft,
        Quadrant::TopRight,
        Quadrant::BottomLeft,
        Quadrant::BottomRight,
    ];

    fn col_row(self) -> (u32, u32) {
        match self {
            Quadrant::TopLeft => (0, 0),
            Quadrant::TopRight => (1, 0),
            Quadrant::BottomLeft => (0, 1),
            Quadrant::BottomRight => (1, 1),
        }
    }

    fn offset(self, parent: &Tile) -> Tile {
        let (col, row) = self.col_row();
        Tile {
            x: parent.x * 2 + col,
            y: parent.y * 2 + row,
            z: parent.z + 1,
        }
    }

    /// The child of `parent` that covers this quadrant.
    pub fn child_of(self, parent: &Tile) -> Result<Tile, InvalidTile> {
        if parent.z >= MAX_ZOOM {
            return Err(InvalidTile::Zoom(parent.z + 1));
        }
        Ok(self.offset(parent))
    }

    /// Pixel window of this quadrant in a `width` x `height` parent raster.
    ///
    /// Dimensions must be even for the four windows to tile the raster exactly.
    pub fn window(self, width: u32, height: u32) -> Window {
        let (col, row) = self.col_row();
        let (w, h) = (width / 2, height / 2);
        Window {
            col: col * w,
            row: row * h,
            width: w,
            height: h,
        }
    }
}
