use crate::{reader::AseReader, AsepriteError, Result};
use std::io::Read;

/// Index of a tile inside its [Tileset](crate::Tileset).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TileId(pub u32);

/// A single cell of a tilemap.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Tile {
    /// Tile index into the tileset.
    pub id: TileId,
    /// Mirror along the vertical axis.
    pub flip_x: bool,
    /// Mirror along the horizontal axis.
    pub flip_y: bool,
    /// Swap the x and y axes. Applied before `flip_x` and `flip_y`.
    pub flip_diagonal: bool,
}

pub(crate) const EMPTY_TILE: Tile = Tile {
    id: TileId(0),
    flip_x: false,
    flip_y: false,
    flip_diagonal: false,
};

/// The combined effect of a tile's flip flags.
///
/// A diagonal flip is a transpose; composing it with the horizontal and
/// vertical flips yields the eight symmetries of a square.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TileTransform {
    /// Draw the tile as is.
    Identity,
    /// Mirror horizontally.
    FlipX,
    /// Mirror vertically.
    FlipY,
    /// Rotate by 180 degrees.
    Rotate180,
    /// Swap the x and y axes.
    Transpose,
    /// Rotate by 90 degrees clockwise.
    Rotate90,
    /// Rotate by 270 degrees clockwise.
    Rotate270,
    /// Swap the axes and rotate by 180 degrees.
    AntiTranspose,
}

impl TileTransform {
    /// Clockwise rotation in degrees, and whether the tile must be mirrored
    /// horizontally after rotating.
    pub fn rotation_and_flip(&self) -> (u16, bool) {
        match self {
            TileTransform::Identity => (0, false),
            TileTransform::FlipX => (0, true),
            TileTransform::FlipY => (180, true),
            TileTransform::Rotate180 => (180, false),
            TileTransform::Transpose => (90, true),
            TileTransform::Rotate90 => (90, false),
            TileTransform::Rotate270 => (270, false),
            TileTransform::AntiTranspose => (270, true),
        }
    }

    /// Returns `true` if the transform swaps the x and y axes. Such
    /// transforms only apply to square tiles.
    pub fn swaps_axes(&self) -> bool {
        matches!(
            self,
            TileTransform::Transpose
                | TileTransform::Rotate90
                | TileTransform::Rotate270
                | TileTransform::AntiTranspose
        )
    }

    /// Source pixel for output pixel `(x, y)` of a `width`x`height` tile.
    pub fn source_pixel(&self, x: u32, y: u32, width: u32, height: u32) -> (u32, u32) {
        let last_x = width - 1;
        let last_y = height - 1;
        match self {
            TileTransform::Identity => (x, y),
            TileTransform::FlipX => (last_x - x, y),
            TileTransform::FlipY => (x, last_y - y),
            TileTransform::Rotate180 => (last_x - x, last_y - y),
            TileTransform::Transpose => (y, x),
            TileTransform::Rotate90 => (y, last_x - x),
            TileTransform::Rotate270 => (last_y - y, x),
            TileTransform::AntiTranspose => (last_y - y, last_x - x),
        }
    }
}

impl Tile {
    fn parse(bits: u32, header: &TileBitmaskHeader) -> Self {
        Self {
            id: TileId(bits & header.tile_id),
            flip_x: as_bool(bits & header.x_flip),
            flip_y: as_bool(bits & header.y_flip),
            flip_diagonal: as_bool(bits & header.diagonal_flip),
        }
    }

    /// Returns `true` for tile id 0, the empty tile of current tilesets.
    /// See [Tileset::is_empty_tile](crate::Tileset::is_empty_tile).
    pub fn is_empty(&self) -> bool {
        self.id.0 == 0
    }

    /// Resolve the flip flags into a single transform.
    pub fn transform(&self) -> TileTransform {
        match (self.flip_diagonal, self.flip_x, self.flip_y) {
            (false, false, false) => TileTransform::Identity,
            (false, true, false) => TileTransform::FlipX,
            (false, false, true) => TileTransform::FlipY,
            (false, true, true) => TileTransform::Rotate180,
            (true, false, false) => TileTransform::Transpose,
            (true, true, false) => TileTransform::Rotate90,
            (true, false, true) => TileTransform::Rotate270,
            (true, true, true) => TileTransform::AntiTranspose,
        }
    }
}

/// Masks describing how each tile value is packed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct TileBitmaskHeader {
    pub tile_id: u32,
    pub x_flip: u32,
    pub y_flip: u32,
    pub diagonal_flip: u32,
}

impl TileBitmaskHeader {
    pub(crate) fn parse<R: Read>(reader: &mut AseReader<R>) -> Result<Self> {
        let tile_id = reader.dword()?;
        let x_flip = reader.dword()?;
        let y_flip = reader.dword()?;
        let diagonal_flip = reader.dword()?;
        Ok(Self {
            tile_id,
            x_flip,
            y_flip,
            diagonal_flip,
        })
    }
}

pub(crate) fn unzip_tiles<T: Read>(
    reader: AseReader<T>,
    expected_tile_count: usize,
    bits_per_tile: u16,
    header: &TileBitmaskHeader,
) -> Result<Vec<Tile>> {
    let bytes_per_tile = match bits_per_tile {
        8 | 16 | 32 => bits_per_tile as usize / 8,
        _ => {
            return Err(AsepriteError::UnsupportedFeature(format!(
                "Unsupported tile size: {} bits per tile",
                bits_per_tile
            )))
        }
    };
    let bytes = reader.unzip(bytes_per_tile * expected_tile_count)?;
    let tiles = bytes
        .chunks_exact(bytes_per_tile)
        .map(|chunk| {
            let bits = chunk
                .iter()
                .rev()
                .fold(0_u32, |acc, byte| (acc << 8) | *byte as u32);
            Tile::parse(bits, header)
        })
        .collect();
    Ok(tiles)
}

fn as_bool(bitwise_and: u32) -> bool {
    bitwise_and != 0
}
