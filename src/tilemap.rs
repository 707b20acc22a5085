//! Tile grids extracted from tilemap layers.
use std::io::Read;

use log::debug;

use crate::{
    blend::mul_un8,
    reader::AseReader,
    tile::{self, Tile, TileBitmaskHeader, EMPTY_TILE},
    AsepriteError, AsepriteFile, LayerType, Result, TilesetId,
};

/// Tile payload of a tilemap cel.
#[derive(Debug, Clone)]
pub(crate) struct TilemapData {
    width: u16,
    height: u16,
    tiles: Vec<Tile>,
}

impl TilemapData {
    /// Width in number of tiles
    pub(crate) fn width(&self) -> u16 {
        self.width
    }

    /// Height in number of tiles
    pub(crate) fn height(&self) -> u16 {
        self.height
    }

    pub(crate) fn tile(&self, x: u16, y: u16) -> Option<&Tile> {
        if x >= self.width || y >= self.height {
            return None;
        }
        let index = (y as usize * self.width as usize) + x as usize;
        self.tiles.get(index)
    }

    pub(crate) fn parse_chunk<R: Read>(mut reader: AseReader<R>) -> Result<Self> {
        let width = reader.word()?;
        let height = reader.word()?;
        let bits_per_tile = reader.word()?;
        let bitmask_header = TileBitmaskHeader::parse(&mut reader)?;
        reader.skip_bytes(10)?;
        let expected_tile_count = width as usize * height as usize;
        let tiles = tile::unzip_tiles(reader, expected_tile_count, bits_per_tile, &bitmask_header)?;
        Ok(Self {
            width,
            height,
            tiles,
        })
    }
}

/// Which layers to include when extracting tilemaps.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TilemapOptions {
    /// Skip tilemap layers hidden in Aseprite (directly or via a parent group).
    pub only_visible_layers: bool,
}

impl Default for TilemapOptions {
    fn default() -> Self {
        TilemapOptions {
            only_visible_layers: true,
        }
    }
}

/// The tile grid of one tilemap layer in one frame.
#[derive(Debug, Clone, PartialEq)]
pub struct TilemapLayer {
    /// Name of the source layer.
    pub name: String,
    /// Id of the source layer.
    pub layer_id: u32,
    /// Tileset the tile ids refer to.
    pub tileset_id: TilesetId,
    /// Number of tile columns.
    pub columns: u32,
    /// Number of tile rows.
    pub rows: u32,
    /// Pixel offset of the top-left tile on the canvas.
    pub offset: (i32, i32),
    /// Combined cel and layer opacity.
    pub opacity: u8,
    /// Tiles in row-major order, `columns * rows` entries.
    pub tiles: Vec<Tile>,
}

impl TilemapLayer {
    /// Tile at the given grid position. Positions outside the grid are
    /// empty.
    pub fn tile(&self, column: u32, row: u32) -> &Tile {
        if column >= self.columns || row >= self.rows {
            return &EMPTY_TILE;
        }
        &self.tiles[(row * self.columns + column) as usize]
    }
}

/// All tilemap layers of a single frame, bottom to top.
#[derive(Debug, Clone, PartialEq)]
pub struct TilemapFrame {
    /// Frame index.
    pub frame: u32,
    /// Frame duration in milliseconds.
    pub duration: u32,
    /// Tilemap layers with a cel in this frame.
    pub layers: Vec<TilemapLayer>,
}

/// Tilemap of one frame together with the tilesets it references.
#[derive(Debug, Clone, PartialEq)]
pub struct Tilemap {
    /// The tile grids.
    pub frame: TilemapFrame,
    /// Distinct tilesets referenced by `frame`, in first-use order.
    pub tilesets: Vec<TilesetId>,
}

/// Tilemaps of all frames together with the tilesets they reference.
#[derive(Debug, Clone, PartialEq)]
pub struct AnimatedTilemap {
    /// One entry per frame of the file.
    pub frames: Vec<TilemapFrame>,
    /// Distinct tilesets referenced by any frame, in first-use order. Use this
    /// to upload each tileset texture once.
    pub tilesets: Vec<TilesetId>,
}

/// Extract the tile grids of one frame.
pub fn build_tilemap(
    file: &AsepriteFile,
    frame: u32,
    options: &TilemapOptions,
) -> Result<Tilemap> {
    if frame >= file.num_frames() {
        return Err(AsepriteError::index_out_of_range(
            "Frame",
            frame,
            file.num_frames(),
        ));
    }
    let frame = extract_frame(file, frame, options);
    let mut tilesets = Vec::new();
    collect_tilesets(&frame, &mut tilesets);
    Ok(Tilemap { frame, tilesets })
}

/// Extract the tile grids of every frame.
pub fn build_animated_tilemap(
    file: &AsepriteFile,
    options: &TilemapOptions,
) -> Result<AnimatedTilemap> {
    let frames: Vec<TilemapFrame> = (0..file.num_frames())
        .map(|frame| extract_frame(file, frame, options))
        .collect();
    let mut tilesets = Vec::new();
    for frame in &frames {
        collect_tilesets(frame, &mut tilesets);
    }
    Ok(AnimatedTilemap { frames, tilesets })
}

fn collect_tilesets(frame: &TilemapFrame, tilesets: &mut Vec<TilesetId>) {
    for layer in &frame.layers {
        if !tilesets.contains(&layer.tileset_id) {
            tilesets.push(layer.tileset_id);
        }
    }
}

fn extract_frame(file: &AsepriteFile, frame: u32, options: &TilemapOptions) -> TilemapFrame {
    let mut layers = Vec::new();
    for layer in file.layers() {
        let tileset_id = match layer.layer_type() {
            LayerType::Tilemap(id) => id,
            LayerType::Image | LayerType::Group => continue,
        };
        if options.only_visible_layers && !layer.is_visible() {
            debug!("Skipping hidden tilemap layer '{}'", layer.name());
            continue;
        }
        let cel = match layer.frame(frame) {
            Ok(cel) => cel,
            Err(_) => continue,
        };
        let data = match cel.tilemap_data() {
            Some(data) => data,
            None => continue,
        };
        let columns = data.width() as u32;
        let rows = data.height() as u32;
        let mut tiles = Vec::with_capacity((columns * rows) as usize);
        for y in 0..data.height() {
            for x in 0..data.width() {
                tiles.push(*data.tile(x, y).unwrap_or(&EMPTY_TILE));
            }
        }
        layers.push(TilemapLayer {
            name: layer.name().to_owned(),
            layer_id: layer.id(),
            tileset_id,
            columns,
            rows,
            offset: cel.top_left(),
            opacity: mul_un8(cel.opacity() as i32, layer.opacity() as i32),
            tiles,
        });
    }
    TilemapFrame {
        frame,
        duration: file.frame_times[frame as usize] as u32,
        layers,
    }
}
