use crate::{
    pixel::{IndexResolver, Pixels},
    reader::AseReader,
    user_data::UserData,
    AsepriteError, PixelFormat, Result, TileId,
};
use bitflags::bitflags;
use image::RgbaImage;
use std::collections::HashMap;

/// An id for a [Tileset].
#[derive(Debug, PartialEq, Eq, Hash, Clone, Copy, PartialOrd, Ord)]
pub struct TilesetId(pub(crate) u32);

impl TilesetId {
    /// Create a new TilesetId over a raw u32 value.
    pub fn new(value: u32) -> Self {
        Self(value)
    }
    /// The underlying u32 value.
    pub fn value(&self) -> u32 {
        self.0
    }
}

bitflags! {
    struct TilesetFlags: u32 {
        // Include link to external file.
        const LINKS_EXTERNAL_FILE = 0x0001;
        // Include tiles inside this file.
        const FILE_INCLUDES_TILES = 0x0002;
        // Tilemaps using this tileset use tile ID=0 as empty tile. When
        // unset the empty tile is 0xffffffff (internal Aseprite versions).
        const EMPTY_TILE_IS_ID_ZERO = 0x0004;
    }
}

/// A reference to a tileset stored in another file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExternalTilesetReference {
    /// Id of the external file entry.
    pub external_file_id: u32,
    /// Id of the tileset inside the external file.
    pub tileset_id: TilesetId,
}

/// The size of a tile in pixels.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TileSize {
    width: u16,
    height: u16,
}

impl TileSize {
    /// Tile width in pixels.
    pub fn width(&self) -> u16 {
        self.width
    }
    /// Tile height in pixels.
    pub fn height(&self) -> u16 {
        self.height
    }
    pub(crate) fn pixels_per_tile(&self) -> usize {
        self.width as usize * self.height as usize
    }
}

impl From<TileSize> for (u32, u32) {
    fn from(size: TileSize) -> Self {
        (size.width as u32, size.height as u32)
    }
}

/// A set of equally sized tiles referenced by tilemap layers.
///
/// The tile images are stored as one vertical strip: tile `i` occupies the
/// rows `i * tile_height .. (i + 1) * tile_height`.
#[derive(Debug)]
pub struct Tileset {
    pub(crate) id: TilesetId,
    pub(crate) empty_tile_is_id_zero: bool,
    pub(crate) tile_count: u32,
    pub(crate) tile_size: TileSize,
    pub(crate) base_index: i16,
    pub(crate) name: String,
    pub(crate) external_file: Option<ExternalTilesetReference>,
    pub(crate) user_data: Option<UserData>,
    // Only set while parsing; replaced by `image` once the palette is known.
    pub(crate) pixels: Option<Pixels>,
    pub(crate) image: Option<RgbaImage>,
}

impl Tileset {
    /// Tileset id.
    pub fn id(&self) -> TilesetId {
        self.id
    }
    /// When true, tilemaps using this tileset use tile ID=0 as empty tile.
    /// Otherwise the empty tile has all id bits set.
    pub fn empty_tile_is_id_zero(&self) -> bool {
        self.empty_tile_is_id_zero
    }
    /// Returns `true` if `id` draws nothing with this tileset.
    pub fn is_empty_tile(&self, id: TileId) -> bool {
        (self.empty_tile_is_id_zero && id.0 == 0) || id.0 >= self.tile_count
    }
    /// Number of tiles.
    pub fn tile_count(&self) -> u32 {
        self.tile_count
    }
    /// Tile width and height.
    pub fn tile_size(&self) -> TileSize {
        self.tile_size
    }
    /// Number to show in the UI for the tile with index=0. Default is 1.
    /// Only used for Aseprite UI purposes. Not used for data representation.
    pub fn base_index(&self) -> i16 {
        self.base_index
    }
    /// Tileset name. May not be unique among tilesets.
    pub fn name(&self) -> &str {
        &self.name
    }
    /// When Some, the tileset links to an external file.
    pub fn external_file(&self) -> Option<&ExternalTilesetReference> {
        self.external_file.as_ref()
    }
    /// The tileset's user data, if any is present.
    pub fn user_data(&self) -> Option<&UserData> {
        self.user_data.as_ref()
    }

    /// All tiles as one vertical strip image. `None` if the tiles live in an
    /// external file.
    pub fn image(&self) -> Option<&RgbaImage> {
        self.image.as_ref()
    }

    /// A copy of a single tile's pixels.
    pub fn tile_image(&self, tile_index: u32) -> Option<RgbaImage> {
        let strip = self.image.as_ref()?;
        if tile_index >= self.tile_count {
            return None;
        }
        let (w, h): (u32, u32) = self.tile_size.into();
        let y0 = tile_index * h;
        let mut tile = RgbaImage::new(w, h);
        for y in 0..h {
            for x in 0..w {
                tile.put_pixel(x, y, *strip.get_pixel(x, y0 + y));
            }
        }
        Some(tile)
    }

    pub(crate) fn resolve_pixels(&mut self, resolver: &IndexResolver) -> Result<()> {
        if let Some(pixels) = self.pixels.take() {
            let (w, h): (u32, u32) = self.tile_size.into();
            let strip_height = h.checked_mul(self.tile_count).ok_or_else(|| {
                AsepriteError::InvalidInput(format!(
                    "Tileset {} is too large: {} tiles of height {}",
                    self.id.0, self.tile_count, h
                ))
            })?;
            let image = pixels.to_image(w, strip_height, resolver)?;
            self.image = Some(image);
        }
        Ok(())
    }

    pub(crate) fn parse_chunk(data: &[u8], pixel_format: PixelFormat) -> Result<Tileset> {
        let mut reader = AseReader::new(data);
        let id = reader.dword().map(TilesetId)?;
        let flags = TilesetFlags::from_bits_truncate(reader.dword()?);
        let empty_tile_is_id_zero = flags.contains(TilesetFlags::EMPTY_TILE_IS_ID_ZERO);
        let tile_count = reader.dword()?;
        let tile_width = reader.word()?;
        let tile_height = reader.word()?;
        let tile_size = TileSize {
            width: tile_width,
            height: tile_height,
        };
        let base_index = reader.short()?;
        reader.skip_bytes(14)?;
        let name = reader.string()?;
        let external_file = if flags.contains(TilesetFlags::LINKS_EXTERNAL_FILE) {
            let external_file_id = reader.dword()?;
            let tileset_id = reader.dword().map(TilesetId)?;
            Some(ExternalTilesetReference {
                external_file_id,
                tileset_id,
            })
        } else {
            None
        };
        let pixels = if flags.contains(TilesetFlags::FILE_INCLUDES_TILES) {
            let _compressed_length = reader.dword()?;
            let expected_pixel_count = tile_count as usize * tile_size.pixels_per_tile();
            Some(Pixels::from_compressed(
                reader,
                pixel_format,
                expected_pixel_count,
            )?)
        } else {
            None
        };
        Ok(Tileset {
            id,
            empty_tile_is_id_zero,
            tile_count,
            tile_size,
            base_index,
            name,
            external_file,
            user_data: None,
            pixels,
            image: None,
        })
    }
}

/// All tilesets of a file in the order they were declared.
#[derive(Debug, Default)]
pub struct TilesetsById {
    tilesets: Vec<Tileset>,
    by_id: HashMap<TilesetId, usize>,
}

impl TilesetsById {
    pub(crate) fn add(&mut self, tileset: Tileset) -> Result<()> {
        if self.by_id.contains_key(&tileset.id) {
            return Err(AsepriteError::InvalidInput(format!(
                "Duplicate tileset id: {}",
                tileset.id.0
            )));
        }
        self.by_id.insert(tileset.id, self.tilesets.len());
        self.tilesets.push(tileset);
        Ok(())
    }

    /// Number of tilesets.
    pub fn len(&self) -> usize {
        self.tilesets.len()
    }

    /// Returns `true` if the file has no tilesets.
    pub fn is_empty(&self) -> bool {
        self.tilesets.is_empty()
    }

    /// Get a reference to a [Tileset] from a [TilesetId], if the entry exists.
    pub fn get(&self, id: TilesetId) -> Option<&Tileset> {
        self.by_id.get(&id).map(|&index| &self.tilesets[index])
    }

    /// Tileset by declaration order.
    pub fn get_index(&self, index: usize) -> Option<&Tileset> {
        self.tilesets.get(index)
    }

    /// Iterate over all tilesets in declaration order.
    pub fn iter(&self) -> std::slice::Iter<'_, Tileset> {
        self.tilesets.iter()
    }

    pub(crate) fn last_mut(&mut self) -> Option<&mut Tileset> {
        self.tilesets.last_mut()
    }

    pub(crate) fn resolve_pixels(&mut self, resolver: &IndexResolver) -> Result<()> {
        for tileset in &mut self.tilesets {
            tileset.resolve_pixels(resolver)?;
        }
        Ok(())
    }
}
