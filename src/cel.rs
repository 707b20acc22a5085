use crate::layer::{LayerType, LayersData};
use crate::pixel::{IndexResolver, Pixels};
use crate::reader::AseReader;
use crate::tilemap::TilemapData;
use crate::user_data::UserData;
use crate::{AsepriteError, AsepriteFile, ColorPalette, Layer, PixelFormat, Result};

use image::RgbaImage;
use std::fmt;
use std::io::Read;
use std::sync::Arc;

/// A reference to a single Cel. A cel contains the image data at a specific
/// layer and frame. In the timeline view these are the dots.
///
/// You can get a `cel` by going either via frame then layer or vice versa.
///
/// [Official docs for cels](https://www.aseprite.org/docs/cel/).
#[derive(Debug, Clone, Copy)]
pub struct Cel<'a> {
    pub(crate) file: &'a AsepriteFile,
    pub(crate) cel_id: CelId,
}

/// What a cel contains.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CelKind {
    /// No cel exists at this frame and layer.
    Empty,
    /// Pixel data.
    Image,
    /// Shares the content of the cel at the same layer in another frame.
    Linked {
        /// The frame holding the shared content.
        frame: u32,
    },
    /// Tile indices into the layer's tileset.
    Tilemap,
}

/// Sub-pixel position and size of a cel, set when the cel was transformed
/// in Aseprite.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PreciseBounds {
    #[allow(missing_docs)]
    pub x: f64,
    #[allow(missing_docs)]
    pub y: f64,
    #[allow(missing_docs)]
    pub width: f64,
    #[allow(missing_docs)]
    pub height: f64,
}

impl<'a> Cel<'a> {
    pub(crate) fn raw_cel(&self) -> Option<&'a RawCel> {
        self.file.framedata.cel(self.cel_id)
    }

    /// Frame of this cel.
    pub fn frame(&self) -> u32 {
        self.cel_id.frame as u32
    }

    /// Layer of this cel.
    pub fn layer(&self) -> Layer<'a> {
        Layer {
            file: self.file,
            layer_id: self.cel_id.layer as u32,
        }
    }

    /// This cel as an image. Result has the same dimensions as the [AsepriteFile].
    /// If the cel is empty, all image pixels will be transparent.
    pub fn image(&self) -> RgbaImage {
        crate::flatten::cel_image(self.file, self.cel_id)
    }

    /// The cel's own pixels (cel-sized, not canvas-sized). `None` for empty
    /// and tilemap cels.
    pub fn raw_image(&self) -> Option<&'a RgbaImage> {
        match self.raw_cel()?.content.as_ref() {
            CelContent::Image(image) => Some(image),
            CelContent::Tilemap(_) => None,
        }
    }

    /// Returns `true` if the cel contains no data.
    pub fn is_empty(&self) -> bool {
        self.raw_cel().is_none()
    }

    /// Returns `true` if the cel contains tile indices (directly or through
    /// a link).
    pub fn is_tilemap(&self) -> bool {
        self.raw_cel()
            .map(|c| matches!(c.content.as_ref(), CelContent::Tilemap(_)))
            .unwrap_or(false)
    }

    /// What this cel contains.
    pub fn kind(&self) -> CelKind {
        match self.raw_cel() {
            None => CelKind::Empty,
            Some(RawCel {
                linked_frame: Some(frame),
                ..
            }) => CelKind::Linked {
                frame: *frame as u32,
            },
            Some(cel) => match cel.content.as_ref() {
                CelContent::Image(_) => CelKind::Image,
                CelContent::Tilemap(_) => CelKind::Tilemap,
            },
        }
    }

    /// Position of the cel's top-left corner on the canvas. `(0, 0)` for
    /// empty cels.
    pub fn top_left(&self) -> (i32, i32) {
        self.raw_cel()
            .map(|c| (c.common.x as i32, c.common.y as i32))
            .unwrap_or((0, 0))
    }

    /// Cel opacity. 0 for empty cels.
    pub fn opacity(&self) -> u8 {
        self.raw_cel().map(|c| c.common.opacity).unwrap_or(0)
    }

    /// Z-index offset relative to the layer order.
    pub fn z_index(&self) -> i16 {
        self.raw_cel().map(|c| c.common.z_index).unwrap_or(0)
    }

    /// Sub-pixel bounds, if set.
    pub fn precise_bounds(&self) -> Option<PreciseBounds> {
        self.raw_cel().and_then(|c| c.precise_bounds)
    }

    /// Returns the cel's user data, if any is present.
    pub fn user_data(&self) -> Option<&'a UserData> {
        self.raw_cel().and_then(|c| c.user_data.as_ref())
    }

    pub(crate) fn tilemap_data(&self) -> Option<&'a TilemapData> {
        match self.raw_cel()?.content.as_ref() {
            CelContent::Tilemap(tilemap) => Some(tilemap),
            CelContent::Image(_) => None,
        }
    }
}

/// Organizes all Cels into a 2d array.
pub(crate) struct CelsData<C> {
    // Mapping: frame_id -> layer_id -> Option<C>
    data: Vec<Vec<Option<C>>>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct CelId {
    pub frame: u16,
    pub layer: u16,
}

impl fmt::Display for CelId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "CelId(F{},L{})", self.frame, self.layer)
    }
}

impl<C: fmt::Debug> fmt::Debug for CelsData<C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut d = f.debug_map();
        for (frame, layers) in self.data.iter().enumerate() {
            for (layer, cel) in layers.iter().enumerate() {
                if let Some(ref cel) = cel {
                    d.entry(
                        &CelId {
                            frame: frame as u16,
                            layer: layer as u16,
                        },
                        cel,
                    );
                }
            }
        }
        d.finish()
    }
}

impl<C> CelsData<C> {
    pub(crate) fn new(num_frames: u32) -> Self {
        let mut data = Vec::with_capacity(num_frames as usize);
        data.resize_with(num_frames as usize, Vec::new);
        CelsData { data }
    }

    fn check_valid_frame_id(&self, frame_id: u16) -> Result<()> {
        if (frame_id as usize) >= self.data.len() {
            return Err(AsepriteError::InvalidInput(format!(
                "Invalid frame reference in Cel: {}",
                frame_id
            )));
        }
        Ok(())
    }

    fn insert(&mut self, cel_id: CelId, cel: C) -> Result<()> {
        self.check_valid_frame_id(cel_id.frame)?;
        let CelId { frame, layer } = cel_id;
        let layers = &mut self.data[frame as usize];
        if layers.len() <= layer as usize {
            layers.resize_with(layer as usize + 1, || None);
        }
        if layers[layer as usize].is_some() {
            return Err(AsepriteError::InvalidInput(format!(
                "Multiple Cels for frame {}, layer {}",
                frame, layer
            )));
        }
        layers[layer as usize] = Some(cel);
        Ok(())
    }

    /// All non-empty cels of a frame in layer order.
    pub(crate) fn frame_cels(&self, frame_id: u16) -> impl Iterator<Item = (u32, &C)> {
        self.data[frame_id as usize]
            .iter()
            .enumerate()
            .filter_map(|(layer_id, cel)| cel.as_ref().map(|c| (layer_id as u32, c)))
    }

    // Frame ID must be valid. If Layer ID is out of bounds always returns
    // None.
    pub(crate) fn cel(&self, cel_id: CelId) -> Option<&C> {
        let CelId { frame, layer } = cel_id;
        self.data[frame as usize]
            .get(layer as usize)
            .and_then(|c| c.as_ref())
    }

    pub(crate) fn cel_mut(&mut self, cel_id: CelId) -> Option<&mut C> {
        let CelId { frame, layer } = cel_id;
        self.data
            .get_mut(frame as usize)?
            .get_mut(layer as usize)
            .and_then(|c| c.as_mut())
    }
}

impl CelsData<ParsedCel> {
    pub(crate) fn add_cel(&mut self, frame_id: u16, cel: ParsedCel) -> Result<()> {
        let cel_id = CelId {
            frame: frame_id,
            layer: cel.common.layer_index,
        };
        self.insert(cel_id, cel)
    }

    fn validate_cel(&self, cel_id: CelId, cel: &ParsedCel, layers: &LayersData) -> Result<()> {
        let layer = layers.get(cel_id.layer as u32).ok_or_else(|| {
            AsepriteError::InvalidInput(format!(
                "Cel (f:{},l:{}) references missing layer",
                cel_id.frame, cel_id.layer
            ))
        })?;
        match &cel.content {
            ParsedContent::Image { .. } => {
                if layer.layer_type == LayerType::Group {
                    return Err(AsepriteError::InvalidInput(format!(
                        "Invalid cel. Image Cel (f:{},l:{}) inside group layer.",
                        cel_id.frame, cel_id.layer
                    )));
                }
            }
            ParsedContent::Linked(other_frame) => {
                let other = CelId {
                    frame: *other_frame,
                    layer: cel_id.layer,
                };
                let other_cel = if (*other_frame as usize) < self.data.len() {
                    self.cel(other)
                } else {
                    None
                };
                match other_cel {
                    Some(ParsedCel {
                        content: ParsedContent::Linked(_),
                        ..
                    }) => {
                        return Err(AsepriteError::InvalidInput(format!(
                            "Invalid Cel reference. Cel {} links to cel {} but that cel links to another cel.",
                            cel_id, other
                        )))
                    }
                    Some(_) => {}
                    None => {
                        return Err(AsepriteError::InvalidInput(format!(
                            "Invalid Cel reference. Cel {} links to cel {} but that cel contains no data.",
                            cel_id, other
                        )))
                    }
                }
            }
            ParsedContent::Empty => {}
            ParsedContent::Tilemap(_) => {
                // Verify that a Tilemap cel belongs to a Tilemap layer.
                if let LayerType::Tilemap(_) = layer.layer_type {
                    // Tilemap Layer, ok
                } else {
                    return Err(AsepriteError::InvalidInput(format!(
                        "Invalid cel. Tilemap Cel (f:{},l:{}) outside of tilemap layer.",
                        cel_id.frame, cel_id.layer
                    )));
                }
            }
        }
        Ok(())
    }

    /// Check all references, resolve pixels to RGBA and let linked cels
    /// share the content of the cel they link to.
    pub(crate) fn resolve(
        self,
        layers: &LayersData,
        palette: Option<&ColorPalette>,
        pixel_format: PixelFormat,
    ) -> Result<CelsData<RawCel>> {
        for (frame, by_layer) in self.data.iter().enumerate() {
            for (layer, cel) in by_layer.iter().enumerate() {
                if let Some(cel) = cel {
                    let cel_id = CelId {
                        frame: frame as u16,
                        layer: layer as u16,
                    };
                    self.validate_cel(cel_id, cel, layers)?;
                }
            }
        }

        let transparent_color_index = pixel_format.transparent_color_index().unwrap_or(0);
        let num_frames = self.data.len();

        // Own content first, links second. Links never point at links.
        let mut staged: Vec<Vec<Option<(ParsedCel, Option<Arc<CelContent>>)>>> =
            Vec::with_capacity(num_frames);
        for by_layer in self.data {
            let mut row = Vec::with_capacity(by_layer.len());
            for (layer, cel) in by_layer.into_iter().enumerate() {
                let mut cel = match cel {
                    Some(cel) => cel,
                    None => {
                        row.push(None);
                        continue;
                    }
                };
                let content = match std::mem::replace(&mut cel.content, ParsedContent::Empty) {
                    ParsedContent::Image { size, pixels } => {
                        let resolver = IndexResolver {
                            palette,
                            transparent_color_index,
                            layer_is_background: layers[layer as u32].is_background(),
                        };
                        let image =
                            pixels.to_image(size.width as u32, size.height as u32, &resolver)?;
                        Some(Arc::new(CelContent::Image(image)))
                    }
                    ParsedContent::Tilemap(tilemap) => Some(Arc::new(CelContent::Tilemap(tilemap))),
                    linked => {
                        cel.content = linked;
                        None
                    }
                };
                row.push(Some((cel, content)));
            }
            staged.push(row);
        }

        let mut result = CelsData::new(num_frames as u32);
        for frame in 0..num_frames {
            for layer in 0..staged[frame].len() {
                let (content, linked_frame) = match &staged[frame][layer] {
                    None => continue,
                    Some((_, Some(content))) => (content.clone(), None),
                    Some((ParsedCel {
                        content: ParsedContent::Linked(other),
                        ..
                    }, None)) => {
                        let other = *other;
                        let shared = staged[other as usize][layer]
                            .as_ref()
                            .and_then(|(_, content)| content.clone())
                            .ok_or_else(|| {
                                AsepriteError::InternalError(format!(
                                    "Linked cel (f:{},l:{}) lost its source",
                                    frame, layer
                                ))
                            })?;
                        (shared, Some(other))
                    }
                    Some((_, None)) => {
                        return Err(AsepriteError::InternalError(format!(
                            "Missing resolved content for cel (f:{},l:{})",
                            frame, layer
                        )))
                    }
                };
                let cel = match &staged[frame][layer] {
                    Some((cel, _)) => cel,
                    None => continue,
                };
                let cel_id = CelId {
                    frame: frame as u16,
                    layer: layer as u16,
                };
                result.insert(
                    cel_id,
                    RawCel {
                        common: cel.common,
                        content,
                        linked_frame,
                        precise_bounds: cel.precise_bounds,
                        user_data: cel.user_data.clone(),
                    },
                )?;
            }
        }
        Ok(result)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct ImageSize {
    pub width: u16,
    pub height: u16,
}

impl ImageSize {
    pub(crate) fn parse<R: Read>(reader: &mut AseReader<R>) -> Result<Self> {
        let width = reader.word()?;
        let height = reader.word()?;
        Ok(Self { width, height })
    }

    pub(crate) fn pixel_count(&self) -> usize {
        self.width as usize * self.height as usize
    }
}

// CelCommon holds fields which are common to all cel types.
#[derive(Debug, Clone, Copy)]
pub(crate) struct CelCommon {
    pub layer_index: u16,
    pub x: i16,
    pub y: i16,
    pub opacity: u8,
    pub z_index: i16,
}

impl CelCommon {
    fn parse<R: Read>(reader: &mut AseReader<R>) -> Result<Self> {
        let layer_index = reader.word()?;
        let x = reader.short()?;
        let y = reader.short()?;
        let opacity = reader.byte()?;
        Ok(Self {
            layer_index,
            x,
            y,
            opacity,
            z_index: 0,
        })
    }
}

// Cel content as stored in the file, before palette and link resolution.
pub(crate) enum ParsedContent {
    // Placeholder left behind while content is moved out during resolution.
    Empty,
    Image { size: ImageSize, pixels: Pixels },
    Linked(u16),
    Tilemap(TilemapData),
}

impl fmt::Debug for ParsedContent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ParsedContent::Image { size, pixels } => write!(
                f,
                "Image({}x{}, <{} bytes>)",
                size.width,
                size.height,
                pixels.byte_count()
            ),
            ParsedContent::Linked(frame) => write!(f, "Linked({})", frame),
            ParsedContent::Empty => write!(f, "Empty"),
            ParsedContent::Tilemap(tilemap) => write!(f, "{:?}", tilemap),
        }
    }
}

impl ParsedContent {
    fn parse<R: Read>(
        mut reader: AseReader<R>,
        pixel_format: PixelFormat,
        cel_type: u16,
    ) -> Result<Self> {
        match cel_type {
            0 => {
                let size = ImageSize::parse(&mut reader)?;
                let pixels = Pixels::from_raw(reader, pixel_format, size.pixel_count())?;
                Ok(ParsedContent::Image { size, pixels })
            }
            1 => reader.word().map(ParsedContent::Linked),
            2 => {
                let size = ImageSize::parse(&mut reader)?;
                let pixels = Pixels::from_compressed(reader, pixel_format, size.pixel_count())?;
                Ok(ParsedContent::Image { size, pixels })
            }
            3 => TilemapData::parse_chunk(reader).map(ParsedContent::Tilemap),
            _ => Err(AsepriteError::UnsupportedFeature(format!(
                "Invalid/Unsupported Cel type: {}",
                cel_type
            ))),
        }
    }
}

#[derive(Debug)]
pub(crate) struct ParsedCel {
    pub common: CelCommon,
    pub content: ParsedContent,
    pub precise_bounds: Option<PreciseBounds>,
    pub user_data: Option<UserData>,
}

/// Decoded cel content. Shared between a cel and all cels linking to it.
#[derive(Debug)]
pub(crate) enum CelContent {
    Image(RgbaImage),
    Tilemap(TilemapData),
}

#[derive(Debug)]
pub(crate) struct RawCel {
    pub common: CelCommon,
    pub content: Arc<CelContent>,
    pub linked_frame: Option<u16>,
    pub precise_bounds: Option<PreciseBounds>,
    pub user_data: Option<UserData>,
}

pub(crate) fn parse_chunk(data: &[u8], pixel_format: PixelFormat) -> Result<ParsedCel> {
    let mut reader = AseReader::new(data);
    let mut common = CelCommon::parse(&mut reader)?;
    let cel_type = reader.word()?;
    common.z_index = reader.short()?;
    reader.skip_bytes(5)?;

    let content = ParsedContent::parse(reader, pixel_format, cel_type)?;
    Ok(ParsedCel {
        common,
        content,
        precise_bounds: None,
        user_data: None,
    })
}

/// Parse a cel extra chunk (0x2006). Returns `None` unless the precise
/// bounds flag is set.
pub(crate) fn parse_extra_chunk(data: &[u8]) -> Result<Option<PreciseBounds>> {
    let mut reader = AseReader::new(data);
    let flags = reader.dword()?;
    let x = reader.fixed()?;
    let y = reader.fixed()?;
    let width = reader.fixed()?;
    let height = reader.fixed()?;
    if flags & 1 == 0 {
        return Ok(None);
    }
    Ok(Some(PreciseBounds {
        x,
        y,
        width,
        height,
    }))
}
