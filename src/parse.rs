use crate::cel::{CelId, CelsData, ParsedCel};
use crate::file::{Grid, HeaderFlags};
use crate::layer::{LayerData, LayersData};
use crate::palette::ColorPalette;
use crate::pixel::IndexResolver;
use crate::reader::AseReader;
use crate::slice::Slice;
use crate::tileset::{Tileset, TilesetsById};
use crate::user_data::UserData;
use crate::{AsepriteError, AsepriteFile, PixelFormat};
use log::{debug, trace, warn};
use std::io::Read;

use crate::Result;
use crate::{cel, color_profile, layer, palette, slice, tags, user_data, Tag};

// LayerParseInfo holds Layer data during file parsing.
enum LayerParseInfo {
    // While in progress, parsed layers are pushed onto the vec.
    InProgress(Vec<LayerData>),
    // After frame 0 the layers are moved into LayersData and frozen.
    Finished(LayersData),
}

impl LayerParseInfo {
    fn new() -> Self {
        Self::InProgress(Vec::new())
    }

    fn finalize(self) -> Result<Self> {
        match self {
            Self::InProgress(layers) => layer::collect_layers(layers).map(Self::Finished),
            Self::Finished(_) => Err(AsepriteError::InternalError(
                "Attempted to collect already Finished layer data.".into(),
            )),
        }
    }

    fn is_finished(&self) -> bool {
        matches!(self, Self::Finished(_))
    }

    fn into_inner(self) -> Option<LayersData> {
        if let Self::Finished(layers_data) = self {
            Some(layers_data)
        } else {
            None
        }
    }

    fn layer_mut(&mut self, index: u32) -> Option<&mut LayerData> {
        let index = index as usize;
        match self {
            LayerParseInfo::InProgress(vec) => vec.get_mut(index),
            LayerParseInfo::Finished(data) => data.layers.get_mut(index),
        }
    }
}

// The entity the next user data chunk attaches to.
#[derive(Debug, Clone, Copy)]
enum UserDataContext {
    Sprite,
    LayerIndex(u32),
    CelId(CelId),
    TagIndex(u16),
    SliceIndex(u32),
    TilesetIndex(u32),
    // The previous chunk was skipped; drop its user data too.
    Skipped,
}

struct Header {
    num_frames: u16,
    width: u16,
    height: u16,
    flags: HeaderFlags,
    default_frame_time: u16,
    pixel_format: PixelFormat,
    pixel_ratio: (u8, u8),
    grid: Grid,
}

impl Header {
    fn parse<R: Read>(reader: &mut AseReader<R>) -> Result<Self> {
        let _size = reader.dword()?;
        let magic_number = reader.word()?;
        if magic_number != 0xA5E0 {
            return Err(AsepriteError::InvalidInput(format!(
                "Invalid magic number for header: {:x} != {:x}",
                magic_number, 0xA5E0
            )));
        }

        let num_frames = reader.word()?;
        let width = reader.word()?;
        let height = reader.word()?;
        let color_depth = reader.word()?;
        let flags = HeaderFlags::from_bits_truncate(reader.dword()?);
        let default_frame_time = reader.word()?;
        let _placeholder1 = reader.dword()?;
        let _placeholder2 = reader.dword()?;
        let transparent_color_index = reader.byte()?;
        reader.skip_bytes(3)?;
        let _num_colors = reader.word()?;
        let pixel_width = reader.byte()?;
        let pixel_height = reader.byte()?;
        let grid_x = reader.short()?;
        let grid_y = reader.short()?;
        let grid_width = reader.word()?;
        let grid_height = reader.word()?;
        reader.skip_bytes(84)?;

        let pixel_format = parse_pixel_format(color_depth, transparent_color_index)?;
        // Older files store 0:0, meaning square pixels.
        let pixel_ratio = if pixel_width == 0 || pixel_height == 0 {
            (1, 1)
        } else {
            (pixel_width, pixel_height)
        };

        Ok(Header {
            num_frames,
            width,
            height,
            flags,
            default_frame_time,
            pixel_format,
            pixel_ratio,
            grid: Grid {
                x: grid_x,
                y: grid_y,
                width: grid_width,
                height: grid_height,
            },
        })
    }
}

struct ParseInfo {
    palette: Option<ColorPalette>,
    old_palette: Option<ColorPalette>,
    color_profile: Option<color_profile::ColorProfile>,
    layers: LayerParseInfo,
    framedata: CelsData<ParsedCel>,
    frame_times: Vec<u16>,
    tags: Option<Vec<Tag>>,
    tilesets: TilesetsById,
    sprite_user_data: Option<UserData>,
    user_data_context: Option<UserDataContext>,
    last_cel: Option<CelId>,
    slices: Vec<Slice>,
}

impl ParseInfo {
    fn new(num_frames: u16, default_frame_time: u16) -> Self {
        Self {
            palette: None,
            old_palette: None,
            color_profile: None,
            layers: LayerParseInfo::new(),
            framedata: CelsData::new(num_frames as u32),
            frame_times: vec![default_frame_time; num_frames as usize],
            tags: None,
            tilesets: TilesetsById::default(),
            sprite_user_data: None,
            user_data_context: None,
            last_cel: None,
            slices: Vec::new(),
        }
    }

    fn add_cel(&mut self, frame_id: u16, cel: ParsedCel) -> Result<()> {
        let cel_id = CelId {
            frame: frame_id,
            layer: cel.common.layer_index,
        };
        self.framedata.add_cel(frame_id, cel)?;
        self.user_data_context = Some(UserDataContext::CelId(cel_id));
        self.last_cel = Some(cel_id);
        Ok(())
    }

    fn add_layer(&mut self, layer_data: LayerData) {
        match &mut self.layers {
            LayerParseInfo::InProgress(layers) => {
                let idx = layers.len();
                layers.push(layer_data);
                self.user_data_context = Some(UserDataContext::LayerIndex(idx as u32));
            }
            LayerParseInfo::Finished(_) => {
                debug!("Ignoring layer '{}' outside of frame 0", layer_data.name);
                self.user_data_context = Some(UserDataContext::Skipped);
            }
        }
    }

    fn add_tags(&mut self, tags: Vec<Tag>) {
        self.tags = Some(tags);
        self.user_data_context = Some(UserDataContext::TagIndex(0));
    }

    fn add_slice(&mut self, slice: Slice) {
        let context_idx = self.slices.len();
        self.slices.push(slice);
        self.user_data_context = Some(UserDataContext::SliceIndex(context_idx as u32));
    }

    fn add_tileset(&mut self, tileset: Tileset) -> Result<()> {
        let context_idx = self.tilesets.len();
        self.tilesets.add(tileset)?;
        self.user_data_context = Some(UserDataContext::TilesetIndex(context_idx as u32));
        Ok(())
    }

    fn set_precise_bounds(&mut self, bounds: Option<cel::PreciseBounds>) {
        let cel = self.last_cel.and_then(|id| self.framedata.cel_mut(id));
        match cel {
            Some(cel) => cel.precise_bounds = bounds,
            None => debug!("Ignoring cel extra chunk without a preceding cel"),
        }
    }

    fn set_tag_user_data(&mut self, user_data: UserData, tag_index: u16) -> Result<()> {
        let tags = self.tags.as_mut().ok_or_else(|| {
            AsepriteError::InternalError(
                "No tags data found when resolving Tags chunk context".into(),
            )
        })?;
        let count = tags.len();
        let tag = tags.get_mut(tag_index as usize).ok_or_else(|| {
            AsepriteError::InvalidInput(format!(
                "User data for tag {} but only {} tags exist",
                tag_index, count
            ))
        })?;
        tag.set_user_data(user_data);
        self.user_data_context = Some(UserDataContext::TagIndex(tag_index + 1));
        Ok(())
    }

    fn add_user_data(&mut self, user_data: UserData) -> Result<()> {
        let user_data_context = self.user_data_context.ok_or_else(|| {
            AsepriteError::InvalidInput(
                "Found dangling user data chunk. Expected a previous chunk to attach user data"
                    .into(),
            )
        })?;
        match user_data_context {
            UserDataContext::Sprite => {
                self.sprite_user_data = Some(user_data);
            }
            UserDataContext::LayerIndex(layer_index) => {
                let layer = self.layers.layer_mut(layer_index).ok_or_else(|| {
                    AsepriteError::InternalError(format!(
                        "Invalid layer id stored in chunk context: {}",
                        layer_index
                    ))
                })?;
                layer.user_data = Some(user_data);
            }
            UserDataContext::CelId(cel_id) => {
                let cel = self.framedata.cel_mut(cel_id).ok_or_else(|| {
                    AsepriteError::InternalError(format!(
                        "Invalid cel id stored in chunk context: {}",
                        cel_id
                    ))
                })?;
                cel.user_data = Some(user_data);
            }
            UserDataContext::TagIndex(tag_index) => {
                self.set_tag_user_data(user_data, tag_index)?;
            }
            UserDataContext::SliceIndex(slice_idx) => {
                let slice = self.slices.get_mut(slice_idx as usize).ok_or_else(|| {
                    AsepriteError::InternalError(format!(
                        "Invalid slice index stored in chunk context: {}",
                        slice_idx
                    ))
                })?;
                slice.user_data = Some(user_data);
            }
            UserDataContext::TilesetIndex(tileset_idx) => {
                let tileset = self.tilesets.last_mut().ok_or_else(|| {
                    AsepriteError::InternalError(format!(
                        "Invalid tileset index stored in chunk context: {}",
                        tileset_idx
                    ))
                })?;
                tileset.user_data = Some(user_data);
            }
            UserDataContext::Skipped => {
                debug!("Dropping user data of a skipped chunk");
            }
        }
        Ok(())
    }

    fn finalize_layers(&mut self) -> Result<()> {
        let layers = std::mem::replace(&mut self.layers, LayerParseInfo::new());
        self.layers = layers.finalize()?;
        Ok(())
    }

    fn apply_chunk(
        &mut self,
        frame_id: u16,
        chunk_type: ChunkType,
        data: &[u8],
        header: &Header,
    ) -> Result<()> {
        match chunk_type {
            ChunkType::ColorProfile => {
                let profile = color_profile::parse_chunk(data)?;
                self.color_profile = Some(profile);
            }
            ChunkType::Palette => {
                let palette = self.palette.get_or_insert_with(ColorPalette::default);
                palette::apply_chunk(palette, data)?;
                if frame_id == 0 {
                    self.user_data_context = Some(UserDataContext::Sprite);
                }
            }
            ChunkType::OldPalette04 | ChunkType::OldPalette11 => {
                let palette = self.old_palette.get_or_insert_with(ColorPalette::default);
                let six_bit_channels = chunk_type == ChunkType::OldPalette11;
                palette::apply_old_chunk(palette, data, six_bit_channels)?;
                if frame_id == 0 {
                    self.user_data_context = Some(UserDataContext::Sprite);
                }
            }
            ChunkType::Layer => {
                let opacity_is_valid = header.flags.contains(HeaderFlags::LAYER_OPACITY_VALID);
                let layer_data = layer::parse_chunk(data, opacity_is_valid)?;
                self.add_layer(layer_data);
            }
            ChunkType::Cel => {
                let cel = cel::parse_chunk(data, header.pixel_format)?;
                self.add_cel(frame_id, cel)?;
            }
            ChunkType::CelExtra => {
                let bounds = cel::parse_extra_chunk(data)?;
                self.set_precise_bounds(bounds);
            }
            ChunkType::Tags => {
                let tags = tags::parse_chunk(data)?;
                if frame_id == 0 {
                    self.add_tags(tags);
                } else {
                    debug!("Ignoring tags outside of frame 0");
                    self.user_data_context = Some(UserDataContext::Skipped);
                }
            }
            ChunkType::Slice => {
                let slice = slice::parse_chunk(data)?;
                self.add_slice(slice);
            }
            ChunkType::UserData => {
                let user_data = user_data::parse_chunk(data)?;
                self.add_user_data(user_data)?;
            }
            ChunkType::Tileset => {
                let tileset = Tileset::parse_chunk(data, header.pixel_format)?;
                self.add_tileset(tileset)?;
            }
            ChunkType::ExternalFiles | ChunkType::Mask | ChunkType::Path => {
                debug!("Ignoring chunk type: {:?}", chunk_type);
            }
            ChunkType::Unknown(code) => {
                debug!(
                    "Skipping unknown chunk type 0x{:04x} ({} bytes)",
                    code,
                    data.len()
                );
            }
        }
        Ok(())
    }
}

// file format docs: https://github.com/aseprite/aseprite/blob/master/docs/ase-file-specs.md
pub(crate) fn read_aseprite<R: Read>(mut input: R) -> Result<AsepriteFile> {
    let mut bytes = Vec::new();
    input.read_to_end(&mut bytes)?;
    let mut reader = AseReader::new(&bytes);

    let header = Header::parse(&mut reader)?;
    trace!("Header parsed, first frame at byte {}", reader.position());
    debug!(
        "Aseprite header: {}x{}, {} frames, {:?}",
        header.width, header.height, header.num_frames, header.pixel_format
    );

    let mut parse_info = ParseInfo::new(header.num_frames, header.default_frame_time);

    for frame_id in 0..header.num_frames {
        parse_frame(&mut reader, frame_id, &header, &mut parse_info)?;
    }
    if !parse_info.layers.is_finished() {
        parse_info.finalize_layers()?;
    }

    let ParseInfo {
        palette,
        old_palette,
        color_profile,
        layers,
        framedata,
        frame_times,
        tags,
        mut tilesets,
        sprite_user_data,
        slices,
        ..
    } = parse_info;

    let layers = layers
        .into_inner()
        .ok_or_else(|| AsepriteError::InternalError("Layers were not finalized".into()))?;
    let palette = palette.or(old_palette);
    let tags = tags.unwrap_or_default();
    for tag in &tags {
        tag.validate(header.num_frames as u32)?;
    }
    layers.validate(&tilesets)?;

    let transparent_color_index = header.pixel_format.transparent_color_index().unwrap_or(0);
    tilesets.resolve_pixels(&IndexResolver {
        palette: palette.as_ref(),
        transparent_color_index,
        layer_is_background: false,
    })?;
    let framedata = framedata.resolve(&layers, palette.as_ref(), header.pixel_format)?;

    Ok(AsepriteFile {
        name: String::new(),
        width: header.width,
        height: header.height,
        num_frames: header.num_frames,
        pixel_format: header.pixel_format,
        flags: header.flags,
        pixel_ratio: header.pixel_ratio,
        grid: header.grid,
        palette,
        color_profile,
        layers,
        frame_times,
        tags,
        framedata,
        tilesets,
        sprite_user_data,
        slices,
    })
}

fn parse_frame<R: Read>(
    reader: &mut AseReader<R>,
    frame_id: u16,
    header: &Header,
    parse_info: &mut ParseInfo,
) -> Result<()> {
    let num_bytes = reader.dword()?;
    let magic_number = reader.word()?;
    if magic_number != 0xF1FA {
        return Err(AsepriteError::InvalidInput(format!(
            "Invalid magic number for frame: {:x} != {:x}",
            magic_number, 0xF1FA
        )));
    }
    let old_num_chunks = reader.word()?;
    let frame_duration_ms = reader.word()?;
    reader.skip_bytes(2)?;
    let new_num_chunks = reader.dword()?;

    parse_info.frame_times[frame_id as usize] = frame_duration_ms;

    let num_chunks = if new_num_chunks == 0 {
        old_num_chunks as u32
    } else {
        new_num_chunks
    };

    let bytes_available = num_bytes as i64 - FRAME_HEADER_SIZE;
    if bytes_available < 0 {
        return Err(AsepriteError::InvalidInput(format!(
            "Frame {} declares {} bytes, less than its header",
            frame_id, num_bytes
        )));
    }

    let (chunks, bytes_left) = Chunk::read_all(num_chunks, bytes_available, reader)?;
    if bytes_left > 0 {
        debug!("Skipping {} trailing bytes in frame {}", bytes_left, frame_id);
        reader.skip_bytes(bytes_left as usize)?;
    }

    for chunk in chunks {
        let Chunk { chunk_type, data } = chunk;
        trace!(
            "Frame {}: {:?} chunk, {} bytes",
            frame_id,
            chunk_type,
            data.len()
        );
        match parse_info.apply_chunk(frame_id, chunk_type, &data, header) {
            Ok(()) => {}
            Err(AsepriteError::UnsupportedFeature(msg)) if chunk_type.is_required() => {
                return Err(AsepriteError::InvalidInput(format!(
                    "Frame {}: required {:?} chunk uses an unsupported feature: {}",
                    frame_id, chunk_type, msg
                )));
            }
            Err(AsepriteError::UnsupportedFeature(msg)) => {
                warn!(
                    "Skipping {:?} chunk in frame {}: {}",
                    chunk_type, frame_id, msg
                );
                parse_info.user_data_context = Some(UserDataContext::Skipped);
                if chunk_type == ChunkType::Cel {
                    parse_info.last_cel = None;
                }
            }
            Err(err) => return Err(err),
        }
    }

    if frame_id == 0 {
        parse_info.finalize_layers()?;
    }

    Ok(())
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ChunkType {
    OldPalette04, // deprecated
    OldPalette11, // deprecated
    Palette,
    Layer,
    Cel,
    CelExtra,
    ColorProfile,
    ExternalFiles,
    Mask, // deprecated
    Path,
    Tags,
    UserData,
    Slice,
    Tileset,
    Unknown(u16),
}

impl ChunkType {
    // Cels refer to layers by index, so a skipped layer shifts every later one.
    fn is_required(&self) -> bool {
        matches!(self, ChunkType::Layer)
    }
}

fn parse_chunk_type(chunk_type: u16) -> ChunkType {
    match chunk_type {
        0x0004 => ChunkType::OldPalette04,
        0x0011 => ChunkType::OldPalette11,
        0x2004 => ChunkType::Layer,
        0x2005 => ChunkType::Cel,
        0x2006 => ChunkType::CelExtra,
        0x2007 => ChunkType::ColorProfile,
        0x2008 => ChunkType::ExternalFiles,
        0x2016 => ChunkType::Mask,
        0x2017 => ChunkType::Path,
        0x2018 => ChunkType::Tags,
        0x2019 => ChunkType::Palette,
        0x2020 => ChunkType::UserData,
        0x2022 => ChunkType::Slice,
        0x2023 => ChunkType::Tileset,
        other => ChunkType::Unknown(other),
    }
}

const CHUNK_HEADER_SIZE: usize = 6;
const FRAME_HEADER_SIZE: i64 = 16;

struct Chunk {
    data: Vec<u8>,
    chunk_type: ChunkType,
}

impl Chunk {
    fn read<R: Read>(bytes_available: &mut i64, reader: &mut AseReader<R>) -> Result<Self> {
        let chunk_size = reader.dword()?;
        let chunk_type_code = reader.word()?;
        let chunk_type = parse_chunk_type(chunk_type_code);

        check_chunk_bytes(chunk_size, *bytes_available)?;

        let chunk_data_bytes = chunk_size as usize - CHUNK_HEADER_SIZE;
        let data = reader.take_bytes(chunk_data_bytes)?;
        *bytes_available -= chunk_size as i64;
        Ok(Chunk { chunk_type, data })
    }

    fn read_all<R: Read>(
        count: u32,
        mut bytes_available: i64,
        reader: &mut AseReader<R>,
    ) -> Result<(Vec<Self>, i64)> {
        // The count comes from the file. Every chunk needs at least a header.
        let max_chunks = (bytes_available.max(0) as usize) / CHUNK_HEADER_SIZE;
        let mut chunks: Vec<Chunk> = Vec::with_capacity((count as usize).min(max_chunks));
        for _idx in 0..count {
            let chunk = Self::read(&mut bytes_available, reader)?;
            chunks.push(chunk);
        }
        Ok((chunks, bytes_available))
    }
}

fn check_chunk_bytes(chunk_size: u32, bytes_available: i64) -> Result<()> {
    if (chunk_size as usize) < CHUNK_HEADER_SIZE {
        return Err(AsepriteError::InvalidInput(format!(
            "Chunk size is too small {}, minimum_size: {}",
            chunk_size, CHUNK_HEADER_SIZE
        )));
    }
    if chunk_size as i64 > bytes_available {
        return Err(AsepriteError::InvalidInput(format!(
            "Trying to read chunk of size {}, but there are only {} bytes available in the frame",
            chunk_size, bytes_available
        )));
    }
    Ok(())
}

fn parse_pixel_format(color_depth: u16, transparent_color_index: u8) -> Result<PixelFormat> {
    match color_depth {
        8 => Ok(PixelFormat::Indexed {
            transparent_color_index,
        }),
        16 => Ok(PixelFormat::Grayscale),
        32 => Ok(PixelFormat::Rgba),
        _ => Err(AsepriteError::InvalidInput(format!(
            "Unknown pixel format. Color depth: {}",
            color_depth
        ))),
    }
}
