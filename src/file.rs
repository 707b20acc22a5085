use std::{
    fs::File,
    io::{self, BufReader, Read},
    path::Path,
};

use crate::{
    cel::{CelId, CelsData, RawCel},
    color_profile::ColorProfile,
    flatten::{self, FlattenOptions},
    layer::{Layer, LayersData},
    parse,
    slice::Slice,
    tileset::{Tileset, TilesetsById},
    user_data::UserData,
};
use crate::{cel::Cel, *};
use bitflags::bitflags;
use image::RgbaImage;

/// A parsed Aseprite file.
///
/// All data is decoded eagerly and never changes after loading, so indices
/// into frames, layers, tags, slices and tilesets stay valid for the
/// lifetime of the file.
#[derive(Debug)]
pub struct AsepriteFile {
    pub(crate) name: String,
    pub(crate) width: u16,
    pub(crate) height: u16,
    pub(crate) num_frames: u16,
    pub(crate) pixel_format: PixelFormat,
    pub(crate) flags: HeaderFlags,
    pub(crate) pixel_ratio: (u8, u8),
    pub(crate) grid: Grid,
    pub(crate) palette: Option<ColorPalette>,
    pub(crate) color_profile: Option<ColorProfile>,
    pub(crate) layers: LayersData,
    pub(crate) frame_times: Vec<u16>,
    pub(crate) tags: Vec<Tag>,
    pub(crate) framedata: CelsData<RawCel>,
    pub(crate) tilesets: TilesetsById,
    pub(crate) sprite_user_data: Option<UserData>,
    pub(crate) slices: Vec<Slice>,
}

/// A reference to a single frame.
#[derive(Debug, Clone, Copy)]
pub struct Frame<'a> {
    file: &'a AsepriteFile,
    index: u32,
}

/// Pixel format of the source Aseprite file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PixelFormat {
    /// Red, green, blue, and alpha with 8 bits each.
    Rgba,
    /// 8 bit grayscale and 8 bit alpha,
    Grayscale,
    /// Indexed color. Color is determined by palette.
    /// The `transparent_color_index` is used to indicate a
    /// transparent pixel in any non-background layer.
    #[allow(missing_docs)]
    Indexed { transparent_color_index: u8 },
}

impl PixelFormat {
    /// Number of bytes to store one pixel.
    pub fn bytes_per_pixel(&self) -> usize {
        match self {
            PixelFormat::Rgba => 4,
            PixelFormat::Grayscale => 2,
            PixelFormat::Indexed { .. } => 1,
        }
    }

    /// When Indexed, returns the index of the transparent color.
    pub fn transparent_color_index(&self) -> Option<u8> {
        match self {
            PixelFormat::Indexed {
                transparent_color_index,
            } => Some(*transparent_color_index),
            _ => None,
        }
    }
}

bitflags! {
    /// Flags from the file header.
    pub struct HeaderFlags: u32 {
        /// Layer opacity is stored in the file. Without it every layer is
        /// fully opaque.
        const LAYER_OPACITY_VALID = 0x0001;
        /// Group layers carry their own opacity and blend mode.
        const GROUP_OPACITY_VALID = 0x0002;
        /// Layer chunks end with a UUID.
        const LAYERS_HAVE_UUID = 0x0004;
    }
}

/// The editor grid.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Grid {
    /// Grid origin x.
    pub x: i16,
    /// Grid origin y.
    pub y: i16,
    /// Cell width. Zero if there is no grid.
    pub width: u16,
    /// Cell height. Zero if there is no grid.
    pub height: u16,
}

impl AsepriteFile {
    /// Load Aseprite file. Loads full file into memory.
    ///
    /// The file stem becomes the [name](AsepriteFile::name) of the result.
    pub fn read_file(path: &Path) -> Result<Self> {
        let file = File::open(path).map_err(|err| match err.kind() {
            io::ErrorKind::NotFound => AsepriteError::FileNotFound(path.to_path_buf()),
            _ => err.into(),
        })?;
        let reader = BufReader::new(file);
        let mut ase = parse::read_aseprite(reader)?;
        ase.name = path
            .file_stem()
            .map(|stem| stem.to_string_lossy().into_owned())
            .unwrap_or_default();
        Ok(ase)
    }

    /// Load Aseprite file from any input that implements `std::io::Read`.
    ///
    /// You can use this to read from an in-memory file. The result has an
    /// empty name; see [AsepriteFile::with_name].
    pub fn read<R: Read>(input: R) -> Result<AsepriteFile> {
        parse::read_aseprite(input)
    }

    /// Replace the file name used to label derived assets.
    pub fn with_name(mut self, name: &str) -> Self {
        self.name = name.to_owned();
        self
    }

    /// Name of the sprite, usually the file stem.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Width in pixels.
    pub fn width(&self) -> usize {
        self.width as usize
    }

    /// Height in pixels.
    pub fn height(&self) -> usize {
        self.height as usize
    }

    /// Width and height in pixels.
    pub fn size(&self) -> (usize, usize) {
        (self.width(), self.height())
    }

    /// Number of animation frames.
    pub fn num_frames(&self) -> u32 {
        self.num_frames as u32
    }

    /// Number of layers.
    pub fn num_layers(&self) -> u32 {
        self.layers.num_layers()
    }

    /// The pixel format used by the original file. This library internally
    /// represents all images as RGBA.
    pub fn pixel_format(&self) -> PixelFormat {
        self.pixel_format
    }

    /// Header flags.
    pub fn flags(&self) -> HeaderFlags {
        self.flags
    }

    /// Pixel width and height ratio. `(1, 1)` for square pixels.
    pub fn pixel_ratio(&self) -> (u8, u8) {
        self.pixel_ratio
    }

    /// The editor grid settings.
    pub fn grid(&self) -> Grid {
        self.grid
    }

    /// The color palette in the image.
    ///
    /// For indexed color images, this includes all colors used by individual
    /// cels. However, the final image after layer blending may contain colors
    /// outside of this palette (or with different transparency levels).
    pub fn palette(&self) -> Option<&ColorPalette> {
        self.palette.as_ref()
    }

    /// The embedded color profile, if any.
    pub fn color_profile(&self) -> Option<&ColorProfile> {
        self.color_profile.as_ref()
    }

    /// User data attached to the sprite itself.
    pub fn sprite_user_data(&self) -> Option<&UserData> {
        self.sprite_user_data.as_ref()
    }

    /// Duration of every frame in milliseconds.
    pub fn frame_durations(&self) -> impl Iterator<Item = u32> + '_ {
        self.frame_times.iter().map(|&ms| ms as u32)
    }

    /// Access a frame by index.
    pub fn frame(&self, index: u32) -> Result<Frame> {
        self.get_frame(index)
            .ok_or_else(|| AsepriteError::index_out_of_range("Frame", index, self.num_frames()))
    }

    /// Access a frame by index. `None` if out of range.
    pub fn get_frame(&self, index: u32) -> Option<Frame> {
        if index < self.num_frames() {
            Some(Frame { file: self, index })
        } else {
            None
        }
    }

    /// Access a layer by ID. Layers are ordered bottom to top.
    pub fn layer(&self, id: u32) -> Result<Layer> {
        self.get_layer(id)
            .ok_or_else(|| AsepriteError::index_out_of_range("Layer", id, self.num_layers()))
    }

    /// Access a layer by ID. `None` if out of range.
    pub fn get_layer(&self, id: u32) -> Option<Layer> {
        if id < self.num_layers() {
            Some(Layer {
                file: self,
                layer_id: id,
            })
        } else {
            None
        }
    }

    /// Access a layer by name. If multiple layers share the name, the
    /// bottom-most one is returned.
    pub fn layer_by_name(&self, name: &str) -> Result<Layer> {
        self.get_layer_by_name(name)
            .ok_or_else(|| AsepriteError::not_found("layer", name, self.layers().map(|l| l.name())))
    }

    /// Access a layer by name. `None` if no layer has that name.
    pub fn get_layer_by_name(&self, name: &str) -> Option<Layer> {
        self.layers().find(|l| l.name() == name)
    }

    /// An iterator over all layers, bottom to top.
    pub fn layers(&self) -> LayersIter {
        LayersIter {
            file: self,
            next: 0,
        }
    }

    /// Number of tags.
    pub fn num_tags(&self) -> u32 {
        self.tags.len() as u32
    }

    /// All tags in file order.
    pub fn tags(&self) -> &[Tag] {
        &self.tags
    }

    /// Access a tag by index.
    pub fn tag(&self, index: u32) -> Result<&Tag> {
        self.get_tag(index)
            .ok_or_else(|| AsepriteError::index_out_of_range("Tag", index, self.num_tags()))
    }

    /// Access a tag by index. `None` if out of range.
    pub fn get_tag(&self, index: u32) -> Option<&Tag> {
        self.tags.get(index as usize)
    }

    /// Access a tag by name. If multiple tags share the name, the first one
    /// is returned.
    pub fn tag_by_name(&self, name: &str) -> Result<&Tag> {
        self.get_tag_by_name(name)
            .ok_or_else(|| AsepriteError::not_found("tag", name, self.tags.iter().map(|t| t.name())))
    }

    /// Access a tag by name. `None` if no tag has that name.
    pub fn get_tag_by_name(&self, name: &str) -> Option<&Tag> {
        self.tags.iter().find(|t| t.name() == name)
    }

    /// All [Slice]s in the file.
    pub fn slices(&self) -> &[Slice] {
        &self.slices
    }

    /// Access a slice by index.
    pub fn slice(&self, index: u32) -> Result<&Slice> {
        self.get_slice(index).ok_or_else(|| {
            AsepriteError::index_out_of_range("Slice", index, self.slices.len() as u32)
        })
    }

    /// Access a slice by index. `None` if out of range.
    pub fn get_slice(&self, index: u32) -> Option<&Slice> {
        self.slices.get(index as usize)
    }

    /// Access a slice by name.
    pub fn slice_by_name(&self, name: &str) -> Result<&Slice> {
        self.get_slice_by_name(name).ok_or_else(|| {
            AsepriteError::not_found("slice", name, self.slices.iter().map(|s| s.name.as_str()))
        })
    }

    /// Access a slice by name. `None` if no slice has that name.
    pub fn get_slice_by_name(&self, name: &str) -> Option<&Slice> {
        self.slices.iter().find(|s| s.name == name)
    }

    /// All tilesets, looked up by [TilesetId](crate::TilesetId).
    pub fn tilesets(&self) -> &TilesetsById {
        &self.tilesets
    }

    /// Access a tileset by declaration index.
    pub fn tileset(&self, index: u32) -> Result<&Tileset> {
        self.get_tileset(index).ok_or_else(|| {
            AsepriteError::index_out_of_range("Tileset", index, self.tilesets.len() as u32)
        })
    }

    /// Access a tileset by declaration index. `None` if out of range.
    pub fn get_tileset(&self, index: u32) -> Option<&Tileset> {
        self.tilesets.get_index(index as usize)
    }

    /// Access a tileset by name.
    pub fn tileset_by_name(&self, name: &str) -> Result<&Tileset> {
        self.get_tileset_by_name(name).ok_or_else(|| {
            AsepriteError::not_found("tileset", name, self.tilesets.iter().map(|t| t.name()))
        })
    }

    /// Access a tileset by name. `None` if no tileset has that name.
    pub fn get_tileset_by_name(&self, name: &str) -> Option<&Tileset> {
        self.tilesets.iter().find(|t| t.name() == name)
    }

    /// Access the cel at the given frame and layer. The cel may be empty.
    pub fn cel(&self, frame: u32, layer: u32) -> Result<Cel> {
        if frame >= self.num_frames() {
            return Err(AsepriteError::index_out_of_range(
                "Frame",
                frame,
                self.num_frames(),
            ));
        }
        if layer >= self.num_layers() {
            return Err(AsepriteError::index_out_of_range(
                "Layer",
                layer,
                self.num_layers(),
            ));
        }
        Ok(Cel {
            file: self,
            cel_id: CelId {
                frame: frame as u16,
                layer: layer as u16,
            },
        })
    }

    /// Access the cel at the given frame and layer. `None` if either index
    /// is out of range.
    pub fn get_cel(&self, frame: u32, layer: u32) -> Option<Cel> {
        self.cel(frame, layer).ok()
    }
}

/// An iterator over layers. See [AsepriteFile::layers].
#[derive(Debug)]
pub struct LayersIter<'a> {
    file: &'a AsepriteFile,
    next: u32,
}

impl<'a> Iterator for LayersIter<'a> {
    type Item = Layer<'a>;

    fn next(&mut self) -> Option<Self::Item> {
        let item = self.file.get_layer(self.next)?;
        self.next += 1;
        Some(item)
    }
}

impl<'a> Frame<'a> {
    /// Construct the image belonging to the specific animation frame. Combines
    /// layers according to their blend mode. Skips invisible layers (i.e.,
    /// layers with a deactivated eye icon). The background layer is included.
    pub fn image(&self) -> RgbaImage {
        self.flatten(&FlattenOptions::default())
    }

    /// Flatten this frame with explicit layer filtering.
    pub fn flatten(&self, options: &FlattenOptions) -> RgbaImage {
        flatten::compose_frame(self.file, self.index as u16, options)
    }

    /// Frame ID, i.e., the frame number.
    pub fn id(&self) -> u32 {
        self.index
    }

    /// Get cel corresponding to the given layer in this frame.
    pub fn layer(&self, layer_id: u32) -> Result<Cel<'a>> {
        self.file.cel(self.index, layer_id)
    }

    /// All non-empty cels of this frame, bottom to top.
    pub fn cels(&self) -> impl Iterator<Item = Cel<'a>> + 'a {
        let file = self.file;
        let frame = self.index as u16;
        file.framedata.frame_cels(frame).map(move |(layer, _)| Cel {
            file,
            cel_id: CelId {
                frame,
                layer: layer as u16,
            },
        })
    }

    /// Frame duration in milliseconds.
    pub fn duration(&self) -> u32 {
        self.file.frame_times[self.index as usize] as u32
    }
}
