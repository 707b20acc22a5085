//! Spritesheets: flattened frames packed into an atlas plus the metadata an
//! engine needs to play them back.
use crate::{
    animation::AnimationTag,
    atlas::{self, PackOptions, PackedAtlas},
    flatten::{self, FlattenOptions},
    slice::{Slice, SliceKey},
    user_data::UserData,
    AsepriteError, AsepriteFile, Rect, Result,
};
use log::debug;

/// Options for [build_atlas].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AtlasOptions {
    /// Skip layers hidden in Aseprite.
    pub only_visible_layers: bool,
    /// Composite the background layer into the frames.
    pub include_background_layer: bool,
    /// Pack pixel-identical frames only once.
    pub merge_duplicate_frames: bool,
    /// Empty pixels around the whole atlas.
    pub border_padding: u32,
    /// Empty pixels between neighboring frames.
    pub spacing: u32,
    /// Empty pixels inside each cell, around the frame.
    pub inner_padding: u32,
}

impl Default for AtlasOptions {
    fn default() -> Self {
        AtlasOptions {
            only_visible_layers: true,
            include_background_layer: false,
            merge_duplicate_frames: true,
            border_padding: 0,
            spacing: 0,
            inner_padding: 0,
        }
    }
}

impl AtlasOptions {
    /// The flattening part of these options.
    pub fn flatten_options(&self) -> FlattenOptions {
        FlattenOptions {
            only_visible_layers: self.only_visible_layers,
            include_background_layer: self.include_background_layer,
        }
    }

    /// The packing part of these options.
    pub fn pack_options(&self) -> PackOptions {
        PackOptions {
            merge_duplicates: self.merge_duplicate_frames,
            border_padding: self.border_padding,
            spacing: self.spacing,
            inner_padding: self.inner_padding,
        }
    }
}

/// One source frame inside the atlas.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SheetFrame {
    /// `"{file}_{index}"`, or just the index for unnamed files.
    pub name: String,
    /// Frame index in the source file.
    pub frame: u32,
    /// Where the frame's pixels are in the atlas.
    pub region: Rect,
    /// Duration in milliseconds.
    pub duration: u32,
    /// The earlier frame this one was merged into, if any.
    pub duplicate_of: Option<u32>,
}

/// A slice expanded to one entry per frame.
#[derive(Debug, Clone, PartialEq)]
pub struct SliceTable {
    /// Slice name.
    pub name: String,
    /// Display color.
    pub color: [u8; 4],
    /// The key in effect at every frame. `None` before the first key.
    pub keys: Vec<Option<SliceKey>>,
    /// The slice's user data, if any is present.
    pub user_data: Option<UserData>,
}

impl SliceTable {
    /// Expand `slice` over `total_frames` frames.
    pub fn from_slice(slice: &Slice, total_frames: u32) -> Self {
        SliceTable {
            name: slice.name.clone(),
            color: slice.color(),
            keys: slice.interpolate(total_frames),
            user_data: slice.user_data.clone(),
        }
    }

    /// The key in effect at `frame`.
    pub fn key_at(&self, frame: u32) -> Option<&SliceKey> {
        self.keys.get(frame as usize).and_then(|k| k.as_ref())
    }
}

/// Everything [build_atlas] produces.
#[derive(Debug, Clone)]
pub struct Spritesheet {
    /// The packed image and layout.
    pub atlas: PackedAtlas,
    /// One entry per source frame, in frame order.
    pub frames: Vec<SheetFrame>,
    /// One animation per tag, in file order.
    pub tags: Vec<AnimationTag>,
    /// One table per slice, in file order.
    pub slices: Vec<SliceTable>,
}

impl Spritesheet {
    /// Find an animation by tag name.
    pub fn tag(&self, name: &str) -> Result<&AnimationTag> {
        self.tags
            .iter()
            .find(|t| t.name == name)
            .ok_or_else(|| {
                AsepriteError::not_found("tag", name, self.tags.iter().map(|t| t.name.as_str()))
            })
    }

    /// Find a slice table by slice name.
    pub fn slice(&self, name: &str) -> Result<&SliceTable> {
        self.slices
            .iter()
            .find(|s| s.name == name)
            .ok_or_else(|| {
                AsepriteError::not_found(
                    "slice",
                    name,
                    self.slices.iter().map(|s| s.name.as_str()),
                )
            })
    }
}

fn frame_name(file: &AsepriteFile, index: u32) -> String {
    if file.name().is_empty() {
        index.to_string()
    } else {
        format!("{}_{}", file.name(), index)
    }
}

/// Flatten every frame of `file`, pack the frames into one atlas and collect
/// the tag and slice metadata.
pub fn build_atlas(file: &AsepriteFile, options: &AtlasOptions) -> Result<Spritesheet> {
    let flatten_options = options.flatten_options();
    let images: Vec<_> = (0..file.num_frames())
        .map(|frame| flatten::compose_frame(file, frame as u16, &flatten_options))
        .collect();
    let atlas = atlas::pack_frames(&images, &options.pack_options())?;

    let frames = file
        .frame_durations()
        .enumerate()
        .map(|(index, duration)| {
            let index = index as u32;
            SheetFrame {
                name: frame_name(file, index),
                frame: index,
                region: atlas.regions[index as usize],
                duration,
                duplicate_of: atlas.duplicate_of(index),
            }
        })
        .collect();
    let tags = file
        .tags()
        .iter()
        .map(|tag| AnimationTag::from_tag(file, tag))
        .collect();
    let slices = file
        .slices()
        .iter()
        .map(|slice| SliceTable::from_slice(slice, file.num_frames()))
        .collect();

    debug!(
        "Built {}x{} atlas for '{}' with {} frames",
        atlas.width(),
        atlas.height(),
        file.name(),
        file.num_frames()
    );

    Ok(Spritesheet {
        atlas,
        frames,
        tags,
        slices,
    })
}
