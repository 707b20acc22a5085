use crate::{
    cel::Cel, reader::AseReader, tileset::TilesetId, tileset::TilesetsById, user_data::UserData,
    AsepriteError, AsepriteFile, Result,
};
use bitflags::bitflags;
use std::ops::Index;

/// Types of layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LayerType {
    /// A regular image layer. This is the normal layer type.
    Image,
    /// A layer that groups other layers and does not contain any image data.
    /// In Aseprite these are represented by a folder icon.
    Group,
    /// A tilemap layer. Its cels contain tile indices into the referenced
    /// tileset.
    Tilemap(TilesetId),
}

bitflags! {
    /// Flags set on a layer in the Aseprite UI.
    pub struct LayerFlags: u32 {
        /// Layer is visible (eye icon is enabled).
        const VISIBLE = 0x0001;
        /// Layer can be modified (lock icon is disabled).
        const EDITABLE = 0x0002;
        /// Layer cannot be moved.
        const MOVEMENT_LOCKED = 0x0004;
        /// Layer is background (stack order cannot be changed).
        const BACKGROUND = 0x0008;
        /// Prefer to link cels when the user copies them.
        const CONTINUOUS = 0x0010;
        /// Prefer to show this group layer collapsed.
        const COLLAPSED = 0x0020;
        /// This is a reference layer.
        const REFERENCE = 0x0040;
    }
}

impl LayerFlags {
    /// Shortcut for `.contains(LayerFlags::VISIBLE)`.
    pub fn is_visible(&self) -> bool {
        self.contains(LayerFlags::VISIBLE)
    }
}

/// A reference to a single layer.
#[derive(Debug, Clone, Copy)]
pub struct Layer<'a> {
    pub(crate) file: &'a AsepriteFile,
    pub(crate) layer_id: u32,
}

impl<'a> Layer<'a> {
    fn data(&self) -> &'a LayerData {
        &self.file.layers[self.layer_id]
    }

    /// This layer's ID. Layers are ordered bottom to top.
    pub fn id(&self) -> u32 {
        self.layer_id
    }

    /// Layer's flags
    pub fn flags(&self) -> LayerFlags {
        self.data().flags
    }

    /// Name of the layer
    pub fn name(&self) -> &'a str {
        &self.data().name
    }

    /// Blend mode of the layer. Describes how this layer is combined with the
    /// layers underneath it. See [BlendMode] for details.
    pub fn blend_mode(&self) -> BlendMode {
        self.data().blend_mode
    }

    /// Layer opacity (0 = transparent, 255 = opaque).
    pub fn opacity(&self) -> u8 {
        self.data().opacity
    }

    /// Describes whether this is a regular, group or tilemap layer.
    pub fn layer_type(&self) -> LayerType {
        self.data().layer_type
    }

    /// Nesting depth. Top-level layers have level 0.
    pub fn child_level(&self) -> u16 {
        self.data().child_level
    }

    /// The parent of this layer, if any. For layers that are part of a group
    /// this returns the parent layer.
    ///
    /// Does not indicate the blend order of layers (i.e., which layers are
    /// above or below).
    pub fn parent(&self) -> Option<Layer<'a>> {
        self.file.layers.parents[self.layer_id as usize].map(|id| Layer {
            file: self.file,
            layer_id: id,
        })
    }

    /// Returns if this layer is visible. This requires that this layer and all
    /// of its parent layers are visible.
    pub fn is_visible(&self) -> bool {
        let layer_is_visible = self.data().flags.is_visible();
        let parent_is_visible = self.parent().map(|p| p.is_visible()).unwrap_or(true);
        layer_is_visible && parent_is_visible
    }

    /// Returns `true` for the background layer.
    pub fn is_background(&self) -> bool {
        self.data().is_background()
    }

    /// Returns `true` for reference layers.
    pub fn is_reference(&self) -> bool {
        self.data().flags.contains(LayerFlags::REFERENCE)
    }

    /// Returns the tileset of a tilemap layer.
    pub fn tileset_id(&self) -> Option<TilesetId> {
        match self.data().layer_type {
            LayerType::Tilemap(id) => Some(id),
            LayerType::Image | LayerType::Group => None,
        }
    }

    /// The layer's user data, if any is present.
    pub fn user_data(&self) -> Option<&'a UserData> {
        self.data().user_data.as_ref()
    }

    /// Get a reference to the Cel for this frame in the layer.
    pub fn frame(&self, frame_id: u32) -> Result<Cel<'a>> {
        self.file.cel(frame_id, self.layer_id)
    }
}

#[derive(Debug)]
pub(crate) struct LayerData {
    pub(crate) flags: LayerFlags,
    pub(crate) name: String,
    pub(crate) blend_mode: BlendMode,
    pub(crate) opacity: u8,
    pub(crate) layer_type: LayerType,
    pub(crate) child_level: u16,
    pub(crate) user_data: Option<UserData>,
}

impl LayerData {
    pub(crate) fn is_background(&self) -> bool {
        self.flags.contains(LayerFlags::BACKGROUND)
    }
}

#[derive(Debug)]
pub(crate) struct LayersData {
    // Sorted back to front (or bottom to top in the GUI, but groups occur
    // before their children, i.e., lower index)
    pub(crate) layers: Vec<LayerData>,
    parents: Vec<Option<u32>>,
}

impl Index<u32> for LayersData {
    type Output = LayerData;

    fn index(&self, index: u32) -> &Self::Output {
        &self.layers[index as usize]
    }
}

impl LayersData {
    pub(crate) fn num_layers(&self) -> u32 {
        self.layers.len() as u32
    }

    pub(crate) fn get(&self, index: u32) -> Option<&LayerData> {
        self.layers.get(index as usize)
    }

    pub(crate) fn validate(&self, tilesets: &TilesetsById) -> Result<()> {
        for layer in &self.layers {
            if let LayerType::Tilemap(tileset_id) = layer.layer_type {
                if tilesets.get(tileset_id).is_none() {
                    return Err(AsepriteError::InvalidInput(format!(
                        "Tilemap layer '{}' references missing tileset {}",
                        layer.name,
                        tileset_id.value()
                    )));
                }
            }
        }
        Ok(())
    }
}

/// Describes how a layer is combined with the layers underneath it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[allow(missing_docs)]
pub enum BlendMode {
    Normal,
    Multiply,
    Screen,
    Overlay,
    Darken,
    Lighten,
    ColorDodge,
    ColorBurn,
    HardLight,
    SoftLight,
    Difference,
    Exclusion,
    Hue,
    Saturation,
    Color,
    Luminosity,
    Addition,
    Subtract,
    Divide,
}

pub(crate) fn parse_chunk(data: &[u8], opacity_is_valid: bool) -> Result<LayerData> {
    let mut reader = AseReader::new(data);

    let flags = reader.word()?;
    let layer_type = reader.word()?;
    let child_level = reader.word()?;
    let _default_width = reader.word()?;
    let _default_height = reader.word()?;
    let blend_mode = reader.word()?;
    let opacity = reader.byte()?;
    reader.skip_bytes(3)?;
    let name = reader.string()?;
    let layer_type = match layer_type {
        0 => LayerType::Image,
        1 => LayerType::Group,
        2 => LayerType::Tilemap(TilesetId::new(reader.dword()?)),
        _ => {
            return Err(AsepriteError::UnsupportedFeature(format!(
                "Invalid layer type: {}",
                layer_type
            )))
        }
    };
    // A layer UUID may follow; it carries no information we use.

    let flags = LayerFlags::from_bits_truncate(flags as u32);
    let blend_mode = parse_blend_mode(blend_mode)?;
    let opacity = if opacity_is_valid { opacity } else { 255 };

    Ok(LayerData {
        name,
        flags,
        blend_mode,
        opacity,
        layer_type,
        child_level,
        user_data: None,
    })
}

fn parse_blend_mode(id: u16) -> Result<BlendMode> {
    match id {
        0 => Ok(BlendMode::Normal),
        1 => Ok(BlendMode::Multiply),
        2 => Ok(BlendMode::Screen),
        3 => Ok(BlendMode::Overlay),
        4 => Ok(BlendMode::Darken),
        5 => Ok(BlendMode::Lighten),
        6 => Ok(BlendMode::ColorDodge),
        7 => Ok(BlendMode::ColorBurn),
        8 => Ok(BlendMode::HardLight),
        9 => Ok(BlendMode::SoftLight),
        10 => Ok(BlendMode::Difference),
        11 => Ok(BlendMode::Exclusion),
        12 => Ok(BlendMode::Hue),
        13 => Ok(BlendMode::Saturation),
        14 => Ok(BlendMode::Color),
        15 => Ok(BlendMode::Luminosity),
        16 => Ok(BlendMode::Addition),
        17 => Ok(BlendMode::Subtract),
        18 => Ok(BlendMode::Divide),
        _ => Err(AsepriteError::UnsupportedFeature(format!(
            "Invalid/Unsupported blend mode: {}",
            id
        ))),
    }
}

fn compute_parents(layers: &[LayerData]) -> Result<Vec<Option<u32>>> {
    let mut result = Vec::with_capacity(layers.len());

    for (id, layer) in layers.iter().enumerate() {
        let my_child_level = layer.child_level;
        if my_child_level == 0 {
            result.push(None);
            continue;
        }
        // Find first layer with a lower id and a lower child_level.
        let parent = layers[..id]
            .iter()
            .rposition(|candidate| candidate.child_level < my_child_level)
            .ok_or_else(|| {
                AsepriteError::InvalidInput(format!(
                    "Layer '{}' has child level {} but no parent group",
                    layer.name, my_child_level
                ))
            })?;
        result.push(Some(parent as u32));
    }
    Ok(result)
}

pub(crate) fn collect_layers(layers: Vec<LayerData>) -> Result<LayersData> {
    let parents = compute_parents(&layers)?;
    Ok(LayersData { layers, parents })
}

#[cfg(test)]
mod test {
    use super::*;

    fn layer(name: &str, child_level: u16) -> LayerData {
        LayerData {
            flags: LayerFlags::VISIBLE,
            name: name.to_owned(),
            blend_mode: BlendMode::Normal,
            opacity: 255,
            layer_type: LayerType::Image,
            child_level,
            user_data: None,
        }
    }

    #[test]
    fn parents_from_child_levels() {
        let layers = vec![
            layer("group", 0),
            layer("a", 1),
            layer("inner", 1),
            layer("b", 2),
            layer("top", 0),
        ];
        let data = collect_layers(layers).unwrap();
        assert_eq!(data.parents, vec![None, Some(0), Some(0), Some(2), None]);
    }

    #[test]
    fn orphan_child_is_invalid() {
        let layers = vec![layer("a", 1)];
        assert!(collect_layers(layers).is_err());
    }

    #[test]
    fn opacity_ignored_without_header_flag() {
        let chunk = crate::test_builder::LayerChunk::image("L").opacity(10).build();
        assert_eq!(parse_chunk(&chunk, false).unwrap().opacity, 255);
        assert_eq!(parse_chunk(&chunk, true).unwrap().opacity, 10);
    }
}
