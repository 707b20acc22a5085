use crate::{reader::AseReader, AsepriteError, Result};
use nohash::IntMap;

/// The color palette embedded in the file.
#[derive(Debug, Default)]
pub struct ColorPalette {
    entries: IntMap<u32, ColorPaletteEntry>,
}

/// A single entry in a [ColorPalette].
#[derive(Debug, Clone)]
pub struct ColorPaletteEntry {
    id: u32,
    rgba8: [u8; 4],
    name: Option<String>,
}

impl ColorPalette {
    /// Total number of colors in the palette.
    pub fn num_colors(&self) -> u32 {
        self.entries.len() as u32
    }

    /// Look up entry at given index.
    pub fn get(&self, index: u32) -> Option<&ColorPaletteEntry> {
        self.entries.get(&index)
    }

    /// All colors ordered by index.
    pub fn colors(&self) -> Vec<[u8; 4]> {
        let mut entries: Vec<&ColorPaletteEntry> = self.entries.values().collect();
        entries.sort_by_key(|e| e.id);
        entries.into_iter().map(|e| e.rgba8).collect()
    }

    fn truncate(&mut self, size: u32) {
        self.entries.retain(|id, _| *id < size);
    }
}

impl ColorPaletteEntry {
    /// The id of this entry is the same as its index in the palette.
    pub fn id(&self) -> u32 {
        self.id
    }

    /// Get the RGBA components as an array. Most color libraries allow you to
    /// build an instance of their color type from such an array.
    pub fn raw_rgba8(&self) -> [u8; 4] {
        self.rgba8
    }

    /// Red component.
    pub fn red(&self) -> u8 {
        self.rgba8[0]
    }

    /// Green component.
    pub fn green(&self) -> u8 {
        self.rgba8[1]
    }

    /// Blue component.
    pub fn blue(&self) -> u8 {
        self.rgba8[2]
    }

    /// Alpha value of this color (0 = fully transparent, 255 = fully opaque).
    pub fn alpha(&self) -> u8 {
        self.rgba8[3]
    }

    /// Optional color name set in Aseprite.
    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }
}

/// Apply a palette chunk (0x2019). The chunk carries the new palette size and
/// the range of entries that changed; entries outside the range are kept.
pub(crate) fn apply_chunk(palette: &mut ColorPalette, data: &[u8]) -> Result<()> {
    let mut reader = AseReader::new(data);

    let new_size = reader.dword()?;
    let first_color_index = reader.dword()?;
    let last_color_index = reader.dword()?;
    let _reserved = reader.qword()?;

    if last_color_index < first_color_index {
        return Err(AsepriteError::InvalidInput(format!(
            "Bad palette color indices: first={} last={}",
            first_color_index, last_color_index,
        )));
    }

    palette.truncate(new_size);
    for id in first_color_index..=last_color_index {
        let flags = reader.word()?;
        let red = reader.byte()?;
        let green = reader.byte()?;
        let blue = reader.byte()?;
        let alpha = reader.byte()?;
        let name = if flags & 1 == 1 {
            Some(reader.string()?)
        } else {
            None
        };
        palette.entries.insert(
            id,
            ColorPaletteEntry {
                id,
                rgba8: [red, green, blue, alpha],
                name,
            },
        );
    }
    Ok(())
}

/// Parse one of the deprecated palette chunks (0x0004 with 8-bit channels,
/// 0x0011 with 6-bit channels). Colors are always opaque.
pub(crate) fn apply_old_chunk(
    palette: &mut ColorPalette,
    data: &[u8],
    six_bit_channels: bool,
) -> Result<()> {
    let mut reader = AseReader::new(data);
    let num_packets = reader.word()?;
    let mut index: u32 = 0;
    for _ in 0..num_packets {
        index += reader.byte()? as u32;
        let count = match reader.byte()? {
            0 => 256,
            n => n as u32,
        };
        for _ in 0..count {
            let mut rgb = [0_u8; 3];
            reader.read_exact(&mut rgb)?;
            if six_bit_channels {
                for c in rgb.iter_mut() {
                    *c = ((*c as u32 & 0x3f) * 255 / 63) as u8;
                }
            }
            palette.entries.insert(
                index,
                ColorPaletteEntry {
                    id: index,
                    rgba8: [rgb[0], rgb[1], rgb[2], 255],
                    name: None,
                },
            );
            index += 1;
        }
    }
    Ok(())
}

#[cfg(test)]
pub(crate) fn test_palette(colors: &[[u8; 4]]) -> ColorPalette {
    let entries = colors
        .iter()
        .enumerate()
        .map(|(id, rgba8)| {
            (
                id as u32,
                ColorPaletteEntry {
                    id: id as u32,
                    rgba8: *rgba8,
                    name: None,
                },
            )
        })
        .collect();
    ColorPalette { entries }
}
