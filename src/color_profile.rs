use crate::{reader::AseReader, AsepriteError, Result};

/// Color profile of the sprite. Pixels are never converted; this is
/// informational only.
#[derive(Debug, Clone)]
pub struct ColorProfile {
    /// Kind of profile.
    pub profile_type: ColorProfileType,
    /// Gamma override, if the file sets one.
    pub fixed_gamma: Option<f64>,
    /// Raw ICC profile data for [ColorProfileType::Icc].
    pub icc_profile: Option<Vec<u8>>,
}

/// Kind of color profile.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColorProfileType {
    /// No color profile (as in old .aseprite files).
    None,
    /// sRGB.
    Srgb,
    /// Embedded ICC profile.
    Icc,
}

pub(crate) fn parse_chunk(data: &[u8]) -> Result<ColorProfile> {
    let mut reader = AseReader::new(data);
    let profile_type = reader.word()?;
    let flags = reader.word()?;
    let gamma = reader.fixed()?;
    reader.skip_bytes(8)?;

    let profile_type = parse_color_profile_type(profile_type)?;
    let fixed_gamma = if flags & 1 != 0 { Some(gamma) } else { None };

    let icc_profile = if profile_type == ColorProfileType::Icc {
        let len = reader.dword()?;
        Some(reader.take_bytes(len as usize)?)
    } else {
        None
    };

    Ok(ColorProfile {
        profile_type,
        fixed_gamma,
        icc_profile,
    })
}

fn parse_color_profile_type(id: u16) -> Result<ColorProfileType> {
    match id {
        0x0000 => Ok(ColorProfileType::None),
        0x0001 => Ok(ColorProfileType::Srgb),
        0x0002 => Ok(ColorProfileType::Icc),
        _ => Err(AsepriteError::UnsupportedFeature(format!(
            "Unknown color profile type: {}",
            id
        ))),
    }
}
