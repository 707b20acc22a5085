use crate::{reader::AseReader, Result};
use bitflags::bitflags;
use log::debug;

/// Text and color a user attached to a sprite, layer, cel, tag, slice or
/// tileset.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UserData {
    /// User-provided string data.
    pub text: Option<String>,
    /// User-provided color in bytes [red, green, blue, alpha].
    pub color: Option<[u8; 4]>,
}

impl UserData {
    /// Returns `true` if neither text nor color is set.
    pub fn is_empty(&self) -> bool {
        self.text.is_none() && self.color.is_none()
    }
}

bitflags! {
    struct UserDataFlags: u32 {
        const HAS_TEXT = 0x0001;
        const HAS_COLOR = 0x0002;
        const HAS_PROPERTIES = 0x0004;
    }
}

pub(crate) fn parse_chunk(data: &[u8]) -> Result<UserData> {
    let mut reader = AseReader::new(data);
    let flags = UserDataFlags::from_bits_truncate(reader.dword()?);

    let text = if flags.contains(UserDataFlags::HAS_TEXT) {
        Some(reader.string()?)
    } else {
        None
    };
    let color = if flags.contains(UserDataFlags::HAS_COLOR) {
        let mut rgba = [0_u8; 4];
        reader.read_exact(&mut rgba)?;
        Some(rgba)
    } else {
        None
    };
    // Property maps follow; nothing in this crate consumes them.
    if flags.contains(UserDataFlags::HAS_PROPERTIES) {
        debug!("Ignoring user data property maps");
    }

    Ok(UserData { text, color })
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::test_builder::user_data_chunk;

    #[test]
    fn text_and_color() {
        let data = parse_chunk(&user_data_chunk(Some("door"), Some([1, 2, 3, 4]))).unwrap();
        assert_eq!(data.text.as_deref(), Some("door"));
        assert_eq!(data.color, Some([1, 2, 3, 4]));

        let data = parse_chunk(&user_data_chunk(None, Some([9, 9, 9, 255]))).unwrap();
        assert!(data.text.is_none());
        assert!(!data.is_empty());
        assert!(parse_chunk(&user_data_chunk(None, None)).unwrap().is_empty());
    }
}
