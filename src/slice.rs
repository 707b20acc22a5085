use crate::{reader::AseReader, user_data::UserData, Rect, Result};

/// Color Aseprite shows for slices without a user data color.
pub const DEFAULT_SLICE_COLOR: [u8; 4] = [0, 0, 255, 255];

/// A slice is a named rectangular region, e.g. a hitbox or a nine-patch.
///
/// Slices can change over time. Each [SliceKey] is valid from its frame
/// until the next key (or the end of the animation).
#[derive(Debug, Clone)]
pub struct Slice {
    /// Slice name.
    pub name: String,
    /// Keys ordered by frame.
    pub keys: Vec<SliceKey>,
    /// The slice's user data, if any is present.
    pub user_data: Option<UserData>,
}

/// The state of a slice starting at a given frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SliceKey {
    /// First frame this key applies to.
    pub from_frame: u32,
    /// Slice bounds, relative to the canvas.
    pub bounds: Rect,
    /// Nine-patch center, relative to `bounds`.
    pub center: Option<Rect>,
    /// Pivot point, relative to `bounds`.
    pub pivot: Option<(i32, i32)>,
}

impl Slice {
    /// Display color: the user data color or [DEFAULT_SLICE_COLOR].
    pub fn color(&self) -> [u8; 4] {
        self.user_data
            .as_ref()
            .and_then(|u| u.color)
            .unwrap_or(DEFAULT_SLICE_COLOR)
    }

    /// Returns `true` if any key has nine-patch data.
    pub fn is_nine_patch(&self) -> bool {
        self.keys.iter().any(|k| k.center.is_some())
    }

    /// Returns `true` if any key has a pivot.
    pub fn has_pivot(&self) -> bool {
        self.keys.iter().any(|k| k.pivot.is_some())
    }

    /// The key in effect at `frame`: the last key starting at or before it.
    pub fn key_at(&self, frame: u32) -> Option<&SliceKey> {
        self.keys.iter().rev().find(|k| k.from_frame <= frame)
    }

    /// Expand the keys into one entry per frame.
    ///
    /// Every frame from the first key onward holds the most recent key at or
    /// before it; earlier frames hold `None`. Keys starting at or after
    /// `total_frames` are ignored.
    pub fn interpolate(&self, total_frames: u32) -> Vec<Option<SliceKey>> {
        let mut keys: Vec<&SliceKey> = self
            .keys
            .iter()
            .filter(|k| k.from_frame < total_frames)
            .collect();
        keys.sort_by_key(|k| k.from_frame);

        let mut result = vec![None; total_frames as usize];
        for (i, key) in keys.iter().enumerate() {
            let end = keys
                .get(i + 1)
                .map(|next| next.from_frame)
                .unwrap_or(total_frames);
            for slot in &mut result[key.from_frame as usize..end as usize] {
                *slot = Some(**key);
            }
        }
        result
    }
}

pub(crate) fn parse_chunk(data: &[u8]) -> Result<Slice> {
    let mut reader = AseReader::new(data);

    let num_slice_keys = reader.dword()?;
    let flags = reader.dword()?;
    let _reserved = reader.dword()?;
    let name = reader.string()?;

    let mut keys: Vec<SliceKey> = Vec::new();
    for _id in 0..num_slice_keys {
        let from_frame = reader.dword()?;
        let origin_x = reader.long()?;
        let origin_y = reader.long()?;
        let width = reader.dword()?;
        let height = reader.dword()?;
        let center = if flags & 1 != 0 {
            let center_x = reader.long()?;
            let center_y = reader.long()?;
            let center_width = reader.dword()?;
            let center_height = reader.dword()?;
            Some(Rect::new(center_x, center_y, center_width, center_height))
        } else {
            None
        };
        let pivot = if flags & 2 != 0 {
            let pivot_x = reader.long()?;
            let pivot_y = reader.long()?;
            Some((pivot_x, pivot_y))
        } else {
            None
        };

        keys.push(SliceKey {
            from_frame,
            bounds: Rect::new(origin_x, origin_y, width, height),
            center,
            pivot,
        });
    }

    Ok(Slice {
        name,
        keys,
        user_data: None,
    })
}
