//! Animation clips derived from tags.
use crate::{AsepriteFile, Tag};

/// One step of an animation: which frame to show and for how long.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AnimationFrame {
    /// Frame index in the source file (and in the atlas frame list).
    pub frame: u32,
    /// Duration in milliseconds.
    pub duration: u32,
}

/// The frames of a tag, ready to be handed to an animation player.
///
/// Frames are always listed in ascending order. `is_reversed` and
/// `is_ping_pong` tell the player how to walk them.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AnimationTag {
    /// Tag name.
    pub name: String,
    /// Frames from `from_frame` to `to_frame`, inclusive.
    pub frames: Vec<AnimationFrame>,
    /// Play from the last frame towards the first.
    pub is_reversed: bool,
    /// Bounce between the first and the last frame.
    pub is_ping_pong: bool,
    /// Number of times to play; 0 loops forever.
    pub repeat: u16,
    /// Timeline color as RGB.
    pub color: [u8; 3],
}

impl AnimationTag {
    /// Build the animation for a tag of `file`.
    pub fn from_tag(file: &AsepriteFile, tag: &Tag) -> Self {
        let frames = (tag.from_frame()..=tag.to_frame())
            .map(|frame| AnimationFrame {
                frame,
                duration: file.frame_times[frame as usize] as u32,
            })
            .collect();
        let direction = tag.animation_direction();
        AnimationTag {
            name: tag.name().to_owned(),
            frames,
            is_reversed: direction.is_reversed(),
            is_ping_pong: direction.is_ping_pong(),
            repeat: tag.repeat(),
            color: tag.color(),
        }
    }

    /// Returns `true` if the animation repeats forever.
    pub fn is_looping(&self) -> bool {
        self.repeat == 0
    }

    /// Sum of all frame durations in milliseconds (one pass, no ping-pong).
    pub fn total_duration(&self) -> u32 {
        self.frames.iter().map(|f| f.duration).sum()
    }

    /// Frame indices in order.
    pub fn frame_indices(&self) -> Vec<u32> {
        self.frames.iter().map(|f| f.frame).collect()
    }
}
