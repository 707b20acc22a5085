use crate::{reader::AseReader, user_data::UserData, AsepriteError, Result};

/// A tag is a grouping of one or more frames.
///
/// Tags usually describe one animation clip, e.g. "idle" or "walk".
#[derive(Debug, Clone)]
pub struct Tag {
    name: String,
    from_frame: u16,
    to_frame: u16,
    animation_direction: AnimationDirection,
    repeat: u16,
    color: [u8; 3],
    user_data: Option<UserData>,
}

impl Tag {
    /// Tag name. May not be unique among all tags.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// First frame included in the tag.
    pub fn from_frame(&self) -> u32 {
        self.from_frame as u32
    }

    /// Last frame included in the tag (inclusive).
    pub fn to_frame(&self) -> u32 {
        self.to_frame as u32
    }

    /// Number of frames covered by the tag.
    pub fn num_frames(&self) -> u32 {
        self.to_frame() - self.from_frame() + 1
    }

    /// See [AnimationDirection] for details.
    pub fn animation_direction(&self) -> AnimationDirection {
        self.animation_direction
    }

    /// How often the animation plays. 0 means forever.
    pub fn repeat(&self) -> u16 {
        self.repeat
    }

    /// Tag color in the timeline, as RGB.
    pub fn color(&self) -> [u8; 3] {
        self.color
    }

    /// The tag's user data, if any is present.
    pub fn user_data(&self) -> Option<&UserData> {
        self.user_data.as_ref()
    }

    pub(crate) fn set_user_data(&mut self, user_data: UserData) {
        self.user_data = Some(user_data);
    }

    pub(crate) fn validate(&self, num_frames: u32) -> Result<()> {
        if self.from_frame > self.to_frame || self.to_frame() >= num_frames {
            return Err(AsepriteError::InvalidInput(format!(
                "Tag '{}' covers frames {}..={} but the file has {} frames",
                self.name, self.from_frame, self.to_frame, num_frames
            )));
        }
        Ok(())
    }
}

/// Describes how the tag's frames should be animated.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AnimationDirection {
    /// Start at `from_frame` and count up to `to_frame`.
    Forward,
    /// Start at `to_frame` and count down to `from_frame`.
    Reverse,
    /// Start at `from_frame`, count up to `to_frame`, then back down to
    /// `from_frame`.
    PingPong,
    /// Start at `to_frame`, count down to `from_frame`, then back up to
    /// `to_frame`.
    PingPongReverse,
}

impl AnimationDirection {
    /// Playback starts at the last frame.
    pub fn is_reversed(&self) -> bool {
        matches!(
            self,
            AnimationDirection::Reverse | AnimationDirection::PingPongReverse
        )
    }

    /// Playback bounces between both ends.
    pub fn is_ping_pong(&self) -> bool {
        matches!(
            self,
            AnimationDirection::PingPong | AnimationDirection::PingPongReverse
        )
    }
}

pub(crate) fn parse_chunk(data: &[u8]) -> Result<Vec<Tag>> {
    let mut reader = AseReader::new(data);

    let num_tags = reader.word()?;
    reader.skip_bytes(8)?;

    let mut result = Vec::with_capacity(num_tags as usize);

    for _tag in 0..num_tags {
        let from_frame = reader.word()?;
        let to_frame = reader.word()?;
        let anim_dir = reader.byte()?;
        let repeat = reader.word()?;
        reader.skip_bytes(6)?;
        let mut color = [0_u8; 3];
        reader.read_exact(&mut color)?;
        let _extra = reader.byte()?;
        let name = reader.string()?;
        let animation_direction = parse_animation_direction(anim_dir)?;
        result.push(Tag {
            name,
            from_frame,
            to_frame,
            animation_direction,
            repeat,
            color,
            user_data: None,
        });
    }

    Ok(result)
}

fn parse_animation_direction(id: u8) -> Result<AnimationDirection> {
    match id {
        0 => Ok(AnimationDirection::Forward),
        1 => Ok(AnimationDirection::Reverse),
        2 => Ok(AnimationDirection::PingPong),
        3 => Ok(AnimationDirection::PingPongReverse),
        _ => Err(AsepriteError::InvalidInput(format!(
            "Unknown animation direction: {}",
            id
        ))),
    }
}
