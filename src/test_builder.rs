// Assembles .aseprite byte streams for tests.
use byteorder::{LittleEndian, WriteBytesExt};
use flate2::{write::ZlibEncoder, Compression};
use std::io::Write;

pub(crate) const OLD_PALETTE_04: u16 = 0x0004;
pub(crate) const LAYER: u16 = 0x2004;
pub(crate) const CEL: u16 = 0x2005;
pub(crate) const CEL_EXTRA: u16 = 0x2006;
pub(crate) const COLOR_PROFILE: u16 = 0x2007;
pub(crate) const TAGS: u16 = 0x2018;
pub(crate) const PALETTE: u16 = 0x2019;
pub(crate) const USER_DATA: u16 = 0x2020;
pub(crate) const SLICE: u16 = 0x2022;
pub(crate) const TILESET: u16 = 0x2023;

#[derive(Default)]
pub(crate) struct Bytes(pub Vec<u8>);

impl Bytes {
    pub fn byte(&mut self, v: u8) -> &mut Self {
        self.0.push(v);
        self
    }
    pub fn word(&mut self, v: u16) -> &mut Self {
        self.0.write_u16::<LittleEndian>(v).unwrap();
        self
    }
    pub fn short(&mut self, v: i16) -> &mut Self {
        self.0.write_i16::<LittleEndian>(v).unwrap();
        self
    }
    pub fn dword(&mut self, v: u32) -> &mut Self {
        self.0.write_u32::<LittleEndian>(v).unwrap();
        self
    }
    pub fn long(&mut self, v: i32) -> &mut Self {
        self.0.write_i32::<LittleEndian>(v).unwrap();
        self
    }
    pub fn fixed(&mut self, v: f64) -> &mut Self {
        self.long((v * 65536.0) as i32)
    }
    pub fn zeros(&mut self, count: usize) -> &mut Self {
        self.0.extend(std::iter::repeat(0).take(count));
        self
    }
    pub fn string(&mut self, s: &str) -> &mut Self {
        self.word(s.len() as u16);
        self.0.extend_from_slice(s.as_bytes());
        self
    }
    pub fn bytes(&mut self, data: &[u8]) -> &mut Self {
        self.0.extend_from_slice(data);
        self
    }
    pub fn take(&mut self) -> Vec<u8> {
        std::mem::take(&mut self.0)
    }
}

pub(crate) fn compress(data: &[u8]) -> Vec<u8> {
    let mut encoder = ZlibEncoder::new(Vec::new(), Compression::default());
    encoder.write_all(data).unwrap();
    encoder.finish().unwrap()
}

pub(crate) fn rgba_bytes(pixels: &[[u8; 4]]) -> Vec<u8> {
    pixels.iter().flat_map(|p| p.iter().copied()).collect()
}

pub(crate) fn palette_chunk(colors: &[[u8; 4]]) -> Vec<u8> {
    let mut b = Bytes::default();
    b.dword(colors.len() as u32)
        .dword(0)
        .dword(colors.len() as u32 - 1)
        .zeros(8);
    for c in colors {
        b.word(0).byte(c[0]).byte(c[1]).byte(c[2]).byte(c[3]);
    }
    b.take()
}

pub(crate) struct LayerChunk {
    name: String,
    flags: u16,
    layer_type: u16,
    child_level: u16,
    blend_mode: u16,
    opacity: u8,
    tileset: u32,
}

impl LayerChunk {
    pub fn image(name: &str) -> Self {
        LayerChunk {
            name: name.to_owned(),
            flags: 0x1 | 0x2,
            layer_type: 0,
            child_level: 0,
            blend_mode: 0,
            opacity: 255,
            tileset: 0,
        }
    }
    pub fn group(name: &str) -> Self {
        LayerChunk {
            layer_type: 1,
            ..Self::image(name)
        }
    }
    pub fn tilemap(name: &str, tileset: u32) -> Self {
        LayerChunk {
            layer_type: 2,
            tileset,
            ..Self::image(name)
        }
    }
    pub fn opacity(mut self, opacity: u8) -> Self {
        self.opacity = opacity;
        self
    }
    pub fn hidden(mut self) -> Self {
        self.flags &= !0x1;
        self
    }
    pub fn background(mut self) -> Self {
        self.flags |= 0x8;
        self
    }
    pub fn child_level(mut self, level: u16) -> Self {
        self.child_level = level;
        self
    }
    pub fn blend_mode(mut self, mode: u16) -> Self {
        self.blend_mode = mode;
        self
    }
    pub fn build(&self) -> Vec<u8> {
        let mut b = Bytes::default();
        b.word(self.flags)
            .word(self.layer_type)
            .word(self.child_level)
            .word(0)
            .word(0)
            .word(self.blend_mode)
            .byte(self.opacity)
            .zeros(3)
            .string(&self.name);
        if self.layer_type == 2 {
            b.dword(self.tileset);
        }
        b.take()
    }
}

enum CelBody {
    Image {
        width: u16,
        height: u16,
        pixels: Vec<u8>,
        compressed: bool,
    },
    Linked(u16),
    Tilemap {
        columns: u16,
        rows: u16,
        tiles: Vec<u32>,
    },
    Raw(u16, Vec<u8>),
}

pub(crate) struct CelChunk {
    layer: u16,
    x: i16,
    y: i16,
    opacity: u8,
    z_index: i16,
    body: CelBody,
}

impl CelChunk {
    fn new(layer: u16, body: CelBody) -> Self {
        CelChunk {
            layer,
            x: 0,
            y: 0,
            opacity: 255,
            z_index: 0,
            body,
        }
    }
    /// Pixels in the file's color depth, compressed by default.
    pub fn image(layer: u16, width: u16, height: u16, pixels: &[u8]) -> Self {
        Self::new(
            layer,
            CelBody::Image {
                width,
                height,
                pixels: pixels.to_vec(),
                compressed: true,
            },
        )
    }
    pub fn rgba(layer: u16, width: u16, height: u16, pixels: &[[u8; 4]]) -> Self {
        Self::image(layer, width, height, &rgba_bytes(pixels))
    }
    pub fn linked(layer: u16, frame: u16) -> Self {
        Self::new(layer, CelBody::Linked(frame))
    }
    pub fn tilemap(layer: u16, columns: u16, rows: u16, tiles: &[u32]) -> Self {
        Self::new(
            layer,
            CelBody::Tilemap {
                columns,
                rows,
                tiles: tiles.to_vec(),
            },
        )
    }
    /// A cel of the given type with an arbitrary body.
    pub fn with_type(layer: u16, cel_type: u16, body: &[u8]) -> Self {
        Self::new(layer, CelBody::Raw(cel_type, body.to_vec()))
    }
    pub fn uncompressed(mut self) -> Self {
        if let CelBody::Image { compressed, .. } = &mut self.body {
            *compressed = false;
        }
        self
    }
    pub fn at(mut self, x: i16, y: i16) -> Self {
        self.x = x;
        self.y = y;
        self
    }
    pub fn opacity(mut self, opacity: u8) -> Self {
        self.opacity = opacity;
        self
    }
    pub fn z_index(mut self, z_index: i16) -> Self {
        self.z_index = z_index;
        self
    }
    pub fn build(&self) -> Vec<u8> {
        let cel_type = match &self.body {
            CelBody::Image {
                compressed: false, ..
            } => 0,
            CelBody::Linked(_) => 1,
            CelBody::Image {
                compressed: true, ..
            } => 2,
            CelBody::Tilemap { .. } => 3,
            CelBody::Raw(cel_type, _) => *cel_type,
        };
        let mut b = Bytes::default();
        b.word(self.layer)
            .short(self.x)
            .short(self.y)
            .byte(self.opacity)
            .word(cel_type)
            .short(self.z_index)
            .zeros(5);
        match &self.body {
            CelBody::Image {
                width,
                height,
                pixels,
                compressed,
            } => {
                b.word(*width).word(*height);
                if *compressed {
                    b.bytes(&compress(pixels));
                } else {
                    b.bytes(pixels);
                }
            }
            CelBody::Linked(frame) => {
                b.word(*frame);
            }
            CelBody::Tilemap {
                columns,
                rows,
                tiles,
            } => {
                let mut raw = Bytes::default();
                for tile in tiles {
                    raw.dword(*tile);
                }
                b.word(*columns)
                    .word(*rows)
                    .word(32)
                    .dword(0x1fff_ffff)
                    .dword(0x2000_0000)
                    .dword(0x4000_0000)
                    .dword(0x8000_0000)
                    .zeros(10)
                    .bytes(&compress(&raw.0));
            }
            CelBody::Raw(_, body) => {
                b.bytes(body);
            }
        }
        b.take()
    }
}

pub(crate) fn cel_extra_chunk(x: f64, y: f64, width: f64, height: f64) -> Vec<u8> {
    let mut b = Bytes::default();
    b.dword(1).fixed(x).fixed(y).fixed(width).fixed(height).zeros(16);
    b.take()
}

pub(crate) fn tileset_chunk(id: u32, name: &str, tile_size: (u16, u16), pixels: &[[u8; 4]]) -> Vec<u8> {
    let (width, height) = tile_size;
    let tile_count = pixels.len() as u32 / (width as u32 * height as u32);
    let data = compress(&rgba_bytes(pixels));
    let mut b = Bytes::default();
    b.dword(id)
        .dword(0x2 | 0x4)
        .dword(tile_count)
        .word(width)
        .word(height)
        .short(1)
        .zeros(14)
        .string(name)
        .dword(data.len() as u32)
        .bytes(&data);
    b.take()
}

pub(crate) struct TagSpec {
    name: String,
    from: u16,
    to: u16,
    direction: u8,
    repeat: u16,
    color: [u8; 3],
}

impl TagSpec {
    pub fn new(name: &str, from: u16, to: u16, direction: u8) -> Self {
        TagSpec {
            name: name.to_owned(),
            from,
            to,
            direction,
            repeat: 0,
            color: [0, 0, 0],
        }
    }
    pub fn repeat(mut self, repeat: u16) -> Self {
        self.repeat = repeat;
        self
    }
    pub fn color(mut self, color: [u8; 3]) -> Self {
        self.color = color;
        self
    }
}

pub(crate) fn tags_chunk(tags: &[TagSpec]) -> Vec<u8> {
    let mut b = Bytes::default();
    b.word(tags.len() as u16).zeros(8);
    for tag in tags {
        b.word(tag.from)
            .word(tag.to)
            .byte(tag.direction)
            .word(tag.repeat)
            .zeros(6)
            .bytes(&tag.color)
            .byte(0)
            .string(&tag.name);
    }
    b.take()
}

pub(crate) struct SliceKeySpec {
    pub frame: u32,
    pub bounds: (i32, i32, u32, u32),
    pub center: Option<(i32, i32, u32, u32)>,
    pub pivot: Option<(i32, i32)>,
}

impl SliceKeySpec {
    pub fn at(frame: u32, bounds: (i32, i32, u32, u32)) -> Self {
        SliceKeySpec {
            frame,
            bounds,
            center: None,
            pivot: None,
        }
    }
}

pub(crate) fn slice_chunk(name: &str, keys: &[SliceKeySpec]) -> Vec<u8> {
    let nine_patch = keys.iter().any(|k| k.center.is_some());
    let pivot = keys.iter().any(|k| k.pivot.is_some());
    let flags = (if nine_patch { 1 } else { 0 }) | (if pivot { 2 } else { 0 });
    let mut b = Bytes::default();
    b.dword(keys.len() as u32).dword(flags).dword(0).string(name);
    for key in keys {
        let (x, y, w, h) = key.bounds;
        b.dword(key.frame).long(x).long(y).dword(w).dword(h);
        if nine_patch {
            let (cx, cy, cw, ch) = key.center.unwrap_or((0, 0, 0, 0));
            b.long(cx).long(cy).dword(cw).dword(ch);
        }
        if pivot {
            let (px, py) = key.pivot.unwrap_or((0, 0));
            b.long(px).long(py);
        }
    }
    b.take()
}

pub(crate) fn user_data_chunk(text: Option<&str>, color: Option<[u8; 4]>) -> Vec<u8> {
    let flags = (if text.is_some() { 1 } else { 0 }) | (if color.is_some() { 2 } else { 0 });
    let mut b = Bytes::default();
    b.dword(flags);
    if let Some(text) = text {
        b.string(text);
    }
    if let Some(color) = color {
        b.bytes(&color);
    }
    b.take()
}

struct FrameSpec {
    duration: u16,
    chunks: Vec<(u16, Vec<u8>)>,
}

/// A whole file: 128 byte header followed by the frames.
pub(crate) struct AseBuilder {
    width: u16,
    height: u16,
    color_depth: u16,
    flags: u32,
    transparent_index: u8,
    frames: Vec<FrameSpec>,
}

impl AseBuilder {
    pub fn rgba(width: u16, height: u16) -> Self {
        AseBuilder {
            width,
            height,
            color_depth: 32,
            flags: 1,
            transparent_index: 0,
            frames: Vec::new(),
        }
    }
    pub fn grayscale(width: u16, height: u16) -> Self {
        AseBuilder {
            color_depth: 16,
            ..Self::rgba(width, height)
        }
    }
    pub fn indexed(width: u16, height: u16, transparent_index: u8) -> Self {
        AseBuilder {
            color_depth: 8,
            transparent_index,
            ..Self::rgba(width, height)
        }
    }
    pub fn flags(mut self, flags: u32) -> Self {
        self.flags = flags;
        self
    }
    pub fn frame(mut self, duration: u16, chunks: Vec<(u16, Vec<u8>)>) -> Self {
        self.frames.push(FrameSpec { duration, chunks });
        self
    }
    pub fn build(&self) -> Vec<u8> {
        let mut body = Bytes::default();
        for frame in &self.frames {
            let size: usize = 16 + frame.chunks.iter().map(|(_, d)| 6 + d.len()).sum::<usize>();
            body.dword(size as u32)
                .word(0xF1FA)
                .word(frame.chunks.len().min(0xffff) as u16)
                .word(frame.duration)
                .zeros(2)
                .dword(frame.chunks.len() as u32);
            for (chunk_type, data) in &frame.chunks {
                body.dword(6 + data.len() as u32).word(*chunk_type).bytes(data);
            }
        }
        let mut b = Bytes::default();
        b.dword(128 + body.0.len() as u32)
            .word(0xA5E0)
            .word(self.frames.len() as u16)
            .word(self.width)
            .word(self.height)
            .word(self.color_depth)
            .dword(self.flags)
            .word(100)
            .dword(0)
            .dword(0)
            .byte(self.transparent_index)
            .zeros(3)
            .word(0)
            .byte(1)
            .byte(1)
            .short(0)
            .short(0)
            .word(16)
            .word(16)
            .zeros(84)
            .bytes(&body.0);
        b.take()
    }
}
