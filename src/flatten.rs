//! Compositing cels into frame images.
use crate::{
    blend::{self, mul_un8, BlendFn},
    cel::{CelContent, CelId, RawCel},
    layer::LayerType,
    tilemap::TilemapData,
    AsepriteError, AsepriteFile, Result, Tileset,
};
use image::{Rgba, RgbaImage};
use log::debug;

/// Which layers take part in flattening.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FlattenOptions {
    /// Skip layers hidden in Aseprite (directly or via a parent group).
    pub only_visible_layers: bool,
    /// Composite the background layer. Turn this off to get frames with a
    /// transparent background.
    pub include_background_layer: bool,
}

impl Default for FlattenOptions {
    fn default() -> Self {
        FlattenOptions {
            only_visible_layers: true,
            include_background_layer: true,
        }
    }
}

/// Composite all cels of `frame` into one canvas-sized image.
///
/// Cels are drawn bottom to top, honoring z-index, with the combined cel and
/// layer opacity and the layer's blend mode. Group and tilemap layers are
/// skipped. The result depends only on the file and the options.
pub fn flatten_frame(
    file: &AsepriteFile,
    frame: u32,
    options: &FlattenOptions,
) -> Result<RgbaImage> {
    if frame >= file.num_frames() {
        return Err(AsepriteError::index_out_of_range(
            "Frame",
            frame,
            file.num_frames(),
        ));
    }
    Ok(compose_frame(file, frame as u16, options))
}

pub(crate) fn compose_frame(file: &AsepriteFile, frame: u16, options: &FlattenOptions) -> RgbaImage {
    let mut image = RgbaImage::new(file.width as u32, file.height as u32);

    for (layer_id, cel) in ordered_cels(file, frame) {
        let layer = &file.layers[layer_id];
        match layer.layer_type {
            LayerType::Image => {}
            LayerType::Group | LayerType::Tilemap(_) => continue,
        }
        let view = crate::Layer {
            file,
            layer_id,
        };
        if options.only_visible_layers && !view.is_visible() {
            continue;
        }
        if layer.is_background() && !options.include_background_layer {
            continue;
        }
        let opacity = mul_un8(cel.common.opacity as i32, layer.opacity as i32);
        if opacity == 0 {
            continue;
        }
        let blend_fn = blend::blend_fn(layer.blend_mode);
        write_cel(file, &mut image, layer_id, cel, opacity, blend_fn);
    }

    image
}

// Aseprite draws a cel at position `layer + z_index`; ties go to the cel with
// the lower z-index.
fn ordered_cels(file: &AsepriteFile, frame: u16) -> Vec<(u32, &RawCel)> {
    let mut cels: Vec<(u32, &RawCel)> = file.framedata.frame_cels(frame).collect();
    if cels.iter().any(|(_, cel)| cel.common.z_index != 0) {
        cels.sort_by_key(|(layer_id, cel)| {
            let z = cel.common.z_index as i32;
            (*layer_id as i32 + z, z)
        });
    }
    cels
}

/// The cel drawn onto a transparent canvas-sized image, using only the cel
/// opacity.
pub(crate) fn cel_image(file: &AsepriteFile, cel_id: CelId) -> RgbaImage {
    let mut image = RgbaImage::new(file.width as u32, file.height as u32);
    if let Some(cel) = file.framedata.cel(cel_id) {
        let layer = &file.layers[cel_id.layer as u32];
        let blend_fn = blend::blend_fn(layer.blend_mode);
        write_cel(
            file,
            &mut image,
            cel_id.layer as u32,
            cel,
            cel.common.opacity,
            blend_fn,
        );
    }
    image
}

fn write_cel(
    file: &AsepriteFile,
    image: &mut RgbaImage,
    layer_id: u32,
    cel: &RawCel,
    opacity: u8,
    blend_fn: BlendFn,
) {
    let origin = (cel.common.x as i32, cel.common.y as i32);
    match cel.content.as_ref() {
        CelContent::Image(pixels) => {
            write_image(image, origin, pixels, opacity, blend_fn);
        }
        CelContent::Tilemap(tilemap) => {
            let tileset = match file.layers[layer_id].layer_type {
                LayerType::Tilemap(id) => file.tilesets.get(id),
                LayerType::Image | LayerType::Group => None,
            };
            match tileset {
                Some(tileset) => {
                    write_tilemap(image, origin, tilemap, tileset, opacity, blend_fn);
                }
                None => debug!("Tilemap cel on layer {} has no tileset", layer_id),
            }
        }
    }
}

fn blend_pixel(
    image: &mut RgbaImage,
    x: i32,
    y: i32,
    pixel: Rgba<u8>,
    opacity: u8,
    blend_fn: BlendFn,
) {
    // Skip pixels off of the canvas.
    if x < 0 || y < 0 || x >= image.width() as i32 || y >= image.height() as i32 {
        return;
    }
    let (x, y) = (x as u32, y as u32);
    let backdrop = *image.get_pixel(x, y);
    image.put_pixel(x, y, blend_fn(backdrop, pixel, opacity));
}

fn write_image(
    image: &mut RgbaImage,
    (x0, y0): (i32, i32),
    pixels: &RgbaImage,
    opacity: u8,
    blend_fn: BlendFn,
) {
    for (x, y, pixel) in pixels.enumerate_pixels() {
        blend_pixel(image, x0 + x as i32, y0 + y as i32, *pixel, opacity, blend_fn);
    }
}

fn write_tilemap(
    image: &mut RgbaImage,
    (x0, y0): (i32, i32),
    tilemap: &TilemapData,
    tileset: &Tileset,
    opacity: u8,
    blend_fn: BlendFn,
) {
    let strip = match tileset.image() {
        Some(strip) => strip,
        None => {
            debug!("Tileset '{}' has no pixels in this file", tileset.name());
            return;
        }
    };
    let (tile_width, tile_height): (u32, u32) = tileset.tile_size().into();
    if tile_width == 0 || tile_height == 0 {
        return;
    }
    let square = tile_width == tile_height;

    for tile_y in 0..tilemap.height() {
        for tile_x in 0..tilemap.width() {
            let tile = match tilemap.tile(tile_x, tile_y) {
                Some(tile) => tile,
                None => continue,
            };
            if tileset.is_empty_tile(tile.id) {
                continue;
            }
            let mut transform = tile.transform();
            if transform.swaps_axes() && !square {
                debug!("Ignoring diagonal flip on non-square tile {}", tile.id.0);
                let mut flat = *tile;
                flat.flip_diagonal = false;
                transform = flat.transform();
            }
            let strip_y0 = tile.id.0 * tile_height;
            let cell_x = x0 + tile_x as i32 * tile_width as i32;
            let cell_y = y0 + tile_y as i32 * tile_height as i32;
            for py in 0..tile_height {
                for px in 0..tile_width {
                    let (sx, sy) = transform.source_pixel(px, py, tile_width, tile_height);
                    let pixel = *strip.get_pixel(sx, strip_y0 + sy);
                    blend_pixel(
                        image,
                        cell_x + px as i32,
                        cell_y + py as i32,
                        pixel,
                        opacity,
                        blend_fn,
                    );
                }
            }
        }
    }
}
