//! Duplicate detection and grid packing of equally sized frames.
use crate::{AsepriteError, Rect, Result};
use image::RgbaImage;
use log::debug;
use nohash::IntMap;

/// Layout of a packed atlas.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PackOptions {
    /// Pack pixel-identical frames only once.
    pub merge_duplicates: bool,
    /// Empty pixels around the whole atlas.
    pub border_padding: u32,
    /// Empty pixels between neighboring cells.
    pub spacing: u32,
    /// Empty pixels inside each cell, on all four sides of the frame.
    pub inner_padding: u32,
}

impl Default for PackOptions {
    fn default() -> Self {
        PackOptions {
            merge_duplicates: true,
            border_padding: 0,
            spacing: 0,
            inner_padding: 0,
        }
    }
}

/// Frames packed into a single image on a near-square grid.
#[derive(Debug, Clone)]
pub struct PackedAtlas {
    /// The atlas pixels.
    pub image: RgbaImage,
    /// Number of grid columns.
    pub columns: u32,
    /// Number of grid rows.
    pub rows: u32,
    /// Size of every packed frame.
    pub frame_size: (u32, u32),
    /// Region of every input frame, in input order. Duplicates share the
    /// region of the frame they duplicate.
    pub regions: Vec<Rect>,
    duplicates: IntMap<u32, u32>,
}

impl PackedAtlas {
    /// Atlas width in pixels.
    pub fn width(&self) -> u32 {
        self.image.width()
    }

    /// Atlas height in pixels.
    pub fn height(&self) -> u32 {
        self.image.height()
    }

    /// The earlier frame that `frame` is an exact copy of, if it was merged.
    pub fn duplicate_of(&self, frame: u32) -> Option<u32> {
        self.duplicates.get(&frame).copied()
    }

    /// Map from duplicate frame index to original frame index.
    pub fn duplicates(&self) -> &IntMap<u32, u32> {
        &self.duplicates
    }

    /// Number of frames with their own pixels in the atlas.
    pub fn unique_count(&self) -> u32 {
        self.regions.len() as u32 - self.duplicates.len() as u32
    }
}

/// Grid size for `unique` cells: the smallest square-ish grid with
/// `columns = ceil(sqrt(unique))` and the fewest rows that fit.
pub fn grid_size(unique: u32) -> (u32, u32) {
    if unique == 0 {
        return (0, 0);
    }
    let mut columns = (unique as f64).sqrt() as u32;
    while (columns as u64) * (columns as u64) < unique as u64 {
        columns += 1;
    }
    while columns > 1 && ((columns - 1) as u64) * ((columns - 1) as u64) >= unique as u64 {
        columns -= 1;
    }
    let rows = (unique + columns - 1) / columns;
    (columns, rows)
}

// cells * cell + 2 * border + (cells - 1) * spacing + 2 * cells * inner
fn atlas_extent(cells: u32, cell: u32, options: &PackOptions) -> Option<u32> {
    let cells = cells as u64;
    let extent = cells * cell as u64
        + 2 * options.border_padding as u64
        + cells.saturating_sub(1) * options.spacing as u64
        + 2 * cells * options.inner_padding as u64;
    if extent > u32::MAX as u64 {
        None
    } else {
        Some(extent as u32)
    }
}

// Top-left pixel of a frame in its cell. Bounded by `atlas_extent`, which
// already fit in u32.
fn cell_origin(cell_index: u32, cell: u32, options: &PackOptions) -> u32 {
    let step = cell as u64 + options.spacing as u64 + 2 * options.inner_padding as u64;
    let origin = options.border_padding as u64
        + cell_index as u64 * step
        + options.inner_padding as u64;
    origin as u32
}

fn find_duplicates(frames: &[RgbaImage]) -> IntMap<u32, u32> {
    let mut duplicates = IntMap::default();
    for i in 0..frames.len() {
        let original = (0..i)
            .filter(|d| !duplicates.contains_key(&(*d as u32)))
            .find(|&d| frames[d] == frames[i]);
        if let Some(d) = original {
            duplicates.insert(i as u32, d as u32);
        }
    }
    duplicates
}

/// Pack equally sized frames into one atlas.
///
/// Unique frames fill the grid row by row in input order. With
/// `merge_duplicates`, a frame equal to an earlier one reuses that frame's
/// region instead of taking a cell.
pub fn pack_frames(frames: &[RgbaImage], options: &PackOptions) -> Result<PackedAtlas> {
    let frame_size = frames.first().map(|f| f.dimensions()).unwrap_or((0, 0));
    if let Some((index, frame)) = frames
        .iter()
        .enumerate()
        .find(|(_, f)| f.dimensions() != frame_size)
    {
        return Err(AsepriteError::InvalidArgument(format!(
            "Frame {} is {}x{}, expected {}x{}",
            index,
            frame.width(),
            frame.height(),
            frame_size.0,
            frame_size.1
        )));
    }
    if frames.len() > u32::MAX as usize {
        return Err(AsepriteError::InvalidArgument(format!(
            "Too many frames to pack: {}",
            frames.len()
        )));
    }

    let duplicates = if options.merge_duplicates {
        find_duplicates(frames)
    } else {
        IntMap::default()
    };
    let unique = frames.len() as u32 - duplicates.len() as u32;
    let (columns, rows) = grid_size(unique);
    let (frame_width, frame_height) = frame_size;

    let too_large = || {
        AsepriteError::InvalidArgument(format!(
            "Atlas for {} frames of {}x{} with {:?} exceeds the maximum image size",
            unique, frame_width, frame_height, options
        ))
    };
    let width = atlas_extent(columns, frame_width, options).ok_or_else(too_large)?;
    let height = atlas_extent(rows, frame_height, options).ok_or_else(too_large)?;
    debug!(
        "Packing {} frames ({} unique) into {}x{} grid, {}x{} pixels",
        frames.len(),
        unique,
        columns,
        rows,
        width,
        height
    );

    let mut image = RgbaImage::new(width, height);
    let mut regions: Vec<Rect> = Vec::with_capacity(frames.len());
    let mut slot = 0;

    for (index, frame) in frames.iter().enumerate() {
        if let Some(&original) = duplicates.get(&(index as u32)) {
            let region = regions[original as usize];
            regions.push(region);
            continue;
        }
        let column = slot % columns;
        let row = slot / columns;
        slot += 1;
        let x = cell_origin(column, frame_width, options);
        let y = cell_origin(row, frame_height, options);
        for (px, py, pixel) in frame.enumerate_pixels() {
            image.put_pixel(x + px, y + py, *pixel);
        }
        regions.push(Rect::new(x as i32, y as i32, frame_width, frame_height));
    }

    Ok(PackedAtlas {
        image,
        columns,
        rows,
        frame_size,
        regions,
        duplicates,
    })
}

#[cfg(test)]
mod test {
    use super::*;
    use image::Rgba;

    fn solid(size: u32, color: [u8; 4]) -> RgbaImage {
        RgbaImage::from_pixel(size, size, Rgba(color))
    }

    fn noise(size: u32) -> RgbaImage {
        let mut image = RgbaImage::new(size, size);
        for pixel in image.pixels_mut() {
            *pixel = Rgba([rand::random(), rand::random(), rand::random(), 255]);
        }
        image
    }

    #[test]
    fn grid_sizes() {
        assert_eq!(grid_size(0), (0, 0));
        assert_eq!(grid_size(1), (1, 1));
        assert_eq!(grid_size(2), (2, 1));
        assert_eq!(grid_size(4), (2, 2));
        assert_eq!(grid_size(5), (3, 2));
        assert_eq!(grid_size(10), (4, 3));
        for unique in 1..=100_u32 {
            let (columns, rows) = grid_size(unique);
            let sqrt_ceil = (unique as f64).sqrt().ceil() as u32;
            assert_eq!(columns, sqrt_ceil, "unique={}", unique);
            assert!(columns * rows >= unique);
            assert!(columns * (rows - 1) < unique, "rows not minimal for {}", unique);
        }
    }

    #[test]
    fn merges_duplicates() {
        let red = solid(8, [255, 0, 0, 255]);
        let blue = solid(8, [0, 0, 255, 255]);
        let frames = vec![red.clone(), blue, red];
        let atlas = pack_frames(&frames, &PackOptions::default()).unwrap();
        assert_eq!((atlas.width(), atlas.height()), (16, 8));
        assert_eq!((atlas.columns, atlas.rows), (2, 1));
        assert_eq!(atlas.regions[2], atlas.regions[0]);
        assert_eq!(atlas.duplicate_of(2), Some(0));
        assert_eq!(atlas.duplicate_of(1), None);
        assert_eq!(atlas.unique_count(), 2);
        assert_eq!(atlas.image.get_pixel(9, 0), &Rgba([0, 0, 255, 255]));
    }

    #[test]
    fn keeps_duplicates_when_not_merging() {
        let frame = solid(4, [1, 2, 3, 255]);
        let options = PackOptions {
            merge_duplicates: false,
            ..PackOptions::default()
        };
        let atlas = pack_frames(&[frame.clone(), frame], &options).unwrap();
        assert_eq!(atlas.unique_count(), 2);
        assert_ne!(atlas.regions[0], atlas.regions[1]);
    }

    #[test]
    fn duplicate_chain_points_at_first_original() {
        let frames: Vec<RgbaImage> = (0..5).map(|_| noise(4)).collect();
        let mut input = frames.clone();
        input.push(frames[3].clone());
        input.push(frames[3].clone());
        input.push(frames[0].clone());
        let atlas = pack_frames(&input, &PackOptions::default()).unwrap();
        assert_eq!(atlas.duplicate_of(5), Some(3));
        assert_eq!(atlas.duplicate_of(6), Some(3));
        assert_eq!(atlas.duplicate_of(7), Some(0));
        for (dup, original) in atlas.duplicates() {
            assert_eq!(atlas.regions[*dup as usize], atlas.regions[*original as usize]);
        }
        assert_eq!(atlas.unique_count(), 5);
        assert_eq!((atlas.columns, atlas.rows), (3, 2));
    }

    #[test]
    fn padding_layout() {
        let frames: Vec<RgbaImage> = (0..3_u8).map(|i| solid(2, [i, 0, 0, 255])).collect();
        let options = PackOptions {
            merge_duplicates: true,
            border_padding: 1,
            spacing: 2,
            inner_padding: 3,
        };
        let atlas = pack_frames(&frames, &options).unwrap();
        // 2x2 grid: 2*2 + 2*1 + 1*2 + 2*2*3 = 20
        assert_eq!((atlas.width(), atlas.height()), (20, 20));
        assert_eq!(atlas.regions[0], Rect::new(4, 4, 2, 2));
        // x = border + column * (frame + spacing + 2 * inner) + inner
        assert_eq!(atlas.regions[1], Rect::new(1 + 10 + 3, 4, 2, 2));
        assert_eq!(atlas.regions[2], Rect::new(4, 14, 2, 2));
        // Padding stays transparent.
        assert_eq!(atlas.image.get_pixel(3, 4), &Rgba([0, 0, 0, 0]));
        assert_eq!(atlas.image.get_pixel(14, 4), &Rgba([1, 0, 0, 255]));
    }

    #[test]
    fn no_frames_gives_border_only() {
        let options = PackOptions {
            border_padding: 2,
            ..PackOptions::default()
        };
        let atlas = pack_frames(&[], &options).unwrap();
        assert_eq!((atlas.width(), atlas.height()), (4, 4));
        assert!(atlas.regions.is_empty());
    }

    #[test]
    fn mismatched_sizes_rejected() {
        let frames = vec![solid(2, [0; 4]), solid(3, [0; 4])];
        assert!(matches!(
            pack_frames(&frames, &PackOptions::default()),
            Err(AsepriteError::InvalidArgument(_))
        ));
    }

    #[test]
    fn oversized_atlas_rejected() {
        let options = PackOptions {
            border_padding: u32::MAX / 2 + 1,
            ..PackOptions::default()
        };
        assert!(matches!(
            pack_frames(&[solid(1, [0; 4])], &options),
            Err(AsepriteError::InvalidArgument(_))
        ));
    }

    #[test]
    fn spacing_unused_by_single_cell() {
        let options = PackOptions {
            spacing: u32::MAX,
            ..PackOptions::default()
        };
        let atlas = pack_frames(&[solid(1, [7, 7, 7, 255])], &options).unwrap();
        assert_eq!((atlas.width(), atlas.height()), (1, 1));
        assert_eq!(atlas.regions, vec![Rect::new(0, 0, 1, 1)]);

        let atlas = pack_frames(&[], &options).unwrap();
        assert_eq!((atlas.width(), atlas.height()), (0, 0));
    }
}
