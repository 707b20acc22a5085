#![warn(clippy::all)]
#![warn(missing_docs)]
/*!

Turn [Aseprite](https://www.aseprite.org/) files into game assets. This
library directly reads the binary Aseprite files ([file format
specification][spec]) and derives plain-data assets from them: flattened
frame images, packed texture atlases, animation clips, per-frame slice tables
and tile grids. Outputs are `image::RgbaImage` buffers and simple records; no
engine or GPU types are involved.

Note that this library can be rather slow when compiled without optimizations.
We recommend that you override the optimization settings for this dependency
in dev mode by adding the following to your `Cargo.toml`:

```text
[profile.dev.package.asepack]
opt-level = 2  # or 3
```

[spec]: https://github.com/aseprite/aseprite/blob/master/docs/ase-file-specs.md

# Basic Usage

## Load file

The easiest way is to use [AsepriteFile::read_file] to load a file.

```no_run
use asepack::AsepriteFile;
# use std::path::Path;
let ase = AsepriteFile::read_file(Path::new("player.aseprite")).unwrap();

println!("Size: {}x{}", ase.width(), ase.height());
println!("Frames: {}", ase.num_frames());
println!("Layers: {}", ase.num_layers());
```

## Flatten a frame

Aseprite files consist of multiple layers. Usually you just want the final
image. [flatten_frame] blends the layers the same way Aseprite would and lets
you choose whether hidden layers and the background take part.

```no_run
# use asepack::{AsepriteFile, FlattenOptions, flatten_frame};
# use std::path::Path;
# let ase = AsepriteFile::read_file(Path::new("player.aseprite")).unwrap();
let options = FlattenOptions {
    only_visible_layers: true,
    include_background_layer: false,
};
let image = flatten_frame(&ase, 0, &options).unwrap();
println!("{}x{}", image.width(), image.height());
```

## Build a spritesheet

[build_atlas] flattens every frame, packs identical frames only once and
returns the atlas together with frame regions, tag animations and slices.

```no_run
# use asepack::{AsepriteFile, AtlasOptions, build_atlas};
# use std::path::Path;
# let ase = AsepriteFile::read_file(Path::new("player.aseprite")).unwrap();
let sheet = build_atlas(&ase, &AtlasOptions::default()).unwrap();
for frame in &sheet.frames {
    println!("{} at {:?} for {}ms", frame.name, frame.region, frame.duration);
}
let walk = sheet.tag("walk").unwrap();
println!("walk frames: {:?}", walk.frame_indices());
```

## Tilemaps

```no_run
# use asepack::{AsepriteFile, TilemapOptions, build_tilemap};
# use std::path::Path;
# let ase = AsepriteFile::read_file(Path::new("level.aseprite")).unwrap();
let tilemap = build_tilemap(&ase, 0, &TilemapOptions::default()).unwrap();
for layer in &tilemap.frame.layers {
    println!("{}: {}x{} tiles", layer.name, layer.columns, layer.rows);
}
```

*/

pub(crate) mod animation;
pub(crate) mod atlas;
pub(crate) mod blend;
pub(crate) mod cel;
pub(crate) mod color_profile;
pub(crate) mod error;
pub(crate) mod file;
pub(crate) mod flatten;
pub(crate) mod layer;
pub(crate) mod palette;
pub(crate) mod parse;
pub(crate) mod pixel;
pub(crate) mod reader;
pub(crate) mod rect;
pub(crate) mod sheet;
pub(crate) mod slice;
pub(crate) mod tags;
#[cfg(test)]
mod test_builder;
pub(crate) mod tile;
pub(crate) mod tilemap;
pub(crate) mod tileset;
pub(crate) mod user_data;

/// A specialized `Result` type for Aseprite parsing functions.
pub type Result<T> = std::result::Result<T, AsepriteError>;

pub use animation::{AnimationFrame, AnimationTag};
pub use atlas::{grid_size, pack_frames, PackOptions, PackedAtlas};
pub use cel::{Cel, CelKind, PreciseBounds};
pub use color_profile::{ColorProfile, ColorProfileType};
pub use error::AsepriteError;
pub use file::{AsepriteFile, Frame, Grid, HeaderFlags, LayersIter, PixelFormat};
pub use flatten::{flatten_frame, FlattenOptions};
pub use layer::{BlendMode, Layer, LayerFlags, LayerType};
pub use palette::{ColorPalette, ColorPaletteEntry};
pub use rect::Rect;
pub use sheet::{build_atlas, AtlasOptions, SheetFrame, SliceTable, Spritesheet};
pub use slice::{Slice, SliceKey, DEFAULT_SLICE_COLOR};
pub use tags::{AnimationDirection, Tag};
pub use tile::{Tile, TileId, TileTransform};
pub use tilemap::{
    build_animated_tilemap, build_tilemap, AnimatedTilemap, Tilemap, TilemapFrame, TilemapLayer,
    TilemapOptions,
};
pub use tileset::{ExternalTilesetReference, TileSize, Tileset, TilesetId, TilesetsById};
pub use user_data::UserData;
