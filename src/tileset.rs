//! Tileset atlas: GID resolution and tile blitting.

use crate::map::TilesetDef;
use macroquad::prelude::*;
use std::path::Path;

/// Directory tileset images are resolved from, keyed by file basename.
pub const TILESET_DIR: &str = "assets/tilesets";

/// Source rectangle inside a tileset image, in pixels.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SourceRect {
    /// Left edge.
    pub x: f32,
    /// Top edge.
    pub y: f32,
    /// Width.
    pub w: f32,
    /// Height.
    pub h: f32,
}

/// Resolve a GID to its tileset by range containment, first match wins.
///
/// Returns the tileset and the local index `gid - firstgid`.
pub fn resolve_gid(tilesets: &[TilesetDef], gid: u32) -> Option<(&TilesetDef, u32)> {
    tilesets
        .iter()
        .find(|ts| gid >= ts.firstgid && gid < ts.firstgid + ts.tilecount)
        .map(|ts| (ts, gid - ts.firstgid))
}

/// Source rectangle for a local tile index, row-major over the atlas grid.
pub fn source_rect(ts: &TilesetDef, local: u32) -> SourceRect {
    let col = local % ts.columns;
    let row = local / ts.columns;
    SourceRect {
        x: (col * ts.tile_width) as f32,
        y: (row * ts.tile_height) as f32,
        w: ts.tile_width as f32,
        h: ts.tile_height as f32,
    }
}

struct LoadedTileset {
    def: TilesetDef,
    // None when the image failed to load; those tiles draw nothing.
    tex: Option<Texture2D>,
}

/// Tileset images plus the GID ranges mapping into them.
pub struct TilesetAtlas {
    tilesets: Vec<LoadedTileset>,
}

impl TilesetAtlas {
    /// Load every tileset image by convention from [`TILESET_DIR`].
    ///
    /// A single failed image is logged and non-fatal.
    pub async fn load(defs: &[TilesetDef]) -> Self {
        let mut tilesets = Vec::with_capacity(defs.len());
        for def in defs {
            let basename = Path::new(&def.image)
                .file_name()
                .and_then(|n| n.to_str())
                .unwrap_or(def.image.as_str());
            let path = format!("{TILESET_DIR}/{basename}");
            let tex = match load_texture(&path).await {
                Ok(tex) => {
                    tex.set_filter(FilterMode::Nearest);
                    Some(tex)
                }
                Err(err) => {
                    warn!("Failed to load tileset {}: {}", path, err);
                    None
                }
            };
            tilesets.push(LoadedTileset {
                def: def.clone(),
                tex,
            });
        }
        TilesetAtlas { tilesets }
    }

    /// Blit one tile scaled to `tile_size`, no-op for unresolved or
    /// unloaded GIDs.
    pub fn draw_tile(&self, gid: u32, dest_x: f32, dest_y: f32, tile_size: f32) {
        let Some(loaded) = self
            .tilesets
            .iter()
            .find(|t| gid >= t.def.firstgid && gid < t.def.firstgid + t.def.tilecount)
        else {
            return;
        };
        let Some(tex) = &loaded.tex else {
            return;
        };
        let src = source_rect(&loaded.def, gid - loaded.def.firstgid);
        draw_texture_ex(
            tex,
            dest_x,
            dest_y,
            WHITE,
            DrawTextureParams {
                source: Some(Rect::new(src.x, src.y, src.w, src.h)),
                dest_size: Some(vec2(tile_size, tile_size)),
                ..Default::default()
            },
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ts(firstgid: u32, columns: u32, tilecount: u32) -> TilesetDef {
        TilesetDef {
            firstgid,
            image: "tiles.png".into(),
            columns,
            tilecount,
            tile_width: 32,
            tile_height: 32,
        }
    }

    #[test]
    fn resolves_by_range_containment() {
        let sets = vec![ts(1, 8, 64), ts(65, 4, 16)];
        let (a, local) = resolve_gid(&sets, 1).expect("gid 1");
        assert_eq!(a.firstgid, 1);
        assert_eq!(local, 0);

        let (b, local) = resolve_gid(&sets, 70).expect("gid 70");
        assert_eq!(b.firstgid, 65);
        assert_eq!(local, 5);

        assert!(resolve_gid(&sets, 0).is_none());
        assert!(resolve_gid(&sets, 81).is_none());
    }

    #[test]
    fn first_matching_range_wins_on_overlap() {
        // ranges should never overlap in a valid map; if they do, the
        // earlier declaration is authoritative
        let sets = vec![ts(1, 8, 64), ts(10, 4, 16)];
        let (winner, _) = resolve_gid(&sets, 12).expect("gid 12");
        assert_eq!(winner.firstgid, 1);
    }

    #[test]
    fn source_rect_is_row_major_over_columns() {
        for columns in [1u32, 3, 4, 8, 16] {
            let def = ts(1, columns, columns * 4);
            for local in 0..def.tilecount {
                let rect = source_rect(&def, local);
                assert_eq!(rect.x, (local % columns * 32) as f32);
                assert_eq!(rect.y, (local / columns * 32) as f32);
                assert_eq!((rect.w, rect.h), (32.0, 32.0));
            }
        }
    }

    #[test]
    fn source_rect_respects_tile_dimensions() {
        let def = TilesetDef {
            firstgid: 1,
            image: "big.png".into(),
            columns: 5,
            tilecount: 25,
            tile_width: 16,
            tile_height: 24,
        };
        let rect = source_rect(&def, 7);
        assert_eq!(rect.x, (7 % 5 * 16) as f32);
        assert_eq!(rect.y, (7 / 5 * 24) as f32);
        assert_eq!((rect.w, rect.h), (16.0, 24.0));
    }
}
