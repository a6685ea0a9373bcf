use crate::game::{camera_origin, depth_sort_indices, Facing, World};
use crate::presence::RemotePlayer;
use crate::protocol::PlayerId;
use crate::sprites::{SpriteCatalog, FRAME_SIZE};
use crate::tileset::TilesetAtlas;
use macroquad::prelude::*;
use std::collections::HashMap;

/// On-screen size of one map tile, in pixels.
pub const TILE_SIZE: f32 = 32.0;

const CULL_MARGIN_TILES: i32 = 1;

const BACKGROUND: Color = Color::new(0.08, 0.09, 0.11, 1.0);
const BANNER_BG: Color = Color::new(0.0, 0.0, 0.0, 0.75);
const OVERLAY_BG: Color = Color::new(0.12, 0.13, 0.17, 0.95);

/// Horizontal tile range `[start, end)` visible from `origin`, padded by one
/// tile of slack and clamped to the map.
pub fn visible_tile_range(origin: f32, view_tiles: f32, map_tiles: usize) -> (usize, usize) {
    let lo = origin.floor() as i32 - CULL_MARGIN_TILES;
    let hi = (origin + view_tiles).ceil() as i32 + CULL_MARGIN_TILES;
    let start = lo.max(0) as usize;
    let end = (hi.max(0) as usize).min(map_tiles);
    (start, end.max(start))
}

/// Blank screen with a centered status line, shown while assets load and
/// when loading has failed.
pub fn draw_loading(message: &str) {
    clear_background(BACKGROUND);
    draw_centered_text(message, screen_height() / 2.0, 24.0, LIGHTGRAY);
}

struct Entity<'a> {
    x: f32,
    y: f32,
    facing: Facing,
    frame: u32,
    sprite: &'a str,
    name: &'a str,
    available: Option<bool>,
}

/// One frame of the running scene: tile passes, depth-sorted entities,
/// then the zone prompt and overlay on top.
pub fn draw_frame(
    world: &World,
    atlas: &TilesetAtlas,
    sprites: &SpriteCatalog,
    remote: &HashMap<PlayerId, RemotePlayer>,
    local_name: &str,
    local_sprite: &str,
    anim_frame: u32,
    local_moving: bool,
) {
    clear_background(BACKGROUND);

    let map = &world.map;
    let view_w = screen_width() / TILE_SIZE;
    let view_h = screen_height() / TILE_SIZE;
    let (ox, oy) = camera_origin(
        world.player.x,
        world.player.y,
        map.width,
        map.height,
        view_w,
        view_h,
    );
    let (x0, x1) = visible_tile_range(ox, view_w, map.width as usize);
    let (y0, y1) = visible_tile_range(oy, view_h, map.height as usize);

    for layers in [
        map.floor_layers(),
        map.wall_layers(),
        map.furniture_layers(),
    ] {
        for layer in layers {
            for ty in y0..y1 {
                for tx in x0..x1 {
                    let gid = layer.gid_at(tx, ty);
                    if gid == 0 {
                        continue;
                    }
                    atlas.draw_tile(
                        gid,
                        (tx as f32 - ox) * TILE_SIZE,
                        (ty as f32 - oy) * TILE_SIZE,
                        TILE_SIZE,
                    );
                }
            }
        }
    }

    let mut entities = Vec::new();
    for npc in &world.npcs {
        entities.push(Entity {
            x: npc.x,
            y: npc.y,
            facing: npc.facing,
            frame: if npc.id == "cat" { anim_frame } else { 0 },
            sprite: npc.sprite,
            name: npc.name,
            available: Some(npc.available),
        });
    }
    entities.push(Entity {
        x: world.player.x,
        y: world.player.y,
        facing: world.player.facing,
        frame: if local_moving { anim_frame } else { 0 },
        sprite: local_sprite,
        name: local_name,
        available: None,
    });
    for player in remote.values() {
        entities.push(Entity {
            x: player.x,
            y: player.y,
            facing: player.facing,
            frame: 0,
            sprite: &player.sprite_id,
            name: &player.name,
            available: None,
        });
    }

    let ys: Vec<f32> = entities.iter().map(|e| e.y).collect();
    for idx in depth_sort_indices(&ys) {
        let e = &entities[idx];
        let slack = CULL_MARGIN_TILES as f32;
        if e.x < ox - slack || e.x > ox + view_w + slack || e.y < oy - slack || e.y > oy + view_h + slack
        {
            continue;
        }
        let sx = (e.x - ox) * TILE_SIZE;
        let sy = (e.y - oy) * TILE_SIZE;
        sprites.draw_character(e.sprite, sx, sy, e.facing, e.frame);
        draw_name_tag(e, sx, sy);
    }

    if let Some(idx) = world.nearby_npc {
        let npc = &world.npcs[idx];
        draw_banner(&format!("{} - {}", npc.name, npc.role));
    }
    if let Some(idx) = world.pending_zone {
        let zone = &world.zones[idx];
        let prompt = zone
            .message
            .clone()
            .unwrap_or_else(|| format!("Press Space to join {}", zone.name));
        draw_banner(&prompt);
    }
    if let Some(idx) = world.active_zone {
        draw_meeting_overlay(&world.zones[idx]);
    }
}

fn draw_name_tag(e: &Entity<'_>, sx: f32, sy: f32) {
    let size = 14.0;
    let dims = measure_text(e.name, None, size as u16, 1.0);
    let tx = sx + FRAME_SIZE / 2.0 - dims.width / 2.0;
    let ty = sy - 4.0;
    draw_text(e.name, tx, ty, size, WHITE);
    if let Some(available) = e.available {
        let color = if available { GREEN } else { GRAY };
        draw_circle(tx - 6.0, ty - dims.height / 2.0, 3.0, color);
    }
}

fn draw_banner(text: &str) {
    let height = 44.0;
    let y = screen_height() - height - 16.0;
    draw_rectangle(0.0, y, screen_width(), height, BANNER_BG);
    draw_centered_text(text, y + height / 2.0 + 6.0, 20.0, WHITE);
}

fn draw_meeting_overlay(zone: &crate::map::MeetingZone) {
    let pct = zone.width_pct.unwrap_or(80.0).clamp(10.0, 100.0);
    let width = screen_width() * pct / 100.0;
    let height = screen_height() * 0.6;
    let x = (screen_width() - width) / 2.0;
    let y = (screen_height() - height) / 2.0;

    draw_rectangle(x, y, width, height, OVERLAY_BG);
    draw_rectangle_lines(x, y, width, height, 2.0, LIGHTGRAY);
    draw_centered_text(&zone.name, y + 48.0, 32.0, WHITE);
    if let Some(msg) = &zone.message {
        draw_centered_text(msg, y + 88.0, 20.0, LIGHTGRAY);
    }
    if zone.closable {
        draw_centered_text("Press Esc to leave", y + height - 24.0, 16.0, GRAY);
    }
}

fn draw_centered_text(text: &str, y: f32, size: f32, color: Color) {
    let dims = measure_text(text, None, size as u16, 1.0);
    draw_text(text, (screen_width() - dims.width) / 2.0, y, size, color);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tile_range_pads_and_clamps() {
        // interior view gets one tile of slack on both sides
        assert_eq!(visible_tile_range(5.3, 10.0, 40), (4, 17));
        // clamped at the map edges
        assert_eq!(visible_tile_range(0.0, 10.0, 40), (0, 11));
        assert_eq!(visible_tile_range(30.0, 10.0, 40), (29, 40));
        // view wider than the map covers the whole map
        assert_eq!(visible_tile_range(0.0, 60.0, 40), (0, 40));
    }
}
