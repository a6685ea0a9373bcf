// tests/map_tests.rs

use community_map::game::{camera_origin, find_spawn};
use community_map::map::{TileMap, ZoneTrigger};
use std::path::PathBuf;

fn office() -> TileMap {
    let mut path = PathBuf::from(env!("CARGO_MANIFEST_DIR"));
    path.push("assets");
    path.push("office.tmj");
    TileMap::load(&path).expect("bundled office map should load")
}

#[test]
fn bundled_map_loads_with_expected_structure() {
    let map = office();
    assert_eq!(map.width, 30);
    assert_eq!(map.height, 22);
    assert_eq!(map.tile_width, 32);
    assert_eq!(map.tilesets.len(), 1);
    assert_eq!(map.tilesets[0].firstgid, 1);

    assert_eq!(map.floor_layers().len(), 1);
    assert_eq!(map.wall_layers().len(), 1);
    assert_eq!(map.furniture_layers().len(), 1);
    assert!(map.tile_layer("collisions").is_some());
}

#[test]
fn bundled_map_collisions_block_walls_and_desks() {
    let map = office();
    // perimeter
    assert!(map.is_collision_tile(0, 0));
    assert!(map.is_collision_tile(29, 21));
    // a desk tile
    assert!(map.is_collision_tile(5, 11));
    // open floor
    assert!(!map.is_collision_tile(12, 18));
    // out of range stays walkable; the border margin handles edges
    assert!(!map.is_collision_tile(-1, 5));
    assert!(!map.is_collision_tile(5, 99));
}

#[test]
fn bundled_map_zones_cover_both_trigger_modes() {
    let map = office();
    let zones = map.meeting_zones();
    assert_eq!(zones.len(), 2);

    let lounge = &zones[0];
    assert_eq!(lounge.id, "meeting-11");
    assert_eq!(lounge.name, "Lounge");
    assert_eq!(lounge.trigger, ZoneTrigger::OnEnter);
    assert!(lounge.contains(4.0, 4.0));
    assert!(!lounge.contains(7.0, 4.0)); // right edge is exclusive

    let war_room = &zones[1];
    assert_eq!(war_room.trigger, ZoneTrigger::OnAction);
    assert_eq!(war_room.room, "War Room");
    assert_eq!(war_room.width_pct, Some(70.0));
    assert!(war_room.closable);
    assert!(war_room.message.as_deref().unwrap().contains("Space"));
    assert!(war_room.contains(20.0, 4.0));
    assert!(war_room.contains(24.9, 7.9));
    assert!(!war_room.contains(25.0, 7.9));
}

#[test]
fn spawn_fixup_lands_on_free_tiles() {
    let map = office();
    // already free: unchanged
    assert_eq!(find_spawn(&map, 12.0, 18.0), (12.0, 18.0));
    // a desk tile: pushed to a neighbouring free tile
    let (x, y) = find_spawn(&map, 5.0, 11.0);
    assert!(!map.is_collision_tile(x as i32, y as i32));
    assert_ne!((x, y), (5.0, 11.0));
}

#[test]
fn camera_clamps_to_bundled_map_bounds() {
    // 30x22 map, 20x12 viewport
    assert_eq!(camera_origin(2.0, 3.0, 30, 22, 20.0, 12.0), (0.0, 0.0));
    assert_eq!(camera_origin(28.0, 20.0, 30, 22, 20.0, 12.0), (10.0, 10.0));
    let (ox, oy) = camera_origin(15.0, 11.0, 30, 22, 20.0, 12.0);
    assert_eq!((ox, oy), (5.0, 5.0));
}
