//! Local world state: movement, collision, the cat, zones, NPCs.

use crate::map::{MeetingZone, TileMap, ZoneTrigger};
use macroquad::rand::gen_range;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;

/// Player movement speed in tiles per frame.
pub const MOVE_SPEED: f32 = 0.15;
/// Cat wander speed in tiles per frame.
pub const CAT_SPEED: f32 = 0.025;
/// Distance within which an NPC counts as nearby, in tiles.
pub const NPC_INTERACT_RADIUS: f32 = 1.5;

/// One of the four cardinal facing directions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Facing {
    /// Facing the camera.
    #[default]
    Down,
    /// Facing left.
    Left,
    /// Facing right.
    Right,
    /// Facing away from the camera.
    Up,
}

/// Input sampled once per frame.
#[derive(Debug, Clone, Copy, Default)]
pub struct InputState {
    /// Move up.
    pub up: bool,
    /// Move down.
    pub down: bool,
    /// Move left.
    pub left: bool,
    /// Move right.
    pub right: bool,
    /// Action key pressed this frame.
    pub action: bool,
}

/// The local player's continuous position and facing, in tile units.
#[derive(Debug, Clone, Copy)]
pub struct PlayerState {
    /// X position.
    pub x: f32,
    /// Y position.
    pub y: f32,
    /// Facing direction.
    pub facing: Facing,
}

/// A non-networked map inhabitant.
#[derive(Debug, Clone)]
pub struct Npc {
    /// Stable id; the wandering cat is `"cat"`.
    pub id: &'static str,
    /// Display name.
    pub name: &'static str,
    /// Role line shown under the name.
    pub role: &'static str,
    /// X position in tile units.
    pub x: f32,
    /// Y position in tile units.
    pub y: f32,
    /// Whether the NPC is marked available.
    pub available: bool,
    /// Facing; only the cat's ever changes.
    pub facing: Facing,
    /// Character sheet id.
    pub sprite: &'static str,
}

/// The default office roster.
pub fn default_npcs() -> Vec<Npc> {
    let npc = |id, name, role, x, y, available, sprite| Npc {
        id,
        name,
        role,
        x,
        y,
        available,
        facing: Facing::Down,
        sprite,
    };
    vec![
        npc("james", "James Mitchell", "CEO - Growth Strategy", 8.0, 8.0, true, "male_01"),
        npc("sarah", "Sarah Chen", "AI Marketing Expert", 15.0, 8.0, true, "female_03"),
        npc("marcus", "Marcus Rodriguez", "SEO Specialist", 22.0, 8.0, false, "male_07"),
        npc("community", "Community Manager", "General Help", 8.0, 15.0, true, "female_12"),
        npc("ai", "AI Assistant", "24/7 Support", 15.0, 15.0, true, "male_14"),
        npc("cat", "Whiskers", "Office Cat", 12.0, 12.0, false, "cat_01"),
    ]
}

#[derive(Debug, Clone)]
struct CatAi {
    timer: u32,
    deadline: u32,
}

impl CatAi {
    fn new() -> Self {
        CatAi {
            timer: 0,
            deadline: roll_deadline(),
        }
    }
}

// Direction changes land every 2-5 seconds at 60 fps.
fn roll_deadline() -> u32 {
    120 + gen_range(0, 180)
}

fn random_facing() -> Facing {
    match gen_range(0, 4) {
        0 => Facing::Up,
        1 => Facing::Down,
        2 => Facing::Left,
        _ => Facing::Right,
    }
}

/// Find a spawn position near the preferred tile that is not blocked.
///
/// Searches outward ring by ring; falls back to the map center when no free
/// tile shows up within radius 10.
pub fn find_spawn(map: &TileMap, preferred_x: f32, preferred_y: f32) -> (f32, f32) {
    if !map.is_collision_tile(preferred_x.floor() as i32, preferred_y.floor() as i32) {
        return (preferred_x, preferred_y);
    }
    let (w, h) = (map.width as i32, map.height as i32);
    for radius in 1..10i32 {
        for dx in -radius..=radius {
            for dy in -radius..=radius {
                if dx.abs() != radius && dy.abs() != radius {
                    continue;
                }
                let tx = preferred_x.floor() as i32 + dx;
                let ty = preferred_y.floor() as i32 + dy;
                if tx >= 1 && tx < w - 1 && ty >= 1 && ty < h - 1 && !map.is_collision_tile(tx, ty)
                {
                    return (tx as f32 + 0.5, ty as f32 + 0.5);
                }
            }
        }
    }
    (w as f32 / 2.0, h as f32 / 2.0)
}

/// Clamped viewport origin in tile units, centered on the player.
///
/// The top-left never goes negative and never exceeds map minus viewport.
pub fn camera_origin(
    player_x: f32,
    player_y: f32,
    map_w: u32,
    map_h: u32,
    view_w: f32,
    view_h: f32,
) -> (f32, f32) {
    let vx = (player_x - (view_w / 2.0).floor())
        .min(map_w as f32 - view_w)
        .max(0.0);
    let vy = (player_y - (view_h / 2.0).floor())
        .min(map_h as f32 - view_h)
        .max(0.0);
    (vx, vy)
}

/// Stable painter's-algorithm ordering: ascending world Y, insertion order
/// breaking ties.
pub fn depth_sort_indices(ys: &[f32]) -> Vec<usize> {
    let mut order: Vec<usize> = (0..ys.len()).collect();
    order.sort_by(|a, b| ys[*a].partial_cmp(&ys[*b]).unwrap_or(Ordering::Equal));
    order
}

/// All local session state the frame loop mutates: the map, derived zones,
/// the player, NPCs and the zone-trigger bookkeeping.
pub struct World {
    /// Parsed map document.
    pub map: TileMap,
    /// Meeting zones, derived once at load, immutable.
    pub zones: Vec<MeetingZone>,
    /// Local player.
    pub player: PlayerState,
    /// NPC roster, cat included.
    pub npcs: Vec<Npc>,
    /// Zone awaiting the action key, by index into `zones`.
    pub pending_zone: Option<usize>,
    /// Zone whose meeting view is open, by index into `zones`.
    pub active_zone: Option<usize>,
    /// Nearest NPC within interaction range, suppressed while a zone is
    /// pending or active.
    pub nearby_npc: Option<usize>,
    cat: Option<usize>,
    cat_ai: CatAi,
}

impl World {
    /// Build a world from a parsed map, fixing up blocked spawn tiles.
    pub fn new(map: TileMap) -> Self {
        let zones = map.meeting_zones();
        let (px, py) = find_spawn(&map, 10.0, 15.0);
        let mut npcs = default_npcs();
        for npc in &mut npcs {
            let (x, y) = find_spawn(&map, npc.x, npc.y);
            npc.x = x;
            npc.y = y;
        }
        let cat = npcs.iter().position(|n| n.id == "cat");
        World {
            map,
            zones,
            player: PlayerState {
                x: px,
                y: py,
                facing: Facing::Down,
            },
            npcs,
            pending_zone: None,
            active_zone: None,
            nearby_npc: None,
            cat,
            cat_ai: CatAi::new(),
        }
    }

    /// Whether a continuous position is unwalkable: outside the one-tile
    /// playable border, or on a collision tile.
    pub fn blocked(&self, x: f32, y: f32) -> bool {
        let gx = x.floor() as i32;
        let gy = y.floor() as i32;
        if gx < 1 || gx >= self.map.width as i32 - 1 || gy < 1 || gy >= self.map.height as i32 - 1
        {
            return true;
        }
        self.map.is_collision_tile(gx, gy)
    }

    /// Advance one frame: movement, cat AI, zone triggers, NPC proximity.
    pub fn update(&mut self, input: &InputState) {
        self.step_player(input);
        self.step_cat();
        self.step_zones(input.action);
        self.step_npc_proximity();
    }

    fn step_player(&mut self, input: &InputState) {
        let (w, h) = (self.map.width as f32, self.map.height as f32);
        let mut nx = self.player.x;
        let mut ny = self.player.y;
        let mut facing = self.player.facing;

        if input.up {
            ny = (self.player.y - MOVE_SPEED).max(1.0);
            facing = Facing::Up;
        }
        if input.down {
            ny = (self.player.y + MOVE_SPEED).min(h - 2.0);
            facing = Facing::Down;
        }
        if input.left {
            nx = (self.player.x - MOVE_SPEED).max(1.0);
            facing = Facing::Left;
        }
        if input.right {
            nx = (self.player.x + MOVE_SPEED).min(w - 2.0);
            facing = Facing::Right;
        }

        // Axes commit independently so sliding along a wall works; facing
        // updates even when the move is rejected.
        if !self.blocked(nx, self.player.y) {
            self.player.x = nx;
        }
        if !self.blocked(self.player.x, ny) {
            self.player.y = ny;
        }
        self.player.facing = facing;
    }

    fn step_cat(&mut self) {
        let Some(cat_idx) = self.cat else {
            return;
        };
        self.cat_ai.timer += 1;
        if self.cat_ai.timer > self.cat_ai.deadline {
            self.npcs[cat_idx].facing = random_facing();
            self.cat_ai.timer = 0;
            self.cat_ai.deadline = roll_deadline();
        }

        let cat = &self.npcs[cat_idx];
        let (mut nx, mut ny) = (cat.x, cat.y);
        match cat.facing {
            Facing::Up => ny -= CAT_SPEED,
            Facing::Down => ny += CAT_SPEED,
            Facing::Left => nx -= CAT_SPEED,
            Facing::Right => nx += CAT_SPEED,
        }

        if self.blocked(nx, ny) {
            // Hit a wall: pick a new direction immediately.
            self.npcs[cat_idx].facing = random_facing();
            self.cat_ai.timer = 0;
            self.cat_ai.deadline = roll_deadline();
        } else {
            self.npcs[cat_idx].x = nx;
            self.npcs[cat_idx].y = ny;
        }
    }

    fn step_zones(&mut self, action: bool) {
        let (px, py) = (self.player.x, self.player.y);
        // First containing zone in document order wins.
        let containing = self.zones.iter().position(|z| z.contains(px, py));
        match containing {
            Some(i) => match self.zones[i].trigger {
                ZoneTrigger::OnEnter => {
                    // Opens the same update cycle containment holds, with
                    // no pending step.
                    self.active_zone = Some(i);
                    self.pending_zone = None;
                }
                ZoneTrigger::OnAction => {
                    if self.active_zone == Some(i) {
                        self.pending_zone = None;
                    } else if action {
                        self.active_zone = Some(i);
                        self.pending_zone = None;
                    } else {
                        self.pending_zone = Some(i);
                    }
                }
            },
            None => {
                self.pending_zone = None;
                self.active_zone = None;
            }
        }
    }

    fn step_npc_proximity(&mut self) {
        if self.pending_zone.is_some() || self.active_zone.is_some() {
            self.nearby_npc = None;
            return;
        }
        let (px, py) = (self.player.x, self.player.y);
        let mut nearest = None;
        let mut best = NPC_INTERACT_RADIUS;
        for (i, npc) in self.npcs.iter().enumerate() {
            let dist = ((px - npc.x).powi(2) + (py - npc.y).powi(2)).sqrt();
            if dist < best {
                best = dist;
                nearest = Some(i);
            }
        }
        self.nearby_npc = nearest;
    }

    /// Close the open meeting view, if any and if the zone allows it.
    pub fn close_meeting(&mut self) {
        if let Some(i) = self.active_zone {
            if self.zones[i].closable {
                self.active_zone = None;
            }
        }
    }
}
