use community_map::game::{find_spawn, Facing, InputState, World, MOVE_SPEED};
use community_map::map::TileMap;
use community_map::presence::PresenceClient;
use community_map::protocol::relay_addr;
use community_map::render;
use community_map::sprites::{Gender, SpriteCatalog};
use community_map::tileset::TilesetAtlas;
use macroquad::prelude::*;
use macroquad::rand::gen_range;

const MAP_PATH: &str = "assets/office.tmj";
const SPAWN_X: f32 = 12.0;
const SPAWN_Y: f32 = 18.0;
const ANIM_FRAME_SECS: f64 = 0.2;

fn window_conf() -> Conf {
    Conf {
        window_title: "Community Map".into(),
        window_width: 1024,
        window_height: 768,
        ..Default::default()
    }
}

/// Blocking name-entry screen. Returns a trimmed name of 2..=20 characters.
async fn enter_name() -> String {
    let mut name = String::new();
    let mut error: Option<&str> = None;
    loop {
        while let Some(c) = get_char_pressed() {
            if !c.is_control() && name.chars().count() < 20 {
                name.push(c);
            }
        }
        if is_key_pressed(KeyCode::Backspace) {
            name.pop();
        }
        if is_key_pressed(KeyCode::Enter) {
            let trimmed = name.trim();
            if (2..=20).contains(&trimmed.chars().count()) {
                return trimmed.to_owned();
            }
            error = Some("Name must be 2-20 characters");
        }

        clear_background(Color::new(0.08, 0.09, 0.11, 1.0));
        let cy = screen_height() / 2.0;
        draw_text("Welcome to the office", 40.0, cy - 70.0, 32.0, WHITE);
        draw_text("Enter your name and press Enter:", 40.0, cy - 30.0, 20.0, LIGHTGRAY);
        draw_rectangle(40.0, cy - 10.0, 320.0, 34.0, Color::new(0.16, 0.17, 0.21, 1.0));
        draw_text(&name, 48.0, cy + 14.0, 22.0, WHITE);
        if let Some(msg) = error {
            draw_text(msg, 40.0, cy + 50.0, 18.0, RED);
        }
        next_frame().await;
    }
}

fn read_input() -> InputState {
    InputState {
        up: is_key_down(KeyCode::Up) || is_key_down(KeyCode::W),
        down: is_key_down(KeyCode::Down) || is_key_down(KeyCode::S),
        left: is_key_down(KeyCode::Left) || is_key_down(KeyCode::A),
        right: is_key_down(KeyCode::Right) || is_key_down(KeyCode::D),
        action: is_key_pressed(KeyCode::Space),
    }
}

#[macroquad::main(window_conf)]
async fn main() {
    let name = enter_name().await;
    let gender = if gen_range(0, 2) == 0 {
        Gender::Male
    } else {
        Gender::Female
    };
    let sprite_id = SpriteCatalog::random_character(gender);

    render::draw_loading("Loading office...");
    next_frame().await;

    let map = match TileMap::load(MAP_PATH) {
        Ok(map) => map,
        Err(err) => {
            // Keep the window alive so the failure is visible.
            warn!("Failed to load {}: {}", MAP_PATH, err);
            loop {
                render::draw_loading("Could not load the office map");
                next_frame().await;
            }
        }
    };
    let atlas = TilesetAtlas::load(&map.tilesets).await;
    let sprites = SpriteCatalog::load().await;

    let mut world = World::new(map);
    let (sx, sy) = find_spawn(&world.map, SPAWN_X, SPAWN_Y);
    world.player.x = sx;
    world.player.y = sy;

    let mut presence = match PresenceClient::connect(
        &relay_addr(),
        &name,
        world.player.x,
        world.player.y,
        Facing::Down,
        &sprite_id,
    ) {
        Ok(client) => Some(client),
        Err(err) => {
            warn!("Relay unavailable, continuing solo: {}", err);
            None
        }
    };

    loop {
        let input = read_input();
        let before = (world.player.x, world.player.y);
        world.update(&input);
        if is_key_pressed(KeyCode::Escape) {
            world.close_meeting();
        }

        if let Some(client) = presence.as_mut() {
            client.pump();
            client.maybe_send_move(world.player.x, world.player.y, world.player.facing);
        }

        let moved = (world.player.x - before.0).abs() > MOVE_SPEED / 2.0
            || (world.player.y - before.1).abs() > MOVE_SPEED / 2.0;
        let anim_frame = (get_time() / ANIM_FRAME_SECS) as u32 % 4;
        let empty = std::collections::HashMap::new();
        let remote = presence.as_ref().map_or(&empty, |c| c.players());
        render::draw_frame(
            &world,
            &atlas,
            &sprites,
            remote,
            &name,
            &sprite_id,
            anim_frame,
            moved,
        );

        next_frame().await;
    }
}
