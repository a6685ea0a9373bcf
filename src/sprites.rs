//! Character sprite sheets and facing-row math.

use crate::game::Facing;
use macroquad::prelude::*;
use macroquad::rand::gen_range;
use std::collections::HashMap;

/// Directory character sheets are resolved from.
pub const SPRITE_DIR: &str = "assets/character-sprites";
/// Fixed male roster size.
pub const MALE_COUNT: u32 = 18;
/// Fixed female roster size.
pub const FEMALE_COUNT: u32 = 25;
/// Sprite id of the office cat.
pub const CAT_SPRITE: &str = "cat_01";
/// Edge length of one animation cell in pixels, drawn unscaled.
pub const FRAME_SIZE: f32 = 32.0;

/// Character gender, selecting one of the two fixed rosters.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Gender {
    /// `male_01..male_18`.
    Male,
    /// `female_01..female_25`.
    Female,
}

/// Sheet row for a facing direction. Fixed convention: down=0, left=1,
/// right=2, up=3.
pub fn facing_row(facing: Facing) -> u32 {
    match facing {
        Facing::Down => 0,
        Facing::Left => 1,
        Facing::Right => 2,
        Facing::Up => 3,
    }
}

struct CharacterSprite {
    tex: Texture2D,
    columns: u32,
}

/// Fixed roster of directional, animated character sheets.
#[derive(Default)]
pub struct SpriteCatalog {
    sprites: HashMap<String, CharacterSprite>,
}

impl SpriteCatalog {
    /// Load the whole roster. Best-effort: each failed image is logged and
    /// the remaining sprites stay usable.
    pub async fn load() -> Self {
        let mut catalog = SpriteCatalog::default();
        for i in 1..=MALE_COUNT {
            let path = format!("{SPRITE_DIR}/male/Male {i:02}-1.png");
            catalog.load_one(format!("male_{i:02}"), &path, 4).await;
        }
        for i in 1..=FEMALE_COUNT {
            let path = format!("{SPRITE_DIR}/female/Female {i:02}-1.png");
            catalog.load_one(format!("female_{i:02}"), &path, 4).await;
        }
        // The cat sheet has three columns per row instead of four.
        let cat_path = format!("{SPRITE_DIR}/animal/{CAT_SPRITE}.png");
        catalog.load_one(CAT_SPRITE.to_owned(), &cat_path, 3).await;
        catalog
    }

    async fn load_one(&mut self, id: String, path: &str, columns: u32) {
        match load_texture(path).await {
            Ok(tex) => {
                tex.set_filter(FilterMode::Nearest);
                let _ = self.sprites.insert(id, CharacterSprite { tex, columns });
            }
            Err(err) => warn!("Failed to load character sprite {}: {}", path, err),
        }
    }

    /// Whether a sprite id is loaded and drawable.
    pub fn has(&self, id: &str) -> bool {
        self.sprites.contains_key(id)
    }

    /// Blit one 32x32 animation cell unscaled at the destination.
    ///
    /// Row is selected by facing, column by `frame mod columns`. Unknown
    /// ids log a warning and draw nothing.
    pub fn draw_character(&self, id: &str, x: f32, y: f32, facing: Facing, frame: u32) {
        let Some(sprite) = self.sprites.get(id) else {
            warn!("Character sprite not found: {}", id);
            return;
        };
        let col = frame % sprite.columns;
        let row = facing_row(facing);
        draw_texture_ex(
            &sprite.tex,
            x,
            y,
            WHITE,
            DrawTextureParams {
                source: Some(Rect::new(
                    col as f32 * FRAME_SIZE,
                    row as f32 * FRAME_SIZE,
                    FRAME_SIZE,
                    FRAME_SIZE,
                )),
                dest_size: Some(vec2(FRAME_SIZE, FRAME_SIZE)),
                ..Default::default()
            },
        );
    }

    /// Uniform random pick over the roster for a gender.
    pub fn random_character(gender: Gender) -> String {
        let (prefix, count) = match gender {
            Gender::Male => ("male", MALE_COUNT),
            Gender::Female => ("female", FEMALE_COUNT),
        };
        let index = gen_range(1, count + 1);
        format!("{prefix}_{index:02}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn facing_rows_follow_the_sheet_convention() {
        assert_eq!(facing_row(Facing::Down), 0);
        assert_eq!(facing_row(Facing::Left), 1);
        assert_eq!(facing_row(Facing::Right), 2);
        assert_eq!(facing_row(Facing::Up), 3);
    }

    #[test]
    fn random_character_stays_inside_the_roster() {
        for _ in 0..100 {
            let id = SpriteCatalog::random_character(Gender::Male);
            let n: u32 = id.strip_prefix("male_").expect("prefix").parse().expect("index");
            assert!((1..=MALE_COUNT).contains(&n));

            let id = SpriteCatalog::random_character(Gender::Female);
            let n: u32 = id
                .strip_prefix("female_")
                .expect("prefix")
                .parse()
                .expect("index");
            assert!((1..=FEMALE_COUNT).contains(&n));
        }
    }
}
