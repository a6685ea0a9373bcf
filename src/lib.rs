#![warn(missing_docs)]

//! Tile-based community map: Tiled JSON office map, walkable characters,
//! meeting zones, and a lightweight TCP presence relay.

pub mod error;
pub mod game;
pub mod map;
pub mod presence;
pub mod protocol;
pub mod relay;
pub mod render;
pub mod sprites;
pub mod tileset;

pub use error::MapError;
pub use map::{Layer, MeetingZone, TileLayer, TileMap, ZoneTrigger};
