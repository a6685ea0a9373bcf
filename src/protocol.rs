//! Wire protocol shared by the relay server and its clients.

use crate::game::Facing;
use serde::{Deserialize, Serialize};

/// Default relay listen address; override with `RELAY_ADDR`.
pub const DEFAULT_RELAY_ADDR: &str = "127.0.0.1:4025";

/// Connection-scoped visitor identifier, assigned by the relay.
pub type PlayerId = u64;

/// Everything the relay knows about one visitor.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlayerRecord {
    /// Relay-assigned identifier.
    pub id: PlayerId,
    /// Display name.
    pub name: String,
    /// X position in tile units.
    pub x: f32,
    /// Y position in tile units.
    pub y: f32,
    /// Facing direction.
    pub facing: Facing,
    /// Chosen character sheet id.
    #[serde(rename = "spriteId")]
    pub sprite_id: String,
}

/// Events a visitor sends to the relay.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event", content = "data", rename_all = "kebab-case")]
pub enum ClientEvent {
    /// Announce the local player right after connecting.
    PlayerJoin {
        /// Display name.
        name: String,
        /// X position in tile units.
        x: f32,
        /// Y position in tile units.
        y: f32,
        /// Facing direction.
        facing: Facing,
        /// Chosen character sheet id.
        #[serde(rename = "spriteId")]
        sprite_id: String,
    },
    /// Throttled movement announcement.
    PlayerMoved {
        /// X position in tile units.
        x: f32,
        /// Y position in tile units.
        y: f32,
        /// Facing direction.
        facing: Facing,
    },
}

/// Events the relay sends to visitors.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event", content = "data", rename_all = "kebab-case")]
pub enum ServerEvent {
    /// First reply after a join: the connection's own identifier. The
    /// original transport handed this out out-of-band; over plain TCP it
    /// travels in-band instead.
    Welcome {
        /// Identifier assigned to the receiving connection.
        id: PlayerId,
    },
    /// Full roster, sent once to the joining visitor (self included; the
    /// client de-duplicates by id).
    PlayersList(Vec<PlayerRecord>),
    /// A new visitor joined, sent to everyone else.
    PlayerJoined(PlayerRecord),
    /// A visitor moved, sent to everyone else.
    PlayerMoved {
        /// Who moved.
        id: PlayerId,
        /// New x position.
        x: f32,
        /// New y position.
        y: f32,
        /// New facing.
        facing: Facing,
    },
    /// A visitor disconnected, sent to everyone else.
    PlayerLeft {
        /// Who left.
        id: PlayerId,
    },
}

/// Relay listen address from the environment, or the default.
pub fn relay_addr() -> String {
    std::env::var("RELAY_ADDR").unwrap_or_else(|_| DEFAULT_RELAY_ADDR.to_owned())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn client_events_use_the_original_wire_names() {
        let join = ClientEvent::PlayerJoin {
            name: "Ann".into(),
            x: 10.0,
            y: 15.0,
            facing: Facing::Down,
            sprite_id: "female_01".into(),
        };
        let json = serde_json::to_value(&join).expect("serialize");
        assert_eq!(json["event"], "player-join");
        assert_eq!(json["data"]["name"], "Ann");
        assert_eq!(json["data"]["facing"], "down");
        assert_eq!(json["data"]["spriteId"], "female_01");
    }

    #[test]
    fn server_events_round_trip() {
        let moved = ServerEvent::PlayerMoved {
            id: 7,
            x: 10.3,
            y: 15.0,
            facing: Facing::Down,
        };
        let line = serde_json::to_string(&moved).expect("serialize");
        let back: ServerEvent = serde_json::from_str(&line).expect("deserialize");
        assert_eq!(back, moved);

        let json = serde_json::to_value(&moved).expect("serialize");
        assert_eq!(json["event"], "player-moved");
    }

    #[test]
    fn players_list_serializes_records_inline() {
        let list = ServerEvent::PlayersList(vec![PlayerRecord {
            id: 1,
            name: "Ann".into(),
            x: 1.0,
            y: 2.0,
            facing: Facing::Left,
            sprite_id: "female_03".into(),
        }]);
        let json = serde_json::to_value(&list).expect("serialize");
        assert_eq!(json["event"], "players-list");
        assert_eq!(json["data"][0]["id"], 1);
        assert_eq!(json["data"][0]["facing"], "left");
    }
}
