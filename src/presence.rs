//! Client side of the presence relay.

use crate::game::Facing;
use crate::protocol::{ClientEvent, PlayerId, PlayerRecord, ServerEvent};
use macroquad::prelude::warn;
use std::collections::HashMap;
use std::io::{self, BufRead, BufReader, Write};
use std::net::{Shutdown, TcpStream};
use std::sync::mpsc::{self, Receiver};
use std::thread;

/// Position delta below which movement is not re-broadcast, in tiles.
pub const BROADCAST_EPSILON: f32 = 0.01;

/// A remote visitor, mirrored for rendering only. Never consulted by
/// collision or input logic.
#[derive(Debug, Clone, PartialEq)]
pub struct RemotePlayer {
    /// Display name.
    pub name: String,
    /// X position in tile units.
    pub x: f32,
    /// Y position in tile units.
    pub y: f32,
    /// Facing direction.
    pub facing: Facing,
    /// Character sheet id.
    pub sprite_id: String,
}

impl From<PlayerRecord> for RemotePlayer {
    fn from(r: PlayerRecord) -> Self {
        RemotePlayer {
            name: r.name,
            x: r.x,
            y: r.y,
            facing: r.facing,
            sprite_id: r.sprite_id,
        }
    }
}

/// Whether a movement differs enough from the last broadcast snapshot to
/// be worth sending: either axis beyond epsilon, or a facing change.
pub fn should_broadcast(
    last: Option<(f32, f32, Facing)>,
    x: f32,
    y: f32,
    facing: Facing,
) -> bool {
    match last {
        None => true,
        Some((lx, ly, lf)) => {
            (x - lx).abs() > BROADCAST_EPSILON || (y - ly).abs() > BROADCAST_EPSILON || facing != lf
        }
    }
}

/// Local mirror of the remote roster, keyed by relay identifier.
#[derive(Debug, Default)]
pub struct Mirror {
    own_id: Option<PlayerId>,
    players: HashMap<PlayerId, RemotePlayer>,
}

impl Mirror {
    /// Apply one server event to the mirror.
    pub fn apply(&mut self, event: ServerEvent) {
        match event {
            ServerEvent::Welcome { id } => {
                self.own_id = Some(id);
                let _ = self.players.remove(&id);
            }
            ServerEvent::PlayersList(list) => {
                // Wholesale replace; the roster may include ourselves.
                self.players = list
                    .into_iter()
                    .filter(|r| Some(r.id) != self.own_id)
                    .map(|r| (r.id, RemotePlayer::from(r)))
                    .collect();
            }
            ServerEvent::PlayerJoined(record) => {
                if Some(record.id) != self.own_id {
                    let _ = self.players.insert(record.id, RemotePlayer::from(record));
                }
            }
            ServerEvent::PlayerMoved { id, x, y, facing } => {
                if let Some(p) = self.players.get_mut(&id) {
                    p.x = x;
                    p.y = y;
                    p.facing = facing;
                }
            }
            ServerEvent::PlayerLeft { id } => {
                let _ = self.players.remove(&id);
            }
        }
    }

    /// The mirrored remote players.
    pub fn players(&self) -> &HashMap<PlayerId, RemotePlayer> {
        &self.players
    }
}

/// Connection to the presence relay: a reader thread feeding a channel the
/// frame loop drains, and a throttled writer for local movement.
pub struct PresenceClient {
    stream: TcpStream,
    events: Receiver<ServerEvent>,
    mirror: Mirror,
    last_sent: Option<(f32, f32, Facing)>,
}

impl PresenceClient {
    /// Connect and announce the local player.
    pub fn connect(
        addr: &str,
        name: &str,
        x: f32,
        y: f32,
        facing: Facing,
        sprite_id: &str,
    ) -> io::Result<Self> {
        let stream = TcpStream::connect(addr)?;
        let _ = stream.set_nodelay(true);
        let reader = stream.try_clone()?;
        let (tx, rx) = mpsc::channel();
        let _ = thread::spawn(move || {
            for line in BufReader::new(reader).lines() {
                let Ok(line) = line else { break };
                match serde_json::from_str::<ServerEvent>(&line) {
                    Ok(event) => {
                        if tx.send(event).is_err() {
                            break;
                        }
                    }
                    Err(err) => warn!("Ignoring malformed relay event: {}", err),
                }
            }
        });

        let mut client = PresenceClient {
            stream,
            events: rx,
            mirror: Mirror::default(),
            last_sent: None,
        };
        client.send(&ClientEvent::PlayerJoin {
            name: name.to_owned(),
            x,
            y,
            facing,
            sprite_id: sprite_id.to_owned(),
        })?;
        client.last_sent = Some((x, y, facing));
        Ok(client)
    }

    fn send(&mut self, event: &ClientEvent) -> io::Result<()> {
        let mut line = serde_json::to_string(event)
            .map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))?;
        line.push('\n');
        self.stream.write_all(line.as_bytes())
    }

    /// Drain pending server events into the mirror. Called once per frame;
    /// tolerates a roster that is still partially synced.
    pub fn pump(&mut self) {
        while let Ok(event) = self.events.try_recv() {
            self.mirror.apply(event);
        }
    }

    /// Broadcast local movement if it moved beyond epsilon or turned.
    pub fn maybe_send_move(&mut self, x: f32, y: f32, facing: Facing) {
        if !should_broadcast(self.last_sent, x, y, facing) {
            return;
        }
        if let Err(err) = self.send(&ClientEvent::PlayerMoved { x, y, facing }) {
            warn!("Failed to send movement to relay: {}", err);
            return;
        }
        self.last_sent = Some((x, y, facing));
    }

    /// The mirrored remote players, for rendering.
    pub fn players(&self) -> &HashMap<PlayerId, RemotePlayer> {
        self.mirror.players()
    }
}

impl Drop for PresenceClient {
    fn drop(&mut self) {
        // Closing the socket also unblocks the reader thread.
        let _ = self.stream.shutdown(Shutdown::Both);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(id: PlayerId, name: &str) -> PlayerRecord {
        PlayerRecord {
            id,
            name: name.into(),
            x: 1.0,
            y: 2.0,
            facing: Facing::Down,
            sprite_id: "male_04".into(),
        }
    }

    #[test]
    fn throttle_skips_sub_epsilon_motion() {
        let last = Some((10.0, 15.0, Facing::Down));
        assert!(!should_broadcast(last, 10.0, 15.0, Facing::Down));
        assert!(!should_broadcast(last, 10.005, 15.0, Facing::Down));
        assert!(should_broadcast(last, 10.3, 15.0, Facing::Down));
        assert!(should_broadcast(last, 10.0, 14.5, Facing::Down));
        // a pure turn still broadcasts
        assert!(should_broadcast(last, 10.0, 15.0, Facing::Left));
        // and nothing was ever sent yet
        assert!(should_broadcast(None, 10.0, 15.0, Facing::Down));
    }

    #[test]
    fn roster_replace_skips_own_record() {
        let mut mirror = Mirror::default();
        mirror.apply(ServerEvent::Welcome { id: 1 });
        mirror.apply(ServerEvent::PlayersList(vec![record(1, "me"), record(2, "Bea")]));
        assert_eq!(mirror.players().len(), 1);
        assert_eq!(mirror.players()[&2].name, "Bea");
    }

    #[test]
    fn joined_moved_left_lifecycle() {
        let mut mirror = Mirror::default();
        mirror.apply(ServerEvent::Welcome { id: 1 });
        mirror.apply(ServerEvent::PlayersList(vec![]));

        mirror.apply(ServerEvent::PlayerJoined(record(3, "Cid")));
        assert_eq!(mirror.players()[&3].x, 1.0);

        mirror.apply(ServerEvent::PlayerMoved {
            id: 3,
            x: 4.5,
            y: 2.0,
            facing: Facing::Right,
        });
        assert_eq!(mirror.players()[&3].x, 4.5);
        assert_eq!(mirror.players()[&3].facing, Facing::Right);

        mirror.apply(ServerEvent::PlayerLeft { id: 3 });
        assert!(mirror.players().is_empty());
    }

    #[test]
    fn moves_for_unknown_ids_are_ignored() {
        let mut mirror = Mirror::default();
        mirror.apply(ServerEvent::PlayerMoved {
            id: 9,
            x: 1.0,
            y: 1.0,
            facing: Facing::Up,
        });
        assert!(mirror.players().is_empty());
    }
}
