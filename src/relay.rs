//! Presence relay hub and connection handling.

use crate::protocol::{ClientEvent, PlayerId, PlayerRecord, ServerEvent};
use anyhow::Context;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::tcp::OwnedReadHalf;
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::mpsc::{self, UnboundedSender};
use tracing::{info, warn};

struct Peer {
    tx: UnboundedSender<ServerEvent>,
    // None until the connection announces itself with player-join.
    record: Option<PlayerRecord>,
}

/// In-memory broadcast hub: the mapping from connection identifier to
/// last-known player record, plus each connection's outbound channel.
///
/// One instance is constructed at process start and shared behind a mutex;
/// nothing here blocks, so holding the lock across a handler is fine.
#[derive(Default)]
pub struct Hub {
    peers: HashMap<PlayerId, Peer>,
    next_id: PlayerId,
}

impl Hub {
    /// Empty hub.
    pub fn new() -> Self {
        Hub::default()
    }

    /// Number of connected visitors.
    pub fn len(&self) -> usize {
        self.peers.len()
    }

    /// Whether no visitor is connected.
    pub fn is_empty(&self) -> bool {
        self.peers.is_empty()
    }

    /// Stored record for a connection, if it has joined.
    pub fn record(&self, id: PlayerId) -> Option<&PlayerRecord> {
        self.peers.get(&id).and_then(|p| p.record.as_ref())
    }

    /// Register a new connection and assign its identifier.
    pub fn connect(&mut self, tx: UnboundedSender<ServerEvent>) -> PlayerId {
        self.next_id += 1;
        let id = self.next_id;
        let _ = self.peers.insert(id, Peer { tx, record: None });
        id
    }

    /// Apply one client event from a connection.
    pub fn handle(&mut self, id: PlayerId, event: ClientEvent) {
        match event {
            ClientEvent::PlayerJoin {
                name,
                x,
                y,
                facing,
                sprite_id,
            } => {
                let record = PlayerRecord {
                    id,
                    name,
                    x,
                    y,
                    facing,
                    sprite_id,
                };
                if let Some(peer) = self.peers.get_mut(&id) {
                    peer.record = Some(record.clone());
                } else {
                    return;
                }
                info!(id, name = %record.name, online = self.joined_count(), "player joined");

                // The joiner alone gets its id and the full roster; everyone
                // else hears about the new record.
                self.send_to(id, ServerEvent::Welcome { id });
                self.send_to(id, ServerEvent::PlayersList(self.roster()));
                self.broadcast_except(id, ServerEvent::PlayerJoined(record));
            }
            ClientEvent::PlayerMoved { x, y, facing } => {
                let Some(peer) = self.peers.get_mut(&id) else {
                    return;
                };
                let Some(record) = peer.record.as_mut() else {
                    // Movement before a join is ignored.
                    return;
                };
                record.x = x;
                record.y = y;
                record.facing = facing;
                self.broadcast_except(id, ServerEvent::PlayerMoved { id, x, y, facing });
            }
        }
    }

    /// Drop a connection; everyone else hears `player-left` if it had
    /// joined.
    pub fn disconnect(&mut self, id: PlayerId) {
        let Some(peer) = self.peers.remove(&id) else {
            return;
        };
        if let Some(record) = peer.record {
            info!(id, name = %record.name, online = self.joined_count(), "player left");
            self.broadcast_except(id, ServerEvent::PlayerLeft { id });
        }
    }

    fn joined_count(&self) -> usize {
        self.peers.values().filter(|p| p.record.is_some()).count()
    }

    fn roster(&self) -> Vec<PlayerRecord> {
        let mut records: Vec<PlayerRecord> = self
            .peers
            .values()
            .filter_map(|p| p.record.clone())
            .collect();
        records.sort_by_key(|r| r.id);
        records
    }

    fn send_to(&self, id: PlayerId, event: ServerEvent) {
        if let Some(peer) = self.peers.get(&id) {
            // A closed channel means the connection is being reaped.
            let _ = peer.tx.send(event);
        }
    }

    fn broadcast_except(&self, id: PlayerId, event: ServerEvent) {
        for (&peer_id, peer) in &self.peers {
            if peer_id != id {
                let _ = peer.tx.send(event.clone());
            }
        }
    }
}

/// Shared hub handle.
pub type SharedHub = Arc<Mutex<Hub>>;

/// Accept-loop for the relay: one reader task and one writer task per
/// connection, both funneling through the hub.
pub async fn serve(listener: TcpListener, hub: SharedHub) -> anyhow::Result<()> {
    loop {
        let (stream, peer_addr) = listener.accept().await.context("accept")?;
        info!(peer = %peer_addr, "visitor connected");
        let hub = Arc::clone(&hub);
        let _ = tokio::spawn(async move {
            if let Err(err) = handle_connection(stream, hub).await {
                warn!(peer = %peer_addr, err = %err, "connection ended with error");
            }
        });
    }
}

async fn handle_connection(stream: TcpStream, hub: SharedHub) -> anyhow::Result<()> {
    let (rd, mut wr) = stream.into_split();
    let (tx, mut rx) = mpsc::unbounded_channel();
    let id = hub.lock().expect("hub mutex poisoned").connect(tx);

    // Writer task drains the outbound channel so hub handlers never block
    // on a slow connection.
    let writer = tokio::spawn(async move {
        while let Some(event) = rx.recv().await {
            let Ok(mut line) = serde_json::to_string(&event) else {
                break;
            };
            line.push('\n');
            if wr.write_all(line.as_bytes()).await.is_err() {
                break;
            }
        }
    });

    let result = read_events(rd, id, &hub).await;
    hub.lock().expect("hub mutex poisoned").disconnect(id);
    writer.abort();
    result
}

async fn read_events(rd: OwnedReadHalf, id: PlayerId, hub: &SharedHub) -> anyhow::Result<()> {
    let mut lines = BufReader::new(rd).lines();
    while let Some(line) = lines.next_line().await.context("read line")? {
        if line.trim().is_empty() {
            continue;
        }
        match serde_json::from_str::<ClientEvent>(&line) {
            Ok(event) => hub.lock().expect("hub mutex poisoned").handle(id, event),
            Err(err) => warn!(id, err = %err, "ignoring malformed event"),
        }
    }
    Ok(())
}
