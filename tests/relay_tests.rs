// tests/relay_tests.rs
//
// End-to-end relay checks over real TCP connections.

use community_map::game::Facing;
use community_map::protocol::{ClientEvent, ServerEvent};
use community_map::relay::{serve, Hub};
use std::sync::{Arc, Mutex};
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader, Lines};
use tokio::net::tcp::{OwnedReadHalf, OwnedWriteHalf};
use tokio::net::{TcpListener, TcpStream};
use tokio::time::{timeout, Duration};

struct TestClient {
    writer: OwnedWriteHalf,
    lines: Lines<BufReader<OwnedReadHalf>>,
}

impl TestClient {
    async fn connect(addr: &str) -> TestClient {
        let stream = TcpStream::connect(addr).await.expect("connect");
        let (read, writer) = stream.into_split();
        TestClient {
            writer,
            lines: BufReader::new(read).lines(),
        }
    }

    async fn send(&mut self, event: &ClientEvent) {
        let mut line = serde_json::to_string(event).expect("serialize");
        line.push('\n');
        self.writer.write_all(line.as_bytes()).await.expect("write");
    }

    async fn recv(&mut self) -> ServerEvent {
        let line = timeout(Duration::from_secs(2), self.lines.next_line())
            .await
            .expect("timed out waiting for relay event")
            .expect("read")
            .expect("connection closed");
        serde_json::from_str(&line).expect("parse server event")
    }

    async fn join(&mut self, name: &str, x: f32, y: f32) {
        self.send(&ClientEvent::PlayerJoin {
            name: name.into(),
            x,
            y,
            facing: Facing::Down,
            sprite_id: "male_04".into(),
        })
        .await;
    }
}

async fn start_relay() -> String {
    let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind");
    let addr = listener.local_addr().expect("local addr").to_string();
    let hub = Arc::new(Mutex::new(Hub::new()));
    tokio::spawn(serve(listener, hub));
    addr
}

#[tokio::test]
async fn join_move_leave_fan_out() {
    let addr = start_relay().await;

    let mut ann = TestClient::connect(&addr).await;
    ann.join("Ann", 5.0, 6.0).await;

    let ann_id = match ann.recv().await {
        ServerEvent::Welcome { id } => id,
        other => panic!("expected welcome, got {other:?}"),
    };
    match ann.recv().await {
        ServerEvent::PlayersList(list) => {
            assert_eq!(list.len(), 1);
            assert_eq!(list[0].id, ann_id);
            assert_eq!(list[0].name, "Ann");
            assert_eq!(list[0].x, 5.0);
        }
        other => panic!("expected players-list, got {other:?}"),
    }

    let mut bea = TestClient::connect(&addr).await;
    bea.join("Bea", 8.0, 9.0).await;

    let bea_id = match bea.recv().await {
        ServerEvent::Welcome { id } => id,
        other => panic!("expected welcome, got {other:?}"),
    };
    assert_ne!(bea_id, ann_id);
    match bea.recv().await {
        ServerEvent::PlayersList(list) => {
            assert_eq!(list.len(), 2);
            let names: Vec<&str> = list.iter().map(|r| r.name.as_str()).collect();
            assert!(names.contains(&"Ann") && names.contains(&"Bea"));
        }
        other => panic!("expected players-list, got {other:?}"),
    }

    // the earlier joiner hears about the new one
    match ann.recv().await {
        ServerEvent::PlayerJoined(record) => {
            assert_eq!(record.id, bea_id);
            assert_eq!(record.name, "Bea");
        }
        other => panic!("expected player-joined, got {other:?}"),
    }

    ann.send(&ClientEvent::PlayerMoved {
        x: 10.3,
        y: 15.0,
        facing: Facing::Down,
    })
    .await;
    match bea.recv().await {
        ServerEvent::PlayerMoved { id, x, y, facing } => {
            assert_eq!(id, ann_id);
            assert_eq!(x, 10.3);
            assert_eq!(y, 15.0);
            assert_eq!(facing, Facing::Down);
        }
        other => panic!("expected player-moved, got {other:?}"),
    }

    drop(ann);
    match bea.recv().await {
        ServerEvent::PlayerLeft { id } => assert_eq!(id, ann_id),
        other => panic!("expected player-left, got {other:?}"),
    }
}

#[tokio::test]
async fn malformed_lines_do_not_kill_the_connection() {
    let addr = start_relay().await;

    let mut ann = TestClient::connect(&addr).await;
    ann.join("Ann", 1.0, 1.0).await;
    let _ = ann.recv().await; // welcome
    let _ = ann.recv().await; // players-list

    let mut bea = TestClient::connect(&addr).await;
    bea.writer
        .write_all(b"this is not json\n")
        .await
        .expect("write");
    bea.join("Bea", 2.0, 2.0).await;

    match bea.recv().await {
        ServerEvent::Welcome { .. } => {}
        other => panic!("expected welcome after garbage line, got {other:?}"),
    }
    match ann.recv().await {
        ServerEvent::PlayerJoined(record) => assert_eq!(record.name, "Bea"),
        other => panic!("expected player-joined, got {other:?}"),
    }
}
