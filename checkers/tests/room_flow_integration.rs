//! Integration tests for complete room flows through the connection layer.
//!
//! Each test drives one or more [`Connection`]s with JSON commands exactly as
//! a transport would and inspects the replies and broadcast events.

use checkers::{
    ClientCommand, Color, Connection, RoomCode, RoomConfig, RoomDirectory, ServerMessage,
    SessionToken, Square,
    room::{RoomEvent, RoomPhase, RoomSnapshot},
};
use serde_json::{Value, json};
use std::{sync::Arc, time::Duration};
use tokio::sync::mpsc;

struct Client {
    connection: Connection,
    events: mpsc::Receiver<RoomEvent>,
}

impl Client {
    fn new(directory: &Arc<RoomDirectory>) -> Self {
        let (outbox, events) = mpsc::channel(32);
        Self {
            connection: Connection::new(Arc::clone(directory), outbox),
            events,
        }
    }

    async fn send(&mut self, command: Value) -> Option<ServerMessage> {
        let command: ClientCommand = serde_json::from_value(command).expect("valid command");
        self.connection.handle(command).await
    }

    async fn join(&mut self, command: Value) -> (RoomSnapshot, Color, SessionToken) {
        match self.send(command).await {
            Some(ServerMessage::RoomJoined { room, color, token }) => (room, color, token),
            other => panic!("expected room-joined, got {:?}", other),
        }
    }

    async fn play(&mut self, from: [i32; 2], to: [i32; 2]) -> Option<ServerMessage> {
        self.send(json!({"type": "make-move", "from": from, "to": to}))
            .await
    }

    /// Most recent broadcast state, draining everything queued.
    fn latest_state(&mut self) -> Option<RoomSnapshot> {
        let mut latest = None;
        while let Ok(event) = self.events.try_recv() {
            if let RoomEvent::State(snapshot) = event {
                latest = Some(snapshot);
            }
        }
        latest
    }
}

fn directory() -> Arc<RoomDirectory> {
    Arc::new(RoomDirectory::new(RoomConfig::default()))
}

fn reason(message: Option<ServerMessage>) -> String {
    match message {
        Some(ServerMessage::Error { reason, .. }) => reason,
        other => panic!("expected error, got {:?}", other),
    }
}

async fn started_match(directory: &Arc<RoomDirectory>) -> (Client, Client, RoomCode) {
    let mut red = Client::new(directory);
    let mut black = Client::new(directory);

    let (room, color, _) = red.join(json!({"type": "create-room"})).await;
    assert_eq!(color, Color::Red);

    let (_, color, _) = black
        .join(json!({"type": "join-room", "roomId": room.id}))
        .await;
    assert_eq!(color, Color::Black);

    (red, black, room.id)
}

// === Seating ===

#[tokio::test]
async fn test_create_join_and_full() {
    let directory = directory();
    let mut red = Client::new(&directory);
    let (room, color, token) = red.join(json!({"type": "create-room"})).await;

    assert_eq!(color, Color::Red);
    assert_eq!(room.phase, RoomPhase::Waiting);
    assert_eq!(room.id.as_str().len(), 6);
    assert_eq!(token.as_str().len(), 32);

    let mut black = Client::new(&directory);
    let lowercase = room.id.as_str().to_lowercase();
    let (joined, color, _) = black
        .join(json!({"type": "join-room", "roomId": lowercase}))
        .await;
    assert_eq!(color, Color::Black);
    assert_eq!(joined.phase, RoomPhase::InProgress);
    assert_eq!(joined.players_count, 2);

    let state = red.latest_state().expect("red sees the join");
    assert_eq!(state.players, vec![Color::Red, Color::Black]);

    let mut third = Client::new(&directory);
    let reply = third
        .send(json!({"type": "join-room", "roomId": room.id}))
        .await;
    assert_eq!(reason(reply), "RoomFull");
}

#[tokio::test]
async fn test_join_unknown_room() {
    let directory = directory();
    let mut client = Client::new(&directory);
    let reply = client
        .send(json!({"type": "join-room", "roomId": "ZZZZZZ"}))
        .await;
    assert_eq!(reason(reply), "RoomNotFound");
}

#[tokio::test]
async fn test_commands_without_seat() {
    let directory = directory();
    let (_red, _black, code) = started_match(&directory).await;
    let mut stranger = Client::new(&directory);

    assert_eq!(reason(stranger.play([2, 1], [3, 2]).await), "NotAPlayer");
    assert_eq!(
        reason(stranger.send(json!({"type": "request-rematch"})).await),
        "NotInRoom"
    );
    assert_eq!(
        reason(
            stranger
                .send(json!({"type": "get-allowed-moves", "roomId": code, "from": [2, 1]}))
                .await
        ),
        "NotAPlayer"
    );
}

#[tokio::test]
async fn test_leave_frees_seat_and_revokes_token() {
    let directory = directory();
    let (mut red, mut black, code) = started_match(&directory).await;
    let _ = red.latest_state();

    let black_binding = black.connection.binding().cloned().unwrap();
    assert!(
        black
            .send(json!({"type": "leave-room", "roomId": code}))
            .await
            .is_none()
    );
    assert!(black.connection.binding().is_none());

    let state = red.latest_state().unwrap();
    assert_eq!(state.players_count, 1);

    let mut thief = Client::new(&directory);
    let reply = thief
        .send(json!({"type": "reconnect-with-token", "token": black_binding.token}))
        .await;
    assert_eq!(reason(reply), "InvalidToken");

    let mut newcomer = Client::new(&directory);
    let (_, color, _) = newcomer
        .join(json!({"type": "join-room", "roomId": code}))
        .await;
    assert_eq!(color, Color::Black);
}

#[tokio::test]
async fn test_join_takes_over_disconnected_seat() {
    let directory = directory();
    let (mut red, mut black, code) = started_match(&directory).await;
    let old_token = black.connection.binding().unwrap().token.clone();
    black.connection.close().await;
    assert_eq!(red.latest_state().unwrap().players_count, 1);

    let mut newcomer = Client::new(&directory);
    let (room, color, token) = newcomer
        .join(json!({"type": "join-room", "roomId": code}))
        .await;
    assert_eq!(color, Color::Black);
    assert_eq!(room.players_count, 2);
    assert_ne!(token, old_token);

    let mut returning = Client::new(&directory);
    let reply = returning
        .send(json!({"type": "reconnect-with-token", "token": old_token}))
        .await;
    assert_eq!(reason(reply), "InvalidToken");

    assert_eq!(red.play([2, 1], [3, 2]).await, Some(ServerMessage::Ack));
    assert_eq!(newcomer.play([5, 0], [4, 1]).await, Some(ServerMessage::Ack));
}

#[tokio::test]
async fn test_newcomer_token_survives_previous_leave() {
    let directory = directory();
    let (_red, mut black, code) = started_match(&directory).await;
    black
        .send(json!({"type": "leave-room", "roomId": code}))
        .await;

    let mut newcomer = Client::new(&directory);
    let (_, color, token) = newcomer
        .join(json!({"type": "join-room", "roomId": code}))
        .await;
    assert_eq!(color, Color::Black);
    newcomer.connection.close().await;

    let mut returning = Client::new(&directory);
    let (room, color, same_token) = returning
        .join(json!({"type": "reconnect-with-token", "token": token}))
        .await;
    assert_eq!(color, Color::Black);
    assert_eq!(same_token, token);
    assert_eq!(room.players_count, 2);
}

#[tokio::test]
async fn test_displaced_connection_must_join_like_a_stranger() {
    let directory = directory();
    let (mut red, mut black, code) = started_match(&directory).await;
    let token = red.connection.binding().unwrap().token.clone();

    let mut second_tab = Client::new(&directory);
    second_tab
        .join(json!({"type": "reconnect-with-token", "token": token}))
        .await;

    // Both seats are occupied, so the old tab is not handed red back
    let reply = red
        .send(json!({"type": "join-room", "roomId": code}))
        .await;
    assert_eq!(reason(reply), "RoomFull");
    assert_eq!(reason(red.play([2, 1], [3, 2]).await), "NotAPlayer");

    black.connection.close().await;
    let (_, color, new_token) = red
        .join(json!({"type": "join-room", "roomId": code}))
        .await;
    assert_eq!(color, Color::Black);
    assert_ne!(new_token, token);
    assert_eq!(second_tab.play([2, 1], [3, 2]).await, Some(ServerMessage::Ack));
}

// === Play ===

#[tokio::test]
async fn test_turns_and_broadcasts() {
    let directory = directory();
    let (mut red, mut black, _) = started_match(&directory).await;
    let _ = red.latest_state();
    let _ = black.latest_state();

    assert_eq!(reason(black.play([5, 0], [4, 1]).await), "NotYourTurn");
    assert_eq!(red.play([2, 1], [3, 2]).await, Some(ServerMessage::Ack));

    for client in [&mut red, &mut black] {
        let state = client.latest_state().expect("move broadcast");
        assert_eq!(state.turn, Color::Black);
        assert_eq!(state.moves.len(), 1);
        assert_eq!(state.moves[0].from, Square::new(2, 1));
    }

    assert_eq!(reason(red.play([2, 3], [3, 4]).await), "NotYourTurn");
    assert_eq!(reason(black.play([5, 0], [3, 2]).await), "OccupiedDestination");
}

#[tokio::test]
async fn test_forced_capture_over_the_wire() {
    let directory = directory();
    let (mut red, mut black, code) = started_match(&directory).await;

    assert_eq!(red.play([2, 3], [3, 4]).await, Some(ServerMessage::Ack));
    assert_eq!(black.play([5, 2], [4, 3]).await, Some(ServerMessage::Ack));

    let state = red.latest_state().unwrap();
    assert_eq!(state.must_capture, vec![Square::new(3, 4)]);

    let reply = red
        .send(json!({"type": "get-allowed-moves", "roomId": code, "from": [3, 4]}))
        .await;
    assert_eq!(
        reply,
        Some(ServerMessage::AllowedMoves {
            moves: vec![Square::new(5, 2)]
        })
    );

    assert_eq!(reason(red.play([2, 1], [3, 2]).await), "MustCapture");
    assert_eq!(red.play([3, 4], [5, 2]).await, Some(ServerMessage::Ack));

    let state = black.latest_state().unwrap();
    assert_eq!(state.turn, Color::Black);
    assert_eq!(state.moves[2].captured, Some(Square::new(4, 3)));
    assert!(state.board.get(Square::new(4, 3)).is_empty());
}

#[tokio::test]
async fn test_concurrent_moves_apply_once() {
    let directory = directory();
    let (red, _black, code) = started_match(&directory).await;
    let id = red.connection.id();

    let (first, second) = tokio::join!(
        directory.make_move(&code, id, Square::new(2, 1), Square::new(3, 2)),
        directory.make_move(&code, id, Square::new(2, 3), Square::new(3, 4)),
    );

    assert_eq!(first.is_ok() as u8 + second.is_ok() as u8, 1);
    let snapshot = directory.snapshot(&code).await.unwrap();
    assert_eq!(snapshot.moves.len(), 1);
    assert_eq!(snapshot.turn, Color::Black);
}

// === Reconnection ===

#[tokio::test]
async fn test_reconnect_restores_seat() {
    let directory = directory();
    let (mut red, mut black, code) = started_match(&directory).await;
    let token = red.connection.binding().unwrap().token.clone();

    assert_eq!(red.play([2, 1], [3, 2]).await, Some(ServerMessage::Ack));
    assert_eq!(
        black.send(json!({"type": "request-rematch"})).await,
        Some(ServerMessage::Ack)
    );
    red.connection.close().await;

    let state = black.latest_state().unwrap();
    assert_eq!(state.players_count, 1);

    let mut returning = Client::new(&directory);
    let (room, color, same_token) = returning
        .join(json!({"type": "reconnect-with-token", "token": token}))
        .await;
    assert_eq!(color, Color::Red);
    assert_eq!(same_token, token);
    assert_eq!(room.id, code);
    assert_eq!(room.moves.len(), 1);
    assert_eq!(room.turn, Color::Black);
    assert_eq!(room.rematch_requesters, vec![Color::Black]);
    assert_eq!(room.players_count, 2);
}

#[tokio::test]
async fn test_reconnect_displaces_stale_connection() {
    let directory = directory();
    let (mut red, _black, _) = started_match(&directory).await;
    let token = red.connection.binding().unwrap().token.clone();
    let _ = red.latest_state();

    let mut second_tab = Client::new(&directory);
    second_tab
        .join(json!({"type": "reconnect-with-token", "token": token}))
        .await;

    let displaced = std::iter::from_fn(|| red.events.try_recv().ok())
        .any(|event| matches!(event, RoomEvent::Displaced { color: Color::Red, .. }));
    assert!(displaced);

    assert_eq!(reason(red.play([2, 1], [3, 2]).await), "NotAPlayer");
    assert_eq!(second_tab.play([2, 1], [3, 2]).await, Some(ServerMessage::Ack));
}

// === Rematch ===

#[tokio::test]
async fn test_rematch_resets_board() {
    let directory = directory();
    let (mut red, mut black, code) = started_match(&directory).await;

    red.play([2, 1], [3, 2]).await;
    assert_eq!(
        red.send(json!({"type": "request-rematch"})).await,
        Some(ServerMessage::Ack)
    );
    let state = black.latest_state().unwrap();
    assert_eq!(state.rematch_requesters, vec![Color::Red]);
    assert_eq!(state.moves.len(), 1);

    assert_eq!(
        black.send(json!({"type": "cancel-rematch"})).await,
        Some(ServerMessage::Ack)
    );
    assert_eq!(
        black.send(json!({"type": "request-rematch"})).await,
        Some(ServerMessage::Ack)
    );

    let state = red.latest_state().unwrap();
    assert_eq!(state.id, code);
    assert!(state.moves.is_empty());
    assert!(state.rematch_requesters.is_empty());
    assert_eq!(state.turn, Color::Red);
    assert_eq!(red.connection.binding().unwrap().color, Color::Red);
    assert_eq!(black.connection.binding().unwrap().color, Color::Black);
}

// === Collection ===

#[tokio::test(start_paused = true)]
async fn test_idle_room_collected_then_tokens_purged() {
    let directory = directory();
    let config = directory.config().clone();
    let mut red = Client::new(&directory);
    let (room, _, token) = red.join(json!({"type": "create-room"})).await;

    red.connection.close().await;
    assert_eq!(directory.sweep().await, 0);

    tokio::time::advance(config.retention() + Duration::from_secs(1)).await;
    assert_eq!(directory.sweep().await, 1);
    assert_eq!(directory.room_count().await, 0);

    let mut late = Client::new(&directory);
    let reply = late
        .send(json!({"type": "reconnect-with-token", "token": token}))
        .await;
    assert_eq!(reason(reply), "RoomNotFound");

    tokio::time::advance(config.session_ttl() + Duration::from_secs(1)).await;
    directory.sweep().await;
    let reply = late
        .send(json!({"type": "reconnect-with-token", "token": token}))
        .await;
    assert_eq!(reason(reply), "InvalidToken");

    let reply = late
        .send(json!({"type": "join-room", "roomId": room.id}))
        .await;
    assert_eq!(reason(reply), "RoomNotFound");
}

#[tokio::test(start_paused = true)]
async fn test_occupied_room_survives_sweeps() {
    let directory = directory();
    let (_red, _black, code) = started_match(&directory).await;

    tokio::time::advance(Duration::from_secs(3600)).await;
    assert_eq!(directory.sweep().await, 0);
    assert!(directory.snapshot(&code).await.is_ok());
}
