//! Room module providing isolated two-player matches with an async actor model.
//!
//! This module implements:
//! - Room: synchronous match state (seats, turn, history, rematch votes)
//! - RoomActor: async actor serializing every command against one Room
//! - RoomDirectory: creates, finds and collects rooms and owns the sessions
//!
//! ## Architecture
//!
//! Each room runs in a separate Tokio task with a bounded mpsc inbox. Every
//! message carries a oneshot responder, and state snapshots are pushed to
//! seated connections through their event channels after each change.
//! A periodic sweep asks every actor whether it has been empty for longer
//! than the retention window; such rooms shut themselves down.
//!
//! ## Example
//!
//! ```no_run
//! use checkers::room::{RoomConfig, RoomDirectory};
//! use checkers::session::ConnectionId;
//! use std::sync::Arc;
//! use tokio::sync::mpsc;
//!
//! #[tokio::main]
//! async fn main() {
//!     let directory = Arc::new(RoomDirectory::new(RoomConfig::default()));
//!     directory.spawn_sweeper();
//!
//!     let (outbox, _events) = mpsc::channel(32);
//!     let admission = directory
//!         .create_room(ConnectionId::new(), outbox)
//!         .await
//!         .unwrap();
//!     println!("share code {}", admission.room.id);
//! }
//! ```

pub mod actor;
pub mod code;
pub mod config;
pub mod errors;
pub mod manager;
pub mod messages;
pub mod state;

pub use actor::{RoomActor, RoomHandle};
pub use code::{ROOM_CODE_LEN, RoomCode};
pub use config::RoomConfig;
pub use errors::RoomError;
pub use manager::RoomDirectory;
pub use messages::{
    Admission, EventSender, MoveRecord, RoomEvent, RoomMessage, RoomSnapshot, Seated,
};
pub use state::{Room, RoomPhase, Seat, SeatClaim, Seats};
