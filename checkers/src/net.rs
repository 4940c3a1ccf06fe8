//! Transport-independent protocol layer.
//!
//! Clients speak JSON: one [`ClientCommand`] per text frame in, zero or one
//! direct [`ServerMessage`] reply out, plus `room-state` broadcasts pushed
//! through the connection's event channel.

/// Per-connection command dispatch.
pub mod connection;

/// Message types for the client-server protocol.
pub mod messages;

pub use connection::{Binding, Connection};
pub use messages::{ClientCommand, ServerMessage};
