//! Reconnection sessions.

pub mod models;
pub mod registry;

pub use models::{ConnectionId, SessionBinding, SessionToken};
pub use registry::SessionRegistry;
