//! Short human-shareable room codes.

use rand::Rng;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Number of characters in a room code.
pub const ROOM_CODE_LEN: usize = 6;

const ROOM_CODE_ALPHABET: &[u8] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZ0123456789";

/// Identifier of a room, e.g. `"K3Q9ZA"`.
///
/// Codes are always stored upper-cased, so lookups built from user input are
/// case-insensitive.
#[derive(Clone, Debug, Deserialize, Eq, Hash, Ord, PartialEq, PartialOrd, Serialize)]
#[serde(from = "String", into = "String")]
pub struct RoomCode(String);

impl RoomCode {
    /// Draw a random code. Uniqueness is checked by the directory.
    pub fn generate() -> Self {
        let mut rng = rand::rng();
        let code = (0..ROOM_CODE_LEN)
            .map(|_| char::from(ROOM_CODE_ALPHABET[rng.random_range(0..ROOM_CODE_ALPHABET.len())]))
            .collect();
        Self(code)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for RoomCode {
    fn from(value: &str) -> Self {
        Self(value.trim().to_ascii_uppercase())
    }
}

impl From<String> for RoomCode {
    fn from(value: String) -> Self {
        Self::from(value.as_str())
    }
}

impl From<RoomCode> for String {
    fn from(value: RoomCode) -> Self {
        value.0
    }
}

impl fmt::Display for RoomCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}
