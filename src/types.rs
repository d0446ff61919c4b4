//! Basic type definitions for the chat server
//!
//! Provides newtype wrappers for type safety:
//! - `ClientId`: UUID-based unique connection identifier
//! - `RoomId`: identifier derived from the two paired connections

use uuid::Uuid;

/// Separator placed between the two member ids of a room id
pub const ROOM_ID_SEPARATOR: char = '-';

/// Unique client identifier (newtype pattern)
///
/// Wraps a UUID v4 assigned when the transport accepts the connection.
/// Implements Hash and Eq for use as HashMap keys.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ClientId(pub Uuid);

impl ClientId {
    /// Create a new random client ID
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for ClientId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for ClientId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Room identifier
///
/// The two member ids joined by [`ROOM_ID_SEPARATOR`], first-dequeued
/// member first. Only unique among live rooms, which is all the broker needs.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct RoomId(pub String);

impl RoomId {
    /// Derive the id of the room pairing `first` with `second`
    pub fn derive(first: ClientId, second: ClientId) -> Self {
        Self(format!("{first}{ROOM_ID_SEPARATOR}{second}"))
    }

    /// Wrap a room id received from a client
    pub fn from_string(id: String) -> Self {
        Self(id)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for RoomId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}
