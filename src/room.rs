//! Room struct definition
//!
//! Represents an ephemeral 1:1 room between two paired connections.

use std::time::Instant;

use crate::types::{ClientId, RoomId};

/// 1:1 Chat Room
///
/// Always holds exactly two distinct members. A room is never reused:
/// when either member leaves it is torn down.
#[derive(Debug, Clone)]
pub struct Room {
    /// Room id, derived from the members in pairing order
    pub id: RoomId,
    /// Members in pairing order (longest-waiting first)
    pub members: [ClientId; 2],
    /// Room creation time
    pub created_at: Instant,
}

impl Room {
    /// Pair `first` with `second`
    ///
    /// Returns None when both ids are the same connection.
    pub fn pair(first: ClientId, second: ClientId) -> Option<Self> {
        if first == second {
            return None;
        }
        Some(Self {
            id: RoomId::derive(first, second),
            members: [first, second],
            created_at: Instant::now(),
        })
    }

    /// Get the other member for a given client
    ///
    /// Returns None if the client is not in the room.
    pub fn other_member(&self, client_id: ClientId) -> Option<ClientId> {
        match self.members {
            [a, b] if a == client_id => Some(b),
            [a, b] if b == client_id => Some(a),
            _ => None,
        }
    }

    /// Check if a client is in this room
    pub fn contains(&self, client_id: ClientId) -> bool {
        self.members.contains(&client_id)
    }
}
