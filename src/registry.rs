//! Connection registry
//!
//! Owns every live connection, the live rooms, and the connection → room
//! mapping used to authorize relayed events.

use std::collections::HashMap;

use crate::client::{Client, ConnectionState};
use crate::error::RegistryError;
use crate::room::Room;
use crate::types::{ClientId, RoomId};

/// Live connections and room membership
///
/// Uses HashMap for O(1) lookups on clients, rooms, and client-room mappings.
#[derive(Debug, Default)]
pub struct ConnectionRegistry {
    /// All connected clients: ClientId -> Client
    clients: HashMap<ClientId, Client>,
    /// All live rooms: RoomId -> Room
    rooms: HashMap<RoomId, Room>,
    /// Client to room mapping: ClientId -> RoomId (0 or 1 per client)
    memberships: HashMap<ClientId, RoomId>,
}

impl ConnectionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Track a newly accepted connection
    pub fn register(&mut self, client: Client) {
        self.clients.insert(client.id, client);
    }

    /// Stop tracking a connection and mark it closed
    ///
    /// Callers close the connection's room first so the partner can still
    /// be found; any membership left over is dropped here.
    pub fn unregister(&mut self, client_id: ClientId) -> Option<Client> {
        self.memberships.remove(&client_id);
        let mut client = self.clients.remove(&client_id)?;
        client.transition(ConnectionState::Closed);
        Some(client)
    }

    pub fn get(&self, client_id: ClientId) -> Option<&Client> {
        self.clients.get(&client_id)
    }

    /// Live connections
    pub fn clients(&self) -> impl Iterator<Item = &Client> {
        self.clients.values()
    }

    /// Number of live connections
    pub fn len(&self) -> usize {
        self.clients.len()
    }

    pub fn is_empty(&self) -> bool {
        self.clients.is_empty()
    }

    /// Number of live rooms
    pub fn room_count(&self) -> usize {
        self.rooms.len()
    }

    pub fn room(&self, room_id: &RoomId) -> Option<&Room> {
        self.rooms.get(room_id)
    }

    /// Room the client currently belongs to
    pub fn room_of(&self, client_id: ClientId) -> Option<&Room> {
        self.memberships
            .get(&client_id)
            .and_then(|room_id| self.rooms.get(room_id))
    }

    /// Register a room for both of its members
    ///
    /// Both members must be live and in no other room; on error nothing
    /// is changed.
    pub fn open_room(&mut self, room: Room) -> Result<&Room, RegistryError> {
        let [a, b] = room.members;
        if a == b {
            return Err(RegistryError::SelfPairing(a));
        }
        for member in room.members {
            if !self.clients.contains_key(&member) {
                return Err(RegistryError::UnknownClient(member));
            }
            if let Some(existing) = self.memberships.get(&member) {
                return Err(RegistryError::AlreadyInRoom {
                    client: member,
                    room: existing.clone(),
                });
            }
        }

        for member in room.members {
            self.memberships.insert(member, room.id.clone());
            if let Some(client) = self.clients.get_mut(&member) {
                client.transition(ConnectionState::Paired);
            }
        }

        let room_id = room.id.clone();
        let room: &Room = self.rooms.entry(room_id).or_insert(room);
        Ok(room)
    }

    /// The member of `room_id` that is not `sender`
    ///
    /// None unless the sender is currently mapped to that very room.
    pub fn partner_in(&self, room_id: &RoomId, sender: ClientId) -> Option<ClientId> {
        if self.memberships.get(&sender) != Some(room_id) {
            return None;
        }
        self.rooms.get(room_id)?.other_member(sender)
    }

    /// Tear a room down, clearing the mapping of both members
    ///
    /// Members still connected become idle.
    pub fn close_room(&mut self, room_id: &RoomId) -> Option<Room> {
        let room = self.rooms.remove(room_id)?;
        for member in room.members {
            if self.memberships.get(&member) == Some(room_id) {
                self.memberships.remove(&member);
            }
            if let Some(client) = self.clients.get_mut(&member) {
                client.transition(ConnectionState::Idle);
            }
        }
        Some(room)
    }
}
