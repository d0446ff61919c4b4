//! Client struct definition
//!
//! Represents a live connection with its lifecycle state and
//! outbound communication channel.

use tokio::sync::mpsc;

use crate::error::SendError;
use crate::message::ServerMessage;
use crate::types::ClientId;

/// Connection lifecycle
///
/// `Waiting -> Paired -> Idle -> Closed`, with `Waiting -> Closed` and
/// `Paired -> Closed` also reachable. Nothing leaves `Closed`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    /// Queued in the waiting pool
    Waiting,
    /// Member of a live room
    Paired,
    /// Partner left; connected but neither queued nor paired
    Idle,
    /// Transport closed
    Closed,
}

/// Connected client information
#[derive(Debug)]
pub struct Client {
    /// Unique identifier for this client
    pub id: ClientId,
    /// Current lifecycle state
    pub state: ConnectionState,
    /// Server → Client message channel
    pub sender: mpsc::UnboundedSender<ServerMessage>,
}

impl Client {
    /// Create a new waiting client with the given ID and sender channel
    pub fn new(id: ClientId, sender: mpsc::UnboundedSender<ServerMessage>) -> Self {
        Self {
            id,
            state: ConnectionState::Waiting,
            sender,
        }
    }

    /// Send a message to this client
    ///
    /// Never waits: the connection's write task drains the channel.
    /// Returns an error if the channel is closed (client disconnected).
    pub fn send(&self, msg: ServerMessage) -> Result<(), SendError> {
        self.sender.send(msg).map_err(|_| SendError::ChannelClosed)
    }

    /// Move to `next` if the lifecycle allows it
    ///
    /// Returns false (and keeps the current state) for illegal transitions.
    pub fn transition(&mut self, next: ConnectionState) -> bool {
        use ConnectionState::*;

        let allowed = matches!(
            (self.state, next),
            (Waiting, Paired) | (Paired, Idle) | (Waiting | Paired | Idle, Closed)
        );
        if allowed {
            self.state = next;
        }
        allowed
    }
}
