//! Error types for the chat server
//!
//! Defines connection-level errors, outbound send errors and the
//! error enums of the broker's building blocks.
//! Uses thiserror for ergonomic error definitions.

use thiserror::Error;

use crate::types::{ClientId, RoomId};

/// Connection-level errors
///
/// All of these end the connection they occur on; none of them is fatal
/// for the broker process.
#[derive(Debug, Error)]
pub enum AppError {
    /// WebSocket protocol error
    #[error("WebSocket error: {0}")]
    WebSocket(#[from] tokio_tungstenite::tungstenite::Error),

    /// JSON serialization/deserialization error
    #[error("JSON serialization error: {0}")]
    Json(#[from] serde_json::Error),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Channel send error (internal channel broken)
    #[error("Channel send error")]
    ChannelSend,
}

/// Message send errors
///
/// Occurs when attempting to send messages through closed channels.
#[derive(Debug, Error)]
pub enum SendError {
    /// The receiving end of the channel has been closed
    #[error("Channel closed")]
    ChannelClosed,
}

/// Waiting pool errors
#[derive(Debug, Error, PartialEq, Eq)]
pub enum PoolError {
    #[error("Client {0} is already waiting")]
    DuplicateEntry(ClientId),

    #[error("Waiting pool is empty")]
    Empty,
}

/// Connection registry errors
#[derive(Debug, Error, PartialEq, Eq)]
pub enum RegistryError {
    /// No live connection with this id
    #[error("Unknown client {0}")]
    UnknownClient(ClientId),

    /// Connection is already a member of a room
    #[error("Client {client} is already in room {room}")]
    AlreadyInRoom { client: ClientId, room: RoomId },

    /// A room cannot pair a connection with itself
    #[error("Client {0} cannot be paired with itself")]
    SelfPairing(ClientId),
}

/// Room relay errors
///
/// Only `PayloadTooLarge` is ever reported to a client; the others are
/// dropped silently so that room membership is not leaked.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum RelayError {
    /// Sender is not a member of the named room (stale or spoofed)
    #[error("Client {client} is not a member of room {room}")]
    NotMember { client: ClientId, room: RoomId },

    /// The other member is no longer connected
    #[error("Partner of {0} is unavailable")]
    PartnerUnavailable(ClientId),

    /// File larger than the relay limit
    #[error("File of {size} bytes exceeds the {limit} byte limit")]
    PayloadTooLarge { size: u64, limit: u64 },
}
