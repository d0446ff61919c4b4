//! Presence broadcaster
//!
//! Pushes the number of live connections to every live connection.

use tracing::debug;

use crate::message::ServerMessage;
use crate::registry::ConnectionRegistry;

/// Broadcast the current connection count to everyone
///
/// Called once per connect and once per disconnect, without coalescing.
/// Returns the count that was broadcast.
pub fn broadcast_count(registry: &ConnectionRegistry) -> usize {
    let count = registry.len();
    let msg = ServerMessage::UserCount { count };

    for client in registry.clients() {
        if client.send(msg.clone()).is_err() {
            debug!("Skipped user_count for closed client {}", client.id);
        }
    }

    debug!("Broadcast user_count {}", count);
    count
}
