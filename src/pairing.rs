//! Pairing engine
//!
//! Drains the waiting pool two connections at a time, oldest first, and
//! opens a room for each pair.

use tracing::{debug, error, info};

use crate::message::ServerMessage;
use crate::pool::WaitingPool;
use crate::registry::ConnectionRegistry;
use crate::room::Room;
use crate::types::{ClientId, RoomId};

/// Pair every waiting connection that has a partner available
///
/// Loops while two or more connections wait, so a burst of arrivals is
/// fully drained. Both members of each new room get `chat_started`.
/// Returns the ids of the rooms opened, in pairing order.
pub fn pair_waiting(pool: &mut WaitingPool, registry: &mut ConnectionRegistry) -> Vec<RoomId> {
    let mut opened = Vec::new();

    while pool.len() >= 2 {
        let (Ok(first), Ok(second)) = (pool.dequeue_front(), pool.dequeue_front()) else {
            break;
        };

        let Some(room) = Room::pair(first, second) else {
            error!("Waiting pool yielded {} twice", first);
            continue;
        };

        let opened_room = registry
            .open_room(room)
            .map(|room| (room.id.clone(), room.members));
        let (room_id, members) = match opened_room {
            Ok(opened) => opened,
            Err(e) => {
                error!("Failed to open room for {} and {}: {}", first, second, e);
                requeue_unpaired(pool, registry, [first, second]);
                continue;
            }
        };

        info!("Paired {} and {} in room {}", first, second, room_id);

        let started = ServerMessage::ChatStarted {
            room_id: room_id.to_string(),
        };
        for member in members {
            if let Some(client) = registry.get(member) {
                if client.send(started.clone()).is_err() {
                    debug!("Client {} gone before chat_started", member);
                }
            }
        }

        opened.push(room_id);
    }

    opened
}

/// Put live members that did not end up in a room back in line
fn requeue_unpaired(
    pool: &mut WaitingPool,
    registry: &ConnectionRegistry,
    members: [ClientId; 2],
) {
    for member in members {
        if registry.get(member).is_some() && registry.room_of(member).is_none() {
            let _ = pool.enqueue(member);
        }
    }
}
