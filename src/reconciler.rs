//! Disconnect reconciler
//!
//! Cleans up after a closed connection: tears down its room (telling the
//! partner first), drops it from the waiting pool and the registry.

use tracing::{debug, info};

use crate::message::ServerMessage;
use crate::pool::WaitingPool;
use crate::registry::ConnectionRegistry;
use crate::types::ClientId;

/// What a disconnect cleaned up
#[derive(Debug, Default, PartialEq, Eq)]
pub struct Reconciled {
    /// Former partner that was sent `partner_left`
    pub notified_partner: Option<ClientId>,
    /// Whether the connection was still waiting for a partner
    pub was_waiting: bool,
    /// Whether the connection was known at all
    pub was_registered: bool,
}

/// Remove every trace of `client_id`
///
/// The partner is notified before the room mapping is cleared. Presence
/// is left to the caller.
pub fn reconcile_disconnect(
    registry: &mut ConnectionRegistry,
    pool: &mut WaitingPool,
    client_id: ClientId,
) -> Reconciled {
    let mut outcome = Reconciled::default();

    if let Some(room) = registry.room_of(client_id) {
        let room_id = room.id.clone();
        let partner_id = room.other_member(client_id);

        if let Some(partner) = partner_id.and_then(|id| registry.get(id)) {
            if partner.send(ServerMessage::PartnerLeft).is_ok() {
                outcome.notified_partner = Some(partner.id);
            }
        }

        registry.close_room(&room_id);
        info!("Room {} closed after {} left", room_id, client_id);
    }

    outcome.was_waiting = pool.remove(client_id);
    if outcome.was_waiting {
        debug!("Removed {} from waiting pool, {} left", client_id, pool.len());
    }

    outcome.was_registered = registry.unregister(client_id).is_some();

    debug!(
        "Total clients: {}, Total rooms: {}, Waiting: {}",
        registry.len(),
        registry.room_count(),
        pool.len()
    );

    outcome
}
