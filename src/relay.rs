//! Room relay
//!
//! Routes point-to-point events between the two members of a room.
//! Every event is authorized against the connection registry: a sender
//! that is not mapped to the named room gets its event dropped.

use tracing::{debug, warn};

use crate::error::RelayError;
use crate::message::ServerMessage;
use crate::registry::ConnectionRegistry;
use crate::types::{ClientId, RoomId};

/// Largest file the broker relays (50 MiB)
pub const MAX_FILE_SIZE: u64 = 50 * 1024 * 1024;

/// File upload metadata and content
#[derive(Debug, Clone, PartialEq)]
pub struct FilePayload {
    pub name: String,
    pub mime_type: String,
    /// Size declared by the uploader
    pub size: u64,
    pub bytes: Vec<u8>,
}

impl FilePayload {
    /// Size checked against the limit: the declared size or the actual
    /// byte count, whichever is larger
    pub fn effective_size(&self) -> u64 {
        self.size.max(self.bytes.len() as u64)
    }
}

/// Event relayed from one room member to the other
#[derive(Debug, Clone, PartialEq)]
pub enum RelayEvent {
    Message { text: String },
    File(FilePayload),
    Typing(bool),
    Reaction { message_index: u64, reaction: String },
}

impl RelayEvent {
    /// What the partner receives
    fn into_delivery(self, sender: ClientId) -> ServerMessage {
        match self {
            RelayEvent::Message { text } => ServerMessage::ReceiveMessage {
                message: text,
                sender_id: sender.to_string(),
            },
            RelayEvent::File(file) => ServerMessage::ReceiveFile {
                file: file.bytes,
                file_name: file.name,
                file_type: file.mime_type,
                file_size: file.size,
                sender_id: sender.to_string(),
            },
            RelayEvent::Typing(true) => ServerMessage::PartnerTyping,
            RelayEvent::Typing(false) => ServerMessage::PartnerStopTyping,
            RelayEvent::Reaction {
                message_index,
                reaction,
            } => ServerMessage::ReceiveReaction {
                message_index,
                reaction,
            },
        }
    }
}

/// Forward `event` from `sender` to the other member of `room_id`
///
/// Returns the partner the event was delivered to.
pub fn relay(
    registry: &ConnectionRegistry,
    room_id: &RoomId,
    sender: ClientId,
    event: RelayEvent,
) -> Result<ClientId, RelayError> {
    if let RelayEvent::File(file) = &event {
        let size = file.effective_size();
        if size > MAX_FILE_SIZE {
            return Err(RelayError::PayloadTooLarge {
                size,
                limit: MAX_FILE_SIZE,
            });
        }
    }

    let partner_id = registry
        .partner_in(room_id, sender)
        .ok_or_else(|| RelayError::NotMember {
            client: sender,
            room: room_id.clone(),
        })?;

    let partner = registry
        .get(partner_id)
        .ok_or(RelayError::PartnerUnavailable(sender))?;

    partner
        .send(event.into_delivery(sender))
        .map_err(|_| RelayError::PartnerUnavailable(sender))?;

    Ok(partner_id)
}

/// Relay an event and settle the outcome
///
/// User-visible failures go back to the sender only; everything else is
/// dropped with a log line.
pub fn dispatch(
    registry: &ConnectionRegistry,
    room_id: &RoomId,
    sender: ClientId,
    event: RelayEvent,
) {
    let Err(err) = relay(registry, room_id, sender, event) else {
        return;
    };

    match err.notice() {
        Some(notice) => {
            warn!("Rejected event from {}: {}", sender, err);
            if let Some(client) = registry.get(sender) {
                let _ = client.send(notice);
            }
        }
        None => debug!("Dropped event from {}: {}", sender, err),
    }
}

/// Relay a text message
pub fn send_message(registry: &ConnectionRegistry, room_id: &RoomId, sender: ClientId, text: String) {
    dispatch(registry, room_id, sender, RelayEvent::Message { text });
}

/// Relay a file, rejecting anything over [`MAX_FILE_SIZE`]
pub fn send_file(registry: &ConnectionRegistry, room_id: &RoomId, sender: ClientId, file: FilePayload) {
    dispatch(registry, room_id, sender, RelayEvent::File(file));
}

/// Relay a typing hint
pub fn set_typing(registry: &ConnectionRegistry, room_id: &RoomId, sender: ClientId, is_typing: bool) {
    dispatch(registry, room_id, sender, RelayEvent::Typing(is_typing));
}

/// Relay a reaction; the message index is passed through unchecked
pub fn send_reaction(
    registry: &ConnectionRegistry,
    room_id: &RoomId,
    sender: ClientId,
    message_index: u64,
    reaction: String,
) {
    dispatch(
        registry,
        room_id,
        sender,
        RelayEvent::Reaction {
            message_index,
            reaction,
        },
    );
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::Client;
    use crate::room::Room;
    use tokio::sync::mpsc;
    use tokio::sync::mpsc::UnboundedReceiver;

    struct Pair {
        registry: ConnectionRegistry,
        room_id: RoomId,
        a: ClientId,
        b: ClientId,
        ra: UnboundedReceiver<ServerMessage>,
        rb: UnboundedReceiver<ServerMessage>,
    }

    fn paired() -> Pair {
        let mut registry = ConnectionRegistry::new();
        let (ta, ra) = mpsc::unbounded_channel();
        let (tb, rb) = mpsc::unbounded_channel();
        let (a, b) = (ClientId::new(), ClientId::new());
        registry.register(Client::new(a, ta));
        registry.register(Client::new(b, tb));
        let room_id = registry.open_room(Room::pair(a, b).unwrap()).unwrap().id.clone();
        Pair {
            registry,
            room_id,
            a,
            b,
            ra,
            rb,
        }
    }

    fn file_of(size: u64) -> FilePayload {
        FilePayload {
            name: "clip.bin".to_string(),
            mime_type: "application/octet-stream".to_string(),
            size,
            bytes: vec![7; 4],
        }
    }

    #[test]
    fn test_message_reaches_partner_only() {
        let mut p = paired();

        send_message(&p.registry, &p.room_id, p.a, "hi".to_string());

        assert_eq!(
            p.rb.try_recv().unwrap(),
            ServerMessage::ReceiveMessage {
                message: "hi".to_string(),
                sender_id: p.a.to_string(),
            }
        );
        assert!(p.ra.try_recv().is_err());
    }

    #[test]
    fn test_relay_works_both_ways() {
        let mut p = paired();

        assert_eq!(relay(&p.registry, &p.room_id, p.b, RelayEvent::Typing(true)), Ok(p.a));
        assert_eq!(p.ra.try_recv().unwrap(), ServerMessage::PartnerTyping);

        set_typing(&p.registry, &p.room_id, p.b, false);
        assert_eq!(p.ra.try_recv().unwrap(), ServerMessage::PartnerStopTyping);
    }

    #[test]
    fn test_reaction_is_pass_through() {
        let mut p = paired();

        send_reaction(&p.registry, &p.room_id, p.a, 9_999, "🔥".to_string());

        assert_eq!(
            p.rb.try_recv().unwrap(),
            ServerMessage::ReceiveReaction {
                message_index: 9_999,
                reaction: "🔥".to_string(),
            }
        );
    }

    #[test]
    fn test_file_at_limit_is_relayed() {
        let mut p = paired();

        send_file(&p.registry, &p.room_id, p.a, file_of(MAX_FILE_SIZE));

        match p.rb.try_recv().unwrap() {
            ServerMessage::ReceiveFile {
                file_size,
                sender_id,
                file,
                ..
            } => {
                assert_eq!(file_size, MAX_FILE_SIZE);
                assert_eq!(sender_id, p.a.to_string());
                assert_eq!(file, vec![7; 4]);
            }
            other => panic!("unexpected {:?}", other),
        }
        assert!(p.ra.try_recv().is_err());
    }

    #[test]
    fn test_oversized_file_reported_to_sender_only() {
        let mut p = paired();

        send_file(&p.registry, &p.room_id, p.a, file_of(MAX_FILE_SIZE + 1));

        assert!(matches!(p.ra.try_recv().unwrap(), ServerMessage::FileError { .. }));
        assert!(p.rb.try_recv().is_err());
    }

    #[test]
    fn test_understated_file_size_still_limited() {
        let p = paired();
        let mut file = file_of(1);
        file.bytes = vec![0; (MAX_FILE_SIZE + 1) as usize];

        let err = relay(&p.registry, &p.room_id, p.a, RelayEvent::File(file)).unwrap_err();
        assert_eq!(
            err,
            RelayError::PayloadTooLarge {
                size: MAX_FILE_SIZE + 1,
                limit: MAX_FILE_SIZE,
            }
        );
    }

    #[test]
    fn test_outsider_event_dropped_silently() {
        let mut p = paired();
        let (tx, mut rx) = mpsc::unbounded_channel();
        let outsider = ClientId::new();
        p.registry.register(Client::new(outsider, tx));

        send_message(&p.registry, &p.room_id, outsider, "psst".to_string());

        assert!(p.ra.try_recv().is_err());
        assert!(p.rb.try_recv().is_err());
        assert!(rx.try_recv().is_err());
    }

    #[test]
    fn test_stale_room_event_dropped() {
        let mut p = paired();
        p.registry.close_room(&p.room_id);

        let err = relay(
            &p.registry,
            &p.room_id,
            p.a,
            RelayEvent::Message { text: "late".to_string() },
        )
        .unwrap_err();

        assert!(matches!(err, RelayError::NotMember { .. }));
        assert!(p.rb.try_recv().is_err());
        assert!(p.ra.try_recv().is_err());
    }

    #[test]
    fn test_gone_partner_is_unavailable() {
        let p = paired();
        drop(p.rb);

        let err = relay(&p.registry, &p.room_id, p.a, RelayEvent::Typing(true)).unwrap_err();
        assert_eq!(err, RelayError::PartnerUnavailable(p.a));
    }
}
