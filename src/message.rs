//! Message protocol definitions
//!
//! JSON-based bidirectional message protocol using Serde's tagged enum
//! for type-safe serialization/deserialization. Event names are
//! snake_case, payload fields camelCase. File bytes travel base64-encoded.

use serde::{Deserialize, Serialize};

use crate::error::RelayError;

/// Client → Server message
///
/// `sender_id` is optional: the broker always knows who sent an event.
/// When present it must match the connection's own id.
#[derive(Debug, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case", rename_all_fields = "camelCase")]
pub enum ClientMessage {
    /// Send a text message to the partner
    SendMessage {
        room_id: String,
        message: String,
        #[serde(default)]
        sender_id: Option<String>,
    },
    /// Send a file to the partner
    SendFile {
        room_id: String,
        #[serde(with = "base64_bytes")]
        file: Vec<u8>,
        file_name: String,
        file_type: String,
        file_size: u64,
        #[serde(default)]
        sender_id: Option<String>,
    },
    /// Indicate typing started
    Typing { room_id: String },
    /// Indicate typing stopped
    StopTyping { room_id: String },
    /// React to a message by its position in the conversation
    SendReaction {
        room_id: String,
        message_index: u64,
        reaction: String,
    },
}

impl ClientMessage {
    /// Sender id declared by the client, if any
    pub fn declared_sender(&self) -> Option<&str> {
        match self {
            ClientMessage::SendMessage { sender_id, .. }
            | ClientMessage::SendFile { sender_id, .. } => sender_id.as_deref(),
            _ => None,
        }
    }
}

/// Server → Client message
///
/// All messages from server to client. Uses tagged enum with snake_case naming.
#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(tag = "type", rename_all = "snake_case", rename_all_fields = "camelCase")]
pub enum ServerMessage {
    /// Connection accepted, client ID issued
    Connected { client_id: String },
    /// Paired with a partner
    ChatStarted { room_id: String },
    /// Text message from the partner
    ReceiveMessage { message: String, sender_id: String },
    /// File from the partner
    ReceiveFile {
        #[serde(with = "base64_bytes")]
        file: Vec<u8>,
        file_name: String,
        file_type: String,
        file_size: u64,
        sender_id: String,
    },
    /// Upload rejected (sent to the uploader only)
    FileError { error: String },
    /// Partner is typing
    PartnerTyping,
    /// Partner stopped typing
    PartnerStopTyping,
    /// Reaction from the partner
    ReceiveReaction { message_index: u64, reaction: String },
    /// Partner disconnected, the room is gone
    PartnerLeft,
    /// Number of live connections
    UserCount { count: usize },
}

impl RelayError {
    /// Message to report back to the sender, if the error is user-visible
    ///
    /// Membership failures stay silent so that a probe cannot learn who is
    /// in which room.
    pub fn notice(&self) -> Option<ServerMessage> {
        match self {
            RelayError::PayloadTooLarge { .. } => Some(ServerMessage::FileError {
                error: "File size exceeds 50MB limit".to_string(),
            }),
            RelayError::NotMember { .. } | RelayError::PartnerUnavailable(_) => None,
        }
    }
}

/// Serde adapter carrying raw bytes as a standard base64 string
mod base64_bytes {
    use base64::engine::general_purpose::STANDARD;
    use base64::Engine;
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(bytes: &[u8], serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&STANDARD.encode(bytes))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Vec<u8>, D::Error> {
        let encoded = String::deserialize(deserializer)?;
        STANDARD
            .decode(encoded.as_bytes())
            .map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_client_message_deserialize() {
        let json = r#"{"type": "send_message", "roomId": "a-b", "message": "hi", "senderId": "a"}"#;
        let msg: ClientMessage = serde_json::from_str(json).unwrap();
        assert_eq!(msg.declared_sender(), Some("a"));
        match msg {
            ClientMessage::SendMessage { room_id, message, .. } => {
                assert_eq!(room_id, "a-b");
                assert_eq!(message, "hi");
            }
            _ => panic!("Wrong variant"),
        }
    }

    #[test]
    fn test_sender_id_is_optional() {
        let json = r#"{"type": "send_message", "roomId": "a-b", "message": "hi"}"#;
        let msg: ClientMessage = serde_json::from_str(json).unwrap();
        assert_eq!(msg.declared_sender(), None);
    }

    #[test]
    fn test_send_file_decodes_base64() {
        let json = r#"{"type":"send_file","roomId":"r","file":"aGVsbG8=","fileName":"a.txt","fileType":"text/plain","fileSize":5}"#;
        let msg: ClientMessage = serde_json::from_str(json).unwrap();
        match msg {
            ClientMessage::SendFile { file, file_size, .. } => {
                assert_eq!(file, b"hello");
                assert_eq!(file_size, 5);
            }
            _ => panic!("Wrong variant"),
        }
    }

    #[test]
    fn test_send_file_rejects_invalid_base64() {
        let json = r#"{"type":"send_file","roomId":"r","file":"***","fileName":"a","fileType":"x","fileSize":1}"#;
        assert!(serde_json::from_str::<ClientMessage>(json).is_err());
    }

    #[test]
    fn test_typing_and_reaction_deserialize() {
        let typing: ClientMessage =
            serde_json::from_str(r#"{"type":"stop_typing","roomId":"r"}"#).unwrap();
        assert!(matches!(typing, ClientMessage::StopTyping { room_id } if room_id == "r"));

        let reaction: ClientMessage = serde_json::from_str(
            r#"{"type":"send_reaction","roomId":"r","messageIndex":3,"reaction":"👍"}"#,
        )
        .unwrap();
        match reaction {
            ClientMessage::SendReaction { message_index, reaction, .. } => {
                assert_eq!(message_index, 3);
                assert_eq!(reaction, "👍");
            }
            _ => panic!("Wrong variant"),
        }
    }

    #[test]
    fn test_server_message_serialize() {
        let msg = ServerMessage::ReceiveMessage {
            message: "hi".to_string(),
            sender_id: "c1".to_string(),
        };
        let json = serde_json::to_value(&msg).unwrap();
        assert_eq!(
            json,
            serde_json::json!({"type": "receive_message", "message": "hi", "senderId": "c1"})
        );

        let json = serde_json::to_value(ServerMessage::PartnerLeft).unwrap();
        assert_eq!(json, serde_json::json!({"type": "partner_left"}));
    }

    #[test]
    fn test_receive_file_encodes_base64() {
        let msg = ServerMessage::ReceiveFile {
            file: b"hello".to_vec(),
            file_name: "a.txt".to_string(),
            file_type: "text/plain".to_string(),
            file_size: 5,
            sender_id: "c1".to_string(),
        };
        let json = serde_json::to_value(&msg).unwrap();
        assert_eq!(json["file"], "aGVsbG8=");
        assert_eq!(json["fileName"], "a.txt");
        assert_eq!(json["fileSize"], 5);
    }

    #[test]
    fn test_only_oversized_files_are_reported() {
        let too_large = RelayError::PayloadTooLarge { size: 2, limit: 1 };
        assert!(matches!(too_large.notice(), Some(ServerMessage::FileError { .. })));

        let stale = RelayError::PartnerUnavailable(crate::types::ClientId::new());
        assert!(stale.notice().is_none());
    }
}
