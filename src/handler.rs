//! WebSocket connection handler
//!
//! Handles individual client connections: WebSocket handshake,
//! message parsing, and bidirectional communication with the ChatBroker.

use futures_util::{SinkExt, StreamExt};
use tokio::net::TcpStream;
use tokio::sync::mpsc;
use tokio_tungstenite::tungstenite::protocol::WebSocketConfig;
use tokio_tungstenite::tungstenite::Message;
use tracing::{debug, error, info, warn};

use crate::error::AppError;
use crate::message::{ClientMessage, ServerMessage};
use crate::relay::{FilePayload, RelayEvent};
use crate::server::BrokerCommand;
use crate::types::{ClientId, RoomId};

/// Largest WebSocket message accepted (50 MiB file, base64-encoded, plus envelope)
pub const MAX_MESSAGE_SIZE: usize = 72 * 1024 * 1024;

fn ws_config() -> WebSocketConfig {
    let mut config = WebSocketConfig::default();
    config.max_message_size = Some(MAX_MESSAGE_SIZE);
    config.max_frame_size = Some(MAX_MESSAGE_SIZE);
    config
}

/// Handle a new TCP connection
///
/// Performs WebSocket handshake, sets up bidirectional communication,
/// and manages the connection lifecycle. Whatever ends the connection,
/// the broker is told to reconcile it.
pub async fn handle_connection(
    stream: TcpStream,
    cmd_tx: mpsc::Sender<BrokerCommand>,
) -> Result<(), AppError> {
    let peer_addr = stream
        .peer_addr()
        .map(|a| a.to_string())
        .unwrap_or_else(|_| "unknown".to_string());

    debug!("New TCP connection from {}", peer_addr);

    // WebSocket handshake
    let ws_stream = tokio_tungstenite::accept_async_with_config(stream, Some(ws_config())).await?;
    let (mut ws_sender, mut ws_receiver) = ws_stream.split();

    // Generate client ID
    let client_id = ClientId::new();
    info!("Client {} connected from {}", client_id, peer_addr);

    // Create channel for server -> client messages
    let (msg_tx, mut msg_rx) = mpsc::unbounded_channel::<ServerMessage>();

    // The client learns its id before anything the broker sends
    msg_tx
        .send(ServerMessage::Connected {
            client_id: client_id.to_string(),
        })
        .map_err(|_| AppError::ChannelSend)?;

    // Register with ChatBroker
    if cmd_tx
        .send(BrokerCommand::Connect {
            client_id,
            sender: msg_tx,
        })
        .await
        .is_err()
    {
        error!("Failed to register client {} - broker closed", client_id);
        return Err(AppError::ChannelSend);
    }

    // Clone cmd_tx for read task
    let cmd_tx_read = cmd_tx.clone();

    // Spawn read task (WebSocket -> BrokerCommand)
    let mut read_task = tokio::spawn(async move {
        while let Some(msg_result) = ws_receiver.next().await {
            match msg_result {
                Ok(Message::Text(text)) => {
                    let value = match serde_json::from_str::<serde_json::Value>(&text) {
                        Ok(value) => value,
                        Err(e) => {
                            warn!("Malformed frame from {}: {}", client_id, e);
                            break;
                        }
                    };
                    let client_msg = match serde_json::from_value::<ClientMessage>(value) {
                        Ok(client_msg) => client_msg,
                        Err(e) => {
                            warn!("Unrecognized event from {}: {}", client_id, e);
                            continue;
                        }
                    };
                    let Some(cmd) = client_message_to_command(client_id, client_msg) else {
                        debug!("Dropped event from {} with foreign senderId", client_id);
                        continue;
                    };
                    if cmd_tx_read.send(cmd).await.is_err() {
                        debug!("Broker closed, ending read task for {}", client_id);
                        break;
                    }
                }
                Ok(Message::Close(_)) => {
                    debug!("Client {} sent close frame", client_id);
                    break;
                }
                Ok(Message::Ping(_)) | Ok(Message::Pong(_)) => {
                    // Pong replies are handled by tungstenite
                }
                Ok(_) => {
                    debug!("Ignoring non-text frame from {}", client_id);
                }
                Err(e) => {
                    error!("WebSocket error for {}: {}", client_id, e);
                    break;
                }
            }
        }
        debug!("Read task ended for {}", client_id);
    });

    // Spawn write task (ServerMessage -> WebSocket)
    let mut write_task = tokio::spawn(async move {
        while let Some(msg) = msg_rx.recv().await {
            match serde_json::to_string(&msg) {
                Ok(json) => {
                    if ws_sender.send(Message::Text(json)).await.is_err() {
                        debug!("WebSocket send failed, ending write task");
                        break;
                    }
                }
                Err(e) => {
                    error!("Failed to serialize message: {}", e);
                }
            }
        }
        debug!("Write task ended for client");

        let _ = ws_sender.close().await;
    });

    // Wait for either task to complete, then stop the other
    tokio::select! {
        _ = &mut read_task => {
            debug!("Read task completed for {}", client_id);
            write_task.abort();
        }
        _ = &mut write_task => {
            debug!("Write task completed for {}", client_id);
            read_task.abort();
        }
    }

    let _ = cmd_tx.send(BrokerCommand::Disconnect { client_id }).await;

    info!("Client {} disconnected", client_id);

    Ok(())
}

/// Convert a ClientMessage to a BrokerCommand
///
/// Returns None when the client claims to be someone else.
fn client_message_to_command(client_id: ClientId, msg: ClientMessage) -> Option<BrokerCommand> {
    if let Some(declared) = msg.declared_sender() {
        if declared != client_id.to_string() {
            return None;
        }
    }

    let (room_id, event) = match msg {
        ClientMessage::SendMessage {
            room_id, message, ..
        } => (room_id, RelayEvent::Message { text: message }),
        ClientMessage::SendFile {
            room_id,
            file,
            file_name,
            file_type,
            file_size,
            ..
        } => (
            room_id,
            RelayEvent::File(FilePayload {
                name: file_name,
                mime_type: file_type,
                size: file_size,
                bytes: file,
            }),
        ),
        ClientMessage::Typing { room_id } => (room_id, RelayEvent::Typing(true)),
        ClientMessage::StopTyping { room_id } => (room_id, RelayEvent::Typing(false)),
        ClientMessage::SendReaction {
            room_id,
            message_index,
            reaction,
        } => (
            room_id,
            RelayEvent::Reaction {
                message_index,
                reaction,
            },
        ),
    };

    Some(BrokerCommand::Relay {
        client_id,
        room_id: RoomId::from_string(room_id),
        event,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::server::ChatBroker;
    use serde_json::{json, Value};
    use tokio::net::TcpListener;
    use tokio_tungstenite::{connect_async, MaybeTlsStream, WebSocketStream};

    type Ws = WebSocketStream<MaybeTlsStream<TcpStream>>;

    async fn start_server() -> String {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let (cmd_tx, cmd_rx) = mpsc::channel(64);
        tokio::spawn(ChatBroker::new(cmd_rx).run());
        tokio::spawn(async move {
            while let Ok((stream, _)) = listener.accept().await {
                tokio::spawn(handle_connection(stream, cmd_tx.clone()));
            }
        });
        format!("ws://{}", addr)
    }

    /// Next JSON event, skipping presence updates
    async fn next_event(ws: &mut Ws) -> Value {
        loop {
            match ws.next().await.expect("stream ended").expect("ws error") {
                Message::Text(text) => {
                    let value: Value = serde_json::from_str(&text).unwrap();
                    if value["type"] != "user_count" {
                        return value;
                    }
                }
                Message::Close(_) => panic!("connection closed"),
                _ => continue,
            }
        }
    }

    async fn join(url: &str) -> (Ws, String) {
        let (mut ws, _) = connect_async(url).await.unwrap();
        let hello = next_event(&mut ws).await;
        assert_eq!(hello["type"], "connected");
        let id = hello["clientId"].as_str().unwrap().to_string();
        (ws, id)
    }

    async fn send_json(ws: &mut Ws, value: Value) {
        ws.send(Message::Text(value.to_string())).await.unwrap();
    }

    #[test]
    fn test_foreign_sender_id_is_rejected() {
        let me = ClientId::new();
        let msg = ClientMessage::SendMessage {
            room_id: "r".into(),
            message: "x".into(),
            sender_id: Some(ClientId::new().to_string()),
        };
        assert!(client_message_to_command(me, msg).is_none());

        let msg = ClientMessage::SendMessage {
            room_id: "r".into(),
            message: "x".into(),
            sender_id: Some(me.to_string()),
        };
        assert!(client_message_to_command(me, msg).is_some());
    }

    #[test]
    fn test_typing_maps_to_bool() {
        let me = ClientId::new();
        let cmd = client_message_to_command(me, ClientMessage::StopTyping { room_id: "r".into() });
        match cmd {
            Some(BrokerCommand::Relay { event, room_id, .. }) => {
                assert_eq!(event, RelayEvent::Typing(false));
                assert_eq!(room_id.as_str(), "r");
            }
            other => panic!("unexpected {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_websocket_pairing_and_relay() {
        let url = start_server().await;
        let (mut c1, id1) = join(&url).await;
        let (mut c2, id2) = join(&url).await;

        let started1 = next_event(&mut c1).await;
        let started2 = next_event(&mut c2).await;
        assert_eq!(started1["type"], "chat_started");
        assert_eq!(started1, started2);
        let room_id = started1["roomId"].as_str().unwrap().to_string();
        assert_eq!(room_id, format!("{}-{}", id1, id2));

        send_json(
            &mut c1,
            json!({"type": "send_message", "roomId": room_id, "message": "hi", "senderId": id1}),
        )
        .await;
        assert_eq!(
            next_event(&mut c2).await,
            json!({"type": "receive_message", "message": "hi", "senderId": id1})
        );

        send_json(&mut c2, json!({"type": "typing", "roomId": room_id})).await;
        assert_eq!(next_event(&mut c1).await, json!({"type": "partner_typing"}));

        send_json(
            &mut c2,
            json!({"type": "send_reaction", "roomId": room_id, "messageIndex": 0, "reaction": "❤️"}),
        )
        .await;
        assert_eq!(
            next_event(&mut c1).await,
            json!({"type": "receive_reaction", "messageIndex": 0, "reaction": "❤️"})
        );
    }

    #[tokio::test]
    async fn test_malformed_frame_disconnects_sender() {
        let url = start_server().await;
        let (mut c1, _) = join(&url).await;
        let (mut c2, _) = join(&url).await;
        next_event(&mut c1).await;
        next_event(&mut c2).await;

        c1.send(Message::Text("{not json".to_string())).await.unwrap();

        assert_eq!(next_event(&mut c2).await, json!({"type": "partner_left"}));
    }

    #[tokio::test]
    async fn test_unknown_event_is_ignored() {
        let url = start_server().await;
        let (mut c1, id1) = join(&url).await;
        let (mut c2, _) = join(&url).await;
        let room_id = next_event(&mut c1).await["roomId"].as_str().unwrap().to_string();
        next_event(&mut c2).await;

        send_json(&mut c1, json!({"type": "dance", "roomId": room_id})).await;
        send_json(&mut c1, json!({"type": "send_message", "roomId": room_id, "message": "still here"})).await;

        assert_eq!(
            next_event(&mut c2).await,
            json!({"type": "receive_message", "message": "still here", "senderId": id1})
        );
    }
}
