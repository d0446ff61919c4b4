//! Anonymous 1:1 WebSocket Chat Server Library
//!
//! Pairs strangers two at a time and relays their conversation, built with
//! tokio-tungstenite using the Actor pattern for state management.
//!
//! # Features
//! - FIFO waiting pool: the two longest-waiting connections are paired next
//! - Ephemeral rooms with ids derived from their two members
//! - Relay of text messages, files (up to 50 MiB), typing indicators and reactions
//! - Live connection count pushed to every client
//! - Partner notification and room teardown on disconnect
//! - Stateless text-to-speech HTTP proxy
//!
//! # Architecture
//! Uses the Actor pattern with `mpsc` channels:
//! - `ChatBroker` is the central actor owning the pool and the registry
//! - Each connection has a `handler` task communicating with the broker
//! - No locks needed - all state access goes through message passing
//!
//! # Example
//! ```ignore
//! use tokio::net::TcpListener;
//! use tokio::sync::mpsc;
//! use anon_chat_server::{ChatBroker, handle_connection};
//!
//! #[tokio::main]
//! async fn main() {
//!     let listener = TcpListener::bind("127.0.0.1:5001").await.unwrap();
//!     let (cmd_tx, cmd_rx) = mpsc::channel(256);
//!
//!     tokio::spawn(ChatBroker::new(cmd_rx).run());
//!
//!     while let Ok((stream, _)) = listener.accept().await {
//!         let cmd_tx = cmd_tx.clone();
//!         tokio::spawn(handle_connection(stream, cmd_tx));
//!     }
//! }
//! ```

pub mod client;
pub mod config;
pub mod error;
pub mod handler;
pub mod message;
pub mod pairing;
pub mod pool;
pub mod presence;
pub mod reconciler;
pub mod registry;
pub mod relay;
pub mod room;
pub mod server;
pub mod speech;
pub mod types;

// Re-export main types for convenience
pub use client::{Client, ConnectionState};
pub use config::{Config, ConfigError, SpeechConfig};
pub use error::{AppError, PoolError, RegistryError, RelayError, SendError};
pub use handler::handle_connection;
pub use message::{ClientMessage, ServerMessage};
pub use pool::WaitingPool;
pub use registry::ConnectionRegistry;
pub use relay::{FilePayload, RelayEvent, MAX_FILE_SIZE};
pub use room::Room;
pub use server::{query_stats, BrokerCommand, BrokerStats, ChatBroker};
pub use speech::{SpeechError, SpeechState};
pub use types::{ClientId, RoomId};
