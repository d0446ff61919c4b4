//! ChatBroker Actor implementation
//!
//! The central actor that owns all shared state: the connection registry
//! (clients, rooms, memberships) and the waiting pool. Every mutation runs
//! on the actor's task, one command at a time, so pairing and disconnect
//! cleanup can never interleave.

use tokio::sync::{mpsc, oneshot};
use tracing::{debug, info, warn};

use crate::client::Client;
use crate::message::ServerMessage;
use crate::pairing::pair_waiting;
use crate::pool::WaitingPool;
use crate::presence::broadcast_count;
use crate::reconciler::reconcile_disconnect;
use crate::registry::ConnectionRegistry;
use crate::relay::{self, RelayEvent};
use crate::types::{ClientId, RoomId};

/// Commands sent from handlers to the ChatBroker actor
#[derive(Debug)]
pub enum BrokerCommand {
    /// New client connected
    Connect {
        client_id: ClientId,
        sender: mpsc::UnboundedSender<ServerMessage>,
    },
    /// Client disconnected
    Disconnect { client_id: ClientId },
    /// Relay an event to the client's partner
    Relay {
        client_id: ClientId,
        room_id: RoomId,
        event: RelayEvent,
    },
    /// Report current counters
    Stats { reply: oneshot::Sender<BrokerStats> },
}

/// Point-in-time counters of the broker state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BrokerStats {
    pub connections: usize,
    pub waiting: usize,
    pub rooms: usize,
}

/// The pairing and relay actor
pub struct ChatBroker {
    registry: ConnectionRegistry,
    pool: WaitingPool,
    /// Command receiver channel
    receiver: mpsc::Receiver<BrokerCommand>,
}

impl ChatBroker {
    /// Create a new ChatBroker with the given command receiver
    pub fn new(receiver: mpsc::Receiver<BrokerCommand>) -> Self {
        Self {
            registry: ConnectionRegistry::new(),
            pool: WaitingPool::new(),
            receiver,
        }
    }

    /// Run the ChatBroker event loop
    ///
    /// Continuously receives and processes commands until all senders are dropped.
    pub async fn run(mut self) {
        info!("ChatBroker started");

        while let Some(cmd) = self.receiver.recv().await {
            self.handle_command(cmd);
        }

        info!("ChatBroker shutting down");
    }

    /// Process a single command
    fn handle_command(&mut self, cmd: BrokerCommand) {
        match cmd {
            BrokerCommand::Connect { client_id, sender } => {
                self.handle_connect(client_id, sender);
            }
            BrokerCommand::Disconnect { client_id } => {
                self.handle_disconnect(client_id);
            }
            BrokerCommand::Relay {
                client_id,
                room_id,
                event,
            } => {
                self.handle_relay(client_id, room_id, event);
            }
            BrokerCommand::Stats { reply } => {
                let _ = reply.send(self.stats());
            }
        }
    }

    /// Handle new client connection: queue, announce presence, pair
    fn handle_connect(&mut self, client_id: ClientId, sender: mpsc::UnboundedSender<ServerMessage>) {
        if self.registry.get(client_id).is_some() {
            warn!("Client {} connected twice, ignoring", client_id);
            return;
        }

        info!("Client {} connected", client_id);
        self.registry.register(Client::new(client_id, sender));

        if let Err(e) = self.pool.enqueue(client_id) {
            warn!("Could not queue {}: {}", client_id, e);
        }
        debug!("Waiting pool size: {}", self.pool.len());

        broadcast_count(&self.registry);
        pair_waiting(&mut self.pool, &mut self.registry);
    }

    /// Handle client disconnection
    fn handle_disconnect(&mut self, client_id: ClientId) {
        let outcome = reconcile_disconnect(&mut self.registry, &mut self.pool, client_id);
        if !outcome.was_registered {
            debug!("Disconnect for unknown client {}", client_id);
            return;
        }

        info!("Client {} disconnected", client_id);
        broadcast_count(&self.registry);
    }

    /// Handle an event addressed to the client's partner
    fn handle_relay(&self, client_id: ClientId, room_id: RoomId, event: RelayEvent) {
        relay::dispatch(&self.registry, &room_id, client_id, event);
    }

    fn stats(&self) -> BrokerStats {
        BrokerStats {
            connections: self.registry.len(),
            waiting: self.pool.len(),
            rooms: self.registry.room_count(),
        }
    }
}

/// Ask a running broker for its counters
///
/// Returns None if the broker has shut down.
pub async fn query_stats(cmd_tx: &mpsc::Sender<BrokerCommand>) -> Option<BrokerStats> {
    let (reply, rx) = oneshot::channel();
    cmd_tx.send(BrokerCommand::Stats { reply }).await.ok()?;
    rx.await.ok()
}
