//! Waiting pool
//!
//! FIFO queue of connections awaiting a partner. The two longest-waiting
//! connections are always the next to be paired.

use std::collections::VecDeque;

use crate::error::PoolError;
use crate::types::ClientId;

/// Ordered queue of waiting connections, without duplicates
#[derive(Debug, Default)]
pub struct WaitingPool {
    queue: VecDeque<ClientId>,
}

impl WaitingPool {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a connection to the tail
    pub fn enqueue(&mut self, client_id: ClientId) -> Result<(), PoolError> {
        if self.contains(client_id) {
            return Err(PoolError::DuplicateEntry(client_id));
        }
        self.queue.push_back(client_id);
        Ok(())
    }

    /// Remove and return the longest-waiting connection
    pub fn dequeue_front(&mut self) -> Result<ClientId, PoolError> {
        self.queue.pop_front().ok_or(PoolError::Empty)
    }

    /// Remove a connection wherever it is in the queue
    ///
    /// Returns whether it was present; absence is not an error.
    pub fn remove(&mut self, client_id: ClientId) -> bool {
        match self.queue.iter().position(|id| *id == client_id) {
            Some(index) => {
                self.queue.remove(index);
                true
            }
            None => false,
        }
    }

    pub fn contains(&self, client_id: ClientId) -> bool {
        self.queue.contains(&client_id)
    }

    pub fn len(&self) -> usize {
        self.queue.len()
    }

    pub fn is_empty(&self) -> bool {
        self.queue.is_empty()
    }

    /// Waiting connections, oldest first
    pub fn iter(&self) -> impl Iterator<Item = &ClientId> {
        self.queue.iter()
    }
}
