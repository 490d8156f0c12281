/**
 * Upload Tickets
 *
 * A ticket is a one-time capability to upload a single blob. It is issued to
 * an authenticated user and consumed by `POST /api/storage/upload/{ticket}`,
 * which therefore needs no bearer token of its own.
 */

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::{Duration, Instant};

use uuid::Uuid;

use crate::shared::messaging::UserId;

#[derive(Debug, Clone, Copy)]
struct Ticket {
    owner: UserId,
    expires_at: Instant,
}

/// Outstanding upload tickets
#[derive(Clone)]
pub struct UploadTickets {
    tickets: Arc<Mutex<HashMap<Uuid, Ticket>>>,
    ttl: Duration,
}

impl UploadTickets {
    pub fn new(ttl: Duration) -> Self {
        Self {
            tickets: Arc::new(Mutex::new(HashMap::new())),
            ttl,
        }
    }

    fn tickets(&self) -> MutexGuard<'_, HashMap<Uuid, Ticket>> {
        self.tickets.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    /// Issue a ticket for `owner`
    pub fn issue(&self, owner: UserId) -> Uuid {
        let now = Instant::now();
        let id = Uuid::new_v4();
        let mut tickets = self.tickets();
        tickets.retain(|_, ticket| ticket.expires_at > now);
        tickets.insert(
            id,
            Ticket {
                owner,
                expires_at: now + self.ttl,
            },
        );
        id
    }

    /// Consume a ticket, returning its owner
    ///
    /// Unknown, already used and expired tickets all yield `None`.
    pub fn consume(&self, ticket: Uuid) -> Option<UserId> {
        let ticket = self.tickets().remove(&ticket)?;
        (ticket.expires_at > Instant::now()).then_some(ticket.owner)
    }

    /// Number of tickets not yet consumed (including expired ones)
    pub fn outstanding(&self) -> usize {
        self.tickets().len()
    }
}
