/**
 * Per-conversation Event Broadcasting
 *
 * Every conversation gets its own `tokio::sync::broadcast` channel, created
 * lazily on first subscription. Publishing to a conversation nobody watches
 * is a no-op. Channels without receivers are pruned periodically by a
 * background task started in `server::init`.
 */

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};

use tokio::sync::broadcast;

use crate::shared::messaging::ConversationId;
use crate::shared::RealtimeEvent;

/// Capacity of each conversation channel
const CHANNEL_CAPACITY: usize = 100;

/// Broadcast channels keyed by conversation
#[derive(Clone, Default)]
pub struct ConversationBroadcastState {
    channels: Arc<Mutex<HashMap<ConversationId, broadcast::Sender<RealtimeEvent>>>>,
}

impl ConversationBroadcastState {
    pub fn new() -> Self {
        Self::default()
    }

    fn channels(&self) -> MutexGuard<'_, HashMap<ConversationId, broadcast::Sender<RealtimeEvent>>> {
        // The map stays consistent even if a holder panicked.
        self.channels.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Subscribe to a conversation's events
    pub fn subscribe(&self, conversation_id: ConversationId) -> broadcast::Receiver<RealtimeEvent> {
        self.channels()
            .entry(conversation_id)
            .or_insert_with(|| broadcast::channel(CHANNEL_CAPACITY).0)
            .subscribe()
    }

    /// Publish an event on its conversation channel
    ///
    /// Returns the number of subscribers that received it.
    pub fn publish(&self, event: RealtimeEvent) -> usize {
        let sender = self.channels().get(&event.conversation_id).cloned();
        let Some(sender) = sender else {
            return 0;
        };
        let event_type = event.event_type;
        match sender.send(event) {
            Ok(count) => {
                tracing::debug!(event = event_type.as_str(), subscribers = count, "[Realtime] event published");
                count
            }
            Err(_) => 0,
        }
    }

    /// Drop channels that no longer have receivers
    pub fn cleanup_inactive_channels(&self) -> usize {
        let mut channels = self.channels();
        let before = channels.len();
        channels.retain(|_, sender| sender.receiver_count() > 0);
        before - channels.len()
    }

    /// Subscriber count for a conversation
    pub fn subscriber_count(&self, conversation_id: ConversationId) -> usize {
        self.channels()
            .get(&conversation_id)
            .map(|sender| sender.receiver_count())
            .unwrap_or(0)
    }

    /// Number of live channels
    pub fn channel_count(&self) -> usize {
        self.channels().len()
    }
}
