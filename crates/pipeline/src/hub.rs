//! Local hub - fan-out to subscribers connected to this node
//!
//! Each (org, channel) has a list of bounded `mpsc` senders carrying JSON
//! frame documents. Delivery never waits: a subscriber whose buffer is full
//! misses the message, a subscriber whose receiver is gone is removed.

use bytes::Bytes;
use dashmap::DashMap;
use live_config::{OrgId, PipelineConfig};
use tokio::sync::mpsc;
use tracing::debug;

use crate::{PipelineError, Result};

#[cfg(test)]
#[path = "hub_test.rs"]
mod tests;

/// Per-channel subscriber lists
#[derive(Debug)]
pub struct LocalHub {
    channels: DashMap<(OrgId, String), Vec<mpsc::Sender<Bytes>>>,
    buffer: usize,
    max_per_channel: usize,
}

impl LocalHub {
    /// Create a hub; `buffer` messages are queued per subscriber
    pub fn new(buffer: usize, max_per_channel: usize) -> Self {
        Self {
            channels: DashMap::new(),
            buffer: buffer.max(1),
            max_per_channel,
        }
    }

    pub fn from_config(config: &PipelineConfig) -> Self {
        Self::new(config.subscriber_buffer, config.max_subscribers_per_channel)
    }

    /// Register a subscriber for a channel
    ///
    /// # Errors
    /// `TooManySubscribers` once the channel has `max_per_channel` live subscribers.
    pub fn subscribe(&self, org_id: OrgId, channel: &str) -> Result<mpsc::Receiver<Bytes>> {
        let mut senders = self
            .channels
            .entry((org_id, channel.to_string()))
            .or_default();
        senders.retain(|s| !s.is_closed());

        if senders.len() >= self.max_per_channel {
            return Err(PipelineError::TooManySubscribers {
                channel: channel.to_string(),
                limit: self.max_per_channel,
            });
        }

        let (tx, rx) = mpsc::channel(self.buffer);
        senders.push(tx);
        Ok(rx)
    }

    /// Send a message to every subscriber of a channel
    ///
    /// Returns the number of subscribers that received it.
    pub fn publish(&self, org_id: OrgId, channel: &str, data: Bytes) -> usize {
        let key = (org_id, channel.to_string());
        let Some(mut senders) = self.channels.get_mut(&key) else {
            return 0;
        };

        let mut delivered = 0;
        senders.retain(|sender| match sender.try_send(data.clone()) {
            Ok(()) => {
                delivered += 1;
                true
            }
            Err(mpsc::error::TrySendError::Full(_)) => {
                debug!(org_id, channel, "subscriber buffer full, message dropped");
                true
            }
            Err(mpsc::error::TrySendError::Closed(_)) => false,
        });

        if senders.is_empty() {
            drop(senders);
            self.channels.remove_if(&key, |_, senders| senders.is_empty());
        }
        delivered
    }

    /// Live subscribers of a channel
    pub fn subscriber_count(&self, org_id: OrgId, channel: &str) -> usize {
        self.channels
            .get(&(org_id, channel.to_string()))
            .map_or(0, |senders| senders.iter().filter(|s| !s.is_closed()).count())
    }

    /// Remove closed subscribers everywhere, returning how many were removed
    pub fn cleanup_disconnected(&self) -> usize {
        let mut removed = 0;
        self.channels.retain(|_, senders| {
            let before = senders.len();
            senders.retain(|s| !s.is_closed());
            removed += before - senders.len();
            !senders.is_empty()
        });
        removed
    }
}

impl Default for LocalHub {
    fn default() -> Self {
        Self::from_config(&PipelineConfig::default())
    }
}
