//! Managed streams - latest frame per channel
//!
//! Every frame pushed to a managed stream replaces the previous one for new
//! subscribers and is broadcast to the subscribers already connected.

use std::sync::Arc;

use bytes::Bytes;
use dashmap::DashMap;
use live_config::OrgId;
use live_frame::Frame;

use crate::Result;
use crate::hub::LocalHub;

/// Latest frames keyed by (org, channel)
#[derive(Debug)]
pub struct ManagedStreams {
    latest: DashMap<(OrgId, String), Frame>,
    hub: Arc<LocalHub>,
}

impl ManagedStreams {
    pub fn new(hub: Arc<LocalHub>) -> Self {
        Self {
            latest: DashMap::new(),
            hub,
        }
    }

    /// Store a frame as the channel's latest and broadcast it
    ///
    /// Returns the number of local subscribers reached.
    pub fn push(&self, org_id: OrgId, channel: &str, frame: &Frame) -> Result<usize> {
        let data = Bytes::from(frame.to_json_bytes()?);
        self.latest
            .insert((org_id, channel.to_string()), frame.clone());
        Ok(self.hub.publish(org_id, channel, data))
    }

    /// Latest frame of a channel
    pub fn latest(&self, org_id: OrgId, channel: &str) -> Option<Frame> {
        self.latest
            .get(&(org_id, channel.to_string()))
            .map(|f| f.value().clone())
    }

    /// Channels of an organization that have a frame, sorted
    pub fn channels(&self, org_id: OrgId) -> Vec<String> {
        let mut channels: Vec<String> = self
            .latest
            .iter()
            .filter(|entry| entry.key().0 == org_id)
            .map(|entry| entry.key().1.clone())
            .collect();
        channels.sort();
        channels
    }
}

#[cfg(test)]
mod tests {
    use live_frame::Field;

    use super::*;

    fn frame(value: f64) -> Frame {
        Frame::from_field("cpu", Field::float64("value", vec![value]))
    }

    #[tokio::test]
    async fn test_push_keeps_latest_and_broadcasts() {
        let hub = Arc::new(LocalHub::new(8, 8));
        let streams = ManagedStreams::new(Arc::clone(&hub));
        let mut rx = hub.subscribe(1, "stream/app/cpu").unwrap();

        assert_eq!(streams.push(1, "stream/app/cpu", &frame(1.0)).unwrap(), 1);
        assert_eq!(streams.push(1, "stream/app/cpu", &frame(2.0)).unwrap(), 1);

        assert_eq!(streams.latest(1, "stream/app/cpu"), Some(frame(2.0)));
        assert!(streams.latest(2, "stream/app/cpu").is_none());

        let first = Frame::from_json_slice(&rx.recv().await.unwrap()).unwrap();
        let second = Frame::from_json_slice(&rx.recv().await.unwrap()).unwrap();
        assert_eq!(first, frame(1.0));
        assert_eq!(second, frame(2.0));
    }

    #[test]
    fn test_channels_per_org() {
        let streams = ManagedStreams::new(Arc::new(LocalHub::default()));
        streams.push(1, "stream/b", &frame(1.0)).unwrap();
        streams.push(1, "stream/a", &frame(1.0)).unwrap();
        streams.push(2, "stream/c", &frame(1.0)).unwrap();

        assert_eq!(streams.channels(1), vec!["stream/a", "stream/b"]);
        assert_eq!(streams.channels(2), vec!["stream/c"]);
    }
}
