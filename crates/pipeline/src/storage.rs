//! Frame storage - latest frame per key
//!
//! Stateful outputters (threshold, change log) keep one frame per
//! (org, channel, scope). A read-modify-write through `update` holds the
//! key's lock for its whole duration, so two concurrent publishes to the
//! same channel never see the same previous frame. Different keys never
//! contend beyond the map's shard lock, which is only held to find the slot.

use std::sync::Arc;

use dashmap::DashMap;
use live_config::OrgId;
use live_frame::Frame;
use parking_lot::Mutex;

use crate::Result;

#[cfg(test)]
#[path = "storage_test.rs"]
mod tests;

/// Storage key
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct FrameKey {
    pub org_id: OrgId,
    pub channel: String,
    /// Which component owns the entry, e.g. `threshold#0/value/loaded`
    pub scope: String,
}

impl FrameKey {
    pub fn new(org_id: OrgId, channel: impl Into<String>, scope: impl Into<String>) -> Self {
        Self {
            org_id,
            channel: channel.into(),
            scope: scope.into(),
        }
    }
}

type Slot = Arc<Mutex<Option<Frame>>>;

/// In-memory latest-frame store with per-key locking
#[derive(Debug, Default)]
pub struct FrameStorage {
    slots: DashMap<FrameKey, Slot>,
}

impl FrameStorage {
    pub fn new() -> Self {
        Self::default()
    }

    fn slot(&self, key: &FrameKey) -> Slot {
        if let Some(slot) = self.slots.get(key) {
            return Arc::clone(slot.value());
        }
        Arc::clone(self.slots.entry(key.clone()).or_default().value())
    }

    /// Latest frame stored under a key
    pub fn get(&self, key: &FrameKey) -> Option<Frame> {
        let slot = self.slots.get(key).map(|s| Arc::clone(s.value()))?;
        let frame = slot.lock().clone();
        frame
    }

    /// Replace the frame under a key, returning the previous one
    pub fn set(&self, key: &FrameKey, frame: Frame) -> Option<Frame> {
        let slot = self.slot(key);
        let mut guard = slot.lock();
        guard.replace(frame)
    }

    /// Atomic read-modify-write
    ///
    /// `f` receives the previous frame (if any) and returns the frame to
    /// store plus a result. When `f` fails nothing is stored.
    pub fn update<T, F>(&self, key: &FrameKey, f: F) -> Result<T>
    where
        F: FnOnce(Option<&Frame>) -> Result<(Frame, T)>,
    {
        let slot = self.slot(key);
        let mut guard = slot.lock();
        let (next, out) = f(guard.as_ref())?;
        *guard = Some(next);
        Ok(out)
    }

    /// Drop the entry for a key
    pub fn remove(&self, key: &FrameKey) -> Option<Frame> {
        let (_, slot) = self.slots.remove(key)?;
        let frame = slot.lock().take();
        frame
    }

    /// Number of keys with a slot
    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }
}
