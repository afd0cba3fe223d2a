//! Live log of terminal replies
//!
//! Every packet the engine receives lands here as well. The log is
//! thread-safe and can be cloned cheaply (Arc internally), so a UI task can
//! watch a transaction while the engine drives it.

use std::sync::Arc;

use parking_lot::RwLock;

use zvt_core::Packet;

/// Shared log of received packets
#[derive(Debug, Clone, Default)]
pub struct ResponseLog {
    inner: Arc<RwLock<Vec<Packet>>>,
}

impl ResponseLog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a received packet
    pub fn push(&self, packet: Packet) {
        self.inner.write().push(packet);
    }

    pub fn len(&self) -> usize {
        self.inner.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.read().is_empty()
    }

    /// Most recent packet
    pub fn last(&self) -> Option<Packet> {
        self.inner.read().last().cloned()
    }

    /// Copy of the whole log
    pub fn snapshot(&self) -> Vec<Packet> {
        self.inner.read().clone()
    }

    pub fn clear(&self) {
        self.inner.write().clear();
    }
}
