//! Scripted transport
//!
//! Replays a queue of terminal replies and records everything sent to it.
//! Clones share the same script, so a test can keep one handle for
//! inspection after boxing the other into a transmission.

use std::collections::VecDeque;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use parking_lot::Mutex;
use tracing::trace;

use crate::{Transport, error::*};

/// One scripted terminal reply
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Scripted {
    /// APDU bytes handed back by `send` or `receive`
    Frame(Bytes),

    /// The terminal stays silent
    ///
    /// Counts as pending input, like a partial frame that never completes.
    Timeout,

    /// The terminal hangs up
    Closed,
}

#[derive(Debug, Default)]
struct Script {
    replies: VecDeque<Scripted>,
    sent: Vec<(Bytes, bool)>,
    connected: bool,
    resets: usize,
}

/// In-memory transport driven by a script
#[derive(Debug, Clone, Default)]
pub struct ScriptedTransport {
    inner: Arc<Mutex<Script>>,
}

impl ScriptedTransport {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue a reply frame
    pub fn then_frame(self, apdu: impl AsRef<[u8]>) -> Self {
        self.push(Scripted::Frame(Bytes::copy_from_slice(apdu.as_ref())));
        self
    }

    /// Queue a silent turn
    pub fn then_timeout(self) -> Self {
        self.push(Scripted::Timeout);
        self
    }

    /// Queue a closed connection
    pub fn then_closed(self) -> Self {
        self.push(Scripted::Closed);
        self
    }

    /// Queue a reply on a shared handle
    pub fn push(&self, reply: Scripted) {
        self.inner.lock().replies.push_back(reply);
    }

    /// Everything sent so far, with its `no_wait` flag
    pub fn sent(&self) -> Vec<(Bytes, bool)> {
        self.inner.lock().sent.clone()
    }

    /// Replies not consumed yet
    pub fn remaining(&self) -> usize {
        self.inner.lock().replies.len()
    }

    /// How often `reset` was called
    pub fn resets(&self) -> usize {
        self.inner.lock().resets
    }

    fn next_reply(script: &mut Script, timeout: Duration) -> Result<Bytes> {
        match script.replies.pop_front() {
            Some(Scripted::Frame(apdu)) => Ok(apdu),
            Some(Scripted::Closed) => Err(Error::ConnectionClosed),
            Some(Scripted::Timeout) | None => Err(Error::ReadTimeout(timeout)),
        }
    }
}

#[async_trait]
impl Transport for ScriptedTransport {
    async fn connect(&mut self) -> Result<()> {
        let mut script = self.inner.lock();
        if script.connected {
            return Err(Error::AlreadyConnected);
        }
        script.connected = true;
        Ok(())
    }

    async fn disconnect(&mut self) -> Result<()> {
        self.inner.lock().connected = false;
        Ok(())
    }

    fn is_connected(&self) -> bool {
        self.inner.lock().connected
    }

    async fn send(&mut self, apdu: &[u8], no_wait: bool) -> Result<Bytes> {
        let mut script = self.inner.lock();
        trace!("Scripted send {:02X?} (no_wait={})", apdu, no_wait);

        script.sent.push((Bytes::copy_from_slice(apdu), no_wait));

        if no_wait {
            return Ok(Bytes::new());
        }

        Self::next_reply(&mut script, Duration::ZERO)
    }

    async fn receive(&mut self, timeout: Duration) -> Result<Bytes> {
        let mut script = self.inner.lock();
        Self::next_reply(&mut script, timeout)
    }

    async fn reset(&mut self) -> Result<()> {
        self.inner.lock().resets += 1;
        Ok(())
    }

    fn has_pending(&self) -> bool {
        matches!(
            self.inner.lock().replies.front(),
            Some(Scripted::Frame(_) | Scripted::Timeout)
        )
    }

    fn remote_addr(&self) -> String {
        "scripted".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[tokio::test]
    async fn test_replies_in_order() {
        let mut transport = ScriptedTransport::new()
            .then_frame([0x80, 0x00, 0x00])
            .then_frame([0x06, 0x0F, 0x00]);
        let handle = transport.clone();

        transport.connect().await.unwrap();

        let first = transport.send(&[0x06, 0x01, 0x00], false).await.unwrap();
        assert_eq!(&first[..], &[0x80, 0x00, 0x00]);
        assert!(handle.has_pending());

        let second = transport.receive(Duration::from_secs(1)).await.unwrap();
        assert_eq!(&second[..], &[0x06, 0x0F, 0x00]);
        assert!(!handle.has_pending());

        assert_eq!(
            handle.sent(),
            vec![(Bytes::from_static(&[0x06, 0x01, 0x00]), false)]
        );
    }

    #[tokio::test]
    async fn test_no_wait_consumes_nothing() {
        let mut transport = ScriptedTransport::new().then_frame([0x80, 0x00, 0x00]);

        let reply = transport.send(&[0x80, 0x00, 0x00], true).await.unwrap();
        assert!(reply.is_empty());
        assert_eq!(transport.remaining(), 1);
    }

    #[tokio::test]
    async fn test_timeout_and_closed() {
        let mut transport = ScriptedTransport::new().then_timeout().then_closed();

        let timeout = Duration::from_secs(20);
        assert!(matches!(
            transport.receive(timeout).await,
            Err(Error::ReadTimeout(t)) if t == timeout
        ));
        assert!(matches!(
            transport.receive(timeout).await,
            Err(Error::ConnectionClosed)
        ));
        // Exhausted scripts stay silent
        assert!(transport.receive(timeout).await.unwrap_err().is_timeout());
    }

    #[tokio::test]
    async fn test_connect_and_reset() {
        let mut transport = ScriptedTransport::new();

        transport.connect().await.unwrap();
        assert!(matches!(transport.connect().await, Err(Error::AlreadyConnected)));
        assert!(transport.is_connected());

        transport.reset().await.unwrap();
        assert_eq!(transport.resets(), 1);

        transport.disconnect().await.unwrap();
        assert!(!transport.is_connected());
    }
}
