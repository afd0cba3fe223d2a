//! Serial link layer over any byte stream
//!
//! Implements the transport side of the serial protocol: every APDU is
//! framed with [`zvt_core::frame`], the receiver answers each frame with a
//! single `ACK` (checksum good) or `NAK` (checksum bad), and a refused frame
//! is repeated up to `max_retries` times.
//!
//! Opening the device is up to the caller; hand over any stream (serial
//! port, socket, in-memory pipe) that is already open.

use std::time::Duration;

use async_trait::async_trait;
use bytes::{Buf, Bytes, BytesMut};
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};
use tokio::time::{Instant, timeout_at};
use tracing::{debug, trace, warn};

use zvt_core::constants::{ACK, DLE, MAX_RETRIES, NAK, TIMEOUT_T3, TIMEOUT_T4_DEFAULT};
use zvt_core::frame::{self, Frame, Incoming};

use crate::{Transport, error::*};

/// Framed transport for the serial ZVT link
pub struct FramedTransport<S> {
    name: String,
    stream: S,
    buf: BytesMut,
    connected: bool,
    ack_timeout: Duration,
    read_timeout: Duration,
    max_retries: usize,
}

impl<S> FramedTransport<S>
where
    S: AsyncRead + AsyncWrite + Unpin + Send + Sync,
{
    /// Create new framed transport on an open stream
    pub fn new(stream: S, name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            stream,
            buf: BytesMut::with_capacity(1024),
            connected: false,
            ack_timeout: TIMEOUT_T3,
            read_timeout: TIMEOUT_T4_DEFAULT,
            max_retries: MAX_RETRIES,
        }
    }

    /// Set how long to wait for `ACK`/`NAK` after sending a frame
    pub fn with_ack_timeout(mut self, timeout: Duration) -> Self {
        self.ack_timeout = timeout;
        self
    }

    /// Set how long `send` waits for the immediate reply
    pub fn with_read_timeout(mut self, timeout: Duration) -> Self {
        self.read_timeout = timeout;
        self
    }

    /// Set how often a frame is offered before giving up
    pub fn with_max_retries(mut self, retries: usize) -> Self {
        self.max_retries = retries.max(1);
        self
    }

    fn ensure_connected(&self) -> Result<()> {
        if !self.connected {
            return Err(Error::NotConnected);
        }
        Ok(())
    }

    /// Read more input into the buffer before `deadline`
    async fn fill(&mut self, deadline: Instant, on_timeout: Error) -> Result<()> {
        let n = match timeout_at(deadline, self.stream.read_buf(&mut self.buf)).await {
            Ok(result) => result?,
            Err(_) => return Err(on_timeout),
        };

        if n == 0 {
            return Err(Error::ConnectionClosed);
        }

        let start = self.buf.len() - n;
        trace!("Received {} bytes: {:02X?}", n, &self.buf[start..start + n.min(32)]);

        Ok(())
    }

    async fn write_raw(&mut self, data: &[u8]) -> Result<()> {
        trace!("Sending {} bytes: {:02X?}", data.len(), &data[..data.len().min(32)]);

        self.stream.write_all(data).await?;
        self.stream.flush().await?;

        Ok(())
    }

    /// Wait for the peer's verdict on the frame just written
    ///
    /// Returns `true` on `ACK`, `false` on `NAK`.
    async fn await_ack(&mut self) -> Result<bool> {
        if self.buf.is_empty() {
            let deadline = Instant::now() + self.ack_timeout;
            self.fill(deadline, Error::AckTimeout(self.ack_timeout)).await?;
        }

        let byte = self.buf[0];
        match frame::classify(&[byte]) {
            Ok(Incoming::Ack) => {
                self.buf.advance(1);
                Ok(true)
            }
            Ok(Incoming::Nak) => {
                self.buf.advance(1);
                Ok(false)
            }
            _ => Err(Error::UnexpectedControl(byte)),
        }
    }

    /// Bytes to drop so the buffer starts at the next `DLE STX`
    ///
    /// A trailing `DLE` is kept since it may start the next header.
    fn resync_offset(&self) -> usize {
        let tail = match self.buf.last() {
            Some(&DLE) if self.buf.len() > 1 => self.buf.len() - 1,
            _ => self.buf.len(),
        };

        self.buf
            .windows(frame::HEADER.len())
            .skip(1)
            .position(|window| window == frame::HEADER)
            .map_or(tail, |pos| pos + 1)
    }

    /// Read one complete frame, keeping whatever follows it buffered
    async fn read_frame(&mut self, timeout: Duration) -> Result<Frame> {
        let deadline = Instant::now() + timeout;

        loop {
            // A lone DLE may still turn into a header
            let decodable = !self.buf.is_empty() && (self.buf.len() >= 2 || self.buf[0] != DLE);

            if decodable {
                match frame::decode_prefix(&self.buf) {
                    Ok((frame, consumed)) => {
                        self.buf.advance(consumed);
                        return Ok(frame);
                    }
                    Err(e) if e.is_truncated() => {}
                    Err(e) => {
                        let skip = self.resync_offset();
                        warn!("Discarding {} buffered bytes: {}", skip, e);
                        self.buf.advance(skip);

                        // Noise ahead of a header is skipped, a broken frame is fatal
                        if !matches!(e, zvt_core::Error::NoHeader | zvt_core::Error::BadHeader { .. }) {
                            return Err(e.into());
                        }
                    }
                }
            }

            self.fill(deadline, Error::ReadTimeout(timeout)).await?;
        }
    }
}

#[async_trait]
impl<S> Transport for FramedTransport<S>
where
    S: AsyncRead + AsyncWrite + Unpin + Send + Sync,
{
    async fn connect(&mut self) -> Result<()> {
        if self.connected {
            return Err(Error::AlreadyConnected);
        }

        debug!("Link to {} up", self.name);

        self.buf.clear();
        self.connected = true;
        Ok(())
    }

    async fn disconnect(&mut self) -> Result<()> {
        if self.connected {
            debug!("Disconnecting from {}...", self.name);

            // Graceful shutdown
            let _ = self.stream.shutdown().await;
        }

        self.connected = false;
        self.buf.clear();
        Ok(())
    }

    fn is_connected(&self) -> bool {
        self.connected
    }

    async fn send(&mut self, apdu: &[u8], no_wait: bool) -> Result<Bytes> {
        self.ensure_connected()?;

        let raw = frame::encode(apdu);
        let mut attempts = 0;

        loop {
            attempts += 1;
            self.write_raw(&raw).await?;

            if self.await_ack().await? {
                break;
            }
            if attempts >= self.max_retries {
                return Err(Error::Nak { attempts });
            }
            warn!(attempt = attempts, "Terminal answered NAK, repeating frame");
        }

        if no_wait {
            return Ok(Bytes::new());
        }

        self.receive(self.read_timeout).await
    }

    async fn receive(&mut self, timeout: Duration) -> Result<Bytes> {
        self.ensure_connected()?;

        let mut rejected = 0;

        loop {
            let frame = self.read_frame(timeout).await?;

            match frame.verify() {
                Ok(()) => {
                    self.write_raw(&[ACK]).await?;
                    return Ok(frame.body);
                }
                Err(e) => {
                    rejected += 1;
                    warn!(attempt = rejected, "Rejecting frame: {}", e);
                    self.write_raw(&[NAK]).await?;

                    if rejected >= self.max_retries {
                        return Err(e.into());
                    }
                }
            }
        }
    }

    async fn reset(&mut self) -> Result<()> {
        if !self.buf.is_empty() {
            debug!("Dropping {} buffered bytes on reset", self.buf.len());
        }
        self.buf.clear();
        Ok(())
    }

    fn has_pending(&self) -> bool {
        !self.buf.is_empty()
    }

    fn remote_addr(&self) -> String {
        self.name.clone()
    }
}

impl<S> Drop for FramedTransport<S> {
    fn drop(&mut self) {
        if self.connected {
            warn!("Framed transport to {} dropped while still connected", self.name);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use tokio::io::{DuplexStream, duplex};

    async fn connected() -> (FramedTransport<DuplexStream>, DuplexStream) {
        let (link, terminal) = duplex(4096);
        let mut transport = FramedTransport::new(link, "duplex")
            .with_ack_timeout(Duration::from_millis(100))
            .with_read_timeout(Duration::from_millis(500));
        transport.connect().await.unwrap();
        (transport, terminal)
    }

    async fn read_exactly(terminal: &mut DuplexStream, len: usize) -> Vec<u8> {
        let mut got = vec![0u8; len];
        terminal.read_exact(&mut got).await.unwrap();
        got
    }

    #[tokio::test]
    async fn test_send_returns_immediate_reply() {
        let (mut transport, mut terminal) = connected().await;
        let request = [0x06, 0x00, 0x03, 0x12, 0x34, 0x56];

        terminal.write_all(&[ACK]).await.unwrap();
        terminal.write_all(&frame::encode(&[0x80, 0x00, 0x00])).await.unwrap();

        let reply = transport.send(&request, false).await.unwrap();
        assert_eq!(&reply[..], &[0x80, 0x00, 0x00]);

        // Request frame, then our ACK for the reply
        let mut expected = frame::encode(&request).to_vec();
        expected.push(ACK);
        assert_eq!(read_exactly(&mut terminal, expected.len()).await, expected);

        transport.disconnect().await.unwrap();
    }

    #[tokio::test]
    async fn test_send_no_wait_skips_reply() {
        let (mut transport, mut terminal) = connected().await;

        terminal.write_all(&[ACK]).await.unwrap();

        let reply = transport.send(&[0x80, 0x00, 0x00], true).await.unwrap();
        assert!(reply.is_empty());
        assert!(!transport.has_pending());

        transport.disconnect().await.unwrap();
    }

    #[tokio::test]
    async fn test_send_repeats_after_nak() {
        let (mut transport, mut terminal) = connected().await;
        let request = [0x05, 0x01, 0x00];

        terminal.write_all(&[NAK, ACK]).await.unwrap();

        transport.send(&request, true).await.unwrap();

        let framed = frame::encode(&request).to_vec();
        let got = read_exactly(&mut terminal, framed.len() * 2).await;
        assert_eq!(&got[..framed.len()], &framed[..]);
        assert_eq!(&got[framed.len()..], &framed[..]);

        transport.disconnect().await.unwrap();
    }

    #[tokio::test]
    async fn test_send_gives_up_after_max_naks() {
        let (mut transport, mut terminal) = connected().await;

        terminal.write_all(&[NAK, NAK, NAK]).await.unwrap();

        let result = transport.send(&[0x05, 0x01, 0x00], true).await;
        assert!(matches!(result, Err(Error::Nak { attempts: 3 })));

        transport.disconnect().await.unwrap();
    }

    #[tokio::test]
    async fn test_send_rejects_unexpected_control() {
        let (mut transport, mut terminal) = connected().await;

        terminal.write_all(&[0x42]).await.unwrap();

        let result = transport.send(&[0x05, 0x01, 0x00], true).await;
        assert!(matches!(result, Err(Error::UnexpectedControl(0x42))));

        transport.disconnect().await.unwrap();
    }

    #[tokio::test(start_paused = true)]
    async fn test_send_ack_timeout() {
        let (mut transport, _terminal) = connected().await;

        let result = transport.send(&[0x05, 0x01, 0x00], true).await;
        assert!(matches!(result, Err(Error::AckTimeout(_))));
        assert!(result.unwrap_err().is_timeout());

        transport.disconnect().await.unwrap();
    }

    #[tokio::test]
    async fn test_receive_naks_corrupted_frame() {
        let (mut transport, mut terminal) = connected().await;
        let body = [0x04, 0xFF, 0x01, 0x0E];

        let mut corrupted = frame::encode(&body).to_vec();
        let last = corrupted.len() - 1;
        corrupted[last] ^= 0xFF;

        terminal.write_all(&corrupted).await.unwrap();
        terminal.write_all(&frame::encode(&body)).await.unwrap();

        let received = transport.receive(Duration::from_millis(500)).await.unwrap();
        assert_eq!(&received[..], &body[..]);
        assert_eq!(read_exactly(&mut terminal, 2).await, vec![NAK, ACK]);

        transport.disconnect().await.unwrap();
    }

    #[tokio::test]
    async fn test_receive_stray_dle_is_protocol_violation() {
        let (mut transport, mut terminal) = connected().await;

        terminal.write_all(&[DLE, 0x02, 0x80, DLE, 0x05, DLE, 0x03, 0x00, 0x00]).await.unwrap();

        match transport.receive(Duration::from_millis(500)).await {
            Err(Error::Codec(e)) => assert!(e.is_protocol_violation()),
            other => panic!("Expected codec error, got {:?}", other),
        }
        assert!(!transport.has_pending());

        transport.disconnect().await.unwrap();
    }

    #[tokio::test]
    async fn test_receive_skips_noise_before_frame() {
        let (mut transport, mut terminal) = connected().await;
        let body = [0x06, 0x0F, 0x00];

        // Duplicated ACK and line noise ahead of a good frame
        terminal.write_all(&[ACK, 0x42]).await.unwrap();
        terminal.write_all(&frame::encode(&body)).await.unwrap();
        terminal.flush().await.unwrap();

        let received = transport.receive(Duration::from_millis(500)).await.unwrap();
        assert_eq!(&received[..], &body[..]);
        assert_eq!(read_exactly(&mut terminal, 1).await, vec![ACK]);

        transport.disconnect().await.unwrap();
    }

    #[tokio::test]
    async fn test_stray_dle_keeps_following_frame() {
        let (mut transport, mut terminal) = connected().await;
        let body = [0x80, 0x00, 0x00];

        terminal.write_all(&[DLE, 0x02, 0x80, DLE, 0x05]).await.unwrap();
        terminal.write_all(&frame::encode(&body)).await.unwrap();
        terminal.flush().await.unwrap();

        let first = transport.receive(Duration::from_millis(500)).await;
        assert!(matches!(first, Err(Error::Codec(zvt_core::Error::StrayDle { .. }))));
        assert!(transport.has_pending());

        let second = transport.receive(Duration::from_millis(500)).await.unwrap();
        assert_eq!(&second[..], &body[..]);

        transport.disconnect().await.unwrap();
    }

    #[tokio::test(start_paused = true)]
    async fn test_receive_assembles_split_frame() {
        let (mut transport, mut terminal) = connected().await;
        let body = [0x06, 0x0F, 0x02, 0x10, 0x27];
        let framed = frame::encode(&body).to_vec();

        let writer = tokio::spawn(async move {
            terminal.write_all(&framed[..4]).await.unwrap();
            tokio::time::sleep(Duration::from_millis(50)).await;
            terminal.write_all(&framed[4..]).await.unwrap();
            terminal
        });

        let received = transport.receive(Duration::from_secs(1)).await.unwrap();
        assert_eq!(&received[..], &body[..]);

        let _terminal = writer.await.unwrap();
        transport.disconnect().await.unwrap();
    }

    #[tokio::test(start_paused = true)]
    async fn test_receive_timeout() {
        let (mut transport, _terminal) = connected().await;

        let result = transport.receive(Duration::from_secs(2)).await;
        assert!(matches!(result, Err(Error::ReadTimeout(_))));

        transport.disconnect().await.unwrap();
    }

    #[tokio::test]
    async fn test_bundled_frames_stay_pending() {
        let (mut transport, mut terminal) = connected().await;

        terminal.write_all(&[ACK]).await.unwrap();
        terminal.write_all(&frame::encode(&[0x80, 0x00, 0x00])).await.unwrap();
        terminal.write_all(&frame::encode(&[0x04, 0xFF, 0x01, 0x0E])).await.unwrap();
        // Both frames must be in the buffer before the first read
        terminal.flush().await.unwrap();

        let reply = transport.send(&[0x06, 0x01, 0x00], false).await.unwrap();
        assert_eq!(&reply[..], &[0x80, 0x00, 0x00]);

        let next = transport.receive(Duration::from_millis(500)).await.unwrap();
        assert_eq!(&next[..], &[0x04, 0xFF, 0x01, 0x0E]);
        assert!(!transport.has_pending());

        transport.reset().await.unwrap();
        transport.disconnect().await.unwrap();
    }

    #[tokio::test]
    async fn test_not_connected() {
        let (link, _terminal) = duplex(64);
        let mut transport = FramedTransport::new(link, "duplex");

        assert!(!transport.is_connected());
        assert!(matches!(
            transport.send(&[0x05, 0x01, 0x00], false).await,
            Err(Error::NotConnected)
        ));
        assert!(matches!(
            transport.receive(Duration::from_millis(10)).await,
            Err(Error::NotConnected)
        ));
    }

    #[tokio::test]
    async fn test_connect_twice() {
        let (mut transport, _terminal) = connected().await;

        assert!(matches!(transport.connect().await, Err(Error::AlreadyConnected)));
        assert_eq!(transport.remote_addr(), "duplex");

        transport.disconnect().await.unwrap();
        assert!(!transport.is_connected());
    }
}
