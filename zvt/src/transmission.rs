//! Transmission engine
//!
//! Drives one packet exchange at a time between cash register (ECR) and
//! payment terminal (PT). The cash register starts as master; sending a
//! request hands the turn to the terminal, which keeps it until the
//! request's [`ResponseHandler`] accepts one of its replies.

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, info, warn};

use zvt_core::Packet;
use zvt_core::constants::{ABORT_TURN_LIMIT, TIMEOUT_T4_DEFAULT};
use zvt_transport::Transport;

use crate::error::{Error, Result};
use crate::handler::{ResponseContext, ResponseHandler};
use crate::history::{Direction, History};
use crate::response_log::ResponseLog;
use crate::state::{CycleState, Event, Transition};

/// Engine behind an exclusive async lock, for sharing between tasks
pub type SharedTransmission = Arc<tokio::sync::Mutex<Transmission>>;

/// Engine settings
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TransmissionConfig {
    /// How long to wait for the terminal while it holds master (T4)
    pub timeout: Duration,

    /// How often the abort cycle consults its handler
    pub abort_turn_limit: usize,
}

impl Default for TransmissionConfig {
    fn default() -> Self {
        Self {
            timeout: TIMEOUT_T4_DEFAULT,
            abort_turn_limit: ABORT_TURN_LIMIT,
        }
    }
}

impl TransmissionConfig {
    /// Set how long to wait for the terminal while it holds master
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Set how often the abort cycle consults its handler (at least once)
    pub fn with_abort_turn_limit(mut self, limit: usize) -> Self {
        self.abort_turn_limit = limit.max(1);
        self
    }
}

/// Successful end of a cycle
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransmitStatus {
    /// Master came back with a reply
    Ok,

    /// Master was back already, a read-ahead found nothing in time
    OkAfterTimeout,
}

impl TransmitStatus {
    pub fn ended_on_timeout(self) -> bool {
        self == Self::OkAfterTimeout
    }
}

/// Master/slave transmission engine
///
/// # Examples
///
/// ```
/// use zvt::{Request, Transmission};
/// use zvt_core::ControlCode;
/// use zvt_transport::ScriptedTransport;
///
/// #[tokio::main]
/// async fn main() -> zvt::Result<()> {
///     let terminal = ScriptedTransport::new()
///         .then_frame([0x80, 0x00, 0x00])
///         .then_frame([0x06, 0x0F, 0x00]);
///
///     let mut transmission = Transmission::new(terminal);
///     transmission.connect().await?;
///
///     let request = Request::new(ControlCode::AUTHORISATION).wait_for_completion(true);
///     transmission.transmit(request).await?;
///
///     assert!(transmission.is_master());
///     assert!(transmission.last_as::<Request>().unwrap().succeeded());
///     Ok(())
/// }
/// ```
pub struct Transmission {
    transport: Box<dyn Transport>,
    config: TransmissionConfig,
    is_master: bool,
    is_waiting: bool,
    last: Option<Box<dyn ResponseHandler>>,
    history: History,
    last_history: History,
    responses: ResponseLog,
}

impl Transmission {
    /// Create an engine on a transport, holding master
    pub fn new(transport: impl Transport + 'static) -> Self {
        Self::with_config(transport, TransmissionConfig::default())
    }

    pub fn with_config(transport: impl Transport + 'static, config: TransmissionConfig) -> Self {
        Self {
            transport: Box::new(transport),
            config,
            is_master: true,
            is_waiting: false,
            last: None,
            history: History::new(),
            last_history: History::new(),
            responses: ResponseLog::new(),
        }
    }

    /// Change how long the next cycles wait for the terminal
    pub fn set_timeout(&mut self, timeout: Duration) {
        self.config.timeout = timeout;
    }

    pub fn config(&self) -> &TransmissionConfig {
        &self.config
    }

    pub fn is_master(&self) -> bool {
        self.is_master
    }

    pub fn is_waiting(&self) -> bool {
        self.is_waiting
    }

    /// Packet of the most recent cycle
    pub fn last(&self) -> Option<&dyn ResponseHandler> {
        self.last.as_deref()
    }

    /// Packet of the most recent cycle, if it is a `P`
    pub fn last_as<P: ResponseHandler>(&self) -> Option<&P> {
        self.last
            .as_deref()
            .and_then(|handler| handler.as_any().downcast_ref::<P>())
    }

    /// Everything exchanged over the engine's lifetime
    pub fn history(&self) -> &History {
        &self.history
    }

    /// Everything exchanged in the most recent cycle
    pub fn last_history(&self) -> &History {
        &self.last_history
    }

    /// Live log of received packets
    pub fn responses(&self) -> ResponseLog {
        self.responses.clone()
    }

    pub fn transport(&self) -> &dyn Transport {
        self.transport.as_ref()
    }

    pub fn into_shared(self) -> SharedTransmission {
        Arc::new(tokio::sync::Mutex::new(self))
    }

    /// Connect the transport
    pub async fn connect(&mut self) -> Result<()> {
        info!("Connecting to {}...", self.transport.remote_addr());

        self.transport.connect().await?;

        info!("Connected");
        Ok(())
    }

    /// Disconnect the transport
    pub async fn disconnect(&mut self) -> Result<()> {
        if !self.transport.is_connected() {
            return Ok(());
        }

        info!("Disconnecting from {}...", self.transport.remote_addr());

        self.transport.disconnect().await?;

        info!("Disconnected");
        Ok(())
    }

    /// Reset the transport and take master back
    pub async fn reset(&mut self) -> Result<()> {
        self.transport.reset().await?;
        self.is_master = true;
        self.is_waiting = false;
        Ok(())
    }

    /// Tell the terminal its last packet arrived (`80 00 00`)
    pub async fn send_received(&mut self) -> Result<()> {
        let packet = Packet::packet_received();
        self.history.push(Direction::Outgoing, packet.clone());
        self.send_no_wait(&packet).await
    }

    /// Send a packet and wait until master comes back
    ///
    /// # Errors
    ///
    /// Returns error if:
    /// - The transport fails to send or receive
    /// - A reply cannot be parsed
    /// - The terminal holds master and stays silent past the timeout
    ///
    /// The engine holds master again afterwards and the cycle's packets are
    /// in [`Transmission::history`] either way.
    pub async fn transmit<H: ResponseHandler>(&mut self, handler: H) -> Result<TransmitStatus> {
        if !self.is_master || self.is_waiting {
            warn!(
                is_master = self.is_master,
                is_waiting = self.is_waiting,
                "Previous cycle did not finish, taking master anyway"
            );
        }

        self.begin(Box::new(handler));

        let result = self.run_transmit().await;
        self.finish(&result);
        result
    }

    /// Send an abort packet
    ///
    /// Takes master unconditionally, sends the packet and judges its single
    /// reply. The handler is asked again with the same reply while it keeps
    /// master, at most `abort_turn_limit` times.
    pub async fn transmit_cancel<H: ResponseHandler>(&mut self, handler: H) -> Result<TransmitStatus> {
        self.begin(Box::new(handler));

        let result = self.run_cancel().await;
        self.finish(&result);
        result
    }

    async fn run_transmit(&mut self) -> Result<TransmitStatus> {
        let mut state = CycleState::SendRequest;
        let mut status = TransmitStatus::Ok;
        let mut reply = None;
        let mut timed_out = None;

        loop {
            let event = match state {
                CycleState::SendRequest => {
                    reply = Some(self.send_request().await?);
                    Event::Sent
                }
                CycleState::AwaitImmediateResponse => {
                    let response = reply.take().ok_or(Error::NothingInFlight)?;
                    self.ask(&response).await?
                }
                CycleState::SlaveWait | CycleState::ReadAhead => {
                    if state == CycleState::ReadAhead {
                        warn!("Master regained with input still buffered, reading ahead");
                    }

                    match self.receive_response().await {
                        Ok(response) => self.ask(&response).await?,
                        Err(Error::Transport(e)) if e.is_timeout() => {
                            debug!(master = state.holds_master(), "Receive timed out: {}", e);
                            timed_out = Some(e);
                            Event::ReceiveTimeout
                        }
                        Err(e) => return Err(e),
                    }
                }
                CycleState::Done => return Ok(status),
            };

            state = match state.next(event) {
                Transition::To(next) => {
                    if event == Event::ReceiveTimeout {
                        status = TransmitStatus::OkAfterTimeout;
                    }
                    next
                }
                Transition::Fatal => {
                    let waited = self.config.timeout;
                    let source = timed_out
                        .take()
                        .unwrap_or(zvt_transport::Error::ReadTimeout(waited));
                    return Err(Error::SlaveTimeout { waited, source });
                }
                Transition::Illegal => return Err(Error::IllegalTransition { state, event }),
            };
        }
    }

    async fn run_cancel(&mut self) -> Result<TransmitStatus> {
        let response = self.send_request().await?;
        let limit = self.config.abort_turn_limit.max(1);

        for turn in 1..=limit {
            if self.ask(&response).await? == Event::Withheld {
                return Ok(TransmitStatus::Ok);
            }
            if turn == limit {
                warn!(turns = turn, "Abort handler kept master, giving up");
            }
        }

        Ok(TransmitStatus::Ok)
    }

    /// Start a cycle, keeping whatever an interrupted cycle already exchanged
    fn begin(&mut self, handler: Box<dyn ResponseHandler>) {
        if self.is_waiting && !self.last_history.is_empty() {
            warn!(
                packets = self.last_history.len(),
                "Keeping history of interrupted cycle"
            );
            self.history.extend_from(&self.last_history);
        }

        self.last_history = History::new();
        self.is_master = true;
        self.is_waiting = true;
        self.last = Some(handler);
    }

    fn finish(&mut self, result: &Result<TransmitStatus>) {
        self.is_master = true;
        self.is_waiting = false;
        self.history.extend_from(&self.last_history);

        if let Err(e) = result {
            warn!("Transmission failed after {} packets: {}", self.last_history.len(), e);
        }
    }

    /// Record and send the cycle's packet, returning the immediate reply
    async fn send_request(&mut self) -> Result<Packet> {
        let (apdu, raw) = {
            let handler = self.last.as_deref().ok_or(Error::NothingInFlight)?;
            (handler.apdu(), handler.serialize()?)
        };

        debug!("> {}", apdu);
        self.last_history.push(Direction::Outgoing, apdu);
        self.is_master = false;

        let reply = self.transport.send(&raw, false).await?;
        self.record_incoming(&reply)
    }

    async fn receive_response(&mut self) -> Result<Packet> {
        let raw = self.transport.receive(self.config.timeout).await?;
        self.record_incoming(&raw)
    }

    fn record_incoming(&mut self, raw: &[u8]) -> Result<Packet> {
        let packet = Packet::parse(raw)?;

        debug!("< {}", packet);
        self.last_history.push(Direction::Incoming, packet.clone());
        self.responses.push(packet.clone());

        Ok(packet)
    }

    /// Let the cycle's packet judge a reply
    async fn ask(&mut self, response: &Packet) -> Result<Event> {
        let mut ctx = ResponseContext::new(self.is_master);

        let master = {
            let handler = self.last.as_deref_mut().ok_or(Error::NothingInFlight)?;
            handler.handle_response(response, &mut ctx)
        };
        self.is_master = master;

        if ctx.acknowledge_requested() {
            let packet = Packet::packet_received();
            self.last_history.push(Direction::Outgoing, packet.clone());
            self.send_no_wait(&packet).await?;
        }

        if !master {
            return Ok(Event::Withheld);
        }

        Ok(Event::Granted {
            pending: self.transport.has_pending(),
        })
    }

    async fn send_no_wait(&mut self, packet: &Packet) -> Result<()> {
        debug!("> {}", packet);
        self.transport.send(&packet.try_encode()?, true).await?;
        Ok(())
    }
}

impl fmt::Debug for Transmission {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Transmission")
            .field("transport", &self.transport.remote_addr())
            .field("config", &self.config)
            .field("is_master", &self.is_master)
            .field("is_waiting", &self.is_waiting)
            .field("last", &self.last)
            .field("history", &self.history.len())
            .finish()
    }
}
