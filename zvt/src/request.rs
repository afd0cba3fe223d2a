//! Generic request with the standard ZVT turn rules

use std::any::Any;
use std::fmt;

use tracing::{debug, info, warn};

use zvt_core::{ControlCode, Packet};
use zvt_types::{Locale, error_message, intermediate_status, requires_terminal_attention, terminal_status};

use crate::handler::{ResponseContext, ResponseHandler};

type Listener = Box<dyn FnMut(&Packet) + Send>;

/// A request sent by the cash register
///
/// Turn rules applied to every terminal reply:
///
/// | reply                                   | action                    | master |
/// |-----------------------------------------|---------------------------|--------|
/// | `06 0F` completion, `06 1E` abort       | store, acknowledge        | yes    |
/// | `80 00` / `84 00` positive ack          |                           | unless waiting for completion |
/// | `84 xx` negative ack                    | store refusal             | yes    |
/// | `04 FF`, `04 0F`, `06 D1`, `06 D3`      | acknowledge               | no     |
/// | anything else                           | warn, acknowledge         | no     |
///
/// # Examples
///
/// ```
/// use zvt::Request;
/// use zvt_core::ControlCode;
///
/// let request = Request::new(ControlCode::STATUS_ENQUIRY)
///     .wait_for_completion(true)
///     .with_locale("de".parse().unwrap());
///
/// assert_eq!(request.packet().control_code, ControlCode::STATUS_ENQUIRY);
/// assert!(request.completion().is_none());
/// ```
pub struct Request {
    apdu: Packet,
    wait_for_completion: bool,
    locale: Locale,
    completion: Option<Packet>,
    refusal: Option<Packet>,
    listener: Option<Listener>,
}

impl Request {
    /// Create a request without payload
    pub fn new(control_code: ControlCode) -> Self {
        Self::from_packet(Packet::new(control_code))
    }

    /// Wrap a ready-made APDU
    pub fn from_packet(apdu: Packet) -> Self {
        Self {
            apdu,
            wait_for_completion: false,
            locale: Locale::default(),
            completion: None,
            refusal: None,
            listener: None,
        }
    }

    /// Keep the terminal as master after its positive acknowledgement
    ///
    /// Used for requests the terminal finishes with a completion packet.
    pub fn wait_for_completion(mut self, wait: bool) -> Self {
        self.wait_for_completion = wait;
        self
    }

    /// Set language of logged status texts
    pub fn with_locale(mut self, locale: Locale) -> Self {
        self.locale = locale;
        self
    }

    /// Invoke `listener` for every reply this request sees
    pub fn register_response_listener<F>(&mut self, listener: F)
    where
        F: FnMut(&Packet) + Send + 'static,
    {
        self.listener = Some(Box::new(listener));
    }

    /// Builder form of [`Request::register_response_listener`]
    pub fn with_listener<F>(mut self, listener: F) -> Self
    where
        F: FnMut(&Packet) + Send + 'static,
    {
        self.register_response_listener(listener);
        self
    }

    /// The APDU this request sends
    pub fn packet(&self) -> &Packet {
        &self.apdu
    }

    /// Completion or abort packet that ended the transaction
    pub fn completion(&self) -> Option<&Packet> {
        self.completion.as_ref()
    }

    /// Negative acknowledgement the terminal refused the request with
    pub fn refusal(&self) -> Option<&Packet> {
        self.refusal.as_ref()
    }

    /// Check if the terminal finished with a completion (not an abort)
    pub fn succeeded(&self) -> bool {
        self.completion
            .as_ref()
            .is_some_and(|p| p.control_code == ControlCode::COMPLETION)
    }

    fn log_status(&self, response: &Packet) {
        let Some(&status) = response.payload.first() else {
            return;
        };

        let attention = requires_terminal_attention(status);
        match intermediate_status(status, self.locale) {
            Some(text) => info!(status = %format!("{:02X}", status), attention, "{}", text),
            None => debug!(status = %format!("{:02X}", status), "Unknown intermediate status"),
        }
    }

    /// Status enquiry completions carry the terminal status behind BMP 19
    fn log_completion(&self, response: &Packet) {
        if let &[0x19, status, ..] = &response.payload[..] {
            debug!(
                status = %format!("{:02X}", status),
                text = ?terminal_status(status),
                "Terminal status"
            );
        }
    }
}

impl ResponseHandler for Request {
    fn apdu(&self) -> Packet {
        self.apdu.clone()
    }

    fn parse(data: &[u8]) -> zvt_core::Result<Self> {
        Packet::parse(data).map(Self::from_packet)
    }

    fn handle_response(&mut self, response: &Packet, ctx: &mut ResponseContext) -> bool {
        if let Some(listener) = self.listener.as_mut() {
            listener(response);
        }

        let code = response.control_code;

        if code.is_final() {
            if code == ControlCode::ABORT {
                let reason = response.payload.first().copied();
                warn!(
                    reason = ?reason,
                    text = ?reason.and_then(error_message),
                    "Terminal aborted the transaction"
                );
            } else {
                self.log_completion(response);
            }
            self.completion = Some(response.clone());
            ctx.acknowledge();
            return true;
        }

        if code.is_positive_ack() {
            return !self.wait_for_completion;
        }

        if let Some(error) = response.error_code() {
            warn!(
                code = %format!("{:02X}", error),
                text = ?error_message(error),
                "Terminal refused {}",
                self.apdu.control_code
            );
            self.refusal = Some(response.clone());
            return true;
        }

        match code {
            ControlCode::INTERMEDIATE_STATUS => self.log_status(response),
            ControlCode::STATUS_INFORMATION
            | ControlCode::PRINT_LINE
            | ControlCode::PRINT_TEXT_BLOCK => debug!("Terminal sent {}", code),
            _ => warn!("Unexpected reply {} to {}", code, self.apdu.control_code),
        }

        ctx.acknowledge();
        false
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

impl fmt::Debug for Request {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Request")
            .field("apdu", &self.apdu)
            .field("wait_for_completion", &self.wait_for_completion)
            .field("locale", &self.locale)
            .field("completion", &self.completion)
            .field("refusal", &self.refusal)
            .field("listener", &self.listener.is_some())
            .finish()
    }
}
