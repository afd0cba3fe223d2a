//! Master/slave handoff of one transmit cycle
//!
//! The cash register starts as master, hands the turn to the terminal by
//! sending a request, and stays slave until the request's handler accepts a
//! reply as giving the turn back.
//!
//! ```text
//! SendRequest --Sent--> AwaitImmediateResponse
//! AwaitImmediateResponse / SlaveWait / ReadAhead:
//!     Granted (nothing buffered) --> Done
//!     Granted (data buffered)    --> ReadAhead
//!     Withheld                   --> SlaveWait
//! SlaveWait --ReceiveTimeout--> fatal
//! ReadAhead --ReceiveTimeout--> Done
//! ```

/// Where a transmit cycle stands
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CycleState {
    /// Request not yet handed to the transport
    SendRequest,

    /// Request sent, judging the terminal's immediate reply
    AwaitImmediateResponse,

    /// Terminal holds master, waiting for its next packet
    SlaveWait,

    /// Master regained but more input is already buffered
    ReadAhead,

    /// Master regained for good
    Done,
}

/// What happened in the last step
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Event {
    /// The request left and the immediate reply came back
    Sent,

    /// The handler gave master back
    Granted {
        /// The transport already holds unread input
        pending: bool,
    },

    /// The handler left master with the terminal
    Withheld,

    /// Nothing arrived in time
    ReceiveTimeout,
}

/// Outcome of feeding an event to a state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transition {
    To(CycleState),

    /// The cycle cannot recover
    Fatal,

    /// The event cannot happen in this state
    Illegal,
}

impl CycleState {
    /// Check if master is (provisionally) back with the cash register
    pub fn holds_master(self) -> bool {
        matches!(self, Self::SendRequest | Self::ReadAhead | Self::Done)
    }

    pub fn next(self, event: Event) -> Transition {
        use CycleState::*;
        use Event::*;

        match (self, event) {
            (SendRequest, Sent) => Transition::To(AwaitImmediateResponse),

            (AwaitImmediateResponse | SlaveWait | ReadAhead, Granted { pending: false }) => {
                Transition::To(Done)
            }
            (AwaitImmediateResponse | SlaveWait | ReadAhead, Granted { pending: true }) => {
                Transition::To(ReadAhead)
            }
            (AwaitImmediateResponse | SlaveWait | ReadAhead, Withheld) => Transition::To(SlaveWait),

            (SlaveWait, ReceiveTimeout) => Transition::Fatal,
            (ReadAhead, ReceiveTimeout) => Transition::To(Done),

            _ => Transition::Illegal,
        }
    }
}
