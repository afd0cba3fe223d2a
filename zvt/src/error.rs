//! High-level error types

use std::time::Duration;

use crate::state::{CycleState, Event};

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("Core protocol error: {0}")]
    Core(#[from] zvt_core::Error),

    #[error("Transport error: {0}")]
    Transport(#[from] zvt_transport::Error),

    /// The terminal kept the turn and then went silent
    #[error("Terminal silent for {waited:?} while holding master")]
    SlaveTimeout {
        waited: Duration,
        #[source]
        source: zvt_transport::Error,
    },

    #[error("No packet in flight")]
    NothingInFlight,

    #[error("Illegal transition: {event:?} in state {state:?}")]
    IllegalTransition { state: CycleState, event: Event },
}

impl Error {
    /// Check if the cycle failed because the terminal did not answer
    pub fn is_timeout(&self) -> bool {
        match self {
            Self::SlaveTimeout { .. } => true,
            Self::Transport(e) => e.is_timeout(),
            _ => false,
        }
    }

    /// Check if the cycle failed on malformed link-level input
    pub fn is_framing(&self) -> bool {
        match self {
            Self::Core(e) => e.is_framing(),
            Self::Transport(zvt_transport::Error::Codec(e)) => e.is_framing(),
            _ => false,
        }
    }
}
