//! Code tables for zvt
//!
//! Human-readable texts for the status and error bytes a terminal reports.
//! These are for logs and user interfaces; protocol decisions never depend
//! on them.

pub mod codes;
pub mod error;

pub use codes::{Locale, error_message, intermediate_status, requires_terminal_attention, terminal_status};
pub use error::{Error, Result};
