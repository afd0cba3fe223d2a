//! # zvt
//!
//! Transmission engine for the ZVT protocol between an electronic cash
//! register (ECR) and a payment terminal (PT).
//!
//! ## Features
//!
//! - Master/slave turn taking as an explicit state machine
//! - Async/await API using Tokio
//! - Append-only packet history per engine and per cycle
//! - Generic request with the standard turn rules
//!
//! ## Quick Start
//!
//! ```no_run
//! use tokio::net::TcpStream;
//! use zvt::{FramedTransport, Request, Transmission};
//! use zvt_core::ControlCode;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let stream = TcpStream::connect("192.168.1.50:20007").await?;
//!     let mut transmission = Transmission::new(FramedTransport::new(stream, "terminal"));
//!     transmission.connect().await?;
//!
//!     let request = Request::new(ControlCode::STATUS_ENQUIRY).wait_for_completion(true);
//!     transmission.transmit(request).await?;
//!
//!     for entry in transmission.last_history() {
//!         println!("{:?} {}", entry.direction, entry.packet);
//!     }
//!
//!     transmission.disconnect().await?;
//!     Ok(())
//! }
//! ```

pub mod error;
pub mod handler;
pub mod history;
pub mod request;
pub mod response_log;
pub mod state;
pub mod transmission;

// Re-exports
pub use error::{Error, Result};
pub use handler::{ResponseContext, ResponseHandler};
pub use history::{Direction, History, HistoryEntry};
pub use request::Request;
pub use response_log::ResponseLog;
pub use state::{CycleState, Event, Transition};
pub use transmission::{SharedTransmission, TransmissionConfig, TransmitStatus, Transmission};

pub use zvt_core::{ControlCode, Packet};
pub use zvt_transport::{FramedTransport, ScriptedTransport, Transport};
pub use zvt_types::Locale;
