//! # mercury-rs - A Rust Crate for Mercury Energy Meter Communication
//!
//! The mercury-rs crate reads data from Mercury electricity meters reachable
//! through an RS485-TCP/IP bridge. Two protocol families are supported: the
//! Mercury 206 protocol (addressed directly by serial number, no
//! authentication) and the Mercury 236 protocol (bus address derived from
//! the serial, open-channel handshake with access level and password).
//!
//! ## Features
//!
//! - Poll a batch of meters strictly one at a time, with per-device fault
//!   isolation: one bad device never aborts the batch
//! - Derive Mercury 236 bus addresses from raw serial numbers
//! - Drive the authenticated session lifecycle (connect, open channel,
//!   query, close) with vendor default credentials when none are supplied
//! - Select which energy accumulation array a run targets
//! - Normalize readings (voltage/current/power, frequency, cumulative and
//!   tariff-bucketed energy) and render them as text or a JSON document
//!
//! ## Usage
//!
//! ```no_run
//! use mercury_rs::{poll, OutputFormat, PollConfig, ProtocolFamily, render};
//!
//! #[tokio::main]
//! async fn main() {
//!     let config = PollConfig::new(ProtocolFamily::Authenticated, "192.168.1.50");
//!     let batch = poll(&[34197101, 34197359], &config).await;
//!     println!("{}", render(&batch, OutputFormat::Json));
//! }
//! ```

pub mod address;
pub mod arrays;
pub mod constants;
pub mod error;
pub mod logging;
pub mod output;
pub mod poller;
pub mod protocol;
pub mod record;
pub mod session;
pub mod transport;

pub use crate::error::{ErrorKind, MercuryError};
pub use crate::logging::{init_logger, log_info};

// Core polling types
pub use address::{resolve_address, ProtocolFamily};
pub use arrays::{read_plan, ArrayNumber, ReadOp, ReadStep};
pub use output::{render, to_json, to_text, OutputFormat};
pub use poller::{poll, poll_authenticated, poll_simple, poll_with, PollConfig};
pub use record::{BatchResult, DeviceReport, DeviceResult, MetricGroup, MetricValue, Metrics};
pub use session::{Session, SessionState};

// Protocol codecs
pub use protocol::{
    AccessLevel, Mercury206Codec, Mercury206Handle, Mercury236Codec, Mercury236Handle,
};
pub use transport::{BridgeHandle, BridgeLink};
