//! Prologix GPIB Controller Driver for Rust
//!
//! This crate drives Prologix GPIB-ETHERNET and GPIB-USB bridge controllers:
//! devices that translate line-oriented commands over a TCP or serial byte
//! channel into GPIB bus transactions against attached instruments.
//!
//! # Features
//!
//! - Directive encoding and payload escaping for the controller line protocol
//! - Response framing under five line termination conventions, with a single
//!   absolute deadline per read
//! - Background byte ingestion with an atomically resettable read buffer
//! - Typed helpers for the full `++` directive vocabulary
//! - GPIB bus address parsing (`gpib:<pad>[,<sad>]`) and validation
//! - Instrument helpers, including the HP 5334 universal counter command set
//!
//! # Example
//!
//! ```no_run
//! use prologix::{BusAddress, Prologix, ReadTermination};
//! use std::time::Duration;
//!
//! fn main() -> prologix::Result<()> {
//!     // Connect to a GPIB-ETHERNET controller on the default port
//!     let mut ctrl = Prologix::open_tcp("192.168.1.80", None)?;
//!
//!     println!("firmware: {}", ctrl.version()?);
//!
//!     // Talk to the instrument at address 3 with read-after-write enabled
//!     ctrl.set_address(&BusAddress::new(3)?)?;
//!     ctrl.set_auto(true)?;
//!
//!     ctrl.send_data(b"*IDN?")?;
//!     let frame = ctrl.read_frame(ReadTermination::OptCrLf, Duration::from_secs(1))?;
//!     println!("instrument: {}", String::from_utf8_lossy(&frame));
//!
//!     ctrl.close()
//! }
//! ```
//!
//! # Supported Controllers
//!
//! - Prologix GPIB-ETHERNET (TCP, default port 1234)
//! - Prologix GPIB-USB (FTDI serial, default 115200 8N1)

pub mod address;
pub mod buffer;
pub mod channel;
pub mod constants;
pub mod controller;
pub mod encode;
pub mod error;
pub mod frame;
pub mod instrument;

// Re-export main types at crate root
pub use address::BusAddress;
pub use buffer::ReadBuffer;
pub use channel::{ByteChannel, SerialChannel, TcpChannel};
pub use controller::Prologix;
pub use encode::{encode_command, encode_data, unescape_data};
pub use error::{PrologixError, Result};
pub use frame::{DecodeStep, FrameDecoder, ReadTermination};
pub use instrument::{Hp5334, Instrument};
