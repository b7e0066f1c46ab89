//! PC/SC reader transport
//!
//! Implements [`ReaderTransport`](cardwatch_core::ReaderTransport) over the
//! platform PC/SC resource manager (pcsc-lite, WinSCard or the macOS
//! CryptoTokenKit bridge) using the `pcsc` crate.
//!
//! ```no_run
//! use cardwatch_core::{CommandApdu, ExchangeEngine, ProtocolPreference, ReaderTransport};
//! use cardwatch_transport_pcsc::PcscTransport;
//! use std::time::Duration;
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let transport = PcscTransport::new()?;
//! let Some(reader) = transport.list_readers()?.into_iter().next() else {
//!     println!("No reader found");
//!     return Ok(());
//! };
//!
//! if transport.wait_present(&reader, Duration::from_secs(5))? {
//!     let mut card = transport.connect(&reader, ProtocolPreference::Any)?;
//!     let get_uid = CommandApdu::new_with_le(0xFF, 0xCA, 0x00, 0x00, 0x00);
//!     let response = ExchangeEngine::default().exchange(&transport, &mut card, &get_uid)?;
//!     println!("Card UID: {}", hex::encode_upper(response.payload()));
//!     transport.disconnect(card, true)?;
//! }
//! # Ok(())
//! # }
//! ```
#![cfg_attr(not(test), warn(unused_crate_dependencies))]
#![forbid(unsafe_code)]
#![warn(missing_docs, rustdoc::missing_crate_level_docs)]

mod config;
mod error;
mod transport;

pub use config::{PcscConfig, Scope, ShareMode};
pub use error::PcscError;
pub use transport::PcscTransport;
