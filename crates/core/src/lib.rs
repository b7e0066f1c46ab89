//! Core types for APDU (Application Protocol Data Unit) exchanges with smart cards
//!
//! This crate provides the building blocks the reader session layer is made of:
//!
//! - ISO/IEC 7816-4 short APDU framing ([`CommandApdu`], [`Response`], [`StatusWord`])
//! - A registry of command templates taken from the classic APDU reference sheet
//!   ([`CommandRegistry`]) that renders symbolic commands into concrete APDUs
//! - The [`ReaderTransport`] abstraction over reader enumeration, bounded
//!   presence polling and raw byte exchange
//! - The [`ExchangeEngine`], which sends commands with retry on transient faults
//!   and follows `61 XX` chains with GET RESPONSE
//! - The [`CardSerial`] derived from a card UID, as stored by directory services
//!
//! ```
//! use cardwatch_core::{CommandRegistry, Parameters};
//!
//! let registry = CommandRegistry::builtin();
//! let select = registry
//!     .render("SELECT", &Parameters::new().with_data([0xA0, 0x00, 0x00, 0x00, 0x03]))
//!     .unwrap();
//!
//! assert_eq!(
//!     select.to_bytes().as_ref(),
//!     &[0x00, 0xA4, 0x04, 0x00, 0x05, 0xA0, 0x00, 0x00, 0x00, 0x03, 0x00]
//! );
//! ```
#![cfg_attr(not(test), warn(unused_crate_dependencies))]
#![forbid(unsafe_code)]
#![warn(missing_docs, rustdoc::missing_crate_level_docs)]

// Re-export bytes for convenience
pub use bytes::{Bytes, BytesMut};

// Main modules
pub mod command;
pub mod exchange;
pub mod registry;
pub mod response;
pub mod serial;
pub mod transport;

// Re-exports for common types
pub use command::{CommandApdu, ExpectedLength};
pub use exchange::{ExchangeConfig, ExchangeEngine};
pub use registry::{CommandDefinition, CommandRegistry, CommandTemplate, Parameters, StatusPattern};
pub use response::Response;
pub use response::status::StatusWord;
pub use serial::{CardIdentity, CardSerial};
pub use transport::{CardSession, Protocol, ProtocolPreference, ReaderHandle, ReaderTransport};

/// Prelude module containing commonly used traits and types
pub mod prelude {
    pub use crate::{
        Bytes, BytesMut, CardIdentity, CardSerial, CardSession, CommandApdu, CommandDefinition,
        CommandRegistry, ExchangeConfig, ExchangeEngine, Parameters, Protocol, ProtocolPreference,
        ReaderHandle, ReaderTransport, Response, StatusWord,
        exchange::ExchangeError,
        registry::RegistryError,
        response::error::ResponseError,
        response::status::common as status,
        transport::TransportError,
    };
}
