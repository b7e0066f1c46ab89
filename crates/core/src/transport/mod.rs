//! Reader transport abstraction
//!
//! A transport enumerates readers, polls them for card presence with a bounded
//! timeout, connects to inserted cards and moves raw APDU bytes. It has no
//! knowledge of command structure or GET RESPONSE chaining; that lives in the
//! [`ExchangeEngine`](crate::ExchangeEngine).

mod card;
pub mod error;
#[cfg(any(test, feature = "mock"))]
pub mod mock;

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use bytes::Bytes;
use tracing::{debug, trace};

pub use card::CardSession;
pub use error::TransportError;

/// A physical reader as reported by enumeration
///
/// For PC/SC the id and the display name are both the reader name.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ReaderHandle {
    name: Arc<str>,
}

impl ReaderHandle {
    /// Create a handle from a reader name
    pub fn new(name: impl AsRef<str>) -> Self {
        Self {
            name: Arc::from(name.as_ref()),
        }
    }

    /// Display name
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Identifier the transport addresses the reader by
    pub fn id(&self) -> &str {
        &self.name
    }
}

impl fmt::Display for ReaderHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.name)
    }
}

/// Protocol negotiated with a connected card
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Protocol {
    /// Character-oriented T=0
    T0,
    /// Block-oriented T=1
    T1,
    /// Raw reader access
    Raw,
    /// Reported by the driver but not recognised
    Unknown,
}

impl fmt::Display for Protocol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::T0 => "T=0",
            Self::T1 => "T=1",
            Self::Raw => "RAW",
            Self::Unknown => "unknown",
        })
    }
}

/// Protocols acceptable when connecting
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum ProtocolPreference {
    /// Let the reader pick T=0 or T=1
    #[default]
    Any,
    /// T=0 only
    T0,
    /// T=1 only
    T1,
    /// Raw reader access
    Raw,
}

/// Access to card readers
///
/// Implementations must be shareable between the worker threads of a session
/// manager; every per-card operation goes through a [`CardSession`] the
/// caller owns exclusively.
pub trait ReaderTransport: Send + Sync + fmt::Debug {
    /// Per-card connection handle
    type Connection: Send;

    /// Enumerate attached readers
    fn list_readers(&self) -> Result<Vec<ReaderHandle>, TransportError>;

    /// Wait up to `timeout` for a card to be present
    ///
    /// Returns `Ok(false)` when the timeout elapses first.
    fn wait_present(&self, reader: &ReaderHandle, timeout: Duration)
    -> Result<bool, TransportError>;

    /// Wait up to `timeout` for the reader to be empty
    ///
    /// Returns `Ok(false)` when the timeout elapses first.
    fn wait_absent(&self, reader: &ReaderHandle, timeout: Duration) -> Result<bool, TransportError>;

    /// Connect to the card in the reader
    fn connect(
        &self,
        reader: &ReaderHandle,
        preference: ProtocolPreference,
    ) -> Result<CardSession<Self::Connection>, TransportError>;

    /// Send raw APDU bytes and return the raw response including SW1 SW2
    fn transmit(
        &self,
        card: &mut CardSession<Self::Connection>,
        command: &[u8],
    ) -> Result<Bytes, TransportError> {
        trace!(reader = %card.reader(), command = %hex::encode_upper(command), "Transmitting raw command");
        let result = self.do_transmit(card, command);
        match &result {
            Ok(response) => {
                trace!(response = %hex::encode_upper(response), "Received raw response");
            }
            Err(e) => {
                debug!(error = %e, "Transport error during transmission");
            }
        }
        result
    }

    /// Internal implementation of [`transmit`](Self::transmit)
    fn do_transmit(
        &self,
        card: &mut CardSession<Self::Connection>,
        command: &[u8],
    ) -> Result<Bytes, TransportError>;

    /// Close the connection, resetting the card when `reset` is set
    fn disconnect(
        &self,
        card: CardSession<Self::Connection>,
        reset: bool,
    ) -> Result<(), TransportError>;

    /// Wake every presence poll currently blocked in this transport
    ///
    /// Interrupted polls report a timeout. Transports whose polls cannot be
    /// interrupted keep the default, which does nothing.
    fn interrupt(&self) -> Result<(), TransportError> {
        Ok(())
    }

    /// Whether the reader is still enumerated
    fn is_attached(&self, reader: &ReaderHandle) -> Result<bool, TransportError> {
        Ok(self.list_readers()?.contains(reader))
    }
}
