//! Logical connection to one inserted card

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

use bytes::Bytes;

use super::{Protocol, ReaderHandle};

static NEXT_SESSION_ID: AtomicU64 = AtomicU64::new(1);

/// A connected card
///
/// Created by [`ReaderTransport::connect`](super::ReaderTransport::connect) and
/// consumed by [`ReaderTransport::disconnect`](super::ReaderTransport::disconnect).
/// The ATR and protocol are fixed at connect time. Every connect yields a
/// fresh id, so two insertions never compare as the same session.
pub struct CardSession<C> {
    id: u64,
    reader: ReaderHandle,
    protocol: Protocol,
    atr: Bytes,
    connection: C,
}

impl<C> CardSession<C> {
    /// Wrap a freshly established connection
    pub fn new(reader: ReaderHandle, connection: C, protocol: Protocol, atr: Bytes) -> Self {
        Self {
            id: NEXT_SESSION_ID.fetch_add(1, Ordering::Relaxed),
            reader,
            protocol,
            atr,
            connection,
        }
    }

    /// Process-unique session id
    pub const fn id(&self) -> u64 {
        self.id
    }

    /// Reader the card sits in
    pub const fn reader(&self) -> &ReaderHandle {
        &self.reader
    }

    /// Negotiated protocol
    pub const fn protocol(&self) -> Protocol {
        self.protocol
    }

    /// Answer-to-reset bytes
    pub const fn atr(&self) -> &Bytes {
        &self.atr
    }

    /// Transport connection
    pub const fn connection(&self) -> &C {
        &self.connection
    }

    /// Give up the session and keep only the connection
    pub fn into_connection(self) -> C {
        self.connection
    }
}

impl<C> fmt::Debug for CardSession<C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CardSession")
            .field("id", &self.id)
            .field("reader", &self.reader.name())
            .field("protocol", &self.protocol)
            .field("atr", &hex::encode_upper(&self.atr))
            .finish_non_exhaustive()
    }
}
