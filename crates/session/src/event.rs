//! Events surfaced by reader sessions and the session manager

use bytes::Bytes;
use cardwatch_core::{CardSerial, Protocol, ReaderHandle};
use crossbeam_channel::{Receiver, Sender, unbounded};

use crate::error::SessionError;
use crate::session::ReaderSessionState;

/// Something observable happened to a reader or its card
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionEvent {
    /// Reader appeared in enumeration
    ReaderAttached {
        /// Reader
        reader: ReaderHandle,
    },
    /// Reader disappeared from enumeration
    ReaderDetached {
        /// Reader
        reader: ReaderHandle,
    },
    /// Enumeration returned no readers
    NoReaderFound,
    /// Card connected
    CardInserted {
        /// Reader
        reader: ReaderHandle,
        /// Answer to reset
        atr: Bytes,
        /// Negotiated protocol
        protocol: Protocol,
    },
    /// Card UID read
    CardIdentified {
        /// Reader
        reader: ReaderHandle,
        /// Raw UID
        uid: Bytes,
        /// Serial derived from the UID
        serial: CardSerial,
    },
    /// Card left the reader
    CardRemoved {
        /// Reader
        reader: ReaderHandle,
    },
    /// Session entered the error state
    SessionFailed {
        /// Reader
        reader: ReaderHandle,
        /// Fault that ended the session
        error: SessionError,
    },
    /// Session state transition
    StateChanged {
        /// Reader
        reader: ReaderHandle,
        /// Previous state
        from: ReaderSessionState,
        /// New state
        to: ReaderSessionState,
    },
}

impl SessionEvent {
    /// Reader the event concerns, if any
    pub const fn reader(&self) -> Option<&ReaderHandle> {
        match self {
            Self::NoReaderFound => None,
            Self::ReaderAttached { reader }
            | Self::ReaderDetached { reader }
            | Self::CardInserted { reader, .. }
            | Self::CardIdentified { reader, .. }
            | Self::CardRemoved { reader }
            | Self::SessionFailed { reader, .. }
            | Self::StateChanged { reader, .. } => Some(reader),
        }
    }
}

/// Sender for session events
pub type EventSender = Sender<SessionEvent>;
/// Receiver for session events
pub type EventReceiver = Receiver<SessionEvent>;

/// Create an unbounded channel for session events
pub fn event_channel() -> (EventSender, EventReceiver) {
    unbounded()
}
