//! Error types for reader sessions and the session manager

use cardwatch_core::StatusWord;
use cardwatch_core::exchange::ExchangeError;
use cardwatch_core::registry::RegistryError;
use cardwatch_core::transport::TransportError;
use thiserror::Error;

use crate::session::ReaderSessionState;

/// Session error type
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SessionError {
    /// Enumeration returned no readers
    #[error("No reader found")]
    NoReaderFound,

    /// Card went away between presence and connect
    #[error("Connect to {reader} failed: {source}")]
    ConnectFailed {
        /// Reader name
        reader: String,
        /// Transport fault
        source: TransportError,
    },

    /// Reader disappeared while a card cycle was in progress
    #[error("Reader vanished: {0}")]
    ReaderVanished(String),

    /// Unrecoverable transport fault
    #[error(transparent)]
    Transport(#[from] TransportError),

    /// Command exchange failed
    #[error(transparent)]
    Exchange(#[from] ExchangeError),

    /// Command could not be rendered
    #[error(transparent)]
    Registry(#[from] RegistryError),

    /// Exchange attempted without a connected card
    #[error("No card connected (session is {0})")]
    NotConnected(ReaderSessionState),

    /// Session is in the terminal error state
    #[error("Session is faulted")]
    Faulted,

    /// Session was cancelled and closed
    #[error("Session cancelled")]
    Cancelled,

    /// GET UID completed with a status other than success
    #[error("UID probe failed with status {0}")]
    UidProbeFailed(StatusWord),

    /// Worker thread could not be started
    #[error("Failed to start worker: {0}")]
    Worker(String),
}

impl SessionError {
    /// Whether the session keeps running after this error
    ///
    /// A failed exchange is recoverable unless the reader itself faulted.
    pub fn is_recoverable(&self) -> bool {
        match self {
            Self::ConnectFailed { .. }
            | Self::NotConnected(_)
            | Self::UidProbeFailed(_)
            | Self::Registry(_) => true,
            Self::Exchange(e) => e
                .transport()
                .is_none_or(|source| source.is_transient() || source.is_card_gone()),
            _ => false,
        }
    }
}
