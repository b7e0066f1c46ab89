//! Error types specific to reader transports

use thiserror::Error;

/// Transport error type
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TransportError {
    /// I/O fault while talking to the reader, may succeed on a fresh attempt
    #[error("I/O fault: {0}")]
    Io(String),

    /// Card was removed during the operation
    #[error("Card removed")]
    CardRemoved,

    /// No card is present in the reader
    #[error("No card in reader")]
    NoCard,

    /// Reader is gone or the reader subsystem is not available
    #[error("Reader unavailable: {0}")]
    ReaderUnavailable(String),

    /// Other error with message
    #[error("{0}")]
    Other(String),
}

impl TransportError {
    /// Create an I/O fault
    pub fn io<S: Into<String>>(message: S) -> Self {
        Self::Io(message.into())
    }

    /// Create a general other error
    pub fn other<S: Into<String>>(message: S) -> Self {
        Self::Other(message.into())
    }

    /// Whether retrying the same operation may succeed
    pub const fn is_transient(&self) -> bool {
        matches!(self, Self::Io(_))
    }

    /// Whether the card, not the reader, went away
    pub const fn is_card_gone(&self) -> bool {
        matches!(self, Self::CardRemoved | Self::NoCard)
    }
}
