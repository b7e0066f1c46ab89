//! Error types for the PC/SC transport

use cardwatch_core::transport::TransportError;
use thiserror::Error;

/// PC/SC-specific errors
#[derive(Debug, Error)]
pub enum PcscError {
    /// Error reported by the resource manager
    #[error("PC/SC error: {0}")]
    Pcsc(#[from] pcsc::Error),

    /// Reader name cannot be passed to the resource manager
    #[error("Invalid reader name: {0}")]
    InvalidReaderName(String),

    /// Resource manager reports the reader as unknown or ignored
    #[error("Reader not found: {0}")]
    ReaderNotFound(String),
}

impl From<PcscError> for TransportError {
    fn from(error: PcscError) -> Self {
        match error {
            PcscError::Pcsc(e) => match e {
                pcsc::Error::NoSmartcard => Self::NoCard,
                pcsc::Error::RemovedCard | pcsc::Error::ResetCard => Self::CardRemoved,
                pcsc::Error::UnknownReader
                | pcsc::Error::ReaderUnavailable
                | pcsc::Error::NoReadersAvailable
                | pcsc::Error::NoService
                | pcsc::Error::ServiceStopped => Self::ReaderUnavailable(e.to_string()),
                pcsc::Error::CommDataLost
                | pcsc::Error::CommError
                | pcsc::Error::Timeout
                | pcsc::Error::SharingViolation
                | pcsc::Error::UnresponsiveCard
                | pcsc::Error::UnpoweredCard => Self::Io(e.to_string()),
                _ => Self::Other(e.to_string()),
            },
            PcscError::InvalidReaderName(name) | PcscError::ReaderNotFound(name) => {
                Self::ReaderUnavailable(name)
            }
        }
    }
}
