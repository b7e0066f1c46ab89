//! Error types for command exchanges

use thiserror::Error;

use crate::response::error::ResponseError;
use crate::transport::TransportError;

/// Failure of a command/response exchange
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ExchangeError {
    /// Transmission failed, after retries for transient faults
    #[error("Exchange failed after {attempts} attempt(s): {source}")]
    ExchangeFailed {
        /// Transmit attempts made for the failing command
        attempts: u32,
        /// Last transport fault
        source: TransportError,
    },

    /// Card answered with fewer than two bytes
    #[error(transparent)]
    MalformedResponse(#[from] ResponseError),

    /// Card kept answering `61 XX` past the configured chain limit
    #[error("GET RESPONSE chain exceeded {0} round trips")]
    ChainLimitExceeded(usize),
}

impl ExchangeError {
    /// Underlying transport fault, if any
    pub const fn transport(&self) -> Option<&TransportError> {
        match self {
            Self::ExchangeFailed { source, .. } => Some(source),
            _ => None,
        }
    }
}
