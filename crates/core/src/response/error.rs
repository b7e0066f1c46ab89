//! Error types specific to APDU responses

use thiserror::Error;

/// Error for APDU response decoding
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ResponseError {
    /// Response too short to carry a status word (less than 2 bytes)
    #[error("Malformed response: {0} bytes")]
    MalformedResponse(usize),
}
