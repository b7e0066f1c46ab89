//! Utility functions for APDU response handling

use crate::response::error::ResponseError;
use crate::response::status::StatusWord;
use tracing::debug;

/// Extract status word and payload from raw APDU response data
///
/// Returns a tuple containing:
/// - The StatusWord object
/// - The payload data (without the status word)
///
/// # Errors
/// Returns an error if the data is too short to contain a valid status word.
pub fn extract_status_and_payload(data: &[u8]) -> Result<(StatusWord, &[u8]), ResponseError> {
    let Some(split) = data.len().checked_sub(2) else {
        debug!("Response too short: {} bytes", data.len());
        return Err(ResponseError::MalformedResponse(data.len()));
    };

    let (payload, sw) = data.split_at(split);
    Ok((StatusWord::new(sw[0], sw[1]), payload))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_extract_status_and_payload() {
        // Test with payload and status
        let data = [0x01, 0x02, 0x03, 0x90, 0x00];
        let result = extract_status_and_payload(&data).unwrap();
        assert_eq!(result.0, StatusWord::new(0x90, 0x00));
        assert_eq!(result.1, &[0x01, 0x02, 0x03]);

        // Test with only status
        let data = [0x6A, 0x82];
        let result = extract_status_and_payload(&data).unwrap();
        assert_eq!(result.0, StatusWord::new(0x6A, 0x82));
        assert!(result.1.is_empty());

        // Test with insufficient data
        assert_eq!(
            extract_status_and_payload(&[0x90]),
            Err(ResponseError::MalformedResponse(1))
        );
        assert_eq!(
            extract_status_and_payload(&[]),
            Err(ResponseError::MalformedResponse(0))
        );
    }
}
