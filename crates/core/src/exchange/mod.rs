//! Command/response exchange over a connected card
//!
//! The engine encodes a [`CommandApdu`], transmits it, decodes the answer and
//! follows `61 XX` with GET RESPONSE until the card reports a final status.
//! Transient transport faults are retried with a fresh transmit of the same
//! bytes; everything else surfaces as an [`ExchangeError`].

mod error;

use bytes::BytesMut;
use tracing::{Level, debug, info, instrument, warn};

pub use error::ExchangeError;

use crate::command::CommandApdu;
use crate::response::Response;
use crate::response::status::StatusWord;
use crate::transport::{CardSession, ReaderTransport};

/// INS of GET RESPONSE
pub const GET_RESPONSE_INS: u8 = 0xC0;

/// Retry and chaining limits of an [`ExchangeEngine`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExchangeConfig {
    /// Extra transmit attempts after a transient fault
    pub transmit_retries: u32,
    /// Maximum GET RESPONSE round trips for one command
    pub max_response_chain: usize,
    /// CLA used for GET RESPONSE
    pub get_response_cla: u8,
}

impl Default for ExchangeConfig {
    fn default() -> Self {
        Self::new()
    }
}

impl ExchangeConfig {
    /// One retry, sixteen GET RESPONSE round trips, CLA `00`
    pub const fn new() -> Self {
        Self {
            transmit_retries: 1,
            max_response_chain: 16,
            get_response_cla: 0x00,
        }
    }

    /// Set the number of retries for transient faults
    pub const fn with_transmit_retries(mut self, retries: u32) -> Self {
        self.transmit_retries = retries;
        self
    }

    /// Set the GET RESPONSE chain limit
    pub const fn with_max_response_chain(mut self, limit: usize) -> Self {
        self.max_response_chain = limit;
        self
    }

    /// Set the CLA used for GET RESPONSE
    pub const fn with_get_response_cla(mut self, cla: u8) -> Self {
        self.get_response_cla = cla;
        self
    }
}

/// Sends commands to a connected card
#[derive(Debug, Clone, Copy, Default)]
pub struct ExchangeEngine {
    config: ExchangeConfig,
}

impl ExchangeEngine {
    /// Create an engine with the given limits
    pub const fn new(config: ExchangeConfig) -> Self {
        Self { config }
    }

    /// Active configuration
    pub const fn config(&self) -> &ExchangeConfig {
        &self.config
    }

    /// Send a command and collect the complete response
    ///
    /// The returned response carries the data of every GET RESPONSE round
    /// concatenated in order, and the status word of the last one.
    #[instrument(level = "debug", skip_all, fields(reader = %card.reader(), command = %command))]
    pub fn exchange<T: ReaderTransport>(
        &self,
        transport: &T,
        card: &mut CardSession<T::Connection>,
        command: &CommandApdu,
    ) -> Result<Response, ExchangeError> {
        let mut response = self.transmit(transport, card, command)?;
        if !response.status().is_more_data_available() {
            log_completion(response.status(), response.payload().len(), 0);
            return Ok(response);
        }

        let mut data = BytesMut::from(response.payload().as_ref());
        let mut rounds = 0;
        while let Some(remaining) = response.status().remaining_bytes() {
            if rounds == self.config.max_response_chain {
                warn!(rounds, "GET RESPONSE chain limit reached");
                return Err(ExchangeError::ChainLimitExceeded(self.config.max_response_chain));
            }
            rounds += 1;

            debug!(remaining, round = rounds, "Fetching remaining response bytes");
            let get_response =
                CommandApdu::new_with_le(self.config.get_response_cla, GET_RESPONSE_INS, 0x00, 0x00, remaining);
            response = self.transmit(transport, card, &get_response)?;
            data.extend_from_slice(response.payload());
        }

        log_completion(response.status(), data.len(), rounds);
        Ok(Response::new(data.freeze(), response.status()))
    }

    fn transmit<T: ReaderTransport>(
        &self,
        transport: &T,
        card: &mut CardSession<T::Connection>,
        command: &CommandApdu,
    ) -> Result<Response, ExchangeError> {
        let raw = command.to_bytes();
        let mut attempts = 0;
        loop {
            attempts += 1;
            match transport.transmit(card, &raw) {
                Ok(bytes) => return Ok(Response::from_bytes(&bytes)?),
                Err(e) if e.is_transient() && attempts <= self.config.transmit_retries => {
                    warn!(attempt = attempts, error = %e, "Transient transmit fault, retrying");
                }
                Err(source) => return Err(ExchangeError::ExchangeFailed { attempts, source }),
            }
        }
    }
}

/// Log the final status at the level its class calls for
fn log_completion(status: StatusWord, len: usize, rounds: usize) {
    let description = status.description();
    let level = status.tracing_level();
    if level == Level::DEBUG {
        debug!(%status, description, len, rounds, "Exchange complete");
    } else if level == Level::INFO {
        info!(%status, description, len, rounds, "Exchange completed with warning");
    } else {
        warn!(%status, description, len, rounds, "Exchange completed with error status");
    }
}
