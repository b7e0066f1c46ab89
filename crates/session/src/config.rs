//! Configuration options for reader sessions

use std::time::Duration;

use cardwatch_core::{ExchangeConfig, ProtocolPreference};

/// Configuration shared by every session of a manager
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SessionConfig {
    /// Upper bound of one presence or absence poll
    pub poll_timeout: Duration,

    /// Pause before enumerating again when no reader is attached
    pub no_reader_backoff: Duration,

    /// Protocols acceptable when connecting
    pub protocol: ProtocolPreference,

    /// Reset the card when disconnecting
    pub reset_on_disconnect: bool,

    /// Read the card UID automatically before releasing a card
    pub auto_probe: bool,

    /// Retry and GET RESPONSE limits
    pub exchange: ExchangeConfig,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self::new()
    }
}

impl SessionConfig {
    /// Five second polls and backoff, any protocol, reset on disconnect, UID probe on
    pub const fn new() -> Self {
        Self {
            poll_timeout: Duration::from_millis(5000),
            no_reader_backoff: Duration::from_secs(5),
            protocol: ProtocolPreference::Any,
            reset_on_disconnect: true,
            auto_probe: true,
            exchange: ExchangeConfig::new(),
        }
    }

    /// Set the poll timeout
    pub const fn with_poll_timeout(mut self, timeout: Duration) -> Self {
        self.poll_timeout = timeout;
        self
    }

    /// Set the no-reader backoff
    pub const fn with_no_reader_backoff(mut self, backoff: Duration) -> Self {
        self.no_reader_backoff = backoff;
        self
    }

    /// Set the protocol preference
    pub const fn with_protocol(mut self, protocol: ProtocolPreference) -> Self {
        self.protocol = protocol;
        self
    }

    /// Set whether to reset the card on disconnect
    pub const fn with_reset_on_disconnect(mut self, reset: bool) -> Self {
        self.reset_on_disconnect = reset;
        self
    }

    /// Set whether to probe the UID automatically
    pub const fn with_auto_probe(mut self, auto_probe: bool) -> Self {
        self.auto_probe = auto_probe;
        self
    }

    /// Set the exchange configuration
    pub const fn with_exchange(mut self, exchange: ExchangeConfig) -> Self {
        self.exchange = exchange;
        self
    }
}
