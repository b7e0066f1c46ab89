//! PC/SC transport implementation

use std::ffi::CString;
use std::fmt;
use std::time::{Duration, Instant};

use bytes::Bytes;
use cardwatch_core::transport::TransportError;
use cardwatch_core::{CardSession, Protocol, ProtocolPreference, ReaderHandle, ReaderTransport};
use pcsc::{Card, Context, Disposition, ReaderState, State};
use tracing::{debug, trace};

use crate::config::{PcscConfig, protocols_for};
use crate::error::PcscError;

/// Card state a presence poll waits for
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Presence {
    Present,
    Absent,
}

impl Presence {
    fn reached(self, state: State) -> bool {
        match self {
            Self::Present => state.contains(State::PRESENT),
            Self::Absent => state.contains(State::EMPTY),
        }
    }
}

/// Reader transport over the PC/SC resource manager
///
/// One context serves every reader; each connected card is an independent
/// [`pcsc::Card`] owned by its [`CardSession`].
pub struct PcscTransport {
    context: Context,
    config: PcscConfig,
}

impl fmt::Debug for PcscTransport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PcscTransport")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

impl PcscTransport {
    /// Establish a context with the default configuration
    pub fn new() -> Result<Self, PcscError> {
        Self::with_config(PcscConfig::new())
    }

    /// Establish a context with a custom configuration
    pub fn with_config(config: PcscConfig) -> Result<Self, PcscError> {
        let context = Context::establish(config.scope.into())?;
        debug!(scope = ?config.scope, "Established PC/SC context");
        Ok(Self::from_context(context, config))
    }

    /// Use an already established context
    pub const fn from_context(context: Context, config: PcscConfig) -> Self {
        Self { context, config }
    }

    /// Active configuration
    pub const fn config(&self) -> &PcscConfig {
        &self.config
    }

    fn reader_names(&self) -> Result<Vec<ReaderHandle>, PcscError> {
        match self.context.list_readers_owned() {
            Ok(names) => Ok(names
                .iter()
                .map(|name| ReaderHandle::new(name.to_string_lossy()))
                .collect()),
            Err(pcsc::Error::NoReadersAvailable) => Ok(Vec::new()),
            Err(e) => Err(e.into()),
        }
    }

    /// Block until the reader reaches `wanted` or `timeout` elapses
    fn wait_for(
        &self,
        reader: &ReaderHandle,
        timeout: Duration,
        wanted: Presence,
    ) -> Result<bool, PcscError> {
        let mut states = [ReaderState::new(reader_name(reader)?, State::UNAWARE)];
        let deadline = Instant::now() + timeout;
        // An UNAWARE current state makes the first call report immediately
        let mut wait = Duration::ZERO;

        loop {
            match self.context.get_status_change(Some(wait), &mut states) {
                Ok(()) => {}
                // interrupted through SCardCancel
                Err(pcsc::Error::Timeout | pcsc::Error::Cancelled) => return Ok(false),
                Err(e) => return Err(e.into()),
            }

            let state = states[0].event_state();
            trace!(reader = %reader, ?state, "Reader state");
            if state.intersects(State::UNKNOWN | State::IGNORE) {
                return Err(PcscError::ReaderNotFound(reader.name().to_owned()));
            }
            if wanted.reached(state) {
                return Ok(true);
            }

            states[0].sync_current_state();
            let now = Instant::now();
            if now >= deadline {
                return Ok(false);
            }
            wait = deadline - now;
        }
    }

    fn connect_card(
        &self,
        reader: &ReaderHandle,
        preference: ProtocolPreference,
    ) -> Result<CardSession<Card>, PcscError> {
        let card = self.context.connect(
            &reader_name(reader)?,
            self.config.share_mode.into(),
            protocols_for(preference),
        )?;

        let status = card.status2_owned()?;
        let protocol = protocol_from(status.protocol2());
        let atr = Bytes::copy_from_slice(status.atr());
        debug!(reader = %reader, %protocol, atr = %hex::encode_upper(&atr), "Connected to card");

        Ok(CardSession::new(reader.clone(), card, protocol, atr))
    }
}

impl ReaderTransport for PcscTransport {
    type Connection = Card;

    fn list_readers(&self) -> Result<Vec<ReaderHandle>, TransportError> {
        Ok(self.reader_names()?)
    }

    fn wait_present(
        &self,
        reader: &ReaderHandle,
        timeout: Duration,
    ) -> Result<bool, TransportError> {
        Ok(self.wait_for(reader, timeout, Presence::Present)?)
    }

    fn wait_absent(&self, reader: &ReaderHandle, timeout: Duration) -> Result<bool, TransportError> {
        Ok(self.wait_for(reader, timeout, Presence::Absent)?)
    }

    fn connect(
        &self,
        reader: &ReaderHandle,
        preference: ProtocolPreference,
    ) -> Result<CardSession<Card>, TransportError> {
        Ok(self.connect_card(reader, preference)?)
    }

    fn do_transmit(
        &self,
        card: &mut CardSession<Card>,
        command: &[u8],
    ) -> Result<Bytes, TransportError> {
        let mut buffer = [0u8; pcsc::MAX_BUFFER_SIZE];
        let response = card
            .connection()
            .transmit(command, &mut buffer)
            .map_err(PcscError::from)?;
        Ok(Bytes::copy_from_slice(response))
    }

    fn interrupt(&self) -> Result<(), TransportError> {
        trace!("Cancelling blocked status change waits");
        self.context.cancel().map_err(PcscError::from)?;
        Ok(())
    }

    fn disconnect(&self, card: CardSession<Card>, reset: bool) -> Result<(), TransportError> {
        let disposition = if reset {
            Disposition::ResetCard
        } else {
            Disposition::LeaveCard
        };
        debug!(reader = %card.reader(), session = card.id(), reset, "Disconnecting card");
        card.into_connection()
            .disconnect(disposition)
            .map_err(|(_, e)| PcscError::from(e))?;
        Ok(())
    }
}

fn reader_name(reader: &ReaderHandle) -> Result<CString, PcscError> {
    CString::new(reader.id()).map_err(|_| PcscError::InvalidReaderName(reader.id().to_owned()))
}

const fn protocol_from(protocol: Option<pcsc::Protocol>) -> Protocol {
    match protocol {
        Some(pcsc::Protocol::T0) => Protocol::T0,
        Some(pcsc::Protocol::T1) => Protocol::T1,
        Some(pcsc::Protocol::RAW) => Protocol::Raw,
        None => Protocol::Unknown,
    }
}
