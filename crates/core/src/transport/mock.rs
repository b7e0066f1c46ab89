//! Scripted in-memory transport
//!
//! Every queue is consumed front to back. When a queue runs dry the mock
//! falls back to a quiet default: presence polls time out after a short
//! nap, absence polls report an empty reader, connects succeed with T=1 and
//! transmits fail with an I/O fault. With blocking polls enabled an
//! unscripted presence poll instead waits out its whole timeout unless
//! [`interrupt`](ReaderTransport::interrupt) wakes it.

use std::collections::VecDeque;
use std::thread;
use std::time::{Duration, Instant};

use bytes::Bytes;
use parking_lot::{Condvar, Mutex};

use super::{CardSession, Protocol, ProtocolPreference, ReaderHandle, ReaderTransport, TransportError};

/// Longest a default presence poll sleeps
const IDLE_POLL: Duration = Duration::from_millis(10);

/// ATR of a contactless MIFARE Classic 1K as reported by PC/SC readers
pub const MIFARE_CLASSIC_ATR: &[u8] = &[
    0x3B, 0x8F, 0x80, 0x01, 0x80, 0x4F, 0x0C, 0xA0, 0x00, 0x00, 0x03, 0x06, 0x03, 0x00, 0x01, 0x00,
    0x00, 0x00, 0x00, 0x6A,
];

/// Connection handle handed out by [`MockTransport`]
#[derive(Debug)]
pub struct MockConnection {
    /// Sequence number of the connect that produced it
    pub serial: usize,
}

#[derive(Debug, Default)]
struct MockState {
    readers: Vec<ReaderHandle>,
    list_errors: VecDeque<TransportError>,
    presence: VecDeque<Result<bool, TransportError>>,
    absence: VecDeque<Result<bool, TransportError>>,
    connects: VecDeque<Result<(Protocol, Bytes), TransportError>>,
    responses: VecDeque<Result<Bytes, TransportError>>,
    blocking_polls: bool,

    interrupts: usize,
    presence_polls: usize,
    absence_polls: usize,
    connect_calls: usize,
    transmitted: Vec<Bytes>,
    disconnects: Vec<(u64, bool)>,
    live: usize,
    max_live: usize,
}

/// Scripted [`ReaderTransport`] recording every call
#[derive(Debug, Default)]
pub struct MockTransport {
    state: Mutex<MockState>,
    wake: Condvar,
}

impl MockTransport {
    /// A transport with no readers
    pub fn new() -> Self {
        Self::default()
    }

    /// A transport with the given readers attached
    pub fn with_readers<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mock = Self::new();
        mock.set_readers(names);
        mock
    }

    /// Let unscripted presence polls block for their full timeout
    pub fn with_blocking_polls(self) -> Self {
        self.state.lock().blocking_polls = true;
        self
    }

    /// Replace the set of attached readers
    pub fn set_readers<I, S>(&self, names: I)
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        self.state.lock().readers = names.into_iter().map(ReaderHandle::new).collect();
    }

    /// Fail the next enumeration
    pub fn push_list_error(&self, error: TransportError) {
        self.state.lock().list_errors.push_back(error);
    }

    /// Script the next presence poll
    pub fn push_presence(&self, result: Result<bool, TransportError>) {
        self.state.lock().presence.push_back(result);
    }

    /// Script the next absence poll
    pub fn push_absence(&self, result: Result<bool, TransportError>) {
        self.state.lock().absence.push_back(result);
    }

    /// Script the next connect
    pub fn push_connect(&self, result: Result<(Protocol, Bytes), TransportError>) {
        self.state.lock().connects.push_back(result);
    }

    /// Script the next transmit with raw response bytes
    pub fn push_response(&self, response: impl AsRef<[u8]>) {
        let response = Bytes::copy_from_slice(response.as_ref());
        self.state.lock().responses.push_back(Ok(response));
    }

    /// Script the next transmit to fail
    pub fn push_transmit_error(&self, error: TransportError) {
        self.state.lock().responses.push_back(Err(error));
    }

    /// Number of interrupt calls so far
    pub fn interrupts(&self) -> usize {
        self.state.lock().interrupts
    }

    /// Number of presence polls so far
    pub fn presence_polls(&self) -> usize {
        self.state.lock().presence_polls
    }

    /// Number of absence polls so far
    pub fn absence_polls(&self) -> usize {
        self.state.lock().absence_polls
    }

    /// Number of connect calls so far, successful or not
    pub fn connect_calls(&self) -> usize {
        self.state.lock().connect_calls
    }

    /// Every command passed to transmit, in order
    pub fn transmitted(&self) -> Vec<Bytes> {
        self.state.lock().transmitted.clone()
    }

    /// Every disconnect as `(session id, reset)`
    pub fn disconnects(&self) -> Vec<(u64, bool)> {
        self.state.lock().disconnects.clone()
    }

    /// Card sessions currently connected
    pub fn live_sessions(&self) -> usize {
        self.state.lock().live
    }

    /// Highest number of simultaneously connected card sessions
    pub fn max_live_sessions(&self) -> usize {
        self.state.lock().max_live
    }

    fn check_reader(state: &MockState, reader: &ReaderHandle) -> Result<(), TransportError> {
        if state.readers.contains(reader) {
            Ok(())
        } else {
            Err(TransportError::ReaderUnavailable(reader.name().to_string()))
        }
    }
}

impl ReaderTransport for MockTransport {
    type Connection = MockConnection;

    fn list_readers(&self) -> Result<Vec<ReaderHandle>, TransportError> {
        let mut state = self.state.lock();
        match state.list_errors.pop_front() {
            Some(error) => Err(error),
            None => Ok(state.readers.clone()),
        }
    }

    fn wait_present(
        &self,
        reader: &ReaderHandle,
        timeout: Duration,
    ) -> Result<bool, TransportError> {
        let mut state = self.state.lock();
        state.presence_polls += 1;
        Self::check_reader(&state, reader)?;
        if let Some(scripted) = state.presence.pop_front() {
            return scripted;
        }

        if !state.blocking_polls {
            drop(state);
            thread::sleep(timeout.min(IDLE_POLL));
            return Ok(false);
        }

        let generation = state.interrupts;
        let deadline = Instant::now() + timeout;
        while state.interrupts == generation {
            if self.wake.wait_until(&mut state, deadline).timed_out() {
                break;
            }
        }
        Ok(false)
    }

    fn wait_absent(&self, reader: &ReaderHandle, _timeout: Duration) -> Result<bool, TransportError> {
        let mut state = self.state.lock();
        state.absence_polls += 1;
        Self::check_reader(&state, reader)?;
        state.absence.pop_front().unwrap_or(Ok(true))
    }

    fn connect(
        &self,
        reader: &ReaderHandle,
        _preference: ProtocolPreference,
    ) -> Result<CardSession<MockConnection>, TransportError> {
        let mut state = self.state.lock();
        state.connect_calls += 1;
        Self::check_reader(&state, reader)?;

        let (protocol, atr) = state
            .connects
            .pop_front()
            .unwrap_or_else(|| Ok((Protocol::T1, Bytes::from_static(MIFARE_CLASSIC_ATR))))?;

        state.live += 1;
        state.max_live = state.max_live.max(state.live);
        let connection = MockConnection {
            serial: state.connect_calls,
        };
        Ok(CardSession::new(reader.clone(), connection, protocol, atr))
    }

    fn do_transmit(
        &self,
        _card: &mut CardSession<MockConnection>,
        command: &[u8],
    ) -> Result<Bytes, TransportError> {
        let mut state = self.state.lock();
        state.transmitted.push(Bytes::copy_from_slice(command));
        state
            .responses
            .pop_front()
            .unwrap_or_else(|| Err(TransportError::io("no scripted response")))
    }

    fn interrupt(&self) -> Result<(), TransportError> {
        self.state.lock().interrupts += 1;
        self.wake.notify_all();
        Ok(())
    }

    fn disconnect(
        &self,
        card: CardSession<MockConnection>,
        reset: bool,
    ) -> Result<(), TransportError> {
        let mut state = self.state.lock();
        state.live = state.live.saturating_sub(1);
        state.disconnects.push((card.id(), reset));
        Ok(())
    }
}
