//! Per-reader card presence state machine
//!
//! ```text
//! Idle -> WaitingForCard -> CardPresent -> Connected -> WaitingForRemoval
//!              ^                 |                            |
//!              +-----------------+ (card gone at connect)     |
//!              +----------------------------------------------+
//! ```
//!
//! Any unrecoverable transport fault moves the session to `Error`, which is
//! terminal. Cancellation disconnects a live card and moves to `Closed`.

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use cardwatch_core::prelude::*;
use cardwatch_core::registry::GET_UID;
use tracing::{debug, error, info, instrument, warn};

use crate::cancel::CancelToken;
use crate::config::SessionConfig;
use crate::error::SessionError;
use crate::event::{EventSender, SessionEvent};

/// State of a [`ReaderSession`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ReaderSessionState {
    /// Created, not polling yet
    Idle,
    /// Polling for an inserted card
    WaitingForCard,
    /// Card detected, not connected
    CardPresent,
    /// Card connected, commands may be exchanged
    Connected,
    /// Card released, polling for its removal
    WaitingForRemoval,
    /// Unrecoverable fault
    Error,
    /// Cancelled and torn down
    Closed,
}

impl ReaderSessionState {
    /// Whether the session will never leave this state
    pub const fn is_terminal(self) -> bool {
        matches!(self, Self::Error | Self::Closed)
    }
}

impl fmt::Display for ReaderSessionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Idle => "idle",
            Self::WaitingForCard => "waiting for card",
            Self::CardPresent => "card present",
            Self::Connected => "connected",
            Self::WaitingForRemoval => "waiting for removal",
            Self::Error => "error",
            Self::Closed => "closed",
        })
    }
}

/// A presence or absence poll detached from its session
pub(crate) struct PendingPoll<T: ReaderTransport> {
    transport: Arc<T>,
    reader: ReaderHandle,
    timeout: Duration,
    state: ReaderSessionState,
}

impl<T: ReaderTransport> PendingPoll<T> {
    /// Block in the transport for up to the poll timeout
    pub(crate) fn run(&self) -> Result<bool, TransportError> {
        match self.state {
            ReaderSessionState::WaitingForCard => {
                self.transport.wait_present(&self.reader, self.timeout)
            }
            _ => self.transport.wait_absent(&self.reader, self.timeout),
        }
    }
}

/// Card presence tracking and command access for one reader
pub struct ReaderSession<T: ReaderTransport> {
    reader: ReaderHandle,
    transport: Arc<T>,
    registry: Arc<CommandRegistry>,
    config: SessionConfig,
    engine: ExchangeEngine,
    state: ReaderSessionState,
    card: Option<CardSession<T::Connection>>,
    identity: Option<CardIdentity>,
    cancel: CancelToken,
    events: Option<EventSender>,
}

impl<T: ReaderTransport> ReaderSession<T> {
    /// Create an idle session for a reader
    pub fn new(
        reader: ReaderHandle,
        transport: Arc<T>,
        registry: Arc<CommandRegistry>,
        config: SessionConfig,
    ) -> Self {
        Self {
            reader,
            transport,
            registry,
            engine: ExchangeEngine::new(config.exchange),
            config,
            state: ReaderSessionState::Idle,
            card: None,
            identity: None,
            cancel: CancelToken::new(),
            events: None,
        }
    }

    /// Report transitions and card events to a channel
    pub fn with_events(mut self, events: EventSender) -> Self {
        self.events = Some(events);
        self
    }

    /// Observe an externally owned cancellation flag
    pub fn with_cancel_token(mut self, cancel: CancelToken) -> Self {
        self.cancel = cancel;
        self
    }

    /// Reader this session drives
    pub const fn reader(&self) -> &ReaderHandle {
        &self.reader
    }

    /// Current state
    pub const fn state(&self) -> ReaderSessionState {
        self.state
    }

    /// Connected card, if any
    pub const fn card(&self) -> Option<&CardSession<T::Connection>> {
        self.card.as_ref()
    }

    /// Identity of the current card once probed
    pub const fn identity(&self) -> Option<&CardIdentity> {
        self.identity.as_ref()
    }

    /// Clone of the session's cancellation flag
    pub fn cancel_token(&self) -> CancelToken {
        self.cancel.clone()
    }

    /// Request cancellation; takes effect at the next [`step`](Self::step)
    pub fn cancel(&self) {
        self.cancel.cancel();
    }

    /// Perform one transition attempt
    ///
    /// Recoverable failures are returned as errors while the session moves
    /// on; check [`state`](Self::state) to tell them apart from faults.
    #[instrument(level = "debug", skip(self), fields(reader = %self.reader, state = %self.state))]
    pub fn step(&mut self) -> Result<ReaderSessionState, SessionError> {
        if self.cancel.is_cancelled() {
            self.close();
            return Err(SessionError::Cancelled);
        }

        match self.state {
            ReaderSessionState::Idle => self.transition(ReaderSessionState::WaitingForCard),
            ReaderSessionState::WaitingForCard => self.poll_present()?,
            ReaderSessionState::CardPresent => self.connect()?,
            ReaderSessionState::Connected => {
                if self.config.auto_probe {
                    if let Err(e) = self.probe_uid() {
                        if self.state != ReaderSessionState::Connected {
                            return Err(e);
                        }
                        warn!(reader = %self.reader, error = %e, "UID probe failed");
                    }
                }
                self.release()?;
            }
            ReaderSessionState::WaitingForRemoval => self.poll_absent()?,
            ReaderSessionState::Error => return Err(SessionError::Faulted),
            ReaderSessionState::Closed => return Err(SessionError::Cancelled),
        }

        Ok(self.state)
    }

    /// Send a command to the connected card
    pub fn exchange(&mut self, command: &CommandApdu) -> Result<Response, SessionError> {
        let card = match (self.state, self.card.as_mut()) {
            (ReaderSessionState::Connected, Some(card)) => card,
            _ => return Err(SessionError::NotConnected(self.state)),
        };

        let error = match self.engine.exchange(&*self.transport, card, command) {
            Ok(response) => return Ok(response),
            Err(e) => e,
        };

        match error.transport().cloned() {
            Some(source) if source.is_card_gone() => {
                warn!(reader = %self.reader, "Card removed during exchange");
                self.drop_card();
                self.transition(ReaderSessionState::WaitingForRemoval);
                Err(error.into())
            }
            Some(source) if source.is_transient() => {
                warn!(reader = %self.reader, error = %error, "Exchange failed, card stays connected");
                Err(error.into())
            }
            // reader level fault
            Some(_) => Err(self.fault(error.into())),
            None => Err(error.into()),
        }
    }

    /// Render a registry command by name and send it
    pub fn execute(&mut self, name: &str, params: &Parameters) -> Result<Response, SessionError> {
        let command = self.registry.render(name, params)?;
        debug!(reader = %self.reader, name, command = %command, "Executing registry command");
        self.exchange(&command)
    }

    /// Read the card UID with GET UID
    pub fn probe_uid(&mut self) -> Result<CardIdentity, SessionError> {
        let definition = self
            .registry
            .lookup(GET_UID)
            .ok_or_else(|| RegistryError::UnknownCommand(GET_UID.to_string()))?;
        let success = definition.success();
        let command = definition.render(&Parameters::new())?;

        let response = self.exchange(&command)?;
        if !success.matches(response.status()) {
            return Err(SessionError::UidProbeFailed(response.status()));
        }

        let identity = CardIdentity::from_uid(response.into_payload());
        info!(
            reader = %self.reader,
            uid = %hex::encode_upper(identity.uid()),
            serial = %identity.serial(),
            "Card identified"
        );
        self.emit(SessionEvent::CardIdentified {
            reader: self.reader.clone(),
            uid: identity.uid().clone(),
            serial: identity.serial(),
        });
        self.identity = Some(identity.clone());
        Ok(identity)
    }

    /// Disconnect the card and start waiting for its removal
    pub fn release(&mut self) -> Result<(), SessionError> {
        if self.state != ReaderSessionState::Connected {
            return Err(SessionError::NotConnected(self.state));
        }

        if let Some(card) = self.card.take() {
            debug!(reader = %self.reader, session = card.id(), "Disconnecting card");
            match self.transport.disconnect(card, self.config.reset_on_disconnect) {
                Ok(()) => {}
                Err(e) if e.is_card_gone() => {
                    debug!(reader = %self.reader, "Card already gone at disconnect");
                }
                Err(e) => return Err(self.fault(e.into())),
            }
        }

        self.transition(ReaderSessionState::WaitingForRemoval);
        Ok(())
    }

    /// Disconnect any live card and enter `Closed`
    pub fn close(&mut self) {
        if self.state == ReaderSessionState::Closed {
            return;
        }
        self.cancel.cancel();
        self.drop_card();
        info!(reader = %self.reader, "Session closed");
        self.transition(ReaderSessionState::Closed);
    }

    /// Take the poll the current state is waiting on, if any
    ///
    /// The returned poll borrows nothing from the session, so a caller
    /// holding the session behind a lock can run it unlocked and hand the
    /// outcome back through [`complete_poll`](Self::complete_poll).
    pub(crate) fn pending_poll(&self) -> Option<PendingPoll<T>> {
        if self.cancel.is_cancelled() {
            return None;
        }
        matches!(
            self.state,
            ReaderSessionState::WaitingForCard | ReaderSessionState::WaitingForRemoval
        )
        .then(|| PendingPoll {
            transport: Arc::clone(&self.transport),
            reader: self.reader.clone(),
            timeout: self.config.poll_timeout,
            state: self.state,
        })
    }

    /// Apply the outcome of a poll taken with [`pending_poll`](Self::pending_poll)
    pub(crate) fn complete_poll(
        &mut self,
        poll: PendingPoll<T>,
        outcome: Result<bool, TransportError>,
    ) -> Result<ReaderSessionState, SessionError> {
        if self.cancel.is_cancelled() {
            self.close();
            return Err(SessionError::Cancelled);
        }
        if self.state != poll.state {
            debug!(reader = %self.reader, state = %self.state, "Discarding stale poll result");
            return Ok(self.state);
        }

        match poll.state {
            ReaderSessionState::WaitingForCard => self.apply_presence(outcome)?,
            _ => self.apply_absence(outcome)?,
        }
        Ok(self.state)
    }

    fn poll_present(&mut self) -> Result<(), SessionError> {
        let outcome = self.transport.wait_present(&self.reader, self.config.poll_timeout);
        self.apply_presence(outcome)
    }

    fn apply_presence(&mut self, outcome: Result<bool, TransportError>) -> Result<(), SessionError> {
        match outcome {
            Ok(true) => {
                self.transition(ReaderSessionState::CardPresent);
                Ok(())
            }
            Ok(false) => Ok(()),
            Err(e) => Err(self.fault(self.vanished_or(e))),
        }
    }

    fn connect(&mut self) -> Result<(), SessionError> {
        match self.transport.connect(&self.reader, self.config.protocol) {
            Ok(card) => {
                info!(
                    reader = %self.reader,
                    session = card.id(),
                    protocol = %card.protocol(),
                    atr = %hex::encode_upper(card.atr()),
                    "Card connected"
                );
                self.emit(SessionEvent::CardInserted {
                    reader: self.reader.clone(),
                    atr: card.atr().clone(),
                    protocol: card.protocol(),
                });
                self.identity = None;
                self.card = Some(card);
                self.transition(ReaderSessionState::Connected);
                Ok(())
            }
            Err(e) if e.is_card_gone() => {
                warn!(reader = %self.reader, error = %e, "Card gone before connect");
                self.transition(ReaderSessionState::WaitingForCard);
                Err(SessionError::ConnectFailed {
                    reader: self.reader.to_string(),
                    source: e,
                })
            }
            Err(e) => Err(self.fault(self.vanished_or(e))),
        }
    }

    fn poll_absent(&mut self) -> Result<(), SessionError> {
        let outcome = self.transport.wait_absent(&self.reader, self.config.poll_timeout);
        self.apply_absence(outcome)
    }

    fn apply_absence(&mut self, outcome: Result<bool, TransportError>) -> Result<(), SessionError> {
        match outcome {
            Ok(true) => {
                let attached = match self.transport.is_attached(&self.reader) {
                    Ok(attached) => attached,
                    Err(e) => return Err(self.fault(e.into())),
                };
                if !attached {
                    return Err(self.fault(SessionError::ReaderVanished(self.reader.to_string())));
                }
                info!(reader = %self.reader, "Card removed");
                self.emit(SessionEvent::CardRemoved {
                    reader: self.reader.clone(),
                });
                self.identity = None;
                self.transition(ReaderSessionState::WaitingForCard);
                Ok(())
            }
            Ok(false) => Ok(()),
            Err(e) => Err(self.fault(self.vanished_or(e))),
        }
    }

    fn vanished_or(&self, error: TransportError) -> SessionError {
        match error {
            TransportError::ReaderUnavailable(_) => {
                SessionError::ReaderVanished(self.reader.to_string())
            }
            other => other.into(),
        }
    }

    fn fault(&mut self, error: SessionError) -> SessionError {
        error!(reader = %self.reader, error = %error, "Session fault");
        self.drop_card();
        self.transition(ReaderSessionState::Error);
        error
    }

    fn drop_card(&mut self) {
        if let Some(card) = self.card.take() {
            let session = card.id();
            if let Err(e) = self.transport.disconnect(card, self.config.reset_on_disconnect) {
                debug!(reader = %self.reader, session, error = %e, "Disconnect after fault failed");
            }
        }
    }

    fn transition(&mut self, to: ReaderSessionState) {
        let from = self.state;
        if from == to {
            return;
        }
        debug!(reader = %self.reader, %from, %to, "State transition");
        self.state = to;
        self.emit(SessionEvent::StateChanged {
            reader: self.reader.clone(),
            from,
            to,
        });
    }

    fn emit(&self, event: SessionEvent) {
        if let Some(events) = &self.events {
            // receiver gone means nobody is listening
            let _ = events.send(event);
        }
    }
}

impl<T: ReaderTransport> Drop for ReaderSession<T> {
    fn drop(&mut self) {
        self.drop_card();
    }
}

impl<T: ReaderTransport> fmt::Debug for ReaderSession<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ReaderSession")
            .field("reader", &self.reader.name())
            .field("state", &self.state)
            .field("card", &self.card)
            .field("identity", &self.identity)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use cardwatch_core::transport::mock::MockTransport;

    use super::*;
    use crate::event::event_channel;

    const READER: &str = "ACS ACR122U PICC Interface 00 00";

    fn session(transport: &Arc<MockTransport>) -> ReaderSession<MockTransport> {
        ReaderSession::new(
            ReaderHandle::new(READER),
            Arc::clone(transport),
            Arc::new(CommandRegistry::builtin().clone()),
            SessionConfig::new().with_poll_timeout(Duration::from_millis(1)),
        )
    }

    fn mock() -> Arc<MockTransport> {
        Arc::new(MockTransport::with_readers([READER]))
    }

    fn connected(transport: &Arc<MockTransport>) -> ReaderSession<MockTransport> {
        let mut session = session(transport);
        transport.push_presence(Ok(true));
        session.step().unwrap();
        session.step().unwrap();
        assert_eq!(session.step().unwrap(), ReaderSessionState::Connected);
        session
    }

    #[test]
    fn test_starts_idle_then_waits() {
        let transport = mock();
        let mut session = session(&transport);
        assert_eq!(session.state(), ReaderSessionState::Idle);
        assert_eq!(session.step().unwrap(), ReaderSessionState::WaitingForCard);
        assert_eq!(transport.presence_polls(), 0);
    }

    #[test]
    fn test_poll_timeouts_never_connect() {
        let transport = mock();
        let mut session = session(&transport);
        session.step().unwrap();

        for _ in 0..25 {
            assert_eq!(session.step().unwrap(), ReaderSessionState::WaitingForCard);
        }
        assert_eq!(transport.presence_polls(), 25);
        assert_eq!(transport.connect_calls(), 0);
        assert!(session.card().is_none());
    }

    #[test]
    fn test_full_card_cycle() {
        let transport = mock();
        let (tx, rx) = event_channel();
        let mut session = session(&transport).with_events(tx);

        transport.push_presence(Ok(true));
        transport.push_response([0x04, 0x1A, 0x2B, 0x3C, 0x90, 0x00]);
        transport.push_absence(Ok(false));

        assert_eq!(session.step().unwrap(), ReaderSessionState::WaitingForCard);
        assert_eq!(session.step().unwrap(), ReaderSessionState::CardPresent);
        assert_eq!(session.step().unwrap(), ReaderSessionState::Connected);
        let card_id = session.card().unwrap().id();

        assert_eq!(session.step().unwrap(), ReaderSessionState::WaitingForRemoval);
        assert_eq!(
            transport.transmitted()[0].as_ref(),
            &[0xFF, 0xCA, 0x00, 0x00, 0x00]
        );
        assert_eq!(session.identity().unwrap().serial().value(), 1009313284);
        assert_eq!(transport.disconnects(), vec![(card_id, true)]);
        assert!(session.card().is_none());

        // still present after one poll
        assert_eq!(session.step().unwrap(), ReaderSessionState::WaitingForRemoval);
        assert_eq!(session.step().unwrap(), ReaderSessionState::WaitingForCard);
        assert!(session.identity().is_none());

        let events: Vec<_> = rx.try_iter().collect();
        assert!(events.iter().any(|e| matches!(e, SessionEvent::CardInserted { .. })));
        assert!(events.iter().any(|e| matches!(
            e,
            SessionEvent::CardIdentified { serial, .. } if serial.value() == 1009313284
        )));
        assert!(matches!(events.last(), Some(SessionEvent::StateChanged {
            to: ReaderSessionState::WaitingForCard,
            ..
        })));
        assert!(events.iter().any(|e| matches!(e, SessionEvent::CardRemoved { .. })));
    }

    #[test]
    fn test_consecutive_insertions_have_one_live_card() {
        let transport = mock();
        let mut session = session(&transport);
        let mut ids = Vec::new();

        for _ in 0..2 {
            transport.push_presence(Ok(true));
            transport.push_response([0x01, 0x02, 0x03, 0x04, 0x90, 0x00]);
            while session.state() != ReaderSessionState::Connected {
                session.step().unwrap();
            }
            ids.push(session.card().unwrap().id());
            assert_eq!(transport.live_sessions(), 1);

            // second presence while connected must not connect again
            transport.push_presence(Ok(true));
            session.step().unwrap();
            session.step().unwrap();
            assert_eq!(session.state(), ReaderSessionState::WaitingForCard);
        }

        assert_ne!(ids[0], ids[1]);
        assert_eq!(transport.max_live_sessions(), 1);
        assert_eq!(transport.connect_calls(), 2);
    }

    #[test]
    fn test_card_gone_at_connect_is_recoverable() {
        let transport = mock();
        let mut session = session(&transport);
        transport.push_presence(Ok(true));
        transport.push_connect(Err(TransportError::NoCard));

        session.step().unwrap();
        session.step().unwrap();
        let err = session.step().unwrap_err();

        assert!(matches!(err, SessionError::ConnectFailed { .. }));
        assert!(err.is_recoverable());
        assert_eq!(session.state(), ReaderSessionState::WaitingForCard);
    }

    #[test]
    fn test_reader_vanishing_during_removal_wait_is_fatal() {
        let transport = mock();
        let mut session = connected(&transport);
        transport.push_response([0x01, 0x90, 0x00]);
        session.step().unwrap();
        assert_eq!(session.state(), ReaderSessionState::WaitingForRemoval);

        transport.set_readers(Vec::<String>::new());
        let err = session.step().unwrap_err();
        assert_eq!(err, SessionError::ReaderVanished(READER.to_string()));
        assert_eq!(session.state(), ReaderSessionState::Error);
        assert_eq!(session.step().unwrap_err(), SessionError::Faulted);
    }

    #[test]
    fn test_reader_gone_after_absence_is_fatal() {
        let transport = mock();
        let mut session = connected(&transport);
        transport.push_response([0x01, 0x90, 0x00]);
        session.step().unwrap();

        // absence reported, then the reader is missing from enumeration
        transport.push_list_error(TransportError::ReaderUnavailable("service stopped".into()));
        assert!(session.step().is_err());
        assert_eq!(session.state(), ReaderSessionState::Error);
    }

    #[test]
    fn test_exchange_requires_connection() {
        let transport = mock();
        let mut session = session(&transport);
        let err = session
            .exchange(&CommandApdu::new_with_le(0xFF, 0xCA, 0x00, 0x00, 0x00))
            .unwrap_err();
        assert_eq!(err, SessionError::NotConnected(ReaderSessionState::Idle));
        assert!(transport.transmitted().is_empty());
    }

    #[test]
    fn test_execute_renders_registry_command() {
        let transport = mock();
        let mut session = connected(&transport);
        transport.push_response([0x6F, 0x00, 0x90, 0x00]);

        let response = session
            .execute("select", &Parameters::new().with_data([0xA0, 0x00, 0x00, 0x00, 0x03]))
            .unwrap();

        assert!(response.is_success());
        assert_eq!(
            transport.transmitted()[0].as_ref(),
            &[0x00, 0xA4, 0x04, 0x00, 0x05, 0xA0, 0x00, 0x00, 0x00, 0x03, 0x00]
        );
    }

    #[test]
    fn test_reader_fault_during_exchange_is_fatal() {
        let transport = mock();
        let mut session = connected(&transport);
        transport.push_transmit_error(TransportError::ReaderUnavailable(READER.into()));

        let err = session.probe_uid().unwrap_err();
        assert!(matches!(err, SessionError::Exchange(_)));
        assert_eq!(session.state(), ReaderSessionState::Error);
        assert_eq!(transport.live_sessions(), 0);
    }

    #[test]
    fn test_exhausted_io_retries_keep_card_connected() {
        let transport = mock();
        let mut session = connected(&transport);
        transport.push_transmit_error(TransportError::io("CRC error"));
        transport.push_transmit_error(TransportError::io("CRC error"));

        let err = session.probe_uid().unwrap_err();
        assert!(matches!(
            err,
            SessionError::Exchange(ExchangeError::ExchangeFailed { attempts: 2, .. })
        ));
        assert!(err.is_recoverable());
        assert_eq!(session.state(), ReaderSessionState::Connected);
        assert_eq!(transport.live_sessions(), 1);
        assert!(transport.disconnects().is_empty());

        transport.push_response([0x04, 0x1A, 0x2B, 0x3C, 0x90, 0x00]);
        assert_eq!(session.probe_uid().unwrap().serial().value(), 1009313284);
    }

    #[test]
    fn test_card_removed_during_exchange() {
        let transport = mock();
        let mut session = connected(&transport);
        transport.push_transmit_error(TransportError::CardRemoved);

        assert!(session.probe_uid().is_err());
        assert_eq!(session.state(), ReaderSessionState::WaitingForRemoval);
        assert_eq!(transport.live_sessions(), 0);
    }

    #[test]
    fn test_failed_probe_still_releases() {
        let transport = mock();
        let mut session = connected(&transport);
        transport.push_response([0x6A, 0x81]);

        assert_eq!(session.step().unwrap(), ReaderSessionState::WaitingForRemoval);
        assert!(session.identity().is_none());
        assert_eq!(transport.disconnects().len(), 1);
    }

    #[test]
    fn test_probe_reports_status() {
        let transport = mock();
        let mut session = connected(&transport);
        transport.push_response([0x6A, 0x81]);

        assert_eq!(
            session.probe_uid().unwrap_err(),
            SessionError::UidProbeFailed(status::FUNCTION_NOT_SUPPORTED)
        );
        assert_eq!(session.state(), ReaderSessionState::Connected);
    }

    #[test]
    fn test_cancel_closes_live_card() {
        let transport = mock();
        let mut session = connected(&transport);
        session.cancel();

        assert_eq!(session.step().unwrap_err(), SessionError::Cancelled);
        assert_eq!(session.state(), ReaderSessionState::Closed);
        assert_eq!(transport.live_sessions(), 0);
        assert_eq!(session.step().unwrap_err(), SessionError::Cancelled);
    }

    #[test]
    fn test_detached_poll_drives_transitions() {
        let transport = mock();
        let mut session = session(&transport);
        assert!(session.pending_poll().is_none());
        session.step().unwrap();

        transport.push_presence(Ok(true));
        let poll = session.pending_poll().unwrap();
        let outcome = poll.run();
        assert_eq!(
            session.complete_poll(poll, outcome).unwrap(),
            ReaderSessionState::CardPresent
        );
        assert!(session.pending_poll().is_none());
    }

    #[test]
    fn test_close_while_polling_discards_result() {
        let transport = mock();
        let mut session = session(&transport);
        session.step().unwrap();

        let poll = session.pending_poll().unwrap();
        session.close();
        transport.push_presence(Ok(true));
        let outcome = poll.run();

        assert_eq!(
            session.complete_poll(poll, outcome).unwrap_err(),
            SessionError::Cancelled
        );
        assert_eq!(session.state(), ReaderSessionState::Closed);
        assert_eq!(transport.connect_calls(), 0);
        assert!(session.pending_poll().is_none());
    }

    #[test]
    fn test_no_reset_on_disconnect() {
        let transport = mock();
        let mut session = ReaderSession::new(
            ReaderHandle::new(READER),
            Arc::clone(&transport),
            Arc::new(CommandRegistry::builtin().clone()),
            SessionConfig::new()
                .with_auto_probe(false)
                .with_reset_on_disconnect(false),
        );
        transport.push_presence(Ok(true));
        while session.state() != ReaderSessionState::Connected {
            session.step().unwrap();
        }
        session.release().unwrap();

        assert!(transport.transmitted().is_empty());
        assert!(!transport.disconnects()[0].1);
        assert_eq!(
            session.release().unwrap_err(),
            SessionError::NotConnected(ReaderSessionState::WaitingForRemoval)
        );
    }
}
