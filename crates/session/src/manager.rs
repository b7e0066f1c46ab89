//! Session manager: one session per attached reader, supervised
//!
//! The manager is the only writer of the session set. [`SessionManager::run`]
//! keeps the set in sync with enumeration and drives every session from its
//! own worker thread; a worker that faults reports [`SessionEvent::SessionFailed`]
//! and exits without affecting the manager or the other workers.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

use cardwatch_core::{CommandRegistry, ReaderHandle, ReaderTransport};
use parking_lot::{Mutex, MutexGuard};
use tracing::{debug, error, info, warn};

use crate::cancel::CancelToken;
use crate::config::SessionConfig;
use crate::error::SessionError;
use crate::event::{EventReceiver, EventSender, SessionEvent, event_channel};
use crate::session::{ReaderSession, ReaderSessionState};

/// Pause between transport interrupts while joining workers
const INTERRUPT_INTERVAL: Duration = Duration::from_millis(20);

/// A reader session shared between the manager, its worker and callers
///
/// Workers release the lock while blocked in a presence or absence poll, so
/// locking a supervised session waits at most for one transition. Card
/// commands are best issued from a [`CardHandler`], which runs while the
/// card is still connected.
pub type SharedSession<T> = Arc<Mutex<ReaderSession<T>>>;

/// Work done while a card is connected, before the session releases it
pub trait CardHandler<T: ReaderTransport> {
    /// Called once per connected card
    fn on_card(&mut self, session: &mut ReaderSession<T>) -> Result<(), SessionError>;
}

impl<T, F> CardHandler<T> for F
where
    T: ReaderTransport,
    F: FnMut(&mut ReaderSession<T>) -> Result<(), SessionError>,
{
    fn on_card(&mut self, session: &mut ReaderSession<T>) -> Result<(), SessionError> {
        self(session)
    }
}

/// Handler that leaves the card to the automatic UID probe
#[derive(Debug, Clone, Copy, Default)]
pub struct ProbeOnly;

impl<T: ReaderTransport> CardHandler<T> for ProbeOnly {
    fn on_card(&mut self, _session: &mut ReaderSession<T>) -> Result<(), SessionError> {
        Ok(())
    }
}

#[derive(Debug)]
struct Entry<T: ReaderTransport> {
    session: SharedSession<T>,
    cancel: CancelToken,
    worker: Option<JoinHandle<()>>,
}

/// Owns the reader sessions of one transport
pub struct SessionManager<T: ReaderTransport> {
    transport: Arc<T>,
    registry: Arc<CommandRegistry>,
    config: SessionConfig,
    sessions: HashMap<ReaderHandle, Entry<T>>,
    retired: Vec<JoinHandle<()>>,
    events_tx: EventSender,
    events_rx: EventReceiver,
}

impl<T: ReaderTransport + 'static> SessionManager<T> {
    /// Create a manager using the builtin command registry
    pub fn new(transport: T, config: SessionConfig) -> Self {
        Self::with_shared_transport(Arc::new(transport), config)
    }

    /// Create a manager over a transport shared with other owners
    pub fn with_shared_transport(transport: Arc<T>, config: SessionConfig) -> Self {
        let (events_tx, events_rx) = event_channel();
        Self {
            transport,
            registry: Arc::new(CommandRegistry::builtin().clone()),
            config,
            sessions: HashMap::new(),
            retired: Vec::new(),
            events_tx,
            events_rx,
        }
    }

    /// Use a custom command registry for sessions created from now on
    pub fn with_registry(mut self, registry: CommandRegistry) -> Self {
        self.registry = Arc::new(registry);
        self
    }

    /// Underlying transport
    pub const fn transport(&self) -> &Arc<T> {
        &self.transport
    }

    /// Active configuration
    pub const fn config(&self) -> &SessionConfig {
        &self.config
    }

    /// Receiver for events of the manager and all its sessions
    pub fn events(&self) -> EventReceiver {
        self.events_rx.clone()
    }

    /// List attached readers
    pub fn enumerate(&self) -> Result<Vec<ReaderHandle>, SessionError> {
        let readers = self.transport.list_readers()?;
        if readers.is_empty() {
            return Err(SessionError::NoReaderFound);
        }
        debug!(count = readers.len(), "Enumerated readers");
        Ok(readers)
    }

    /// Get the session of a reader, creating it if needed
    pub fn session_for(&mut self, reader: &ReaderHandle) -> SharedSession<T> {
        if let Some(entry) = self.sessions.get(reader) {
            return Arc::clone(&entry.session);
        }

        let cancel = CancelToken::new();
        let session = ReaderSession::new(
            reader.clone(),
            Arc::clone(&self.transport),
            Arc::clone(&self.registry),
            self.config,
        )
        .with_events(self.events_tx.clone())
        .with_cancel_token(cancel.clone());
        let session = Arc::new(Mutex::new(session));

        debug!(reader = %reader, "Created reader session");
        self.sessions.insert(
            reader.clone(),
            Entry {
                session: Arc::clone(&session),
                cancel,
                worker: None,
            },
        );
        session
    }

    /// Session of a reader, if one exists
    pub fn session(&self, reader: &ReaderHandle) -> Option<SharedSession<T>> {
        self.sessions.get(reader).map(|entry| Arc::clone(&entry.session))
    }

    /// Readers that currently have a session
    pub fn readers(&self) -> Vec<ReaderHandle> {
        self.sessions.keys().cloned().collect()
    }

    /// Bring the session set in line with enumeration
    ///
    /// Sessions of vanished readers are cancelled and dropped, sessions in
    /// `Error` or `Closed` are dropped and recreated, and new readers get a
    /// session. Returns the enumerated readers.
    pub fn refresh(&mut self) -> Result<Vec<ReaderHandle>, SessionError> {
        let readers = match self.enumerate() {
            Ok(readers) => readers,
            Err(SessionError::NoReaderFound) => {
                self.emit(SessionEvent::NoReaderFound);
                self.detach_all();
                return Err(SessionError::NoReaderFound);
            }
            Err(e) => return Err(e),
        };

        let current: HashSet<&ReaderHandle> = readers.iter().collect();
        let vanished: Vec<ReaderHandle> = self
            .sessions
            .keys()
            .filter(|reader| !current.contains(reader))
            .cloned()
            .collect();
        for reader in vanished {
            self.detach(&reader);
        }

        let known: HashSet<ReaderHandle> = self.sessions.keys().cloned().collect();
        let dead: Vec<ReaderHandle> = self
            .sessions
            .iter()
            .filter(|(_, entry)| Self::is_dead(entry))
            .map(|(reader, _)| reader.clone())
            .collect();
        for reader in dead {
            debug!(reader = %reader, "Dropping terminated session");
            self.retire(&reader);
        }

        for reader in &readers {
            if !self.sessions.contains_key(reader) {
                if !known.contains(reader) {
                    info!(reader = %reader, "Reader attached");
                    self.emit(SessionEvent::ReaderAttached {
                        reader: reader.clone(),
                    });
                }
                self.session_for(reader);
            }
        }

        Ok(readers)
    }

    /// Supervise all readers until `shutdown` is cancelled
    ///
    /// `handler_factory` is called once per worker to build the handler for
    /// that reader's cards.
    pub fn run<F, H>(&mut self, handler_factory: F, shutdown: &CancelToken) -> Result<(), SessionError>
    where
        F: Fn(&ReaderHandle) -> H,
        H: CardHandler<T> + Send + 'static,
    {
        info!("Session manager started");
        while !shutdown.is_cancelled() {
            match self.refresh() {
                Ok(_) => {}
                Err(SessionError::NoReaderFound) => {
                    error!(backoff = ?self.config.no_reader_backoff, "No reader found");
                    shutdown.sleep(self.config.no_reader_backoff);
                    continue;
                }
                Err(e) => {
                    error!(error = %e, backoff = ?self.config.no_reader_backoff, "Reader enumeration failed");
                    shutdown.sleep(self.config.no_reader_backoff);
                    continue;
                }
            }

            self.reap();
            self.spawn_workers(&handler_factory)?;
            shutdown.sleep(self.config.poll_timeout);
        }

        self.shutdown();
        info!("Session manager stopped");
        Ok(())
    }

    /// Cancel every session and join every worker
    ///
    /// All sessions are cancelled and closed before any worker is joined.
    /// Workers still blocked in a poll are woken through
    /// [`ReaderTransport::interrupt`].
    pub fn shutdown(&mut self) {
        let entries: Vec<(ReaderHandle, Entry<T>)> = self.sessions.drain().collect();
        for (_, entry) in &entries {
            entry.cancel.cancel();
        }
        for (_, entry) in &entries {
            close(&entry.session);
        }

        let mut workers: Vec<JoinHandle<()>> = entries
            .into_iter()
            .filter_map(|(_, entry)| entry.worker)
            .collect();
        workers.append(&mut self.retired);
        self.join_workers(workers);
    }

    fn join_workers(&self, workers: Vec<JoinHandle<()>>) {
        if workers.is_empty() {
            return;
        }
        debug!(count = workers.len(), "Joining session workers");

        while !workers.iter().all(JoinHandle::is_finished) {
            if let Err(e) = self.transport.interrupt() {
                warn!(error = %e, "Failed to interrupt presence polls");
                break;
            }
            thread::sleep(INTERRUPT_INTERVAL);
        }

        for worker in workers {
            let name = worker.thread().name().map(str::to_owned);
            if worker.join().is_err() {
                error!(worker = ?name, "Worker panicked");
            }
        }
    }

    fn spawn_workers<F, H>(&mut self, handler_factory: &F) -> Result<(), SessionError>
    where
        F: Fn(&ReaderHandle) -> H,
        H: CardHandler<T> + Send + 'static,
    {
        for (reader, entry) in &mut self.sessions {
            if entry.worker.is_some() || Self::is_dead(entry) {
                continue;
            }

            let session = Arc::clone(&entry.session);
            let cancel = entry.cancel.clone();
            let events = self.events_tx.clone();
            let handler = handler_factory(reader);
            let worker = thread::Builder::new()
                .name(format!("cardwatch {reader}"))
                .spawn(move || drive(session, cancel, handler, events))
                .map_err(|e| SessionError::Worker(e.to_string()))?;

            debug!(reader = %reader, "Started session worker");
            entry.worker = Some(worker);
        }
        Ok(())
    }

    fn reap(&mut self) {
        self.retired.retain(|worker| !worker.is_finished());
        for (reader, entry) in &mut self.sessions {
            if entry.worker.as_ref().is_some_and(JoinHandle::is_finished) {
                if let Some(Err(_)) = entry.worker.take().map(JoinHandle::join) {
                    error!(reader = %reader, "Worker panicked");
                }
            }
        }
    }

    fn detach(&mut self, reader: &ReaderHandle) {
        info!(reader = %reader, "Reader detached");
        self.retire(reader);
        self.emit(SessionEvent::ReaderDetached {
            reader: reader.clone(),
        });
    }

    fn detach_all(&mut self) {
        let readers: Vec<ReaderHandle> = self.sessions.keys().cloned().collect();
        for reader in readers {
            self.detach(&reader);
        }
    }

    fn retire(&mut self, reader: &ReaderHandle) {
        if let Some(entry) = self.sessions.remove(reader) {
            entry.cancel.cancel();
            close(&entry.session);
            if let Some(worker) = entry.worker {
                self.retired.push(worker);
            }
        }
    }

    fn is_dead(entry: &Entry<T>) -> bool {
        entry
            .session
            .try_lock()
            .is_some_and(|session| session.state().is_terminal())
    }

    fn emit(&self, event: SessionEvent) {
        let _ = self.events_tx.send(event);
    }
}

impl<T: ReaderTransport> Drop for SessionManager<T> {
    fn drop(&mut self) {
        for entry in self.sessions.values() {
            entry.cancel.cancel();
        }
    }
}

impl<T: ReaderTransport> std::fmt::Debug for SessionManager<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionManager")
            .field("transport", &self.transport)
            .field("config", &self.config)
            .field("readers", &self.sessions.keys().collect::<Vec<_>>())
            .finish_non_exhaustive()
    }
}

/// Close a session unless it already terminated
fn close<T: ReaderTransport>(session: &SharedSession<T>) {
    let mut session = session.lock();
    if !session.state().is_terminal() {
        session.close();
    }
}

/// Worker loop: step the session until it terminates or is cancelled
///
/// Presence and absence polls run with the session unlocked.
fn drive<T, H>(session: SharedSession<T>, cancel: CancelToken, mut handler: H, events: EventSender)
where
    T: ReaderTransport,
    H: CardHandler<T>,
{
    let reader = session.lock().reader().clone();
    debug!(reader = %reader, "Worker running");

    loop {
        let mut guard = session.lock();
        if cancel.is_cancelled() {
            guard.close();
            break;
        }

        let result = match guard.pending_poll() {
            Some(poll) => {
                let outcome = MutexGuard::unlocked(&mut guard, || poll.run());
                guard.complete_poll(poll, outcome).map(drop)
            }
            None => match guard.step() {
                Ok(ReaderSessionState::Connected) => handler.on_card(&mut guard),
                Ok(_) => Ok(()),
                Err(e) => Err(e),
            },
        };

        match result {
            Ok(()) => {}
            Err(SessionError::Cancelled) => break,
            Err(e) if guard.state() == ReaderSessionState::Error => {
                error!(reader = %reader, error = %e, "Session failed");
                let _ = events.send(SessionEvent::SessionFailed {
                    reader: reader.clone(),
                    error: e,
                });
                break;
            }
            Err(e) => warn!(reader = %reader, error = %e, "Recoverable session error"),
        }
    }

    debug!(reader = %reader, "Worker exited");
}
