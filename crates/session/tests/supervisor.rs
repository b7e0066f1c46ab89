//! Supervised runs of the session manager over a scripted transport

mod common;

use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use cardwatch_core::ReaderHandle;
use cardwatch_core::transport::TransportError;
use cardwatch_core::transport::mock::MockTransport;
use cardwatch_session::{
    CancelToken, ProbeOnly, ReaderSession, ReaderSessionState, SessionError, SessionEvent,
    SessionManager,
};

use common::{READER, events_until, fast_config, init_tracing, mock_with_reader};

const WAIT: Duration = Duration::from_secs(10);

#[test]
fn test_card_is_identified_and_released() {
    init_tracing();
    let transport = mock_with_reader();
    transport.push_presence(Ok(true));
    transport.push_response([0x04, 0x1A, 0x2B, 0x3C, 0x90, 0x00]);

    let mut manager = SessionManager::with_shared_transport(Arc::clone(&transport), fast_config());
    let events = manager.events();
    let shutdown = CancelToken::new();
    let stop = shutdown.clone();
    let supervisor = thread::spawn(move || manager.run(|_| ProbeOnly, &stop));

    let seen = events_until(&events, WAIT, |e| matches!(e, SessionEvent::CardRemoved { .. }));
    shutdown.cancel();
    supervisor.join().unwrap().unwrap();

    assert!(seen.iter().any(|e| matches!(e, SessionEvent::ReaderAttached { .. })));
    let serial = seen.iter().find_map(|e| match e {
        SessionEvent::CardIdentified { serial, .. } => Some(serial.value()),
        _ => None,
    });
    assert_eq!(serial, Some(1009313284));
    assert!(matches!(seen.last(), Some(SessionEvent::CardRemoved { .. })));
    assert_eq!(transport.live_sessions(), 0);
    assert_eq!(transport.disconnects().len(), 1);
}

#[test]
fn test_handler_runs_before_release() {
    init_tracing();
    let transport = mock_with_reader();
    transport.push_presence(Ok(true));
    transport.push_response([0x6F, 0x10, 0x90, 0x00]);
    transport.push_response([0x04, 0x1A, 0x2B, 0x3C, 0x90, 0x00]);

    let mut manager = SessionManager::with_shared_transport(Arc::clone(&transport), fast_config());
    let events = manager.events();
    let shutdown = CancelToken::new();
    let stop = shutdown.clone();
    let supervisor = thread::spawn(move || {
        manager.run(
            |_| {
                |session: &mut ReaderSession<MockTransport>| -> Result<(), SessionError> {
                    let response = session.execute(
                        "SELECT",
                        &cardwatch_core::Parameters::new()
                            .with_data([0xA0, 0x00, 0x00, 0x00, 0x03]),
                    )?;
                    assert!(response.is_success());
                    Ok(())
                }
            },
            &stop,
        )
    });

    events_until(&events, WAIT, |e| matches!(e, SessionEvent::CardIdentified { .. }));
    shutdown.cancel();
    supervisor.join().unwrap().unwrap();

    let sent = transport.transmitted();
    assert_eq!(sent[0][1], 0xA4);
    assert_eq!(sent[1].as_ref(), &[0xFF, 0xCA, 0x00, 0x00, 0x00]);
}

#[test]
fn test_no_reader_backs_off_without_sessions() {
    init_tracing();
    let transport = Arc::new(MockTransport::new());
    let mut manager = SessionManager::with_shared_transport(Arc::clone(&transport), fast_config());
    let events = manager.events();
    let shutdown = CancelToken::new();
    let stop = shutdown.clone();
    let supervisor = thread::spawn(move || {
        let result = manager.run(|_| ProbeOnly, &stop);
        (result, manager.readers().len())
    });

    let seen = events_until(&events, WAIT, |e| *e == SessionEvent::NoReaderFound);
    shutdown.cancel();
    let (result, sessions) = supervisor.join().unwrap();

    assert!(result.is_ok());
    assert_eq!(seen.last(), Some(&SessionEvent::NoReaderFound));
    assert_eq!(sessions, 0);
    assert_eq!(transport.presence_polls(), 0);
}

#[test]
fn test_fault_is_reported_and_session_recreated() {
    init_tracing();
    let transport = mock_with_reader();
    transport.push_presence(Err(TransportError::io("SCARD_E_NO_SERVICE")));

    let mut manager = SessionManager::with_shared_transport(Arc::clone(&transport), fast_config());
    let events = manager.events();
    let shutdown = CancelToken::new();
    let stop = shutdown.clone();
    let supervisor = thread::spawn(move || manager.run(|_| ProbeOnly, &stop));

    let seen = events_until(&events, WAIT, |e| matches!(e, SessionEvent::SessionFailed { .. }));
    assert!(matches!(
        seen.last(),
        Some(SessionEvent::SessionFailed {
            error: SessionError::Transport(TransportError::Io(_)),
            ..
        })
    ));

    // the replacement session starts over from Idle
    let restarted = events_until(&events, WAIT, |e| {
        matches!(
            e,
            SessionEvent::StateChanged {
                from: ReaderSessionState::Idle,
                ..
            }
        )
    });
    shutdown.cancel();
    supervisor.join().unwrap().unwrap();

    assert!(!restarted.is_empty());
    assert!(transport.presence_polls() > 1);
}

#[test]
fn test_reader_detach_is_reported() {
    init_tracing();
    let transport = mock_with_reader();

    let mut manager = SessionManager::with_shared_transport(Arc::clone(&transport), fast_config());
    let events = manager.events();
    let shutdown = CancelToken::new();
    let stop = shutdown.clone();
    let supervisor = thread::spawn(move || manager.run(|_| ProbeOnly, &stop));

    events_until(&events, WAIT, |e| matches!(e, SessionEvent::ReaderAttached { .. }));
    transport.set_readers(Vec::<String>::new());
    let seen = events_until(&events, WAIT, |e| matches!(e, SessionEvent::ReaderDetached { .. }));
    shutdown.cancel();
    supervisor.join().unwrap().unwrap();

    assert!(matches!(
        seen.last(),
        Some(SessionEvent::ReaderDetached { reader }) if reader.name() == READER
    ));
}

#[test]
fn test_shutdown_interrupts_blocked_polls() {
    init_tracing();
    let readers: Vec<String> = (0..4).map(|n| format!("Mock Reader {n}")).collect();
    let transport = Arc::new(MockTransport::with_readers(&readers).with_blocking_polls());
    let config = fast_config().with_poll_timeout(Duration::from_secs(5));

    let mut manager = SessionManager::with_shared_transport(Arc::clone(&transport), config);
    let shutdown = CancelToken::new();
    let stop = shutdown.clone();
    let supervisor = thread::spawn(move || {
        let result = manager.run(|_| ProbeOnly, &stop);
        (result, manager)
    });

    let deadline = Instant::now() + WAIT;
    while transport.presence_polls() < readers.len() && Instant::now() < deadline {
        thread::sleep(Duration::from_millis(5));
    }
    assert_eq!(transport.presence_polls(), readers.len());

    let started = Instant::now();
    shutdown.cancel();
    let (result, manager) = supervisor.join().unwrap();
    result.unwrap();

    assert!(started.elapsed() < Duration::from_secs(2), "shutdown took {:?}", started.elapsed());
    assert!(transport.interrupts() >= 1);
    assert!(manager.readers().is_empty());
}

#[test]
fn test_session_is_unlocked_while_polling() {
    init_tracing();
    let transport = Arc::new(MockTransport::with_readers([READER]).with_blocking_polls());
    let config = fast_config().with_poll_timeout(Duration::from_secs(5));

    let mut manager = SessionManager::with_shared_transport(Arc::clone(&transport), config);
    manager.refresh().unwrap();
    let session = manager.session(&ReaderHandle::new(READER)).unwrap();
    let shutdown = CancelToken::new();
    let stop = shutdown.clone();
    let supervisor = thread::spawn(move || manager.run(|_| ProbeOnly, &stop));

    let deadline = Instant::now() + WAIT;
    while transport.presence_polls() == 0 && Instant::now() < deadline {
        thread::sleep(Duration::from_millis(5));
    }
    assert_eq!(transport.presence_polls(), 1);

    let state = session
        .try_lock_for(Duration::from_secs(1))
        .map(|session| session.state());
    assert_eq!(state, Some(ReaderSessionState::WaitingForCard));

    shutdown.cancel();
    supervisor.join().unwrap().unwrap();
    assert_eq!(session.lock().state(), ReaderSessionState::Closed);
}
