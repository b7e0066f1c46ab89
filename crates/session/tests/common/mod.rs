//! Common test utilities

#![allow(dead_code, unreachable_pub)]

use std::sync::Arc;
use std::time::{Duration, Instant};

use cardwatch_core::transport::mock::MockTransport;
use cardwatch_session::{EventReceiver, SessionConfig, SessionEvent};

/// Reader name used by the scripted transport
pub const READER: &str = "Identiv uTrust 3700 F CL Reader 0";

/// Install a test subscriber honouring `RUST_LOG`
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

/// Short polls so supervised tests finish quickly
pub fn fast_config() -> SessionConfig {
    SessionConfig::new()
        .with_poll_timeout(Duration::from_millis(10))
        .with_no_reader_backoff(Duration::from_millis(20))
}

/// A scripted transport with one reader attached
pub fn mock_with_reader() -> Arc<MockTransport> {
    Arc::new(MockTransport::with_readers([READER]))
}

/// Collect events until one matches `done` or `timeout` elapses
pub fn events_until(
    events: &EventReceiver,
    timeout: Duration,
    done: impl Fn(&SessionEvent) -> bool,
) -> Vec<SessionEvent> {
    let deadline = Instant::now() + timeout;
    let mut seen = Vec::new();
    while let Some(left) = deadline.checked_duration_since(Instant::now()) {
        match events.recv_timeout(left) {
            Ok(event) => {
                let finished = done(&event);
                seen.push(event);
                if finished {
                    break;
                }
            }
            Err(_) => break,
        }
    }
    seen
}
