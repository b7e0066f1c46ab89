//! Reader sessions and their supervisor
//!
//! A [`ReaderSession`] tracks card presence in one reader through a small
//! state machine and gives exclusive access to the connected card. The
//! [`SessionManager`] keeps one session per attached reader, drives each from
//! its own worker thread and reports what happens as [`SessionEvent`]s.
//!
//! ```no_run
//! use cardwatch_core::transport::mock::MockTransport;
//! use cardwatch_session::{CancelToken, ProbeOnly, SessionConfig, SessionEvent, SessionManager};
//!
//! let mut manager = SessionManager::new(MockTransport::with_readers(["Reader 0"]), SessionConfig::new());
//! let events = manager.events();
//! let shutdown = CancelToken::new();
//!
//! std::thread::spawn(move || {
//!     for event in events {
//!         if let SessionEvent::CardIdentified { serial, .. } = event {
//!             println!("Card Serial: {serial}");
//!         }
//!     }
//! });
//!
//! manager.run(|_| ProbeOnly, &shutdown)?;
//! # Ok::<(), cardwatch_session::SessionError>(())
//! ```
#![cfg_attr(not(test), warn(unused_crate_dependencies))]
#![forbid(unsafe_code)]
#![warn(missing_docs, rustdoc::missing_crate_level_docs)]

mod cancel;
mod config;
mod error;
mod event;
mod manager;
mod session;

pub use cancel::CancelToken;
pub use config::SessionConfig;
pub use error::SessionError;
pub use event::{EventReceiver, EventSender, SessionEvent, event_channel};
pub use manager::{CardHandler, ProbeOnly, SessionManager, SharedSession};
pub use session::{ReaderSession, ReaderSessionState};
