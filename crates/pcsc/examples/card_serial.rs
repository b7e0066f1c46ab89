//! Watch every attached reader and print the serial of each card presented
//!
//! Run with `RUST_LOG=debug` to follow the session state machines.

use std::thread;
use std::time::Duration;

use cardwatch_core::ProtocolPreference;
use cardwatch_session::{CancelToken, ProbeOnly, SessionConfig, SessionEvent, SessionManager};
use cardwatch_transport_pcsc::{PcscConfig, PcscTransport, ShareMode};
use clap::Parser;
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Presence poll timeout in milliseconds
    #[arg(long, default_value_t = 5000)]
    poll_timeout_ms: u64,

    /// Wait before rescanning when no reader is attached, in seconds
    #[arg(long, default_value_t = 5)]
    no_reader_backoff_secs: u64,

    /// Require T=1 instead of letting the reader pick
    #[arg(long)]
    t1: bool,

    /// Leave cards powered when releasing them
    #[arg(long)]
    no_reset: bool,

    /// Connect in exclusive mode
    #[arg(long)]
    exclusive: bool,

    /// Stop after this many cards have been identified
    #[arg(long)]
    cards: Option<usize>,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let args = Args::parse();

    let share_mode = if args.exclusive {
        ShareMode::Exclusive
    } else {
        ShareMode::Shared
    };
    let transport = PcscTransport::with_config(PcscConfig::new().with_share_mode(share_mode))?;

    let config = SessionConfig::new()
        .with_poll_timeout(Duration::from_millis(args.poll_timeout_ms))
        .with_no_reader_backoff(Duration::from_secs(args.no_reader_backoff_secs))
        .with_protocol(if args.t1 {
            ProtocolPreference::T1
        } else {
            ProtocolPreference::Any
        })
        .with_reset_on_disconnect(!args.no_reset);

    let mut manager = SessionManager::new(transport, config);
    let events = manager.events();
    let shutdown = CancelToken::new();

    let printer = {
        let shutdown = shutdown.clone();
        let limit = args.cards;
        thread::spawn(move || {
            let mut identified = 0;
            for event in events {
                match event {
                    SessionEvent::ReaderAttached { reader } => println!("Using card reader: {reader}"),
                    SessionEvent::ReaderDetached { reader } => println!("Card reader removed: {reader}"),
                    SessionEvent::NoReaderFound => println!("No card reader found"),
                    SessionEvent::CardInserted {
                        reader,
                        atr,
                        protocol,
                    } => {
                        println!("Card: {reader}");
                        println!("Card Protocol: {protocol}");
                        println!("Card ATR: {}", hex::encode_upper(&atr));
                    }
                    SessionEvent::CardIdentified { uid, serial, .. } => {
                        println!("Card UID: {}", hex::encode_upper(&uid));
                        println!("Card Serial: {serial}");
                        identified += 1;
                        if limit.is_some_and(|limit| identified >= limit) {
                            shutdown.cancel();
                            break;
                        }
                    }
                    SessionEvent::SessionFailed { reader, error } => {
                        println!("Session on {reader} failed: {error}");
                    }
                    SessionEvent::CardRemoved { .. } | SessionEvent::StateChanged { .. } => {}
                }
            }
        })
    };

    manager.run(|_| ProbeOnly, &shutdown)?;
    drop(manager);

    if printer.join().is_err() {
        eprintln!("Event printer panicked");
    }
    Ok(())
}
