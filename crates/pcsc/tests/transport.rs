//! Tests for the PcscTransport implementation against real readers
//!
//! Every test returns early when no PC/SC service, reader or card is available.

use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use cardwatch_core::{ExchangeEngine, ProtocolPreference, ReaderHandle, ReaderTransport};
use cardwatch_core::{CardSerial, CommandRegistry, Parameters};
use cardwatch_core::registry::GET_UID;

mod common;

#[test]
fn test_list_readers() {
    let Some(transport) = common::get_test_transport() else {
        println!("Skipping test, PC/SC not available");
        return;
    };

    match transport.list_readers() {
        Ok(readers) => {
            for reader in &readers {
                assert!(transport.is_attached(reader).unwrap());
            }
        }
        Err(e) => println!("Could not list readers: {e}"),
    }
}

#[test]
fn test_unknown_reader() {
    let Some(transport) = common::get_test_transport() else {
        println!("Skipping test, PC/SC not available");
        return;
    };

    let ghost = ReaderHandle::new("cardwatch ghost reader 00 00");
    assert!(!transport.is_attached(&ghost).unwrap_or(false));
    assert!(transport.wait_present(&ghost, Duration::from_millis(50)).is_err());
}

#[test]
fn test_presence_poll_is_bounded() {
    let Some((transport, reader)) = common::get_transport_with_reader() else {
        println!("Skipping test, no reader available");
        return;
    };

    let started = Instant::now();
    let present = transport.wait_present(&reader, Duration::from_millis(200)).unwrap();
    let absent = transport.wait_absent(&reader, Duration::from_millis(200)).unwrap();

    assert_ne!(present, absent, "A reader is either empty or holds a card");
    assert!(started.elapsed() < Duration::from_secs(2));
}

#[test]
fn test_interrupt_ends_presence_wait() {
    let Some((transport, reader)) = common::get_transport_with_reader() else {
        println!("Skipping test, no reader available");
        return;
    };
    let transport = Arc::new(transport);

    let waiter = {
        let transport = Arc::clone(&transport);
        thread::spawn(move || {
            let started = Instant::now();
            let result = transport.wait_present(&reader, Duration::from_secs(30));
            (result, started.elapsed())
        })
    };

    while !waiter.is_finished() {
        transport.interrupt().unwrap();
        thread::sleep(Duration::from_millis(50));
    }

    let (result, elapsed) = waiter.join().unwrap();
    assert!(result.is_ok());
    assert!(elapsed < Duration::from_secs(5));
}

#[test]
fn test_read_uid() {
    let Some((transport, reader)) = common::get_transport_with_reader() else {
        println!("Skipping test, no reader available");
        return;
    };
    if !transport.wait_present(&reader, Duration::ZERO).unwrap_or(false) {
        println!("Skipping test, no card in reader");
        return;
    }

    let mut card = match transport.connect(&reader, ProtocolPreference::Any) {
        Ok(card) => card,
        Err(e) => {
            println!("Could not connect to {reader}: {e}");
            return;
        }
    };
    assert!(!card.atr().is_empty());

    let command = CommandRegistry::builtin()
        .render(GET_UID, &Parameters::new())
        .unwrap();
    match ExchangeEngine::default().exchange(&transport, &mut card, &command) {
        Ok(response) if response.is_success() => {
            let serial = CardSerial::from_uid(response.payload());
            println!("UID {} serial {serial}", hex::encode_upper(response.payload()));
        }
        Ok(response) => println!("GET UID not supported: {}", response.status()),
        Err(e) => println!("GET UID failed (might be expected): {e}"),
    }

    transport.disconnect(card, true).unwrap();
}
