//! Example showing how to enumerate connected card readers

use std::time::Duration;

use cardwatch_core::{ProtocolPreference, ReaderTransport};
use cardwatch_transport_pcsc::PcscTransport;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let transport = PcscTransport::new()?;
    let readers = transport.list_readers()?;

    println!("Found {} readers:", readers.len());

    for (i, reader) in readers.iter().enumerate() {
        println!("{}. Reader: {}", i + 1, reader);

        if transport.wait_present(reader, Duration::ZERO)? {
            match transport.connect(reader, ProtocolPreference::Any) {
                Ok(card) => {
                    println!(
                        "   Card present, protocol {}, ATR: {}",
                        card.protocol(),
                        hex::encode_upper(card.atr())
                    );
                    transport.disconnect(card, false)?;
                }
                Err(e) => println!("   Card present, connect failed: {e}"),
            }
        } else {
            println!("   No card present");
        }
    }

    Ok(())
}
