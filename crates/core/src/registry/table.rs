//! Builtin command table
//!
//! Commands from the common APDU reference sheet, grouped by the document
//! that defines them. GSM SIM commands use CLA `A0` and answer `9F xx` to
//! SELECT; everything else completes with `90 00`.

use super::definition::{CommandDefinition, StatusPattern};
use super::template::{ANY, CommandTemplate, DataShape, fixed};

const fn header(cla: u8, ins: u8, p1: u8, p2: u8) -> CommandTemplate {
    CommandTemplate::new(fixed(cla), ins, fixed(p1), fixed(p2))
}

const ISO: &str = "ISO/IEC 7816-4";
const ISO_7: &str = "ISO/IEC 7816-7";
const PCSC: &str = "PC/SC Part 3";
const GSM: &str = "3GPP TS 11.11";
const GP: &str = "GlobalPlatform Card Specification";
const VSDC: &str = "Visa VSDC";
const GEMPLUS: &str = "Gemplus MPCOS";

/// Name of the PC/SC reader command returning the card UID
pub const GET_UID: &str = "GET UID";

#[rustfmt::skip]
pub(super) static BUILTIN: &[CommandDefinition] = &[
    // PC/SC pseudo-APDUs handled by the reader itself
    CommandDefinition::new(GET_UID, header(0xFF, 0xCA, 0x00, 0x00).with_le(fixed(0x00)), PCSC, "Card serial number from the reader"),
    CommandDefinition::new("GET ATS", header(0xFF, 0xCA, 0x01, 0x00).with_le(fixed(0x00)), PCSC, "Answer to select of an ISO 14443-4 card"),
    // ISO 7816-4 interindustry
    CommandDefinition::new("SELECT", header(0x00, 0xA4, 0x04, 0x00).with_data(DataShape::Variable).with_le(fixed(0x00)), ISO, "Select application by AID"),
    CommandDefinition::new("SELECT BY ID", CommandTemplate::new(fixed(0x00), 0xA4, ANY, ANY).with_data(DataShape::Fixed(2)), ISO, "Select file by file identifier"),
    CommandDefinition::new("READ BINARY", CommandTemplate::new(fixed(0x00), 0xB0, ANY, ANY).with_le(ANY), ISO, "Read transparent file content at offset P1P2"),
    CommandDefinition::new("UPDATE BINARY", CommandTemplate::new(fixed(0x00), 0xD6, ANY, ANY).with_data(DataShape::Variable), ISO, "Write transparent file content at offset P1P2"),
    CommandDefinition::new("READ RECORD", CommandTemplate::new(fixed(0x00), 0xB2, ANY, ANY).with_le(fixed(0x00)), ISO, "Read record P1 with reference control P2"),
    CommandDefinition::new("UPDATE RECORD", CommandTemplate::new(fixed(0x00), 0xDC, ANY, ANY).with_data(DataShape::Variable), ISO, "Overwrite record P1"),
    CommandDefinition::new("APPEND RECORD", header(0x00, 0xE2, 0x00, 0x00).with_data(DataShape::Variable), ISO, "Append a record to a linear file"),
    CommandDefinition::new("GET RESPONSE", header(0x00, 0xC0, 0x00, 0x00).with_le(ANY), ISO, "Fetch response bytes announced by 61 xx"),
    CommandDefinition::new("VERIFY", CommandTemplate::new(fixed(0x00), 0x20, fixed(0x00), ANY).with_data(DataShape::Variable), ISO, "Verify reference data P2"),
    CommandDefinition::new("GET CHALLENGE", header(0x00, 0x84, 0x00, 0x00).with_le(fixed(0x08)), ISO, "Eight byte random number for authentication"),
    CommandDefinition::new("INTERNAL AUTHENTICATE", CommandTemplate::new(fixed(0x00), 0x88, ANY, ANY).with_data(DataShape::Variable).with_le(fixed(0x00)), ISO, "Card authenticates with the given challenge"),
    CommandDefinition::new("GET DATA", CommandTemplate::new(fixed(0x00), 0xCA, ANY, ANY).with_le(fixed(0x00)), ISO, "Data object with tag P1P2"),
    CommandDefinition::new("PUT DATA", CommandTemplate::new(fixed(0x00), 0xDA, ANY, ANY).with_data(DataShape::Variable), ISO, "Store data object with tag P1P2"),
    CommandDefinition::new("MANAGE CHANNEL", CommandTemplate::new(fixed(0x00), 0x70, ANY, ANY).with_le(ANY), ISO, "Open or close logical channel P2"),
    // ISO 7816-7
    CommandDefinition::new("BEGIN TRANSACTION", header(0x00, 0x12, 0x00, 0x80), ISO_7, "Start a transaction"),
    CommandDefinition::new("COMMIT", header(0x00, 0x12, 0x00, 0x81), ISO_7, "Commit the open transaction"),
    CommandDefinition::new("ROLLBACK", header(0x00, 0x12, 0x00, 0x82), ISO_7, "Discard the open transaction"),
    // GSM SIM
    CommandDefinition::new("SELECT FILE", header(0xA0, 0xA4, 0x00, 0x00).with_data(DataShape::Fixed(2)), GSM, "Select SIM file by identifier").with_success(StatusPattern::sw1(0x9F)),
    CommandDefinition::new("STATUS", header(0xA0, 0xF2, 0x00, 0x00).with_le(ANY), GSM, "Current directory information"),
    CommandDefinition::new("READ BINARY GSM", CommandTemplate::new(fixed(0xA0), 0xB0, ANY, ANY).with_le(ANY), GSM, "Read transparent EF"),
    CommandDefinition::new("UPDATE BINARY GSM", CommandTemplate::new(fixed(0xA0), 0xD6, ANY, ANY).with_data(DataShape::Variable), GSM, "Write transparent EF"),
    CommandDefinition::new("READ RECORD GSM", CommandTemplate::new(fixed(0xA0), 0xB2, ANY, ANY).with_le(ANY), GSM, "Read record of a linear fixed or cyclic EF"),
    CommandDefinition::new("UPDATE RECORD GSM", CommandTemplate::new(fixed(0xA0), 0xDC, ANY, ANY).with_data(DataShape::Variable), GSM, "Write record of a linear fixed or cyclic EF"),
    CommandDefinition::new("SEEK", CommandTemplate::new(fixed(0xA0), 0xA2, fixed(0x00), ANY).with_data(DataShape::Variable), GSM, "Search a linear fixed EF for a pattern"),
    CommandDefinition::new("INCREASE", header(0xA0, 0x32, 0x00, 0x00).with_data(DataShape::Fixed(3)), GSM, "Add to the current record of a cyclic EF"),
    CommandDefinition::new("GET RESPONSE GSM", header(0xA0, 0xC0, 0x00, 0x00).with_le(ANY), GSM, "Fetch response bytes announced by 9F xx"),
    CommandDefinition::new("VERIFY CHV", CommandTemplate::new(fixed(0xA0), 0x20, fixed(0x00), ANY).with_data(DataShape::Fixed(8)), GSM, "Verify card holder verification value P2"),
    CommandDefinition::new("CHANGE CHV", CommandTemplate::new(fixed(0xA0), 0x24, fixed(0x00), ANY).with_data(DataShape::Fixed(0x10)), GSM, "Replace CHV P2 with a new value"),
    CommandDefinition::new("DISABLE CHV", header(0xA0, 0x26, 0x00, 0x01).with_data(DataShape::Fixed(8)), GSM, "Disable CHV1"),
    CommandDefinition::new("ENABLE CHV", header(0xA0, 0x28, 0x00, 0x01).with_data(DataShape::Fixed(8)), GSM, "Enable CHV1"),
    CommandDefinition::new("UNBLOCK CHV", CommandTemplate::new(fixed(0xA0), 0x2C, fixed(0x00), ANY).with_data(DataShape::Fixed(0x10)), GSM, "Unblock CHV P2 with the unblock key"),
    CommandDefinition::new("INVALIDATE", header(0xA0, 0x04, 0x00, 0x00).with_le(fixed(0x00)), GSM, "Invalidate the current EF"),
    CommandDefinition::new("REHABILITATE", header(0xA0, 0x44, 0x00, 0x00).with_le(fixed(0x00)), GSM, "Rehabilitate the current EF"),
    CommandDefinition::new("RUN GSM ALGORITHM", header(0xA0, 0x88, 0x00, 0x00).with_data(DataShape::Fixed(0x10)), GSM, "Compute SRES and Kc from RAND"),
    CommandDefinition::new("SLEEP", header(0xA0, 0xFA, 0x00, 0x00).with_le(fixed(0x00)), GSM, "Phase 1 sleep"),
    // GlobalPlatform card management
    CommandDefinition::new("INITIALIZE UPDATE", CommandTemplate::new(fixed(0x80), 0x50, ANY, ANY).with_data(DataShape::Fixed(8)).with_le(fixed(0x00)), GP, "Open a secure channel with the host challenge"),
    CommandDefinition::new("EXTERNAL AUTHENTICATE", CommandTemplate::new(fixed(0x84), 0x82, ANY, fixed(0x00)).with_data(DataShape::Fixed(0x10)), GP, "Host cryptogram and MAC, P1 is the security level"),
    CommandDefinition::new("GET STATUS", CommandTemplate::new(fixed(0x80), 0xF2, ANY, ANY).with_data(DataShape::Variable).with_le(fixed(0x00)), GP, "Life cycle state of card content"),
    CommandDefinition::new("SET STATUS", CommandTemplate::new(fixed(0x80), 0xF0, ANY, ANY).with_data(DataShape::Variable), GP, "Change a life cycle state"),
    CommandDefinition::new("DELETE", header(0x80, 0xE4, 0x00, 0x00).with_data(DataShape::Variable).with_le(fixed(0x00)), GP, "Delete an application or load file"),
    CommandDefinition::new("INSTALL", CommandTemplate::new(fixed(0x80), 0xE6, ANY, fixed(0x00)).with_data(DataShape::Variable).with_le(fixed(0x00)), GP, "Install step selected by P1"),
    CommandDefinition::new("LOAD", CommandTemplate::new(fixed(0x80), 0xE8, ANY, ANY).with_data(DataShape::Variable), GP, "Load file block P2, P1 flags the last block"),
    CommandDefinition::new("PUT KEY", CommandTemplate::new(fixed(0x80), 0xD8, ANY, ANY).with_data(DataShape::Variable).with_le(fixed(0x00)), GP, "Add or replace key version P1"),
    // Visa VSDC
    CommandDefinition::new("GET PROCESSING OPTIONS", header(0x80, 0xA8, 0x00, 0x00).with_data(DataShape::Variable).with_le(fixed(0x00)), VSDC, "Start the transaction with the PDOL data"),
    CommandDefinition::new("GENERATE AC", CommandTemplate::new(fixed(0x80), 0xAE, ANY, fixed(0x00)).with_data(DataShape::Variable).with_le(fixed(0x00)), VSDC, "Application cryptogram of type P1"),
    CommandDefinition::new("VERIFY TRANSACTION PIN", header(0x00, 0x20, 0x00, 0x80).with_data(DataShape::Fixed(8)), VSDC, "Offline plaintext PIN"),
    CommandDefinition::new("CARD BLOCK", header(0x84, 0x16, 0x00, 0x00).with_data(DataShape::Variable), VSDC, "Permanently block the card"),
    CommandDefinition::new("APPLICATION BLOCK", header(0x84, 0x1E, 0x00, 0x00).with_data(DataShape::Variable), VSDC, "Block the current application"),
    CommandDefinition::new("APPLICATION UNBLOCK", header(0x84, 0x18, 0x00, 0x00).with_data(DataShape::Variable), VSDC, "Unblock the current application"),
    CommandDefinition::new("PIN CHANGE", CommandTemplate::new(fixed(0x84), 0x24, fixed(0x00), ANY).with_data(DataShape::Variable), VSDC, "Change or unblock the offline PIN"),
    // Gemplus MPCOS
    CommandDefinition::new("SELECT FILE MPCOS", header(0x00, 0xA4, 0x00, 0x00).with_data(DataShape::Fixed(2)).with_le(fixed(0x00)), GEMPLUS, "Select file by identifier").with_success(StatusPattern::sw1(0x61)),
    CommandDefinition::new("GET INFO", CommandTemplate::new(fixed(0x80), 0xC0, fixed(0x02), ANY).with_le(ANY), GEMPLUS, "Card information item P2"),
];

#[cfg(test)]
mod tests {
    use std::collections::HashSet;

    use super::*;

    #[test]
    fn test_builtin_names_are_unique() {
        let names: HashSet<String> = BUILTIN
            .iter()
            .map(|def| def.name().to_ascii_uppercase())
            .collect();
        assert_eq!(names.len(), BUILTIN.len());
    }

    #[test]
    fn test_builtin_templates_survive_notation() {
        for def in BUILTIN {
            let text = def.template().to_string();
            let parsed: CommandTemplate = text.parse().unwrap();
            assert_eq!(&parsed, def.template(), "{}", def.name());
        }
    }
}
