//! APDU command definitions
//!
//! This module provides the command half of the ISO/IEC 7816-4 short APDU
//! framing: `CLA INS P1 P2 [Lc DATA] [Le]`.

pub mod error;

use std::fmt;

use bytes::{BufMut, Bytes, BytesMut};

pub use error::CommandError;

/// Expected length type for APDU commands
///
/// `0x00` asks the card for "any length", up to 256 bytes.
pub type ExpectedLength = u8;

/// Maximum length of the data field of a short APDU
pub const MAX_DATA_LENGTH: usize = 255;

/// An immutable command APDU
#[derive(Clone, PartialEq, Eq, Hash)]
pub struct CommandApdu {
    cla: u8,
    ins: u8,
    p1: u8,
    p2: u8,
    data: Option<Bytes>,
    le: Option<ExpectedLength>,
}

impl CommandApdu {
    /// Create a new command with just the header bytes
    pub const fn new(cla: u8, ins: u8, p1: u8, p2: u8) -> Self {
        Self {
            cla,
            ins,
            p1,
            p2,
            data: None,
            le: None,
        }
    }

    /// Create a new command with expected response length (Le)
    pub const fn new_with_le(cla: u8, ins: u8, p1: u8, p2: u8, le: ExpectedLength) -> Self {
        Self {
            cla,
            ins,
            p1,
            p2,
            data: None,
            le: Some(le),
        }
    }

    /// Create a new command with data payload
    ///
    /// An empty payload is treated as no payload at all.
    pub fn new_with_data<T: Into<Bytes>>(
        cla: u8,
        ins: u8,
        p1: u8,
        p2: u8,
        data: T,
    ) -> Result<Self, CommandError> {
        Ok(Self {
            cla,
            ins,
            p1,
            p2,
            data: checked_data(data.into())?,
            le: None,
        })
    }

    /// Create a new command with both data and expected length
    pub fn new_with_data_and_le<T: Into<Bytes>>(
        cla: u8,
        ins: u8,
        p1: u8,
        p2: u8,
        data: T,
        le: ExpectedLength,
    ) -> Result<Self, CommandError> {
        Ok(Self {
            cla,
            ins,
            p1,
            p2,
            data: checked_data(data.into())?,
            le: Some(le),
        })
    }

    /// Assemble a command from optional body parts
    pub fn from_parts(
        cla: u8,
        ins: u8,
        p1: u8,
        p2: u8,
        data: Option<Bytes>,
        le: Option<ExpectedLength>,
    ) -> Result<Self, CommandError> {
        Ok(Self {
            cla,
            ins,
            p1,
            p2,
            data: data.map(checked_data).transpose()?.flatten(),
            le,
        })
    }

    /// Command class (CLA)
    pub const fn class(&self) -> u8 {
        self.cla
    }

    /// Instruction code (INS)
    pub const fn instruction(&self) -> u8 {
        self.ins
    }

    /// First parameter (P1)
    pub const fn p1(&self) -> u8 {
        self.p1
    }

    /// Second parameter (P2)
    pub const fn p2(&self) -> u8 {
        self.p2
    }

    /// Command payload data, if any
    pub fn data(&self) -> Option<&[u8]> {
        self.data.as_deref()
    }

    /// Expected response length (Le), if declared
    pub const fn expected_length(&self) -> Option<ExpectedLength> {
        self.le
    }

    /// Calculate length of serialized command
    pub fn command_length(&self) -> usize {
        // Header (CLA, INS, P1, P2) is always 4 bytes
        let data_len = self.data.as_ref().map_or(0, |data| 1 + data.len());
        4 + data_len + usize::from(self.le.is_some())
    }

    /// Convert to raw APDU bytes
    pub fn to_bytes(&self) -> Bytes {
        let mut buffer = BytesMut::with_capacity(self.command_length());

        buffer.put_u8(self.cla);
        buffer.put_u8(self.ins);
        buffer.put_u8(self.p1);
        buffer.put_u8(self.p2);

        // Lc is always a single byte, data length was checked on construction
        if let Some(data) = &self.data {
            buffer.put_u8(data.len() as u8);
            buffer.put_slice(data);
        }

        if let Some(le) = self.le {
            buffer.put_u8(le);
        }

        buffer.freeze()
    }

    /// Parse a short command APDU from raw bytes
    pub fn from_bytes(data: &[u8]) -> Result<Self, CommandError> {
        if data.len() < 4 {
            return Err(CommandError::InvalidCommandLength(data.len()));
        }

        let mut command = Self::new(data[0], data[1], data[2], data[3]);

        match data.len() {
            // Case 1: header only
            4 => {}
            // Case 2: header + Le
            5 => command.le = Some(data[4]),
            len => {
                let lc = data[4] as usize;
                if lc == 0 {
                    return Err(CommandError::InvalidCommandLength(len));
                }

                let body_end = 5 + lc;
                command.data = Some(Bytes::copy_from_slice(
                    data.get(5..body_end)
                        .ok_or(CommandError::InvalidCommandLength(len))?,
                ));

                // Case 3 has nothing after the body, case 4 has exactly Le
                match len - body_end {
                    0 => {}
                    1 => command.le = Some(data[body_end]),
                    _ => return Err(CommandError::InvalidCommandLength(len)),
                }
            }
        }

        Ok(command)
    }
}

fn checked_data(data: Bytes) -> Result<Option<Bytes>, CommandError> {
    if data.len() > MAX_DATA_LENGTH {
        return Err(CommandError::data_too_long(data.len(), MAX_DATA_LENGTH));
    }
    Ok((!data.is_empty()).then_some(data))
}

impl fmt::Debug for CommandApdu {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CommandApdu")
            .field("cla", &format_args!("{:#04x}", self.cla))
            .field("ins", &format_args!("{:#04x}", self.ins))
            .field("p1", &format_args!("{:#04x}", self.p1))
            .field("p2", &format_args!("{:#04x}", self.p2))
            .field("data", &self.data.as_ref().map(hex::encode_upper))
            .field("le", &self.le)
            .finish()
    }
}

impl fmt::Display for CommandApdu {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", hex::encode_upper(self.to_bytes()))
    }
}
