//! Card serial numbers derived from card UIDs
//!
//! Directory services store a card as an unsigned integer built from its UID
//! read little-endian: byte 0 is the least significant. Only the low eight
//! bytes of longer UIDs fit and the rest are dropped.

use std::fmt;

use bytes::Bytes;

/// Numeric card identifier
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CardSerial(u64);

impl CardSerial {
    /// Interpret UID bytes as a little-endian integer
    pub fn from_uid(uid: &[u8]) -> Self {
        let mut bytes = [0u8; 8];
        let len = uid.len().min(bytes.len());
        bytes[..len].copy_from_slice(&uid[..len]);
        Self(u64::from_le_bytes(bytes))
    }

    /// Numeric value
    pub const fn value(&self) -> u64 {
        self.0
    }

    /// All eight little-endian bytes
    pub const fn to_le_bytes(&self) -> [u8; 8] {
        self.0.to_le_bytes()
    }

    /// The low `len` bytes (at most 8), least significant first
    pub fn to_uid_bytes(&self, len: usize) -> Vec<u8> {
        self.0.to_le_bytes()[..len.min(8)].to_vec()
    }
}

impl From<u64> for CardSerial {
    fn from(value: u64) -> Self {
        Self(value)
    }
}

impl From<CardSerial> for u64 {
    fn from(serial: CardSerial) -> Self {
        serial.0
    }
}

impl fmt::Display for CardSerial {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// UID of a card and the serial derived from it
#[derive(Clone, PartialEq, Eq, Hash)]
pub struct CardIdentity {
    uid: Bytes,
    serial: CardSerial,
}

impl CardIdentity {
    /// Build from the UID returned by the reader
    pub fn from_uid(uid: impl Into<Bytes>) -> Self {
        let uid = uid.into();
        let serial = CardSerial::from_uid(&uid);
        Self { uid, serial }
    }

    /// Raw UID bytes
    pub const fn uid(&self) -> &Bytes {
        &self.uid
    }

    /// Derived serial
    pub const fn serial(&self) -> CardSerial {
        self.serial
    }
}

impl fmt::Debug for CardIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CardIdentity")
            .field("uid", &hex::encode_upper(&self.uid))
            .field("serial", &self.serial.0)
            .finish()
    }
}
