//! Configuration options for the PC/SC transport

use cardwatch_core::ProtocolPreference;
use pcsc::{Protocols as PcscProtocols, Scope as PcscScope, ShareMode as PcscShareMode};

/// Sharing mode for card connections
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ShareMode {
    /// Exclusive access to the card
    Exclusive,
    /// Shared access to the card
    #[default]
    Shared,
    /// Direct connection to the reader
    Direct,
}

impl From<ShareMode> for PcscShareMode {
    fn from(mode: ShareMode) -> Self {
        match mode {
            ShareMode::Exclusive => Self::Exclusive,
            ShareMode::Shared => Self::Shared,
            ShareMode::Direct => Self::Direct,
        }
    }
}

/// Scope of the resource manager context
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Scope {
    /// Readers visible to the current user
    #[default]
    User,
    /// Readers visible to the whole system
    System,
}

impl From<Scope> for PcscScope {
    fn from(scope: Scope) -> Self {
        match scope {
            Scope::User => Self::User,
            Scope::System => Self::System,
        }
    }
}

/// Protocol mask passed to `SCardConnect`
pub(crate) const fn protocols_for(preference: ProtocolPreference) -> PcscProtocols {
    match preference {
        ProtocolPreference::Any => PcscProtocols::ANY,
        ProtocolPreference::T0 => PcscProtocols::T0,
        ProtocolPreference::T1 => PcscProtocols::T1,
        ProtocolPreference::Raw => PcscProtocols::RAW,
    }
}

/// Configuration options for the PC/SC transport
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PcscConfig {
    /// Sharing mode for card connections
    pub share_mode: ShareMode,
    /// Context scope
    pub scope: Scope,
}

impl PcscConfig {
    /// Shared connections in the user scope
    pub const fn new() -> Self {
        Self {
            share_mode: ShareMode::Shared,
            scope: Scope::User,
        }
    }

    /// Set the sharing mode
    pub const fn with_share_mode(mut self, mode: ShareMode) -> Self {
        self.share_mode = mode;
        self
    }

    /// Set the context scope
    pub const fn with_scope(mut self, scope: Scope) -> Self {
        self.scope = scope;
        self
    }
}
