//! Named command definitions and their rendering parameters

use std::borrow::Cow;
use std::fmt;

use bytes::Bytes;

use super::{CommandTemplate, RegistryError};
use crate::command::CommandApdu;
use crate::response::status::StatusWord;

/// Status words a command is expected to complete with
///
/// A `None` byte matches any value, so `61 xx` is written
/// `StatusPattern::sw1(0x61)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct StatusPattern {
    sw1: Option<u8>,
    sw2: Option<u8>,
}

impl StatusPattern {
    /// Matches every status word
    pub const ANY: Self = Self {
        sw1: None,
        sw2: None,
    };

    /// Matches `90 00` only
    pub const SUCCESS: Self = Self::exact(StatusWord::new(0x90, 0x00));

    /// Matches exactly this status word
    pub const fn exact(status: StatusWord) -> Self {
        Self {
            sw1: Some(status.sw1),
            sw2: Some(status.sw2),
        }
    }

    /// Matches any status word with this SW1
    pub const fn sw1(sw1: u8) -> Self {
        Self {
            sw1: Some(sw1),
            sw2: None,
        }
    }

    /// Check a status word against the pattern
    pub const fn matches(&self, status: StatusWord) -> bool {
        let sw1 = match self.sw1 {
            Some(b) => b == status.sw1,
            None => true,
        };
        let sw2 = match self.sw2 {
            Some(b) => b == status.sw2,
            None => true,
        };
        sw1 && sw2
    }
}

impl fmt::Display for StatusPattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let byte = |b: Option<u8>| b.map_or_else(|| "xx".to_string(), |b| format!("{b:02X}"));
        write!(f, "{} {}", byte(self.sw1), byte(self.sw2))
    }
}

/// Caller-supplied values for a command template
///
/// `bytes` fills the template wildcards in wire order (CLA, P1, P2, Le);
/// `data` becomes the data field.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Parameters {
    bytes: Vec<u8>,
    data: Option<Bytes>,
}

impl Parameters {
    /// No wildcard bytes and no data
    pub const fn new() -> Self {
        Self {
            bytes: Vec::new(),
            data: None,
        }
    }

    /// Append wildcard bytes
    pub fn with_bytes(mut self, bytes: impl IntoIterator<Item = u8>) -> Self {
        self.bytes.extend(bytes);
        self
    }

    /// Set the data field
    pub fn with_data(mut self, data: impl AsRef<[u8]>) -> Self {
        self.data = Some(Bytes::copy_from_slice(data.as_ref()));
        self
    }

    /// Wildcard bytes
    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }

    /// Data field, if set
    pub const fn data(&self) -> Option<&Bytes> {
        self.data.as_ref()
    }
}

/// A named command from the registry
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandDefinition {
    name: Cow<'static, str>,
    template: CommandTemplate,
    reference: Cow<'static, str>,
    description: Cow<'static, str>,
    success: StatusPattern,
}

impl CommandDefinition {
    /// Define a command with static metadata
    pub const fn new(
        name: &'static str,
        template: CommandTemplate,
        reference: &'static str,
        description: &'static str,
    ) -> Self {
        Self {
            name: Cow::Borrowed(name),
            template,
            reference: Cow::Borrowed(reference),
            description: Cow::Borrowed(description),
            success: StatusPattern::SUCCESS,
        }
    }

    /// Define a command at runtime
    pub fn custom(
        name: impl Into<String>,
        template: CommandTemplate,
        reference: impl Into<String>,
    ) -> Self {
        Self {
            name: Cow::Owned(name.into()),
            template,
            reference: Cow::Owned(reference.into()),
            description: Cow::Borrowed(""),
            success: StatusPattern::SUCCESS,
        }
    }

    /// Override the expected completion status
    pub const fn with_success(mut self, success: StatusPattern) -> Self {
        self.success = success;
        self
    }

    /// Command name as listed on the reference sheet
    pub fn name(&self) -> &str {
        &self.name
    }

    /// APDU template
    pub const fn template(&self) -> &CommandTemplate {
        &self.template
    }

    /// Standard or vendor document the command comes from
    pub fn reference(&self) -> &str {
        &self.reference
    }

    /// Short human description
    pub fn description(&self) -> &str {
        &self.description
    }

    /// Expected completion status
    pub const fn success(&self) -> StatusPattern {
        self.success
    }

    /// Whether a final status word counts as success for this command
    pub const fn accepts(&self, status: StatusWord) -> bool {
        self.success.matches(status)
    }

    /// Render into a concrete APDU
    pub fn render(&self, params: &Parameters) -> Result<CommandApdu, RegistryError> {
        self.template.render(params.bytes(), params.data())
    }
}

impl fmt::Display for CommandDefinition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} [{}]", self.name, self.template)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registry::template::{ANY, fixed};

    #[test]
    fn test_status_pattern() {
        assert!(StatusPattern::SUCCESS.matches(StatusWord::new(0x90, 0x00)));
        assert!(!StatusPattern::SUCCESS.matches(StatusWord::new(0x90, 0x01)));
        assert!(StatusPattern::sw1(0x9F).matches(StatusWord::new(0x9F, 0x1A)));
        assert!(!StatusPattern::sw1(0x9F).matches(StatusWord::new(0x90, 0x00)));
        assert!(StatusPattern::ANY.matches(StatusWord::new(0x6A, 0x82)));
        assert_eq!(StatusPattern::sw1(0x61).to_string(), "61 xx");
    }

    #[test]
    fn test_custom_definition_renders() {
        let def = CommandDefinition::custom(
            "READ CARD ID",
            CommandTemplate::new(fixed(0x80), 0xCA, ANY, fixed(0x00)).with_le(fixed(0x00)),
            "vendor",
        );
        let cmd = def
            .render(&Parameters::new().with_bytes([0x9F]))
            .unwrap();
        assert_eq!(cmd.to_bytes().as_ref(), &[0x80, 0xCA, 0x9F, 0x00, 0x00]);
        assert_eq!(def.to_string(), "READ CARD ID [80 CA xx 00 00]");
    }
}
