//! Command templates in APDU reference sheet notation
//!
//! A template is written the way the reference sheet lists commands:
//! `CLA INS P1 P2 [data|data:NN] [Le]`, each byte as two hex digits or `xx`
//! for a position the caller fills in. INS is always fixed. `data` marks a
//! variable length data field and `data:NN` one of exactly `NN` (hex) bytes;
//! Lc is never written, it is derived from the data.

use std::fmt;
use std::str::FromStr;

use bytes::Bytes;

use super::RegistryError;
use crate::command::CommandApdu;

/// One header or Le position of a template
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TemplateByte {
    /// A byte fixed by the template
    Fixed(u8),
    /// A byte supplied by the caller (`xx` on the sheet)
    Wildcard,
}

impl TemplateByte {
    const fn is_wildcard(self) -> bool {
        matches!(self, Self::Wildcard)
    }
}

impl fmt::Display for TemplateByte {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Fixed(b) => write!(f, "{b:02X}"),
            Self::Wildcard => f.write_str("xx"),
        }
    }
}

/// Shape of the data field of a template
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DataShape {
    /// No data field (no Lc)
    None,
    /// Data field of any length from 1 to 255 bytes
    Variable,
    /// Data field of exactly this many bytes
    Fixed(u8),
}

/// A command APDU with wildcard positions
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct CommandTemplate {
    cla: TemplateByte,
    ins: u8,
    p1: TemplateByte,
    p2: TemplateByte,
    data: DataShape,
    le: Option<TemplateByte>,
}

/// Shorthand for a fixed template byte
pub const fn fixed(byte: u8) -> TemplateByte {
    TemplateByte::Fixed(byte)
}

/// Shorthand for a wildcard template byte
pub const ANY: TemplateByte = TemplateByte::Wildcard;

impl CommandTemplate {
    /// Create a header-only template
    pub const fn new(cla: TemplateByte, ins: u8, p1: TemplateByte, p2: TemplateByte) -> Self {
        Self {
            cla,
            ins,
            p1,
            p2,
            data: DataShape::None,
            le: None,
        }
    }

    /// Set the data field shape
    pub const fn with_data(mut self, data: DataShape) -> Self {
        self.data = data;
        self
    }

    /// Set the Le position
    pub const fn with_le(mut self, le: TemplateByte) -> Self {
        self.le = Some(le);
        self
    }

    /// Instruction byte
    pub const fn instruction(&self) -> u8 {
        self.ins
    }

    /// Data field shape
    pub const fn data_shape(&self) -> DataShape {
        self.data
    }

    /// Number of bytes the caller must supply, in wire order
    pub fn wildcard_count(&self) -> usize {
        [Some(self.cla), Some(self.p1), Some(self.p2), self.le]
            .into_iter()
            .flatten()
            .filter(|b| b.is_wildcard())
            .count()
    }

    /// Substitute the wildcards and attach the data field
    pub fn render(&self, bytes: &[u8], data: Option<&Bytes>) -> Result<CommandApdu, RegistryError> {
        let expected = self.wildcard_count();
        if bytes.len() != expected {
            return Err(RegistryError::ParameterCountMismatch {
                expected,
                actual: bytes.len(),
            });
        }

        let data = match (self.data, data.filter(|d| !d.is_empty())) {
            (DataShape::None, None) => None,
            (DataShape::None, Some(_)) => return Err(RegistryError::UnexpectedData),
            (_, None) => return Err(RegistryError::MissingData),
            (DataShape::Fixed(len), Some(d)) if d.len() != usize::from(len) => {
                return Err(RegistryError::DataLengthMismatch {
                    expected: usize::from(len),
                    actual: d.len(),
                });
            }
            (_, Some(d)) => Some(d.clone()),
        };

        let mut fill = bytes.iter().copied();
        let mut resolve = |b: TemplateByte| match b {
            TemplateByte::Fixed(v) => v,
            // count checked above
            TemplateByte::Wildcard => fill.next().unwrap_or_default(),
        };

        let cla = resolve(self.cla);
        let p1 = resolve(self.p1);
        let p2 = resolve(self.p2);
        let le = self.le.map(resolve);

        Ok(CommandApdu::from_parts(cla, self.ins, p1, p2, data, le)?)
    }
}

impl fmt::Display for CommandTemplate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {:02X} {} {}", self.cla, self.ins, self.p1, self.p2)?;
        match self.data {
            DataShape::None => {}
            DataShape::Variable => f.write_str(" data")?,
            DataShape::Fixed(len) => write!(f, " data:{len:02X}")?,
        }
        if let Some(le) = self.le {
            write!(f, " {le}")?;
        }
        Ok(())
    }
}

impl FromStr for CommandTemplate {
    type Err = RegistryError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = |reason| RegistryError::InvalidTemplate {
            template: s.to_string(),
            reason,
        };

        let tokens: Vec<&str> = s.split_whitespace().collect();
        if tokens.len() < 4 {
            return Err(invalid("expected at least CLA INS P1 P2"));
        }

        let ins = match parse_byte(tokens[1]) {
            Some(TemplateByte::Fixed(ins)) => ins,
            Some(TemplateByte::Wildcard) => return Err(invalid("INS cannot be a wildcard")),
            None => return Err(invalid("INS is not a hex byte")),
        };
        let header = |token| parse_byte(token).ok_or_else(|| invalid("header byte is not hex or xx"));
        let mut template = Self::new(header(tokens[0])?, ins, header(tokens[2])?, header(tokens[3])?);

        let mut rest = tokens[4..].iter().peekable();
        if let Some(len) = rest.peek().map(|t| **t).and_then(|t| t.strip_prefix("data")) {
            template.data = if len.is_empty() {
                DataShape::Variable
            } else {
                len.strip_prefix(':')
                    .and_then(|len| u8::from_str_radix(len, 16).ok())
                    .filter(|len| *len > 0)
                    .map(DataShape::Fixed)
                    .ok_or_else(|| invalid("data length must be data:NN with NN in hex"))?
            };
            rest.next();
        }

        if let Some(token) = rest.next() {
            template.le = Some(parse_byte(token).ok_or_else(|| invalid("Le is not hex or xx"))?);
        }

        if rest.next().is_some() {
            return Err(invalid("trailing tokens after Le"));
        }

        Ok(template)
    }
}

fn parse_byte(token: &str) -> Option<TemplateByte> {
    if token.eq_ignore_ascii_case("xx") {
        return Some(TemplateByte::Wildcard);
    }
    if token.len() != 2 {
        return None;
    }
    u8::from_str_radix(token, 16).ok().map(TemplateByte::Fixed)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_sheet_notation() {
        let select: CommandTemplate = "00 A4 04 00 data 00".parse().unwrap();
        assert_eq!(
            select,
            CommandTemplate::new(fixed(0x00), 0xA4, fixed(0x04), fixed(0x00))
                .with_data(DataShape::Variable)
                .with_le(fixed(0x00))
        );
        assert_eq!(select.wildcard_count(), 0);

        let read: CommandTemplate = "A0 B0 xx XX xx".parse().unwrap();
        assert_eq!(read.wildcard_count(), 3);
        assert_eq!(read.data_shape(), DataShape::None);

        let verify: CommandTemplate = "A0 20 00 xx data:08".parse().unwrap();
        assert_eq!(verify.data_shape(), DataShape::Fixed(8));
        assert_eq!(verify.to_string(), "A0 20 00 xx data:08");
    }

    #[test]
    fn test_parse_rejects_bad_templates() {
        for bad in [
            "00 A4 04",
            "00 xx 04 00",
            "00 A4 4 00",
            "00 A4 04 00 data:zz",
            "00 A4 04 00 data:00",
            "00 A4 04 00 data 00 00",
            "00 A4 04 00 data08",
            "00 A4 04 00 datum",
        ] {
            assert!(
                matches!(
                    bad.parse::<CommandTemplate>(),
                    Err(RegistryError::InvalidTemplate { .. })
                ),
                "{bad} should not parse"
            );
        }
    }

    #[test]
    fn test_render_fills_wildcards_in_wire_order() {
        let read: CommandTemplate = "A0 B0 xx xx xx".parse().unwrap();
        let cmd = read.render(&[0x01, 0x02, 0x10], None).unwrap();
        assert_eq!(cmd.to_bytes().as_ref(), &[0xA0, 0xB0, 0x01, 0x02, 0x10]);
    }

    #[test]
    fn test_render_checks_parameter_count() {
        let read: CommandTemplate = "A0 B0 xx xx xx".parse().unwrap();
        assert_eq!(
            read.render(&[0x01], None),
            Err(RegistryError::ParameterCountMismatch {
                expected: 3,
                actual: 1
            })
        );
        assert_eq!(
            read.render(&[0x01, 0x02, 0x03, 0x04], None),
            Err(RegistryError::ParameterCountMismatch {
                expected: 3,
                actual: 4
            })
        );
    }

    #[test]
    fn test_render_checks_data_shape() {
        let verify: CommandTemplate = "A0 20 00 xx data:08".parse().unwrap();
        let pin = Bytes::from_static(&[0x31, 0x32, 0x33, 0x34, 0xFF, 0xFF, 0xFF, 0xFF]);

        assert_eq!(verify.render(&[0x01], None), Err(RegistryError::MissingData));
        assert_eq!(
            verify.render(&[0x01], Some(&pin.slice(..4))),
            Err(RegistryError::DataLengthMismatch {
                expected: 8,
                actual: 4
            })
        );
        let cmd = verify.render(&[0x01], Some(&pin)).unwrap();
        assert_eq!(cmd.p2(), 0x01);
        assert_eq!(cmd.data(), Some(pin.as_ref()));

        let sleep: CommandTemplate = "A0 FA 00 00 00".parse().unwrap();
        assert_eq!(
            sleep.render(&[], Some(&pin)),
            Err(RegistryError::UnexpectedData)
        );
    }
}
