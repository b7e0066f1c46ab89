//! Registry of named command templates
//!
//! Commands are looked up by name, case-insensitively, and rendered into
//! [`CommandApdu`]s by substituting caller-supplied bytes into the template's
//! wildcard positions. The registry is immutable once built and may be
//! shared between threads.

mod definition;
mod error;
mod table;
pub mod template;

use std::collections::HashMap;
use std::sync::LazyLock;

use tracing::warn;

pub use definition::{CommandDefinition, Parameters, StatusPattern};
pub use error::RegistryError;
pub use table::GET_UID;
pub use template::{CommandTemplate, DataShape, TemplateByte};

use crate::command::CommandApdu;

static BUILTIN: LazyLock<CommandRegistry> =
    LazyLock::new(|| CommandRegistry::from_definitions(table::BUILTIN.iter().cloned()));

/// Immutable set of command definitions keyed by name
#[derive(Debug, Clone, Default)]
pub struct CommandRegistry {
    definitions: Vec<CommandDefinition>,
    by_name: HashMap<String, usize>,
}

impl CommandRegistry {
    /// The reference sheet commands, built once per process
    pub fn builtin() -> &'static Self {
        &BUILTIN
    }

    /// Build a registry; a later definition replaces an earlier one of the same name
    pub fn from_definitions(definitions: impl IntoIterator<Item = CommandDefinition>) -> Self {
        definitions
            .into_iter()
            .fold(Self::default(), Self::with_definition)
    }

    /// Add or replace one definition
    pub fn with_definition(mut self, definition: CommandDefinition) -> Self {
        let key = definition.name().to_ascii_uppercase();
        match self.by_name.get(&key) {
            Some(&index) => {
                warn!(name = %key, "Replacing duplicate command definition");
                self.definitions[index] = definition;
            }
            None => {
                self.by_name.insert(key, self.definitions.len());
                self.definitions.push(definition);
            }
        }
        self
    }

    /// Find a definition by name, ignoring ASCII case
    pub fn lookup(&self, name: &str) -> Option<&CommandDefinition> {
        self.by_name
            .get(&name.trim().to_ascii_uppercase())
            .map(|&index| &self.definitions[index])
    }

    /// Look up a command and render it with the given parameters
    pub fn render(&self, name: &str, params: &Parameters) -> Result<CommandApdu, RegistryError> {
        self.lookup(name)
            .ok_or_else(|| RegistryError::UnknownCommand(name.to_string()))?
            .render(params)
    }

    /// Definitions in insertion order
    pub fn iter(&self) -> impl Iterator<Item = &CommandDefinition> {
        self.definitions.iter()
    }

    /// Number of definitions
    pub fn len(&self) -> usize {
        self.definitions.len()
    }

    /// Whether the registry has no definitions
    pub fn is_empty(&self) -> bool {
        self.definitions.is_empty()
    }
}
