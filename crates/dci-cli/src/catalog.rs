//! Registry of device commands known to the client.

use dci_protocol::CommandDefinition;
use dci_protocol::doremi::builtin_commands;
use thiserror::Error;

/// Immutable name-to-definition registry.
///
/// Names are case-sensitive and keep registration order, so listings are
/// stable between runs.
#[derive(Debug, Clone, Default)]
pub struct CommandCatalog {
    commands: Vec<CommandDefinition>,
}

impl CommandCatalog {
    /// Creates an empty catalog.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            commands: Vec::new(),
        }
    }

    /// Builds the catalog of built-in device commands.
    ///
    /// # Errors
    ///
    /// Returns [`CatalogError::DuplicateCommand`] if the built-in table
    /// declares a name twice.
    pub fn builtin() -> Result<Self, CatalogError> {
        Self::from_definitions(builtin_commands().iter().copied())
    }

    /// Builds a catalog from `definitions` in order.
    ///
    /// # Errors
    ///
    /// Returns [`CatalogError::DuplicateCommand`] on the first repeated name.
    pub fn from_definitions<I>(definitions: I) -> Result<Self, CatalogError>
    where
        I: IntoIterator<Item = CommandDefinition>,
    {
        let mut catalog = Self::new();
        for definition in definitions {
            catalog.register(definition)?;
        }
        Ok(catalog)
    }

    /// Adds a definition.
    ///
    /// # Errors
    ///
    /// Returns [`CatalogError::DuplicateCommand`] when the name is taken.
    pub fn register(&mut self, definition: CommandDefinition) -> Result<(), CatalogError> {
        if self.contains(definition.name) {
            return Err(CatalogError::DuplicateCommand(definition.name.to_owned()));
        }
        self.commands.push(definition);
        Ok(())
    }

    /// Resolves a command name.
    ///
    /// # Errors
    ///
    /// Returns [`CatalogError::UnknownCommand`] when nothing is registered
    /// under `name`.
    pub fn lookup(&self, name: &str) -> Result<&CommandDefinition, CatalogError> {
        self.commands
            .iter()
            .find(|definition| definition.name == name)
            .ok_or_else(|| CatalogError::UnknownCommand(name.to_owned()))
    }

    /// Whether `name` is registered.
    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.commands.iter().any(|definition| definition.name == name)
    }

    /// Registered names in registration order.
    pub fn names(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.commands.iter().map(|definition| definition.name)
    }

    /// Registered definitions in registration order.
    pub fn definitions(&self) -> impl Iterator<Item = &CommandDefinition> {
        self.commands.iter()
    }

    /// Number of registered commands.
    #[must_use]
    pub fn len(&self) -> usize {
        self.commands.len()
    }

    /// Whether the catalog is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.commands.is_empty()
    }
}

/// Catalog registration and lookup failures.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum CatalogError {
    /// No command is registered under the name.
    #[error("unknown command '{0}'")]
    UnknownCommand(String),
    /// The name is already registered.
    #[error("command '{0}' is already registered")]
    DuplicateCommand(String),
}

/// Renders `name param1 param2` for listings and help.
#[must_use]
pub fn usage_line(definition: &CommandDefinition) -> String {
    let mut line = String::from(definition.name);
    for parameter in definition.parameter_names() {
        line.push_str(" <");
        line.push_str(parameter);
        line.push('>');
    }
    line
}

#[cfg(test)]
mod tests {
    use super::*;
    use dci_protocol::doremi::{GET_CPL_INFO, GET_CPL_LIST, GET_SPL_LIST};
    use rstest::{fixture, rstest};

    #[fixture]
    fn catalog() -> CommandCatalog {
        CommandCatalog::builtin().expect("built-in catalog")
    }

    #[rstest]
    fn every_registered_name_resolves(catalog: CommandCatalog) {
        for name in catalog.names() {
            let definition = catalog.lookup(name).expect("registered name resolves");
            assert_eq!(definition.name, name);
        }
    }

    #[rstest]
    fn names_follow_registration_order(catalog: CommandCatalog) {
        let names: Vec<_> = catalog.names().collect();
        assert_eq!(names, ["GetCPLList", "GetSPLList", "GetCPLInfo"]);
    }

    #[rstest]
    #[case("NoSuchCommand")]
    #[case("getcpllist")]
    #[case("")]
    fn unregistered_names_are_unknown(catalog: CommandCatalog, #[case] name: &str) {
        assert_eq!(
            catalog.lookup(name),
            Err(CatalogError::UnknownCommand(name.to_owned()))
        );
    }

    #[test]
    fn duplicate_registration_is_rejected() {
        let result = CommandCatalog::from_definitions([GET_CPL_LIST, GET_SPL_LIST, GET_CPL_LIST]);
        assert_eq!(
            result.map(|catalog| catalog.len()),
            Err(CatalogError::DuplicateCommand(String::from("GetCPLList")))
        );
    }

    #[test]
    fn usage_lists_parameters() {
        assert_eq!(usage_line(&GET_CPL_INFO), "GetCPLInfo <uuid>");
        assert_eq!(usage_line(&GET_CPL_LIST), "GetCPLList");
    }
}
