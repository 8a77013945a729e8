//! Command registry for looking up commands by name.

use std::collections::HashMap;
use std::sync::Arc;

use super::builtin;
use super::traits::{Command, CommandKind};

/// Registry of available commands.
#[derive(Default)]
pub struct CommandRegistry {
    commands: HashMap<String, Arc<dyn Command>>,
}

impl CommandRegistry {
    /// Create a new empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// A registry holding every built-in command.
    pub fn with_builtins() -> Self {
        let mut registry = Self::new();
        builtin::register_builtins(&mut registry);
        registry
    }

    /// Register a command, replacing any of the same name.
    pub fn register(&mut self, command: impl Command + 'static) {
        self.register_arc(Arc::new(command));
    }

    /// Register a command that's already in an Arc.
    pub fn register_arc(&mut self, command: Arc<dyn Command>) {
        let name = command.name().to_string();
        self.commands.insert(name, command);
    }

    /// Look up a command by name.
    pub fn get(&self, name: &str) -> Option<Arc<dyn Command>> {
        self.commands.get(name).cloned()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.commands.contains_key(name)
    }

    /// List all command names, sorted.
    pub fn names(&self) -> Vec<&str> {
        let mut names: Vec<_> = self.commands.keys().map(|s| s.as_str()).collect();
        names.sort();
        names
    }

    /// Names of the commands of one kind, sorted.
    pub fn names_of(&self, kind: CommandKind) -> Vec<&str> {
        let mut names: Vec<_> = self
            .commands
            .values()
            .filter(|c| c.kind() == kind)
            .map(|c| c.name())
            .collect();
        names.sort();
        names
    }

    pub fn len(&self) -> usize {
        self.commands.len()
    }

    pub fn is_empty(&self) -> bool {
        self.commands.is_empty()
    }
}

impl std::fmt::Debug for CommandRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CommandRegistry")
            .field("commands", &self.names())
            .finish()
    }
}
