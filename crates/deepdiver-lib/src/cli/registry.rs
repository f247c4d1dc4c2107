use clap::Command;
use serde::Serialize;
use std::collections::HashMap;
use std::fmt;

/// Groups used for help output and registry validation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum CommandCategory {
    Core,
    Browser,
    Notebook,
    Podcast,
    Session,
}

impl CommandCategory {
    /// Returns all category variants in display order.
    pub fn all() -> &'static [CommandCategory] {
        &[
            CommandCategory::Core,
            CommandCategory::Browser,
            CommandCategory::Notebook,
            CommandCategory::Podcast,
            CommandCategory::Session,
        ]
    }
}

impl fmt::Display for CommandCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CommandCategory::Core => write!(f, "core"),
            CommandCategory::Browser => write!(f, "browser"),
            CommandCategory::Notebook => write!(f, "notebook"),
            CommandCategory::Podcast => write!(f, "podcast"),
            CommandCategory::Session => write!(f, "session"),
        }
    }
}

/// Metadata for a registered command.
#[derive(Debug, Clone)]
pub struct CommandMeta {
    pub name: String,
    pub category: CommandCategory,
    pub description: String,
    pub command: Command,
}

/// Centralized command registration.
pub struct CommandRegistry {
    commands: HashMap<String, CommandMeta>,
    root: Command,
}

impl CommandRegistry {
    pub fn new(root: Command) -> Self {
        Self {
            commands: HashMap::new(),
            root,
        }
    }

    /// Registers a command. Returns an error if a command with the same name already exists.
    pub fn register(&mut self, meta: CommandMeta) -> crate::errors::Result<()> {
        if self.commands.contains_key(&meta.name) {
            return Err(crate::errors::DeepDiverError::Command(format!(
                "duplicate command name: {}",
                meta.name
            )));
        }
        self.commands.insert(meta.name.clone(), meta);
        Ok(())
    }

    pub fn get_by_category(&self, cat: CommandCategory) -> Vec<&CommandMeta> {
        let mut cmds: Vec<_> = self
            .commands
            .values()
            .filter(|m| m.category == cat)
            .collect();
        cmds.sort_by(|a, b| a.name.cmp(&b.name));
        cmds
    }

    /// Returns problems with the registry, such as categories with no commands.
    pub fn validate(&self) -> Vec<String> {
        CommandCategory::all()
            .iter()
            .filter(|cat| self.get_by_category(**cat).is_empty())
            .map(|cat| format!("empty category: {}", cat))
            .collect()
    }

    /// Consumes the registry and builds the final clap Command with all
    /// subcommands attached in category order.
    pub fn build_root(self) -> Command {
        let mut root = self.root;
        for cat in CommandCategory::all() {
            let mut metas: Vec<&CommandMeta> = self
                .commands
                .values()
                .filter(|m| m.category == *cat)
                .collect();
            metas.sort_by(|a, b| a.name.cmp(&b.name));
            for meta in metas {
                root = root.subcommand(meta.command.clone());
            }
        }
        root
    }

    pub fn len(&self) -> usize {
        self.commands.len()
    }

    pub fn is_empty(&self) -> bool {
        self.commands.is_empty()
    }

    /// Returns a sorted list of all registered command names.
    pub fn command_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.commands.keys().cloned().collect();
        names.sort();
        names
    }
}

/// Builder for constructing `CommandMeta` instances.
pub struct CommandBuilder {
    category: Option<CommandCategory>,
    command: Command,
}

impl CommandBuilder {
    /// Creates a builder from a clap Command; name and description come from it.
    pub fn from_clap(cmd: Command) -> Self {
        Self {
            category: None,
            command: cmd,
        }
    }

    pub fn category(mut self, cat: CommandCategory) -> Self {
        self.category = Some(cat);
        self
    }

    /// Builds the `CommandMeta`. Defaults category to `Core` if not set.
    pub fn build(self) -> CommandMeta {
        let description = self
            .command
            .get_about()
            .map(|s| s.to_string())
            .unwrap_or_default();
        CommandMeta {
            name: self.command.get_name().to_string(),
            category: self.category.unwrap_or(CommandCategory::Core),
            description,
            command: self.command,
        }
    }
}
