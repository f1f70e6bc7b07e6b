//! Command system: handler trait, module/descriptor types, and registry.
//!
//! A `CommandModule` is what a loader produces: every descriptor field
//! is optional until the registry validates it into a `CommandDescriptor`.

mod registry;

pub use registry::CommandRegistry;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use crate::context::Context;
use crate::platform::Invocation;

/// How a command can be invoked.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum CommandType {
    /// Prefixed text message only.
    Text,
    /// Remote (slash) interface only.
    Slash,
    /// Both.
    Both,
}

impl CommandType {
    pub fn accepts_text(self) -> bool {
        matches!(self, CommandType::Text | CommandType::Both)
    }

    pub fn accepts_slash(self) -> bool {
        matches!(self, CommandType::Slash | CommandType::Both)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            CommandType::Text => "TEXT",
            CommandType::Slash => "SLASH",
            CommandType::Both => "BOTH",
        }
    }
}

/// Parameter kinds understood by the remote command interface.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum OptionKind {
    String,
    Integer,
    Boolean,
    User,
    Channel,
    Role,
    Mentionable,
    Number,
    Attachment,
}

/// One declared parameter of a command.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CommandOption {
    pub name: String,
    pub description: String,
    #[serde(rename = "type")]
    pub kind: OptionKind,
    #[serde(default)]
    pub required: bool,
}

impl CommandOption {
    pub fn new(name: &str, description: &str, kind: OptionKind, required: bool) -> Self {
        Self {
            name: name.to_string(),
            description: description.to_string(),
            kind,
            required,
        }
    }
}

/// Trait that all command handlers implement.
#[async_trait]
pub trait CommandHandler: Send + Sync {
    /// Run the command. `args` are whitespace-split words for text
    /// invocations, and option values in declaration order for slash
    /// invocations (absent optional values are empty strings).
    async fn run(&self, ctx: &Context, invocation: &Invocation, args: &[String])
        -> anyhow::Result<()>;
}

/// An unvalidated command as produced by a loader.
#[derive(Clone)]
pub struct CommandModule {
    pub name: Option<String>,
    pub description: Option<String>,
    pub kind: Option<CommandType>,
    pub permission: Option<String>,
    pub options: Vec<CommandOption>,
    pub handler: Arc<dyn CommandHandler>,
    /// Where the module came from (file name or "static"), for error messages.
    pub origin: String,
}

impl CommandModule {
    pub fn new(handler: Arc<dyn CommandHandler>) -> Self {
        Self {
            name: None,
            description: None,
            kind: None,
            permission: None,
            options: Vec::new(),
            handler,
            origin: "static".to_string(),
        }
    }

    pub fn name(mut self, name: &str) -> Self {
        self.name = Some(name.to_string());
        self
    }

    pub fn description(mut self, description: &str) -> Self {
        self.description = Some(description.to_string());
        self
    }

    pub fn kind(mut self, kind: CommandType) -> Self {
        self.kind = Some(kind);
        self
    }

    pub fn permission(mut self, permission: &str) -> Self {
        self.permission = Some(permission.to_string());
        self
    }

    pub fn option(mut self, option: CommandOption) -> Self {
        self.options.push(option);
        self
    }

    pub fn origin(mut self, origin: &str) -> Self {
        self.origin = origin.to_string();
        self
    }

    /// Validate required fields. Empty strings count as missing.
    pub fn validate(self) -> Result<CommandDescriptor, crate::error::CommandError> {
        let present = |v: &Option<String>| v.as_deref().is_some_and(|s| !s.trim().is_empty());
        if !present(&self.name) || !present(&self.description) || self.kind.is_none() {
            return Err(crate::error::CommandError::new(format!(
                "Command Name/Description/Type not set! ({})",
                self.origin
            )));
        }

        Ok(CommandDescriptor {
            name: self.name.unwrap_or_default(),
            description: self.description.unwrap_or_default(),
            kind: self.kind.unwrap_or(CommandType::Text),
            permission: self.permission.filter(|p| !p.trim().is_empty()),
            options: self.options,
            handler: self.handler,
        })
    }
}

impl std::fmt::Debug for CommandModule {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CommandModule")
            .field("name", &self.name)
            .field("description", &self.description)
            .field("kind", &self.kind)
            .field("permission", &self.permission)
            .field("options", &self.options)
            .field("origin", &self.origin)
            .finish_non_exhaustive()
    }
}

/// A validated command.
#[derive(Clone)]
pub struct CommandDescriptor {
    pub name: String,
    pub description: String,
    pub kind: CommandType,
    pub permission: Option<String>,
    pub options: Vec<CommandOption>,
    pub handler: Arc<dyn CommandHandler>,
}

impl std::fmt::Debug for CommandDescriptor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CommandDescriptor")
            .field("name", &self.name)
            .field("description", &self.description)
            .field("kind", &self.kind)
            .field("permission", &self.permission)
            .field("options", &self.options)
            .finish_non_exhaustive()
    }
}

/// Metadata pushed to the platform's remote command interface.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RemoteCommand {
    pub name: String,
    pub description: String,
    pub permissions: Vec<String>,
    pub options: Vec<CommandOption>,
    pub default_permission: bool,
}

impl From<&CommandDescriptor> for RemoteCommand {
    fn from(cmd: &CommandDescriptor) -> Self {
        Self {
            name: cmd.name.to_lowercase(),
            description: cmd.description.clone(),
            permissions: Vec::new(),
            options: cmd.options.clone(),
            default_permission: true,
        }
    }
}
