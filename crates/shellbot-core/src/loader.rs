//! Module loading: where command and event modules come from.
//!
//! Two loaders ship with the crate:
//!
//! - [`StaticModules`]: the host hands over ordered modules directly.
//! - [`DirectoryLoader`]: `*.json` manifests under
//!   `<sourcesFolder>/<commandFolder>` and `<sourcesFolder>/<eventsFolder>`,
//!   each bound to a compiled handler from a [`HandlerCatalog`].

use serde::Deserialize;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::debug;

use crate::command::{CommandHandler, CommandModule, CommandOption, CommandType};
use crate::config::RuntimeConfig;
use crate::error::{BootError, CommandError, EventError};
use crate::event::{EventHandler, EventModule};

/// File extension that marks a module manifest.
pub const MODULE_EXTENSION: &str = ".json";

/// Source of command and event modules.
pub trait ModuleLoader: Send + Sync {
    fn load_commands(&self, config: &RuntimeConfig) -> Result<Vec<CommandModule>, BootError>;
    fn load_events(&self, config: &RuntimeConfig) -> Result<Vec<EventModule>, BootError>;
}

/// List module files in `base/subfolder`, in directory listing order.
///
/// Filesystem errors (a missing folder, say) are returned as-is.
pub fn discover(base: &Path, subfolder: &str) -> std::io::Result<Vec<PathBuf>> {
    let dir = base.join(subfolder);
    let mut files = Vec::new();
    for entry in std::fs::read_dir(&dir)? {
        let entry = entry?;
        if entry.file_name().to_string_lossy().ends_with(MODULE_EXTENSION) {
            files.push(entry.path());
        }
    }
    debug!(dir = %dir.display(), count = files.len(), "Discovered modules");
    Ok(files)
}

// ── Static Modules ──────────────────────────────────────────────────

/// Explicitly registered modules, returned in insertion order.
#[derive(Clone, Default)]
pub struct StaticModules {
    commands: Vec<CommandModule>,
    events: Vec<EventModule>,
}

impl StaticModules {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn command(mut self, module: CommandModule) -> Self {
        self.commands.push(module);
        self
    }

    pub fn event(mut self, module: EventModule) -> Self {
        self.events.push(module);
        self
    }
}

impl ModuleLoader for StaticModules {
    fn load_commands(&self, _config: &RuntimeConfig) -> Result<Vec<CommandModule>, BootError> {
        Ok(self.commands.clone())
    }

    fn load_events(&self, _config: &RuntimeConfig) -> Result<Vec<EventModule>, BootError> {
        Ok(self.events.clone())
    }
}

// ── Handler Catalog ─────────────────────────────────────────────────

/// Compiled handlers, keyed by the name manifests refer to.
#[derive(Clone, Default)]
pub struct HandlerCatalog {
    commands: HashMap<String, Arc<dyn CommandHandler>>,
    events: HashMap<String, Arc<dyn EventHandler>>,
}

impl HandlerCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a command handler. Replaces any existing handler with the same key.
    pub fn with_command(mut self, key: &str, handler: Arc<dyn CommandHandler>) -> Self {
        self.commands.insert(key.to_string(), handler);
        self
    }

    /// Register an event handler. Replaces any existing handler with the same key.
    pub fn with_event(mut self, key: &str, handler: Arc<dyn EventHandler>) -> Self {
        self.events.insert(key.to_string(), handler);
        self
    }

    pub fn command(&self, key: &str) -> Option<Arc<dyn CommandHandler>> {
        self.commands.get(key).cloned()
    }

    pub fn event(&self, key: &str) -> Option<Arc<dyn EventHandler>> {
        self.events.get(key).cloned()
    }
}

// ── Directory Loader ────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct CommandManifest {
    name: Option<String>,
    description: Option<String>,
    #[serde(rename = "type")]
    kind: Option<CommandType>,
    permission: Option<String>,
    #[serde(default, alias = "slashCommandOptions")]
    options: Vec<CommandOption>,
    handler: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct EventManifest {
    event: Option<String>,
    handler: Option<String>,
}

/// Loads manifests from the configured folders.
pub struct DirectoryLoader {
    catalog: HandlerCatalog,
}

impl DirectoryLoader {
    pub fn new(catalog: HandlerCatalog) -> Self {
        Self { catalog }
    }
}

fn read_manifest<T: serde::de::DeserializeOwned>(path: &Path) -> Result<T, BootError> {
    let text = std::fs::read_to_string(path)?;
    serde_json::from_str(&text).map_err(|source| BootError::Manifest {
        path: path.to_path_buf(),
        source,
    })
}

fn file_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default()
}

fn file_stem(path: &Path) -> String {
    path.file_stem()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default()
}

impl ModuleLoader for DirectoryLoader {
    fn load_commands(&self, config: &RuntimeConfig) -> Result<Vec<CommandModule>, BootError> {
        let mut modules = Vec::new();
        for path in discover(&config.sources_folder, &config.command_folder)? {
            let manifest: CommandManifest = read_manifest(&path)?;
            let origin = file_name(&path);
            let key = manifest.handler.unwrap_or_else(|| file_stem(&path));
            let handler = self.catalog.command(&key).ok_or_else(|| {
                CommandError::new(format!("No command handler '{key}' for {origin}"))
            })?;

            modules.push(CommandModule {
                name: manifest.name,
                description: manifest.description,
                kind: manifest.kind,
                permission: manifest.permission,
                options: manifest.options,
                handler,
                origin,
            });
        }
        Ok(modules)
    }

    fn load_events(&self, config: &RuntimeConfig) -> Result<Vec<EventModule>, BootError> {
        let mut modules = Vec::new();
        for path in discover(&config.sources_folder, &config.events_folder)? {
            let manifest: EventManifest = read_manifest(&path)?;
            let origin = file_name(&path);
            let key = manifest.handler.unwrap_or_else(|| file_stem(&path));
            let handler = self.catalog.event(&key).ok_or_else(|| {
                EventError::new(format!("No event handler '{key}' for {origin}"))
            })?;

            modules.push(EventModule {
                event: manifest.event,
                handler,
                origin,
            });
        }
        Ok(modules)
    }
}
