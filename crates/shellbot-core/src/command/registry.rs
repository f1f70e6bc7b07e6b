use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex};
use tracing::debug;

use super::{CommandDescriptor, CommandModule, RemoteCommand};
use crate::error::CommandError;

/// Registry of validated commands.
///
/// Written once during boot, read-only afterwards. The cooldown set is
/// the only part that changes while the shell is live.
#[derive(Default)]
pub struct CommandRegistry {
    commands: HashMap<String, Arc<CommandDescriptor>>,
    help: Vec<Arc<CommandDescriptor>>,
    cooldowns: Mutex<HashSet<String>>,
}

impl CommandRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Validate and register a batch of modules.
    ///
    /// Every module is validated before anything is inserted, so a
    /// failure leaves the registry exactly as it was. Duplicate names
    /// replace the earlier entry in the map (the help list keeps both).
    pub fn register(&mut self, modules: Vec<CommandModule>) -> Result<(), CommandError> {
        let validated = modules
            .into_iter()
            .map(CommandModule::validate)
            .collect::<Result<Vec<_>, _>>()?;

        for cmd in validated {
            let cmd = Arc::new(cmd);
            debug!(command = %cmd.name, kind = cmd.kind.as_str(), "Registered command");
            self.commands.insert(cmd.name.clone(), Arc::clone(&cmd));
            self.help.push(cmd);
        }
        Ok(())
    }

    /// Get a command by exact name.
    pub fn get(&self, name: &str) -> Option<&Arc<CommandDescriptor>> {
        self.commands.get(name)
    }

    /// Find a text-capable command, exact name first, then ignoring case.
    ///
    /// The case-insensitive fallback walks the load order backwards, so
    /// the most recently loaded match wins, as it does for exact names.
    pub fn find_text(&self, name: &str) -> Option<&Arc<CommandDescriptor>> {
        self.commands
            .get(name)
            .filter(|cmd| cmd.kind.accepts_text())
            .or_else(|| {
                let wanted = name.to_lowercase();
                self.help
                    .iter()
                    .rev()
                    .find(|cmd| cmd.kind.accepts_text() && cmd.name.to_lowercase() == wanted)
            })
    }

    /// Find a remote-capable command by the lowercased name it was pushed under.
    pub fn find_remote(&self, name: &str) -> Option<&Arc<CommandDescriptor>> {
        let wanted = name.to_lowercase();
        self.help
            .iter()
            .rev()
            .find(|cmd| cmd.kind.accepts_slash() && cmd.name.to_lowercase() == wanted)
    }

    /// Commands in load order, for help listings.
    pub fn help(&self) -> &[Arc<CommandDescriptor>] {
        &self.help
    }

    /// Descriptor list for the platform's remote command interface.
    pub fn remote_commands(&self) -> Vec<RemoteCommand> {
        self.help
            .iter()
            .filter(|cmd| cmd.kind.accepts_slash())
            .map(|cmd| RemoteCommand::from(cmd.as_ref()))
            .collect()
    }

    /// Number of distinct command names.
    pub fn len(&self) -> usize {
        self.commands.len()
    }

    pub fn is_empty(&self) -> bool {
        self.commands.is_empty()
    }

    // ── Cooldowns ───────────────────────────────────────────────────

    /// Mark `key` as cooling down. Returns false if it already was.
    pub fn begin_cooldown(&self, key: &str) -> bool {
        self.cooldowns
            .lock()
            .map(|mut set| set.insert(key.to_string()))
            .unwrap_or(false)
    }

    pub fn end_cooldown(&self, key: &str) {
        if let Ok(mut set) = self.cooldowns.lock() {
            set.remove(key);
        }
    }

    pub fn is_cooling_down(&self, key: &str) -> bool {
        self.cooldowns
            .lock()
            .map(|set| set.contains(key))
            .unwrap_or(false)
    }
}
