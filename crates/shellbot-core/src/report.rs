//! Boot report: what was loaded, rendered as tables.

use tabled::settings::Style;
use tabled::{Table, Tabled};
use tracing::info;

use crate::command::CommandRegistry;
use crate::event::EventRegistry;

/// One loaded command as shown in the report.
#[derive(Debug, Clone, PartialEq, Eq, Tabled)]
pub struct CommandRow {
    #[tabled(rename = "Command")]
    pub name: String,
    #[tabled(rename = "Type")]
    pub kind: String,
    #[tabled(rename = "Permission")]
    pub permission: String,
    #[tabled(rename = "Options")]
    pub options: usize,
}

/// One bound event module.
#[derive(Debug, Clone, PartialEq, Eq, Tabled)]
pub struct EventRow {
    #[tabled(rename = "#")]
    pub index: usize,
    #[tabled(rename = "Event")]
    pub event: String,
}

/// Summary of a completed boot (everything up to, not including, login).
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BootReport {
    pub commands: Vec<CommandRow>,
    pub events: Vec<EventRow>,
    /// Number of commands pushed to the platform on `ready`.
    pub remote_commands: usize,
}

impl BootReport {
    pub fn from_registries(commands: &CommandRegistry, events: &EventRegistry) -> Self {
        let command_rows = commands
            .help()
            .iter()
            .map(|cmd| CommandRow {
                name: cmd.name.clone(),
                kind: cmd.kind.as_str().to_string(),
                permission: cmd.permission.clone().unwrap_or_else(|| "-".into()),
                options: cmd.options.len(),
            })
            .collect();
        let event_rows = events
            .event_names()
            .into_iter()
            .enumerate()
            .map(|(i, event)| EventRow {
                index: i + 1,
                event: event.to_string(),
            })
            .collect();

        Self {
            commands: command_rows,
            events: event_rows,
            remote_commands: commands.remote_commands().len(),
        }
    }

    pub fn commands_table(&self) -> String {
        if self.commands.is_empty() {
            return "No commands loaded.".to_string();
        }
        Table::new(&self.commands).with(Style::rounded()).to_string()
    }

    pub fn events_table(&self) -> String {
        if self.events.is_empty() {
            return "No events loaded.".to_string();
        }
        Table::new(&self.events).with(Style::rounded()).to_string()
    }

    /// Write both tables to the log.
    pub fn log(&self) {
        info!(
            count = self.commands.len(),
            remote = self.remote_commands,
            "Loaded commands\n{}",
            self.commands_table()
        );
        info!(count = self.events.len(), "Loaded events\n{}", self.events_table());
    }
}
