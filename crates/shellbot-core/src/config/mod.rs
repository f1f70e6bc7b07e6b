//! Configuration module for shellbot.
//!
//! `SetupConfig` is the mutable input handed to `Shell::setup`, loaded
//! from `~/.shellbot/config.json` or any path the caller picks.
//! `RuntimeConfig` is the validated, frozen snapshot produced by
//! `Shell::start` and shared with every handler.

mod intents;

pub use intents::Intents;

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::error::SetupError;

/// Environment variable that fills in an empty `token`.
pub const TOKEN_ENV: &str = "SHELLBOT_TOKEN";

/// Root configuration as supplied by the host.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct SetupConfig {
    pub command_folder: String,
    pub sources_folder: String,
    pub events_folder: String,
    pub token: String,
    pub intents: Option<Intents>,
    pub bot_config: Option<BotConfig>,
    #[serde(rename = "mongoDB")]
    pub mongo_db: Option<StoreConfig>,
    pub remote_registration_timeout_secs: Option<u64>,
}

impl SetupConfig {
    /// Load configuration from the default path (`~/.shellbot/config.json`).
    pub fn load() -> Result<Self, SetupError> {
        Self::load_from(&Self::default_path())
    }

    /// Load configuration from a specific path.
    pub fn load_from(path: &Path) -> Result<Self, SetupError> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            SetupError::new(format!("cannot read config {}: {e}", path.display()))
        })?;
        let mut config: SetupConfig = serde_json::from_str(&content).map_err(|e| {
            SetupError::new(format!("malformed config {}: {e}", path.display()))
        })?;
        config.apply_env();
        Ok(config)
    }

    /// Fill an empty token from `SHELLBOT_TOKEN`.
    pub fn apply_env(&mut self) {
        if self.token.trim().is_empty() {
            if let Ok(token) = std::env::var(TOKEN_ENV) {
                self.token = token;
            }
        }
    }

    /// Get the default config file path.
    pub fn default_path() -> PathBuf {
        Self::config_dir().join("config.json")
    }

    /// Get the default config directory path.
    pub fn config_dir() -> PathBuf {
        dirs::home_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join(".shellbot")
    }

    /// Write the default config template to `path`, creating parent dirs.
    pub fn write_template(path: &Path) -> anyhow::Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let template = serde_json::json!({
            "sourcesFolder": "sources",
            "commandFolder": "commands",
            "eventsFolder": "events",
            "token": "YOUR_BOT_TOKEN",
            "intents": ["GUILDS", "GUILD_MESSAGES", "MESSAGE_CONTENT"],
            "botConfig": {
                "prefix": "!",
                "ownerID": "",
                "password": ""
            }
        });

        std::fs::write(path, serde_json::to_string_pretty(&template)?)?;
        Ok(())
    }

    /// Write the default config template to the default path.
    pub fn write_default_template() -> anyhow::Result<PathBuf> {
        let path = Self::default_path();
        Self::write_template(&path)?;
        Ok(path)
    }

    /// Check everything `start()` needs and freeze into a `RuntimeConfig`.
    pub(crate) fn freeze(&self) -> Result<RuntimeConfig, SetupError> {
        require(&self.sources_folder, "Please setup a Sources Folder!")?;
        require(&self.command_folder, "Please setup a Command Folder!")?;
        require(&self.events_folder, "Please setup a Events Folder!")?;
        require(&self.token, "Please provide a bot token!")?;

        let bot = self
            .bot_config
            .clone()
            .ok_or_else(|| SetupError::new("Bot Configuration not filled out!"))?;
        let intents = match &self.intents {
            Some(intents) => intents.bits()?,
            None => return Err(SetupError::new("Please provide gateway intents!")),
        };

        Ok(RuntimeConfig {
            sources_folder: PathBuf::from(&self.sources_folder),
            command_folder: self.command_folder.clone(),
            events_folder: self.events_folder.clone(),
            token: self.token.clone(),
            intents,
            bot,
            store: self.mongo_db.clone(),
            remote_registration_timeout: Duration::from_secs(
                self.remote_registration_timeout_secs.unwrap_or(10),
            ),
        })
    }
}

fn require(value: &str, msg: &str) -> Result<(), SetupError> {
    if value.trim().is_empty() {
        return Err(SetupError::new(msg));
    }
    Ok(())
}

// ── Bot Configuration ───────────────────────────────────────────────

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BotConfig {
    pub prefix: String,
    #[serde(rename = "ownerID")]
    pub owner_id: String,
    pub password: String,
}

// ── Store Configuration ─────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StoreConfig {
    pub username: String,
    pub password: String,
    pub host: String,
    pub port: Port,
    pub database: String,
}

/// Ports show up as numbers or strings in hand-written configs.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Port {
    Number(u16),
    Text(String),
}

impl Port {
    pub fn as_u16(&self) -> Option<u16> {
        match self {
            Port::Number(n) => Some(*n),
            Port::Text(s) => s.trim().parse().ok(),
        }
    }
}

impl std::fmt::Display for Port {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Port::Number(n) => write!(f, "{n}"),
            Port::Text(s) => f.write_str(s.trim()),
        }
    }
}

impl StoreConfig {
    /// `host:port`, as used for connecting.
    pub fn address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    /// Connection URI with the password masked, safe for logs.
    pub fn redacted_uri(&self) -> String {
        format!(
            "mongodb://{}:***@{}/{}",
            self.username,
            self.address(),
            self.database
        )
    }
}

// ── Frozen Runtime Configuration ────────────────────────────────────

/// Validated configuration. Read-only for the lifetime of the shell.
#[derive(Debug, Clone)]
pub struct RuntimeConfig {
    pub sources_folder: PathBuf,
    pub command_folder: String,
    pub events_folder: String,
    pub token: String,
    pub intents: u64,
    pub bot: BotConfig,
    pub store: Option<StoreConfig>,
    pub remote_registration_timeout: Duration,
}

impl RuntimeConfig {
    pub fn is_owner(&self, user_id: &str) -> bool {
        !self.bot.owner_id.is_empty() && self.bot.owner_id == user_id
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;

    pub(crate) fn sample() -> SetupConfig {
        SetupConfig {
            command_folder: "commands".into(),
            sources_folder: "src".into(),
            events_folder: "events".into(),
            token: "token".into(),
            intents: Some(Intents::Bits(513)),
            bot_config: Some(BotConfig {
                prefix: "!".into(),
                owner_id: "42".into(),
                password: "hunter2".into(),
            }),
            mongo_db: None,
            remote_registration_timeout_secs: None,
        }
    }

    #[test]
    fn test_deserialize_camel_case_json() {
        let json = r#"{
            "commandFolder": "Commands",
            "sourcesFolder": "src",
            "eventsFolder": "Events",
            "token": "abc",
            "intents": 32767,
            "botConfig": {"prefix": "?", "ownerID": "1", "password": "pw"},
            "mongoDB": {"username": "u", "password": "p", "host": "db", "port": "27017", "database": "bot"}
        }"#;
        let config: SetupConfig = serde_json::from_str(json).unwrap();
        assert_eq!(config.command_folder, "Commands");
        assert_eq!(config.bot_config.as_ref().unwrap().owner_id, "1");
        let store = config.mongo_db.unwrap();
        assert_eq!(store.port.as_u16(), Some(27017));
        assert_eq!(store.redacted_uri(), "mongodb://u:***@db:27017/bot");
    }

    #[test]
    fn test_freeze_rejects_empty_fields_in_order() {
        let mut config = sample();
        config.sources_folder.clear();
        config.token.clear();
        let err = config.freeze().unwrap_err();
        assert_eq!(err.0, "Please setup a Sources Folder!");

        let mut config = sample();
        config.token = "  ".into();
        assert_eq!(config.freeze().unwrap_err().0, "Please provide a bot token!");
    }

    #[test]
    fn test_freeze_resolves_intents_and_timeout() {
        let mut config = sample();
        config.remote_registration_timeout_secs = Some(3);
        let frozen = config.freeze().unwrap();
        assert_eq!(frozen.intents, 513);
        assert_eq!(frozen.remote_registration_timeout, Duration::from_secs(3));
        assert!(frozen.is_owner("42"));
        assert!(!frozen.is_owner("7"));
    }

    #[test]
    fn test_template_round_trips_through_loader() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("config.json");
        SetupConfig::write_template(&path).unwrap();

        let config = SetupConfig::load_from(&path).unwrap();
        assert_eq!(config.sources_folder, "sources");
        assert_eq!(config.bot_config.unwrap().prefix, "!");
    }

    #[test]
    fn test_load_from_malformed_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        std::fs::write(&path, "{ not json").unwrap();
        let err = SetupConfig::load_from(&path).unwrap_err();
        assert!(err.0.contains("malformed config"));
    }
}
