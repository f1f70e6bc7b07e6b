//! Boot-time error taxonomy.
//!
//! Every error here aborts startup. Once the shell is live, handler
//! failures are logged by the listener table instead of surfacing here.

use std::path::PathBuf;

/// Configuration is missing or malformed.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("setup error: {0}")]
pub struct SetupError(pub String);

impl SetupError {
    pub fn new(msg: impl Into<String>) -> Self {
        Self(msg.into())
    }
}

/// A command module is missing a required field or cannot be resolved.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("command error: {0}")]
pub struct CommandError(pub String);

impl CommandError {
    pub fn new(msg: impl Into<String>) -> Self {
        Self(msg.into())
    }
}

/// An event module is missing its event key or cannot be resolved.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("event error: {0}")]
pub struct EventError(pub String);

impl EventError {
    pub fn new(msg: impl Into<String>) -> Self {
        Self(msg.into())
    }
}

/// Anything that can stop `Shell::start` before the shell goes live.
#[derive(Debug, thiserror::Error)]
pub enum BootError {
    #[error(transparent)]
    Setup(#[from] SetupError),

    #[error(transparent)]
    Command(#[from] CommandError),

    #[error(transparent)]
    Event(#[from] EventError),

    /// Filesystem failures from module discovery pass through untouched.
    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error("invalid module manifest {}: {source}", path.display())]
    Manifest {
        path: PathBuf,
        source: serde_json::Error,
    },

    #[error("platform login failed: {0:#}")]
    Login(anyhow::Error),
}

impl BootError {
    pub fn is_setup(&self) -> bool {
        matches!(self, Self::Setup(_))
    }

    pub fn is_command(&self) -> bool {
        matches!(self, Self::Command(_))
    }

    pub fn is_event(&self) -> bool {
        matches!(self, Self::Event(_))
    }
}
