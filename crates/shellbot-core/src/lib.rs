//! 🐚 shellbot-core: a lightweight runtime shell for chat bots.
//!
//! The shell loads command and event modules, validates them, registers
//! them with a platform adapter and dispatches incoming events:
//!
//! - [`config`]: JSON configuration, validated into a frozen [`RuntimeConfig`]
//! - [`loader`]: where modules come from (static registration or manifest folders)
//! - [`command`]: command modules, descriptors and the registry
//! - [`event`]: event modules, payloads and the listener table
//! - [`dispatch`]: routes text and slash invocations into commands
//! - [`runtime`]: the [`Shell`] boot state machine
//! - [`platform`]: the platform port (and the Discord adapter)
//! - [`store`]: the persistent-store port and its health flag
//!
//! # Quick Start
//!
//! ```no_run
//! use shellbot_core::config::SetupConfig;
//! use shellbot_core::loader::StaticModules;
//! use shellbot_core::platform::discord::DiscordPlatform;
//! use shellbot_core::Shell;
//! use std::sync::Arc;
//!
//! # async fn boot() -> anyhow::Result<()> {
//! let mut shell = Shell::new(Arc::new(DiscordPlatform::new()), Arc::new(StaticModules::new()));
//! shell.setup(SetupConfig::load()?)?;
//! shell.start().await?;
//! # Ok(())
//! # }
//! ```

pub mod command;
pub mod config;
pub mod context;
pub mod dispatch;
pub mod error;
pub mod event;
pub mod loader;
pub mod platform;
pub mod report;
pub mod runtime;
pub mod store;

#[cfg(test)]
mod testing;

pub use config::{RuntimeConfig, SetupConfig};
pub use context::Context;
pub use error::{BootError, CommandError, EventError, SetupError};
pub use runtime::{BootState, Shell};
