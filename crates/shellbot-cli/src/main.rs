//! 🐚 shellbot CLI: boot the shell, check a configuration, onboarding.
//!
//! Usage:
//!   shellbot run [--config PATH]    # Boot and stay connected until Ctrl+C
//!   shellbot check [--config PATH]  # Validate and load modules without connecting
//!   shellbot onboard                # Create a default configuration

mod commands;

use anyhow::Result;
use async_trait::async_trait;
use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

use shellbot_core::command::RemoteCommand;
use shellbot_core::config::SetupConfig;
use shellbot_core::event::listeners::Listeners;
use shellbot_core::loader::DirectoryLoader;
use shellbot_core::platform::{Invocation, PlatformAdapter, Reply};
use shellbot_core::Shell;

#[derive(Parser)]
#[command(
    name = "shellbot",
    version,
    about = "A lightweight runtime shell for chat bots",
    long_about = "🐚 shellbot loads command and event modules, registers them with the platform and dispatches events to them."
)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Boot the shell and stay connected (default)
    Run {
        /// Config file (default: ~/.shellbot/config.json)
        #[arg(short, long)]
        config: Option<PathBuf>,
    },

    /// Validate configuration and load modules without connecting
    Check {
        /// Config file (default: ~/.shellbot/config.json)
        #[arg(short, long)]
        config: Option<PathBuf>,
    },

    /// Create or reset the default configuration
    Onboard,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_target(false)
        .compact()
        .init();

    let cli = Cli::parse();

    match cli.command {
        Some(Commands::Run { config }) => cmd_run(config.as_deref()).await?,
        Some(Commands::Check { config }) => cmd_check(config.as_deref()).await?,
        Some(Commands::Onboard) => cmd_onboard()?,
        None => cmd_run(None).await?,
    }

    Ok(())
}

fn load_config(path: Option<&Path>) -> Result<SetupConfig> {
    let config = match path {
        Some(path) => SetupConfig::load_from(path)?,
        None => SetupConfig::load()?,
    };
    Ok(config)
}

fn directory_loader() -> Arc<DirectoryLoader> {
    Arc::new(DirectoryLoader::new(commands::catalog()))
}

// ── Run Command ─────────────────────────────────────────────────────

#[cfg(feature = "discord")]
fn platform() -> Result<Arc<dyn PlatformAdapter>> {
    Ok(Arc::new(shellbot_core::platform::discord::DiscordPlatform::new()))
}

#[cfg(not(feature = "discord"))]
fn platform() -> Result<Arc<dyn PlatformAdapter>> {
    anyhow::bail!("shellbot was built without a platform adapter (enable the `discord` feature)")
}

async fn cmd_run(config_path: Option<&Path>) -> Result<()> {
    let config = load_config(config_path)?;

    let mut shell = Shell::new(platform()?, directory_loader());
    shell.setup(config)?;
    shell.start().await?;

    let cancel = CancellationToken::new();
    let status = match shell.context() {
        Some(ctx) => {
            let ctx = ctx.clone();
            let cancel = cancel.clone();
            Some(tokio::spawn(async move {
                let mut interval = tokio::time::interval(Duration::from_secs(300));
                interval.tick().await;
                loop {
                    tokio::select! {
                        _ = cancel.cancelled() => break,
                        _ = interval.tick() => {
                            tracing::info!(
                                store = ?ctx.store().status(),
                                remote = ?ctx.remote().status(),
                                "Shell status"
                            );
                        }
                    }
                }
            }))
        }
        None => None,
    };

    println!("  🐚 shellbot is running.");
    println!("  Press Ctrl+C for graceful shutdown.");
    println!("  ─────────────────────────────────────");

    tokio::signal::ctrl_c().await?;
    println!("\n  ⏳ Shutting down gracefully...");
    cancel.cancel();
    if let Some(status) = status {
        if let Err(e) = status.await {
            tracing::warn!("Status task ended abnormally: {e}");
        }
    }
    shell.stop().await?;

    println!("  ✅ Shutdown complete.");
    Ok(())
}

// ── Check Command ───────────────────────────────────────────────────

/// Stand-in platform for `check`: nothing ever reaches it.
struct Offline;

#[async_trait]
impl PlatformAdapter for Offline {
    fn name(&self) -> &str {
        "offline"
    }

    async fn login(&self, _token: &str, _intents: u64, _listeners: Listeners) -> Result<()> {
        anyhow::bail!("offline platform cannot log in")
    }

    async fn register_remote_commands(&self, _commands: &[RemoteCommand]) -> Result<usize> {
        Ok(0)
    }

    async fn reply(&self, _invocation: &Invocation, _reply: Reply) -> Result<()> {
        Ok(())
    }
}

async fn cmd_check(config_path: Option<&Path>) -> Result<()> {
    let config = load_config(config_path)?;

    let mut shell = Shell::new(Arc::new(Offline), directory_loader());
    shell.setup(config)?;
    let report = shell.prepare().await?;

    println!();
    println!("  🐚 shellbot check");
    println!("  ─────────────────────────────────────");
    println!("{}", report.commands_table());
    println!("{}", report.events_table());
    println!(
        "  ✅ {} commands ({} remote), {} event bindings",
        report.commands.len(),
        report.remote_commands,
        report.events.len()
    );
    println!();
    Ok(())
}

// ── Onboard Command ─────────────────────────────────────────────────

fn cmd_onboard() -> Result<()> {
    let path = SetupConfig::write_default_template()?;
    println!();
    println!("  ✅ Configuration created at:");
    println!("     {}", path.display());
    println!();
    println!("  Next steps:");
    println!("  1. Edit the config file and add your bot token and owner ID");
    println!("  2. Run `shellbot check` to validate your modules");
    println!("  3. Run `shellbot run` to connect");
    println!();
    Ok(())
}
