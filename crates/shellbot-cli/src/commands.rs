//! Built-in handlers shipped with the binary.
//!
//! Manifests under the sources folder refer to these by key.

use async_trait::async_trait;
use std::sync::Arc;
use tracing::info;

use shellbot_core::command::{CommandHandler, CommandType};
use shellbot_core::dispatch::{SlashCommandRouter, TextCommandRouter};
use shellbot_core::event::{EventHandler, EventPayload};
use shellbot_core::loader::HandlerCatalog;
use shellbot_core::platform::{Invocation, Reply};
use shellbot_core::Context;

/// Every handler the binary knows about.
pub fn catalog() -> HandlerCatalog {
    HandlerCatalog::new()
        .with_command("ping", Arc::new(Ping))
        .with_command("help", Arc::new(Help))
        .with_event("ready", Arc::new(ReadyLogger))
        .with_event("text-commands", Arc::new(TextCommandRouter))
        .with_event("slash-commands", Arc::new(SlashCommandRouter))
}

pub struct Ping;

#[async_trait]
impl CommandHandler for Ping {
    async fn run(&self, ctx: &Context, invocation: &Invocation, _args: &[String]) -> anyhow::Result<()> {
        ctx.platform().reply(invocation, Reply::public("🏓 Pong!")).await
    }
}

/// Lists every loaded command in load order.
pub struct Help;

#[async_trait]
impl CommandHandler for Help {
    async fn run(&self, ctx: &Context, invocation: &Invocation, _args: &[String]) -> anyhow::Result<()> {
        let prefix = &ctx.config().bot.prefix;
        let mut lines = vec!["**Commands**".to_string()];
        for cmd in ctx.commands().help() {
            let usage = match cmd.kind {
                CommandType::Text => format!("`{prefix}{}`", cmd.name),
                CommandType::Slash => format!("`/{}`", cmd.name.to_lowercase()),
                CommandType::Both => {
                    format!("`{prefix}{}` or `/{}`", cmd.name, cmd.name.to_lowercase())
                }
            };
            lines.push(format!("{usage}: {}", cmd.description));
        }
        let reply = if invocation.is_slash() {
            Reply::ephemeral(lines.join("\n"))
        } else {
            Reply::public(lines.join("\n"))
        };
        ctx.platform().reply(invocation, reply).await
    }
}

pub struct ReadyLogger;

#[async_trait]
impl EventHandler for ReadyLogger {
    async fn run(&self, ctx: &Context, payload: &EventPayload) -> anyhow::Result<()> {
        if let EventPayload::Ready(ready) = payload {
            info!(
                user = %ready.user,
                guilds = ready.guilds,
                commands = ctx.commands().len(),
                store = ?ctx.store().status(),
                "{} is online",
                ready.user
            );
        }
        Ok(())
    }
}
