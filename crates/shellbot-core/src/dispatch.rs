//! Command dispatch: routes platform events into the command registry.
//!
//! The routers are ordinary event handlers. Hosts bind them like any
//! other event module (`messageCreate` → [`TextCommandRouter`],
//! `interactionCreate` → [`SlashCommandRouter`]).

use async_trait::async_trait;
use tracing::{debug, error, info, warn};

use crate::command::{CommandDescriptor, CommandRegistry};
use crate::context::{Context, RemoteStatus};
use crate::event::{EventHandler, EventPayload, IncomingInteraction};
use crate::platform::{Invocation, InvocationSource, Reply};

/// Split `content` into a command name and arguments if it starts with `prefix`.
pub fn parse_text_command(prefix: &str, content: &str) -> Option<(String, Vec<String>)> {
    if prefix.is_empty() {
        return None;
    }
    let rest = content.trim_start().strip_prefix(prefix)?;
    let mut words = rest.split_whitespace();
    let name = words.next()?.to_string();
    Some((name, words.map(str::to_string).collect()))
}

/// Slash option values in the command's declaration order.
fn slash_args(cmd: &CommandDescriptor, interaction: &IncomingInteraction) -> Vec<String> {
    cmd.options
        .iter()
        .map(|declared| {
            interaction
                .options
                .iter()
                .find(|given| given.name == declared.name)
                .map(|given| given.as_arg())
                .unwrap_or_default()
        })
        .collect()
}

/// Releases a cooldown slot when the command finishes, panics included.
struct CooldownGuard<'a> {
    registry: &'a CommandRegistry,
    key: String,
}

impl Drop for CooldownGuard<'_> {
    fn drop(&mut self) {
        self.registry.end_cooldown(&self.key);
    }
}

/// Run `cmd` for `invocation` after permission and cooldown checks.
///
/// Handler errors are logged and answered with a short failure reply.
pub async fn invoke(
    ctx: &Context,
    cmd: &CommandDescriptor,
    invocation: &Invocation,
    args: &[String],
) -> anyhow::Result<()> {
    if let Some(permission) = &cmd.permission {
        if !ctx.config().is_owner(&invocation.user_id) && !invocation.has_permission(permission) {
            warn!(
                command = %cmd.name,
                user_id = %invocation.user_id,
                permission = %permission,
                "Rejected command from member without permission"
            );
            ctx.platform()
                .reply(
                    invocation,
                    Reply::ephemeral(format!(
                        "❌ You need the {permission} permission to use this command."
                    )),
                )
                .await?;
            return Ok(());
        }
    }

    let key = invocation.cooldown_key();
    if !ctx.commands().begin_cooldown(&key) {
        debug!(command = %cmd.name, user_id = %invocation.user_id, "Command still running");
        ctx.platform()
            .reply(
                invocation,
                Reply::ephemeral("⏳ That command is still running for you."),
            )
            .await?;
        return Ok(());
    }
    let _guard = CooldownGuard {
        registry: ctx.commands(),
        key,
    };

    info!(
        command = %cmd.name,
        user_id = %invocation.user_id,
        slash = invocation.is_slash(),
        "Running command"
    );
    if let Err(e) = cmd.handler.run(ctx, invocation, args).await {
        error!(command = %cmd.name, "Command failed: {e:#}");
        ctx.platform()
            .reply(
                invocation,
                Reply::ephemeral("⚠️ Something went wrong running that command."),
            )
            .await?;
    }
    Ok(())
}

/// Prefix-based text command router for `messageCreate`.
pub struct TextCommandRouter;

#[async_trait]
impl EventHandler for TextCommandRouter {
    async fn run(&self, ctx: &Context, payload: &EventPayload) -> anyhow::Result<()> {
        let EventPayload::Message(msg) = payload else {
            return Ok(());
        };
        if msg.author_is_bot {
            return Ok(());
        }
        let Some((name, args)) = parse_text_command(&ctx.config().bot.prefix, &msg.content) else {
            return Ok(());
        };
        let Some(cmd) = ctx.commands().find_text(&name).cloned() else {
            debug!(command = %name, "Unknown text command");
            return Ok(());
        };

        let invocation = Invocation {
            source: InvocationSource::Text {
                message_id: msg.id.clone(),
            },
            command: cmd.name.clone(),
            channel_id: msg.channel_id.clone(),
            guild_id: msg.guild_id.clone(),
            user_id: msg.author_id.clone(),
            member_permissions: Vec::new(),
        };
        invoke(ctx, &cmd, &invocation, &args).await
    }
}

/// Remote (slash) command router for `interactionCreate`.
///
/// Interactions that arrive before remote registration has settled are
/// deferred, then wait on the context's remote gate for up to the
/// configured timeout and dispatch against the local registry regardless.
pub struct SlashCommandRouter;

#[async_trait]
impl EventHandler for SlashCommandRouter {
    async fn run(&self, ctx: &Context, payload: &EventPayload) -> anyhow::Result<()> {
        let EventPayload::Interaction(interaction) = payload else {
            return Ok(());
        };

        let mut invocation = Invocation {
            source: InvocationSource::Slash {
                interaction_id: interaction.id.clone(),
                token: interaction.token.clone(),
                deferred: false,
            },
            command: interaction.command.clone(),
            channel_id: interaction.channel_id.clone(),
            guild_id: interaction.guild_id.clone(),
            user_id: interaction.user_id.clone(),
            member_permissions: interaction.member_permissions.clone(),
        };

        if ctx.remote().status() == RemoteStatus::Pending {
            // acknowledge first: the platform drops interactions that stay unanswered
            match ctx.platform().defer(&invocation).await {
                Ok(()) => {
                    if let InvocationSource::Slash { deferred, .. } = &mut invocation.source {
                        *deferred = true;
                    }
                }
                Err(e) => warn!(
                    command = %interaction.command,
                    "Failed to defer slash invocation: {e:#}"
                ),
            }
            let timeout = ctx.config().remote_registration_timeout;
            let status = ctx.remote().wait(timeout).await;
            debug!(?status, command = %interaction.command, "Early slash invocation released");
        }

        let Some(cmd) = ctx.commands().find_remote(&interaction.command).cloned() else {
            warn!(command = %interaction.command, "Unknown slash command");
            ctx.platform()
                .reply(&invocation, Reply::ephemeral("❌ Unknown command."))
                .await?;
            return Ok(());
        };

        invocation.command = cmd.name.clone();
        let args = slash_args(&cmd, interaction);
        invoke(ctx, &cmd, &invocation, &args).await
    }
}
