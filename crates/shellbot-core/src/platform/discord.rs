//! Discord adapter built on serenity.
//!
//! Translates gateway events into [`EventPayload`]s and pushes them into
//! the shell's listener table. Replies and remote command registration go
//! through the client's HTTP handle, captured at login.

use anyhow::Context as _;
use async_trait::async_trait;
use serenity::all::{
    ChannelId, Command, CommandDataOptionValue, CommandInteraction, CommandOptionType,
    CreateCommand, CreateCommandOption, CreateInteractionResponse,
    CreateInteractionResponseFollowup, CreateInteractionResponseMessage, Http, Interaction,
    InteractionId, Member, Message, Ready, ShardManager,
};
use serenity::prelude::{Client, Context as SerenityContext, EventHandler, GatewayIntents};
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::{debug, error, info};

use super::{permission_key, Invocation, InvocationSource, PlatformAdapter, Reply};
use crate::command::{OptionKind, RemoteCommand};
use crate::event::listeners::Listeners;
use crate::event::{
    names, EventPayload, IncomingInteraction, IncomingMessage, InteractionOption, ReadyInfo,
};

/// Discord caps message content at 2000 characters.
const MAX_MESSAGE_LEN: usize = 2000;

struct Handler {
    listeners: Listeners,
}

#[async_trait]
impl EventHandler for Handler {
    async fn ready(&self, _: SerenityContext, ready: Ready) {
        info!(user = %ready.user.name, guilds = ready.guilds.len(), "Discord gateway ready");
        let payload = EventPayload::Ready(ReadyInfo {
            user: ready.user.name.clone(),
            guilds: ready.guilds.len(),
        });
        self.listeners.emit(names::READY, payload).await;
    }

    async fn message(&self, _: SerenityContext, msg: Message) {
        let payload = EventPayload::Message(IncomingMessage {
            id: msg.id.to_string(),
            channel_id: msg.channel_id.to_string(),
            guild_id: msg.guild_id.map(|id| id.to_string()),
            author_id: msg.author.id.to_string(),
            author_is_bot: msg.author.bot,
            content: msg.content,
        });
        self.listeners.emit(names::MESSAGE_CREATE, payload).await;
    }

    async fn interaction_create(&self, _: SerenityContext, interaction: Interaction) {
        match interaction {
            Interaction::Command(command) => {
                let payload = EventPayload::Interaction(incoming_interaction(&command));
                self.listeners.emit(names::INTERACTION_CREATE, payload).await;
            }
            other => debug!(kind = ?other.kind(), "Ignoring non-command interaction"),
        }
    }

    async fn guild_member_addition(&self, _: SerenityContext, member: Member) {
        let payload = EventPayload::Raw(serde_json::json!({
            "guildId": member.guild_id.to_string(),
            "userId": member.user.id.to_string(),
            "bot": member.user.bot,
        }));
        self.listeners.emit(names::GUILD_MEMBER_ADD, payload).await;
    }
}

fn incoming_interaction(command: &CommandInteraction) -> IncomingInteraction {
    let member_permissions = command
        .member
        .as_ref()
        .and_then(|m| m.permissions)
        .map(|perms| {
            perms
                .get_permission_names()
                .into_iter()
                .map(permission_key)
                .collect()
        })
        .unwrap_or_default();

    IncomingInteraction {
        id: command.id.to_string(),
        token: command.token.clone(),
        command: command.data.name.clone(),
        channel_id: command.channel_id.to_string(),
        guild_id: command.guild_id.map(|id| id.to_string()),
        user_id: command.user.id.to_string(),
        member_permissions,
        options: command
            .data
            .options
            .iter()
            .map(|opt| InteractionOption {
                name: opt.name.clone(),
                value: option_value(&opt.value),
            })
            .collect(),
    }
}

fn option_value(value: &CommandDataOptionValue) -> serde_json::Value {
    use serde_json::Value;
    match value {
        CommandDataOptionValue::String(s) => Value::from(s.as_str()),
        CommandDataOptionValue::Integer(n) => Value::from(*n),
        CommandDataOptionValue::Number(n) => Value::from(*n),
        CommandDataOptionValue::Boolean(b) => Value::from(*b),
        CommandDataOptionValue::User(id) => Value::from(id.to_string()),
        CommandDataOptionValue::Channel(id) => Value::from(id.to_string()),
        CommandDataOptionValue::Role(id) => Value::from(id.to_string()),
        CommandDataOptionValue::Mentionable(id) => Value::from(id.to_string()),
        CommandDataOptionValue::Attachment(id) => Value::from(id.to_string()),
        _ => Value::Null,
    }
}

fn option_type(kind: OptionKind) -> CommandOptionType {
    match kind {
        OptionKind::String => CommandOptionType::String,
        OptionKind::Integer => CommandOptionType::Integer,
        OptionKind::Boolean => CommandOptionType::Boolean,
        OptionKind::User => CommandOptionType::User,
        OptionKind::Channel => CommandOptionType::Channel,
        OptionKind::Role => CommandOptionType::Role,
        OptionKind::Mentionable => CommandOptionType::Mentionable,
        OptionKind::Number => CommandOptionType::Number,
        OptionKind::Attachment => CommandOptionType::Attachment,
    }
}

fn create_command(remote: &RemoteCommand) -> CreateCommand {
    remote.options.iter().fold(
        CreateCommand::new(&remote.name).description(&remote.description),
        |cmd, opt| {
            cmd.add_option(
                CreateCommandOption::new(option_type(opt.kind), &opt.name, &opt.description)
                    .required(opt.required),
            )
        },
    )
}

fn parse_id(id: &str, what: &str) -> anyhow::Result<u64> {
    id.parse::<u64>()
        .with_context(|| format!("invalid Discord {what} id '{id}'"))
}

/// Split a message into chunks of at most `max_len` bytes, preferring newlines.
fn chunk_message(text: &str, max_len: usize) -> Vec<String> {
    let mut chunks = Vec::new();
    let mut remaining = text;

    while remaining.len() > max_len {
        let mut end = max_len;
        while !remaining.is_char_boundary(end) {
            end -= 1;
        }
        let break_at = match remaining[..end].rfind('\n') {
            Some(0) | None => end,
            Some(i) => i,
        };
        chunks.push(remaining[..break_at].to_owned());
        remaining = remaining[break_at..].trim_start_matches('\n');
    }
    if !remaining.is_empty() || chunks.is_empty() {
        chunks.push(remaining.to_owned());
    }
    chunks
}

/// A logged-in client: the HTTP handle and the gateway shards.
struct Session {
    http: Arc<Http>,
    shards: Arc<ShardManager>,
}

/// Discord platform adapter.
///
/// Holds at most one gateway session. Logging in again shuts the previous
/// session down first.
#[derive(Default)]
pub struct DiscordPlatform {
    session: RwLock<Option<Session>>,
}

impl DiscordPlatform {
    pub fn new() -> Self {
        Self::default()
    }

    async fn http(&self) -> anyhow::Result<Arc<Http>> {
        self.session
            .read()
            .await
            .as_ref()
            .map(|session| Arc::clone(&session.http))
            .context("Discord client is not logged in")
    }
}

#[async_trait]
impl PlatformAdapter for DiscordPlatform {
    fn name(&self) -> &str {
        "discord"
    }

    async fn login(&self, token: &str, intents: u64, listeners: Listeners) -> anyhow::Result<()> {
        self.logout().await?;

        let mut client = Client::builder(token, GatewayIntents::from_bits_truncate(intents))
            .event_handler(Handler { listeners })
            .await
            .context("failed to build Discord client")?;

        *self.session.write().await = Some(Session {
            http: Arc::clone(&client.http),
            shards: Arc::clone(&client.shard_manager),
        });

        info!("Discord transport starting...");
        tokio::spawn(async move {
            if let Err(e) = client.start().await {
                error!("Discord client stopped: {e}");
            }
        });
        Ok(())
    }

    async fn logout(&self) -> anyhow::Result<()> {
        let previous = self.session.write().await.take();
        if let Some(session) = previous {
            info!("Shutting down Discord session");
            session.shards.shutdown_all().await;
        }
        Ok(())
    }

    async fn register_remote_commands(&self, commands: &[RemoteCommand]) -> anyhow::Result<usize> {
        let http = self.http().await?;
        let builders = commands.iter().map(create_command).collect();
        let registered = Command::set_global_commands(&http, builders).await?;
        Ok(registered.len())
    }

    async fn defer(&self, invocation: &Invocation) -> anyhow::Result<()> {
        let InvocationSource::Slash {
            interaction_id,
            token,
            ..
        } = &invocation.source
        else {
            return Ok(());
        };
        let http = self.http().await?;
        let response = CreateInteractionResponse::Defer(CreateInteractionResponseMessage::new());
        http.create_interaction_response(
            InteractionId::new(parse_id(interaction_id, "interaction")?),
            token,
            &response,
            Vec::new(),
        )
        .await?;
        Ok(())
    }

    async fn reply(&self, invocation: &Invocation, reply: Reply) -> anyhow::Result<()> {
        let http = self.http().await?;
        match &invocation.source {
            InvocationSource::Text { .. } => {
                let channel = ChannelId::new(parse_id(&invocation.channel_id, "channel")?);
                for chunk in chunk_message(&reply.content, MAX_MESSAGE_LEN) {
                    channel.say(&http, chunk).await?;
                }
            }
            InvocationSource::Slash {
                token,
                deferred: true,
                ..
            } => {
                let followup = CreateInteractionResponseFollowup::new()
                    .content(reply.content)
                    .ephemeral(reply.ephemeral);
                http.create_followup_message(token, &followup, Vec::new())
                    .await?;
            }
            InvocationSource::Slash {
                interaction_id,
                token,
                deferred: false,
            } => {
                let response = CreateInteractionResponse::Message(
                    CreateInteractionResponseMessage::new()
                        .content(reply.content)
                        .ephemeral(reply.ephemeral),
                );
                http.create_interaction_response(
                    InteractionId::new(parse_id(interaction_id, "interaction")?),
                    token,
                    &response,
                    Vec::new(),
                )
                .await?;
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::command::CommandOption;

    #[test]
    fn test_chunk_message_prefers_newlines() {
        assert_eq!(chunk_message("short", 10), vec!["short"]);
        assert_eq!(chunk_message("", 10), vec![""]);

        let chunks = chunk_message("aaaa\nbbbb\ncccc", 10);
        assert_eq!(chunks, vec!["aaaa\nbbbb", "cccc"]);
        assert!(chunk_message(&"x".repeat(25), 10).iter().all(|c| c.len() <= 10));
    }

    #[test]
    fn test_create_command_carries_options() {
        let remote = RemoteCommand {
            name: "unmute".into(),
            description: "Unmutes a target member".into(),
            permissions: Vec::new(),
            options: vec![CommandOption::new("target", "The target member", OptionKind::User, true)],
            default_permission: true,
        };
        let json = serde_json::to_value(create_command(&remote)).unwrap();
        assert_eq!(json["name"], "unmute");
        assert_eq!(json["options"][0]["name"], "target");
        assert_eq!(json["options"][0]["required"], true);
    }

    #[test]
    fn test_parse_id() {
        assert_eq!(parse_id("123", "channel").unwrap(), 123);
        assert!(parse_id("abc", "channel").is_err());
    }

    #[tokio::test]
    async fn test_reply_before_login_fails() {
        let platform = DiscordPlatform::new();
        let invocation = Invocation {
            source: InvocationSource::Text {
                message_id: "1".into(),
            },
            command: "ping".into(),
            channel_id: "1".into(),
            guild_id: None,
            user_id: "2".into(),
            member_permissions: Vec::new(),
        };
        let err = platform
            .reply(&invocation, Reply::public("pong"))
            .await
            .unwrap_err();
        assert!(err.to_string().contains("not logged in"));
    }

    #[tokio::test]
    async fn test_logout_without_session_is_noop() {
        let platform = DiscordPlatform::new();
        platform.logout().await.unwrap();
        assert!(platform.http().await.is_err());
    }

    #[tokio::test]
    async fn test_defer_ignores_text_invocations() {
        let platform = DiscordPlatform::new();
        let invocation = Invocation {
            source: InvocationSource::Text {
                message_id: "1".into(),
            },
            command: "ping".into(),
            channel_id: "1".into(),
            guild_id: None,
            user_id: "2".into(),
            member_permissions: Vec::new(),
        };
        platform.defer(&invocation).await.unwrap();
    }
}
