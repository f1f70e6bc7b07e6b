//! Platform port: everything the shell needs from a chat platform.
//!
//! The core never talks to a chat protocol directly. An adapter logs in,
//! pushes platform events into the [`Listeners`] table it is handed, and
//! exposes remote command registration plus a way to answer invocations.

#[cfg(feature = "discord")]
pub mod discord;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::command::RemoteCommand;
use crate::event::listeners::Listeners;

/// Where an invocation came from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum InvocationSource {
    /// A prefixed text message.
    Text { message_id: String },
    /// A remote (slash) command interaction.
    Slash {
        interaction_id: String,
        token: String,
        /// An acknowledgement was already sent; answers are follow-ups.
        #[serde(default)]
        deferred: bool,
    },
}

/// A single command invocation, stripped of platform types.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Invocation {
    pub source: InvocationSource,
    pub command: String,
    pub channel_id: String,
    pub guild_id: Option<String>,
    pub user_id: String,
    /// Permission names held by the invoking member, uppercase snake case.
    pub member_permissions: Vec<String>,
}

impl Invocation {
    pub fn is_slash(&self) -> bool {
        matches!(self.source, InvocationSource::Slash { .. })
    }

    pub fn is_deferred(&self) -> bool {
        matches!(self.source, InvocationSource::Slash { deferred: true, .. })
    }

    pub fn has_permission(&self, permission: &str) -> bool {
        self.member_permissions
            .iter()
            .any(|p| p.eq_ignore_ascii_case(permission) || p == "ADMINISTRATOR")
    }

    /// Cooldown key: one in-flight run per user and command.
    pub fn cooldown_key(&self) -> String {
        format!("{}:{}", self.user_id, self.command)
    }
}

/// An answer to an invocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Reply {
    pub content: String,
    /// Only visible to the invoker, where the platform supports it.
    pub ephemeral: bool,
}

impl Reply {
    pub fn public(content: impl Into<String>) -> Self {
        Self {
            content: content.into(),
            ephemeral: false,
        }
    }

    pub fn ephemeral(content: impl Into<String>) -> Self {
        Self {
            content: content.into(),
            ephemeral: true,
        }
    }
}

/// Trait every platform adapter implements.
#[async_trait]
pub trait PlatformAdapter: Send + Sync {
    /// Short adapter name for logs (e.g. "discord").
    fn name(&self) -> &str;

    /// Start connecting with `token`. Returns once the connection is
    /// initiated; the adapter emits `ready` into `listeners` when live.
    async fn login(&self, token: &str, intents: u64, listeners: Listeners) -> anyhow::Result<()>;

    /// Replace the platform's remote command set. Returns how many were accepted.
    async fn register_remote_commands(&self, commands: &[RemoteCommand]) -> anyhow::Result<usize>;

    /// Answer an invocation.
    async fn reply(&self, invocation: &Invocation, reply: Reply) -> anyhow::Result<()>;

    /// Acknowledge a slash invocation that will be answered late.
    async fn defer(&self, _invocation: &Invocation) -> anyhow::Result<()> {
        Ok(())
    }

    /// Close any live connection opened by `login`.
    async fn logout(&self) -> anyhow::Result<()> {
        Ok(())
    }
}

/// Normalise a human permission name ("Manage Roles") to `MANAGE_ROLES`.
pub fn permission_key(name: &str) -> String {
    name.trim()
        .split_whitespace()
        .map(|w| w.to_uppercase())
        .collect::<Vec<_>>()
        .join("_")
}
