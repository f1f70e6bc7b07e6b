//! Event system: payloads, handler trait, and the event registry.

pub mod listeners;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::debug;

use crate::context::Context;
use crate::error::EventError;
use listeners::Listeners;

/// Canonical event keys emitted by platform adapters.
pub mod names {
    pub const READY: &str = "ready";
    pub const MESSAGE_CREATE: &str = "messageCreate";
    pub const INTERACTION_CREATE: &str = "interactionCreate";
    pub const GUILD_MEMBER_ADD: &str = "guildMemberAdd";
}

/// Platform-neutral event payload.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "data", rename_all = "camelCase")]
pub enum EventPayload {
    Ready(ReadyInfo),
    Message(IncomingMessage),
    Interaction(IncomingInteraction),
    /// Anything the adapter does not model, as raw JSON.
    Raw(serde_json::Value),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReadyInfo {
    pub user: String,
    pub guilds: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IncomingMessage {
    pub id: String,
    pub channel_id: String,
    pub guild_id: Option<String>,
    pub author_id: String,
    pub author_is_bot: bool,
    pub content: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IncomingInteraction {
    pub id: String,
    pub token: String,
    pub command: String,
    pub channel_id: String,
    pub guild_id: Option<String>,
    pub user_id: String,
    pub member_permissions: Vec<String>,
    pub options: Vec<InteractionOption>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InteractionOption {
    pub name: String,
    pub value: serde_json::Value,
}

impl InteractionOption {
    /// Render the value as a plain argument string.
    pub fn as_arg(&self) -> String {
        match &self.value {
            serde_json::Value::String(s) => s.clone(),
            serde_json::Value::Null => String::new(),
            other => other.to_string(),
        }
    }
}

/// Trait that all event handlers implement.
#[async_trait]
pub trait EventHandler: Send + Sync {
    async fn run(&self, ctx: &Context, payload: &EventPayload) -> anyhow::Result<()>;
}

/// An unvalidated event module as produced by a loader.
#[derive(Clone)]
pub struct EventModule {
    pub event: Option<String>,
    pub handler: Arc<dyn EventHandler>,
    pub origin: String,
}

impl EventModule {
    pub fn new(event: &str, handler: Arc<dyn EventHandler>) -> Self {
        Self {
            event: Some(event.to_string()),
            handler,
            origin: "static".to_string(),
        }
    }

    /// A module without an event key. Registration rejects it.
    pub fn unnamed(handler: Arc<dyn EventHandler>) -> Self {
        Self {
            event: None,
            handler,
            origin: "static".to_string(),
        }
    }

    pub fn origin(mut self, origin: &str) -> Self {
        self.origin = origin.to_string();
        self
    }

    pub fn validate(self) -> Result<EventDescriptor, EventError> {
        match self.event.filter(|e| !e.trim().is_empty()) {
            Some(event) => Ok(EventDescriptor {
                event,
                handler: self.handler,
            }),
            None => Err(EventError::new(format!(
                "Event name not set! ({})",
                self.origin
            ))),
        }
    }
}

impl std::fmt::Debug for EventModule {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EventModule")
            .field("event", &self.event)
            .field("origin", &self.origin)
            .finish_non_exhaustive()
    }
}

/// A validated event binding.
#[derive(Clone)]
pub struct EventDescriptor {
    pub event: String,
    pub handler: Arc<dyn EventHandler>,
}

/// Validated event descriptors, bound into a listener table.
#[derive(Default)]
pub struct EventRegistry {
    events: Vec<EventDescriptor>,
}

impl EventRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Validate every module, then bind each handler to `listeners` with
    /// `ctx` pre-bound. Nothing is bound if any module is invalid.
    pub async fn register(
        &mut self,
        modules: Vec<EventModule>,
        ctx: &Context,
        listeners: &Listeners,
    ) -> Result<(), EventError> {
        let validated = modules
            .into_iter()
            .map(EventModule::validate)
            .collect::<Result<Vec<_>, _>>()?;

        for descriptor in validated {
            let handler = Arc::clone(&descriptor.handler);
            let ctx = ctx.clone();
            listeners
                .on(&descriptor.event, move |payload| {
                    let handler = Arc::clone(&handler);
                    let ctx = ctx.clone();
                    async move { handler.run(&ctx, &payload).await }
                })
                .await;
            debug!(event = %descriptor.event, "Bound event handler");
            self.events.push(descriptor);
        }
        Ok(())
    }

    /// Event keys in registration order.
    pub fn event_names(&self) -> Vec<&str> {
        self.events.iter().map(|e| e.event.as_str()).collect()
    }

    pub fn len(&self) -> usize {
        self.events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }
}
