//! Shared test doubles.

use async_trait::async_trait;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use crate::command::{CommandRegistry, RemoteCommand};
use crate::config::{self, RuntimeConfig};
use crate::context::{Context, RemoteGate};
use crate::event::listeners::Listeners;
use crate::platform::{Invocation, PlatformAdapter, Reply};
use crate::store::StoreHealth;

/// Platform double that records every call.
#[derive(Default)]
pub(crate) struct RecordingPlatform {
    pub logins: AtomicUsize,
    pub tokens: Mutex<Vec<String>>,
    pub remote: Mutex<Vec<Vec<RemoteCommand>>>,
    pub replies: Mutex<Vec<(Invocation, Reply)>>,
    pub listeners: Mutex<Option<Listeners>>,
    pub defers: Mutex<Vec<Invocation>>,
    pub logouts: AtomicUsize,
}

impl RecordingPlatform {
    pub fn login_count(&self) -> usize {
        self.logins.load(Ordering::SeqCst)
    }

    pub fn remote_pushes(&self) -> Vec<Vec<RemoteCommand>> {
        self.remote.lock().unwrap().clone()
    }

    pub fn replies(&self) -> Vec<(Invocation, Reply)> {
        self.replies.lock().unwrap().clone()
    }

    pub fn defer_count(&self) -> usize {
        self.defers.lock().unwrap().len()
    }

    pub fn logout_count(&self) -> usize {
        self.logouts.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl PlatformAdapter for RecordingPlatform {
    fn name(&self) -> &str {
        "recording"
    }

    async fn login(&self, token: &str, _intents: u64, listeners: Listeners) -> anyhow::Result<()> {
        self.logins.fetch_add(1, Ordering::SeqCst);
        self.tokens.lock().unwrap().push(token.to_string());
        *self.listeners.lock().unwrap() = Some(listeners);
        Ok(())
    }

    async fn register_remote_commands(&self, commands: &[RemoteCommand]) -> anyhow::Result<usize> {
        self.remote.lock().unwrap().push(commands.to_vec());
        Ok(commands.len())
    }

    async fn reply(&self, invocation: &Invocation, reply: Reply) -> anyhow::Result<()> {
        self.replies
            .lock()
            .unwrap()
            .push((invocation.clone(), reply));
        Ok(())
    }

    async fn defer(&self, invocation: &Invocation) -> anyhow::Result<()> {
        self.defers.lock().unwrap().push(invocation.clone());
        Ok(())
    }

    async fn logout(&self) -> anyhow::Result<()> {
        self.logouts.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

pub(crate) fn runtime_config() -> RuntimeConfig {
    config::tests::sample().freeze().unwrap()
}

pub(crate) fn context_with(
    commands: CommandRegistry,
    platform: Arc<RecordingPlatform>,
) -> Context {
    context_with_config(runtime_config(), commands, platform)
}

pub(crate) fn context_with_config(
    config: RuntimeConfig,
    commands: CommandRegistry,
    platform: Arc<RecordingPlatform>,
) -> Context {
    Context::new(
        Arc::new(config),
        Arc::new(commands),
        platform,
        StoreHealth::new(),
        RemoteGate::new(),
    )
}

pub(crate) fn test_context() -> Context {
    context_with(CommandRegistry::new(), Arc::new(RecordingPlatform::default()))
}
