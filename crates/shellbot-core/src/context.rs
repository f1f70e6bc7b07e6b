//! Runtime context handed to every handler.
//!
//! Built once per boot after the command registry is complete. Cloning
//! is cheap: every field is shared.

use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;

use crate::command::CommandRegistry;
use crate::config::RuntimeConfig;
use crate::platform::PlatformAdapter;
use crate::store::StoreHealth;

/// Progress of the remote command push.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RemoteStatus {
    Pending,
    Registered,
    Failed,
}

/// Signals when remote command registration has settled.
///
/// Slash invocations that arrive before the `ready` push completes wait
/// here instead of racing it.
#[derive(Debug, Clone)]
pub struct RemoteGate {
    tx: Arc<watch::Sender<RemoteStatus>>,
}

impl Default for RemoteGate {
    fn default() -> Self {
        let (tx, _rx) = watch::channel(RemoteStatus::Pending);
        Self { tx: Arc::new(tx) }
    }
}

impl RemoteGate {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn status(&self) -> RemoteStatus {
        *self.tx.borrow()
    }

    pub fn set(&self, status: RemoteStatus) {
        self.tx.send_replace(status);
    }

    /// Wait until registration leaves `Pending`, or `timeout` passes.
    /// Returns the status at that point.
    pub async fn wait(&self, timeout: Duration) -> RemoteStatus {
        let mut rx = self.tx.subscribe();
        let settled = tokio::time::timeout(
            timeout,
            rx.wait_for(|status| *status != RemoteStatus::Pending),
        )
        .await;
        match settled {
            Ok(Ok(status)) => *status,
            _ => self.status(),
        }
    }
}

/// Capabilities available to handlers.
#[derive(Clone)]
pub struct Context {
    config: Arc<RuntimeConfig>,
    commands: Arc<CommandRegistry>,
    platform: Arc<dyn PlatformAdapter>,
    store: StoreHealth,
    remote: RemoteGate,
}

impl Context {
    pub fn new(
        config: Arc<RuntimeConfig>,
        commands: Arc<CommandRegistry>,
        platform: Arc<dyn PlatformAdapter>,
        store: StoreHealth,
        remote: RemoteGate,
    ) -> Self {
        Self {
            config,
            commands,
            platform,
            store,
            remote,
        }
    }

    pub fn config(&self) -> &RuntimeConfig {
        &self.config
    }

    pub fn commands(&self) -> &CommandRegistry {
        &self.commands
    }

    pub fn platform(&self) -> &Arc<dyn PlatformAdapter> {
        &self.platform
    }

    pub fn store(&self) -> &StoreHealth {
        &self.store
    }

    pub fn remote(&self) -> &RemoteGate {
        &self.remote
    }
}
