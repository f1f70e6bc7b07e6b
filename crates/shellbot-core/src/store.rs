//! Persistent store port and its health flag.
//!
//! The shell only ever initiates a store connection; it never waits on
//! it. The outcome lands in a [`StoreHealth`] that handlers can check.

use async_trait::async_trait;
use std::sync::atomic::{AtomicU8, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};

use crate::config::StoreConfig;

/// Trait every persistent-store adapter implements.
#[async_trait]
pub trait StoreAdapter: Send + Sync {
    async fn connect(&self, config: &StoreConfig) -> anyhow::Result<()>;
}

/// Observable store state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum StoreStatus {
    /// No store configured.
    Disabled = 0,
    Connecting = 1,
    Connected = 2,
    Failed = 3,
}

impl StoreStatus {
    fn from_u8(v: u8) -> Self {
        match v {
            1 => StoreStatus::Connecting,
            2 => StoreStatus::Connected,
            3 => StoreStatus::Failed,
            _ => StoreStatus::Disabled,
        }
    }
}

/// Shared, lock-free store health flag.
#[derive(Debug, Clone)]
pub struct StoreHealth {
    state: Arc<AtomicU8>,
}

impl Default for StoreHealth {
    fn default() -> Self {
        Self {
            state: Arc::new(AtomicU8::new(StoreStatus::Disabled as u8)),
        }
    }
}

impl StoreHealth {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn status(&self) -> StoreStatus {
        StoreStatus::from_u8(self.state.load(Ordering::Acquire))
    }

    pub fn set(&self, status: StoreStatus) {
        self.state.store(status as u8, Ordering::Release);
    }

    /// True only once a connection has succeeded.
    pub fn is_available(&self) -> bool {
        self.status() == StoreStatus::Connected
    }
}

/// Spawn a store connection without waiting on it.
///
/// Success and failure are logged and recorded in `health`; failure is
/// never fatal, the shell keeps running without persistence.
pub fn spawn_connect(
    adapter: Arc<dyn StoreAdapter>,
    config: StoreConfig,
    health: StoreHealth,
) -> tokio::task::JoinHandle<()> {
    health.set(StoreStatus::Connecting);
    info!(uri = %config.redacted_uri(), "Connecting to database");
    tokio::spawn(async move {
        match adapter.connect(&config).await {
            Ok(()) => {
                health.set(StoreStatus::Connected);
                info!(address = %config.address(), "Database connected");
            }
            Err(e) => {
                health.set(StoreStatus::Failed);
                warn!(address = %config.address(), "Database connection failed, running without persistence: {e:#}");
            }
        }
    })
}

/// Minimal store adapter: checks that the store address accepts TCP
/// connections within `timeout`.
pub struct ProbeStore {
    timeout: Duration,
}

impl ProbeStore {
    pub fn new(timeout: Duration) -> Self {
        Self { timeout }
    }
}

impl Default for ProbeStore {
    fn default() -> Self {
        Self::new(Duration::from_secs(5))
    }
}

#[async_trait]
impl StoreAdapter for ProbeStore {
    async fn connect(&self, config: &StoreConfig) -> anyhow::Result<()> {
        let port = config
            .port
            .as_u16()
            .ok_or_else(|| anyhow::anyhow!("invalid store port '{}'", config.port))?;
        let addr = (config.host.as_str(), port);
        tokio::time::timeout(self.timeout, tokio::net::TcpStream::connect(addr))
            .await
            .map_err(|_| anyhow::anyhow!("timed out after {:?}", self.timeout))??;
        Ok(())
    }
}
