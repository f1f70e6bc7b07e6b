//! Bootstrap orchestrator.
//!
//! `Shell` owns the configuration and both registries and walks the boot
//! state machine:
//!
//! ```text
//! UNCONFIGURED → VALIDATING → LOADING → REGISTERING → CONNECTING → LIVE
//!                     └──────────┴───────────┴────────────┴──→ ABORTED
//! ```

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tracing::{info, warn};

use crate::command::CommandRegistry;
use crate::config::{RuntimeConfig, SetupConfig};
use crate::context::{Context, RemoteGate, RemoteStatus};
use crate::error::{BootError, SetupError};
use crate::event::listeners::Listeners;
use crate::event::{names, EventRegistry};
use crate::loader::ModuleLoader;
use crate::platform::PlatformAdapter;
use crate::report::BootReport;
use crate::store::{spawn_connect, ProbeStore, StoreAdapter, StoreHealth};

/// Where the shell is in its boot sequence.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BootState {
    Unconfigured,
    Validating,
    Loading,
    Registering,
    Connecting,
    Live,
    Aborted,
}

/// The runtime shell.
pub struct Shell {
    platform: Arc<dyn PlatformAdapter>,
    loader: Arc<dyn ModuleLoader>,
    store: Arc<dyn StoreAdapter>,
    listeners: Listeners,
    setup: Option<SetupConfig>,
    frozen: bool,
    logged_in: bool,
    state: BootState,
    context: Option<Context>,
}

impl Shell {
    pub fn new(platform: Arc<dyn PlatformAdapter>, loader: Arc<dyn ModuleLoader>) -> Self {
        Self {
            platform,
            loader,
            store: Arc::new(ProbeStore::default()),
            listeners: Listeners::new(),
            setup: None,
            frozen: false,
            logged_in: false,
            state: BootState::Unconfigured,
            context: None,
        }
    }

    /// Replace the store adapter used when `mongoDB` is configured.
    pub fn with_store(mut self, store: Arc<dyn StoreAdapter>) -> Self {
        self.store = store;
        self
    }

    /// Hand over the configuration.
    ///
    /// Only checks that `botConfig` is present. On failure the previously
    /// held configuration is kept. Fails once the shell has booted.
    pub fn setup(&mut self, config: SetupConfig) -> Result<(), SetupError> {
        if self.frozen {
            return Err(SetupError::new(
                "Configuration is frozen once the shell has started!",
            ));
        }
        if config.bot_config.is_none() {
            return Err(SetupError::new("Bot Configuration not filled out!"));
        }
        self.setup = Some(config);
        Ok(())
    }

    pub fn state(&self) -> BootState {
        self.state
    }

    /// Context of the most recent boot, if it got past command registration.
    pub fn context(&self) -> Option<&Context> {
        self.context.as_ref()
    }

    pub fn config(&self) -> Option<&RuntimeConfig> {
        self.context.as_ref().map(Context::config)
    }

    pub fn listeners(&self) -> &Listeners {
        &self.listeners
    }

    /// Validate, load and register everything without connecting.
    pub async fn prepare(&mut self) -> Result<BootReport, BootError> {
        match self.boot().await {
            Ok((report, _)) => Ok(report),
            Err(e) => Err(self.abort(e).await),
        }
    }

    /// Boot the shell and initiate the platform login.
    ///
    /// Returns once login has been initiated. Calling it again rebuilds
    /// both registries from scratch, closes the previous platform session
    /// and logs in again.
    pub async fn start(&mut self) -> Result<(), BootError> {
        let (report, ctx) = match self.boot().await {
            Ok(booted) => booted,
            Err(e) => return Err(self.abort(e).await),
        };

        self.state = BootState::Connecting;
        match &ctx.config().store {
            Some(store) => {
                spawn_connect(Arc::clone(&self.store), store.clone(), ctx.store().clone());
            }
            None => warn!("No mongoDB configuration found, running without persistence"),
        }
        report.log();

        if self.logged_in {
            self.logged_in = false;
            if let Err(e) = self.platform.logout().await {
                warn!(platform = self.platform.name(), "Closing previous session failed: {e:#}");
            }
        }

        let config = ctx.config();
        info!(platform = self.platform.name(), "Logging in");
        if let Err(e) = self
            .platform
            .login(&config.token, config.intents, self.listeners.clone())
            .await
        {
            return Err(self.abort(BootError::Login(e)).await);
        }

        self.logged_in = true;
        self.state = BootState::Live;
        info!(
            platform = self.platform.name(),
            commands = ctx.commands().len(),
            "Shell is live"
        );
        Ok(())
    }

    /// Unbind every listener and close the platform session.
    pub async fn stop(&mut self) -> anyhow::Result<()> {
        self.listeners.remove_all().await;
        if self.logged_in {
            self.logged_in = false;
            self.platform.logout().await?;
        }
        info!(platform = self.platform.name(), "Shell stopped");
        Ok(())
    }

    /// Nothing stays bound once a boot has failed.
    async fn abort(&mut self, e: BootError) -> BootError {
        self.state = BootState::Aborted;
        self.listeners.remove_all().await;
        e
    }

    /// VALIDATING through REGISTERING.
    async fn boot(&mut self) -> Result<(BootReport, Context), BootError> {
        self.state = BootState::Validating;
        let setup = self
            .setup
            .as_ref()
            .ok_or_else(|| SetupError::new("Shell has not been set up! Call setup() first."))?;
        let config = Arc::new(setup.freeze()?);
        self.frozen = true;
        self.context = None;

        self.listeners.remove_all().await;

        self.state = BootState::Loading;
        let modules = self.loader.load_commands(&config)?;

        self.state = BootState::Registering;
        let mut commands = CommandRegistry::new();
        commands.register(modules)?;
        let commands = Arc::new(commands);

        let ctx = Context::new(
            Arc::clone(&config),
            Arc::clone(&commands),
            Arc::clone(&self.platform),
            StoreHealth::new(),
            RemoteGate::new(),
        );
        self.context = Some(ctx.clone());
        self.bind_remote_registration(&ctx).await;

        let modules = self.loader.load_events(&config)?;
        let mut events = EventRegistry::new();
        events.register(modules, &ctx, &self.listeners).await?;

        Ok((BootReport::from_registries(&commands, &events), ctx))
    }

    /// Push the remote command list on the first `ready` of this boot.
    async fn bind_remote_registration(&self, ctx: &Context) {
        let pushed = Arc::new(AtomicBool::new(false));
        let ctx = ctx.clone();
        self.listeners
            .on(names::READY, move |_payload| {
                let ctx = ctx.clone();
                let pushed = Arc::clone(&pushed);
                async move {
                    if pushed.swap(true, Ordering::SeqCst) {
                        return Ok(());
                    }
                    let remote = ctx.commands().remote_commands();
                    match ctx.platform().register_remote_commands(&remote).await {
                        Ok(accepted) => {
                            ctx.remote().set(RemoteStatus::Registered);
                            info!(count = accepted, "Registered remote commands");
                            Ok(())
                        }
                        Err(e) => {
                            ctx.remote().set(RemoteStatus::Failed);
                            Err(e.context("remote command registration failed"))
                        }
                    }
                }
            })
            .await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::command::tests::module;
    use crate::command::{CommandModule, CommandType};
    use crate::config::tests::sample;
    use crate::config::{Port, StoreConfig};
    use crate::event::{EventHandler, EventModule, EventPayload, IncomingMessage, ReadyInfo};
    use crate::loader::StaticModules;
    use crate::store::StoreStatus;
    use crate::testing::RecordingPlatform;
    use async_trait::async_trait;
    use std::sync::atomic::AtomicUsize;
    use std::time::Duration;

    struct Counter(Arc<AtomicUsize>);

    #[async_trait]
    impl EventHandler for Counter {
        async fn run(&self, _: &Context, _: &EventPayload) -> anyhow::Result<()> {
            self.0.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }
    }

    fn ready() -> EventPayload {
        EventPayload::Ready(ReadyInfo {
            user: "shellbot".into(),
            guilds: 1,
        })
    }

    fn message() -> EventPayload {
        EventPayload::Message(IncomingMessage {
            id: "m".into(),
            channel_id: "c".into(),
            guild_id: None,
            author_id: "7".into(),
            author_is_bot: false,
            content: "hi".into(),
        })
    }

    fn shell_with(modules: StaticModules) -> (Shell, Arc<RecordingPlatform>) {
        let platform = Arc::new(RecordingPlatform::default());
        let shell = Shell::new(platform.clone(), Arc::new(modules));
        (shell, platform)
    }

    #[tokio::test]
    async fn test_boot_registers_and_pushes_remote_once() {
        let ready_hits = Arc::new(AtomicUsize::new(0));
        let modules = StaticModules::new()
            .command(module("ping", "pong", CommandType::Text))
            .command(
                module("ticketing", "Sends the ticket panel", CommandType::Slash)
                    .permission("ADMINISTRATOR"),
            )
            .event(EventModule::new("ready", Arc::new(Counter(ready_hits.clone()))));
        let (mut shell, platform) = shell_with(modules);

        shell.setup(sample()).unwrap();
        shell.start().await.unwrap();

        assert_eq!(shell.state(), BootState::Live);
        assert_eq!(platform.login_count(), 1);
        assert_eq!(*platform.tokens.lock().unwrap(), vec!["token".to_string()]);
        let ctx = shell.context().unwrap();
        assert_eq!(ctx.commands().len(), 2);
        assert_eq!(ctx.remote().status(), RemoteStatus::Pending);
        assert!(platform.remote_pushes().is_empty());

        // internal listener plus the user's ready module
        assert_eq!(shell.listeners().emit("ready", ready()).await, 2);
        shell.listeners().emit("ready", ready()).await;

        let pushes = platform.remote_pushes();
        assert_eq!(pushes.len(), 1);
        assert_eq!(pushes[0].len(), 1);
        assert_eq!(pushes[0][0].name, "ticketing");
        assert_eq!(ctx.remote().status(), RemoteStatus::Registered);
        assert_eq!(ready_hits.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_start_without_setup() {
        let (mut shell, platform) = shell_with(StaticModules::new());
        let err = shell.start().await.unwrap_err();
        assert!(err.is_setup());
        assert_eq!(shell.state(), BootState::Aborted);
        assert_eq!(platform.login_count(), 0);
    }

    #[tokio::test]
    async fn test_rejected_setup_keeps_previous_config() {
        let (mut shell, _) = shell_with(StaticModules::new());
        shell.setup(sample()).unwrap();

        let mut incomplete = sample();
        incomplete.bot_config = None;
        incomplete.token = "other".into();
        let err = shell.setup(incomplete).unwrap_err();
        assert_eq!(err.0, "Bot Configuration not filled out!");

        shell.start().await.unwrap();
        assert_eq!(shell.config().unwrap().token, "token");
    }

    #[tokio::test]
    async fn test_empty_token_aborts_before_login() {
        let (mut shell, platform) = shell_with(StaticModules::new());
        let mut config = sample();
        config.token.clear();
        shell.setup(config).unwrap();

        let err = shell.start().await.unwrap_err();
        match err {
            BootError::Setup(e) => assert_eq!(e.0, "Please provide a bot token!"),
            other => panic!("expected setup error, got {other}"),
        }
        assert_eq!(platform.login_count(), 0);
        assert!(shell.context().is_none());
    }

    struct CountingLoader {
        inner: StaticModules,
        event_loads: AtomicUsize,
    }

    impl ModuleLoader for CountingLoader {
        fn load_commands(&self, config: &RuntimeConfig) -> Result<Vec<CommandModule>, BootError> {
            self.inner.load_commands(config)
        }

        fn load_events(&self, config: &RuntimeConfig) -> Result<Vec<EventModule>, BootError> {
            self.event_loads.fetch_add(1, Ordering::SeqCst);
            self.inner.load_events(config)
        }
    }

    #[tokio::test]
    async fn test_command_error_stops_before_events_load() {
        let hits = Arc::new(AtomicUsize::new(0));
        let loader = Arc::new(CountingLoader {
            inner: StaticModules::new()
                .command(module("ping", "pong", CommandType::Text))
                .command(module("unmute", "", CommandType::Slash))
                .event(EventModule::new("ready", Arc::new(Counter(hits)))),
            event_loads: AtomicUsize::new(0),
        });
        let platform = Arc::new(RecordingPlatform::default());
        let mut shell = Shell::new(platform.clone(), loader.clone());
        shell.setup(sample()).unwrap();

        let err = shell.start().await.unwrap_err();
        assert!(err.is_command());
        assert_eq!(loader.event_loads.load(Ordering::SeqCst), 0);
        assert_eq!(shell.listeners().listener_count("ready").await, 0);
        assert_eq!(platform.login_count(), 0);
    }

    #[tokio::test]
    async fn test_event_error_keeps_command_registry() {
        let hits = Arc::new(AtomicUsize::new(0));
        let modules = StaticModules::new()
            .command(module("ping", "pong", CommandType::Text))
            .event(EventModule::unnamed(Arc::new(Counter(hits))));
        let (mut shell, platform) = shell_with(modules);
        shell.setup(sample()).unwrap();

        let err = shell.start().await.unwrap_err();
        assert!(err.is_event());
        assert_eq!(shell.state(), BootState::Aborted);
        assert_eq!(shell.context().unwrap().commands().len(), 1);
        assert_eq!(shell.listeners().listener_count("ready").await, 0);
        assert_eq!(platform.login_count(), 0);
    }

    #[tokio::test]
    async fn test_restart_does_not_duplicate_handlers() {
        let hits = Arc::new(AtomicUsize::new(0));
        let modules = StaticModules::new()
            .event(EventModule::new("messageCreate", Arc::new(Counter(hits.clone()))));
        let (mut shell, platform) = shell_with(modules);
        shell.setup(sample()).unwrap();

        shell.start().await.unwrap();
        assert_eq!(platform.logout_count(), 0);
        shell.start().await.unwrap();

        assert_eq!(platform.login_count(), 2);
        assert_eq!(platform.logout_count(), 1);
        assert_eq!(shell.listeners().emit("messageCreate", message()).await, 1);
        assert_eq!(hits.load(Ordering::SeqCst), 1);
        assert_eq!(shell.listeners().listener_count("ready").await, 1);
    }

    #[tokio::test]
    async fn test_setup_after_start_is_rejected() {
        let (mut shell, _) = shell_with(StaticModules::new());
        shell.setup(sample()).unwrap();
        shell.start().await.unwrap();

        let mut other = sample();
        other.token = "changed".into();
        assert!(shell.setup(other).is_err());
        assert_eq!(shell.config().unwrap().token, "token");
    }

    #[tokio::test]
    async fn test_prepare_does_not_connect() {
        let modules = StaticModules::new()
            .command(module("help", "Lists commands", CommandType::Both))
            .event(EventModule::new("ready", Arc::new(Counter(Arc::default()))));
        let (mut shell, platform) = shell_with(modules);
        shell.setup(sample()).unwrap();

        let report = shell.prepare().await.unwrap();
        assert_eq!(report.commands.len(), 1);
        assert_eq!(report.events.len(), 1);
        assert_eq!(report.remote_commands, 1);
        assert_eq!(platform.login_count(), 0);
        assert_eq!(shell.state(), BootState::Registering);
    }

    #[tokio::test]
    async fn test_stop_unbinds_and_logs_out() {
        let modules = StaticModules::new()
            .event(EventModule::new("messageCreate", Arc::new(Counter(Arc::default()))));
        let (mut shell, platform) = shell_with(modules);
        shell.setup(sample()).unwrap();
        shell.start().await.unwrap();

        shell.stop().await.unwrap();
        assert_eq!(platform.logout_count(), 1);
        assert_eq!(shell.listeners().emit("messageCreate", message()).await, 0);

        shell.stop().await.unwrap();
        assert_eq!(platform.logout_count(), 1);
    }

    struct FailingStore;

    #[async_trait]
    impl StoreAdapter for FailingStore {
        async fn connect(&self, _: &StoreConfig) -> anyhow::Result<()> {
            anyhow::bail!("authentication failed")
        }
    }

    #[tokio::test]
    async fn test_store_failure_is_not_fatal() {
        let (shell, platform) = shell_with(StaticModules::new());
        let mut shell = shell.with_store(Arc::new(FailingStore));
        let mut config = sample();
        config.mongo_db = Some(StoreConfig {
            username: "bot".into(),
            password: "secret".into(),
            host: "127.0.0.1".into(),
            port: Port::Number(27017),
            database: "bot".into(),
        });
        shell.setup(config).unwrap();
        shell.start().await.unwrap();

        assert_eq!(shell.state(), BootState::Live);
        assert_eq!(platform.login_count(), 1);

        let health = shell.context().unwrap().store().clone();
        for _ in 0..100 {
            if health.status() == StoreStatus::Failed {
                break;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        assert_eq!(health.status(), StoreStatus::Failed);
    }

    #[tokio::test]
    async fn test_missing_store_config_runs_degraded() {
        let (mut shell, platform) = shell_with(StaticModules::new());
        shell.setup(sample()).unwrap();
        shell.start().await.unwrap();

        assert_eq!(platform.login_count(), 1);
        let ctx = shell.context().unwrap();
        assert_eq!(ctx.store().status(), StoreStatus::Disabled);
    }

    struct RefusingPlatform;

    #[async_trait]
    impl PlatformAdapter for RefusingPlatform {
        fn name(&self) -> &str {
            "refusing"
        }

        async fn login(&self, _: &str, _: u64, _: Listeners) -> anyhow::Result<()> {
            anyhow::bail!("invalid token")
        }

        async fn register_remote_commands(
            &self,
            _: &[crate::command::RemoteCommand],
        ) -> anyhow::Result<usize> {
            Ok(0)
        }

        async fn reply(
            &self,
            _: &crate::platform::Invocation,
            _: crate::platform::Reply,
        ) -> anyhow::Result<()> {
            Ok(())
        }
    }

    #[tokio::test]
    async fn test_login_failure_aborts() {
        let mut shell = Shell::new(Arc::new(RefusingPlatform), Arc::new(StaticModules::new()));
        shell.setup(sample()).unwrap();

        let err = shell.start().await.unwrap_err();
        assert!(matches!(err, BootError::Login(_)));
        assert!(err.to_string().contains("invalid token"));
        assert_eq!(shell.state(), BootState::Aborted);
        assert_eq!(shell.listeners().listener_count("ready").await, 0);
    }
}
