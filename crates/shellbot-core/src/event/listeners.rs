//! Listener table keyed by event name.
//!
//! The platform adapter pushes events in through [`Listeners::emit`]; the
//! event registry binds handlers with [`Listeners::on`]. The map sits
//! behind a shared `RwLock` so emitting never blocks registration for
//! longer than a clone of the callback list.

use futures::future::BoxFuture;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::{debug, error};

use super::EventPayload;

/// Callback type for bound listeners.
pub type ListenerFn =
    Arc<dyn Fn(Arc<EventPayload>) -> BoxFuture<'static, anyhow::Result<()>> + Send + Sync>;

type ListenerMap = Arc<RwLock<HashMap<String, Vec<ListenerFn>>>>;

/// Shared listener table. Cloning shares the same table.
#[derive(Clone, Default)]
pub struct Listeners {
    map: ListenerMap,
}

impl Listeners {
    pub fn new() -> Self {
        Self::default()
    }

    /// Bind a listener to `event`. Listeners accumulate; nothing is replaced.
    pub async fn on<F, Fut>(&self, event: &str, callback: F)
    where
        F: Fn(Arc<EventPayload>) -> Fut + Send + Sync + 'static,
        Fut: std::future::Future<Output = anyhow::Result<()>> + Send + 'static,
    {
        let boxed: ListenerFn = Arc::new(move |payload| Box::pin(callback(payload)));
        let mut map = self.map.write().await;
        map.entry(event.to_string()).or_default().push(boxed);
    }

    /// Drop every listener for every event.
    pub async fn remove_all(&self) {
        let mut map = self.map.write().await;
        let dropped: usize = map.values().map(Vec::len).sum();
        map.clear();
        if dropped > 0 {
            debug!(dropped, "Removed all listeners");
        }
    }

    pub async fn listener_count(&self, event: &str) -> usize {
        self.map.read().await.get(event).map_or(0, Vec::len)
    }

    /// Deliver `payload` to every listener bound to `event`.
    ///
    /// Each listener runs in its own task. Errors and panics are logged
    /// and never reach the caller. Returns the number of listeners fired.
    pub async fn emit(&self, event: &str, payload: EventPayload) -> usize {
        let callbacks: Vec<ListenerFn> = {
            let map = self.map.read().await;
            map.get(event).cloned().unwrap_or_default()
        };

        if callbacks.is_empty() {
            debug!(event, "No listeners for event");
            return 0;
        }

        let payload = Arc::new(payload);
        let handles: Vec<_> = callbacks
            .iter()
            .map(|callback| tokio::spawn(callback(Arc::clone(&payload))))
            .collect();

        for (index, outcome) in futures::future::join_all(handles)
            .await
            .into_iter()
            .enumerate()
        {
            match outcome {
                Ok(Ok(())) => {}
                Ok(Err(e)) => error!(event, listener = index, "Event handler failed: {e:#}"),
                Err(e) => error!(event, listener = index, "Event handler panicked: {e}"),
            }
        }

        callbacks.len()
    }
}
