//! Client facade: login, shard startup, and the event pump

use parking_lot::Mutex;
use parley_common::ClientConfig;
use parley_core::CurrentUser;
use parley_gateway::{GatewayEventType, ShardConfig, ShardEvent, ShardManager};
use parley_http::Http;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tracing::{debug, info, instrument};

use crate::context::Context;
use crate::dispatch::{spawn_event, spawn_raw};
use crate::error::{ClientError, ClientResult};
use crate::event::Event;
use crate::handler::{EventHandler, RawEventHandler};
use crate::state::{AutoShardedConnectionState, ConnectionState};

pub struct ClientBuilder {
    config: ClientConfig,
    handler: Option<Arc<dyn EventHandler>>,
    raw_handler: Option<Arc<dyn RawEventHandler>>,
}

impl ClientBuilder {
    pub fn new(config: ClientConfig) -> Self {
        Self {
            config,
            handler: None,
            raw_handler: None,
        }
    }

    #[must_use]
    pub fn event_handler<H: EventHandler>(mut self, handler: H) -> Self {
        self.handler = Some(Arc::new(handler));
        self
    }

    /// Share one handler between clients
    #[must_use]
    pub fn event_handler_arc(mut self, handler: Arc<dyn EventHandler>) -> Self {
        self.handler = Some(handler);
        self
    }

    #[must_use]
    pub fn raw_event_handler<H: RawEventHandler>(mut self, handler: H) -> Self {
        self.raw_handler = Some(Arc::new(handler));
        self
    }

    pub fn build(self) -> ClientResult<Client> {
        let http = Http::new(&self.config.token, self.config.bot, self.config.http.clone())?;
        let cache = Arc::new(ConnectionState::new(&self.config));
        Ok(Client {
            config: self.config,
            http,
            cache,
            handler: self.handler,
            raw_handler: self.raw_handler,
            manager: Mutex::new(None),
            closed: AtomicBool::new(false),
        })
    }
}

/// A logged-in account with its gateway shards
///
/// ```no_run
/// # async fn run() -> parley_client::ClientResult<()> {
/// use parley_client::{Client, Context, EventHandler};
/// use parley_common::ClientConfig;
///
/// struct Handler;
///
/// #[async_trait::async_trait]
/// impl EventHandler for Handler {
///     async fn on_ready(&self, ctx: Context) {
///         println!("{} guilds", ctx.cache.guild_count());
///     }
/// }
///
/// let client = Client::builder(ClientConfig::from_env()?)
///     .event_handler(Handler)
///     .build()?;
/// client.start().await
/// # }
/// ```
pub struct Client {
    config: ClientConfig,
    http: Http,
    cache: Arc<ConnectionState>,
    handler: Option<Arc<dyn EventHandler>>,
    raw_handler: Option<Arc<dyn RawEventHandler>>,
    manager: Mutex<Option<Arc<ShardManager>>>,
    closed: AtomicBool,
}

impl Client {
    pub fn builder(config: ClientConfig) -> ClientBuilder {
        ClientBuilder::new(config)
    }

    #[inline]
    pub fn http(&self) -> &Http {
        &self.http
    }

    pub fn cache(&self) -> Arc<ConnectionState> {
        Arc::clone(&self.cache)
    }

    /// The cache with per-shard readiness, once started with more than one shard
    pub fn sharded_cache(&self) -> Option<AutoShardedConnectionState> {
        let shard_count = self.cache.shard_count()?;
        Some(AutoShardedConnectionState::from_state(self.cache(), shard_count))
    }

    #[inline]
    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    pub fn user(&self) -> Option<CurrentUser> {
        self.cache.current_user()
    }

    #[inline]
    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::Relaxed)
    }

    /// Connect with the configured shard count (one shard by default) and
    /// dispatch events until every shard stops
    pub async fn start(&self) -> ClientResult<()> {
        self.run(false).await
    }

    /// Like [`start`](Self::start), using the recommended shard count
    pub async fn start_autosharded(&self) -> ClientResult<()> {
        self.run(true).await
    }

    #[instrument(skip(self), fields(bot = self.config.bot))]
    async fn run(&self, autoshard: bool) -> ClientResult<()> {
        if self.is_closed() {
            return Err(ClientError::Closed);
        }

        let user = self.http.static_login().await?;
        info!(user_id = %user.user.id, username = %user.user.username, "logged in");

        let gateway = self.http.get_gateway().await?;
        let shard_count = match (self.config.gateway.shard_count, autoshard) {
            (Some(count), _) => Some(count),
            (None, true) => Some(gateway.shards),
            (None, false) => None,
        };
        if let Some(count) = shard_count {
            self.cache.set_shard_count(count);
        }
        let url = self.config.gateway.url.clone().unwrap_or(gateway.url);

        let (manager, events) = ShardManager::new(
            ShardConfig::from_client(&self.config, url),
            shard_count.unwrap_or(1),
            gateway.session_start_limit.max_concurrency,
        );
        let manager = Arc::new(manager);
        *self.manager.lock() = Some(Arc::clone(&manager));
        // A close() racing the login above
        if self.is_closed() {
            return Err(ClientError::Closed);
        }

        manager.start()?;
        for shard_id in 0..manager.shard_count() {
            if let Some(messenger) = manager.messenger(shard_id) {
                self.cache.set_messenger(messenger);
            }
        }

        let result = self.pump(&manager, events).await;
        *self.manager.lock() = None;
        self.cache.chunks().clear();
        result
    }

    async fn pump(&self, manager: &ShardManager, mut events: mpsc::UnboundedReceiver<ShardEvent>) -> ClientResult<()> {
        let join = manager.join();
        tokio::pin!(join);

        loop {
            tokio::select! {
                Some(event) = events.recv() => self.handle_shard_event(manager, event),
                result = &mut join => {
                    while let Ok(event) = events.try_recv() {
                        self.handle_shard_event(manager, event);
                    }
                    info!("all shards stopped");
                    return result.map_err(ClientError::from);
                }
            }
        }
    }

    fn handle_shard_event(&self, manager: &ShardManager, event: ShardEvent) {
        let shard_id = event.shard_id();
        let Some(shard) = manager.messenger(shard_id) else {
            debug!(shard_id, "event from unknown shard");
            return;
        };
        let ctx = Context::new(self.http.clone(), Arc::clone(&self.cache), shard);

        let mut is_ready = false;
        if let ShardEvent::Dispatch { event: name, data, .. } = &event {
            is_ready = *name == GatewayEventType::Ready;
            if let Some(raw) = &self.raw_handler {
                spawn_raw(Arc::clone(raw), ctx.clone(), name.clone(), data.clone());
            }
        }

        for client_event in self.cache.handle(event) {
            self.dispatch(&ctx, client_event);
        }

        // Bot guilds keep arriving after READY
        if is_ready && self.cache.is_starting(shard_id) {
            let cache = Arc::clone(&self.cache);
            let handler = self.handler.clone();
            tokio::spawn(async move {
                for event in cache.finish_startup(shard_id).await {
                    if let Some(handler) = &handler {
                        spawn_event(Arc::clone(handler), ctx.clone(), event);
                    }
                }
            });
        }
    }

    fn dispatch(&self, ctx: &Context, event: Event) {
        match &self.handler {
            Some(handler) => {
                spawn_event(Arc::clone(handler), ctx.clone(), event);
            }
            None => debug!(event = event.name(), "no handler registered"),
        }
    }

    /// Stop every shard; `start` returns once they have closed
    pub fn close(&self) {
        if self.closed.swap(true, Ordering::Relaxed) {
            return;
        }
        info!("closing client");
        if let Some(manager) = self.manager.lock().as_ref() {
            manager.shutdown_all();
        }
    }

    /// Wait until the cache is populated
    pub async fn wait_until_ready(&self) -> ClientResult<()> {
        let mut ready = self.cache.subscribe_ready();
        ready
            .wait_for(|ready| *ready)
            .await
            .map_err(|_| ClientError::Closed)?;
        Ok(())
    }

    /// Average heartbeat latency over the connected shards
    pub fn latency(&self) -> Option<Duration> {
        self.manager.lock().as_ref()?.average_latency()
    }

    /// Heartbeat latency per shard
    pub fn latencies(&self) -> Vec<(u64, Option<Duration>)> {
        self.manager
            .lock()
            .as_ref()
            .map(|m| m.latencies())
            .unwrap_or_default()
    }
}

impl std::fmt::Debug for Client {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Client")
            .field("bot", &self.config.bot)
            .field("cache", &self.cache)
            .field("closed", &self.is_closed())
            .finish_non_exhaustive()
    }
}
