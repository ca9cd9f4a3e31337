//! Explicit construction, start and shutdown of the agent
//!
//! ```text
//! AgentBuilder::start
//!   ├─ bus + cache
//!   ├─ WsHub::spawn              (hub run loop)
//!   ├─ Subscriptions::start      (cache subscriber + broadcast loop, subscribed before return)
//!   ├─ CollectorManager::start_all
//!   └─ spawn_api_server          (REST + WebSocket)
//! ```
//!
//! All tasks hang off one [`CancellationToken`]. [`Agent::shutdown`] cancels it and waits up
//! to the configured grace period for every task, collectors included, to finish. Tasks still
//! running after that are aborted.

use std::net::SocketAddr;
use std::sync::Arc;

use tokio::task::JoinHandle;
use tokio::time::timeout;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::api::{self, ApiConfig, ApiState};
use crate::cache::CacheStore;
use crate::collectors::{Collector, CollectorManager, SystemCollector};
use crate::config::Config;
use crate::events::AgentBus;
use crate::hub::{HubConfig, WsHub};
use crate::subscriptions::Subscriptions;

struct PendingCollector {
    name: String,
    collector: Arc<dyn Collector>,
    required: bool,
}

/// Assembles an [`Agent`]
pub struct AgentBuilder {
    config: Config,
    cache: CacheStore,
    collectors: Vec<PendingCollector>,
    system_collector: bool,
}

impl AgentBuilder {
    /// Use a preconfigured cache, e.g. one with network services or parity sources attached
    pub fn cache(mut self, cache: CacheStore) -> Self {
        self.cache = cache;
        self
    }

    /// Register an additional collector, scheduled at its configured interval
    pub fn collector(mut self, name: impl Into<String>, collector: Arc<dyn Collector>) -> Self {
        self.collectors.push(PendingCollector {
            name: name.into(),
            collector,
            required: false,
        });
        self
    }

    /// Leave out the built-in system collector
    pub fn without_system_collector(mut self) -> Self {
        self.system_collector = false;
        self
    }

    /// Start every task and bind the API server
    pub async fn start(self) -> anyhow::Result<Agent> {
        let Self {
            config,
            cache,
            mut collectors,
            system_collector,
        } = self;

        let cancel = CancellationToken::new();
        let bus = Arc::new(AgentBus::new(config.bus_buffer));
        let cache = Arc::new(cache);

        let (hub, hub_task) = WsHub::spawn(HubConfig::from(&config.websocket), cancel.child_token());
        let subscriptions = Subscriptions::start(bus.clone(), cache.clone(), hub.clone(), &cancel);

        if system_collector {
            collectors.insert(
                0,
                PendingCollector {
                    name: "system".to_string(),
                    collector: Arc::new(SystemCollector::new()),
                    required: true,
                },
            );
        }

        let manager = Arc::new(CollectorManager::new(bus.clone(), cancel.child_token()));
        for PendingCollector {
            name,
            collector,
            required,
        } in collectors
        {
            let interval = config.interval(&name);
            manager.register(name, collector, interval, required);
        }
        let started = manager.start_all();
        debug!(collectors = ?manager.names(), started, "collectors registered");

        let state = ApiState::new(cache.clone(), hub.clone(), manager.clone(), bus.clone());
        let api_config = ApiConfig {
            bind_addr: config.bind_addr(),
            enable_cors: config.enable_cors,
        };
        let (addr, api_task) =
            match api::spawn_api_server(api_config, state, cancel.child_token()).await {
                Ok(bound) => bound,
                Err(e) => {
                    cancel.cancel();
                    for (_, task) in manager.stop_all() {
                        task.abort();
                    }
                    return Err(e);
                }
            };

        info!(%addr, "agent started");

        Ok(Agent {
            config,
            bus,
            cache,
            hub,
            collectors: manager,
            cancel,
            addr,
            subscriptions,
            tasks: vec![("ws_hub", hub_task), ("api", api_task)],
        })
    }
}

/// A running agent
pub struct Agent {
    config: Config,
    bus: Arc<AgentBus>,
    cache: Arc<CacheStore>,
    hub: WsHub,
    collectors: Arc<CollectorManager>,
    cancel: CancellationToken,
    addr: SocketAddr,
    subscriptions: Subscriptions,
    tasks: Vec<(&'static str, JoinHandle<()>)>,
}

impl Agent {
    pub fn builder(config: Config) -> AgentBuilder {
        let cache = CacheStore::new().with_network_services_ttl(config.network_services_ttl());
        AgentBuilder {
            config,
            cache,
            collectors: Vec::new(),
            system_collector: true,
        }
    }

    /// Address the API server is bound to
    pub fn addr(&self) -> SocketAddr {
        self.addr
    }

    pub fn bus(&self) -> &Arc<AgentBus> {
        &self.bus
    }

    pub fn cache(&self) -> &Arc<CacheStore> {
        &self.cache
    }

    pub fn hub(&self) -> &WsHub {
        &self.hub
    }

    pub fn collectors(&self) -> &Arc<CollectorManager> {
        &self.collectors
    }

    /// Token cancelled on shutdown
    pub fn cancellation_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    /// Stop every task, waiting at most the configured grace period
    pub async fn shutdown(self) {
        info!("shutting down agent");

        self.cancel.cancel();

        let grace = self.config.shutdown_grace();
        let mut tasks: Vec<(String, JoinHandle<()>)> = self.collectors.stop_all();
        tasks.extend(
            self.subscriptions
                .into_tasks()
                .into_iter()
                .chain(self.tasks)
                .map(|(name, task)| (name.to_string(), task)),
        );

        let drain = async {
            for (name, task) in tasks.iter_mut() {
                match task.await {
                    Ok(()) => debug!(task = %name, "task stopped"),
                    Err(e) => warn!(task = %name, "task ended abnormally: {e}"),
                }
            }
        };

        if timeout(grace, drain).await.is_err() {
            for (name, task) in &tasks {
                if !task.is_finished() {
                    warn!(task = %name, "task still running after {grace:?}, aborting");
                    task.abort();
                }
            }
        }

        info!("agent stopped");
    }
}
