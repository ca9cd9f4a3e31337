//! Collector lifecycle management
//!
//! ## States
//!
//! ```text
//! register(interval > 0) → Registered ──start_all / enable──► Running ──disable──► Stopped
//! register(interval = 0) → Disabled   ──enable (default interval)──┘   ◄──enable───┘
//! ```
//!
//! Every running collector is one task ticking at its interval, cancelled through its own
//! token. The tokens are children of the manager's shutdown token, so cancelling that stops
//! every collector at once. A pass in progress races the token and is dropped when it fires.
//!
//! Restarting a collector (interval change, re-registration) aborts the old task before the
//! new one is spawned, so two passes of one collector never overlap.

use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use tokio::task::JoinHandle;
use tokio::time::{MissedTickBehavior, interval};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, instrument, warn};

use super::{Collector, CollectorControl, CollectorError, MAX_INTERVAL_SECS, MIN_INTERVAL_SECS};
use crate::events::{AgentBus, topics};
use crate::models::{CollectorStateEvent, CollectorStatus, CollectorsStatusResponse, RunState};

/// Order collectors are listed in; unlisted names follow alphabetically
pub const COLLECTOR_ORDER: &[&str] = &[
    "system",
    "array",
    "disk",
    "docker",
    "vm",
    "ups",
    "nut",
    "gpu",
    "shares",
    "network",
    "hardware",
    "zfs",
    "notification",
    "registration",
    "unassigned",
];

/// Interval used when a collector registered as disabled is enabled
pub fn default_interval(name: &str) -> u64 {
    match name {
        "system" => 5,
        "array" | "docker" | "vm" | "ups" | "nut" | "gpu" => 10,
        "network" => 15,
        "disk" | "zfs" | "notification" => 30,
        "shares" | "hardware" | "unassigned" => 60,
        "registration" => 300,
        _ => 30,
    }
}

#[derive(Debug, Default)]
struct RunStats {
    last_run: Mutex<Option<DateTime<Utc>>>,
    error_count: AtomicU64,
}

struct Managed {
    collector: Arc<dyn Collector>,
    enabled: bool,
    interval: u64,
    state: RunState,
    required: bool,
    stats: Arc<RunStats>,
    cancel: Option<CancellationToken>,
    task: Option<JoinHandle<()>>,
}

impl Managed {
    fn status(&self, name: &str) -> CollectorStatus {
        CollectorStatus {
            name: name.to_string(),
            enabled: self.enabled,
            interval_seconds: self.interval,
            status: self.state,
            last_run: *self.stats.last_run.lock(),
            error_count: self.stats.error_count.load(Ordering::Relaxed),
            required: self.required,
        }
    }

    fn state_event(&self, name: &str) -> CollectorStateEvent {
        CollectorStateEvent {
            event: topics::COLLECTOR_STATE_CHANGE.name().to_string(),
            collector: name.to_string(),
            enabled: self.enabled,
            status: self.state,
            interval: self.interval,
            timestamp: Utc::now(),
        }
    }

    /// Cancel the running task and hand back its handle
    fn stop(&mut self) -> Option<JoinHandle<()>> {
        if let Some(cancel) = self.cancel.take() {
            cancel.cancel();
        }
        self.state = RunState::Stopped;
        self.task.take()
    }

    fn halt(&mut self) {
        if let Some(task) = self.stop() {
            task.abort();
        }
    }
}

/// Runs registered collectors and applies enable/disable/interval changes at runtime
pub struct CollectorManager {
    bus: Arc<AgentBus>,
    collectors: Mutex<HashMap<String, Managed>>,
    shutdown: CancellationToken,
}

impl CollectorManager {
    pub fn new(bus: Arc<AgentBus>, shutdown: CancellationToken) -> Self {
        Self {
            bus,
            collectors: Mutex::new(HashMap::new()),
            shutdown,
        }
    }

    /// Register a collector; an interval of 0 registers it disabled
    pub fn register(
        &self,
        name: impl Into<String>,
        collector: Arc<dyn Collector>,
        interval_secs: u64,
        required: bool,
    ) {
        let name = name.into();
        let enabled = interval_secs > 0;

        debug!(collector = %name, interval_secs, required, "registered collector");

        let previous = self.collectors.lock().insert(
            name.clone(),
            Managed {
                collector,
                enabled,
                interval: interval_secs,
                state: if enabled {
                    RunState::Registered
                } else {
                    RunState::Disabled
                },
                required,
                stats: Arc::default(),
                cancel: None,
                task: None,
            },
        );

        if let Some(mut previous) = previous {
            warn!(collector = %name, "collector registered twice, replacing the previous one");
            previous.halt();
        }
    }

    /// Start every enabled collector, returning how many were started
    pub fn start_all(&self) -> usize {
        let mut collectors = self.collectors.lock();
        let mut started = 0;

        for (name, managed) in collectors.iter_mut() {
            if managed.enabled && managed.interval > 0 && managed.state != RunState::Running {
                self.start_locked(name, managed);
                started += 1;
            }
        }

        info!(started, "collectors started");
        started
    }

    /// Stop every running collector
    ///
    /// Returns the stopped tasks so the caller can wait for them to finish.
    pub fn stop_all(&self) -> Vec<(String, JoinHandle<()>)> {
        let mut collectors = self.collectors.lock();
        let mut tasks = Vec::new();

        for (name, managed) in collectors.iter_mut() {
            if managed.cancel.is_some() {
                if let Some(task) = managed.stop() {
                    tasks.push((name.clone(), task));
                }
                debug!(collector = %name, "stopped collector");
            }
        }

        tasks
    }

    pub fn names(&self) -> Vec<String> {
        let mut names: Vec<_> = self.collectors.lock().keys().cloned().collect();
        names.sort();
        names
    }

    fn start_locked(&self, name: &str, managed: &mut Managed) {
        let cancel = self.shutdown.child_token();

        let task = tokio::spawn(run_collector(
            name.to_string(),
            managed.collector.clone(),
            self.bus.clone(),
            Duration::from_secs(managed.interval),
            managed.stats.clone(),
            cancel.clone(),
        ));

        managed.cancel = Some(cancel);
        managed.task = Some(task);
        managed.state = RunState::Running;
        managed.enabled = true;

        info!(collector = name, interval_secs = managed.interval, "started collector");
    }

    fn publish_state(&self, event: CollectorStateEvent) {
        self.bus.publish_typed(topics::COLLECTOR_STATE_CHANGE, event);
    }
}

impl CollectorControl for CollectorManager {
    fn enable_collector(&self, name: &str) -> Result<(), CollectorError> {
        let event = {
            let mut collectors = self.collectors.lock();
            let managed = collectors
                .get_mut(name)
                .ok_or_else(|| CollectorError::UnknownCollector(name.to_string()))?;

            if managed.state == RunState::Running {
                return Ok(());
            }

            if managed.interval == 0 {
                managed.interval = default_interval(name);
            }

            self.start_locked(name, managed);
            managed.state_event(name)
        };

        self.publish_state(event);
        Ok(())
    }

    fn disable_collector(&self, name: &str) -> Result<(), CollectorError> {
        let event = {
            let mut collectors = self.collectors.lock();
            let managed = collectors
                .get_mut(name)
                .ok_or_else(|| CollectorError::UnknownCollector(name.to_string()))?;

            if managed.required {
                return Err(CollectorError::RequiredCollector(name.to_string()));
            }

            if managed.state != RunState::Running {
                return Ok(());
            }

            managed.halt();
            managed.enabled = false;
            info!(collector = name, "disabled collector");

            managed.state_event(name)
        };

        self.publish_state(event);
        Ok(())
    }

    fn update_interval(&self, name: &str, seconds: u64) -> Result<(), CollectorError> {
        let mut collectors = self.collectors.lock();
        let managed = collectors
            .get_mut(name)
            .ok_or_else(|| CollectorError::UnknownCollector(name.to_string()))?;

        if !(MIN_INTERVAL_SECS..=MAX_INTERVAL_SECS).contains(&seconds) {
            return Err(CollectorError::InvalidInterval(seconds));
        }

        let was_running = managed.state == RunState::Running;
        if was_running {
            managed.halt();
        }

        managed.interval = seconds;

        if was_running {
            self.start_locked(name, managed);
        }

        info!(collector = name, interval_secs = seconds, "updated collector interval");
        Ok(())
    }

    fn status(&self, name: &str) -> Result<CollectorStatus, CollectorError> {
        self.collectors
            .lock()
            .get(name)
            .map(|managed| managed.status(name))
            .ok_or_else(|| CollectorError::UnknownCollector(name.to_string()))
    }

    fn all_status(&self) -> CollectorsStatusResponse {
        let collectors = self.collectors.lock();

        let mut extra: Vec<&str> = collectors
            .keys()
            .map(String::as_str)
            .filter(|name| !COLLECTOR_ORDER.contains(name))
            .collect();
        extra.sort_unstable();

        let mut order: Vec<&str> = COLLECTOR_ORDER.to_vec();
        order.extend(extra);

        let statuses: Vec<_> = order
            .into_iter()
            .filter_map(|name| collectors.get(name).map(|m| m.status(name)))
            .collect();

        let enabled_count = statuses
            .iter()
            .filter(|s| s.enabled || s.status == RunState::Running)
            .count();

        CollectorsStatusResponse {
            total: statuses.len(),
            enabled_count,
            disabled_count: statuses.len() - enabled_count,
            collectors: statuses,
            timestamp: Utc::now(),
        }
    }
}

#[instrument(skip_all, fields(collector = %name))]
async fn run_collector(
    name: String,
    collector: Arc<dyn Collector>,
    bus: Arc<AgentBus>,
    period: Duration,
    stats: Arc<RunStats>,
    cancel: CancellationToken,
) {
    let mut ticker = interval(period);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        tokio::select! {
            _ = cancel.cancelled() => break,

            _ = ticker.tick() => {
                let result = tokio::select! {
                    _ = cancel.cancelled() => break,
                    result = collector.collect(&bus) => result,
                };

                if let Err(e) = result {
                    stats.error_count.fetch_add(1, Ordering::Relaxed);
                    warn!("collection failed: {e:#}");
                }
                *stats.last_run.lock() = Some(Utc::now());
            }
        }
    }

    debug!("collector task stopped");
}
