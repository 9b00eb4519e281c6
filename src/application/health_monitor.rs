//! Health Monitor
//!
//! Runs registered probes concurrently, each under its own deadline, and
//! folds the results into one aggregate status. Classification uses the
//! wall-clock time the monitor measured, not what a probe reports.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, PoisonError, RwLock};
use std::time::Duration;

use arc_swap::ArcSwapOption;
use chrono::{DateTime, Utc};
use futures::future::join_all;
use serde::{Deserialize, Serialize};
use tokio::task::JoinHandle;
use tokio::time::Instant;

use crate::ports::HealthCheck;

/// Default period between background checks
pub const DEFAULT_CHECK_INTERVAL: Duration = Duration::from_secs(10);

/// Default per-probe deadline
pub const DEFAULT_PROBE_TIMEOUT: Duration = Duration::from_secs(5);

/// Default latency above which an ok probe counts as degraded
pub const DEFAULT_LATENCY_THRESHOLD: Duration = Duration::from_millis(2_000);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HealthStatus {
    Healthy,
    Degraded,
    Down,
}

impl HealthStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            HealthStatus::Healthy => "healthy",
            HealthStatus::Degraded => "degraded",
            HealthStatus::Down => "down",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HealthConfig {
    pub check_interval: Duration,
    pub probe_timeout: Duration,
    pub latency_threshold: Duration,
}

impl Default for HealthConfig {
    fn default() -> Self {
        Self {
            check_interval: DEFAULT_CHECK_INTERVAL,
            probe_timeout: DEFAULT_PROBE_TIMEOUT,
            latency_threshold: DEFAULT_LATENCY_THRESHOLD,
        }
    }
}

/// Registration options for one service
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ServiceOptions {
    /// A critical service being down takes the whole system down
    pub critical: bool,
    /// Overrides the monitor's probe timeout
    pub timeout: Option<Duration>,
}

impl ServiceOptions {
    pub fn critical() -> Self {
        Self { critical: true, timeout: None }
    }

    pub fn optional() -> Self {
        Self { critical: false, timeout: None }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }
}

/// Result of the latest probe of one service
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ServiceHealth {
    pub name: String,
    pub status: HealthStatus,
    pub critical: bool,
    /// Measured by the monitor
    pub latency_ms: u64,
    pub message: Option<String>,
    /// Share of failed probes since registration
    pub error_rate: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AggregateHealth {
    pub overall: HealthStatus,
    /// In registration order
    pub services: Vec<ServiceHealth>,
    pub checked_at: DateTime<Utc>,
}

impl AggregateHealth {
    pub fn status_of(&self, name: &str) -> Option<HealthStatus> {
        self.services.iter().find(|s| s.name == name).map(|s| s.status)
    }

    pub fn is_down(&self, name: &str) -> bool {
        self.status_of(name) == Some(HealthStatus::Down)
    }
}

pub type HealthListener = Arc<dyn Fn(&AggregateHealth) + Send + Sync>;

/// Handle returned by `on_health_change`, used to remove the listener
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ListenerId(u64);

struct ServiceRecord {
    name: String,
    checker: Arc<dyn HealthCheck>,
    critical: bool,
    timeout: Duration,
    checks: AtomicU64,
    failures: AtomicU64,
}

pub struct HealthMonitor {
    config: HealthConfig,
    services: RwLock<Vec<Arc<ServiceRecord>>>,
    listeners: RwLock<Vec<(ListenerId, HealthListener)>>,
    next_listener: AtomicU64,
    last: ArcSwapOption<AggregateHealth>,
}

impl Default for HealthMonitor {
    fn default() -> Self {
        Self::new(HealthConfig::default())
    }
}

impl std::fmt::Debug for HealthMonitor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HealthMonitor")
            .field("config", &self.config)
            .field("services", &self.service_names())
            .finish()
    }
}

impl HealthMonitor {
    pub fn new(config: HealthConfig) -> Self {
        Self {
            config,
            services: RwLock::new(Vec::new()),
            listeners: RwLock::new(Vec::new()),
            next_listener: AtomicU64::new(0),
            last: ArcSwapOption::empty(),
        }
    }

    pub fn config(&self) -> &HealthConfig {
        &self.config
    }

    /// Register a probe. A service registered twice keeps its position and
    /// takes the new checker.
    pub fn register_service(&self, name: &str, checker: Arc<dyn HealthCheck>, options: ServiceOptions) {
        let record = Arc::new(ServiceRecord {
            name: name.to_string(),
            checker,
            critical: options.critical,
            timeout: options.timeout.unwrap_or(self.config.probe_timeout),
            checks: AtomicU64::new(0),
            failures: AtomicU64::new(0),
        });

        let mut services = self.services.write().unwrap_or_else(PoisonError::into_inner);
        match services.iter_mut().find(|s| s.name == name) {
            Some(existing) => *existing = record,
            None => services.push(record),
        }
        tracing::debug!("Registered health service {} (critical: {})", name, options.critical);
    }

    pub fn service_names(&self) -> Vec<String> {
        self.services
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .map(|s| s.name.clone())
            .collect()
    }

    /// Listener invoked after every `check_all`, whether or not anything changed
    pub fn on_health_change(&self, listener: HealthListener) -> ListenerId {
        let id = ListenerId(self.next_listener.fetch_add(1, Ordering::Relaxed));
        self.listeners
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .push((id, listener));
        id
    }

    /// Returns false if the listener was already removed
    pub fn remove_listener(&self, id: ListenerId) -> bool {
        let mut listeners = self.listeners.write().unwrap_or_else(PoisonError::into_inner);
        let before = listeners.len();
        listeners.retain(|(existing, _)| *existing != id);
        listeners.len() != before
    }

    /// Snapshot from the latest `check_all`, None before the first one
    pub fn last_health(&self) -> Option<Arc<AggregateHealth>> {
        self.last.load_full()
    }

    /// Probe every service concurrently and publish the aggregate
    pub async fn check_all(&self) -> AggregateHealth {
        let services: Vec<Arc<ServiceRecord>> = self
            .services
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone();

        let results = join_all(services.into_iter().map(|svc| self.probe(svc))).await;

        let health = AggregateHealth {
            overall: Self::aggregate(&results),
            services: results,
            checked_at: Utc::now(),
        };

        let previous = self.last.swap(Some(Arc::new(health.clone())));
        match previous {
            Some(prev) if prev.overall == health.overall => {}
            _ => tracing::info!("System health: {}", health.overall.as_str()),
        }

        let listeners: Vec<HealthListener> = self
            .listeners
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .map(|(_, listener)| Arc::clone(listener))
            .collect();
        for listener in listeners {
            listener(&health);
        }

        health
    }

    async fn probe(&self, svc: Arc<ServiceRecord>) -> ServiceHealth {
        let started = Instant::now();
        let outcome = tokio::time::timeout(svc.timeout, svc.checker.check()).await;
        let latency_ms = started.elapsed().as_millis() as u64;

        let (ok, message) = match outcome {
            Ok(result) => (result.ok, result.message),
            Err(_) => (false, Some(format!("timed out after {}ms", svc.timeout.as_millis()))),
        };

        let checks = svc.checks.fetch_add(1, Ordering::Relaxed) + 1;
        let failures = if ok {
            svc.failures.load(Ordering::Relaxed)
        } else {
            svc.failures.fetch_add(1, Ordering::Relaxed) + 1
        };

        let status = if !ok {
            tracing::warn!("Service {} down: {}", svc.name, message.as_deref().unwrap_or("probe failed"));
            HealthStatus::Down
        } else if latency_ms > self.config.latency_threshold.as_millis() as u64 {
            tracing::warn!("Service {} slow: {}ms", svc.name, latency_ms);
            HealthStatus::Degraded
        } else {
            HealthStatus::Healthy
        };

        ServiceHealth {
            name: svc.name.clone(),
            status,
            critical: svc.critical,
            latency_ms,
            message,
            error_rate: failures as f64 / checks as f64,
        }
    }

    /// Down if any critical service is down; degraded if anything is slow or
    /// a non-critical service is down; otherwise healthy.
    pub fn aggregate(services: &[ServiceHealth]) -> HealthStatus {
        if services.iter().any(|s| s.critical && s.status == HealthStatus::Down) {
            HealthStatus::Down
        } else if services.iter().any(|s| s.status != HealthStatus::Healthy) {
            HealthStatus::Degraded
        } else {
            HealthStatus::Healthy
        }
    }

    /// Run `check_all` on the configured interval until the handle is aborted
    pub fn spawn_periodic(self: Arc<Self>) -> JoinHandle<()> {
        let period = self.config.check_interval;
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(period);
            ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
            loop {
                ticker.tick().await;
                self.check_all().await;
            }
        })
    }
}
