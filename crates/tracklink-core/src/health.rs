// ── Connection health ──
//
// Combines the local session check, one live vendor probe, and a device
// count sample into a `HealthStatus`. Results are cached for a short TTL
// so UI polling does not turn into vendor load.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use arc_swap::ArcSwapOption;
use tracing::{debug, warn};

use crate::clock::Clock;
use crate::config::{TrackerConfig, chrono_duration};
use crate::model::HealthStatus;
use crate::session::SessionManager;
use crate::sync::SyncService;

/// On-demand, cached health evaluation.
#[derive(Debug)]
pub struct HealthMonitor {
    session: Arc<SessionManager>,
    sync: Arc<SyncService>,
    clock: Arc<dyn Clock>,
    ttl: chrono::Duration,
    cache: ArcSwapOption<HealthStatus>,
    /// One refresher at a time; readers of a fresh cache never wait.
    refresh: tokio::sync::Mutex<()>,
    /// Bumped on invalidation so an in-flight refresh cannot repopulate
    /// the cache with a pre-invalidation result.
    generation: AtomicU64,
}

impl HealthMonitor {
    pub fn new(
        session: Arc<SessionManager>,
        sync: Arc<SyncService>,
        clock: Arc<dyn Clock>,
        config: &TrackerConfig,
    ) -> Self {
        Self {
            session,
            sync,
            clock,
            ttl: chrono_duration(config.health_ttl),
            cache: ArcSwapOption::empty(),
            refresh: tokio::sync::Mutex::new(()),
            generation: AtomicU64::new(0),
        }
    }

    /// Current health. Never fails: every failing step degrades the
    /// status and adds a reason to `error_message`.
    ///
    /// Within the TTL the cached value is returned unchanged, including
    /// its original `computed_at`.
    pub async fn get_connection_health(&self) -> HealthStatus {
        if let Some(cached) = self.fresh_cached() {
            return cached;
        }

        let _refreshing = self.refresh.lock().await;
        // Another caller may have refreshed while we waited.
        if let Some(cached) = self.fresh_cached() {
            return cached;
        }

        let generation = self.generation.load(Ordering::SeqCst);
        let status = self.compute().await;
        if self.generation.load(Ordering::SeqCst) == generation {
            self.cache.store(Some(Arc::new(status.clone())));
        } else {
            debug!("health cache invalidated during refresh, result not cached");
        }
        status
    }

    /// Drop the cached status so the next call recomputes.
    pub fn clear_health_cache(&self) {
        self.generation.fetch_add(1, Ordering::SeqCst);
        self.cache.store(None);
        debug!("health cache cleared");
    }

    fn fresh_cached(&self) -> Option<HealthStatus> {
        let cached = self.cache.load_full()?;
        let age = self.clock.now() - cached.computed_at;
        if age >= chrono::Duration::zero() && age < self.ttl {
            Some(HealthStatus::clone(&cached))
        } else {
            None
        }
    }

    async fn compute(&self) -> HealthStatus {
        let check = self.session.check();
        let mut reasons = check.reasons;

        let mut is_connected = false;
        let mut response_time_ms = None;
        let mut active_device_count = None;

        if check.token_valid && check.session_valid {
            match self.sync.probe().await {
                Ok(sample) => {
                    is_connected = true;
                    response_time_ms =
                        Some(u64::try_from(sample.response_time.as_millis()).unwrap_or(u64::MAX));
                    active_device_count = Some(sample.online_count);
                }
                Err(e) => reasons.push(format!("vendor probe failed: {e}")),
            }
        }

        let active_device_count = match active_device_count {
            Some(n) => n,
            None => match self.sync.stored_active_device_count().await {
                Ok(n) => n,
                Err(e) => {
                    reasons.push(format!("device count unavailable: {e}"));
                    0
                }
            },
        };

        let is_healthy = is_connected && check.token_valid && check.session_valid;
        let error_message = (!reasons.is_empty()).then(|| reasons.join("; "));
        if let Some(message) = &error_message {
            warn!(%message, "vendor integration degraded");
        }

        HealthStatus {
            is_healthy,
            is_connected,
            token_valid: check.token_valid,
            session_valid: check.session_valid,
            active_device_count,
            response_time_ms,
            error_message,
            computed_at: self.clock.now(),
        }
    }
}
