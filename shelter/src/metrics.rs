//! Metrics declaration and recording helpers.
//!
//! Every helper compiles to nothing when the `metrics` feature is off.

use std::time::Duration;

use shelter_core::CacheContext;

#[cfg(feature = "metrics")]
use lazy_static::lazy_static;

#[cfg(feature = "metrics")]
lazy_static! {
    /// Track number of store hits.
    pub static ref CACHE_HIT_COUNTER: &'static str = {
        metrics::describe_counter!(
            "shelter_cache_hit_total",
            "Total number of requests served from the store."
        );
        "shelter_cache_hit_total"
    };
    /// Track number of store misses.
    pub static ref CACHE_MISS_COUNTER: &'static str = {
        metrics::describe_counter!(
            "shelter_cache_miss_total",
            "Total number of requests served from the network."
        );
        "shelter_cache_miss_total"
    };
    /// Track number of stale reads after a network failure.
    pub static ref CACHE_STALE_COUNTER: &'static str = {
        metrics::describe_counter!(
            "shelter_cache_stale_total",
            "Total number of stored responses served because the network failed."
        );
        "shelter_cache_stale_total"
    };
    /// Track number of offline fallbacks.
    pub static ref CACHE_OFFLINE_COUNTER: &'static str = {
        metrics::describe_counter!(
            "shelter_cache_offline_total",
            "Total number of offline fallback responses."
        );
        "shelter_cache_offline_total"
    };
    /// Histogram of fetch handling duration.
    pub static ref FETCH_DURATION: &'static str = {
        metrics::describe_histogram!(
            "shelter_fetch_duration_seconds",
            metrics::Unit::Seconds,
            "Duration of intercepted fetch handling in seconds."
        );
        "shelter_fetch_duration_seconds"
    };
    /// Track network failures.
    pub static ref NETWORK_FAILURES: &'static str = {
        metrics::describe_counter!(
            "shelter_network_failures_total",
            "Total number of network fetches that produced no response."
        );
        "shelter_network_failures_total"
    };
    /// Track store write failures.
    pub static ref STORE_WRITE_ERRORS: &'static str = {
        metrics::describe_counter!(
            "shelter_store_write_errors_total",
            "Total number of failed store writes."
        );
        "shelter_store_write_errors_total"
    };
    /// Track deleted generations.
    pub static ref GENERATIONS_DELETED: &'static str = {
        metrics::describe_counter!(
            "shelter_generations_deleted_total",
            "Total number of cache generations removed during activation."
        );
        "shelter_generations_deleted_total"
    };
    /// Track number of offload tasks spawned.
    pub static ref OFFLOAD_TASKS_SPAWNED: &'static str = {
        metrics::describe_counter!(
            "shelter_offload_tasks_spawned_total",
            "Total number of offload tasks spawned."
        );
        "shelter_offload_tasks_spawned_total"
    };
    /// Track number of offload tasks completed.
    pub static ref OFFLOAD_TASKS_COMPLETED: &'static str = {
        metrics::describe_counter!(
            "shelter_offload_tasks_completed_total",
            "Total number of offload tasks completed."
        );
        "shelter_offload_tasks_completed_total"
    };
    /// Track number of offload tasks cancelled by timeout.
    pub static ref OFFLOAD_TASKS_TIMEOUT: &'static str = {
        metrics::describe_counter!(
            "shelter_offload_tasks_timeout_total",
            "Total number of offload tasks cancelled by timeout."
        );
        "shelter_offload_tasks_timeout_total"
    };
    /// Gauge of running offload tasks.
    pub static ref OFFLOAD_TASKS_ACTIVE: &'static str = {
        metrics::describe_gauge!(
            "shelter_offload_tasks_active",
            "Number of currently running offload tasks."
        );
        "shelter_offload_tasks_active"
    };
    /// Histogram of offload task duration.
    pub static ref OFFLOAD_TASK_DURATION: &'static str = {
        metrics::describe_histogram!(
            "shelter_offload_task_duration_seconds",
            metrics::Unit::Seconds,
            "Duration of offload tasks in seconds."
        );
        "shelter_offload_task_duration_seconds"
    };
}

/// Records the outcome of one intercepted fetch.
#[cfg(feature = "metrics")]
#[inline]
pub fn record_context(ctx: &CacheContext, duration: Duration) {
    use shelter_core::CacheStatus;

    let strategy = ctx.strategy.map(|s| s.as_str()).unwrap_or("none");
    let status = ctx.status.as_str();

    metrics::histogram!(*FETCH_DURATION, "status" => status, "strategy" => strategy)
        .record(duration.as_secs_f64());

    let counter = match ctx.status {
        CacheStatus::Hit => *CACHE_HIT_COUNTER,
        CacheStatus::Miss => *CACHE_MISS_COUNTER,
        CacheStatus::Stale => *CACHE_STALE_COUNTER,
        CacheStatus::Offline => *CACHE_OFFLINE_COUNTER,
    };
    metrics::counter!(counter, "strategy" => strategy).increment(1);
}

/// No-op version when metrics feature is disabled.
#[cfg(not(feature = "metrics"))]
#[inline]
pub fn record_context(_ctx: &CacheContext, _duration: Duration) {}

/// Records a network call that produced no response.
#[cfg(feature = "metrics")]
#[inline]
pub fn record_network_failure() {
    metrics::counter!(*NETWORK_FAILURES).increment(1);
}

/// No-op version when metrics feature is disabled.
#[cfg(not(feature = "metrics"))]
#[inline]
pub fn record_network_failure() {}

/// Records a failed store write.
#[cfg(feature = "metrics")]
#[inline]
pub fn record_store_write_error(backend: &str) {
    metrics::counter!(*STORE_WRITE_ERRORS, "backend" => backend.to_owned()).increment(1);
}

/// No-op version when metrics feature is disabled.
#[cfg(not(feature = "metrics"))]
#[inline]
pub fn record_store_write_error(_backend: &str) {}

/// Records generations removed by activation cleanup.
#[cfg(feature = "metrics")]
#[inline]
pub fn record_generations_deleted(count: usize) {
    metrics::counter!(*GENERATIONS_DELETED).increment(count as u64);
}

/// No-op version when metrics feature is disabled.
#[cfg(not(feature = "metrics"))]
#[inline]
pub fn record_generations_deleted(_count: usize) {}

/// Records a spawned offload task.
#[cfg(feature = "metrics")]
#[inline]
pub fn record_offload_spawned(kind: &str) {
    metrics::counter!(*OFFLOAD_TASKS_SPAWNED, "kind" => kind.to_owned()).increment(1);
    metrics::gauge!(*OFFLOAD_TASKS_ACTIVE, "kind" => kind.to_owned()).increment(1.0);
}

/// No-op version when metrics feature is disabled.
#[cfg(not(feature = "metrics"))]
#[inline]
pub fn record_offload_spawned(_kind: &str) {}

/// Records a finished or cancelled offload task.
#[cfg(feature = "metrics")]
#[inline]
pub fn record_offload_finished(kind: &str, duration: Duration, timed_out: bool) {
    let counter = if timed_out {
        *OFFLOAD_TASKS_TIMEOUT
    } else {
        *OFFLOAD_TASKS_COMPLETED
    };
    metrics::counter!(counter, "kind" => kind.to_owned()).increment(1);
    metrics::gauge!(*OFFLOAD_TASKS_ACTIVE, "kind" => kind.to_owned()).decrement(1.0);
    metrics::histogram!(*OFFLOAD_TASK_DURATION, "kind" => kind.to_owned())
        .record(duration.as_secs_f64());
}

/// No-op version when metrics feature is disabled.
#[cfg(not(feature = "metrics"))]
#[inline]
pub fn record_offload_finished(_kind: &str, _duration: Duration, _timed_out: bool) {}
