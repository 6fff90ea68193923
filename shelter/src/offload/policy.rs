//! Offload task policies and configuration.

use std::time::Duration;

/// What to do with a task that runs longer than expected.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum TimeoutPolicy {
    /// Let the task run to completion.
    #[default]
    None,
    /// Abort the task after the duration.
    Cancel(Duration),
    /// Log a warning once the task finishes late, but let it run.
    Warn(Duration),
}

/// Configuration for the [`OffloadManager`](super::OffloadManager).
#[derive(Debug, Clone, Default)]
pub struct OffloadConfig {
    /// Timeout policy applied to every spawned task.
    pub timeout_policy: TimeoutPolicy,
}

impl OffloadConfig {
    /// Create a new builder for OffloadConfig.
    pub fn builder() -> OffloadConfigBuilder {
        OffloadConfigBuilder::default()
    }
}

/// Builder for [`OffloadConfig`].
#[derive(Debug, Clone, Default)]
pub struct OffloadConfigBuilder {
    timeout_policy: TimeoutPolicy,
}

impl OffloadConfigBuilder {
    /// Set timeout policy.
    pub fn timeout_policy(self, policy: TimeoutPolicy) -> Self {
        Self {
            timeout_policy: policy,
        }
    }

    /// Abort tasks running longer than `duration`.
    pub fn timeout(self, duration: Duration) -> Self {
        self.timeout_policy(TimeoutPolicy::Cancel(duration))
    }

    /// Warn about tasks running longer than `duration`.
    pub fn warn_after(self, duration: Duration) -> Self {
        self.timeout_policy(TimeoutPolicy::Warn(duration))
    }

    /// Build the OffloadConfig.
    pub fn build(self) -> OffloadConfig {
        OffloadConfig {
            timeout_policy: self.timeout_policy,
        }
    }
}
