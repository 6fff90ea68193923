//! Offload trait for background task execution.

use std::future::Future;

use smol_str::SmolStr;

/// Trait for spawning background tasks.
///
/// Push and notification-click handling run through this trait so the
/// message path returns before the host finishes showing or opening anything.
///
/// Implementors should use `Arc` internally so that clones share state.
pub trait Offload: Send + Sync + Clone {
    /// Spawn a future to be executed in the background.
    ///
    /// `kind` labels the task for tracing and metrics.
    fn spawn<F>(&self, kind: impl Into<SmolStr>, future: F)
    where
        F: Future<Output = ()> + Send + 'static;
}
