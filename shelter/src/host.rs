//! Host integrations used by the control channel.
//!
//! The intermediary never shows UI itself. Notification display and client
//! window management are delegated to the embedding host through
//! [`Notifier`] and [`Clients`]. The tracing implementations only log, which
//! is what a headless host wants.

use async_trait::async_trait;
use tracing::info;

use crate::control::Notification;
use crate::error::HostError;

/// Displays and dismisses notifications.
#[async_trait]
pub trait Notifier: Send + Sync {
    /// Shows `notification`.
    async fn show(&self, notification: &Notification) -> Result<(), HostError>;

    /// Dismisses `notification`.
    async fn close(&self, notification: &Notification) -> Result<(), HostError>;
}

/// Manages the client windows controlled by the intermediary.
#[async_trait]
pub trait Clients: Send + Sync {
    /// Opens or focuses a window at `url`.
    async fn open_window(&self, url: &str) -> Result<(), HostError>;

    /// Takes control of every connected client.
    async fn claim(&self) -> Result<(), HostError>;
}

/// Logs notifications instead of showing them.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingNotifier;

#[async_trait]
impl Notifier for TracingNotifier {
    async fn show(&self, notification: &Notification) -> Result<(), HostError> {
        info!(title = %notification.title, body = %notification.body, "notification shown");
        Ok(())
    }

    async fn close(&self, notification: &Notification) -> Result<(), HostError> {
        info!(title = %notification.title, "notification closed");
        Ok(())
    }
}

/// Logs client management requests.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingClients;

#[async_trait]
impl Clients for TracingClients {
    async fn open_window(&self, url: &str) -> Result<(), HostError> {
        info!(url, "open window");
        Ok(())
    }

    async fn claim(&self) -> Result<(), HostError> {
        info!("clients claimed");
        Ok(())
    }
}
