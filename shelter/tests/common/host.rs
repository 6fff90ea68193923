//! Host doubles recording what the intermediary asked for.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use shelter::HostError;
use shelter::Notification;
use shelter::host::{Clients, Notifier};
use tokio::sync::Notify;

#[derive(Clone, Default)]
pub struct RecordingNotifier {
    pub shown: Arc<Mutex<Vec<Notification>>>,
    pub closed: Arc<Mutex<Vec<Notification>>>,
}

#[async_trait]
impl Notifier for RecordingNotifier {
    async fn show(&self, notification: &Notification) -> Result<(), HostError> {
        self.shown.lock().unwrap().push(notification.clone());
        Ok(())
    }

    async fn close(&self, notification: &Notification) -> Result<(), HostError> {
        self.closed.lock().unwrap().push(notification.clone());
        Ok(())
    }
}

#[derive(Clone, Copy, Default)]
pub struct FailingNotifier;

#[async_trait]
impl Notifier for FailingNotifier {
    async fn show(&self, _notification: &Notification) -> Result<(), HostError> {
        Err(HostError::msg("notifications are blocked"))
    }

    async fn close(&self, _notification: &Notification) -> Result<(), HostError> {
        Err(HostError::msg("notifications are blocked"))
    }
}

#[derive(Clone, Default)]
pub struct RecordingClients {
    pub opened: Arc<Mutex<Vec<String>>>,
    pub claims: Arc<Mutex<usize>>,
}

#[async_trait]
impl Clients for RecordingClients {
    async fn open_window(&self, url: &str) -> Result<(), HostError> {
        self.opened.lock().unwrap().push(url.to_owned());
        Ok(())
    }

    async fn claim(&self) -> Result<(), HostError> {
        *self.claims.lock().unwrap() += 1;
        Ok(())
    }
}

/// Claims hang once armed until `release` is notified.
#[derive(Clone, Default)]
pub struct GatedClients {
    pub armed: Arc<AtomicBool>,
    pub entered: Arc<Notify>,
    pub release: Arc<Notify>,
}

#[async_trait]
impl Clients for GatedClients {
    async fn open_window(&self, _url: &str) -> Result<(), HostError> {
        Ok(())
    }

    async fn claim(&self) -> Result<(), HostError> {
        if self.armed.load(Ordering::Acquire) {
            self.entered.notify_one();
            self.release.notified().await;
        }
        Ok(())
    }
}
