//! Host-side driver for worker versions.
//!
//! A [`Registration`] plays the part of the host platform: it installs new
//! workers, decides when a waiting worker may take over, routes intercepted
//! requests to the active worker and dispatches control messages and push
//! events. Phase transitions (install, promotion) are serialized; fetches
//! never wait on them and keep going to the currently active worker.
//!
//! ```ignore
//! let registration = Registration::builder().build();
//! registration.register(worker_v1).await?;
//!
//! match registration.fetch(request).await {
//!     FetchOutcome::Respond(response, ctx) => { /* served */ }
//!     FetchOutcome::Passthrough(request) => { /* send it yourself */ }
//! }
//! ```

use std::marker::PhantomData;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use shelter_backend::Backend;
use shelter_core::{InterceptedRequest, Network};
use tokio::sync::{Mutex, RwLock};
use tracing::{debug, info, warn};

use crate::control::{ControlMessage, ControlOutcome, Notification, PushPayload};
use crate::error::{ActivateError, ControlError, RegisterError};
use crate::host::{Clients, Notifier, TracingClients, TracingNotifier};
use crate::offload::OffloadManager;
use crate::worker::{FetchOutcome, Worker};

type SharedWorker<B, N> = Arc<Worker<B, N>>;

struct Slots<B: ?Sized, N> {
    installing: Option<SharedWorker<B, N>>,
    waiting: Option<SharedWorker<B, N>>,
    active: Option<SharedWorker<B, N>>,
}

struct Inner<B: ?Sized, N> {
    slots: RwLock<Slots<B, N>>,
    phase: Mutex<()>,
    clients: AtomicUsize,
    offload: OffloadManager,
    notifier: Arc<dyn Notifier>,
    windows: Arc<dyn Clients>,
}

/// Owns the installing, waiting and active workers of one application.
pub struct Registration<B: ?Sized, N> {
    inner: Arc<Inner<B, N>>,
}

impl<B: ?Sized, N> Clone for Registration<B, N> {
    fn clone(&self) -> Self {
        Self {
            inner: self.inner.clone(),
        }
    }
}

impl<B: ?Sized, N> Registration<B, N> {
    /// Starts building a registration.
    pub fn builder() -> RegistrationBuilder<B, N> {
        RegistrationBuilder {
            notifier: Arc::new(TracingNotifier),
            clients: Arc::new(TracingClients),
            offload: OffloadManager::default(),
            _types: PhantomData,
        }
    }

    /// Background tasks spawned for push and notification events.
    pub fn offload(&self) -> &OffloadManager {
        &self.inner.offload
    }

    /// Number of connected clients.
    pub fn client_count(&self) -> usize {
        self.inner.clients.load(Ordering::Acquire)
    }
}

impl<B, N> Registration<B, N>
where
    B: Backend + ?Sized + 'static,
    N: Network,
{
    /// Worker currently serving fetches.
    pub async fn active(&self) -> Option<SharedWorker<B, N>> {
        self.inner.slots.read().await.active.clone()
    }

    /// Installed worker waiting to take over.
    pub async fn waiting(&self) -> Option<SharedWorker<B, N>> {
        self.inner.slots.read().await.waiting.clone()
    }

    /// Worker currently precaching.
    pub async fn installing(&self) -> Option<SharedWorker<B, N>> {
        self.inner.slots.read().await.installing.clone()
    }

    /// Installs `worker` and promotes it if nothing holds it back.
    ///
    /// Registering the generation that is already active is a no-op. A
    /// previously waiting worker is replaced. On failure the active worker
    /// keeps serving.
    pub async fn register(
        &self,
        worker: Worker<B, N>,
    ) -> Result<SharedWorker<B, N>, RegisterError> {
        let _phase = self.inner.phase.lock().await;

        {
            let slots = self.inner.slots.read().await;
            let current = [&slots.active, &slots.waiting]
                .into_iter()
                .flatten()
                .find(|current| current.generation() == worker.generation());
            if let Some(current) = current {
                debug!(generation = %worker.generation(), "generation already registered");
                return Ok(current.clone());
            }
        }

        let worker = Arc::new(worker);
        self.inner.slots.write().await.installing = Some(worker.clone());
        let installed = worker.install().await;
        {
            let mut slots = self.inner.slots.write().await;
            slots.installing = None;
            installed?;
            if let Some(previous) = slots.waiting.replace(worker.clone()) {
                if let Err(error) = previous.mark_redundant() {
                    warn!(generation = %previous.generation(), %error, "failed to retire waiting worker");
                }
            }
        }

        self.promote_locked().await?;
        Ok(worker)
    }

    /// Promotes the waiting worker when there is no active worker, no
    /// connected client, or skip-waiting was requested.
    ///
    /// Must be called with the phase lock held.
    async fn promote_locked(&self) -> Result<bool, ActivateError> {
        let (next, previous) = {
            let slots = self.inner.slots.read().await;
            let Some(next) = slots.waiting.clone() else {
                return Ok(false);
            };
            let ready = slots.active.is_none()
                || self.client_count() == 0
                || next.skip_waiting_requested();
            if !ready {
                debug!(
                    generation = %next.generation(),
                    clients = self.client_count(),
                    "waiting for clients to disconnect"
                );
                return Ok(false);
            }
            (next, slots.active.clone())
        };

        if let Some(previous) = &previous {
            previous.suspend_writes();
        }
        if let Err(error) = next.activate().await {
            if let Some(previous) = &previous {
                previous.resume_writes();
            }
            self.inner.slots.write().await.waiting = None;
            return Err(error);
        }
        if let Some(previous) = &previous {
            if let Err(error) = previous.mark_redundant() {
                warn!(generation = %previous.generation(), %error, "failed to retire active worker");
            }
        }
        if let Err(error) = self.inner.windows.claim().await {
            warn!(%error, "failed to claim clients");
        }
        next.complete_activation()?;

        let mut slots = self.inner.slots.write().await;
        slots.waiting = None;
        slots.active = Some(next.clone());
        info!(generation = %next.generation(), "worker promoted");
        Ok(true)
    }

    /// Routes a request to the active worker.
    ///
    /// Without an active worker every request passes through.
    pub async fn fetch(&self, request: InterceptedRequest) -> FetchOutcome {
        match self.active().await {
            Some(worker) => worker.handle_fetch(request).await,
            None => FetchOutcome::Passthrough(request),
        }
    }

    /// Records a newly connected client.
    pub fn connect_client(&self) {
        self.inner.clients.fetch_add(1, Ordering::AcqRel);
    }

    /// Records a disconnected client, promoting the waiting worker once the
    /// last one is gone.
    pub async fn disconnect_client(&self) -> Result<bool, ActivateError> {
        let previous = self
            .inner
            .clients
            .fetch_update(Ordering::AcqRel, Ordering::Acquire, |n| n.checked_sub(1));
        if previous != Ok(1) {
            return Ok(false);
        }
        let _phase = self.inner.phase.lock().await;
        self.promote_locked().await
    }

    /// Promotes the waiting worker without waiting for clients to leave.
    ///
    /// A worker still installing is flagged and promoted once installed.
    pub async fn skip_waiting(&self) -> Result<bool, ActivateError> {
        {
            let slots = self.inner.slots.read().await;
            let pending = [&slots.installing, &slots.waiting].into_iter().flatten();
            for worker in pending {
                worker.request_skip_waiting();
            }
        }
        let _phase = self.inner.phase.lock().await;
        self.promote_locked().await
    }

    /// Handles a control message.
    pub async fn post_message(
        &self,
        message: ControlMessage,
    ) -> Result<ControlOutcome, ControlError> {
        match message {
            ControlMessage::SkipWaiting => Ok(ControlOutcome::SkipWaiting {
                promoted: self.skip_waiting().await?,
            }),
            ControlMessage::CacheUrls { urls } => {
                let worker = self.active().await.ok_or(ControlError::NoWorker("active"))?;
                Ok(ControlOutcome::Cached(worker.cache_urls(&urls).await))
            }
        }
    }

    /// Parses and handles a JSON control message. Unknown types are ignored.
    pub async fn post_message_json(&self, json: &str) -> Result<ControlOutcome, ControlError> {
        match ControlMessage::from_json(json) {
            Ok(message) => self.post_message(message).await,
            Err(ControlError::UnknownType(kind)) => {
                debug!(%kind, "ignoring control message");
                Ok(ControlOutcome::Ignored)
            }
            Err(error) => Err(error),
        }
    }

    /// Shows a notification for a push message in the background.
    ///
    /// Display failures are logged and never reported back.
    pub async fn push(&self, payload: PushPayload) -> Result<Notification, ControlError> {
        let worker = self.active().await.ok_or(ControlError::NoWorker("active"))?;
        let notification = Notification::from_push(&payload, &worker.config().notification);

        let notifier = self.inner.notifier.clone();
        let shown = notification.clone();
        self.inner.offload.spawn("push_notification", async move {
            if let Err(error) = notifier.show(&shown).await {
                warn!(title = %shown.title, %error, "failed to show notification");
            }
        });
        Ok(notification)
    }

    /// Closes `notification` and opens its target URL in the background.
    pub fn notification_click(&self, notification: Notification) {
        let notifier = self.inner.notifier.clone();
        let windows = self.inner.windows.clone();
        self.inner.offload.spawn("notification_click", async move {
            if let Err(error) = notifier.close(&notification).await {
                warn!(title = %notification.title, %error, "failed to close notification");
            }
            if let Err(error) = windows.open_window(&notification.open_url).await {
                warn!(url = %notification.open_url, %error, "failed to open window");
            }
        });
    }
}

/// Builder for [`Registration`].
pub struct RegistrationBuilder<B: ?Sized, N> {
    notifier: Arc<dyn Notifier>,
    clients: Arc<dyn Clients>,
    offload: OffloadManager,
    _types: PhantomData<fn() -> (Arc<B>, N)>,
}

impl<B: ?Sized, N> RegistrationBuilder<B, N> {
    /// Sets the notification host.
    pub fn notifier(mut self, notifier: impl Notifier + 'static) -> Self {
        self.notifier = Arc::new(notifier);
        self
    }

    /// Sets the client window host.
    pub fn clients(mut self, clients: impl Clients + 'static) -> Self {
        self.clients = Arc::new(clients);
        self
    }

    /// Sets the background task manager.
    pub fn offload(mut self, offload: OffloadManager) -> Self {
        self.offload = offload;
        self
    }

    /// Builds the registration with no workers and no clients.
    pub fn build(self) -> Registration<B, N> {
        Registration {
            inner: Arc::new(Inner {
                slots: RwLock::new(Slots {
                    installing: None,
                    waiting: None,
                    active: None,
                }),
                phase: Mutex::new(()),
                clients: AtomicUsize::new(0),
                offload: self.offload,
                notifier: self.notifier,
                windows: self.clients,
            }),
        }
    }
}
