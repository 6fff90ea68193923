//! Scriptable network double.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::time::Duration;

use dashmap::DashMap;
use futures::future::BoxFuture;
use http::StatusCode;
use shelter::{CapturedResponse, InterceptedRequest, NetworkError, NetworkResult, Upstream};

#[derive(Clone)]
enum Reply {
    Respond(CapturedResponse),
    Fail,
}

#[derive(Default)]
struct State {
    replies: DashMap<String, Reply>,
    calls: DashMap<String, usize>,
    offline: AtomicBool,
    delay_ms: AtomicU64,
}

/// Answers by request target (`path?query`). Unknown targets get a `404`.
#[derive(Clone, Default)]
pub struct MockNetwork {
    state: Arc<State>,
}

impl MockNetwork {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn respond(&self, target: &str, status: u16, body: &str) {
        let status = StatusCode::from_u16(status).unwrap();
        self.state.replies.insert(
            target.to_owned(),
            Reply::Respond(CapturedResponse::text(status, body.to_owned())),
        );
    }

    /// Makes `target` fail with a connection error.
    pub fn fail(&self, target: &str) {
        self.state.replies.insert(target.to_owned(), Reply::Fail);
    }

    /// Makes every call fail with a connection error.
    pub fn set_offline(&self, offline: bool) {
        self.state.offline.store(offline, Ordering::SeqCst);
    }

    /// Delays every reply.
    pub fn set_delay(&self, delay: Duration) {
        self.state
            .delay_ms
            .store(delay.as_millis() as u64, Ordering::SeqCst);
    }

    pub fn calls(&self, target: &str) -> usize {
        self.state.calls.get(target).map(|n| *n).unwrap_or(0)
    }

    pub fn total_calls(&self) -> usize {
        self.state.calls.iter().map(|n| *n.value()).sum()
    }
}

impl Upstream<InterceptedRequest> for MockNetwork {
    type Response = NetworkResult;
    type Future = BoxFuture<'static, NetworkResult>;

    fn call(&mut self, req: InterceptedRequest) -> Self::Future {
        let target = req.key().target().to_owned();
        *self.state.calls.entry(target.clone()).or_insert(0) += 1;

        let reply = if self.state.offline.load(Ordering::SeqCst) {
            Reply::Fail
        } else {
            self.state
                .replies
                .get(&target)
                .map(|reply| reply.clone())
                .unwrap_or_else(|| {
                    Reply::Respond(CapturedResponse::text(StatusCode::NOT_FOUND, "not found"))
                })
        };
        let delay = Duration::from_millis(self.state.delay_ms.load(Ordering::SeqCst));

        Box::pin(async move {
            if !delay.is_zero() {
                tokio::time::sleep(delay).await;
            }
            match reply {
                Reply::Respond(response) => Ok(response),
                Reply::Fail => Err(NetworkError::connection(std::io::Error::other(format!(
                    "connection refused: {target}"
                )))),
            }
        })
    }
}
