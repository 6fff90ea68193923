//! Network boundary backed by a plain reqwest client.

use std::future::Future;
use std::pin::Pin;
use std::time::Duration;

use shelter_core::{CapturedResponse, InterceptedRequest, NetworkError, NetworkResult, Upstream};

/// Fetches intercepted requests with a [`reqwest::Client`].
///
/// Origin-relative requests are resolved against `base`. The client should
/// not carry the interception middleware itself.
///
/// Timeouts reported by reqwest surface as [`NetworkError::Timeout`]. Set the
/// limit with [`with_timeout`](Self::with_timeout) so the error carries it; a
/// limit configured on the client alone is reported as zero.
#[derive(Debug, Clone)]
pub struct ReqwestNetwork {
    client: reqwest::Client,
    base: reqwest::Url,
    timeout: Option<Duration>,
}

impl ReqwestNetwork {
    /// Creates a network resolving relative requests against `base`.
    pub fn new(client: reqwest::Client, base: reqwest::Url) -> Self {
        Self {
            client,
            base,
            timeout: None,
        }
    }

    /// Bounds every request sent through this network.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    fn resolve(&self, request: &InterceptedRequest) -> Result<reqwest::Url, NetworkError> {
        let uri = request.uri();
        let resolved = if uri.authority().is_some() {
            reqwest::Url::parse(&uri.to_string())
        } else {
            let target = uri.path_and_query().map_or("/", |pq| pq.as_str());
            self.base.join(target)
        };
        resolved.map_err(|e| NetworkError::InvalidRequest(e.to_string()))
    }
}

impl Upstream<InterceptedRequest> for ReqwestNetwork {
    type Response = NetworkResult;
    type Future = Pin<Box<dyn Future<Output = NetworkResult> + Send>>;

    fn call(&mut self, req: InterceptedRequest) -> Self::Future {
        let client = self.client.clone();
        let timeout = self.timeout;
        let url = self.resolve(&req);

        Box::pin(async move {
            let url = url?;
            let (method, _, headers) = req.into_parts();
            let mut request = client.request(method, url).headers(headers);
            if let Some(limit) = timeout {
                request = request.timeout(limit);
            }
            let response = request
                .send()
                .await
                .map_err(|e| network_error(e, timeout))?;

            let status = response.status();
            let headers = response.headers().clone();
            let body = response
                .bytes()
                .await
                .map_err(|e| network_error(e, timeout))?;
            Ok(CapturedResponse::new(status, headers, body))
        })
    }
}

fn network_error(error: reqwest::Error, timeout: Option<Duration>) -> NetworkError {
    if error.is_timeout() {
        NetworkError::Timeout(timeout.unwrap_or_default())
    } else {
        NetworkError::connection(error)
    }
}
