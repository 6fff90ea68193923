#![allow(dead_code)]

pub mod backend;
pub mod host;
pub mod network;

use std::sync::Arc;

use shelter::{Worker, WorkerConfig};
use shelter_moka::MokaBackend;

pub use backend::CountingBackend;
pub use host::{FailingNotifier, GatedClients, RecordingClients, RecordingNotifier};
pub use network::MockNetwork;

pub const OFFLINE_PAGE: &str = "<html><body>You are offline</body></html>";

pub type TestWorker = Worker<CountingBackend, MockNetwork>;

/// Configuration with the `app` prefix and the default manifest.
pub fn config(version: &str) -> WorkerConfig {
    WorkerConfig::builder(version)
        .cache_prefix("app")
        .build()
        .unwrap()
}

/// Network answering every default manifest path.
pub fn site() -> MockNetwork {
    let network = MockNetwork::new();
    network.respond("/", 200, "<html>home</html>");
    network.respond("/index.html", 200, "<html>home</html>");
    network.respond("/offline.html", 200, OFFLINE_PAGE);
    network.respond("/manifest.json", 200, r#"{"name":"app"}"#);
    network
}

pub fn store() -> Arc<CountingBackend> {
    Arc::new(CountingBackend::new(
        MokaBackend::builder().max_entries(1_000).build(),
    ))
}

pub fn worker(config: WorkerConfig, backend: &Arc<CountingBackend>, network: &MockNetwork) -> TestWorker {
    Worker::builder(config, backend.clone(), network.clone())
        .build()
        .unwrap()
}

pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}
