//! Integration tests for ShelterMiddleware using wiremock.

use std::sync::Arc;
use std::time::Duration;

use pretty_assertions::assert_eq;
use reqwest::Client;
use reqwest_middleware::{ClientBuilder, ClientWithMiddleware};
use shelter::Origin;
use shelter_moka::MokaBackend;
use shelter_reqwest::{Registration, ReqwestNetwork, ShelterMiddleware, Worker, WorkerConfig};
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

const OFFLINE_PAGE: &str = "<html>offline</html>";

async fn mount_manifest(server: &MockServer) {
    for (route, body) in [
        ("/", "<html>home</html>"),
        ("/index.html", "<html>home</html>"),
        ("/offline.html", OFFLINE_PAGE),
        ("/manifest.json", r#"{"name":"app"}"#),
    ] {
        Mock::given(method("GET"))
            .and(path(route))
            .respond_with(ResponseTemplate::new(200).set_body_string(body))
            .expect(1)
            .mount(server)
            .await;
    }
}

async fn client_for(server: &MockServer) -> ClientWithMiddleware {
    let base = reqwest::Url::parse(&server.uri()).unwrap();
    let config = WorkerConfig::builder("v1")
        .origin(Origin::parse(&server.uri()).unwrap())
        .network_timeout(Duration::from_millis(200))
        .build()
        .unwrap();
    let backend = Arc::new(MokaBackend::builder().max_entries(100).build());
    let network = ReqwestNetwork::new(Client::new(), base);

    let registration = Registration::builder().build();
    registration
        .register(Worker::builder(config, backend, network).build().unwrap())
        .await
        .unwrap();

    ClientBuilder::new(Client::new())
        .with(ShelterMiddleware::new(registration))
        .build()
}

#[tokio::test]
async fn static_asset_miss_then_hit() {
    let server = MockServer::start().await;
    mount_manifest(&server).await;
    Mock::given(method("GET"))
        .and(path("/assets/app.js"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_string("console.log('app')")
                .insert_header("content-type", "application/javascript"),
        )
        .expect(1)
        .mount(&server)
        .await;
    let client = client_for(&server).await;
    let url = format!("{}/assets/app.js", server.uri());

    let first = client.get(&url).send().await.unwrap();
    assert_eq!(first.status(), 200);
    assert_eq!(first.headers().get("x-cache-status").unwrap(), "MISS");
    assert_eq!(first.text().await.unwrap(), "console.log('app')");

    let second = client.get(&url).send().await.unwrap();
    assert_eq!(second.status(), 200);
    assert_eq!(second.headers().get("x-cache-status").unwrap(), "HIT");
    assert_eq!(
        second.headers().get("content-type").unwrap(),
        "application/javascript"
    );
    assert_eq!(second.text().await.unwrap(), "console.log('app')");
}

#[tokio::test]
async fn api_serves_stored_copy_when_network_times_out() {
    let server = MockServer::start().await;
    mount_manifest(&server).await;
    Mock::given(method("GET"))
        .and(path("/api/materials"))
        .respond_with(ResponseTemplate::new(200).set_body_string(r#"["steel"]"#))
        .up_to_n_times(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/api/materials"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_string(r#"["late"]"#)
                .set_delay(Duration::from_secs(2)),
        )
        .mount(&server)
        .await;
    let client = client_for(&server).await;
    let url = format!("{}/api/materials", server.uri());

    let fresh = client.get(&url).send().await.unwrap();
    assert_eq!(fresh.headers().get("x-cache-status").unwrap(), "MISS");
    assert_eq!(fresh.text().await.unwrap(), r#"["steel"]"#);

    let stale = client.get(&url).send().await.unwrap();
    assert_eq!(stale.status(), 200);
    assert_eq!(stale.headers().get("x-cache-status").unwrap(), "STALE");
    assert_eq!(stale.text().await.unwrap(), r#"["steel"]"#);
}

#[tokio::test]
async fn navigation_gets_offline_page() {
    let server = MockServer::start().await;
    mount_manifest(&server).await;
    Mock::given(method("GET"))
        .and(path("/reports"))
        .respond_with(ResponseTemplate::new(200).set_delay(Duration::from_secs(2)))
        .mount(&server)
        .await;
    let client = client_for(&server).await;

    let response = client
        .get(format!("{}/reports", server.uri()))
        .header("sec-fetch-mode", "navigate")
        .send()
        .await
        .unwrap();

    assert_eq!(response.status(), 200);
    assert_eq!(response.headers().get("x-cache-status").unwrap(), "OFFLINE");
    assert_eq!(response.text().await.unwrap(), OFFLINE_PAGE);
}

#[tokio::test]
async fn subresource_gets_synthetic_offline_response() {
    let server = MockServer::start().await;
    mount_manifest(&server).await;
    Mock::given(method("GET"))
        .and(path("/api/slow"))
        .respond_with(ResponseTemplate::new(200).set_delay(Duration::from_secs(2)))
        .mount(&server)
        .await;
    let client = client_for(&server).await;

    let response = client
        .get(format!("{}/api/slow", server.uri()))
        .send()
        .await
        .unwrap();

    assert_eq!(response.status(), 408);
    assert_eq!(response.headers().get("x-cache-status").unwrap(), "OFFLINE");
    assert_eq!(response.text().await.unwrap(), "Network error happened");
}

#[tokio::test]
async fn other_origins_and_methods_pass_through() {
    let server = MockServer::start().await;
    mount_manifest(&server).await;
    Mock::given(method("POST"))
        .and(path("/api/orders"))
        .respond_with(ResponseTemplate::new(201))
        .expect(1)
        .mount(&server)
        .await;
    let client = client_for(&server).await;

    let other = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/lib.js"))
        .respond_with(ResponseTemplate::new(200).set_body_string("lib"))
        .expect(2)
        .mount(&other)
        .await;

    for _ in 0..2 {
        let response = client
            .get(format!("{}/lib.js", other.uri()))
            .send()
            .await
            .unwrap();
        assert_eq!(response.status(), 200);
        assert!(response.headers().get("x-cache-status").is_none());
    }

    let created = client
        .post(format!("{}/api/orders", server.uri()))
        .send()
        .await
        .unwrap();
    assert_eq!(created.status(), 201);
    assert!(created.headers().get("x-cache-status").is_none());
}
