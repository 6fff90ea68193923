//! ReqwestNetwork error mapping against wiremock.

use std::time::Duration;

use pretty_assertions::assert_eq;
use reqwest::Client;
use shelter_core::{InterceptedRequest, NetworkError, Upstream};
use shelter_reqwest::ReqwestNetwork;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

async fn network_for(server: &MockServer) -> ReqwestNetwork {
    let base = reqwest::Url::parse(&server.uri()).unwrap();
    ReqwestNetwork::new(Client::new(), base)
}

#[tokio::test]
async fn relative_request_resolves_against_base() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/manifest.json"))
        .respond_with(ResponseTemplate::new(200).set_body_string("{}"))
        .expect(1)
        .mount(&server)
        .await;
    let mut network = network_for(&server).await;

    let response = network
        .call(InterceptedRequest::get("/manifest.json").unwrap())
        .await
        .unwrap();

    assert_eq!(response.status().as_u16(), 200);
    assert_eq!(response.body().as_ref(), b"{}");
}

#[tokio::test]
async fn slow_response_is_a_timeout() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/slow"))
        .respond_with(ResponseTemplate::new(200).set_delay(Duration::from_secs(2)))
        .mount(&server)
        .await;
    let mut network = network_for(&server)
        .await
        .with_timeout(Duration::from_millis(100));

    let result = network
        .call(InterceptedRequest::get("/slow").unwrap())
        .await;

    assert!(matches!(
        result,
        Err(NetworkError::Timeout(limit)) if limit == Duration::from_millis(100)
    ));
}

