mod common;

use std::sync::Arc;

use bytes::Bytes;
use common::{ErrorBackend, TestBackend};
use http::StatusCode;
use pretty_assertions::assert_eq;
use shelter_backend::{
    Backend, BackendError, BincodeFormat, CacheBackend, CacheEntry, DeleteStatus, Format,
};
use shelter_core::{CapturedResponse, GenerationName, RequestKey};

fn entry(body: &'static str) -> CacheEntry {
    CacheEntry::new(CapturedResponse::ok(body))
}

#[tokio::test]
async fn put_then_get_returns_entry() {
    let backend = TestBackend::new();
    let generation = GenerationName::new("app", "v1");
    let key = RequestKey::get("/assets/app.js");

    backend.put(&generation, &key, &entry("js")).await.unwrap();

    let stored = backend.get(&generation, &key).await.unwrap().unwrap();
    assert_eq!(stored.response.body(), &Bytes::from_static(b"js"));
    assert_eq!(stored.response.status(), StatusCode::OK);
}

#[tokio::test]
async fn put_overwrites_previous_entry() {
    let backend = TestBackend::new();
    let generation = GenerationName::new("app", "v1");
    let key = RequestKey::get("/api/materials");

    backend.put(&generation, &key, &entry("old")).await.unwrap();
    backend.put(&generation, &key, &entry("new")).await.unwrap();

    let stored = backend.get(&generation, &key).await.unwrap().unwrap();
    assert_eq!(stored.response.body(), &Bytes::from_static(b"new"));
    assert_eq!(backend.len(&generation), Some(1));
}

#[tokio::test]
async fn generations_are_isolated() {
    let backend = TestBackend::new();
    let v1 = GenerationName::new("app", "v1");
    let v2 = GenerationName::new("app", "v2");
    let key = RequestKey::get("/index.html");

    backend.put(&v1, &key, &entry("v1 shell")).await.unwrap();

    assert!(backend.get(&v2, &key).await.unwrap().is_none());
}

#[tokio::test]
async fn open_is_idempotent() {
    let backend = TestBackend::new();
    let generation = GenerationName::new("app", "v1");

    backend.open(&generation).await.unwrap();
    backend.open(&generation).await.unwrap();

    assert_eq!(backend.generations().await.unwrap(), vec![generation]);
}

#[tokio::test]
async fn match_any_searches_in_creation_order() {
    let backend = TestBackend::new();
    let v1 = GenerationName::new("app", "v1");
    let v2 = GenerationName::new("app", "v2");
    let key = RequestKey::get("/offline.html");

    backend.open(&v1).await.unwrap();
    backend.put(&v2, &key, &entry("v2 offline")).await.unwrap();
    backend.put(&v1, &key, &entry("v1 offline")).await.unwrap();

    let (generation, found) = backend.match_any(&key).await.unwrap().unwrap();
    assert_eq!(generation, v1);
    assert_eq!(found.response.body(), &Bytes::from_static(b"v1 offline"));

    assert!(
        backend
            .match_any(&RequestKey::get("/missing"))
            .await
            .unwrap()
            .is_none()
    );
}

#[tokio::test]
async fn match_any_skips_unreadable_entries() {
    let backend = TestBackend::new();
    let v1 = GenerationName::new("app", "v1");
    let v2 = GenerationName::new("app", "v2");
    let key = RequestKey::get("/offline.html");

    backend
        .write(&v1, &key, Bytes::from_static(b"corrupted"))
        .await
        .unwrap();
    backend.put(&v2, &key, &entry("offline")).await.unwrap();

    let (generation, _) = backend.match_any(&key).await.unwrap().unwrap();
    assert_eq!(generation, v2);
}

#[tokio::test]
async fn delete_generations_except_keeps_only_current() {
    let backend = TestBackend::new();
    let v1 = GenerationName::new("app", "v1");
    let v2 = GenerationName::new("app", "v2");
    let foreign = GenerationName::from_raw("other-cache");

    backend.put(&v1, &RequestKey::get("/"), &entry("a")).await.unwrap();
    backend.open(&foreign).await.unwrap();
    backend.open(&v2).await.unwrap();

    let deleted = backend.delete_generations_except(&v2).await.unwrap();

    assert_eq!(deleted, vec![v1, foreign]);
    assert_eq!(backend.generations().await.unwrap(), vec![v2]);
}

#[tokio::test]
async fn delete_missing_generation() {
    let backend = TestBackend::new();
    let status = backend
        .delete_generation(&GenerationName::new("app", "v9"))
        .await
        .unwrap();
    assert_eq!(status, DeleteStatus::Missing);
}

#[tokio::test]
async fn errors_propagate_through_trait_objects() {
    let backend: Arc<dyn Backend + Send + 'static> = Arc::new(ErrorBackend);
    let generation = GenerationName::new("app", "v1");
    let key = RequestKey::get("/");

    let write = backend.put(&generation, &key, &entry("x")).await;
    assert!(matches!(write, Err(BackendError::QuotaExceeded)));
    assert!(backend.get(&generation, &key).await.is_err());
    assert!(backend.match_any(&key).await.is_err());
}

#[tokio::test]
async fn custom_value_format() {
    struct BincodeBackend(TestBackend);

    #[async_trait::async_trait]
    impl Backend for BincodeBackend {
        async fn open(&self, g: &GenerationName) -> shelter_backend::BackendResult<()> {
            self.0.open(g).await
        }
        async fn read(
            &self,
            g: &GenerationName,
            k: &RequestKey,
        ) -> shelter_backend::BackendResult<Option<shelter_core::Raw>> {
            self.0.read(g, k).await
        }
        async fn write(
            &self,
            g: &GenerationName,
            k: &RequestKey,
            v: shelter_core::Raw,
        ) -> shelter_backend::BackendResult<()> {
            self.0.write(g, k, v).await
        }
        async fn generations(&self) -> shelter_backend::BackendResult<Vec<GenerationName>> {
            self.0.generations().await
        }
        async fn delete_generation(
            &self,
            g: &GenerationName,
        ) -> shelter_backend::BackendResult<DeleteStatus> {
            self.0.delete_generation(g).await
        }
        fn value_format(&self) -> &dyn Format {
            &BincodeFormat
        }
    }

    let inner = TestBackend::new();
    let backend = BincodeBackend(inner.clone());
    let generation = GenerationName::new("app", "v1");
    let key = RequestKey::get("/vite.svg");

    backend.put(&generation, &key, &entry("<svg/>")).await.unwrap();

    let raw = inner.read(&generation, &key).await.unwrap().unwrap();
    assert!(serde_json_is_invalid(&raw));
    let stored = backend.get(&generation, &key).await.unwrap().unwrap();
    assert_eq!(stored.response.body(), &Bytes::from_static(b"<svg/>"));
}

fn serde_json_is_invalid(raw: &[u8]) -> bool {
    shelter_backend::JsonFormat.deserialize(raw).is_err()
}
