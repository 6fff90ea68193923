use bytes::Bytes;
use pretty_assertions::assert_eq;
use shelter_backend::{Backend, BincodeFormat, CacheBackend, CacheEntry, DeleteStatus};
use shelter_core::{CapturedResponse, GenerationName, RequestKey};
use shelter_moka::{MokaBackend, MokaBackendBuilder};

fn v(version: &str) -> GenerationName {
    GenerationName::new("app", version)
}

#[tokio::test]
async fn write_creates_generation_implicitly() {
    let backend = MokaBackend::builder().max_entries(100).build();
    let key = RequestKey::get("/assets/app.js");

    backend
        .write(&v("v1"), &key, Bytes::from_static(b"raw"))
        .await
        .unwrap();

    assert_eq!(backend.generations().await.unwrap(), vec![v("v1")]);
    assert_eq!(
        backend.read(&v("v1"), &key).await.unwrap(),
        Some(Bytes::from_static(b"raw"))
    );
}

#[tokio::test]
async fn read_from_unknown_generation_is_a_miss() {
    let backend = MokaBackend::builder().max_entries(100).build();
    let read = backend
        .read(&v("v1"), &RequestKey::get("/"))
        .await
        .unwrap();
    assert!(read.is_none());
    assert!(backend.generations().await.unwrap().is_empty());
}

#[tokio::test]
async fn generations_listed_in_creation_order() {
    let backend = MokaBackend::builder().max_entries(100).build();
    for version in ["v3", "v1", "v2"] {
        backend.open(&v(version)).await.unwrap();
    }
    backend.open(&v("v3")).await.unwrap();

    assert_eq!(
        backend.generations().await.unwrap(),
        vec![v("v3"), v("v1"), v("v2")]
    );
}

#[tokio::test]
async fn cleanup_leaves_only_current_generation() {
    let backend = MokaBackend::builder().max_entries(100).build();
    let key = RequestKey::get("/index.html");
    let entry = CacheEntry::new(CapturedResponse::ok("<html/>"));

    backend.put(&v("v1"), &key, &entry).await.unwrap();
    backend.put(&v("v2"), &key, &entry).await.unwrap();

    let deleted = backend.delete_generations_except(&v("v2")).await.unwrap();

    assert_eq!(deleted, vec![v("v1")]);
    assert_eq!(backend.generations().await.unwrap(), vec![v("v2")]);
    assert!(backend.get(&v("v1"), &key).await.unwrap().is_none());
    assert!(backend.get(&v("v2"), &key).await.unwrap().is_some());
}

#[tokio::test]
async fn delete_reports_entry_count() {
    let backend = MokaBackend::builder().max_entries(100).build();
    for path in ["/a", "/b", "/c"] {
        backend
            .write(&v("v1"), &RequestKey::get(path), Bytes::from_static(b"x"))
            .await
            .unwrap();
    }

    assert_eq!(
        backend.delete_generation(&v("v1")).await.unwrap(),
        DeleteStatus::Deleted(3)
    );
    assert_eq!(
        backend.delete_generation(&v("v1")).await.unwrap(),
        DeleteStatus::Missing
    );
}

#[tokio::test]
async fn entry_capacity_is_per_generation() {
    let backend = MokaBackendBuilder::default().max_entries(2).build();
    for i in 0..10 {
        let key = RequestKey::get(&format!("/assets/{i}.js"));
        backend
            .write(&v("v1"), &key, Bytes::from_static(b"x"))
            .await
            .unwrap();
    }
    backend
        .write(&v("v2"), &RequestKey::get("/"), Bytes::from_static(b"x"))
        .await
        .unwrap();
    backend.run_pending_tasks().await;

    assert!(
        backend
            .read(&v("v2"), &RequestKey::get("/"))
            .await
            .unwrap()
            .is_some()
    );
}

#[tokio::test]
async fn bincode_value_format_round_trips_entries() {
    let backend = MokaBackend::builder()
        .label("shell")
        .max_bytes(1024 * 1024)
        .value_format(BincodeFormat)
        .build();
    let key = RequestKey::get("/manifest.json");
    let entry = CacheEntry::new(CapturedResponse::ok("{\"name\":\"app\"}"));

    backend.put(&v("v1"), &key, &entry).await.unwrap();

    assert_eq!(backend.name(), "shell");
    assert_eq!(backend.get(&v("v1"), &key).await.unwrap(), Some(entry));
}
