//! Record layout inside the single FeOxDB keyspace.
//!
//! - `\u{1}catalog` holds the generation names in creation order.
//! - `{generation}\0{METHOD target}` holds one serialized entry.
//!
//! Entries of a generation share the `{generation}\0` prefix and sort between
//! `{generation}\0` and `{generation}\u{1}`, so a generation is enumerated
//! with a range scan.

use bincode::config::standard as bincode_config;
use bincode::serde::{decode_from_slice, encode_to_vec};
use feoxdb::{FeoxError, FeoxStore};
use shelter_core::{GenerationName, RequestKey};

use crate::FeOxDbError;

const CATALOG: &[u8] = b"\x01catalog";
const SCAN_BATCH: usize = 256;

pub(crate) type Catalog = Vec<String>;

pub(crate) fn entry_key(generation: &GenerationName, key: &RequestKey) -> Vec<u8> {
    format!("{generation}\0{key}").into_bytes()
}

fn entry_range(generation: &GenerationName) -> (Vec<u8>, Vec<u8>) {
    (
        format!("{generation}\0").into_bytes(),
        format!("{generation}\u{1}").into_bytes(),
    )
}

fn load<T>(store: &FeoxStore, key: &[u8]) -> Result<Option<T>, FeOxDbError>
where
    T: serde::de::DeserializeOwned,
{
    match store.get(key) {
        Ok(bytes) => Ok(Some(decode_from_slice(&bytes, bincode_config())?.0)),
        Err(FeoxError::KeyNotFound) => Ok(None),
        Err(e) => Err(e.into()),
    }
}

fn save<T>(store: &FeoxStore, key: &[u8], value: &T) -> Result<(), FeOxDbError>
where
    T: serde::Serialize,
{
    let bytes = encode_to_vec(value, bincode_config())?;
    store.insert(key, &bytes)?;
    Ok(())
}

pub(crate) fn catalog(store: &FeoxStore) -> Result<Catalog, FeOxDbError> {
    Ok(load(store, CATALOG)?.unwrap_or_default())
}

/// Adds `generation` to the catalog. Returns `false` if it was already there.
pub(crate) fn register(store: &FeoxStore, generation: &GenerationName) -> Result<bool, FeOxDbError> {
    let mut names = catalog(store)?;
    if names.iter().any(|name| name == generation.as_str()) {
        return Ok(false);
    }
    names.push(generation.to_string());
    save(store, CATALOG, &names)?;
    Ok(true)
}

/// Whether `generation` is in the catalog.
pub(crate) fn is_registered(
    store: &FeoxStore,
    generation: &GenerationName,
) -> Result<bool, FeOxDbError> {
    Ok(catalog(store)?
        .iter()
        .any(|name| name == generation.as_str()))
}

/// Deletes every entry stored under `generation`, batch by batch.
fn remove_entries(store: &FeoxStore, generation: &GenerationName) -> Result<u32, FeOxDbError> {
    let (mut start, end) = entry_range(generation);
    let mut removed: u32 = 0;
    loop {
        let batch = store.range_query(&start, &end, SCAN_BATCH)?;
        let Some((last, _)) = batch.last() else {
            return Ok(removed);
        };
        let mut next = last.clone();
        next.push(0);
        for (key, _) in &batch {
            match store.delete(key) {
                Ok(_) => removed = removed.saturating_add(1),
                Err(FeoxError::KeyNotFound) => {}
                Err(e) => return Err(e.into()),
            }
        }
        if batch.len() < SCAN_BATCH {
            return Ok(removed);
        }
        start = next;
    }
}

/// Removes a generation and every entry. Returns the entry count, or `None`
/// if the generation was not in the catalog.
pub(crate) fn remove(
    store: &FeoxStore,
    generation: &GenerationName,
) -> Result<Option<u32>, FeOxDbError> {
    let mut names = catalog(store)?;
    let before = names.len();
    names.retain(|name| name != generation.as_str());
    if names.len() == before {
        return Ok(None);
    }

    let removed = remove_entries(store, generation)?;
    save(store, CATALOG, &names)?;
    Ok(Some(removed))
}
