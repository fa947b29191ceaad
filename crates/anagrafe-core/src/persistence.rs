//! Persistence adapter: the registry state in one named slot of a flat
//! key-value byte store.
//!
//! The slot holds JSON in the layout below. Absent slots load as an empty
//! store; anything else that fails to parse, or that stores an id no
//! successor can follow, is reported as [`PersistenceError::Serialization`].
//!
//! ```text
//! { "patients": [ { "id": 1, "nome": "...", "cognome": "...",
//!                   "codiceFiscale": "...", "numeroCartella": "...",
//!                   "note": "...", "dataRegistrazione": "2024-05-01T09:30:00Z" } ],
//!   "nextId": 2 }
//! ```

use std::{
  collections::HashMap,
  future::Future,
  sync::{Arc, Mutex, PoisonError},
};

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, info};

use crate::{
  PersistenceError,
  patient::{PatientRecord, RecordId},
  store::FIRST_ID,
};

/// Slot name used when none is configured.
pub const DEFAULT_SLOT: &str = "patientsData";

// ─── Persisted layout ────────────────────────────────────────────────────────

/// Everything that survives a restart.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "RawStoreState")]
pub struct StoreState {
  pub patients: Vec<PatientRecord>,
  #[serde(rename = "nextId")]
  pub next_id:  RecordId,
}

impl Default for StoreState {
  fn default() -> Self { Self { patients: Vec::new(), next_id: FIRST_ID } }
}

/// Lenient read side: missing or null members fall back to their defaults.
#[derive(Deserialize)]
struct RawStoreState {
  #[serde(default)]
  patients: Option<Vec<PatientRecord>>,
  #[serde(rename = "nextId", default)]
  next_id:  Option<u64>,
}

impl TryFrom<RawStoreState> for StoreState {
  type Error = String;

  fn try_from(raw: RawStoreState) -> Result<Self, Self::Error> {
    let patients = raw.patients.unwrap_or_default();
    if let Some(p) = patients.iter().find(|p| p.id.0 == u64::MAX) {
      return Err(format!("patient id {} leaves no room for a successor", p.id));
    }
    let next_id = match raw.next_id {
      Some(u64::MAX) => return Err(format!("nextId {} cannot be allocated", u64::MAX)),
      Some(n) if n > 0 => RecordId(n),
      _ => FIRST_ID,
    };
    Ok(Self { patients, next_id })
  }
}

// ─── Backend trait ───────────────────────────────────────────────────────────

/// A flat key-value byte store.
///
/// Implemented by storage backends (e.g. `anagrafe-store-sqlite`). Writes
/// replace the whole value of a key.
pub trait KeyValueStore: Send + Sync {
  type Error: std::error::Error + Send + Sync + 'static;

  /// Read the value stored under `key`. Returns `None` if the key is unset.
  fn get<'a>(
    &'a self,
    key: &'a str,
  ) -> impl Future<Output = Result<Option<Vec<u8>>, Self::Error>> + Send + 'a;

  /// Store `value` under `key`, replacing any previous value.
  fn set<'a>(
    &'a self,
    key: &'a str,
    value: Vec<u8>,
  ) -> impl Future<Output = Result<(), Self::Error>> + Send + 'a;
}

// ─── In-memory backend ───────────────────────────────────────────────────────

#[derive(Debug, Error)]
pub enum MemoryKvError {
  #[error("quota exceeded: {needed} bytes requested, {quota} bytes available")]
  QuotaExceeded { needed: usize, quota: usize },
}

/// In-process key-value store, optionally bounded by a byte quota across all
/// keys.
///
/// Cloning is cheap and clones share the same slots.
#[derive(Debug, Clone, Default)]
pub struct MemoryKv {
  slots: Arc<Mutex<HashMap<String, Vec<u8>>>>,
  quota: Option<usize>,
}

impl MemoryKv {
  pub fn new() -> Self { Self::default() }

  /// A store that refuses writes once the stored bytes would exceed `quota`.
  pub fn with_quota(quota: usize) -> Self {
    Self { slots: Arc::default(), quota: Some(quota) }
  }
}

impl KeyValueStore for MemoryKv {
  type Error = MemoryKvError;

  async fn get(&self, key: &str) -> Result<Option<Vec<u8>>, MemoryKvError> {
    let slots = self.slots.lock().unwrap_or_else(PoisonError::into_inner);
    Ok(slots.get(key).cloned())
  }

  async fn set(&self, key: &str, value: Vec<u8>) -> Result<(), MemoryKvError> {
    let mut slots = self.slots.lock().unwrap_or_else(PoisonError::into_inner);

    if let Some(quota) = self.quota {
      let others: usize = slots
        .iter()
        .filter(|(k, _)| k.as_str() != key)
        .map(|(_, v)| v.len())
        .sum();
      let needed = others + value.len();
      if needed > quota {
        return Err(MemoryKvError::QuotaExceeded { needed, quota });
      }
    }

    slots.insert(key.to_owned(), value);
    Ok(())
  }
}

// ─── Adapter ─────────────────────────────────────────────────────────────────

/// Binds a [`KeyValueStore`] to the slot that holds the registry.
#[derive(Debug, Clone)]
pub struct Persistence<K> {
  kv:   K,
  slot: String,
}

impl<K: KeyValueStore> Persistence<K> {
  /// Use the [`DEFAULT_SLOT`].
  pub fn new(kv: K) -> Self { Self::with_slot(kv, DEFAULT_SLOT) }

  pub fn with_slot(kv: K, slot: impl Into<String>) -> Self {
    Self { kv, slot: slot.into() }
  }

  pub fn slot(&self) -> &str { &self.slot }

  pub fn backend(&self) -> &K { &self.kv }

  /// Write the full state to the slot.
  pub async fn save(&self, state: &StoreState) -> Result<(), PersistenceError> {
    let bytes = serde_json::to_vec(state)?;
    let len = bytes.len();
    self
      .kv
      .set(&self.slot, bytes)
      .await
      .map_err(|e| PersistenceError::StorageUnavailable(Box::new(e)))?;
    debug!(slot = %self.slot, bytes = len, patients = state.patients.len(), "saved registry");
    Ok(())
  }

  /// Read the state from the slot. An unset slot yields the empty state.
  pub async fn load(&self) -> Result<StoreState, PersistenceError> {
    let bytes = self
      .kv
      .get(&self.slot)
      .await
      .map_err(|e| PersistenceError::StorageUnavailable(Box::new(e)))?;

    let Some(bytes) = bytes else {
      debug!(slot = %self.slot, "slot is empty; starting fresh");
      return Ok(StoreState::default());
    };

    let state: StoreState = serde_json::from_slice(&bytes)?;
    info!(slot = %self.slot, patients = state.patients.len(), "loaded registry");
    Ok(state)
  }
}
