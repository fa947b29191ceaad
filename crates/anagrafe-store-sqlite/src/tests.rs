//! Integration tests for `SqliteKv` against in-memory and on-disk databases.

use anagrafe_core::{
  patient::{PatientFields, RecordId},
  persistence::{DEFAULT_SLOT, KeyValueStore, Persistence},
  registry::Registry,
  store::ValidationPolicy,
};

use crate::SqliteKv;

async fn store() -> SqliteKv {
  SqliteKv::open_in_memory()
    .await
    .expect("in-memory store")
}

// ─── Raw slots ───────────────────────────────────────────────────────────────

#[tokio::test]
async fn get_missing_key_returns_none() {
  let kv = store().await;
  assert!(kv.get("absent").await.unwrap().is_none());
  assert!(kv.updated_at("absent").await.unwrap().is_none());
}

#[tokio::test]
async fn set_then_get() {
  let kv = store().await;
  kv.set("slot", b"hello".to_vec()).await.unwrap();
  assert_eq!(kv.get("slot").await.unwrap().as_deref(), Some(&b"hello"[..]));
  assert!(kv.updated_at("slot").await.unwrap().is_some());
}

#[tokio::test]
async fn set_replaces_previous_value() {
  let kv = store().await;
  kv.set("slot", b"first".to_vec()).await.unwrap();
  kv.set("slot", b"second".to_vec()).await.unwrap();
  assert_eq!(kv.get("slot").await.unwrap().as_deref(), Some(&b"second"[..]));
}

#[tokio::test]
async fn keys_are_independent() {
  let kv = store().await;
  kv.set("a", vec![1, 2, 3]).await.unwrap();
  kv.set("b", vec![]).await.unwrap();
  assert_eq!(kv.get("a").await.unwrap(), Some(vec![1, 2, 3]));
  assert_eq!(kv.get("b").await.unwrap(), Some(vec![]));
}

#[tokio::test]
async fn clones_share_the_connection() {
  let kv = store().await;
  let other = kv.clone();
  kv.set("slot", b"x".to_vec()).await.unwrap();
  assert_eq!(other.get("slot").await.unwrap(), Some(b"x".to_vec()));
}

// ─── On disk ─────────────────────────────────────────────────────────────────

#[tokio::test]
async fn values_survive_reopen() {
  let dir = tempfile::tempdir().unwrap();
  let path = dir.path().join("anagrafe.db");

  {
    let kv = SqliteKv::open(&path).await.unwrap();
    kv.set(DEFAULT_SLOT, b"{\"patients\":[],\"nextId\":7}".to_vec())
      .await
      .unwrap();
  }

  let kv = SqliteKv::open(&path).await.unwrap();
  let bytes = kv.get(DEFAULT_SLOT).await.unwrap().unwrap();
  let json: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
  assert_eq!(json["nextId"], 7);
}

#[tokio::test]
async fn registry_round_trips_through_sqlite() {
  let dir = tempfile::tempdir().unwrap();
  let path = dir.path().join("anagrafe.db");

  {
    let kv = SqliteKv::open(&path).await.unwrap();
    let mut registry = Registry::open(Persistence::new(kv), ValidationPolicy::default()).await;
    registry
      .submit(&PatientFields::new("Mario", "Rossi", "RSSMRA85T10A562S", "C-001"))
      .await
      .unwrap();
    registry
      .submit(&PatientFields::new("Giulia", "Bianchi", "BNCGLI90A41F205X", "C-002"))
      .await
      .unwrap();
    assert!(registry.delete(RecordId(1), &true).await);
  }

  let kv = SqliteKv::open(&path).await.unwrap();
  let mut registry = Registry::open(Persistence::new(kv), ValidationPolicy::default()).await;
  let records = registry.store().records();
  assert_eq!(records.len(), 1);
  assert_eq!(records[0].id, RecordId(2));
  assert_eq!(records[0].first_name, "Giulia");

  let next = registry
    .submit(&PatientFields::new("Anna", "Verdi", "VRDNNA70C50H501Z", "C-003"))
    .await
    .unwrap();
  assert_eq!(next.id, RecordId(3));
}
