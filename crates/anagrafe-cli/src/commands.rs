//! One-shot subcommands that run without the terminal UI.

use anagrafe_core::{
  patient::{PatientFields, RecordId},
  persistence::KeyValueStore,
  registry::{Confirm, Registry, RegistryEvent, Severity},
  view::{ExpandedNotes, TableView, format_registered_at},
};
use anagrafe_store_sqlite::SqliteKv;
use tracing::warn;

use crate::confirm::StdinConfirm;

/// Print the table. Notes are shown truncated.
pub async fn list(registry: &mut Registry<SqliteKv>) -> bool {
  let ok = flush_notices(registry);

  match TableView::build(registry.store(), &ExpandedNotes::default()) {
    TableView::Empty { message } => println!("{message}"),
    TableView::Rows(rows) => {
      println!(
        "{:>4}  {:<16} {:<16} {:<16} {:<12} {:<16}  Note",
        "ID", "Nome", "Cognome", "Codice Fiscale", "Cartella", "Registrato"
      );
      for row in rows {
        println!(
          "{:>4}  {:<16} {:<16} {:<16} {:<12} {:<16}  {}",
          row.id,
          row.first_name,
          row.last_name,
          row.fiscal_code,
          row.file_number,
          row.registered_at,
          row.note.text
        );
      }
    }
  }

  if let Some(persistence) = registry.persistence() {
    match persistence.backend().updated_at(persistence.slot()).await {
      Ok(at) => println!("\nUltimo salvataggio: {}", format_registered_at(at)),
      Err(e) => warn!(error = %e, "could not read slot timestamp"),
    }
  }
  ok
}

pub async fn add<K: KeyValueStore>(registry: &mut Registry<K>, fields: PatientFields) -> bool {
  let created = registry.submit(&fields).await;
  let ok = flush_notices(registry);
  if let Ok(record) = &created {
    println!("ID {}", record.id);
  }
  ok && created.is_ok()
}

/// Unlike the interactive table, naming an id that does not exist is a
/// failure here, so scripts notice the typo.
pub async fn delete<K: KeyValueStore>(registry: &mut Registry<K>, id: u64, yes: bool) -> bool {
  let id = RecordId(id);
  if registry.store().find(id).is_none() {
    eprintln!("Paziente {id} non trovato");
    return false;
  }
  if yes {
    run_delete(registry, id, &true).await
  } else {
    run_delete(registry, id, &StdinConfirm).await
  }
}

async fn run_delete<K: KeyValueStore>(
  registry: &mut Registry<K>,
  id: RecordId,
  confirm: &impl Confirm,
) -> bool {
  registry.delete(id, confirm).await;
  flush_notices(registry)
}

pub async fn clear<K: KeyValueStore>(registry: &mut Registry<K>, yes: bool) -> bool {
  if yes {
    registry.clear_all(&true).await;
  } else {
    registry.clear_all(&StdinConfirm).await;
  }
  flush_notices(registry)
}

/// Print queued notices: successes to stdout, errors to stderr. Returns
/// `false` if any error was reported.
fn flush_notices<K: KeyValueStore>(registry: &mut Registry<K>) -> bool {
  let mut ok = true;
  for event in registry.drain_events() {
    if let RegistryEvent::Notice(n) = event {
      match n.severity {
        Severity::Success => println!("{}", n.message),
        Severity::Error => {
          ok = false;
          eprintln!("{}", n.message);
        }
      }
    }
  }
  ok
}

#[cfg(test)]
mod tests {
  use anagrafe_core::{
    patient::{PatientFields, RecordId},
    persistence::{MemoryKv, Persistence},
    registry::Registry,
    store::ValidationPolicy,
  };

  use super::{add, clear, delete};

  async fn registry(kv: MemoryKv) -> Registry<MemoryKv> {
    Registry::open(Persistence::new(kv), ValidationPolicy::default()).await
  }

  fn mario() -> PatientFields {
    PatientFields::new("Mario", "Rossi", "RSSMRA85T10A562S", "C-001")
  }

  #[tokio::test]
  async fn add_reports_success_and_persists() {
    let kv = MemoryKv::new();
    let mut reg = registry(kv.clone()).await;
    assert!(add(&mut reg, mario()).await);

    let reopened = registry(kv).await;
    assert_eq!(reopened.store().len(), 1);
  }

  #[tokio::test]
  async fn add_fails_on_invalid_or_duplicate_input() {
    let mut reg = registry(MemoryKv::new()).await;
    let short = PatientFields::new("Mario", "Rossi", "RSSMRA", "C-001");
    assert!(!add(&mut reg, short).await);
    assert!(add(&mut reg, mario()).await);
    assert!(!add(&mut reg, mario()).await);
    assert_eq!(reg.store().len(), 1);
  }

  #[tokio::test]
  async fn delete_with_yes_removes_the_record() {
    let mut reg = registry(MemoryKv::new()).await;
    assert!(add(&mut reg, mario()).await);
    assert!(delete(&mut reg, 1, true).await);
    assert!(reg.store().is_empty());
  }

  #[tokio::test]
  async fn delete_of_unknown_id_fails_without_changes() {
    let mut reg = registry(MemoryKv::new()).await;
    assert!(add(&mut reg, mario()).await);
    assert!(!delete(&mut reg, 7, true).await);
    assert!(reg.store().find(RecordId(1)).is_some());
  }

  #[tokio::test]
  async fn clear_with_yes_empties_and_fails_when_already_empty() {
    let mut reg = registry(MemoryKv::new()).await;
    assert!(add(&mut reg, mario()).await);
    assert!(clear(&mut reg, true).await);
    assert!(reg.store().is_empty());
    assert!(!clear(&mut reg, true).await);
  }
}
