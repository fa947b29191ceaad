//! [`Registry`]: ties the record store to persistence and to whoever renders
//! it.
//!
//! Every user action goes through here. A successful mutation queues exactly
//! one [`RegistryEvent::Changed`] and writes the new state to the persistence
//! slot; failures only queue a [`RegistryEvent::Notice`]. The presentation
//! side drains the queue with [`Registry::drain_events`].

use serde::Serialize;
use tracing::{debug, error, info};

use crate::{
  Error, Result,
  patient::{PatientFields, PatientRecord, RecordId},
  persistence::{KeyValueStore, Persistence},
  store::{RecordStore, ValidationPolicy},
};

/// User-facing texts. Validation failures use the [`Error`] display strings.
pub mod messages {
  pub const REGISTERED: &str = "Paziente registrato con successo";
  pub const UPDATED: &str = "Paziente modificato con successo";
  pub const DUPLICATE_ON_UPDATE: &str = "Codice fiscale o numero cartella già esistente";
  pub const EDIT_STARTED: &str =
    "Modalità modifica attivata. Modifica i dati e clicca \"Salva Modifiche\"";
  pub const EDIT_CANCELLED: &str = "Modifica annullata";
  pub const DELETED: &str = "Paziente eliminato con successo";
  pub const CLEARED: &str = "Tabella cancellata con successo";
  pub const ALREADY_EMPTY: &str = "La tabella è già vuota";
  pub const SAVE_FAILED: &str = "Errore nel salvare i dati";
  pub const LOAD_FAILED: &str = "Errore nel caricare i dati salvati";

  pub const CONFIRM_DELETE: &str = "Sei sicuro di voler eliminare questo paziente?";
  pub const CONFIRM_CLEAR: &str = "Sei sicuro di voler cancellare tutti i dati dei pazienti? \
                                   Questa operazione non può essere annullata.";
}

// ─── Notifications ───────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
  Success,
  Error,
}

/// A transient message for the user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Notification {
  pub message:  String,
  pub severity: Severity,
}

impl Notification {
  pub fn success(message: impl Into<String>) -> Self {
    Self { message: message.into(), severity: Severity::Success }
  }

  pub fn error(message: impl Into<String>) -> Self {
    Self { message: message.into(), severity: Severity::Error }
  }
}

/// What the presentation side needs to react to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RegistryEvent {
  /// The record sequence changed; re-render the table.
  Changed,
  /// Edit mode was entered (`Some`) or left (`None`).
  EditMode(Option<RecordId>),
  Notice(Notification),
}

// ─── Confirmation ────────────────────────────────────────────────────────────

/// Asks the user to approve a destructive action.
pub trait Confirm {
  async fn confirm(&self, prompt: &str) -> bool;
}

/// A decision taken before the call, e.g. by a modal dialog.
impl Confirm for bool {
  async fn confirm(&self, _prompt: &str) -> bool { *self }
}

// ─── Registry ────────────────────────────────────────────────────────────────

pub struct Registry<K> {
  store:       RecordStore,
  persistence: Option<Persistence<K>>,
  events:      Vec<RegistryEvent>,
}

impl<K: KeyValueStore> Registry<K> {
  /// A registry with no durable storage.
  pub fn without_persistence(policy: ValidationPolicy) -> Self {
    Self { store: RecordStore::new(policy), persistence: None, events: Vec::new() }
  }

  /// Load the registry from `persistence`.
  ///
  /// Never fails: an unreadable slot is reported through a notice and the
  /// registry starts empty.
  pub async fn open(persistence: Persistence<K>, policy: ValidationPolicy) -> Self {
    let mut events = Vec::new();
    let store = match persistence.load().await {
      Ok(state) => {
        events.push(RegistryEvent::Changed);
        RecordStore::from_state(state, policy)
      }
      Err(e) => {
        error!(slot = persistence.slot(), error = %e, "failed to load registry");
        events.push(RegistryEvent::Notice(Notification::error(messages::LOAD_FAILED)));
        RecordStore::new(policy)
      }
    };

    Self { store, persistence: Some(persistence), events }
  }

  pub fn store(&self) -> &RecordStore { &self.store }

  pub fn persistence(&self) -> Option<&Persistence<K>> { self.persistence.as_ref() }

  /// Take every queued event, oldest first.
  pub fn drain_events(&mut self) -> Vec<RegistryEvent> { std::mem::take(&mut self.events) }

  // ── Actions ───────────────────────────────────────────────────────────────

  /// Submit the form: create a record, or update the edit target when edit
  /// mode is active. A successful update leaves edit mode.
  pub async fn submit(&mut self, fields: &PatientFields) -> Result<PatientRecord> {
    let editing = self.store.editing();
    let outcome = match editing {
      Some(id) => self.store.update(id, fields),
      None => self.store.create(fields),
    };

    let record = match outcome {
      Ok(record) => record,
      Err(e) => {
        debug!(error = ?e, editing = ?editing, "rejected form submission");
        let message = match (&e, editing) {
          (Error::DuplicateRecord, Some(_)) => messages::DUPLICATE_ON_UPDATE.to_owned(),
          _ => e.to_string(),
        };
        self.notify(Notification::error(message));
        return Err(e);
      }
    };

    if editing.is_some() {
      info!(id = %record.id, "updated patient");
      self.store.cancel_edit();
      self.events.push(RegistryEvent::EditMode(None));
      self.notify(Notification::success(messages::UPDATED));
    } else {
      info!(id = %record.id, "registered patient");
      self.notify(Notification::success(messages::REGISTERED));
    }

    self.commit().await;
    Ok(record)
  }

  /// Enter edit mode for `id`, returning the record to pre-fill the form.
  pub fn begin_edit(&mut self, id: RecordId) -> Result<PatientRecord> {
    match self.store.begin_edit(id).cloned() {
      Ok(record) => {
        self.events.push(RegistryEvent::EditMode(Some(id)));
        self.notify(Notification::success(messages::EDIT_STARTED));
        Ok(record)
      }
      Err(e) => {
        self.notify(Notification::error(e.to_string()));
        Err(e)
      }
    }
  }

  pub fn cancel_edit(&mut self) {
    self.store.cancel_edit();
    self.events.push(RegistryEvent::EditMode(None));
    self.notify(Notification::success(messages::EDIT_CANCELLED));
  }

  /// Delete `id` once the user confirms. Returns whether a record was
  /// removed; a missing id is not an error.
  pub async fn delete(&mut self, id: RecordId, confirm: &impl Confirm) -> bool {
    if !confirm.confirm(messages::CONFIRM_DELETE).await {
      debug!(%id, "delete declined");
      return false;
    }

    let was_editing = self.store.editing() == Some(id);
    let Some(removed) = self.store.delete(id) else {
      debug!(%id, "delete of unknown record ignored");
      return false;
    };

    info!(id = %removed.id, "deleted patient");
    if was_editing {
      self.events.push(RegistryEvent::EditMode(None));
      self.notify(Notification::success(messages::EDIT_CANCELLED));
    }
    self.notify(Notification::success(messages::DELETED));
    self.commit().await;
    true
  }

  /// Drop every record once the user confirms. An empty table is reported
  /// without asking.
  pub async fn clear_all(&mut self, confirm: &impl Confirm) -> bool {
    if self.store.is_empty() {
      self.notify(Notification::error(messages::ALREADY_EMPTY));
      return false;
    }
    if !confirm.confirm(messages::CONFIRM_CLEAR).await {
      debug!("clear declined");
      return false;
    }

    let was_editing = self.store.editing().is_some();
    let count = self.store.len();
    self.store.clear_all();

    info!(count, "cleared registry");
    if was_editing {
      self.events.push(RegistryEvent::EditMode(None));
    }
    self.notify(Notification::success(messages::CLEARED));
    self.commit().await;
    true
  }

  // ── Internals ─────────────────────────────────────────────────────────────

  fn notify(&mut self, notification: Notification) {
    self.events.push(RegistryEvent::Notice(notification));
  }

  /// Announce a mutation and write it through. A failed write is reported
  /// and otherwise ignored.
  async fn commit(&mut self) {
    self.events.push(RegistryEvent::Changed);

    let Some(persistence) = &self.persistence else {
      return;
    };
    if let Err(e) = persistence.save(&self.store.snapshot()).await {
      error!(slot = persistence.slot(), error = %e, "failed to save registry");
      self.notify(Notification::error(messages::SAVE_FAILED));
    }
  }
}
