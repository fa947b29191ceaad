//! Error types for `anagrafe-core`.
//!
//! Display strings are the user-facing notification texts, shown verbatim.

use thiserror::Error;

use crate::patient::{Field, RecordId};

#[derive(Debug, Error, PartialEq, Eq)]
pub enum Error {
  #[error("Tutti i campi obbligatori devono essere compilati")]
  MissingField(Field),

  #[error("Il codice fiscale deve essere di 16 caratteri")]
  InvalidLength { actual: usize },

  /// Only produced when the format check is switched on; see
  /// [`crate::store::ValidationPolicy`].
  #[error("Il codice fiscale non è in un formato valido")]
  InvalidFormat,

  #[error("Paziente già registrato (codice fiscale o numero cartella duplicato)")]
  DuplicateRecord,

  #[error("Paziente {0} non trovato")]
  NotFound(RecordId),

  #[error("Impossibile assegnare un nuovo identificativo paziente")]
  IdsExhausted,
}

/// Failures of the persistence layer. None of these are fatal: the in-memory
/// store stays authoritative.
#[derive(Debug, Error)]
pub enum PersistenceError {
  #[error("serialization error: {0}")]
  Serialization(#[from] serde_json::Error),

  #[error("storage unavailable: {0}")]
  StorageUnavailable(#[source] Box<dyn std::error::Error + Send + Sync>),
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
