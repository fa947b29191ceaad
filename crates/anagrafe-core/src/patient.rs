//! Patient records: the unit of the registry.
//!
//! Field names on the wire follow the persisted layout (`nome`, `cognome`,
//! `codiceFiscale`, …) so that data written by earlier versions keeps loading.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

// ─── Identifier ──────────────────────────────────────────────────────────────

/// A record identifier. Assigned by the store, monotonically increasing and
/// never reused.
#[derive(
  Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct RecordId(pub u64);

impl fmt::Display for RecordId {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result { self.0.fmt(f) }
}

// ─── Fields ──────────────────────────────────────────────────────────────────

/// The mandatory form fields, in the order they are validated.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Field {
  FirstName,
  LastName,
  FiscalCode,
  FileNumber,
}

/// Raw form input, exactly as typed. Validation and normalisation happen in
/// [`crate::store::RecordStore`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PatientFields {
  pub first_name:  String,
  pub last_name:   String,
  pub fiscal_code: String,
  pub file_number: String,
  pub note:        String,
}

impl PatientFields {
  /// Convenience constructor with an empty note.
  pub fn new(
    first_name: impl Into<String>,
    last_name: impl Into<String>,
    fiscal_code: impl Into<String>,
    file_number: impl Into<String>,
  ) -> Self {
    Self {
      first_name:  first_name.into(),
      last_name:   last_name.into(),
      fiscal_code: fiscal_code.into(),
      file_number: file_number.into(),
      note:        String::new(),
    }
  }

  pub fn with_note(mut self, note: impl Into<String>) -> Self {
    self.note = note.into();
    self
  }
}

impl From<&PatientRecord> for PatientFields {
  fn from(record: &PatientRecord) -> Self {
    Self {
      first_name:  record.first_name.clone(),
      last_name:   record.last_name.clone(),
      fiscal_code: record.fiscal_code.clone(),
      file_number: record.file_number.clone(),
      note:        record.note.clone(),
    }
  }
}

// ─── Record ──────────────────────────────────────────────────────────────────

/// A stored patient. Text fields are trimmed and the fiscal code is
/// uppercase.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PatientRecord {
  pub id:            RecordId,
  #[serde(rename = "nome")]
  pub first_name:    String,
  #[serde(rename = "cognome")]
  pub last_name:     String,
  #[serde(rename = "codiceFiscale")]
  pub fiscal_code:   String,
  #[serde(rename = "numeroCartella")]
  pub file_number:   String,
  #[serde(default)]
  pub note:          String,
  /// Set once at creation. Records written before timestamps were tracked
  /// have none.
  #[serde(
    rename = "dataRegistrazione",
    default,
    skip_serializing_if = "Option::is_none"
  )]
  pub registered_at: Option<DateTime<Utc>>,
}

impl PatientRecord {
  /// Whether this record collides with the given fiscal code or file number.
  /// The fiscal code comparison ignores case.
  pub fn conflicts_with(&self, fiscal_code: &str, file_number: &str) -> bool {
    self.fiscal_code.to_lowercase() == fiscal_code.to_lowercase()
      || self.file_number == file_number
  }
}
