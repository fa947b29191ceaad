//! [`RecordStore`]: the in-memory authority for patient records and
//! identifier allocation.
//!
//! The store knows nothing about persistence or rendering. Callers that need
//! durability snapshot it through [`RecordStore::snapshot`] after each
//! successful mutation; see [`crate::registry::Registry`].

use chrono::Utc;
use tracing::warn;

use crate::{
  Error, Result, fiscal_code,
  patient::{Field, PatientFields, PatientRecord, RecordId},
  persistence::StoreState,
};

/// The first identifier handed out by an empty store.
pub const FIRST_ID: RecordId = RecordId(1);

// ─── Policy ──────────────────────────────────────────────────────────────────

/// Knobs for write-path validation.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ValidationPolicy {
  /// Reject fiscal codes that do not match the structural pattern. Off by
  /// default: only the length is enforced unless this is switched on.
  pub enforce_fiscal_code_format: bool,
}

// ─── Validated input ─────────────────────────────────────────────────────────

struct ValidFields {
  first_name:  String,
  last_name:   String,
  fiscal_code: String,
  file_number: String,
  note:        String,
}

// ─── Store ───────────────────────────────────────────────────────────────────

/// Ordered patient records plus the id counter and the current edit target.
///
/// Insertion order is display order.
#[derive(Debug, Clone)]
pub struct RecordStore {
  records: Vec<PatientRecord>,
  next_id: RecordId,
  editing: Option<RecordId>,
  policy:  ValidationPolicy,
}

impl Default for RecordStore {
  fn default() -> Self { Self::new(ValidationPolicy::default()) }
}

impl RecordStore {
  /// An empty store.
  pub fn new(policy: ValidationPolicy) -> Self {
    Self { records: Vec::new(), next_id: FIRST_ID, editing: None, policy }
  }

  /// Rebuild a store from persisted state.
  ///
  /// A `nextId` that does not exceed every loaded id is raised so identifiers
  /// are never handed out twice.
  pub fn from_state(state: StoreState, policy: ValidationPolicy) -> Self {
    let floor = state
      .patients
      .iter()
      .map(|p| p.id.0.saturating_add(1))
      .max()
      .unwrap_or(FIRST_ID.0)
      .max(FIRST_ID.0);

    let next_id = if state.next_id.0 < floor {
      warn!(
        stored = state.next_id.0,
        repaired = floor,
        "persisted nextId is behind the loaded records; raising it"
      );
      RecordId(floor)
    } else {
      state.next_id
    };

    Self { records: state.patients, next_id, editing: None, policy }
  }

  /// The persisted form of the store. The edit target is UI state and is not
  /// included.
  pub fn snapshot(&self) -> StoreState {
    StoreState { patients: self.records.clone(), next_id: self.next_id }
  }

  // ── Reads ─────────────────────────────────────────────────────────────────

  pub fn records(&self) -> &[PatientRecord] { &self.records }

  pub fn len(&self) -> usize { self.records.len() }

  pub fn is_empty(&self) -> bool { self.records.is_empty() }

  pub fn next_id(&self) -> RecordId { self.next_id }

  /// The record currently targeted for editing, if any.
  pub fn editing(&self) -> Option<RecordId> { self.editing }

  pub fn find(&self, id: RecordId) -> Option<&PatientRecord> {
    self.records.iter().find(|p| p.id == id)
  }

  /// Whether any record other than `exclude` uses this fiscal code (ignoring
  /// case) or this file number.
  pub fn has_conflict(
    &self,
    fiscal_code: &str,
    file_number: &str,
    exclude: Option<RecordId>,
  ) -> bool {
    self
      .records
      .iter()
      .any(|p| Some(p.id) != exclude && p.conflicts_with(fiscal_code, file_number))
  }

  // ── Mutations ─────────────────────────────────────────────────────────────

  /// Validate `fields` and append a new record.
  ///
  /// # Errors
  /// `MissingField`, `InvalidLength`, `InvalidFormat` (when enforced),
  /// `DuplicateRecord`, or `IdsExhausted` once the id space is used up.
  pub fn create(&mut self, fields: &PatientFields) -> Result<PatientRecord> {
    let valid = self.validate(fields)?;
    if self.has_conflict(&valid.fiscal_code, &valid.file_number, None) {
      return Err(Error::DuplicateRecord);
    }
    let Some(following) = self.next_id.0.checked_add(1) else {
      return Err(Error::IdsExhausted);
    };

    let record = PatientRecord {
      id:            self.next_id,
      first_name:    valid.first_name,
      last_name:     valid.last_name,
      fiscal_code:   valid.fiscal_code,
      file_number:   valid.file_number,
      note:          valid.note,
      registered_at: Some(Utc::now()),
    };

    self.next_id = RecordId(following);
    self.records.push(record.clone());
    Ok(record)
  }

  /// Replace the fields of record `id` in place. The id and the original
  /// registration timestamp are kept; a record without one is stamped now.
  ///
  /// # Errors
  /// Field validation errors as for [`Self::create`], `NotFound`, or
  /// `DuplicateRecord` when another record already uses the code or number.
  pub fn update(
    &mut self,
    id: RecordId,
    fields: &PatientFields,
  ) -> Result<PatientRecord> {
    let valid = self.validate(fields)?;
    let index = self
      .records
      .iter()
      .position(|p| p.id == id)
      .ok_or(Error::NotFound(id))?;

    if self.has_conflict(&valid.fiscal_code, &valid.file_number, Some(id)) {
      return Err(Error::DuplicateRecord);
    }

    let registered_at = self.records[index].registered_at.or_else(|| Some(Utc::now()));
    let record = PatientRecord {
      id,
      first_name: valid.first_name,
      last_name: valid.last_name,
      fiscal_code: valid.fiscal_code,
      file_number: valid.file_number,
      note: valid.note,
      registered_at,
    };

    self.records[index] = record.clone();
    Ok(record)
  }

  /// Remove every record carrying `id`. Returns the first one removed, or
  /// `None` when there was nothing to remove. Leaves edit mode if it targeted
  /// this id.
  pub fn delete(&mut self, id: RecordId) -> Option<PatientRecord> {
    let index = self.records.iter().position(|p| p.id == id)?;
    let removed = self.records.remove(index);
    // Hand-edited slots may repeat an id.
    self.records.retain(|p| p.id != id);
    if self.editing == Some(id) {
      self.editing = None;
    }
    Some(removed)
  }

  /// Make `id` the edit target and return it for form pre-population.
  pub fn begin_edit(&mut self, id: RecordId) -> Result<&PatientRecord> {
    let index = self
      .records
      .iter()
      .position(|p| p.id == id)
      .ok_or(Error::NotFound(id))?;
    self.editing = Some(id);
    Ok(&self.records[index])
  }

  pub fn cancel_edit(&mut self) { self.editing = None; }

  /// Drop every record and restart numbering at [`FIRST_ID`].
  ///
  /// Destructive; callers confirm with the user first.
  pub fn clear_all(&mut self) {
    self.records.clear();
    self.next_id = FIRST_ID;
    self.editing = None;
  }

  // ── Validation ────────────────────────────────────────────────────────────

  fn validate(&self, fields: &PatientFields) -> Result<ValidFields> {
    let valid = ValidFields {
      first_name:  fields.first_name.trim().to_owned(),
      last_name:   fields.last_name.trim().to_owned(),
      fiscal_code: fiscal_code::normalize(&fields.fiscal_code),
      file_number: fields.file_number.trim().to_owned(),
      note:        fields.note.trim().to_owned(),
    };

    let required = [
      (Field::FirstName, &valid.first_name),
      (Field::LastName, &valid.last_name),
      (Field::FiscalCode, &valid.fiscal_code),
      (Field::FileNumber, &valid.file_number),
    ];
    if let Some((field, _)) = required.iter().find(|(_, value)| value.is_empty()) {
      return Err(Error::MissingField(*field));
    }

    let actual = valid.fiscal_code.chars().count();
    if actual != fiscal_code::LENGTH {
      return Err(Error::InvalidLength { actual });
    }

    if self.policy.enforce_fiscal_code_format
      && !fiscal_code::is_well_formed(&valid.fiscal_code)
    {
      return Err(Error::InvalidFormat);
    }

    Ok(valid)
  }
}
