//! Table view model: what a renderer needs, computed from the store.
//!
//! Renderers (the terminal UI, the plain-text `list` command) consume
//! [`TableView`] and never look at the store directly.

use std::collections::HashSet;

use chrono::{DateTime, Local, Utc};

use crate::{
  patient::{PatientRecord, RecordId},
  store::RecordStore,
};

/// Notes longer than this are truncated in the table.
pub const NOTE_PREVIEW_CHARS: usize = 50;

/// Shown in place of an empty note or a missing date.
pub const PLACEHOLDER: &str = "-";

pub const EMPTY_TABLE: &str = "Nessun paziente registrato";

// ─── Notes ───────────────────────────────────────────────────────────────────

/// A note as the table shows it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NoteCell {
  pub text:       String,
  /// Whether an expand/collapse control is offered.
  pub expandable: bool,
  pub expanded:   bool,
}

/// Shorten `note` to `max_chars` characters plus an ellipsis.
///
/// Returns the display text and whether anything was cut.
pub fn truncate_note(note: &str, max_chars: usize) -> (String, bool) {
  if note.is_empty() {
    return (PLACEHOLDER.to_owned(), false);
  }
  match note.char_indices().nth(max_chars) {
    Some((cut, _)) => (format!("{}...", &note[..cut]), true),
    None => (note.to_owned(), false),
  }
}

/// Build the cell for `note`, honouring the row's expansion state.
pub fn note_cell(note: &str, expanded: bool) -> NoteCell {
  let (preview, expandable) = truncate_note(note, NOTE_PREVIEW_CHARS);
  if expandable && expanded {
    NoteCell { text: note.to_owned(), expandable, expanded: true }
  } else {
    NoteCell { text: preview, expandable, expanded: false }
  }
}

/// Per-row note expansion. Rows toggle independently.
#[derive(Debug, Clone, Default)]
pub struct ExpandedNotes(HashSet<RecordId>);

impl ExpandedNotes {
  pub fn is_expanded(&self, id: RecordId) -> bool { self.0.contains(&id) }

  /// Flip the expansion of `record`'s note. Short notes have nothing to
  /// expand and are left alone. Returns the new state.
  pub fn toggle(&mut self, record: &PatientRecord) -> bool {
    if !truncate_note(&record.note, NOTE_PREVIEW_CHARS).1 {
      return false;
    }
    if self.0.remove(&record.id) {
      false
    } else {
      self.0.insert(record.id);
      true
    }
  }

  /// Forget rows that no longer exist.
  pub fn retain_existing(&mut self, store: &RecordStore) {
    self.0.retain(|id| store.find(*id).is_some());
  }
}

// ─── Dates ───────────────────────────────────────────────────────────────────

/// `dd/mm/yyyy HH:MM` in local time, or [`PLACEHOLDER`].
pub fn format_registered_at(at: Option<DateTime<Utc>>) -> String {
  at.map(|dt| dt.with_timezone(&Local).format("%d/%m/%Y %H:%M").to_string())
    .unwrap_or_else(|| PLACEHOLDER.to_owned())
}

// ─── Table ───────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RowView {
  pub id:             RecordId,
  pub first_name:     String,
  pub last_name:      String,
  pub fiscal_code:    String,
  pub file_number:    String,
  pub registered_at:  String,
  pub note:           NoteCell,
  /// The row is the current edit target.
  pub highlighted:    bool,
  pub edit_enabled:   bool,
  pub delete_enabled: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TableView {
  /// No records: a single placeholder row.
  Empty { message: &'static str },
  Rows(Vec<RowView>),
}

impl TableView {
  pub fn build(store: &RecordStore, expanded: &ExpandedNotes) -> Self {
    if store.is_empty() {
      return Self::Empty { message: EMPTY_TABLE };
    }

    let editing = store.editing();
    let rows = store
      .records()
      .iter()
      .map(|p| {
        let being_edited = editing == Some(p.id);
        RowView {
          id:             p.id,
          first_name:     p.first_name.clone(),
          last_name:      p.last_name.clone(),
          fiscal_code:    p.fiscal_code.clone(),
          file_number:    p.file_number.clone(),
          registered_at:  format_registered_at(p.registered_at),
          note:           note_cell(&p.note, expanded.is_expanded(p.id)),
          highlighted:    being_edited,
          edit_enabled:   !being_edited,
          delete_enabled: !being_edited,
        }
      })
      .collect();

    Self::Rows(rows)
  }

  pub fn rows(&self) -> &[RowView] {
    match self {
      Self::Empty { .. } => &[],
      Self::Rows(rows) => rows,
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::patient::PatientFields;

  fn store_with_note(note: &str) -> (RecordStore, RecordId) {
    let mut store = RecordStore::default();
    let record = store
      .create(&PatientFields::new("Mario", "Rossi", "RSSMRA85T10A562S", "C-1").with_note(note))
      .unwrap();
    (store, record.id)
  }

  #[test]
  fn note_of_fifty_one_chars_is_truncated() {
    let note = "a".repeat(51);
    let (text, cut) = truncate_note(&note, NOTE_PREVIEW_CHARS);
    assert!(cut);
    assert_eq!(text, format!("{}...", "a".repeat(50)));
  }

  #[test]
  fn note_of_fifty_chars_is_shown_in_full() {
    let note = "b".repeat(50);
    let (text, cut) = truncate_note(&note, NOTE_PREVIEW_CHARS);
    assert!(!cut);
    assert_eq!(text, note);
  }

  #[test]
  fn empty_note_shows_placeholder() {
    assert_eq!(truncate_note("", NOTE_PREVIEW_CHARS), ("-".to_owned(), false));
  }

  #[test]
  fn truncation_counts_characters_not_bytes() {
    let note = "è".repeat(51);
    let (text, cut) = truncate_note(&note, NOTE_PREVIEW_CHARS);
    assert!(cut);
    assert_eq!(text.chars().count(), 53);
  }

  #[test]
  fn toggling_one_row_leaves_others_alone() {
    let mut store = RecordStore::default();
    let long = "x".repeat(80);
    let a = store
      .create(&PatientFields::new("A", "A", "AAAAAA00A00A000A", "1").with_note(&long))
      .unwrap();
    let b = store
      .create(&PatientFields::new("B", "B", "BBBBBB00B00B000B", "2").with_note(&long))
      .unwrap();

    let mut expanded = ExpandedNotes::default();
    assert!(expanded.toggle(&a));

    let view = TableView::build(&store, &expanded);
    let rows = view.rows();
    assert!(rows[0].note.expanded);
    assert_eq!(rows[0].note.text, long);
    assert!(!rows[1].note.expanded);
    assert!(rows[1].note.text.ends_with("..."));

    assert!(!expanded.toggle(&a));
    assert!(!expanded.is_expanded(a.id));
    assert!(!expanded.is_expanded(b.id));
  }

  #[test]
  fn short_notes_cannot_be_expanded() {
    let (store, id) = store_with_note("breve");
    let mut expanded = ExpandedNotes::default();
    assert!(!expanded.toggle(store.find(id).unwrap()));
    assert!(!expanded.is_expanded(id));
  }

  #[test]
  fn empty_store_renders_placeholder() {
    let view = TableView::build(&RecordStore::default(), &ExpandedNotes::default());
    assert_eq!(view, TableView::Empty { message: EMPTY_TABLE });
    assert!(view.rows().is_empty());
  }

  #[test]
  fn row_being_edited_has_actions_disabled() {
    let (mut store, id) = store_with_note("");
    store.begin_edit(id).unwrap();

    let view = TableView::build(&store, &ExpandedNotes::default());
    let row = &view.rows()[0];
    assert!(row.highlighted);
    assert!(!row.edit_enabled);
    assert!(!row.delete_enabled);
    assert_eq!(row.note.text, PLACEHOLDER);
  }

  #[test]
  fn missing_date_shows_placeholder() {
    assert_eq!(format_registered_at(None), PLACEHOLDER);
  }

  #[test]
  fn retain_existing_drops_deleted_rows() {
    let (mut store, id) = store_with_note(&"n".repeat(60));
    let mut expanded = ExpandedNotes::default();
    expanded.toggle(store.find(id).unwrap());
    store.delete(id);
    expanded.retain_existing(&store);
    assert!(!expanded.is_expanded(id));
  }
}
