//! Application state machine and event dispatcher.

use std::time::{Duration, Instant};

use anagrafe_core::{
  Error,
  patient::RecordId,
  persistence::KeyValueStore,
  registry::{Notification, Registry, RegistryEvent, messages},
  view::{ExpandedNotes, RowView, TableView},
};
use crossterm::event::{KeyCode, KeyEvent, KeyEventKind, KeyModifiers};
use fuzzy_matcher::{FuzzyMatcher, skim::SkimMatcherV2};

use crate::form::{Form, FormField};

/// How long a notification stays on screen.
pub const BANNER_TTL: Duration = Duration::from_secs(3);

pub const FORM_CLEARED: &str = "Campi svuotati";

// ─── Focus ────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Focus {
  /// Keyboard drives the patient table.
  Table,
  /// Keyboard types into the form.
  Form,
}

/// A destructive action waiting for a y/n answer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Pending {
  Delete(RecordId),
  ClearAll,
}

impl Pending {
  pub fn prompt(self) -> &'static str {
    match self {
      Self::Delete(_) => messages::CONFIRM_DELETE,
      Self::ClearAll => messages::CONFIRM_CLEAR,
    }
  }
}

/// The notification currently on screen.
#[derive(Debug, Clone)]
pub struct Banner {
  pub notification: Notification,
  shown_at:         Instant,
}

// ─── App ──────────────────────────────────────────────────────────────────────

/// Top-level application state.
pub struct App<K> {
  pub registry: Registry<K>,

  /// Current keyboard focus.
  pub focus: Focus,

  pub form: Form,

  /// Rendered table, rebuilt whenever the registry reports a change.
  pub table: TableView,

  /// Which rows show their full note.
  pub expanded: ExpandedNotes,

  /// Cursor position within the *filtered* rows.
  pub cursor: usize,

  /// Current fuzzy-filter string.
  pub filter: String,

  /// Whether the user is typing a filter query.
  pub filter_active: bool,

  /// Confirmation dialog, if one is open.
  pub pending: Option<Pending>,

  pub banner: Option<Banner>,
}

impl<K: KeyValueStore> App<K> {
  pub fn new(registry: Registry<K>) -> Self {
    let expanded = ExpandedNotes::default();
    let table = TableView::build(registry.store(), &expanded);
    let mut app = Self {
      registry,
      focus: Focus::Table,
      form: Form::default(),
      table,
      expanded,
      cursor: 0,
      filter: String::new(),
      filter_active: false,
      pending: None,
      banner: None,
    };
    // Surface anything queued while loading (e.g. a corrupt slot).
    app.process_events();
    app
  }

  /// Whether the form is editing an existing record.
  pub fn is_editing(&self) -> bool { self.registry.store().editing().is_some() }

  // ── Registry events ───────────────────────────────────────────────────────

  /// Apply queued registry events to the view state.
  pub fn process_events(&mut self) {
    for event in self.registry.drain_events() {
      match event {
        RegistryEvent::Changed => {
          self.expanded.retain_existing(self.registry.store());
          self.rebuild_table();
        }
        RegistryEvent::EditMode(_) => self.rebuild_table(),
        RegistryEvent::Notice(notification) => self.show(notification),
      }
    }
  }

  fn rebuild_table(&mut self) {
    self.table = TableView::build(self.registry.store(), &self.expanded);
    let len = self.visible_rows().len();
    self.cursor = self.cursor.min(len.saturating_sub(1));
  }

  fn show(&mut self, notification: Notification) {
    self.banner = Some(Banner { notification, shown_at: Instant::now() });
  }

  /// Hide the banner once it has been visible for [`BANNER_TTL`].
  pub fn tick(&mut self, now: Instant) {
    if self
      .banner
      .as_ref()
      .is_some_and(|b| now.duration_since(b.shown_at) >= BANNER_TTL)
    {
      self.banner = None;
    }
  }

  // ── Filtered rows ─────────────────────────────────────────────────────────

  /// Rows that match the current filter query.
  pub fn visible_rows(&self) -> Vec<&RowView> {
    let rows = self.table.rows();
    if self.filter.is_empty() {
      return rows.iter().collect();
    }
    let matcher = SkimMatcherV2::default();
    rows
      .iter()
      .filter(|r| {
        let haystack = format!(
          "{} {} {} {}",
          r.first_name, r.last_name, r.fiscal_code, r.file_number
        );
        matcher.fuzzy_match(&haystack, &self.filter).is_some()
      })
      .collect()
  }

  /// The row under the cursor in the filtered view, if any.
  pub fn cursor_row(&self) -> Option<&RowView> {
    self.visible_rows().get(self.cursor).copied()
  }

  // ── Key handling ──────────────────────────────────────────────────────────

  /// Process a key event. Returns `true` to continue, `false` to quit.
  pub async fn handle_key(&mut self, key: KeyEvent) -> bool {
    if key.kind != KeyEventKind::Press {
      return true;
    }

    // Global: Ctrl-C quits from anywhere.
    if key.modifiers.contains(KeyModifiers::CONTROL) && key.code == KeyCode::Char('c') {
      return false;
    }

    if let Some(pending) = self.pending {
      self.handle_confirm_key(pending, key).await;
    } else if self.filter_active {
      self.handle_filter_key(key);
    } else {
      match self.focus {
        Focus::Table => return self.handle_table_key(key).await,
        Focus::Form => self.handle_form_key(key).await,
      }
    }

    self.process_events();
    true
  }

  async fn handle_confirm_key(&mut self, pending: Pending, key: KeyEvent) {
    let answer = match key.code {
      KeyCode::Char('s' | 'S' | 'y' | 'Y') => true,
      KeyCode::Char('n' | 'N') | KeyCode::Esc => false,
      _ => return,
    };
    self.pending = None;

    match pending {
      Pending::Delete(id) => {
        self.registry.delete(id, &answer).await;
      }
      Pending::ClearAll => {
        if self.registry.clear_all(&answer).await {
          self.form.reset();
        }
      }
    }
  }

  fn handle_filter_key(&mut self, key: KeyEvent) {
    match key.code {
      KeyCode::Esc => {
        self.filter_active = false;
        self.filter.clear();
        self.cursor = 0;
      }
      KeyCode::Enter => {
        self.filter_active = false;
        self.cursor = 0;
      }
      KeyCode::Backspace => {
        self.filter.pop();
        self.cursor = 0;
      }
      KeyCode::Char(c) => {
        self.filter.push(c);
        self.cursor = 0;
      }
      _ => {}
    }
  }

  async fn handle_table_key(&mut self, key: KeyEvent) -> bool {
    match key.code {
      // Quit
      KeyCode::Char('q') => return false,

      // Navigation
      KeyCode::Down | KeyCode::Char('j') => {
        let len = self.visible_rows().len();
        if len > 0 && self.cursor + 1 < len {
          self.cursor += 1;
        }
      }
      KeyCode::Up | KeyCode::Char('k') => {
        self.cursor = self.cursor.saturating_sub(1);
      }

      // Expand / collapse the note under the cursor
      KeyCode::Enter | KeyCode::Char(' ') => {
        if let Some(record) = self
          .cursor_row()
          .and_then(|r| self.registry.store().find(r.id))
          .cloned()
        {
          self.expanded.toggle(&record);
          self.rebuild_table();
        }
      }

      // Row actions
      KeyCode::Char('e') => {
        if let Some(id) = self.cursor_row().filter(|r| r.edit_enabled).map(|r| r.id) {
          self.begin_edit(id);
        }
      }
      KeyCode::Char('d') => {
        if let Some(id) = self.cursor_row().filter(|r| r.delete_enabled).map(|r| r.id) {
          self.pending = Some(Pending::Delete(id));
        }
      }
      KeyCode::Char('X') => {
        if self.registry.store().is_empty() {
          // Reports that there is nothing to clear; never asks.
          self.registry.clear_all(&false).await;
        } else {
          self.pending = Some(Pending::ClearAll);
        }
      }

      // Form
      KeyCode::Char('n') | KeyCode::Char('i') | KeyCode::Tab => {
        self.focus = Focus::Form;
      }

      // Filter
      KeyCode::Char('/') => {
        self.filter_active = true;
        self.filter.clear();
        self.cursor = 0;
      }

      _ => {}
    }

    self.process_events();
    true
  }

  async fn handle_form_key(&mut self, key: KeyEvent) {
    let ctrl = key.modifiers.contains(KeyModifiers::CONTROL);
    match key.code {
      KeyCode::Char('r') if ctrl => self.clear_form(),
      KeyCode::Enter => self.submit().await,
      KeyCode::Esc => {
        if self.is_editing() {
          self.registry.cancel_edit();
          self.form.reset();
        }
        self.focus = Focus::Table;
      }
      KeyCode::Tab | KeyCode::Down => self.form.focus_next(),
      KeyCode::BackTab | KeyCode::Up => self.form.focus_prev(),
      KeyCode::Backspace => self.form.backspace(),
      KeyCode::Char(c) if !ctrl => self.form.input(c),
      _ => {}
    }
  }

  // ── Actions ───────────────────────────────────────────────────────────────

  fn begin_edit(&mut self, id: RecordId) {
    if let Ok(record) = self.registry.begin_edit(id) {
      self.form.fill(&record);
      self.focus = Focus::Form;
    }
  }

  /// Submit the form. On failure the inputs are kept and the offending one
  /// is focused.
  async fn submit(&mut self) {
    let was_editing = self.is_editing();
    match self.registry.submit(&self.form.to_fields()).await {
      Ok(_) => {
        self.form.reset();
        if was_editing {
          self.focus = Focus::Table;
        }
      }
      Err(Error::MissingField(field)) => self.form.set_focus(field.into()),
      Err(Error::InvalidLength { .. } | Error::InvalidFormat) => {
        self.form.set_focus(FormField::FiscalCode)
      }
      Err(_) => {}
    }
  }

  /// Empty the inputs. In edit mode this abandons the edit instead.
  fn clear_form(&mut self) {
    if self.is_editing() {
      self.registry.cancel_edit();
    } else {
      self.show(Notification::success(FORM_CLEARED));
    }
    self.form.reset();
  }
}

#[cfg(test)]
mod tests {
  use anagrafe_core::{
    persistence::{MemoryKv, Persistence},
    registry::Severity,
    store::ValidationPolicy,
  };

  use super::*;

  async fn app() -> App<MemoryKv> {
    let registry =
      Registry::open(Persistence::new(MemoryKv::new()), ValidationPolicy::default()).await;
    App::new(registry)
  }

  fn key(code: KeyCode) -> KeyEvent { KeyEvent::new(code, KeyModifiers::NONE) }

  async fn type_str(app: &mut App<MemoryKv>, s: &str) {
    for c in s.chars() {
      app.handle_key(key(KeyCode::Char(c))).await;
    }
  }

  async fn register(app: &mut App<MemoryKv>, first: &str, code: &str, file: &str) {
    app.focus = Focus::Form;
    app.form.reset();
    type_str(app, first).await;
    app.handle_key(key(KeyCode::Tab)).await;
    type_str(app, "Rossi").await;
    app.handle_key(key(KeyCode::Tab)).await;
    type_str(app, code).await;
    app.handle_key(key(KeyCode::Tab)).await;
    type_str(app, file).await;
    app.handle_key(key(KeyCode::Enter)).await;
  }

  #[tokio::test]
  async fn empty_table_shows_placeholder() {
    let app = app().await;
    assert!(matches!(app.table, TableView::Empty { .. }));
    assert!(app.cursor_row().is_none());
  }

  #[tokio::test]
  async fn typing_and_submitting_registers_a_patient() {
    let mut app = app().await;
    register(&mut app, "Mario", "rssmra85t10a562s", "C-1").await;

    let rows = app.table.rows();
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0].fiscal_code, "RSSMRA85T10A562S");
    assert_eq!(app.form.value(FormField::FirstName), "");
    let banner = app.banner.as_ref().unwrap();
    assert_eq!(banner.notification, Notification::success(messages::REGISTERED));
  }

  #[tokio::test]
  async fn failed_submit_keeps_inputs_and_focuses_field() {
    let mut app = app().await;
    register(&mut app, "Mario", "CORTO", "C-1").await;

    assert!(app.table.rows().is_empty());
    assert_eq!(app.form.value(FormField::FirstName), "Mario");
    assert_eq!(app.form.focus(), FormField::FiscalCode);
    assert_eq!(app.banner.as_ref().unwrap().notification.severity, Severity::Error);
  }

  #[tokio::test]
  async fn delete_requires_confirmation() {
    let mut app = app().await;
    register(&mut app, "Mario", "RSSMRA85T10A562S", "C-1").await;
    app.focus = Focus::Table;

    app.handle_key(key(KeyCode::Char('d'))).await;
    assert!(matches!(app.pending, Some(Pending::Delete(_))));
    app.handle_key(key(KeyCode::Char('n'))).await;
    assert!(app.pending.is_none());
    assert_eq!(app.table.rows().len(), 1);

    app.handle_key(key(KeyCode::Char('d'))).await;
    app.handle_key(key(KeyCode::Char('s'))).await;
    assert!(app.table.rows().is_empty());
  }

  #[tokio::test]
  async fn edit_prefills_and_disables_row_actions() {
    let mut app = app().await;
    register(&mut app, "Mario", "RSSMRA85T10A562S", "C-1").await;
    app.focus = Focus::Table;

    app.handle_key(key(KeyCode::Char('e'))).await;
    assert!(app.is_editing());
    assert_eq!(app.focus, Focus::Form);
    assert_eq!(app.form.value(FormField::FileNumber), "C-1");
    let row = app.cursor_row().unwrap();
    assert!(!row.edit_enabled && !row.delete_enabled && row.highlighted);

    // Delete is unavailable for the row being edited.
    app.focus = Focus::Table;
    app.handle_key(key(KeyCode::Char('d'))).await;
    assert!(app.pending.is_none());

    app.focus = Focus::Form;
    app.form.set_focus(FormField::Note);
    type_str(&mut app, "aggiornato").await;
    app.handle_key(key(KeyCode::Enter)).await;

    assert!(!app.is_editing());
    assert_eq!(app.focus, Focus::Table);
    assert_eq!(app.table.rows()[0].note.text, "aggiornato");
  }

  #[tokio::test]
  async fn escape_in_edit_mode_cancels_edit() {
    let mut app = app().await;
    register(&mut app, "Mario", "RSSMRA85T10A562S", "C-1").await;
    app.focus = Focus::Table;
    app.handle_key(key(KeyCode::Char('e'))).await;

    app.handle_key(key(KeyCode::Esc)).await;
    assert!(!app.is_editing());
    assert_eq!(app.form.value(FormField::FirstName), "");
    assert_eq!(
      app.banner.as_ref().unwrap().notification,
      Notification::success(messages::EDIT_CANCELLED)
    );
  }

  #[tokio::test]
  async fn clear_all_on_empty_table_reports_without_dialog() {
    let mut app = app().await;
    app.handle_key(key(KeyCode::Char('X'))).await;
    assert!(app.pending.is_none());
    assert_eq!(
      app.banner.as_ref().unwrap().notification,
      Notification::error(messages::ALREADY_EMPTY)
    );
  }

  #[tokio::test]
  async fn clear_all_after_confirmation() {
    let mut app = app().await;
    register(&mut app, "Mario", "RSSMRA85T10A562S", "C-1").await;
    register(&mut app, "Luigi", "RSSLGU85T10A562S", "C-2").await;
    app.focus = Focus::Table;

    app.handle_key(key(KeyCode::Char('X'))).await;
    assert_eq!(app.pending, Some(Pending::ClearAll));
    app.handle_key(key(KeyCode::Char('y'))).await;
    assert!(matches!(app.table, TableView::Empty { .. }));
    assert_eq!(app.registry.store().next_id(), RecordId(1));
  }

  #[tokio::test]
  async fn enter_toggles_long_note() {
    let mut app = app().await;
    app.focus = Focus::Form;
    type_str(&mut app, "Mario").await;
    app.form.set_focus(FormField::LastName);
    type_str(&mut app, "Rossi").await;
    app.form.set_focus(FormField::FiscalCode);
    type_str(&mut app, "RSSMRA85T10A562S").await;
    app.form.set_focus(FormField::FileNumber);
    type_str(&mut app, "C-1").await;
    app.form.set_focus(FormField::Note);
    type_str(&mut app, &"n".repeat(60)).await;
    app.handle_key(key(KeyCode::Enter)).await;
    app.focus = Focus::Table;

    assert!(!app.table.rows()[0].note.expanded);
    app.handle_key(key(KeyCode::Enter)).await;
    assert!(app.table.rows()[0].note.expanded);
    app.handle_key(key(KeyCode::Char(' '))).await;
    assert!(!app.table.rows()[0].note.expanded);
  }

  #[tokio::test]
  async fn filter_narrows_rows() {
    let mut app = app().await;
    register(&mut app, "Mario", "RSSMRA85T10A562S", "C-1").await;
    register(&mut app, "Luigi", "RSSLGU85T10A562S", "C-2").await;
    app.focus = Focus::Table;

    app.handle_key(key(KeyCode::Char('/'))).await;
    type_str(&mut app, "luigi").await;
    app.handle_key(key(KeyCode::Enter)).await;
    assert_eq!(app.visible_rows().len(), 1);
    assert_eq!(app.cursor_row().unwrap().first_name, "Luigi");
  }

  #[tokio::test]
  async fn banner_expires() {
    let mut app = app().await;
    app.handle_key(key(KeyCode::Char('X'))).await;
    let shown = app.banner.as_ref().unwrap().shown_at;

    app.tick(shown + Duration::from_secs(1));
    assert!(app.banner.is_some());
    app.tick(shown + BANNER_TTL);
    assert!(app.banner.is_none());
  }

  #[tokio::test]
  async fn ctrl_r_clears_form() {
    let mut app = app().await;
    app.focus = Focus::Form;
    type_str(&mut app, "Mar").await;
    app
      .handle_key(KeyEvent::new(KeyCode::Char('r'), KeyModifiers::CONTROL))
      .await;
    assert_eq!(app.form.value(FormField::FirstName), "");
    assert_eq!(
      app.banner.as_ref().unwrap().notification,
      Notification::success(FORM_CLEARED)
    );
  }
}
